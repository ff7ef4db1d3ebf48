//! Dual-screen cartridge launcher: the top screen shows the selected
//! cartridge, the bottom screen the scrolling icon grid.
mod banner;
mod browser;
mod clock;
mod display;
mod emulator;
mod fps;
mod grid;
mod icon_cache;
mod input;
mod settings;

use std::{
    io,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use crossterm::event::{Event, KeyEventKind, poll, read};
use include_dir::{Dir, include_dir};
use log::{error, info, warn};
use rand::{Rng, rng};

use browser::{FileBrowser, FilterMode};
use clock::ClockEditor;
use display::{Canvas, Display, Glyph, Rgb};
use emulator::Emulator;
use fps::FpsCounter;
use grid::GameGrid;
use icon_cache::IconCache;
use input::{Button, InputState, is_quit_key};

pub use settings::Settings;

static ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets");

const TOP_BG: Rgb = [222, 232, 244];
const HEADER_BG: Rgb = [120, 150, 200];
const BOTTOM_BG: Rgb = [236, 236, 236];
const TEXT: Rgb = [0, 0, 0];
const TEXT_DIM: Rgb = [110, 110, 110];
const TEXT_LIGHT: Rgb = [255, 255, 255];
const BOX_EMPTY: Rgb = [250, 250, 250];
const BOX_FULL: Rgb = [215, 225, 255];
const BOX_BORDER: Rgb = [150, 150, 150];
const GLOW: Rgb = [170, 195, 255];
const HIGHLIGHT: Rgb = [100, 150, 255];

// bottom screen layout, in pixels
const GRID_START_X: f32 = -5.0;
const GRID_SPACING: f32 = 29.0;
const GRID_Y: i32 = 14;
const ICON_BOX: i32 = 24;
const ICON_INSET: i32 = 4;

const TITLE_MAX_CHARS: usize = 30;
const STATUS_DURATION: Duration = Duration::from_secs(3);

fn embedded_glyph(name: &str) -> Glyph {
    let path = format!("glyphs/{name}.txt");
    match ASSETS.get_file(&path).and_then(|file| file.contents_utf8()) {
        Some(art) => Glyph::parse(art),
        None => {
            warn!("missing embedded glyph {path}");
            Glyph::parse("")
        }
    }
}

fn pick_greeting() -> String {
    let lines: Vec<&str> = ASSETS
        .get_file("greetings.txt")
        .and_then(|file| file.contents_utf8())
        .map(|text| text.lines().filter(|l| !l.trim().is_empty()).collect())
        .unwrap_or_default();
    if lines.is_empty() {
        return String::from("Welcome!");
    }
    lines[rng().random_range(0..lines.len())].to_string()
}

/// First line of a banner title, shortened to fit the top screen. Later
/// lines usually name the publisher.
fn truncate_title(title: &str) -> String {
    let title = title.lines().next().unwrap_or_default().trim_end();
    if title.chars().count() > TITLE_MAX_CHARS {
        let head: String = title.chars().take(TITLE_MAX_CHARS - 3).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}

/// Everything the launcher shows and reacts to, apart from the terminal
/// itself.
pub struct Menu {
    settings: Settings,
    settings_path: PathBuf,
    browser: FileBrowser,
    grid: GameGrid,
    icons: IconCache,
    input: InputState,
    fps: FpsCounter,
    folder_glyph: Glyph,
    cartridge_glyph: Glyph,
    greeting: String,
    emulator: Option<Emulator>,
    status: Option<(String, Instant)>,
    /// Open while the date and time are being set
    clock_editor: Option<ClockEditor>,
}

impl Menu {
    pub fn new(settings: Settings, settings_path: PathBuf, start: &Path) -> Menu {
        for wallpaper in [&settings.top_wallpaper_path, &settings.bottom_wallpaper_path] {
            if !wallpaper.is_empty() {
                info!("wallpaper {wallpaper} is configured but not drawn in the terminal");
            }
        }

        let browser = FileBrowser::new(start, FilterMode::CartridgesOnly, settings.title_language);
        let mut grid = GameGrid::new();
        grid.set_item_count(browser.entries().len());

        Menu {
            settings,
            settings_path,
            browser,
            grid,
            icons: IconCache::new(),
            input: InputState::new(),
            fps: FpsCounter::new(Instant::now()),
            folder_glyph: embedded_glyph("folder"),
            cartridge_glyph: embedded_glyph("cartridge"),
            greeting: pick_greeting(),
            emulator: None,
            status: None,
            clock_editor: None,
        }
    }

    fn set_status(&mut self, message: String) {
        self.status = Some((message, Instant::now() + STATUS_DURATION));
    }

    fn save_settings(&mut self) {
        if let Err(err) = self.settings.save(&self.settings_path) {
            error!("{err}");
            self.set_status(String::from("Could not save settings"));
        }
    }

    /// Listing changed under the grid; start again from the first entry.
    fn listing_changed(&mut self) {
        self.grid.set_item_count(self.browser.entries().len());
        self.grid.set_selected_index(0);
    }

    fn directory_changed(&mut self) {
        self.icons.clear();
        self.listing_changed();
        info!("now in {}", self.browser.current_path().display());
    }

    fn go_up(&mut self) {
        if self.browser.go_up() {
            self.directory_changed();
        }
    }

    fn activate_selected(&mut self) {
        let Some(entry) = self.browser.entry(self.grid.selected_index()).cloned() else {
            return;
        };
        if entry.is_parent {
            self.go_up();
        } else if entry.is_directory {
            if self.browser.enter_directory(&entry.name) {
                self.directory_changed();
            }
        } else if entry.is_cartridge() {
            self.launch(&entry.path, &entry.title);
        }
    }

    fn launch(&mut self, path: &Path, title: &str) {
        if self.emulator.is_some() {
            warn!("emulator still running, not launching {}", path.display());
            self.set_status(String::from("An emulator is already running"));
            return;
        }
        match Emulator::launch(&self.settings.emulator_command, path, &self.settings.emulator_log) {
            Ok(emulator) => {
                self.emulator = Some(emulator);
                self.set_status(format!("Starting {}", truncate_title(title)));
            }
            Err(err) => {
                error!("{err}");
                self.set_status(String::from("Launch failed, see log"));
            }
        }
    }

    fn toggle_fps(&mut self) {
        self.settings.show_fps = !self.settings.show_fps;
        self.save_settings();
    }

    fn cycle_language(&mut self) {
        let language = self.settings.title_language.next();
        self.settings.title_language = language;
        self.save_settings();
        let selected = self.grid.selected_index();
        self.browser.set_language(language);
        self.grid.set_item_count(self.browser.entries().len());
        self.grid.set_selected_index(selected);
        self.set_status(format!("Titles: {}", language.name()));
    }

    fn toggle_filter(&mut self) {
        let filter = match self.browser.filter() {
            FilterMode::All => FilterMode::CartridgesOnly,
            FilterMode::CartridgesOnly => FilterMode::All,
        };
        self.browser.set_filter(filter);
        self.listing_changed();
    }

    fn open_clock_editor(&mut self) {
        self.clock_editor = Some(ClockEditor::new(self.settings.adjusted_time()));
    }

    /// Up/Down change the field, Left/Right pick it, A or Start apply and
    /// B cancels.
    fn edit_clock(&mut self) {
        if let Some(editor) = self.clock_editor.as_mut() {
            if self.input.just_pressed(Button::Up) {
                editor.increment();
            }
            if self.input.just_pressed(Button::Down) {
                editor.decrement();
            }
            if self.input.just_pressed(Button::Left) {
                editor.previous_field();
            }
            if self.input.just_pressed(Button::Right) {
                editor.next_field();
            }
        }

        if self.input.just_pressed(Button::B) {
            self.clock_editor = None;
            return;
        }
        if !(self.input.just_pressed(Button::A) || self.input.just_pressed(Button::Start)) {
            return;
        }
        let Some(editor) = self.clock_editor.take() else {
            return;
        };
        match editor.apply(&mut self.settings) {
            Ok(()) => {
                info!("clock set to {}", editor.describe());
                self.save_settings();
                self.set_status(String::from("Date & time set"));
            }
            Err(err) => {
                warn!("{err}");
                self.set_status(String::from("That date does not exist"));
                self.clock_editor = Some(editor);
            }
        }
    }

    fn handle_buttons(&mut self) {
        if self.input.just_pressed(Button::Up) {
            self.open_clock_editor();
            return;
        }
        if self.input.just_pressed(Button::Left) {
            self.grid.move_left();
        }
        if self.input.just_pressed(Button::Right) {
            self.grid.move_right();
        }
        if self.input.just_pressed(Button::L) {
            self.grid.page_left();
        }
        if self.input.just_pressed(Button::R) {
            self.grid.page_right();
        }
        if self.input.just_pressed(Button::A) || self.input.just_pressed(Button::Start) {
            self.activate_selected();
        }
        if self.input.just_pressed(Button::B) {
            self.go_up();
        }
        if self.input.just_pressed(Button::X) {
            self.toggle_fps();
        }
        if self.input.just_pressed(Button::Y) {
            self.cycle_language();
        }
        if self.input.just_pressed(Button::Select) {
            self.toggle_filter();
        }
    }

    /// Latches input for this frame and acts on it, then advances the
    /// grid animation.
    pub fn update(&mut self, now: Instant) {
        self.input.update(now);

        if self.clock_editor.is_some() {
            self.edit_clock();
        } else {
            self.handle_buttons();
        }

        if self.emulator.as_mut().is_some_and(|emulator| emulator.poll()) {
            self.emulator = None;
        }
        if self.status.as_ref().is_some_and(|(_, until)| *until <= now) {
            self.status = None;
        }

        self.grid.tick();
    }

    pub fn draw_top(&mut self, canvas: &mut Canvas) {
        canvas.clear(TOP_BG);
        canvas.fill_rect(0, 0, canvas.width() as i32, 2, HEADER_BG);
        canvas.text(1, 0, &self.settings.user_name, TEXT_LIGHT);
        let clock = self.settings.adjusted_time().format("%Y/%m/%d %H:%M").to_string();
        canvas.text_right(0, &clock, TEXT_LIGHT);
        if self.settings.show_fps {
            let fps = format!("FPS {:.1} (avg {:.1})", self.fps.current(), self.fps.average());
            canvas.text(1, 1, &fps, TEXT_DIM);
        }

        if let Some(editor) = &self.clock_editor {
            canvas.text_centered(8, "Date & Time", TEXT);
            canvas.text_centered(10, &editor.describe(), HIGHLIGHT);
            canvas.text_centered(12, "Up/Down change  Left/Right field", TEXT_DIM);
            canvas.text_centered(13, "A set  B cancel", TEXT_DIM);
        } else if let Some(entry) = self.browser.entry(self.grid.selected_index()).cloned() {
            let x = (canvas.width() as i32 - ICON_BOX) / 2;
            let y = 8;
            canvas.fill_rect(x, y, ICON_BOX, ICON_BOX, BOX_EMPTY);
            canvas.stroke_rect(x, y, ICON_BOX, ICON_BOX, BOX_BORDER);
            self.draw_entry_icon(canvas, &entry, x + ICON_INSET, y + ICON_INSET);
            canvas.text_centered(17, &truncate_title(&entry.title), TEXT);
        }

        match &self.status {
            Some((message, _)) => canvas.text_centered(18, message, HIGHLIGHT),
            None => {
                let language = format!("Titles: {}", self.settings.title_language.name());
                canvas.text_centered(18, &language, TEXT_DIM);
            }
        }
        canvas.text_centered(19, &self.greeting, TEXT_DIM);
    }

    fn draw_entry_icon(&mut self, canvas: &mut Canvas, entry: &browser::FileEntry, x: i32, y: i32) {
        if entry.is_directory {
            canvas.blit_glyph(&self.folder_glyph, x, y);
        } else if entry.is_cartridge() {
            match self.icons.load_icon(&entry.path) {
                Some(icon) => canvas.blit_icon(&icon, x, y),
                None => canvas.blit_glyph(&self.cartridge_glyph, x, y),
            }
        }
    }

    pub fn draw_bottom(&mut self, canvas: &mut Canvas) {
        canvas.clear(BOTTOM_BG);
        let path = self.browser.current_path().display().to_string();
        canvas.text(1, 0, &path, TEXT_DIM);

        if self.browser.entries().is_empty() {
            canvas.text_centered(12, "No cartridges here", TEXT_DIM);
        }

        let selected = self.grid.selected_index();
        for placement in self.grid.slot_placements(GRID_START_X, GRID_SPACING) {
            let Some(item) = placement.item else {
                continue;
            };
            let x = placement.x.round() as i32;
            if x < -ICON_BOX || x > canvas.width() as i32 {
                continue;
            }
            let Some(entry) = self.browser.entries().get(item).cloned() else {
                continue;
            };

            if item as i32 == selected {
                canvas.fill_rect(x - 2, GRID_Y - 2, ICON_BOX + 4, ICON_BOX + 4, GLOW);
                canvas.fill_rect(x, GRID_Y, ICON_BOX, ICON_BOX, BOX_FULL);
                canvas.stroke_rect(x - 3, GRID_Y - 3, ICON_BOX + 6, ICON_BOX + 6, TEXT_LIGHT);
                canvas.stroke_rect(x - 1, GRID_Y - 1, ICON_BOX + 2, ICON_BOX + 2, HIGHLIGHT);
            } else {
                canvas.fill_rect(x, GRID_Y, ICON_BOX, ICON_BOX, BOX_EMPTY);
                canvas.stroke_rect(x, GRID_Y, ICON_BOX, ICON_BOX, BOX_BORDER);
            }
            self.draw_entry_icon(canvas, &entry, x + ICON_INSET, GRID_Y + ICON_INSET);
        }

        let shoulder = |held: bool| if held { TEXT } else { TEXT_DIM };
        canvas.text(1, 21, "L  Previous", shoulder(self.input.is_held(Button::L)));
        canvas.text_right(21, "Next  R", shoulder(self.input.is_held(Button::R)));
        canvas.text_centered(
            23,
            "A open  B back  X fps  Y language  Select filter  Up clock  Esc quit",
            TEXT_DIM,
        );
    }
}

/// Owns the terminal and drives the menu at a fixed frame rate.
pub struct Launcher {
    menu: Menu,
    display: Display,
}

impl Launcher {
    const FRAME_TIME: Duration = Duration::from_millis(16);

    pub fn new(menu: Menu) -> io::Result<Launcher> {
        let display = Display::new()?;
        Ok(Launcher { menu, display })
    }

    pub fn start(&mut self) -> io::Result<()> {
        info!("launcher started");
        loop {
            let frame_start = Instant::now();

            while poll(Duration::ZERO)? {
                match read()? {
                    Event::Key(event) => {
                        if is_quit_key(event.code) && event.kind != KeyEventKind::Release {
                            info!("quit requested");
                            return Ok(());
                        }
                        self.menu.input.handle_key(event, frame_start);
                    }
                    Event::Resize(_, _) => self.display.invalidate()?,
                    _ => {}
                }
            }

            // the animation tick runs inside update, before anything is drawn
            self.menu.update(frame_start);
            self.menu.draw_top(&mut self.display.top);
            self.menu.draw_bottom(&mut self.display.bottom);
            self.display.present()?;
            self.menu.fps.frame(Instant::now());

            let elapsed = frame_start.elapsed();
            if elapsed < Self::FRAME_TIME {
                thread::sleep(Self::FRAME_TIME - elapsed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::banner::{ICON_BYTES, Language, TITLE_SLOTS, fixtures};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("crabmenu-menu-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn red_cartridge(title: &str) -> Vec<u8> {
        let mut palette = [0x001F; 16];
        palette[0] = 0;
        let mut titles = [""; TITLE_SLOTS];
        titles[1] = title;
        fixtures::cartridge_image(&[0x11; ICON_BYTES], &palette, &titles, TITLE_SLOTS)
    }

    fn menu_in(dir: &Path) -> Menu {
        let settings = Settings {
            emulator_log: dir.join("emu.log"),
            ..Settings::default()
        };
        Menu::new(settings, dir.join("settings.ini"), dir)
    }

    fn tap(menu: &mut Menu, code: KeyCode, now: &mut Instant) {
        let event = KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Press);
        menu.input.handle_key(event, *now);
        menu.update(*now);
        // let the key expire before the next tap
        *now += Duration::from_millis(200);
        menu.update(*now);
    }

    #[test]
    fn test_truncate_title() {
        assert_eq!(truncate_title("Short"), "Short");
        let long = "A".repeat(31);
        assert_eq!(truncate_title(&long), format!("{}...", "A".repeat(27)));
        assert_eq!(truncate_title(&"B".repeat(30)), "B".repeat(30));
        assert_eq!(truncate_title("Mario Kart DS\nNintendo"), "Mario Kart DS");
        assert_eq!(truncate_title(""), "");
    }

    #[test]
    fn test_multiline_title_keeps_terminal_layout() {
        let dir = scratch_dir("multiline");
        fs::write(dir.join("kart.nds"), red_cartridge("Mario Kart DS\nNintendo")).unwrap();

        let mut menu = menu_in(&dir);
        assert_eq!(menu.browser.entries()[1].title, "Mario Kart DS\nNintendo");
        menu.grid.set_selected_index(1);

        let mut canvas = Canvas::new(Display::WIDTH, Display::TOP_HEIGHT);
        menu.draw_top(&mut canvas);
        let mut out: Vec<u8> = Vec::new();
        canvas.render(&mut out, 0).unwrap();
        let written = String::from_utf8(out).unwrap();
        assert!(written.contains("Mario Kart DS"));
        assert!(!written.contains("Nintendo"));
        assert!(!written.contains('\n'));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_embedded_assets() {
        let folder = embedded_glyph("folder");
        assert_eq!((folder.width(), folder.height()), (16, 16));
        let cartridge = embedded_glyph("cartridge");
        assert_eq!((cartridge.width(), cartridge.height()), (16, 16));
        assert!(!pick_greeting().is_empty());
    }

    #[test]
    fn test_navigation_and_directories() {
        let dir = scratch_dir("nav");
        fs::create_dir(dir.join("more")).unwrap();
        fs::write(dir.join("more").join("inner.nds"), red_cartridge("Inner")).unwrap();
        for name in ["a.nds", "b.nds", "c.nds"] {
            fs::write(dir.join(name), red_cartridge(name)).unwrap();
        }

        let mut menu = menu_in(&dir);
        let mut now = Instant::now();
        // "..", "more", a, b, c
        assert_eq!(menu.grid.item_count(), 5);

        tap(&mut menu, KeyCode::Right, &mut now);
        assert_eq!(menu.grid.selected_index(), 1);
        tap(&mut menu, KeyCode::Char('x'), &mut now);
        assert_eq!(menu.browser.current_path(), dir.join("more"));
        assert_eq!(menu.grid.selected_index(), 0);
        assert_eq!(menu.grid.item_count(), 2);

        tap(&mut menu, KeyCode::Char('z'), &mut now);
        assert_eq!(menu.browser.current_path(), dir.as_path());

        tap(&mut menu, KeyCode::Char('w'), &mut now);
        assert_eq!(menu.grid.selected_index(), 4);
        tap(&mut menu, KeyCode::Char('q'), &mut now);
        assert_eq!(menu.grid.selected_index(), 0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_draw_bottom_uses_cached_icons() {
        let dir = scratch_dir("draw");
        fs::write(dir.join("game.nds"), red_cartridge("Game")).unwrap();
        fs::write(dir.join("broken.nds"), b"garbage").unwrap();

        let mut menu = menu_in(&dir);
        // "..", broken.nds, game.nds; select game.nds
        menu.grid.set_selected_index(2);
        for _ in 0..100 {
            menu.grid.tick();
        }

        let mut canvas = Canvas::new(Display::WIDTH, Display::BOTTOM_HEIGHT);
        menu.draw_bottom(&mut canvas);
        assert_eq!(menu.icons.len(), 1);
        menu.draw_bottom(&mut canvas);
        assert_eq!(menu.icons.len(), 1);

        // selection sits in slot 2: x = -5 + 2 * 29 = 53
        let icon_x = 53 + ICON_INSET as usize;
        let icon_y = (GRID_Y + ICON_INSET) as usize;
        assert_eq!(canvas.pixel(icon_x, icon_y), [248, 0, 0]);
        assert_eq!(canvas.pixel(53 - 1, GRID_Y as usize), HIGHLIGHT);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_language_and_fps_toggles_persist() {
        let dir = scratch_dir("toggles");
        let mut titles = [""; TITLE_SLOTS];
        titles[0] = "Nihongo";
        titles[2] = "Francais";
        let image = fixtures::cartridge_image(&[0; ICON_BYTES], &[0; 16], &titles, TITLE_SLOTS);
        fs::write(dir.join("game.nds"), image).unwrap();

        let mut menu = menu_in(&dir);
        let mut now = Instant::now();
        let title = |menu: &Menu| menu.browser.entries()[1].title.clone();
        // English slot is empty, so the Japanese title is used
        assert_eq!(title(&menu), "Nihongo");

        tap(&mut menu, KeyCode::Char('s'), &mut now);
        assert_eq!(menu.settings.title_language, Language::French);
        assert_eq!(title(&menu), "Francais");

        tap(&mut menu, KeyCode::Char('a'), &mut now);
        let saved = Settings::load(&dir.join("settings.ini")).unwrap();
        assert!(!saved.show_fps);
        assert_eq!(saved.title_language, Language::French);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_clock_editor_sets_and_cancels() {
        let dir = scratch_dir("clock");
        let mut menu = menu_in(&dir);
        let mut now = Instant::now();

        tap(&mut menu, KeyCode::Up, &mut now);
        assert!(menu.clock_editor.is_some());
        // arrows edit the clock instead of moving the grid
        tap(&mut menu, KeyCode::Left, &mut now);
        tap(&mut menu, KeyCode::Up, &mut now);
        assert_eq!(menu.grid.selected_index(), 0);
        let editor = menu.clock_editor.clone().unwrap();
        assert_eq!(editor.field, clock::ClockField::Minute);

        tap(&mut menu, KeyCode::Char('x'), &mut now);
        assert!(menu.clock_editor.is_none());
        let saved = Settings::load(&dir.join("settings.ini")).unwrap();
        assert_eq!(saved.time_offset_seconds, menu.settings.time_offset_seconds);
        let shown = saved.adjusted_time();
        assert_eq!((chrono::Timelike::hour(&shown), chrono::Timelike::minute(&shown)), (editor.hour, editor.minute));

        let offset = menu.settings.time_offset_seconds;
        tap(&mut menu, KeyCode::Up, &mut now);
        tap(&mut menu, KeyCode::Down, &mut now);
        tap(&mut menu, KeyCode::Char('z'), &mut now);
        assert!(menu.clock_editor.is_none());
        assert_eq!(menu.settings.time_offset_seconds, offset);
        // B closed the editor without leaving the directory
        assert_eq!(menu.browser.current_path(), dir.as_path());

        let mut canvas = Canvas::new(Display::WIDTH, Display::TOP_HEIGHT);
        tap(&mut menu, KeyCode::Up, &mut now);
        menu.draw_top(&mut canvas);
        let mut out: Vec<u8> = Vec::new();
        canvas.render(&mut out, 0).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Date & Time"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_filter_toggle_shows_other_files() {
        let dir = scratch_dir("filter");
        fs::write(dir.join("readme.txt"), b"hi").unwrap();
        let mut menu = menu_in(&dir);
        let mut now = Instant::now();
        assert_eq!(menu.grid.item_count(), 1);
        tap(&mut menu, KeyCode::Backspace, &mut now);
        assert_eq!(menu.grid.item_count(), 2);
        fs::remove_dir_all(&dir).unwrap();
    }
}
