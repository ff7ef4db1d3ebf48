use std::io::{self, Stdout, Write, stdout};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};

use super::banner::{DecodedIcon, ICON_SIZE};

pub type Rgb = [u8; 3];

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb[0],
        g: rgb[1],
        b: rgb[2],
    }
}

/// Terminal cells taken by `c`. Banner titles are BMP only, so the wide
/// East Asian blocks below cover them.
fn cell_width(c: char) -> usize {
    match c as u32 {
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6 => 2,
        _ => 1,
    }
}

fn text_width(text: &str) -> usize {
    text.chars().map(cell_width).sum()
}

#[derive(Debug, Clone, PartialEq)]
struct Label {
    col: usize,
    row: usize,
    text: String,
    color: Rgb,
}

/// Pixel buffer drawn to the terminal two pixel rows per character row.
/// Text is kept as separate labels laid over the pixels.
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
    labels: Vec<Label>,
}

impl Canvas {
    const UPPER_HALF_BLOCK: char = '▀';

    pub fn new(width: usize, height: usize) -> Canvas {
        return Canvas {
            width,
            height,
            pixels: vec![[0; 3]; width * height],
            labels: Vec::new(),
        };
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Terminal rows needed to show the canvas.
    pub fn rows(&self) -> usize {
        self.height.div_ceil(2)
    }

    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y * self.width + x]
    }

    pub fn clear(&mut self, color: Rgb) {
        self.pixels.fill(color);
        self.labels.clear();
    }

    fn put(&mut self, x: i32, y: i32, color: Rgb) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        self.pixels[y as usize * self.width + x as usize] = color;
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) {
        for py in y..y + h {
            for px in x..x + w {
                self.put(px, py, color);
            }
        }
    }

    pub fn stroke_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) {
        if w <= 0 || h <= 0 {
            return;
        }
        for px in x..x + w {
            self.put(px, y, color);
            self.put(px, y + h - 1, color);
        }
        for py in y..y + h {
            self.put(x, py, color);
            self.put(x + w - 1, py, color);
        }
    }

    /// Draws `icon` at half size (16x16). Each 2x2 block averages its
    /// opaque pixels; a fully transparent block keeps the background.
    pub fn blit_icon(&mut self, icon: &DecodedIcon, x: i32, y: i32) {
        let half = ICON_SIZE / 2;
        for dy in 0..half {
            for dx in 0..half {
                let mut sum = [0u32; 3];
                let mut opaque = 0;
                for (sx, sy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let [r, g, b, a] = icon.pixel(dx * 2 + sx, dy * 2 + sy);
                    if a != 0 {
                        sum[0] += r as u32;
                        sum[1] += g as u32;
                        sum[2] += b as u32;
                        opaque += 1;
                    }
                }
                if opaque == 0 {
                    continue;
                }
                let color = sum.map(|c| (c / opaque) as u8);
                self.put(x + dx as i32, y + dy as i32, color);
            }
        }
    }

    pub fn blit_glyph(&mut self, glyph: &Glyph, x: i32, y: i32) {
        for gy in 0..glyph.height {
            for gx in 0..glyph.width {
                if let Some(color) = glyph.pixels[gy * glyph.width + gx] {
                    self.put(x + gx as i32, y + gy as i32, color);
                }
            }
        }
    }

    /// Places a label, clipped to the canvas by terminal cells. Control
    /// characters become spaces so nothing moves the cursor.
    pub fn text(&mut self, col: usize, row: usize, text: &str, color: Rgb) {
        let max = self.width.saturating_sub(col);
        let mut used = 0;
        let mut clipped = String::new();
        for c in text.chars() {
            let c = if c.is_control() { ' ' } else { c };
            used += cell_width(c);
            if used > max {
                break;
            }
            clipped.push(c);
        }
        let text = clipped;
        if row < self.rows() && !text.is_empty() {
            self.labels.push(Label {
                col,
                row,
                text,
                color,
            });
        }
    }

    pub fn text_centered(&mut self, row: usize, text: &str, color: Rgb) {
        let len = text_width(text);
        let col = self.width.saturating_sub(len) / 2;
        self.text(col, row, text, color);
    }

    pub fn text_right(&mut self, row: usize, text: &str, color: Rgb) {
        let len = text_width(text);
        self.text(self.width.saturating_sub(len + 1), row, text, color);
    }

    /// Writes the canvas with its top-left corner at terminal row `origin`.
    pub fn render<W: Write>(&self, out: &mut W, origin: u16) -> io::Result<()> {
        let mut last: Option<(Rgb, Rgb)> = None;
        for row in 0..self.rows() {
            queue!(out, MoveTo(0, origin + row as u16))?;
            for x in 0..self.width {
                let upper = self.pixel(x, row * 2);
                let lower = if row * 2 + 1 < self.height {
                    self.pixel(x, row * 2 + 1)
                } else {
                    [0; 3]
                };
                if last != Some((upper, lower)) {
                    queue!(
                        out,
                        SetForegroundColor(to_color(upper)),
                        SetBackgroundColor(to_color(lower))
                    )?;
                    last = Some((upper, lower));
                }
                queue!(out, Print(Self::UPPER_HALF_BLOCK))?;
            }
        }

        for label in &self.labels {
            let background = self.pixel(label.col.min(self.width - 1), label.row * 2);
            queue!(
                out,
                MoveTo(label.col as u16, origin + label.row as u16),
                SetForegroundColor(to_color(label.color)),
                SetBackgroundColor(to_color(background)),
                Print(&label.text)
            )?;
        }
        queue!(out, ResetColor)?;
        Ok(())
    }
}

/// Small placeholder image parsed from text art. `.` and spaces are
/// transparent, letters pick a colour from the legend.
pub struct Glyph {
    width: usize,
    height: usize,
    pixels: Vec<Option<Rgb>>,
}

impl Glyph {
    fn legend(c: char) -> Option<Rgb> {
        match c {
            'y' => Some([240, 220, 160]),
            'o' => Some([220, 200, 140]),
            'd' => Some([180, 160, 100]),
            'w' => Some([255, 255, 255]),
            'g' => Some([150, 150, 150]),
            'k' => Some([40, 40, 40]),
            'b' => Some([100, 150, 255]),
            'r' => Some([220, 60, 60]),
            _ => None,
        }
    }

    pub fn parse(art: &str) -> Glyph {
        let lines: Vec<&str> = art.lines().filter(|l| !l.trim().is_empty()).collect();
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let height = lines.len();
        let mut pixels = vec![None; width * height];
        for (y, line) in lines.iter().enumerate() {
            for (x, c) in line.chars().enumerate() {
                pixels[y * width + x] = Self::legend(c);
            }
        }
        Glyph {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

/// Terminal session showing the two screens stacked with a hinge row
/// between them. Dropping it restores the terminal.
pub struct Display {
    pub top: Canvas,
    pub bottom: Canvas,
    out: Stdout,
}

impl Display {
    pub const WIDTH: usize = 128;
    pub const TOP_HEIGHT: usize = 40;
    pub const BOTTOM_HEIGHT: usize = 48;
    const HINGE: char = '─';
    const HINGE_COLOR: Rgb = [90, 90, 90];

    pub fn new() -> io::Result<Display> {
        enable_raw_mode()?;
        let mut out = stdout();
        execute!(out, EnterAlternateScreen, Clear(ClearType::All), Hide)?;

        Ok(Display {
            top: Canvas::new(Self::WIDTH, Self::TOP_HEIGHT),
            bottom: Canvas::new(Self::WIDTH, Self::BOTTOM_HEIGHT),
            out,
        })
    }

    /// Forces a full repaint, e.g. after the terminal was resized.
    pub fn invalidate(&mut self) -> io::Result<()> {
        execute!(self.out, Clear(ClearType::All))
    }

    pub fn present(&mut self) -> io::Result<()> {
        self.top.render(&mut self.out, 0)?;
        let hinge_row = self.top.rows() as u16;
        let hinge: String = std::iter::repeat_n(Self::HINGE, self.top.width()).collect();
        queue!(
            self.out,
            MoveTo(0, hinge_row),
            SetForegroundColor(to_color(Self::HINGE_COLOR)),
            Print(hinge),
            ResetColor
        )?;
        self.bottom.render(&mut self.out, hinge_row + 1)?;
        self.out.flush()
    }

    fn unwind(&mut self) {
        let _ = execute!(self.out, ResetColor, LeaveAlternateScreen, Show);
        let _ = disable_raw_mode();
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        self.unwind();
    }
}
