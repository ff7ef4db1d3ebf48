use std::{
    cmp::Ordering,
    fs, io,
    path::{Path, PathBuf},
};

use log::{info, warn};

use super::banner::{self, Language};

const CARTRIDGE_EXTENSIONS: [&str; 6] = [".nds", ".dsi", ".ids", ".srl", ".app", ".argv"];

pub fn is_cartridge_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    CARTRIDGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    /// Banner title for cartridges, otherwise the file name
    pub title: String,
    pub is_directory: bool,
    /// The synthetic ".." entry
    pub is_parent: bool,
    pub size: u64,
}

impl FileEntry {
    fn parent() -> FileEntry {
        FileEntry {
            name: String::from(".."),
            path: PathBuf::from(".."),
            title: String::from(".."),
            is_directory: true,
            is_parent: true,
            size: 0,
        }
    }

    pub fn is_cartridge(&self) -> bool {
        !self.is_directory && is_cartridge_file(&self.name)
    }
}

/// Parent first, then directories, then by name.
fn compare_entries(a: &FileEntry, b: &FileEntry) -> Ordering {
    b.is_parent
        .cmp(&a.is_parent)
        .then(b.is_directory.cmp(&a.is_directory))
        .then_with(|| a.name.cmp(&b.name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    All,
    CartridgesOnly,
}

pub struct FileBrowser {
    current: PathBuf,
    entries: Vec<FileEntry>,
    filter: FilterMode,
    language: Language,
}

impl FileBrowser {
    /// Lists `start` right away. An unreadable start directory yields an
    /// empty listing rather than an error.
    pub fn new(start: &Path, filter: FilterMode, language: Language) -> FileBrowser {
        let mut browser = FileBrowser {
            current: start.to_path_buf(),
            entries: Vec::new(),
            filter,
            language,
        };
        browser.refresh();
        browser
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn entry(&self, index: i32) -> Option<&FileEntry> {
        usize::try_from(index).ok().and_then(|i| self.entries.get(i))
    }

    pub fn current_path(&self) -> &Path {
        &self.current
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
        self.refresh();
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn set_filter(&mut self, filter: FilterMode) {
        self.filter = filter;
        self.refresh();
    }

    fn at_top(&self) -> bool {
        self.current == Path::new(".") || self.current.parent().is_none()
    }

    pub fn refresh(&mut self) {
        self.entries.clear();
        match self.list() {
            Ok(entries) => self.entries = entries,
            Err(err) => warn!("cannot list {}: {err}", self.current.display()),
        }
    }

    fn list(&self) -> io::Result<Vec<FileEntry>> {
        let mut entries = Vec::new();
        if !self.at_top() {
            entries.push(FileEntry::parent());
        }

        for dir_entry in fs::read_dir(&self.current)? {
            let dir_entry = match dir_entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry in {}: {err}", self.current.display());
                    continue;
                }
            };
            let name = dir_entry.file_name().to_string_lossy().into_owned();
            let path = self.current.join(&name);
            let is_directory = dir_entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

            if is_directory {
                entries.push(FileEntry {
                    title: name.clone(),
                    name,
                    path,
                    is_directory,
                    is_parent: false,
                    size: 0,
                });
                continue;
            }

            let cartridge = is_cartridge_file(&name);
            if self.filter == FilterMode::CartridgesOnly && !cartridge {
                continue;
            }

            let size = dir_entry.metadata().map(|m| m.len()).unwrap_or(0);
            let title = if cartridge {
                banner::load_title(&path, self.language)
            } else {
                String::new()
            };
            entries.push(FileEntry {
                title: if title.is_empty() { name.clone() } else { title },
                name,
                path,
                is_directory,
                is_parent: false,
                size,
            });
        }

        entries.sort_by(compare_entries);
        Ok(entries)
    }

    /// Switches to `path` if it can be listed.
    pub fn change_directory(&mut self, path: &Path) -> bool {
        if let Err(err) = fs::read_dir(path) {
            warn!("cannot enter {}: {err}", path.display());
            return false;
        }
        info!("browsing {}", path.display());
        self.current = path.to_path_buf();
        self.refresh();
        true
    }

    pub fn enter_directory(&mut self, name: &str) -> bool {
        let target = if self.current == Path::new(".") {
            PathBuf::from(name)
        } else {
            self.current.join(name)
        };
        self.change_directory(&target)
    }

    pub fn go_up(&mut self) -> bool {
        match self.current.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                let parent = parent.to_path_buf();
                self.change_directory(&parent)
            }
            _ if self.current != Path::new(".") && self.current.parent().is_some() => {
                self.change_directory(Path::new("."))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::banner::{ICON_BYTES, TITLE_SLOTS, fixtures};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("crabmenu-browser-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn names(browser: &FileBrowser) -> Vec<&str> {
        browser.entries().iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_is_cartridge_file() {
        struct TestCase<'a> {
            name: &'a str,
            expected: bool,
        }
        let test_cases = vec![
            TestCase { name: "game.nds", expected: true },
            TestCase { name: "GAME.NDS", expected: true },
            TestCase { name: "menu.Dsi", expected: true },
            TestCase { name: "homebrew.argv", expected: true },
            TestCase { name: "title.srl", expected: true },
            TestCase { name: "wallpaper.png", expected: false },
            TestCase { name: "nds", expected: false },
            TestCase { name: "game.nds.bak", expected: false },
        ];
        for tc in test_cases {
            assert_eq!(is_cartridge_file(tc.name), tc.expected, "Testing {}", tc.name);
        }
    }

    #[test]
    fn test_listing_order_and_filter() {
        let dir = scratch_dir("order");
        fs::create_dir(dir.join("zeta")).unwrap();
        fs::create_dir(dir.join("alpha")).unwrap();
        fs::write(dir.join("b.nds"), b"not really a cartridge").unwrap();
        fs::write(dir.join("a.dsi"), b"").unwrap();
        fs::write(dir.join("notes.txt"), b"hello").unwrap();

        let mut browser = FileBrowser::new(&dir, FilterMode::CartridgesOnly, Language::English);
        assert_eq!(names(&browser), vec!["..", "alpha", "zeta", "a.dsi", "b.nds"]);
        // unreadable banners fall back to the file name
        assert_eq!(browser.entries()[4].title, "b.nds");
        assert_eq!(browser.entries()[4].size, 22);

        browser.set_filter(FilterMode::All);
        assert_eq!(names(&browser), vec!["..", "alpha", "zeta", "a.dsi", "b.nds", "notes.txt"]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_cartridge_titles_follow_language() {
        let dir = scratch_dir("titles");
        let titles = ["Jikken", "Experiment", "", "", "", "", "", ""];
        let image = fixtures::cartridge_image(&[0; ICON_BYTES], &[0; 16], &titles, TITLE_SLOTS);
        fs::write(dir.join("exp.nds"), image).unwrap();

        let mut browser = FileBrowser::new(&dir, FilterMode::CartridgesOnly, Language::English);
        let entry = browser.entries().iter().find(|e| e.name == "exp.nds").unwrap();
        assert_eq!(entry.title, "Experiment");
        assert!(entry.is_cartridge());

        browser.set_language(Language::Japanese);
        let entry = browser.entries().iter().find(|e| e.name == "exp.nds").unwrap();
        assert_eq!(entry.title, "Jikken");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_enter_and_go_up() {
        let dir = scratch_dir("nav");
        fs::create_dir(dir.join("roms")).unwrap();
        fs::write(dir.join("roms").join("x.nds"), b"").unwrap();

        let mut browser = FileBrowser::new(&dir, FilterMode::CartridgesOnly, Language::English);
        assert!(browser.enter_directory("roms"));
        assert_eq!(browser.current_path(), dir.join("roms"));
        assert_eq!(names(&browser), vec!["..", "x.nds"]);

        assert!(!browser.enter_directory("does-not-exist"));
        assert_eq!(browser.current_path(), dir.join("roms"));

        assert!(browser.go_up());
        assert_eq!(browser.current_path(), dir.as_path());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unreadable_directory_is_empty() {
        let missing = std::env::temp_dir().join(format!("crabmenu-browser-gone-{}", std::process::id()));
        let browser = FileBrowser::new(&missing, FilterMode::All, Language::English);
        assert!(browser.entries().is_empty());
        assert!(browser.entry(0).is_none());
        assert!(browser.entry(-1).is_none());
    }

    #[test]
    fn test_compare_entries() {
        let file = |name: &str| FileEntry {
            name: name.to_string(),
            path: PathBuf::from(name),
            title: name.to_string(),
            is_directory: false,
            is_parent: false,
            size: 0,
        };
        let mut dir = file("b");
        dir.is_directory = true;
        let mut entries = vec![file("a"), dir, FileEntry::parent(), file("C")];
        entries.sort_by(compare_entries);
        let sorted: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        // byte order puts uppercase first
        assert_eq!(sorted, vec!["..", "b", "C", "a"]);
    }
}
