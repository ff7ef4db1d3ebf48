use std::{
    fmt::Write as _,
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, NaiveDate, TimeDelta, Timelike};
use log::{info, warn};

use super::banner::Language;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("{0} is not a valid local date and time")]
    InvalidDate(String),
}

/// Persisted launcher settings, stored as `key=value` lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub show_fps: bool,
    pub title_language: Language,
    pub user_name: String,
    pub top_wallpaper_path: String,
    pub bottom_wallpaper_path: String,
    /// Offset from system time applied to the on-screen clock
    pub time_offset_seconds: i64,
    pub emulator_command: String,
    pub emulator_log: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            show_fps: true,
            title_language: Language::English,
            user_name: String::from("Crab"),
            top_wallpaper_path: String::new(),
            bottom_wallpaper_path: String::new(),
            time_offset_seconds: 0,
            emulator_command: String::from("start_drastic.sh"),
            emulator_log: std::env::temp_dir().join("drastic.log"),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    value == "1" || value == "true"
}

impl Settings {
    /// Reads settings from `path`. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Settings, SettingsError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Settings::parse(&text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("no settings at {}, using defaults", path.display());
                Ok(Settings::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        fs::write(path, self.to_ini())?;
        info!("settings saved to {}", path.display());
        Ok(())
    }

    /// Unknown keys and malformed lines are skipped; a bad value keeps
    /// the default for its key.
    pub fn parse(text: &str) -> Settings {
        let mut settings = Settings::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            if let Err(err) = settings.apply(key.trim(), value.trim()) {
                warn!("ignoring setting: {err}");
            }
        }
        settings
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "showFPS" => self.show_fps = parse_bool(value),
            "titleLanguage" => {
                let index: i32 = value.parse().map_err(|_| invalid())?;
                self.title_language = Language::from_index(index);
            }
            "userName" => self.user_name = value.to_string(),
            "topWallpaperPath" => self.top_wallpaper_path = value.to_string(),
            "bottomWallpaperPath" => self.bottom_wallpaper_path = value.to_string(),
            "timeOffsetSeconds" => {
                self.time_offset_seconds = value.parse().map_err(|_| invalid())?;
            }
            "emulatorCommand" => self.emulator_command = value.to_string(),
            "emulatorLog" => self.emulator_log = PathBuf::from(value),
            _ => {}
        }
        Ok(())
    }

    pub fn to_ini(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = writeln!(out, "showFPS={}", if self.show_fps { 1 } else { 0 });
        let _ = writeln!(out, "titleLanguage={}", usize::from(self.title_language));
        let _ = writeln!(out, "userName={}", self.user_name);
        let _ = writeln!(out, "topWallpaperPath={}", self.top_wallpaper_path);
        let _ = writeln!(out, "bottomWallpaperPath={}", self.bottom_wallpaper_path);
        let _ = writeln!(out, "timeOffsetSeconds={}", self.time_offset_seconds);
        let _ = writeln!(out, "emulatorCommand={}", self.emulator_command);
        let _ = writeln!(out, "emulatorLog={}", self.emulator_log.display());
        out
    }

    pub fn adjusted_time(&self) -> DateTime<Local> {
        Local::now() + TimeDelta::seconds(self.time_offset_seconds)
    }

    /// Makes the clock show the given local date and time from now on.
    pub fn set_time_offset(
        &mut self,
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
    ) -> Result<(), SettingsError> {
        let describe = || format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}");
        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .ok_or_else(|| SettingsError::InvalidDate(describe()))?;
        let target = naive
            .and_local_timezone(Local)
            .earliest()
            .ok_or_else(|| SettingsError::InvalidDate(describe()))?;

        // whole seconds, so the clock never shows the minute before the target
        let now = Local::now();
        let now = now.with_nanosecond(0).unwrap_or(now);
        self.time_offset_seconds = (target - now).num_seconds();
        Ok(())
    }
}
