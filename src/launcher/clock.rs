use chrono::{DateTime, Datelike, Local, Timelike};

use super::settings::{Settings, SettingsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

impl ClockField {
    const ORDER: [ClockField; 5] = [
        ClockField::Year,
        ClockField::Month,
        ClockField::Day,
        ClockField::Hour,
        ClockField::Minute,
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|&f| f == self).unwrap_or(0)
    }

    pub fn next(self) -> ClockField {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn previous(self) -> ClockField {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Date and time being edited for the on-screen clock. Each field wraps
/// on its own; the day is only checked against the month when applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockEditor {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub field: ClockField,
}

impl ClockEditor {
    const FIRST_YEAR: i32 = 2000;
    const LAST_YEAR: i32 = 2099;

    pub fn new(now: DateTime<Local>) -> ClockEditor {
        ClockEditor {
            year: now.year().clamp(Self::FIRST_YEAR, Self::LAST_YEAR),
            month: now.month(),
            day: now.day(),
            hour: now.hour(),
            minute: now.minute(),
            field: ClockField::Year,
        }
    }

    pub fn increment(&mut self) {
        match self.field {
            ClockField::Year => {
                self.year = if self.year >= Self::LAST_YEAR { Self::FIRST_YEAR } else { self.year + 1 }
            }
            ClockField::Month => self.month = self.month % 12 + 1,
            ClockField::Day => self.day = self.day % 31 + 1,
            ClockField::Hour => self.hour = (self.hour + 1) % 24,
            ClockField::Minute => self.minute = (self.minute + 1) % 60,
        }
    }

    pub fn decrement(&mut self) {
        match self.field {
            ClockField::Year => {
                self.year = if self.year <= Self::FIRST_YEAR { Self::LAST_YEAR } else { self.year - 1 }
            }
            ClockField::Month => self.month = if self.month <= 1 { 12 } else { self.month - 1 },
            ClockField::Day => self.day = if self.day <= 1 { 31 } else { self.day - 1 },
            ClockField::Hour => self.hour = (self.hour + 23) % 24,
            ClockField::Minute => self.minute = (self.minute + 59) % 60,
        }
    }

    pub fn next_field(&mut self) {
        self.field = self.field.next();
    }

    pub fn previous_field(&mut self) {
        self.field = self.field.previous();
    }

    /// Stores the edited time as the settings' clock offset.
    pub fn apply(&self, settings: &mut Settings) -> Result<(), SettingsError> {
        settings.set_time_offset(self.year, self.month, self.day, self.hour, self.minute)
    }

    /// `2026/[10]/19 08:30` with the field being edited in brackets.
    pub fn describe(&self) -> String {
        let mark = |field: ClockField, text: String| {
            if field == self.field { format!("[{text}]") } else { text }
        };
        format!(
            "{}/{}/{} {}:{}",
            mark(ClockField::Year, format!("{:04}", self.year)),
            mark(ClockField::Month, format!("{:02}", self.month)),
            mark(ClockField::Day, format!("{:02}", self.day)),
            mark(ClockField::Hour, format!("{:02}", self.hour)),
            mark(ClockField::Minute, format!("{:02}", self.minute)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn editor_at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> ClockEditor {
        let now = Local.with_ymd_and_hms(year, month, day, hour, minute, 0).earliest().unwrap();
        ClockEditor::new(now)
    }

    #[test]
    fn test_fields_wrap() {
        struct TestCase<'a> {
            name: &'a str,
            field: ClockField,
            up: bool,
            expected: (i32, u32, u32, u32, u32),
        }
        let test_cases = vec![
            TestCase { name: "year up", field: ClockField::Year, up: true, expected: (2025, 12, 31, 23, 59) },
            TestCase { name: "month up wraps", field: ClockField::Month, up: true, expected: (2024, 1, 31, 23, 59) },
            TestCase { name: "day up wraps", field: ClockField::Day, up: true, expected: (2024, 12, 1, 23, 59) },
            TestCase { name: "hour up wraps", field: ClockField::Hour, up: true, expected: (2024, 12, 31, 0, 59) },
            TestCase { name: "minute up wraps", field: ClockField::Minute, up: true, expected: (2024, 12, 31, 23, 0) },
            TestCase { name: "year down", field: ClockField::Year, up: false, expected: (2023, 12, 31, 23, 59) },
            TestCase { name: "month down", field: ClockField::Month, up: false, expected: (2024, 11, 31, 23, 59) },
            TestCase { name: "minute down", field: ClockField::Minute, up: false, expected: (2024, 12, 31, 23, 58) },
        ];
        for tc in test_cases {
            let mut editor = editor_at(2024, 12, 31, 23, 59);
            editor.field = tc.field;
            if tc.up {
                editor.increment();
            } else {
                editor.decrement();
            }
            let got = (editor.year, editor.month, editor.day, editor.hour, editor.minute);
            assert_eq!(got, tc.expected, "Testing {}", tc.name);
        }
    }

    #[test]
    fn test_low_values_wrap_down() {
        let mut editor = editor_at(2000, 1, 1, 0, 0);
        for field in ClockField::ORDER {
            editor.field = field;
            editor.decrement();
        }
        assert_eq!(
            (editor.year, editor.month, editor.day, editor.hour, editor.minute),
            (2099, 12, 31, 23, 59)
        );
        editor.field = ClockField::Year;
        editor.increment();
        assert_eq!(editor.year, 2000);
    }

    #[test]
    fn test_field_selection_cycles() {
        let mut editor = editor_at(2024, 6, 15, 12, 30);
        editor.previous_field();
        assert_eq!(editor.field, ClockField::Minute);
        editor.next_field();
        editor.next_field();
        assert_eq!(editor.field, ClockField::Month);
        assert_eq!(editor.describe(), "2024/[06]/15 12:30");
    }

    #[test]
    fn test_apply_moves_the_clock() {
        let mut editor = editor_at(2024, 6, 15, 12, 30);
        editor.year = 2031;
        let mut settings = Settings::default();
        editor.apply(&mut settings).unwrap();
        let shown = settings.adjusted_time();
        assert_eq!((shown.year(), shown.month(), shown.day()), (2031, 6, 15));
        assert_eq!((shown.hour(), shown.minute()), (12, 30));
    }

    #[test]
    fn test_apply_rejects_impossible_day() {
        let mut editor = editor_at(2023, 2, 28, 9, 0);
        editor.field = ClockField::Day;
        editor.increment();
        editor.increment();
        editor.increment();
        assert_eq!(editor.day, 31);
        let mut settings = Settings::default();
        assert!(matches!(editor.apply(&mut settings), Err(SettingsError::InvalidDate(_))));
        assert_eq!(settings.time_offset_seconds, 0);
    }
}
