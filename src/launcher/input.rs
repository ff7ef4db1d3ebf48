use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

/// Handheld buttons. The keyboard layout follows the usual emulator
/// convention of x/z for A/B and q/w for the shoulders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Right,
    Left,
    Up,
    Down,
    R,
    L,
    X,
    Y,
}

impl Button {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char('x') => Some(Button::A),
            KeyCode::Char('z') => Some(Button::B),
            KeyCode::Enter => Some(Button::Start),
            KeyCode::Backspace => Some(Button::Select),
            KeyCode::Right => Some(Button::Right),
            KeyCode::Left => Some(Button::Left),
            KeyCode::Up => Some(Button::Up),
            KeyCode::Down => Some(Button::Down),
            KeyCode::Char('w') => Some(Button::R),
            KeyCode::Char('q') => Some(Button::L),
            KeyCode::Char('a') => Some(Button::X),
            KeyCode::Char('s') => Some(Button::Y),
            _ => None,
        }
    }
}

impl From<Button> for u16 {
    fn from(value: Button) -> Self {
        match value {
            Button::A => 1 << 0,
            Button::B => 1 << 1,
            Button::Select => 1 << 2,
            Button::Start => 1 << 3,
            Button::Right => 1 << 4,
            Button::Left => 1 << 5,
            Button::Up => 1 << 6,
            Button::Down => 1 << 7,
            Button::R => 1 << 8,
            Button::L => 1 << 9,
            Button::X => 1 << 10,
            Button::Y => 1 << 11,
        }
    }
}

/// True for the keys that leave the launcher.
pub fn is_quit_key(code: KeyCode) -> bool {
    matches!(code, KeyCode::Esc | KeyCode::Char('Q'))
}

/// Per-frame button state built from terminal key events.
///
/// Terminals rarely report key releases, so a key counts as held until
/// `HOLD_GRACE` after its last press or repeat event, or until an explicit
/// release arrives.
#[derive(Debug, Default)]
pub struct InputState {
    held_until: HashMap<Button, Instant>,
    held: u16,
    down: u16,
    up: u16,
}

impl InputState {
    const HOLD_GRACE: Duration = Duration::from_millis(75);

    pub fn new() -> InputState {
        InputState::default()
    }

    pub fn handle_key(&mut self, event: KeyEvent, now: Instant) {
        let Some(button) = Button::from_key(event.code) else {
            return;
        };
        if event.kind == KeyEventKind::Release {
            self.held_until.remove(&button);
        } else {
            self.held_until.insert(button, now + Self::HOLD_GRACE);
        }
    }

    /// Latches the state for this frame.
    pub fn update(&mut self, now: Instant) {
        self.held_until.retain(|_, until| *until > now);
        let held = self
            .held_until
            .keys()
            .fold(0u16, |mask, &button| mask | u16::from(button));

        self.down = held & !self.held;
        self.up = self.held & !held;
        self.held = held;
    }

    pub fn is_held(&self, button: Button) -> bool {
        self.held & u16::from(button) != 0
    }

    pub fn just_pressed(&self, button: Button) -> bool {
        self.down & u16::from(button) != 0
    }

    pub fn just_released(&self, button: Button) -> bool {
        self.up & u16::from(button) != 0
    }
}
