use std::str::FromStr;

use enigo::{
    Axis, Button, Coordinate,
    Direction::{Click, Press, Release},
    Enigo, Key, Keyboard, Mouse, Settings,
};

use crate::errors::{ScreenPilotError, ScreenPilotResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Double,
}

impl FromStr for MouseButton {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(MouseButton::Left),
            "right" => Ok(MouseButton::Right),
            "double" => Ok(MouseButton::Double),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for MouseButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Double => "double",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl FromStr for ScrollDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(ScrollDirection::Up),
            "down" => Ok(ScrollDirection::Down),
            "left" => Ok(ScrollDirection::Left),
            "right" => Ok(ScrollDirection::Right),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
            ScrollDirection::Left => "left",
            ScrollDirection::Right => "right",
        };
        f.write_str(s)
    }
}

/// Single seam to the OS input layer. The executor is the only caller, so
/// dry-run gating and validation happen before any implementation runs.
pub trait InputBackend: Send {
    fn click(&mut self, x: i32, y: i32, button: MouseButton) -> ScreenPilotResult<()>;
    fn move_to(&mut self, x: i32, y: i32) -> ScreenPilotResult<()>;
    fn drag(&mut self, from: (i32, i32), to: (i32, i32)) -> ScreenPilotResult<()>;
    fn type_text(&mut self, text: &str) -> ScreenPilotResult<()>;
    fn press_key(&mut self, key: &str) -> ScreenPilotResult<()>;
    fn hotkey(&mut self, keys: &[String]) -> ScreenPilotResult<()>;
    fn scroll(&mut self, direction: ScrollDirection, amount: i32) -> ScreenPilotResult<()>;
}

/// True if `name` is in the supported key-name vocabulary. Kept next to the
/// enigo mapping so the validator and the backend cannot drift apart.
pub fn is_supported_key(name: &str) -> bool {
    parse_key(name).is_some()
}

fn parse_key(name: &str) -> Option<Key> {
    let lower = name.to_ascii_lowercase();
    let key = match lower.as_str() {
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "esc" | "escape" => Key::Escape,
        "space" => Key::Space,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" => Key::PageUp,
        "pagedown" => Key::PageDown,
        "ctrl" | "control" => Key::Control,
        "alt" => Key::Alt,
        "shift" => Key::Shift,
        "meta" | "cmd" | "win" | "super" => Key::Meta,
        "capslock" => Key::CapsLock,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        _ => {
            let mut chars = lower.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_graphic() => Key::Unicode(c),
                _ => return None,
            }
        }
    };
    Some(key)
}

/// Backend for dry-run sessions. The executor short-circuits before the
/// backend in dry-run mode, so every call landing here is a gating bug and
/// fails loudly instead of touching the OS.
pub struct DisconnectedBackend;

impl DisconnectedBackend {
    fn refuse(&self) -> ScreenPilotResult<()> {
        Err(ScreenPilotError::Input(
            "input backend called in dry-run mode".into(),
        ))
    }
}

impl InputBackend for DisconnectedBackend {
    fn click(&mut self, _x: i32, _y: i32, _button: MouseButton) -> ScreenPilotResult<()> {
        self.refuse()
    }
    fn move_to(&mut self, _x: i32, _y: i32) -> ScreenPilotResult<()> {
        self.refuse()
    }
    fn drag(&mut self, _from: (i32, i32), _to: (i32, i32)) -> ScreenPilotResult<()> {
        self.refuse()
    }
    fn type_text(&mut self, _text: &str) -> ScreenPilotResult<()> {
        self.refuse()
    }
    fn press_key(&mut self, _key: &str) -> ScreenPilotResult<()> {
        self.refuse()
    }
    fn hotkey(&mut self, _keys: &[String]) -> ScreenPilotResult<()> {
        self.refuse()
    }
    fn scroll(&mut self, _direction: ScrollDirection, _amount: i32) -> ScreenPilotResult<()> {
        self.refuse()
    }
}

/// Physical input simulation via enigo; enigo is not designed for
/// concurrent access. Pacing between keystrokes belongs to the executor,
/// so every call here returns as fast as the OS allows.
pub struct EnigoBackend {
    enigo: Enigo,
}

impl EnigoBackend {
    pub fn new() -> ScreenPilotResult<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| ScreenPilotError::Input(format!("failed to initialise enigo: {e}")))?;
        Ok(Self { enigo })
    }

    fn map_err<E: std::fmt::Display>(e: E) -> ScreenPilotError {
        ScreenPilotError::Input(e.to_string())
    }
}

impl InputBackend for EnigoBackend {
    fn click(&mut self, x: i32, y: i32, button: MouseButton) -> ScreenPilotResult<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(Self::map_err)?;
        match button {
            MouseButton::Left => self.enigo.button(Button::Left, Click).map_err(Self::map_err),
            MouseButton::Right => self
                .enigo
                .button(Button::Right, Click)
                .map_err(Self::map_err),
            MouseButton::Double => {
                self.enigo
                    .button(Button::Left, Click)
                    .map_err(Self::map_err)?;
                self.enigo.button(Button::Left, Click).map_err(Self::map_err)
            }
        }
    }

    fn move_to(&mut self, x: i32, y: i32) -> ScreenPilotResult<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(Self::map_err)
    }

    fn drag(&mut self, from: (i32, i32), to: (i32, i32)) -> ScreenPilotResult<()> {
        self.enigo
            .move_mouse(from.0, from.1, Coordinate::Abs)
            .map_err(Self::map_err)?;
        self.enigo
            .button(Button::Left, Press)
            .map_err(Self::map_err)?;
        self.enigo
            .move_mouse(to.0, to.1, Coordinate::Abs)
            .map_err(Self::map_err)?;
        self.enigo
            .button(Button::Left, Release)
            .map_err(Self::map_err)
    }

    fn type_text(&mut self, text: &str) -> ScreenPilotResult<()> {
        for c in text.chars() {
            self.enigo
                .key(Key::Unicode(c), Click)
                .map_err(Self::map_err)?;
        }
        Ok(())
    }

    fn press_key(&mut self, key: &str) -> ScreenPilotResult<()> {
        let parsed = parse_key(key)
            .ok_or_else(|| ScreenPilotError::Input(format!("unsupported key: {key}")))?;
        self.enigo.key(parsed, Click).map_err(Self::map_err)
    }

    fn hotkey(&mut self, keys: &[String]) -> ScreenPilotResult<()> {
        let mut parsed = Vec::with_capacity(keys.len());
        for key in keys {
            parsed.push(
                parse_key(key)
                    .ok_or_else(|| ScreenPilotError::Input(format!("unsupported key: {key}")))?,
            );
        }
        for key in &parsed {
            self.enigo.key(*key, Press).map_err(Self::map_err)?;
        }
        for key in parsed.iter().rev() {
            self.enigo.key(*key, Release).map_err(Self::map_err)?;
        }
        Ok(())
    }

    fn scroll(&mut self, direction: ScrollDirection, amount: i32) -> ScreenPilotResult<()> {
        let (axis, delta) = match direction {
            ScrollDirection::Up => (Axis::Vertical, -amount),
            ScrollDirection::Down => (Axis::Vertical, amount),
            ScrollDirection::Left => (Axis::Horizontal, -amount),
            ScrollDirection::Right => (Axis::Horizontal, amount),
        };
        self.enigo.scroll(delta, axis).map_err(Self::map_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_vocabulary_covers_named_and_single_char_keys() {
        for name in ["enter", "Escape", "ctrl", "f12", "a", "7", "/"] {
            assert!(is_supported_key(name), "{name} should be supported");
        }
        for name in ["", "notakey", "f13", "ab"] {
            assert!(!is_supported_key(name), "{name} should be rejected");
        }
    }

    #[test]
    fn direction_and_button_parse_round_trip() {
        assert_eq!("down".parse::<ScrollDirection>(), Ok(ScrollDirection::Down));
        assert!("diagonal".parse::<ScrollDirection>().is_err());
        assert_eq!("Double".parse::<MouseButton>(), Ok(MouseButton::Double));
        assert!("middle".parse::<MouseButton>().is_err());
    }
}
