use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{ActionFailure, FailureKind};
use crate::executor::input::MouseButton;

/// Closed set of primitive requests an instruction can resolve to.
/// Instruction text maps to exactly one variant or fails with
/// `UnrecognizedAction`; there is no guessed default.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    ClickAt {
        x: i32,
        y: i32,
        button: MouseButton,
    },
    ClickTarget {
        target: String,
        button: MouseButton,
    },
    MoveTo {
        x: i32,
        y: i32,
    },
    MoveTarget {
        target: String,
    },
    TypeText {
        text: String,
    },
    Scroll {
        direction: String,
        amount: Option<i32>,
    },
    PressKey {
        key: String,
    },
    Hotkey {
        keys: Vec<String>,
    },
    Drag {
        from: (i32, i32),
        to: (i32, i32),
    },
    Wait {
        seconds: f64,
    },
}

impl ActionRequest {
    /// Target description that still needs vision grounding, if any.
    pub fn grounding_target(&self) -> Option<&str> {
        match self {
            ActionRequest::ClickTarget { target, .. } | ActionRequest::MoveTarget { target } => {
                Some(target)
            }
            _ => None,
        }
    }

    /// One-line summary shown at the confirmation gate.
    pub fn describe(&self) -> String {
        match self {
            ActionRequest::ClickAt { x, y, button } => format!("{button}-click at ({x}, {y})"),
            ActionRequest::ClickTarget { target, button } => {
                format!("{button}-click on \"{target}\"")
            }
            ActionRequest::MoveTo { x, y } => format!("move to ({x}, {y})"),
            ActionRequest::MoveTarget { target } => format!("move to \"{target}\""),
            ActionRequest::TypeText { text } => format!("type {text:?}"),
            ActionRequest::Scroll { direction, amount } => match amount {
                Some(n) => format!("scroll {direction} by {n}"),
                None => format!("scroll {direction}"),
            },
            ActionRequest::PressKey { key } => format!("press {key}"),
            ActionRequest::Hotkey { keys } => format!("press {}", keys.join("+")),
            ActionRequest::Drag { from, to } => format!(
                "drag from ({}, {}) to ({}, {})",
                from.0, from.1, to.0, to.1
            ),
            ActionRequest::Wait { seconds } => format!("wait {seconds}s"),
        }
    }
}

fn coords_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\(?\s*(-?\d+)\s*[,\s]\s*(-?\d+)\s*\)?$").expect("static regex")
    })
}

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["'](.*?)["']"#).expect("static regex"))
}

fn drag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(-?\d+)[,\s]+(-?\d+)\s+to\s+(-?\d+)[,\s]+(-?\d+)$").expect("static regex")
    })
}

fn unrecognized(instruction: &str, why: &str) -> ActionFailure {
    ActionFailure::new(
        FailureKind::UnrecognizedAction,
        format!("cannot interpret {instruction:?}: {why}"),
    )
}

fn parse_coords(rest: &str) -> Option<(i32, i32)> {
    let caps = coords_re().captures(rest)?;
    let x = caps[1].parse().ok()?;
    let y = caps[2].parse().ok()?;
    Some((x, y))
}

/// Strips filler words between the verb and its object.
fn strip_filler(rest: &str) -> &str {
    let mut rest = rest.trim();
    for filler in ["on ", "at ", "the "] {
        if let Some(stripped) = rest.strip_prefix(filler) {
            rest = stripped.trim();
        }
    }
    rest
}

/// Recovers the original-cased tail of `text` matching `rest`, a suffix of
/// its lowercased form. Falls back to `rest` when lowercasing changed byte
/// lengths (non-ASCII) and the offset is unreliable.
fn original_tail(text: &str, lower: &str, rest: &str) -> String {
    let offset = lower.len() - rest.len();
    match text.get(offset..) {
        Some(tail) => strip_filler(tail.trim()).to_string(),
        None => rest.to_string(),
    }
}

/// Strips `verb` from the front of `lower`, requiring a word boundary so
/// e.g. "clickety" does not parse as a click.
fn verb_rest<'a>(lower: &'a str, verb: &str) -> Option<&'a str> {
    let rest = lower.strip_prefix(verb)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Maps one instruction to exactly one [`ActionRequest`].
pub fn parse_instruction(instruction: &str) -> Result<ActionRequest, ActionFailure> {
    let text = instruction.trim();
    if text.is_empty() {
        return Err(unrecognized(instruction, "empty instruction"));
    }
    let lower = text.to_lowercase();

    // Click family: the verb fixes the button.
    for (prefix, button) in [
        ("double click", MouseButton::Double),
        ("double-click", MouseButton::Double),
        ("right click", MouseButton::Right),
        ("right-click", MouseButton::Right),
        ("click", MouseButton::Left),
    ] {
        if let Some(rest) = verb_rest(&lower, prefix) {
            let rest = strip_filler(rest);
            if rest.is_empty() {
                return Err(unrecognized(instruction, "click needs a target or coordinates"));
            }
            if let Some((x, y)) = parse_coords(rest) {
                return Ok(ActionRequest::ClickAt { x, y, button });
            }
            let target = original_tail(text, &lower, rest);
            return Ok(ActionRequest::ClickTarget { target, button });
        }
    }

    if let Some(rest) = verb_rest(&lower, "move") {
        let rest = strip_filler(verb_rest(rest, "to").unwrap_or(rest));
        if rest.is_empty() {
            return Err(unrecognized(instruction, "move needs a target or coordinates"));
        }
        if let Some((x, y)) = parse_coords(rest) {
            return Ok(ActionRequest::MoveTo { x, y });
        }
        let target = original_tail(text, &lower, rest);
        return Ok(ActionRequest::MoveTarget { target });
    }

    if let Some(rest) = verb_rest(&lower, "type") {
        // Prefer quoted text; otherwise everything after the verb.
        let text_to_type = if let Some(caps) = quoted_re().captures(text) {
            caps[1].to_string()
        } else {
            let offset = lower.len() - rest.len();
            text.get(offset..).unwrap_or(rest).trim().to_string()
        };
        return Ok(ActionRequest::TypeText { text: text_to_type });
    }

    if let Some(rest) = verb_rest(&lower, "scroll") {
        let mut words = rest.split_whitespace();
        let direction = words.next().unwrap_or("down").to_string();
        let amount = match words.next() {
            Some(word) => Some(word.parse::<i32>().map_err(|_| {
                unrecognized(instruction, "scroll amount must be an integer")
            })?),
            None => None,
        };
        return Ok(ActionRequest::Scroll { direction, amount });
    }

    if let Some(rest) = verb_rest(&lower, "hotkey")
        .or_else(|| verb_rest(&lower, "press").filter(|rest| rest.contains('+')))
    {
        let keys: Vec<String> = rest
            .split(['+', ' '])
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        if keys.is_empty() {
            return Err(unrecognized(instruction, "hotkey needs at least one key"));
        }
        return Ok(ActionRequest::Hotkey { keys });
    }

    if let Some(rest) = verb_rest(&lower, "press") {
        let key = rest.to_string();
        if key.is_empty() {
            return Err(unrecognized(instruction, "press needs a key name"));
        }
        return Ok(ActionRequest::PressKey { key });
    }

    if let Some(rest) = verb_rest(&lower, "drag") {
        let rest = verb_rest(rest, "from").unwrap_or(rest);
        if let Some(caps) = drag_re().captures(rest) {
            // A coordinate that overflows i32 is rejected, not guessed at.
            let mut nums = [0i32; 4];
            for (slot, group) in nums.iter_mut().zip(1..=4) {
                *slot = caps[group].parse::<i32>().map_err(|_| {
                    unrecognized(instruction, "drag coordinate out of range")
                })?;
            }
            return Ok(ActionRequest::Drag {
                from: (nums[0], nums[1]),
                to: (nums[2], nums[3]),
            });
        }
        return Err(unrecognized(instruction, "expected: drag X1 Y1 to X2 Y2"));
    }

    if let Some(rest) = verb_rest(&lower, "wait") {
        let word = rest.split_whitespace().next().unwrap_or("");
        let seconds = word
            .parse::<f64>()
            .map_err(|_| unrecognized(instruction, "wait needs a number of seconds"))?;
        return Ok(ActionRequest::Wait { seconds });
    }

    Err(unrecognized(
        instruction,
        "expected a click/move/type/scroll/press/hotkey/drag/wait instruction",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_with_coordinates() {
        assert_eq!(
            parse_instruction("click 500, 300").unwrap(),
            ActionRequest::ClickAt {
                x: 500,
                y: 300,
                button: MouseButton::Left
            }
        );
        assert_eq!(
            parse_instruction("click at (10, 20)").unwrap(),
            ActionRequest::ClickAt {
                x: 10,
                y: 20,
                button: MouseButton::Left
            }
        );
    }

    #[test]
    fn click_with_target_keeps_original_casing() {
        assert_eq!(
            parse_instruction("Click the Submit button").unwrap(),
            ActionRequest::ClickTarget {
                target: "Submit button".into(),
                button: MouseButton::Left
            }
        );
    }

    #[test]
    fn click_verbs_fix_the_button() {
        assert!(matches!(
            parse_instruction("double click the file icon").unwrap(),
            ActionRequest::ClickTarget {
                button: MouseButton::Double,
                ..
            }
        ));
        assert!(matches!(
            parse_instruction("right-click 40 40").unwrap(),
            ActionRequest::ClickAt {
                button: MouseButton::Right,
                ..
            }
        ));
    }

    #[test]
    fn bare_click_is_rejected() {
        let err = parse_instruction("click").unwrap_err();
        assert_eq!(err.kind, FailureKind::UnrecognizedAction);
    }

    #[test]
    fn type_prefers_quoted_text() {
        assert_eq!(
            parse_instruction("type 'hello world' into the box").unwrap(),
            ActionRequest::TypeText {
                text: "hello world".into()
            }
        );
        assert_eq!(
            parse_instruction("type hello").unwrap(),
            ActionRequest::TypeText {
                text: "hello".into()
            }
        );
    }

    #[test]
    fn scroll_with_and_without_amount() {
        assert_eq!(
            parse_instruction("scroll down 5").unwrap(),
            ActionRequest::Scroll {
                direction: "down".into(),
                amount: Some(5)
            }
        );
        assert_eq!(
            parse_instruction("scroll up").unwrap(),
            ActionRequest::Scroll {
                direction: "up".into(),
                amount: None
            }
        );
        assert_eq!(
            parse_instruction("scroll").unwrap(),
            ActionRequest::Scroll {
                direction: "down".into(),
                amount: None
            }
        );
    }

    #[test]
    fn press_and_hotkey() {
        assert_eq!(
            parse_instruction("press enter").unwrap(),
            ActionRequest::PressKey { key: "enter".into() }
        );
        assert_eq!(
            parse_instruction("press ctrl+c").unwrap(),
            ActionRequest::Hotkey {
                keys: vec!["ctrl".into(), "c".into()]
            }
        );
        assert_eq!(
            parse_instruction("hotkey ctrl shift p").unwrap(),
            ActionRequest::Hotkey {
                keys: vec!["ctrl".into(), "shift".into(), "p".into()]
            }
        );
    }

    #[test]
    fn drag_and_wait() {
        assert_eq!(
            parse_instruction("drag 10 20 to 30 40").unwrap(),
            ActionRequest::Drag {
                from: (10, 20),
                to: (30, 40)
            }
        );
        assert_eq!(
            parse_instruction("wait 1.5 seconds").unwrap(),
            ActionRequest::Wait { seconds: 1.5 }
        );
    }

    #[test]
    fn overflowing_drag_coordinate_is_rejected_not_zeroed() {
        let err = parse_instruction("drag 99999999999 20 to 30 40").unwrap_err();
        assert_eq!(err.kind, FailureKind::UnrecognizedAction);
        assert!(err.message.contains("out of range"));

        let err = parse_instruction("drag 10 20 to 30 -99999999999").unwrap_err();
        assert_eq!(err.kind, FailureKind::UnrecognizedAction);
    }

    #[test]
    fn unknown_verbs_never_default_to_an_action() {
        for text in ["open the pod bay doors", "frobnicate", ""] {
            let err = parse_instruction(text).unwrap_err();
            assert_eq!(err.kind, FailureKind::UnrecognizedAction);
        }
    }

    #[test]
    fn grounding_target_only_for_described_targets() {
        assert_eq!(
            parse_instruction("click the OK button")
                .unwrap()
                .grounding_target(),
            Some("OK button")
        );
        assert_eq!(
            parse_instruction("click 5 5").unwrap().grounding_target(),
            None
        );
    }
}
