//! Keyboard to game input mapping

/// Logical signals the session understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSignal {
    /// Jump key went down (starts a jump and begins holding)
    JumpPressed,
    /// Jump key came up (stops holding)
    JumpReleased,
    /// Start or restart, depending on the phase
    Confirm,
    /// Flip the sound on or off
    ToggleMute,
}

/// Key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Down,
    Up,
}

/// Map a `KeyboardEvent.code` transition to a signal.
///
/// Confirm fires on release so the key that starts a run can't also
/// auto-repeat into it.
pub fn map_key(code: &str, phase: KeyPhase) -> Option<InputSignal> {
    match (code, phase) {
        ("Space", KeyPhase::Down) => Some(InputSignal::JumpPressed),
        ("Space", KeyPhase::Up) => Some(InputSignal::JumpReleased),
        ("Enter" | "NumpadEnter", KeyPhase::Up) => Some(InputSignal::Confirm),
        ("KeyM", KeyPhase::Down) => Some(InputSignal::ToggleMute),
        _ => None,
    }
}
