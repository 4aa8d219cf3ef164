//! The kiosk's view state machine.
//!
//! The kiosk shows exactly one of four views at a time:
//!
//! ```text
//!            start / Enter               decode ok
//!   ┌──────┐ ───────────────► ┌──────────┐ ──────────► ┌────────┐
//!   │ Idle │ ◄─────────────── │ Scanning │             │ Result │
//!   └──────┘      back        └──────────┘             └────────┘
//!     │  ▲                                               ▲    │
//!     │  │ back             ┌─────────────┐   submit     │    │
//!     │  └───────────────── │ ManualInput │ ─────────────┘    │
//!     └───────────────────► └─────────────┘                   │
//!        manual entry                                          │
//!     ▲                          acknowledge                   │
//!     └────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no terminal state: the machine cycles for as long as the kiosk
//! runs.  Transitions happen only on user commands and on a successful decode;
//! nothing times out.
//!
//! This module holds only the *pure* transition table.  Side effects
//! (camera acquisition, publishing) are performed by the view controller in
//! the kiosk crate, which consults [`ViewState::on`] first.

use std::fmt;

/// The active kiosk view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewState {
    /// Landing view with "start scanning" and "input your code" choices.
    #[default]
    Idle,
    /// Camera is live and frames are being sampled for QR codes.
    Scanning,
    /// The user is typing a code by hand.
    ManualInput,
    /// The decoded or typed text is shown.
    Result,
}

/// A stimulus that may move the view state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    /// "Start scanning" button.
    StartScan,
    /// Enter key on the landing view (same effect as [`ViewCommand::StartScan`]).
    EnterPressed,
    /// "Input your code" button.
    ChooseManualEntry,
    /// Submit button on the manual-entry view, with the typed text.
    Submit(String),
    /// A QR code was decoded from the camera, with its raw text.
    Decoded(String),
    /// Back button (cancel scanning, leave manual entry, dismiss result).
    Back,
}

impl ViewState {
    /// Returns the view reached from `self` on `command`, or `None` when the
    /// command has no meaning in the current view.
    pub fn on(self, command: &ViewCommand) -> Option<ViewState> {
        use ViewCommand as C;
        use ViewState as S;
        match (self, command) {
            (S::Idle, C::StartScan | C::EnterPressed) => Some(S::Scanning),
            (S::Idle, C::ChooseManualEntry) => Some(S::ManualInput),
            (S::Scanning, C::Decoded(_)) => Some(S::Result),
            (S::Scanning, C::Back) => Some(S::Idle),
            (S::ManualInput, C::Submit(_)) => Some(S::Result),
            (S::ManualInput, C::Back) => Some(S::Idle),
            (S::Result, C::Back) => Some(S::Idle),
            _ => None,
        }
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewState::Idle => "idle",
            ViewState::Scanning => "scanning",
            ViewState::ManualInput => "manual-input",
            ViewState::Result => "result",
        };
        f.write_str(name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
