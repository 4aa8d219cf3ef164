//! Console front end: the kiosk's four views as a line-oriented terminal UI.
//!
//! Each view is rendered as a short text block.  The operator answers with
//! one line at a time:
//!
//! | View        | Input                 | Command                         |
//! |-------------|-----------------------|---------------------------------|
//! | Idle        | Enter, `scan`         | start scanning                  |
//! | Idle        | `input`               | manual entry                    |
//! | Scanning    | `back`, `cancel`      | stop scanning                   |
//! | ManualInput | any text              | submit it as the code           |
//! | ManualInput | `back`                | return to Idle                  |
//! | Result      | Enter, `back`         | acknowledge, return to Idle     |
//! | any         | `help`, `quit`        | show help, leave the kiosk      |
//!
//! [`run_console`] multiplexes three sources with `tokio::select!`: console
//! lines, MQTT events, and refresh ticks for the scan loop.  Input comes
//! first so `back` is never starved by a busy scan.

use std::io::{self, Write};

use lockit_core::{ConnectionState, ViewCommand, ViewState};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::application::publish_token::{IncomingMessage, SubmissionOutcome};
use crate::application::view_controller::ViewController;
use crate::infrastructure::messaging::MessagingEvent;

/// What one console line means in the current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(ViewCommand),
    Help,
    Quit,
    /// Nothing to do (e.g. Enter while scanning).
    Ignored,
    Unknown(String),
}

/// Why [`run_console`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The operator typed `quit`.
    Quit,
    /// The input stream ended (Ctrl-D or closed pipe).
    InputClosed,
}

/// Maps one line of console input to a command for the current view.
pub fn parse_input(view: ViewState, line: &str) -> ConsoleInput {
    let trimmed = line.trim();
    let word = trimmed.to_ascii_lowercase();

    match word.as_str() {
        "quit" | "exit" => return ConsoleInput::Quit,
        "help" | "?" => return ConsoleInput::Help,
        _ => {}
    }

    match view {
        ViewState::Idle => match word.as_str() {
            "" => ConsoleInput::Command(ViewCommand::EnterPressed),
            "scan" => ConsoleInput::Command(ViewCommand::StartScan),
            "input" => ConsoleInput::Command(ViewCommand::ChooseManualEntry),
            _ => ConsoleInput::Unknown(trimmed.to_string()),
        },
        ViewState::Scanning => match word.as_str() {
            "back" | "cancel" => ConsoleInput::Command(ViewCommand::Back),
            "" => ConsoleInput::Ignored,
            _ => ConsoleInput::Unknown(trimmed.to_string()),
        },
        ViewState::ManualInput => match word.as_str() {
            "back" | "cancel" => ConsoleInput::Command(ViewCommand::Back),
            "" => ConsoleInput::Ignored,
            _ => ConsoleInput::Command(ViewCommand::Submit(trimmed.to_string())),
        },
        ViewState::Result => match word.as_str() {
            "" | "back" | "ok" => ConsoleInput::Command(ViewCommand::Back),
            _ => ConsoleInput::Unknown(trimmed.to_string()),
        },
    }
}

/// Everything the renderer needs, copied out of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub view: ViewState,
    pub decoded_text: String,
    pub outcome: Option<SubmissionOutcome>,
    pub notice: Option<String>,
    pub connection: ConnectionState,
    pub last_message: Option<IncomingMessage>,
}

impl ViewSnapshot {
    pub fn capture(controller: &ViewController) -> Self {
        Self {
            view: controller.view(),
            decoded_text: controller.decoded_text().to_string(),
            outcome: controller.outcome().cloned(),
            notice: controller.notice().map(str::to_string),
            connection: controller.connection_state(),
            last_message: controller.last_message().cloned(),
        }
    }
}

/// Writes the text block for the snapshot's view.
pub fn render(snapshot: &ViewSnapshot, out: &mut impl Write) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "=== Welcome to LockIt === [broker: {}]", snapshot.connection)?;

    match snapshot.view {
        ViewState::Idle => {
            writeln!(out, "Press \"Start Scanning\" or \"Enter\" to scan your QR Code")?;
            writeln!(out, "  [Enter] / scan   Start Scanning")?;
            writeln!(out, "  input            Input Your Code")?;
            if let Some(notice) = &snapshot.notice {
                writeln!(out, "  ! {notice}")?;
            }
        }
        ViewState::Scanning => {
            writeln!(out, "Scanning... hold the QR code in front of the camera.")?;
            writeln!(out, "  back             Back")?;
        }
        ViewState::ManualInput => {
            writeln!(out, "Enter your code (userId-BoxId-pin) and press Enter.")?;
            writeln!(out, "  back             Back")?;
        }
        ViewState::Result => {
            writeln!(out, "QR Code Data:")?;
            writeln!(out, "  {}", snapshot.decoded_text)?;
            if let Some(line) = snapshot.outcome.as_ref().and_then(describe_outcome) {
                writeln!(out, "  {line}")?;
            }
            writeln!(out, "  [Enter] / back   Back")?;
        }
    }

    if let Some(message) = &snapshot.last_message {
        writeln!(out, "  last message on {}: {}", message.topic, message.payload)?;
    }
    out.flush()
}

/// One-line summary of a submission, or `None` when there is nothing to add.
pub fn describe_outcome(outcome: &SubmissionOutcome) -> Option<String> {
    match outcome {
        SubmissionOutcome::Published(token) => {
            Some(format!("Unlock request sent for box {}", token.box_id()))
        }
        SubmissionOutcome::Rejected(e) => Some(format!("Code rejected: {e}")),
        SubmissionOutcome::PublishFailed { reason, .. } => {
            Some(format!("Could not send unlock request: {reason}"))
        }
        SubmissionOutcome::NotSubmitted => None,
    }
}

fn write_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Commands: [Enter]/scan, input, back, <code>, help, quit")
}

/// Runs the kiosk until `quit` or end of input.
///
/// # Errors
///
/// Returns an I/O error if reading input or writing output fails.
pub async fn run_console<R, W>(
    controller: &mut ViewController,
    input: R,
    mut events: mpsc::Receiver<MessagingEvent>,
    out: &mut W,
) -> io::Result<ConsoleExit>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut events_open = true;
    render(&ViewSnapshot::capture(controller), out)?;

    loop {
        tokio::select! {
            biased;

            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("console input closed");
                    return Ok(ConsoleExit::InputClosed);
                };
                match parse_input(controller.view(), &line) {
                    ConsoleInput::Quit => return Ok(ConsoleExit::Quit),
                    ConsoleInput::Help => write_help(out)?,
                    ConsoleInput::Ignored => continue,
                    ConsoleInput::Unknown(text) => {
                        writeln!(out, "Unrecognised input '{text}' (type 'help')")?;
                        continue;
                    }
                    ConsoleInput::Command(command) => controller.handle(command).await,
                }
                render(&ViewSnapshot::capture(controller), out)?;
            }

            event = events.recv(), if events_open => match event {
                Some(MessagingEvent::Message(message)) => {
                    controller.record_incoming(message);
                    render(&ViewSnapshot::capture(controller), out)?;
                }
                Some(MessagingEvent::StateChanged(state)) => {
                    writeln!(out, "[broker: {state}]")?;
                }
                Some(MessagingEvent::Subscribed { topic, qos }) => {
                    debug!(%topic, qos = qos.level(), "subscription confirmed");
                }
                None => {
                    debug!("messaging event channel closed");
                    events_open = false;
                }
            },

            () = controller.wait_for_tick() => {
                let before = controller.view();
                controller.on_tick().await;
                if controller.view() != before {
                    render(&ViewSnapshot::capture(controller), out)?;
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lockit_core::{parse_token, Qos, TokenError};

    use super::*;
    use crate::application::publish_token::{PublishTokenUseCase, TokenPublisher};
    use crate::application::scan_frames::FacingMode;
    use crate::application::view_controller::{ControllerSettings, ManualEntryPolicy};
    use crate::infrastructure::camera::mock::ScriptedCamera;
    use crate::infrastructure::decoder::mock::ScriptedDecoder;
    use crate::infrastructure::messaging::mock::RecordingPublisher;
    use crate::infrastructure::scheduler::mock::ManualScheduler;

    fn make_controller(
        camera: &ScriptedCamera,
        publisher: &Arc<RecordingPublisher>,
        policy: ManualEntryPolicy,
    ) -> ViewController {
        ViewController::new(
            Box::new(camera.clone()),
            Box::new(ScriptedDecoder::new()),
            Box::new(ManualScheduler::new()),
            PublishTokenUseCase::new(
                Arc::clone(publisher) as Arc<dyn TokenPublisher>,
                "lockit/boxes",
                Qos::AtMostOnce,
            ),
            ControllerSettings {
                facing: FacingMode::Environment,
                manual_entry: policy,
            },
        )
    }

    async fn run_script(
        controller: &mut ViewController,
        script: &str,
        events: Vec<MessagingEvent>,
    ) -> (ConsoleExit, String) {
        let (tx, rx) = mpsc::channel(16);
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx);
        let mut out = Vec::new();
        let exit = run_console(controller, script.as_bytes(), rx, &mut out)
            .await
            .expect("console I/O");
        (exit, String::from_utf8(out).unwrap())
    }

    // ── parse_input ───────────────────────────────────────────────────────────

    #[test]
    fn test_enter_and_scan_start_scanning_from_idle() {
        assert_eq!(
            parse_input(ViewState::Idle, ""),
            ConsoleInput::Command(ViewCommand::EnterPressed)
        );
        assert_eq!(
            parse_input(ViewState::Idle, "  SCAN "),
            ConsoleInput::Command(ViewCommand::StartScan)
        );
        assert_eq!(
            parse_input(ViewState::Idle, "input"),
            ConsoleInput::Command(ViewCommand::ChooseManualEntry)
        );
    }

    #[test]
    fn test_manual_input_submits_trimmed_text_verbatim() {
        assert_eq!(
            parse_input(ViewState::ManualInput, "  Alice-Box42-7890 \n"),
            ConsoleInput::Command(ViewCommand::Submit("Alice-Box42-7890".into()))
        );
    }

    #[test]
    fn test_quit_and_help_work_in_every_view() {
        for view in [
            ViewState::Idle,
            ViewState::Scanning,
            ViewState::ManualInput,
            ViewState::Result,
        ] {
            assert_eq!(parse_input(view, "quit"), ConsoleInput::Quit);
            assert_eq!(parse_input(view, "help"), ConsoleInput::Help);
        }
    }

    #[test]
    fn test_enter_while_scanning_is_ignored() {
        assert_eq!(parse_input(ViewState::Scanning, ""), ConsoleInput::Ignored);
    }

    #[test]
    fn test_enter_on_result_acknowledges() {
        assert_eq!(
            parse_input(ViewState::Result, ""),
            ConsoleInput::Command(ViewCommand::Back)
        );
    }

    #[test]
    fn test_unknown_word_in_idle_is_reported() {
        assert_eq!(
            parse_input(ViewState::Idle, "open sesame"),
            ConsoleInput::Unknown("open sesame".into())
        );
    }

    // ── render ────────────────────────────────────────────────────────────────

    fn snapshot(view: ViewState) -> ViewSnapshot {
        ViewSnapshot {
            view,
            decoded_text: String::new(),
            outcome: None,
            notice: None,
            connection: ConnectionState::Connected,
            last_message: None,
        }
    }

    #[test]
    fn test_idle_render_shows_title_and_notice() {
        let mut snap = snapshot(ViewState::Idle);
        snap.notice = Some("camera unavailable: permission denied".into());
        let mut out = Vec::new();

        render(&snap, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Welcome to LockIt"));
        assert!(text.contains("[broker: Connected]"));
        assert!(text.contains("camera unavailable: permission denied"));
    }

    #[test]
    fn test_result_render_shows_data_and_outcome() {
        let mut snap = snapshot(ViewState::Result);
        snap.decoded_text = "alice-box42-7890".into();
        snap.outcome = Some(SubmissionOutcome::Published(
            parse_token("alice-box42-7890").unwrap(),
        ));
        let mut out = Vec::new();

        render(&snap, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("QR Code Data:"));
        assert!(text.contains("alice-box42-7890"));
        assert!(text.contains("Unlock request sent for box box42"));
    }

    #[test]
    fn test_describe_outcome_covers_rejections() {
        let rejected = SubmissionOutcome::Rejected(TokenError::InvalidFormat {
            expected: lockit_core::EXPECTED_FORMAT,
            parts: 2,
        });
        assert!(describe_outcome(&rejected)
            .unwrap()
            .contains("Expected format is \"userId-BoxId-pin\""));
        assert_eq!(describe_outcome(&SubmissionOutcome::NotSubmitted), None);
    }

    // ── run_console ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_console_scan_then_back_releases_camera() {
        // Arrange
        let camera = ScriptedCamera::new(4, 4);
        let publisher = Arc::new(RecordingPublisher::new());
        let mut controller = make_controller(&camera, &publisher, ManualEntryPolicy::default());

        // Act
        let (exit, text) = run_script(&mut controller, "scan\nback\nquit\n", Vec::new()).await;

        // Assert
        assert_eq!(exit, ConsoleExit::Quit);
        assert_eq!(camera.opens(), 1);
        assert_eq!(camera.closes(), 1);
        assert_eq!(controller.view(), ViewState::Idle);
        assert!(text.contains("Scanning..."));
    }

    #[tokio::test]
    async fn test_console_manual_entry_publishes_under_parse_policy() {
        let camera = ScriptedCamera::new(4, 4);
        let publisher = Arc::new(RecordingPublisher::new());
        let mut controller =
            make_controller(&camera, &publisher, ManualEntryPolicy::ParseAndPublish);

        let (_, text) = run_script(&mut controller, "input\nalice-box42-7890\n", Vec::new()).await;

        assert_eq!(controller.view(), ViewState::Result);
        assert_eq!(publisher.published().len(), 1);
        assert!(text.contains("Unlock request sent for box box42"));
    }

    #[tokio::test]
    async fn test_console_end_of_input_returns_input_closed() {
        let camera = ScriptedCamera::new(4, 4);
        let publisher = Arc::new(RecordingPublisher::new());
        let mut controller = make_controller(&camera, &publisher, ManualEntryPolicy::default());

        let (exit, _) = run_script(&mut controller, "", Vec::new()).await;

        assert_eq!(exit, ConsoleExit::InputClosed);
    }

    #[tokio::test]
    async fn test_console_records_incoming_messages() {
        // Arrange: the message is queued before input is read
        let camera = ScriptedCamera::new(4, 4);
        let publisher = Arc::new(RecordingPublisher::new());
        let mut controller = make_controller(&camera, &publisher, ManualEntryPolicy::default());
        let (tx, rx) = mpsc::channel(4);
        tx.send(MessagingEvent::Message(IncomingMessage {
            topic: "lockit/boxes".into(),
            payload: "box42 unlocked".into(),
        }))
        .await
        .unwrap();
        drop(tx);

        // Act: input arrives only after the queued event was handled
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut out = Vec::new();
        let console = run_console(&mut controller, tokio::io::BufReader::new(reader), rx, &mut out);
        let driver = async {
            use tokio::io::AsyncWriteExt;
            tokio::task::yield_now().await;
            writer.write_all(b"quit\n").await.unwrap();
        };
        let (exit, ()) = tokio::join!(console, driver);

        // Assert
        assert_eq!(exit.unwrap(), ConsoleExit::Quit);
        assert_eq!(
            controller.last_message().map(|m| m.payload.as_str()),
            Some("box42 unlocked")
        );
        assert!(String::from_utf8(out).unwrap().contains("last message on lockit/boxes"));
    }

    #[tokio::test]
    async fn test_console_unknown_input_is_reported_not_fatal() {
        let camera = ScriptedCamera::new(4, 4);
        let publisher = Arc::new(RecordingPublisher::new());
        let mut controller = make_controller(&camera, &publisher, ManualEntryPolicy::default());

        let (exit, text) = run_script(&mut controller, "dance\nquit\n", Vec::new()).await;

        assert_eq!(exit, ConsoleExit::Quit);
        assert!(text.contains("Unrecognised input 'dance'"));
    }
}
