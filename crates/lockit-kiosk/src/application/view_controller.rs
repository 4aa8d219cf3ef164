//! ViewController: the kiosk's view state machine with its side effects.
//!
//! The pure transition table lives in [`lockit_core::ViewState::on`].  This
//! controller adds the side effects each transition carries:
//!
//! | Transition              | Side effect                                          |
//! |-------------------------|------------------------------------------------------|
//! | Idle → Scanning         | acquire camera, arm first tick                       |
//! | Scanning → Result       | cancel tick, release camera, parse, publish          |
//! | Scanning → Idle         | cancel tick, release camera                          |
//! | ManualInput → Result    | store text; parse + publish only if the policy says so |
//! | everything else         | none                                                 |
//!
//! # Only one sampling loop
//!
//! The scan session (camera lease + sampler) is an `Option` owned by the
//! controller.  `StartScan` while already Scanning has no transition, so a
//! second session can never be created.  Leaving Scanning takes the session
//! out of the `Option` and stops it, which releases the camera, and cancels
//! the pending tick so no stale tick fires into the next view.
//!
//! # Camera failures
//!
//! If the camera cannot be opened, the controller stays in Idle and keeps a
//! user-visible notice instead of sitting in an empty Scanning view.

use std::str::FromStr;

use lockit_core::{ConnectionState, ViewCommand, ViewState};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::publish_token::{IncomingMessage, PublishTokenUseCase, SubmissionOutcome};
use super::scan_frames::{
    FacingMode, FrameSource, QrDecoder, RefreshScheduler, SampleOutcome, ScanSession,
};

/// What happens to text submitted from the manual-entry view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManualEntryPolicy {
    /// Show the text on the Result view; no parse, no publish.
    #[default]
    DisplayOnly,
    /// Treat the text exactly like a camera decode.
    ParseAndPublish,
}

impl FromStr for ManualEntryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "display-only" => Ok(ManualEntryPolicy::DisplayOnly),
            "parse-and-publish" => Ok(ManualEntryPolicy::ParseAndPublish),
            other => Err(format!(
                "unknown manual entry policy '{other}' (expected display-only or parse-and-publish)"
            )),
        }
    }
}

/// Tunables for the controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerSettings {
    pub facing: FacingMode,
    pub manual_entry: ManualEntryPolicy,
}

/// The kiosk view controller.
pub struct ViewController {
    view: ViewState,
    decoded_text: String,
    outcome: Option<SubmissionOutcome>,
    notice: Option<String>,
    last_message: Option<IncomingMessage>,
    session: Option<ScanSession>,
    camera: Box<dyn FrameSource>,
    decoder: Box<dyn QrDecoder>,
    scheduler: Box<dyn RefreshScheduler>,
    publish: PublishTokenUseCase,
    settings: ControllerSettings,
}

impl ViewController {
    /// Creates a controller in the Idle view.
    pub fn new(
        camera: Box<dyn FrameSource>,
        decoder: Box<dyn QrDecoder>,
        scheduler: Box<dyn RefreshScheduler>,
        publish: PublishTokenUseCase,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            view: ViewState::Idle,
            decoded_text: String::new(),
            outcome: None,
            notice: None,
            last_message: None,
            session: None,
            camera,
            decoder,
            scheduler,
            publish,
            settings,
        }
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    /// The raw text last decoded or typed.
    pub fn decoded_text(&self) -> &str {
        &self.decoded_text
    }

    /// Outcome of the last submission shown on the Result view.
    pub fn outcome(&self) -> Option<&SubmissionOutcome> {
        self.outcome.as_ref()
    }

    /// A user-facing notice (e.g. camera unavailable), cleared on the next
    /// successful scan start.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn last_message(&self) -> Option<&IncomingMessage> {
        self.last_message.as_ref()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.publish.connection_state()
    }

    pub fn settings(&self) -> ControllerSettings {
        self.settings
    }

    /// `true` while a camera session exists.
    pub fn is_scanning(&self) -> bool {
        self.session.is_some()
    }

    /// Number of ticks the current session has processed, if scanning.
    pub fn session_ticks(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.sampler().ticks())
    }

    /// Applies a user command (or a decode) to the state machine.
    pub async fn handle(&mut self, command: ViewCommand) {
        let Some(next) = self.view.on(&command) else {
            debug!(view = %self.view, ?command, "command ignored in current view");
            return;
        };

        match command {
            ViewCommand::StartScan | ViewCommand::EnterPressed => {
                if !self.start_scanning() {
                    return;
                }
            }
            ViewCommand::Decoded(text) => {
                self.stop_scanning();
                self.outcome = Some(self.publish.submit(&text).await);
                self.decoded_text = text;
            }
            ViewCommand::Submit(text) => {
                self.outcome = Some(match self.settings.manual_entry {
                    ManualEntryPolicy::DisplayOnly => {
                        debug!("manual entry shown without publishing");
                        SubmissionOutcome::NotSubmitted
                    }
                    ManualEntryPolicy::ParseAndPublish => self.publish.submit(&text).await,
                });
                self.decoded_text = text;
            }
            ViewCommand::Back => {
                if self.view == ViewState::Scanning {
                    self.stop_scanning();
                }
            }
            ViewCommand::ChooseManualEntry => {}
        }

        info!(from = %self.view, to = %next, "view changed");
        self.view = next;
    }

    /// Resolves when the scheduler's pending tick fires.
    ///
    /// Never resolves while no tick is pending, so it can sit in a
    /// `tokio::select!` next to input sources.
    pub async fn wait_for_tick(&mut self) {
        self.scheduler.fired().await;
    }

    /// Processes one fired tick: sample, decode, reschedule or finish.
    pub async fn on_tick(&mut self) {
        let Some(session) = self.session.as_mut() else {
            debug!("tick fired outside a scanning session");
            return;
        };

        match session.tick(self.decoder.as_ref()) {
            SampleOutcome::Decoded(result) => {
                info!("QR code decoded");
                self.handle(ViewCommand::Decoded(result.text)).await;
            }
            SampleOutcome::NotReady | SampleOutcome::Miss => self.scheduler.schedule(),
        }
    }

    /// Records a message received on a subscribed topic.
    pub fn record_incoming(&mut self, message: IncomingMessage) {
        self.last_message = Some(message);
    }

    /// Leaves any scanning session; used on kiosk teardown.
    pub fn shutdown(&mut self) {
        if self.view == ViewState::Scanning {
            self.stop_scanning();
            self.view = ViewState::Idle;
        }
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn start_scanning(&mut self) -> bool {
        if self.session.is_some() {
            return true;
        }
        match ScanSession::start(self.camera.as_mut(), self.settings.facing) {
            Ok(session) => {
                self.session = Some(session);
                self.notice = None;
                self.scheduler.schedule();
                true
            }
            Err(e) => {
                error!("Error accessing camera: {e}");
                self.notice = Some(e.to_string());
                false
            }
        }
    }

    fn stop_scanning(&mut self) {
        self.scheduler.cancel();
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lockit_core::{Qos, ScanResult, TokenError};

    use super::*;
    use crate::application::publish_token::TokenPublisher;
    use crate::application::scan_frames::MockQrDecoder;
    use crate::infrastructure::camera::mock::ScriptedCamera;
    use crate::infrastructure::messaging::mock::RecordingPublisher;
    use crate::infrastructure::scheduler::mock::ManualScheduler;

    struct Harness {
        controller: ViewController,
        camera: ScriptedCamera,
        scheduler: ManualScheduler,
        publisher: Arc<RecordingPublisher>,
    }

    fn make_controller(
        camera: ScriptedCamera,
        decoder: MockQrDecoder,
        policy: ManualEntryPolicy,
    ) -> Harness {
        let scheduler = ManualScheduler::new();
        let publisher = Arc::new(RecordingPublisher::new());
        let publish = PublishTokenUseCase::new(
            Arc::clone(&publisher) as Arc<dyn TokenPublisher>,
            "lockit/boxes",
            Qos::AtMostOnce,
        );
        let controller = ViewController::new(
            Box::new(camera.clone()),
            Box::new(decoder),
            Box::new(scheduler.clone()),
            publish,
            ControllerSettings {
                facing: FacingMode::Environment,
                manual_entry: policy,
            },
        );
        Harness {
            controller,
            camera,
            scheduler,
            publisher,
        }
    }

    fn never_decodes() -> MockQrDecoder {
        let mut decoder = MockQrDecoder::new();
        decoder.expect_decode().returning(|_| None);
        decoder
    }

    fn decodes_after(misses: usize, text: &'static str) -> MockQrDecoder {
        let mut decoder = MockQrDecoder::new();
        let mut calls = 0usize;
        decoder.expect_decode().returning(move |_| {
            calls += 1;
            (calls > misses).then(|| ScanResult::new(text))
        });
        decoder
    }

    /// Fires the pending tick the way the console loop does.
    async fn fire(h: &mut Harness) {
        assert!(h.scheduler.is_armed(), "a tick must be pending before firing");
        h.controller.wait_for_tick().await;
        h.controller.on_tick().await;
    }

    // ── Idle ──────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_controller_starts_idle_with_camera_closed() {
        let h = make_controller(ScriptedCamera::new(4, 4), never_decodes(), ManualEntryPolicy::default());
        assert_eq!(h.controller.view(), ViewState::Idle);
        assert!(!h.controller.is_scanning());
        assert_eq!(h.camera.opens(), 0);
    }

    #[tokio::test]
    async fn test_start_scan_acquires_camera_and_arms_tick() {
        // Arrange
        let mut h = make_controller(ScriptedCamera::new(4, 4), never_decodes(), ManualEntryPolicy::default());

        // Act
        h.controller.handle(ViewCommand::StartScan).await;

        // Assert
        assert_eq!(h.controller.view(), ViewState::Scanning);
        assert_eq!(h.camera.opens(), 1);
        assert!(h.camera.is_open());
        assert!(h.scheduler.is_armed());
        assert_eq!(h.scheduler.schedule_calls(), 1);
    }

    #[tokio::test]
    async fn test_enter_key_starts_scanning() {
        let mut h = make_controller(ScriptedCamera::new(4, 4), never_decodes(), ManualEntryPolicy::default());
        h.controller.handle(ViewCommand::EnterPressed).await;
        assert_eq!(h.controller.view(), ViewState::Scanning);
    }

    #[tokio::test]
    async fn test_camera_unavailable_stays_idle_with_notice() {
        let mut h = make_controller(ScriptedCamera::unavailable(), never_decodes(), ManualEntryPolicy::default());

        h.controller.handle(ViewCommand::StartScan).await;

        assert_eq!(h.controller.view(), ViewState::Idle);
        assert!(h.controller.notice().unwrap().contains("camera unavailable"));
        assert!(!h.scheduler.is_armed());
        assert_eq!(h.camera.closes(), 0);
    }

    // ── Scanning ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_second_start_scan_does_not_open_second_session() {
        let mut h = make_controller(ScriptedCamera::new(4, 4), never_decodes(), ManualEntryPolicy::default());

        h.controller.handle(ViewCommand::StartScan).await;
        h.controller.handle(ViewCommand::StartScan).await;
        h.controller.handle(ViewCommand::EnterPressed).await;

        assert_eq!(h.camera.opens(), 1);
        assert_eq!(h.scheduler.schedule_calls(), 1);
    }

    #[tokio::test]
    async fn test_ten_misses_reschedule_ten_times_and_stay_scanning() {
        // Arrange
        let mut h = make_controller(ScriptedCamera::new(4, 4), never_decodes(), ManualEntryPolicy::default());
        h.controller.handle(ViewCommand::StartScan).await;

        // Act
        for _ in 0..10 {
            fire(&mut h).await;
        }

        // Assert: one initial schedule plus one per miss
        assert_eq!(h.scheduler.schedule_calls(), 11);
        assert_eq!(h.scheduler.fired_count(), 10);
        assert_eq!(h.controller.view(), ViewState::Scanning);
        assert_eq!(h.controller.session_ticks(), Some(10));
        assert!(h.publisher.published().is_empty());
        assert_eq!(h.controller.decoded_text(), "");
    }

    #[tokio::test]
    async fn test_not_ready_stream_reschedules_like_a_miss() {
        let camera = ScriptedCamera::new(4, 4).with_warmup(3);
        let mut decoder = MockQrDecoder::new();
        decoder.expect_decode().never();
        let mut h = make_controller(camera, decoder, ManualEntryPolicy::default());
        h.controller.handle(ViewCommand::StartScan).await;

        for _ in 0..3 {
            fire(&mut h).await;
        }

        assert_eq!(h.scheduler.schedule_calls(), 4);
        assert_eq!(h.controller.view(), ViewState::Scanning);
    }

    #[tokio::test]
    async fn test_successful_decode_releases_camera_and_publishes() {
        // Arrange
        let mut h = make_controller(
            ScriptedCamera::new(4, 4),
            decodes_after(2, "alice-box42-7890"),
            ManualEntryPolicy::default(),
        );
        h.controller.handle(ViewCommand::StartScan).await;

        // Act
        for _ in 0..3 {
            fire(&mut h).await;
        }

        // Assert
        assert_eq!(h.controller.view(), ViewState::Result);
        assert_eq!(h.controller.decoded_text(), "alice-box42-7890");
        assert!(h.controller.outcome().unwrap().is_published());
        assert_eq!(h.camera.closes(), 1);
        assert!(!h.scheduler.is_armed(), "loop must stop after a decode");
        assert_eq!(h.scheduler.schedule_calls(), 3);
        let sent = h.publisher.published();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].payload_str(),
            r#"{"id":"box42","pin":"7890","user_id":"alice","state":true}"#
        );
    }

    #[tokio::test]
    async fn test_invalid_decode_reaches_result_without_publish() {
        let mut h = make_controller(
            ScriptedCamera::new(4, 4),
            decodes_after(0, "alice-box42"),
            ManualEntryPolicy::default(),
        );
        h.controller.handle(ViewCommand::StartScan).await;

        fire(&mut h).await;

        assert_eq!(h.controller.view(), ViewState::Result);
        assert_eq!(h.controller.decoded_text(), "alice-box42");
        assert!(matches!(
            h.controller.outcome(),
            Some(SubmissionOutcome::Rejected(TokenError::InvalidFormat { .. }))
        ));
        assert!(h.publisher.published().is_empty());
        assert_eq!(h.camera.closes(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_still_reaches_result() {
        let mut h = make_controller(
            ScriptedCamera::new(4, 4),
            decodes_after(0, "alice-box42-7890"),
            ManualEntryPolicy::default(),
        );
        h.publisher.fail_publishes("not connected");
        h.controller.handle(ViewCommand::StartScan).await;

        fire(&mut h).await;

        assert_eq!(h.controller.view(), ViewState::Result);
        assert!(matches!(
            h.controller.outcome(),
            Some(SubmissionOutcome::PublishFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_before_decode_releases_camera_once_and_disarms_tick() {
        // Arrange
        let mut h = make_controller(ScriptedCamera::new(4, 4), never_decodes(), ManualEntryPolicy::default());
        h.controller.handle(ViewCommand::StartScan).await;
        fire(&mut h).await;

        // Act
        h.controller.handle(ViewCommand::Back).await;

        // Assert
        assert_eq!(h.controller.view(), ViewState::Idle);
        assert_eq!(h.camera.closes(), 1);
        assert!(!h.scheduler.is_armed());
        assert_eq!(h.scheduler.cancel_calls(), 1);

        // A stray tick after leaving Scanning does nothing.
        h.controller.on_tick().await;
        assert_eq!(h.camera.closes(), 1);
        assert_eq!(h.scheduler.schedule_calls(), 2);
    }

    #[tokio::test]
    async fn test_scan_cycles_acquire_and_release_once_per_entry() {
        let mut h = make_controller(ScriptedCamera::new(4, 4), never_decodes(), ManualEntryPolicy::default());

        for cycle in 1..=3 {
            h.controller.handle(ViewCommand::StartScan).await;
            assert_eq!(h.camera.opens(), cycle);
            assert!(h.camera.is_open());
            h.controller.handle(ViewCommand::Back).await;
            assert_eq!(h.camera.closes(), cycle);
            assert!(!h.camera.is_open());
        }
    }

    #[tokio::test]
    async fn test_shutdown_while_scanning_releases_camera() {
        let mut h = make_controller(ScriptedCamera::new(4, 4), never_decodes(), ManualEntryPolicy::default());
        h.controller.handle(ViewCommand::StartScan).await;

        h.controller.shutdown();

        assert_eq!(h.controller.view(), ViewState::Idle);
        assert_eq!(h.camera.closes(), 1);
    }

    #[tokio::test]
    async fn test_dropping_controller_while_scanning_releases_camera() {
        let mut h = make_controller(ScriptedCamera::new(4, 4), never_decodes(), ManualEntryPolicy::default());
        h.controller.handle(ViewCommand::StartScan).await;
        let camera = h.camera.clone();

        drop(h);

        assert_eq!(camera.closes(), 1);
    }

    // ── Manual entry ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_manual_entry_display_only_never_publishes() {
        let mut h = make_controller(ScriptedCamera::new(4, 4), never_decodes(), ManualEntryPolicy::DisplayOnly);

        h.controller.handle(ViewCommand::ChooseManualEntry).await;
        h.controller
            .handle(ViewCommand::Submit("alice-box42-7890".into()))
            .await;

        assert_eq!(h.controller.view(), ViewState::Result);
        assert_eq!(h.controller.decoded_text(), "alice-box42-7890");
        assert_eq!(h.controller.outcome(), Some(&SubmissionOutcome::NotSubmitted));
        assert!(h.publisher.published().is_empty());
        assert_eq!(h.camera.opens(), 0);
    }

    #[tokio::test]
    async fn test_manual_entry_parse_and_publish_matches_camera_path() {
        let mut h = make_controller(
            ScriptedCamera::new(4, 4),
            never_decodes(),
            ManualEntryPolicy::ParseAndPublish,
        );

        h.controller.handle(ViewCommand::ChooseManualEntry).await;
        h.controller
            .handle(ViewCommand::Submit("alice-box42-7890".into()))
            .await;

        assert!(h.controller.outcome().unwrap().is_published());
        assert_eq!(h.publisher.published().len(), 1);
    }

    #[tokio::test]
    async fn test_manual_entry_parse_and_publish_rejects_bad_text() {
        let mut h = make_controller(
            ScriptedCamera::new(4, 4),
            never_decodes(),
            ManualEntryPolicy::ParseAndPublish,
        );

        h.controller.handle(ViewCommand::ChooseManualEntry).await;
        h.controller.handle(ViewCommand::Submit("nope".into())).await;

        assert!(matches!(
            h.controller.outcome(),
            Some(SubmissionOutcome::Rejected(_))
        ));
        assert!(h.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_manual_back_returns_to_idle() {
        let mut h = make_controller(ScriptedCamera::new(4, 4), never_decodes(), ManualEntryPolicy::default());
        h.controller.handle(ViewCommand::ChooseManualEntry).await;
        h.controller.handle(ViewCommand::Back).await;
        assert_eq!(h.controller.view(), ViewState::Idle);
    }

    // ── Result ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_result_acknowledge_returns_to_idle_and_allows_rescan() {
        let mut h = make_controller(
            ScriptedCamera::new(4, 4),
            decodes_after(0, "alice-box42-7890"),
            ManualEntryPolicy::default(),
        );
        h.controller.handle(ViewCommand::StartScan).await;
        fire(&mut h).await;

        h.controller.handle(ViewCommand::Back).await;
        h.controller.handle(ViewCommand::StartScan).await;

        assert_eq!(h.controller.view(), ViewState::Scanning);
        assert_eq!(h.camera.opens(), 2);
    }

    #[tokio::test]
    async fn test_commands_without_transition_are_ignored() {
        let mut h = make_controller(ScriptedCamera::new(4, 4), never_decodes(), ManualEntryPolicy::default());

        h.controller.handle(ViewCommand::Back).await;
        h.controller.handle(ViewCommand::Submit("x-y-z".into())).await;
        h.controller.handle(ViewCommand::Decoded("x-y-z".into())).await;

        assert_eq!(h.controller.view(), ViewState::Idle);
        assert!(h.controller.outcome().is_none());
        assert!(h.publisher.published().is_empty());
    }

    // ── Misc ──────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_incoming_messages_are_recorded() {
        let mut h = make_controller(ScriptedCamera::new(4, 4), never_decodes(), ManualEntryPolicy::default());
        h.controller.record_incoming(IncomingMessage {
            topic: "lockit/boxes".into(),
            payload: "hello".into(),
        });
        assert_eq!(h.controller.last_message().unwrap().payload, "hello");
    }

    #[test]
    fn test_manual_entry_policy_parses_cli_values() {
        assert_eq!(
            "display-only".parse::<ManualEntryPolicy>(),
            Ok(ManualEntryPolicy::DisplayOnly)
        );
        assert_eq!(
            "parse-and-publish".parse::<ManualEntryPolicy>(),
            Ok(ManualEntryPolicy::ParseAndPublish)
        );
        assert!("sometimes".parse::<ManualEntryPolicy>().is_err());
    }
}
