// Scan session controller
//
// A session is an actor: commands arrive on a channel from the cloneable
// handle, events leave through the handler trait. The state machine is
// Idle -> Requesting -> Scanning | ManualEntry -> Completed | Cancelled,
// with retry modeled as an explicit re-entry into Requesting. The session
// exclusively owns at most one live stream, and every exit path releases
// it before the caller is signaled.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::capability::{self, Capability, HostEnvironment};
use super::config::{ScannerConfig, SessionContext};
use super::decode::DecodeLoop;
use super::error::{permission_guidance, ErrorClass};
use super::manual;
use super::types::{Decoded, SessionId, SessionState};
use super::{negotiate, tuner, BarcodeDecoder, CameraBackend, LiveStream};

/// User intent driving the session
#[derive(Debug, Clone)]
pub(crate) enum ScanCommand {
    /// Begin (or retry) the camera path
    Start,
    /// Stop scanning without a result, back to idle
    StopScanning,
    /// Tear the camera path down and take typed entry
    SwitchToManual,
    /// Leave typed entry and renegotiate the camera
    SwitchToCamera,
    /// Submit a typed barcode
    SubmitManual(String),
    /// Abort the session without a result
    Cancel,
}

/// Events a session delivers to its host UI
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// The session moved between lifecycle states
    StateChanged {
        session: SessionId,
        old: SessionState,
        new: SessionState,
    },
    /// Exactly one per successful session, camera or manual; the stream is
    /// already released when this arrives
    Decoded {
        session: SessionId,
        result: Decoded,
    },
    /// The session ended without a result
    Cancelled { session: SessionId },
    /// A classified camera failure; `retryable` decides whether the UI
    /// offers a retry action or steers toward manual entry
    CameraError {
        session: SessionId,
        class: ErrorClass,
        message: String,
        retryable: bool,
    },
    /// A typed entry failed validation; session state is unchanged
    ManualRejected {
        session: SessionId,
        reason: String,
    },
}

/// Implement to receive session events
#[async_trait]
pub trait ScanEventHandler: Send + Sync {
    async fn on_event(&self, event: ScanEvent);
}

/// Cloneable handle for driving a running session.
///
/// Commands sent after the session reached a terminal state are dropped
/// silently; there is nothing left to drive.
#[derive(Clone)]
pub struct ScanHandle {
    session_id: SessionId,
    tx: mpsc::UnboundedSender<ScanCommand>,
}

impl ScanHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Enter the camera path (from idle, or as a retry after an error)
    pub fn start(&self) {
        self.send(ScanCommand::Start);
    }

    /// Retry after a classified camera failure
    pub fn retry(&self) {
        self.send(ScanCommand::Start);
    }

    /// Stop scanning without producing a result
    pub fn stop_scanning(&self) {
        self.send(ScanCommand::StopScanning);
    }

    pub fn switch_to_manual(&self) {
        self.send(ScanCommand::SwitchToManual);
    }

    pub fn switch_to_camera(&self) {
        self.send(ScanCommand::SwitchToCamera);
    }

    pub fn submit_manual(&self, text: impl Into<String>) {
        self.send(ScanCommand::SubmitManual(text.into()));
    }

    /// Abort the session; resources are released before the cancellation
    /// event is delivered
    pub fn cancel(&self) {
        self.send(ScanCommand::Cancel);
    }

    fn send(&self, command: ScanCommand) {
        let _ = self.tx.send(command);
    }
}

/// How the scanning loop was left
enum ScanExit {
    Hit(Decoded),
    StreamEnded,
    Cancelled,
    Stopped,
    ToManual,
}

/// The session actor. Construct with [`ScanController::spawn`].
pub struct ScanController {
    session_id: SessionId,
    config: ScannerConfig,
    context: SessionContext,
    env: HostEnvironment,
    backend: Arc<dyn CameraBackend>,
    decoder: Arc<dyn BarcodeDecoder>,
    handler: Arc<dyn ScanEventHandler>,
    rx: mpsc::UnboundedReceiver<ScanCommand>,
    state: SessionState,
    stream: Option<Box<dyn LiveStream>>,
    tune_guard: CancellationToken,
    last_error: Option<ErrorClass>,
}

impl ScanController {
    /// Spawn a session actor and return the handle driving it plus the
    /// task handle, which resolves once the session reaches a terminal
    /// state.
    pub fn spawn(
        config: ScannerConfig,
        context: SessionContext,
        env: HostEnvironment,
        backend: Arc<dyn CameraBackend>,
        decoder: Arc<dyn BarcodeDecoder>,
        handler: Arc<dyn ScanEventHandler>,
    ) -> (ScanHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session_id = Uuid::new_v4();
        let controller = Self {
            session_id,
            config,
            context,
            env,
            backend,
            decoder,
            handler,
            rx,
            state: SessionState::Idle,
            stream: None,
            tune_guard: CancellationToken::new(),
            last_error: None,
        };
        let join = tokio::spawn(controller.run());
        (ScanHandle { session_id, tx }, join)
    }

    async fn run(mut self) {
        match self.context.display_hint() {
            Some(hint) => log::info!("scan session {} opened ({hint})", self.session_id),
            None => log::info!("scan session {} opened", self.session_id),
        }
        while !self.state.is_terminal() {
            match self.state {
                SessionState::Idle | SessionState::ManualEntry => {
                    let command = self.rx.recv().await;
                    self.handle_idle_command(command).await;
                }
                SessionState::Requesting => self.request_camera().await,
                SessionState::Scanning => self.scan().await,
                SessionState::Completed | SessionState::Cancelled => {}
            }
        }
        debug_assert!(self.stream.is_none());
        log::info!(
            "scan session {} closed in {:?}",
            self.session_id,
            self.state
        );
    }

    /// Commands accepted while no camera work is in flight. A dropped
    /// channel counts as cancellation: nobody is left to receive a result.
    async fn handle_idle_command(&mut self, command: Option<ScanCommand>) {
        match (self.state, command) {
            (_, None) | (_, Some(ScanCommand::Cancel)) => self.finish_cancelled().await,
            (SessionState::Idle, Some(ScanCommand::Start)) => {
                self.set_state(SessionState::Requesting).await;
            }
            (SessionState::Idle, Some(ScanCommand::SwitchToManual)) => {
                self.set_state(SessionState::ManualEntry).await;
            }
            (SessionState::ManualEntry, Some(ScanCommand::SubmitManual(text))) => {
                self.submit_manual(&text).await;
            }
            (
                SessionState::ManualEntry,
                Some(ScanCommand::SwitchToCamera) | Some(ScanCommand::Start),
            ) => {
                self.set_state(SessionState::Requesting).await;
            }
            (state, Some(command)) => {
                log::warn!("ignoring {command:?} in state {state:?}");
            }
        }
    }

    async fn submit_manual(&mut self, text: &str) {
        match manual::validate(text) {
            Ok(result) => {
                // No-op unless a stream somehow survived; completion must
                // never hold one.
                self.teardown().await;
                self.set_state(SessionState::Completed).await;
                self.emit(ScanEvent::Decoded {
                    session: self.session_id,
                    result,
                })
                .await;
            }
            Err(err) => {
                log::debug!("manual entry rejected: {err}");
                self.emit(ScanEvent::ManualRejected {
                    session: self.session_id,
                    reason: err.to_string(),
                })
                .await;
            }
        }
    }

    /// Probe, then negotiate. Cancellation while the platform has the
    /// request is cooperative: the session is marked, and a grant arriving
    /// afterwards is torn down instead of entering `Scanning`.
    async fn request_camera(&mut self) {
        // Release-before-acquire: a second live stream must be impossible.
        self.teardown().await;

        match capability::probe(&self.env) {
            Capability::Incapable { class, reason } => {
                log::warn!("camera path unavailable: {reason}");
                self.last_error = Some(class);
                self.emit(ScanEvent::CameraError {
                    session: self.session_id,
                    class,
                    message: reason.to_string(),
                    retryable: class.retryable(),
                })
                .await;
                self.set_state(SessionState::Idle).await;
                return;
            }
            Capability::Capable => {}
        }

        let backend = Arc::clone(&self.backend);
        let candidates = self.config.candidates.clone();
        let negotiation = async move { negotiate::open(backend.as_ref(), &candidates).await };
        tokio::pin!(negotiation);

        let mut cancelled = false;
        let mut to_manual = false;
        let mut rx_open = true;
        let outcome = loop {
            tokio::select! {
                outcome = &mut negotiation => break outcome,
                command = self.rx.recv(), if rx_open => match command {
                    None => {
                        cancelled = true;
                        rx_open = false;
                    }
                    Some(ScanCommand::Cancel) => cancelled = true,
                    Some(ScanCommand::SwitchToManual) => to_manual = true,
                    Some(other) => log::warn!("ignoring {other:?} while requesting camera"),
                },
            }
        };

        match outcome {
            Ok(stream) => {
                if cancelled {
                    self.stream = Some(stream);
                    self.finish_cancelled().await;
                } else if to_manual {
                    self.stream = Some(stream);
                    self.teardown().await;
                    self.set_state(SessionState::ManualEntry).await;
                } else {
                    self.last_error = None;
                    self.tune_guard = CancellationToken::new();
                    let _ = tuner::spawn(
                        stream.track(),
                        self.config.settle_delay(),
                        self.tune_guard.clone(),
                    );
                    self.stream = Some(stream);
                    self.set_state(SessionState::Scanning).await;
                }
            }
            Err(failure) => {
                if cancelled {
                    self.finish_cancelled().await;
                } else if to_manual {
                    self.set_state(SessionState::ManualEntry).await;
                } else {
                    let mut message = failure.message.clone();
                    if failure.class == ErrorClass::PermissionDenied {
                        message = format!(
                            "{message} ({})",
                            permission_guidance(&self.env.user_agent)
                        );
                    }
                    self.last_error = Some(failure.class);
                    self.emit(ScanEvent::CameraError {
                        session: self.session_id,
                        class: failure.class,
                        message,
                        retryable: failure.class.retryable(),
                    })
                    .await;
                    self.set_state(SessionState::Idle).await;
                }
            }
        }
    }

    /// Drive the decode loop until a hit, a command, or stream death. The
    /// stream is released before any outcome is signaled.
    async fn scan(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            // Nothing to scan with; fall back to idle rather than spin.
            self.set_state(SessionState::Idle).await;
            return;
        };
        let decode_loop = DecodeLoop::new(&self.config, Arc::clone(&self.decoder));

        let exit = loop {
            let decode = decode_loop.run(stream.as_mut());
            tokio::pin!(decode);
            tokio::select! {
                hit = &mut decode => break match hit {
                    Some(result) => ScanExit::Hit(result),
                    None => ScanExit::StreamEnded,
                },
                command = self.rx.recv() => match command {
                    None | Some(ScanCommand::Cancel) => break ScanExit::Cancelled,
                    Some(ScanCommand::StopScanning) => break ScanExit::Stopped,
                    Some(ScanCommand::SwitchToManual) => break ScanExit::ToManual,
                    Some(other) => log::warn!("ignoring {other:?} while scanning"),
                },
            }
        };

        // Sampling has stopped; release the stream before signaling anyone.
        self.tune_guard.cancel();
        if let Err(err) = stream.stop().await {
            log::debug!("stream teardown error ignored: {err}");
        }
        drop(stream);

        match exit {
            ScanExit::Hit(result) => {
                self.set_state(SessionState::Completed).await;
                self.emit(ScanEvent::Decoded {
                    session: self.session_id,
                    result,
                })
                .await;
            }
            ScanExit::StreamEnded => {
                self.last_error = Some(ErrorClass::Unknown);
                self.emit(ScanEvent::CameraError {
                    session: self.session_id,
                    class: ErrorClass::Unknown,
                    message: "camera stream ended unexpectedly".to_string(),
                    retryable: ErrorClass::Unknown.retryable(),
                })
                .await;
                self.set_state(SessionState::Idle).await;
            }
            ScanExit::Cancelled => {
                self.set_state(SessionState::Cancelled).await;
                self.emit(ScanEvent::Cancelled {
                    session: self.session_id,
                })
                .await;
            }
            ScanExit::Stopped => self.set_state(SessionState::Idle).await,
            ScanExit::ToManual => self.set_state(SessionState::ManualEntry).await,
        }
    }

    async fn finish_cancelled(&mut self) {
        self.teardown().await;
        self.set_state(SessionState::Cancelled).await;
        self.emit(ScanEvent::Cancelled {
            session: self.session_id,
        })
        .await;
    }

    /// Release the stream, if any. Idempotent; errors are swallowed since
    /// teardown is cleanup, not a user-facing operation.
    async fn teardown(&mut self) {
        self.tune_guard.cancel();
        if let Some(mut stream) = self.stream.take() {
            if let Err(err) = stream.stop().await {
                log::debug!("stream teardown error ignored: {err}");
            }
        }
    }

    async fn set_state(&mut self, new: SessionState) {
        if self.state == new {
            return;
        }
        let old = std::mem::replace(&mut self.state, new);
        log::debug!("session {}: {old:?} -> {new:?}", self.session_id);
        self.emit(ScanEvent::StateChanged {
            session: self.session_id,
            old,
            new,
        })
        .await;
    }

    async fn emit(&self, event: ScanEvent) {
        self.handler.on_event(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::error::CameraFailure;
    use crate::scanner::types::{
        BarcodeFormat, CameraCandidate, DecodeSource, ScanRegion, TrackCapabilities,
        TrackConstraint, VideoFrame,
    };
    use crate::scanner::{ScanResult, VideoTrack};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    struct NullTrack;

    #[async_trait]
    impl VideoTrack for NullTrack {
        async fn capabilities(&self) -> ScanResult<TrackCapabilities> {
            Ok(TrackCapabilities::default())
        }

        async fn apply(&self, _constraint: TrackConstraint) -> ScanResult<()> {
            Ok(())
        }
    }

    struct BlankStream {
        stops: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LiveStream for BlankStream {
        async fn grab_frame(&mut self) -> Option<VideoFrame> {
            Some(VideoFrame::blank(64, 64))
        }

        fn track(&self) -> Arc<dyn VideoTrack> {
            Arc::new(NullTrack)
        }

        async fn stop(&mut self) -> ScanResult<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Grants a blank stream, optionally waiting for an explicit release
    /// first, or fails every attempt with a fixed class.
    struct TestBackend {
        gate: Option<Arc<Notify>>,
        fail_with: Option<ErrorClass>,
        opens: AtomicUsize,
        stops: Arc<AtomicUsize>,
    }

    impl TestBackend {
        fn granting() -> Self {
            Self {
                gate: None,
                fail_with: None,
                opens: AtomicUsize::new(0),
                stops: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::granting()
            }
        }

        fn failing(class: ErrorClass) -> Self {
            Self {
                fail_with: Some(class),
                ..Self::granting()
            }
        }
    }

    #[async_trait]
    impl CameraBackend for TestBackend {
        async fn open(
            &self,
            _candidate: CameraCandidate,
        ) -> Result<Box<dyn LiveStream>, CameraFailure> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if let Some(class) = self.fail_with {
                return Err(CameraFailure::new(class, "test failure"));
            }
            Ok(Box::new(BlankStream {
                stops: Arc::clone(&self.stops),
            }))
        }
    }

    /// Decodes after a fixed number of frames
    struct CountdownDecoder {
        misses: usize,
        calls: AtomicUsize,
    }

    impl BarcodeDecoder for CountdownDecoder {
        fn decode(
            &self,
            _frame: &VideoFrame,
            _region: &ScanRegion,
            _formats: &[BarcodeFormat],
        ) -> Option<Decoded> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.misses {
                return None;
            }
            Some(Decoded {
                text: "7791234567890".to_string(),
                format: Some(BarcodeFormat::Ean13),
                source: DecodeSource::Camera,
            })
        }
    }

    struct NeverDecoder;

    impl BarcodeDecoder for NeverDecoder {
        fn decode(
            &self,
            _frame: &VideoFrame,
            _region: &ScanRegion,
            _formats: &[BarcodeFormat],
        ) -> Option<Decoded> {
            None
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        events: Mutex<Vec<ScanEvent>>,
    }

    impl RecordingHandler {
        fn events(&self) -> Vec<ScanEvent> {
            self.events.lock().unwrap().clone()
        }

        fn states(&self) -> Vec<SessionState> {
            self.events()
                .iter()
                .filter_map(|e| match e {
                    ScanEvent::StateChanged { new, .. } => Some(*new),
                    _ => None,
                })
                .collect()
        }

        fn decoded(&self) -> Vec<Decoded> {
            self.events()
                .iter()
                .filter_map(|e| match e {
                    ScanEvent::Decoded { result, .. } => Some(result.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl ScanEventHandler for RecordingHandler {
        async fn on_event(&self, event: ScanEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn capable_env() -> HostEnvironment {
        HostEnvironment {
            media_api: true,
            scheme: "https".to_string(),
            hostname: "relevo.example.com".to_string(),
            user_agent: "Chrome/126 Safari/537.36".to_string(),
        }
    }

    fn fast_config() -> ScannerConfig {
        let mut config = ScannerConfig::default();
        config.fps = 60;
        config.settle_delay_ms = 1;
        config
    }

    fn spawn_session(
        backend: Arc<dyn CameraBackend>,
        decoder: Arc<dyn BarcodeDecoder>,
        handler: Arc<RecordingHandler>,
    ) -> (ScanHandle, JoinHandle<()>) {
        ScanController::spawn(
            fast_config(),
            SessionContext::default(),
            capable_env(),
            backend,
            decoder,
            handler,
        )
    }

    #[tokio::test]
    async fn manual_submit_completes_with_one_result() {
        let handler = Arc::new(RecordingHandler::default());
        let (handle, join) = spawn_session(
            Arc::new(TestBackend::granting()),
            Arc::new(NeverDecoder),
            Arc::clone(&handler),
        );

        handle.switch_to_manual();
        handle.submit_manual("7791234567890");
        join.await.unwrap();

        let decoded = handler.decoded();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].text, "7791234567890");
        assert_eq!(decoded[0].source, DecodeSource::Manual);
        assert_eq!(
            handler.states(),
            vec![
                SessionState::ManualEntry,
                SessionState::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn rejected_manual_entry_leaves_state_alone() {
        let handler = Arc::new(RecordingHandler::default());
        let (handle, join) = spawn_session(
            Arc::new(TestBackend::granting()),
            Arc::new(NeverDecoder),
            Arc::clone(&handler),
        );

        handle.switch_to_manual();
        handle.submit_manual("12a45");
        handle.submit_manual("7791234567890");
        join.await.unwrap();

        let events = handler.events();
        assert!(events
            .iter()
            .any(|e| matches!(e, ScanEvent::ManualRejected { .. })));
        // The bad entry produced no Decoded event and no state change.
        assert_eq!(handler.decoded().len(), 1);
        assert_eq!(
            handler.states(),
            vec![SessionState::ManualEntry, SessionState::Completed]
        );
    }

    #[tokio::test]
    async fn camera_decode_completes_and_releases_stream() {
        let backend = Arc::new(TestBackend::granting());
        let handler = Arc::new(RecordingHandler::default());
        let (handle, join) = spawn_session(
            Arc::clone(&backend) as _,
            Arc::new(CountdownDecoder {
                misses: 3,
                calls: AtomicUsize::new(0),
            }),
            Arc::clone(&handler),
        );

        handle.start();
        join.await.unwrap();

        assert_eq!(handler.decoded().len(), 1);
        assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
        assert_eq!(
            handler.states(),
            vec![
                SessionState::Requesting,
                SessionState::Scanning,
                SessionState::Completed,
            ]
        );
        // Teardown strictly precedes the Decoded event: the stop count was
        // already 1 when the event arrived, as the terminal state proves
        // the ordering StateChanged(Completed) then Decoded.
        let events = handler.events();
        let completed_at = events
            .iter()
            .position(|e| matches!(e, ScanEvent::StateChanged { new: SessionState::Completed, .. }))
            .unwrap();
        let decoded_at = events
            .iter()
            .position(|e| matches!(e, ScanEvent::Decoded { .. }))
            .unwrap();
        assert!(completed_at < decoded_at);
    }

    #[tokio::test]
    async fn switch_to_manual_tears_down_exactly_once() {
        let backend = Arc::new(TestBackend::granting());
        let handler = Arc::new(RecordingHandler::default());
        let (handle, join) = spawn_session(
            Arc::clone(&backend) as _,
            Arc::new(NeverDecoder),
            Arc::clone(&handler),
        );

        handle.start();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.switch_to_manual();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
        assert!(handler.states().contains(&SessionState::ManualEntry));

        handle.submit_manual("96385074");
        join.await.unwrap();
        // Completion after manual entry performs no extra stream stop.
        assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
        assert_eq!(handler.decoded().len(), 1);
    }

    #[tokio::test]
    async fn cancel_while_scanning_releases_before_cancelled_event() {
        let backend = Arc::new(TestBackend::granting());
        let handler = Arc::new(RecordingHandler::default());
        let (handle, join) = spawn_session(
            Arc::clone(&backend) as _,
            Arc::new(NeverDecoder),
            Arc::clone(&handler),
        );

        handle.start();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.cancel();
        join.await.unwrap();

        assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
        assert!(handler
            .events()
            .iter()
            .any(|e| matches!(e, ScanEvent::Cancelled { .. })));
        assert!(handler.decoded().is_empty());
    }

    #[tokio::test]
    async fn cancel_during_request_tears_down_late_grant() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(TestBackend::gated(Arc::clone(&gate)));
        let handler = Arc::new(RecordingHandler::default());
        let (handle, join) = spawn_session(
            Arc::clone(&backend) as _,
            Arc::new(NeverDecoder),
            Arc::clone(&handler),
        );

        handle.start();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        handle.cancel();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        // The grant arrives after the cancel request.
        gate.notify_one();
        join.await.unwrap();

        assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
        let states = handler.states();
        assert!(!states.contains(&SessionState::Scanning));
        assert_eq!(states.last(), Some(&SessionState::Cancelled));
    }

    #[tokio::test]
    async fn permission_denial_returns_to_idle_with_guidance() {
        let backend = Arc::new(TestBackend::failing(ErrorClass::PermissionDenied));
        let handler = Arc::new(RecordingHandler::default());
        let (handle, join) = spawn_session(
            Arc::clone(&backend) as _,
            Arc::new(NeverDecoder),
            Arc::clone(&handler),
        );

        handle.start();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let events = handler.events();
        let error = events
            .iter()
            .find_map(|e| match e {
                ScanEvent::CameraError {
                    class,
                    message,
                    retryable,
                    ..
                } => Some((*class, message.clone(), *retryable)),
                _ => None,
            })
            .expect("camera error event");
        assert_eq!(error.0, ErrorClass::PermissionDenied);
        assert!(error.2);
        assert!(error.1.contains("Chrome"));
        // Only the first candidate was attempted.
        assert_eq!(backend.opens.load(Ordering::SeqCst), 1);

        // Retry re-enters Requesting.
        handle.retry();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(backend.opens.load(Ordering::SeqCst), 2);

        handle.cancel();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn insecure_context_skips_negotiation() {
        let backend = Arc::new(TestBackend::granting());
        let handler = Arc::new(RecordingHandler::default());
        let (handle, join) = ScanController::spawn(
            fast_config(),
            SessionContext::default(),
            HostEnvironment {
                media_api: true,
                scheme: "http".to_string(),
                hostname: "relevo.example.com".to_string(),
                user_agent: String::new(),
            },
            Arc::clone(&backend) as _,
            Arc::new(NeverDecoder),
            Arc::clone(&handler) as _,
        );

        handle.start();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.cancel();
        join.await.unwrap();

        assert_eq!(backend.opens.load(Ordering::SeqCst), 0);
        let error = handler
            .events()
            .iter()
            .find_map(|e| match e {
                ScanEvent::CameraError { class, retryable, .. } => Some((*class, *retryable)),
                _ => None,
            })
            .expect("camera error event");
        assert_eq!(error, (ErrorClass::InsecureContext, false));
    }

    #[tokio::test]
    async fn stop_scanning_returns_to_idle_without_result() {
        let backend = Arc::new(TestBackend::granting());
        let handler = Arc::new(RecordingHandler::default());
        let (handle, join) = spawn_session(
            Arc::clone(&backend) as _,
            Arc::new(NeverDecoder),
            Arc::clone(&handler),
        );

        handle.start();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.stop_scanning();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
        assert!(handler.decoded().is_empty());
        assert_eq!(handler.states().last(), Some(&SessionState::Idle));

        handle.cancel();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn dropping_all_handles_cancels_the_session() {
        let backend = Arc::new(TestBackend::granting());
        let handler = Arc::new(RecordingHandler::default());
        let (handle, join) = spawn_session(
            Arc::clone(&backend) as _,
            Arc::new(NeverDecoder),
            Arc::clone(&handler),
        );

        drop(handle);
        join.await.unwrap();

        assert!(handler
            .events()
            .iter()
            .any(|e| matches!(e, ScanEvent::Cancelled { .. })));
    }
}
