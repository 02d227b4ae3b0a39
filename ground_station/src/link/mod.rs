// link/mod.rs — session owner: handshake, config writes, and the two link loops
pub mod config_write;
pub mod control;
pub mod handshake;
pub mod telemetry;

pub use config_write::{ConfigReport, PendingEdit, PendingEdits};

use crate::{
    config::LinkConfig,
    errors::LinkError,
    events::{LinkEvent, LinkState},
    net::{
        Endpoint, Exchange, RetryPolicy,
        dispatch::run_dispatcher,
        udp::resolve,
    },
    recorder::SampleRecorder,
    state::{ParameterSet, SharedCell},
};
use link_protocol::{ControlAxes, ParameterInfo, TelemetryState};
use parking_lot::Mutex as SyncMutex;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{info, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;
const INBOUND_QUEUE: usize = 64;

/// State visible to the loops and to the presentation layer.
pub(crate) struct Shared {
    pub telemetry: SharedCell<TelemetryState>,
    pub controls: SharedCell<ControlAxes>,
    pub parameters: SharedCell<ParameterSet>,
    pub recorder: Arc<SyncMutex<SampleRecorder>>,
    events: broadcast::Sender<LinkEvent>,
    state: watch::Sender<LinkState>,
}

impl Shared {
    pub fn new(recorder_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (state, _) = watch::channel(LinkState::Disconnected);
        Self {
            telemetry: SharedCell::default(),
            controls: SharedCell::default(),
            parameters: SharedCell::default(),
            recorder: Arc::new(SyncMutex::new(SampleRecorder::new(recorder_capacity))),
            events,
            state,
        }
    }

    /// Best effort; nobody listening is fine.
    pub fn emit(&self, event: LinkEvent) {
        let _ = self.events.send(event);
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Returns whether the state actually changed.
    pub fn set_state(&self, next: LinkState) -> bool {
        let changed = self.state.send_if_modified(|cur| {
            if *cur == next {
                return false;
            }
            *cur = next;
            true
        });
        if changed {
            info!(state = ?next, "link state");
            self.emit(LinkEvent::StateChanged(next));
        }
        changed
    }

    /// Move to `Disconnected`. Only the caller that performs the transition
    /// gets to post the notice, so each loss is reported once.
    pub fn mark_disconnected(&self, notice: impl Into<String>) -> bool {
        let changed = self.set_state(LinkState::Disconnected);
        if changed {
            self.emit(LinkEvent::Notice(notice.into()));
        }
        changed
    }

    pub fn set_control_active(&self, on: bool) {
        let mut next = None;
        self.state.send_if_modified(|cur| match cur {
            LinkState::Connected { control_active, .. } if *control_active != on => {
                *control_active = on;
                next = Some(*cur);
                true
            }
            _ => false,
        });
        if let Some(state) = next {
            self.emit(LinkEvent::StateChanged(state));
        }
    }
}

struct Session {
    id: Uuid,
    exchange: Arc<Exchange>,
    cancel: CancellationToken,
    control: Option<CancellationToken>,
    tracker: TaskTracker,
}

impl Session {
    async fn shutdown(self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!(session = %self.id, "session closed");
    }
}

/// The ground side of the link. One remote vehicle at a time.
pub struct LinkEngine {
    cfg: LinkConfig,
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

impl LinkEngine {
    pub fn new(cfg: LinkConfig) -> Self {
        let shared = Arc::new(Shared::new(cfg.recorder_capacity));
        Self { cfg, shared, session: Mutex::new(None) }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.cfg
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.shared.events.subscribe()
    }

    pub fn state(&self) -> LinkState {
        self.shared.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.shared.state.subscribe()
    }

    /// Last decoded telemetry.
    pub fn telemetry(&self) -> TelemetryState {
        self.shared.telemetry.load()
    }

    /// Handle the input collaborator writes stick positions into.
    pub fn controls(&self) -> SharedCell<ControlAxes> {
        self.shared.controls.clone()
    }

    pub fn set_controls(&self, axes: ControlAxes) {
        self.shared.controls.store(axes);
    }

    pub fn parameters(&self) -> ParameterSet {
        self.shared.parameters.load()
    }

    pub fn recorder(&self) -> Arc<SyncMutex<SampleRecorder>> {
        self.shared.recorder.clone()
    }

    fn reply_policy(&self) -> RetryPolicy {
        RetryPolicy { tries: self.cfg.number_of_tries, timeout: self.cfg.reply_timeout() }
    }

    fn write_policy(&self) -> RetryPolicy {
        RetryPolicy { tries: self.cfg.number_of_tries, timeout: self.cfg.write_timeout() }
    }

    /// Open a fresh session to `target` (`host` or `host:port`) and run the
    /// handshake. On success the receive and transmit loops are running when
    /// this returns; on failure nothing of the session is kept.
    pub async fn connect(&self, target: &str) -> Result<(), LinkError> {
        let mut slot = self.session.lock().await;
        if let Some(old) = slot.take() {
            self.shared.mark_disconnected("Disconnected: reconnecting");
            old.shutdown().await;
        }
        self.shared.parameters.store(ParameterSet::new());
        self.shared.set_state(LinkState::Handshaking);

        let id = Uuid::new_v4();
        info!(session = %id, target, "connecting");

        let endpoint = match self.open_endpoint(target).await {
            Ok(ep) => ep,
            Err(e) => return Err(self.fail_handshake(id, e)),
        };

        let exchange = Arc::new(Exchange::new(endpoint));
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
        tracker.spawn(run_dispatcher(exchange.clone(), inbound_tx, cancel.clone()));

        let params = match handshake::run(&exchange, self.reply_policy()).await {
            Ok(p) => p,
            Err(e) => {
                cancel.cancel();
                tracker.close();
                tracker.wait().await;
                return Err(self.fail_handshake(id, e));
            }
        };

        self.shared.parameters.store(params.iter().copied().collect());
        for &(pid, value) in &params {
            self.shared.emit(LinkEvent::Parameter(ParameterInfo::describe(pid, value)));
        }
        self.shared.set_state(LinkState::Connected { telemetry_active: true, control_active: true });

        tracker.spawn(telemetry::run(
            self.shared.clone(),
            exchange.pause_flag(),
            inbound_rx,
            self.cfg.receive_poll(),
            self.cfg.liveness_budget,
            cancel.clone(),
        ));
        let control = cancel.child_token();
        tracker.spawn(control::run(
            self.shared.clone(),
            exchange.endpoint().clone(),
            exchange.pause_flag(),
            self.cfg.signal_interval(),
            control.clone(),
        ));

        info!(session = %id, parameters = params.len(), "connected");
        *slot = Some(Session { id, exchange, cancel, control: Some(control), tracker });
        Ok(())
    }

    async fn open_endpoint(&self, target: &str) -> Result<Endpoint, LinkError> {
        let peer = resolve(target, self.cfg.port).await?;
        Endpoint::open(&self.cfg.bind_addr, peer).await
    }

    fn fail_handshake(&self, id: Uuid, e: LinkError) -> LinkError {
        warn!(session = %id, error = %e, "handshake failed");
        self.shared.parameters.store(ParameterSet::new());
        self.shared.mark_disconnected(format!("Handshake failed: {e}"));
        e
    }

    /// Write pending edits. Confirmed edits are removed from `edits`; failed
    /// ones stay for a later attempt.
    pub async fn apply_config(&self, edits: &mut PendingEdits) -> Result<ConfigReport, LinkError> {
        if !self.state().is_connected() {
            return Err(LinkError::NotConnected);
        }
        if self.shared.controls.load().arm_intent() {
            warn!(pending = edits.len(), "config write refused while armed");
            return Err(LinkError::PolicyRejected);
        }
        let exchange = {
            let slot = self.session.lock().await;
            slot.as_ref().map(|s| s.exchange.clone()).ok_or(LinkError::NotConnected)?
        };
        Ok(config_write::run(&self.shared, &exchange, self.write_policy(), edits).await)
    }

    /// Restart the control transmit loop after `stop_control`.
    pub async fn start_control(&self) -> Result<(), LinkError> {
        let mut slot = self.session.lock().await;
        if !self.state().is_connected() {
            return Err(LinkError::NotConnected);
        }
        let session = slot.as_mut().ok_or(LinkError::NotConnected)?;
        if session.control.is_some() {
            return Ok(());
        }
        let token = session.cancel.child_token();
        session.tracker.spawn(control::run(
            self.shared.clone(),
            session.exchange.endpoint().clone(),
            session.exchange.pause_flag(),
            self.cfg.signal_interval(),
            token.clone(),
        ));
        session.control = Some(token);
        self.shared.set_control_active(true);
        Ok(())
    }

    /// Stop sending control datagrams; takes effect within one signal interval.
    pub async fn stop_control(&self) {
        let mut slot = self.session.lock().await;
        if let Some(token) = slot.as_mut().and_then(|s| s.control.take()) {
            token.cancel();
            self.shared.set_control_active(false);
            info!("control loop stop requested");
        }
    }

    /// End the session and wait for all of its tasks.
    pub async fn disconnect(&self) {
        let session = self.session.lock().await.take();
        self.shared.mark_disconnected("Disconnected");
        if let Some(s) = session {
            s.shutdown().await;
        }
    }
}
