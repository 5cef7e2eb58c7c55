//! Device sessions and the synchronous transaction engine.
//!
//! A [`DeviceSession`] turns the device's single asynchronous event stream
//! into synchronous call semantics: one caller at a time installs its request
//! in the session's transaction slot, transmits, and blocks until the
//! dispatch point hands it the matching answer or the deadline passes.
//!
//! The slot is an explicit tagged state — `Idle`, `Awaiting`, `Answered` —
//! checked and transitioned under one lock, so the delivery path and caller
//! threads never share raw memory, only these transitions.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace, warn};

use hidpp_protocol::ids::{dj, report_ids};
use hidpp_protocol::{DEVICE_INDEX_WIRED, LONG_REPORT_LEN, Report, ReportKind};

use crate::init::{InitMachine, InitState, WorkItem};
use crate::transport::{DeviceBusyLock, RawHidTransport};
use crate::{HidppError, HidppResult};

/// Per-session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a synchronous command waits for its matching answer.
    pub answer_timeout: Duration,
    /// Busy probes tolerated before deferred init stands down until the next
    /// connection notification.
    pub max_init_retries: u8,
    /// Capacity of the deferred-work queue.
    pub work_queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            answer_timeout: Duration::from_secs(10),
            max_init_retries: 5,
            work_queue_capacity: 4,
        }
    }
}

/// Handler for inbound reports that no transaction claimed: HID++ frames
/// arriving while the slot is idle, and any frame the dispatch point does not
/// recognize at all.
pub type RawEventHandler = Box<dyn Fn(&DeviceSession, &[u8]) + Send + Sync>;

/// Device-specific bring-up routine run by the deferred-init machine.
pub type DeviceInitFn = Box<dyn Fn(&DeviceSession) -> HidppResult<()> + Send + Sync>;

/// What the dispatch point did with an inbound buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Consumed as the answer to the outstanding transaction; not forwarded.
    ConsumedAnswer,
    /// Dropped: malformed frame, or stray traffic during a transaction.
    Dropped,
    /// DJ notification handled internally.
    Notification,
    /// Handed to the session's raw event handler.
    Forwarded,
}

enum TransactionSlot {
    Idle,
    Awaiting { question: Report },
    Answered { answer: Report },
}

/// One live HID++ device session.
///
/// Created per attached device via [`SessionBuilder`]; all state needed to
/// correlate answers, run deferred init, and route stray traffic lives here.
pub struct DeviceSession {
    device_index: u8,
    config: SessionConfig,
    transport: Arc<dyn RawHidTransport>,
    device_lock: Option<Arc<dyn DeviceBusyLock>>,
    device_init: Option<DeviceInitFn>,
    raw_event: Option<RawEventHandler>,
    slot: Mutex<TransactionSlot>,
    answer_cond: Condvar,
    init: InitMachine,
}

impl DeviceSession {
    /// Device index this session addresses.
    #[must_use]
    pub fn device_index(&self) -> u8 {
        self.device_index
    }

    /// Current bring-up state.
    #[must_use]
    pub fn init_state(&self) -> InitState {
        self.init.state()
    }

    /// Send a feature-access command and wait for the matching answer.
    ///
    /// # Errors
    ///
    /// [`HidppError::Wire`] for over-long params, [`HidppError::Transport`]
    /// when the send fails (returned immediately), [`HidppError::Timeout`]
    /// when no matching answer arrives in time, and [`HidppError::Protocol`]
    /// when the device answers through the error report.
    pub fn send_feature_command(
        &self,
        feature_index: u8,
        funcindex_clientid: u8,
        params: &[u8],
    ) -> HidppResult<Report> {
        let question =
            Report::feature_access(self.device_index, feature_index, funcindex_clientid, params)?;
        self.send_and_wait(question)
    }

    /// Send a register-access command and wait for the matching answer.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::send_feature_command`].
    pub fn send_register_command(
        &self,
        kind: ReportKind,
        sub_id: u8,
        reg_address: u8,
        params: &[u8],
    ) -> HidppResult<Report> {
        let question =
            Report::register_access(kind, self.device_index, sub_id, reg_address, params)?;
        self.send_and_wait(question)
    }

    fn send_and_wait(&self, question: Report) -> HidppResult<Report> {
        let mut wire = [0u8; LONG_REPORT_LEN];
        let wire_len = question.encode(&mut wire);

        // Claim the transaction slot; callers on the same session serialize
        // here. Whoever holds the slot restores Idle in bounded time.
        let mut slot = self.slot.lock();
        while !matches!(*slot, TransactionSlot::Idle) {
            self.answer_cond.wait(&mut slot);
        }
        *slot = TransactionSlot::Awaiting { question };
        drop(slot);

        trace!(
            feature_index = question.feature_index(),
            funcindex_clientid = question.funcindex_clientid(),
            "transaction installed, transmitting"
        );

        if let Err(err) = self.transport.send_report(&wire[..wire_len]) {
            let mut slot = self.slot.lock();
            *slot = TransactionSlot::Idle;
            drop(slot);
            self.answer_cond.notify_all();
            debug!(error = %err, "send failed, transaction aborted");
            return Err(err);
        }

        let start = Instant::now();
        let mut slot = self.slot.lock();
        loop {
            if let TransactionSlot::Answered { answer } = *slot {
                *slot = TransactionSlot::Idle;
                drop(slot);
                self.answer_cond.notify_all();
                if answer.is_error() {
                    let code = answer.error_code();
                    debug!(code, "device reported protocol error");
                    return Err(HidppError::Protocol { code });
                }
                return Ok(answer);
            }
            let Some(remaining) = self.config.answer_timeout.checked_sub(start.elapsed()) else {
                // Clear the slot so a late answer finds no transaction and
                // gets dropped.
                *slot = TransactionSlot::Idle;
                drop(slot);
                self.answer_cond.notify_all();
                debug!(
                    timeout_ms = self.config.answer_timeout.as_millis() as u64,
                    "timed out waiting for matching answer"
                );
                return Err(HidppError::Timeout);
            };
            let _timed_out = self.answer_cond.wait_for(&mut slot, remaining);
        }
    }

    /// Single dispatch point for the asynchronous inbound stream.
    ///
    /// Classifies by the first byte: DJ notifications may queue deferred
    /// init; HID++ frames are size-validated and either consumed as the
    /// outstanding answer, dropped as stray mid-transaction traffic, or
    /// forwarded; anything else goes to the raw event handler unchanged.
    pub fn handle_raw_event(&self, data: &[u8]) -> DispatchOutcome {
        match data.first().copied() {
            Some(report_ids::DJ_SHORT) | Some(report_ids::DJ_LONG) => self.handle_dj_event(data),
            Some(report_ids::HIDPP_SHORT) | Some(report_ids::HIDPP_LONG) => {
                self.handle_hidpp_event(data)
            }
            _ => self.forward(data),
        }
    }

    fn handle_dj_event(&self, data: &[u8]) -> DispatchOutcome {
        if data.first() == Some(&report_ids::DJ_SHORT)
            && data.get(dj::REPORT_TYPE_OFFSET) == Some(&dj::NOTIF_CONNECTION_STATUS)
        {
            let status = data
                .get(dj::REPORT_PARAMS_OFFSET + dj::CONNECTION_STATUS_PARAM_STATUS)
                .copied();
            if status != Some(dj::STATUS_LINKLOSS) {
                debug!(?status, "connection notification, scheduling deferred init");
                self.schedule_init();
            }
        }
        DispatchOutcome::Notification
    }

    fn handle_hidpp_event(&self, data: &[u8]) -> DispatchOutcome {
        let report = match Report::decode(data) {
            Ok(report) => report,
            Err(err) => {
                error!(len = data.len(), error = %err, "received HID++ report of bad size");
                return DispatchOutcome::Dropped;
            }
        };

        let mut slot = self.slot.lock();
        match &*slot {
            TransactionSlot::Awaiting { question } => {
                if report.is_answer_to(question) {
                    *slot = TransactionSlot::Answered { answer: report };
                    drop(slot);
                    self.answer_cond.notify_all();
                    DispatchOutcome::ConsumedAnswer
                } else {
                    // Stray traffic during a transaction is presumed
                    // irrelevant; it never reaches the raw event handler.
                    debug!(
                        feature_index = report.feature_index(),
                        "dropping unrelated report during transaction"
                    );
                    DispatchOutcome::Dropped
                }
            }
            TransactionSlot::Answered { .. } => {
                debug!("answer already delivered, dropping follow-up report");
                DispatchOutcome::Dropped
            }
            TransactionSlot::Idle => {
                drop(slot);
                self.forward(data)
            }
        }
    }

    fn forward(&self, data: &[u8]) -> DispatchOutcome {
        match &self.raw_event {
            Some(handler) => {
                handler(self, data);
                DispatchOutcome::Forwarded
            }
            None => DispatchOutcome::Dropped,
        }
    }

    /// Queue a deferred init attempt (coalesced with any already queued).
    pub fn schedule_init(&self) {
        self.init.schedule(self.config.work_queue_capacity);
    }

    /// Drain the deferred-work queue on the calling thread.
    ///
    /// Busy probes re-queue their item, so one drain runs the whole retry
    /// ladder back-to-back; the queue is empty when this returns.
    pub fn run_deferred_work(&self) {
        while let Some(item) = self.init.pop() {
            match item {
                WorkItem::Init => self.delayed_init(),
            }
        }
    }

    /// Spawn a worker thread that drains the deferred-work queue as items
    /// arrive. The returned guard stops and joins the worker on drop.
    pub fn spawn_init_worker(self: &Arc<Self>) -> InitWorker {
        let session = Arc::clone(self);
        let handle = std::thread::spawn(move || {
            while let Some(item) = session.init.wait_pop() {
                match item {
                    WorkItem::Init => session.delayed_init(),
                }
            }
        });
        InitWorker { session: Arc::clone(self), handle: Some(handle) }
    }

    fn delayed_init(&self) {
        if self.init.state() == InitState::Initialized {
            return;
        }

        // Probe only: a successful acquisition is released before init runs,
        // trading a probe-to-init race window for not serializing init behind
        // a lock it does not need (see DESIGN.md).
        let probe_ok = match &self.device_lock {
            Some(lock) => {
                if lock.try_acquire() {
                    lock.release();
                    true
                } else {
                    false
                }
            }
            None => true,
        };

        if !probe_ok {
            if self.init.note_lock_busy(self.config.max_init_retries) {
                debug!("device held elsewhere, re-queueing init");
                self.schedule_init();
            } else {
                debug!("init retry budget exhausted, standing down until next connection event");
            }
            return;
        }

        let result = match &self.device_init {
            Some(init) => init(self),
            None => Ok(()),
        };
        match result {
            Ok(()) => {
                self.init.note_init_result(true);
                debug!("device initialized");
            }
            Err(err) => {
                self.init.note_init_result(false);
                warn!(error = %err, "device init routine failed, not retrying");
            }
        }
    }

    /// Cancel pending deferred work and wake any worker so it can exit.
    /// Called on detach; the session is unusable for deferred init afterward.
    pub fn teardown(&self) {
        self.init.shutdown();
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("device_index", &self.device_index)
            .field("init_state", &self.init.state())
            .finish()
    }
}

/// Guard over the background init worker; stops and joins it on drop.
pub struct InitWorker {
    session: Arc<DeviceSession>,
    handle: Option<JoinHandle<()>>,
}

impl InitWorker {
    /// Stop the worker, cancelling pending work, and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.session.teardown();
            if handle.join().is_err() {
                warn!("init worker exited with a panic");
            }
        }
    }
}

impl Drop for InitWorker {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

/// Builder for [`DeviceSession`].
pub struct SessionBuilder {
    device_index: u8,
    config: SessionConfig,
    transport: Arc<dyn RawHidTransport>,
    device_lock: Option<Arc<dyn DeviceBusyLock>>,
    device_init: Option<DeviceInitFn>,
    raw_event: Option<RawEventHandler>,
}

impl SessionBuilder {
    /// Start a builder over the given transport. The device index defaults
    /// to the wired/receiver index `0xFF`.
    pub fn new(transport: Arc<dyn RawHidTransport>) -> Self {
        Self {
            device_index: DEVICE_INDEX_WIRED,
            config: SessionConfig::default(),
            transport,
            device_lock: None,
            device_init: None,
            raw_event: None,
        }
    }

    /// Address a specific device behind a receiver.
    #[must_use]
    pub fn device_index(mut self, device_index: u8) -> Self {
        self.device_index = device_index;
        self
    }

    /// Override the default tuning knobs.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Register the cross-driver device lock probed by deferred init.
    #[must_use]
    pub fn device_lock(mut self, lock: Arc<dyn DeviceBusyLock>) -> Self {
        self.device_lock = Some(lock);
        self
    }

    /// Register the device-specific init routine.
    #[must_use]
    pub fn device_init<F>(mut self, init: F) -> Self
    where
        F: Fn(&DeviceSession) -> HidppResult<()> + Send + Sync + 'static,
    {
        self.device_init = Some(Box::new(init));
        self
    }

    /// Register the handler for unclaimed inbound reports.
    #[must_use]
    pub fn raw_event<F>(mut self, handler: F) -> Self
    where
        F: Fn(&DeviceSession, &[u8]) + Send + Sync + 'static,
    {
        self.raw_event = Some(Box::new(handler));
        self
    }

    /// Build the session.
    #[must_use]
    pub fn build(self) -> Arc<DeviceSession> {
        Arc::new(DeviceSession {
            device_index: self.device_index,
            config: self.config,
            transport: self.transport,
            device_lock: self.device_lock,
            device_init: self.device_init,
            raw_event: self.raw_event,
            slot: Mutex::new(TransactionSlot::Idle),
            answer_cond: Condvar::new(),
            init: InitMachine::new(),
        })
    }
}
