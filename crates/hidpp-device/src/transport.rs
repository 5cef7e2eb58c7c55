//! Seams to the outside world: raw transport and the cross-driver lock.

use crate::HidppResult;

/// Raw report transmission primitive.
///
/// Implementations hand the buffer to the HID layer and return; they must
/// never wait for an answer, since answers come back interleaved through the
/// asynchronous inbound stream.
pub trait RawHidTransport: Send + Sync {
    /// Queue one framed report for transmission.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HidppError::Transport`] when the report cannot be
    /// handed to the device.
    fn send_report(&self, raw: &[u8]) -> HidppResult<()>;
}

/// Externally owned exclusive lock on the physical device, shared with other
/// drivers of the same hardware.
///
/// The deferred-init machine only probes it: a successful acquisition is
/// released immediately and merely signals that no other operation is
/// currently holding the device.
pub trait DeviceBusyLock: Send + Sync {
    /// Non-blocking acquisition attempt.
    fn try_acquire(&self) -> bool;

    /// Release a successful acquisition.
    fn release(&self);
}

/// In-memory doubles for tests and examples.
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::{Duration, Instant};

    use parking_lot::{Condvar, Mutex};

    use super::{DeviceBusyLock, RawHidTransport};
    use crate::{HidppError, HidppResult};

    /// Transport double that records every send and lets a responder thread
    /// pick sends up as they happen.
    #[derive(Default)]
    pub struct MockTransport {
        pending: Mutex<VecDeque<Vec<u8>>>,
        sent: Mutex<Vec<Vec<u8>>>,
        sent_cond: Condvar,
        fail_sends: AtomicBool,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent send fail with a transport error.
        pub fn set_fail_sends(&self, fail: bool) {
            self.fail_sends.store(fail, Ordering::SeqCst);
        }

        /// Every buffer ever accepted, in send order.
        pub fn sent_history(&self) -> Vec<Vec<u8>> {
            self.sent.lock().clone()
        }

        /// Block until a send arrives (or `timeout` passes) and take it.
        pub fn wait_for_send(&self, timeout: Duration) -> Option<Vec<u8>> {
            let deadline = Instant::now() + timeout;
            let mut pending = self.pending.lock();
            loop {
                if let Some(raw) = pending.pop_front() {
                    return Some(raw);
                }
                let now = Instant::now();
                if now >= deadline {
                    return None;
                }
                let _timed_out = self.sent_cond.wait_for(&mut pending, deadline - now);
            }
        }
    }

    impl RawHidTransport for MockTransport {
        fn send_report(&self, raw: &[u8]) -> HidppResult<()> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(HidppError::Transport("mock send failure".to_string()));
            }
            self.sent.lock().push(raw.to_vec());
            self.pending.lock().push_back(raw.to_vec());
            self.sent_cond.notify_all();
            Ok(())
        }
    }

    /// Cross-driver lock double with a switchable busy state and probe
    /// accounting.
    #[derive(Default)]
    pub struct MockBusyLock {
        busy: AtomicBool,
        probes: AtomicU32,
        releases: AtomicU32,
    }

    impl MockBusyLock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_busy(&self, busy: bool) {
            self.busy.store(busy, Ordering::SeqCst);
        }

        /// Acquisition attempts so far, successful or not.
        pub fn probe_count(&self) -> u32 {
            self.probes.load(Ordering::SeqCst)
        }

        /// Releases so far; a well-behaved probe releases every acquisition.
        pub fn release_count(&self) -> u32 {
            self.releases.load(Ordering::SeqCst)
        }
    }

    impl DeviceBusyLock for MockBusyLock {
        fn try_acquire(&self) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            !self.busy.load(Ordering::SeqCst)
        }

        fn release(&self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::mock::{MockBusyLock, MockTransport};
    use super::{DeviceBusyLock, RawHidTransport};
    use crate::HidppError;

    #[test]
    fn test_mock_transport_records_and_hands_out_sends() {
        let transport = MockTransport::new();
        transport.send_report(&[0x10, 0xFF, 0x00]).expect("send should succeed");

        assert_eq!(transport.sent_history(), vec![vec![0x10, 0xFF, 0x00]]);
        assert_eq!(
            transport.wait_for_send(Duration::from_millis(10)),
            Some(vec![0x10, 0xFF, 0x00])
        );
        assert_eq!(transport.wait_for_send(Duration::from_millis(10)), None);
    }

    #[test]
    fn test_mock_transport_failure_mode() {
        let transport = MockTransport::new();
        transport.set_fail_sends(true);
        let err = transport.send_report(&[0x10]);
        assert!(matches!(err, Err(HidppError::Transport(_))));
        assert!(transport.sent_history().is_empty());
    }

    #[test]
    fn test_mock_lock_accounting() {
        let lock = MockBusyLock::new();
        assert!(lock.try_acquire());
        lock.release();
        lock.set_busy(true);
        assert!(!lock.try_acquire());
        assert_eq!(lock.probe_count(), 2);
        assert_eq!(lock.release_count(), 1);
    }
}
