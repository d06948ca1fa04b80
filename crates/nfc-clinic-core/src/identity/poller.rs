//! Single-shot, cancellable identity polling loop.
//!
//! ```text
//! Idle ──start──▶ Polling ──read ok──▶ Signaled (one UID emitted, loop ends)
//!                   │  ▲
//!          read err │  │ retry after interval
//!                   └──┘
//!                   │
//!                cancel ──▶ Cancelled
//! ```

use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{decode_uid, CancelToken, IdentitySource, ReadError};

/// Receiver of the single UID a poller run produces.
pub trait UidSink: Send + 'static {
    /// Deliver a detected UID. Returns `false` if nobody is listening any more.
    fn uid_detected(&self, uid: String) -> bool;
}

/// Poller lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    Signaled,
    Cancelled,
}

impl PollerState {
    fn as_u8(self) -> u8 {
        match self {
            PollerState::Idle => 0,
            PollerState::Polling => 1,
            PollerState::Signaled => 2,
            PollerState::Cancelled => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => PollerState::Polling,
            2 => PollerState::Signaled,
            3 => PollerState::Cancelled,
            _ => PollerState::Idle,
        }
    }
}

/// How a poller run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerOutcome {
    Signaled(String),
    Cancelled,
}

#[derive(Debug, Clone, Default)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn set(&self, state: PollerState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }

    fn get(&self) -> PollerState {
        PollerState::from_u8(self.0.load(Ordering::SeqCst))
    }
}

/// Polls an [`IdentitySource`] until one UID is read or the token is cancelled.
pub struct IdentityPoller<S, K> {
    source: S,
    sink: K,
    cancel: CancelToken,
    interval: Duration,
    uid_len: usize,
    state: SharedState,
}

impl<S, K> IdentityPoller<S, K>
where
    S: IdentitySource + 'static,
    K: UidSink,
{
    pub fn new(source: S, sink: K, interval: Duration, uid_len: usize) -> Self {
        Self {
            source,
            sink,
            cancel: CancelToken::new(),
            interval,
            uid_len,
            state: SharedState::default(),
        }
    }

    /// Use an externally owned token (e.g. one shared with other shutdown work).
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> PollerState {
        self.state.get()
    }

    /// Run the loop on the current thread until signaled or cancelled.
    pub fn run(mut self) -> PollerOutcome {
        self.state.set(PollerState::Polling);
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "identity poller started");

        let mut attempts: u64 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return self.cancelled(attempts);
            }

            attempts += 1;
            match self.attempt() {
                Ok(uid) => {
                    self.state.set(PollerState::Signaled);
                    tracing::info!(uid = %uid, attempts, "identity tag detected");
                    if !self.sink.uid_detected(uid.clone()) {
                        tracing::warn!(uid = %uid, "no session listening for detected UID");
                    }
                    return PollerOutcome::Signaled(uid);
                }
                Err(e) => {
                    tracing::debug!(error = %e, attempts, "identity read failed, retrying");
                }
            }

            if self.cancel.wait_timeout(self.interval) {
                return self.cancelled(attempts);
            }
        }
    }

    /// Run the loop on a dedicated thread.
    pub fn spawn(self) -> io::Result<PollerHandle> {
        let cancel = self.cancel.clone();
        let state = self.state.clone();
        let join = thread::Builder::new()
            .name("identity-poller".into())
            .spawn(move || self.run())?;
        Ok(PollerHandle {
            cancel,
            state,
            join: Some(join),
        })
    }

    fn attempt(&mut self) -> Result<String, ReadError> {
        let bytes = self.source.read_tag()?;
        decode_uid(&bytes, self.uid_len)
    }

    fn cancelled(&self, attempts: u64) -> PollerOutcome {
        self.state.set(PollerState::Cancelled);
        tracing::info!(attempts, "identity poller cancelled");
        PollerOutcome::Cancelled
    }
}

/// Owner's handle to a spawned poller.
///
/// Dropping the handle cancels the poller but does not wait for it.
#[derive(Debug)]
pub struct PollerHandle {
    cancel: CancelToken,
    state: SharedState,
    join: Option<JoinHandle<PollerOutcome>>,
}

impl PollerHandle {
    pub fn state(&self) -> PollerState {
        self.state.get()
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Ask the poller to stop at its next retry boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the poller thread to end.
    ///
    /// A read that is blocked inside the device is not interrupted; the
    /// thread ends once that read returns.
    pub fn join(mut self) -> io::Result<PollerOutcome> {
        match self.join.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "identity poller panicked")),
            None => Ok(PollerOutcome::Cancelled),
        }
    }

    /// Cancel and wait.
    pub fn shutdown(self) -> io::Result<PollerOutcome> {
        self.cancel();
        self.join()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted read results, then reports the device as absent.
    struct Scripted(VecDeque<io::Result<Vec<u8>>>);

    impl IdentitySource for Scripted {
        fn read_tag(&mut self) -> io::Result<Vec<u8>> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(io::Error::new(io::ErrorKind::NotFound, "no reader")))
        }
    }

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<String>>>);

    impl UidSink for Collect {
        fn uid_detected(&self, uid: String) -> bool {
            self.0.lock().unwrap().push(uid);
            true
        }
    }

    fn absent() -> io::Result<Vec<u8>> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no reader"))
    }

    #[test]
    fn test_retries_until_read_then_signals_once() {
        let source = Scripted(VecDeque::from(vec![
            absent(),
            Ok(vec![0x0A, 0x1B]), // short read, retried
            Ok(vec![0x0A, 0x1B, 0x2C, 0x3D, 0x99, 0x98]),
            Ok(vec![0xFF, 0xFF, 0xFF, 0xFF]),
        ]));
        let sink = Collect::default();
        let poller = IdentityPoller::new(source, sink.clone(), Duration::from_millis(1), 4);

        let outcome = poller.run();
        assert_eq!(outcome, PollerOutcome::Signaled("0A1B2C3D".into()));
        assert_eq!(*sink.0.lock().unwrap(), vec!["0A1B2C3D".to_string()]);
    }

    #[test]
    fn test_cancel_before_start() {
        let sink = Collect::default();
        let token = CancelToken::new();
        token.cancel();

        let poller = IdentityPoller::new(
            Scripted(VecDeque::from(vec![Ok(vec![1, 2, 3, 4])])),
            sink.clone(),
            Duration::from_millis(1),
            4,
        )
        .with_cancel_token(token);

        assert_eq!(poller.run(), PollerOutcome::Cancelled);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_spawned_poller_shuts_down_while_waiting() {
        let sink = Collect::default();
        let poller = IdentityPoller::new(
            Scripted(VecDeque::new()),
            sink.clone(),
            Duration::from_secs(60),
            4,
        );

        let handle = poller.spawn().unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(handle.state(), PollerState::Polling);

        let outcome = handle.shutdown().unwrap();
        assert_eq!(outcome, PollerOutcome::Cancelled);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_spawned_poller_reports_signaled_state() {
        let sink = Collect::default();
        let poller = IdentityPoller::new(
            Scripted(VecDeque::from(vec![Ok(vec![0xDE, 0xAD, 0xBE, 0xEF])])),
            sink.clone(),
            Duration::from_millis(1),
            4,
        );

        let handle = poller.spawn().unwrap();
        let state = handle.state.clone();
        let outcome = handle.join().unwrap();
        assert_eq!(outcome, PollerOutcome::Signaled("DEADBEEF".into()));
        assert_eq!(state.get(), PollerState::Signaled);
    }
}
