//! Acknowledgment contract for action envelopes.
//!
//! Every action handler gets its own [`Acknowledger`]; the dispatcher keeps
//! the matching [`AckWatch`] and races it against the deadline. The two halves
//! are joined by a oneshot channel, so acknowledging never blocks and the
//! watch learns about it immediately.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::error::{AckError, AckResult};

/// Creates a connected acknowledger/watch pair.
pub(crate) fn pair(deadline: Duration) -> (Acknowledger, AckWatch) {
    let (tx, rx) = oneshot::channel();
    (
        Acknowledger {
            signal: Mutex::new(Some(tx)),
        },
        AckWatch { rx, deadline },
    )
}

/// Handler-side half: acknowledges at most once.
#[derive(Debug)]
pub struct Acknowledger {
    signal: Mutex<Option<oneshot::Sender<()>>>,
}

impl Acknowledger {
    /// Acknowledges the action.
    ///
    /// The first call succeeds even if the deadline has already passed; the
    /// dispatcher has reported the timeout by then.
    pub fn acknowledge(&self) -> AckResult {
        let sender = self
            .signal
            .lock()
            .take()
            .ok_or(AckError::AlreadyAcknowledged)?;
        // receiver is gone once the deadline passed
        let _ = sender.send(());
        Ok(())
    }

    /// Returns `true` once [`acknowledge`](Self::acknowledge) has been called.
    pub fn is_acknowledged(&self) -> bool {
        self.signal.lock().is_none()
    }
}

/// How an acknowledgment watch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AckOutcome {
    /// Acknowledged before the deadline.
    Acknowledged,
    /// The deadline passed first.
    TimedOut,
    /// Every handle to the acknowledger was dropped without acknowledging.
    Abandoned,
}

impl AckOutcome {
    pub(crate) fn is_missed(self) -> bool {
        !matches!(self, Self::Acknowledged)
    }
}

/// Dispatcher-side half: resolves when acknowledged, abandoned, or late.
#[derive(Debug)]
pub(crate) struct AckWatch {
    rx: oneshot::Receiver<()>,
    deadline: Duration,
}

impl AckWatch {
    pub(crate) fn deadline(&self) -> Duration {
        self.deadline
    }

    pub(crate) async fn wait(self) -> AckOutcome {
        match timeout(self.deadline, self.rx).await {
            Ok(Ok(())) => AckOutcome::Acknowledged,
            Ok(Err(_)) => AckOutcome::Abandoned,
            Err(_) => AckOutcome::TimedOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_acknowledge_once() {
        let (ack, watch) = pair(Duration::from_secs(3));
        assert!(!ack.is_acknowledged());
        assert_ok!(ack.acknowledge());
        assert!(ack.is_acknowledged());
        assert_eq!(watch.wait().await, AckOutcome::Acknowledged);
    }

    #[tokio::test]
    async fn test_second_acknowledge_fails() {
        let (ack, _watch) = pair(Duration::from_secs(3));
        assert_ok!(ack.acknowledge());
        let err = assert_err!(ack.acknowledge());
        assert_eq!(err, AckError::AlreadyAcknowledged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let (ack, watch) = pair(Duration::from_secs(3));
        assert_eq!(watch.wait().await, AckOutcome::TimedOut);
        // late acknowledgment is still the first one
        assert_ok!(ack.acknowledge());
    }

    #[tokio::test]
    async fn test_dropped_acknowledger_is_abandoned() {
        let (ack, watch) = pair(Duration::from_secs(3));
        drop(ack);
        let outcome = watch.wait().await;
        assert_eq!(outcome, AckOutcome::Abandoned);
        assert!(outcome.is_missed());
    }
}
