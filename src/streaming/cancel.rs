//! Cancellation signal for in-flight relays

use tokio::sync::watch;

/// Caller side: fire once to stop a relay
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Relay side: resolves once the handle fires
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle/signal pair
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        // No receivers left means nothing is running
        let _ = self.tx.send(true);
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for cancellation; never resolves if the handle is dropped unfired
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Wait on an optional signal; `None` never fires
pub(crate) async fn wait_cancelled(signal: &mut Option<CancelSignal>) {
    match signal {
        Some(signal) => signal.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_resolves_waiter() {
        let (handle, mut signal) = cancel_pair();
        assert!(!signal.is_cancelled());

        let waiter = tokio::spawn(async move {
            signal.cancelled().await;
            true
        });
        handle.cancel();

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_handle_never_fires() {
        let (handle, mut signal) = cancel_pair();
        drop(handle);

        let result = tokio::time::timeout(Duration::from_millis(50), signal.cancelled()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let (handle, mut signal) = cancel_pair();
        handle.cancel();
        signal.cancelled().await;
        assert!(signal.is_cancelled());
    }
}
