//! Debounced registration barrier.
//!
//! Every registration re-arms a quiet-period timer. When the timer elapses
//! without another registration, the fire callback runs with the epoch it was
//! armed under; the owner ignores the call unless that epoch is still current.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Cancellable quiet-period timer owned by a session.
#[derive(Debug)]
pub struct RegistrationBarrier {
    quiet_period: Duration,
    epoch: u64,
    handle: Option<JoinHandle<()>>,
}

impl RegistrationBarrier {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            epoch: 0,
            handle: None,
        }
    }

    /// Cancel any pending timer and start a fresh one.
    ///
    /// Must be called from within a tokio runtime. Returns the new epoch.
    pub fn arm<F>(&mut self, on_fire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        self.epoch += 1;

        let epoch = self.epoch;
        let quiet_period = self.quiet_period;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            on_fire(epoch);
        }));
        epoch
    }

    /// Abort the pending timer, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether a fire for `epoch` is the one the barrier is waiting for.
    ///
    /// An abort can lose the race against a timer that already woke, so the
    /// epoch is checked rather than trusting cancellation.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.handle.is_some() && self.epoch == epoch
    }

    /// Forget the handle after the current timer fired. Does not abort: the
    /// caller is usually running inside that very task.
    pub fn disarm(&mut self) {
        self.handle = None;
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }
}

impl Drop for RegistrationBarrier {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<u64>>>, impl Fn() -> Box<dyn FnOnce(u64) + Send>) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        let make = move || {
            let sink = Arc::clone(&sink);
            Box::new(move |epoch: u64| sink.lock().unwrap().push(epoch))
                as Box<dyn FnOnce(u64) + Send>
        };
        (fired, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_quiet_period() {
        let (fired, make) = recorder();
        let mut barrier = RegistrationBarrier::new(Duration::from_millis(500));
        let epoch = barrier.arm(make());
        assert_eq!(epoch, 1);
        assert!(barrier.is_armed());

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(fired.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(*fired.lock().unwrap(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_restarts_from_zero() {
        let (fired, make) = recorder();
        let mut barrier = RegistrationBarrier::new(Duration::from_millis(500));
        barrier.arm(make());

        tokio::time::sleep(Duration::from_millis(400)).await;
        let epoch = barrier.arm(make());
        assert_eq!(epoch, 2);

        // past the first deadline, before the second
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(fired.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(101)).await;
        assert_eq!(*fired.lock().unwrap(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let (fired, make) = recorder();
        let mut barrier = RegistrationBarrier::new(Duration::from_millis(100));
        barrier.arm(make());
        barrier.cancel();
        assert!(!barrier.is_armed());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_is_current() {
        let mut barrier = RegistrationBarrier::new(Duration::from_secs(60));
        assert!(!barrier.is_current(0));

        let first = barrier.arm(|_| {});
        assert!(barrier.is_current(first));

        let second = barrier.arm(|_| {});
        assert!(!barrier.is_current(first));
        assert!(barrier.is_current(second));

        barrier.disarm();
        assert!(!barrier.is_current(second));
        assert_eq!(barrier.epoch(), 2);
    }
}
