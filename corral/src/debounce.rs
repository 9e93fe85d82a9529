//! Trailing-edge debouncing of a changing value.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

/// Quiet period used when none is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Publishes the latest pushed value once no new value arrived for `delay`.
///
/// Bursts of pushes collapse into a single publication of the last value,
/// `delay` after the last push. Publishing a value equal to the current
/// settled value is skipped. Dropping the debouncer cancels a pending
/// publication.
///
/// # Example
///
/// ```no_run
/// use corral::Debouncer;
/// use std::time::Duration;
///
/// # async fn run() {
/// let debouncer = Debouncer::new(String::new(), Duration::from_millis(500));
/// let mut settled = debouncer.subscribe();
/// debouncer.push("app".to_string());
/// debouncer.push("apple".to_string());
/// settled.changed().await.unwrap();
/// assert_eq!(*settled.borrow(), "apple");
/// # }
/// ```
#[derive(Debug)]
pub struct Debouncer<T> {
    input: watch::Sender<T>,
    output: watch::Receiver<T>,
    task: JoinHandle<()>,
    delay: Duration,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Starts a debouncer whose settled value is initially `initial`.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(initial: T, delay: Duration) -> Self {
        let (input, mut pending) = watch::channel(initial.clone());
        let (settled, output) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                if pending.changed().await.is_err() {
                    return;
                }
                // Restart the quiet period on every new value.
                loop {
                    tokio::select! {
                        changed = pending.changed() => {
                            if changed.is_err() {
                                return;
                            }
                        }
                        () = tokio::time::sleep(delay) => break,
                    }
                }
                let value = pending.borrow_and_update().clone();
                let published = settled.send_if_modified(|current| {
                    if *current == value {
                        false
                    } else {
                        *current = value;
                        true
                    }
                });
                trace!(published, "debounce settled");
            }
        });

        Self {
            input,
            output,
            task,
            delay,
        }
    }

    /// Records a new value and restarts the quiet period.
    pub fn push(&self, value: T) {
        self.input.send_replace(value);
    }

    /// Latest pushed value, settled or not.
    pub fn latest(&self) -> T {
        self.input.borrow().clone()
    }

    /// Current settled value.
    pub fn settled(&self) -> T {
        self.output.borrow().clone()
    }

    /// Receiver notified on every settled change.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.output.clone()
    }

    /// Configured quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_into_one_publication() {
        let debouncer = Debouncer::new(String::new(), Duration::from_millis(500));
        let mut settled = debouncer.subscribe();
        let start = Instant::now();

        for (i, value) in ["a", "ap", "app", "apple"].into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            debouncer.push(value.to_string());
        }

        settled.changed().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(800));
        assert_eq!(*settled.borrow_and_update(), "apple");

        let again = tokio::time::timeout(Duration::from_secs(5), settled.changed()).await;
        assert!(again.is_err(), "settled value published twice");
    }

    #[tokio::test(start_paused = true)]
    async fn equal_value_is_not_republished() {
        let debouncer = Debouncer::new("x".to_string(), Duration::from_millis(50));
        let mut settled = debouncer.subscribe();
        debouncer.push("y".to_string());
        debouncer.push("x".to_string());

        let changed = tokio::time::timeout(Duration::from_secs(1), settled.changed()).await;
        assert!(changed.is_err());
        assert_eq!(debouncer.latest(), "x");
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_publication() {
        let debouncer = Debouncer::new(0u32, Duration::from_millis(50));
        let mut settled = debouncer.subscribe();
        debouncer.push(1);
        drop(debouncer);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*settled.borrow_and_update(), 0);
        assert!(settled.changed().await.is_err());
    }
}
