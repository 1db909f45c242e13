use std::time::Duration;

use tokio::{
    sync::mpsc,
    time::{Instant, sleep},
};

/// Coalesces bursts of search keystrokes into a single value.
///
/// A value is released once `quiet` has elapsed without a newer one
/// arriving. Each new value restarts the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchDebouncer {
    quiet: Duration,
}

impl SearchDebouncer {
    /// Build a debouncer with the given quiet period.
    #[must_use]
    pub const fn new(quiet: Duration) -> Self {
        Self { quiet }
    }

    /// The configured quiet period.
    #[must_use]
    pub const fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Wait for the next settled value from `input`.
    ///
    /// A value still pending when the channel closes is released immediately.
    /// Returns `None` once the channel is closed and drained.
    pub async fn next(&self, input: &mut mpsc::UnboundedReceiver<String>) -> Option<String> {
        let mut pending = input.recv().await?;
        let deadline = sleep(self.quiet);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                received = input.recv() => match received {
                    Some(text) => {
                        pending = text;
                        deadline.as_mut().reset(Instant::now() + self.quiet);
                    }
                    None => return Some(pending),
                },
                () = &mut deadline => return Some(pending),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(200);

    #[tokio::test(start_paused = true)]
    async fn burst_settles_on_last_value() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let debouncer = SearchDebouncer::new(QUIET);
        let started = Instant::now();
        for text in ["m", "ma", "mad"] {
            tx.send(text.to_owned()).expect("send keystroke");
            sleep(Duration::from_millis(50)).await;
        }
        let settled = debouncer.next(&mut rx).await;
        assert_eq!(settled.as_deref(), Some("mad"));
        assert!(started.elapsed() >= Duration::from_millis(100) + QUIET);
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_values_are_released_separately() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let debouncer = SearchDebouncer::new(QUIET);
        tx.send("a".to_owned()).expect("send first");
        assert_eq!(debouncer.next(&mut rx).await.as_deref(), Some("a"));
        tx.send("b".to_owned()).expect("send second");
        assert_eq!(debouncer.next(&mut rx).await.as_deref(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn closing_flushes_pending_value() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let debouncer = SearchDebouncer::new(QUIET);
        tx.send("lim".to_owned()).expect("send keystroke");
        drop(tx);
        assert_eq!(debouncer.next(&mut rx).await.as_deref(), Some("lim"));
        assert_eq!(debouncer.next(&mut rx).await, None);
    }
}
