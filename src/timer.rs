use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

/// A tick belonging to the question at `position`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub position: usize,
}

/// Countdown source scoped to one question.
///
/// Dropping or cancelling the timer stops the task; no further ticks are sent and nothing
/// else happens.
#[derive(Debug)]
pub struct QuestionTimer {
    position: usize,
    handle: Option<JoinHandle<()>>,
}

impl QuestionTimer {
    /// Spawn a timer for `position` that sends one tick per `interval`, first tick after one interval
    pub fn start(position: usize, interval: Duration) -> (Self, mpsc::Receiver<TimerTick>) {
        let (tx, rx) = mpsc::channel(4);

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(TimerTick { position }).await.is_err() {
                    break;
                }
            }
        });

        debug!(component = "timer", position = position, "Question timer started");
        (
            Self {
                position,
                handle: Some(handle),
            },
            rx,
        )
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!(component = "timer", position = self.position, "Question timer cancelled");
        }
    }
}

impl Drop for QuestionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_interval() {
        let (_timer, mut rx) = QuestionTimer::start(3, Duration::from_secs(1));

        for _ in 0..3 {
            let tick = rx.recv().await.unwrap();
            assert_eq!(tick, TimerTick { position: 3 });
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_before_first_interval() {
        let (_timer, mut rx) = QuestionTimer::start(0, Duration::from_secs(1));

        time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());

        time::sleep(Duration::from_millis(600)).await;
        assert_eq!(rx.recv().await, Some(TimerTick { position: 0 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (mut timer, mut rx) = QuestionTimer::start(1, Duration::from_secs(1));
        assert!(timer.is_running());

        timer.cancel();
        assert!(!timer.is_running());

        // The sender is dropped with the aborted task, closing the channel
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (timer, mut rx) = QuestionTimer::start(2, Duration::from_secs(1));
        drop(timer);
        assert_eq!(rx.recv().await, None);
    }
}
