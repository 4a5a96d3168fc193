use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const FAILURE_CLEAR: Duration = Duration::from_millis(1500);
pub const ANON_FAVORITES_NOTICE: Duration = Duration::from_millis(2000);
pub const ITEM_NOTICE: Duration = Duration::from_millis(1000);
pub const GREETING_DELAY: Duration = Duration::from_millis(600);
pub const PROMPT_DELAY: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Remaining(u8),
    Redirect,
}

/// Steps shown after a successful login, signup, update or delete.
pub fn redirect_countdown() -> [(Duration, Countdown); 4] {
    [
        (Duration::from_millis(1000), Countdown::Remaining(3)),
        (Duration::from_millis(2000), Countdown::Remaining(2)),
        (Duration::from_millis(3000), Countdown::Remaining(1)),
        (Duration::from_millis(3500), Countdown::Redirect),
    ]
}

pub fn countdown_message(remaining: u8) -> String {
    let dots = ".".repeat(4usize.saturating_sub(remaining as usize).max(1));
    format!("$  redirecting in {} secs{}", remaining, dots)
}

/// Delayed events owned by one view.
///
/// Every timer is aborted by `cancel_all` or on drop. Because a timer may have
/// fired into the channel just before cancellation, events carry the view
/// number they were scheduled under; receivers drop events for which
/// `is_current` is false.
pub struct ViewTimers<E> {
    tx: mpsc::Sender<E>,
    handles: Vec<JoinHandle<()>>,
    view: u64,
}

impl<E: Send + 'static> ViewTimers<E> {
    pub fn new(tx: mpsc::Sender<E>) -> Self {
        Self {
            tx,
            handles: Vec::new(),
            view: 0,
        }
    }

    pub fn view(&self) -> u64 {
        self.view
    }

    pub fn is_current(&self, view: u64) -> bool {
        self.view == view
    }

    /// Delivers the event built for the current view after `delay`.
    pub fn schedule(&mut self, delay: Duration, build: impl FnOnce(u64) -> E) {
        self.handles.retain(|handle| !handle.is_finished());
        let event = build(self.view);
        let tx = self.tx.clone();
        self.handles.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event).await;
        }));
    }

    /// Aborts all pending timers and starts a new view.
    pub fn cancel_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        self.view = self.view.wrapping_add(1);
    }

    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|handle| !handle.is_finished()).count()
    }
}

impl<E> Drop for ViewTimers<E> {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::timeout;

    use super::*;

    #[test]
    fn test_countdown_messages() {
        assert_eq!(countdown_message(3), "$  redirecting in 3 secs.");
        assert_eq!(countdown_message(2), "$  redirecting in 2 secs..");
        assert_eq!(countdown_message(1), "$  redirecting in 1 secs...");
    }

    #[test]
    fn test_countdown_schedule_is_ordered() {
        let steps = redirect_countdown();
        assert!(steps.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(steps[3], (Duration::from_millis(3500), Countdown::Redirect));
    }

    #[tokio::test]
    async fn test_scheduled_events_arrive_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timers = ViewTimers::new(tx);
        timers.schedule(Duration::from_millis(40), |view| (view, "late"));
        timers.schedule(Duration::from_millis(5), |view| (view, "early"));

        let first = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        let second = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first, (0, "early"));
        assert_eq!(second, (0, "late"));
    }

    #[tokio::test]
    async fn test_cancel_all_drops_pending() {
        let (tx, mut rx) = mpsc::channel::<(u64, &str)>(8);
        let mut timers = ViewTimers::new(tx);
        timers.schedule(Duration::from_millis(30), |view| (view, "stale"));
        assert_eq!(timers.pending(), 1);
        timers.cancel_all();
        assert_eq!(timers.pending(), 0);
        assert!(!timers.is_current(0));
        assert!(timers.is_current(1));

        assert!(timeout(Duration::from_millis(120), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_fired_event_from_old_view_is_detectable() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timers = ViewTimers::new(tx);
        timers.schedule(Duration::from_millis(1), |view| view);
        let view = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        timers.cancel_all();
        assert!(!timers.is_current(view));
    }

    #[tokio::test]
    async fn test_drop_aborts_timers() {
        let (tx, mut rx) = mpsc::channel::<u64>(8);
        {
            let mut timers = ViewTimers::new(tx);
            timers.schedule(Duration::from_millis(30), |view| view);
        }
        assert!(timeout(Duration::from_millis(120), rx.recv()).await.unwrap_or(None).is_none());
    }
}
