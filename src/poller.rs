//! Interval scheduler that only runs while the app is in the foreground.
//!
//! The host reports visibility and focus changes through
//! [`Poller::visibility_changed`] and [`Poller::focus_gained`]; whether the
//! app is currently visible is read from an injected [`Foreground`].

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

pub type PollFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Poll action. Invocation happens under the poller's lock, so the
/// closure itself must not call back into the poller; do any work inside
/// the returned future.
pub type PollCallback = Arc<dyn Fn() -> PollFuture + Send + Sync>;

/// Wrap an async closure as a [`PollCallback`].
pub fn callback<F, Fut>(f: F) -> PollCallback
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// Answers "is the app in the foreground right now".
pub trait Foreground: Send + Sync {
    fn is_visible(&self) -> bool;
}

/// Settable foreground flag shared between the host and its pollers.
#[derive(Clone)]
pub struct VisibilityFlag(Arc<AtomicBool>);

impl VisibilityFlag {
    pub fn new(visible: bool) -> Self {
        Self(Arc::new(AtomicBool::new(visible)))
    }

    pub fn set(&self, visible: bool) {
        self.0.store(visible, Ordering::SeqCst);
    }
}

impl Default for VisibilityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Foreground for VisibilityFlag {
    fn is_visible(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct TimerState {
    callback: PollCallback,
    interval: Duration,
    registered: bool,
    /// Bumped on every stop; a tick only fires if its generation is current.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    state: Mutex<TimerState>,
    foreground: Arc<dyn Foreground>,
    run_on_focus: bool,
}

impl Inner {
    fn clear_timer(state: &mut TimerState) {
        state.generation = state.generation.wrapping_add(1);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }

    /// Call the latest callback if `generation` is still current.
    fn invoke_if_current(&self, generation: u64) -> Option<PollFuture> {
        let state = self.state.lock();
        if !state.registered || state.generation != generation {
            return None;
        }
        Some((state.callback)())
    }
}

/// A single polling registration.
///
/// Dropping the poller stops it.
pub struct Poller {
    inner: Arc<Inner>,
}

impl Poller {
    pub fn new(
        interval: Duration,
        foreground: Arc<dyn Foreground>,
        run_on_focus: bool,
        callback: PollCallback,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(TimerState {
                    callback,
                    interval,
                    registered: false,
                    generation: 0,
                    timer: None,
                }),
                foreground,
                run_on_focus,
            }),
        }
    }

    /// Register and start ticking if visible. Does not fire immediately.
    pub fn start(&self) {
        self.inner.state.lock().registered = true;
        self.restart_timer();
    }

    /// Tear down: no invocation happens after this returns.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        state.registered = false;
        Inner::clear_timer(&mut state);
        debug!("Poller stopped");
    }

    /// Whether a timer is currently running.
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().timer.is_some()
    }

    /// Replace the callback; the next tick uses it.
    pub fn set_callback(&self, callback: PollCallback) {
        self.inner.state.lock().callback = callback;
    }

    /// Change the interval. Zero disables ticking until a positive value is set.
    pub fn set_interval(&self, interval: Duration) {
        self.inner.state.lock().interval = interval;
        self.restart_timer();
    }

    /// Run the callback once now and wait for it.
    pub async fn tick(&self) {
        let generation = self.inner.state.lock().generation;
        if let Some(fut) = self.inner.invoke_if_current(generation) {
            fut.await;
        }
    }

    /// The host's visibility changed; re-read it from the foreground source.
    pub fn visibility_changed(&self) {
        if self.inner.foreground.is_visible() {
            if self.inner.run_on_focus {
                self.fire_now();
            }
            self.restart_timer();
        } else {
            let mut state = self.inner.state.lock();
            Inner::clear_timer(&mut state);
            trace!("Poller paused while hidden");
        }
    }

    /// The host regained input focus.
    pub fn focus_gained(&self) {
        if !self.inner.foreground.is_visible() {
            return;
        }
        if self.inner.run_on_focus {
            self.fire_now();
        }
        self.restart_timer();
    }

    fn fire_now(&self) {
        let generation = {
            let state = self.inner.state.lock();
            if state.interval.is_zero() {
                return;
            }
            state.generation
        };
        if let Some(fut) = self.inner.invoke_if_current(generation) {
            tokio::spawn(fut);
        }
    }

    /// Stop any running timer, then start a fresh one if allowed.
    fn restart_timer(&self) {
        let mut state = self.inner.state.lock();
        Inner::clear_timer(&mut state);

        if !state.registered || state.interval.is_zero() || !self.inner.foreground.is_visible() {
            return;
        }

        let generation = state.generation;
        let interval = state.interval;
        let weak = Arc::downgrade(&self.inner);
        state.timer = Some(tokio::spawn(run_timer(weak, generation, interval)));
        trace!(interval_ms = interval.as_millis() as u64, "Poller timer started");
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_timer(inner: Weak<Inner>, generation: u64, interval: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let Some(fut) = inner.invoke_if_current(generation) else {
            return;
        };
        drop(inner);
        fut.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting() -> (Arc<AtomicUsize>, PollCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let cb: PollCallback = Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        });
        (count, cb)
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_on_interval_without_immediate_fire() {
        let (count, cb) = counting();
        let poller = Poller::new(
            Duration::from_millis(100),
            Arc::new(VisibilityFlag::new(true)),
            true,
            cb,
        );
        poller.start();
        assert!(poller.is_active());

        advance(50).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        advance(260).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_never_starts() {
        let (count, cb) = counting();
        let poller = Poller::new(Duration::ZERO, Arc::new(VisibilityFlag::new(true)), true, cb);
        poller.start();
        poller.focus_gained();
        advance(1_000).await;
        assert!(!poller.is_active());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn not_started_while_hidden() {
        let (count, cb) = counting();
        let poller = Poller::new(
            Duration::from_millis(100),
            Arc::new(VisibilityFlag::new(false)),
            true,
            cb,
        );
        poller.start();
        assert!(!poller.is_active());
        advance(1_000).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_pending_tick() {
        let (count, cb) = counting();
        let poller = Poller::new(
            Duration::from_millis(100),
            Arc::new(VisibilityFlag::new(true)),
            false,
            cb,
        );
        poller.start();
        advance(99).await;
        poller.stop();
        advance(1_000).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!poller.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn latest_callback_is_used() {
        let (first, cb1) = counting();
        let (second, cb2) = counting();
        let poller = Poller::new(
            Duration::from_millis(100),
            Arc::new(VisibilityFlag::new(true)),
            false,
            cb1,
        );
        poller.start();
        advance(150).await;
        poller.set_callback(cb2);
        advance(100).await;
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
