//! Curve driven animations
//!
//! An [`Animation`] samples a curve at a fixed frame rate and pushes the
//! sampled value, clamped to `[0, 1]`, to every subscriber.
//!
//! Animations keep their progress across `stop`/`start` cycles: the elapsed
//! time origin is shifted by the length of the pause, so a resumed animation
//! continues exactly where it stopped.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use embassy_time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::scheduler::{Scheduler, Task, TimerId, TimerQueue};

/// Default interval between frames, in milliseconds.
pub const DEFAULT_FRAME_RATE_MS: u64 = 60;

/// Longest frame rate `Duration::from_millis` accepts without overflowing
const MAX_FRAME_RATE_MS: u64 = u64::MAX / embassy_time::TICK_HZ;

/// Curve function: elapsed milliseconds to raw (unclamped) intensity
pub type Curve = Rc<dyn Fn(f64) -> f64>;

/// Subscriber callback, identified by its `Rc` allocation
pub type Listener = Rc<dyn Fn(f64)>;

/// State shared with the scheduled frame task
struct Playback {
    start_time: Option<Instant>,
    subscribers: Vec<Listener>,
}

/// Time based animation
///
/// Copies made with [`Animation::copy`] share the curve but nothing else,
/// so a copy can be started, stopped and subscribed to independently.
pub struct Animation<S: Scheduler = TimerQueue> {
    curve: Curve,
    frame_rate: Duration,
    scheduler: S,
    stop_time: Option<Instant>,
    timer: Option<TimerId>,
    playback: Rc<RefCell<Playback>>,
}

impl<S: Scheduler> Animation<S> {
    /// Create an animation refreshing every [`DEFAULT_FRAME_RATE_MS`] milliseconds.
    pub fn new<F>(curve: F, scheduler: S) -> Self
    where
        F: Fn(f64) -> f64 + 'static,
    {
        Self::from_parts(
            Rc::new(curve),
            Duration::from_millis(DEFAULT_FRAME_RATE_MS),
            scheduler,
        )
    }

    /// Create an animation with a custom frame rate.
    ///
    /// Fractional rates are floored. Rates below 1 ms, and rates too long to
    /// be represented as a [`Duration`], are rejected.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn with_frame_rate<F>(curve: F, scheduler: S, frame_rate_ms: f64) -> Result<Self>
    where
        F: Fn(f64) -> f64 + 'static,
    {
        if frame_rate_ms.is_nan() || frame_rate_ms < 1.0 {
            return Err(Error::InvalidArgument(
                "cannot create an animation with a frame rate less than 1",
            ));
        }
        if frame_rate_ms >= MAX_FRAME_RATE_MS as f64 {
            return Err(Error::InvalidArgument(
                "frame rate is too long to be represented",
            ));
        }
        let frame_rate = Duration::from_millis(libm::floor(frame_rate_ms) as u64);
        Ok(Self::from_parts(Rc::new(curve), frame_rate, scheduler))
    }

    fn from_parts(curve: Curve, frame_rate: Duration, scheduler: S) -> Self {
        Self {
            curve,
            frame_rate,
            scheduler,
            stop_time: None,
            timer: None,
            playback: Rc::new(RefCell::new(Playback {
                start_time: None,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Start or resume the animation.
    ///
    /// Does nothing if the animation is already running.
    pub fn start(&mut self) -> &mut Self {
        if self.is_running() {
            return self;
        }

        let now = self.scheduler.now();
        {
            let mut playback = self.playback.borrow_mut();
            let start_time = playback.start_time.get_or_insert(now);
            // Shift the origin by the pause so progress carries over
            if let Some(stop_time) = self.stop_time.take() {
                *start_time += now.saturating_duration_since(stop_time);
            }
        }

        let task = self.frame_task();
        self.timer = Some(self.scheduler.schedule_repeating(self.frame_rate, task));

        #[cfg(feature = "log")]
        log::debug!(
            "animation: started, frame rate {} ms",
            self.frame_rate.as_millis()
        );
        self
    }

    /// Stop the animation, keeping its progress.
    ///
    /// No frame fires after this returns. Does nothing if not running.
    pub fn stop(&mut self) -> &mut Self {
        if let Some(timer) = self.timer.take() {
            self.stop_time = Some(self.scheduler.now());
            self.scheduler.cancel(timer);

            #[cfg(feature = "log")]
            log::debug!("animation: stopped");
        }
        self
    }

    /// Rewind the animation.
    ///
    /// A running animation jumps back to the start of its curve and keeps
    /// running. A stopped one forgets its progress, so the next `start`
    /// begins from scratch.
    pub fn reset(&mut self) -> &mut Self {
        if self.is_running() {
            self.playback.borrow_mut().start_time = Some(self.scheduler.now());
        } else {
            self.playback.borrow_mut().start_time = None;
            self.stop_time = None;
        }

        #[cfg(feature = "log")]
        log::debug!("animation: reset (running: {})", self.timer.is_some());
        self
    }

    /// Value of the animation right now.
    ///
    /// Uses the time elapsed since the animation was started, or zero if it
    /// never was.
    pub fn calculate(&self) -> f64 {
        let elapsed = self
            .playback
            .borrow()
            .start_time
            .map_or(Duration::from_ticks(0), |start_time| {
                self.scheduler.now().saturating_duration_since(start_time)
            });
        sample(&self.curve, as_millis_f64(elapsed))
    }

    /// Value of the animation at `time` milliseconds, clamped to `[0, 1]`.
    pub fn calculate_at(&self, time: f64) -> f64 {
        sample(&self.curve, time)
    }

    /// Check if a frame timer is armed
    pub const fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Interval between frames
    pub const fn frame_rate(&self) -> Duration {
        self.frame_rate
    }

    /// Add a listener called with the new value on every frame.
    ///
    /// Listeners are called in subscription order. Subscribing the same
    /// listener twice has no effect.
    pub fn subscribe(&mut self, listener: Listener) -> &mut Self {
        let mut playback = self.playback.borrow_mut();
        if !playback
            .subscribers
            .iter()
            .any(|existing| Rc::ptr_eq(existing, &listener))
        {
            playback.subscribers.push(listener);
        }
        drop(playback);
        self
    }

    /// Remove a listener. Unknown listeners are ignored.
    pub fn unsubscribe(&mut self, listener: &Listener) -> &mut Self {
        self.playback
            .borrow_mut()
            .subscribers
            .retain(|existing| !Rc::ptr_eq(existing, listener));
        self
    }

    /// Number of subscribed listeners
    pub fn subscriber_count(&self) -> usize {
        self.playback.borrow().subscribers.len()
    }

    /// Create a detached animation with the same curve and frame rate.
    ///
    /// The copy is not running, has no subscribers and no progress.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self::from_parts(Rc::clone(&self.curve), self.frame_rate, self.scheduler.clone())
    }

    /// Build the task run by the scheduler on every frame
    fn frame_task(&self) -> Task {
        let playback = Rc::downgrade(&self.playback);
        let curve = Rc::clone(&self.curve);
        let scheduler = self.scheduler.clone();

        Box::new(move || {
            let Some(playback) = playback.upgrade() else {
                return;
            };
            // Release the borrow before calling out, listeners may touch the animation
            let (value, listeners) = {
                let playback = playback.borrow();
                let elapsed = playback
                    .start_time
                    .map_or(Duration::from_ticks(0), |start_time| {
                        scheduler.now().saturating_duration_since(start_time)
                    });
                (
                    sample(&curve, as_millis_f64(elapsed)),
                    playback.subscribers.clone(),
                )
            };
            for listener in &listeners {
                listener(value);
            }
        })
    }
}

impl<S: Scheduler> Drop for Animation<S> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            self.scheduler.cancel(timer);
        }
    }
}

impl<S: Scheduler> fmt::Debug for Animation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let playback = self.playback.borrow();
        f.debug_struct("Animation")
            .field("frame_rate", &self.frame_rate)
            .field("running", &self.is_running())
            .field("start_time", &playback.start_time)
            .field("stop_time", &self.stop_time)
            .field("subscribers", &playback.subscribers.len())
            .finish_non_exhaustive()
    }
}

/// Evaluate the curve and clamp the result to `[0, 1]`
fn sample(curve: &Curve, time: f64) -> f64 {
    let value = curve(time);
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

#[allow(clippy::cast_precision_loss)]
fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_micros() as f64 / 1000.0
}
