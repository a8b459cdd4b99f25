//! Periodic timer scheduling.
//!
//! Provides portable, cooperative repeating timers without async/await or
//! platform-specific interrupts. Everything runs on the caller's thread:
//! the caller either drives the queue with real time ([`TimerQueue::tick`])
//! and sleeps in between, or steps virtual time ([`TimerQueue::advance`]).

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use embassy_time::{Duration, Instant};

/// Number of intervals a timer may fall behind before its backlog is skipped.
pub const MAX_DRIFT_FRAMES: u32 = 2;

/// Shortest interval a timer can repeat at.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Callback invoked on every timer fire
pub type Task = Box<dyn FnMut()>;

/// Handle of a scheduled repeating timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u32);

/// Abstract periodic timer facility.
///
/// Implement this trait to drive animations from a different event loop.
/// Implementations are cheap handles: cloning one must yield a handle to the
/// same underlying clock and timer set.
pub trait Scheduler: Clone + 'static {
    /// Current time of the clock the timers run on
    fn now(&self) -> Instant;

    /// Arm a timer that calls `task` every `interval`, first at `now + interval`
    fn schedule_repeating(&self, interval: Duration, task: Task) -> TimerId;

    /// Disarm a timer.
    ///
    /// Once this returns the task never runs again. Unknown ids are ignored.
    fn cancel(&self, id: TimerId);
}

/// Result of a [`TimerQueue::tick`] call.
#[derive(Debug, Clone, Copy)]
pub struct FrameResult {
    /// Number of timer fires performed during the tick.
    pub fired: usize,
    /// The earliest deadline of the remaining timers.
    pub next_deadline: Option<Instant>,
    /// How long to wait until the next deadline (zero if behind schedule).
    pub sleep_duration: Option<Duration>,
}

struct Timer {
    id: TimerId,
    interval: Duration,
    deadline: Instant,
    /// Taken out while the task is running
    task: Option<Task>,
}

struct QueueState {
    now: Instant,
    clock: Option<fn() -> Instant>,
    next_id: u32,
    timers: Vec<Timer>,
}

/// Single-threaded queue of repeating timers.
///
/// Cloning produces another handle to the same queue, so one queue can be
/// shared by every animation of a program.
///
/// # Usage
///
/// ```ignore
/// let timers = TimerQueue::with_clock(Instant::now);
///
/// loop {
///     let result = timers.tick(Instant::now());
///     // Platform-specific sleep
///     sleep(result.sleep_duration.unwrap_or(IDLE));
/// }
/// ```
#[derive(Clone)]
pub struct TimerQueue {
    inner: Rc<RefCell<QueueState>>,
}

impl TimerQueue {
    /// Create a queue on a virtual clock starting at zero.
    pub fn new() -> Self {
        Self::starting_at(Instant::from_millis(0))
    }

    /// Create a queue on a virtual clock starting at `now`.
    pub fn starting_at(now: Instant) -> Self {
        Self {
            inner: Rc::new(RefCell::new(QueueState {
                now,
                clock: None,
                next_id: 0,
                timers: Vec::new(),
            })),
        }
    }

    /// Create a queue that reads the current time from `clock`.
    ///
    /// Without a clock, [`Scheduler::now`] reports the time of the last
    /// `tick` or `advance`.
    pub fn with_clock(clock: fn() -> Instant) -> Self {
        let queue = Self::starting_at(clock());
        queue.inner.borrow_mut().clock = Some(clock);
        queue
    }

    /// Number of armed timers
    pub fn pending(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Fire every timer that is due at `now` and return timing information.
    ///
    /// A timer that has fallen more than [`MAX_DRIFT_FRAMES`] intervals
    /// behind is re-anchored to `now` instead of replaying its backlog.
    pub fn tick(&self, now: Instant) -> FrameResult {
        {
            let mut state = self.inner.borrow_mut();
            state.now = now;
            for timer in &mut state.timers {
                let max_drift = timer
                    .interval
                    .checked_mul(MAX_DRIFT_FRAMES)
                    .unwrap_or(Duration::MAX);
                if now > saturating_add(timer.deadline, max_drift) {
                    timer.deadline = now;
                }
            }
        }

        let mut fired = 0;
        while let Some((id, _)) = self.next_due(now) {
            self.fire(id);
            fired += 1;
        }

        let next_deadline = self.next_deadline();
        FrameResult {
            fired,
            next_deadline,
            sleep_duration: next_deadline.map(|deadline| deadline.saturating_duration_since(now)),
        }
    }

    /// Move the virtual clock forward by `by`, firing every deadline on the way.
    ///
    /// Deadlines are visited in time order and the clock reads exactly the
    /// deadline while its timer runs. Timers due at the same instant fire in
    /// the order they were scheduled. Returns the number of fires.
    pub fn advance(&self, by: Duration) -> usize {
        let target = saturating_add(self.inner.borrow().now, by);

        let mut fired = 0;
        while let Some((id, deadline)) = self.next_due(target) {
            self.inner.borrow_mut().now = deadline;
            self.fire(id);
            fired += 1;
        }

        self.inner.borrow_mut().now = target;
        fired
    }

    /// Find the earliest idle timer due at or before `limit`
    fn next_due(&self, limit: Instant) -> Option<(TimerId, Instant)> {
        self.inner
            .borrow()
            .timers
            .iter()
            .filter(|timer| timer.task.is_some() && timer.deadline <= limit)
            .min_by_key(|timer| timer.deadline)
            .map(|timer| (timer.id, timer.deadline))
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.inner
            .borrow()
            .timers
            .iter()
            .map(|timer| timer.deadline)
            .min()
    }

    /// Run a single timer.
    ///
    /// The queue is not borrowed while the task runs, so the task may
    /// schedule or cancel timers, including its own.
    fn fire(&self, id: TimerId) {
        let task = {
            let mut state = self.inner.borrow_mut();
            let Some(timer) = state.timers.iter_mut().find(|timer| timer.id == id) else {
                return;
            };
            timer.deadline = saturating_add(timer.deadline, timer.interval);
            timer.task.take()
        };
        let Some(mut task) = task else {
            return;
        };

        task();

        let mut state = self.inner.borrow_mut();
        if let Some(timer) = state.timers.iter_mut().find(|timer| timer.id == id) {
            timer.task = Some(task);
        }
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TimerQueue {
    fn now(&self) -> Instant {
        let state = self.inner.borrow();
        match state.clock {
            Some(clock) => clock(),
            None => state.now,
        }
    }

    fn schedule_repeating(&self, interval: Duration, task: Task) -> TimerId {
        let now = self.now();
        let interval = interval.max(MIN_INTERVAL);

        let mut state = self.inner.borrow_mut();
        let id = TimerId(state.next_id);
        state.next_id = state.next_id.wrapping_add(1);
        state.timers.push(Timer {
            id,
            interval,
            deadline: saturating_add(now, interval),
            task: Some(task),
        });
        id
    }

    fn cancel(&self, id: TimerId) {
        self.inner.borrow_mut().timers.retain(|timer| timer.id != id);
    }
}

/// Deadlines past the end of the clock stay pinned to [`Instant::MAX`]
fn saturating_add(instant: Instant, duration: Duration) -> Instant {
    instant.checked_add(duration).unwrap_or(Instant::MAX)
}
