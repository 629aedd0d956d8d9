//! Owned, cancellable delayed tasks.
//!
//! Every delayed effect in the deck (cooldowns, transition settling, gate
//! unlocks, the exit offer countdown, checkout pacing) goes through a
//! [`Scheduler`]. The returned [`TimerHandle`] owns the task: dropping it
//! cancels the task, the same way dropping a `gloo_timers` `Timeout` clears it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use gloo_timers::callback::Timeout;

pub type Task = Box<dyn FnOnce()>;

pub trait Scheduler {
    /// Run `task` once after `delay_ms`. The task never runs once the returned
    /// handle has been dropped or cancelled.
    fn schedule(&self, delay_ms: u32, task: Task) -> TimerHandle;
}

/// Cancels its task on drop.
#[must_use = "dropping a TimerHandle cancels the scheduled task"]
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Let the task run even after the handle goes away.
    pub fn forget(mut self) {
        self.cancel = None;
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Browser scheduler backed by `setTimeout`.
///
/// The live `Timeout` and its task share a slot with the handle. Cancelling
/// takes them out and drops the `Timeout`, which clears the browser timer and
/// frees its closure. Firing takes them out too, so nothing outlives the run
/// and a handle dropped from inside its own task finds the slot empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlooScheduler;

struct Armed {
    timeout: Timeout,
    task: Task,
}

impl Scheduler for GlooScheduler {
    fn schedule(&self, delay_ms: u32, task: Task) -> TimerHandle {
        let slot: Rc<RefCell<Option<Armed>>> = Rc::new(RefCell::new(None));
        let fire_slot = slot.clone();

        let timeout = Timeout::new(delay_ms, move || {
            // emptying the slot breaks the slot -> timeout -> closure cycle
            let armed = fire_slot.borrow_mut().take();
            if let Some(Armed { timeout, task }) = armed {
                task();
                drop(timeout);
            }
        });
        *slot.borrow_mut() = Some(Armed { timeout, task });

        TimerHandle::new(move || {
            let armed = slot.borrow_mut().take();
            drop(armed);
        })
    }
}

type RepeatSlot = Rc<RefCell<Option<TimerHandle>>>;

/// Calls `tick` every `every_ms` until it returns `false` or the returned
/// handle is dropped. The interval counterpart of [`Scheduler::schedule`].
pub fn repeat(
    scheduler: &Rc<dyn Scheduler>,
    every_ms: u32,
    tick: impl Fn() -> bool + 'static,
) -> TimerHandle {
    let slot: RepeatSlot = Rc::new(RefCell::new(None));
    arm_repeat(scheduler, every_ms, Rc::new(tick), &slot);
    TimerHandle::new(move || {
        let pending = slot.borrow_mut().take();
        drop(pending);
    })
}

fn arm_repeat(scheduler: &Rc<dyn Scheduler>, every_ms: u32, tick: Rc<dyn Fn() -> bool>, slot: &RepeatSlot) {
    let next_scheduler: Weak<dyn Scheduler> = Rc::downgrade(scheduler);
    let next_slot: Weak<RefCell<Option<TimerHandle>>> = Rc::downgrade(slot);
    let handle = scheduler.schedule(
        every_ms,
        Box::new(move || {
            let (Some(scheduler), Some(slot)) = (next_scheduler.upgrade(), next_slot.upgrade()) else {
                return;
            };
            if tick() {
                arm_repeat(&scheduler, every_ms, tick, &slot);
            } else {
                let spent = slot.borrow_mut().take();
                drop(spent);
            }
        }),
    );
    let previous = slot.borrow_mut().replace(handle);
    drop(previous);
}

/// Virtual clock. Time only moves when [`ManualScheduler::advance`] is called.
///
/// Tasks run in due-time order; tasks due at the same instant run in the order
/// they were scheduled. A task may schedule further tasks, which run within the
/// same `advance` call if they fall due before its end.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<ManualClock>>,
}

#[derive(Default)]
struct ManualClock {
    now: u64,
    seq: u64,
    queue: BTreeMap<(u64, u64), Task>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.clock.borrow().now
    }

    /// Number of tasks that are scheduled and not yet run or cancelled.
    pub fn pending(&self) -> usize {
        self.clock.borrow().queue.len()
    }

    pub fn advance(&self, ms: u64) {
        let target = self.clock.borrow().now + ms;
        loop {
            // the borrow must end before the task runs, tasks schedule and cancel
            let task = {
                let mut clock = self.clock.borrow_mut();
                let key = match clock.queue.keys().next() {
                    Some(&key) if key.0 <= target => key,
                    _ => break,
                };
                clock.now = key.0;
                clock.queue.remove(&key)
            };
            if let Some(task) = task {
                task();
            }
        }
        self.clock.borrow_mut().now = target;
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay_ms: u32, task: Task) -> TimerHandle {
        let key = {
            let mut clock = self.clock.borrow_mut();
            let key = (clock.now + u64::from(delay_ms), clock.seq);
            clock.seq += 1;
            clock.queue.insert(key, task);
            key
        };

        let clock: Weak<RefCell<ManualClock>> = Rc::downgrade(&self.clock);
        TimerHandle::new(move || {
            if let Some(clock) = clock.upgrade() {
                let removed = clock.borrow_mut().queue.remove(&key);
                drop(removed);
            }
        })
    }
}
