use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;

use crate::config::FunnelConfig;
use crate::timer::{repeat, Scheduler, TimerHandle};

/// Social-proof numbers shown around the funnel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CounterView {
    pub seats_left: u32,
    pub completed_today: u32,
    pub testimonial: usize,
    pub total_earnings: u32,
}

impl Default for CounterView {
    fn default() -> Self {
        Self {
            seats_left: 7,
            completed_today: 1247,
            testimonial: 0,
            total_earnings: 345_000,
        }
    }
}

type CounterListener = Rc<dyn Fn(CounterView)>;

struct CounterState {
    view: Cell<CounterView>,
    testimonial_count: usize,
    rng: RefCell<StdRng>,
    listeners: RefCell<Vec<CounterListener>>,
}

impl CounterState {
    fn update(&self, change: impl FnOnce(&mut CounterView, &mut StdRng)) {
        let mut view = self.view.get();
        change(&mut view, &mut self.rng.borrow_mut());
        self.view.set(view);
        let listeners: Vec<CounterListener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(view);
        }
    }
}

/// Slowly moving counters: seats left in the cohort (down by 0 or 1, never
/// below 1), diagnoses completed today, the rotating testimonial and today's
/// earnings. Each runs on its own interval; `teardown` stops all of them.
pub struct LiveCounters {
    state: Rc<CounterState>,
    timers: RefCell<Vec<TimerHandle>>,
}

impl LiveCounters {
    pub fn new(testimonial_count: usize, rng: StdRng) -> Self {
        Self {
            state: Rc::new(CounterState {
                view: Cell::new(CounterView::default()),
                testimonial_count,
                rng: RefCell::new(rng),
                listeners: RefCell::new(Vec::new()),
            }),
            timers: RefCell::new(Vec::new()),
        }
    }

    pub fn view(&self) -> CounterView {
        self.state.view.get()
    }

    pub fn is_running(&self) -> bool {
        !self.timers.borrow().is_empty()
    }

    pub fn on_update(&self, listener: impl Fn(CounterView) + 'static) {
        self.state.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Start (or restart) every interval.
    pub fn start(&self, config: &FunnelConfig, scheduler: &Rc<dyn Scheduler>) {
        self.teardown();
        debug!("starting live counters");

        let mut timers = vec![
            self.every(scheduler, config.seats_tick_ms, |view, rng| {
                view.seats_left = view.seats_left.saturating_sub(rng.gen_range(0..2)).max(1);
            }),
            self.every(scheduler, config.completed_tick_ms, |view, rng| {
                view.completed_today += rng.gen_range(1..=3);
            }),
            self.every(scheduler, config.earnings_tick_ms, |view, rng| {
                view.total_earnings += rng.gen_range(2000..7000);
            }),
        ];
        let count = self.state.testimonial_count;
        if count > 1 {
            timers.push(self.every(scheduler, config.testimonial_tick_ms, move |view, _| {
                view.testimonial = (view.testimonial + 1) % count;
            }));
        }
        *self.timers.borrow_mut() = timers;
    }

    pub fn teardown(&self) {
        let timers = std::mem::take(&mut *self.timers.borrow_mut());
        drop(timers);
    }

    fn every(
        &self,
        scheduler: &Rc<dyn Scheduler>,
        every_ms: u32,
        change: impl Fn(&mut CounterView, &mut StdRng) + 'static,
    ) -> TimerHandle {
        let state: Weak<CounterState> = Rc::downgrade(&self.state);
        repeat(scheduler, every_ms, move || match state.upgrade() {
            Some(state) => {
                state.update(|view, rng| change(view, rng));
                true
            }
            None => false,
        })
    }
}
