use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::info;

use crate::config::FunnelConfig;
use crate::timer::{repeat, Scheduler, TimerHandle};

const TICK_MS: u32 = 1000;

/// What the modal needs to draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitView {
    pub open: bool,
    pub remaining_seconds: u32,
}

type ExitListener = Rc<dyn Fn(ExitView)>;

struct ExitState {
    open: Cell<bool>,
    shown: Cell<bool>,
    remaining: Cell<u32>,
    ticker: RefCell<Option<TimerHandle>>,
    listeners: RefCell<Vec<ExitListener>>,
}

impl ExitState {
    fn view(&self) -> ExitView {
        ExitView {
            open: self.open.get(),
            remaining_seconds: self.remaining.get(),
        }
    }

    fn publish(&self) {
        let view = self.view();
        let listeners: Vec<ExitListener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(view);
        }
    }

    /// One second off the clock. Returns whether the countdown goes on.
    fn tick(&self) -> bool {
        if !self.open.get() {
            return false;
        }
        let left = self.remaining.get().saturating_sub(1);
        self.remaining.set(left);
        if left == 0 {
            info!("exit offer expired");
            self.close();
            return false;
        }
        self.publish();
        true
    }

    fn close(&self) {
        self.open.set(false);
        let ticker = self.ticker.borrow_mut().take();
        drop(ticker);
        self.publish();
    }
}

/// Last-chance discount shown once when the pointer leaves through the top of
/// the window. The offer counts down one second at a time and closes itself
/// when the clock runs out.
pub struct ExitIntent {
    total_seconds: u32,
    scheduler: Rc<dyn Scheduler>,
    state: Rc<ExitState>,
}

impl ExitIntent {
    pub fn new(config: &FunnelConfig, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            total_seconds: config.exit_offer_seconds,
            scheduler,
            state: Rc::new(ExitState {
                open: Cell::new(false),
                shown: Cell::new(false),
                remaining: Cell::new(config.exit_offer_seconds),
                ticker: RefCell::new(None),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn view(&self) -> ExitView {
        self.state.view()
    }

    pub fn is_open(&self) -> bool {
        self.state.open.get()
    }

    pub fn on_update(&self, listener: impl Fn(ExitView) + 'static) {
        self.state.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// `mouseleave` on the document. Returns true if this opened the offer.
    pub fn on_pointer_leave(&self, client_y: f64) -> bool {
        if client_y > 0.0 {
            return false;
        }
        self.open()
    }

    pub fn open(&self) -> bool {
        if self.state.shown.get() {
            return false;
        }
        info!("exit offer opened");
        self.state.shown.set(true);
        self.state.open.set(true);
        self.state.remaining.set(self.total_seconds);
        let state: Weak<ExitState> = Rc::downgrade(&self.state);
        let ticker = repeat(&self.scheduler, TICK_MS, move || match state.upgrade() {
            Some(state) => state.tick(),
            None => false,
        });
        *self.state.ticker.borrow_mut() = Some(ticker);
        self.state.publish();
        true
    }

    /// Visitor took the offer. Returns false if there was nothing to accept.
    pub fn accept(&self) -> bool {
        if !self.is_open() {
            return false;
        }
        info!("exit offer accepted");
        self.state.close();
        true
    }

    pub fn dismiss(&self) {
        if self.is_open() {
            self.state.close();
        }
    }

    pub fn format_remaining(&self) -> String {
        format_clock(self.state.remaining.get())
    }

    pub fn teardown(&self) {
        let ticker = self.state.ticker.borrow_mut().take();
        drop(ticker);
    }
}

fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
