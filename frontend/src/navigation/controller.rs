use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, info};

use crate::config::DEFAULT_TRANSITION_MS;
use crate::error::ConfigError;
use crate::navigation::arbiter::Intent;
use crate::timer::{Scheduler, TimerHandle};

pub type SectionListener = Rc<dyn Fn(usize)>;

/// Read-only snapshot of where the deck is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavigationState {
    pub current_index: usize,
    pub is_transitioning: bool,
    pub section_count: usize,
}

impl NavigationState {
    pub fn initial(section_count: usize) -> Self {
        Self {
            current_index: 0,
            is_transitioning: false,
            section_count,
        }
    }

    /// Fill ratio for the top progress bar, in (0.0, 1.0].
    pub fn progress(&self) -> f64 {
        if self.section_count == 0 {
            return 0.0;
        }
        (self.current_index + 1) as f64 / self.section_count as f64
    }

    pub fn counter_label(&self) -> String {
        format!("{} / {}", self.current_index + 1, self.section_count)
    }

    pub fn can_advance(&self) -> bool {
        self.current_index + 1 < self.section_count
    }

    pub fn can_retreat(&self) -> bool {
        self.current_index > 0
    }
}

/// Sole owner of the current section index.
///
/// Transitions are single-flight: an accepted transition marks the controller
/// busy until `transition_ms` has passed, and every request that arrives in
/// the meantime is dropped. Out of range targets and jumps to the current
/// section are dropped the same way. Nothing is queued or retried.
pub struct SectionController {
    section_count: usize,
    transition_ms: u32,
    current: Cell<usize>,
    busy: Rc<Cell<bool>>,
    settle: RefCell<Option<TimerHandle>>,
    scheduler: Rc<dyn Scheduler>,
    listeners: RefCell<Vec<SectionListener>>,
}

impl SectionController {
    pub fn new(
        section_count: usize,
        on_change: impl Fn(usize) + 'static,
        scheduler: Rc<dyn Scheduler>,
    ) -> Result<Self, ConfigError> {
        if section_count < 1 {
            return Err(ConfigError::EmptySections);
        }
        let on_change: SectionListener = Rc::new(on_change);
        Ok(Self {
            section_count,
            transition_ms: DEFAULT_TRANSITION_MS,
            current: Cell::new(0),
            busy: Rc::new(Cell::new(false)),
            settle: RefCell::new(None),
            scheduler,
            listeners: RefCell::new(vec![on_change]),
        })
    }

    pub fn with_transition_ms(mut self, transition_ms: u32) -> Self {
        self.transition_ms = transition_ms;
        self
    }

    /// Additional section-changed listener, called after the constructor's.
    pub fn subscribe(&self, listener: impl Fn(usize) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    pub fn current(&self) -> usize {
        self.current.get()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    pub fn state(&self) -> NavigationState {
        NavigationState {
            current_index: self.current.get(),
            is_transitioning: self.busy.get(),
            section_count: self.section_count,
        }
    }

    pub fn go_to(&self, index: usize) -> bool {
        self.request_transition(Intent::JumpTo(index))
    }

    pub fn next(&self) -> bool {
        self.request_transition(Intent::Advance)
    }

    pub fn previous(&self) -> bool {
        self.request_transition(Intent::Retreat)
    }

    /// Returns whether the transition was accepted.
    pub fn request_transition(&self, intent: Intent) -> bool {
        if self.busy.get() {
            debug!("{:?} dropped, transition in flight", intent);
            return false;
        }

        let current = self.current.get();
        let target = match intent {
            Intent::Advance => current.checked_add(1),
            Intent::Retreat => current.checked_sub(1),
            Intent::JumpTo(index) => Some(index),
        };
        let target = match target {
            Some(target) if target < self.section_count => target,
            _ => {
                debug!("{:?} from section {} is out of range", intent, current);
                return false;
            }
        };
        if target == current {
            return false;
        }

        self.busy.set(true);
        self.current.set(target);
        info!("section {} -> {}", current, target);

        // listeners may subscribe while being notified
        let listeners: Vec<SectionListener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(target);
        }

        let busy = Rc::downgrade(&self.busy);
        let handle = self.scheduler.schedule(
            self.transition_ms,
            Box::new(move || {
                if let Some(busy) = busy.upgrade() {
                    busy.set(false);
                }
            }),
        );
        let previous = self.settle.borrow_mut().replace(handle);
        drop(previous);
        true
    }

    pub fn teardown(&self) {
        let pending = self.settle.borrow_mut().take();
        drop(pending);
    }
}
