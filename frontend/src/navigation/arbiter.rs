use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::debug;

use crate::config::FunnelConfig;
use crate::timer::{Scheduler, TimerHandle};

/// What a gesture asks the controller to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Advance,
    Retreat,
    JumpTo(usize),
}

/// Keys the deck reacts to. Everything else keeps its browser default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavKey {
    ArrowDown,
    PageDown,
    Space,
    ArrowUp,
    PageUp,
    Home,
    End,
}

impl NavKey {
    /// Accepts both `KeyboardEvent.key` and `KeyboardEvent.code` spellings.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowDown" | "Down" => Some(NavKey::ArrowDown),
            "PageDown" => Some(NavKey::PageDown),
            " " | "Space" | "Spacebar" => Some(NavKey::Space),
            "ArrowUp" | "Up" => Some(NavKey::ArrowUp),
            "PageUp" => Some(NavKey::PageUp),
            "Home" => Some(NavKey::Home),
            "End" => Some(NavKey::End),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct TouchTrack {
    start_y: f64,
    end_y: Option<f64>,
}

/// Turns raw wheel/touch/key/click input into at most one [`Intent`] per
/// gesture.
///
/// The caller reports an accepted transition with [`InputArbiter::commit`],
/// which starts a `cooldown_ms` cooldown. Intents the controller rejects (at
/// either end of the deck, or mid transition) leave the arbiter open. Events
/// arriving during the cooldown still update touch tracking but produce
/// nothing, so one long wheel fling or a held arrow key moves a single
/// section.
pub struct InputArbiter {
    section_count: usize,
    swipe_threshold: f64,
    cooldown_ms: u32,
    scheduler: Rc<dyn Scheduler>,
    cooling: Rc<Cell<bool>>,
    cooldown: RefCell<Option<TimerHandle>>,
    touch: Cell<Option<TouchTrack>>,
}

impl InputArbiter {
    pub fn new(section_count: usize, config: &FunnelConfig, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            section_count,
            swipe_threshold: config.swipe_threshold,
            cooldown_ms: config.cooldown_ms,
            scheduler,
            cooling: Rc::new(Cell::new(false)),
            cooldown: RefCell::new(None),
            touch: Cell::new(None),
        }
    }

    pub fn is_cooling_down(&self) -> bool {
        self.cooling.get()
    }

    pub fn on_wheel(&self, delta_y: f64) -> Option<Intent> {
        let intent = if delta_y > 0.0 {
            Some(Intent::Advance)
        } else if delta_y < 0.0 {
            Some(Intent::Retreat)
        } else {
            None
        };
        self.forward(intent)
    }

    pub fn on_touch_start(&self, y: f64) {
        self.touch.set(Some(TouchTrack { start_y: y, end_y: None }));
    }

    pub fn on_touch_move(&self, y: f64) {
        if let Some(mut track) = self.touch.get() {
            track.end_y = Some(y);
            self.touch.set(Some(track));
        }
    }

    /// Finger lifted. A touch that never moved is a tap, not a swipe.
    pub fn on_touch_end(&self) -> Option<Intent> {
        match self.touch.take() {
            Some(TouchTrack { start_y, end_y: Some(end_y) }) => self.on_touch_sequence(start_y, end_y),
            _ => None,
        }
    }

    /// Classify a complete drag. Dragging up (start below end on screen)
    /// advances.
    pub fn on_touch_sequence(&self, start_y: f64, end_y: f64) -> Option<Intent> {
        let distance = start_y - end_y;
        let intent = if distance > self.swipe_threshold {
            Some(Intent::Advance)
        } else if distance < -self.swipe_threshold {
            Some(Intent::Retreat)
        } else {
            None
        };
        self.forward(intent)
    }

    pub fn on_key(&self, key: NavKey) -> Option<Intent> {
        let intent = match key {
            NavKey::ArrowDown | NavKey::PageDown | NavKey::Space => Intent::Advance,
            NavKey::ArrowUp | NavKey::PageUp => Intent::Retreat,
            NavKey::Home => Intent::JumpTo(0),
            NavKey::End => Intent::JumpTo(self.section_count.saturating_sub(1)),
        };
        self.forward(Some(intent))
    }

    /// Dots, arrows and content-driven jumps. Not subject to the cooldown,
    /// but committing one starts it so a trailing wheel tick can't double-move.
    pub fn on_direct_request(&self, index: usize) -> Intent {
        Intent::JumpTo(index)
    }

    /// The controller accepted the last intent. Starts (or restarts) the
    /// cooldown.
    pub fn commit(&self) {
        self.cooling.set(true);
        let cooling = Rc::downgrade(&self.cooling);
        let handle = self.scheduler.schedule(
            self.cooldown_ms,
            Box::new(move || {
                if let Some(cooling) = cooling.upgrade() {
                    cooling.set(false);
                }
            }),
        );
        // replacing the old handle cancels its pending clear
        let previous = self.cooldown.borrow_mut().replace(handle);
        drop(previous);
    }

    pub fn teardown(&self) {
        self.cooldown.borrow_mut().take();
        self.touch.set(None);
        self.cooling.set(false);
    }

    fn forward(&self, intent: Option<Intent>) -> Option<Intent> {
        let intent = intent?;
        if self.cooling.get() {
            debug!("input {:?} swallowed by cooldown", intent);
            return None;
        }
        Some(intent)
    }
}
