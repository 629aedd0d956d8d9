use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::info;
use serde::Serialize;

use crate::config::FunnelConfig;
use crate::funnel::sections::ContentVariant;
use crate::timer::{Scheduler, TimerHandle};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GateState {
    pub quiz_unlocked: bool,
    pub pricing_unlocked: bool,
}

/// Emitted a while after the quiz is completed, nudging the visitor towards
/// pricing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecondaryOffer {
    pub contact: String,
    pub pricing_section: usize,
}

type GateListener = Rc<dyn Fn()>;
type OfferListener = Rc<dyn Fn(&SecondaryOffer)>;

#[derive(Default)]
struct GateShared {
    state: Cell<GateState>,
    contact: RefCell<Option<String>>,
    quiz_listeners: RefCell<Vec<GateListener>>,
    pricing_listeners: RefCell<Vec<GateListener>>,
    offer_listeners: RefCell<Vec<OfferListener>>,
    pricing_timer: RefCell<Option<TimerHandle>>,
    offer_timer: RefCell<Option<TimerHandle>>,
}

impl GateShared {
    fn set_quiz(&self, unlocked: bool) {
        let mut state = self.state.get();
        if state.quiz_unlocked == unlocked {
            return;
        }
        state.quiz_unlocked = unlocked;
        self.state.set(state);
        info!("quiz gate {}", if unlocked { "unlocked" } else { "locked" });
        if unlocked {
            emit(&self.quiz_listeners);
        }
    }

    fn set_pricing(&self, unlocked: bool) {
        let mut state = self.state.get();
        if state.pricing_unlocked == unlocked {
            return;
        }
        state.pricing_unlocked = unlocked;
        self.state.set(state);
        info!("pricing gate {}", if unlocked { "unlocked" } else { "locked" });
        if unlocked {
            emit(&self.pricing_listeners);
        }
    }
}

fn emit(listeners: &RefCell<Vec<GateListener>>) {
    let listeners: Vec<GateListener> = listeners.borrow().clone();
    for listener in listeners {
        listener();
    }
}

/// Tracks which optional sections the visitor has earned.
///
/// Gates open through explicit calls (`unlock_quiz`, `complete_quiz`) or by
/// reaching the gated section. Unlock listeners fire once per closed→open
/// flip. The pricing unlock and secondary offer after `complete_quiz` are
/// owned timers; `teardown` (or dropping the gate) cancels both.
pub struct FunnelGate {
    quiz_section: usize,
    pricing_section: usize,
    pricing_unlock_ms: u32,
    secondary_offer_ms: u32,
    scheduler: Rc<dyn Scheduler>,
    shared: Rc<GateShared>,
}

impl FunnelGate {
    pub fn new(config: &FunnelConfig, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            quiz_section: config.quiz_section,
            pricing_section: config.pricing_section,
            pricing_unlock_ms: config.pricing_unlock_ms,
            secondary_offer_ms: config.secondary_offer_ms,
            scheduler,
            shared: Rc::new(GateShared::default()),
        }
    }

    pub fn state(&self) -> GateState {
        self.shared.state.get()
    }

    /// Contact recorded by the last `complete_quiz`.
    pub fn contact(&self) -> Option<String> {
        self.shared.contact.borrow().clone()
    }

    pub fn unlock_quiz(&self) {
        self.shared.set_quiz(true);
    }

    pub fn lock_quiz(&self) {
        self.shared.set_quiz(false);
    }

    pub fn unlock_pricing(&self) {
        self.shared.set_pricing(true);
    }

    pub fn lock_pricing(&self) {
        self.shared.set_pricing(false);
    }

    /// Record the quiz result, then open pricing after `pricing_unlock_ms`
    /// and emit the secondary offer `secondary_offer_ms` after completion.
    /// Completing again restarts both timers.
    pub fn complete_quiz(&self, contact: impl Into<String>) {
        let contact = contact.into();
        info!("quiz completed");
        *self.shared.contact.borrow_mut() = Some(contact.clone());

        let shared: Weak<GateShared> = Rc::downgrade(&self.shared);
        let unlock = self.scheduler.schedule(
            self.pricing_unlock_ms,
            Box::new(move || {
                if let Some(shared) = shared.upgrade() {
                    let spent = shared.pricing_timer.borrow_mut().take();
                    drop(spent);
                    shared.set_pricing(true);
                }
            }),
        );
        let previous = self.shared.pricing_timer.borrow_mut().replace(unlock);
        drop(previous);

        let shared: Weak<GateShared> = Rc::downgrade(&self.shared);
        let offer = SecondaryOffer {
            contact,
            pricing_section: self.pricing_section,
        };
        let prompt = self.scheduler.schedule(
            self.secondary_offer_ms,
            Box::new(move || {
                if let Some(shared) = shared.upgrade() {
                    let spent = shared.offer_timer.borrow_mut().take();
                    drop(spent);
                    let listeners: Vec<OfferListener> = shared.offer_listeners.borrow().clone();
                    for listener in listeners {
                        listener(&offer);
                    }
                }
            }),
        );
        let previous = self.shared.offer_timer.borrow_mut().replace(prompt);
        drop(previous);
    }

    /// Hook for section-changed notifications.
    pub fn reached_index(&self, index: usize) {
        let state = self.state();
        if index == self.quiz_section && !state.quiz_unlocked {
            self.unlock_quiz();
        }
        if index == self.pricing_section && !state.pricing_unlocked {
            self.unlock_pricing();
        }
    }

    /// Which flavour of content to render at `index`.
    pub fn variant_for(&self, index: usize) -> ContentVariant {
        let state = self.state();
        let open = if index == self.quiz_section {
            state.quiz_unlocked
        } else if index == self.pricing_section {
            state.pricing_unlocked
        } else {
            true
        };
        if open {
            ContentVariant::Ready
        } else {
            ContentVariant::Placeholder
        }
    }

    pub fn on_quiz_unlocked(&self, callback: impl Fn() + 'static) {
        self.shared.quiz_listeners.borrow_mut().push(Rc::new(callback));
    }

    pub fn on_pricing_unlocked(&self, callback: impl Fn() + 'static) {
        self.shared.pricing_listeners.borrow_mut().push(Rc::new(callback));
    }

    pub fn on_secondary_offer(&self, callback: impl Fn(&SecondaryOffer) + 'static) {
        self.shared.offer_listeners.borrow_mut().push(Rc::new(callback));
    }

    pub fn has_pending_timers(&self) -> bool {
        self.shared.pricing_timer.borrow().is_some() || self.shared.offer_timer.borrow().is_some()
    }

    pub fn teardown(&self) {
        let unlock = self.shared.pricing_timer.borrow_mut().take();
        let prompt = self.shared.offer_timer.borrow_mut().take();
        drop(unlock);
        drop(prompt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualScheduler;

    fn gate() -> (FunnelGate, ManualScheduler) {
        let scheduler = ManualScheduler::new();
        let gate = FunnelGate::new(&FunnelConfig::default(), Rc::new(scheduler.clone()));
        (gate, scheduler)
    }

    fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, move || c.set(c.get() + 1))
    }

    #[test]
    fn test_starts_locked() {
        let (gate, _scheduler) = gate();
        assert_eq!(gate.state(), GateState::default());
        assert_eq!(gate.variant_for(2), ContentVariant::Placeholder);
        assert_eq!(gate.variant_for(3), ContentVariant::Placeholder);
        assert_eq!(gate.variant_for(0), ContentVariant::Ready);
    }

    #[test]
    fn test_unlock_quiz_is_idempotent() {
        let (gate, _scheduler) = gate();
        let (count, listener) = counter();
        gate.on_quiz_unlocked(listener);

        gate.unlock_quiz();
        gate.unlock_quiz();
        assert!(gate.state().quiz_unlocked);
        assert_eq!(count.get(), 1);
        assert_eq!(gate.variant_for(2), ContentVariant::Ready);
    }

    #[test]
    fn test_relock_then_unlock_notifies_again() {
        let (gate, _scheduler) = gate();
        let (count, listener) = counter();
        gate.on_quiz_unlocked(listener);

        gate.unlock_quiz();
        gate.lock_quiz();
        assert!(!gate.state().quiz_unlocked);
        gate.unlock_quiz();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_complete_quiz_unlocks_pricing_after_delay() {
        let (gate, scheduler) = gate();
        let (count, listener) = counter();
        gate.on_pricing_unlocked(listener);

        gate.complete_quiz("visitor@example.com");
        assert!(!gate.state().pricing_unlocked);
        assert_eq!(gate.contact().as_deref(), Some("visitor@example.com"));

        scheduler.advance(1999);
        assert!(!gate.state().pricing_unlocked);
        scheduler.advance(1);
        assert!(gate.state().pricing_unlocked);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_secondary_offer_fires_five_seconds_after_completion() {
        let (gate, scheduler) = gate();
        let offers = Rc::new(RefCell::new(Vec::new()));
        let seen = offers.clone();
        gate.on_secondary_offer(move |offer| seen.borrow_mut().push(offer.clone()));

        gate.complete_quiz("a@b.c");
        scheduler.advance(4999);
        assert!(offers.borrow().is_empty());
        scheduler.advance(1);
        assert_eq!(
            *offers.borrow(),
            vec![SecondaryOffer { contact: "a@b.c".to_string(), pricing_section: 3 }]
        );
    }

    #[test]
    fn test_teardown_before_delay_never_unlocks() {
        let (gate, scheduler) = gate();
        let offers = Rc::new(Cell::new(0));
        let seen = offers.clone();
        gate.on_secondary_offer(move |_| seen.set(seen.get() + 1));

        gate.complete_quiz("a@b.c");
        scheduler.advance(1000);
        gate.teardown();
        assert!(!gate.has_pending_timers());
        assert_eq!(scheduler.pending(), 0);

        scheduler.advance(10_000);
        assert!(!gate.state().pricing_unlocked);
        assert_eq!(offers.get(), 0);
    }

    #[test]
    fn test_fired_timers_are_released() {
        let (gate, scheduler) = gate();
        gate.complete_quiz("a@b.c");
        assert!(gate.has_pending_timers());

        scheduler.advance(2000);
        assert!(gate.has_pending_timers());
        scheduler.advance(3000);
        assert_eq!(scheduler.pending(), 0);
        assert!(!gate.has_pending_timers());
    }

    #[test]
    fn test_lock_pricing_returns_placeholder() {
        let (gate, _scheduler) = gate();
        let (count, listener) = counter();
        gate.on_pricing_unlocked(listener);

        gate.unlock_pricing();
        assert_eq!(gate.variant_for(3), ContentVariant::Ready);
        gate.lock_pricing();
        assert!(!gate.state().pricing_unlocked);
        assert_eq!(gate.variant_for(3), ContentVariant::Placeholder);
        // locking again is a no-op, re-opening notifies again
        gate.lock_pricing();
        gate.unlock_pricing();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_dropping_gate_cancels_timers() {
        let (gate, scheduler) = gate();
        gate.complete_quiz("a@b.c");
        assert_eq!(scheduler.pending(), 2);
        drop(gate);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_completing_twice_restarts_timers() {
        let (gate, scheduler) = gate();
        gate.complete_quiz("first@example.com");
        scheduler.advance(1500);
        gate.complete_quiz("second@example.com");
        assert_eq!(scheduler.pending(), 2);

        scheduler.advance(1000);
        assert!(!gate.state().pricing_unlocked);
        scheduler.advance(1000);
        assert!(gate.state().pricing_unlocked);
        assert_eq!(gate.contact().as_deref(), Some("second@example.com"));
    }

    #[test]
    fn test_reached_index_unlocks_matching_gate_once() {
        let (gate, _scheduler) = gate();
        let (quiz_count, quiz_listener) = counter();
        let (pricing_count, pricing_listener) = counter();
        gate.on_quiz_unlocked(quiz_listener);
        gate.on_pricing_unlocked(pricing_listener);

        gate.reached_index(1);
        assert_eq!(gate.state(), GateState::default());

        gate.reached_index(2);
        assert!(gate.state().quiz_unlocked);
        assert!(!gate.state().pricing_unlocked);
        gate.reached_index(2);
        assert_eq!(quiz_count.get(), 1);

        gate.reached_index(3);
        assert!(gate.state().pricing_unlocked);
        assert_eq!(pricing_count.get(), 1);
    }

    #[test]
    fn test_pricing_timer_after_manual_unlock_is_silent() {
        let (gate, scheduler) = gate();
        let (count, listener) = counter();
        gate.on_pricing_unlocked(listener);

        gate.complete_quiz("a@b.c");
        gate.reached_index(3);
        scheduler.advance(2000);
        assert!(gate.state().pricing_unlocked);
        assert_eq!(count.get(), 1);
    }
}
