use std::cell::{Cell, RefCell};
use std::rc::Rc;

use swipe_funnel::config::FunnelConfig;
use swipe_funnel::funnel::{ContentVariant, FunnelGate, FunnelSection};
use swipe_funnel::notify::{NotificationSink, Severity};
use swipe_funnel::timer::ManualScheduler;
use swipe_funnel::{ConfigError, SwipeDeck};

fn gate() -> (FunnelGate, ManualScheduler) {
    let scheduler = ManualScheduler::new();
    let gate = FunnelGate::new(&FunnelConfig::default(), Rc::new(scheduler.clone()));
    (gate, scheduler)
}

#[test]
fn test_pricing_unlocks_after_quiz_delay() {
    let (gate, scheduler) = gate();
    let unlocked = Rc::new(Cell::new(0));
    let count = unlocked.clone();
    gate.on_pricing_unlocked(move || count.set(count.get() + 1));

    gate.complete_quiz("lead@example.com");
    scheduler.advance(1999);
    assert!(!gate.state().pricing_unlocked);
    assert_eq!(gate.variant_for(3), ContentVariant::Placeholder);

    scheduler.advance(1);
    assert!(gate.state().pricing_unlocked);
    assert_eq!(gate.variant_for(3), ContentVariant::Ready);
    assert_eq!(unlocked.get(), 1);
}

#[test]
fn test_teardown_before_delay_keeps_pricing_locked() {
    let (gate, scheduler) = gate();
    gate.complete_quiz("lead@example.com");
    scheduler.advance(1500);
    gate.teardown();
    assert!(!gate.has_pending_timers());
    scheduler.advance(10_000);
    assert!(!gate.state().pricing_unlocked);
}

#[test]
fn test_reaching_quiz_twice_emits_once() {
    let (gate, _scheduler) = gate();
    let emitted = Rc::new(Cell::new(0));
    let count = emitted.clone();
    gate.on_quiz_unlocked(move || count.set(count.get() + 1));

    gate.reached_index(2);
    gate.reached_index(2);
    gate.reached_index(1);
    assert!(gate.state().quiz_unlocked);
    assert_eq!(emitted.get(), 1);
}

#[test]
fn test_secondary_offer_follows_quiz() {
    let (gate, scheduler) = gate();
    let offers = Rc::new(RefCell::new(Vec::new()));
    let seen = offers.clone();
    gate.on_secondary_offer(move |offer| seen.borrow_mut().push(offer.clone()));

    gate.complete_quiz("lead@example.com");
    scheduler.advance(4999);
    assert!(offers.borrow().is_empty());
    scheduler.advance(1);
    let offers = offers.borrow();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].pricing_section, 3);
    assert_eq!(offers[0].contact, "lead@example.com");
}

struct Silent;

impl NotificationSink for Silent {
    fn notify(&self, _severity: Severity, _message: &str) {}
}

impl swipe_funnel::funnel::CheckoutRedirector for Silent {
    fn redirect(&self, _url: &str) {}
}

#[test]
fn test_deck_walkthrough_opens_every_section() {
    let scheduler = ManualScheduler::new();
    let deck = SwipeDeck::new(
        FunnelSection::ALL.len(),
        FunnelConfig::default(),
        Rc::new(scheduler.clone()),
        Rc::new(Silent),
        Rc::new(Silent),
    )
    .unwrap();

    for expected in 1..FunnelSection::ALL.len() {
        assert!(deck.next());
        scheduler.advance(800);
        assert_eq!(deck.state().current_index, expected);
    }
    assert!(!deck.next());
    assert_eq!(deck.gates(), swipe_funnel::funnel::GateState {
        quiz_unlocked: true,
        pricing_unlocked: true,
    });
    deck.start_counters();
    assert!(deck.answer_question("low"));
    scheduler.advance(4_000);
    assert_eq!(deck.counters().testimonial, 1);

    deck.teardown();
    assert_eq!(scheduler.pending(), 0);
    scheduler.advance(60_000);
    assert_eq!(deck.counters().testimonial, 1);
}

#[test]
fn test_config_rejects_clashing_sections() {
    let config = FunnelConfig::from_json(r#"{"quiz_section": 3, "pricing_section": 3}"#).unwrap();
    assert!(matches!(config.validate(6), Err(ConfigError::Invalid(_))));
}
