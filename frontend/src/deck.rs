use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::FunnelConfig;
use crate::error::ConfigError;
use crate::funnel::{
    CheckoutFlow, CheckoutRedirector, ContentVariant, CounterView, ExitIntent, ExitView, FunnelGate,
    GateState, LiveCounters, QuizFlow, QuizStage, SecondaryOffer,
};
use crate::navigation::{InputArbiter, Intent, NavKey, NavigationState, SectionController};
use crate::notify::{NotificationSink, Severity};
use crate::timer::{Scheduler, TimerHandle};

/// Everything behind the swipe page, wired together.
///
/// Raw input goes through the [`InputArbiter`], accepted intents move the
/// [`SectionController`], and every section change is fed to
/// [`FunnelGate::reached_index`] before any other input is looked at.
/// The deck also owns the funnel's follow-up jumps, the quiz steps, the live
/// counters, the exit offer and the checkout pacing; `teardown` cancels all
/// of their timers.
pub struct SwipeDeck {
    config: FunnelConfig,
    scheduler: Rc<dyn Scheduler>,
    sink: Rc<dyn NotificationSink>,
    arbiter: Rc<InputArbiter>,
    controller: Rc<SectionController>,
    gate: Rc<FunnelGate>,
    quiz: QuizFlow,
    counters: LiveCounters,
    exit: ExitIntent,
    checkout: CheckoutFlow,
    follow_up: RefCell<Option<TimerHandle>>,
}

impl SwipeDeck {
    pub fn new(
        section_count: usize,
        config: FunnelConfig,
        scheduler: Rc<dyn Scheduler>,
        sink: Rc<dyn NotificationSink>,
        redirector: Rc<dyn CheckoutRedirector>,
    ) -> Result<Self, ConfigError> {
        config.validate(section_count)?;

        let gate = Rc::new(FunnelGate::new(&config, scheduler.clone()));
        let reached: Weak<FunnelGate> = Rc::downgrade(&gate);
        let controller = SectionController::new(
            section_count,
            move |index| {
                if let Some(gate) = reached.upgrade() {
                    gate.reached_index(index);
                }
            },
            scheduler.clone(),
        )?
        .with_transition_ms(config.transition_ms);

        let offer_sink = sink.clone();
        gate.on_secondary_offer(move |_offer| {
            offer_sink.notify(Severity::Info, "Grab your unlock key now!");
        });

        info!("swipe deck ready with {} sections", section_count);
        Ok(Self {
            arbiter: Rc::new(InputArbiter::new(section_count, &config, scheduler.clone())),
            controller: Rc::new(controller),
            quiz: QuizFlow::new(&config, scheduler.clone()),
            counters: LiveCounters::new(config.testimonial_count, StdRng::from_entropy()),
            exit: ExitIntent::new(&config, scheduler.clone()),
            checkout: CheckoutFlow::new(&config, scheduler.clone(), sink.clone(), redirector),
            follow_up: RefCell::new(None),
            gate,
            config,
            scheduler,
            sink,
        })
    }

    pub fn config(&self) -> &FunnelConfig {
        &self.config
    }

    pub fn state(&self) -> NavigationState {
        self.controller.state()
    }

    pub fn gates(&self) -> GateState {
        self.gate.state()
    }

    pub fn variant_for(&self, index: usize) -> ContentVariant {
        self.gate.variant_for(index)
    }

    // input

    pub fn on_wheel(&self, delta_y: f64) -> bool {
        self.dispatch(self.arbiter.on_wheel(delta_y))
    }

    pub fn on_touch_start(&self, y: f64) {
        self.arbiter.on_touch_start(y);
    }

    pub fn on_touch_move(&self, y: f64) {
        self.arbiter.on_touch_move(y);
    }

    pub fn on_touch_end(&self) -> bool {
        self.dispatch(self.arbiter.on_touch_end())
    }

    pub fn on_key(&self, key: NavKey) -> bool {
        self.dispatch(self.arbiter.on_key(key))
    }

    /// Dots, arrows and any content that wants to move the visitor.
    pub fn go_to(&self, index: usize) -> bool {
        self.dispatch(Some(self.arbiter.on_direct_request(index)))
    }

    pub fn next(&self) -> bool {
        match self.controller.current().checked_add(1) {
            Some(index) => self.go_to(index),
            None => false,
        }
    }

    pub fn previous(&self) -> bool {
        match self.controller.current().checked_sub(1) {
            Some(index) => self.go_to(index),
            None => false,
        }
    }

    fn dispatch(&self, intent: Option<Intent>) -> bool {
        let Some(intent) = intent else {
            return false;
        };
        let accepted = self.controller.request_transition(intent);
        if accepted {
            self.arbiter.commit();
        }
        accepted
    }

    // funnel

    /// "Start" buttons: open the quiz and slide to it shortly after.
    pub fn start_quiz(&self) {
        self.gate.unlock_quiz();
        self.jump_later(self.config.follow_up_ms, self.config.quiz_section);
    }

    /// Answer the current quiz question. See [`QuizFlow::answer`].
    pub fn answer_question(&self, value: &str) -> bool {
        self.quiz.answer(value)
    }

    pub fn quiz_stage(&self) -> QuizStage {
        self.quiz.stage()
    }

    pub fn complete_quiz(&self, contact: &str) {
        self.gate.complete_quiz(contact);
        self.sink.notify(Severity::Success, "Your report has been sent!");
        let delay = self
            .config
            .pricing_unlock_ms
            .saturating_add(self.config.follow_up_ms);
        self.jump_later(delay, self.config.pricing_section);
    }

    pub fn purchase(&self, plan_id: &str) {
        let contact = self.gate.contact().unwrap_or_default();
        self.checkout.begin(plan_id, &contact);
    }

    pub fn start_counters(&self) {
        self.counters.start(&self.config, &self.scheduler);
    }

    pub fn counters(&self) -> CounterView {
        self.counters.view()
    }

    pub fn on_pointer_leave(&self, client_y: f64) -> bool {
        self.exit.on_pointer_leave(client_y)
    }

    pub fn exit_view(&self) -> ExitView {
        self.exit.view()
    }

    pub fn exit_remaining_label(&self) -> String {
        self.exit.format_remaining()
    }

    pub fn accept_exit_offer(&self) -> bool {
        if !self.exit.accept() {
            return false;
        }
        self.sink.notify(Severity::Success, "10% discount applied!");
        self.go_to(self.config.pricing_section)
    }

    pub fn dismiss_exit_offer(&self) {
        self.exit.dismiss();
    }

    // subscriptions

    pub fn subscribe(&self, listener: impl Fn(usize) + 'static) {
        self.controller.subscribe(listener);
    }

    pub fn on_quiz_unlocked(&self, callback: impl Fn() + 'static) {
        self.gate.on_quiz_unlocked(callback);
    }

    pub fn on_pricing_unlocked(&self, callback: impl Fn() + 'static) {
        self.gate.on_pricing_unlocked(callback);
    }

    pub fn on_secondary_offer(&self, callback: impl Fn(&SecondaryOffer) + 'static) {
        self.gate.on_secondary_offer(callback);
    }

    pub fn on_exit_update(&self, listener: impl Fn(ExitView) + 'static) {
        self.exit.on_update(listener);
    }

    pub fn on_quiz_stage(&self, listener: impl Fn(QuizStage) + 'static) {
        self.quiz.on_change(listener);
    }

    pub fn on_counters(&self, listener: impl Fn(CounterView) + 'static) {
        self.counters.on_update(listener);
    }

    pub fn teardown(&self) {
        debug!("tearing down swipe deck");
        let follow_up = self.follow_up.borrow_mut().take();
        drop(follow_up);
        self.arbiter.teardown();
        self.controller.teardown();
        self.gate.teardown();
        self.quiz.teardown();
        self.counters.teardown();
        self.exit.teardown();
        self.checkout.cancel();
    }

    fn jump_later(&self, delay_ms: u32, index: usize) {
        let arbiter: Weak<InputArbiter> = Rc::downgrade(&self.arbiter);
        let controller: Weak<SectionController> = Rc::downgrade(&self.controller);
        let handle = self.scheduler.schedule(
            delay_ms,
            Box::new(move || {
                if let (Some(arbiter), Some(controller)) = (arbiter.upgrade(), controller.upgrade()) {
                    let intent = arbiter.on_direct_request(index);
                    if controller.request_transition(intent) {
                        arbiter.commit();
                    } else {
                        debug!("follow-up jump to {} dropped", index);
                    }
                }
            }),
        );
        let previous = self.follow_up.borrow_mut().replace(handle);
        drop(previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funnel::FunnelSection;
    use crate::timer::ManualScheduler;
    use std::cell::Cell;

    #[derive(Default)]
    struct Recorder {
        notices: RefCell<Vec<(Severity, String)>>,
        redirects: RefCell<Vec<String>>,
    }

    impl NotificationSink for Recorder {
        fn notify(&self, severity: Severity, message: &str) {
            self.notices.borrow_mut().push((severity, message.to_string()));
        }
    }

    impl CheckoutRedirector for Recorder {
        fn redirect(&self, url: &str) {
            self.redirects.borrow_mut().push(url.to_string());
        }
    }

    fn deck() -> (SwipeDeck, ManualScheduler, Rc<Recorder>) {
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let deck = SwipeDeck::new(
            FunnelSection::ALL.len(),
            FunnelConfig::default(),
            Rc::new(scheduler.clone()),
            recorder.clone(),
            recorder.clone(),
        )
        .unwrap();
        (deck, scheduler, recorder)
    }

    #[test]
    fn test_invalid_layout_is_rejected() {
        let result = SwipeDeck::new(
            2,
            FunnelConfig::default(),
            Rc::new(ManualScheduler::new()),
            Rc::new(Recorder::default()),
            Rc::new(Recorder::default()),
        );
        assert!(matches!(result, Err(ConfigError::SectionOutOfRange { .. })));
    }

    #[test]
    fn test_wheel_fling_moves_one_section() {
        let (deck, scheduler, _recorder) = deck();
        let changes = Rc::new(Cell::new(0));
        let count = changes.clone();
        deck.subscribe(move |_| count.set(count.get() + 1));

        assert!(deck.on_wheel(12.0));
        for _ in 0..20 {
            scheduler.advance(30);
            assert!(!deck.on_wheel(12.0));
        }
        assert_eq!(deck.state().current_index, 1);
        assert_eq!(changes.get(), 1);
    }

    #[test]
    fn test_rejected_boundary_input_does_not_block_the_next_one() {
        let (deck, scheduler, _recorder) = deck();
        assert!(!deck.on_wheel(-10.0));
        scheduler.advance(100);
        assert!(deck.on_wheel(10.0));
        assert_eq!(deck.state().current_index, 1);

        scheduler.advance(800);
        assert!(deck.on_key(NavKey::End));
        scheduler.advance(800);
        assert!(!deck.on_key(NavKey::ArrowDown));
        assert!(deck.on_key(NavKey::ArrowUp));
        assert_eq!(deck.state().current_index, 4);
    }

    #[test]
    fn test_reaching_quiz_unlocks_it_in_the_same_delivery() {
        let (deck, scheduler, _recorder) = deck();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let gate: Weak<FunnelGate> = Rc::downgrade(&deck.gate);
        deck.subscribe(move |index| {
            let unlocked = gate.upgrade().map(|gate| gate.state().quiz_unlocked).unwrap_or(false);
            log.borrow_mut().push((index, unlocked));
        });

        deck.go_to(1);
        scheduler.advance(800);
        deck.on_key(NavKey::ArrowDown);
        assert_eq!(*seen.borrow(), vec![(1, false), (2, true)]);
        assert_eq!(deck.variant_for(2), ContentVariant::Ready);
    }

    #[test]
    fn test_start_quiz_slides_to_quiz_after_pause() {
        let (deck, scheduler, _recorder) = deck();
        deck.start_quiz();
        assert!(deck.gates().quiz_unlocked);
        assert_eq!(deck.state().current_index, 0);

        scheduler.advance(500);
        assert_eq!(deck.state().current_index, 2);
    }

    #[test]
    fn test_completed_quiz_leads_to_pricing() {
        let (deck, scheduler, recorder) = deck();
        deck.go_to(2);
        scheduler.advance(800);

        deck.complete_quiz("visitor@example.com");
        assert_eq!(recorder.notices.borrow()[0].0, Severity::Success);
        assert!(!deck.gates().pricing_unlocked);

        scheduler.advance(2000);
        assert!(deck.gates().pricing_unlocked);
        assert_eq!(deck.state().current_index, 2);

        scheduler.advance(500);
        assert_eq!(deck.state().current_index, 3);

        scheduler.advance(2500);
        let notices = recorder.notices.borrow();
        assert_eq!(notices.last().map(|n| n.0), Some(Severity::Info));
    }

    #[test]
    fn test_purchase_uses_quiz_contact() {
        let (deck, scheduler, recorder) = deck();
        deck.complete_quiz("buyer@example.com");
        deck.purchase("premium");
        scheduler.advance(4000);
        assert_eq!(
            *recorder.redirects.borrow(),
            vec!["https://checkout.stripe.com/pay/premium?prefilled_email=buyer%40example.com".to_string()]
        );
    }

    #[test]
    fn test_exit_offer_accept_goes_to_pricing() {
        let (deck, _scheduler, recorder) = deck();
        assert!(!deck.accept_exit_offer());
        assert!(deck.on_pointer_leave(0.0));
        assert!(deck.exit_view().open);
        assert_eq!(deck.exit_remaining_label(), "5:00");

        assert!(deck.accept_exit_offer());
        assert_eq!(deck.state().current_index, 3);
        assert!(deck.gates().pricing_unlocked);
        assert!(recorder
            .notices
            .borrow()
            .iter()
            .any(|(severity, message)| *severity == Severity::Success && message.contains("10%")));
    }

    #[test]
    fn test_teardown_cancels_every_timer() {
        let (deck, scheduler, recorder) = deck();
        deck.on_wheel(1.0);
        deck.start_quiz();
        deck.complete_quiz("a@b.c");
        deck.purchase("basic");
        deck.answer_question("low");
        deck.start_counters();
        deck.on_pointer_leave(-1.0);
        assert!(scheduler.pending() > 0);

        deck.teardown();
        assert_eq!(scheduler.pending(), 0);
        scheduler.advance(60_000);
        assert!(!deck.gates().pricing_unlocked);
        assert!(recorder.redirects.borrow().is_empty());
        assert_eq!(deck.state().current_index, 1);
        assert_eq!(deck.quiz_stage(), QuizStage::Answering { index: 0 });
        assert_eq!(deck.counters(), CounterView::default());
    }

    #[test]
    fn test_quiz_answers_lead_to_contact_form() {
        let (deck, scheduler, _recorder) = deck();
        let stages = Rc::new(RefCell::new(Vec::new()));
        let seen = stages.clone();
        deck.on_quiz_stage(move |stage| seen.borrow_mut().push(stage));

        for answer in ["low", "few", "time", "little", "fully_ready"] {
            assert!(deck.answer_question(answer));
            scheduler.advance(500);
        }
        assert_eq!(deck.quiz_stage(), QuizStage::Analyzing { progress: 0 });
        scheduler.advance(3300);
        assert_eq!(deck.quiz_stage(), QuizStage::Contact);
        assert_eq!(stages.borrow().last(), Some(&QuizStage::Contact));
    }
}
