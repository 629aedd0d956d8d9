use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, info};

use crate::config::FunnelConfig;
use crate::timer::{repeat, Scheduler, TimerHandle};

const LOADING_STEP: u8 = 10;

/// Where the diagnosis is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuizStage {
    /// Showing question `index` (0-based).
    Answering { index: usize },
    /// The fake analysis bar, 0..=100.
    Analyzing { progress: u8 },
    /// Done, asking where to send the report.
    Contact,
}

type StageListener = Rc<dyn Fn(QuizStage)>;

struct QuizState {
    question_count: usize,
    stage: Cell<QuizStage>,
    answers: RefCell<Vec<String>>,
    step: RefCell<Option<TimerHandle>>,
    loading: RefCell<Option<TimerHandle>>,
    listeners: RefCell<Vec<StageListener>>,
}

impl QuizState {
    fn set_stage(&self, stage: QuizStage) {
        self.stage.set(stage);
        let listeners: Vec<StageListener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(stage);
        }
    }

    fn loading_tick(&self) -> bool {
        match self.stage.get() {
            QuizStage::Analyzing { progress } if progress >= 100 => {
                let spent = self.loading.borrow_mut().take();
                drop(spent);
                info!("quiz analysis finished");
                self.set_stage(QuizStage::Contact);
                false
            }
            QuizStage::Analyzing { progress } => {
                self.set_stage(QuizStage::Analyzing {
                    progress: progress.saturating_add(LOADING_STEP).min(100),
                });
                true
            }
            _ => false,
        }
    }
}

/// Steps through the diagnosis questions.
///
/// Picking an answer records it and moves on after `quiz_step_ms`; after the
/// last answer the analysis bar fills in steps of 10% every
/// `quiz_loading_tick_ms`, and the tick after it reaches 100% switches to the
/// contact form. The question text and scoring live with the content.
pub struct QuizFlow {
    step_ms: u32,
    loading_tick_ms: u32,
    scheduler: Rc<dyn Scheduler>,
    state: Rc<QuizState>,
}

impl QuizFlow {
    pub fn new(config: &FunnelConfig, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            step_ms: config.quiz_step_ms,
            loading_tick_ms: config.quiz_loading_tick_ms,
            scheduler,
            state: Rc::new(QuizState {
                question_count: config.quiz_question_count,
                stage: Cell::new(QuizStage::Answering { index: 0 }),
                answers: RefCell::new(Vec::new()),
                step: RefCell::new(None),
                loading: RefCell::new(None),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn stage(&self) -> QuizStage {
        self.state.stage.get()
    }

    pub fn question_count(&self) -> usize {
        self.state.question_count
    }

    pub fn answers(&self) -> Vec<String> {
        self.state.answers.borrow().clone()
    }

    pub fn on_change(&self, listener: impl Fn(QuizStage) + 'static) {
        self.state.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Record the answer to the current question. Returns false when no
    /// question is waiting for one (mid step, analyzing, or done).
    pub fn answer(&self, value: impl Into<String>) -> bool {
        let QuizStage::Answering { index } = self.stage() else {
            return false;
        };
        if self.state.step.borrow().is_some() {
            debug!("answer to question {} ignored, already moving on", index);
            return false;
        }
        self.state.answers.borrow_mut().push(value.into());

        let state: Weak<QuizState> = Rc::downgrade(&self.state);
        let scheduler: Weak<dyn Scheduler> = Rc::downgrade(&self.scheduler);
        let loading_tick_ms = self.loading_tick_ms;
        let step = self.scheduler.schedule(
            self.step_ms,
            Box::new(move || {
                let Some(state) = state.upgrade() else {
                    return;
                };
                let spent = state.step.borrow_mut().take();
                drop(spent);

                let next = index + 1;
                if next < state.question_count {
                    state.set_stage(QuizStage::Answering { index: next });
                    return;
                }
                let Some(scheduler) = scheduler.upgrade() else {
                    return;
                };
                info!("quiz answered, analyzing");
                state.set_stage(QuizStage::Analyzing { progress: 0 });
                let ticking = Rc::downgrade(&state);
                let loading = repeat(&scheduler, loading_tick_ms, move || match ticking.upgrade() {
                    Some(state) => state.loading_tick(),
                    None => false,
                });
                *state.loading.borrow_mut() = Some(loading);
            }),
        );
        *self.state.step.borrow_mut() = Some(step);
        true
    }

    pub fn has_pending_timers(&self) -> bool {
        self.state.step.borrow().is_some() || self.state.loading.borrow().is_some()
    }

    pub fn teardown(&self) {
        let step = self.state.step.borrow_mut().take();
        let loading = self.state.loading.borrow_mut().take();
        drop(step);
        drop(loading);
    }
}
