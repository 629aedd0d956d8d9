use std::rc::Rc;

use gloo_timers::callback::Timeout;
use log::error;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::components::swipe_page::SwipePage;
use crate::config::FunnelConfig;
use crate::deck::SwipeDeck;
use crate::funnel::{
    ContentProvider, ContentVariant, CounterView, ExitView, FunnelSection, GateState, QuizStage,
};
use crate::navigation::NavigationState;
use crate::notify::{CallbackSink, Severity};
use crate::timer::GlooScheduler;
use crate::web::WindowRedirector;

const TOAST_MS: u32 = 4000;

type Toast = Option<(Severity, String)>;

type Question = (&'static str, [(&'static str, &'static str); 4]);

const QUESTIONS: [Question; 5] = [
    (
        "What is your monthly income today?",
        [("Under 5,000 SAR", "low"), ("5,000 - 15,000 SAR", "medium"), ("15,000 - 30,000 SAR", "good"), ("Over 30,000 SAR", "high")],
    ),
    (
        "How often did you try to raise your income last year?",
        [("Never", "never"), ("Once or twice", "few"), ("Several times", "several"), ("All the time", "always")],
    ),
    (
        "What holds you back the most?",
        [("Know-how", "knowledge"), ("Time", "time"), ("Capital", "capital"), ("Fear of risk", "fear")],
    ),
    (
        "How much do you invest in yourself each month?",
        [("Nothing", "nothing"), ("Under 500 SAR", "little"), ("500 - 2,000 SAR", "moderate"), ("Over 2,000 SAR", "high")],
    ),
    (
        "How ready are you to change things in the next 72 hours?",
        [("Not ready", "not_ready"), ("Somewhat", "somewhat"), ("Very", "very_ready"), ("100%", "fully_ready")],
    ),
];

const TESTIMONIALS: [(&str, &str); 3] = [
    ("Sara", "Doubled my freelance rate within two months."),
    ("Khalid", "Found the leak in my budget on day one."),
    ("Noura", "First online sale a week after the course."),
];

const PLANS: [(&str, &str, u32); 3] = [
    ("basic", "Starter key", 499),
    ("premium", "Full unlock", 749),
    ("vip", "VIP coaching", 1249),
];

fn build_deck(toast: UseStateHandle<Toast>) -> Option<Rc<SwipeDeck>> {
    let sink = CallbackSink::new(move |severity, message| toast.set(Some((severity, message))));
    match SwipeDeck::new(
        FunnelSection::ALL.len(),
        FunnelConfig {
            quiz_question_count: QUESTIONS.len(),
            testimonial_count: TESTIMONIALS.len(),
            ..FunnelConfig::default()
        },
        Rc::new(GlooScheduler),
        Rc::new(sink),
        Rc::new(WindowRedirector),
    ) {
        Ok(deck) => Some(Rc::new(deck)),
        Err(e) => {
            error!("failed to set up the swipe deck: {}", e);
            None
        }
    }
}

/// Renders the funnel sections, choosing the placeholder call-to-action for
/// gated sections that are still closed.
struct FunnelContent {
    deck: Rc<SwipeDeck>,
    quiz: QuizStage,
    counters: CounterView,
}

impl FunnelContent {
    fn start_quiz(&self) -> Callback<MouseEvent> {
        let deck = self.deck.clone();
        Callback::from(move |_: MouseEvent| deck.start_quiz())
    }
}

impl ContentProvider for FunnelContent {
    type Payload = Html;

    fn section_count(&self) -> usize {
        FunnelSection::ALL.len()
    }

    fn payload(&self, index: usize, variant: ContentVariant) -> Html {
        let Some(section) = FunnelSection::from_index(index) else {
            return html! {};
        };
        match (section, variant) {
            (FunnelSection::Hero, _) => html! {
                <section class="hero">
                    <h1>{"Find out what is holding your income back"}</h1>
                    <p>{"A five question diagnosis, and your personal report in minutes."}</p>
                    <button class="cta-button" onclick={self.start_quiz()}>{"Start the diagnosis"}</button>
                </section>
            },
            (FunnelSection::Progress, _) => html! {
                <section class="progress-section">
                    <h2>{"Diagnoses completed today"}</h2>
                    <div class="live-counter">{self.counters.completed_today}</div>
                </section>
            },
            (FunnelSection::Quiz, ContentVariant::Ready) => {
                let answer_deck = self.deck.clone();
                let on_answer = Callback::from(move |value: String| {
                    answer_deck.answer_question(&value);
                });
                let deck = self.deck.clone();
                let on_complete = Callback::from(move |contact: String| deck.complete_quiz(&contact));
                html! { <QuizPanel stage={self.quiz} {on_answer} {on_complete} /> }
            }
            (FunnelSection::Quiz, ContentVariant::Placeholder) => html! {
                <section class="placeholder">
                    <h2>{"Ready to find your brake?"}</h2>
                    <button class="cta-button" onclick={self.start_quiz()}>{"Start the diagnosis now"}</button>
                </section>
            },
            (FunnelSection::Pricing, ContentVariant::Ready) => {
                let plans = PLANS
                    .iter()
                    .map(|&(id, name, price)| {
                        let deck = self.deck.clone();
                        let onclick = Callback::from(move |_: MouseEvent| deck.purchase(id));
                        html! {
                            <div class="plan-card" key={id}>
                                <h3>{name}</h3>
                                <div class="plan-price">{format!("{} SAR", price)}</div>
                                <button class="cta-button" {onclick}>{"Buy now"}</button>
                            </div>
                        }
                    })
                    .collect::<Html>();
                html! { <section class="pricing">{plans}</section> }
            }
            (FunnelSection::Pricing, ContentVariant::Placeholder) => {
                let deck = self.deck.clone();
                let quiz = deck.config().quiz_section;
                let onclick = Callback::from(move |_: MouseEvent| {
                    deck.go_to(quiz);
                });
                html! {
                    <section class="placeholder">
                        <h2>{"Pick your key"}</h2>
                        <p>{"Finish the diagnosis first to see the plans that fit you."}</p>
                        <button class="cta-button secondary" {onclick}>{"Back to the diagnosis"}</button>
                    </section>
                }
            }
            (FunnelSection::SocialProof, _) => {
                let (name, quote) = TESTIMONIALS[self.counters.testimonial % TESTIMONIALS.len()];
                html! {
                    <section class="social-proof">
                        <h2>{"What graduates say"}</h2>
                        <div class="live-counter">{format!("+{} SAR earned today", self.counters.total_earnings)}</div>
                        <blockquote class="testimonial">
                            <p>{quote}</p>
                            <cite>{name}</cite>
                        </blockquote>
                    </section>
                }
            }
            (FunnelSection::Footer, _) => html! {
                <footer class="funnel-footer">
                    <a href="/terms">{"Terms"}</a>
                    <a href="/privacy">{"Privacy"}</a>
                </footer>
            },
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct QuizPanelProps {
    pub stage: QuizStage,
    pub on_answer: Callback<String>,
    pub on_complete: Callback<String>,
}

/// Questions, the analysis bar, then the form for the contact the report
/// goes to. The deck decides which one shows.
#[function_component(QuizPanel)]
pub fn quiz_panel(props: &QuizPanelProps) -> Html {
    let email = use_state(String::new);

    match props.stage {
        QuizStage::Answering { index } => {
            let Some((question, options)) = QUESTIONS.get(index) else {
                return html! {};
            };
            let buttons = options
                .iter()
                .map(|&(label, value)| {
                    let on_answer = props.on_answer.clone();
                    let onclick = Callback::from(move |_: MouseEvent| on_answer.emit(value.to_string()));
                    html! { <button class="quiz-option" key={value} {onclick}>{label}</button> }
                })
                .collect::<Html>();
            return html! {
                <section class="quiz">
                    <div class="quiz-step">{format!("Question {} of {}", index + 1, QUESTIONS.len())}</div>
                    <h2>{*question}</h2>
                    <div class="quiz-options">{buttons}</div>
                </section>
            };
        }
        QuizStage::Analyzing { progress } => {
            return html! {
                <section class="quiz">
                    <h2>{"Analyzing your answers..."}</h2>
                    <div class="quiz-loading">
                        <div class="quiz-loading-fill" style={format!("width: {}%;", progress)} />
                    </div>
                </section>
            };
        }
        QuizStage::Contact => {}
    }

    let oninput = {
        let email = email.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            email.set(input.value());
        })
    };

    let onsubmit = {
        let email = email.clone();
        let on_complete = props.on_complete.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            let contact = email.trim().to_string();
            if !contact.is_empty() {
                on_complete.emit(contact);
            }
        })
    };

    html! {
        <section class="quiz">
            <h2>{"Where should we send your report?"}</h2>
            <form {onsubmit}>
                <input type="email" placeholder="you@example.com" value={(*email).clone()} {oninput} />
                <button type="submit" class="cta-button">{"Send my report"}</button>
            </form>
        </section>
    }
}

#[function_component(FunnelPage)]
pub fn funnel_page() -> Html {
    let toast = use_state(|| None::<(Severity, String)>);
    let deck = {
        let toast = toast.clone();
        use_state(move || build_deck(toast))
    };
    let nav = use_state(|| NavigationState::initial(FunnelSection::ALL.len()));
    let gates = use_state(GateState::default);
    let exit = use_state(|| ExitView { open: false, remaining_seconds: 0 });
    let quiz = use_state(|| QuizStage::Answering { index: 0 });
    let counters = use_state(CounterView::default);

    {
        let deck = (*deck).clone();
        let nav = nav.clone();
        let gates = gates.clone();
        let exit = exit.clone();
        let quiz = quiz.clone();
        let counters = counters.clone();
        use_effect_with_deps(
            move |_| {
                let mut leave_listener = None;
                if let Some(deck) = &deck {
                    let weak = Rc::downgrade(deck);
                    deck.subscribe(move |_| {
                        if let Some(deck) = weak.upgrade() {
                            nav.set(deck.state());
                        }
                    });

                    let weak = Rc::downgrade(deck);
                    let quiz_gates = gates.clone();
                    deck.on_quiz_unlocked(move || {
                        if let Some(deck) = weak.upgrade() {
                            quiz_gates.set(deck.gates());
                        }
                    });

                    let weak = Rc::downgrade(deck);
                    deck.on_pricing_unlocked(move || {
                        if let Some(deck) = weak.upgrade() {
                            gates.set(deck.gates());
                        }
                    });

                    deck.on_exit_update(move |view| exit.set(view));
                    deck.on_quiz_stage(move |stage| quiz.set(stage));
                    deck.on_counters(move |view| counters.set(view));
                    deck.start_counters();

                    let leave_deck = Rc::downgrade(deck);
                    let on_leave = Closure::wrap(Box::new(move |e: MouseEvent| {
                        if let Some(deck) = leave_deck.upgrade() {
                            deck.on_pointer_leave(f64::from(e.client_y()));
                        }
                    }) as Box<dyn FnMut(MouseEvent)>);
                    if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                        let _ = document
                            .add_event_listener_with_callback("mouseleave", on_leave.as_ref().unchecked_ref());
                        leave_listener = Some((document, on_leave));
                    }
                }

                move || {
                    if let Some((document, on_leave)) = leave_listener {
                        let _ = document
                            .remove_event_listener_with_callback("mouseleave", on_leave.as_ref().unchecked_ref());
                    }
                    if let Some(deck) = deck {
                        deck.teardown();
                    }
                }
            },
            (),
        );
    }

    // toasts hide themselves
    {
        let shown = (*toast).clone();
        let toast = toast.clone();
        use_effect_with_deps(
            move |current: &Toast| {
                let timeout = current.as_ref().map(|_| {
                    Timeout::new(TOAST_MS, move || {
                        toast.set(None);
                    })
                });
                move || drop(timeout)
            },
            shown,
        );
    }

    let Some(deck) = (*deck).clone() else {
        return html! {
            <div class="funnel-error">{"Something went wrong loading this page."}</div>
        };
    };

    let content = FunnelContent {
        deck: deck.clone(),
        quiz: *quiz,
        counters: *counters,
    };
    let sections = (0..content.section_count())
        .filter_map(FunnelSection::from_index)
        .map(|section| {
            html! {
                <div id={section.key()} class="funnel-section">
                    { content.payload(section.index(), section.variant(*gates)) }
                </div>
            }
        })
        .collect::<Vec<Html>>();

    let toast_view = match &*toast {
        Some((severity, message)) => {
            // the secondary offer prompt takes the visitor to pricing
            let onclick = {
                let deck = deck.clone();
                let severity = *severity;
                let toast = toast.clone();
                Callback::from(move |_: MouseEvent| {
                    if severity == Severity::Info {
                        deck.go_to(deck.config().pricing_section);
                    }
                    toast.set(None);
                })
            };
            let class = format!("toast toast-{:?}", severity).to_lowercase();
            html! { <div {class} {onclick}>{message.clone()}</div> }
        }
        None => html! {},
    };

    let exit_view = if exit.open {
        let accept = {
            let deck = deck.clone();
            Callback::from(move |_: MouseEvent| {
                deck.accept_exit_offer();
            })
        };
        let dismiss = {
            let deck = deck.clone();
            Callback::from(move |_: MouseEvent| deck.dismiss_exit_offer())
        };
        html! {
            <div class="exit-modal">
                <h2>{"Wait! An exclusive 10% discount"}</h2>
                <div class="exit-countdown">{deck.exit_remaining_label()}</div>
                <button class="cta-button" onclick={accept}>{"Claim my discount"}</button>
                <button class="link-button" onclick={dismiss}>{"No thanks"}</button>
            </div>
        }
    } else {
        html! {}
    };

    let floating = if nav.current_index == 0 {
        html! {
            <button class="floating-cta" onclick={content.start_quiz()}>{"Start now"}</button>
        }
    } else {
        html! {}
    };

    let urgency = if nav.current_index > 0 {
        html! {
            <div class="urgency-bar">
                {format!("Only {} seats left in this cohort. Book yours now!", counters.seats_left)}
            </div>
        }
    } else {
        html! {}
    };

    html! {
        <div class="funnel">
            {urgency}
            <SwipePage deck={deck.clone()} state={*nav}>
                { for sections.into_iter() }
            </SwipePage>
            {toast_view}
            {exit_view}
            {floating}
        </div>
    }
}
