use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, HtmlElement, HtmlInputElement, KeyboardEvent, TouchEvent, WheelEvent};
use yew::prelude::*;

use crate::deck::SwipeDeck;
use crate::navigation::{NavKey, NavigationState};

#[derive(Properties)]
pub struct SwipePageProps {
    pub deck: Rc<SwipeDeck>,
    pub state: NavigationState,
    #[prop_or_default]
    pub children: Children,
}

impl PartialEq for SwipePageProps {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.deck, &other.deck)
            && self.state == other.state
            && self.children == other.children
    }
}

const LAYOUT_CSS: &str = r#"
    .swipe-page {
        position: fixed;
        inset: 0;
        height: 100vh;
        overflow: hidden;
        touch-action: none;
        overscroll-behavior: none;
    }
    .swipe-sections {
        position: absolute;
        inset: 0;
    }
    .swipe-section {
        position: absolute;
        inset: 0;
        height: 100vh;
        overflow: hidden;
        transition: transform 0.8s ease-in-out;
        will-change: transform;
    }
    .swipe-section-inner {
        height: 100%;
        overflow-y: auto;
    }
    .swipe-progress {
        position: fixed;
        top: 0;
        left: 0;
        right: 0;
        height: 4px;
        z-index: 20;
    }
    .swipe-progress-fill {
        height: 100%;
        transition: width 0.8s ease-in-out;
    }
    .nav-dots {
        position: fixed;
        right: 16px;
        top: 50%;
        transform: translateY(-50%);
        display: flex;
        flex-direction: column;
        gap: 10px;
        z-index: 20;
    }
    .nav-arrows {
        position: fixed;
        right: 16px;
        bottom: 16px;
        display: flex;
        flex-direction: column;
        gap: 8px;
        z-index: 20;
    }
    .section-counter {
        position: fixed;
        left: 16px;
        bottom: 16px;
        z-index: 20;
    }
"#;

/// Keys typed into a form field belong to the field.
fn typing_into_input(e: &KeyboardEvent) -> bool {
    e.target()
        .map_or(false, |target| target.dyn_ref::<HtmlInputElement>().is_some())
}

/// Full viewport pager. Forwards wheel, key and touch input to the deck and
/// draws the dots, arrows, progress bar and counter around the sections.
#[function_component(SwipePage)]
pub fn swipe_page(props: &SwipePageProps) -> Html {
    let container = use_node_ref();

    {
        let deck = props.deck.clone();
        let container = container.clone();
        use_effect_with_deps(
            move |_| {
                let wheel_deck = deck.clone();
                let wheel_callback = Closure::wrap(Box::new(move |e: WheelEvent| {
                    // the page itself never scrolls
                    e.prevent_default();
                    wheel_deck.on_wheel(e.delta_y());
                }) as Box<dyn FnMut(WheelEvent)>);

                let key_deck = deck;
                let key_callback = Closure::wrap(Box::new(move |e: KeyboardEvent| {
                    if typing_into_input(&e) {
                        return;
                    }
                    if let Some(key) = NavKey::from_key(&e.key()) {
                        e.prevent_default();
                        key_deck.on_key(key);
                    }
                }) as Box<dyn FnMut(KeyboardEvent)>);

                let element = container.cast::<HtmlElement>();
                if let Some(element) = &element {
                    // passive listeners can't cancel the native scroll
                    let mut options = AddEventListenerOptions::new();
                    options.set_passive(false);
                    let _ = element.add_event_listener_with_callback_and_add_event_listener_options(
                        "wheel",
                        wheel_callback.as_ref().unchecked_ref(),
                        &options,
                    );
                }

                let document = web_sys::window().and_then(|w| w.document());
                if let Some(document) = &document {
                    let _ = document
                        .add_event_listener_with_callback("keydown", key_callback.as_ref().unchecked_ref());
                }

                move || {
                    if let Some(element) = element {
                        let _ = element.remove_event_listener_with_callback(
                            "wheel",
                            wheel_callback.as_ref().unchecked_ref(),
                        );
                    }
                    if let Some(document) = document {
                        let _ = document.remove_event_listener_with_callback(
                            "keydown",
                            key_callback.as_ref().unchecked_ref(),
                        );
                    }
                }
            },
            (),
        );
    }

    let ontouchstart = {
        let deck = props.deck.clone();
        Callback::from(move |e: TouchEvent| {
            if let Some(touch) = e.target_touches().get(0) {
                deck.on_touch_start(f64::from(touch.client_y()));
            }
        })
    };

    let ontouchmove = {
        let deck = props.deck.clone();
        Callback::from(move |e: TouchEvent| {
            if let Some(touch) = e.target_touches().get(0) {
                deck.on_touch_move(f64::from(touch.client_y()));
            }
        })
    };

    let ontouchend = {
        let deck = props.deck.clone();
        Callback::from(move |_: TouchEvent| {
            deck.on_touch_end();
        })
    };

    let state = props.state;
    let current = state.current_index;

    let dots = (0..state.section_count)
        .map(|index| {
            let deck = props.deck.clone();
            let onclick = Callback::from(move |_: MouseEvent| {
                deck.go_to(index);
            });
            html! {
                <button
                    class={classes!("nav-dot", (index == current).then(|| "active"))}
                    aria-label={format!("Go to section {}", index + 1)}
                    {onclick}
                />
            }
        })
        .collect::<Html>();

    let go_up = {
        let deck = props.deck.clone();
        Callback::from(move |_: MouseEvent| {
            deck.previous();
        })
    };

    let go_down = {
        let deck = props.deck.clone();
        Callback::from(move |_: MouseEvent| {
            deck.next();
        })
    };

    let sections = props
        .children
        .iter()
        .enumerate()
        .map(|(index, child)| {
            let offset = (index as i64 - current as i64) * 100;
            html! {
                <div
                    key={index.to_string()}
                    class={classes!("swipe-section", (index == current).then(|| "active"))}
                    style={format!("transform: translateY({}%);", offset)}
                >
                    <div class="swipe-section-inner">{child}</div>
                </div>
            }
        })
        .collect::<Html>();

    html! {
        <div
            ref={container}
            class="swipe-page"
            {ontouchstart}
            {ontouchmove}
            {ontouchend}
        >
            <style>{LAYOUT_CSS}</style>
            <div class="swipe-progress">
                <div
                    class="swipe-progress-fill"
                    style={format!("width: {:.2}%;", state.progress() * 100.0)}
                />
            </div>

            <nav class="nav-dots">{dots}</nav>

            <div class="nav-arrows">
                <button
                    class="nav-arrow up"
                    disabled={!state.can_retreat()}
                    aria-label="Previous section"
                    onclick={go_up}
                >
                    {"▲"}
                </button>
                <button
                    class="nav-arrow down"
                    disabled={!state.can_advance()}
                    aria-label="Next section"
                    onclick={go_down}
                >
                    {"▼"}
                </button>
            </div>

            <div class="swipe-sections">{sections}</div>

            <div class="section-counter">{state.counter_label()}</div>
        </div>
    }
}
