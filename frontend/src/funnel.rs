pub mod checkout;
pub mod counters;
pub mod exit_intent;
pub mod gate;
pub mod quiz;
pub mod sections;

pub use checkout::{checkout_url, CheckoutFlow, CheckoutRedirector};
pub use counters::{CounterView, LiveCounters};
pub use exit_intent::{ExitIntent, ExitView};
pub use gate::{FunnelGate, GateState, SecondaryOffer};
pub use quiz::{QuizFlow, QuizStage};
pub use sections::{ContentProvider, ContentVariant, FunnelSection};
