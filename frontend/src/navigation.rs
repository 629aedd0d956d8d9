pub mod arbiter;
pub mod controller;

pub use arbiter::{InputArbiter, Intent, NavKey};
pub use controller::{NavigationState, SectionController, SectionListener};
