pub mod config;
pub mod deck;
pub mod error;
pub mod funnel;
pub mod navigation;
pub mod notify;
pub mod timer;
pub mod web;

pub mod components {
    pub mod swipe_page;
}
pub mod pages {
    pub mod funnel;
}

pub use deck::SwipeDeck;
pub use error::ConfigError;
