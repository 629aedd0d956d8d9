use log::Level;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[cfg(debug_assertions)]
pub fn log_level() -> Level {
    Level::Debug // Verbose while developing locally
}

#[cfg(not(debug_assertions))]
pub fn log_level() -> Level {
    Level::Info
}

pub const DEFAULT_TRANSITION_MS: u32 = 800;
pub const DEFAULT_SWIPE_THRESHOLD: f64 = 50.0;

/// Timings and section layout of the funnel. Every field has a default, so a
/// partial JSON object only overrides what it names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunnelConfig {
    /// Length of the slide animation; the controller stays busy this long.
    pub transition_ms: u32,
    /// Input cooldown after an intent was forwarded.
    pub cooldown_ms: u32,
    /// Minimum vertical drag, in CSS pixels, that counts as a swipe.
    pub swipe_threshold: f64,
    pub quiz_section: usize,
    pub pricing_section: usize,
    /// Delay between quiz completion and pricing unlocking.
    pub pricing_unlock_ms: u32,
    /// Delay between quiz completion and the secondary offer prompt.
    pub secondary_offer_ms: u32,
    /// Pause before an automatic jump (start quiz, pricing ready).
    pub follow_up_ms: u32,
    pub checkout_confirm_ms: u32,
    pub checkout_redirect_ms: u32,
    pub exit_offer_seconds: u32,
    pub checkout_base_url: String,
    pub quiz_question_count: usize,
    /// Pause between picking an answer and the next question.
    pub quiz_step_ms: u32,
    /// The "analyzing" bar moves 10% per tick.
    pub quiz_loading_tick_ms: u32,
    pub seats_tick_ms: u32,
    pub completed_tick_ms: u32,
    pub testimonial_tick_ms: u32,
    pub earnings_tick_ms: u32,
    pub testimonial_count: usize,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            transition_ms: DEFAULT_TRANSITION_MS,
            cooldown_ms: DEFAULT_TRANSITION_MS,
            swipe_threshold: DEFAULT_SWIPE_THRESHOLD,
            quiz_section: 2,
            pricing_section: 3,
            pricing_unlock_ms: 2000,
            secondary_offer_ms: 5000,
            follow_up_ms: 500,
            checkout_confirm_ms: 3000,
            checkout_redirect_ms: 1000,
            exit_offer_seconds: 300,
            checkout_base_url: "https://checkout.stripe.com/pay".to_string(),
            quiz_question_count: 5,
            quiz_step_ms: 500,
            quiz_loading_tick_ms: 300,
            seats_tick_ms: 45_000,
            completed_tick_ms: 30_000,
            testimonial_tick_ms: 4_000,
            earnings_tick_ms: 30_000,
            testimonial_count: 3,
        }
    }
}

impl FunnelConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Check the config against a deck of `section_count` sections.
    pub fn validate(&self, section_count: usize) -> Result<(), ConfigError> {
        if section_count == 0 {
            return Err(ConfigError::EmptySections);
        }
        if self.quiz_section >= section_count {
            return Err(ConfigError::SectionOutOfRange {
                name: "quiz",
                index: self.quiz_section,
                count: section_count,
            });
        }
        if self.pricing_section >= section_count {
            return Err(ConfigError::SectionOutOfRange {
                name: "pricing",
                index: self.pricing_section,
                count: section_count,
            });
        }
        if self.quiz_section == self.pricing_section {
            return Err(ConfigError::Invalid(format!(
                "quiz and pricing share section {}",
                self.quiz_section
            )));
        }
        if !self.swipe_threshold.is_finite() || self.swipe_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "swipe threshold must be a non-negative number, got {}",
                self.swipe_threshold
            )));
        }
        if self.exit_offer_seconds == 0 {
            return Err(ConfigError::Invalid(
                "exit offer needs at least one second on the clock".to_string(),
            ));
        }
        if self.quiz_question_count == 0 {
            return Err(ConfigError::Invalid("the quiz needs at least one question".to_string()));
        }
        let ticks = [
            ("quiz_loading_tick_ms", self.quiz_loading_tick_ms),
            ("seats_tick_ms", self.seats_tick_ms),
            ("completed_tick_ms", self.completed_tick_ms),
            ("testimonial_tick_ms", self.testimonial_tick_ms),
            ("earnings_tick_ms", self.earnings_tick_ms),
        ];
        if let Some((name, _)) = ticks.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::Invalid(format!("{} must be greater than zero", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_funnel_pacing() {
        let config = FunnelConfig::default();
        assert_eq!(config.transition_ms, 800);
        assert_eq!(config.cooldown_ms, 800);
        assert_eq!(config.pricing_unlock_ms, 2000);
        assert_eq!(config.secondary_offer_ms, 5000);
        assert!(config.validate(6).is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = FunnelConfig::from_json(r#"{ "transition_ms": 400, "quiz_section": 1 }"#).unwrap();
        assert_eq!(config.transition_ms, 400);
        assert_eq!(config.quiz_section, 1);
        assert_eq!(config.pricing_section, 3);
        assert_eq!(config.follow_up_ms, 500);
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let err = FunnelConfig::from_json("{ transition_ms: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validate_rejects_bad_layouts() {
        let config = FunnelConfig::default();
        assert_eq!(config.validate(0), Err(ConfigError::EmptySections));
        assert_eq!(
            config.validate(3),
            Err(ConfigError::SectionOutOfRange { name: "pricing", index: 3, count: 3 })
        );

        let shared = FunnelConfig { pricing_section: 2, ..FunnelConfig::default() };
        assert!(matches!(shared.validate(6), Err(ConfigError::Invalid(_))));

        let negative = FunnelConfig { swipe_threshold: -1.0, ..FunnelConfig::default() };
        assert!(matches!(negative.validate(6), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_length_ticks() {
        let stuck = FunnelConfig { testimonial_tick_ms: 0, ..FunnelConfig::default() };
        assert_eq!(
            stuck.validate(6),
            Err(ConfigError::Invalid("testimonial_tick_ms must be greater than zero".to_string()))
        );

        let empty_quiz = FunnelConfig { quiz_question_count: 0, ..FunnelConfig::default() };
        assert!(matches!(empty_quiz.validate(6), Err(ConfigError::Invalid(_))));
    }
}
