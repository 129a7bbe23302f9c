//! Core types for the healing ladder

use serde::{Deserialize, Serialize};
use soulscout_core_types::HealingResult;

/// Healing tiers, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealTier {
    /// Alternates recorded by earlier heals
    Memorized,

    /// Rewrites derived from the shape of the broken locator
    Transformation,

    /// Text search for elements resembling the broken locator
    Semantic,
}

impl HealTier {
    /// Get tier name as string
    pub fn name(&self) -> &'static str {
        match self {
            HealTier::Memorized => "memorized",
            HealTier::Transformation => "transformation",
            HealTier::Semantic => "semantic",
        }
    }

    /// Get all tiers in fallback order
    pub fn ladder() -> [HealTier; 3] {
        [HealTier::Memorized, HealTier::Transformation, HealTier::Semantic]
    }
}

pub const MEMORIZED_CONFIDENCE: f64 = 0.9;
pub const TRANSFORMATION_CONFIDENCE: f64 = 0.75;
pub const SEMANTIC_TEST_ID_CONFIDENCE: f64 = 0.8;
pub const SEMANTIC_ID_CONFIDENCE: f64 = 0.7;
pub const SEMANTIC_ROLE_CONFIDENCE: f64 = 0.6;

/// Result of a heal together with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealOutcome {
    pub result: HealingResult,
    pub tier: Option<HealTier>,
    /// Tier names tried, in order
    pub attempted: Vec<&'static str>,
}

impl HealOutcome {
    pub fn is_success(&self) -> bool {
        self.result.success
    }

    pub fn healed_locator(&self) -> Option<&str> {
        self.result.new_locator.as_deref()
    }
}
