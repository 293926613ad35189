//! Per-model token prices, USD per million tokens.

use crate::domain::models::TokenUsage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
    pub cache_read_per_mtok: f64,
    pub cache_write_per_mtok: f64,
}

impl ModelPricing {
    /// Cache writes cost 1.25x input and cache reads 0.1x.
    const fn from_rates(input_per_mtok: f64, output_per_mtok: f64) -> Self {
        Self {
            input_per_mtok,
            output_per_mtok,
            cache_read_per_mtok: input_per_mtok * 0.1,
            cache_write_per_mtok: input_per_mtok * 1.25,
        }
    }
}

const SONNET: ModelPricing = ModelPricing::from_rates(3.0, 15.0);
const OPUS: ModelPricing = ModelPricing::from_rates(15.0, 75.0);
const HAIKU: ModelPricing = ModelPricing::from_rates(0.80, 4.0);

/// Matches on the model family name; anything unrecognised is priced as sonnet.
pub fn pricing_for(model: &str) -> ModelPricing {
    let model = model.to_lowercase();
    if model.contains("opus") {
        OPUS
    } else if model.contains("haiku") {
        HAIKU
    } else {
        SONNET
    }
}

pub fn calculate_cost(usage: &TokenUsage, pricing: &ModelPricing) -> f64 {
    let per_million = |tokens: u64, rate: f64| tokens as f64 / 1_000_000.0 * rate;
    per_million(usage.input_tokens, pricing.input_per_mtok)
        + per_million(usage.output_tokens, pricing.output_per_mtok)
        + per_million(usage.cache_read_tokens, pricing.cache_read_per_mtok)
        + per_million(usage.cache_write_tokens, pricing.cache_write_per_mtok)
}
