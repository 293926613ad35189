use serde::Serialize;
use time::Date;

/// Average cost of one model-backed triage, used to value cache hits when
/// no priced misses exist yet.
pub const FALLBACK_COST_PER_CALL_USD: f64 = 0.015;

/// One additive contribution to a day's cost record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageEntry {
    pub date: Date,
    pub llm_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub cache_hit: bool,
}

impl UsageEntry {
    pub fn cache_hit(date: Date) -> Self {
        Self {
            date,
            llm_calls: 0,
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            cache_hit: true,
        }
    }

    pub fn miss(date: Date, cost: super::CallCost) -> Self {
        Self {
            date,
            llm_calls: cost.llm_calls,
            input_tokens: cost.usage.input_tokens,
            output_tokens: cost.usage.output_tokens,
            cost_usd: cost.cost_usd,
            cache_hit: false,
        }
    }
}

/// Accumulated usage for one UTC day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostRecord {
    pub date: Date,
    pub llm_calls: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl CostRecord {
    pub fn empty(date: Date) -> Self {
        Self {
            date,
            llm_calls: 0,
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    /// Adds an entry. Counters only ever grow.
    pub fn apply(&mut self, entry: &UsageEntry) {
        if entry.cache_hit {
            self.cache_hits += 1;
            return;
        }
        self.cache_misses += 1;
        self.llm_calls += u64::from(entry.llm_calls);
        self.input_tokens += entry.input_tokens;
        self.output_tokens += entry.output_tokens;
        self.cost_usd += entry.cost_usd.max(0.0);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSummary {
    pub total_cost_usd: f64,
    pub total_llm_calls: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub cost_saved_usd: f64,
}

impl CostSummary {
    pub fn from_records(records: &[CostRecord]) -> Self {
        let mut summary = Self {
            total_cost_usd: 0.0,
            total_llm_calls: 0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            cache_hits: 0,
            cache_misses: 0,
            cache_hit_rate: 0.0,
            cost_saved_usd: 0.0,
        };

        for record in records {
            summary.total_cost_usd += record.cost_usd;
            summary.total_llm_calls += record.llm_calls;
            summary.total_input_tokens += record.input_tokens;
            summary.total_output_tokens += record.output_tokens;
            summary.cache_hits += record.cache_hits;
            summary.cache_misses += record.cache_misses;
        }

        let lookups = summary.cache_hits + summary.cache_misses;
        if lookups > 0 {
            summary.cache_hit_rate = summary.cache_hits as f64 / lookups as f64;
        }

        let avg_miss_cost = if summary.cache_misses > 0 && summary.total_cost_usd > 0.0 {
            summary.total_cost_usd / summary.cache_misses as f64
        } else {
            FALLBACK_COST_PER_CALL_USD
        };
        summary.cost_saved_usd = summary.cache_hits as f64 * avg_miss_cost;

        summary
    }
}
