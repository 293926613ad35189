use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::Date;

use crate::domain::{
    models::{CostRecord, UsageEntry},
    ports::outbound::CostLedger,
    LedgerError,
};

#[derive(Clone, Default)]
pub struct InMemoryCostLedger {
    days: Arc<Mutex<BTreeMap<Date, CostRecord>>>,
}

impl InMemoryCostLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CostLedger for InMemoryCostLedger {
    async fn record(&self, entry: &UsageEntry) -> Result<(), LedgerError> {
        self.days
            .lock()
            .unwrap()
            .entry(entry.date)
            .or_insert_with(|| CostRecord::empty(entry.date))
            .apply(entry);
        Ok(())
    }

    async fn day(&self, date: Date) -> Result<CostRecord, LedgerError> {
        Ok(self
            .days
            .lock()
            .unwrap()
            .get(&date)
            .copied()
            .unwrap_or_else(|| CostRecord::empty(date)))
    }

    async fn range(&self, from: Date, to: Date) -> Result<Vec<CostRecord>, LedgerError> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .days
            .lock()
            .unwrap()
            .range(from..=to)
            .map(|(_, record)| *record)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CallCost, TokenUsage};
    use time::macros::date;

    #[tokio::test]
    async fn concurrent_records_all_accumulate() {
        let ledger = InMemoryCostLedger::new();
        let day = date!(2026 - 04 - 10);
        let entry = UsageEntry::miss(
            day,
            CallCost {
                llm_calls: 1,
                usage: TokenUsage {
                    input_tokens: 100,
                    output_tokens: 10,
                    ..Default::default()
                },
                cost_usd: 0.25,
            },
        );

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.record(&entry).await.unwrap() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let record = ledger.day(day).await.unwrap();
        assert_eq!(record.llm_calls, 50);
        assert_eq!(record.input_tokens, 5_000);
        assert_eq!(record.cache_misses, 50);
        assert!((record.cost_usd - 12.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn day_totals_never_decrease() {
        let ledger = InMemoryCostLedger::new();
        let day = date!(2026 - 04 - 10);
        let mut previous = 0.0;
        for cost in [0.1, 0.0, 0.3, 0.05] {
            ledger
                .record(&UsageEntry::miss(
                    day,
                    CallCost {
                        llm_calls: 1,
                        cost_usd: cost,
                        ..Default::default()
                    },
                ))
                .await
                .unwrap();
            ledger.record(&UsageEntry::cache_hit(day)).await.unwrap();
            let total = ledger.day(day).await.unwrap().cost_usd;
            assert!(total >= previous);
            previous = total;
        }
    }

    #[tokio::test]
    async fn range_is_inclusive_and_ordered() {
        let ledger = InMemoryCostLedger::new();
        for day in [date!(2026 - 04 - 12), date!(2026 - 04 - 10), date!(2026 - 04 - 15)] {
            ledger.record(&UsageEntry::cache_hit(day)).await.unwrap();
        }
        let records = ledger
            .range(date!(2026 - 04 - 10), date!(2026 - 04 - 12))
            .await
            .unwrap();
        let days: Vec<_> = records.iter().map(|r| r.date).collect();
        assert_eq!(days, vec![date!(2026 - 04 - 10), date!(2026 - 04 - 12)]);
    }
}
