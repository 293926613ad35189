//! Daily spending ceiling on model-backed triage.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::warn;

use crate::domain::{ports::outbound::CostLedger, TriageError};

const WARN_FRACTION: f64 = 0.8;

/// Reads today's total from the ledger before each model call.
pub struct BudgetGuard {
    ledger: Arc<dyn CostLedger>,
    daily_ceiling_usd: Option<f64>,
}

impl BudgetGuard {
    pub fn new(ledger: Arc<dyn CostLedger>, daily_ceiling_usd: Option<f64>) -> Self {
        Self {
            ledger,
            daily_ceiling_usd,
        }
    }

    pub async fn check(&self, now: OffsetDateTime) -> Result<(), TriageError> {
        let Some(ceiling) = self.daily_ceiling_usd else {
            return Ok(());
        };

        let spent = self.ledger.day(now.date()).await?.cost_usd;
        if spent >= ceiling {
            return Err(TriageError::BudgetExceeded { spent, ceiling });
        }
        if spent >= ceiling * WARN_FRACTION {
            warn!(
                daily_total = spent,
                daily_ceiling = ceiling,
                "approaching daily budget ceiling (80%+)"
            );
        }
        Ok(())
    }
}
