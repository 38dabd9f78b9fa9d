use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ActionResult;

/// One instruction and its resolved outcome. The step record is append-only
/// for the duration of a run; failed steps stay in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationStep {
    pub step_number: usize,
    pub instruction: String,
    pub result: ActionResult,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step was attempted (not necessarily successfully).
    Completed,
    /// Stopped at the first failure under abort_on_failure.
    Aborted,
    /// An external cancel signal arrived between steps.
    Cancelled,
}

/// Audit record of one automation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub succeeded: usize,
    pub total: usize,
    pub steps: Vec<AutomationStep>,
    pub duration_seconds: f64,
}

impl AutomationReport {
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }

    pub fn summary(&self) -> String {
        format!(
            "{:?}: {}/{} steps succeeded in {:.1}s",
            self.status, self.succeeded, self.total, self.duration_seconds
        )
    }
}
