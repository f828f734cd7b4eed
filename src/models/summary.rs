use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One persisted summarization result. A row is written per run, not per
/// notification, and is immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub id: String,
    pub date: NaiveDate,
    pub body: String,
}
