use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One document of the highs collection: the all-time high of one exchange.
///
/// `time` is absent on documents written before observation times were kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighRecord {
    pub exchange: String,
    pub high: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl HighRecord {
    pub fn new(exchange: impl Into<String>, high: f64) -> Self {
        Self { exchange: exchange.into(), high, time: None }
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }
}
