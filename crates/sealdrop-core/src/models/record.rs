use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A `name(score)` entry of the `topics` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub topic: String,
    pub relevance_score: String,
}

/// A `ticker(label)` entry of the `ticker_sentiment` column.
///
/// `relevance_score` and `sentiment_score` are always empty: no input column
/// supplies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerSentiment {
    pub ticker: String,
    #[serde(rename = "ticker_sentiment_label")]
    pub sentiment_label: String,
    pub relevance_score: String,
    #[serde(rename = "ticker_sentiment_score")]
    pub sentiment_score: String,
}

impl TickerSentiment {
    pub fn new(ticker: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            sentiment_label: label.into(),
            relevance_score: String::new(),
            sentiment_score: String::new(),
        }
    }
}

/// One decoded row: the raw columns plus the two normalized fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    /// Every column other than `topics` and `ticker_sentiment`.
    #[serde(flatten)]
    pub columns: BTreeMap<String, String>,
    pub topics: Vec<Topic>,
    pub ticker_sentiment: Vec<TickerSentiment>,
}

/// All records decoded from one tabular file.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub source_file: String,
    pub uploaded_by: String,
    pub records: Vec<StructuredRecord>,
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
