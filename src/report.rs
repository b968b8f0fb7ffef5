use serde::{Deserialize, Serialize};

/// Which pass produced a [`BatchReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Extract,
    Inject,
}

/// What happened to one placement record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Processed {
        bytes:        usize,
        /// BLAKE3 of the raw block read (extract) or written (inject), hex.
        content_hash: String,
    },
    Skipped { reason: String },
    Failed  { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordReport {
    pub directory: String,
    pub name:      String,
    pub format:    String,
    pub address:   u64,
    #[serde(flatten)]
    pub outcome:   Outcome,
}

/// Per-record outcomes of one extraction or injection pass, in script order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub operation: Operation,
    /// Unix seconds.
    pub timestamp: i64,
    pub records:   Vec<RecordReport>,
}

impl BatchReport {
    pub fn new(operation: Operation, records: Vec<RecordReport>) -> Self {
        Self { operation, timestamp: chrono::Utc::now().timestamp(), records }
    }

    pub fn processed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Processed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    fn count(&self, f: impl Fn(&Outcome) -> bool) -> usize {
        self.records.iter().filter(|r| f(&r.outcome)).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordReport> {
        self.records.iter().filter(|r| matches!(r.outcome, Outcome::Failed { .. }))
    }

    /// Summary line for display.
    pub fn summary(&self) -> String {
        format!(
            "{:?}: {} record(s): {} processed, {} skipped, {} failed",
            self.operation,
            self.records.len(),
            self.processed(),
            self.skipped(),
            self.failed(),
        )
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, outcome: Outcome) -> RecordReport {
        RecordReport {
            directory: "d".into(),
            name:      name.into(),
            format:    "I8".into(),
            address:   0x10,
            outcome,
        }
    }

    #[test]
    fn counts_and_summary() {
        let report = BatchReport::new(Operation::Inject, vec![
            rec("a", Outcome::Processed { bytes: 4, content_hash: "00".into() }),
            rec("b", Outcome::Skipped { reason: "no image".into() }),
            rec("c", Outcome::Failed { reason: "bad".into() }),
            rec("d", Outcome::Failed { reason: "worse".into() }),
        ]);
        assert_eq!((report.processed(), report.skipped(), report.failed()), (1, 1, 2));
        assert_eq!(report.summary(), "Inject: 4 record(s): 1 processed, 1 skipped, 2 failed");
        assert_eq!(report.failures().map(|r| r.name.as_str()).collect::<Vec<_>>(), ["c", "d"]);
    }

    #[test]
    fn json_shape() {
        let report = BatchReport::new(Operation::Extract, vec![
            rec("a", Outcome::Skipped { reason: "x".into() }),
        ]);
        let json: serde_json::Value = serde_json::from_slice(&report.to_bytes().unwrap()).unwrap();
        assert_eq!(json["operation"], "extract");
        assert_eq!(json["records"][0]["status"], "skipped");
        assert_eq!(json["records"][0]["reason"], "x");
        let back = BatchReport::from_bytes(&report.to_bytes().unwrap()).unwrap();
        assert_eq!(back.records[0].outcome, report.records[0].outcome);
    }
}
