use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One labeled text example, as stored in split JSONL files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub text: String,
    pub label: i64,
}

/// A named split of labeled examples, as returned by a dataset provider.
#[derive(Debug, Clone)]
pub struct FetchedSplit {
    pub name: String,
    pub examples: Vec<LabeledExample>,
}

/// A dataset materialized by a provider: every available split, already
/// capped to the requested sample limit.
#[derive(Debug, Clone)]
pub struct FetchedDataset {
    pub name: String,
    pub splits: Vec<FetchedSplit>,
}

impl FetchedDataset {
    pub fn total_samples(&self) -> u64 {
        self.splits.iter().map(|s| s.examples.len() as u64).sum()
    }

    pub fn split_names(&self) -> Vec<String> {
        self.splits.iter().map(|s| s.name.clone()).collect()
    }
}

pub const TRAIN_SPLIT: &str = "train";
pub const TEST_SPLIT: &str = "test";
pub const VALIDATION_SPLIT: &str = "validation";

/// Pick the evaluation split: `test` when present, `validation` otherwise.
pub fn evaluation_split(split_names: &[String]) -> Option<&'static str> {
    if split_names.iter().any(|s| s == TEST_SPLIT) {
        Some(TEST_SPLIT)
    } else if split_names.iter().any(|s| s == VALIDATION_SPLIT) {
        Some(VALIDATION_SPLIT)
    } else {
        None
    }
}

/// Sidecar manifest written next to the materialized splits
/// (`data/metadata.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub name: String,
    pub total_samples: u64,
    pub splits: Vec<String>,
    pub max_samples: Option<u64>,
}

pub fn write_jsonl_examples(path: &Path, examples: &[LabeledExample]) -> TrainingResult<()> {
    let mut out = String::new();
    for ex in examples {
        out.push_str(&serde_json::to_string(ex)?);
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}

pub fn read_jsonl_examples(path: &Path) -> TrainingResult<Vec<LabeledExample>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        TrainingError::Dataset(format!("failed to read {}: {}", path.display(), e))
    })?;

    let mut examples = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let ex: LabeledExample = serde_json::from_str(line).map_err(|e| {
            TrainingError::Dataset(format!("failed to parse jsonl line {}: {}", idx + 1, e))
        })?;
        examples.push(ex);
    }

    if examples.is_empty() {
        return Err(TrainingError::Dataset(format!("no examples in {}", path.display())));
    }

    Ok(examples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_jsonl_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.jsonl");

        let examples = vec![
            LabeledExample { text: "a fine film".to_string(), label: 1 },
            LabeledExample { text: "a waste of time".to_string(), label: 0 },
        ];
        write_jsonl_examples(&path, &examples).unwrap();

        let read = read_jsonl_examples(&path).unwrap();
        assert_eq!(read, examples);
    }

    #[test]
    fn test_read_jsonl_rejects_malformed_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.jsonl");
        std::fs::write(&path, "{\"text\": \"ok\", \"label\": 1}\nnot json\n").unwrap();

        let err = read_jsonl_examples(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_read_jsonl_rejects_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.jsonl");
        std::fs::write(&path, "").unwrap();
        assert!(read_jsonl_examples(&path).is_err());
    }

    #[test]
    fn test_evaluation_split_prefers_test() {
        let splits =
            vec!["train".to_string(), "test".to_string(), "validation".to_string()];
        assert_eq!(evaluation_split(&splits), Some("test"));
    }

    #[test]
    fn test_evaluation_split_falls_back_to_validation() {
        let splits = vec!["train".to_string(), "validation".to_string()];
        assert_eq!(evaluation_split(&splits), Some("validation"));
    }

    #[test]
    fn test_evaluation_split_none_when_absent() {
        let splits = vec!["train".to_string()];
        assert_eq!(evaluation_split(&splits), None);
    }
}
