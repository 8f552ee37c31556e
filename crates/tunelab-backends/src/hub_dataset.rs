//! Dataset provider backed by the HuggingFace datasets-server REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use tunelab_training::{DatasetProvider, FetchedDataset, FetchedSplit, LabeledExample, ProviderError};

const DEFAULT_BASE_URL: &str = "https://datasets-server.huggingface.co";
const ROWS_PER_REQUEST: usize = 100;

/// Columns probed, in order, for the example text.
const TEXT_COLUMNS: &[&str] = &["text", "sentence", "content"];
const LABEL_COLUMN: &str = "label";

#[derive(Debug, Clone)]
pub struct HubDatasetProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SplitsResponse {
    splits: Vec<SplitInfo>,
}

#[derive(Debug, Deserialize)]
struct SplitInfo {
    config: String,
    split: String,
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    rows: Vec<RowEntry>,
    #[serde(default)]
    num_rows_total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row: serde_json::Value,
}

impl Default for HubDatasetProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HubDatasetProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// Point the provider at a different server (used by tests).
    pub fn with_base_url(base_url: String) -> Self {
        Self { client: Client::new(), base_url }
    }

    async fn list_splits(&self, name: &str) -> Result<Vec<SplitInfo>, ProviderError> {
        let url = format!("{}/splits", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("dataset", name)])
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Dataset(format!(
                "splits request for '{name}' failed with status {}",
                response.status()
            )));
        }

        let parsed: SplitsResponse =
            response.json().await.map_err(|e| ProviderError::Request(e.to_string()))?;
        if parsed.splits.is_empty() {
            return Err(ProviderError::Dataset(format!("dataset '{name}' has no splits")));
        }
        Ok(parsed.splits)
    }

    async fn fetch_split(
        &self,
        name: &str,
        config: &str,
        split: &str,
        max_samples: Option<usize>,
    ) -> Result<Vec<LabeledExample>, ProviderError> {
        let url = format!("{}/rows", self.base_url);
        let mut examples = Vec::new();
        let mut offset = 0usize;

        loop {
            let remaining = max_samples.map_or(ROWS_PER_REQUEST, |cap| {
                cap.saturating_sub(examples.len()).min(ROWS_PER_REQUEST)
            });
            if remaining == 0 {
                break;
            }

            let offset_param = offset.to_string();
            let length_param = remaining.to_string();
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("dataset", name),
                    ("config", config),
                    ("split", split),
                    ("offset", offset_param.as_str()),
                    ("length", length_param.as_str()),
                ])
                .send()
                .await
                .map_err(|e| ProviderError::Request(e.to_string()))?;

            if !response.status().is_success() {
                return Err(ProviderError::Dataset(format!(
                    "rows request for '{name}/{split}' failed with status {}",
                    response.status()
                )));
            }

            let parsed: RowsResponse =
                response.json().await.map_err(|e| ProviderError::Request(e.to_string()))?;
            let page_len = parsed.rows.len();
            for entry in parsed.rows {
                match example_from_row(&entry.row) {
                    Some(example) => examples.push(example),
                    None => {
                        return Err(ProviderError::Dataset(format!(
                            "row {offset} of '{name}/{split}' has no recognizable text/label columns"
                        )))
                    }
                }
            }

            offset += page_len;
            let exhausted = page_len < ROWS_PER_REQUEST
                || parsed.num_rows_total.is_some_and(|total| offset as u64 >= total);
            if exhausted {
                break;
            }
        }

        if examples.is_empty() {
            return Err(ProviderError::Dataset(format!("split '{split}' of '{name}' is empty")));
        }
        Ok(examples)
    }
}

/// Extract `{text, label}` from one datasets-server row.
fn example_from_row(row: &serde_json::Value) -> Option<LabeledExample> {
    let text = TEXT_COLUMNS
        .iter()
        .find_map(|col| row.get(col).and_then(|v| v.as_str()))?;
    let label = row.get(LABEL_COLUMN).and_then(serde_json::Value::as_i64)?;
    Some(LabeledExample { text: text.to_string(), label })
}

#[async_trait]
impl DatasetProvider for HubDatasetProvider {
    fn id(&self) -> &'static str {
        "hf-datasets-server"
    }

    async fn fetch(
        &self,
        name: &str,
        max_samples: Option<usize>,
    ) -> Result<FetchedDataset, ProviderError> {
        let split_infos = self.list_splits(name).await?;

        // Datasets can expose several configs; mirror the hub default by
        // taking the first one and its splits.
        let config = split_infos[0].config.clone();
        let mut splits = Vec::new();
        for info in split_infos.iter().filter(|s| s.config == config) {
            debug!(dataset = name, split = %info.split, "fetching split");
            let examples = self.fetch_split(name, &config, &info.split, max_samples).await?;
            splits.push(FetchedSplit { name: info.split.clone(), examples });
        }

        Ok(FetchedDataset { name: name.to_string(), splits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_example_from_row_reads_text_column() {
        let row = json!({"text": "a fine film", "label": 1});
        let example = example_from_row(&row).unwrap();
        assert_eq!(example.text, "a fine film");
        assert_eq!(example.label, 1);
    }

    #[test]
    fn test_example_from_row_falls_back_to_sentence_column() {
        let row = json!({"sentence": "works too", "label": 0});
        assert_eq!(example_from_row(&row).unwrap().text, "works too");
    }

    #[test]
    fn test_example_from_row_rejects_missing_label() {
        let row = json!({"text": "no label here"});
        assert!(example_from_row(&row).is_none());
    }

    #[test]
    fn test_rows_response_parses_server_payload() {
        let payload = json!({
            "rows": [
                {"row_idx": 0, "row": {"text": "first", "label": 1}, "truncated_cells": []},
                {"row_idx": 1, "row": {"text": "second", "label": 0}, "truncated_cells": []}
            ],
            "num_rows_total": 2
        });
        let parsed: RowsResponse = serde_json::from_value(payload).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.num_rows_total, Some(2));
        assert_eq!(example_from_row(&parsed.rows[0].row).unwrap().label, 1);
    }

    #[test]
    fn test_splits_response_parses_server_payload() {
        let payload = json!({
            "splits": [
                {"dataset": "imdb", "config": "plain_text", "split": "train"},
                {"dataset": "imdb", "config": "plain_text", "split": "test"}
            ]
        });
        let parsed: SplitsResponse = serde_json::from_value(payload).unwrap();
        assert_eq!(parsed.splits.len(), 2);
        assert_eq!(parsed.splits[1].split, "test");
    }
}
