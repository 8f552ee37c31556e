//! Seeded train/validation splitting of a labeled dataset.

use crate::error::{PipelineError, PipelineResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use tunelab_training::LabeledExample;

#[derive(Debug, Clone)]
pub struct SplitSpec {
    pub train_ratio: f64,
    pub val_ratio: f64,
    pub seed: u64,
    /// Preserve per-label proportions across the two splits.
    pub stratify: bool,
}

/// Both ratios must lie in (0, 1) and sum to 1.0 within a small tolerance.
pub fn validate_ratios(train_ratio: f64, val_ratio: f64) -> PipelineResult<()> {
    if !(train_ratio > 0.0 && train_ratio < 1.0 && val_ratio > 0.0 && val_ratio < 1.0) {
        return Err(PipelineError::InvalidRatio(
            "ratios must be between 0 and 1".to_string(),
        ));
    }
    if ((train_ratio + val_ratio) - 1.0).abs() > 1e-3 {
        return Err(PipelineError::InvalidRatio(format!(
            "train and validation ratios must sum to 1.0 (got {})",
            train_ratio + val_ratio
        )));
    }
    Ok(())
}

/// Split examples into (train, validation) with a seeded shuffle.
pub fn split_examples(
    examples: &[LabeledExample],
    spec: &SplitSpec,
) -> PipelineResult<(Vec<LabeledExample>, Vec<LabeledExample>)> {
    validate_ratios(spec.train_ratio, spec.val_ratio)?;
    if examples.len() < 2 {
        return Err(PipelineError::InvalidRatio(format!(
            "need at least 2 examples to split, got {}",
            examples.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);

    if spec.stratify {
        let mut by_label: BTreeMap<i64, Vec<&LabeledExample>> = BTreeMap::new();
        for ex in examples {
            by_label.entry(ex.label).or_default().push(ex);
        }

        let mut train = Vec::new();
        let mut val = Vec::new();
        for (_, mut group) in by_label {
            group.shuffle(&mut rng);
            let cut = cut_index(group.len(), spec.train_ratio);
            train.extend(group[..cut].iter().map(|&e| e.clone()));
            val.extend(group[cut..].iter().map(|&e| e.clone()));
        }
        // Interleave classes rather than leaving them grouped.
        train.shuffle(&mut rng);
        val.shuffle(&mut rng);
        Ok((train, val))
    } else {
        let mut shuffled: Vec<LabeledExample> = examples.to_vec();
        shuffled.shuffle(&mut rng);
        let cut = cut_index(shuffled.len(), spec.train_ratio);
        let val = shuffled.split_off(cut);
        Ok((shuffled, val))
    }
}

/// Index of the train/validation boundary, keeping both sides non-empty.
fn cut_index(len: usize, train_ratio: f64) -> usize {
    let cut = (len as f64 * train_ratio).round() as usize;
    cut.clamp(1, len.saturating_sub(1).max(1))
}
