//! Built-in classification metrics.

use std::collections::BTreeMap;
use tunelab_training::{MetricComputer, MetricKind, ProviderError};

/// Confusion matrix over the union of observed true/predicted labels.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    labels: Vec<i64>,
    counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn from_labels(true_labels: &[i64], predicted_labels: &[i64]) -> Self {
        let mut labels: Vec<i64> = true_labels
            .iter()
            .chain(predicted_labels.iter())
            .copied()
            .collect();
        labels.sort_unstable();
        labels.dedup();

        let index: BTreeMap<i64, usize> =
            labels.iter().enumerate().map(|(i, &l)| (l, i)).collect();
        let n = labels.len();
        let mut counts = vec![vec![0u64; n]; n];
        for (&t, &p) in true_labels.iter().zip(predicted_labels.iter()) {
            counts[index[&t]][index[&p]] += 1;
        }

        Self { labels, counts }
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn true_positives(&self, class: usize) -> u64 {
        self.counts[class][class]
    }

    pub fn false_positives(&self, class: usize) -> u64 {
        (0..self.n_classes())
            .filter(|&t| t != class)
            .map(|t| self.counts[t][class])
            .sum()
    }

    pub fn false_negatives(&self, class: usize) -> u64 {
        (0..self.n_classes())
            .filter(|&p| p != class)
            .map(|p| self.counts[class][p])
            .sum()
    }

    /// Number of true examples of `class`.
    pub fn support(&self, class: usize) -> u64 {
        self.counts[class].iter().sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: u64 = (0..self.n_classes()).map(|c| self.true_positives(c)).sum();
        correct as f64 / total as f64
    }

    /// Per-class precision, recall, and F1.
    fn class_prf(&self, class: usize) -> (f64, f64, f64) {
        let tp = self.true_positives(class) as f64;
        let fp = self.false_positives(class) as f64;
        let fn_ = self.false_negatives(class) as f64;

        let p = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
        let r = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
        let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
        (p, r, f)
    }

    /// Support-weighted average of a per-class metric.
    fn weighted(&self, select: impl Fn((f64, f64, f64)) -> f64) -> f64 {
        let total: u64 = (0..self.n_classes()).map(|c| self.support(c)).sum();
        if total == 0 {
            return 0.0;
        }
        (0..self.n_classes())
            .map(|c| select(self.class_prf(c)) * self.support(c) as f64)
            .sum::<f64>()
            / total as f64
    }

    pub fn weighted_precision(&self) -> f64 {
        self.weighted(|(p, _, _)| p)
    }

    pub fn weighted_recall(&self) -> f64 {
        self.weighted(|(_, r, _)| r)
    }

    pub fn weighted_f1(&self) -> f64 {
        self.weighted(|(_, _, f)| f)
    }
}

/// Metric computer backed by [`ConfusionMatrix`]; F1/precision/recall are
/// support-weighted across classes.
#[derive(Debug, Default)]
pub struct BuiltinMetrics;

impl MetricComputer for BuiltinMetrics {
    fn compute(
        &self,
        true_labels: &[i64],
        predicted_labels: &[i64],
        requested: &[MetricKind],
    ) -> Result<BTreeMap<String, f64>, ProviderError> {
        if true_labels.len() != predicted_labels.len() {
            return Err(ProviderError::Metric(format!(
                "label sequences differ in length ({} vs {})",
                true_labels.len(),
                predicted_labels.len()
            )));
        }
        if true_labels.is_empty() {
            return Err(ProviderError::Metric("no labels to score".to_string()));
        }

        let cm = ConfusionMatrix::from_labels(true_labels, predicted_labels);
        let mut scores = BTreeMap::new();
        for kind in requested {
            let value = match kind {
                MetricKind::Accuracy => cm.accuracy(),
                MetricKind::F1 => cm.weighted_f1(),
                MetricKind::Precision => cm.weighted_precision(),
                MetricKind::Recall => cm.weighted_recall(),
            };
            scores.insert(kind.as_str().to_string(), value);
        }
        Ok(scores)
    }
}
