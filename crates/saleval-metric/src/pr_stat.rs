//! Binned precision-recall accumulator.
//!
//! Each image contributes one precision/recall pair per threshold bin. Scores
//! are quantized into [`N_BINS`] bins; a bin `i` stands for the decision rule
//! "salient iff `score >= i / (N_BINS - 1)`". One descending sweep over the
//! bin histograms yields the pairs for every threshold at once.
//!
//! Sums are kept per image (ratios first, then summed) so every image weighs
//! the same in the curve regardless of its pixel count.

use burn::tensor::{backend::Backend, Tensor};

use crate::{
    error::{MetricError, MetricResult},
    utils::{guarded_ratio, host_values},
    N_BINS,
};

/// Running precision/recall sums over threshold bins.
///
/// Two stats merge by element-wise addition; [`PrStat::new`] is the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct PrStat {
    precision_sum: Vec<f64>,
    recall_sum: Vec<f64>,
    sample_count: u64,
}

impl Default for PrStat {
    fn default() -> Self {
        Self::new()
    }
}

impl PrStat {
    pub fn new() -> Self {
        Self {
            precision_sum: vec![0.0; N_BINS],
            recall_sum: vec![0.0; N_BINS],
            sample_count: 0,
        }
    }

    /// Number of images accumulated.
    pub const fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Folds one image into the running sums.
    ///
    /// `saliency` and `ground_truth` are the same pixels in the same order.
    /// Ground-truth values above `0.5` are foreground.
    pub fn add(&mut self, saliency: &[f32], ground_truth: &[f32]) -> MetricResult<()> {
        if saliency.len() != ground_truth.len() {
            return Err(MetricError::LengthMismatch {
                saliency: saliency.len(),
                ground_truth: ground_truth.len(),
            });
        }

        let mut count_gt_at_bin = [0_u64; N_BINS];
        let mut count_all_at_bin = [0_u64; N_BINS];
        let mut total_gt = 0_u64;

        for (&score, &gt) in saliency.iter().zip(ground_truth) {
            let bin = score_bin(score);
            let is_gt = u64::from(gt > 0.5);
            count_gt_at_bin[bin] += is_gt;
            count_all_at_bin[bin] += 1;
            total_gt += is_gt;
        }

        let mut cum_gt_and_pred = 0_u64;
        let mut cum_pred = 0_u64;
        for bin in (0..N_BINS).rev() {
            cum_gt_and_pred += count_gt_at_bin[bin];
            cum_pred += count_all_at_bin[bin];
            self.precision_sum[bin] += guarded_ratio(cum_gt_and_pred as f64, cum_pred as f64);
            self.recall_sum[bin] += guarded_ratio(cum_gt_and_pred as f64, total_gt as f64);
        }

        self.sample_count += 1;
        Ok(())
    }

    /// Tensor flavour of [`PrStat::add`] for `[height, width]` maps.
    pub fn add_tensors<B: Backend>(
        &mut self,
        saliency: Tensor<B, 2>,
        ground_truth: Tensor<B, 2>,
    ) -> MetricResult<()> {
        let saliency = host_values(saliency)?;
        let ground_truth = host_values(ground_truth)?;
        self.add(&saliency, &ground_truth)
    }

    /// Mean precision per bin.
    pub fn precision(&self) -> MetricResult<Vec<f64>> {
        self.normalized(&self.precision_sum)
    }

    /// Mean recall per bin.
    pub fn recall(&self) -> MetricResult<Vec<f64>> {
        self.normalized(&self.recall_sum)
    }

    /// F-measure per bin from the mean precision and recall.
    ///
    /// There is no epsilon here: a bin where both precision and recall are
    /// zero yields NaN and has to be read as "no data".
    pub fn f_measure(&self, beta2: f64) -> MetricResult<Vec<f64>> {
        let precision = self.precision()?;
        let recall = self.recall()?;
        Ok(precision
            .iter()
            .zip(&recall)
            .map(|(&p, &r)| (1.0 + beta2) * p * r / beta2.mul_add(p, r))
            .collect())
    }

    /// Adds `other`'s sums and count into `self`.
    pub fn merge(&mut self, other: &Self) {
        for (acc, v) in self.precision_sum.iter_mut().zip(&other.precision_sum) {
            *acc += v;
        }
        for (acc, v) in self.recall_sum.iter_mut().zip(&other.recall_sum) {
            *acc += v;
        }
        self.sample_count += other.sample_count;
    }

    fn normalized(&self, sums: &[f64]) -> MetricResult<Vec<f64>> {
        if self.sample_count == 0 {
            return Err(MetricError::EmptyDataset);
        }
        let count = self.sample_count as f64;
        Ok(sums.iter().map(|s| s / count).collect())
    }
}

/// Score threshold represented by `bin`.
pub fn bin_threshold(bin: usize) -> f64 {
    bin as f64 / (N_BINS - 1) as f64
}

/// Quantizes a score into its bin: `floor(score * (N_BINS - 1))`.
///
/// Out-of-range scores are clamped; NaN lands in bin 0.
#[inline]
fn score_bin(score: f32) -> usize {
    // float-to-int `as` saturates and maps NaN to 0
    ((score * (N_BINS - 1) as f32) as usize).min(N_BINS - 1)
}
