//! Per-image evaluation and dataset-wide accumulation.
//!
//! An [`Evaluator`] owns running sums of the per-image scores and a
//! [`PrStat`]. Independent evaluators (one per worker) merge by summing, and
//! [`Evaluator::finalize`] turns the sums into an [`EvaluationSummary`].

use burn::tensor::{backend::Backend, ElementConversion, Tensor};
use derive_new::new;
use serde::Serialize;

use crate::{
    error::{MetricError, MetricResult},
    pr_stat::PrStat,
    utils::guarded_ratio,
    EPSILON,
};

/// Upper bound on adaptive-threshold shrink steps before a map is declared
/// degenerate. Any map with a positive pixel settles within a handful.
pub const MAX_THRESHOLD_SHRINKS: usize = 64;

/// Divisor applied to the adaptive threshold while no pixel exceeds it.
pub const THRESHOLD_SHRINK_FACTOR: f64 = 1.2;

/// Scores of a single image at its adaptive threshold.
#[derive(new, Debug, Clone, PartialEq, Serialize)]
pub struct ImageScores {
    pub name: String,
    pub mae: f64,
    pub threshold: f64,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
}

/// An entry left out of the aggregate, with the reason.
#[derive(new, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub name: String,
    pub reason: String,
}

/// Mean precision, recall and F-measure per threshold bin.
///
/// `f_measure` bins where precision and recall are both zero are NaN.
#[derive(Debug, Clone, Serialize)]
pub struct PrCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub f_measure: Vec<f64>,
}

impl PrCurve {
    fn from_stat(stat: &PrStat, beta2: f64) -> MetricResult<Self> {
        Ok(Self {
            precision: stat.precision()?,
            recall: stat.recall()?,
            f_measure: stat.f_measure(beta2)?,
        })
    }

    /// Best F-measure over the bins with data, as `(bin, value)`.
    pub fn max_f_measure(&self) -> Option<(usize, f64)> {
        self.f_measure
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, f)| f.is_finite())
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
    }

    /// Mean F-measure over the bins with data.
    pub fn mean_f_measure(&self) -> Option<f64> {
        let finite: Vec<f64> = self
            .f_measure
            .iter()
            .copied()
            .filter(|f| f.is_finite())
            .collect();
        (!finite.is_empty()).then(|| finite.iter().sum::<f64>() / finite.len() as f64)
    }
}

/// Normalized dataset-wide metrics.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub mae: f64,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
    pub beta2: f64,
    pub image_count: u64,
    pub curve: PrCurve,
    pub skipped: Vec<SkippedEntry>,
}

/// Running sums over evaluated images.
#[derive(Debug, Clone)]
pub struct Evaluator {
    beta2: f64,
    mae_sum: f64,
    precision_sum: f64,
    recall_sum: f64,
    f_measure_sum: f64,
    image_count: u64,
    stat: PrStat,
    skipped: Vec<SkippedEntry>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(crate::DEFAULT_BETA2)
    }
}

impl Evaluator {
    /// Creates an empty evaluator for F-measures weighted by `beta2`.
    pub fn new(beta2: f64) -> Self {
        Self {
            beta2,
            mae_sum: 0.0,
            precision_sum: 0.0,
            recall_sum: 0.0,
            f_measure_sum: 0.0,
            image_count: 0,
            stat: PrStat::new(),
            skipped: Vec::new(),
        }
    }

    pub const fn beta2(&self) -> f64 {
        self.beta2
    }

    /// Number of images accumulated.
    pub const fn image_count(&self) -> u64 {
        self.image_count
    }

    pub const fn stat(&self) -> &PrStat {
        &self.stat
    }

    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    /// Records an entry that was left out of the aggregate.
    pub fn record_skip(&mut self, entry: SkippedEntry) {
        self.skipped.push(entry);
    }

    /// Evaluates one `[height, width]` saliency map against its ground truth.
    ///
    /// Nothing is accumulated when the map is rejected, so a failed image
    /// leaves the evaluator untouched.
    pub fn add_image<B: Backend>(
        &mut self,
        name: &str,
        saliency: Tensor<B, 2>,
        ground_truth: Tensor<B, 2>,
    ) -> MetricResult<ImageScores> {
        let expected = ground_truth.dims();
        let actual = saliency.dims();
        if expected != actual {
            return Err(MetricError::DimensionMismatch {
                name: name.to_owned(),
                expected,
                actual,
            });
        }

        let threshold =
            adaptive_threshold(saliency.clone()).ok_or_else(|| MetricError::DegenerateInput {
                name: name.to_owned(),
                iterations: MAX_THRESHOLD_SHRINKS,
            })?;

        let predicted = saliency.clone().greater_elem(threshold).int();
        let foreground = ground_truth.clone().greater_elem(0.5).int();

        let predicted_count = count(predicted.clone());
        let foreground_count = count(foreground.clone());
        let true_positives = count(predicted * foreground);

        let precision = guarded_ratio(true_positives, predicted_count);
        let recall = guarded_ratio(true_positives, foreground_count);
        let f_measure = (1.0 + self.beta2) * precision * recall
            / (self.beta2.mul_add(precision, recall) + EPSILON);

        let mae = mean_absolute_error(saliency.clone(), ground_truth.clone());

        self.stat
            .add_tensors(saliency, ground_truth)
            .map_err(|e| e.with_entry(name))?;

        self.mae_sum += mae;
        self.precision_sum += precision;
        self.recall_sum += recall;
        self.f_measure_sum += f_measure;
        self.image_count += 1;

        Ok(ImageScores::new(
            name.to_owned(),
            mae,
            threshold,
            precision,
            recall,
            f_measure,
        ))
    }

    /// Combines two partial evaluators.
    pub fn merge(mut self, other: Self) -> Self {
        debug_assert!(
            self.beta2 == other.beta2,
            "merging evaluators with different beta2"
        );
        self.mae_sum += other.mae_sum;
        self.precision_sum += other.precision_sum;
        self.recall_sum += other.recall_sum;
        self.f_measure_sum += other.f_measure_sum;
        self.image_count += other.image_count;
        self.stat.merge(&other.stat);
        self.skipped.extend(other.skipped);
        self
    }

    /// Divides every running sum by the image count.
    pub fn finalize(mut self) -> MetricResult<EvaluationSummary> {
        if self.image_count == 0 {
            return Err(MetricError::EmptyDataset);
        }
        let count = self.image_count as f64;
        let curve = PrCurve::from_stat(&self.stat, self.beta2)?;
        self.skipped.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(EvaluationSummary {
            mae: self.mae_sum / count,
            precision: self.precision_sum / count,
            recall: self.recall_sum / count,
            f_measure: self.f_measure_sum / count,
            beta2: self.beta2,
            image_count: self.image_count,
            curve,
            skipped: self.skipped,
        })
    }
}

/// Finds the adaptive threshold of a saliency map.
///
/// Starts at twice the mean score and divides by
/// [`THRESHOLD_SHRINK_FACTOR`] while no pixel is strictly above it. Returns
/// `None` when no threshold within [`MAX_THRESHOLD_SHRINKS`] steps selects a
/// pixel, which is the case for all-zero (or NaN) maps.
pub fn adaptive_threshold<B: Backend, const D: usize>(saliency: Tensor<B, D>) -> Option<f64> {
    let mut threshold = 2.0 * saliency.clone().mean().into_scalar().elem::<f64>();

    for _ in 0..=MAX_THRESHOLD_SHRINKS {
        if count(saliency.clone().greater_elem(threshold).int()) > 0.0 {
            return Some(threshold);
        }
        threshold /= THRESHOLD_SHRINK_FACTOR;
    }

    None
}

/// Mean absolute pixel-wise difference between two maps of the same shape.
pub fn mean_absolute_error<B: Backend, const D: usize>(
    saliency: Tensor<B, D>,
    ground_truth: Tensor<B, D>,
) -> f64 {
    (saliency - ground_truth)
        .abs()
        .mean()
        .into_scalar()
        .elem::<f64>()
}

fn count<B: Backend, const D: usize>(mask: Tensor<B, D, burn::tensor::Int>) -> f64 {
    mask.sum().into_scalar().elem::<f64>()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use burn::tensor::{Tensor, TensorData};
    use rstest::rstest;

    use super::*;
    use crate::{tests::TestBackend, N_BINS};

    fn map(values: [[f32; 2]; 2]) -> Tensor<TestBackend, 2> {
        Tensor::from_data(values, &Default::default())
    }

    fn grid(values: Vec<f32>, shape: [usize; 2]) -> Tensor<TestBackend, 2> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    fn top_row_truth() -> Tensor<TestBackend, 2> {
        map([[1.0, 1.0], [0.0, 0.0]])
    }

    /// A few varied maps with their ground truths.
    fn sample_images() -> Vec<(String, Vec<f32>, Vec<f32>)> {
        (0..8)
            .map(|k| {
                let saliency: Vec<f32> = (0..36)
                    .map(|i| ((i * (k + 3) + k) % 17) as f32 / 16.0)
                    .collect();
                let ground_truth: Vec<f32> = (0..36)
                    .map(|i| if (i + k) % 5 < 2 { 1.0 } else { 0.0 })
                    .collect();
                (format!("img{k}"), saliency, ground_truth)
            })
            .collect()
    }

    fn evaluate_all(images: &[(String, Vec<f32>, Vec<f32>)]) -> Evaluator {
        let mut evaluator = Evaluator::default();
        for (name, s, g) in images {
            evaluator
                .add_image(name, grid(s.clone(), [6, 6]), grid(g.clone(), [6, 6]))
                .unwrap();
        }
        evaluator
    }

    fn assert_summaries_close(a: &EvaluationSummary, b: &EvaluationSummary) {
        assert_eq!(a.image_count, b.image_count);
        assert_relative_eq!(a.mae, b.mae, epsilon = 1e-12);
        assert_relative_eq!(a.precision, b.precision, epsilon = 1e-12);
        assert_relative_eq!(a.recall, b.recall, epsilon = 1e-12);
        assert_relative_eq!(a.f_measure, b.f_measure, epsilon = 1e-12);
        for bin in 0..N_BINS {
            assert_relative_eq!(a.curve.precision[bin], b.curve.precision[bin], epsilon = 1e-12);
            assert_relative_eq!(a.curve.recall[bin], b.curve.recall[bin], epsilon = 1e-12);
        }
    }

    #[test]
    fn perfect_map_scores_one() {
        let mut evaluator = Evaluator::default();
        let scores = evaluator
            .add_image("perfect", map([[1.0, 1.0], [0.0, 0.0]]), top_row_truth())
            .unwrap();

        assert_relative_eq!(scores.mae, 0.0);
        assert_relative_eq!(scores.precision, 1.0, epsilon = 1e-9);
        assert_relative_eq!(scores.recall, 1.0, epsilon = 1e-9);
        assert_relative_eq!(scores.f_measure, 1.0, epsilon = 1e-9);

        let summary = evaluator.finalize().unwrap();
        assert_eq!(summary.image_count, 1);
        assert_relative_eq!(summary.f_measure, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn inverted_map_scores_zero_without_nan() {
        let mut evaluator = Evaluator::default();
        let scores = evaluator
            .add_image("inverted", map([[0.0, 0.0], [1.0, 1.0]]), top_row_truth())
            .unwrap();

        assert_relative_eq!(scores.mae, 1.0);
        assert_eq!(scores.precision, 0.0);
        assert_eq!(scores.recall, 0.0);
        assert!(scores.f_measure.is_finite());
        assert_relative_eq!(scores.f_measure, 0.0);
        // 2 * mean = 1.0 selects nothing, one shrink step does
        assert_relative_eq!(scores.threshold, 1.0 / THRESHOLD_SHRINK_FACTOR, epsilon = 1e-6);
    }

    #[test]
    fn all_zero_map_is_degenerate_and_leaves_no_trace() {
        let mut evaluator = Evaluator::default();
        let err = evaluator
            .add_image("blank", map([[0.0, 0.0], [0.0, 0.0]]), top_row_truth())
            .unwrap_err();

        match err {
            MetricError::DegenerateInput { name, iterations } => {
                assert_eq!(name, "blank");
                assert_eq!(iterations, MAX_THRESHOLD_SHRINKS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(evaluator.image_count(), 0);
        assert_eq!(evaluator.stat().sample_count(), 0);
    }

    #[test]
    fn shape_mismatch_names_the_entry() {
        let mut evaluator = Evaluator::default();
        let err = evaluator
            .add_image("odd", grid(vec![0.5; 6], [2, 3]), top_row_truth())
            .unwrap_err();
        assert!(matches!(
            err,
            MetricError::DimensionMismatch { ref name, expected: [2, 2], actual: [2, 3] } if name == "odd"
        ));
        assert_eq!(err.entry_name(), Some("odd"));
    }

    #[rstest]
    #[case(vec![0.9, 0.1, 0.0, 0.0])]
    #[case(vec![0.001, 0.0, 0.0, 0.0])]
    #[case(vec![0.5, 0.5, 0.5, 0.5])]
    #[case(vec![1.0, 1.0, 1.0, 1.0])]
    #[case(vec![0.2, 0.4, 0.6, 0.8])]
    fn adaptive_threshold_selects_some_pixel(#[case] values: Vec<f32>) {
        let saliency = grid(values.clone(), [2, 2]);
        let threshold = adaptive_threshold(saliency).unwrap();
        assert!(values.iter().any(|&v| f64::from(v) > threshold));
    }

    #[test]
    fn adaptive_threshold_of_zero_map_is_none() {
        assert!(adaptive_threshold(grid(vec![0.0; 9], [3, 3])).is_none());
    }

    #[test]
    fn adaptive_threshold_starts_at_twice_the_mean() {
        // mean 0.125, 2 * mean = 0.25 and the 0.5 pixel is above it
        let threshold = adaptive_threshold(grid(vec![0.5, 0.0, 0.0, 0.0], [2, 2])).unwrap();
        assert_relative_eq!(threshold, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn mae_is_symmetric_and_non_negative() {
        let a = map([[0.1, 0.9], [0.4, 0.0]]);
        let b = map([[1.0, 0.0], [0.5, 0.0]]);
        let ab = mean_absolute_error(a.clone(), b.clone());
        let ba = mean_absolute_error(b, a);
        assert_relative_eq!(ab, ba, epsilon = 1e-7);
        assert!(ab > 0.0);
        assert_relative_eq!(ab, (0.9 + 0.9 + 0.1 + 0.0) / 4.0, epsilon = 1e-6);
    }

    #[test]
    fn mae_of_identical_maps_is_zero() {
        let a = map([[0.3, 0.7], [0.2, 1.0]]);
        assert_eq!(mean_absolute_error(a.clone(), a), 0.0);
    }

    #[test]
    fn empty_evaluator_refuses_to_finalize() {
        assert!(matches!(
            Evaluator::default().finalize(),
            Err(MetricError::EmptyDataset)
        ));
    }

    #[test]
    fn identical_images_give_single_image_metrics() {
        let images = sample_images();
        let one = evaluate_all(&images[..1]).finalize().unwrap();

        let repeated: Vec<_> = std::iter::repeat(images[0].clone()).take(4).collect();
        let many = evaluate_all(&repeated).finalize().unwrap();

        assert_eq!(many.image_count, 4);
        assert_relative_eq!(one.mae, many.mae, epsilon = 1e-12);
        assert_relative_eq!(one.f_measure, many.f_measure, epsilon = 1e-12);
        for bin in 0..N_BINS {
            assert_relative_eq!(one.curve.precision[bin], many.curve.precision[bin], epsilon = 1e-12);
            assert_relative_eq!(one.curve.recall[bin], many.curve.recall[bin], epsilon = 1e-12);
        }
    }

    #[test]
    fn merged_halves_match_full_pass() {
        let images = sample_images();
        let full = evaluate_all(&images).finalize().unwrap();

        let (first, second) = images.split_at(3);
        let merged = evaluate_all(first)
            .merge(evaluate_all(second))
            .finalize()
            .unwrap();
        let swapped = evaluate_all(second)
            .merge(evaluate_all(first))
            .finalize()
            .unwrap();

        assert_summaries_close(&full, &merged);
        assert_summaries_close(&full, &swapped);
    }

    #[test]
    fn merge_with_empty_evaluator_is_identity() {
        let images = sample_images();
        let alone = evaluate_all(&images).finalize().unwrap();
        let merged = Evaluator::default()
            .merge(evaluate_all(&images))
            .merge(Evaluator::default())
            .finalize()
            .unwrap();
        assert_summaries_close(&alone, &merged);
    }

    #[test]
    fn skipped_entries_survive_merge_sorted() {
        let images = sample_images();
        let mut a = evaluate_all(&images[..2]);
        a.record_skip(SkippedEntry::new("zeta".to_owned(), "blank".to_owned()));
        let mut b = Evaluator::default();
        b.record_skip(SkippedEntry::new("alpha".to_owned(), "missing".to_owned()));

        let summary = b.merge(a).finalize().unwrap();
        let names: Vec<_> = summary.skipped.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);
        assert_eq!(summary.image_count, 2);
    }

    #[test]
    fn curve_max_f_measure_ignores_nan_bins() {
        let curve = PrCurve {
            precision: vec![0.5, 1.0, 0.0],
            recall: vec![1.0, 0.5, 0.0],
            f_measure: vec![0.4, 0.7, f64::NAN],
        };
        assert_eq!(curve.max_f_measure(), Some((1, 0.7)));
        assert_relative_eq!(curve.mean_f_measure().unwrap(), 0.55, epsilon = 1e-12);
    }
}
