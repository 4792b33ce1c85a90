//! Report rendering: console text, JSON and the precision-recall curve as CSV.

use std::{
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use saleval_metric::{bin_threshold, EvaluationSummary, PrCurve};
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Best point of the F-measure curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub bin: usize,
    pub threshold: f64,
    pub f_measure: f64,
}

/// Outcome of one evaluation run, ready to be printed or exported.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub backend: String,
    pub max_f_measure: Option<CurvePoint>,
    pub mean_f_measure: Option<f64>,
    #[serde(flatten)]
    pub summary: EvaluationSummary,
}

#[derive(Serialize)]
struct CurveRow {
    threshold: f64,
    precision: f64,
    recall: f64,
    f_measure: f64,
}

impl EvaluationReport {
    pub fn new(backend: impl Into<String>, summary: EvaluationSummary) -> Self {
        let max_f_measure = summary
            .curve
            .max_f_measure()
            .map(|(bin, f_measure)| CurvePoint {
                bin,
                threshold: bin_threshold(bin),
                f_measure,
            });
        let mean_f_measure = summary.curve.mean_f_measure();
        Self {
            backend: backend.into(),
            max_f_measure,
            mean_f_measure,
            summary,
        }
    }

    /// Pretty JSON; curve bins without data become `null`.
    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> AppResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| AppError::ReportWrite {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "JSON report written");
        Ok(())
    }

    pub fn write_curve_csv(&self, path: &Path) -> AppResult<()> {
        let file = File::create(path).map_err(|source| AppError::ReportWrite {
            path: path.to_path_buf(),
            source,
        })?;
        write_curve(&self.summary.curve, BufWriter::new(file))?;
        tracing::info!(path = %path.display(), "precision-recall curve written");
        Ok(())
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = &self.summary;
        writeln!(
            f,
            "Evaluated {} images on {} (beta2 = {})",
            summary.image_count, self.backend, summary.beta2
        )?;
        writeln!(f, "MAE = {:.6}", summary.mae)?;
        writeln!(
            f,
            "p = {:.6}  r = {:.6}  f = {:.6}",
            summary.precision, summary.recall, summary.f_measure
        )?;
        match self.max_f_measure {
            Some(point) => writeln!(
                f,
                "max F = {:.6} at threshold {:.4}",
                point.f_measure, point.threshold
            )?,
            None => writeln!(f, "max F = n/a")?,
        }
        if !summary.skipped.is_empty() {
            writeln!(f, "Skipped {} entries:", summary.skipped.len())?;
            for entry in &summary.skipped {
                writeln!(f, "  {}: {}", entry.name, entry.reason)?;
            }
        }
        Ok(())
    }
}

/// Writes the curve as `threshold,precision,recall,f_measure`, one row per bin.
pub fn write_curve<W: Write>(curve: &PrCurve, writer: W) -> AppResult<()> {
    let mut rows = csv::Writer::from_writer(writer);
    for (bin, ((&precision, &recall), &f_measure)) in curve
        .precision
        .iter()
        .zip(&curve.recall)
        .zip(&curve.f_measure)
        .enumerate()
    {
        rows.serialize(CurveRow {
            threshold: bin_threshold(bin),
            precision,
            recall,
            f_measure,
        })?;
    }
    rows.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use saleval_metric::{SkippedEntry, N_BINS};
    use tempfile::TempDir;

    use super::*;

    fn summary() -> EvaluationSummary {
        let precision: Vec<f64> = (0..N_BINS).map(|b| 0.5 + b as f64 / 1024.0).collect();
        let recall: Vec<f64> = (0..N_BINS).map(|b| 1.0 - b as f64 / 255.0).collect();
        let mut f_measure: Vec<f64> = precision
            .iter()
            .zip(&recall)
            .map(|(p, r)| 1.3 * p * r / (0.3 * p + r))
            .collect();
        f_measure[N_BINS - 1] = f64::NAN;

        EvaluationSummary {
            mae: 0.125,
            precision: 0.75,
            recall: 0.5,
            f_measure: 0.6818,
            beta2: 0.3,
            image_count: 4,
            curve: PrCurve {
                precision,
                recall,
                f_measure,
            },
            skipped: vec![SkippedEntry::new(
                "broken".to_owned(),
                "Failed to load entry 'broken'".to_owned(),
            )],
        }
    }

    #[test]
    fn text_report_has_the_classic_lines() {
        let text = EvaluationReport::new("NdArray (CPU)", summary()).to_string();
        assert!(text.contains("Evaluated 4 images on NdArray (CPU)"));
        assert!(text.contains("MAE = 0.125000\n"));
        assert!(text.contains("p = 0.750000  r = 0.500000  f = 0.681800\n"));
        assert!(text.contains("max F = "));
        assert!(text.contains("  broken: Failed to load entry 'broken'"));
    }

    #[test]
    fn max_f_measure_skips_nan_bin() {
        let report = EvaluationReport::new("cpu", summary());
        let point = report.max_f_measure.unwrap();
        assert!(point.bin < N_BINS - 1);
        assert!(point.f_measure.is_finite());
        assert_eq!(point.threshold, bin_threshold(point.bin));
    }

    #[test]
    fn json_maps_nan_to_null() {
        let json = EvaluationReport::new("cpu", summary()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["image_count"], 4);
        assert_eq!(value["backend"], "cpu");
        let f = value["curve"]["f_measure"].as_array().unwrap();
        assert_eq!(f.len(), N_BINS);
        assert!(f[N_BINS - 1].is_null());
        assert!(f[0].is_number());
        assert_eq!(value["skipped"][0]["name"], "broken");
    }

    #[test]
    fn curve_csv_has_one_row_per_bin() {
        let mut buffer = Vec::new();
        write_curve(&summary().curve, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "threshold,precision,recall,f_measure");
        assert_eq!(lines.len(), N_BINS + 1);
        assert!(lines[1].starts_with("0.0,0.5,1.0,"));
        assert!(lines[N_BINS].starts_with("1.0,"));
    }

    #[test]
    fn report_files_are_written() {
        let dir = TempDir::new().unwrap();
        let report = EvaluationReport::new("cpu", summary());
        let json = dir.path().join("report.json");
        let csv = dir.path().join("curve.csv");

        report.write_json(&json).unwrap();
        report.write_curve_csv(&csv).unwrap();

        assert!(std::fs::read_to_string(json).unwrap().contains("\"mae\""));
        assert_eq!(std::fs::read_to_string(csv).unwrap().lines().count(), N_BINS + 1);
    }

    #[test]
    fn unwritable_report_path_is_reported() {
        let report = EvaluationReport::new("cpu", summary());
        let err = report
            .write_json(Path::new("/nonexistent-dir/report.json"))
            .unwrap_err();
        assert!(matches!(err, AppError::ReportWrite { .. }));
    }
}
