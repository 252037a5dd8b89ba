//! Input and output types shared across the report pipeline.
//!
//! A [`ReportRequest`] pairs the forecast series with its metadata; the
//! flattener and table export work with [`TableRow`]s.

use crate::error::{ReportError, Result};
use polars::prelude::{DataFrame, DataType};
use serde::{Deserialize, Deserializer, Serialize};

/// Ordered forecast values with optional confidence bounds.
///
/// Produced by the external forecasting collaborator and never mutated by
/// this crate. Missing predictions (`null` in JSON) are carried as `NaN` so
/// they can be skipped by the analyzer without shifting period alignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub period: Vec<String>,
    #[serde(deserialize_with = "nullable_floats")]
    pub predicted: Vec<f64>,
    #[serde(
        default,
        alias = "lowerBound",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_nullable_floats"
    )]
    pub lower_bound: Option<Vec<f64>>,
    #[serde(
        default,
        alias = "upperBound",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_nullable_floats"
    )]
    pub upper_bound: Option<Vec<f64>>,
}

impl ForecastSeries {
    pub fn new(period: Vec<String>, predicted: Vec<f64>) -> Self {
        Self {
            period,
            predicted,
            lower_bound: None,
            upper_bound: None,
        }
    }

    /// Convenience constructor labelling periods `P1..Pn`.
    pub fn from_values(predicted: &[f64]) -> Self {
        let period = (1..=predicted.len()).map(|i| format!("P{}", i)).collect();
        Self::new(period, predicted.to_vec())
    }

    pub fn with_bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        self.lower_bound = Some(lower);
        self.upper_bound = Some(upper);
        self
    }

    pub fn len(&self) -> usize {
        self.predicted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicted.is_empty()
    }

    pub fn has_bounds(&self) -> bool {
        self.lower_bound.is_some() && self.upper_bound.is_some()
    }

    /// Check structural consistency.
    ///
    /// Length mismatches and inverted bounds are the one class of input
    /// problem with no safe degradation, so they are reported as errors.
    pub fn validate(&self) -> Result<()> {
        let expected = self.predicted.len();
        if self.period.len() != expected {
            return Err(ReportError::MismatchedSeries {
                field: "period".to_string(),
                expected,
                actual: self.period.len(),
            });
        }

        for (field, bound) in [
            ("lower_bound", &self.lower_bound),
            ("upper_bound", &self.upper_bound),
        ] {
            if let Some(values) = bound
                && values.len() != expected
            {
                return Err(ReportError::MismatchedSeries {
                    field: field.to_string(),
                    expected,
                    actual: values.len(),
                });
            }
        }

        if let (Some(lower), Some(upper)) = (&self.lower_bound, &self.upper_bound) {
            for (i, ((lo, hi), p)) in lower.iter().zip(upper).zip(&self.predicted).enumerate() {
                if lo.is_nan() || hi.is_nan() || p.is_nan() {
                    continue;
                }
                if lo > p || p > hi {
                    return Err(ReportError::InvalidInput(format!(
                        "bounds at period '{}' are not ordered (lower {} <= predicted {} <= upper {})",
                        self.period[i], lo, p, hi
                    )));
                }
            }
        }

        Ok(())
    }
}

impl ForecastSeries {
    /// Build a series from a frame with `period` and `predicted` columns and
    /// optional `lower_bound`/`upper_bound` columns. Nulls become `NaN`.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let period_column = df.column("period")?.cast(&DataType::String)?;
        let period = period_column
            .str()?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect();

        Ok(Self {
            period,
            predicted: float_column(df, "predicted")?,
            lower_bound: optional_float_column(df, "lower_bound")?,
            upper_bound: optional_float_column(df, "upper_bound")?,
        })
    }
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn optional_float_column(df: &DataFrame, name: &str) -> Result<Option<Vec<f64>>> {
    if df.get_column_names().iter().any(|c| c.as_str() == name) {
        float_column(df, name).map(Some)
    } else {
        Ok(None)
    }
}

fn nullable_floats<'de, D>(deserializer: D) -> std::result::Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn optional_nullable_floats<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<f64>>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|values| values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()))
}

/// Metadata accompanying a forecast series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    #[serde(alias = "targetVariable")]
    pub target_variable: String,
    #[serde(default)]
    pub scenario: String,
    #[serde(default, alias = "modelId")]
    pub model_id: String,
    #[serde(alias = "confidenceLevel")]
    pub confidence_level: f64,
    #[serde(default, alias = "preparedFor")]
    pub prepared_for: String,
}

impl Default for ReportMetadata {
    fn default() -> Self {
        Self {
            target_variable: "forecast".to_string(),
            scenario: String::new(),
            model_id: String::new(),
            confidence_level: 0.95,
            prepared_for: String::new(),
        }
    }
}

impl ReportMetadata {
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ReportError::InvalidInput(format!(
                "confidence level must lie in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if self.target_variable.trim().is_empty() {
            return Err(ReportError::InvalidInput(
                "target variable name is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Kind of document being produced; drives the artifact file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    #[default]
    Forecast,
    Analysis,
}

impl ReportKind {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Forecast => "forecast-report",
            Self::Analysis => "analysis-report",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Forecast => "Forecast Report",
            Self::Analysis => "Forecast Analysis Report",
        }
    }
}

/// Everything a single document build needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub series: ForecastSeries,
    pub metadata: ReportMetadata,
    #[serde(default)]
    pub kind: ReportKind,
}

impl ReportRequest {
    pub fn new(series: ForecastSeries, metadata: ReportMetadata) -> Self {
        Self {
            series,
            metadata,
            kind: ReportKind::default(),
        }
    }

    pub fn with_kind(mut self, kind: ReportKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.series.validate()?;
        self.metadata.validate()
    }
}

/// A flattened, display-safe table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub group: String,
    pub field: String,
    pub value: String,
}

impl TableRow {
    pub fn new(group: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            field: field.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_consistent_series() {
        let series = ForecastSeries::from_values(&[1.0, 2.0, 3.0])
            .with_bounds(vec![0.5, 1.5, 2.5], vec![1.5, 2.5, 3.5]);
        assert!(series.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_period_mismatch() {
        let series = ForecastSeries::new(vec!["a".to_string()], vec![1.0, 2.0]);
        let err = series.validate().unwrap_err();
        assert_eq!(err.error_code(), "MISMATCHED_SERIES");
    }

    #[test]
    fn test_validate_rejects_bound_mismatch() {
        let series = ForecastSeries::from_values(&[1.0, 2.0]).with_bounds(vec![0.0], vec![3.0, 3.0]);
        let err = series.validate().unwrap_err();
        assert!(matches!(err, ReportError::MismatchedSeries { ref field, .. } if field == "lower_bound"));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let series = ForecastSeries::from_values(&[5.0]).with_bounds(vec![6.0], vec![7.0]);
        assert!(matches!(series.validate(), Err(ReportError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_series_is_valid() {
        assert!(ForecastSeries::default().validate().is_ok());
    }

    #[test]
    fn test_deserialize_nulls_and_camel_case_bounds() {
        let json = r#"{
            "period": ["Jan", "Feb"],
            "predicted": [1.0, null],
            "lowerBound": [0.5, null],
            "upperBound": [1.5, null]
        }"#;
        let series: ForecastSeries = serde_json::from_str(json).unwrap();
        assert!(series.predicted[1].is_nan());
        assert!(series.has_bounds());
        assert!(series.validate().is_ok());
    }

    #[test]
    fn test_from_frame_reads_optional_bounds() {
        let df = polars::df!(
            "period" => ["2026-01", "2026-02"],
            "predicted" => [Some(10.0), None],
            "lower_bound" => [8.0, 9.0]
        )
        .unwrap();
        let series = ForecastSeries::from_frame(&df).unwrap();
        assert_eq!(series.period, vec!["2026-01", "2026-02"]);
        assert!(series.predicted[1].is_nan());
        assert_eq!(series.lower_bound, Some(vec![8.0, 9.0]));
        assert!(series.upper_bound.is_none());
    }

    #[test]
    fn test_from_frame_requires_predicted() {
        let df = polars::df!("period" => ["a"]).unwrap();
        assert_eq!(ForecastSeries::from_frame(&df).unwrap_err().error_code(), "POLARS_ERROR");
    }

    #[test]
    fn test_metadata_confidence_level_bounds() {
        let mut meta = ReportMetadata::default();
        assert!(meta.validate().is_ok());
        meta.confidence_level = 1.0;
        assert!(meta.validate().is_err());
        meta.confidence_level = 0.0;
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_report_kind_slug() {
        assert_eq!(ReportKind::Forecast.slug(), "forecast-report");
        assert_eq!(
            serde_json::to_string(&ReportKind::Analysis).unwrap(),
            "\"analysis\""
        );
    }
}
