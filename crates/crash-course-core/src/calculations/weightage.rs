use crate::config::WeightageConfig;
use polars::prelude::PlSmallStr;
use polars::prelude::*;
use std::collections::HashMap;

const RECENCY: &str = "recency";

/// Turns raw topic signals into a priority score in `[0, 1]`.
///
/// Each signal (PYQ frequency, marks, recency) is min-max normalized across the
/// topic table and the normalized values are blended by the configured weights.
pub struct WeightageNormalizer<'a> {
    df: &'a DataFrame,
    config: &'a WeightageConfig,
    reference_year: i32,
}

impl<'a> WeightageNormalizer<'a> {
    pub fn new(df: &'a DataFrame, config: &'a WeightageConfig, reference_year: i32) -> Self {
        Self {
            df,
            config,
            reference_year,
        }
    }

    pub fn execute(&self) -> Result<HashMap<i32, f64>, PolarsError> {
        if self.df.height() == 0 {
            return Ok(HashMap::new());
        }
        let total = self.config.total();
        if !total.is_finite() || total <= 0.0 {
            return Err(PolarsError::ComputeError(
                "weightage weights must sum to a positive value".into(),
            ));
        }

        let recency: Vec<f64> = self
            .df
            .column("last_asked_year")?
            .i32()?
            .into_iter()
            .map(|year| recency_signal(year, self.reference_year))
            .collect();

        let mut frame = self.df.select(["id", "frequency_count", "marks_weight"])?;
        frame.with_column(Series::new(PlSmallStr::from_static(RECENCY), recency))?;

        let scored = frame
            .clone()
            .lazy()
            .with_columns([
                min_max(&frame, "frequency_count", "frequency_norm")?,
                min_max(&frame, "marks_weight", "marks_norm")?,
                min_max(&frame, RECENCY, "recency_norm")?,
            ])
            .with_column(
                ((col("frequency_norm") * lit(self.config.frequency_weight)
                    + col("marks_norm") * lit(self.config.marks_weight)
                    + col("recency_norm") * lit(self.config.recency_weight))
                    / lit(total))
                .alias("priority"),
            )
            .select([col("id"), col("priority")])
            .collect()?;

        let ids = scored.column("id")?.i32()?;
        let priorities = scored.column("priority")?.f64()?;
        let mut results = HashMap::with_capacity(scored.height());
        for (id, priority) in ids.into_iter().zip(priorities.into_iter()) {
            if let (Some(id), Some(priority)) = (id, priority) {
                results.insert(id, round_score(priority.clamp(0.0, 1.0)));
            }
        }
        Ok(results)
    }
}

/// `1 / (1 + years since last asked)`; zero for topics never asked.
pub fn recency_signal(last_asked_year: Option<i32>, reference_year: i32) -> f64 {
    match last_asked_year {
        Some(year) => {
            let age = reference_year.saturating_sub(year).max(0);
            1.0 / (1.0 + f64::from(age))
        }
        None => 0.0,
    }
}

fn round_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

// A constant column normalizes to 1 when positive, 0 otherwise.
fn min_max(frame: &DataFrame, column: &str, alias: &str) -> PolarsResult<Expr> {
    let values = frame.column(column)?.cast(&DataType::Float64)?;
    let values = values.f64()?;
    let low = values.min().unwrap_or(0.0);
    let high = values.max().unwrap_or(0.0);
    let value = col(column).cast(DataType::Float64);
    let expr = if high > low {
        (value - lit(low)) / lit(high - low)
    } else if low > 0.0 {
        value * lit(0.0) + lit(1.0)
    } else {
        value * lit(0.0)
    };
    Ok(expr.alias(alias))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recency_decays_with_age() {
        assert_eq!(recency_signal(Some(2025), 2025), 1.0);
        assert_eq!(recency_signal(Some(2024), 2025), 0.5);
        assert_eq!(recency_signal(Some(2030), 2025), 1.0);
        assert_eq!(recency_signal(None, 2025), 0.0);
    }

    #[test]
    fn recency_saturates_for_extreme_years() {
        let ancient = recency_signal(Some(i32::MIN), 2025);
        assert!(ancient > 0.0 && ancient < 1e-9);
        assert_eq!(recency_signal(Some(i32::MAX), 2025), 1.0);
    }

    #[test]
    fn round_score_keeps_four_places() {
        assert_eq!(round_score(0.123456), 0.1235);
    }
}
