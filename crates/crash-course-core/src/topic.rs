use polars::prelude::PlSmallStr;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A syllabus topic together with the raw signals used to weigh it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i32,
    pub name: String,
    /// Reference to the uploaded document (file name or storage key) the topic came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document: Option<String>,
    /// Number of previous-year questions touching this topic.
    #[serde(default)]
    pub frequency_count: i64,
    /// Marks value the topic carries in the exam pattern.
    #[serde(default)]
    pub marks_weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_asked_year: Option<i32>,
    /// Topics that should be studied before this one.
    #[serde(default)]
    pub prerequisites: Vec<i32>,
    /// Normalized priority in `[0, 1]`, filled in by a refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<f64>,
}

impl Topic {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            source_document: None,
            frequency_count: 0,
            marks_weight: 0.0,
            last_asked_year: None,
            prerequisites: Vec::new(),
            priority_score: None,
        }
    }

    pub fn with_signals(
        id: i32,
        name: impl Into<String>,
        frequency_count: i64,
        marks_weight: f64,
        last_asked_year: Option<i32>,
    ) -> Self {
        let mut topic = Self::new(id, name);
        topic.frequency_count = frequency_count;
        topic.marks_weight = marks_weight;
        topic.last_asked_year = last_asked_year;
        topic
    }

    pub fn priority_tier(&self) -> Option<PriorityTier> {
        self.priority_score.map(PriorityTier::from_score)
    }

    pub fn to_dataframe_row(&self) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(8);

        let id_data: [i32; 1] = [self.id];
        columns.push(Series::new(PlSmallStr::from_static("id"), id_data).into_column());

        let name_data: [&str; 1] = [self.name.as_str()];
        columns.push(Series::new(PlSmallStr::from_static("name"), name_data).into_column());

        let source: [Option<&str>; 1] = [self.source_document.as_deref()];
        columns.push(
            Series::new(PlSmallStr::from_static("source_document"), source).into_column(),
        );

        let frequency: [i64; 1] = [self.frequency_count];
        columns.push(
            Series::new(PlSmallStr::from_static("frequency_count"), frequency).into_column(),
        );

        let marks: [f64; 1] = [self.marks_weight];
        columns.push(Series::new(PlSmallStr::from_static("marks_weight"), marks).into_column());

        let last_asked: [Option<i32>; 1] = [self.last_asked_year];
        columns.push(
            Series::new(PlSmallStr::from_static("last_asked_year"), last_asked).into_column(),
        );

        columns.push(
            Self::series_from_i32_list("prerequisites", &self.prerequisites).into_column(),
        );

        let priority: [Option<f64>; 1] = [self.priority_score];
        columns.push(
            Series::new(PlSmallStr::from_static("priority_score"), priority).into_column(),
        );

        DataFrame::new(columns)
    }

    pub fn from_dataframe_row(df: &DataFrame, row_idx: usize) -> PolarsResult<Self> {
        let id = df
            .column("id")?
            .i32()?
            .get(row_idx)
            .ok_or_else(|| PolarsError::ComputeError("topic row missing id".into()))?;

        let name = df
            .column("name")?
            .str()?
            .get(row_idx)
            .unwrap_or("")
            .to_string();

        let prerequisites = Self::vec_from_i32_list(df.column("prerequisites")?.list()?, row_idx)?;

        Ok(Self {
            id,
            name,
            source_document: df
                .column("source_document")?
                .str()?
                .get(row_idx)
                .map(ToOwned::to_owned),
            frequency_count: df
                .column("frequency_count")?
                .i64()?
                .get(row_idx)
                .unwrap_or(0),
            marks_weight: df
                .column("marks_weight")?
                .f64()?
                .get(row_idx)
                .unwrap_or(0.0),
            last_asked_year: df.column("last_asked_year")?.i32()?.get(row_idx),
            prerequisites,
            priority_score: df.column("priority_score")?.f64()?.get(row_idx),
        })
    }

    fn series_from_i32_list(name: &str, values: &[i32]) -> Series {
        let inner = Series::new(PlSmallStr::from_static(""), values.to_vec());
        Series::new(name.into(), &[inner])
    }

    fn vec_from_i32_list(list: &ListChunked, row_idx: usize) -> PolarsResult<Vec<i32>> {
        if let Some(series) = list.get_as_series(row_idx) {
            Ok(series.i32()?.into_iter().flatten().collect::<Vec<_>>())
        } else {
            Ok(Vec::new())
        }
    }
}

/// Coarse bucket of a priority score used in reasoning strings and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    High,
    Medium,
    Low,
}

impl PriorityTier {
    pub const HIGH_THRESHOLD: f64 = 0.66;
    pub const MEDIUM_THRESHOLD: f64 = 0.33;

    pub fn from_score(score: f64) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            PriorityTier::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            PriorityTier::Medium
        } else {
            PriorityTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::High => "high",
            PriorityTier::Medium => "medium",
            PriorityTier::Low => "low",
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_thresholds() {
        assert_eq!(PriorityTier::from_score(1.0), PriorityTier::High);
        assert_eq!(PriorityTier::from_score(0.66), PriorityTier::High);
        assert_eq!(PriorityTier::from_score(0.5), PriorityTier::Medium);
        assert_eq!(PriorityTier::from_score(0.1), PriorityTier::Low);
    }

    #[test]
    fn dataframe_row_round_trip() {
        let mut topic = Topic::with_signals(3, "Thermodynamics", 7, 12.5, Some(2023));
        topic.source_document = Some("physics-syllabus.pdf".into());
        topic.prerequisites = vec![1, 2];
        topic.priority_score = Some(0.75);

        let df = topic.to_dataframe_row().unwrap();
        let back = Topic::from_dataframe_row(&df, 0).unwrap();
        assert_eq!(back, topic);
    }
}
