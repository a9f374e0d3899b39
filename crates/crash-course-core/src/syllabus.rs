use crate::calculations::weightage::WeightageNormalizer;
use crate::calendar::{CalendarError, StudyCalendar, StudyCalendarConfig};
use crate::config::{ConfigError, PlannerConfig, WeightageConfig};
use crate::generator::CrashCourseGenerator;
use crate::metadata::PlanMetadata;
use crate::plan::{CrashCoursePlan, PlanError};
use crate::topic::{PriorityTier, Topic};
use crate::topic_validation::{self, TopicValidationError};
use chrono::{Datelike, NaiveDate};
use polars::prelude::PlSmallStr;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

const TOP_TOPICS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub topic_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub reference_year: i32,
    pub top_topics: Vec<i32>,
}

impl RefreshSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("topics={}", self.topic_count));
        if self.high_count > 0 {
            parts.push(format!("high={}", self.high_count));
        }
        if self.medium_count > 0 {
            parts.push(format!("medium={}", self.medium_count));
        }
        if self.low_count > 0 {
            parts.push(format!("low={}", self.low_count));
        }
        parts.push(format!("year={}", self.reference_year));
        if !self.top_topics.is_empty() {
            let chain = self
                .top_topics
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(">");
            parts.push(format!("top={}", chain));
        }
        parts.join(", ")
    }
}

#[derive(Debug, Error)]
pub enum SyllabusError {
    #[error("start date {start} must be before exam date {exam}")]
    StartNotBeforeExam { start: NaiveDate, exam: NaiveDate },
    #[error("a crash course needs at least one study day")]
    ZeroStudyDays,
    #[error("{requested} study day(s) do not fit in the {window} day(s) before the exam")]
    StudyDaysExceedWindow { requested: u32, window: i64 },
    #[error("topic {0} not found")]
    TopicNotFound(i32),
    #[error(transparent)]
    Validation(#[from] TopicValidationError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("invalid weightage config: {0}")]
    Config(#[from] ConfigError),
    #[error("dataframe error: {0}")]
    Frame(#[from] PolarsError),
}

/// The topic table for one exam plus the plan window and study calendar.
pub struct Syllabus {
    df: DataFrame,
    metadata: PlanMetadata,
    calendar: StudyCalendar,
}

impl Syllabus {
    pub(crate) fn from_parts(metadata: PlanMetadata, calendar: StudyCalendar) -> Self {
        Self {
            df: DataFrame::empty_with_schema(&Self::default_schema()),
            metadata,
            calendar,
        }
    }

    pub fn new() -> Self {
        Self::from_parts(PlanMetadata::default(), StudyCalendar::default())
    }

    pub fn new_with_metadata(metadata: PlanMetadata) -> Result<Self, SyllabusError> {
        Self::validate_metadata(&metadata)?;
        Ok(Self::from_parts(metadata, StudyCalendar::default()))
    }

    pub fn new_with_metadata_and_calendar(
        metadata: PlanMetadata,
        calendar: StudyCalendar,
    ) -> Result<Self, SyllabusError> {
        Self::validate_metadata(&metadata)?;
        Ok(Self::from_parts(metadata, calendar))
    }

    fn validate_metadata(metadata: &PlanMetadata) -> Result<(), SyllabusError> {
        if metadata.start_date >= metadata.exam_date {
            return Err(SyllabusError::StartNotBeforeExam {
                start: metadata.start_date,
                exam: metadata.exam_date,
            });
        }
        if metadata.study_days == 0 {
            return Err(SyllabusError::ZeroStudyDays);
        }
        let window = (metadata.exam_date - metadata.start_date).num_days();
        if i64::from(metadata.study_days) > window {
            return Err(SyllabusError::StudyDaysExceedWindow {
                requested: metadata.study_days,
                window,
            });
        }
        Ok(())
    }

    fn update_metadata_with<F>(&mut self, mutator: F) -> Result<(), SyllabusError>
    where
        F: FnOnce(&mut PlanMetadata),
    {
        let mut metadata = self.metadata.clone();
        mutator(&mut metadata);
        self.set_metadata(metadata)
    }

    pub fn set_metadata(&mut self, metadata: PlanMetadata) -> Result<(), SyllabusError> {
        Self::validate_metadata(&metadata)?;
        self.metadata = metadata;
        Ok(())
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn metadata(&self) -> &PlanMetadata {
        &self.metadata
    }

    pub fn calendar(&self) -> &StudyCalendar {
        &self.calendar
    }

    pub fn calendar_config(&self) -> StudyCalendarConfig {
        self.calendar.to_config()
    }

    pub fn set_calendar(&mut self, calendar: StudyCalendar) {
        self.calendar = calendar;
    }

    pub fn set_calendar_from_config(
        &mut self,
        config: &StudyCalendarConfig,
    ) -> Result<(), SyllabusError> {
        self.calendar = StudyCalendar::from_config(config)?;
        Ok(())
    }

    pub fn set_exam_name(&mut self, name: impl Into<String>) {
        self.metadata.exam_name = name.into();
    }

    pub fn set_exam_description(&mut self, description: impl Into<String>) {
        self.metadata.exam_description = description.into();
    }

    pub fn set_dates(&mut self, start: NaiveDate, exam: NaiveDate) -> Result<(), SyllabusError> {
        self.update_metadata_with(|metadata| {
            metadata.start_date = start;
            metadata.exam_date = exam;
        })
    }

    pub fn set_study_days(&mut self, days: u32) -> Result<(), SyllabusError> {
        self.update_metadata_with(|metadata| {
            metadata.study_days = days;
        })
    }

    /// Study dates of the plan window: the first `study_days` available dates before the exam.
    pub fn study_dates(&self) -> Vec<NaiveDate> {
        self.calendar.study_dates(
            self.metadata.start_date,
            self.metadata.study_days as usize,
            self.metadata.exam_date,
        )
    }

    pub fn topic_count(&self) -> usize {
        self.df.height()
    }

    pub fn topics(&self) -> Result<Vec<Topic>, PolarsError> {
        let df = self.dataframe();
        let mut topics = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            topics.push(Topic::from_dataframe_row(df, idx)?);
        }
        Ok(topics)
    }

    pub fn find_topic(&self, topic_id: i32) -> Result<Option<Topic>, PolarsError> {
        if self.df.height() == 0 {
            return Ok(None);
        }
        let ids = self.df.column("id")?.i32()?;
        for (idx, id_opt) in ids.into_iter().enumerate() {
            if id_opt == Some(topic_id) {
                return Topic::from_dataframe_row(self.dataframe(), idx).map(Some);
            }
        }
        Ok(None)
    }

    fn contains_topic(&self, topic_id: i32) -> Result<bool, PolarsError> {
        if self.df.height() == 0 {
            return Ok(false);
        }
        Ok(self
            .df
            .column("id")?
            .i32()?
            .into_iter()
            .any(|v| v == Some(topic_id)))
    }

    /// Insert a topic or update the signals of an existing one (prerequisites are kept).
    pub fn upsert_topic(
        &mut self,
        id: i32,
        name: &str,
        frequency_count: i64,
        marks_weight: f64,
        last_asked_year: Option<i32>,
    ) -> Result<(), SyllabusError> {
        let mut topic = self
            .find_topic(id)?
            .unwrap_or_else(|| Topic::new(id, name));
        topic.name = name.to_string();
        topic.frequency_count = frequency_count;
        topic.marks_weight = marks_weight;
        topic.last_asked_year = last_asked_year;
        self.upsert_topic_record(topic)
    }

    pub fn upsert_topic_record(&mut self, topic: Topic) -> Result<(), SyllabusError> {
        topic_validation::validate_topic(&topic)?;
        if !self.contains_topic(topic.id)? {
            let new_row = topic.to_dataframe_row()?;
            self.df = self.df.vstack(&new_row)?;
            return Ok(());
        }

        let topics = self
            .topics()?
            .into_iter()
            .map(|existing| {
                if existing.id == topic.id {
                    topic.clone()
                } else {
                    existing
                }
            })
            .collect::<Vec<_>>();
        self.rebuild(&topics)?;
        Ok(())
    }

    pub fn set_prerequisites(
        &mut self,
        topic_id: i32,
        prerequisites: Vec<i32>,
    ) -> Result<(), SyllabusError> {
        let mut topic = self
            .find_topic(topic_id)?
            .ok_or(SyllabusError::TopicNotFound(topic_id))?;
        topic.prerequisites = prerequisites;
        self.upsert_topic_record(topic)
    }

    /// Removes a topic and drops it from every other topic's prerequisites.
    pub fn delete_topic(&mut self, topic_id: i32) -> Result<bool, PolarsError> {
        if !self.contains_topic(topic_id)? {
            return Ok(false);
        }
        let topics = self
            .topics()?
            .into_iter()
            .filter(|topic| topic.id != topic_id)
            .map(|mut topic| {
                topic.prerequisites.retain(|&prereq| prereq != topic_id);
                topic
            })
            .collect::<Vec<_>>();
        self.rebuild(&topics)?;
        Ok(true)
    }

    fn rebuild(&mut self, topics: &[Topic]) -> Result<(), PolarsError> {
        let mut df = DataFrame::empty_with_schema(&Self::default_schema());
        for topic in topics {
            df = df.vstack(&topic.to_dataframe_row()?)?;
        }
        self.df = df;
        Ok(())
    }

    fn default_schema() -> Schema {
        Schema::from_iter(vec![
            Field::new("id".into(), DataType::Int32),
            Field::new("name".into(), DataType::String),
            Field::new("source_document".into(), DataType::String),
            Field::new("frequency_count".into(), DataType::Int64),
            Field::new("marks_weight".into(), DataType::Float64),
            Field::new("last_asked_year".into(), DataType::Int32),
            Field::new(
                "prerequisites".into(),
                DataType::List(Box::new(DataType::Int32)),
            ),
            Field::new("priority_score".into(), DataType::Float64),
        ])
    }

    /// Recency is measured against the exam year.
    pub fn reference_year(&self) -> i32 {
        self.metadata.exam_date.year()
    }

    pub fn refresh(&mut self) -> Result<RefreshSummary, SyllabusError> {
        self.refresh_with(&WeightageConfig::default())
    }

    /// Recomputes every topic's priority score.
    pub fn refresh_with(
        &mut self,
        config: &WeightageConfig,
    ) -> Result<RefreshSummary, SyllabusError> {
        config.validate()?;
        let reference_year = self.reference_year();
        let scores = WeightageNormalizer::new(&self.df, config, reference_year).execute()?;
        self.set_priority_column(&scores)?;
        debug!(
            topics = scores.len(),
            reference_year, "normalized topic priorities"
        );

        let mut high_count = 0usize;
        let mut medium_count = 0usize;
        let mut low_count = 0usize;
        let mut ranked: Vec<(f64, String, i32)> = Vec::with_capacity(self.df.height());
        for topic in self.topics()? {
            let score = topic.priority_score.unwrap_or(0.0);
            match PriorityTier::from_score(score) {
                PriorityTier::High => high_count += 1,
                PriorityTier::Medium => medium_count += 1,
                PriorityTier::Low => low_count += 1,
            }
            ranked.push((score, topic.name, topic.id));
        }
        ranked.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.cmp(&b.2))
        });

        Ok(RefreshSummary {
            topic_count: self.df.height(),
            high_count,
            medium_count,
            low_count,
            reference_year,
            top_topics: ranked
                .into_iter()
                .take(TOP_TOPICS)
                .map(|(_, _, id)| id)
                .collect(),
        })
    }

    fn set_priority_column(&mut self, scores: &HashMap<i32, f64>) -> Result<(), PolarsError> {
        let values: Vec<Option<f64>> = self
            .df
            .column("id")?
            .i32()?
            .into_iter()
            .map(|id| id.and_then(|id| scores.get(&id).copied()))
            .collect();
        let series = Series::new(PlSmallStr::from_static("priority_score"), values);
        self.df.replace("priority_score", series)?;
        Ok(())
    }

    /// Refreshes priorities with `config.weightage`, then allocates the plan window.
    pub fn generate_plan(&mut self, config: &PlannerConfig) -> Result<CrashCoursePlan, PlanError> {
        config.validate()?;
        if self.topic_count() == 0 {
            return Err(PlanError::NoTopics);
        }
        self.refresh_with(&config.weightage)?;
        CrashCourseGenerator::new(self, &config.allocation).generate()
    }
}

impl Default for Syllabus {
    fn default() -> Self {
        Self::new()
    }
}
