use crate::calendar::CalendarError;
use crate::syllabus::{Syllabus, SyllabusError};
use crate::topic::Topic;
use crate::topic_validation;
use polars::prelude::PolarsError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("dataframe conversion error: {0}")]
    DataFrame(#[from] PolarsError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("no syllabus stored")]
    NotFound,
}

impl From<SyllabusError> for PersistenceError {
    fn from(value: SyllabusError) -> Self {
        match value {
            SyllabusError::Frame(err) => Self::DataFrame(err),
            other => Self::InvalidData(other.to_string()),
        }
    }
}

impl From<CalendarError> for PersistenceError {
    fn from(value: CalendarError) -> Self {
        Self::InvalidData(format!("invalid calendar: {value}"))
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub trait SyllabusStore {
    fn save_syllabus(&self, syllabus: &Syllabus) -> PersistenceResult<()>;
    fn load_syllabus(&self) -> PersistenceResult<Option<Syllabus>>;
}

pub fn validate_topics(topics: &[Topic]) -> PersistenceResult<()> {
    topic_validation::validate_topic_collection(topics)
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))
}

pub fn validate_syllabus(syllabus: &Syllabus) -> PersistenceResult<()> {
    validate_topics(&syllabus.topics()?)
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    load_plan_from_json, load_planner_config, load_syllabus_from_csv, load_syllabus_from_json,
    save_plan_to_json, save_syllabus_to_csv, save_syllabus_to_json,
};
