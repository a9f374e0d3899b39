use super::{PersistenceError, PersistenceResult};
use crate::{
    CrashCoursePlan, PlanMetadata, PlannerConfig, Syllabus, Topic,
    calendar::{StudyCalendar, StudyCalendarConfig},
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::debug;

const METADATA_ROW: &str = "__metadata__";

#[derive(Serialize, Deserialize)]
struct SyllabusSnapshot {
    metadata: PlanMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    calendar: Option<StudyCalendarConfig>,
    topics: Vec<Topic>,
}

impl SyllabusSnapshot {
    fn from_syllabus(syllabus: &Syllabus) -> PersistenceResult<Self> {
        let topics = syllabus.topics()?;
        super::validate_topics(&topics)?;
        Ok(Self {
            metadata: syllabus.metadata().clone(),
            calendar: Some(syllabus.calendar_config()),
            topics,
        })
    }

    fn into_syllabus(self) -> PersistenceResult<Syllabus> {
        super::validate_topics(&self.topics)?;
        let calendar = match self.calendar {
            Some(config) => StudyCalendar::from_config(&config)?,
            None => StudyCalendar::default(),
        };
        let mut syllabus = Syllabus::new_with_metadata_and_calendar(self.metadata, calendar)?;
        for topic in self.topics {
            syllabus.upsert_topic_record(topic)?;
        }
        Ok(syllabus)
    }
}

pub fn save_syllabus_to_json<P: AsRef<Path>>(
    syllabus: &Syllabus,
    path: P,
) -> PersistenceResult<()> {
    let snapshot = SyllabusSnapshot::from_syllabus(syllabus)?;
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    debug!(path = %path.as_ref().display(), topics = snapshot.topics.len(), "saved syllabus json");
    Ok(())
}

pub fn load_syllabus_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Syllabus> {
    let file = File::open(path)?;
    let snapshot: SyllabusSnapshot = serde_json::from_reader(file)?;
    snapshot.into_syllabus()
}

/// One CSV row per topic, preceded by a `__metadata__` row carrying the plan
/// window and calendar as JSON.
#[derive(Default, Serialize, Deserialize)]
struct TopicCsvRecord {
    #[serde(default)]
    id: i32,
    name: String,
    #[serde(default)]
    source_document: String,
    #[serde(default)]
    frequency_count: String,
    #[serde(default)]
    marks_weight: String,
    #[serde(default)]
    last_asked_year: String,
    #[serde(default)]
    prerequisites: String,
    #[serde(default)]
    priority_score: String,
    #[serde(default)]
    metadata_json: String,
    #[serde(default)]
    calendar_json: String,
}

impl From<&Topic> for TopicCsvRecord {
    fn from(topic: &Topic) -> Self {
        Self {
            id: topic.id,
            name: topic.name.clone(),
            source_document: topic.source_document.clone().unwrap_or_default(),
            frequency_count: topic.frequency_count.to_string(),
            marks_weight: topic.marks_weight.to_string(),
            last_asked_year: format_option(topic.last_asked_year),
            prerequisites: topic
                .prerequisites
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(";"),
            priority_score: format_option(topic.priority_score),
            ..Self::default()
        }
    }
}

impl TopicCsvRecord {
    fn metadata_row(syllabus: &Syllabus) -> PersistenceResult<Self> {
        Ok(Self {
            name: METADATA_ROW.to_string(),
            metadata_json: serde_json::to_string(syllabus.metadata())?,
            calendar_json: serde_json::to_string(&syllabus.calendar_config())?,
            ..Self::default()
        })
    }

    fn is_metadata_row(&self) -> bool {
        self.name == METADATA_ROW || !self.metadata_json.trim().is_empty()
    }

    fn into_topic(self) -> PersistenceResult<Topic> {
        let mut topic = Topic::new(self.id, self.name);
        topic.source_document = Some(self.source_document)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        topic.frequency_count = parse_option::<i64>(&self.frequency_count, "frequency_count")?
            .unwrap_or(0);
        topic.marks_weight =
            parse_option::<f64>(&self.marks_weight, "marks_weight")?.unwrap_or(0.0);
        topic.last_asked_year = parse_option(&self.last_asked_year, "last_asked_year")?;
        topic.prerequisites = split_ids(&self.prerequisites)?;
        topic.priority_score = parse_option(&self.priority_score, "priority_score")?;
        Ok(topic)
    }
}

pub fn save_syllabus_to_csv<P: AsRef<Path>>(syllabus: &Syllabus, path: P) -> PersistenceResult<()> {
    super::validate_syllabus(syllabus)?;
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.serialize(TopicCsvRecord::metadata_row(syllabus)?)?;
    for topic in syllabus.topics()? {
        writer.serialize(TopicCsvRecord::from(&topic))?;
    }
    writer.flush()?;
    Ok(())
}

/// Loads topics from CSV. The metadata row is optional so that hand-written
/// topic lists can be imported.
pub fn load_syllabus_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Syllabus> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut topics = Vec::new();
    let mut metadata: Option<PlanMetadata> = None;
    let mut calendar_config: Option<StudyCalendarConfig> = None;
    for record in reader.deserialize::<TopicCsvRecord>() {
        let record = record?;
        if record.is_metadata_row() {
            if metadata.is_some() {
                return Err(PersistenceError::InvalidData(
                    "CSV file contained multiple metadata rows".into(),
                ));
            }
            metadata = Some(serde_json::from_str(&record.metadata_json).map_err(|err| {
                PersistenceError::InvalidData(format!("invalid metadata json: {err}"))
            })?);
            if !record.calendar_json.trim().is_empty() {
                calendar_config =
                    Some(serde_json::from_str(&record.calendar_json).map_err(|err| {
                        PersistenceError::InvalidData(format!("invalid calendar json: {err}"))
                    })?);
            }
            continue;
        }
        topics.push(record.into_topic()?);
    }

    if topics.is_empty() {
        return Err(PersistenceError::InvalidData(
            "CSV file contained no topics".into(),
        ));
    }
    super::validate_topics(&topics)?;

    let calendar = match calendar_config {
        Some(config) => StudyCalendar::from_config(&config)?,
        None => StudyCalendar::default(),
    };
    let mut syllabus = match metadata {
        Some(metadata) => Syllabus::new_with_metadata_and_calendar(metadata, calendar)?,
        None => Syllabus::new(),
    };
    for topic in topics {
        syllabus.upsert_topic_record(topic)?;
    }
    Ok(syllabus)
}

pub fn save_plan_to_json<P: AsRef<Path>>(plan: &CrashCoursePlan, path: P) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, plan)?;
    Ok(())
}

pub fn load_plan_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<CrashCoursePlan> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

/// Reads a planner config; missing fields fall back to their defaults.
pub fn load_planner_config<P: AsRef<Path>>(path: P) -> PersistenceResult<PlannerConfig> {
    let file = File::open(path)?;
    let config: PlannerConfig = serde_json::from_reader(file)?;
    config
        .validate()
        .map_err(|err| PersistenceError::InvalidData(format!("invalid planner config: {err}")))?;
    Ok(config)
}

fn format_option<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_option<T>(input: &str, field: &str) -> PersistenceResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid {field} '{input}': {e}")))
}

fn split_ids(input: &str) -> PersistenceResult<Vec<i32>> {
    input
        .split([';', ','])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>().map_err(|e| {
                PersistenceError::InvalidData(format!("invalid prerequisite id '{part}': {e}"))
            })
        })
        .collect()
}
