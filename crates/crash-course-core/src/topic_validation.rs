use crate::topic::Topic;
use std::collections::HashSet;
use thiserror::Error;

/// Plausible range for `last_asked_year`.
pub const MIN_ASKED_YEAR: i32 = 1900;
pub const MAX_ASKED_YEAR: i32 = 2200;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TopicValidationError {
    message: String,
}

impl TopicValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn validate_topic(topic: &Topic) -> Result<(), TopicValidationError> {
    if topic.name.trim().is_empty() {
        return Err(TopicValidationError::new(format!(
            "topic {} requires a non-empty name",
            topic.id
        )));
    }

    if topic.frequency_count < 0 {
        return Err(TopicValidationError::new(format!(
            "topic {} has negative frequency_count {}",
            topic.id, topic.frequency_count
        )));
    }

    if !topic.marks_weight.is_finite() || topic.marks_weight < 0.0 {
        return Err(TopicValidationError::new(format!(
            "topic {} has invalid marks_weight {} (must be finite and non-negative)",
            topic.id, topic.marks_weight
        )));
    }

    if let Some(year) = topic.last_asked_year {
        if !(MIN_ASKED_YEAR..=MAX_ASKED_YEAR).contains(&year) {
            return Err(TopicValidationError::new(format!(
                "topic {} has implausible last_asked_year {} (expected {}..={})",
                topic.id, year, MIN_ASKED_YEAR, MAX_ASKED_YEAR
            )));
        }
    }

    if let Some(score) = topic.priority_score {
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(TopicValidationError::new(format!(
                "topic {} has invalid priority_score {} (must be between 0 and 1)",
                topic.id, score
            )));
        }
    }

    let mut seen = HashSet::with_capacity(topic.prerequisites.len());
    for &prereq in &topic.prerequisites {
        if prereq == topic.id {
            return Err(TopicValidationError::new(format!(
                "topic {} cannot be its own prerequisite",
                topic.id
            )));
        }
        if !seen.insert(prereq) {
            return Err(TopicValidationError::new(format!(
                "topic {} lists prerequisite {} more than once",
                topic.id, prereq
            )));
        }
    }

    Ok(())
}

/// Checks each topic plus the cross-topic rules: unique ids and known prerequisites.
pub fn validate_topic_collection(topics: &[Topic]) -> Result<(), TopicValidationError> {
    let mut seen_ids = HashSet::with_capacity(topics.len());
    for topic in topics {
        if !seen_ids.insert(topic.id) {
            return Err(TopicValidationError::new(format!(
                "duplicate topic id {}",
                topic.id
            )));
        }
        validate_topic(topic)?;
    }

    for topic in topics {
        if let Some(missing) = topic
            .prerequisites
            .iter()
            .find(|prereq| !seen_ids.contains(*prereq))
        {
            return Err(TopicValidationError::new(format!(
                "topic {} references unknown prerequisite {}",
                topic.id, missing
            )));
        }
    }
    Ok(())
}
