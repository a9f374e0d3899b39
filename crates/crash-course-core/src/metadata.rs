use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STUDY_DAYS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub exam_name: String,
    pub exam_description: String,
    pub start_date: NaiveDate,
    pub exam_date: NaiveDate,
    /// Number of study days in the crash course.
    #[serde(default = "default_study_days")]
    pub study_days: u32,
}

fn default_study_days() -> u32 {
    DEFAULT_STUDY_DAYS
}

impl Default for PlanMetadata {
    fn default() -> Self {
        Self {
            exam_name: "New Exam".to_string(),
            exam_description: "No description".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap_or_default(),
            exam_date: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap_or_default(),
            study_days: DEFAULT_STUDY_DAYS,
        }
    }
}
