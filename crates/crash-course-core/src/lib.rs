pub mod calculations;
pub mod calendar;
pub mod config;
pub mod flashcard;
pub mod generator;
pub mod graph;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod metadata;
pub mod persistence;
pub mod plan;
pub mod reasoning;
pub mod syllabus;
pub mod topic;
pub(crate) mod topic_validation;
pub mod upload;

pub use calendar::{CalendarError, StudyCalendar, StudyCalendarConfig};
pub use config::{AllocationConfig, ConfigError, PlannerConfig, WeightageConfig};
pub use flashcard::{Difficulty, Flashcard, FlashcardError, ReviewStats};
pub use generator::CrashCourseGenerator;
pub use metadata::PlanMetadata;
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteStore;
pub use persistence::{
    PersistenceError, SyllabusStore, load_plan_from_json, load_planner_config,
    load_syllabus_from_csv, load_syllabus_from_json, save_plan_to_json, save_syllabus_to_csv,
    save_syllabus_to_json, validate_syllabus, validate_topics,
};
pub use plan::{CrashCoursePlan, DayPlan, DeferredTopic, PlanError, PlanSummary, StudySession};
pub use syllabus::{RefreshSummary, Syllabus, SyllabusError};
pub use topic::{PriorityTier, Topic};
pub use topic_validation::TopicValidationError;
pub use upload::{Upload, UploadError, UploadStatus};
