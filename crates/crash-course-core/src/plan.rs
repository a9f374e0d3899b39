use crate::config::ConfigError;
use crate::graph::prerequisite_dag::PrerequisiteCycle;
use crate::syllabus::SyllabusError;
use crate::topic::PriorityTier;
use crate::topic_validation::TopicValidationError;
use chrono::NaiveDate;
use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no topics to schedule")]
    NoTopics,
    #[error("invalid planner config: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("only {available} study day(s) available before {exam_date}, {requested} requested")]
    NotEnoughStudyDays {
        requested: u32,
        available: usize,
        exam_date: NaiveDate,
    },
    #[error(transparent)]
    PrerequisiteCycle(#[from] PrerequisiteCycle),
    #[error("invalid topic data: {0}")]
    Validation(#[from] TopicValidationError),
    #[error(transparent)]
    Syllabus(#[from] SyllabusError),
    #[error("dataframe error: {0}")]
    Frame(#[from] PolarsError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub topic_id: i32,
    pub topic_name: String,
    pub minutes: u32,
    pub priority: f64,
    pub reasoning: String,
    /// 1-based part number; above 1 when the topic started on an earlier day.
    #[serde(default = "first_part")]
    pub part: u32,
    /// The topic carries on into the next study day.
    #[serde(default)]
    pub continues: bool,
}

fn first_part() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day_number: u32,
    pub date: NaiveDate,
    pub capacity_minutes: u32,
    pub sessions: Vec<StudySession>,
}

impl DayPlan {
    pub fn allocated_minutes(&self) -> u32 {
        self.sessions.iter().map(|s| s.minutes).sum()
    }

    pub fn free_minutes(&self) -> u32 {
        self.capacity_minutes.saturating_sub(self.allocated_minutes())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredTopic {
    pub topic_id: i32,
    pub topic_name: String,
    pub priority: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub topic_count: usize,
    pub scheduled_count: usize,
    pub deferred_count: usize,
    pub day_count: usize,
    pub total_budget_minutes: u32,
    pub allocated_minutes: u32,
    pub unallocated_minutes: u32,
    /// Highest-ranked scheduled topics, best first.
    pub top_topics: Vec<i32>,
}

impl PlanSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("topics={}", self.topic_count));
        parts.push(format!("scheduled={}", self.scheduled_count));
        if self.deferred_count > 0 {
            parts.push(format!("deferred={}", self.deferred_count));
        }
        parts.push(format!("days={}", self.day_count));
        parts.push(format!(
            "minutes={}/{}",
            self.allocated_minutes, self.total_budget_minutes
        ));
        if self.unallocated_minutes > 0 {
            parts.push(format!("unallocated={}", self.unallocated_minutes));
        }
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

/// A generated crash-course schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashCoursePlan {
    pub exam_name: String,
    pub exam_date: NaiveDate,
    pub days: Vec<DayPlan>,
    pub deferred: Vec<DeferredTopic>,
    pub summary: PlanSummary,
}

impl CrashCoursePlan {
    pub fn sessions(&self) -> impl Iterator<Item = &StudySession> {
        self.days.iter().flat_map(|day| day.sessions.iter())
    }

    /// Total minutes given to a topic across all days.
    pub fn minutes_for(&self, topic_id: i32) -> u32 {
        self.sessions()
            .filter(|s| s.topic_id == topic_id)
            .map(|s| s.minutes)
            .sum()
    }

    /// Day number of the first session of a topic, if scheduled.
    pub fn first_day_of(&self, topic_id: i32) -> Option<u32> {
        self.days
            .iter()
            .find(|day| day.sessions.iter().any(|s| s.topic_id == topic_id))
            .map(|day| day.day_number)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Crash course for {} (exam {})", self.exam_name, self.exam_date);
        for day in &self.days {
            let _ = writeln!(
                out,
                "Day {} - {} ({}/{} min)",
                day.day_number,
                day.date,
                day.allocated_minutes(),
                day.capacity_minutes
            );
            for session in &day.sessions {
                let _ = writeln!(
                    out,
                    "  {:>4} min  [{:<6}] {}",
                    session.minutes,
                    PriorityTier::from_score(session.priority).as_str(),
                    session.topic_name
                );
                let _ = writeln!(out, "            {}", session.reasoning);
            }
        }
        if !self.deferred.is_empty() {
            let _ = writeln!(out, "Deferred:");
            for topic in &self.deferred {
                let _ = writeln!(out, "  {} - {}", topic.topic_name, topic.reasoning);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(topic_id: i32, name: &str, minutes: u32, priority: f64) -> StudySession {
        StudySession {
            topic_id,
            topic_name: name.to_string(),
            minutes,
            priority,
            reasoning: "because".to_string(),
            part: 1,
            continues: false,
        }
    }

    fn sample_plan() -> CrashCoursePlan {
        let date = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap();
        CrashCoursePlan {
            exam_name: "Physics".into(),
            exam_date: date(4),
            days: vec![
                DayPlan {
                    day_number: 1,
                    date: date(1),
                    capacity_minutes: 120,
                    sessions: vec![session(1, "Optics", 90, 0.8)],
                },
                DayPlan {
                    day_number: 2,
                    date: date(2),
                    capacity_minutes: 120,
                    sessions: vec![session(1, "Optics", 30, 0.8), session(2, "Waves", 60, 0.1)],
                },
            ],
            deferred: vec![DeferredTopic {
                topic_id: 3,
                topic_name: "Sound".into(),
                priority: 0.0,
                reasoning: "deferred, no room".into(),
            }],
            summary: PlanSummary {
                topic_count: 3,
                scheduled_count: 2,
                deferred_count: 1,
                day_count: 2,
                total_budget_minutes: 240,
                allocated_minutes: 210,
                unallocated_minutes: 30,
                top_topics: vec![1, 2],
            },
        }
    }

    #[test]
    fn helpers_aggregate_across_days() {
        let plan = sample_plan();
        assert_eq!(plan.minutes_for(1), 120);
        assert_eq!(plan.first_day_of(2), Some(2));
        assert_eq!(plan.first_day_of(3), None);
        assert_eq!(plan.days[1].free_minutes(), 30);
    }

    #[test]
    fn cli_summary_lists_deferrals_and_leftover() {
        assert_eq!(
            sample_plan().summary.to_cli_summary(),
            "topics=3, scheduled=2, deferred=1, days=2, minutes=210/240, unallocated=30, top=1>2"
        );
    }

    #[test]
    fn render_text_shows_days_and_deferred_topics() {
        let text = sample_plan().render_text();
        assert!(text.starts_with("Crash course for Physics (exam 2025-03-04)"));
        assert!(text.contains("Day 2 - 2025-03-02 (90/120 min)"));
        assert!(text.contains("[high  ] Optics"));
        assert!(text.contains("Deferred:\n  Sound - deferred, no room"));
    }
}
