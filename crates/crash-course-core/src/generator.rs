use crate::calculations::allocation::{Allocation, RankedTopic, TimeAllocator};
use crate::config::AllocationConfig;
use crate::graph::prerequisite_dag::PrerequisiteDag;
use crate::plan::{CrashCoursePlan, DayPlan, DeferredTopic, PlanError, PlanSummary, StudySession};
use crate::reasoning::{ReasoningAnnotator, SessionContext};
use crate::syllabus::Syllabus;
use crate::topic::Topic;
use crate::topic_validation;
use std::collections::HashMap;
use tracing::{debug, info};

const TOP_TOPICS: usize = 3;

/// Turns a refreshed syllabus into a day-by-day crash course.
///
/// Priorities are read as stored on the topics; call [`Syllabus::refresh_with`]
/// first (or use [`Syllabus::generate_plan`], which does both).
pub struct CrashCourseGenerator<'a> {
    syllabus: &'a Syllabus,
    config: &'a AllocationConfig,
}

impl<'a> CrashCourseGenerator<'a> {
    pub fn new(syllabus: &'a Syllabus, config: &'a AllocationConfig) -> Self {
        Self { syllabus, config }
    }

    pub fn generate(&self) -> Result<CrashCoursePlan, PlanError> {
        self.config.validate()?;
        let topics = self.syllabus.topics()?;
        if topics.is_empty() {
            return Err(PlanError::NoTopics);
        }
        topic_validation::validate_topic_collection(&topics)?;

        let metadata = self.syllabus.metadata();
        let dates = self.syllabus.study_dates();
        if dates.len() < metadata.study_days as usize {
            return Err(PlanError::NotEnoughStudyDays {
                requested: metadata.study_days,
                available: dates.len(),
                exam_date: metadata.exam_date,
            });
        }

        let by_id: HashMap<i32, &Topic> = topics.iter().map(|t| (t.id, t)).collect();
        PrerequisiteDag::build(topics.iter().map(|t| (t.id, t.prerequisites.as_slice())))
            .check_acyclic()?;

        let slot = self.config.slot_minutes;
        let calendar = self.syllabus.calendar();
        let capacities: Vec<u32> = dates.iter().map(|d| calendar.capacity_for(*d)).collect();
        let day_slots: Vec<u32> = capacities.iter().map(|c| c / slot).collect();
        let total_slots: u32 = day_slots.iter().sum();
        let total_budget_minutes = total_slots * slot;

        let mut ranked: Vec<RankedTopic> = topics
            .iter()
            .map(|t| RankedTopic {
                topic_id: t.id,
                name: t.name.clone(),
                priority: t.priority_score.unwrap_or(0.0),
            })
            .collect();
        TimeAllocator::rank(&mut ranked);
        let priority_of: HashMap<i32, f64> =
            ranked.iter().map(|t| (t.topic_id, t.priority)).collect();

        debug!(
            topics = ranked.len(),
            days = dates.len(),
            total_slots,
            slot_minutes = slot,
            "allocating crash course"
        );
        let outcome = TimeAllocator::new(self.config).allocate(&ranked, total_slots);

        let kept_dag = PrerequisiteDag::build(
            outcome
                .allocations
                .iter()
                .map(|a| (a.topic_id, by_id[&a.topic_id].prerequisites.as_slice())),
        );
        let rank: HashMap<i32, usize> = outcome
            .allocations
            .iter()
            .map(|a| (a.topic_id, a.rank))
            .collect();
        let allocation_of: HashMap<i32, &Allocation> = outcome
            .allocations
            .iter()
            .map(|a| (a.topic_id, a))
            .collect();
        let ordered: Vec<Allocation> = kept_dag
            .study_order(&rank)?
            .into_iter()
            .filter_map(|id| allocation_of.get(&id).map(|a| (*a).clone()))
            .collect();
        let packed = TimeAllocator::pack(&ordered, &day_slots);

        let mut parts_of: HashMap<i32, u32> = HashMap::new();
        for session in &packed {
            *parts_of.entry(session.topic_id).or_default() += 1;
        }

        let annotator = ReasoningAnnotator::new(total_budget_minutes, self.config.min_minutes_per_topic);
        let mut days: Vec<DayPlan> = dates
            .iter()
            .zip(&capacities)
            .enumerate()
            .map(|(idx, (date, capacity))| DayPlan {
                day_number: idx as u32 + 1,
                date: *date,
                capacity_minutes: *capacity,
                sessions: Vec::new(),
            })
            .collect();

        let mut last_day_of: HashMap<i32, u32> = HashMap::new();
        for session in &packed {
            let topic = by_id[&session.topic_id];
            let allocation = allocation_of[&session.topic_id];
            let priority = priority_of.get(&topic.id).copied().unwrap_or(0.0);
            let prerequisite_names: Vec<String> = kept_dag
                .prerequisites_of(topic.id)
                .into_iter()
                .filter_map(|id| by_id.get(&id).map(|t| t.name.clone()))
                .collect();
            let day_number = session.day_index as u32 + 1;
            let reasoning = annotator.session_reason(&SessionContext {
                topic,
                priority,
                topic_minutes: allocation.slots * slot,
                session_minutes: session.slots * slot,
                part: session.part,
                previous_day: last_day_of.get(&topic.id).copied(),
                capped: allocation.capped,
                prerequisite_names: &prerequisite_names,
            });
            last_day_of.insert(topic.id, day_number);

            days[session.day_index].sessions.push(StudySession {
                topic_id: topic.id,
                topic_name: topic.name.clone(),
                minutes: session.slots * slot,
                priority,
                reasoning,
                part: session.part,
                continues: session.part < parts_of.get(&topic.id).copied().unwrap_or(1),
            });
        }

        let kept = outcome.allocations.len();
        let deferred: Vec<DeferredTopic> = outcome
            .deferred
            .iter()
            .map(|id| {
                let topic = by_id[id];
                let priority = priority_of.get(id).copied().unwrap_or(0.0);
                DeferredTopic {
                    topic_id: topic.id,
                    topic_name: topic.name.clone(),
                    priority,
                    reasoning: annotator.deferred_reason(topic, priority, kept),
                }
            })
            .collect();

        let allocated_minutes: u32 = days.iter().map(DayPlan::allocated_minutes).sum();
        let summary = PlanSummary {
            topic_count: topics.len(),
            scheduled_count: kept,
            deferred_count: deferred.len(),
            day_count: days.len(),
            total_budget_minutes,
            allocated_minutes,
            unallocated_minutes: total_budget_minutes.saturating_sub(allocated_minutes),
            top_topics: outcome
                .allocations
                .iter()
                .take(TOP_TOPICS)
                .map(|a| a.topic_id)
                .collect(),
        };
        info!(summary = %summary.to_cli_summary(), "generated crash course");

        Ok(CrashCoursePlan {
            exam_name: metadata.exam_name.clone(),
            exam_date: metadata.exam_date,
            days,
            deferred,
            summary,
        })
    }
}
