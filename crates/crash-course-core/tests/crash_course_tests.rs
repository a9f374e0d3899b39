use chrono::{NaiveDate, Weekday};
use crash_course::{
    AllocationConfig, PlanError, PlanMetadata, PlannerConfig, PriorityTier, StudyCalendar,
    Syllabus, SyllabusError, WeightageConfig,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Physics syllabus planned over 2025-03-01..03 (exam on the 4th), 360 min a day.
fn physics() -> Syllabus {
    let mut syllabus = Syllabus::new_with_metadata(PlanMetadata {
        exam_name: "Physics Final".into(),
        exam_description: "Semester 4".into(),
        start_date: d(2025, 3, 1),
        exam_date: d(2025, 3, 4),
        study_days: 3,
    })
    .unwrap();
    syllabus
        .upsert_topic(1, "Thermodynamics", 10, 10.0, Some(2025))
        .unwrap();
    syllabus.upsert_topic(2, "Optics", 5, 5.0, Some(2023)).unwrap();
    syllabus.upsert_topic(3, "Waves", 0, 0.0, None).unwrap();
    syllabus
}

#[test]
fn refresh_normalizes_priorities_into_unit_range() {
    let mut syllabus = physics();
    let summary = syllabus.refresh().unwrap();

    assert_eq!(summary.topic_count, 3);
    assert_eq!(summary.reference_year, 2025);
    assert_eq!(summary.top_topics, vec![1, 2, 3]);
    assert_eq!(summary.high_count, 1);
    assert_eq!(summary.medium_count, 1);
    assert_eq!(summary.low_count, 1);

    let thermo = syllabus.find_topic(1).unwrap().unwrap();
    let optics = syllabus.find_topic(2).unwrap().unwrap();
    let waves = syllabus.find_topic(3).unwrap().unwrap();
    assert_eq!(thermo.priority_score, Some(1.0));
    assert_eq!(waves.priority_score, Some(0.0));
    // 0.5 * 0.5 + 0.3 * 0.5 + 0.2 * (1/3)
    assert_eq!(optics.priority_score, Some(0.4667));
    assert_eq!(optics.priority_tier(), Some(PriorityTier::Medium));
}

#[test]
fn refresh_with_custom_weights_ranks_by_marks() {
    let mut syllabus = physics();
    syllabus.upsert_topic(3, "Waves", 0, 20.0, None).unwrap();
    let summary = syllabus
        .refresh_with(&WeightageConfig {
            frequency_weight: 0.0,
            marks_weight: 1.0,
            recency_weight: 0.0,
        })
        .unwrap();
    assert_eq!(summary.top_topics, vec![3, 1, 2]);
}

#[test]
fn plan_fills_every_day_and_favours_high_priority() {
    let mut syllabus = physics();
    let plan = syllabus.generate_plan(&PlannerConfig::default()).unwrap();

    assert_eq!(plan.exam_name, "Physics Final");
    assert_eq!(plan.days.len(), 3);
    let dates: Vec<NaiveDate> = plan.days.iter().map(|day| day.date).collect();
    assert_eq!(dates, vec![d(2025, 3, 1), d(2025, 3, 2), d(2025, 3, 3)]);
    for day in &plan.days {
        assert!(day.allocated_minutes() <= day.capacity_minutes);
        assert!(day.sessions.iter().all(|s| s.minutes % 15 == 0));
    }

    assert_eq!(plan.summary.total_budget_minutes, 1080);
    assert_eq!(plan.summary.allocated_minutes, 1080);
    assert_eq!(plan.summary.unallocated_minutes, 0);
    assert!(plan.deferred.is_empty());

    let thermo = plan.minutes_for(1);
    let optics = plan.minutes_for(2);
    let waves = plan.minutes_for(3);
    assert!(thermo > optics && optics > waves);
    assert_eq!(waves, 30);
    assert_eq!(thermo + optics + waves, 1080);
}

#[test]
fn every_session_carries_reasoning() {
    let mut syllabus = physics();
    let plan = syllabus.generate_plan(&PlannerConfig::default()).unwrap();
    for session in plan.sessions() {
        assert!(!session.reasoning.is_empty());
    }
    let waves = plan.sessions().find(|s| s.topic_id == 3).unwrap();
    assert!(waves.reasoning.contains("not seen in PYQs"), "{}", waves.reasoning);
    assert!(waves.reasoning.contains("guaranteed minimum coverage"));

    let split: Vec<_> = plan.sessions().filter(|s| s.topic_id == 1).collect();
    assert_eq!(split.len(), 2);
    assert!(split[0].continues);
    assert_eq!(split[1].part, 2);
    assert!(split[1].reasoning.contains("continued from day 1"));
}

#[test]
fn prerequisites_start_no_later_than_dependents() {
    let mut syllabus = physics();
    syllabus.set_prerequisites(1, vec![3]).unwrap();
    let plan = syllabus.generate_plan(&PlannerConfig::default()).unwrap();

    let waves_day = plan.first_day_of(3).unwrap();
    let thermo_day = plan.first_day_of(1).unwrap();
    assert!(waves_day <= thermo_day);

    let order: Vec<i32> = plan.sessions().map(|s| s.topic_id).collect();
    let waves_pos = order.iter().position(|&id| id == 3).unwrap();
    let thermo_pos = order.iter().position(|&id| id == 1).unwrap();
    assert!(waves_pos < thermo_pos);

    let thermo = plan.sessions().find(|s| s.topic_id == 1).unwrap();
    assert!(thermo.reasoning.contains("after prerequisite Waves"));
}

#[test]
fn short_budget_defers_lowest_ranked_topics() {
    let mut syllabus = physics();
    syllabus.set_study_days(1).unwrap();
    syllabus.set_calendar(StudyCalendar::with_daily_minutes(45).unwrap());

    let plan = syllabus.generate_plan(&PlannerConfig::default()).unwrap();
    assert_eq!(plan.summary.scheduled_count, 1);
    assert_eq!(plan.minutes_for(1), 45);
    let deferred: Vec<i32> = plan.deferred.iter().map(|t| t.topic_id).collect();
    assert_eq!(deferred, vec![2, 3]);
    assert!(plan.deferred[0].reasoning.starts_with("deferred"));
}

#[test]
fn per_topic_maximum_leaves_budget_unallocated() {
    let mut syllabus = physics();
    let config = PlannerConfig {
        allocation: AllocationConfig {
            max_minutes_per_topic: Some(120),
            ..AllocationConfig::default()
        },
        ..PlannerConfig::default()
    };
    let plan = syllabus.generate_plan(&config).unwrap();
    for id in 1..=3 {
        assert_eq!(plan.minutes_for(id), 120);
    }
    assert_eq!(plan.summary.unallocated_minutes, 720);
    let thermo = plan.sessions().find(|s| s.topic_id == 1).unwrap();
    assert!(thermo.reasoning.contains("capped"));
}

#[test]
fn rest_days_and_blackouts_shift_the_plan_window() {
    let mut syllabus = physics();
    syllabus.set_dates(d(2025, 3, 1), d(2025, 3, 10)).unwrap();
    let mut calendar = StudyCalendar::default();
    calendar
        .set_study_days(vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ])
        .unwrap();
    calendar.add_blackout_date(d(2025, 3, 4));
    syllabus.set_calendar(calendar);

    assert_eq!(
        syllabus.study_dates(),
        vec![d(2025, 3, 3), d(2025, 3, 5), d(2025, 3, 6)]
    );
    let plan = syllabus.generate_plan(&PlannerConfig::default()).unwrap();
    assert_eq!(plan.days[0].date, d(2025, 3, 3));
}

#[test]
fn not_enough_study_days_is_an_error() {
    let mut syllabus = physics();
    let mut calendar = StudyCalendar::default();
    calendar.set_study_days(vec![Weekday::Mon]).unwrap();
    syllabus.set_calendar(calendar);

    match syllabus.generate_plan(&PlannerConfig::default()) {
        Err(PlanError::NotEnoughStudyDays {
            requested,
            available,
            ..
        }) => {
            assert_eq!(requested, 3);
            assert_eq!(available, 1);
        }
        other => panic!("expected NotEnoughStudyDays, got {other:?}"),
    }
}

#[test]
fn prerequisite_cycle_is_rejected() {
    let mut syllabus = physics();
    syllabus.set_prerequisites(1, vec![2]).unwrap();
    syllabus.set_prerequisites(2, vec![1]).unwrap();
    let err = syllabus
        .generate_plan(&PlannerConfig::default())
        .unwrap_err();
    assert!(matches!(err, PlanError::PrerequisiteCycle(_)), "{err:?}");
}

#[test]
fn unknown_prerequisite_fails_plan_validation() {
    let mut syllabus = physics();
    syllabus.set_prerequisites(2, vec![99]).unwrap();
    let err = syllabus
        .generate_plan(&PlannerConfig::default())
        .unwrap_err();
    assert!(matches!(err, PlanError::Validation(_)), "{err:?}");
}

#[test]
fn empty_syllabus_has_nothing_to_plan() {
    let mut syllabus = Syllabus::new();
    let err = syllabus
        .generate_plan(&PlannerConfig::default())
        .unwrap_err();
    assert!(matches!(err, PlanError::NoTopics));
}

#[test]
fn invalid_metadata_is_rejected() {
    let mut syllabus = physics();
    assert!(matches!(
        syllabus.set_dates(d(2025, 3, 5), d(2025, 3, 4)),
        Err(SyllabusError::StartNotBeforeExam { .. })
    ));
    assert!(matches!(
        syllabus.set_study_days(0),
        Err(SyllabusError::ZeroStudyDays)
    ));
    assert_eq!(syllabus.metadata().exam_date, d(2025, 3, 4));
}

#[test]
fn deleting_a_topic_drops_it_from_prerequisites() {
    let mut syllabus = physics();
    syllabus.set_prerequisites(1, vec![2, 3]).unwrap();
    assert!(syllabus.delete_topic(2).unwrap());
    assert!(!syllabus.delete_topic(2).unwrap());
    let thermo = syllabus.find_topic(1).unwrap().unwrap();
    assert_eq!(thermo.prerequisites, vec![3]);
    assert_eq!(syllabus.topic_count(), 2);
}

#[test]
fn upsert_keeps_existing_prerequisites() {
    let mut syllabus = physics();
    syllabus.set_prerequisites(1, vec![2]).unwrap();
    syllabus
        .upsert_topic(1, "Thermodynamics", 12, 10.0, Some(2025))
        .unwrap();
    let thermo = syllabus.find_topic(1).unwrap().unwrap();
    assert_eq!(thermo.frequency_count, 12);
    assert_eq!(thermo.prerequisites, vec![2]);
}

#[test]
fn blank_topic_name_is_rejected() {
    let mut syllabus = physics();
    assert!(matches!(
        syllabus.upsert_topic(9, "  ", 1, 1.0, None),
        Err(SyllabusError::Validation(_))
    ));
}

#[test]
fn study_days_beyond_the_exam_window_are_rejected() {
    let mut syllabus = physics();
    match syllabus.set_study_days(u32::MAX) {
        Err(SyllabusError::StudyDaysExceedWindow { requested, window }) => {
            assert_eq!(requested, u32::MAX);
            assert_eq!(window, 3);
        }
        other => panic!("expected StudyDaysExceedWindow, got {other:?}"),
    }
    assert!(syllabus.set_dates(d(2025, 3, 2), d(2025, 3, 4)).is_err());
    assert_eq!(syllabus.metadata().study_days, 3);

    let plan = syllabus.generate_plan(&PlannerConfig::default()).unwrap();
    assert_eq!(plan.days.len(), 3);
}

#[test]
fn implausible_last_asked_year_is_rejected_before_refresh() {
    let mut syllabus = physics();
    assert!(matches!(
        syllabus.upsert_topic(4, "Relativity", 1, 1.0, Some(i32::MIN)),
        Err(SyllabusError::Validation(_))
    ));
    assert_eq!(syllabus.topic_count(), 3);
    assert_eq!(syllabus.refresh().unwrap().topic_count, 3);
}
