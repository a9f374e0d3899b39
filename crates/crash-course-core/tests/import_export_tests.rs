use chrono::{NaiveDate, Weekday};
use crash_course::{
    PersistenceError, PlanMetadata, PlannerConfig, StudyCalendar, Syllabus, Topic,
    load_plan_from_json, load_planner_config, load_syllabus_from_csv, load_syllabus_from_json,
    save_plan_to_json, save_syllabus_to_csv, save_syllabus_to_json,
};
use std::fs;
use tempfile::NamedTempFile;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn build_sample_syllabus() -> Syllabus {
    let metadata = PlanMetadata {
        exam_name: "Chemistry Midterm".into(),
        exam_description: "Organic and physical".into(),
        start_date: d(2025, 4, 7),
        exam_date: d(2025, 4, 12),
        study_days: 3,
    };
    let mut calendar =
        StudyCalendar::custom([Weekday::Mon, Weekday::Wed, Weekday::Fri], [d(2025, 4, 9)], 300)
            .unwrap();
    calendar.set_capacity(d(2025, 4, 11), 180).unwrap();
    let mut syllabus = Syllabus::new_with_metadata_and_calendar(metadata, calendar).unwrap();

    let mut bonding = Topic::with_signals(1, "Chemical Bonding", 7, 12.0, Some(2024));
    bonding.source_document = Some("chem-pyq-2024.pdf".into());
    syllabus.upsert_topic_record(bonding).unwrap();

    let mut organic = Topic::with_signals(2, "Organic Reactions", 9, 15.5, Some(2023));
    organic.prerequisites = vec![1];
    syllabus.upsert_topic_record(organic).unwrap();

    syllabus
        .upsert_topic(3, "Electrochemistry", 2, 4.0, None)
        .unwrap();
    syllabus.refresh().unwrap();
    syllabus
}

#[test]
fn json_round_trip_preserves_topics_metadata_and_calendar() {
    let syllabus = build_sample_syllabus();
    let tmp = NamedTempFile::new().unwrap();
    save_syllabus_to_json(&syllabus, tmp.path()).unwrap();

    let loaded = load_syllabus_from_json(tmp.path()).unwrap();
    assert_eq!(loaded.metadata(), syllabus.metadata());
    assert_eq!(loaded.calendar(), syllabus.calendar());
    assert_eq!(loaded.topics().unwrap(), syllabus.topics().unwrap());
    assert_eq!(loaded.study_dates(), vec![d(2025, 4, 7), d(2025, 4, 11)]);
}

#[test]
fn csv_round_trip_preserves_topics_and_metadata_row() {
    let syllabus = build_sample_syllabus();
    let tmp = NamedTempFile::new().unwrap();
    save_syllabus_to_csv(&syllabus, tmp.path()).unwrap();

    let contents = fs::read_to_string(tmp.path()).unwrap();
    assert!(contents.contains("__metadata__"));

    let loaded = load_syllabus_from_csv(tmp.path()).unwrap();
    assert_eq!(loaded.metadata(), syllabus.metadata());
    assert_eq!(loaded.calendar(), syllabus.calendar());
    assert_eq!(loaded.topics().unwrap(), syllabus.topics().unwrap());
}

#[test]
fn hand_written_csv_imports_with_default_metadata() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        "id,name,frequency_count,marks_weight,last_asked_year,prerequisites\n\
         1,Limits,4,6,2022,\n\
         2,Derivatives,8,10,2024,1\n\
         3,Integrals,6,10,,1;2\n",
    )
    .unwrap();

    let loaded = load_syllabus_from_csv(tmp.path()).unwrap();
    assert_eq!(loaded.metadata(), &PlanMetadata::default());
    let integrals = loaded.find_topic(3).unwrap().unwrap();
    assert_eq!(integrals.prerequisites, vec![1, 2]);
    assert_eq!(integrals.last_asked_year, None);
    assert_eq!(integrals.marks_weight, 10.0);
    assert!(integrals.priority_score.is_none());
}

#[test]
fn csv_with_unknown_prerequisite_is_rejected() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        "id,name,frequency_count,marks_weight,prerequisites\n1,Limits,4,6,7\n",
    )
    .unwrap();

    match load_syllabus_from_csv(tmp.path()) {
        Err(PersistenceError::InvalidData(message)) => {
            assert!(message.contains("unknown prerequisite 7"), "{message}");
        }
        Err(other) => panic!("expected invalid data error, got {other}"),
        Ok(_) => panic!("expected invalid data error"),
    }
}

#[test]
fn csv_without_topics_is_rejected() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(tmp.path(), "id,name\n").unwrap();
    assert!(matches!(
        load_syllabus_from_csv(tmp.path()),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn plan_export_round_trips() {
    let mut syllabus = build_sample_syllabus();
    syllabus.set_study_days(2).unwrap();
    let plan = syllabus.generate_plan(&PlannerConfig::default()).unwrap();

    let tmp = NamedTempFile::new().unwrap();
    save_plan_to_json(&plan, tmp.path()).unwrap();
    let loaded = load_plan_from_json(tmp.path()).unwrap();
    assert_eq!(loaded, plan);
    assert_eq!(loaded.days.len(), 2);
}

#[test]
fn planner_config_fills_missing_fields_with_defaults() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        r#"{"allocation": {"min_minutes_per_topic": 45, "max_minutes_per_topic": 240}}"#,
    )
    .unwrap();
    let config = load_planner_config(tmp.path()).unwrap();
    assert_eq!(config.allocation.min_minutes_per_topic, 45);
    assert_eq!(config.allocation.max_minutes_per_topic, Some(240));
    assert_eq!(config.allocation.slot_minutes, 15);
    assert_eq!(config.weightage, PlannerConfig::default().weightage);
}

#[test]
fn invalid_planner_config_is_rejected() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        r#"{"weightage": {"frequency_weight": 0, "marks_weight": 0, "recency_weight": 0}}"#,
    )
    .unwrap();
    assert!(matches!(
        load_planner_config(tmp.path()),
        Err(PersistenceError::InvalidData(_))
    ));
}
