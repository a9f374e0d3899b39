#![cfg(feature = "sqlite")]

use chrono::NaiveDate;
use crash_course::{
    Difficulty, Flashcard, PlanMetadata, PlannerConfig, SqliteStore, Syllabus, SyllabusStore,
    Upload, UploadStatus,
};
use tempfile::NamedTempFile;

fn sample_syllabus() -> Syllabus {
    let mut syllabus = Syllabus::new_with_metadata(PlanMetadata {
        exam_name: "Biology".into(),
        exam_description: "Unit test".into(),
        start_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        exam_date: NaiveDate::from_ymd_opt(2025, 5, 5).unwrap(),
        study_days: 3,
    })
    .unwrap();
    syllabus.upsert_topic(1, "Cells", 6, 8.0, Some(2024)).unwrap();
    syllabus.upsert_topic(2, "Genetics", 9, 12.0, Some(2023)).unwrap();
    syllabus.set_prerequisites(2, vec![1]).unwrap();
    syllabus
}

#[test]
fn empty_store_has_no_syllabus() {
    let store = SqliteStore::in_memory().unwrap();
    assert!(store.load_syllabus().unwrap().is_none());
    assert!(store.latest_plan().unwrap().is_none());
}

#[test]
fn syllabus_survives_reopening_the_database() {
    let tmp = NamedTempFile::new().unwrap();
    let syllabus = sample_syllabus();
    {
        let store = SqliteStore::new(tmp.path()).unwrap();
        store.save_syllabus(&syllabus).unwrap();
    }
    let store = SqliteStore::new(tmp.path()).unwrap();
    let loaded = store.load_syllabus().unwrap().unwrap();
    assert_eq!(loaded.metadata(), syllabus.metadata());
    assert_eq!(loaded.topics().unwrap(), syllabus.topics().unwrap());
}

#[test]
fn saving_twice_replaces_topics() {
    let store = SqliteStore::in_memory().unwrap();
    let mut syllabus = sample_syllabus();
    store.save_syllabus(&syllabus).unwrap();
    syllabus.delete_topic(1).unwrap();
    store.save_syllabus(&syllabus).unwrap();

    let loaded = store.load_syllabus().unwrap().unwrap();
    assert_eq!(loaded.topic_count(), 1);
    assert!(loaded.find_topic(2).unwrap().unwrap().prerequisites.is_empty());
}

#[test]
fn latest_plan_is_the_most_recent_one() {
    let store = SqliteStore::in_memory().unwrap();
    let mut syllabus = sample_syllabus();
    let first = syllabus.generate_plan(&PlannerConfig::default()).unwrap();
    store.save_plan(&first).unwrap();

    syllabus.set_study_days(2).unwrap();
    let second = syllabus.generate_plan(&PlannerConfig::default()).unwrap();
    store.save_plan(&second).unwrap();

    let latest = store.latest_plan().unwrap().unwrap();
    assert_eq!(latest, second);
    assert_eq!(latest.days.len(), 2);
}

#[test]
fn uploads_are_upserted_by_id() {
    let store = SqliteStore::in_memory().unwrap();
    let mut upload = Upload::new("pyq-2024.pdf", "uploads/pyq-2024.pdf", 4096).unwrap();
    store.save_upload(&upload).unwrap();
    upload.transition(UploadStatus::Processing, None).unwrap();
    store.save_upload(&upload).unwrap();

    let uploads = store.load_uploads().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].status, UploadStatus::Processing);
    assert_eq!(uploads[0].id, upload.id);
}

#[test]
fn flashcards_filter_by_topic_and_delete() {
    let store = SqliteStore::in_memory().unwrap();
    let cards = [
        Flashcard::new(1, 1, "What is a ribosome?", "Protein factory", Difficulty::Easy),
        Flashcard::new(2, 2, "Mendel's first law?", "Segregation", Difficulty::Medium),
        Flashcard::new(3, 2, "What is a codon?", "Three bases", Difficulty::Hard),
    ];
    for card in &cards {
        store.save_flashcard(card.as_ref().unwrap()).unwrap();
    }

    assert_eq!(store.load_flashcards(None).unwrap().len(), 3);
    let genetics: Vec<i32> = store
        .load_flashcards(Some(2))
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(genetics, vec![2, 3]);

    assert!(store.delete_flashcard(2).unwrap());
    assert!(!store.delete_flashcard(2).unwrap());
    assert_eq!(store.load_flashcards(Some(2)).unwrap().len(), 1);
}
