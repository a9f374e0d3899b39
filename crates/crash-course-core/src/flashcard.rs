//! Flashcards generated per topic, reviewed with the SM-2 schedule.
//!
//! SM-2 in short: every card carries an easiness factor (EF, floor 1.3). A
//! grade below 3 resets the card; otherwise the interval grows 1 -> 6 -> the
//! previous interval times EF.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INITIAL_EASINESS: f64 = 2.5;
pub const MIN_EASINESS: f64 = 1.3;
pub const MAX_GRADE: u8 = 5;
pub const PASSING_GRADE: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlashcardError {
    #[error("flashcard {0} requires a non-empty question")]
    EmptyQuestion(i32),
    #[error("flashcard {0} requires a non-empty answer")]
    EmptyAnswer(i32),
    #[error("review grade {0} is outside 0..=5")]
    InvalidGrade(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub review_count: u32,
    pub correct_count: u32,
    pub easiness_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<NaiveDate>,
    /// `None` until the first review: new cards are always due.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review: Option<NaiveDate>,
}

impl Default for ReviewStats {
    fn default() -> Self {
        Self {
            review_count: 0,
            correct_count: 0,
            easiness_factor: INITIAL_EASINESS,
            interval_days: 0,
            repetitions: 0,
            last_reviewed: None,
            next_review: None,
        }
    }
}

impl ReviewStats {
    pub fn accuracy(&self) -> Option<f64> {
        if self.review_count == 0 {
            None
        } else {
            Some(f64::from(self.correct_count) / f64::from(self.review_count))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: i32,
    pub topic_id: i32,
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub review: ReviewStats,
}

impl Flashcard {
    pub fn new(
        id: i32,
        topic_id: i32,
        question: impl Into<String>,
        answer: impl Into<String>,
        difficulty: Difficulty,
    ) -> Result<Self, FlashcardError> {
        let card = Self {
            id,
            topic_id,
            question: question.into(),
            answer: answer.into(),
            difficulty,
            review: ReviewStats::default(),
        };
        card.validate()?;
        Ok(card)
    }

    pub fn validate(&self) -> Result<(), FlashcardError> {
        if self.question.trim().is_empty() {
            return Err(FlashcardError::EmptyQuestion(self.id));
        }
        if self.answer.trim().is_empty() {
            return Err(FlashcardError::EmptyAnswer(self.id));
        }
        Ok(())
    }

    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.review.next_review.is_none_or(|next| next <= today)
    }

    /// Records a review graded 0 (blackout) to 5 (perfect) and schedules the next one.
    pub fn record_review(&mut self, grade: u8, today: NaiveDate) -> Result<(), FlashcardError> {
        if grade > MAX_GRADE {
            return Err(FlashcardError::InvalidGrade(grade));
        }
        self.review = next_review(&self.review, grade, today);
        Ok(())
    }
}

/// SM-2 step. `grade` must already be within 0..=5.
pub fn next_review(stats: &ReviewStats, grade: u8, today: NaiveDate) -> ReviewStats {
    let q = f64::from(grade.min(MAX_GRADE));
    let easiness =
        (stats.easiness_factor + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02))).max(MIN_EASINESS);

    let (interval_days, repetitions) = if grade < PASSING_GRADE {
        (0, 0)
    } else {
        let repetitions = stats.repetitions + 1;
        let interval = match repetitions {
            1 => 1,
            2 => 6,
            _ => (f64::from(stats.interval_days) * easiness).round() as u32,
        };
        (interval, repetitions)
    };

    ReviewStats {
        review_count: stats.review_count + 1,
        correct_count: stats.correct_count + u32::from(grade >= PASSING_GRADE),
        easiness_factor: easiness,
        interval_days,
        repetitions,
        last_reviewed: Some(today),
        next_review: Some(today + Duration::days(i64::from(interval_days))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn card() -> Flashcard {
        Flashcard::new(1, 10, "What is Ohm's law?", "V = IR", Difficulty::Easy).unwrap()
    }

    #[test]
    fn new_card_is_due_immediately() {
        assert!(card().is_due(d(2025, 3, 1)));
    }

    #[test]
    fn intervals_grow_one_six_then_by_easiness() {
        let mut c = card();
        c.record_review(4, d(2025, 3, 1)).unwrap();
        assert_eq!(c.review.interval_days, 1);
        assert_eq!(c.review.next_review, Some(d(2025, 3, 2)));
        assert!(!c.is_due(d(2025, 3, 1)));

        c.record_review(4, d(2025, 3, 2)).unwrap();
        assert_eq!(c.review.interval_days, 6);

        c.record_review(5, d(2025, 3, 8)).unwrap();
        // EF after grades 4, 4, 5 is 2.6
        assert_eq!(c.review.interval_days, 16);
        assert_eq!(c.review.repetitions, 3);
        assert_eq!(c.review.correct_count, 3);
    }

    #[test]
    fn failing_grade_resets_but_still_lowers_easiness() {
        let mut c = card();
        c.record_review(5, d(2025, 3, 1)).unwrap();
        c.record_review(1, d(2025, 3, 2)).unwrap();
        assert_eq!(c.review.interval_days, 0);
        assert_eq!(c.review.repetitions, 0);
        assert!(c.review.easiness_factor < 2.6);
        assert_eq!(c.review.accuracy(), Some(0.5));
        assert!(c.is_due(d(2025, 3, 2)));
    }

    #[test]
    fn easiness_has_a_floor() {
        let mut c = card();
        for _ in 0..10 {
            c.record_review(0, d(2025, 3, 1)).unwrap();
        }
        assert!((c.review.easiness_factor - MIN_EASINESS).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_grade_and_blank_text() {
        assert_eq!(
            card().record_review(6, d(2025, 3, 1)),
            Err(FlashcardError::InvalidGrade(6))
        );
        assert_eq!(
            Flashcard::new(2, 1, " ", "a", Difficulty::Hard).unwrap_err(),
            FlashcardError::EmptyQuestion(2)
        );
    }
}
