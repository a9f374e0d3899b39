use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

pub const DEFAULT_DAILY_MINUTES: u32 = 360;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("study calendar requires at least one study weekday")]
    NoStudyWeekdays,
    #[error("daily study capacity must be greater than zero minutes")]
    ZeroDailyCapacity,
    #[error("daily study capacity of {0} minutes exceeds the length of a day")]
    CapacityTooLarge(u32),
}

/// Which dates a student can study on and for how long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyCalendar {
    blackout_dates: HashSet<NaiveDate>,
    rest_days: HashSet<Weekday>,
    daily_minutes: u32,
    capacity_overrides: BTreeMap<NaiveDate, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyCalendarConfig {
    study_days: Vec<Weekday>,
    #[serde(default)]
    blackout_dates: Vec<NaiveDate>,
    #[serde(default = "default_daily_minutes")]
    daily_minutes: u32,
    #[serde(default)]
    capacity_overrides: BTreeMap<NaiveDate, u32>,
}

fn default_daily_minutes() -> u32 {
    DEFAULT_DAILY_MINUTES
}

impl Default for StudyCalendar {
    fn default() -> Self {
        Self {
            blackout_dates: HashSet::new(),
            rest_days: HashSet::new(),
            daily_minutes: DEFAULT_DAILY_MINUTES,
            capacity_overrides: BTreeMap::new(),
        }
    }
}

impl StudyCalendar {
    const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
    const MINUTES_PER_DAY: u32 = 24 * 60;

    /// Every weekday is a study day with the same capacity.
    pub fn with_daily_minutes(daily_minutes: u32) -> Result<Self, CalendarError> {
        Self::check_capacity(daily_minutes)?;
        Ok(Self {
            daily_minutes,
            ..Self::default()
        })
    }

    pub fn custom<I, J>(
        study_days: I,
        blackout_dates: J,
        daily_minutes: u32,
    ) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let config = StudyCalendarConfig::new(study_days, blackout_dates, daily_minutes)?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &StudyCalendarConfig) -> Result<Self, CalendarError> {
        Self::check_capacity(config.daily_minutes)?;
        let study_set: HashSet<Weekday> = config.study_days.iter().copied().collect();
        if study_set.is_empty() {
            return Err(CalendarError::NoStudyWeekdays);
        }
        for minutes in config.capacity_overrides.values() {
            if *minutes > Self::MINUTES_PER_DAY {
                return Err(CalendarError::CapacityTooLarge(*minutes));
            }
        }
        let rest_days = Self::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !study_set.contains(day))
            .collect();

        Ok(Self {
            blackout_dates: config.blackout_dates.iter().copied().collect(),
            rest_days,
            daily_minutes: config.daily_minutes,
            capacity_overrides: config.capacity_overrides.clone(),
        })
    }

    pub fn to_config(&self) -> StudyCalendarConfig {
        StudyCalendarConfig::from(self)
    }

    fn check_capacity(minutes: u32) -> Result<(), CalendarError> {
        if minutes == 0 {
            return Err(CalendarError::ZeroDailyCapacity);
        }
        if minutes > Self::MINUTES_PER_DAY {
            return Err(CalendarError::CapacityTooLarge(minutes));
        }
        Ok(())
    }

    pub fn daily_minutes(&self) -> u32 {
        self.daily_minutes
    }

    pub fn set_daily_minutes(&mut self, minutes: u32) -> Result<(), CalendarError> {
        Self::check_capacity(minutes)?;
        self.daily_minutes = minutes;
        Ok(())
    }

    pub fn add_blackout_date(&mut self, date: NaiveDate) {
        self.blackout_dates.insert(date);
    }

    /// Override the capacity of a single date. Zero removes the date from the plan.
    pub fn set_capacity(&mut self, date: NaiveDate, minutes: u32) -> Result<(), CalendarError> {
        if minutes > Self::MINUTES_PER_DAY {
            return Err(CalendarError::CapacityTooLarge(minutes));
        }
        self.capacity_overrides.insert(date, minutes);
        Ok(())
    }

    /// Set the weekdays a student studies on (e.g. Mon-Sat).
    pub fn set_study_days(&mut self, days: Vec<Weekday>) -> Result<(), CalendarError> {
        if days.is_empty() {
            return Err(CalendarError::NoStudyWeekdays);
        }
        self.rest_days.clear();
        for day in Self::ALL_WEEKDAYS {
            if !days.contains(&day) {
                self.rest_days.insert(day);
            }
        }
        Ok(())
    }

    pub fn capacity_for(&self, date: NaiveDate) -> u32 {
        if self.blackout_dates.contains(&date) || self.rest_days.contains(&date.weekday()) {
            return 0;
        }
        self.capacity_overrides
            .get(&date)
            .copied()
            .unwrap_or(self.daily_minutes)
    }

    /// Check if a date can hold any study time
    pub fn is_available(&self, date: NaiveDate) -> bool {
        self.capacity_for(date) > 0
    }

    /// Up to `count` available dates starting at `from` (inclusive) and strictly before `before`.
    pub fn study_dates(&self, from: NaiveDate, count: usize, before: NaiveDate) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut current = from;
        while dates.len() < count && current < before {
            if self.is_available(current) {
                dates.push(current);
            }
            current = current + Duration::days(1);
        }
        dates
    }
}

impl StudyCalendarConfig {
    pub fn new<I, J>(
        study_days: I,
        blackout_dates: J,
        daily_minutes: u32,
    ) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let mut study: Vec<Weekday> = study_days.into_iter().collect();
        if study.is_empty() {
            return Err(CalendarError::NoStudyWeekdays);
        }
        study.sort_by_key(|wd| wd.num_days_from_monday());
        study.dedup_by(|a, b| a.num_days_from_monday() == b.num_days_from_monday());

        let mut blackout: Vec<NaiveDate> = blackout_dates.into_iter().collect();
        blackout.sort();
        blackout.dedup();

        Ok(Self {
            study_days: study,
            blackout_dates: blackout,
            daily_minutes,
            capacity_overrides: BTreeMap::new(),
        })
    }

    pub fn study_days(&self) -> &[Weekday] {
        &self.study_days
    }

    pub fn blackout_dates(&self) -> &[NaiveDate] {
        &self.blackout_dates
    }

    pub fn daily_minutes(&self) -> u32 {
        self.daily_minutes
    }

    pub fn capacity_overrides(&self) -> &BTreeMap<NaiveDate, u32> {
        &self.capacity_overrides
    }
}

impl Default for StudyCalendarConfig {
    fn default() -> Self {
        StudyCalendarConfig::from(&StudyCalendar::default())
    }
}

impl From<&StudyCalendar> for StudyCalendarConfig {
    fn from(calendar: &StudyCalendar) -> Self {
        let study_days = StudyCalendar::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !calendar.rest_days.contains(day))
            .collect();

        let mut blackout_dates: Vec<NaiveDate> = calendar.blackout_dates.iter().copied().collect();
        blackout_dates.sort();

        Self {
            study_days,
            blackout_dates,
            daily_minutes: calendar.daily_minutes,
            capacity_overrides: calendar.capacity_overrides.clone(),
        }
    }
}
