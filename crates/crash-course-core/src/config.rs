use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("weight '{name}' must be finite and non-negative (got {value})")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("at least one weightage signal must have a positive weight")]
    AllWeightsZero,
    #[error("slot_minutes must be greater than zero")]
    ZeroSlot,
    #[error("min_minutes_per_topic must be greater than zero")]
    ZeroMinimum,
    #[error("max_minutes_per_topic {max} is below min_minutes_per_topic {min}")]
    MaximumBelowMinimum { min: u32, max: u32 },
}

/// Relative importance of each raw topic signal in the priority score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightageConfig {
    pub frequency_weight: f64,
    pub marks_weight: f64,
    pub recency_weight: f64,
}

impl Default for WeightageConfig {
    fn default() -> Self {
        Self {
            frequency_weight: 0.5,
            marks_weight: 0.3,
            recency_weight: 0.2,
        }
    }
}

impl WeightageConfig {
    pub fn total(&self) -> f64 {
        self.frequency_weight + self.marks_weight + self.recency_weight
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("frequency_weight", self.frequency_weight),
            ("marks_weight", self.marks_weight),
            ("recency_weight", self.recency_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        if self.total() <= 0.0 {
            return Err(ConfigError::AllWeightsZero);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub min_minutes_per_topic: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_minutes_per_topic: Option<u32>,
    /// Allocation granularity; every session is a multiple of this.
    pub slot_minutes: u32,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            min_minutes_per_topic: 30,
            max_minutes_per_topic: None,
            slot_minutes: 15,
        }
    }
}

impl AllocationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_minutes == 0 {
            return Err(ConfigError::ZeroSlot);
        }
        if self.min_minutes_per_topic == 0 {
            return Err(ConfigError::ZeroMinimum);
        }
        if let Some(max) = self.max_minutes_per_topic {
            if max < self.min_minutes_per_topic {
                return Err(ConfigError::MaximumBelowMinimum {
                    min: self.min_minutes_per_topic,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Minimum expressed in whole slots, rounded up.
    pub fn min_slots(&self) -> u32 {
        self.min_minutes_per_topic.div_ceil(self.slot_minutes)
    }

    /// Maximum expressed in whole slots, rounded down but never below the minimum.
    pub fn max_slots(&self) -> Option<u32> {
        self.max_minutes_per_topic
            .map(|max| (max / self.slot_minutes).max(self.min_slots()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub weightage: WeightageConfig,
    pub allocation: AllocationConfig,
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weightage.validate()?;
        self.allocation.validate()
    }
}
