use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PowerUnit {
    #[default]
    #[serde(rename = "watt")]
    Watt,
    /// Percent of the rider's FTP.
    #[serde(rename = "pct", alias = "percent")]
    PercentOfFtp,
}

/// Target range with optional bounds. Used for cadence and heart rate, and as
/// the resolved output of interpolation (where `min == max` on a ramp).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PowerRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default)]
    pub unit: PowerUnit,
}

impl Range {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn validate(&self, field: &'static str) -> ValidationResult<()> {
        validate_bounds(field, self.min, self.max)
    }

    /// Resolves the range at `fraction` of a ramp.
    pub fn interpolate(&self, fraction: f64, cooldown: bool) -> Self {
        match interpolate_bounds(self.min, self.max, fraction, cooldown) {
            Some(value) => Self::new(Some(value), Some(value)),
            None => *self,
        }
    }
}

impl PowerRange {
    pub fn new(min: Option<f64>, max: Option<f64>, unit: PowerUnit) -> Self {
        Self { min, max, unit }
    }

    pub fn watts(min: f64, max: f64) -> Self {
        Self::new(Some(min), Some(max), PowerUnit::Watt)
    }

    pub fn percent(min: f64, max: f64) -> Self {
        Self::new(Some(min), Some(max), PowerUnit::PercentOfFtp)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_bounds("power", self.min, self.max)
    }

    pub fn interpolate(&self, fraction: f64, cooldown: bool) -> Self {
        match interpolate_bounds(self.min, self.max, fraction, cooldown) {
            Some(value) => Self::new(Some(value), Some(value), self.unit),
            None => *self,
        }
    }
}

fn validate_bounds(
    field: &'static str,
    min: Option<f64>,
    max: Option<f64>,
) -> ValidationResult<()> {
    if min.is_none() && max.is_none() {
        return Err(ValidationError::EmptyRange { field });
    }
    for value in [min, max].into_iter().flatten() {
        if value < 0.0 || !value.is_finite() {
            return Err(ValidationError::NegativeBound { field, value });
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ValidationError::MinAboveMax { field, min, max });
        }
    }
    Ok(())
}

// One-sided ranges are not interpolated, cooldown or not.
fn interpolate_bounds(
    min: Option<f64>,
    max: Option<f64>,
    fraction: f64,
    cooldown: bool,
) -> Option<f64> {
    let (min, max) = (min?, max?);
    let value = if cooldown {
        max - fraction * (max - min)
    } else {
        min + fraction * (max - min)
    };
    Some(value)
}

/// Targets resolved at one instant of the workout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRanges {
    pub duration: f64,
    pub remaining: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<PowerRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hrm: Option<Range>,
}
