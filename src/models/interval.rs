use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

use super::definition::StepDefinition;
use super::range::{PowerRange, Range, ResolvedRanges};

/// Tolerance for comparing second offsets built from sums of durations.
pub(crate) const TIME_EPSILON: f64 = 1e-6;

/// Leaf timing unit of a workout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<PowerRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadence: Option<Range>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hrm: Option<Range>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub work: bool,
    pub steady: bool,
    pub cooldown: bool,
}

impl Interval {
    pub fn new(def: &StepDefinition) -> ValidationResult<Self> {
        let (start, end, duration) = resolve_timing(def.start, def.end, def.duration)?;
        let interval = Self {
            start,
            end,
            duration,
            power: def.power,
            cadence: def.cadence,
            hrm: def.hrm,
            text: def.text.clone(),
            work: def.work.unwrap_or(false),
            steady: def.steady.unwrap_or(true),
            cooldown: def.cooldown.unwrap_or(false),
        };
        interval.validate()?;
        Ok(interval)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if self.duration < 0.0 {
            return Err(ValidationError::NegativeDuration(self.duration));
        }
        if (self.end - self.start - self.duration).abs() > TIME_EPSILON {
            return Err(ValidationError::InconsistentTiming {
                start: self.start,
                end: self.end,
                duration: self.duration,
            });
        }
        if let Some(power) = &self.power {
            power.validate()?;
        }
        if let Some(cadence) = &self.cadence {
            cadence.validate("cadence")?;
        }
        if let Some(hrm) = &self.hrm {
            hrm.validate("hrm")?;
        }
        Ok(())
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    /// Targets at absolute time `t`, or `None` outside `[start, end)`.
    pub fn ranges_at(&self, t: f64) -> Option<ResolvedRanges> {
        if !self.contains(t) {
            return None;
        }

        let mut resolved = ResolvedRanges {
            duration: self.duration,
            remaining: self.end - t,
            power: self.power,
            cadence: self.cadence,
            hrm: self.hrm,
        };

        if !self.steady && self.duration > 0.0 {
            let fraction = (t - self.start) / self.duration;
            resolved.power = self.power.map(|p| p.interpolate(fraction, self.cooldown));
            resolved.cadence = self.cadence.map(|c| c.interpolate(fraction, self.cooldown));
            resolved.hrm = self.hrm.map(|h| h.interpolate(fraction, self.cooldown));
        }

        Some(resolved)
    }
}

/// Derives the missing member of start/end/duration.
pub(crate) fn resolve_timing(
    start: Option<f64>,
    end: Option<f64>,
    duration: Option<f64>,
) -> ValidationResult<(f64, f64, f64)> {
    let (start, end, duration) = match (start, end, duration) {
        (Some(s), Some(e), Some(d)) => {
            if (e - s - d).abs() > TIME_EPSILON {
                return Err(ValidationError::InconsistentTiming {
                    start: s,
                    end: e,
                    duration: d,
                });
            }
            (s, e, d)
        }
        (Some(s), Some(e), None) => (s, e, e - s),
        (Some(s), None, Some(d)) => (s, s + d, d),
        (None, Some(e), Some(d)) => (e - d, e, d),
        (None, None, None) => return Err(ValidationError::MissingTiming("none")),
        (Some(_), None, None) => return Err(ValidationError::MissingTiming("start only")),
        (None, Some(_), None) => return Err(ValidationError::MissingTiming("end only")),
        (None, None, Some(_)) => return Err(ValidationError::MissingTiming("duration only")),
    };

    if duration < 0.0 {
        return Err(ValidationError::NegativeDuration(duration));
    }
    Ok((start, end, duration))
}
