use serde::{Deserialize, Serialize};

use super::range::{PowerRange, Range};

/// One node of an imported interval tree. A node with `children` becomes a
/// [`super::Segment`], anything else an [`super::Interval`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub power: Option<PowerRange>,
    #[serde(default)]
    pub cadence: Option<Range>,
    #[serde(default)]
    pub hrm: Option<Range>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub work: Option<bool>,
    #[serde(default)]
    pub steady: Option<bool>,
    #[serde(default)]
    pub cooldown: Option<bool>,
    #[serde(default)]
    pub children: Option<Vec<StepDefinition>>,
    #[serde(default)]
    pub repeat: Option<u32>,
}

impl StepDefinition {
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }

    pub fn repeated(repeat: u32, children: Vec<StepDefinition>) -> Self {
        Self {
            repeat: Some(repeat),
            children: Some(children),
            ..Self::default()
        }
    }

    pub fn power(mut self, power: PowerRange) -> Self {
        self.power = Some(power);
        self
    }

    pub fn cadence(mut self, cadence: Range) -> Self {
        self.cadence = Some(cadence);
        self
    }

    pub fn hrm(mut self, hrm: Range) -> Self {
        self.hrm = Some(hrm);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn work(mut self) -> Self {
        self.work = Some(true);
        self
    }

    pub fn ramp(mut self) -> Self {
        self.steady = Some(false);
        self
    }

    pub fn cooldown(mut self) -> Self {
        self.steady = Some(false);
        self.cooldown = Some(true);
        self
    }

    pub fn starting_at(mut self, start: f64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn is_segment(&self) -> bool {
        self.children.is_some()
    }

    pub fn has_timing(&self) -> bool {
        self.start.is_some() || self.end.is_some() || self.duration.is_some()
    }
}

/// Importer output for a whole workout.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDefinition {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub repeat: Option<u32>,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}
