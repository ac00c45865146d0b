use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

use super::definition::StepDefinition;
use super::interval::{Interval, TIME_EPSILON};
use super::range::ResolvedRanges;

/// A node of the interval tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Step {
    Interval(Interval),
    Segment(Segment),
}

impl Step {
    /// Builds a child that must start at `expected_start`. A leaf without an
    /// explicit start is placed there.
    pub(crate) fn build(
        def: &StepDefinition,
        expected_start: f64,
        index: usize,
    ) -> ValidationResult<Self> {
        let step = if def.is_segment() {
            let start = def.start.unwrap_or(expected_start);
            Step::Segment(Segment::with_start(def, start)?)
        } else {
            if !def.has_timing() {
                return Err(ValidationError::MissingTiming("none"));
            }
            let mut def = def.clone();
            if def.start.is_none() && !(def.end.is_some() && def.duration.is_some()) {
                def.start = Some(expected_start);
            }
            Step::Interval(Interval::new(&def)?)
        };

        if (step.start() - expected_start).abs() > TIME_EPSILON {
            return Err(ValidationError::BrokenChain {
                index,
                expected: expected_start,
                actual: step.start(),
            });
        }
        Ok(step)
    }

    pub fn start(&self) -> f64 {
        match self {
            Step::Interval(i) => i.start,
            Step::Segment(s) => s.start,
        }
    }

    pub fn end(&self) -> f64 {
        match self {
            Step::Interval(i) => i.end,
            Step::Segment(s) => s.end,
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            Step::Interval(i) => i.duration,
            Step::Segment(s) => s.duration,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Step::Interval(i) => i.text.as_deref(),
            Step::Segment(s) => s.text.as_deref(),
        }
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start() && t < self.end()
    }

    pub fn ranges_at(&self, t: f64) -> Option<ResolvedRanges> {
        match self {
            Step::Interval(i) => i.ranges_at(t),
            Step::Segment(s) => s.ranges_at(t),
        }
    }

    /// Leaf interval covering `t`, with `t` mapped into that interval's frame.
    pub fn interval_at(&self, t: f64) -> Option<(&Interval, f64)> {
        match self {
            Step::Interval(i) => i.contains(t).then_some((i, t)),
            Step::Segment(s) => s.interval_at(t),
        }
    }
}

/// Composite timing unit: ordered, start-chained children played `repeat`
/// times. Children are positioned in the frame of the first cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    start: f64,
    end: f64,
    duration: f64,
    cycle_duration: f64,
    repeat: u32,
    children: Vec<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl Segment {
    pub fn new(def: &StepDefinition) -> ValidationResult<Self> {
        Self::with_start(def, def.start.unwrap_or(0.0))
    }

    pub(crate) fn with_start(def: &StepDefinition, start: f64) -> ValidationResult<Self> {
        let mut segment = Self::empty(def.repeat.unwrap_or(1))?;
        segment.start = start;
        segment.end = start;
        segment.text = def.text.clone();

        for (index, child) in def.children.iter().flatten().enumerate() {
            let step = Step::build(child, segment.next_start(), index)?;
            segment.push_child(step);
        }

        if let Some(declared) = def.duration {
            if (declared - segment.duration).abs() > TIME_EPSILON {
                return Err(ValidationError::SegmentTiming {
                    field: "duration",
                    declared,
                    derived: segment.duration,
                });
            }
        }
        if let Some(declared) = def.end {
            if (declared - segment.end).abs() > TIME_EPSILON {
                return Err(ValidationError::SegmentTiming {
                    field: "end",
                    declared,
                    derived: segment.end,
                });
            }
        }
        Ok(segment)
    }

    pub(crate) fn empty(repeat: u32) -> ValidationResult<Self> {
        if repeat == 0 {
            return Err(ValidationError::InvalidRepeat);
        }
        Ok(Self {
            repeat,
            ..Self::root()
        })
    }

    /// Empty single-cycle segment at t=0.
    pub(crate) fn root() -> Self {
        Self {
            start: 0.0,
            end: 0.0,
            duration: 0.0,
            cycle_duration: 0.0,
            repeat: 1,
            children: Vec::new(),
            text: None,
        }
    }

    /// Appends an already chained child and refreshes the derived timing.
    pub(crate) fn push_child(&mut self, step: Step) {
        self.cycle_duration += step.duration();
        self.children.push(step);
        self.duration = self.repeat as f64 * self.cycle_duration;
        self.end = self.start + self.duration;
    }

    /// Where the next appended child has to start.
    pub fn next_start(&self) -> f64 {
        self.children.last().map_or(self.start, Step::end)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn cycle_duration(&self) -> f64 {
        self.cycle_duration
    }

    pub fn repeat(&self) -> u32 {
        self.repeat
    }

    pub fn children(&self) -> &[Step] {
        &self.children
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Maps `t` into the first cycle and finds the child covering it.
    fn locate(&self, t: f64) -> Option<(&Step, f64)> {
        if self.cycle_duration <= 0.0 || t < self.start || t >= self.end {
            return None;
        }

        let mut local = (t - self.start) % self.cycle_duration;
        // A cycle boundary belongs to the first child of the next cycle.
        let gap = self.cycle_duration - local;
        if gap < TIME_EPSILON && t + gap < self.end - TIME_EPSILON {
            local = 0.0;
        }
        let mut mapped = self.start + local;
        // Same for a boundary between two children, which float sums of
        // offsets tend to miss by a rounding error.
        if let Some(boundary) = self.children[..self.children.len() - 1]
            .iter()
            .map(Step::end)
            .find(|end| (end - mapped).abs() < TIME_EPSILON)
        {
            mapped = boundary;
        }

        self.children
            .iter()
            .find(|child| child.contains(mapped))
            .or_else(|| self.children.last())
            .map(|child| (child, mapped))
    }

    /// Direct child covering `t`, or `None` outside the segment.
    pub fn child_at(&self, t: f64) -> Option<&Step> {
        self.locate(t).map(|(child, _)| child)
    }

    pub fn ranges_at(&self, t: f64) -> Option<ResolvedRanges> {
        let (child, mapped) = self.locate(t)?;
        child.ranges_at(mapped)
    }

    pub fn interval_at(&self, t: f64) -> Option<(&Interval, f64)> {
        let (child, mapped) = self.locate(t)?;
        child.interval_at(mapped)
    }
}
