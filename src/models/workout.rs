use std::sync::OnceLock;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{ValidationError, ValidationResult};

use super::definition::{StepDefinition, WorkoutDefinition};
use super::interval::Interval;
use super::range::ResolvedRanges;
use super::segment::{Segment, Step};

/// Root of an interval tree with a stable identity.
#[derive(Debug, Clone)]
pub struct Workout {
    name: String,
    description: Option<String>,
    category: Option<String>,
    explicit_id: Option<String>,
    root: Segment,
    hash: OnceLock<String>,
}

/// The fields that make up a workout's content identity.
#[derive(Serialize)]
struct HashInput<'a> {
    name: &'a str,
    description: Option<&'a str>,
    children: &'a [Step],
    repeat: u32,
}

impl Workout {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            category: None,
            explicit_id: None,
            root: Segment::root(),
            hash: OnceLock::new(),
        }
    }

    pub fn from_definition(def: &WorkoutDefinition) -> ValidationResult<Self> {
        let mut workout = Self::new(def.name.clone());
        workout.description = def.description.clone();
        workout.category = def.category.clone();
        workout.explicit_id = def.id.clone();
        workout.root = Segment::empty(def.repeat.unwrap_or(1))?;

        for step in &def.steps {
            if step.is_segment() {
                workout.add_segment(step)?;
            } else {
                workout.add_step(step)?;
            }
        }
        Ok(workout)
    }

    pub fn from_json(json: &str) -> ValidationResult<Self> {
        let def: WorkoutDefinition =
            serde_json::from_str(json).map_err(|err| ValidationError::Parse(err.to_string()))?;
        Self::from_definition(&def)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self.hash = OnceLock::new();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.explicit_id = Some(id.into());
        self
    }

    pub fn with_repeat(mut self, repeat: u32) -> ValidationResult<Self> {
        let mut root = Segment::empty(repeat)?;
        for child in self.root.children() {
            root.push_child(child.clone());
        }
        self.root = root;
        self.hash = OnceLock::new();
        Ok(self)
    }

    /// Appends a leaf interval, starting where the last child ends unless the
    /// definition positions it explicitly.
    pub fn add_step(&mut self, def: &StepDefinition) -> ValidationResult<()> {
        if def.is_segment() {
            return self.add_segment(def);
        }
        self.append(def)
    }

    /// Appends a (possibly repeating) segment after the last child.
    pub fn add_segment(&mut self, def: &StepDefinition) -> ValidationResult<()> {
        let mut def = def.clone();
        def.children.get_or_insert_with(Vec::new);
        self.append(&def)
    }

    fn append(&mut self, def: &StepDefinition) -> ValidationResult<()> {
        let step = Step::build(def, self.root.next_start(), self.root.children().len())?;
        self.root.push_child(step);
        self.hash = OnceLock::new();
        Ok(())
    }

    /// SHA-256 over name, description, children and repeat, hex encoded.
    pub fn hash(&self) -> &str {
        self.hash.get_or_init(|| {
            let input = HashInput {
                name: &self.name,
                description: self.description.as_deref(),
                children: self.root.children(),
                repeat: self.root.repeat(),
            };
            // Serializing plain structs of numbers and strings cannot fail.
            let bytes = serde_json::to_vec(&input).unwrap_or_default();
            format!("{:x}", Sha256::digest(&bytes))
        })
    }

    pub fn id(&self) -> &str {
        self.explicit_id.as_deref().unwrap_or_else(|| self.hash())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn root(&self) -> &Segment {
        &self.root
    }

    pub fn duration(&self) -> f64 {
        self.root.duration()
    }

    pub fn repeat(&self) -> u32 {
        self.root.repeat()
    }

    pub fn steps(&self) -> &[Step] {
        self.root.children()
    }

    pub fn child_at(&self, t: f64) -> Option<&Step> {
        self.root.child_at(t)
    }

    pub fn ranges_at(&self, t: f64) -> Option<ResolvedRanges> {
        self.root.ranges_at(t)
    }

    pub fn interval_at(&self, t: f64) -> Option<(&Interval, f64)> {
        self.root.interval_at(t)
    }
}

impl PartialEq for Workout {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
