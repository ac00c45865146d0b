pub mod definition;
pub mod interval;
pub mod range;
pub mod segment;
pub mod workout;

pub use definition::{StepDefinition, WorkoutDefinition};
pub use interval::Interval;
pub use range::{PowerRange, PowerUnit, Range, ResolvedRanges};
pub use segment::{Segment, Step};
pub use workout::Workout;
