use workout_player_lib::{Interval, PowerRange, PowerUnit, Range, StepDefinition, ValidationError};

fn power_ramp(start: f64, end: f64) -> StepDefinition {
    StepDefinition {
        start: Some(start),
        end: Some(end),
        ..StepDefinition::default()
    }
    .power(PowerRange::watts(0.0, 100.0))
    .ramp()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn steady_interval_returns_same_ranges_everywhere() {
    let def = StepDefinition::with_duration(60.0)
        .starting_at(0.0)
        .power(PowerRange::watts(180.0, 220.0))
        .cadence(Range::new(Some(85.0), Some(95.0)));
    let interval = Interval::new(&def).unwrap();

    let first = interval.ranges_at(0.0).unwrap();
    for t in [0.0, 12.5, 30.0, 59.999] {
        let ranges = interval.ranges_at(t).unwrap();
        assert_eq!(ranges.power, first.power);
        assert_eq!(ranges.cadence, first.cadence);
    }
    assert_eq!(first.power, Some(PowerRange::watts(180.0, 220.0)));
}

#[test]
fn ramp_runs_from_min_to_max() {
    let interval = Interval::new(&power_ramp(0.0, 100.0)).unwrap();

    let at_start = interval.ranges_at(0.0).unwrap().power.unwrap();
    assert!(approx(at_start.min.unwrap(), 0.0));

    let near_end = interval.ranges_at(100.0 - 1e-9).unwrap().power.unwrap();
    assert!((near_end.max.unwrap() - 100.0).abs() < 1e-3);
}

#[test]
fn cooldown_mirrors_the_ramp() {
    let def = power_ramp(0.0, 100.0).cooldown();
    let interval = Interval::new(&def).unwrap();

    let early = interval.ranges_at(10.0).unwrap().power.unwrap();
    let late = interval.ranges_at(90.0).unwrap().power.unwrap();
    assert!(approx(early.min.unwrap(), 90.0));
    assert!(approx(late.min.unwrap(), 10.0));
    assert!(early.min > late.min);
}

#[test]
fn ramp_midpoint_is_half_way() {
    let interval = Interval::new(&power_ramp(10.0, 30.0)).unwrap();
    let power = interval.ranges_at(20.0).unwrap().power.unwrap();
    assert!(approx(power.min.unwrap(), 50.0));
    assert!(approx(power.max.unwrap(), 50.0));
    assert_eq!(power.unit, PowerUnit::Watt);
}

#[test]
fn ramp_keeps_percent_unit_and_passes_one_sided_ranges() {
    let def = StepDefinition::with_duration(100.0)
        .starting_at(0.0)
        .power(PowerRange::percent(50.0, 100.0))
        .cadence(Range::new(Some(90.0), None))
        .cooldown();
    let interval = Interval::new(&def).unwrap();
    let ranges = interval.ranges_at(50.0).unwrap();

    let power = ranges.power.unwrap();
    assert_eq!(power.unit, PowerUnit::PercentOfFtp);
    assert!(approx(power.min.unwrap(), 75.0));
    assert_eq!(ranges.cadence, Some(Range::new(Some(90.0), None)));
}

#[test]
fn reports_duration_and_remaining() {
    let interval = Interval::new(&power_ramp(10.0, 30.0)).unwrap();
    let ranges = interval.ranges_at(25.0).unwrap();
    assert!(approx(ranges.duration, 20.0));
    assert!(approx(ranges.remaining, 5.0));
}

#[test]
fn not_applicable_outside_its_span() {
    let interval = Interval::new(&power_ramp(10.0, 30.0)).unwrap();
    assert!(interval.ranges_at(9.999).is_none());
    assert!(interval.ranges_at(30.0).is_none());
    assert!(interval.ranges_at(10.0).is_some());
}

#[test]
fn rejects_inconsistent_timing() {
    let def = StepDefinition {
        start: Some(0.0),
        end: Some(30.0),
        duration: Some(20.0),
        ..StepDefinition::default()
    };
    assert!(matches!(
        Interval::new(&def),
        Err(ValidationError::InconsistentTiming { .. })
    ));
}

#[test]
fn rejects_missing_timing() {
    let def = StepDefinition::default().power(PowerRange::watts(100.0, 200.0));
    assert_eq!(Interval::new(&def), Err(ValidationError::MissingTiming("none")));
}

#[test]
fn rejects_invalid_ranges() {
    let empty = StepDefinition::with_duration(10.0)
        .starting_at(0.0)
        .hrm(Range::default());
    assert_eq!(
        Interval::new(&empty),
        Err(ValidationError::EmptyRange { field: "hrm" })
    );

    let inverted = StepDefinition::with_duration(10.0)
        .starting_at(0.0)
        .cadence(Range::new(Some(100.0), Some(80.0)));
    assert!(matches!(
        Interval::new(&inverted),
        Err(ValidationError::MinAboveMax { field: "cadence", .. })
    ));

    let negative = StepDefinition::with_duration(10.0)
        .starting_at(0.0)
        .power(PowerRange::new(Some(-5.0), None, PowerUnit::Watt));
    assert!(matches!(
        Interval::new(&negative),
        Err(ValidationError::NegativeBound { field: "power", .. })
    ));
}

#[test]
fn validation_message_names_field_and_rule() {
    let def = StepDefinition::with_duration(10.0)
        .starting_at(0.0)
        .cadence(Range::new(Some(100.0), Some(80.0)));
    let message = Interval::new(&def).unwrap_err().to_string();
    assert!(message.contains("cadence"));
    assert!(message.contains("greater than max"));
}
