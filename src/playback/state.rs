use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::models::interval::TIME_EPSILON;
use crate::models::{PowerUnit, ResolvedRanges, Workout};
use crate::settings::RideSettings;

use super::events::{CurrentLimits, SessionSummary};

/// FTP used when neither the caller nor the settings store provide one.
pub const DEFAULT_FTP: f64 = 200.0;

/// Within this many seconds of an interval's start, `backward` skips to the
/// previous interval instead.
const AT_START_TOLERANCE_SECS: f64 = 1.0;

/// Probe distance used to find the interval before a boundary.
const BOUNDARY_PROBE_SECS: f64 = 1e-3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Initialized,
    Active,
    Paused,
    Completed,
}

/// Result of one clock tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Not active, nothing to do.
    Skipped,
    /// Training time ran past the end of the workout.
    Expired,
    Tick {
        limits: CurrentLimits,
        /// The whole-second training time changed since the last report.
        report: bool,
        /// Targets changed and ERG mode wants the trainer updated.
        request: bool,
    },
}

/// Live session state. All clock readings are passed in as `now` so the
/// state machine itself never looks at the wall clock.
#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    workout: Option<Workout>,
    settings: RideSettings,
    base_ftp: f64,
    effective_ftp: f64,
    wall_clock_anchor: Option<Instant>,
    pause_anchor: Option<Instant>,
    paused_accumulated: Duration,
    manual_time_offset: f64,
    manual_power_offset: f64,
    current_limits: Option<CurrentLimits>,
    last_reported_second: Option<i64>,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workout(&self) -> Option<&Workout> {
        self.workout.as_ref()
    }

    pub fn current_limits(&self) -> Option<&CurrentLimits> {
        self.current_limits.as_ref()
    }

    pub fn manual_time_offset(&self) -> f64 {
        self.manual_time_offset
    }

    pub fn manual_power_offset(&self) -> f64 {
        self.manual_power_offset
    }

    pub fn effective_ftp(&self) -> f64 {
        self.effective_ftp
    }

    pub fn settings(&self) -> &RideSettings {
        &self.settings
    }

    /// The wall clock has been anchored by `start`.
    pub fn has_started(&self) -> bool {
        self.wall_clock_anchor.is_some()
    }

    /// Binds a workout. Returns `false` and leaves the state untouched when
    /// there is no workout or a session is still running.
    pub fn init(
        &mut self,
        workout: Option<Workout>,
        settings: RideSettings,
        session_id: String,
    ) -> bool {
        let Some(workout) = workout else {
            return false;
        };
        if matches!(self.status, PlaybackStatus::Active | PlaybackStatus::Paused) {
            return false;
        }

        let ftp = settings
            .ftp
            .filter(|ftp| ftp.is_finite() && *ftp > 0.0)
            .unwrap_or(DEFAULT_FTP);

        *self = Self {
            status: PlaybackStatus::Initialized,
            session_id: Some(session_id),
            workout: Some(workout),
            settings: RideSettings {
                ftp: Some(ftp),
                ..settings
            },
            base_ftp: ftp,
            effective_ftp: ftp,
            ..Self::default()
        };
        self.current_limits = self.resolve_limits(0.0);
        true
    }

    pub fn start(&mut self, now: Instant) -> bool {
        if self.status != PlaybackStatus::Initialized {
            return false;
        }
        self.begin(now)
    }

    fn begin(&mut self, now: Instant) -> bool {
        if self.workout.is_none() {
            return false;
        }
        self.status = PlaybackStatus::Active;
        self.started_at = Some(Utc::now());
        self.wall_clock_anchor = Some(now);
        self.pause_anchor = None;
        self.paused_accumulated = Duration::ZERO;
        self.manual_time_offset = 0.0;
        self.last_reported_second = None;
        true
    }

    pub fn pause(&mut self, now: Instant) -> bool {
        if !matches!(self.status, PlaybackStatus::Initialized | PlaybackStatus::Active) {
            return false;
        }
        self.status = PlaybackStatus::Paused;
        self.pause_anchor = Some(now);
        true
    }

    pub fn resume(&mut self, now: Instant) -> bool {
        match self.status {
            PlaybackStatus::Initialized | PlaybackStatus::Completed => self.begin(now),
            PlaybackStatus::Paused => {
                match (self.wall_clock_anchor, self.pause_anchor.take()) {
                    (Some(_), Some(paused_at)) => {
                        self.paused_accumulated += now.saturating_duration_since(paused_at);
                        self.status = PlaybackStatus::Active;
                        true
                    }
                    // paused straight from `initialized`: the clock never ran
                    _ => self.begin(now),
                }
            }
            PlaybackStatus::Idle | PlaybackStatus::Active => false,
        }
    }

    /// Moves to `completed` and returns what subscribers get to see.
    pub fn stop(&mut self, now: Instant) -> Option<SessionSummary> {
        if matches!(self.status, PlaybackStatus::Idle | PlaybackStatus::Completed) {
            return None;
        }
        let time = self.elapsed(now);
        self.status = PlaybackStatus::Completed;
        Some(SessionSummary {
            session_id: self.session_id.clone(),
            workout_id: self.workout.as_ref().map(|w| w.id().to_string()),
            started_at: self.started_at,
            time,
            limits: self.current_limits.clone(),
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Training time in seconds: wall clock since start, minus paused spans,
    /// plus manual seek offset.
    pub fn elapsed(&self, now: Instant) -> f64 {
        let Some(anchor) = self.wall_clock_anchor else {
            return self.manual_time_offset;
        };
        let reference = self.pause_anchor.unwrap_or(now);
        let running = reference
            .saturating_duration_since(anchor)
            .saturating_sub(self.paused_accumulated);
        running.as_secs_f64() + self.manual_time_offset
    }

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.status != PlaybackStatus::Active {
            return TickOutcome::Skipped;
        }
        let Some(duration) = self.workout.as_ref().map(Workout::duration) else {
            return TickOutcome::Skipped;
        };

        let elapsed = self.elapsed(now);
        if elapsed > duration {
            return TickOutcome::Expired;
        }
        let Some(limits) = self.resolve_limits(elapsed) else {
            return TickOutcome::Skipped;
        };

        let targets_changed = self
            .current_limits
            .as_ref()
            .map_or(true, |previous| previous.targets_differ(&limits));
        let second = elapsed.round() as i64;
        let report = self.last_reported_second != Some(second);
        if report {
            self.last_reported_second = Some(second);
        }
        self.current_limits = Some(limits.clone());

        TickOutcome::Tick {
            limits,
            report,
            request: targets_changed && self.settings.use_erg_mode,
        }
    }

    /// Skips to the end of the current interval.
    pub fn forward(&mut self, now: Instant) -> Option<CurrentLimits> {
        if !self.is_seekable() {
            return None;
        }
        let elapsed = self.elapsed(now);
        let workout = self.workout.as_ref()?;
        let (interval, mapped) = workout.interval_at(elapsed)?;
        self.manual_time_offset += interval.end - mapped;
        self.refresh(now)
    }

    /// Returns to the start of the current interval, or of the previous one
    /// when already at the start.
    pub fn backward(&mut self, now: Instant) -> Option<CurrentLimits> {
        if !self.is_seekable() {
            return None;
        }
        let elapsed = self.elapsed(now);
        let workout = self.workout.as_ref()?;
        let probe = elapsed.min(workout.duration() - BOUNDARY_PROBE_SECS);
        let (interval, mapped) = workout.interval_at(probe)?;

        let completed = (mapped - interval.start) + (elapsed - probe);
        let mut rewind = completed;
        if completed < AT_START_TOLERANCE_SECS {
            let interval_start = elapsed - completed;
            if let Some((previous, _)) = workout.interval_at(interval_start - BOUNDARY_PROBE_SECS) {
                rewind += previous.duration;
            }
        }

        self.manual_time_offset -= rewind.min(elapsed.max(0.0));
        self.refresh(now)
    }

    /// Training time has reached the end of the bound workout while the
    /// session can still be seeked.
    pub fn is_past_end(&self, now: Instant) -> bool {
        self.is_seekable()
            && self
                .workout
                .as_ref()
                .is_some_and(|workout| self.elapsed(now) >= workout.duration() - TIME_EPSILON)
    }

    /// Raises intensity by `delta` percent.
    pub fn power_up(&mut self, delta: f64, now: Instant) -> Option<CurrentLimits> {
        self.trim_power(delta, now)
    }

    pub fn power_down(&mut self, delta: f64, now: Instant) -> Option<CurrentLimits> {
        self.trim_power(-delta, now)
    }

    fn trim_power(&mut self, delta: f64, now: Instant) -> Option<CurrentLimits> {
        if !self.is_seekable() || !delta.is_finite() {
            return None;
        }
        let factor = delta / 100.0;
        let ftp = self.effective_ftp * (1.0 + factor);
        if ftp <= 0.0 {
            return None;
        }
        self.effective_ftp = ftp;
        self.manual_power_offset += (self.base_ftp * factor).round();
        self.refresh(now)
    }

    fn is_seekable(&self) -> bool {
        self.workout.is_some()
            && matches!(
                self.status,
                PlaybackStatus::Initialized | PlaybackStatus::Active | PlaybackStatus::Paused
            )
    }

    fn refresh(&mut self, now: Instant) -> Option<CurrentLimits> {
        let limits = self.resolve_limits(self.elapsed(now))?;
        self.current_limits = Some(limits.clone());
        Some(limits)
    }

    fn resolve_limits(&self, time: f64) -> Option<CurrentLimits> {
        let ranges = self.workout.as_ref()?.ranges_at(time)?;
        Some(self.to_limits(time, &ranges))
    }

    fn to_limits(&self, time: f64, ranges: &ResolvedRanges) -> CurrentLimits {
        let power = ranges.power.as_ref();
        let watts = |value: Option<f64>| {
            let unit = power.map(|p| p.unit).unwrap_or_default();
            value.map(|v| self.to_watts(v, unit))
        };

        CurrentLimits {
            time,
            duration: ranges.duration,
            remaining: ranges.remaining,
            min_power: watts(power.and_then(|p| p.min)),
            max_power: watts(power.and_then(|p| p.max)),
            min_cadence: ranges.cadence.and_then(|c| c.min),
            max_cadence: ranges.cadence.and_then(|c| c.max),
            min_hrm: ranges.hrm.and_then(|h| h.min),
            max_hrm: ranges.hrm.and_then(|h| h.max),
        }
    }

    fn to_watts(&self, value: f64, unit: PowerUnit) -> u32 {
        let watts = match unit {
            PowerUnit::PercentOfFtp => value * self.effective_ftp / 100.0,
            PowerUnit::Watt => value + self.manual_power_offset,
        };
        watts.round().max(0.0) as u32
    }
}
