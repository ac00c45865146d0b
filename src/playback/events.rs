use chrono::{DateTime, Utc};
use serde::Serialize;

/// Targets at the current training time, as shown to the rider and sent to
/// the trainer. Power is in watts after FTP and manual trim are applied.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CurrentLimits {
    pub time: f64,
    pub duration: f64,
    pub remaining: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_power: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_power: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_cadence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cadence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_hrm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hrm: Option<f64>,
}

impl CurrentLimits {
    /// Whether the trainer-facing targets differ; timing fields are ignored.
    pub fn targets_differ(&self, other: &CurrentLimits) -> bool {
        self.min_power != other.min_power
            || self.max_power != other.max_power
            || self.min_cadence != other.min_cadence
            || self.max_cadence != other.max_cadence
            || self.min_hrm != other.min_hrm
            || self.max_hrm != other.max_hrm
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Option<String>,
    pub workout_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub time: f64,
    pub limits: Option<CurrentLimits>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum PlaybackEvent {
    Initialized,
    Started,
    Paused,
    Resumed,
    Completed(SessionSummary),
    Update(CurrentLimits),
    RequestUpdate(CurrentLimits),
}

impl PlaybackEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackEvent::Initialized => "initialized",
            PlaybackEvent::Started => "started",
            PlaybackEvent::Paused => "paused",
            PlaybackEvent::Resumed => "resumed",
            PlaybackEvent::Completed(_) => "completed",
            PlaybackEvent::Update(_) => "update",
            PlaybackEvent::RequestUpdate(_) => "request-update",
        }
    }
}
