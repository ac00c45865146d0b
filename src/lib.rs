pub mod error;
pub mod models;
pub mod playback;
pub mod settings;
mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use tokio::sync::broadcast::error::RecvError;

pub use error::{ValidationError, ValidationResult};
pub use models::{Interval, PowerRange, PowerUnit, Range, Segment, Step, StepDefinition, Workout};
pub use playback::{CurrentLimits, PlaybackController, PlaybackEvent, PlaybackStatus};
pub use settings::{RideSettings, SettingsStore};

/// Plays the workout file given as first argument until it completes.
pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let workout_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: workout-player <workout.json>"))?;
    let settings_path = std::env::var("WORKOUT_PLAYER_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("settings.json"));
    let debug_mode = std::env::var("WORKOUT_PLAYER_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let contents = std::fs::read_to_string(&workout_path)
        .with_context(|| format!("Failed to read workout from {}", workout_path.display()))?;
    let workout = Workout::from_json(&contents)
        .with_context(|| format!("Invalid workout in {}", workout_path.display()))?;
    let settings = Arc::new(SettingsStore::new(settings_path)?);

    info!(
        "Loaded workout '{}' ({}), {:.0}s",
        workout.name(),
        workout.id(),
        workout.duration()
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(play(workout, settings, debug_mode));
    Ok(())
}

async fn play(workout: Workout, settings: Arc<SettingsStore>, debug_mode: bool) {
    let controller = PlaybackController::new(settings);
    let mut events = controller.subscribe();
    let log_every_secs = if debug_mode { 1 } else { 10 };

    controller.init(Some(workout), None).await;
    controller.start().await;

    loop {
        match events.recv().await {
            Ok(PlaybackEvent::Update(limits)) => {
                if (limits.time.round() as i64) % log_every_secs == 0 {
                    info!(
                        "t={:>5.0}s remaining={:>4.0}s power={:?}-{:?}W cadence={:?}-{:?}",
                        limits.time,
                        limits.remaining,
                        limits.min_power,
                        limits.max_power,
                        limits.min_cadence,
                        limits.max_cadence
                    );
                }
            }
            Ok(PlaybackEvent::Completed(summary)) => {
                info!("Workout completed after {:.0}s", summary.time);
                break;
            }
            Ok(event) => info!("{}", event.name()),
            Err(RecvError::Lagged(skipped)) => warn!("dropped {skipped} playback events"),
            Err(RecvError::Closed) => break,
        }
    }
}
