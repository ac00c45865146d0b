use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{models::Workout, settings::RideSettings, settings::SettingsStore};

use super::events::{CurrentLimits, PlaybackEvent};
use super::state::{PlaybackState, PlaybackStatus, TickOutcome};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const TICK_INTERVAL_MS: u64 = 500;
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub session_id: Option<String>,
    pub workout_id: Option<String>,
    pub time: f64,
    pub duration: Option<f64>,
    pub limits: Option<CurrentLimits>,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Drives one [`PlaybackState`] in real time and publishes its events.
#[derive(Clone)]
pub struct PlaybackController {
    state: Arc<Mutex<PlaybackState>>,
    settings: Arc<SettingsStore>,
    events: broadcast::Sender<PlaybackEvent>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Duration,
}

impl PlaybackController {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(PlaybackState::new())),
            settings,
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    pub async fn get_snapshot(&self) -> PlaybackSnapshot {
        let guard = self.state.lock().await;
        PlaybackSnapshot {
            status: guard.status,
            session_id: guard.session_id.clone(),
            workout_id: guard.workout().map(|w| w.id().to_string()),
            time: guard.elapsed(Instant::now()),
            duration: guard.workout().map(Workout::duration),
            limits: guard.current_limits().cloned(),
        }
    }

    pub async fn status(&self) -> PlaybackStatus {
        self.state.lock().await.status
    }

    /// Binds `workout` to the session. Settings without an FTP fall back to
    /// the settings store.
    pub async fn init(&self, workout: Option<Workout>, settings: Option<RideSettings>) {
        if workout.is_none() {
            log_warn!("init ignored: no workout selected");
            return;
        }

        let stored = match self.settings.ride_settings() {
            Ok(stored) => stored,
            Err(err) => {
                log_error!("settings unavailable, using defaults: {err:?}");
                RideSettings::default()
            }
        };
        let settings = match settings {
            Some(settings) => RideSettings {
                ftp: settings.ftp.or(stored.ftp),
                ..settings
            },
            None => stored,
        };

        let session_id = Uuid::new_v4().to_string();
        let initialized = {
            let mut state = self.state.lock().await;
            state.init(workout, settings, session_id.clone())
        };

        if initialized {
            log_info!("playback session {} initialized", session_id);
            self.emit(PlaybackEvent::Initialized);
        } else {
            log_warn!("init ignored: a session is still running");
        }
    }

    pub async fn start(&self) {
        let started = {
            let mut state = self.state.lock().await;
            state.start(Instant::now())
        };
        if started {
            self.on_started().await;
        } else {
            log_warn!("start ignored: session is not initialized");
        }
    }

    pub async fn pause(&self) {
        let paused = self.state.lock().await.pause(Instant::now());
        if paused {
            log_info!("playback paused");
            self.emit(PlaybackEvent::Paused);
        }
    }

    pub async fn resume(&self) {
        let (was_running, resumed) = {
            let mut state = self.state.lock().await;
            let was_running = state.status == PlaybackStatus::Paused && state.has_started();
            (was_running, state.resume(Instant::now()))
        };
        if !resumed {
            return;
        }

        if was_running {
            log_info!("playback resumed");
            self.emit(PlaybackEvent::Resumed);
        } else {
            self.on_started().await;
        }
    }

    /// Halts the clock, publishes `completed`, then resets to `idle` after
    /// one scheduling turn.
    pub async fn stop(&self) {
        self.cancel_ticker().await;
        finish(&self.state, &self.events).await;
    }

    /// Skips to the end of the current interval. Skipping past the last
    /// interval ends the session.
    pub async fn forward(&self) {
        let (limits, at_end) = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            let limits = state.forward(now);
            (limits, state.is_past_end(now))
        };
        if at_end {
            log_info!("forward reached the end of the workout");
            self.stop().await;
            return;
        }
        self.publish_adjustment("forward", limits).await;
    }

    pub async fn backward(&self) {
        let limits = self.state.lock().await.backward(Instant::now());
        self.publish_adjustment("backward", limits).await;
    }

    pub async fn power_up(&self, delta: f64) {
        let limits = self.state.lock().await.power_up(delta, Instant::now());
        self.publish_adjustment("power up", limits).await;
    }

    pub async fn power_down(&self, delta: f64) {
        let limits = self.state.lock().await.power_down(delta, Instant::now());
        self.publish_adjustment("power down", limits).await;
    }

    async fn on_started(&self) {
        log_info!("playback started");
        self.spawn_ticker().await;
        self.emit(PlaybackEvent::Started);

        let (limits, erg) = {
            let state = self.state.lock().await;
            (state.current_limits().cloned(), state.settings().use_erg_mode)
        };
        if let (Some(limits), true) = (limits, erg) {
            self.emit(PlaybackEvent::RequestUpdate(limits));
        }
    }

    async fn publish_adjustment(&self, action: &str, limits: Option<CurrentLimits>) {
        let Some(limits) = limits else {
            log_warn!("{action} ignored: nothing to adjust");
            return;
        };
        let erg = self.state.lock().await.settings().use_erg_mode;
        if erg {
            self.emit(PlaybackEvent::RequestUpdate(limits.clone()));
        }
        self.emit(PlaybackEvent::Update(limits));
    }

    fn emit(&self, event: PlaybackEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.cancel_token.cancel();
            previous.handle.abort();
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(tick_loop(
            self.state.clone(),
            self.events.clone(),
            self.tick_interval,
            cancel_token.clone(),
        ));

        *ticker_guard = Some(Ticker {
            handle,
            cancel_token,
        });
    }

    /// Signals the tick loop and waits for it to exit. A loop that is
    /// already finishing the session runs to the end, reset included.
    async fn cancel_ticker(&self) {
        let ticker = self.ticker.lock().await.take();
        if let Some(ticker) = ticker {
            ticker.cancel_token.cancel();
            if let Err(err) = ticker.handle.await {
                log_warn!("tick loop ended abnormally: {err:?}");
            }
        }
    }
}

async fn tick_loop(
    state: Arc<Mutex<PlaybackState>>,
    events: broadcast::Sender<PlaybackEvent>,
    tick_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut interval = time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let outcome = state.lock().await.tick(Instant::now());
                match outcome {
                    TickOutcome::Skipped => {}
                    TickOutcome::Expired => {
                        log_info!("workout finished");
                        finish(&state, &events).await;
                        break;
                    }
                    TickOutcome::Tick { limits, report, request } => {
                        if request {
                            log_debug!("targets changed at {:.1}s", limits.time);
                            let _ = events.send(PlaybackEvent::RequestUpdate(limits.clone()));
                        }
                        if report {
                            let _ = events.send(PlaybackEvent::Update(limits));
                        }
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("tick loop shutting down");
                break;
            }
        }
    }
}

async fn finish(state: &Arc<Mutex<PlaybackState>>, events: &broadcast::Sender<PlaybackEvent>) {
    let summary = state.lock().await.stop(Instant::now());
    let Some(summary) = summary else {
        return;
    };

    log_info!(
        "playback session {} completed at {:.1}s",
        summary.session_id.as_deref().unwrap_or("-"),
        summary.time
    );
    let _ = events.send(PlaybackEvent::Completed(summary));

    // let subscribers observe `completed` before the fields are cleared
    tokio::task::yield_now().await;

    let mut guard = state.lock().await;
    if guard.status == PlaybackStatus::Completed {
        guard.reset();
    }
}
