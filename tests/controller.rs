use std::{sync::Arc, time::Duration};

use tokio::sync::broadcast::Receiver;
use tokio::time::timeout;
use workout_player_lib::{
    PlaybackController, PlaybackEvent, PlaybackStatus, PowerRange, RideSettings, SettingsStore,
    StepDefinition, Workout,
};

fn workout(seconds: f64) -> Workout {
    let mut workout = Workout::new("short");
    for percent in [100.0, 50.0] {
        workout
            .add_step(
                &StepDefinition::with_duration(seconds / 2.0)
                    .power(PowerRange::percent(percent, percent)),
            )
            .unwrap();
    }
    workout
}

fn controller(ride: RideSettings) -> PlaybackController {
    PlaybackController::new(Arc::new(SettingsStore::in_memory(ride)))
        .with_tick_interval(Duration::from_millis(20))
}

/// Waits for the next event called `name`, skipping the others.
async fn next_named(rx: &mut Receiver<PlaybackEvent>, name: &str) -> PlaybackEvent {
    timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if event.name() == name {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {name}"))
}

#[tokio::test]
async fn walks_through_the_lifecycle() {
    let controller = controller(RideSettings::default());
    let mut rx = controller.subscribe();

    controller.init(Some(workout(600.0)), None).await;
    next_named(&mut rx, "initialized").await;
    assert_eq!(controller.status().await, PlaybackStatus::Initialized);

    controller.start().await;
    next_named(&mut rx, "started").await;
    assert_eq!(controller.status().await, PlaybackStatus::Active);

    controller.pause().await;
    next_named(&mut rx, "paused").await;
    controller.resume().await;
    next_named(&mut rx, "resumed").await;

    controller.stop().await;
    match next_named(&mut rx, "completed").await {
        PlaybackEvent::Completed(summary) => {
            assert!(summary.session_id.is_some());
            assert!(summary.workout_id.is_some());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(controller.status().await, PlaybackStatus::Idle);
    assert!(controller.get_snapshot().await.workout_id.is_none());
}

#[tokio::test]
async fn init_without_workout_stays_idle() {
    let controller = controller(RideSettings::default());
    controller.init(None, None).await;
    controller.start().await;
    assert_eq!(controller.status().await, PlaybackStatus::Idle);
}

#[tokio::test]
async fn ticks_publish_updates() {
    let controller = controller(RideSettings::default());
    let mut rx = controller.subscribe();
    controller.init(Some(workout(600.0)), None).await;
    controller.start().await;

    match next_named(&mut rx, "update").await {
        PlaybackEvent::Update(limits) => {
            assert_eq!(limits.duration, 300.0);
            assert_eq!(limits.min_power, Some(200));
        }
        other => panic!("unexpected {other:?}"),
    }
    controller.stop().await;
}

#[tokio::test]
async fn completes_on_its_own_and_resets() {
    let controller = controller(RideSettings::default());
    let mut rx = controller.subscribe();
    controller.init(Some(workout(0.2)), None).await;
    controller.start().await;

    next_named(&mut rx, "completed").await;
    wait_for_idle(&controller).await;

    // the same controller takes a new workout
    controller.init(Some(workout(600.0)), None).await;
    assert_eq!(controller.status().await, PlaybackStatus::Initialized);
}

#[tokio::test]
async fn missing_ftp_falls_back_to_settings_store() {
    let controller = controller(RideSettings {
        ftp: Some(300.0),
        use_erg_mode: false,
    });
    controller
        .init(
            Some(workout(600.0)),
            Some(RideSettings {
                ftp: None,
                use_erg_mode: true,
            }),
        )
        .await;

    let snapshot = controller.get_snapshot().await;
    assert_eq!(snapshot.limits.unwrap().min_power, Some(300));
}

#[tokio::test]
async fn forward_requests_trainer_update_in_erg_mode() {
    let controller = controller(RideSettings {
        ftp: Some(250.0),
        use_erg_mode: true,
    });
    let mut rx = controller.subscribe();
    controller.init(Some(workout(600.0)), None).await;
    controller.start().await;

    controller.forward().await;
    match next_named(&mut rx, "request-update").await {
        // the first request comes from `start`
        PlaybackEvent::RequestUpdate(limits) => assert_eq!(limits.min_power, Some(250)),
        other => panic!("unexpected {other:?}"),
    }
    match next_named(&mut rx, "request-update").await {
        PlaybackEvent::RequestUpdate(limits) => assert_eq!(limits.min_power, Some(125)),
        other => panic!("unexpected {other:?}"),
    }
    let snapshot = controller.get_snapshot().await;
    assert!(snapshot.time > 299.9);
    controller.stop().await;
}

async fn wait_for_idle(controller: &PlaybackController) {
    timeout(Duration::from_secs(5), async {
        while controller.status().await != PlaybackStatus::Idle {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session did not reset to idle");
}

#[tokio::test]
async fn stop_after_completed_still_resets() {
    let controller = controller(RideSettings::default());
    let mut rx = controller.subscribe();
    controller.init(Some(workout(0.2)), None).await;
    controller.start().await;

    next_named(&mut rx, "completed").await;
    controller.stop().await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(controller.status().await, PlaybackStatus::Idle);
    assert!(controller.get_snapshot().await.workout_id.is_none());
}

#[tokio::test]
async fn resume_after_pausing_an_unstarted_session_starts_it() {
    let controller = controller(RideSettings::default());
    let mut rx = controller.subscribe();
    controller.init(Some(workout(600.0)), None).await;
    next_named(&mut rx, "initialized").await;

    controller.pause().await;
    assert_eq!(rx.recv().await.unwrap().name(), "paused");
    controller.resume().await;
    assert_eq!(rx.recv().await.unwrap().name(), "started");
    assert_eq!(controller.status().await, PlaybackStatus::Active);
    controller.stop().await;
}

#[tokio::test]
async fn forward_from_the_last_interval_completes() {
    let controller = controller(RideSettings::default());
    let mut rx = controller.subscribe();
    controller.init(Some(workout(600.0)), None).await;
    controller.start().await;

    controller.forward().await;
    controller.forward().await;
    match next_named(&mut rx, "completed").await {
        PlaybackEvent::Completed(summary) => assert!(summary.time >= 599.9),
        other => panic!("unexpected {other:?}"),
    }
    wait_for_idle(&controller).await;
}
