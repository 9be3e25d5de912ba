//! Demo binary wiring the session store, timers, and sync controller over the
//! in-memory document store, then driving one scripted debate round.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rostrum_sync::config::AppConfig;
use rostrum_sync::services::classroom_service::{self, CreateClassroomRequest};
use rostrum_sync::services::game_service::{self, Ballot, CreateGameRequest};
use rostrum_sync::session::SessionHub;
use rostrum_sync::store::DocumentStore;
use rostrum_sync::store::memory::MemoryStore;
use rostrum_sync::store::models::{Side, Stance, Student, VoteOption};
use rostrum_sync::sync::RemoteSyncController;
use rostrum_sync::timer::{TimerRegistry, spawn_ticker};

/// Room identifier the shared round timer publishes under.
const ROUND_ROOM: &str = "round";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let hub = SessionHub::new();
    let timers = Arc::new(TimerRegistry::new(hub.clone(), config.default_room_seconds));
    spawn_ticker(timers.clone());

    let classroom = classroom_service::create_classroom(
        store.as_ref(),
        &config,
        CreateClassroomRequest {
            name: "Period 3".into(),
            admin_name: "Ms. Hopper".into(),
            password: None,
        },
    )
    .await?;
    info!(classroom_id = %classroom.id, password = %classroom.password, "classroom ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    RemoteSyncController::new(store.clone(), hub.clone())
        .with_round_timer(timers.clone(), ROUND_ROOM)
        .spawn(classroom.id.clone(), shutdown_rx);
    hub.wait_for(|state| !state.is_loading).await;

    for (id, name) in [
        ("555-0101", "Ada"),
        ("555-0102", "Grace"),
        ("555-0103", "Alan"),
        ("555-0104", "Edsger"),
    ] {
        classroom_service::register_student(
            store.as_ref(),
            &classroom.id,
            Student {
                id: id.into(),
                name: name.into(),
            },
        )
        .await?;
    }
    let state = hub
        .wait_for(|state| state.team_a.len() + state.team_b.len() == 4)
        .await;
    info!(roster = ?state.map(|s| (s.team_a.len(), s.team_b.len())), "teams assigned");

    let roster = store.find_roster(&classroom.id).await?.unwrap_or_default();
    let game = game_service::create_game(
        store.as_ref(),
        &classroom.id,
        CreateGameRequest {
            topic: "Is it acceptable to recline your seat on an airplane?".into(),
            team_a_stance: Stance::Pro,
            speaking_for: Side::A,
            team_a_players: roster.team_a,
            team_b_players: roster.team_b,
            round_seconds: 300,
        },
    )
    .await?;
    hub.wait_for(|state| state.debate_started).await;
    info!(game_id = %game.id, "debate started");

    // Run the round timer for a few seconds and persist the countdown the way
    // the admin client does.
    timers.start(ROUND_ROOM, 300);
    sleep(Duration::from_secs(3)).await;
    timers.pause(ROUND_ROOM);
    let snapshot = timers.get_or_create(ROUND_ROOM, None);
    game_service::persist_round_timer(store.as_ref(), &classroom.id, &game.id, snapshot).await?;
    info!(remaining = snapshot.time, "round timer paused and persisted");

    // Two spectators cast their one vote each.
    for option in [VoteOption::Switch, VoteOption::DontSwitch] {
        let ballot = Ballot::new();
        game_service::submit_vote(store.as_ref(), &hub, &ballot, &classroom.id, &game.id, option)
            .await?;
    }
    let state = hub
        .wait_for(|state| state.votes.switch + state.votes.dont_switch == 2)
        .await;
    info!(votes = ?state.map(|s| s.votes), "votes tallied");

    game_service::end_round(store.as_ref(), &classroom.id).await?;
    hub.wait_for(|state| !state.debate_started).await;
    info!("round ended; press Ctrl+C to exit");

    shutdown_signal().await;
    classroom_service::logout(&hub, &shutdown_tx);
    Ok(())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
