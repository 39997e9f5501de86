//! Watch loop tests with fake service, control API and notifier.

use std::sync::Arc;
use std::time::Duration;

use palserver_manager::config::{ConfigHandle, WatchConfig};
use palserver_manager::control::ControlError;
use palserver_manager::lifecycle::{Interrupt, StartupCheck, StartupOutcome};
use palserver_manager::net::PublicIpResolver;
use palserver_manager::notifications::{EventKind, NotificationEvent};
use palserver_manager::service::ServerState;
use palserver_manager::watch::{PlayerEvent, WatchLoop};

mod common;
use common::{FakeControl, FakeService, RecordingNotifier};

const API_ON: &str = "RESTAPIEnabled=True,RESTAPIPort=8212,AdminPassword=\"x\",PublicPort=8211";
const API_OFF: &str = "RESTAPIEnabled=False,RESTAPIPort=8212,PublicPort=8211";

fn fast_config() -> WatchConfig {
    WatchConfig {
        tick_ms: 10,
        startup_attempts: 2,
        startup_interval_ms: 5,
        startup_fallback_ms: 10,
        public_ip_url: String::new(),
        hot_reload: false,
    }
}

struct Harness {
    service: Arc<FakeService>,
    control: Arc<FakeControl>,
    notifier: Arc<RecordingNotifier>,
    watch: WatchLoop,
    interrupt: Interrupt,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new(options: &str, control: Arc<FakeControl>, config: WatchConfig) -> Self {
        let (dir, settings): (_, ConfigHandle) = common::game_settings(options);
        let service = FakeService::new(ServerState::Running);
        let notifier = RecordingNotifier::new();

        let startup = StartupCheck::new(
            service.clone(),
            control.clone(),
            notifier.clone(),
            settings,
            PublicIpResolver::disabled(),
            config.clone(),
        );
        let watch = WatchLoop::new(
            service.clone(),
            control.clone(),
            notifier.clone(),
            startup,
            config,
        );

        Self {
            service,
            control,
            notifier,
            watch,
            interrupt: Interrupt::new(),
            _dir: dir,
        }
    }

    fn kinds(&self) -> Vec<EventKind> {
        self.notifier.events().iter().map(|e| e.kind).collect()
    }
}

#[tokio::test]
async fn test_reconciles_across_ticks() {
    let mut h = Harness::new(API_ON, FakeControl::with_players(&[("A", 1), ("B", 1)]), fast_config());
    let mut rx = h.interrupt.subscribe();

    let first = h.watch.tick(&mut rx).await;
    assert_eq!(first.startup, Some(StartupOutcome::Verified));
    assert_eq!(first.events.len(), 2);

    h.control.set_players(&[("A", 2)]);
    let second = h.watch.tick(&mut rx).await;
    assert_eq!(second.startup, None);
    assert_eq!(
        second.events,
        vec![
            PlayerEvent::LeveledUp {
                name: "A".to_string(),
                level: 2
            },
            PlayerEvent::Left {
                name: "B".to_string()
            },
        ]
    );

    assert_eq!(
        h.notifier.events(),
        vec![
            NotificationEvent::game_started(Vec::new()),
            NotificationEvent::player_joined("A"),
            NotificationEvent::player_joined("B"),
            NotificationEvent::player_leveled_up("A", 2),
            NotificationEvent::player_left("B"),
        ]
    );
    assert_eq!(h.watch.state().level_of("A"), Some(2));
    assert_eq!(h.watch.state().players().len(), 1);
}

#[tokio::test]
async fn test_stop_forgets_players_silently() {
    let mut h = Harness::new(API_ON, FakeControl::with_players(&[("A", 1)]), fast_config());
    let mut rx = h.interrupt.subscribe();

    h.watch.tick(&mut rx).await;
    assert!(h.watch.state().running);

    h.service.set_state(ServerState::Stopped);
    let stopped = h.watch.tick(&mut rx).await;
    assert_eq!(stopped.state, ServerState::Stopped);
    assert!(stopped.events.is_empty());
    assert!(!h.watch.state().running);
    assert!(h.watch.state().players().is_empty());

    h.service.set_state(ServerState::Running);
    let restarted = h.watch.tick(&mut rx).await;
    assert_eq!(restarted.startup, Some(StartupOutcome::Verified));

    assert_eq!(
        h.kinds(),
        vec![
            EventKind::GameStarted,
            EventKind::PlayerJoined,
            EventKind::GameStarted,
            EventKind::PlayerJoined,
        ]
    );
}

#[tokio::test]
async fn test_failed_poll_keeps_roster() {
    let mut h = Harness::new(API_ON, FakeControl::with_players(&[("A", 1)]), fast_config());
    let mut rx = h.interrupt.subscribe();
    h.watch.tick(&mut rx).await;

    h.control
        .queue(Err(ControlError::Unavailable("timed out".to_string())));
    let failed = h.watch.tick(&mut rx).await;
    assert!(failed.events.is_empty());
    assert_eq!(h.watch.state().level_of("A"), Some(1));

    h.control.set_players(&[]);
    let left = h.watch.tick(&mut rx).await;
    assert_eq!(
        left.events,
        vec![PlayerEvent::Left {
            name: "A".to_string()
        }]
    );
}

#[tokio::test]
async fn test_unverified_start_is_still_announced() {
    let mut h = Harness::new(API_ON, FakeControl::unavailable(), fast_config());
    let mut rx = h.interrupt.subscribe();

    let report = h.watch.tick(&mut rx).await;

    assert_eq!(report.startup, Some(StartupOutcome::Unverified));
    // One initial poll plus two retries, then the tick's own player poll.
    assert_eq!(h.control.polls(), 4);
    assert_eq!(h.kinds(), vec![EventKind::GameStarted]);
    assert!(h.watch.state().running);
}

#[tokio::test]
async fn test_disabled_api_waits_then_announces() {
    let mut h = Harness::new(API_OFF, FakeControl::with_players(&[]), fast_config());
    let mut rx = h.interrupt.subscribe();

    let report = h.watch.tick(&mut rx).await;

    assert_eq!(report.startup, Some(StartupOutcome::Assumed));
    assert_eq!(h.kinds(), vec![EventKind::GameStarted]);
}

#[tokio::test]
async fn test_interrupt_during_startup_announces_nothing() {
    let config = WatchConfig {
        startup_fallback_ms: 60_000,
        ..fast_config()
    };
    let mut h = Harness::new(API_OFF, FakeControl::with_players(&[]), config);
    let mut rx = h.interrupt.subscribe();

    let interrupt = &h.interrupt;
    let trigger = async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        interrupt.trigger();
    };
    let (report, _) = tokio::join!(h.watch.tick(&mut rx), trigger);

    assert_eq!(report.startup, Some(StartupOutcome::Cancelled));
    assert!(h.notifier.events().is_empty());
    assert!(!h.watch.state().running);
}

#[tokio::test]
async fn test_run_exits_on_interrupt() {
    let h = Harness::new(API_ON, FakeControl::with_players(&[]), fast_config());
    h.service.set_state(ServerState::Stopped);
    let rx = h.interrupt.subscribe();
    let interrupt = h.interrupt;

    let handle = tokio::spawn(h.watch.run(rx));
    tokio::time::sleep(Duration::from_millis(50)).await;
    interrupt.trigger();

    let finished = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(matches!(finished, Ok(Ok(()))));
}
