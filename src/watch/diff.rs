//! Player roster reconciliation.
//!
//! Players are identified by name only. A rename looks like one player
//! leaving and another joining.

use std::collections::{BTreeMap, HashSet};

use crate::control::PlayerSnapshot;
use crate::notifications::NotificationEvent;

/// A change between two consecutive player snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Joined { name: String, level: i64 },
    LeveledUp { name: String, level: i64 },
    Left { name: String },
}

impl PlayerEvent {
    pub fn name(&self) -> &str {
        match self {
            PlayerEvent::Joined { name, .. }
            | PlayerEvent::LeveledUp { name, .. }
            | PlayerEvent::Left { name } => name,
        }
    }

    pub fn to_notification(&self) -> NotificationEvent {
        match self {
            PlayerEvent::Joined { name, .. } => NotificationEvent::player_joined(name),
            PlayerEvent::LeveledUp { name, level } => NotificationEvent::player_leveled_up(name, *level),
            PlayerEvent::Left { name } => NotificationEvent::player_left(name),
        }
    }
}

/// What the watch loop remembers between ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchState {
    /// The last tick saw the service running.
    pub running: bool,
    levels: BTreeMap<String, i64>,
}

impl WatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known players and their last seen level.
    pub fn players(&self) -> &BTreeMap<String, i64> {
        &self.levels
    }

    pub fn level_of(&self, name: &str) -> Option<i64> {
        self.levels.get(name).copied()
    }

    pub fn apply(&mut self, events: &[PlayerEvent]) {
        for event in events {
            match event {
                PlayerEvent::Joined { name, level } | PlayerEvent::LeveledUp { name, level } => {
                    self.levels.insert(name.clone(), *level);
                }
                PlayerEvent::Left { name } => {
                    self.levels.remove(name);
                }
            }
        }
    }

    /// Forget every player and the running flag.
    pub fn reset(&mut self) {
        self.running = false;
        self.levels.clear();
    }

    /// Diff `current` against the known roster and record the result.
    pub fn reconcile(&mut self, current: &[PlayerSnapshot]) -> Vec<PlayerEvent> {
        let events = diff(&self.levels, current);
        self.apply(&events);
        events
    }
}

/// Events that take `known` to `current`.
///
/// Joins and level changes come first in snapshot order, then departures in
/// name order. A name repeated within one snapshot counts once, first entry wins.
pub fn diff(known: &BTreeMap<String, i64>, current: &[PlayerSnapshot]) -> Vec<PlayerEvent> {
    let mut seen = HashSet::new();
    let mut events = Vec::new();

    for player in current {
        if !seen.insert(player.name.as_str()) {
            continue;
        }
        match known.get(&player.name) {
            None => events.push(PlayerEvent::Joined {
                name: player.name.clone(),
                level: player.level,
            }),
            Some(&level) if level != player.level => events.push(PlayerEvent::LeveledUp {
                name: player.name.clone(),
                level: player.level,
            }),
            Some(_) => {}
        }
    }

    for name in known.keys() {
        if !seen.contains(name.as_str()) {
            events.push(PlayerEvent::Left { name: name.clone() });
        }
    }

    events
}
