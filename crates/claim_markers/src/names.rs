use std::collections::HashMap;

use tracing::debug;

use crate::claim::PlayerId;

/// Where player names come from: the live session list first, then the
/// persisted profile cache.
pub trait PlayerDirectory {
    fn online_name(&self, player: PlayerId) -> Option<String>;
    fn cached_profile_name(&self, player: PlayerId) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameObservation {
    New,
    Unchanged,
    Renamed { previous: String },
}

/// Last display name seen per player. Lives for one process run only; labels
/// re-resolve names from the directory after a restart.
#[derive(Debug, Default, Clone)]
pub struct PlayerNameCache {
    names: HashMap<PlayerId, String>,
}

impl PlayerNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, player: PlayerId, name: &str) -> NameObservation {
        match self.names.get_mut(&player) {
            Some(current) if current == name => NameObservation::Unchanged,
            Some(current) => {
                let previous = std::mem::replace(current, name.to_string());
                NameObservation::Renamed { previous }
            }
            None => {
                self.names.insert(player, name.to_string());
                NameObservation::New
            }
        }
    }

    pub fn get(&self, player: PlayerId) -> Option<&str> {
        self.names.get(&player).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Resolves `player` through the directory and records any hit in `cache`.
/// `None` means neither source knows the player.
pub fn resolve_name(
    directory: &dyn PlayerDirectory,
    cache: &mut PlayerNameCache,
    player: PlayerId,
) -> Option<String> {
    let name = directory
        .online_name(player)
        .or_else(|| directory.cached_profile_name(player));
    match &name {
        Some(name) => {
            cache.observe(player, name);
        }
        None => debug!(player = %player, "player_name_unresolved"),
    }
    name
}
