use std::fs;
use std::path::Path;

use claim_markers::memory::{InMemoryClaimRegistry, InMemoryPlayerDirectory};
use claim_markers::{Claim, PlayerId, SyncEvent, WorldId};
use serde::Deserialize;

use super::runner::ReplayError;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct WorldEntry {
    pub(crate) id: WorldId,
    #[serde(default)]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlayerEntry {
    pub(crate) id: PlayerId,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) online: bool,
}

/// Registry and session state at startup plus the events that follow it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WorldSnapshot {
    pub(crate) worlds: Vec<WorldEntry>,
    pub(crate) players: Vec<PlayerEntry>,
    pub(crate) claims: Vec<Claim>,
    pub(crate) events: Vec<SyncEvent>,
}

impl WorldSnapshot {
    pub(crate) fn seed_registry(&self) -> InMemoryClaimRegistry {
        let registry = InMemoryClaimRegistry::new();
        for world in &self.worlds {
            if let Some(name) = &world.name {
                registry.set_world_name(&world.id, name.clone());
            }
        }
        for claim in &self.claims {
            registry.insert(claim.clone());
        }
        registry
    }

    pub(crate) fn seed_directory(&self) -> InMemoryPlayerDirectory {
        let directory = InMemoryPlayerDirectory::new();
        for player in &self.players {
            if player.online {
                directory.set_online(player.id, player.name.clone());
            } else {
                directory.remember_profile(player.id, player.name.clone());
            }
        }
        directory
    }
}

pub(crate) fn load_snapshot(path: &Path) -> Result<WorldSnapshot, ReplayError> {
    let raw = fs::read_to_string(path).map_err(|source| ReplayError::ReadSnapshot {
        path: path.to_path_buf(),
        source,
    })?;
    parse_snapshot(path, &raw)
}

pub(crate) fn parse_snapshot(path: &Path, raw: &str) -> Result<WorldSnapshot, ReplayError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, WorldSnapshot>(&mut deserializer).map_err(|error| {
        let field = error.path().to_string();
        ReplayError::ParseSnapshot {
            path: path.to_path_buf(),
            field,
            source: error.into_inner(),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use claim_markers::{ClaimRegistry, PlayerDirectory};
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn sample() -> serde_json::Value {
        json!({
            "worlds": [{ "id": "minecraft:overworld", "name": "world" }],
            "players": [
                { "id": "00000000-0000-0000-0000-0000000000a1", "name": "Steve", "online": true },
                { "id": "00000000-0000-0000-0000-0000000000b2", "name": "Alex" }
            ],
            "claims": [{
                "world": "minecraft:overworld",
                "origin": { "x": 10, "y": 64, "z": -5 },
                "type": { "name": "Farm" },
                "bounds": {
                    "min": { "x": 0, "y": 54, "z": -15 },
                    "max": { "x": 20, "y": 74, "z": 5 }
                },
                "owners": ["00000000-0000-0000-0000-0000000000a1"]
            }],
            "events": [{
                "event": "player_joined",
                "player": "00000000-0000-0000-0000-0000000000b2",
                "name": "Alexandra"
            }]
        })
    }

    #[test]
    fn snapshot_seeds_registry_and_directory() {
        let snapshot: WorldSnapshot = serde_json::from_value(sample()).expect("snapshot");
        let registry = snapshot.seed_registry();
        let directory = snapshot.seed_directory();
        let overworld = WorldId::new("minecraft:overworld");

        assert_eq!(registry.claims_in(&overworld).len(), 1);
        assert_eq!(registry.world_name(&overworld).as_deref(), Some("world"));
        assert_eq!(
            directory
                .online_name(PlayerId::from_u128(0xa1))
                .as_deref(),
            Some("Steve")
        );
        assert!(directory.online_name(PlayerId::from_u128(0xb2)).is_none());
        assert_eq!(
            directory
                .cached_profile_name(PlayerId::from_u128(0xb2))
                .as_deref(),
            Some("Alex")
        );
        assert_eq!(snapshot.events.len(), 1);
    }

    #[test]
    fn parse_error_reports_field_path() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("snapshot.json");
        let mut value = sample();
        value["claims"][0]["origin"]["x"] = json!("ten");
        fs::write(&path, value.to_string()).expect("write");

        let error = load_snapshot(&path).expect_err("error");
        let ReplayError::ParseSnapshot { field, .. } = error else {
            panic!("expected parse error");
        };
        assert!(field.starts_with("claims[0]"), "field={field}");
    }
}
