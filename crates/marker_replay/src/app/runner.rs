use std::path::PathBuf;
use std::process::ExitCode;

use claim_markers::memory::{InMemoryClaimRegistry, InMemoryMarkerService, InMemoryPlayerDirectory};
use claim_markers::{
    AreaMarker, Collaborators, ConfigError, StoreError, SyncConfig, SyncController, SyncEvent,
    SyncReport, TexturePayloadResolver,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use super::bootstrap::AppWiring;
use super::snapshot::WorldSnapshot;

#[derive(Debug, Error)]
pub(crate) enum ReplayError {
    #[error("no snapshot given; set {env_var} to a world snapshot json file")]
    SnapshotNotSet { env_var: &'static str },
    #[error("failed to read snapshot {path}: {source}")]
    ReadSnapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse snapshot {path} at {field}: {source}")]
    ParseSnapshot {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to open marker set: {0}")]
    Store(#[from] StoreError),
    #[error("failed to encode replay output: {0}")]
    Output(#[source] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
struct ReplaySummary {
    events: usize,
    claims_seen: usize,
    created: usize,
    updated: usize,
    deleted: usize,
    unchanged: usize,
    failures: Vec<String>,
}

impl From<&SyncReport> for ReplaySummary {
    fn from(report: &SyncReport) -> Self {
        Self {
            events: report.events,
            claims_seen: report.claims_seen,
            created: report.created,
            updated: report.updated,
            deleted: report.deleted,
            unchanged: report.unchanged,
            failures: report.failures.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReplayOutput<'a> {
    marker_set: &'a str,
    reconciliation: ReplaySummary,
    events: ReplaySummary,
    markers: Vec<&'a AreaMarker>,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match replay(&app.config, &app.snapshot) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "replay_failed");
            ExitCode::FAILURE
        }
    }
}

/// Reconciles the snapshot's claims, replays its events and returns the
/// resulting marker set as pretty JSON.
pub(crate) fn replay(config: &SyncConfig, snapshot: &WorldSnapshot) -> Result<String, ReplayError> {
    let registry = snapshot.seed_registry();
    let directory = snapshot.seed_directory();
    let avatars = TexturePayloadResolver;

    let mut controller = SyncController::new(
        InMemoryMarkerService::new(),
        Collaborators {
            registry: &registry,
            directory: &directory,
            avatars: &avatars,
        },
        config.clone(),
    )?;

    let startup = controller.reconcile();
    let mut replayed = SyncReport::default();
    for event in &snapshot.events {
        mirror_into_sources(&registry, &directory, event);
        replayed.merge(controller.handle(event));
    }
    info!(
        events = replayed.events,
        created = replayed.created,
        updated = replayed.updated,
        deleted = replayed.deleted,
        failed = replayed.failures.len(),
        "event_replay_finished"
    );

    let service = controller.into_service();
    let output = ReplayOutput {
        marker_set: &config.marker_set_id,
        reconciliation: ReplaySummary::from(&startup),
        events: ReplaySummary::from(&replayed),
        markers: service.markers(&config.marker_set_id),
    };
    serde_json::to_string_pretty(&output).map_err(ReplayError::Output)
}

/// The real registry and session list change before they emit an event;
/// the in-memory stand-ins are brought to the same state here.
fn mirror_into_sources(
    registry: &InMemoryClaimRegistry,
    directory: &InMemoryPlayerDirectory,
    event: &SyncEvent,
) {
    match event {
        SyncEvent::ClaimCreated { claim } | SyncEvent::ClaimUpdated { claim } => {
            registry.insert(claim.clone());
        }
        SyncEvent::ClaimResized { claim, new_box, .. } => {
            let mut resized = claim.clone();
            resized.bounds = *new_box;
            registry.insert(resized);
        }
        SyncEvent::ClaimDestroyed { claim } => {
            registry.remove(&claim.world, claim.origin);
        }
        SyncEvent::PlayerJoined { player, name } => directory.set_online(*player, name.clone()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    const STEVE: &str = "00000000-0000-0000-0000-0000000000a1";
    const ALEX: &str = "00000000-0000-0000-0000-0000000000b2";

    fn claim_json(x: i32, owner: &str, trusted: &[&str]) -> Value {
        json!({
            "world": "minecraft:overworld",
            "origin": { "x": x, "y": 64, "z": 0 },
            "type": { "name": "Farm" },
            "bounds": {
                "min": { "x": x - 8, "y": 56, "z": -8 },
                "max": { "x": x + 8, "y": 72, "z": 8 }
            },
            "owners": [owner],
            "trusted": trusted
        })
    }

    fn run_replay(snapshot: Value) -> Value {
        let snapshot: WorldSnapshot = serde_json::from_value(snapshot).expect("snapshot");
        let output = replay(&SyncConfig::default(), &snapshot).expect("replay");
        serde_json::from_str(&output).expect("output json")
    }

    #[test]
    fn reconciles_snapshot_claims_into_markers() {
        let output = run_replay(json!({
            "worlds": [{ "id": "minecraft:overworld", "name": "world" }],
            "players": [{ "id": STEVE, "name": "Steve", "online": true }],
            "claims": [claim_json(0, STEVE, &[]), claim_json(100, STEVE, &[])]
        }));

        assert_eq!(output["marker_set"], "gomlMarkerSet");
        assert_eq!(output["reconciliation"]["created"], 2);
        let markers = output["markers"].as_array().expect("markers");
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0]["id"], "minecraft:overworld - 0, 64, 0");
        assert_eq!(markers[0]["world_name"], "world");
        assert_eq!(markers[0]["fill"]["opacity"], 0.25);
        assert!(markers[0]["label"]
            .as_str()
            .expect("label")
            .contains("Steve.png"));
    }

    #[test]
    fn sample_world_fixture_replays_cleanly() {
        let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join("sample_world.json");
        let snapshot = super::super::snapshot::load_snapshot(&path).expect("fixture");
        let output: Value =
            serde_json::from_str(&replay(&SyncConfig::default(), &snapshot).expect("replay"))
                .expect("output json");

        assert_eq!(output["reconciliation"]["created"], 3);
        assert_eq!(output["events"]["updated"], 4);
        assert_eq!(output["events"]["deleted"], 1);
        assert_eq!(output["events"]["failures"], json!([]));

        let markers = output["markers"].as_array().expect("markers");
        assert_eq!(markers.len(), 2);
        let farm = markers
            .iter()
            .find(|marker| marker["id"] == "minecraft:overworld - 10, 64, -5")
            .expect("farm marker");
        assert_eq!(farm["x"], json!([-5.0, 25.0]));
        assert_eq!(farm["fill"]["color"], "5ea918");

        let keep = markers
            .iter()
            .find(|marker| marker["id"] == "minecraft:overworld - -200, 70, 300")
            .expect("keep marker");
        let label = keep["label"].as_str().expect("label");
        assert!(label.contains("Alexandra.png"));
        assert!(label.contains("Ghost.png"));
        assert!(label.contains("Lake Spirit"));
        assert!(!label.contains("00000000-0000-0000-0000-0000000000c3"));
    }

    #[test]
    fn replayed_events_rename_and_destroy() {
        let destroyed = claim_json(100, STEVE, &[]);
        let output = run_replay(json!({
            "players": [
                { "id": STEVE, "name": "Steve", "online": true },
                { "id": ALEX, "name": "Alex" }
            ],
            "claims": [claim_json(0, STEVE, &[ALEX]), destroyed.clone()],
            "events": [
                { "event": "player_joined", "player": ALEX, "name": "Alexandra" },
                { "event": "claim_destroyed", "claim": destroyed },
                { "event": "claim_destroyed", "claim": destroyed }
            ]
        }));

        assert_eq!(output["events"]["events"], 3);
        assert_eq!(output["events"]["updated"], 1);
        assert_eq!(output["events"]["deleted"], 1);
        assert_eq!(output["events"]["unchanged"], 1);
        assert_eq!(output["events"]["failures"], json!([]));
        let markers = output["markers"].as_array().expect("markers");
        assert_eq!(markers.len(), 1);
        let label = markers[0]["label"].as_str().expect("label");
        assert!(label.contains("Alexandra.png"));
        assert!(!label.contains("/Alex.png"));
    }
}
