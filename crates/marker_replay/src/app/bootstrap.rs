use std::env;
use std::path::PathBuf;

use claim_markers::{load_sync_config, SyncConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::runner::ReplayError;
use super::snapshot::{load_snapshot, WorldSnapshot};

pub(crate) const CONFIG_ENV_VAR: &str = "CLAIM_MARKERS_CONFIG";
pub(crate) const SNAPSHOT_ENV_VAR: &str = "CLAIM_MARKERS_SNAPSHOT";

pub(crate) struct AppWiring {
    pub(crate) config: SyncConfig,
    pub(crate) snapshot: WorldSnapshot,
}

pub(crate) fn build_app() -> Result<AppWiring, ReplayError> {
    init_tracing();
    info!("=== claim marker replay ===");

    let config = match env_path(CONFIG_ENV_VAR) {
        Some(path) => {
            info!(path = %path.display(), "sync_config_loading");
            load_sync_config(&path)?
        }
        None => SyncConfig::default(),
    };
    let snapshot_path = env_path(SNAPSHOT_ENV_VAR).ok_or(ReplayError::SnapshotNotSet {
        env_var: SNAPSHOT_ENV_VAR,
    })?;
    let snapshot = load_snapshot(&snapshot_path)?;
    info!(
        path = %snapshot_path.display(),
        worlds = snapshot.worlds.len(),
        claims = snapshot.claims.len(),
        events = snapshot.events.len(),
        "world_snapshot_loaded"
    );

    Ok(AppWiring { config, snapshot })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
}
