use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::claim::{Claim, ClaimBox, ClaimRegistry, PlayerId, WorldId};
use crate::config::SyncConfig;
use crate::events::{EventSource, SyncEvent};
use crate::identity::claim_marker_id;
use crate::label::LabelRenderer;
use crate::names::{NameObservation, PlayerDirectory, PlayerNameCache};
use crate::skin::AvatarResolver;
use crate::store::{
    AreaMarker, FillStyle, LineStyle, MarkerService, MarkerStoreAdapter, StoreError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOperation {
    Create,
    SetCorners,
    SetRangeY,
    SetLabel,
    SetFillStyle,
    SetLineStyle,
    Delete,
}

impl fmt::Display for MarkerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarkerOperation::Create => "create",
            MarkerOperation::SetCorners => "set_corners",
            MarkerOperation::SetRangeY => "set_range_y",
            MarkerOperation::SetLabel => "set_label",
            MarkerOperation::SetFillStyle => "set_fill_style",
            MarkerOperation::SetLineStyle => "set_line_style",
            MarkerOperation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// One marker-service call that failed for one claim.
#[derive(Debug, Clone, Error)]
#[error("marker {operation} failed for '{marker_id}': {source}")]
pub struct SyncError {
    pub marker_id: String,
    pub operation: MarkerOperation,
    #[source]
    pub source: StoreError,
}

impl SyncError {
    fn new(marker_id: &str, operation: MarkerOperation, source: StoreError) -> Self {
        Self {
            marker_id: marker_id.to_string(),
            operation,
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerAction {
    Created,
    Updated,
    Deleted,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub events: usize,
    pub claims_seen: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failures: Vec<SyncError>,
}

impl SyncReport {
    pub fn record(&mut self, result: Result<MarkerAction, SyncError>) {
        match result {
            Ok(MarkerAction::Created) => self.created += 1,
            Ok(MarkerAction::Updated) => self.updated += 1,
            Ok(MarkerAction::Deleted) => self.deleted += 1,
            Ok(MarkerAction::Unchanged) => self.unchanged += 1,
            Err(error) => self.failures.push(error),
        }
    }

    pub fn merge(&mut self, other: SyncReport) {
        self.events += other.events;
        self.claims_seen += other.claims_seen;
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.unchanged += other.unchanged;
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// External systems the controller reads from. Borrowed for the
/// controller's lifetime; the host owns them.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub registry: &'a dyn ClaimRegistry,
    pub directory: &'a dyn PlayerDirectory,
    pub avatars: &'a dyn AvatarResolver,
}

/// Keeps one area marker per live claim. Handles one event at a time and
/// always re-derives the desired marker from the claim, so a marker missing
/// from the service is recreated rather than treated as an error.
pub struct SyncController<'a, S> {
    markers: MarkerStoreAdapter<S>,
    collaborators: Collaborators<'a>,
    labels: LabelRenderer,
    names: PlayerNameCache,
    config: SyncConfig,
}

impl<'a, S: MarkerService> SyncController<'a, S> {
    pub fn new(
        service: S,
        collaborators: Collaborators<'a>,
        config: SyncConfig,
    ) -> Result<Self, StoreError> {
        let markers =
            MarkerStoreAdapter::open(service, &config.marker_set_id, &config.marker_set_label)?;
        Ok(Self {
            markers,
            collaborators,
            labels: LabelRenderer::from_config(&config),
            names: PlayerNameCache::new(),
            config,
        })
    }

    pub fn markers(&self) -> &MarkerStoreAdapter<S> {
        &self.markers
    }

    pub fn markers_mut(&mut self) -> &mut MarkerStoreAdapter<S> {
        &mut self.markers
    }

    pub fn names(&self) -> &PlayerNameCache {
        &self.names
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn into_service(self) -> S {
        self.markers.into_service()
    }

    /// Handles every event the source has ready, in order.
    pub fn drain(&mut self, source: &mut dyn EventSource) -> SyncReport {
        let mut report = SyncReport::default();
        while let Some(event) = source.poll_event() {
            report.merge(self.handle(&event));
        }
        report
    }

    pub fn handle(&mut self, event: &SyncEvent) -> SyncReport {
        let result = match event {
            SyncEvent::ClaimCreated { claim } => self.on_claim_created(claim),
            SyncEvent::ClaimResized { claim, new_box, .. } => {
                self.on_claim_resized(claim, *new_box)
            }
            SyncEvent::ClaimUpdated { claim } => self.on_claim_updated(claim),
            SyncEvent::ClaimDestroyed { claim } => self.on_claim_destroyed(claim),
            SyncEvent::PlayerJoined { player, name } => {
                let mut report = self.on_player_joined(*player, name);
                report.events = 1;
                return report;
            }
        };
        if let Err(error) = &result {
            log_failure(event.kind(), error);
        }
        let mut report = SyncReport {
            events: 1,
            claims_seen: 1,
            ..SyncReport::default()
        };
        report.record(result);
        report
    }

    pub fn on_claim_created(&mut self, claim: &Claim) -> Result<MarkerAction, SyncError> {
        match self.markers.find(&claim_marker_id(claim)) {
            None => self.create_marker(claim),
            Some(marker) => self.refresh_marker(marker, claim),
        }
    }

    /// Moves the marker to `new_box`; the event's box wins over the claim's.
    pub fn on_claim_resized(
        &mut self,
        claim: &Claim,
        new_box: ClaimBox,
    ) -> Result<MarkerAction, SyncError> {
        let marker_id = claim_marker_id(claim);
        let Some(mut marker) = self.markers.find(&marker_id) else {
            let mut resized = claim.clone();
            resized.bounds = new_box;
            return self.create_marker(&resized);
        };
        self.markers
            .set_corners(&mut marker, new_box.x_range(), new_box.z_range())
            .map_err(|source| SyncError::new(&marker_id, MarkerOperation::SetCorners, source))?;
        if self.config.include_y_range {
            self.markers
                .set_range_y(&mut marker, new_box.y_range())
                .map_err(|source| SyncError::new(&marker_id, MarkerOperation::SetRangeY, source))?;
        }
        self.apply_style(&mut marker, claim)?;
        debug!(marker_id = %marker_id, "claim_marker_resized");
        Ok(MarkerAction::Updated)
    }

    pub fn on_claim_updated(&mut self, claim: &Claim) -> Result<MarkerAction, SyncError> {
        let marker_id = claim_marker_id(claim);
        let Some(mut marker) = self.markers.find(&marker_id) else {
            return self.create_marker(claim);
        };
        let label = self.render_label(claim);
        let mut action = MarkerAction::Unchanged;
        if label != marker.label {
            self.markers
                .set_label(&mut marker, &label, true)
                .map_err(|source| SyncError::new(&marker_id, MarkerOperation::SetLabel, source))?;
            debug!(marker_id = %marker_id, "claim_marker_relabeled");
            action = MarkerAction::Updated;
        }
        if self.apply_style(&mut marker, claim)? == MarkerAction::Updated {
            action = MarkerAction::Updated;
        }
        Ok(action)
    }

    pub fn on_claim_destroyed(&mut self, claim: &Claim) -> Result<MarkerAction, SyncError> {
        let marker_id = claim_marker_id(claim);
        let Some(marker) = self.markers.find(&marker_id) else {
            return Ok(MarkerAction::Unchanged);
        };
        self.markers
            .delete(marker)
            .map_err(|source| SyncError::new(&marker_id, MarkerOperation::Delete, source))?;
        debug!(marker_id = %marker_id, "claim_marker_deleted");
        Ok(MarkerAction::Deleted)
    }

    /// Records the player's current name and, if it changed, swaps the old
    /// player block for the new one in every label that references them.
    pub fn on_player_joined(&mut self, player: PlayerId, name: &str) -> SyncReport {
        let mut report = SyncReport::default();
        let previous = match self.names.observe(player, name) {
            NameObservation::Unchanged => return report,
            NameObservation::New => None,
            NameObservation::Renamed { previous } => Some(previous),
        };

        let stale = StaleBlocks {
            player,
            previous_name: previous.as_deref().map(|name| self.labels.player_block(name)),
            unresolved: self.labels.unresolved_block(player),
        };
        let fresh_block = self.labels.player_block(name);

        let registry = self.collaborators.registry;
        for world in registry.worlds() {
            for claim in registry.claims_in(&world) {
                if !claim.references(player) {
                    continue;
                }
                report.claims_seen += 1;
                let result = self.patch_player_blocks(&claim, &stale, &fresh_block);
                if let Err(error) = &result {
                    log_failure("player_joined", error);
                }
                report.record(result);
            }
        }

        debug!(
            player = %player,
            name,
            previous = previous.as_deref().unwrap_or(""),
            claims = report.claims_seen,
            patched = report.updated,
            "player_name_observed"
        );
        report
    }

    /// Creates markers for every claim that lacks one and restores missing
    /// styles. Running it twice in a row changes nothing the second time.
    pub fn reconcile(&mut self) -> SyncReport {
        let mut report = SyncReport::default();
        let registry = self.collaborators.registry;
        for world in registry.worlds() {
            for claim in registry.claims_in(&world) {
                report.claims_seen += 1;
                let result = match self.markers.find(&claim_marker_id(&claim)) {
                    None => self.create_marker(&claim),
                    Some(mut marker) => self.apply_style(&mut marker, &claim),
                };
                if let Err(error) = &result {
                    log_failure("reconcile", error);
                }
                report.record(result);
            }
        }
        info!(
            marker_set = %self.markers.set_id(),
            claims_seen = report.claims_seen,
            created = report.created,
            restyled = report.updated,
            failed = report.failures.len(),
            "marker_reconciliation_finished"
        );
        report
    }

    fn create_marker(&mut self, claim: &Claim) -> Result<MarkerAction, SyncError> {
        let marker_id = claim_marker_id(claim);
        let label = self.render_label(claim);
        let world_name = self.world_name(&claim.world);
        let mut marker = self
            .markers
            .create(
                &marker_id,
                &label,
                &world_name,
                claim.bounds.x_range(),
                claim.bounds.z_range(),
                true,
            )
            .map_err(|source| SyncError::new(&marker_id, MarkerOperation::Create, source))?;
        if self.config.include_y_range {
            self.markers
                .set_range_y(&mut marker, claim.bounds.y_range())
                .map_err(|source| SyncError::new(&marker_id, MarkerOperation::SetRangeY, source))?;
        }
        self.apply_style(&mut marker, claim)?;
        debug!(marker_id = %marker_id, world = %claim.world, "claim_marker_created");
        Ok(MarkerAction::Created)
    }

    /// Brings an existing marker fully in line with the claim, issuing only
    /// the calls whose values differ.
    fn refresh_marker(
        &mut self,
        mut marker: AreaMarker,
        claim: &Claim,
    ) -> Result<MarkerAction, SyncError> {
        let mut changed = false;
        let (x, z) = (claim.bounds.x_range(), claim.bounds.z_range());
        if marker.x != x || marker.z != z {
            self.markers
                .set_corners(&mut marker, x, z)
                .map_err(|source| SyncError::new(&marker.id, MarkerOperation::SetCorners, source))?;
            changed = true;
        }
        let label = self.render_label(claim);
        if marker.label != label || !marker.markup {
            self.markers
                .set_label(&mut marker, &label, true)
                .map_err(|source| SyncError::new(&marker.id, MarkerOperation::SetLabel, source))?;
            changed = true;
        }
        if self.apply_style(&mut marker, claim)? == MarkerAction::Updated {
            changed = true;
        }
        Ok(if changed {
            MarkerAction::Updated
        } else {
            MarkerAction::Unchanged
        })
    }

    fn apply_style(
        &mut self,
        marker: &mut AreaMarker,
        claim: &Claim,
    ) -> Result<MarkerAction, SyncError> {
        let color = self.config.palette.claim_color(claim);
        let fill = FillStyle {
            opacity: self.config.fill_opacity,
            color,
        };
        let line = LineStyle {
            width: self.config.line_width,
            opacity: self.config.line_opacity,
            color,
        };
        let mut action = MarkerAction::Unchanged;
        if marker.fill != Some(fill) {
            self.markers
                .set_fill_style(marker, fill.opacity, fill.color)
                .map_err(|source| {
                    SyncError::new(&marker.id, MarkerOperation::SetFillStyle, source)
                })?;
            action = MarkerAction::Updated;
        }
        if marker.line != Some(line) {
            self.markers
                .set_line_style(marker, line.width, line.opacity, line.color)
                .map_err(|source| {
                    SyncError::new(&marker.id, MarkerOperation::SetLineStyle, source)
                })?;
            action = MarkerAction::Updated;
        }
        Ok(action)
    }

    /// Swaps the joining player's stale blocks for `fresh_block`. When the
    /// previous name shows up more often than the player is listed, another
    /// member carries that name now and the label is rendered from scratch.
    fn patch_player_blocks(
        &mut self,
        claim: &Claim,
        stale: &StaleBlocks,
        fresh_block: &str,
    ) -> Result<MarkerAction, SyncError> {
        let marker_id = claim_marker_id(claim);
        let Some(mut marker) = self.markers.find(&marker_id) else {
            return self.create_marker(claim);
        };
        let listed = usize::from(claim.owners.contains(&stale.player))
            + usize::from(claim.trusted.contains(&stale.player));
        let shared_name = stale
            .previous_name
            .as_deref()
            .is_some_and(|block| marker.label.matches(block).count() > listed);

        let label = if shared_name {
            debug!(marker_id = %marker_id, player = %stale.player, "claim_label_rerendered");
            self.render_label(claim)
        } else {
            let mut label = marker.label.clone();
            for block in stale.previous_name.iter().chain([&stale.unresolved]) {
                if label.contains(block.as_str()) {
                    label = label.replace(block.as_str(), fresh_block);
                }
            }
            label
        };
        if label == marker.label {
            return Ok(MarkerAction::Unchanged);
        }
        self.markers
            .set_label(&mut marker, &label, true)
            .map_err(|source| SyncError::new(&marker_id, MarkerOperation::SetLabel, source))?;
        Ok(MarkerAction::Updated)
    }

    fn render_label(&mut self, claim: &Claim) -> String {
        self.labels.render(
            claim,
            self.collaborators.directory,
            self.collaborators.avatars,
            &mut self.names,
        )
    }

    fn world_name(&self, world: &WorldId) -> String {
        self.collaborators
            .registry
            .world_name(world)
            .unwrap_or_else(|| self.config.fallback_world_name.clone())
    }
}

struct StaleBlocks {
    player: PlayerId,
    previous_name: Option<String>,
    unresolved: String,
}

fn log_failure(context: &'static str, error: &SyncError) {
    warn!(
        context,
        marker_id = %error.marker_id,
        operation = %error.operation,
        error = %error.source,
        "claim_marker_sync_failed"
    );
}
