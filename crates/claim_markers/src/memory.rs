//! In-process stand-ins for the claim registry, the player directory and the
//! marker service. The registry and directory use interior mutability so a
//! test or host can keep changing them while a controller borrows them.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::claim::{BlockPos, Claim, ClaimRegistry, PlayerId, WorldId};
use crate::names::PlayerDirectory;
use crate::store::{AreaMarker, MarkerService, MarkerUpdate, StoreError};

#[derive(Debug, Default)]
struct WorldClaims {
    name: Option<String>,
    claims: BTreeMap<BlockPos, Claim>,
}

#[derive(Debug, Default)]
pub struct InMemoryClaimRegistry {
    worlds: RefCell<BTreeMap<WorldId, WorldClaims>>,
}

impl InMemoryClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_world_name(&self, world: &WorldId, name: impl Into<String>) {
        self.worlds
            .borrow_mut()
            .entry(world.clone())
            .or_default()
            .name = Some(name.into());
    }

    /// Inserts or replaces the claim at its origin.
    pub fn insert(&self, claim: Claim) -> Option<Claim> {
        self.worlds
            .borrow_mut()
            .entry(claim.world.clone())
            .or_default()
            .claims
            .insert(claim.origin, claim)
    }

    pub fn remove(&self, world: &WorldId, origin: BlockPos) -> Option<Claim> {
        self.worlds
            .borrow_mut()
            .get_mut(world)
            .and_then(|entry| entry.claims.remove(&origin))
    }

    pub fn claim_count(&self) -> usize {
        self.worlds
            .borrow()
            .values()
            .map(|entry| entry.claims.len())
            .sum()
    }
}

impl ClaimRegistry for InMemoryClaimRegistry {
    fn worlds(&self) -> Vec<WorldId> {
        self.worlds.borrow().keys().cloned().collect()
    }

    fn claims_in(&self, world: &WorldId) -> Vec<Claim> {
        self.worlds
            .borrow()
            .get(world)
            .map(|entry| entry.claims.values().cloned().collect())
            .unwrap_or_default()
    }

    fn world_name(&self, world: &WorldId) -> Option<String> {
        self.worlds
            .borrow()
            .get(world)
            .and_then(|entry| entry.name.clone())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPlayerDirectory {
    online: RefCell<HashMap<PlayerId, String>>,
    profiles: RefCell<HashMap<PlayerId, String>>,
}

impl InMemoryPlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the player online under `name` and records the profile.
    pub fn set_online(&self, player: PlayerId, name: impl Into<String>) {
        let name = name.into();
        self.profiles.borrow_mut().insert(player, name.clone());
        self.online.borrow_mut().insert(player, name);
    }

    pub fn set_offline(&self, player: PlayerId) {
        self.online.borrow_mut().remove(&player);
    }

    pub fn remember_profile(&self, player: PlayerId, name: impl Into<String>) {
        self.profiles.borrow_mut().insert(player, name.into());
    }
}

impl PlayerDirectory for InMemoryPlayerDirectory {
    fn online_name(&self, player: PlayerId) -> Option<String> {
        self.online.borrow().get(&player).cloned()
    }

    fn cached_profile_name(&self, player: PlayerId) -> Option<String> {
        self.profiles.borrow().get(&player).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    CreateSet,
    Create,
    SetCorners,
    SetRangeY,
    SetLabel,
    SetFillStyle,
    SetLineStyle,
    Delete,
}

impl MutationKind {
    fn of(update: &MarkerUpdate) -> Self {
        match update {
            MarkerUpdate::Corners { .. } => MutationKind::SetCorners,
            MarkerUpdate::RangeY { .. } => MutationKind::SetRangeY,
            MarkerUpdate::Label { .. } => MutationKind::SetLabel,
            MarkerUpdate::Fill(_) => MutationKind::SetFillStyle,
            MarkerUpdate::Line(_) => MutationKind::SetLineStyle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerMutation {
    pub set_id: String,
    pub marker_id: Option<String>,
    pub kind: MutationKind,
}

#[derive(Debug, Default)]
struct MarkerSetState {
    label: String,
    markers: BTreeMap<String, AreaMarker>,
}

/// Marker service kept in memory. Records every successful mutation and can
/// be told to fail calls for chosen marker ids or update kinds.
#[derive(Debug, Default)]
pub struct InMemoryMarkerService {
    sets: BTreeMap<String, MarkerSetState>,
    mutations: Vec<MarkerMutation>,
    failing: HashSet<String>,
    failing_updates: HashSet<MutationKind>,
}

impl InMemoryMarkerService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mutations(&self) -> &[MarkerMutation] {
        &self.mutations
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.len()
    }

    pub fn count(&self, kind: MutationKind) -> usize {
        self.mutations
            .iter()
            .filter(|mutation| mutation.kind == kind)
            .count()
    }

    pub fn clear_mutations(&mut self) {
        self.mutations.clear();
    }

    pub fn marker_set_label(&self, set_id: &str) -> Option<&str> {
        self.sets.get(set_id).map(|set| set.label.as_str())
    }

    pub fn markers(&self, set_id: &str) -> Vec<&AreaMarker> {
        self.sets
            .get(set_id)
            .map(|set| set.markers.values().collect())
            .unwrap_or_default()
    }

    /// Drops a marker without going through the mutation log, as if someone
    /// edited the map service by hand.
    pub fn remove_out_of_band(&mut self, set_id: &str, marker_id: &str) -> Option<AreaMarker> {
        self.sets
            .get_mut(set_id)
            .and_then(|set| set.markers.remove(marker_id))
    }

    pub fn fail_marker(&mut self, marker_id: impl Into<String>) {
        self.failing.insert(marker_id.into());
    }

    pub fn heal_marker(&mut self, marker_id: &str) {
        self.failing.remove(marker_id);
    }

    /// Makes every update of `kind` fail until [`Self::heal_updates`].
    pub fn fail_updates(&mut self, kind: MutationKind) {
        self.failing_updates.insert(kind);
    }

    pub fn heal_updates(&mut self, kind: MutationKind) {
        self.failing_updates.remove(&kind);
    }

    fn check_available(&self, marker_id: &str) -> Result<(), StoreError> {
        if self.failing.contains(marker_id) {
            return Err(StoreError::Unavailable {
                message: format!("injected failure for '{marker_id}'"),
            });
        }
        Ok(())
    }

    fn set_mut(&mut self, set_id: &str) -> Result<&mut MarkerSetState, StoreError> {
        self.sets
            .get_mut(set_id)
            .ok_or_else(|| StoreError::MarkerSetMissing {
                set_id: set_id.to_string(),
            })
    }

    fn record(&mut self, set_id: &str, marker_id: Option<&str>, kind: MutationKind) {
        self.mutations.push(MarkerMutation {
            set_id: set_id.to_string(),
            marker_id: marker_id.map(ToString::to_string),
            kind,
        });
    }
}

impl MarkerService for InMemoryMarkerService {
    fn has_marker_set(&self, set_id: &str) -> bool {
        self.sets.contains_key(set_id)
    }

    fn create_marker_set(&mut self, set_id: &str, label: &str) -> Result<(), StoreError> {
        self.sets.entry(set_id.to_string()).or_insert_with(|| MarkerSetState {
            label: label.to_string(),
            markers: BTreeMap::new(),
        });
        self.record(set_id, None, MutationKind::CreateSet);
        Ok(())
    }

    fn find_area_marker(&self, set_id: &str, marker_id: &str) -> Option<AreaMarker> {
        self.sets.get(set_id)?.markers.get(marker_id).cloned()
    }

    fn create_area_marker(
        &mut self,
        set_id: &str,
        marker: AreaMarker,
    ) -> Result<AreaMarker, StoreError> {
        self.check_available(&marker.id)?;
        let set = self.set_mut(set_id)?;
        if set.markers.contains_key(&marker.id) {
            return Err(StoreError::MarkerExists {
                set_id: set_id.to_string(),
                marker_id: marker.id,
            });
        }
        set.markers.insert(marker.id.clone(), marker.clone());
        self.record(set_id, Some(&marker.id), MutationKind::Create);
        Ok(marker)
    }

    fn update_area_marker(
        &mut self,
        set_id: &str,
        marker_id: &str,
        update: MarkerUpdate,
    ) -> Result<(), StoreError> {
        self.check_available(marker_id)?;
        let kind = MutationKind::of(&update);
        if self.failing_updates.contains(&kind) {
            return Err(StoreError::Unavailable {
                message: format!("injected {kind:?} failure for '{marker_id}'"),
            });
        }
        let marker = self
            .set_mut(set_id)?
            .markers
            .get_mut(marker_id)
            .ok_or_else(|| StoreError::MarkerMissing {
                set_id: set_id.to_string(),
                marker_id: marker_id.to_string(),
            })?;
        marker.apply(&update);
        self.record(set_id, Some(marker_id), kind);
        Ok(())
    }

    fn delete_area_marker(&mut self, set_id: &str, marker_id: &str) -> Result<(), StoreError> {
        self.check_available(marker_id)?;
        let removed = self.set_mut(set_id)?.markers.remove(marker_id);
        if removed.is_none() {
            return Err(StoreError::MarkerMissing {
                set_id: set_id.to_string(),
                marker_id: marker_id.to_string(),
            });
        }
        self.record(set_id, Some(marker_id), MutationKind::Delete);
        Ok(())
    }
}
