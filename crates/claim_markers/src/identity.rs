use crate::claim::{BlockPos, Claim, WorldId};

const WORLD_SEPARATOR: &str = " - ";

/// Marker id for the claim anchored at `origin` in `world`. Depends on
/// nothing else, so it survives restarts and metadata edits.
pub fn marker_id(world: &WorldId, origin: BlockPos) -> String {
    format!("{world}{WORLD_SEPARATOR}{}", origin.to_short_string())
}

pub fn claim_marker_id(claim: &Claim) -> String {
    marker_id(&claim.world, claim.origin)
}

/// Inverse of [`marker_id`]. Returns `None` for ids this crate did not mint.
pub fn parse_marker_id(id: &str) -> Option<(WorldId, BlockPos)> {
    let (world, coords) = id.rsplit_once(WORLD_SEPARATOR)?;
    if world.is_empty() {
        return None;
    }
    let mut parts = coords.split(", ").map(|part| part.parse::<i32>().ok());
    let x = parts.next()??;
    let y = parts.next()??;
    let z = parts.next()??;
    if parts.next().is_some() {
        return None;
    }
    Some((WorldId::new(world), BlockPos::new(x, y, z)))
}
