use std::collections::VecDeque;
use std::sync::mpsc::Receiver;

use serde::{Deserialize, Serialize};

use crate::claim::{Claim, ClaimBox, PlayerId};

/// Claim lifecycle and player session events, in the order the host
/// delivered them. Events for one claim arrive created-first, destroyed-last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    ClaimCreated {
        claim: Claim,
    },
    ClaimResized {
        claim: Claim,
        old_box: ClaimBox,
        new_box: ClaimBox,
    },
    ClaimUpdated {
        claim: Claim,
    },
    ClaimDestroyed {
        claim: Claim,
    },
    PlayerJoined {
        player: PlayerId,
        name: String,
    },
}

impl SyncEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::ClaimCreated { .. } => "claim_created",
            SyncEvent::ClaimResized { .. } => "claim_resized",
            SyncEvent::ClaimUpdated { .. } => "claim_updated",
            SyncEvent::ClaimDestroyed { .. } => "claim_destroyed",
            SyncEvent::PlayerJoined { .. } => "player_joined",
        }
    }
}

/// Anything that hands the controller events one at a time.
pub trait EventSource {
    /// Next pending event, or `None` when nothing is waiting right now.
    fn poll_event(&mut self) -> Option<SyncEvent>;
}

impl EventSource for VecDeque<SyncEvent> {
    fn poll_event(&mut self) -> Option<SyncEvent> {
        self.pop_front()
    }
}

impl EventSource for Receiver<SyncEvent> {
    fn poll_event(&mut self) -> Option<SyncEvent> {
        self.try_recv().ok()
    }
}
