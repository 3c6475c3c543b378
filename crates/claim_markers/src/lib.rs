mod claim;
mod config;
mod events;
mod identity;
mod label;
pub mod memory;
mod names;
mod palette;
mod skin;
mod store;
mod sync;

pub use claim::{
    Augment, BlockPos, Claim, ClaimBox, ClaimRegistry, ClaimType, HeadTexture, HeadTextured,
    PlayerId, WorldId,
};
pub use config::{
    load_sync_config, parse_sync_config, ConfigError, LabelKeys, SyncConfig,
    DEFAULT_FACES_PATH, DEFAULT_MARKER_SET_ID, DEFAULT_MARKER_SET_LABEL,
};
pub use events::{EventSource, SyncEvent};
pub use identity::{claim_marker_id, marker_id, parse_marker_id};
pub use label::{LabelRenderer, LINE_BREAK};
pub use names::{resolve_name, NameObservation, PlayerDirectory, PlayerNameCache};
pub use palette::{origin_hash, Palette, Rgb, RgbParseError, DEFAULT_PALETTE};
pub use skin::{decode_skin_url, AvatarResolver, SkinError, TexturePayloadResolver};
pub use store::{
    AreaMarker, FillStyle, LineStyle, MarkerService, MarkerStoreAdapter, MarkerUpdate, StoreError,
};
pub use sync::{
    Collaborators, MarkerAction, MarkerOperation, SyncController, SyncError, SyncReport,
};
