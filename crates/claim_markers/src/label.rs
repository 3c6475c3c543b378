use std::collections::BTreeSet;

use tracing::debug;

use crate::claim::{Claim, HeadTextured, PlayerId};
use crate::config::{LabelKeys, SyncConfig};
use crate::names::{resolve_name, PlayerDirectory, PlayerNameCache};
use crate::skin::{AvatarResolver, SkinError};

pub const LINE_BREAK: &str = "<br>";

/// Builds the markup label shown on a claim's marker. The markup is what
/// the map viewer's stylesheet expects, so string shapes here are fixed.
#[derive(Debug, Clone)]
pub struct LabelRenderer {
    keys: LabelKeys,
    faces_path: String,
}

impl LabelRenderer {
    pub fn new(keys: LabelKeys, faces_path: impl Into<String>) -> Self {
        Self {
            keys,
            faces_path: faces_path.into(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.label_keys.clone(), config.faces_path.clone())
    }

    pub fn render(
        &self,
        claim: &Claim,
        directory: &dyn PlayerDirectory,
        avatars: &dyn AvatarResolver,
        names: &mut PlayerNameCache,
    ) -> String {
        let mut lines = Vec::with_capacity(4);
        lines.push(label_line(
            &self.keys.claim_type,
            &value_div(&head_block(&claim.claim_type, avatars)),
            false,
        ));

        for (key, group) in [
            (&self.keys.owners, &claim.owners),
            (&self.keys.trusted, &claim.trusted),
        ] {
            if let Some(line) = self.players_line(key, group, directory, names) {
                lines.push(line);
            }
        }

        if claim.has_augments() {
            let values: String = claim
                .augments
                .values()
                .map(|augment| value_div(&head_block(augment, avatars)))
                .collect();
            lines.push(label_line(&self.keys.augments, &values, true));
        }

        lines.join(LINE_BREAK)
    }

    /// Block for a player whose name is known.
    pub fn player_block(&self, name: &str) -> String {
        value_div(&format!(
            "<img src=\"{}/{name}.png\">{name}",
            self.faces_path
        ))
    }

    /// Block for a player neither the session list nor the profile cache knew.
    pub fn unresolved_block(&self, player: PlayerId) -> String {
        value_div(&player.to_string())
    }

    fn players_line(
        &self,
        key: &str,
        players: &BTreeSet<PlayerId>,
        directory: &dyn PlayerDirectory,
        names: &mut PlayerNameCache,
    ) -> Option<String> {
        if players.is_empty() {
            return None;
        }
        let values: String = players
            .iter()
            .map(|&player| match resolve_name(directory, names, player) {
                Some(name) => self.player_block(&name),
                None => self.unresolved_block(player),
            })
            .collect();
        Some(label_line(key, &values, true))
    }
}

fn head_block(item: &dyn HeadTextured, avatars: &dyn AvatarResolver) -> String {
    match avatars.head_url(item.head_texture()) {
        Ok(src) => format!("{}{}", head_image(&src), item.display_name()),
        Err(SkinError::NoTexture) => item.display_name().to_string(),
        Err(error) => {
            debug!(name = item.display_name(), error = %error, "head_texture_unreadable");
            item.display_name().to_string()
        }
    }
}

fn label_line(key: &str, value: &str, wrap: bool) -> String {
    let wrap = if wrap { "" } else { "no" };
    format!(
        "<div style=\"display:flex;align-items:center;flex-wrap:{wrap}wrap;gap:2%;text-wrap:nowrap\"><b>{key}:</b>{value}</div>"
    )
}

fn value_div(content: &str) -> String {
    format!(
        "<div style=\"display:flex;align-items:center;gap:2%;flex-grow:1;text-wrap:nowrap\">{content}</div>"
    )
}

/// 16px crop of the face region of a skin texture.
fn head_image(src: &str) -> String {
    format!(
        "<div style=\"min-width:16px;width:16px;height:16px;overflow:hidden;background-image:url({src});background-repeat:no-repeat;background-position:-16px -16px\"><img src=\"{src}\" style=\"width:128px;height:128px;margin-top:-16px;margin-left:-48px\"></div>"
    )
}
