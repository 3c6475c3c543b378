use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

use crate::claim::HeadTexture;

#[derive(Debug, Error)]
pub enum SkinError {
    #[error("no head texture attached")]
    NoTexture,
    #[error("texture payload is not valid base64: {0}")]
    Base64(#[source] base64::DecodeError),
    #[error("texture payload is not utf-8: {0}")]
    Utf8(#[source] std::string::FromUtf8Error),
    #[error("texture payload is not valid json: {0}")]
    Json(#[source] serde_json::Error),
    #[error("texture payload has no textures.SKIN.url")]
    MissingUrl,
}

/// Turns a head texture into an image URL the map viewer can load.
pub trait AvatarResolver {
    fn head_url(&self, texture: &HeadTexture) -> Result<String, SkinError>;
}

/// Decodes game-profile texture properties locally; no network access.
#[derive(Debug, Default, Clone, Copy)]
pub struct TexturePayloadResolver;

impl AvatarResolver for TexturePayloadResolver {
    fn head_url(&self, texture: &HeadTexture) -> Result<String, SkinError> {
        match texture {
            HeadTexture::None => Err(SkinError::NoTexture),
            HeadTexture::Url(url) if url.trim().is_empty() => Err(SkinError::MissingUrl),
            HeadTexture::Url(url) => Ok(url.trim().to_string()),
            HeadTexture::Encoded(payload) => decode_skin_url(payload),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TexturePayload {
    #[serde(default)]
    textures: Option<TextureSet>,
}

#[derive(Debug, Deserialize)]
struct TextureSet {
    #[serde(rename = "SKIN", default)]
    skin: Option<SkinTexture>,
}

#[derive(Debug, Deserialize)]
struct SkinTexture {
    #[serde(default)]
    url: Option<String>,
}

/// Extracts `textures.SKIN.url` from a base64 texture property.
pub fn decode_skin_url(payload: &str) -> Result<String, SkinError> {
    let compact: String = payload.chars().filter(|ch| !ch.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact.as_bytes()).map_err(SkinError::Base64)?;
    let text = String::from_utf8(bytes).map_err(SkinError::Utf8)?;
    let parsed: TexturePayload = serde_json::from_str(&text).map_err(SkinError::Json)?;
    parsed
        .textures
        .and_then(|textures| textures.skin)
        .and_then(|skin| skin.url)
        .filter(|url| !url.is_empty())
        .ok_or(SkinError::MissingUrl)
}

#[cfg(test)]
pub(crate) fn encode_skin_payload(url: &str) -> String {
    let json = serde_json::json!({ "textures": { "SKIN": { "url": url } } });
    STANDARD.encode(json.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_skin_url_from_profile_property() {
        let payload = encode_skin_payload("http://textures.minecraft.net/texture/abc");
        assert_eq!(
            decode_skin_url(&payload).expect("url"),
            "http://textures.minecraft.net/texture/abc"
        );
    }

    #[test]
    fn tolerates_wrapped_payload_lines() {
        let payload = encode_skin_payload("http://textures.minecraft.net/texture/def");
        let (head, tail) = payload.split_at(10);
        let wrapped = format!("{head}\n  {tail}\n");
        assert!(decode_skin_url(&wrapped).is_ok());
    }

    #[test]
    fn malformed_payloads_report_the_failing_stage() {
        assert!(matches!(
            decode_skin_url("%%% not base64 %%%"),
            Err(SkinError::Base64(_))
        ));
        assert!(matches!(
            decode_skin_url(&STANDARD.encode("{not json")),
            Err(SkinError::Json(_))
        ));
        assert!(matches!(
            decode_skin_url(&STANDARD.encode(r#"{"textures":{}}"#)),
            Err(SkinError::MissingUrl)
        ));
        assert!(matches!(
            decode_skin_url(&STANDARD.encode([0xff, 0xfe, 0x00])),
            Err(SkinError::Utf8(_))
        ));
    }

    #[test]
    fn resolver_passes_urls_through_and_rejects_missing_textures() {
        let resolver = TexturePayloadResolver;
        assert_eq!(
            resolver
                .head_url(&HeadTexture::Url("http://skins/a.png".to_string()))
                .expect("url"),
            "http://skins/a.png"
        );
        assert!(matches!(
            resolver.head_url(&HeadTexture::None),
            Err(SkinError::NoTexture)
        ));
    }
}
