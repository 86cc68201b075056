//! Ad creative payloads (`object_story_spec` with link or video data).

use serde::{Deserialize, Serialize};

use crate::models::ids::{ImageHash, PageId, VideoId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeSpec {
    pub name: String,
    pub object_story_spec: ObjectStorySpec,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStorySpec {
    pub page_id: PageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_data: Option<LinkData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_data: Option<VideoData>,
}

/// Image (link) ad content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkData {
    pub image_hash: ImageHash,
    pub link: String,
    pub message: String,
    /// Headline.
    pub name: String,
    pub description: String,
    pub call_to_action: CallToAction,
}

/// Video ad content; `image_hash` is the thumbnail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoData {
    pub video_id: VideoId,
    pub title: String,
    pub message: String,
    pub link_description: String,
    pub image_hash: ImageHash,
    pub call_to_action: CallToAction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: CallToActionValue,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToActionValue {
    pub link: String,
}

impl CallToAction {
    /// `kind` is trimmed and upper-cased, so `learn_more` becomes `LEARN_MORE`.
    pub fn new(kind: &str, link: &str) -> Self {
        Self {
            kind: kind.trim().to_uppercase(),
            value: CallToActionValue {
                link: link.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_to_action_serializes_type_key() {
        let cta = CallToAction::new(" learn_more", "https://example.com");
        let json = serde_json::to_value(&cta).unwrap();
        assert_eq!(json["type"], "LEARN_MORE");
        assert_eq!(json["value"]["link"], "https://example.com");
    }

    #[test]
    fn story_spec_omits_absent_variant() {
        let spec = ObjectStorySpec {
            page_id: PageId::new("pg_42"),
            link_data: None,
            video_data: None,
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json, serde_json::json!({"page_id": "42"}));
    }
}
