//! Post data structures: listing summaries, content segments and persisted records.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::Site;

/// Board-level identifier of a post: category plus post number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoardId {
    /// Site-specific sub-forum identifier
    pub category: String,

    /// Post number within the category
    #[serde(rename = "no")]
    pub number: u64,
}

/// Unique key of a post across all sites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostKey {
    pub site: Site,
    pub category: String,
    pub number: u64,
}

impl PostKey {
    pub fn new(site: Site, category: impl Into<String>, number: u64) -> Self {
        Self {
            site,
            category: category.into(),
            number,
        }
    }

    pub fn board_id(&self) -> BoardId {
        BoardId {
            category: self.category.clone(),
            number: self.number,
        }
    }
}

impl fmt::Display for PostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.site, self.category, self.number)
    }
}

/// A post as seen on a listing page, before its body is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSummary {
    pub key: PostKey,
    pub title: String,
    pub url: String,
    /// `None` when the listing timestamp could not be parsed
    pub created_at: Option<NaiveDateTime>,
    /// Position on a ranked listing (ygosu daily)
    pub rank: Option<u32>,
}

/// One typed unit of a normalized post body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentSegment {
    Text {
        content: String,
    },
    Image {
        /// Path relative to the media root
        path: String,
        #[serde(rename = "content")]
        extracted_text: Option<String>,
    },
    Video {
        path: String,
    },
}

impl ContentSegment {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Text carried by the segment, if any (OCR text for images).
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { content } => Some(content),
            Self::Image { extracted_text, .. } => extracted_text.as_deref(),
            Self::Video { .. } => None,
        }
    }
}

/// A persisted post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub site: Site,
    pub board_id: BoardId,
    pub title: String,
    pub url: String,
    pub create_time: Option<NaiveDateTime>,
    pub contents: Vec<ContentSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    /// Identifier of the enrichment document
    #[serde(rename = "gpt_answer")]
    pub enrichment_ref: String,
}

impl PostRecord {
    pub fn compose(
        summary: &PostSummary,
        contents: Vec<ContentSegment>,
        enrichment_ref: String,
    ) -> Self {
        Self {
            site: summary.key.site,
            board_id: summary.key.board_id(),
            title: summary.title.clone(),
            url: summary.url.clone(),
            create_time: summary.created_at,
            contents,
            rank: summary.rank,
            enrichment_ref,
        }
    }
}

/// Enrichment attached to a post, shared by every post with the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub board_id: BoardId,
    pub site: Site,
    pub answer: String,
    pub tag: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn segments_serialize_with_type_tag() {
        let segments = vec![
            ContentSegment::text("hello"),
            ContentSegment::Image {
                path: "dcinside/dcbest/1/a.png".to_string(),
                extracted_text: None,
            },
            ContentSegment::Video {
                path: "dcinside/dcbest/1/b.mp4".to_string(),
            },
        ];

        let value = serde_json::to_value(&segments).unwrap();
        assert_eq!(
            value,
            json!([
                {"type": "text", "content": "hello"},
                {"type": "image", "path": "dcinside/dcbest/1/a.png", "content": null},
                {"type": "video", "path": "dcinside/dcbest/1/b.mp4"}
            ])
        );
    }

    #[test]
    fn record_uses_board_id_object() {
        let summary = PostSummary {
            key: PostKey::new(Site::Theqoo, "hot", 42),
            title: "title".to_string(),
            url: "https://theqoo.net/hot/42".to_string(),
            created_at: None,
            rank: None,
        };
        let record = PostRecord::compose(&summary, Vec::new(), "abc".to_string());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["site"], "theqoo");
        assert_eq!(value["board_id"], json!({"category": "hot", "no": 42}));
        assert_eq!(value["gpt_answer"], "abc");
        assert!(value["create_time"].is_null());
        assert!(value.get("rank").is_none());
    }

    #[test]
    fn ranked_record_keeps_rank() {
        let summary = PostSummary {
            key: PostKey::new(Site::Ygosu, "best_article", 700),
            title: "top".to_string(),
            url: "https://ygosu.com/board/best_article/700/".to_string(),
            created_at: None,
            rank: Some(3),
        };
        let record = PostRecord::compose(&summary, Vec::new(), "abc".to_string());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["rank"], 3);

        let back: PostRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back.rank, Some(3));
    }

    #[test]
    fn key_display() {
        let key = PostKey::new(Site::Dcinside, "dcbest", 7);
        assert_eq!(key.to_string(), "dcinside/dcbest/7");
    }
}
