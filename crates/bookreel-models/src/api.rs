//! Request/response payloads of the stage endpoints.
//!
//! Request fields are optional at the decoding layer so that missing input
//! is reported by stage validation with a readable message instead of a
//! generic JSON rejection.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::content::{Artifact, Character, Scene};

/// `POST /api/generate-screenplay`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScreenplayRequest {
    /// Book title (`bookTitle` is accepted as well)
    #[serde(default, alias = "bookTitle")]
    pub title: Option<String>,
}

impl ScreenplayRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScreenplayResponse {
    pub screenplay: String,
}

/// `POST /api/generate-characters`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CharactersRequest {
    #[serde(default, rename = "bookTitle", alias = "title")]
    pub book_title: Option<String>,
    #[serde(default)]
    pub screenplay: Option<String>,
}

impl CharactersRequest {
    pub fn new(book_title: impl Into<String>, screenplay: impl Into<String>) -> Self {
        Self {
            book_title: Some(book_title.into()),
            screenplay: Some(screenplay.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CharactersResponse {
    pub characters: Vec<Character>,
}

/// `POST /api/generate-scenes`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScenesRequest {
    #[serde(default)]
    pub screenplay: Option<String>,
}

impl ScenesRequest {
    pub fn new(screenplay: impl Into<String>) -> Self {
        Self {
            screenplay: Some(screenplay.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScenesResponse {
    pub scenes: Vec<Scene>,
}

/// `POST /api/assemble-movie`
///
/// `scenes` is kept as raw JSON so "missing" and "not a sequence" can be
/// told apart during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AssembleRequest {
    #[serde(default)]
    pub scenes: Option<serde_json::Value>,
    #[serde(default)]
    pub title: Option<String>,
}

impl AssembleRequest {
    pub fn new(scenes: &[Scene], title: impl Into<String>) -> serde_json::Result<Self> {
        Ok(Self {
            scenes: Some(serde_json::to_value(scenes)?),
            title: Some(title.into()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AssembleResponse {
    #[serde(flatten)]
    pub artifact: Artifact,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screenplay_request_accepts_both_field_names() {
        let a: ScreenplayRequest = serde_json::from_str(r#"{"title":"1984"}"#).unwrap();
        let b: ScreenplayRequest = serde_json::from_str(r#"{"bookTitle":"1984"}"#).unwrap();
        let empty: ScreenplayRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(a.title.as_deref(), Some("1984"));
        assert_eq!(b.title.as_deref(), Some("1984"));
        assert!(empty.title.is_none());
    }

    #[test]
    fn test_characters_request_wire_name() {
        let json = serde_json::to_value(CharactersRequest::new("Dune", "text")).unwrap();
        assert_eq!(json["bookTitle"], "Dune");
        assert_eq!(json["screenplay"], "text");
    }

    #[test]
    fn test_assemble_request_keeps_raw_scenes() {
        let req: AssembleRequest =
            serde_json::from_str(r#"{"scenes":"not a list","title":"x"}"#).unwrap();
        assert!(req.scenes.as_ref().is_some_and(|s| !s.is_array()));
    }

    #[test]
    fn test_assemble_response_is_flat() {
        let response = AssembleResponse {
            artifact: Artifact {
                video_url: "data:text/plain;base64,AA==".to_string(),
                scene_count: 8,
                duration_secs: 240,
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["videoUrl"], "data:text/plain;base64,AA==");
        assert_eq!(json["durationSecs"], 240);
    }
}
