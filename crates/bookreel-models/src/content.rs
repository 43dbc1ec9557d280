//! Stage artifacts.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default per-scene duration used for the movie length estimate.
pub const DEFAULT_SECONDS_PER_SCENE: u32 = 30;

/// A member of the cast produced by the characters stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Character {
    pub name: String,
    pub role: String,
    pub description: String,
}

impl Character {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            description: description.into(),
        }
    }
}

/// A visual scene produced by the scenes stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// 1-based position in the movie
    pub number: u32,
    pub description: String,
    /// Spoken line, may be empty
    #[serde(default)]
    pub dialogue: String,
    /// Prompt for the image model that would render this scene
    #[serde(rename = "imagePrompt")]
    pub image_prompt: String,
}

/// Reference to the assembled movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Artifact {
    /// Locator of the produced file
    #[serde(rename = "videoUrl")]
    pub video_url: String,
    #[serde(rename = "sceneCount")]
    pub scene_count: u32,
    /// Estimated running time
    #[serde(rename = "durationSecs")]
    pub duration_secs: u32,
}

/// Scene list that breaks the numbering contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneSequenceError {
    #[error("scene list is empty")]
    Empty,

    #[error("scene at position {position} is numbered {found}, expected {expected}")]
    Numbering {
        position: usize,
        expected: u32,
        found: u32,
    },
}

/// Check that scenes are numbered `1..=N` with no gaps or repeats.
pub fn validate_scene_sequence(scenes: &[Scene]) -> Result<(), SceneSequenceError> {
    if scenes.is_empty() {
        return Err(SceneSequenceError::Empty);
    }
    for (position, scene) in scenes.iter().enumerate() {
        let expected = position as u32 + 1;
        if scene.number != expected {
            return Err(SceneSequenceError::Numbering {
                position,
                expected,
                found: scene.number,
            });
        }
    }
    Ok(())
}

/// Movie length estimate: scene count times the per-scene duration.
pub fn estimated_duration_secs(scene_count: usize, seconds_per_scene: u32) -> u32 {
    (scene_count as u32).saturating_mul(seconds_per_scene)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(number: u32) -> Scene {
        Scene {
            number,
            description: format!("scene {}", number),
            dialogue: String::new(),
            image_prompt: "wide shot".to_string(),
        }
    }

    #[test]
    fn test_contiguous_scenes_pass() {
        let scenes: Vec<Scene> = (1..=8).map(scene).collect();
        assert!(validate_scene_sequence(&scenes).is_ok());
    }

    #[test]
    fn test_scene_numbering_errors() {
        assert_eq!(validate_scene_sequence(&[]), Err(SceneSequenceError::Empty));

        let gap = vec![scene(1), scene(3)];
        assert_eq!(
            validate_scene_sequence(&gap),
            Err(SceneSequenceError::Numbering {
                position: 1,
                expected: 2,
                found: 3
            })
        );

        let zero_based = vec![scene(0), scene(1)];
        assert!(validate_scene_sequence(&zero_based).is_err());

        let repeat = vec![scene(1), scene(1)];
        assert!(validate_scene_sequence(&repeat).is_err());
    }

    #[test]
    fn test_duration_estimate() {
        assert_eq!(estimated_duration_secs(8, DEFAULT_SECONDS_PER_SCENE), 240);
        assert_eq!(estimated_duration_secs(3, 10), 30);
        assert_eq!(estimated_duration_secs(0, 30), 0);
    }

    #[test]
    fn test_scene_wire_format() {
        let json = serde_json::to_value(scene(2)).unwrap();
        assert_eq!(json["number"], 2);
        assert_eq!(json["imagePrompt"], "wide shot");

        // dialogue may be omitted by producers
        let parsed: Scene = serde_json::from_str(
            r#"{"number":1,"description":"d","imagePrompt":"p"}"#,
        )
        .unwrap();
        assert_eq!(parsed.dialogue, "");
    }
}
