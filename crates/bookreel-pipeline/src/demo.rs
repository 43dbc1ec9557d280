//! Static demo content provider.
//!
//! Returns canned text for every stage. Screenplays are looked up by the
//! lowercased title and fall back to the default template, which carries
//! the title in its header and closing credits.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bookreel_models::{Character, Scene};

use crate::error::ProviderResult;
use crate::provider::ContentProvider;

/// Placeholder replaced with the uppercased title.
const TITLE_UPPER: &str = "{TITLE_UPPER}";
/// Placeholder replaced with the title as given.
const TITLE: &str = "{TITLE}";

const DEFAULT_SCREENPLAY: &str = r#"ADAPTATION: {TITLE_UPPER}

SCENE 1 - THE BEGINNING
INT. MAIN LOCATION - DAY

The camera slowly opens up the world of the story. We find the hero at the moment that will change their life forever.

HERO
(thoughtfully)
This is where my journey begins.

SCENE 2 - MEETING THE MENTOR
EXT. MYSTERIOUS PLACE - EVENING

A wise mentor appears, ready to show the hero the true nature of their world.

MENTOR
Are you ready to learn the truth?

HERO
I have always been ready.

SCENE 3 - THE TRIAL
EXT. DANGEROUS TERRITORY - DAY

The hero faces the first real test. Tension peaks.

HERO
(resolutely)
I will not back down!

SCENE 4 - DARK NIGHT OF THE SOUL
INT. HIDEOUT - NIGHT

A moment of despair. The hero loses hope and doubts their strength.

HERO
(in pain)
Maybe I'm not the one they need...

SCENE 5 - REBIRTH
EXT. PLACE OF POWER - DAWN

The hero finds the strength to go on. The music swells.

HERO
(with new resolve)
I know what I have to do.

SCENE 6 - THE FINAL BATTLE
EXT. CLIMACTIC LOCATION - DAY

An epic confrontation. Everything is at stake.

HERO
This is the end of your tyranny!

ANTAGONIST
You understand nothing!

SCENE 7 - RESOLUTION
EXT. PEACEFUL LOCATION - SUNSET

The world is restored. The hero has changed and grown.

HERO
(reflecting)
This was only the beginning of a new story.

THE END

CREDITS
Based on "{TITLE}""#;

/// Screenplay templates keyed by lowercased title.
const SCREENPLAY_TEMPLATES: &[(&str, &str)] = &[("default", DEFAULT_SCREENPLAY)];

/// Archetypal cast: (name, role, description).
const CAST: &[(&str, &str, &str)] = &[
    (
        "The Hero",
        "Protagonist",
        "Brave and determined, transformed over the story from an ordinary person into a hero. Fights both inner demons and outside enemies.",
    ),
    (
        "The Mentor",
        "Wise teacher",
        "Experienced and wise, guides the hero along the way. Knows the ancient secrets of the world.",
    ),
    (
        "The Antagonist",
        "Main villain",
        "A powerful adversary with motives and a philosophy of their own. Embodies the dark side and the challenge the hero must overcome.",
    ),
    (
        "The Ally",
        "Loyal friend",
        "The hero's devoted companion through the hardest moments. Brings lightness and humanity to the story.",
    ),
    (
        "The Mysterious Figure",
        "Catalyst",
        "An enigmatic character whose actions set the chain of events in motion. Their true intentions are revealed only at the end.",
    ),
];

/// Scene breakdown: (description, dialogue, image prompt).
const SCENE_BEATS: &[(&str, &str, &str)] = &[
    (
        "Opening shot: a panoramic view of the story's world that sets the mood",
        "The start of a great journey...",
        "cinematic wide shot of epic landscape, dramatic lighting, movie opening scene",
    ),
    (
        "We meet the hero in their ordinary life, before the adventure begins",
        "This was me, before everything changed",
        "close-up portrait of main character, thoughtful expression, cinematic lighting",
    ),
    (
        "Meeting the mentor, or the call to adventure",
        "Your destiny is calling",
        "two characters meeting, mysterious atmosphere, dramatic shadows",
    ),
    (
        "The first trial, or a brush with danger",
        "There is no way back!",
        "action scene, dynamic movement, intense lighting, cinematic angle",
    ),
    (
        "A moment of doubt and inner struggle",
        "Can I really do this?",
        "character in darkness, contemplative mood, emotional lighting",
    ),
    (
        "Finding the strength and resolve to carry on",
        "I am ready to meet my fate",
        "hero standing tall, empowering pose, sunrise lighting, epic composition",
    ),
    (
        "The climactic battle, the final confrontation",
        "Everything is decided now!",
        "epic battle scene, dynamic action, dramatic lighting, wide cinematic shot",
    ),
    (
        "The conflict resolves and a new beginning dawns",
        "This is only the beginning...",
        "peaceful ending scene, sunset, character looking toward horizon, hopeful mood",
    ),
];

/// Demo provider returning fixed content.
#[derive(Debug, Clone, Default)]
pub struct StaticContentProvider;

impl StaticContentProvider {
    pub fn new() -> Self {
        Self
    }

    fn template_for(title: &str) -> &'static str {
        let key = title.to_lowercase();
        SCREENPLAY_TEMPLATES
            .iter()
            .find(|(name, _)| *name == key)
            .or_else(|| SCREENPLAY_TEMPLATES.iter().find(|(name, _)| *name == "default"))
            .map(|(_, template)| *template)
            .unwrap_or(DEFAULT_SCREENPLAY)
    }

    /// Plain-text stand-in for the rendered movie.
    fn movie_summary(title: &str, scenes: &[Scene], duration_secs: u32) -> String {
        let scene_lines: Vec<String> = scenes
            .iter()
            .map(|s| format!("Scene {}: {}", s.number, s.description))
            .collect();

        format!(
            "MOVIE: {}\nScenes: {}\nEstimated running time: {} seconds\n\n\
             The full version would include:\n\
             - a rendered visual for every scene\n\
             - voiced dialogue\n\
             - a musical score\n\
             - professional editing\n\n\
             Scenes:\n{}",
            title,
            scenes.len(),
            duration_secs,
            scene_lines.join("\n")
        )
    }
}

#[async_trait]
impl ContentProvider for StaticContentProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn screenplay(&self, title: &str) -> ProviderResult<String> {
        Ok(Self::template_for(title)
            .replace(TITLE_UPPER, &title.to_uppercase())
            .replace(TITLE, title))
    }

    async fn characters(&self, _title: &str, _screenplay: &str) -> ProviderResult<Vec<Character>> {
        Ok(CAST
            .iter()
            .map(|(name, role, description)| Character::new(*name, *role, *description))
            .collect())
    }

    async fn scenes(&self, _screenplay: &str) -> ProviderResult<Vec<Scene>> {
        Ok(SCENE_BEATS
            .iter()
            .enumerate()
            .map(|(i, (description, dialogue, prompt))| Scene {
                number: i as u32 + 1,
                description: description.to_string(),
                dialogue: dialogue.to_string(),
                image_prompt: prompt.to_string(),
            })
            .collect())
    }

    async fn assemble(&self, title: &str, scenes: &[Scene], duration_secs: u32) -> ProviderResult<String> {
        let summary = Self::movie_summary(title, scenes, duration_secs);
        Ok(format!("data:text/plain;base64,{}", STANDARD.encode(summary)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use bookreel_models::validate_scene_sequence;

    #[test]
    fn test_screenplay_substitutes_title() {
        tokio_test::block_on(async {
            let provider = StaticContentProvider::new();
            let screenplay = provider.screenplay("Brave New World").await.unwrap();
            assert!(screenplay.starts_with("ADAPTATION: BRAVE NEW WORLD"));
            assert!(screenplay.ends_with("Based on \"Brave New World\""));
            assert!(!screenplay.contains(TITLE));
            assert!(!screenplay.contains(TITLE_UPPER));
        });
    }

    #[test]
    fn test_unknown_titles_share_the_default_template() {
        tokio_test::block_on(async {
            let provider = StaticContentProvider::new();
            let a = provider.screenplay("Dune").await.unwrap();
            let b = provider.screenplay("Emma").await.unwrap();
            assert_eq!(a.replace("DUNE", "").replace("Dune", ""), b.replace("EMMA", "").replace("Emma", ""));
        });
    }

    #[test]
    fn test_fixed_cast_has_unique_names() {
        tokio_test::block_on(async {
            let cast = StaticContentProvider::new().characters("1984", "text").await.unwrap();
            assert_eq!(cast.len(), 5);
            let names: HashSet<_> = cast.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names.len(), 5);
        });
    }

    #[test]
    fn test_scenes_are_numbered_one_to_eight() {
        tokio_test::block_on(async {
            let scenes = StaticContentProvider::new().scenes("text").await.unwrap();
            assert_eq!(scenes.len(), 8);
            assert!(validate_scene_sequence(&scenes).is_ok());
            assert!(scenes.iter().all(|s| !s.image_prompt.is_empty()));
        });
    }

    #[test]
    fn test_assembled_locator_is_a_text_data_url() {
        tokio_test::block_on(async {
            let provider = StaticContentProvider::new();
            let scenes = provider.scenes("text").await.unwrap();
            let url = provider.assemble("1984", &scenes, 240).await.unwrap();

            let payload = url.strip_prefix("data:text/plain;base64,").unwrap();
            let decoded = String::from_utf8(STANDARD.decode(payload).unwrap()).unwrap();
            assert!(decoded.starts_with("MOVIE: 1984"));
            assert!(decoded.contains("Estimated running time: 240 seconds"));
            assert!(decoded.contains("Scene 8: "));
        });
    }
}
