// Playback-side story model: books, pages, animated elements, and timeline events.
// Wire format is the host's camelCase JSON; times are seconds.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoryError;
use crate::types::{Bounds, Position, Size, Timestamp};

/// Enter/emphasis animation applied to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnimationType {
    FadeIn,
    FadeOut,
    SlideUp,
    SlideDown,
    SlideLeft,
    SlideRight,
    Bounce,
    Pop,
    Wiggle,
    Float,
    Typewriter,
    None,
}

impl AnimationType {
    pub fn name(&self) -> &'static str {
        match self {
            AnimationType::FadeIn => "fadeIn",
            AnimationType::FadeOut => "fadeOut",
            AnimationType::SlideUp => "slideUp",
            AnimationType::SlideDown => "slideDown",
            AnimationType::SlideLeft => "slideLeft",
            AnimationType::SlideRight => "slideRight",
            AnimationType::Bounce => "bounce",
            AnimationType::Pop => "pop",
            AnimationType::Wiggle => "wiggle",
            AnimationType::Float => "float",
            AnimationType::Typewriter => "typewriter",
            AnimationType::None => "none",
        }
    }
}

/// Transient reaction played when a tappable element is tapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TapReactionType {
    Pop,
    Wiggle,
    Sparkle,
    Hearts,
    Bounce,
    Spin,
}

impl TapReactionType {
    pub fn name(&self) -> &'static str {
        match self {
            TapReactionType::Pop => "pop",
            TapReactionType::Wiggle => "wiggle",
            TapReactionType::Sparkle => "sparkle",
            TapReactionType::Hearts => "hearts",
            TapReactionType::Bounce => "bounce",
            TapReactionType::Spin => "spin",
        }
    }
}

/// Particle overlay flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ParticleKind {
    #[default]
    Sparkle,
    Hearts,
    Stars,
    Confetti,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<u16>,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_shadow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
}

impl Default for TextStyle {
    fn default() -> Self {
        TextStyle {
            font_family: "Playfair Display".to_string(),
            font_size: 24.0,
            font_weight: Some(400),
            color: "#1a1a2e".to_string(),
            text_shadow: None,
            letter_spacing: None,
            line_height: Some(1.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementAnimation {
    #[serde(rename = "type")]
    pub kind: AnimationType,
    /// Seconds into the page at which the element appears.
    pub start_time: f64,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
}

impl ElementAnimation {
    pub fn start(&self) -> Timestamp {
        Timestamp::from_secs_f64(self.start_time)
    }
}

impl Default for ElementAnimation {
    fn default() -> Self {
        ElementAnimation {
            kind: AnimationType::FadeIn,
            start_time: 0.0,
            duration: 0.5,
            delay: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tappable {
    pub enabled: bool,
    pub reaction: TapReactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryTextBlock {
    pub id: String,
    pub content: String,
    pub position: Position,
    #[serde(default)]
    pub style: TextStyle,
    #[serde(default)]
    pub animation: ElementAnimation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tappable: Option<Tappable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryImage {
    pub id: String,
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    pub position: Position,
    pub size: Size,
    #[serde(default)]
    pub animation: ElementAnimation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tappable: Option<Tappable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotReaction {
    pub animation: TapReactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub particle_effect: Option<ParticleKind>,
}

/// Invisible tap target laid over the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TappableHotspot {
    pub id: String,
    pub hit_area: Bounds,
    pub reaction: HotspotReaction,
    /// Outline shown in the editor, hidden in the reader.
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NarrationProvider {
    Elevenlabs,
    Upload,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationConfig {
    pub provider: NarrationProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub auto_play: bool,
    #[serde(default)]
    pub start_time: f64,
}

/// What a timeline event does when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventAction {
    Show {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        animation: Option<AnimationType>,
    },
    Hide {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        animation: Option<AnimationType>,
    },
    Animate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        animation: Option<AnimationType>,
    },
    PlaySound { url: String },
    PlayNarration,
}

/// A configured one-shot cue. Immutable configuration, never runtime state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    /// Trigger time in seconds.
    pub time: f64,
    pub target_id: String,
    pub action: EventAction,
}

impl TimelineEvent {
    pub fn trigger_time(&self) -> Timestamp {
        Timestamp::from_secs_f64(self.time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackgroundKind {
    Color,
    Image,
    Gradient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    /// Color, URL, or gradient CSS depending on `kind`.
    pub value: String,
}

impl Background {
    /// Inline CSS declarations for the page container.
    pub fn css(&self) -> String {
        match self.kind {
            BackgroundKind::Image => format!(
                "background-image: url({}); background-size: cover; background-position: center;",
                self.value
            ),
            BackgroundKind::Gradient => format!("background: {};", self.value),
            BackgroundKind::Color => format!("background-color: {};", self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryPage {
    pub id: String,
    pub page_number: u32,
    /// Total page duration in seconds.
    pub duration: f64,
    pub background: Background,
    #[serde(default)]
    pub text_blocks: Vec<StoryTextBlock>,
    #[serde(default)]
    pub images: Vec<StoryImage>,
    #[serde(default)]
    pub hotspots: Vec<TappableHotspot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<NarrationConfig>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
}

impl StoryPage {
    pub fn duration(&self) -> Timestamp {
        Timestamp::from_secs_f64(self.duration)
    }

    pub fn narration_url(&self) -> Option<&str> {
        self.narration.as_ref()?.audio_url.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryBook {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pages: Vec<StoryPage>,
}

impl StoryBook {
    /// Parse and validate a book document.
    pub fn from_json(json: &str) -> Result<StoryBook, StoryError> {
        let book: StoryBook = serde_json::from_str(json)?;
        book.validate()?;
        Ok(book)
    }

    /// Structural checks the player relies on. Numeric oddities (negative
    /// times, events past the page end) are clamped at playback instead.
    pub fn validate(&self) -> Result<(), StoryError> {
        if self.pages.is_empty() {
            return Err(StoryError::InvalidStory(format!(
                "book '{}' has no pages",
                self.id
            )));
        }
        for page in &self.pages {
            check_event_ids(&page.id, &page.timeline)?;
        }
        Ok(())
    }
}

/// Timeline state is keyed by event id, so ids must be unique per timeline.
pub fn check_event_ids(scope: &str, events: &[TimelineEvent]) -> Result<(), StoryError> {
    let mut seen = HashSet::new();
    for event in events {
        if !seen.insert(event.id.as_str()) {
            return Err(StoryError::InvalidStory(format!(
                "'{}' has duplicate timeline event id '{}'",
                scope, event.id
            )));
        }
    }
    Ok(())
}

const DEMO_STORY_JSON: &str = include_str!("demo_story.json");

/// The bundled "Magical Garden" sample book.
pub fn demo_story() -> Result<StoryBook, StoryError> {
    StoryBook::from_json(DEMO_STORY_JSON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_story_parses_and_validates() {
        let book = demo_story().unwrap();
        assert_eq!(book.pages.len(), 4);
        assert!(book.validate().is_ok());
        assert_eq!(book.pages[1].timeline.len(), 6);
    }

    #[test]
    fn event_action_uses_type_tag() {
        let json = r#"{"id":"s1","time":1.25,"targetId":"bell","action":{"type":"playSound","url":"bell.mp3"}}"#;
        let event: TimelineEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event.action,
            EventAction::PlaySound {
                url: "bell.mp3".to_string()
            }
        );
        assert_eq!(event.trigger_time().as_micros(), 1_250_000);

        let narration: EventAction = serde_json::from_str(r#"{"type":"playNarration"}"#).unwrap();
        assert_eq!(narration, EventAction::PlayNarration);
    }

    #[test]
    fn duplicate_event_ids_rejected() {
        let mut book = demo_story().unwrap();
        let dup = book.pages[0].timeline[0].clone();
        book.pages[0].timeline.push(dup);
        assert!(matches!(book.validate(), Err(StoryError::InvalidStory(_))));
    }

    #[test]
    fn empty_book_rejected() {
        let mut book = demo_story().unwrap();
        book.pages.clear();
        assert!(book.validate().is_err());
    }

    #[test]
    fn background_css_by_kind() {
        let bg = Background {
            kind: BackgroundKind::Color,
            value: "#fff".to_string(),
        };
        assert_eq!(bg.css(), "background-color: #fff;");
    }
}
