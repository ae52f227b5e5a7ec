// Editor-side documents: books made of pages, pages made of panels.
// Wire format is camelCase JSON, shared with the host's persisted state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::LayoutPreset;
use crate::story::AnimationType;
use crate::types::{Bounds, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    Letter,
    A4,
    Square,
    Wide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSettings {
    pub default_orientation: Orientation,
    pub page_size: PageSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_level: Option<String>,
    pub language: String,
}

impl Default for BookSettings {
    fn default() -> Self {
        BookSettings {
            default_orientation: Orientation::Portrait,
            page_size: PageSize::Letter,
            reading_level: None,
            language: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelTextStyle {
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: u16,
    pub color: String,
    pub text_align: TextAlign,
    pub line_height: f32,
    /// Pixels.
    pub padding: f32,
}

impl Default for PanelTextStyle {
    fn default() -> Self {
        PanelTextStyle {
            font_family: "Crimson Text".to_string(),
            font_size: 18.0,
            font_weight: 400,
            color: "#1a1a2e".to_string(),
            text_align: TextAlign::Left,
            line_height: 1.6,
            padding: 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    #[default]
    Cover,
    Contain,
    Fill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    Walk,
    Move,
    Gesture,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Motion path for a character cut-out. Stored, not yet played back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationPath {
    #[serde(rename = "type")]
    pub kind: PathKind,
    pub waypoints: Vec<Waypoint>,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AiEnhancements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_background: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationPath>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PanelContent {
    Text {
        content: String,
        style: PanelTextStyle,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
        fit: ImageFit,
        /// Percentage offset of the image focus point.
        position: Position,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ai_enhancements: Option<AiEnhancements>,
    },
}

impl PanelContent {
    pub fn text(content: impl Into<String>) -> Self {
        PanelContent::Text {
            content: content.into(),
            style: PanelTextStyle::default(),
        }
    }

    /// Cover-fit image centred in the panel.
    pub fn image(src: impl Into<String>) -> Self {
        PanelContent::Image {
            src: src.into(),
            alt: None,
            fit: ImageFit::Cover,
            position: Position::center(),
            ai_enhancements: None,
        }
    }
}

/// Reader playback settings for a panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelAnimation {
    pub enter_animation: AnimationType,
    /// Seconds.
    pub enter_delay: f64,
    /// Seconds visible; 0 keeps the panel up until the page ends.
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub id: String,
    pub bounds: Bounds,
    pub content: Option<PanelContent>,
    pub z_index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<PanelAnimation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordTiming {
    pub word: String,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageNarration {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_timings: Option<Vec<WordTiming>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub id: String,
    pub page_number: u32,
    pub orientation: Orientation,
    pub layout: LayoutPreset,
    pub panels: Vec<Panel>,
    pub background_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<PageNarration>,
    /// Author notes, never shown in the reader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl BookPage {
    pub fn panel(&self, panel_id: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id == panel_id)
    }

    pub fn panel_mut(&mut self, panel_id: &str) -> Option<&mut Panel> {
        self.panels.iter_mut().find(|p| p.id == panel_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub content: String,
}

/// The author's imported manuscript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceText {
    pub full_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<Chapter>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub settings: BookSettings,
    pub pages: Vec<BookPage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<SourceText>,
}

impl Book {
    /// Number pages `1..=n` in their current order.
    pub fn renumber_pages(&mut self) {
        for (i, page) in self.pages.iter_mut().enumerate() {
            page.page_number = i as u32 + 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageVariants {
    pub original: String,
    /// Background removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_bg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryImage {
    pub id: String,
    pub src: String,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<ImageVariants>,
}

/// An upload before the library assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLibraryImage {
    pub src: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<ImageVariants>,
}
