// Element view models. Visibility is a pure function of page activity and
// playhead time; elements keep no "already animated" memory.

use serde::Serialize;

use crate::reaction::{ParticleBurst, ReactionView};
use crate::story::{AnimationType, StoryImage, StoryTextBlock, TappableHotspot};
use crate::types::{Bounds, Position, Size, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    Text,
    Image,
}

/// `is_visible` is the page-active flag.
pub fn should_show(is_visible: bool, current_time: Timestamp, start_time: Timestamp) -> bool {
    is_visible && current_time >= start_time
}

/// CSS class for an enter animation. Images have no typewriter effect.
pub fn animation_class(kind: AnimationType, element: ElementKind) -> String {
    match (kind, element) {
        (AnimationType::None, _) => String::new(),
        (AnimationType::Typewriter, ElementKind::Image) => String::new(),
        (kind, _) => format!("animate-{}", kind.name()),
    }
}

/// Everything a renderer needs for one text block or image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementView {
    pub id: String,
    pub kind: ElementKind,
    pub shown: bool,
    pub position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    /// Text content, or image source.
    pub content: String,
    /// Empty until the element is shown.
    pub animation_class: String,
    /// Seconds.
    pub animation_duration: f64,
    /// Seconds.
    pub animation_delay: f64,
    pub tappable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particles: Option<ParticleBurst>,
}

pub fn text_view(
    block: &StoryTextBlock,
    is_visible: bool,
    current_time: Timestamp,
    reaction: ReactionView,
) -> ElementView {
    let shown = should_show(is_visible, current_time, block.animation.start());
    ElementView {
        id: block.id.clone(),
        kind: ElementKind::Text,
        shown,
        position: block.position,
        size: None,
        content: block.content.clone(),
        animation_class: if shown {
            animation_class(block.animation.kind, ElementKind::Text)
        } else {
            String::new()
        },
        animation_duration: block.animation.duration,
        animation_delay: block.animation.delay.unwrap_or(0.0),
        tappable: block.tappable.as_ref().map_or(false, |t| t.enabled),
        reaction_class: reaction.reaction_class,
        particles: reaction.particles,
    }
}

/// Images also wait for their asset to finish loading.
pub fn image_view(
    image: &StoryImage,
    is_visible: bool,
    current_time: Timestamp,
    loaded: bool,
    reaction: ReactionView,
) -> ElementView {
    let shown = loaded && should_show(is_visible, current_time, image.animation.start());
    ElementView {
        id: image.id.clone(),
        kind: ElementKind::Image,
        shown,
        position: image.position,
        size: Some(image.size),
        content: image.src.clone(),
        animation_class: if shown {
            animation_class(image.animation.kind, ElementKind::Image)
        } else {
            String::new()
        },
        animation_duration: image.animation.duration,
        animation_delay: image.animation.delay.unwrap_or(0.0),
        tappable: image.tappable.as_ref().map_or(false, |t| t.enabled),
        reaction_class: reaction.reaction_class,
        particles: reaction.particles,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotView {
    pub id: String,
    pub hit_area: Bounds,
    /// Outline drawn only in the editor.
    pub outlined: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particles: Option<ParticleBurst>,
}

pub fn hotspot_view(hotspot: &TappableHotspot, editing: bool, reaction: ReactionView) -> HotspotView {
    HotspotView {
        id: hotspot.id.clone(),
        hit_area: hotspot.hit_area,
        outlined: editing && hotspot.visible,
        reaction_class: reaction.reaction_class,
        particles: reaction.particles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::{demo_story, ElementAnimation};

    fn secs(s: f64) -> Timestamp {
        Timestamp::from_secs_f64(s)
    }

    fn image(start: f64, kind: AnimationType) -> StoryImage {
        StoryImage {
            id: "sun".to_string(),
            src: "sun.png".to_string(),
            alt: None,
            position: Position::center(),
            size: Size {
                width: 20.0,
                height: 20.0,
            },
            animation: ElementAnimation {
                kind,
                start_time: start,
                duration: 0.5,
                delay: None,
            },
            tappable: None,
        }
    }

    #[test]
    fn visibility_follows_playhead_both_ways() {
        let book = demo_story().unwrap();
        let block = &book.pages[0].text_blocks[1]; // subtitle at 1.5s
        assert!(!text_view(block, true, secs(1.0), ReactionView::default()).shown);
        let shown = text_view(block, true, secs(1.5), ReactionView::default());
        assert!(shown.shown);
        assert_eq!(shown.animation_class, "animate-fadeIn");
        // Rewinding hides it again.
        assert!(!text_view(block, true, secs(0.2), ReactionView::default()).shown);
    }

    #[test]
    fn inactive_page_hides_everything() {
        let book = demo_story().unwrap();
        let block = &book.pages[0].text_blocks[0];
        let view = text_view(block, false, secs(7.0), ReactionView::default());
        assert!(!view.shown);
        assert!(view.animation_class.is_empty());
    }

    #[test]
    fn images_wait_for_load() {
        let img = image(1.0, AnimationType::Pop);
        assert!(!image_view(&img, true, secs(2.0), false, ReactionView::default()).shown);
        let view = image_view(&img, true, secs(2.0), true, ReactionView::default());
        assert!(view.shown);
        assert_eq!(view.animation_class, "animate-pop");
    }

    #[test]
    fn typewriter_has_no_image_class() {
        assert_eq!(
            animation_class(AnimationType::Typewriter, ElementKind::Image),
            ""
        );
        assert_eq!(
            animation_class(AnimationType::Typewriter, ElementKind::Text),
            "animate-typewriter"
        );
        assert_eq!(animation_class(AnimationType::None, ElementKind::Text), "");
    }
}
