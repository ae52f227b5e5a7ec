// Page layout presets. Each preset is a fixed table of percentage bounds.

use serde::{Deserialize, Serialize};

use crate::book::Panel;
use crate::types::Bounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutPreset {
    /// Single full-page panel.
    #[default]
    Full,
    HalfH,
    HalfV,
    ThirdsH,
    ThirdsV,
    HeroTop,
    HeroBottom,
    HeroLeft,
    HeroRight,
    /// 2x2 grid.
    Quad,
    /// 2 columns, 3 rows.
    #[serde(rename = "comic-6")]
    Comic6,
    /// 3x3 grid.
    #[serde(rename = "comic-9")]
    Comic9,
    /// Panels placed by hand.
    Custom,
}

const FULL: &[Bounds] = &[Bounds::new(0.0, 0.0, 100.0, 100.0)];

const HALF_H: &[Bounds] = &[
    Bounds::new(0.0, 0.0, 100.0, 50.0),
    Bounds::new(0.0, 50.0, 100.0, 50.0),
];

const HALF_V: &[Bounds] = &[
    Bounds::new(0.0, 0.0, 50.0, 100.0),
    Bounds::new(50.0, 0.0, 50.0, 100.0),
];

// Thirds round to 33.33 and give the remainder to the last cell.
const THIRDS_H: &[Bounds] = &[
    Bounds::new(0.0, 0.0, 100.0, 33.33),
    Bounds::new(0.0, 33.33, 100.0, 33.33),
    Bounds::new(0.0, 66.66, 100.0, 33.34),
];

const THIRDS_V: &[Bounds] = &[
    Bounds::new(0.0, 0.0, 33.33, 100.0),
    Bounds::new(33.33, 0.0, 33.33, 100.0),
    Bounds::new(66.66, 0.0, 33.34, 100.0),
];

const HERO_TOP: &[Bounds] = &[
    Bounds::new(0.0, 0.0, 100.0, 65.0),
    Bounds::new(0.0, 65.0, 100.0, 35.0),
];

const HERO_BOTTOM: &[Bounds] = &[
    Bounds::new(0.0, 0.0, 100.0, 35.0),
    Bounds::new(0.0, 35.0, 100.0, 65.0),
];

const HERO_LEFT: &[Bounds] = &[
    Bounds::new(0.0, 0.0, 65.0, 100.0),
    Bounds::new(65.0, 0.0, 35.0, 100.0),
];

const HERO_RIGHT: &[Bounds] = &[
    Bounds::new(0.0, 0.0, 35.0, 100.0),
    Bounds::new(35.0, 0.0, 65.0, 100.0),
];

const QUAD: &[Bounds] = &[
    Bounds::new(0.0, 0.0, 50.0, 50.0),
    Bounds::new(50.0, 0.0, 50.0, 50.0),
    Bounds::new(0.0, 50.0, 50.0, 50.0),
    Bounds::new(50.0, 50.0, 50.0, 50.0),
];

const COMIC_6: &[Bounds] = &[
    Bounds::new(0.0, 0.0, 50.0, 33.33),
    Bounds::new(50.0, 0.0, 50.0, 33.33),
    Bounds::new(0.0, 33.33, 50.0, 33.33),
    Bounds::new(50.0, 33.33, 50.0, 33.33),
    Bounds::new(0.0, 66.66, 50.0, 33.34),
    Bounds::new(50.0, 66.66, 50.0, 33.34),
];

const COMIC_9: &[Bounds] = &[
    Bounds::new(0.0, 0.0, 33.33, 33.33),
    Bounds::new(33.33, 0.0, 33.33, 33.33),
    Bounds::new(66.66, 0.0, 33.34, 33.33),
    Bounds::new(0.0, 33.33, 33.33, 33.33),
    Bounds::new(33.33, 33.33, 33.33, 33.33),
    Bounds::new(66.66, 33.33, 33.34, 33.33),
    Bounds::new(0.0, 66.66, 33.33, 33.34),
    Bounds::new(33.33, 66.66, 33.33, 33.34),
    Bounds::new(66.66, 66.66, 33.34, 33.34),
];

impl LayoutPreset {
    pub const ALL: [LayoutPreset; 13] = [
        LayoutPreset::Full,
        LayoutPreset::HalfH,
        LayoutPreset::HalfV,
        LayoutPreset::ThirdsH,
        LayoutPreset::ThirdsV,
        LayoutPreset::HeroTop,
        LayoutPreset::HeroBottom,
        LayoutPreset::HeroLeft,
        LayoutPreset::HeroRight,
        LayoutPreset::Quad,
        LayoutPreset::Comic6,
        LayoutPreset::Comic9,
        LayoutPreset::Custom,
    ];

    /// Panel rectangles in reading order.
    pub fn bounds(self) -> &'static [Bounds] {
        match self {
            LayoutPreset::Full => FULL,
            LayoutPreset::HalfH => HALF_H,
            LayoutPreset::HalfV => HALF_V,
            LayoutPreset::ThirdsH => THIRDS_H,
            LayoutPreset::ThirdsV => THIRDS_V,
            LayoutPreset::HeroTop => HERO_TOP,
            LayoutPreset::HeroBottom => HERO_BOTTOM,
            LayoutPreset::HeroLeft => HERO_LEFT,
            LayoutPreset::HeroRight => HERO_RIGHT,
            LayoutPreset::Quad => QUAD,
            LayoutPreset::Comic6 => COMIC_6,
            LayoutPreset::Comic9 => COMIC_9,
            LayoutPreset::Custom => &[],
        }
    }

    pub fn panel_count(self) -> usize {
        self.bounds().len()
    }
}

/// Fresh, empty panels for `preset`. `next_id` is called once per panel.
pub fn panels_for(preset: LayoutPreset, mut next_id: impl FnMut() -> String) -> Vec<Panel> {
    preset
        .bounds()
        .iter()
        .map(|bounds| Panel {
            id: next_id(),
            bounds: *bounds,
            content: None,
            z_index: 0,
            animation: None,
        })
        .collect()
}
