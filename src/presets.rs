//! Style and canvas presets
//!
//! Both catalogs are closed. Lookup by id is total: an unknown id resolves
//! to the catalog default instead of failing.

use std::fmt;

/// Visual style applied by the generation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StylePreset {
    Model3d,
    AnalogFilm,
    Anime,
    Cinematic,
    ComicBook,
    DigitalArt,
    Enhance,
    FantasyArt,
    Isometric,
    LineArt,
    LowPoly,
    NeonPunk,
    Origami,
    Photographic,
    PixelArt,
}

impl StylePreset {
    /// Resolved when a stored style id is not in the catalog
    pub const DEFAULT: StylePreset = StylePreset::Model3d;

    /// Catalog order, as shown in the style picker
    pub const ALL: [StylePreset; 15] = [
        StylePreset::Model3d,
        StylePreset::AnalogFilm,
        StylePreset::Anime,
        StylePreset::Cinematic,
        StylePreset::ComicBook,
        StylePreset::DigitalArt,
        StylePreset::Enhance,
        StylePreset::FantasyArt,
        StylePreset::Isometric,
        StylePreset::LineArt,
        StylePreset::LowPoly,
        StylePreset::NeonPunk,
        StylePreset::Origami,
        StylePreset::Photographic,
        StylePreset::PixelArt,
    ];

    /// Id sent to the backend and stored with each project
    pub fn id(self) -> &'static str {
        match self {
            StylePreset::Model3d => "3d-model",
            StylePreset::AnalogFilm => "analog-film",
            StylePreset::Anime => "anime",
            StylePreset::Cinematic => "cinematic",
            StylePreset::ComicBook => "comic-book",
            StylePreset::DigitalArt => "digital-art",
            StylePreset::Enhance => "enhance",
            StylePreset::FantasyArt => "fantasy-art",
            StylePreset::Isometric => "isometric",
            StylePreset::LineArt => "line-art",
            StylePreset::LowPoly => "low-poly",
            StylePreset::NeonPunk => "neon-punk",
            StylePreset::Origami => "origami",
            StylePreset::Photographic => "photographic",
            StylePreset::PixelArt => "pixel-art",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StylePreset::Model3d => "3D Model",
            StylePreset::AnalogFilm => "Analog Film",
            StylePreset::Anime => "Anime",
            StylePreset::Cinematic => "Cinematic",
            StylePreset::ComicBook => "Comic Book",
            StylePreset::DigitalArt => "Digital Art",
            StylePreset::Enhance => "Enhance",
            StylePreset::FantasyArt => "Fantasy Art",
            StylePreset::Isometric => "Isometric",
            StylePreset::LineArt => "Line Art",
            StylePreset::LowPoly => "Low Poly",
            StylePreset::NeonPunk => "Neon Punk",
            StylePreset::Origami => "Origami",
            StylePreset::Photographic => "Photographic",
            StylePreset::PixelArt => "Pixel Art",
        }
    }

    /// Look up a preset by id, falling back to [`StylePreset::DEFAULT`]
    pub fn from_id(id: &str) -> StylePreset {
        Self::find(id).unwrap_or(Self::DEFAULT)
    }

    /// Exact lookup, `None` when the id is not in the catalog
    pub fn find(id: &str) -> Option<StylePreset> {
        Self::ALL.into_iter().find(|preset| preset.id() == id)
    }
}

impl Default for StylePreset {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for StylePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Output canvas (aspect ratio and pixel size)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanvasPreset {
    OneOne,
    ThreeFour,
    FourThree,
    NineSixteen,
    SixteenNine,
}

impl CanvasPreset {
    /// Resolved when a stored canvas id is not in the catalog
    pub const DEFAULT: CanvasPreset = CanvasPreset::ThreeFour;

    pub const ALL: [CanvasPreset; 5] = [
        CanvasPreset::OneOne,
        CanvasPreset::ThreeFour,
        CanvasPreset::FourThree,
        CanvasPreset::NineSixteen,
        CanvasPreset::SixteenNine,
    ];

    pub fn id(self) -> &'static str {
        match self {
            CanvasPreset::OneOne => "1:1",
            CanvasPreset::ThreeFour => "3:4",
            CanvasPreset::FourThree => "4:3",
            CanvasPreset::NineSixteen => "9:16",
            CanvasPreset::SixteenNine => "16:9",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CanvasPreset::OneOne => "Square",
            CanvasPreset::ThreeFour => "Portrait",
            CanvasPreset::FourThree => "Landscape",
            CanvasPreset::NineSixteen => "Story",
            CanvasPreset::SixteenNine => "Widescreen",
        }
    }

    /// Pixel size requested from the backend (width, height)
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            CanvasPreset::OneOne => (1024, 1024),
            CanvasPreset::ThreeFour => (896, 1152),
            CanvasPreset::FourThree => (1152, 896),
            CanvasPreset::NineSixteen => (768, 1344),
            CanvasPreset::SixteenNine => (1344, 768),
        }
    }

    /// Width divided by height
    pub fn aspect_ratio(self) -> f32 {
        let (width, height) = self.dimensions();
        width as f32 / height as f32
    }

    /// Look up a preset by id, falling back to [`CanvasPreset::DEFAULT`]
    pub fn from_id(id: &str) -> CanvasPreset {
        Self::find(id).unwrap_or(Self::DEFAULT)
    }

    pub fn find(id: &str) -> Option<CanvasPreset> {
        Self::ALL.into_iter().find(|preset| preset.id() == id)
    }
}

impl Default for CanvasPreset {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CanvasPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.id())
    }
}
