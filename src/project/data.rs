//! Shared data structures for projects
//!
//! These structs represent the data model that flows between
//! the catalog layer and the view-state layer.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::imaging::ImageHandle;
use crate::presets::{CanvasPreset, StylePreset};

/// Which generation mode produced a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectType {
    TextToImage,
    ImageToImage,
}

impl ProjectType {
    /// Parse the persisted discriminator
    ///
    /// Accepts the short form stored by the catalog (`tti`, `iti`) and the
    /// long form (`text-to-image`, `image-to-image`). Anything else is `None`.
    pub fn from_discriminator(value: &str) -> Option<ProjectType> {
        match value {
            "tti" | "text-to-image" => Some(ProjectType::TextToImage),
            "iti" | "image-to-image" => Some(ProjectType::ImageToImage),
            _ => None,
        }
    }

    /// Short discriminator written to the catalog
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::TextToImage => "tti",
            ProjectType::ImageToImage => "iti",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectType::TextToImage => f.write_str("text-to-image"),
            ProjectType::ImageToImage => f.write_str("image-to-image"),
        }
    }
}

/// A project as read from the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    /// Unique catalog ID
    pub id: i64,
    pub project_type: ProjectType,
    /// Prompt sent to the backend
    pub prompt: String,
    /// Raw style id, may not be a known preset
    pub style_id: String,
    /// Raw canvas id, may not be a known preset
    pub canvas_id: String,
    /// Encoded image returned by the backend
    pub generated_image: Vec<u8>,
    /// Encoded source image (image-to-image only)
    pub original_image: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

/// A project about to be inserted into the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub project_type: ProjectType,
    pub prompt: String,
    pub style_id: String,
    pub canvas_id: String,
    pub generated_image: Vec<u8>,
    pub original_image: Option<Vec<u8>>,
}

impl NewProject {
    pub fn text_to_image(
        prompt: impl Into<String>,
        style: StylePreset,
        canvas: CanvasPreset,
        generated_image: Vec<u8>,
    ) -> Self {
        Self {
            project_type: ProjectType::TextToImage,
            prompt: prompt.into(),
            style_id: style.id().to_string(),
            canvas_id: canvas.id().to_string(),
            generated_image,
            original_image: None,
        }
    }

    pub fn image_to_image(
        prompt: impl Into<String>,
        style: StylePreset,
        canvas: CanvasPreset,
        original_image: Vec<u8>,
        generated_image: Vec<u8>,
    ) -> Self {
        Self {
            project_type: ProjectType::ImageToImage,
            prompt: prompt.into(),
            style_id: style.id().to_string(),
            canvas_id: canvas.id().to_string(),
            generated_image,
            original_image: Some(original_image),
        }
    }
}

/// A project ready for rendering: presets resolved, images decoded
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationSample {
    TextToImage {
        id: i64,
        prompt: String,
        style_preset: StylePreset,
        canvas_preset: CanvasPreset,
        image: ImageHandle,
    },
    ImageToImage {
        id: i64,
        prompt: String,
        style_preset: StylePreset,
        canvas_preset: CanvasPreset,
        before_image: ImageHandle,
        after_image: ImageHandle,
    },
}

impl PresentationSample {
    pub fn id(&self) -> i64 {
        match self {
            PresentationSample::TextToImage { id, .. }
            | PresentationSample::ImageToImage { id, .. } => *id,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            PresentationSample::TextToImage { prompt, .. }
            | PresentationSample::ImageToImage { prompt, .. } => prompt,
        }
    }

    pub fn style_preset(&self) -> StylePreset {
        match self {
            PresentationSample::TextToImage { style_preset, .. }
            | PresentationSample::ImageToImage { style_preset, .. } => *style_preset,
        }
    }

    pub fn canvas_preset(&self) -> CanvasPreset {
        match self {
            PresentationSample::TextToImage { canvas_preset, .. }
            | PresentationSample::ImageToImage { canvas_preset, .. } => *canvas_preset,
        }
    }

    pub fn project_type(&self) -> ProjectType {
        match self {
            PresentationSample::TextToImage { .. } => ProjectType::TextToImage,
            PresentationSample::ImageToImage { .. } => ProjectType::ImageToImage,
        }
    }
}
