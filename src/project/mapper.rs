//! Project list mapper
//!
//! Turns catalog records into presentation samples. Pure apart from image
//! decoding: presets are resolved with their default fallback, and
//! image-to-image records without a source image produce no sample.

use tracing::warn;

use super::data::{PresentationSample, ProjectRecord, ProjectType};
use crate::error::DecodeError;
use crate::imaging;
use crate::presets::{CanvasPreset, StylePreset};

/// Map a single record
///
/// Returns `Ok(None)` for an image-to-image record that has no original
/// image; the record is logged and left out. Decode failures propagate.
pub fn map_project(record: &ProjectRecord) -> Result<Option<PresentationSample>, DecodeError> {
    let style_preset = StylePreset::from_id(&record.style_id);
    let canvas_preset = CanvasPreset::from_id(&record.canvas_id);

    match record.project_type {
        ProjectType::TextToImage => {
            let image = imaging::decode(&record.generated_image)?;
            Ok(Some(PresentationSample::TextToImage {
                id: record.id,
                prompt: record.prompt.clone(),
                style_preset,
                canvas_preset,
                image,
            }))
        }
        ProjectType::ImageToImage => {
            let Some(original_image) = record.original_image.as_deref() else {
                warn!(
                    project_id = record.id,
                    "image-to-image project has no original image, leaving it out"
                );
                return Ok(None);
            };
            let before_image = imaging::decode(original_image)?;
            let after_image = imaging::decode(&record.generated_image)?;
            Ok(Some(PresentationSample::ImageToImage {
                id: record.id,
                prompt: record.prompt.clone(),
                style_preset,
                canvas_preset,
                before_image,
                after_image,
            }))
        }
    }
}

/// Map a whole list, keeping the input order
///
/// The output is never longer than the input. The first decode failure
/// aborts the mapping.
pub fn map_projects(records: &[ProjectRecord]) -> Result<Vec<PresentationSample>, DecodeError> {
    let mut samples = Vec::with_capacity(records.len());
    for record in records {
        if let Some(sample) = map_project(record)? {
            samples.push(sample);
        }
    }
    Ok(samples)
}
