//! Brush AI project core
//!
//! Maps the stored project catalog of a text-to-image / image-to-image
//! client into render-ready samples and publishes them as view state.

pub mod config;
pub mod error;
pub mod imaging;
pub mod logging;
pub mod presets;
pub mod project;
pub mod repository;
pub mod state;

pub use config::Config;
pub use error::{ConfigError, DecodeError, LibraryError, RepositoryError};
pub use imaging::ImageHandle;
pub use presets::{CanvasPreset, StylePreset};
pub use project::{PresentationSample, ProjectRecord, ProjectType};
pub use repository::{CatalogRepository, ImageRepository};
pub use state::{GenerateModel, ProjectModel, ViewState};
