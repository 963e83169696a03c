//! Repository contract
//!
//! The view-state layer only depends on [`ImageRepository`]: a stream of
//! project lists and a stream of generation tokens. Persistence and the
//! generation backend live behind it.

use futures::stream::{self, BoxStream, StreamExt};

use crate::error::RepositoryError;
use crate::project::ProjectRecord;

pub mod catalog;

pub use catalog::CatalogRepository;

/// Every emission is the complete, current project list
pub type ProjectStream = BoxStream<'static, Result<Vec<ProjectRecord>, RepositoryError>>;

/// Progress and result tokens from the generation backend (opaque)
pub type TokenStream = BoxStream<'static, Result<String, RepositoryError>>;

pub trait ImageRepository: Send + Sync {
    /// Subscribe to the project list
    fn list_projects(&self) -> ProjectStream;

    /// Start generating an image for `prompt`
    fn generate_image(&self, prompt: &str) -> TokenStream;
}

/// The remote generation service
pub trait ImageGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> TokenStream;
}

/// Generator used when no backend is configured; every request fails
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableGenerator;

impl ImageGenerator for UnavailableGenerator {
    fn generate(&self, _prompt: &str) -> TokenStream {
        stream::once(async {
            Err(RepositoryError::Generation(
                "no generation backend configured".to_string(),
            ))
        })
        .boxed()
    }
}
