//! SQLite-backed repository
//!
//! Wraps the project catalog and an external generator. Every mutation
//! made through the repository bumps a revision counter, and each open
//! `list_projects` stream re-reads the catalog when the revision changes.

use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task;
use tracing::{debug, error};

use super::{ImageGenerator, ImageRepository, ProjectStream, TokenStream};
use crate::error::{LibraryError, RepositoryError};
use crate::project::{NewProject, ProjectRecord};
use crate::state::library::ProjectLibrary;

pub struct CatalogRepository {
    library: Arc<Mutex<ProjectLibrary>>,
    generator: Box<dyn ImageGenerator>,
    revision: watch::Sender<u64>,
}

impl CatalogRepository {
    pub fn new(library: ProjectLibrary, generator: Box<dyn ImageGenerator>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            library: Arc::new(Mutex::new(library)),
            generator,
            revision,
        }
    }

    /// Store a project and notify open subscriptions
    pub async fn save_project(&self, project: NewProject) -> Result<i64, LibraryError> {
        let id = self
            .with_library(move |library| library.insert_project(&project))
            .await?;
        self.bump_revision();
        Ok(id)
    }

    /// Delete a project, returns whether it existed
    pub async fn delete_project(&self, id: i64) -> Result<bool, LibraryError> {
        let removed = self
            .with_library(move |library| library.delete_project(id))
            .await?;
        if removed {
            self.bump_revision();
        }
        Ok(removed)
    }

    pub async fn set_favorite_style(
        &self,
        style_id: String,
        is_favorite: bool,
    ) -> Result<(), LibraryError> {
        self.with_library(move |library| library.set_favorite_style(&style_id, is_favorite))
            .await
    }

    pub async fn favorite_styles(&self) -> Result<Vec<String>, LibraryError> {
        self.with_library(|library| library.favorite_styles()).await
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|revision| *revision += 1);
        debug!(revision = *self.revision.borrow(), "project catalog changed");
    }

    async fn with_library<T, F>(&self, f: F) -> Result<T, LibraryError>
    where
        T: Send + 'static,
        F: FnOnce(&ProjectLibrary) -> Result<T, LibraryError> + Send + 'static,
    {
        run_blocking(Arc::clone(&self.library), f).await
    }
}

/// Run a catalog call on the blocking pool (rusqlite is synchronous)
async fn run_blocking<T, F>(library: Arc<Mutex<ProjectLibrary>>, f: F) -> Result<T, LibraryError>
where
    T: Send + 'static,
    F: FnOnce(&ProjectLibrary) -> Result<T, LibraryError> + Send + 'static,
{
    task::spawn_blocking(move || {
        let library = library.lock().map_err(|_| LibraryError::Poisoned)?;
        f(&library)
    })
    .await
    .map_err(|e| LibraryError::Join(e.to_string()))?
}

async fn load_projects(
    library: Arc<Mutex<ProjectLibrary>>,
) -> Result<Vec<ProjectRecord>, RepositoryError> {
    run_blocking(library, |library| library.get_all_projects())
        .await
        .map_err(|e| {
            error!(error = %e, "failed to read project catalog");
            RepositoryError::from(e)
        })
}

impl ImageRepository for CatalogRepository {
    fn list_projects(&self) -> ProjectStream {
        let library = Arc::clone(&self.library);
        let mut revisions = self.revision.subscribe();
        revisions.mark_changed();

        // Ends once the repository (and with it the revision sender) is dropped
        stream::unfold((library, revisions), |(library, mut revisions)| async move {
            revisions.changed().await.ok()?;
            let projects = load_projects(Arc::clone(&library)).await;
            Some((projects, (library, revisions)))
        })
        .boxed()
    }

    fn generate_image(&self, prompt: &str) -> TokenStream {
        self.generator.generate(prompt)
    }
}

impl std::fmt::Debug for CatalogRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogRepository")
            .field("revision", &*self.revision.borrow())
            .finish_non_exhaustive()
    }
}
