use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::LibraryError;
use crate::project::{NewProject, ProjectRecord, ProjectType};

type LibraryResult<T> = Result<T, LibraryError>;

const PROJECT_COLUMNS: &str =
    "id, project_type, prompt, style_id, canvas_id, generated_image, original_image, created_at";

/// The ProjectLibrary manages the SQLite project catalog.
/// It stores every generated project together with its images,
/// and the user's favorite styles.
pub struct ProjectLibrary {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl ProjectLibrary {
    /// Open (or create) the catalog at `path` and initialize the schema.
    ///
    /// The parent directory is created when missing.
    pub fn open(path: impl AsRef<Path>) -> LibraryResult<Self> {
        let db_path = path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| LibraryError::CreateDir {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(&db_path)?;
        info!(path = %db_path.display(), "project catalog opened");

        let library = ProjectLibrary {
            conn,
            db_path: Some(db_path),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Open a throwaway catalog that lives in memory
    pub fn open_in_memory() -> LibraryResult<Self> {
        let library = ProjectLibrary {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Default catalog location in the user's data directory:
    /// - Linux: ~/.local/share/brush-ai/projects.db
    /// - macOS: ~/Library/Application Support/brush-ai/projects.db
    /// - Windows: %APPDATA%\brush-ai\projects.db
    pub fn default_path() -> LibraryResult<PathBuf> {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or(LibraryError::NoDataDir)?;
        path.push("brush-ai");
        path.push("projects.db");
        Ok(path)
    }

    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&self) -> LibraryResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS projects (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                project_type    TEXT NOT NULL,
                prompt          TEXT NOT NULL,
                style_id        TEXT NOT NULL,
                canvas_id       TEXT NOT NULL,
                generated_image BLOB NOT NULL,
                original_image  BLOB,
                created_at      INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS favorite_styles (
                style_id        TEXT PRIMARY KEY
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_projects_created_at
             ON projects(created_at DESC)",
            [],
        )?;

        debug!("project catalog schema initialized");
        Ok(())
    }

    /// Path of the database file, `None` for in-memory catalogs
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn project_count(&self) -> LibraryResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert a project, returns the new project ID
    pub fn insert_project(&self, project: &NewProject) -> LibraryResult<i64> {
        self.conn.execute(
            "INSERT INTO projects
                (project_type, prompt, style_id, canvas_id, generated_image, original_image, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                project.project_type.as_str(),
                project.prompt,
                project.style_id,
                project.canvas_id,
                project.generated_image,
                project.original_image,
                Utc::now().timestamp_millis(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!(project_id = id, project_type = %project.project_type, "project inserted");
        Ok(id)
    }

    /// Get all projects, newest first.
    ///
    /// Rows whose discriminator is not a known project type are skipped.
    pub fn get_all_projects(&self) -> LibraryResult<Vec<ProjectRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, id DESC"
        ))?;

        let rows = stmt.query_map([], StoredRow::from_row)?;

        let mut projects = Vec::new();
        for row in rows {
            if let Some(project) = row?.into_record() {
                projects.push(project);
            }
        }
        Ok(projects)
    }

    pub fn get_project(&self, id: i64) -> LibraryResult<Option<ProjectRecord>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                StoredRow::from_row,
            )
            .optional()?;
        Ok(row.and_then(StoredRow::into_record))
    }

    /// Delete a project, returns whether a row was removed
    pub fn delete_project(&self, id: i64) -> LibraryResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// Mark or unmark a style as favorite
    pub fn set_favorite_style(&self, style_id: &str, is_favorite: bool) -> LibraryResult<()> {
        if is_favorite {
            self.conn.execute(
                "INSERT OR IGNORE INTO favorite_styles (style_id) VALUES (?1)",
                params![style_id],
            )?;
        } else {
            self.conn.execute(
                "DELETE FROM favorite_styles WHERE style_id = ?1",
                params![style_id],
            )?;
        }
        Ok(())
    }

    pub fn favorite_styles(&self) -> LibraryResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT style_id FROM favorite_styles ORDER BY style_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for ProjectLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectLibrary")
            .field("db_path", &self.db_path)
            .finish()
    }
}

/// A projects row before the discriminator is validated
struct StoredRow {
    id: i64,
    project_type: String,
    prompt: String,
    style_id: String,
    canvas_id: String,
    generated_image: Vec<u8>,
    original_image: Option<Vec<u8>>,
    created_at: i64,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StoredRow {
            id: row.get(0)?,
            project_type: row.get(1)?,
            prompt: row.get(2)?,
            style_id: row.get(3)?,
            canvas_id: row.get(4)?,
            generated_image: row.get(5)?,
            original_image: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_record(self) -> Option<ProjectRecord> {
        let Some(project_type) = ProjectType::from_discriminator(&self.project_type) else {
            warn!(
                project_id = self.id,
                discriminator = %self.project_type,
                "skipping project with unknown type"
            );
            return None;
        };

        Some(ProjectRecord {
            id: self.id,
            project_type,
            prompt: self.prompt,
            style_id: self.style_id,
            canvas_id: self.canvas_id,
            generated_image: self.generated_image,
            original_image: self.original_image,
            created_at: timestamp_to_datetime(self.created_at),
        })
    }
}

fn timestamp_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{CanvasPreset, StylePreset};

    fn tti(prompt: &str) -> NewProject {
        NewProject::text_to_image(prompt, StylePreset::Anime, CanvasPreset::OneOne, vec![1, 2, 3])
    }

    #[test]
    fn test_insert_and_list_newest_first() {
        let library = ProjectLibrary::open_in_memory().unwrap();
        let first = library.insert_project(&tti("first")).unwrap();
        let second = library
            .insert_project(&NewProject::image_to_image(
                "second",
                StylePreset::Origami,
                CanvasPreset::FourThree,
                vec![9],
                vec![8],
            ))
            .unwrap();

        let projects = library.get_all_projects().unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].id, second);
        assert_eq!(projects[1].id, first);
        assert_eq!(projects[0].project_type, ProjectType::ImageToImage);
        assert_eq!(projects[0].original_image, Some(vec![9]));
        assert_eq!(projects[0].generated_image, vec![8]);
        assert_eq!(projects[1].style_id, "anime");
        assert_eq!(library.project_count().unwrap(), 2);
    }

    #[test]
    fn test_get_and_delete() {
        let library = ProjectLibrary::open_in_memory().unwrap();
        let id = library.insert_project(&tti("cat")).unwrap();

        let project = library.get_project(id).unwrap().unwrap();
        assert_eq!(project.prompt, "cat");
        assert!(project.original_image.is_none());

        assert!(library.delete_project(id).unwrap());
        assert!(!library.delete_project(id).unwrap());
        assert!(library.get_project(id).unwrap().is_none());
    }

    #[test]
    fn test_unknown_discriminator_is_skipped() {
        let library = ProjectLibrary::open_in_memory().unwrap();
        library.insert_project(&tti("kept")).unwrap();
        library
            .conn
            .execute(
                "INSERT INTO projects
                    (project_type, prompt, style_id, canvas_id, generated_image, created_at)
                 VALUES ('video', 'skipped', 'anime', '1:1', x'00', 0)",
                [],
            )
            .unwrap();

        let projects = library.get_all_projects().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].prompt, "kept");
    }

    #[test]
    fn test_favorite_styles() {
        let library = ProjectLibrary::open_in_memory().unwrap();
        library.set_favorite_style("anime", true).unwrap();
        library.set_favorite_style("anime", true).unwrap();
        library.set_favorite_style("origami", true).unwrap();
        assert_eq!(library.favorite_styles().unwrap(), vec!["anime", "origami"]);

        library.set_favorite_style("anime", false).unwrap();
        assert_eq!(library.favorite_styles().unwrap(), vec!["origami"]);
    }

    #[test]
    fn test_open_on_disk_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("projects.db");

        {
            let library = ProjectLibrary::open(&path).unwrap();
            library.insert_project(&tti("persisted")).unwrap();
            assert_eq!(library.path(), Some(path.as_path()));
        }

        let reopened = ProjectLibrary::open(&path).unwrap();
        assert_eq!(reopened.get_all_projects().unwrap()[0].prompt, "persisted");
    }
}
