use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use brush_ai::config::Config;
use brush_ai::imaging;
use brush_ai::presets::{CanvasPreset, StylePreset};
use brush_ai::project::NewProject;
use brush_ai::repository::{CatalogRepository, UnavailableGenerator};
use brush_ai::state::generate::{self, surprise_prompt};
use brush_ai::state::{ProjectLibrary, ProjectModel, ViewState};
use brush_ai::PresentationSample;

/// Browse and manage generated image projects
#[derive(Debug, Parser)]
#[command(name = "brush-ai", version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog database, overrides the config file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store a generated image as a project
    Import {
        /// Generated image file
        generated: PathBuf,
        /// Source image, makes this an image-to-image project
        #[arg(long)]
        original: Option<PathBuf>,
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = StylePreset::DEFAULT.id())]
        style: String,
        #[arg(long, default_value = CanvasPreset::DEFAULT.id())]
        canvas: String,
    },
    /// Print the project list as the project screen would show it
    List {
        /// Give up waiting for the first list after this many seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
    /// Delete a project
    Delete { id: i64 },
    /// Mark a style as favorite (or unmark with --remove)
    Favorite {
        style: String,
        #[arg(long)]
        remove: bool,
    },
    /// List style presets
    Styles,
    /// List canvas presets
    Canvases,
    /// Suggest a random prompt
    Surprise {
        #[arg(long, default_value = "")]
        current: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Config::default_path);
    let mut config = match &config_path {
        Some(path) => Config::load_or_default(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(database) = cli.database {
        config.database_path = Some(database);
    }

    brush_ai::logging::init(&config.log_filter);

    match cli.command {
        Command::Styles => {
            let favorites = open_repository(&config)?.favorite_styles().await?;
            for entry in generate::styles(&favorites) {
                let marker = if entry.is_favorite { "*" } else { " " };
                println!("{marker} {:<14} {}", entry.style.id(), entry.style.label());
            }
        }
        Command::Canvases => {
            for canvas in CanvasPreset::ALL {
                let (width, height) = canvas.dimensions();
                println!("{:<5} {:<11} {width}x{height}", canvas.id(), canvas.label());
            }
        }
        Command::Surprise { current } => println!("{}", surprise_prompt(&current)),
        Command::Import {
            generated,
            original,
            prompt,
            style,
            canvas,
        } => {
            let repository = open_repository(&config)?;
            let generated_image = read_image(&generated).await?;
            let style = StylePreset::from_id(&style);
            let canvas = CanvasPreset::from_id(&canvas);

            let project = match original {
                Some(original) => {
                    let original_image = read_image(&original).await?;
                    NewProject::image_to_image(
                        prompt,
                        style,
                        canvas,
                        original_image,
                        generated_image,
                    )
                }
                None => NewProject::text_to_image(prompt, style, canvas, generated_image),
            };

            let id = repository.save_project(project).await?;
            println!("Imported project {id}");
        }
        Command::Delete { id } => {
            let repository = open_repository(&config)?;
            if !repository.delete_project(id).await? {
                bail!("no project with id {id}");
            }
            println!("Deleted project {id}");
        }
        Command::Favorite { style, remove } => {
            let Some(preset) = StylePreset::find(&style) else {
                bail!("unknown style {style}");
            };
            open_repository(&config)?
                .set_favorite_style(preset.id().to_string(), !remove)
                .await?;
        }
        Command::List { timeout } => {
            let repository = Arc::new(open_repository(&config)?);
            let model = ProjectModel::attach(repository, config.retry);
            let settled = model.settled(Duration::from_secs(timeout)).await;
            model.detach().await;

            match settled {
                ViewState::Success(samples) => print_samples(&samples),
                ViewState::Error(message) => bail!("could not load projects: {message}"),
                _ => bail!("timed out waiting for the project list"),
            }
        }
    }

    Ok(())
}

fn open_repository(config: &Config) -> anyhow::Result<CatalogRepository> {
    let path = config.database_path()?;
    let library = ProjectLibrary::open(&path)
        .with_context(|| format!("opening catalog {}", path.display()))?;
    info!(projects = library.project_count()?, "catalog ready");
    Ok(CatalogRepository::new(library, Box::new(UnavailableGenerator)))
}

/// Read an image file, refusing anything that does not decode
async fn read_image(path: &Path) -> anyhow::Result<Vec<u8>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    imaging::decode_async(bytes.clone())
        .await
        .with_context(|| format!("{} is not a readable image", path.display()))?;
    Ok(bytes)
}

fn print_samples(samples: &[PresentationSample]) {
    if samples.is_empty() {
        println!("No projects yet.");
        return;
    }
    for sample in samples {
        let images = match sample {
            PresentationSample::TextToImage { image, .. } => {
                format!("{}x{}", image.width(), image.height())
            }
            PresentationSample::ImageToImage {
                before_image,
                after_image,
                ..
            } => format!(
                "{}x{} -> {}x{}",
                before_image.width(),
                before_image.height(),
                after_image.width(),
                after_image.height()
            ),
        };
        println!(
            "#{:<4} {:<15} {:<12} {:<10} {:<20} {}",
            sample.id(),
            sample.project_type().to_string(),
            sample.style_preset().id(),
            sample.canvas_preset().id(),
            images,
            sample.prompt()
        );
    }
}
