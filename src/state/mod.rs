//! State management module
//!
//! This module handles all application state, including:
//! - The SQLite project catalog (library.rs)
//! - The project list view state and its subscription (projects.rs)
//! - The generate screen state (generate.rs)

pub mod generate;
pub mod library;
pub mod projects;

pub use generate::{FavorableStyle, GenerateModel, GenerateState};
pub use library::ProjectLibrary;
pub use projects::{ProjectModel, RetryPolicy, ViewState};
