//! Project model
//!
//! - Records and presentation samples (data.rs)
//! - Record-to-sample mapping (mapper.rs)

pub mod data;
pub mod mapper;

pub use data::{NewProject, PresentationSample, ProjectRecord, ProjectType};
pub use mapper::{map_project, map_projects};
