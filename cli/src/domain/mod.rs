//! Domain layer - pure business logic
//!
//! This module contains business logic with no external I/O.
//! Types and functions here can be unit tested without mocking.

pub mod content;
pub mod selection;
pub mod site;
pub mod tracking;

// Re-export commonly used types
pub use content::ContentIds;
pub use selection::{select_many, select_one};
pub use site::{
    DeployKey, Deployment, DeploymentStatus, Domain, Environment, Reference, Release, PROD_ENV,
};
pub use tracking::{PollSchedule, TrackerState};
