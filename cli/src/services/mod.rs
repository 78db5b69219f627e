//! Services layer - orchestration logic
//!
//! This module coordinates between domain logic and infrastructure.
//! Services use infrastructure adapters to perform I/O operations.

pub mod deployment_tracker;
pub mod publish_service;
pub mod release_manager;
pub mod session;

// Re-export commonly used types
pub use publish_service::{PublishOutcome, PublishService, PublishStep};
pub use release_manager::ensure_deletable;
pub use session::{PublishContext, Session};
