//! Route fact extraction subsystem.
//!
//! # Data Flow
//! ```text
//! ContainerDescriptor (fetched from orchestration API)
//!     → extractor.rs (env lookups, backend grouping, hostname)
//!     → RouteFacts | FactError::{MissingRoute, MissingPort}
//! ```

pub mod descriptor;
pub mod extractor;

pub use descriptor::{ContainerDescriptor, EnvVar};
pub use extractor::{backend_name, FactError, FactExtractor, RouteFacts};
