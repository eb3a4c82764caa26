//! Orchestration API subsystem.
//!
//! # Data Flow
//! ```text
//! event.resource_uri
//!     → client.rs (GET {api_url}{resource_uri}, basic auth)
//!     → ContainerDescriptor
//! ```
//!
//! fixture.rs serves descriptors from memory for `vulcand-ctl replay --dry-run`.

pub mod client;
pub mod fixture;

pub use client::{basic_auth_value, container_id, ContainerFetcher, DockerCloudClient, FetchError};
pub use fixture::StaticFetcher;
