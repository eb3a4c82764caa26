//! vulcand-sync: publishes containers from the Docker Cloud event stream as
//! vulcand routes in etcd.

pub mod config;
pub mod events;
pub mod facts;
pub mod lifecycle;
pub mod observability;
pub mod orchestration;
pub mod reconcile;
pub mod resilience;
pub mod store;

pub use config::schema::SyncConfig;
pub use events::Dispatcher;
pub use lifecycle::Shutdown;
pub use reconcile::Reconciler;
