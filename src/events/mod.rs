//! Event intake subsystem.
//!
//! # Data Flow
//! ```text
//! websocket (source.rs)
//!     → mpsc::Sender<SourceSignal>
//!     → dispatcher.rs (decode → classify → fetch → reconcile)
//!     → reconcile::Reconciler
//! ```
//!
//! # Design Decisions
//! - Source and dispatcher are separate tasks joined by a bounded channel
//! - The dispatcher is the only consumer; event order is arrival order

pub mod dispatcher;
pub mod source;
pub mod types;

pub use dispatcher::{DispatchError, DispatchOutcome, Dispatcher};
pub use source::{EventSource, SourceError};
pub use types::{RawEvent, SourceSignal};
