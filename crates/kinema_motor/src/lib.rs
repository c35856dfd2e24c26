//! # Kinema Motor Layer
//!
//! Everything that leaves the process goes through here. The controller on the
//! other side is slow and fragile, so all outbound commands funnel into a single
//! `Dispatcher` that enforces:
//!
//! - minimum spacing per command class (general commands are dropped when too
//!   early, critical ones wait out a shorter spacing and are never dropped)
//! - deduplication of identical requests within a short window
//! - a timeout on every controller call
//! - pose bookkeeping, updated only after a confirmed position change
//!
//! The limiter, the pose tracker and the dispatch log share one async mutex that
//! is held across the controller call.

pub mod command;
pub mod dispatcher;
pub mod limiter;
pub mod position;
pub mod transport;

pub use command::{CommandClass, CommandRequest, DispatchOutcome, DispatchRecord, DispatchResult};
pub use dispatcher::{DispatchSettings, Dispatcher};
pub use limiter::{Admission, RateLimiter, RateLimits};
pub use position::{PoseTransition, PositionTracker, PrerequisiteCheck, TransitionCause};
pub use transport::{
    ControllerTransport, HttpTransport, LoggingTransport, MockTransport, TransportError,
};
