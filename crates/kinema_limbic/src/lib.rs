//! # Kinema Limbic Model
//!
//! The affective half of the agent. A six-axis neuromodulator vector is nudged by
//! signed deltas from the judgment pipeline and drifts back toward a configured
//! baseline between events (homeostasis).
//!
//! ## Ownership
//!
//! The cognitive loop owns the single `AffectModel` and is its only writer.
//! Readers get immutable `AffectiveState` snapshots, never a reference into the
//! live model.

mod homeostasis;
mod model;

pub use homeostasis::HomeostasisConfig;
pub use model::AffectModel;
