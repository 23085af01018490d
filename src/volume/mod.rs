//! Volume attachment planning and reconciliation.

mod diff;
mod error;
mod reconcile;

pub use diff::{VolumePlan, diff_volumes};
pub use error::ReconcileError;
pub use reconcile::{ReconcileReport, VolumeReconciler};
