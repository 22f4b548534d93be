//! Reconciliation loop.
//!
//! Drains the remote order response queue one item at a time. Each response
//! is written to `<order_number>.xml` in the responses folder and only then
//! removed from the queue, so a crash between the two steps redelivers the
//! response instead of losing it.

mod reconciler;
mod types;

pub use reconciler::Reconciler;
pub use types::{DrainReport, DrainStop, ReconcileError};
