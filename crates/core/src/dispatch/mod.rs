//! Dispatch loop.
//!
//! One pass lists the inbound folder, classifies every `*.xml` file and
//! sends it to the matching purchase order API operation:
//!
//! | Message type     | Operation               | Order id |
//! |------------------|-------------------------|----------|
//! | `new_order`      | `send_order`            | no       |
//! | `order_update`   | `update_order`          | yes      |
//! | `status_message` | `send_status_message`   | yes      |
//!
//! A file moves to the processed folder only when the API accepted it;
//! anything else (classification error, missing id, remote failure, panic)
//! sends it to the failed folder. A failure never stops the pass.

mod dispatcher;
mod types;

pub use dispatcher::Dispatcher;
pub use types::{DispatchError, DispatchReport, Disposition, FileReport};
