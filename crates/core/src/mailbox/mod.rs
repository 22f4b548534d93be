//! The filesystem mailbox.
//!
//! Four folders make up the mailbox: producers drop order documents into
//! *inbound*, the dispatcher moves each one to *processed* or *failed*, and
//! the reconciler writes remote order responses into *order responses*.
//!
//! Relocation never overwrites: a name already taken in the target folder
//! gets a `_YYYYMMDD_HHMMSS` suffix.

mod error;
mod folders;

pub use error::MailboxError;
pub use folders::{relocate, Mailbox};
