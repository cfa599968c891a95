//! Table definitions
pub mod attachments;
pub mod options;
