//! axterm: Voice Control accessibility for terminal sessions.
//!
//! [`accessibility::AccessibleSession`] presents a terminal as a single text
//! area to the platform accessibility API so dictation can read the buffer,
//! track the cursor and type at the prompt. [`core`] provides an in-process
//! grid that implements the surface side of that contract.

pub mod accessibility;
pub mod config;
pub mod core;
