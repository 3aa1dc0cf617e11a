//! Collaborator abstractions.
//!
//! These traits define the seams between the pipeline and everything it
//! does not own: page rendering, the language model, and durable storage.

pub mod browser;
pub mod completion;
pub mod store;
