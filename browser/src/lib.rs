//! Lazy-loading outputs browser core.
//!
//! - [`Session`] is the UI session state and the toggle/fetch state machine.
//!   It is an immutable value: every transition consumes it and returns the
//!   next session plus at most one [`Fetch`] to issue.
//! - [`Transformer`] derives the view tree from the server tree and a session.
//! - [`Browser`] keeps a working copy of the store's tree and threads the
//!   session through transitions for a presentation shell.

mod browser;
mod session;
mod transform;

pub use crate::browser::*;
pub use crate::session::*;
pub use crate::transform::*;
