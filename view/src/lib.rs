//! Presentation glue for the outputs tree: icons, decorators and row layout.

mod icon;
mod render;

pub use crate::icon::*;
pub use crate::render::*;
