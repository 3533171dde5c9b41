//! Report rendering.

pub mod html;

pub use html::*;
