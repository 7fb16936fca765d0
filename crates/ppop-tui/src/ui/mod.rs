//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout and per-screen rendering
//! - `input`: keyboard event handling
//! - `styles`: colors and text styling

pub mod input;
pub mod render;
pub mod styles;
