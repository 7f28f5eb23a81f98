//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, title/tab/status bars and overlays
//! - `input`: keyboard event handling
//! - `styles`: color palette and text styles
//! - `tabs`: content of each admin page

pub mod input;
pub mod render;
pub mod styles;
pub mod tabs;
