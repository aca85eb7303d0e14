//! Terminal UI module using ratatui.
//!
//! This module provides the TUI rendering and input handling:
//!
//! - `render`: Login view, protected shell, and overlays
//! - `input`: Keyboard and mouse event handling
//! - `styles`: Color schemes and text styling

pub mod input;
pub mod render;
pub mod styles;
