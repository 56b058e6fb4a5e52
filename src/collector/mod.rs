//! Keystroke intake from the capture side.
//!
//! The capture mechanism is external; this module defines the key events it
//! produces and a collector that reads them from a byte stream.

pub mod reader;
pub mod types;

// Re-export commonly used types
pub use reader::{CollectorError, ReaderCollector};
pub use types::{KeyEvent, KeyInput};
