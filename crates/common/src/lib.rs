//! Shared value types: colors and pixel sizes.

mod types;

pub use types::{Color, ColorParseError, PixelSize};
