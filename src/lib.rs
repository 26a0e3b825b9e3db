//! Terminal choropleth maps: TopoJSON boundaries painted from a tabular
//! dataset through user-adjustable value ranges.

pub mod braille;
pub mod classify;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod map;
pub mod slider;

pub use error::{MapError, Result};
