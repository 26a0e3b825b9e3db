mod controller;
mod geometry;
mod layer;
mod projection;
mod renderer;
mod spatial;

pub use controller::{format_value, MapController, Popup};
pub use layer::{
    BoundaryFeatureCollection, BoundaryLayer, LayerSlot, LayerState, PaintStyle, Region, RegionStyle,
    FALLBACK_NAME,
};
pub use projection::Viewport;
pub use renderer::{render, LineString, MapLayers};
