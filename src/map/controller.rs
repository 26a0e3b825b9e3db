use crate::classify::{classify, RegionValue};
use crate::data::Basemap;
use crate::map::layer::{BoundaryFeatureCollection, BoundaryLayer, LayerSlot, LayerState, PaintStyle};
use crate::map::projection::Viewport;
use crate::map::renderer::{self, MapLayers};
use crate::slider::ChangeEvent;
use std::collections::HashMap;

/// Popup anchored at a clicked map position
#[derive(Clone, Debug, PartialEq)]
pub struct Popup {
    pub lon: f64,
    pub lat: f64,
    pub region: usize,
    pub title: String,
    pub value: Option<f64>,
}

impl Popup {
    pub fn content(&self) -> String {
        match self.value {
            Some(v) => format!("{}: {}", self.title, format_value(v)),
            None => self.title.clone(),
        }
    }
}

/// Integers print without a fractional part
pub fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v:.2}")
    }
}

/// Owns the viewport and the single boundary layer; loads, paints and
/// answers clicks on it.
pub struct MapController {
    pub viewport: Viewport,
    slot: LayerSlot,
    style: PaintStyle,
    basemap: Basemap,
    popup: Option<Popup>,
}

impl MapController {
    pub fn new(viewport: Viewport, style: PaintStyle, basemap: Basemap) -> Self {
        Self {
            viewport,
            slot: LayerSlot::default(),
            style,
            basemap,
            popup: None,
        }
    }

    pub fn state(&self) -> LayerState {
        self.slot.state()
    }

    pub fn layer(&self) -> Option<&BoundaryLayer> {
        self.slot.get()
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn basemap(&self) -> &Basemap {
        &self.basemap
    }

    /// Replace the boundary layer and frame it
    pub fn load_boundaries(&mut self, collection: BoundaryFeatureCollection) {
        let layer = BoundaryLayer::new(collection);
        tracing::info!(regions = layer.regions.len(), "boundary layer loaded");
        self.slot.replace(layer);
        self.popup = None;
        self.fit();
    }

    /// Fit the viewport to the current layer's bounds
    pub fn fit(&mut self) {
        if let Some(bounds) = self.slot.get().and_then(|layer| layer.bounds) {
            self.viewport.fit_bounds(&bounds);
        }
    }

    /// Join regions to rows by exact name and restyle them from `event`.
    /// Returns false when there is no layer to paint.
    pub fn paint(&mut self, event: &ChangeEvent, rows: &[RegionValue]) -> bool {
        let Some(layer) = self.slot.get_mut() else {
            tracing::debug!("paint requested with no boundary layer");
            return false;
        };

        // First row wins for duplicated names
        let mut by_name: HashMap<&str, Option<f64>> = HashMap::with_capacity(rows.len());
        for row in rows {
            by_name.entry(row.name.as_str()).or_insert(row.total);
        }

        let mut matched = 0usize;
        for (i, region) in layer.regions.iter().enumerate() {
            let value = region
                .name
                .as_deref()
                .and_then(|name| by_name.get(name))
                .copied();
            if value.is_some() {
                matched += 1;
            }
            let value = value.flatten();
            layer.styles[i] = self.style.region(classify(value, Some(&event.ranges)));
            layer.values[i] = value;
        }
        layer.painted = true;

        tracing::debug!(
            kind = ?event.kind,
            regions = layer.regions.len(),
            matched,
            "painted boundary layer"
        );

        if let Some(popup) = &mut self.popup {
            popup.value = layer.values.get(popup.region).copied().flatten();
        }
        true
    }

    /// Open a popup for the region under braille pixel (px, py), or close
    /// the popup when the click misses every region.
    pub fn click(&mut self, px: i32, py: i32) -> Option<&Popup> {
        let (lon, lat) = self.viewport.unproject(px, py);
        let painted = self.slot.state() == LayerState::Painted;

        self.popup = self.slot.get().and_then(|layer| {
            let idx = layer.hit_test(lon, lat)?;
            Some(Popup {
                lon,
                lat,
                region: idx,
                title: layer.regions[idx].display_name().to_string(),
                value: if painted { layer.values[idx] } else { None },
            })
        });
        self.popup.as_ref()
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    pub fn render(&self, cols: usize, rows: usize) -> MapLayers {
        renderer::render(self.slot.get(), &self.basemap, &self.viewport, cols, rows)
    }
}
