use crate::braille::BrailleCanvas;
use crate::color::{Rgb, BACKGROUND};
use crate::data::Basemap;
use crate::map::geometry::{draw_line, draw_thick_line};
use crate::map::layer::BoundaryLayer;
use crate::map::projection::Viewport;
use glam::DVec2;
use rayon::prelude::*;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Rasterized map, one entry per terminal cell
pub struct MapLayers {
    pub width: usize,
    pub height: usize,
    /// Blended fill per cell, row-major; `None` outside every region
    pub fills: Vec<Option<Rgb>>,
    pub outlines: BrailleCanvas,
    pub outline_color: Rgb,
    pub basemap: BrailleCanvas,
}

impl MapLayers {
    #[inline(always)]
    pub fn fill(&self, cx: usize, cy: usize) -> Option<Rgb> {
        self.fills.get(cy * self.width + cx).copied().flatten()
    }
}

/// Rasterize the boundary layer and basemap for a `cols` x `rows` cell area.
/// `viewport` must already be sized to the braille pixel grid (2x4 per cell).
pub fn render(
    layer: Option<&BoundaryLayer>,
    basemap: &Basemap,
    viewport: &Viewport,
    cols: usize,
    rows: usize,
) -> MapLayers {
    let mut basemap_canvas = BrailleCanvas::new(cols, rows);
    for line in &basemap.lines {
        draw_linestring(&mut basemap_canvas, line.iter().copied(), viewport, false);
    }

    let mut outlines = BrailleCanvas::new(cols, rows);
    let mut fills = vec![None; cols * rows];
    let mut outline_color = BACKGROUND;

    if let Some(layer) = layer {
        fill_regions(layer, viewport, cols, &mut fills);

        if let Some(style) = layer.styles.first() {
            outline_color = style.border.blend(BACKGROUND, style.opacity);
        }
        for (region, style) in layer.regions.iter().zip(&layer.styles) {
            let thick = style.weight >= 2;
            for polygon in region.shape.iter() {
                for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                    draw_linestring(&mut outlines, ring.coords().map(|c| (c.x, c.y)), viewport, thick);
                }
            }
        }
    }

    MapLayers {
        width: cols,
        height: rows,
        fills,
        outlines,
        outline_color,
        basemap: basemap_canvas,
    }
}

/// Sample each cell center against the layer; rows rasterize in parallel
fn fill_regions(layer: &BoundaryLayer, viewport: &Viewport, cols: usize, fills: &mut [Option<Rgb>]) {
    if cols == 0 {
        return;
    }
    fills.par_chunks_mut(cols).enumerate().for_each(|(cy, row)| {
        for (cx, cell) in row.iter_mut().enumerate() {
            let center = DVec2::new(cx as f64 * 2.0 + 1.0, cy as f64 * 4.0 + 2.0);
            let (lon, lat) = viewport.unproject_f(center.x, center.y);
            *cell = layer.hit_test(lon, lat).map(|i| {
                let style = &layer.styles[i];
                style.fill.blend(BACKGROUND, style.fill_opacity)
            });
        }
    });
}

/// Draw a linestring with viewport culling
fn draw_linestring(
    canvas: &mut BrailleCanvas,
    points: impl Iterator<Item = (f64, f64)>,
    viewport: &Viewport,
    thick: bool,
) {
    let mut prev: Option<(i32, i32)> = None;

    for (lon, lat) in points {
        let (px, py) = viewport.project(lon, lat);

        if let Some((prev_x, prev_y)) = prev {
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                if thick {
                    draw_thick_line(canvas, prev_x, prev_y, px, py);
                } else {
                    draw_line(canvas, prev_x, prev_y, px, py);
                }
            }
        }

        prev = Some((px, py));
    }
}
