use geo::Rect;
use std::collections::HashMap;

/// Grid resolution along the longer side of the indexed extent
const CELLS_ACROSS: f64 = 32.0;

/// Spatial index for region bounding boxes.
/// Each region is inserted into every cell its bbox overlaps, so point
/// queries never miss a region; candidates still need an exact
/// point-in-polygon test.
#[derive(Debug)]
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from region bounding boxes, sizing cells to the overall extent
    pub fn build<'a>(bboxes: impl Iterator<Item = &'a Rect<f64>>, extent: Option<&Rect<f64>>) -> Self {
        let span = extent.map_or(0.0, |e| e.width().max(e.height()));
        let cell_size = if span.is_finite() && span > 0.0 {
            span / CELLS_ACROSS
        } else {
            1.0
        };

        let mut grid = Self::new(cell_size);
        for (idx, b) in bboxes.enumerate() {
            let min_cell = grid.to_cell(b.min().x, b.min().y);
            let max_cell = grid.to_cell(b.max().x, b.max().y);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Region indices whose bbox cell covers the point, in insertion order
    pub fn query_point(&self, lon: f64, lat: f64) -> &[usize] {
        self.cells
            .get(&self.to_cell(lon, lat))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    fn b(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Rect<f64> {
        Rect::new(coord! { x: min_lon, y: min_lat }, coord! { x: max_lon, y: max_lat })
    }

    #[test]
    fn test_point_query_hits_overlapping_boxes() {
        let boxes = [b(0.0, 0.0, 1.0, 1.0), b(1.0, 0.0, 2.0, 1.0), b(5.0, 5.0, 6.0, 6.0)];
        let grid = FeatureGrid::build(boxes.iter(), Some(&b(0.0, 0.0, 6.0, 6.0)));
        assert!(grid.query_point(0.5, 0.5).contains(&0));
        assert!(!grid.query_point(0.5, 0.5).contains(&2));
        assert!(grid.query_point(5.5, 5.5).contains(&2));
        assert!(grid.query_point(-50.0, 3.0).is_empty());
    }

    #[test]
    fn test_degenerate_extent() {
        let boxes = [b(3.0, 3.0, 3.0, 3.0)];
        let grid = FeatureGrid::build(boxes.iter(), Some(&boxes[0]));
        assert_eq!(grid.query_point(3.0, 3.0), &[0]);
    }
}
