use geo::Rect;
use std::f64::consts::PI;

const MIN_ZOOM: f64 = 0.5;
/// Deep enough to frame a single small region
const MAX_ZOOM: f64 = 5000.0;
/// Fraction of the canvas a fitted layer may occupy
const FIT_PADDING: f64 = 0.9;
const MAX_LAT: f64 = 85.0;

/// Web Mercator x in [0, 1]
#[inline(always)]
fn mercator_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

/// Web Mercator y in [0, 1], north at 0
#[inline(always)]
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT) * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

#[inline(always)]
fn inverse_mercator_y(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI
}

/// Viewport representing the visible map area and zoom level
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Zoom level (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// Create a world view (shows entire world)
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 20.0, 1.0, width, height)
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = 360.0 / (self.zoom * self.width.max(1) as f64);
        self.center_lon += dx as f64 * scale;
        self.center_lat -= dy as f64 * scale * 0.5; // Mercator distortion

        // Wrap longitude
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }

        self.center_lat = self.center_lat.clamp(-MAX_LAT, MAX_LAT);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor towards a specific pixel location
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        // Get the geographic coordinates under the mouse
        let (lon, lat) = self.unproject(px, py);

        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        // Pan so the same point sits under the mouse again
        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Center on `bounds` and pick the largest zoom that shows all of it
    pub fn fit_bounds(&mut self, bounds: &Rect<f64>) {
        let (min, max) = (bounds.min(), bounds.max());
        let finite = [min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite());
        if !finite || self.width == 0 || self.height == 0 {
            return;
        }

        let x0 = mercator_x(min.x);
        let x1 = mercator_x(max.x);
        let y0 = mercator_y(max.y);
        let y1 = mercator_y(min.y);

        self.center_lon = bounds.center().x;
        self.center_lat = inverse_mercator_y((y0 + y1) / 2.0);

        // Pixels per mercator unit is zoom * width
        let fit_x = if x1 > x0 { 1.0 / (x1 - x0) } else { MAX_ZOOM };
        let fit_y = if y1 > y0 {
            self.height as f64 / (self.width as f64 * (y1 - y0))
        } else {
            MAX_ZOOM
        };
        self.zoom = (fit_x.min(fit_y) * FIT_PADDING).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Unproject fractional pixel coordinates to (lon, lat)
    pub fn unproject_f(&self, px: f64, py: f64) -> (f64, f64) {
        let scale = self.zoom * self.width as f64;
        let center_x = mercator_x(self.center_lon);
        let center_y = mercator_y(self.center_lat);

        let x = (px - self.width as f64 / 2.0) / scale + center_x;
        let y = (py - self.height as f64 / 2.0) / scale + center_y;

        (x * 360.0 - 180.0, inverse_mercator_y(y))
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        self.unproject_f(px as f64, py as f64)
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let scale = self.zoom * self.width as f64;
        let px = ((mercator_x(lon) - mercator_x(self.center_lon)) * scale + self.width as f64 / 2.0) as i32;
        let py = ((mercator_y(lat) - mercator_y(self.center_lat)) * scale + self.height as f64 / 2.0) as i32;
        (px, py)
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0
            && min_x < self.width as i32
            && max_y >= 0
            && min_y < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let vp = Viewport::new(8.2, 46.8, 40.0, 200, 100);
        let (px, py) = vp.project(7.4, 46.9);
        let (lon, lat) = vp.unproject(px, py);
        assert!((lon - 7.4).abs() < 0.05);
        assert!((lat - 46.9).abs() < 0.05);
    }

    #[test]
    fn test_fit_bounds_frames_layer() {
        let mut vp = Viewport::world(200, 100);
        let bounds = Rect::new(coord! { x: 5.9, y: 45.8 }, coord! { x: 10.5, y: 47.8 });
        vp.fit_bounds(&bounds);
        assert!((vp.center_lon - 8.2).abs() < 1e-9);
        assert!(vp.zoom > 10.0);

        for (lon, lat) in [(5.9, 45.8), (10.5, 47.8)] {
            let (px, py) = vp.project(lon, lat);
            assert!(px >= 0 && px <= 200, "x {px} outside");
            assert!(py >= 0 && py <= 100, "y {py} outside");
        }
    }

    #[test]
    fn test_fit_non_finite_bounds_is_noop() {
        let mut vp = Viewport::world(200, 100);
        vp.fit_bounds(&Rect::new(coord! { x: f64::NAN, y: 0.0 }, coord! { x: 1.0, y: 1.0 }));
        assert_eq!(vp.zoom, 1.0);
    }
}
