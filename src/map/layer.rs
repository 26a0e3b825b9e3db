use crate::color::Rgb;
use crate::config::StyleConfig;
use crate::map::spatial::FeatureGrid;
use geo::{BoundingRect, Contains, Intersects, MultiPoint, MultiPolygon, Point, Polygon, Rect};
use geojson::FeatureCollection;

/// Popup label for regions without a usable name
pub const FALLBACK_NAME: &str = "Sin nombre";

/// One named shape from the boundary dataset
#[derive(Clone, Debug)]
pub struct Region {
    /// `properties.name`; the join key against tabular rows
    pub name: Option<String>,
    /// Polygons in (lon, lat)
    pub shape: MultiPolygon<f64>,
    pub bounds: Rect<f64>,
}

impl Region {
    pub fn new(name: Option<String>, shape: MultiPolygon<f64>) -> Self {
        let bounds = shape
            .bounding_rect()
            .unwrap_or(Rect::new(geo::coord! { x: 0.0, y: 0.0 }, geo::coord! { x: 0.0, y: 0.0 }));
        Self { name, shape, bounds }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(FALLBACK_NAME)
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let p = Point::new(lon, lat);
        self.bounds.intersects(&p) && self.shape.contains(&p)
    }
}

/// Polygonal regions extracted from a GeoJSON feature collection
#[derive(Clone, Debug, Default)]
pub struct BoundaryFeatureCollection {
    pub regions: Vec<Region>,
}

impl BoundaryFeatureCollection {
    /// Keep features with polygonal geometry; others are dropped
    pub fn from_geojson(fc: &FeatureCollection) -> Self {
        let mut regions = Vec::with_capacity(fc.features.len());
        let mut skipped = 0usize;

        for feature in &fc.features {
            let shape = feature
                .geometry
                .as_ref()
                .and_then(|g| match geo::Geometry::<f64>::try_from(g.value.clone()) {
                    Ok(geometry) => Some(geometry),
                    Err(e) => {
                        tracing::debug!(error = %e, "failed to convert feature geometry");
                        None
                    }
                })
                .map(|geometry| {
                    let mut polygons = Vec::new();
                    collect_polygons(geometry, &mut polygons);
                    MultiPolygon::new(polygons)
                });

            let Some(shape) = shape.filter(|s| s.bounding_rect().is_some()) else {
                skipped += 1;
                continue;
            };

            let name = feature.property("name").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
            regions.push(Region::new(name, shape));
        }

        if skipped > 0 {
            tracing::debug!(skipped, "dropped features without polygon geometry");
        }
        Self { regions }
    }

    /// Extent of every region; `None` when there are no regions
    pub fn bounds(&self) -> Option<Rect<f64>> {
        let corners: MultiPoint<f64> = self
            .regions
            .iter()
            .flat_map(|r| [Point::from(r.bounds.min()), Point::from(r.bounds.max())])
            .collect();
        corners.bounding_rect()
    }
}

fn collect_polygons(geometry: geo::Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        geo::Geometry::Polygon(p) => out.push(p),
        geo::Geometry::MultiPolygon(mp) => out.extend(mp),
        geo::Geometry::GeometryCollection(members) => {
            for g in members {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

/// Resolved paint for one region
#[derive(Clone, Debug, PartialEq)]
pub struct RegionStyle {
    /// Color string as produced by classification
    pub fill_color: String,
    pub fill: Rgb,
    pub fill_opacity: f64,
    pub border: Rgb,
    pub weight: u8,
    pub opacity: f64,
}

impl RegionStyle {
    /// Look of a freshly loaded, not yet painted layer
    pub fn unpainted() -> Self {
        let blue = Rgb(0x33, 0x88, 0xff);
        Self {
            fill_color: "#3388ff".to_string(),
            fill: blue,
            fill_opacity: 0.2,
            border: blue,
            weight: 3,
            opacity: 1.0,
        }
    }
}

/// Fixed stroke settings applied on every repaint
#[derive(Clone, Debug)]
pub struct PaintStyle {
    pub weight: u8,
    pub opacity: f64,
    pub border: Rgb,
    pub fill_opacity: f64,
}

impl PaintStyle {
    pub fn from_config(config: &StyleConfig) -> Self {
        Self {
            weight: config.weight,
            opacity: config.opacity,
            border: Rgb::parse(&config.border_color).unwrap_or(Rgb(255, 255, 255)),
            fill_opacity: config.fill_opacity,
        }
    }

    pub fn region(&self, fill_color: &str) -> RegionStyle {
        RegionStyle {
            fill_color: fill_color.to_string(),
            fill: Rgb::parse(fill_color).unwrap_or(Rgb(0xcc, 0xcc, 0xcc)),
            fill_opacity: self.fill_opacity,
            border: self.border,
            weight: self.weight,
            opacity: self.opacity,
        }
    }
}

impl Default for PaintStyle {
    fn default() -> Self {
        Self::from_config(&StyleConfig::default())
    }
}

/// The rendered boundary layer: regions plus their current paint
#[derive(Debug)]
pub struct BoundaryLayer {
    pub regions: Vec<Region>,
    /// `None` for a layer without regions
    pub bounds: Option<Rect<f64>>,
    pub styles: Vec<RegionStyle>,
    /// Joined value per region, filled in by painting
    pub values: Vec<Option<f64>>,
    pub painted: bool,
    index: FeatureGrid,
}

impl BoundaryLayer {
    pub fn new(collection: BoundaryFeatureCollection) -> Self {
        let bounds = collection.bounds();
        let regions = collection.regions;
        let index = FeatureGrid::build(regions.iter().map(|r| &r.bounds), bounds.as_ref());
        let n = regions.len();
        Self {
            regions,
            bounds,
            styles: vec![RegionStyle::unpainted(); n],
            values: vec![None; n],
            painted: false,
            index,
        }
    }

    /// Topmost region under (lon, lat); later regions draw over earlier ones
    pub fn hit_test(&self, lon: f64, lat: f64) -> Option<usize> {
        self.index
            .query_point(lon, lat)
            .iter()
            .rev()
            .copied()
            .find(|&i| self.regions[i].contains(lon, lat))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerState {
    Empty,
    Loaded,
    Painted,
}

/// Owner of the single active boundary layer
#[derive(Debug, Default)]
pub struct LayerSlot {
    current: Option<BoundaryLayer>,
}

impl LayerSlot {
    /// Install `layer`, always removing the previous one first
    pub fn replace(&mut self, layer: BoundaryLayer) -> Option<BoundaryLayer> {
        let previous = self.current.take();
        if let Some(old) = &previous {
            tracing::debug!(regions = old.regions.len(), "removed previous boundary layer");
        }
        self.current = Some(layer);
        previous
    }

    pub fn get(&self) -> Option<&BoundaryLayer> {
        self.current.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut BoundaryLayer> {
        self.current.as_mut()
    }

    pub fn state(&self) -> LayerState {
        match &self.current {
            None => LayerState::Empty,
            Some(layer) if layer.painted => LayerState::Painted,
            Some(_) => LayerState::Loaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square_region(name: Option<&str>, x0: f64, y0: f64) -> Region {
        let square = polygon![
            (x: x0, y: y0),
            (x: x0 + 1.0, y: y0),
            (x: x0 + 1.0, y: y0 + 1.0),
            (x: x0, y: y0 + 1.0),
        ];
        Region::new(name.map(str::to_string), MultiPolygon::new(vec![square]))
    }

    fn collection() -> BoundaryFeatureCollection {
        BoundaryFeatureCollection {
            regions: vec![square_region(Some("A"), 0.0, 0.0), square_region(None, 1.0, 0.0)],
        }
    }

    #[test]
    fn test_from_geojson_keeps_polygons() {
        let fc: FeatureCollection = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"Bern"},"geometry":{"type":"Polygon",
                "coordinates":[[[7,46],[8,46],[8,47],[7,47],[7,46]]]}},
            {"type":"Feature","properties":{"name":"Lake"},"geometry":{"type":"Point","coordinates":[7,46]}}
        ]}"#
        .parse()
        .unwrap();
        let bfc = BoundaryFeatureCollection::from_geojson(&fc);
        assert_eq!(bfc.regions.len(), 1);
        assert_eq!(bfc.regions[0].name.as_deref(), Some("Bern"));
        assert_eq!(bfc.bounds().map(|b| b.max().y), Some(47.0));
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(square_region(None, 0.0, 0.0).display_name(), FALLBACK_NAME);
        assert_eq!(square_region(Some(""), 0.0, 0.0).display_name(), FALLBACK_NAME);
        assert_eq!(square_region(Some("Uri"), 0.0, 0.0).display_name(), "Uri");
    }

    #[test]
    fn test_hit_test() {
        let layer = BoundaryLayer::new(collection());
        assert_eq!(layer.hit_test(0.5, 0.5), Some(0));
        assert_eq!(layer.hit_test(1.5, 0.5), Some(1));
        assert_eq!(layer.hit_test(5.0, 5.0), None);
    }

    #[test]
    fn test_hole_is_outside_region() {
        let ring_with_hole = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            interiors: [[(x: 4.0, y: 4.0), (x: 6.0, y: 4.0), (x: 6.0, y: 6.0), (x: 4.0, y: 6.0)]]
        );
        let region = Region::new(Some("Lake shore".to_string()), MultiPolygon::new(vec![ring_with_hole]));
        assert!(region.contains(1.0, 1.0));
        assert!(!region.contains(5.0, 5.0));
        assert_eq!(region.bounds.max().x, 10.0);
    }

    #[test]
    fn test_empty_collection_has_no_bounds() {
        assert!(BoundaryFeatureCollection::default().bounds().is_none());
    }

    #[test]
    fn test_slot_holds_one_layer() {
        let mut slot = LayerSlot::default();
        assert_eq!(slot.state(), LayerState::Empty);
        assert!(slot.replace(BoundaryLayer::new(collection())).is_none());
        assert_eq!(slot.state(), LayerState::Loaded);

        let old = slot.replace(BoundaryLayer::new(BoundaryFeatureCollection::default()));
        assert_eq!(old.map(|l| l.regions.len()), Some(2));
        assert_eq!(slot.get().map(|l| l.regions.len()), Some(0));
    }
}
