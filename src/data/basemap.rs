use crate::map::LineString;
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;

/// Background line work (coastlines, national borders) drawn under regions
#[derive(Clone, Debug, Default)]
pub struct Basemap {
    pub lines: Vec<LineString>,
    pub attribution: String,
}

impl Basemap {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Load every configured GeoJSON file; unreadable files are skipped with a warning
pub fn load_basemap<P: AsRef<Path>>(files: &[P], attribution: &str) -> Basemap {
    let mut basemap = Basemap {
        lines: Vec::new(),
        attribution: attribution.to_string(),
    };

    for path in files {
        let path = path.as_ref();
        match load_lines(path) {
            Ok(lines) => {
                tracing::debug!(path = %path.display(), lines = lines.len(), "loaded basemap file");
                basemap.lines.extend(lines);
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to load basemap file"),
        }
    }

    basemap
}

fn load_lines(path: &Path) -> anyhow::Result<Vec<LineString>> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse()?;
    let mut lines = Vec::new();
    process_geojson_lines(&geojson, |line| lines.push(line));
    Ok(lines)
}

/// Process GeoJSON and extract line features
pub fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(LineString),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

fn to_line(coords: &[Vec<f64>]) -> LineString {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| (c[0], c[1]))
        .collect()
}

fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(LineString),
{
    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => {
            for coords in lines {
                add_line(to_line(coords));
            }
        }
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    add_line(to_line(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_from_mixed_geometries() {
        let geojson: GeoJson = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{},"geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]}},
            {"type":"Feature","properties":{},"geometry":{"type":"MultiPolygon","coordinates":[
                [[[0,0],[1,0],[1,1],[0,0]]],
                [[[5,5],[6,5],[6,6],[5,5]]]]}},
            {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[3,3]}}
        ]}"#
        .parse()
        .unwrap();

        let mut lines = Vec::new();
        process_geojson_lines(&geojson, |l| lines.push(l));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], vec![(0.0, 0.0), (1.0, 1.0)]);
        assert_eq!(lines[2][0], (5.0, 5.0));
    }

    #[test]
    fn test_missing_file_skipped() {
        let basemap = load_basemap(&["/nonexistent/coast.json"], "Natural Earth");
        assert!(basemap.is_empty());
        assert_eq!(basemap.attribution, "Natural Earth");
    }
}
