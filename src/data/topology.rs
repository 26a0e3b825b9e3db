use crate::error::{MapError, Result};
use geojson::{feature, Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use serde::Deserialize;

/// Quantization transform applied to arc and point coordinates
#[derive(Clone, Debug, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

/// A parsed TopoJSON topology.
///
/// `objects` keeps source order, so "the first object" is the first key
/// as written in the file.
#[derive(Debug, Deserialize)]
pub struct Topology {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub arcs: Vec<Vec<Vec<f64>>>,
    pub objects: JsonObject,
}

/// A TopoJSON geometry object; `"type": null` marks an object without geometry
#[derive(Debug, Deserialize)]
struct GeometryObject {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    id: Option<JsonValue>,
    #[serde(default)]
    properties: Option<JsonObject>,
    #[serde(flatten)]
    body: JsonObject,
}

impl GeometryObject {
    fn shape(&self) -> Result<Option<Shape>> {
        let Some(kind) = &self.kind else {
            return Ok(None);
        };
        let mut body = self.body.clone();
        body.insert("type".to_string(), JsonValue::String(kind.clone()));
        serde_json::from_value(JsonValue::Object(body))
            .map(Some)
            .map_err(|e| MapError::Decode {
                what: "topology object",
                reason: format!("{kind}: {e}"),
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Shape {
    GeometryCollection { geometries: Vec<GeometryObject> },
    Point { coordinates: Vec<f64> },
    MultiPoint { coordinates: Vec<Vec<f64>> },
    LineString { arcs: Vec<i64> },
    MultiLineString { arcs: Vec<Vec<i64>> },
    Polygon { arcs: Vec<Vec<i64>> },
    MultiPolygon { arcs: Vec<Vec<Vec<i64>>> },
}

impl Topology {
    /// Parse TopoJSON bytes; the buffer is used as simd-json scratch space
    pub fn from_slice(bytes: &mut [u8]) -> Result<Self> {
        let topology: Topology = simd_json::serde::from_slice(bytes).map_err(|e| MapError::Decode {
            what: "topology",
            reason: e.to_string(),
        })?;
        if topology.kind != "Topology" {
            return Err(MapError::Decode {
                what: "topology",
                reason: format!("expected type \"Topology\", found {:?}", topology.kind),
            });
        }
        Ok(topology)
    }

    /// Decode arc `index`; negative indices (`!i`) walk the arc backwards
    fn arc(&self, index: i64) -> Result<Vec<Vec<f64>>> {
        let (slot, reversed) = if index < 0 { (!index, true) } else { (index, false) };
        let raw = usize::try_from(slot)
            .ok()
            .and_then(|i| self.arcs.get(i))
            .ok_or_else(|| MapError::Decode {
                what: "topology",
                reason: format!("arc index {index} out of range"),
            })?;

        let mut points: Vec<Vec<f64>> = match &self.transform {
            Some(t) => {
                let (mut x, mut y) = (0.0, 0.0);
                raw.iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| {
                        x += p[0];
                        y += p[1];
                        vec![x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1]]
                    })
                    .collect()
            }
            None => raw.iter().filter(|p| p.len() >= 2).map(|p| vec![p[0], p[1]]).collect(),
        };

        if reversed {
            points.reverse();
        }
        Ok(points)
    }

    /// Stitch arcs into one position list, dropping each shared junction
    fn line(&self, arcs: &[i64]) -> Result<Vec<Vec<f64>>> {
        let mut points: Vec<Vec<f64>> = Vec::new();
        for &index in arcs {
            if !points.is_empty() {
                points.pop();
            }
            points.extend(self.arc(index)?);
        }
        if points.len() < 2 {
            if let Some(first) = points.first().cloned() {
                points.push(first);
            }
        }
        Ok(points)
    }

    fn ring(&self, arcs: &[i64]) -> Result<Vec<Vec<f64>>> {
        let mut points = self.line(arcs)?;
        while !points.is_empty() && points.len() < 4 {
            points.push(points[0].clone());
        }
        Ok(points)
    }

    fn point(&self, p: &[f64]) -> Vec<f64> {
        match &self.transform {
            Some(t) if p.len() >= 2 => {
                vec![p[0] * t.scale[0] + t.translate[0], p[1] * t.scale[1] + t.translate[1]]
            }
            _ => p.to_vec(),
        }
    }

    fn geometry(&self, shape: &Shape) -> Result<Value> {
        let value = match shape {
            Shape::GeometryCollection { geometries } => {
                let mut members = Vec::with_capacity(geometries.len());
                for g in geometries {
                    if let Some(shape) = g.shape()? {
                        members.push(Geometry::new(self.geometry(&shape)?));
                    }
                }
                Value::GeometryCollection(members)
            }
            Shape::Point { coordinates } => Value::Point(self.point(coordinates)),
            Shape::MultiPoint { coordinates } => {
                Value::MultiPoint(coordinates.iter().map(|p| self.point(p)).collect())
            }
            Shape::LineString { arcs } => Value::LineString(self.line(arcs)?),
            Shape::MultiLineString { arcs } => Value::MultiLineString(
                arcs.iter().map(|l| self.line(l)).collect::<Result<_>>()?,
            ),
            Shape::Polygon { arcs } => {
                Value::Polygon(arcs.iter().map(|r| self.ring(r)).collect::<Result<_>>()?)
            }
            Shape::MultiPolygon { arcs } => Value::MultiPolygon(
                arcs.iter()
                    .map(|poly| poly.iter().map(|r| self.ring(r)).collect::<Result<Vec<_>>>())
                    .collect::<Result<_>>()?,
            ),
        };
        Ok(value)
    }

    fn feature(&self, object: &GeometryObject) -> Result<Feature> {
        let id = object.id.as_ref().and_then(|id| match id {
            JsonValue::String(s) => Some(feature::Id::String(s.clone())),
            JsonValue::Number(n) => Some(feature::Id::Number(n.clone())),
            _ => None,
        });
        let geometry = match object.shape()? {
            Some(shape) => Some(Geometry::new(self.geometry(&shape)?)),
            None => None,
        };
        Ok(Feature {
            bbox: None,
            geometry,
            id,
            properties: Some(object.properties.clone().unwrap_or_default()),
            foreign_members: None,
        })
    }
}

/// Convert the first object of `topology` into a feature collection.
///
/// A `GeometryCollection` yields one feature per member; any other object
/// yields a collection holding a single feature.
pub fn to_feature_collection(topology: &Topology) -> Result<FeatureCollection> {
    let (name, raw) = topology.objects.iter().next().ok_or(MapError::EmptyTopology)?;
    let object: GeometryObject =
        serde_json::from_value(raw.clone()).map_err(|e| MapError::Decode {
            what: "topology object",
            reason: format!("{name}: {e}"),
        })?;

    let features = match object.shape()? {
        Some(Shape::GeometryCollection { geometries }) => geometries
            .iter()
            .map(|g| topology.feature(g))
            .collect::<Result<Vec<_>>>()?,
        _ => vec![topology.feature(&object)?],
    };

    tracing::debug!(object = %name, features = features.len(), "converted topology object");

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Parse and convert in one step
pub fn convert_bytes(bytes: &mut [u8]) -> Result<FeatureCollection> {
    let topology = Topology::from_slice(bytes)?;
    to_feature_collection(&topology)
}
