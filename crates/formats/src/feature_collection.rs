use foundation::bounds::{LatLng, LatLngBounds};
use serde_json::{Map, Value};

use crate::detail::FeatureDetail;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }

    pub fn to_lat_lng(self) -> LatLng {
        LatLng::new(self.lat_deg, self.lon_deg)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VectorGeometry {
    Point(GeoPoint),
    MultiPoint(Vec<GeoPoint>),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(Vec<Vec<GeoPoint>>),
    MultiPolygon(Vec<Vec<Vec<GeoPoint>>>),
}

impl VectorGeometry {
    /// GeoJSON `type` tag of this geometry.
    pub fn type_tag(&self) -> &'static str {
        match self {
            VectorGeometry::Point(_) => "Point",
            VectorGeometry::MultiPoint(_) => "MultiPoint",
            VectorGeometry::LineString(_) => "LineString",
            VectorGeometry::MultiLineString(_) => "MultiLineString",
            VectorGeometry::Polygon(_) => "Polygon",
            VectorGeometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Visits every vertex, rings and parts included.
    pub fn for_each_point(&self, mut f: impl FnMut(GeoPoint)) {
        match self {
            VectorGeometry::Point(p) => f(*p),
            VectorGeometry::MultiPoint(ps) | VectorGeometry::LineString(ps) => {
                ps.iter().copied().for_each(f)
            }
            VectorGeometry::MultiLineString(lines) | VectorGeometry::Polygon(lines) => {
                lines.iter().flatten().copied().for_each(f)
            }
            VectorGeometry::MultiPolygon(polys) => {
                polys.iter().flatten().flatten().copied().for_each(f)
            }
        }
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        let mut out: Option<LatLngBounds> = None;
        self.for_each_point(|p| match out.as_mut() {
            Some(b) => b.extend(p.to_lat_lng()),
            None => out = Some(LatLngBounds::from_point(p.to_lat_lng())),
        });
        out
    }

    /// Point at which popups anchor: the point itself, or the bounds center.
    pub fn anchor(&self) -> Option<LatLng> {
        if let VectorGeometry::Point(p) = self {
            return Some(p.to_lat_lng());
        }
        let b = self.bounds()?;
        Some(LatLng::new(
            (b.south_west.lat + b.north_east.lat) / 2.0,
            (b.south_west.lng + b.north_east.lng) / 2.0,
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorFeature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: VectorGeometry,
    /// Click behavior, decided once from `properties`.
    pub detail: FeatureDetail,
}

impl VectorFeature {
    pub fn new(id: Option<String>, properties: Map<String, Value>, geometry: VectorGeometry) -> Self {
        let detail = FeatureDetail::from_properties(&properties);
        Self {
            id,
            properties,
            geometry,
            detail,
        }
    }
}

/// Decoded vector dataset: one GeoJSON `FeatureCollection`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<VectorFeature>,
}

#[derive(Debug)]
pub enum FeatureCollectionError {
    Json(serde_json::Error),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for FeatureCollectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureCollectionError::Json(e) => write!(f, "JSON parse error: {e}"),
            FeatureCollectionError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            FeatureCollectionError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for FeatureCollectionError {}

impl FeatureCollection {
    pub fn new(features: Vec<VectorFeature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Smallest south-west / north-east box over all feature geometries.
    ///
    /// `None` when the collection has no features (or no vertices at all).
    pub fn bounds(&self) -> Option<LatLngBounds> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounds())
            .reduce(|a, b| a.union(&b))
    }

    pub fn extend(&mut self, other: FeatureCollection) {
        self.features.extend(other.features);
    }

    pub fn from_geojson_str(payload: &str) -> Result<Self, FeatureCollectionError> {
        let value: Value = serde_json::from_str(payload).map_err(FeatureCollectionError::Json)?;
        Self::from_geojson_value(value)
    }

    pub fn from_geojson_slice(payload: &[u8]) -> Result<Self, FeatureCollectionError> {
        let value: Value =
            serde_json::from_slice(payload).map_err(FeatureCollectionError::Json)?;
        Self::from_geojson_value(value)
    }

    /// Parses a GeoJSON `FeatureCollection`.
    ///
    /// Features whose geometry is `null`, a `GeometryCollection` or of an
    /// unknown type are skipped: they carry nothing drawable with a single
    /// style. Malformed coordinates of a known type still fail the parse.
    pub fn from_geojson_value(value: Value) -> Result<Self, FeatureCollectionError> {
        let obj = value
            .as_object()
            .ok_or(FeatureCollectionError::NotAFeatureCollection)?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(FeatureCollectionError::NotAFeatureCollection)?;
        if ty != "FeatureCollection" {
            return Err(FeatureCollectionError::NotAFeatureCollection);
        }

        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(FeatureCollectionError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            let invalid = |reason: String| FeatureCollectionError::InvalidFeature { index, reason };

            let feat_obj = feat_val
                .as_object()
                .ok_or_else(|| invalid("feature must be an object".to_string()))?;

            let feat_type = feat_obj
                .get("type")
                .and_then(|v| v.as_str())
                .ok_or_else(|| invalid("feature missing type".to_string()))?;
            if feat_type != "Feature" {
                return Err(invalid(format!("unexpected feature type: {feat_type}")));
            }

            let id = match feat_obj.get("id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };

            let properties = feat_obj
                .get("properties")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();

            let geometry_val = match feat_obj.get("geometry") {
                Some(Value::Null) => continue,
                Some(v) => v,
                None => return Err(invalid("feature missing geometry".to_string())),
            };
            if geometry_val
                .get("type")
                .and_then(|v| v.as_str())
                .is_some_and(|ty| !is_supported_geometry(ty))
            {
                continue;
            }
            let geometry = parse_geometry(geometry_val).map_err(invalid)?;

            features.push(VectorFeature::new(id, properties, geometry));
        }

        Ok(Self { features })
    }

    /// Emits a GeoJSON FeatureCollection. Property ordering may differ from
    /// the original input.
    pub fn to_geojson_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(
            "type".to_string(),
            Value::String("FeatureCollection".to_string()),
        );

        let features: Vec<Value> = self.features.iter().map(feature_to_geojson_value).collect();
        root.insert("features".to_string(), Value::Array(features));
        Value::Object(root)
    }
}

pub fn feature_to_geojson_value(feat: &VectorFeature) -> Value {
    let mut fobj = Map::new();
    fobj.insert("type".to_string(), Value::String("Feature".to_string()));
    if let Some(id) = &feat.id {
        fobj.insert("id".to_string(), Value::String(id.clone()));
    }
    fobj.insert(
        "properties".to_string(),
        Value::Object(feat.properties.clone()),
    );
    fobj.insert(
        "geometry".to_string(),
        geometry_to_geojson_value(&feat.geometry),
    );
    Value::Object(fobj)
}

fn geometry_to_geojson_value(geom: &VectorGeometry) -> Value {
    let coords = match geom {
        VectorGeometry::Point(p) => point_coords(p),
        VectorGeometry::MultiPoint(ps) | VectorGeometry::LineString(ps) => line_coords(ps),
        VectorGeometry::MultiLineString(lines) | VectorGeometry::Polygon(lines) => {
            Value::Array(lines.iter().map(|l| line_coords(l)).collect())
        }
        VectorGeometry::MultiPolygon(polys) => Value::Array(
            polys
                .iter()
                .map(|poly| Value::Array(poly.iter().map(|r| line_coords(r)).collect()))
                .collect(),
        ),
    };

    let mut obj = Map::new();
    obj.insert(
        "type".to_string(),
        Value::String(geom.type_tag().to_string()),
    );
    obj.insert("coordinates".to_string(), coords);
    Value::Object(obj)
}

fn point_coords(p: &GeoPoint) -> Value {
    Value::Array(vec![Value::from(p.lon_deg), Value::from(p.lat_deg)])
}

fn line_coords(ps: &[GeoPoint]) -> Value {
    Value::Array(ps.iter().map(point_coords).collect())
}

fn is_supported_geometry(type_tag: &str) -> bool {
    matches!(
        type_tag,
        "Point" | "MultiPoint" | "LineString" | "MultiLineString" | "Polygon" | "MultiPolygon"
    )
}

fn parse_geometry(value: &Value) -> Result<VectorGeometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(VectorGeometry::Point(parse_point(coords)?)),
        "MultiPoint" => Ok(VectorGeometry::MultiPoint(parse_points(coords)?)),
        "LineString" => Ok(VectorGeometry::LineString(parse_points(coords)?)),
        "MultiLineString" => Ok(VectorGeometry::MultiLineString(parse_rings(coords)?)),
        "Polygon" => Ok(VectorGeometry::Polygon(parse_rings(coords)?)),
        "MultiPolygon" => {
            let polys = coords
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            let mut out = Vec::with_capacity(polys.len());
            for poly in polys {
                out.push(parse_rings(poly)?);
            }
            Ok(VectorGeometry::MultiPolygon(out))
        }
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_point(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("Point coordinates must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("Point coordinates must have [lon, lat]".to_string());
    }
    let lon = arr[0]
        .as_f64()
        .ok_or("Point lon must be a number".to_string())?;
    let lat = arr[1]
        .as_f64()
        .ok_or("Point lat must be a number".to_string())?;
    Ok(GeoPoint::new(lon, lat))
}

fn parse_points(coords: &Value) -> Result<Vec<GeoPoint>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_rings(coords: &Value) -> Result<Vec<Vec<GeoPoint>>, String> {
    let rings = coords
        .as_array()
        .ok_or("coordinates must be an array of rings".to_string())?;
    rings.iter().map(parse_points).collect()
}

#[cfg(test)]
mod tests {
    use super::{FeatureCollection, FeatureCollectionError, VectorGeometry};
    use crate::detail::FeatureDetail;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": 7,
             "properties": {"name": "Church", "url": "https://example.org/church"},
             "geometry": {"type": "Point", "coordinates": [29.97, 61.18]}},
            {"type": "Feature", "properties": {"name": "Road"},
             "geometry": {"type": "LineString", "coordinates": [[29.90, 61.10], [30.05, 61.25]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Polygon", "coordinates": [[[29.95, 61.15], [29.99, 61.15], [29.99, 61.19], [29.95, 61.15]]]}},
            {"type": "Feature", "properties": {"name": "ghost"}, "geometry": null}
        ]
    }"#;

    #[test]
    fn parses_mixed_collection() {
        let fc = FeatureCollection::from_geojson_str(SAMPLE).expect("parse");
        assert_eq!(fc.len(), 3);
        assert_eq!(fc.features[0].id.as_deref(), Some("7"));
        assert!(matches!(fc.features[0].geometry, VectorGeometry::Point(_)));
        assert_eq!(fc.features[1].geometry.type_tag(), "LineString");
        assert_eq!(fc.features[2].geometry.type_tag(), "Polygon");
        assert_eq!(
            fc.features[0].detail,
            FeatureDetail::Linked {
                url: "https://example.org/church".to_string(),
                name: Some("Church".to_string()),
            }
        );
    }

    #[test]
    fn bounds_cover_every_geometry() {
        let fc = FeatureCollection::from_geojson_str(SAMPLE).expect("parse");
        let b = fc.bounds().expect("bounds");
        assert_eq!(b.to_array(), [[61.10, 29.90], [61.25, 30.05]]);
    }

    #[test]
    fn empty_collection_has_no_bounds() {
        let fc = FeatureCollection::from_geojson_str(r#"{"type":"FeatureCollection","features":[]}"#)
            .expect("parse");
        assert!(fc.is_empty());
        assert_eq!(fc.bounds(), None);
    }

    #[test]
    fn rejects_non_collections() {
        let err = FeatureCollection::from_geojson_str(r#"{"type":"Feature"}"#).unwrap_err();
        assert!(matches!(err, FeatureCollectionError::NotAFeatureCollection));

        let err = FeatureCollection::from_geojson_str("not json").unwrap_err();
        assert!(matches!(err, FeatureCollectionError::Json(_)));

        let err = FeatureCollection::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[30.0]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FeatureCollectionError::InvalidFeature { index: 0, .. }
        ));
    }

    #[test]
    fn skips_collections_and_unknown_geometries() {
        let fc = FeatureCollection::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{},"geometry":{"type":"Circle","coordinates":[]}},
                {"type":"Feature","properties":{},"geometry":{"type":"GeometryCollection","geometries":[
                    {"type":"Point","coordinates":[10.0,10.0]}]}},
                {"type":"Feature","properties":{"name":"kept"},"geometry":{"type":"Point","coordinates":[30.0,61.0]}}
            ]}"#,
        )
        .expect("parse");
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.features[0].detail.name(), Some("kept"));
        assert_eq!(fc.bounds().expect("bounds").to_array(), [[61.0, 30.0], [61.0, 30.0]]);
    }

    #[test]
    fn reexport_preserves_geometry() {
        let fc = FeatureCollection::from_geojson_str(SAMPLE).expect("parse");
        let again = FeatureCollection::from_geojson_value(fc.to_geojson_value()).expect("reparse");
        assert_eq!(again, fc);
    }

    #[test]
    fn anchor_is_point_or_bounds_center() {
        let fc = FeatureCollection::from_geojson_str(SAMPLE).expect("parse");
        let p = fc.features[0].geometry.anchor().expect("anchor");
        assert_eq!((p.lat, p.lng), (61.18, 29.97));
        let line = fc.features[1].geometry.anchor().expect("anchor");
        assert!((line.lat - 61.175).abs() < 1e-9);
        assert!((line.lng - 29.975).abs() < 1e-9);
    }
}
