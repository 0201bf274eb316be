//! Decoding of vector dataset archives.
//!
//! A dataset is published as a zip archive holding one or more ESRI
//! shapefiles (`.shp` with an optional sibling `.dbf` for attributes) and/or
//! GeoJSON documents (`.geojson` / `.json`). Everything found is merged into a
//! single [`FeatureCollection`]. A payload that is not a zip archive is parsed
//! as a bare GeoJSON document.
//!
//! Shapefile coordinates are taken as-is (longitude/latitude). A `.prj`
//! describing a projected CRS is not reprojected; it is only reported.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read};

use serde_json::{Map, Number, Value};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{PolygonRing, Shape};
use tracing::warn;

use crate::feature_collection::{
    FeatureCollection, FeatureCollectionError, GeoPoint, VectorFeature, VectorGeometry,
};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug)]
pub enum ArchiveError {
    Zip(zip::result::ZipError),
    Io { entry: String, source: std::io::Error },
    Shapefile { entry: String, reason: String },
    GeoJson { entry: String, source: FeatureCollectionError },
    /// The archive holds no shapefile and no GeoJSON document.
    NoDataset,
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::Zip(e) => write!(f, "malformed archive: {e}"),
            ArchiveError::Io { entry, source } => write!(f, "failed to read {entry}: {source}"),
            ArchiveError::Shapefile { entry, reason } => {
                write!(f, "invalid shapefile {entry}: {reason}")
            }
            ArchiveError::GeoJson { entry, source } => write!(f, "invalid GeoJSON {entry}: {source}"),
            ArchiveError::NoDataset => write!(f, "archive contains no shapefile or GeoJSON"),
        }
    }
}

impl std::error::Error for ArchiveError {}

pub fn is_zip(payload: &[u8]) -> bool {
    payload.starts_with(ZIP_MAGIC)
}

/// Decodes a dataset payload into a feature collection.
pub fn decode_archive(payload: &[u8]) -> Result<FeatureCollection, ArchiveError> {
    if !is_zip(payload) {
        return FeatureCollection::from_geojson_slice(payload).map_err(|source| {
            ArchiveError::GeoJson {
                entry: "<payload>".to_string(),
                source,
            }
        });
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(payload)).map_err(ArchiveError::Zip)?;

    // Entries keyed by lowercase path stem so `roads.shp` pairs with `roads.dbf`.
    let mut shp: BTreeMap<String, (String, Vec<u8>)> = BTreeMap::new();
    let mut dbf: HashMap<String, Vec<u8>> = HashMap::new();
    let mut geojson: Vec<(String, Vec<u8>)> = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(ArchiveError::Zip)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let lower = name.to_ascii_lowercase();
        // macOS resource forks ride along in many hand-made archives.
        if lower.starts_with("__macosx/") {
            continue;
        }
        let Some((stem, ext)) = lower.rsplit_once('.') else {
            continue;
        };
        if !matches!(ext, "shp" | "dbf" | "prj" | "geojson" | "json") {
            continue;
        }

        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)
            .map_err(|source| ArchiveError::Io {
                entry: name.clone(),
                source,
            })?;

        match ext {
            "prj" => {
                if is_projected_prj(&String::from_utf8_lossy(&bytes)) {
                    warn!(
                        "{name}: projected coordinate system, coordinates used without reprojection"
                    );
                }
            }
            "shp" => {
                shp.insert(stem.to_string(), (name, bytes));
            }
            "dbf" => {
                dbf.insert(stem.to_string(), bytes);
            }
            _ => geojson.push((name, bytes)),
        }
    }

    if shp.is_empty() && geojson.is_empty() {
        return Err(ArchiveError::NoDataset);
    }

    let mut out = FeatureCollection::default();
    for (stem, (entry, shp_bytes)) in shp {
        let features = decode_shapefile(&shp_bytes, dbf.remove(&stem))
            .map_err(|reason| ArchiveError::Shapefile { entry, reason })?;
        out.features.extend(features);
    }
    for (entry, bytes) in geojson {
        let fc = FeatureCollection::from_geojson_slice(&bytes)
            .map_err(|source| ArchiveError::GeoJson { entry, source })?;
        out.extend(fc);
    }
    Ok(out)
}

/// True when a `.prj` WKT describes a projected rather than a geographic CRS.
pub fn is_projected_prj(wkt: &str) -> bool {
    let head = wkt.trim_start().to_ascii_uppercase();
    head.starts_with("PROJCS[") || head.starts_with("PROJCRS[")
}

fn decode_shapefile(shp: &[u8], dbf: Option<Vec<u8>>) -> Result<Vec<VectorFeature>, String> {
    let shape_reader =
        shapefile::ShapeReader::new(Cursor::new(shp.to_vec())).map_err(|e| e.to_string())?;

    let pairs: Vec<(Shape, Option<Record>)> = match dbf {
        Some(dbf) => {
            let dbase_reader =
                shapefile::dbase::Reader::new(Cursor::new(dbf)).map_err(|e| e.to_string())?;
            let mut reader = shapefile::Reader::new(shape_reader, dbase_reader);
            reader
                .read()
                .map_err(|e| e.to_string())?
                .into_iter()
                .map(|(shape, record)| (shape, Some(record)))
                .collect()
        }
        None => shape_reader
            .read()
            .map_err(|e| e.to_string())?
            .into_iter()
            .map(|shape| (shape, None))
            .collect(),
    };

    let mut out = Vec::with_capacity(pairs.len());
    for (shape, record) in pairs {
        let Some(geometry) = shape_to_geometry(&shape) else {
            continue;
        };
        let properties = record.map(record_to_properties).unwrap_or_default();
        out.push(VectorFeature::new(None, properties, geometry));
    }
    Ok(out)
}

fn shape_to_geometry(shape: &Shape) -> Option<VectorGeometry> {
    match shape {
        Shape::NullShape => None,
        Shape::Point(p) => Some(VectorGeometry::Point(GeoPoint::new(p.x, p.y))),
        Shape::PointM(p) => Some(VectorGeometry::Point(GeoPoint::new(p.x, p.y))),
        Shape::PointZ(p) => Some(VectorGeometry::Point(GeoPoint::new(p.x, p.y))),
        Shape::Multipoint(mp) => multipoint(mp.points().iter().map(|p| GeoPoint::new(p.x, p.y))),
        Shape::MultipointM(mp) => multipoint(mp.points().iter().map(|p| GeoPoint::new(p.x, p.y))),
        Shape::MultipointZ(mp) => multipoint(mp.points().iter().map(|p| GeoPoint::new(p.x, p.y))),
        Shape::Polyline(l) => polyline(parts(l.parts(), |p| GeoPoint::new(p.x, p.y))),
        Shape::PolylineM(l) => polyline(parts(l.parts(), |p| GeoPoint::new(p.x, p.y))),
        Shape::PolylineZ(l) => polyline(parts(l.parts(), |p| GeoPoint::new(p.x, p.y))),
        Shape::Polygon(poly) => polygon(rings(poly.rings(), |p| GeoPoint::new(p.x, p.y))),
        Shape::PolygonM(poly) => polygon(rings(poly.rings(), |p| GeoPoint::new(p.x, p.y))),
        Shape::PolygonZ(poly) => polygon(rings(poly.rings(), |p| GeoPoint::new(p.x, p.y))),
        Shape::Multipatch(_) => None,
    }
}

fn multipoint(points: impl Iterator<Item = GeoPoint>) -> Option<VectorGeometry> {
    let points: Vec<GeoPoint> = points.collect();
    match points.len() {
        0 => None,
        1 => Some(VectorGeometry::Point(points[0])),
        _ => Some(VectorGeometry::MultiPoint(points)),
    }
}

fn parts<P>(parts: &[Vec<P>], to_geo: impl Fn(&P) -> GeoPoint) -> Vec<Vec<GeoPoint>> {
    parts
        .iter()
        .map(|part| part.iter().map(&to_geo).collect())
        .collect()
}

fn polyline(mut lines: Vec<Vec<GeoPoint>>) -> Option<VectorGeometry> {
    match lines.len() {
        0 => None,
        1 => lines.pop().map(VectorGeometry::LineString),
        _ => Some(VectorGeometry::MultiLineString(lines)),
    }
}

/// Groups shapefile rings into GeoJSON polygons: every outer ring opens a new
/// polygon and the inner rings that follow it become its holes.
fn rings<P>(
    rings: &[PolygonRing<P>],
    to_geo: impl Fn(&P) -> GeoPoint,
) -> Vec<Vec<Vec<GeoPoint>>> {
    let mut polys: Vec<Vec<Vec<GeoPoint>>> = Vec::new();
    for ring in rings {
        let points: Vec<GeoPoint> = ring.points().iter().map(&to_geo).collect();
        match ring {
            PolygonRing::Outer(_) => polys.push(vec![points]),
            PolygonRing::Inner(_) => match polys.last_mut() {
                Some(poly) => poly.push(points),
                None => polys.push(vec![points]),
            },
        }
    }
    polys
}

fn polygon(mut polys: Vec<Vec<Vec<GeoPoint>>>) -> Option<VectorGeometry> {
    match polys.len() {
        0 => None,
        1 => polys.pop().map(VectorGeometry::Polygon),
        _ => Some(VectorGeometry::MultiPolygon(polys)),
    }
}

fn record_to_properties(record: Record) -> Map<String, Value> {
    let fields: HashMap<String, FieldValue> = record.into();
    // Sorted for stable output; dbf field order is not preserved by `Record`.
    let sorted: BTreeMap<String, FieldValue> = fields.into_iter().collect();
    sorted
        .into_iter()
        .map(|(name, value)| (name.trim().to_string(), field_to_json(value)))
        .collect()
}

fn field_to_json(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(Some(s)) => Value::String(s.trim().to_string()),
        FieldValue::Memo(s) => Value::String(s),
        FieldValue::Numeric(Some(n)) => number(n),
        FieldValue::Float(Some(n)) => number(n as f64),
        FieldValue::Double(n) | FieldValue::Currency(n) => number(n),
        FieldValue::Integer(n) => Value::from(n),
        FieldValue::Logical(Some(b)) => Value::Bool(b),
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None) => Value::Null,
        other => Value::String(format!("{other:?}")),
    }
}

fn number(n: f64) -> Value {
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}
