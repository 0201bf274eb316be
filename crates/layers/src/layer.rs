use std::fmt;

use formats::{EraDefinition, FeatureCollection, ShapeSpec};
use foundation::bounds::LatLngBounds;
use serde::Serialize;

/// Identity joining an era to its position in the configured layer list.
///
/// Displays as `<era>-<index>`. Stable only while the layer list order is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerKey {
    pub era: String,
    pub index: usize,
}

impl LayerKey {
    pub fn new(era: impl Into<String>, index: usize) -> Self {
        Self {
            era: era.into(),
            index,
        }
    }

    pub fn of(def: &EraDefinition, index: usize) -> Self {
        Self::new(def.era.clone(), index)
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.era, self.index)
    }
}

impl Serialize for LayerKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeData {
    pub collection: FeatureCollection,
    /// `None` when the collection is empty.
    pub bounds: Option<LatLngBounds>,
}

/// A shape after its load attempt: exactly one of data or error.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedShape {
    pub spec: ShapeSpec,
    pub outcome: Result<ShapeData, String>,
}

impl LoadedShape {
    pub fn loaded(spec: ShapeSpec, collection: FeatureCollection) -> Self {
        let bounds = collection.bounds();
        Self {
            spec,
            outcome: Ok(ShapeData { collection, bounds }),
        }
    }

    pub fn failed(spec: ShapeSpec, error: impl Into<String>) -> Self {
        Self {
            spec,
            outcome: Err(error.into()),
        }
    }

    pub fn geojson(&self) -> Option<&FeatureCollection> {
        self.outcome.as_ref().ok().map(|d| &d.collection)
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        self.outcome.as_ref().ok().and_then(|d| d.bounds)
    }

    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref().err().map(String::as_str)
    }

    pub fn is_loaded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// An era after a load pass.
///
/// `error` is set only when the layer as a whole failed; `shapes` is then
/// empty. Per-shape failures live in [`LoadedShape`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedLayer {
    pub definition: EraDefinition,
    pub shapes: Vec<LoadedShape>,
    pub error: Option<String>,
}

impl LoadedLayer {
    pub fn new(definition: EraDefinition, shapes: Vec<LoadedShape>) -> Self {
        Self {
            definition,
            shapes,
            error: None,
        }
    }

    pub fn failed(definition: EraDefinition, error: impl Into<String>) -> Self {
        Self {
            definition,
            shapes: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn era(&self) -> &str {
        &self.definition.era
    }

    pub fn title(&self) -> Option<&str> {
        self.definition.title.as_deref()
    }

    pub fn has_tiles(&self) -> bool {
        self.definition.has_tiles()
    }

    pub fn key(&self, index: usize) -> LayerKey {
        LayerKey::of(&self.definition, index)
    }

    /// Union of the bounds of every loaded shape.
    pub fn bounds(&self) -> Option<LatLngBounds> {
        self.shapes
            .iter()
            .filter_map(LoadedShape::bounds)
            .reduce(|a, b| a.union(&b))
    }

    pub fn failed_shapes(&self) -> impl Iterator<Item = &LoadedShape> + '_ {
        self.shapes.iter().filter(|s| !s.is_loaded())
    }
}

#[cfg(test)]
mod tests {
    use super::{LayerKey, LoadedLayer, LoadedShape};
    use formats::{EraDefinition, FeatureCollection, ShapeKind, ShapeSpec};

    fn spec(resource: &str) -> ShapeSpec {
        ShapeSpec::new(ShapeKind::Points, resource, "Points")
    }

    #[test]
    fn key_formats_as_era_dash_index() {
        assert_eq!(LayerKey::new("Финский период", 1).to_string(), "Финский период-1");
        assert_eq!(
            serde_json::to_string(&LayerKey::new("A", 3)).expect("json"),
            "\"A-3\""
        );
    }

    #[test]
    fn shape_outcome_is_exclusive() {
        let ok = LoadedShape::loaded(spec("a.zip"), FeatureCollection::default());
        assert!(ok.geojson().is_some());
        assert_eq!(ok.error(), None);
        assert_eq!(ok.bounds(), None);

        let bad = LoadedShape::failed(spec("b.zip"), "404");
        assert!(bad.geojson().is_none());
        assert_eq!(bad.error(), Some("404"));
    }

    #[test]
    fn failed_layer_has_no_shapes() {
        let layer = LoadedLayer::failed(EraDefinition::new("A", None, vec![spec("a.zip")]), "boom");
        assert!(layer.shapes.is_empty());
        assert_eq!(layer.error.as_deref(), Some("boom"));
        assert_eq!(layer.key(2).to_string(), "A-2");
    }

    #[test]
    fn layer_bounds_union_loaded_shapes() {
        let fc = FeatureCollection::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[30.0,61.0]}}]}"#,
        )
        .expect("parse");
        let fc2 = FeatureCollection::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[29.0,62.0]}}]}"#,
        )
        .expect("parse");
        let layer = LoadedLayer::new(
            EraDefinition::new("A", Some("tiles"), vec![]),
            vec![
                LoadedShape::loaded(spec("a.zip"), fc),
                LoadedShape::failed(spec("b.zip"), "nope"),
                LoadedShape::loaded(spec("c.zip"), fc2),
            ],
        );
        assert_eq!(
            layer.bounds().expect("bounds").to_array(),
            [[61.0, 29.0], [62.0, 30.0]]
        );
        assert_eq!(layer.failed_shapes().count(), 1);
        assert!(layer.has_tiles());
    }
}
