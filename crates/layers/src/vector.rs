use formats::{FeatureDetail, VectorFeature};
use serde::Serialize;
use serde_json::Value;

use crate::layer::{LayerKey, LoadedLayer};
use crate::symbology::{EraPalette, FeatureStyle, GeometryKind};

/// One feature ready to draw, with its resting style already resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledFeature {
    pub shape: String,
    pub kind: GeometryKind,
    pub style: FeatureStyle,
    pub detail: FeatureDetail,
    /// Popup anchor as `[lat, lng]`; `None` for empty geometries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<[f64; 2]>,
    pub geojson: Value,
}

impl StyledFeature {
    fn new(shape: &str, era: &str, feature: &VectorFeature, palette: &EraPalette) -> Self {
        let kind = GeometryKind::of(&feature.geometry);
        Self {
            shape: shape.to_string(),
            kind,
            style: palette.style_for(kind, era),
            detail: feature.detail.clone(),
            anchor: feature.geometry.anchor().map(|p| [p.lat, p.lng]),
            geojson: formats::feature_to_geojson_value(feature),
        }
    }
}

/// Vector overlay of one era: features of every successfully loaded shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorOverlay {
    pub key: LayerKey,
    pub era: String,
    pub features: Vec<StyledFeature>,
}

impl VectorOverlay {
    /// Failed shapes contribute nothing; their siblings are unaffected.
    pub fn extract(key: LayerKey, layer: &LoadedLayer, palette: &EraPalette) -> Self {
        let era = layer.era();
        let features = layer
            .shapes
            .iter()
            .filter_map(|shape| shape.geojson().map(|fc| (shape.spec.name.as_str(), fc)))
            .flat_map(|(name, fc)| {
                fc.features
                    .iter()
                    .map(move |f| StyledFeature::new(name, era, f, palette))
            })
            .collect();

        Self {
            key,
            era: era.to_string(),
            features,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::VectorOverlay;
    use crate::layer::{LoadedLayer, LoadedShape};
    use crate::symbology::{EraPalette, GeometryKind};
    use formats::{EraConfig, EraDefinition, FeatureCollection, ShapeKind, ShapeSpec};

    fn collection() -> FeatureCollection {
        FeatureCollection::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"name":"Church","url":"https://w/church"},
                 "geometry":{"type":"Point","coordinates":[30.0,61.0]}},
                {"type":"Feature","properties":{"name":"Road"},
                 "geometry":{"type":"LineString","coordinates":[[30.0,61.0],[30.1,61.1]]}},
                {"type":"Feature","properties":{},
                 "geometry":{"type":"Polygon","coordinates":[[[30,61],[30.2,61],[30.2,61.2],[30,61]]]}}
            ]}"#,
        )
        .expect("parse")
    }

    #[test]
    fn extracts_loaded_shapes_only() {
        let palette = EraPalette::from_config(&EraConfig::default());
        let layer = LoadedLayer::new(
            EraDefinition::new("Финский период", Some("tiles"), vec![]),
            vec![
                LoadedShape::loaded(ShapeSpec::new(ShapeKind::Points, "a.zip", "Mixed"), collection()),
                LoadedShape::failed(ShapeSpec::new(ShapeKind::Lines, "b.zip", "Lines"), "404"),
            ],
        );
        let overlay = VectorOverlay::extract(layer.key(1), &layer, &palette);

        assert_eq!(overlay.key.to_string(), "Финский период-1");
        let kinds: Vec<GeometryKind> = overlay.features.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![GeometryKind::Point, GeometryKind::Line, GeometryKind::Polygon]
        );
        assert_eq!(overlay.features[0].style.radius, Some(6.0));
        assert_eq!(overlay.features[0].detail.url(), Some("https://w/church"));
        assert_eq!(overlay.features[2].style.weight, 1.0);
        assert!(overlay.features.iter().all(|f| f.shape == "Mixed"));
    }

    #[test]
    fn failed_layer_yields_empty_overlay() {
        let layer = LoadedLayer::failed(EraDefinition::new("A", None, vec![]), "boom");
        let overlay = VectorOverlay::extract(layer.key(0), &layer, &EraPalette::default());
        assert!(overlay.is_empty());
    }
}
