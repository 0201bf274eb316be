use formats::FeatureDetail;
use foundation::arena::Arena;
use foundation::bounds::LatLng;
use layers::{FeatureStyle, GeometryKind, LayerKey, StyledFeature, VectorOverlay};

use crate::entity::FeatureId;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub layer: LayerKey,
    pub era: String,
    pub kind: GeometryKind,
    pub detail: FeatureDetail,
    pub anchor: Option<LatLng>,
    /// Style currently applied on the map.
    pub style: FeatureStyle,
}

impl RenderedFeature {
    pub fn from_styled(layer: LayerKey, era: &str, feature: &StyledFeature) -> Self {
        Self {
            layer,
            era: era.to_string(),
            kind: feature.kind,
            detail: feature.detail.clone(),
            anchor: feature.anchor.map(|[lat, lng]| LatLng::new(lat, lng)),
            style: feature.style,
        }
    }
}

/// Features the renderer has materialized, addressed by generational handles.
///
/// Handles of released features never resolve again, even after their slot
/// is reused.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    features: Arena<RenderedFeature>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn insert(&mut self, feature: RenderedFeature) -> FeatureId {
        FeatureId(self.features.insert(feature))
    }

    /// Registers every feature of an overlay, in overlay order.
    pub fn register_overlay(&mut self, overlay: &VectorOverlay) -> Vec<FeatureId> {
        overlay
            .features
            .iter()
            .map(|f| self.insert(RenderedFeature::from_styled(overlay.key.clone(), &overlay.era, f)))
            .collect()
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.features.contains(id.0)
    }

    pub fn get(&self, id: FeatureId) -> Option<&RenderedFeature> {
        self.features.get(id.0)
    }

    /// Returns `false` when `id` is stale.
    pub fn set_style(&mut self, id: FeatureId, style: FeatureStyle) -> bool {
        match self.features.get_mut(id.0) {
            Some(f) => {
                f.style = style;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: FeatureId) -> Option<RenderedFeature> {
        self.features.remove(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &RenderedFeature)> + '_ {
        self.features.iter().map(|(h, f)| (FeatureId(h), f))
    }

    pub fn ids_for_layer(&self, key: &LayerKey) -> Vec<FeatureId> {
        self.iter()
            .filter(|(_, f)| &f.layer == key)
            .map(|(id, _)| id)
            .collect()
    }
}
