use std::collections::BTreeMap;

use formats::EraDefinition;
use layers::{LayerKey, LayerVisibility, LoadedLayer};
use serde::Serialize;

/// Per-layer toggles. A key missing from a map reads as hidden.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisibilityState {
    tile_visible: BTreeMap<LayerKey, bool>,
    overlay_visible: BTreeMap<LayerKey, bool>,
}

impl VisibilityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips one tile toggle and returns the new value.
    pub fn toggle_tiles(&mut self, key: &LayerKey) -> bool {
        flip(&mut self.tile_visible, key)
    }

    /// Flips one overlay toggle and returns the new value.
    pub fn toggle_overlay(&mut self, key: &LayerKey) -> bool {
        flip(&mut self.overlay_visible, key)
    }

    pub fn set_tiles(&mut self, key: LayerKey, visible: bool) {
        self.tile_visible.insert(key, visible);
    }

    pub fn set_overlay(&mut self, key: LayerKey, visible: bool) {
        self.overlay_visible.insert(key, visible);
    }
}

fn flip(map: &mut BTreeMap<LayerKey, bool>, key: &LayerKey) -> bool {
    let entry = map.entry(key.clone()).or_insert(false);
    *entry = !*entry;
    *entry
}

impl LayerVisibility for VisibilityState {
    fn tiles_visible(&self, key: &LayerKey) -> bool {
        self.tile_visible.get(key).copied().unwrap_or(false)
    }

    fn overlay_visible(&self, key: &LayerKey) -> bool {
        self.overlay_visible.get(key).copied().unwrap_or(false)
    }
}

/// What the era rule needs to know about a configured layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSummary {
    pub era: String,
    pub has_tiles: bool,
}

impl From<&EraDefinition> for LayerSummary {
    fn from(def: &EraDefinition) -> Self {
        Self {
            era: def.era.clone(),
            has_tiles: def.has_tiles(),
        }
    }
}

/// A layer counts as shown when its overlay is on and, for eras with raster
/// tiles, its tiles are on too. Exactly one shown layer makes its era active;
/// zero or several leave no active era.
pub fn derive_active_era(layers: &[LayerSummary], visibility: &VisibilityState) -> Option<String> {
    let mut shown = layers.iter().enumerate().filter(|(index, layer)| {
        let key = LayerKey::new(layer.era.clone(), *index);
        let overlay = visibility.overlay_visible(&key);
        if layer.has_tiles {
            overlay && visibility.tiles_visible(&key)
        } else {
            overlay
        }
    });

    match (shown.next(), shown.next()) {
        (Some((_, layer)), None) => Some(layer.era.clone()),
        _ => None,
    }
}

/// Toggle state of the viewer plus the values derived from it.
///
/// Every mutation recomputes the active era before returning.
#[derive(Debug, Clone, Default)]
pub struct EraState {
    layers: Vec<LayerSummary>,
    visibility: VisibilityState,
    active_era: Option<String>,
    music_paused: bool,
}

impl EraState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the layer list. Toggle state is kept as is.
    pub fn set_layers<'a>(&mut self, defs: impl IntoIterator<Item = &'a EraDefinition>) {
        self.layers = defs.into_iter().map(LayerSummary::from).collect();
        self.recompute();
    }

    pub fn set_loaded_layers(&mut self, layers: &[LoadedLayer]) {
        self.set_layers(layers.iter().map(|l| &l.definition));
    }

    pub fn toggle_tiles(&mut self, key: &LayerKey) -> bool {
        let visible = self.visibility.toggle_tiles(key);
        self.recompute();
        visible
    }

    pub fn toggle_overlay(&mut self, key: &LayerKey) -> bool {
        let visible = self.visibility.toggle_overlay(key);
        self.recompute();
        visible
    }

    pub fn toggle_music_paused(&mut self) -> bool {
        self.music_paused = !self.music_paused;
        self.music_paused
    }

    pub fn active_era(&self) -> Option<&str> {
        self.active_era.as_deref()
    }

    pub fn music_paused(&self) -> bool {
        self.music_paused
    }

    pub fn visibility(&self) -> &VisibilityState {
        &self.visibility
    }

    pub fn layers(&self) -> &[LayerSummary] {
        &self.layers
    }

    pub fn key_of(&self, index: usize) -> Option<LayerKey> {
        self.layers
            .get(index)
            .map(|l| LayerKey::new(l.era.clone(), index))
    }

    fn recompute(&mut self) {
        self.active_era = derive_active_era(&self.layers, &self.visibility);
    }
}
