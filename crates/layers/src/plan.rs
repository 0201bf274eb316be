use formats::TileSettings;
use serde::Serialize;

use crate::layer::{LayerKey, LoadedLayer};
use crate::raster::{BaseMap, TileOverlay};
use crate::symbology::EraPalette;
use crate::vector::VectorOverlay;

/// Read-only view of per-layer toggle state.
pub trait LayerVisibility {
    fn tiles_visible(&self, key: &LayerKey) -> bool;
    fn overlay_visible(&self, key: &LayerKey) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub palette: &'a EraPalette,
    pub tiles: &'a TileSettings,
    pub base_map: BaseMap,
}

/// Everything the renderer draws for one state of the viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub base_map: BaseMap,
    pub base_map_url: &'static str,
    pub attribution: &'static str,
    /// Sidebar accent color as `#rrggbb`.
    pub highlight: String,
    pub tiles: Vec<TileOverlay>,
    pub overlays: Vec<VectorOverlay>,
    /// Union of the bounds of all drawn overlays, `[[s, w], [n, e]]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[[f64; 2]; 2]>,
}

impl RenderPlan {
    pub fn build(
        layers: &[LoadedLayer],
        visibility: &impl LayerVisibility,
        active_era: Option<&str>,
        ctx: PlanContext<'_>,
    ) -> Self {
        let mut tiles = Vec::new();
        let mut overlays = Vec::new();
        let mut bounds = None;

        for (index, layer) in layers.iter().enumerate() {
            let key = layer.key(index);

            if let Some(title) = layer.title()
                && visibility.tiles_visible(&key)
            {
                tiles.push(TileOverlay::for_layer(key.clone(), title, ctx.tiles));
            }

            if visibility.overlay_visible(&key) {
                if let Some(b) = layer.bounds() {
                    bounds = Some(match bounds {
                        Some(acc) => b.union(&acc),
                        None => b,
                    });
                }
                overlays.push(VectorOverlay::extract(key, layer, ctx.palette));
            }
        }

        Self {
            base_map: ctx.base_map,
            base_map_url: ctx.base_map.url_template(),
            attribution: ctx.base_map.attribution(),
            highlight: ctx.palette.highlight_for(active_era).to_hex(),
            tiles,
            overlays,
            bounds: bounds.map(|b| b.to_array()),
        }
    }
}
