use formats::EraConfig;
use layers::{BaseMap, EraPalette, LayerKey, LoadedLayer, PlanContext, RenderPlan};
use serde::Serialize;

use crate::audio::AudioDirective;
use crate::entity::FeatureId;
use crate::interaction::InteractionMediator;
use crate::registry::FeatureRegistry;
use crate::selection::PanelView;
use crate::visibility::EraState;

/// Snapshot of the derived state, for consumers outside the core.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub active_era: Option<String>,
    pub music_paused: bool,
    pub audio: AudioDirective,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel: Option<PanelView>,
    pub plan: RenderPlan,
}

/// One viewer: configuration, the last committed layers, toggles and the
/// features currently drawn.
#[derive(Debug)]
pub struct ViewerSession {
    config: EraConfig,
    palette: EraPalette,
    layers: Vec<LoadedLayer>,
    era: EraState,
    base_map: BaseMap,
    registry: FeatureRegistry,
    mediator: InteractionMediator,
}

impl ViewerSession {
    pub fn new(config: EraConfig) -> Self {
        let palette = EraPalette::from_config(&config);
        let mut era = EraState::new();
        era.set_layers(&config.eras);
        Self {
            mediator: InteractionMediator::new(palette.clone()),
            palette,
            config,
            layers: Vec::new(),
            era,
            base_map: BaseMap::default(),
            registry: FeatureRegistry::new(),
        }
    }

    pub fn config(&self) -> &EraConfig {
        &self.config
    }

    pub fn layers(&self) -> &[LoadedLayer] {
        &self.layers
    }

    pub fn era(&self) -> &EraState {
        &self.era
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    pub fn mediator(&self) -> &InteractionMediator {
        &self.mediator
    }

    /// Replaces the layer list wholesale. Drawn features are released, toggles
    /// survive.
    pub fn replace_layers(&mut self, layers: Vec<LoadedLayer>) {
        let drawn: Vec<FeatureId> = self.registry.iter().map(|(id, _)| id).collect();
        self.mediator.release_all(&mut self.registry, drawn);
        self.era.set_loaded_layers(&layers);
        self.layers = layers;
        self.sync_overlays();
    }

    pub fn toggle_tiles(&mut self, key: &LayerKey) -> bool {
        self.era.toggle_tiles(key)
    }

    pub fn toggle_overlay(&mut self, key: &LayerKey) -> bool {
        let visible = self.era.toggle_overlay(key);
        self.sync_overlays();
        visible
    }

    pub fn toggle_music_paused(&mut self) -> bool {
        self.era.toggle_music_paused()
    }

    pub fn toggle_base_map(&mut self) -> BaseMap {
        self.base_map = self.base_map.toggled();
        self.base_map
    }

    pub fn hover_in(&mut self, id: FeatureId) {
        self.mediator.hover_in(&mut self.registry, id);
    }

    pub fn hover_out(&mut self, id: FeatureId) {
        self.mediator.hover_out(&mut self.registry, id);
    }

    pub fn click(&mut self, id: FeatureId) -> crate::interaction::ClickOutcome {
        self.mediator.click(&self.registry, id)
    }

    pub fn map_click(&mut self) {
        self.mediator.map_click();
    }

    pub fn close_panel(&mut self) {
        self.mediator.close_panel();
    }

    pub fn audio(&self) -> AudioDirective {
        AudioDirective::resolve(
            self.era.active_era(),
            self.era.music_paused(),
            &self.config.music,
        )
    }

    pub fn render_plan(&self) -> RenderPlan {
        RenderPlan::build(
            &self.layers,
            self.era.visibility(),
            self.era.active_era(),
            PlanContext {
                palette: &self.palette,
                tiles: &self.config.tiles,
                base_map: self.base_map,
            },
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            active_era: self.era.active_era().map(str::to_string),
            music_paused: self.era.music_paused(),
            audio: self.audio(),
            panel: self.mediator.selection().map(PanelView::from),
            plan: self.render_plan(),
        }
    }

    /// Registers features of newly shown overlays and releases those of
    /// hidden ones.
    fn sync_overlays(&mut self) {
        let plan = self.render_plan();
        for (index, layer) in self.layers.iter().enumerate() {
            let key = layer.key(index);
            let shown = plan.overlays.iter().any(|o| o.key == key);
            let drawn = self.registry.ids_for_layer(&key);
            if !shown {
                self.mediator.release_all(&mut self.registry, drawn);
            } else if drawn.is_empty()
                && let Some(overlay) = plan.overlays.iter().find(|o| o.key == key)
            {
                self.registry.register_overlay(overlay);
            }
        }
    }
}
