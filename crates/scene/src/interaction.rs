use std::collections::BTreeMap;

use formats::FeatureDetail;
use layers::{EraPalette, FeatureStyle};

use crate::entity::FeatureId;
use crate::registry::FeatureRegistry;
use crate::selection::{PanelSelection, Popup, popup_html};

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    Panel(PanelSelection),
    Popup(Popup),
    /// The handle no longer resolves.
    Stale,
}

/// Pointer and click handling for drawn features.
///
/// Owns the pre-hover style of every hovered feature, the single open popup
/// and the detail-panel selection. Stale handles are ignored everywhere.
#[derive(Debug, Default)]
pub struct InteractionMediator {
    palette: EraPalette,
    hovered: BTreeMap<FeatureId, FeatureStyle>,
    popup: Option<Popup>,
    selection: Option<PanelSelection>,
}

impl InteractionMediator {
    pub fn new(palette: EraPalette) -> Self {
        Self {
            palette,
            ..Self::default()
        }
    }

    /// Records the resting style on first entry, then applies the hover style.
    pub fn hover_in(&mut self, registry: &mut FeatureRegistry, id: FeatureId) -> Option<FeatureStyle> {
        let feature = registry.get(id)?;
        let resting = feature.style;
        let hover = self.palette.hover_style_for(feature.kind, &feature.era);
        self.hovered.entry(id).or_insert(resting);
        registry.set_style(id, hover);
        Some(hover)
    }

    /// Restores the recorded style, if any.
    pub fn hover_out(&mut self, registry: &mut FeatureRegistry, id: FeatureId) -> Option<FeatureStyle> {
        let resting = *self.hovered.get(&id)?;
        if !registry.set_style(id, resting) {
            self.hovered.remove(&id);
            return None;
        }
        Some(resting)
    }

    pub fn click(&mut self, registry: &FeatureRegistry, id: FeatureId) -> ClickOutcome {
        self.popup = None;
        let Some(feature) = registry.get(id) else {
            return ClickOutcome::Stale;
        };

        match &feature.detail {
            FeatureDetail::Linked { url, name } => {
                let selection = PanelSelection {
                    feature: id,
                    url: url.clone(),
                    name: name.clone(),
                };
                self.selection = Some(selection.clone());
                ClickOutcome::Panel(selection)
            }
            FeatureDetail::Inline { name, image } => {
                let popup = Popup {
                    feature: id,
                    anchor: feature.anchor,
                    html: popup_html(name.as_deref(), image.as_deref()),
                };
                self.popup = Some(popup.clone());
                ClickOutcome::Popup(popup)
            }
        }
    }

    /// Click on empty map: closes the popup and the panel.
    pub fn map_click(&mut self) {
        self.popup = None;
        self.selection = None;
    }

    pub fn close_panel(&mut self) {
        self.selection = None;
    }

    /// Drops the feature and everything the mediator holds for it.
    pub fn release(&mut self, registry: &mut FeatureRegistry, id: FeatureId) {
        registry.remove(id);
        self.hovered.remove(&id);
        if self.popup.as_ref().is_some_and(|p| p.feature == id) {
            self.popup = None;
        }
        if self.selection.as_ref().is_some_and(|s| s.feature == id) {
            self.selection = None;
        }
    }

    pub fn release_all(&mut self, registry: &mut FeatureRegistry, ids: impl IntoIterator<Item = FeatureId>) {
        for id in ids {
            self.release(registry, id);
        }
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn selection(&self) -> Option<&PanelSelection> {
        self.selection.as_ref()
    }

    pub fn hover_record_count(&self) -> usize {
        self.hovered.len()
    }
}
