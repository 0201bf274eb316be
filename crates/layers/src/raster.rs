use formats::TileSettings;
use serde::Serialize;

use crate::layer::LayerKey;

/// Era raster overlay handed to the tile renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileOverlay {
    pub key: LayerKey,
    /// `{z}/{x}/{y}` placeholders are left for the renderer.
    pub url_template: String,
    pub tms: bool,
    pub opacity: f32,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl TileOverlay {
    pub fn for_layer(key: LayerKey, title: &str, settings: &TileSettings) -> Self {
        Self {
            key,
            url_template: tile_url_template(&settings.root, title),
            tms: settings.tms,
            opacity: settings.opacity,
            min_zoom: settings.min_zoom,
            max_zoom: settings.max_zoom,
        }
    }
}

fn tile_url_template(root: &str, title: &str) -> String {
    let root = root.trim_end_matches('/');
    let title = title.trim_matches('/');
    if root.is_empty() {
        format!("{title}/{{z}}/{{x}}/{{y}}.png")
    } else {
        format!("{root}/{title}/{{z}}/{{x}}/{{y}}.png")
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseMap {
    #[default]
    Osm,
    Satellite,
}

impl BaseMap {
    pub fn url_template(self) -> &'static str {
        match self {
            BaseMap::Osm => "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            BaseMap::Satellite => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
        }
    }

    pub fn attribution(self) -> &'static str {
        match self {
            BaseMap::Osm => "© OpenStreetMap contributors",
            BaseMap::Satellite => "Tiles © Esri",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            BaseMap::Osm => BaseMap::Satellite,
            BaseMap::Satellite => BaseMap::Osm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BaseMap, TileOverlay};
    use crate::layer::LayerKey;
    use formats::TileSettings;

    #[test]
    fn overlay_uses_settings() {
        let settings = TileSettings {
            root: "https://maps.example/tiles/".to_string(),
            ..TileSettings::default()
        };
        let overlay = TileOverlay::for_layer(
            LayerKey::new("Советский период", 2),
            "karelskiy_peresheek/tiles",
            &settings,
        );
        assert_eq!(
            overlay.url_template,
            "https://maps.example/tiles/karelskiy_peresheek/tiles/{z}/{x}/{y}.png"
        );
        assert!(overlay.tms);
        assert_eq!(overlay.opacity, 0.7);
        assert_eq!((overlay.min_zoom, overlay.max_zoom), (10, 18));
    }

    #[test]
    fn empty_root_yields_relative_template() {
        let settings = TileSettings {
            root: String::new(),
            ..TileSettings::default()
        };
        let overlay = TileOverlay::for_layer(LayerKey::new("A", 0), "tiles", &settings);
        assert_eq!(overlay.url_template, "tiles/{z}/{x}/{y}.png");
    }

    #[test]
    fn base_map_toggles() {
        assert_eq!(BaseMap::default(), BaseMap::Osm);
        assert_eq!(BaseMap::Osm.toggled(), BaseMap::Satellite);
        assert!(BaseMap::Satellite.url_template().contains("{y}/{x}"));
    }
}
