use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use foundation::color::Rgb;
use serde::{Deserialize, Serialize};

/// Fallback stroke color for eras missing from the palette.
pub const FALLBACK_ERA_COLOR: &str = "#800080";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Points,
    Lines,
    Polygons,
}

/// One vector dataset of an era.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeSpec {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    /// Archive locator, relative to the data root.
    #[serde(alias = "zip")]
    pub resource: String,
    pub name: String,
}

impl ShapeSpec {
    pub fn new(kind: ShapeKind, resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            resource: resource.into(),
            name: name.into(),
        }
    }
}

/// A historical period: its optional raster tile dataset and vector shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraDefinition {
    pub era: String,
    /// Tile dataset identifier; `None` means the era has no raster tiles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub shapes: Vec<ShapeSpec>,
}

impl EraDefinition {
    pub fn new(era: impl Into<String>, title: Option<&str>, shapes: Vec<ShapeSpec>) -> Self {
        Self {
            era: era.into(),
            title: title.map(str::to_string),
            shapes,
        }
    }

    pub fn has_tiles(&self) -> bool {
        self.title.is_some()
    }
}

/// Raster overlay settings shared by every era.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSettings {
    /// Base URL; tiles resolve to `<root>/<title>/{z}/{x}/{y}.png`.
    pub root: String,
    pub tms: bool,
    pub opacity: f32,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            root: "tiles".to_string(),
            tms: true,
            opacity: 0.7,
            min_zoom: 10,
            max_zoom: 18,
        }
    }
}

/// Viewer configuration: the era list plus per-era colors and music.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraConfig {
    pub eras: Vec<EraDefinition>,
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
    #[serde(default)]
    pub music: BTreeMap<String, String>,
    #[serde(default)]
    pub tiles: TileSettings,
}

#[derive(Debug)]
pub enum EraConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for EraConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EraConfigError::Io(err) => write!(f, "I/O error: {err}"),
            EraConfigError::Parse(err) => write!(f, "Era config parse error: {err}"),
            EraConfigError::Invalid(msg) => write!(f, "Invalid era config: {msg}"),
        }
    }
}

impl std::error::Error for EraConfigError {}

impl EraConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EraConfigError> {
        let payload = fs::read_to_string(path).map_err(EraConfigError::Io)?;
        Self::from_json_str(&payload)
    }

    pub fn from_json_str(payload: &str) -> Result<Self, EraConfigError> {
        let config: EraConfig = serde_json::from_str(payload).map_err(EraConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EraConfigError> {
        for (index, def) in self.eras.iter().enumerate() {
            if def.era.trim().is_empty() {
                return Err(EraConfigError::Invalid(format!(
                    "era #{index} has an empty name"
                )));
            }
            if let Some(shape) = def.shapes.iter().find(|s| s.resource.trim().is_empty()) {
                return Err(EraConfigError::Invalid(format!(
                    "shape {:?} of era {:?} has no resource",
                    shape.name, def.era
                )));
            }
        }
        for (era, color) in &self.colors {
            Rgb::from_hex(color)
                .map_err(|e| EraConfigError::Invalid(format!("color of era {era:?}: {e}")))?;
        }
        if self.tiles.min_zoom > self.tiles.max_zoom {
            return Err(EraConfigError::Invalid(format!(
                "tile zoom range {}..{} is empty",
                self.tiles.min_zoom, self.tiles.max_zoom
            )));
        }
        Ok(())
    }

    /// Era → color, skipping entries that fail to parse.
    pub fn palette(&self) -> BTreeMap<String, Rgb> {
        self.colors
            .iter()
            .filter_map(|(era, hex)| Rgb::from_hex(hex).ok().map(|c| (era.clone(), c)))
            .collect()
    }

    pub fn music_track(&self, era: &str) -> Option<&str> {
        self.music.get(era).map(String::as_str)
    }
}

impl Default for EraConfig {
    /// The Kilpola island eras the viewer ships with.
    fn default() -> Self {
        let shapes = |prefix: &str, kinds: &[ShapeKind]| -> Vec<ShapeSpec> {
            kinds
                .iter()
                .map(|kind| {
                    let (dir, name) = match kind {
                        ShapeKind::Polygons => ("poligons", "Полигоны"),
                        ShapeKind::Points => ("points", "Точки"),
                        ShapeKind::Lines => ("lines", "Линии"),
                    };
                    ShapeSpec::new(*kind, format!("{prefix}/{dir}/{prefix}-{dir}.zip"), name)
                })
                .collect()
        };
        let all = [ShapeKind::Polygons, ShapeKind::Points, ShapeKind::Lines];

        let eras = vec![
            EraDefinition::new("Карельский период", None, shapes("kar", &all)),
            EraDefinition::new("Финский период", Some("tiles"), shapes("fin", &all)),
            EraDefinition::new(
                "Советский период",
                Some("karelskiy_peresheek/tiles"),
                shapes("sov", &all),
            ),
            EraDefinition::new(
                "Современный период",
                None,
                shapes("modern", &[ShapeKind::Points]),
            ),
        ];

        let pairs = |items: &[(&str, &str)]| -> BTreeMap<String, String> {
            items
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };

        Self {
            eras,
            colors: pairs(&[
                ("Карельский период", "#FF8C00"),
                ("Финский период", "#1E90FF"),
                ("Советский период", "#FF0000"),
                ("Современный период", "#9b00ff"),
            ]),
            music: pairs(&[
                ("Карельский период", "/music/kar.mp3"),
                ("Финский период", "/music/fin.m4a"),
                ("Советский период", "/music/sov.mp3"),
                ("Современный период", "/music/modern.mp3"),
            ]),
            tiles: TileSettings::default(),
        }
    }
}
