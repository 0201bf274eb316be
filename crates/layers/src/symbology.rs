use std::collections::BTreeMap;

use formats::{EraConfig, FALLBACK_ERA_COLOR, VectorGeometry};
use foundation::color::Rgb;
use serde::{Serialize, Serializer};

/// Polygon fill is the era color lightened by this percentage.
pub const POLYGON_FILL_LIGHTEN: f64 = 50.0;
pub const POINT_RADIUS: f64 = 6.0;
/// Sidebar highlight when no single era is active.
pub const NEUTRAL_HIGHLIGHT: Rgb = Rgb::new(0x88, 0x88, 0x88);

const STROKE_WEIGHT_THICK: f64 = 5.0;
const STROKE_WEIGHT_THIN: f64 = 1.0;
const FILL_OPACITY_POLYGON: f64 = 0.5;
const FILL_OPACITY_SOLID: f64 = 0.8;
const HOVER_FILL_OPACITY_DELTA: f64 = 0.2;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

impl GeometryKind {
    /// `"Point"` and `"LineString"` map to themselves; every other tag is
    /// drawn as a polygon.
    pub fn from_type_tag(tag: &str) -> Self {
        match tag {
            "Point" => GeometryKind::Point,
            "LineString" => GeometryKind::Line,
            _ => GeometryKind::Polygon,
        }
    }

    pub fn of(geometry: &VectorGeometry) -> Self {
        Self::from_type_tag(geometry.type_tag())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct FeatureStyle {
    #[serde(serialize_with = "hex")]
    pub color: Rgb,
    #[serde(serialize_with = "hex")]
    pub fill_color: Rgb,
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

impl FeatureStyle {
    /// Amplified variant shown while the pointer is over a feature.
    pub fn hovered(&self) -> Self {
        Self {
            weight: self.weight * 2.0,
            fill_opacity: (self.fill_opacity + HOVER_FILL_OPACITY_DELTA).min(1.0),
            radius: self.radius.map(|r| r * 2.0),
            ..*self
        }
    }
}

fn hex<S: Serializer>(c: &Rgb, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(c)
}

/// Era colors and the pure style functions derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct EraPalette {
    colors: BTreeMap<String, Rgb>,
    fallback: Rgb,
}

impl Default for EraPalette {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl EraPalette {
    pub fn new(colors: BTreeMap<String, Rgb>) -> Self {
        Self {
            colors,
            fallback: Rgb::from_hex(FALLBACK_ERA_COLOR).unwrap_or(Rgb::new(0x80, 0x00, 0x80)),
        }
    }

    pub fn from_config(config: &EraConfig) -> Self {
        Self::new(config.palette())
    }

    pub fn color_for(&self, era: &str) -> Rgb {
        self.colors.get(era).copied().unwrap_or(self.fallback)
    }

    /// Highlight color for sidebar controls: the active era's color, or neutral.
    pub fn highlight_for(&self, active_era: Option<&str>) -> Rgb {
        active_era
            .and_then(|era| self.colors.get(era).copied())
            .unwrap_or(NEUTRAL_HIGHLIGHT)
    }

    pub fn style_for(&self, kind: GeometryKind, era: &str) -> FeatureStyle {
        let base = self.color_for(era);
        let is_polygon = kind == GeometryKind::Polygon;
        FeatureStyle {
            color: base,
            fill_color: if is_polygon {
                base.lighten(POLYGON_FILL_LIGHTEN)
            } else {
                base
            },
            weight: if is_polygon {
                STROKE_WEIGHT_THIN
            } else {
                STROKE_WEIGHT_THICK
            },
            opacity: 1.0,
            fill_opacity: if is_polygon {
                FILL_OPACITY_POLYGON
            } else {
                FILL_OPACITY_SOLID
            },
            radius: (kind == GeometryKind::Point).then_some(POINT_RADIUS),
        }
    }

    pub fn hover_style_for(&self, kind: GeometryKind, era: &str) -> FeatureStyle {
        self.style_for(kind, era).hovered()
    }
}

#[cfg(test)]
mod tests {
    use super::{EraPalette, FeatureStyle, GeometryKind, NEUTRAL_HIGHLIGHT};
    use formats::EraConfig;
    use foundation::color::Rgb;
    use pretty_assertions::assert_eq;

    fn palette() -> EraPalette {
        EraPalette::from_config(&EraConfig::default())
    }

    #[test]
    fn kind_from_type_tag() {
        assert_eq!(GeometryKind::from_type_tag("Point"), GeometryKind::Point);
        assert_eq!(GeometryKind::from_type_tag("LineString"), GeometryKind::Line);
        assert_eq!(GeometryKind::from_type_tag("Polygon"), GeometryKind::Polygon);
        assert_eq!(GeometryKind::from_type_tag("MultiLineString"), GeometryKind::Polygon);
        assert_eq!(GeometryKind::from_type_tag("MultiPoint"), GeometryKind::Polygon);
    }

    #[test]
    fn polygon_style_uses_lightened_fill() {
        let style = palette().style_for(GeometryKind::Polygon, "Карельский период");
        assert_eq!(
            style,
            FeatureStyle {
                color: Rgb::new(0xff, 0x8c, 0x00),
                fill_color: Rgb::new(0xff, 0xff, 0x7f),
                weight: 1.0,
                opacity: 1.0,
                fill_opacity: 0.5,
                radius: None,
            }
        );
    }

    #[test]
    fn lines_and_points_share_thick_stroke() {
        let p = palette();
        let line = p.style_for(GeometryKind::Line, "Финский период");
        let point = p.style_for(GeometryKind::Point, "Финский период");
        assert_eq!(line.weight, 5.0);
        assert_eq!(point.weight, 5.0);
        assert_eq!(line.fill_color, line.color);
        assert_eq!(point.fill_opacity, 0.8);
        assert_eq!(point.radius, Some(6.0));
        assert_eq!(line.radius, None);
    }

    #[test]
    fn unknown_era_falls_back() {
        let style = palette().style_for(GeometryKind::Line, "Bronze age");
        assert_eq!(style.color.to_hex(), "#800080");
    }

    #[test]
    fn hover_amplifies_and_caps() {
        let p = palette();
        let hover = p.hover_style_for(GeometryKind::Point, "Советский период");
        assert_eq!(hover.weight, 10.0);
        assert!((hover.fill_opacity - 1.0).abs() < 1e-12);
        assert_eq!(hover.radius, Some(12.0));

        let poly = p.hover_style_for(GeometryKind::Polygon, "Советский период");
        assert_eq!(poly.weight, 2.0);
        assert!((poly.fill_opacity - 0.7).abs() < 1e-12);
        assert_eq!(poly.radius, None);

        let capped = FeatureStyle {
            fill_opacity: 0.95,
            ..poly
        }
        .hovered();
        assert_eq!(capped.fill_opacity, 1.0);
    }

    #[test]
    fn highlight_defaults_to_neutral() {
        let p = palette();
        assert_eq!(p.highlight_for(None), NEUTRAL_HIGHLIGHT);
        assert_eq!(p.highlight_for(Some("unknown")), NEUTRAL_HIGHLIGHT);
        assert_eq!(p.highlight_for(Some("Финский период")).to_hex(), "#1e90ff");
    }

    #[test]
    fn style_serializes_colors_as_hex() {
        let style = palette().style_for(GeometryKind::Line, "Советский период");
        let v = serde_json::to_value(style).expect("json");
        assert_eq!(v["color"], "#ff0000");
        assert!(v.get("radius").is_none());
    }
}
