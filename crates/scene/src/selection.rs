use foundation::bounds::LatLng;
use serde::Serialize;

use crate::entity::FeatureId;

/// Title shown for features without a name.
pub const DEFAULT_FEATURE_TITLE: &str = "Объект";

/// Feature opened in the external detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSelection {
    pub feature: FeatureId,
    pub url: String,
    pub name: Option<String>,
}

impl PanelSelection {
    pub fn title(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_FEATURE_TITLE)
    }

    /// URL loaded into the panel frame, asking for the mobile layout.
    pub fn frame_url(&self) -> String {
        format!("{}?useformat=mobile", self.url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub feature: FeatureId,
    pub anchor: Option<LatLng>,
    pub html: String,
}

/// Popup body: escaped title, then the image when present.
pub fn popup_html(name: Option<&str>, image: Option<&str>) -> String {
    let title = escape_html(name.unwrap_or(DEFAULT_FEATURE_TITLE));
    let mut html = format!("<div style=\"max-width:300px\"><h4 style=\"margin-top:0\">{title}</h4>");
    if let Some(src) = image {
        html.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\" style=\"max-width:100%\"/>",
            escape_html(src),
            escape_html(name.unwrap_or_default())
        ));
    }
    html.push_str("</div>");
    html
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Serializable view of the current selection, for the panel consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub title: String,
    pub frame_url: String,
}

impl From<&PanelSelection> for PanelView {
    fn from(sel: &PanelSelection) -> Self {
        Self {
            title: sel.title().to_string(),
            frame_url: sel.frame_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PanelSelection, PanelView, popup_html};
    use crate::entity::FeatureId;
    use foundation::handles::Handle;

    #[test]
    fn popup_escapes_and_defaults() {
        assert_eq!(
            popup_html(None, None),
            "<div style=\"max-width:300px\"><h4 style=\"margin-top:0\">Объект</h4></div>"
        );
        let html = popup_html(Some("<Mill & \"Dam\">"), Some("img/a.jpg"));
        assert!(html.contains("&lt;Mill &amp; &quot;Dam&quot;&gt;"));
        assert!(html.contains("<img src=\"img/a.jpg\" alt=\"&lt;Mill"));
    }

    #[test]
    fn panel_frame_requests_mobile_layout() {
        let sel = PanelSelection {
            feature: FeatureId(Handle::new(0, 0)),
            url: "https://ru.wikipedia.org/wiki/Kilpola".to_string(),
            name: None,
        };
        let view = PanelView::from(&sel);
        assert_eq!(view.title, "Объект");
        assert_eq!(
            view.frame_url,
            "https://ru.wikipedia.org/wiki/Kilpola?useformat=mobile"
        );
    }
}
