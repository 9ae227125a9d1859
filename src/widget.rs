use serde::{Deserialize, Serialize};

/// Fixed taxonomy of embedded third-party widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    Review,
    Chat,
    Popup,
    SocialProof,
    Announcement,
    Countdown,
    Currency,
    SizeGuide,
    Search,
    Recommendation,
}

/// One atomic string extracted from a widget's rendered content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextUnit {
    pub index: usize,
    pub text: String,
}

/// An embedded widget detected on the storefront, as delivered by the
/// (external) discovery mechanism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub name: String,
    pub kind: WidgetKind,
    pub text_units: Vec<TextUnit>,
}
