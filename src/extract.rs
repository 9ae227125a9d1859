use crate::error::Error;
use crate::html;
use crate::request::{ContentField, TranslationRequest};
use crate::store::{ContentRecord, ResourceKind};
use crate::widget::Widget;
use regex::Regex;
use std::sync::OnceLock;

/// User-selected fields for a translation job.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldSelection {
    pub title: bool,
    pub description: bool,
    pub tags: bool,
    pub content: bool,
}

impl FieldSelection {
    pub fn any(&self) -> bool {
        self.title || self.description || self.tags || self.content
    }
}

/// Pre-flight guard, checked before any network activity: a job with no
/// fields selected or no target items is a caller error, not a no-op.
pub fn validate_selection(selection: &FieldSelection, item_count: usize) -> Result<(), Error> {
    if !selection.any() {
        return Err(Error::validation("no fields selected for translation"));
    }
    if item_count == 0 {
        return Err(Error::validation("no items selected for translation"));
    }
    Ok(())
}

fn markup_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("valid regex"))
}

fn contains_markup(value: &str) -> bool {
    markup_pattern().is_match(value)
}

/// Turn one record plus a field selection into the ordered request list.
///
/// A field only yields a request when its flag is set and the value still
/// holds text after markup stripping and trimming; blank fields are dropped
/// so a batch never carries an empty `original_text`. Title and tags pass
/// through verbatim. Description/content fields are stripped to plain text
/// and keep the original markup for restoration after translation.
pub fn extract(
    record: &ContentRecord,
    kind: ResourceKind,
    selection: &FieldSelection,
) -> Vec<TranslationRequest> {
    let source_id = record.id.to_string();
    let mut requests = Vec::new();

    if selection.title {
        if let Some(request) = verbatim_request(&source_id, ContentField::Title, &record.title) {
            requests.push(request);
        }
    }

    // The HTML-bearing body maps to "description" for products and
    // collections and to "content" for pages.
    let body_field = match kind {
        ResourceKind::Product | ResourceKind::Collection => {
            selection.description.then_some(ContentField::Description)
        }
        ResourceKind::Page => selection.content.then_some(ContentField::Content),
    };
    if let Some(field) = body_field {
        if let Some(request) = markup_request(&source_id, field, &record.body_html) {
            requests.push(request);
        }
    }

    if selection.tags && kind == ResourceKind::Product {
        if let Some(request) = verbatim_request(&source_id, ContentField::Tags, &record.tags) {
            requests.push(request);
        }
    }

    for (ordinal, request) in requests.iter_mut().enumerate() {
        request.ordinal = ordinal;
    }
    requests
}

fn verbatim_request(
    source_id: &str,
    field: ContentField,
    value: &Option<String>,
) -> Option<TranslationRequest> {
    let text = value.as_deref()?.trim();
    if text.is_empty() {
        return None;
    }
    Some(TranslationRequest {
        source_id: source_id.to_string(),
        field,
        original_text: text.to_string(),
        has_markup: false,
        original_markup: None,
        ordinal: 0,
    })
}

fn markup_request(
    source_id: &str,
    field: ContentField,
    value: &Option<String>,
) -> Option<TranslationRequest> {
    let raw = value.as_deref()?;
    let stripped = html::strip(raw);
    if stripped.trim().is_empty() {
        return None;
    }

    let has_markup = contains_markup(raw);
    Some(TranslationRequest {
        source_id: source_id.to_string(),
        field,
        original_text: stripped,
        has_markup,
        original_markup: has_markup.then(|| raw.to_string()),
        ordinal: 0,
    })
}

/// Widget adapter: one request per text unit, `field = text_<index>`, no
/// markup handling. Blank units are dropped.
pub fn extract_widget(widget: &Widget) -> Vec<TranslationRequest> {
    let mut requests: Vec<TranslationRequest> = widget
        .text_units
        .iter()
        .filter(|unit| !unit.text.trim().is_empty())
        .map(|unit| TranslationRequest {
            source_id: widget.id.clone(),
            field: ContentField::WidgetText(unit.index),
            original_text: unit.text.trim().to_string(),
            has_markup: false,
            original_markup: None,
            ordinal: 0,
        })
        .collect();

    for (ordinal, request) in requests.iter_mut().enumerate() {
        request.ordinal = ordinal;
    }
    requests
}
