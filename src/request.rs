use serde::{Deserialize, Serialize};
use std::fmt;

/// The record field a piece of translatable text was lifted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentField {
    Title,
    Description,
    Tags,
    Content,
    /// One text unit inside an embedded widget, by positional index.
    WidgetText(usize),
}

impl fmt::Display for ContentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentField::Title => write!(f, "title"),
            ContentField::Description => write!(f, "description"),
            ContentField::Tags => write!(f, "tags"),
            ContentField::Content => write!(f, "content"),
            ContentField::WidgetText(index) => write!(f, "text_{}", index),
        }
    }
}

/// One unit of translatable text.
///
/// Created by the extractor, consumed once by the orchestrator, discarded
/// after being merged into a [`TranslationResult`]. `original_text` is never
/// empty or whitespace-only inside a batch; the extractor filters those out
/// upstream. `ordinal` is the position local to the request's batch and is
/// the sole mechanism for reconciling decoded responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub source_id: String,
    pub field: ContentField,
    pub original_text: String,
    pub has_markup: bool,
    /// Raw markup the text was stripped from; present iff `has_markup`.
    pub original_markup: Option<String>,
    pub ordinal: usize,
}

/// A request plus the text the model produced for it.
///
/// On unrecoverable failure `translated_text` equals the source text:
/// translation is best-effort and never silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub request: TranslationRequest,
    pub translated_text: String,
}

impl TranslationResult {
    /// Echo fallback: the degraded result carrying the source text through.
    pub fn fallback(request: TranslationRequest) -> Self {
        let translated_text = request.original_text.clone();
        Self {
            request,
            translated_text,
        }
    }
}
