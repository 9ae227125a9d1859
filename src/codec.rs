use crate::request::{TranslationRequest, TranslationResult};
use tracing::warn;

/// Delimiter the model is instructed to join translations with. Chosen to
/// not occur naturally in store content.
pub const RESPONSE_DELIMITER: &str = "|||";

/// Semantic category of a batch, selecting the tone guidance sent as the
/// system instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptContext {
    Product,
    Collection,
    Page,
    Widget,
    General,
}

impl PromptContext {
    /// Fixed instruction table; one entry per context, no other variation.
    pub fn system_instruction(&self) -> &'static str {
        match self {
            PromptContext::Product => {
                "You are a professional e-commerce translator. Translate product content \
                 keeping a persuasive marketing tone that drives purchases. Preserve brand \
                 names, product codes, and measurements exactly as written."
            }
            PromptContext::Collection => {
                "You are a professional e-commerce translator. Translate collection content \
                 so it reads concise and appealing. Preserve brand names exactly as written."
            }
            PromptContext::Page => {
                "You are a professional e-commerce translator. Translate page content \
                 faithfully, preserving the structure and ordering of the original text."
            }
            PromptContext::Widget => {
                "You are a professional e-commerce translator. Translate short interface \
                 text from store widgets. Keep each translation clear, natural, and as \
                 short as the original allows."
            }
            PromptContext::General => {
                "You are a professional translator. Translate the given texts accurately \
                 and naturally."
            }
        }
    }
}

/// Render a batch into the single free-text user prompt.
///
/// The numbered list plus the count/order/delimiter instruction is the whole
/// wire contract: the model is expected to answer with exactly one
/// translation per numbered line, joined by [`RESPONSE_DELIMITER`], in
/// order, with no commentary.
pub fn encode(batch: &[TranslationRequest], target_language: &str) -> String {
    let numbered = batch
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}", i + 1, r.original_text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Translate the following {count} texts into {lang}.\n\
         Respond with exactly {count} translations in the same order, \
         separated by \"{delim}\", with no numbering and no extra commentary.\n\n\
         {numbered}",
        count = batch.len(),
        lang = target_language,
        delim = RESPONSE_DELIMITER,
        numbered = numbered,
    )
}

/// Split a model response back onto the batch it answered.
///
/// Pieces are zipped with the requests by position. A response with fewer
/// pieces than requests leaves the missing tail on the echo fallback (the
/// request's own source text); surplus pieces are discarded. This function
/// never fails: a response the model mangled degrades per item instead of
/// aborting the batch.
pub fn decode(response_text: &str, batch: Vec<TranslationRequest>) -> Vec<TranslationResult> {
    let pieces: Vec<&str> = response_text
        .split(RESPONSE_DELIMITER)
        .map(str::trim)
        .collect();

    if pieces.len() < batch.len() {
        warn!(
            "Translation response contained {} pieces for a batch of {}; \
             missing entries fall back to source text",
            pieces.len(),
            batch.len()
        );
    }

    batch
        .into_iter()
        .enumerate()
        .map(|(i, request)| match pieces.get(i) {
            Some(piece) if !piece.is_empty() => TranslationResult {
                request,
                translated_text: piece.to_string(),
            },
            _ => TranslationResult::fallback(request),
        })
        .collect()
}
