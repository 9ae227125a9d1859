use crate::artifact;
use crate::codec::PromptContext;
use crate::error::Error;
use crate::extract::{self, FieldSelection};
use crate::html;
use crate::request::{ContentField, TranslationResult};
use crate::store::{ContentRecord, ResourceKind, StoreClient};
use crate::translator::Translator;
use crate::widget::Widget;
use tracing::{error, info};

/// Per-item outcome totals for one records job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    pub translated: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn context_for(kind: ResourceKind) -> PromptContext {
    match kind {
        ResourceKind::Product => PromptContext::Product,
        ResourceKind::Collection => PromptContext::Collection,
        ResourceKind::Page => PromptContext::Page,
    }
}

/// Translate a set of store records and write them back.
///
/// Items are processed independently and strictly in order: one item's
/// upstream failure is logged and counted, never allowed to abort its
/// siblings. The two pre-flight guards (field selection, item selection)
/// and a missing translation credential are the only errors that abort the
/// whole job.
pub async fn translate_records(
    store: &mut StoreClient,
    translator: &mut Translator,
    kind: ResourceKind,
    ids: &[u64],
    selection: &FieldSelection,
    target_language: &str,
) -> Result<JobReport, Error> {
    extract::validate_selection(selection, ids.len())?;

    let mut report = JobReport::default();
    for &id in ids {
        match process_record(store, translator, kind, id, selection, target_language).await {
            Ok(true) => report.translated += 1,
            Ok(false) => {
                info!("{} {} has no translatable text, skipping", kind.singular(), id);
                report.skipped += 1;
            }
            // A missing credential fails every item the same way; surface it
            // once instead of logging it per item.
            Err(e @ Error::Configuration(_)) => return Err(e),
            Err(e) => {
                error!("Failed to translate {} {}: {}", kind.singular(), id, e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Records job finished: {} translated, {} skipped, {} failed",
        report.translated, report.skipped, report.failed
    );
    Ok(report)
}

/// One record end to end: fetch, extract, translate, restore markup, PUT.
/// Returns `Ok(false)` when the selection matched no non-empty fields.
async fn process_record(
    store: &mut StoreClient,
    translator: &mut Translator,
    kind: ResourceKind,
    id: u64,
    selection: &FieldSelection,
    target_language: &str,
) -> Result<bool, Error> {
    let mut record = store.fetch(kind, id).await?;

    let requests = extract::extract(&record, kind, selection);
    if requests.is_empty() {
        return Ok(false);
    }

    let results = translator
        .translate_batch(requests, target_language, context_for(kind))
        .await?;

    apply_results(&mut record, &results);
    store.update(kind, &record).await?;
    Ok(true)
}

/// Write translated texts back onto the record. Markup-bearing fields go
/// through the HTML bridge; when restoration degrades (multi-node markup)
/// the original markup is kept as-is.
fn apply_results(record: &mut ContentRecord, results: &[TranslationResult]) {
    for result in results {
        match result.request.field {
            ContentField::Title => {
                record.title = Some(result.translated_text.clone());
            }
            ContentField::Tags => {
                record.tags = Some(result.translated_text.clone());
            }
            ContentField::Description | ContentField::Content => {
                record.body_html = Some(match &result.request.original_markup {
                    Some(markup) => html::restore(markup, &result.translated_text),
                    None => result.translated_text.clone(),
                });
            }
            // Widget text never lands on a store record.
            ContentField::WidgetText(_) => {}
        }
    }
}

/// Translate every text unit of the given widgets and render the
/// text-replacement script artifact for delivery.
pub async fn translate_widgets(
    translator: &mut Translator,
    widgets: &[Widget],
    target_language: &str,
) -> Result<(Vec<TranslationResult>, String), Error> {
    if widgets.is_empty() {
        return Err(Error::validation("no widgets selected for translation"));
    }

    let requests: Vec<_> = widgets.iter().flat_map(extract::extract_widget).collect();
    let results = translator
        .translate_batch(requests, target_language, PromptContext::Widget)
        .await?;

    let script = artifact::replacement_script(&results);
    Ok((results, script))
}
