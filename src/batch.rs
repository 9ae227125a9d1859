use crate::request::TranslationRequest;

/// Fixed batch size for upstream translation calls. Not exposed as a
/// configuration surface.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Split requests into ordered, fixed-maximum-size batches.
///
/// Batches partition the input with no overlap and no reordering; the last
/// batch may be shorter than `size`. Empty input yields zero batches. A
/// `size` of zero is treated as [`DEFAULT_BATCH_SIZE`] to defend against
/// misconfiguration. Ordinals are reassigned local to each batch
/// (`0..batch.len()`), which is what response reconciliation zips against.
pub fn partition(requests: Vec<TranslationRequest>, size: usize) -> Vec<Vec<TranslationRequest>> {
    let size = if size == 0 { DEFAULT_BATCH_SIZE } else { size };

    let mut batches = Vec::with_capacity(requests.len().div_ceil(size));
    let mut current: Vec<TranslationRequest> = Vec::with_capacity(size);

    for mut request in requests {
        if current.len() == size {
            batches.push(std::mem::take(&mut current));
        }
        request.ordinal = current.len();
        current.push(request);
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}
