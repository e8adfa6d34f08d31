//! Ordering and pagination of scored events.
//!
//! Sort key: `(-score, start_time, title)`. Best score first, earliest
//! event breaking score ties, title breaking time ties, id as the last
//! resort so identically-titled events stay stable. Pages are 1-indexed; a
//! page past the end is an empty page, not an error.

use serde::Serialize;

use crate::error::ValidationError;
use crate::scoring::ScoredEvent;

#[derive(Debug, Clone, Serialize)]
pub struct RankedPage {
    pub events: Vec<ScoredEvent>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Reject bad paging parameters before any work happens.
pub fn validate_paging(page: usize, page_size: usize) -> Result<(), ValidationError> {
    if page == 0 {
        return Err(ValidationError::PageOutOfRange);
    }
    if page_size == 0 {
        return Err(ValidationError::PageSizeOutOfRange);
    }
    Ok(())
}

/// Sort into the total order and slice out the requested page.
pub fn rank(
    mut scored: Vec<ScoredEvent>,
    page: usize,
    page_size: usize,
) -> Result<RankedPage, ValidationError> {
    validate_paging(page, page_size)?;

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.event.start_time.cmp(&b.event.start_time))
            .then_with(|| a.event.title.cmp(&b.event.title))
            .then_with(|| a.event.id.cmp(&b.event.id))
    });

    let total_count = scored.len();
    let start = (page - 1).saturating_mul(page_size);
    let events = if start >= total_count {
        Vec::new()
    } else {
        scored
            .into_iter()
            .skip(start)
            .take(page_size)
            .collect()
    };

    Ok(RankedPage {
        events,
        total_count,
        page,
        page_size,
    })
}
