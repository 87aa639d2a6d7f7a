//! Reading candidates off a loaded results view.

use tracing::{debug, warn};

use crate::page::Page;
use crate::selector::{ResolveError, Resolver, SelectorTable, targets};

use super::convert::convert_entry;
use super::types::{Candidate, RawClassCell, RawEntry};

/// Candidates in display order, plus how many entries were unusable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub candidates: Vec<Candidate>,
    pub skipped: usize,
}

/// Extract every candidate from the results view.
///
/// A malformed or half-rendered entry is logged and skipped. Only a
/// missing result list or a page that has gone away fails the whole
/// extraction.
pub async fn extract_candidates<P: Page>(
    page: &P,
    resolver: &Resolver,
    table: &SelectorTable,
) -> Result<Extraction, ResolveError> {
    let entries = resolver
        .resolve_all(page, &table.get(targets::RESULT_ENTRY))
        .await?;
    debug!(entries = entries.len(), "extracting candidates");

    let mut extraction = Extraction::default();
    for (index, entry) in entries.iter().enumerate() {
        let raw = match read_entry(page, resolver, table, entry).await {
            Ok(raw) => raw,
            Err(ResolveError::Page { source, .. }) if source.is_transient() => {
                warn!(index, error = %source, "skipping result entry that changed while reading");
                extraction.skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        match convert_entry(&raw) {
            Ok(candidate) => {
                if extraction.candidates.iter().any(|c| c.id == candidate.id) {
                    debug!(index, train = %candidate.id, "skipping duplicate result entry");
                    extraction.skipped += 1;
                } else {
                    extraction.candidates.push(candidate);
                }
            }
            Err(e) => {
                warn!(index, error = %e, "skipping malformed result entry");
                extraction.skipped += 1;
            }
        }
    }

    Ok(extraction)
}

async fn read_entry<P: Page>(
    page: &P,
    resolver: &Resolver,
    table: &SelectorTable,
    entry: &P::Element,
) -> Result<RawEntry, ResolveError> {
    let read = |target: &'static str| {
        let spec = table.get(target);
        async move { resolver.read_within(page, entry, &spec).await }
    };

    let mut raw = RawEntry {
        heading: read(targets::ENTRY_HEADING).await?,
        departure: read(targets::ENTRY_DEPARTURE).await?,
        arrival: read(targets::ENTRY_ARRIVAL).await?,
        duration: read(targets::ENTRY_DURATION).await?,
        distance: read(targets::ENTRY_DISTANCE).await?,
        classes: Vec::new(),
    };

    let code_spec = table.get(targets::CLASS_CELL_CODE);
    let status_spec = table.get(targets::CLASS_CELL_STATUS);
    let cells = resolver
        .all_within(page, entry, &table.get(targets::ENTRY_CLASS_CELL))
        .await?;
    for cell in &cells {
        raw.classes.push(RawClassCell {
            code: resolver.read_within(page, cell, &code_spec).await?,
            status: resolver.read_within(page, cell, &status_spec).await?,
        });
    }

    Ok(raw)
}
