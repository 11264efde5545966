//! Bounded-concurrency detail lookups.

use chouse_core::DetailRecord;
use futures::StreamExt;
use futures::stream;
use tracing::{info, warn};

use crate::{Registry, RegistryError};

/// Result of looking up one company number.
#[derive(Debug)]
pub struct DetailOutcome {
    pub identifier: String,
    pub result: Result<DetailRecord, RegistryError>,
}

impl DetailOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fetch one detail record per identifier with at most `width` requests in flight.
///
/// Exactly one outcome is returned per identifier, in input order. A failed
/// lookup is recorded in its outcome and never cancels the others.
pub async fn fetch_all_details<R: Registry + ?Sized>(
    registry: &R,
    identifiers: &[String],
    width: usize,
) -> Vec<DetailOutcome> {
    if identifiers.is_empty() {
        return Vec::new();
    }

    let lookups = stream::iter(identifiers.iter().cloned().enumerate()).map(
        |(index, identifier)| async move {
            let result = registry.fetch_detail(&identifier).await;
            if let Err(e) = &result {
                warn!(company_number = %identifier, error = %e, "detail lookup failed");
            }
            (index, DetailOutcome { identifier, result })
        },
    );
    let mut tagged: Vec<(usize, DetailOutcome)> = lookups
        .buffer_unordered(width.max(1))
        .collect()
        .await;

    // Completion order is arbitrary; restore input order.
    tagged.sort_by_key(|(index, _)| *index);
    let outcomes: Vec<DetailOutcome> = tagged.into_iter().map(|(_, o)| o).collect();

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!(
        requested = identifiers.len(),
        succeeded = outcomes.len() - failed,
        failed,
        "detail fan-out complete"
    );
    outcomes
}
