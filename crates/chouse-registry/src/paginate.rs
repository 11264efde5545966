//! Search pagination: walk pages until the registry returns a short one.

use chouse_core::SummaryRecord;
use tracing::{info, warn};

use crate::{Registry, RegistryError};

/// Fetch every summary matching `query`, in page order.
///
/// Stops on an empty page, a short page, or after `max_pages` pages. A
/// failure on the first page is returned; a failure on a later page ends
/// the walk and keeps what was already collected.
pub async fn fetch_all<R: Registry + ?Sized>(
    registry: &R,
    query: &str,
    max_pages: usize,
) -> Result<Vec<SummaryRecord>, RegistryError> {
    let mut summaries = Vec::new();
    let mut page = 1;

    loop {
        if page > max_pages {
            warn!(query, max_pages, "page cap reached, stopping pagination");
            break;
        }

        let result = match registry.search(query, page).await {
            Ok(result) => result,
            Err(e) if page == 1 => return Err(e),
            Err(e) => {
                warn!(query, page, error = %e, "search page failed, keeping earlier pages");
                break;
            }
        };

        if result.is_empty() {
            break;
        }
        let last = result.is_last_page();
        summaries.extend(result.items);
        if last {
            break;
        }
        page += 1;
    }

    info!(query, count = summaries.len(), pages = page.min(max_pages), "pagination complete");
    Ok(summaries)
}
