use crate::source::{AnalyticsSource, RawRow, ReportRequest, SourceError};

/// Run `request` page by page until a short page signals the end.
///
/// A page shorter than `page_size` is the last one; a source whose final page
/// is exactly full costs one extra, empty request. A `limit` already on the
/// request caps the total number of rows returned.
pub fn fetch_all<S>(
    source: &S,
    request: &ReportRequest,
    page_size: usize,
) -> Result<Vec<RawRow>, SourceError>
where
    S: AnalyticsSource + ?Sized,
{
    if page_size == 0 {
        return Err(SourceError::InvalidRequest(
            "page size must be at least 1".to_string(),
        ));
    }

    let mut rows = Vec::new();
    let mut offset = request.offset;
    loop {
        let want = request
            .limit
            .map_or(page_size, |cap| page_size.min(cap.saturating_sub(rows.len())));
        if want == 0 {
            break;
        }
        let page = source.run_report(&request.clone().offset(offset).limit(want))?;
        let fetched = page.len();
        tracing::debug!(offset, fetched, "Fetched report page");
        rows.extend(page);
        if fetched < want {
            break;
        }
        offset += fetched;
    }
    Ok(rows)
}
