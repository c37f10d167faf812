use std::time::Duration;

use tracing::debug;

use super::{BrowseFilter, QueryOptions, QueryStatus};
use crate::client::WorkshopClient;
use crate::transport::{ItemId, Transport};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PagingError {
    #[error("page {page} took too much time")]
    Timeout { page: u32 },
    #[error("page {page} failed: {error}")]
    Failed { page: u32, error: String },
}

/// Ids gathered by [`collect_browse_pages`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseReport {
    pub ids: Vec<ItemId>,
    pub pages_requested: u32,
}

/// Browse page after page, starting at `filter.page`, until a page comes
/// back empty or `max_count` ids were gathered.
///
/// Each page is waited for with `timeout`. A page that fails or times out
/// ends the iteration with an error; nothing is retried.
///
/// # Panics
///
/// If `filter.page` is 0.
pub fn collect_browse_pages<T: Transport>(
    client: &mut WorkshopClient<T>,
    options: &QueryOptions,
    filter: &BrowseFilter,
    max_count: Option<usize>,
    timeout: Duration,
) -> Result<BrowseReport, PagingError> {
    let max_count = max_count.unwrap_or(usize::MAX);
    let mut report = BrowseReport::default();
    let mut page = filter.page;

    while report.ids.len() < max_count {
        let slot = client.create_browse_query(options.clone(), filter.with_page(page));
        report.pages_requested += 1;

        if !client.wait_for_queries(&[slot], timeout) {
            client.finish_query(slot);
            return Err(PagingError::Timeout { page });
        }
        if client.query_status(slot) != QueryStatus::Completed {
            let error = client.query_error(slot);
            client.finish_query(slot);
            return Err(PagingError::Failed { page, error });
        }

        let ids = client.finish_browse_query(slot);
        debug!(page, found = ids.len(), "browse page collected");
        if ids.is_empty() {
            break;
        }
        report.ids.extend(ids);
        page += 1;
    }

    report.ids.truncate(max_count);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkshopConfig;
    use crate::error::{CallFailure, ResultCode};
    use crate::local::LocalWorkshop;

    fn client(items: usize, page_size: usize) -> WorkshopClient<LocalWorkshop> {
        let mut workshop = LocalWorkshop::new().with_page_size(page_size);
        for n in 0..items {
            workshop.publish(&format!("item {}", n), "", &[]);
        }
        let config = WorkshopConfig {
            poll_interval_ms: 1,
            ..Default::default()
        };
        WorkshopClient::connect(workshop, config).unwrap()
    }

    fn collect(
        client: &mut WorkshopClient<LocalWorkshop>,
        max_count: Option<usize>,
    ) -> Result<BrowseReport, PagingError> {
        collect_browse_pages(
            client,
            &QueryOptions::default(),
            &BrowseFilter::default(),
            max_count,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn stops_at_first_empty_page() {
        let mut client = client(7, 3);
        let report = collect(&mut client, None).unwrap();
        assert_eq!(report.ids.len(), 7);
        assert_eq!(report.pages_requested, 4);
        assert_eq!(client.open_slots(), 0);
    }

    #[test]
    fn stops_once_max_count_is_reached() {
        let mut client = client(6, 3);
        let report = collect(&mut client, Some(5)).unwrap();
        assert_eq!(report.ids.len(), 5);
        assert_eq!(report.pages_requested, 2);
    }

    #[test]
    fn starts_at_the_given_page() {
        let mut client = client(7, 3);
        let report = collect_browse_pages(
            &mut client,
            &QueryOptions::default(),
            &BrowseFilter::default().with_page(2),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(report.ids.len(), 4);
        assert_eq!(report.pages_requested, 3);
    }

    #[test]
    #[should_panic(expected = "pages start at 1")]
    fn page_zero_is_rejected() {
        let mut client = client(3, 3);
        let _ = collect_browse_pages(
            &mut client,
            &QueryOptions::default(),
            &BrowseFilter::default().with_page(0),
            None,
            Duration::from_secs(5),
        );
    }

    #[test]
    fn failed_page_ends_iteration() {
        let mut client = client(6, 3);
        client.transport_mut().reject_next(ResultCode::Timeout);
        assert_eq!(
            collect(&mut client, None),
            Err(PagingError::Failed {
                page: 1,
                error: "Timeout".into()
            })
        );
        assert_eq!(client.open_slots(), 0);

        client.transport_mut().fail_next(CallFailure::ServiceUnavailable);
        let err = collect(&mut client, None).unwrap_err();
        assert_eq!(err.to_string(), "page 1 failed: service unavailable");
    }

    #[test]
    fn slow_page_times_out() {
        let mut client = client(6, 3);
        client.transport_mut().set_latency(1_000_000);
        let err = collect_browse_pages(
            &mut client,
            &QueryOptions::default(),
            &BrowseFilter::default(),
            None,
            Duration::from_millis(10),
        )
        .unwrap_err();
        assert_eq!(err, PagingError::Timeout { page: 1 });
        assert_eq!(client.open_slots(), 0);
    }
}
