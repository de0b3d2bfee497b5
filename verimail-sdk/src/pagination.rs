//! Cursor pagination
//!
//! Segmented list endpoints are consumed either eagerly, concatenating every
//! segment with [`concat_segments`], or lazily, one item at a time, through a
//! [`Paginator`].

use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;
use verimail_core::{Direction, ListSegment, ListingOptions, QueryFilter};

use crate::cancellation::{self, CancellationToken};
use crate::dispatcher::{Dispatcher, InvocationRequest};
use crate::error::SdkResult;

/// Query parameters for one page request.
///
/// Filters only apply to the first page; afterwards the cursor alone
/// identifies the position. A positive limit is sent on every page.
pub fn page_query(
    filter: &[(String, String)],
    cursor: Option<&str>,
    direction: Direction,
    limit: Option<u32>,
) -> Vec<(String, String)> {
    let mut query = match cursor {
        Some(cursor) => vec![(direction.cursor_param().to_string(), cursor.to_string())],
        None => filter.to_vec(),
    };

    if let Some(limit) = limit.filter(|limit| *limit > 0) {
        query.push(("limit".to_string(), limit.to_string()));
    }

    query
}

/// Fetch every segment, following cursors, and concatenate their items.
///
/// `fetch` is called with `None` for the first segment, then with each
/// cursor while the previous segment is truncated.
pub async fn concat_segments<T, F, Fut>(
    mut fetch: F,
    token: Option<&CancellationToken>,
) -> SdkResult<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = SdkResult<ListSegment<T>>>,
{
    let mut items = Vec::new();
    let mut cursor = None;

    loop {
        cancellation::check(token)?;

        let segment = fetch(cursor.take()).await?;
        let next = segment.next_cursor().map(str::to_owned);
        items.extend(segment.data);

        match next {
            Some(next) => cursor = Some(next),
            None => return Ok(items),
        }
    }
}

/// Lazy, finite sequence over a segmented list endpoint.
///
/// A page is fetched only once every item of the previous one has been
/// yielded. Cancellation is checked before each item.
pub struct Paginator<T> {
    dispatcher: Arc<Dispatcher>,
    path: String,
    filter: Vec<(String, String)>,
    limit: Option<u32>,
    direction: Direction,
    token: Option<CancellationToken>,
    buffer: VecDeque<T>,
    cursor: Option<String>,
    exhausted: bool,
    pages: usize,
}

impl<T> fmt::Debug for Paginator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paginator")
            .field("path", &self.path)
            .field("direction", &self.direction)
            .field("buffered", &self.buffer.len())
            .field("pages", &self.pages)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl<T> Paginator<T>
where
    T: DeserializeOwned,
{
    pub(crate) fn new<F: QueryFilter>(
        dispatcher: Arc<Dispatcher>,
        path: impl Into<String>,
        options: &ListingOptions<F>,
        token: Option<&CancellationToken>,
    ) -> Self {
        Self {
            dispatcher,
            path: path.into(),
            filter: options.filter.to_query(),
            limit: options.effective_limit(),
            direction: options.direction,
            token: token.cloned(),
            buffer: VecDeque::new(),
            cursor: None,
            exhausted: false,
            pages: 0,
        }
    }

    /// Next item, or `None` once the last page has been drained.
    ///
    /// After an error the sequence is finished.
    pub async fn next(&mut self) -> Option<SdkResult<T>> {
        loop {
            if self.exhausted && self.buffer.is_empty() {
                return None;
            }

            if let Err(error) = cancellation::check(self.token.as_ref()) {
                self.finish();
                return Some(Err(error));
            }

            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }

            match self.fetch_page().await {
                Ok(segment) => {
                    self.cursor = segment.next_cursor().map(str::to_owned);
                    self.exhausted = self.cursor.is_none();
                    self.buffer.extend(segment.data);
                }
                Err(error) => {
                    self.finish();
                    return Some(Err(error));
                }
            }
        }
    }

    /// Number of pages fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Drain the sequence into a vector, stopping at the first error
    pub async fn collect_all(mut self) -> SdkResult<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    /// Adapt into a [`Stream`]
    pub fn into_stream(self) -> impl Stream<Item = SdkResult<T>> {
        stream::unfold(self, |mut paginator| async move {
            paginator.next().await.map(|item| (item, paginator))
        })
    }

    fn finish(&mut self) {
        self.exhausted = true;
        self.buffer.clear();
    }

    async fn fetch_page(&mut self) -> SdkResult<ListSegment<T>> {
        let query = page_query(
            &self.filter,
            self.cursor.as_deref(),
            self.direction,
            self.limit,
        );
        debug!(path = %self.path, page = self.pages + 1, "Fetching list segment");

        let request = InvocationRequest::get(self.path.clone()).with_query(query);
        let response = self.dispatcher.invoke(request, self.token.as_ref()).await?;
        self.pages += 1;

        if !response.status().is_success() {
            return Err(response.unexpected());
        }
        response.deserialize()
    }
}

/// Fetch one segment of `path` for eager concatenation
pub(crate) async fn fetch_segment<T: DeserializeOwned>(
    dispatcher: &Dispatcher,
    path: &str,
    cursor: Option<String>,
    token: Option<&CancellationToken>,
) -> SdkResult<ListSegment<T>> {
    let query = page_query(&[], cursor.as_deref(), Direction::Forward, None);
    let request = InvocationRequest::get(path).with_query(query);
    let response = dispatcher.invoke(request, token).await?;

    if !response.status().is_success() {
        return Err(response.unexpected());
    }
    response.deserialize()
}
