//! Results view model.
//!
//! [`ResultsView`] tracks one results screen through
//! `Idle → Loading → Success | Error`. A parameter change from `Success`
//! goes back to `Loading` but keeps the previous payload, so the screen can
//! show it as refreshing. `Error` only leaves through an explicit
//! [`retry`](ResultsView::retry) (or a [`reset`](ResultsView::reset) when the
//! user navigates away).

use std::fmt;
use std::sync::Arc;

use crate::LookupError;
use crate::cache::{QueryState, QueryStatus};
use crate::lookup::ApiPayload;
use crate::types::{ApiResponse, PaginatedResponse};

/// Pages shown without gaps.
const FULL_WINDOW: u32 = 7;

/// Anything the view can count rows of.
pub trait ResultSet {
    fn row_count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}

impl<T> ResultSet for PaginatedResponse<T> {
    fn row_count(&self) -> usize {
        self.data.len()
    }
}

impl<T> ResultSet for ApiResponse<T> {
    fn row_count(&self) -> usize {
        1
    }
}

impl ResultSet for ApiPayload {
    fn row_count(&self) -> usize {
        match self {
            Self::Search(response) => response.row_count(),
            Self::Business(response) => response.row_count(),
        }
    }
}

/// Lifecycle position of a results screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// What a results screen should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsDisplay {
    Idle,
    /// First load, nothing to show yet.
    Loading,
    /// New data is loading; the previous payload is still shown.
    Refreshing,
    /// The request succeeded with zero rows.
    Empty,
    Results { rows: usize },
    NotFound,
    Failed { message: String, retryable: bool },
}

/// State machine of one results screen.
#[derive(Debug)]
pub struct ResultsView<T> {
    status: ViewStatus,
    data: Option<Arc<T>>,
    error: Option<LookupError>,
}

impl<T> Default for ResultsView<T> {
    fn default() -> Self {
        Self {
            status: ViewStatus::Idle,
            data: None,
            error: None,
        }
    }
}

impl<T> ResultsView<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ViewStatus {
        self.status
    }

    pub fn data(&self) -> Option<&Arc<T>> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&LookupError> {
        self.error.as_ref()
    }

    /// Start loading for new parameters.
    ///
    /// Allowed from `Idle` and `Success` (keeping the old payload) and a
    /// no-op while already loading. Refused from `Error`.
    pub fn params_changed(&mut self) -> bool {
        match self.status {
            ViewStatus::Idle | ViewStatus::Success => {
                self.status = ViewStatus::Loading;
                true
            }
            ViewStatus::Loading => true,
            ViewStatus::Error => false,
        }
    }

    /// Explicit retry after a failure.
    pub fn retry(&mut self) -> bool {
        if self.status != ViewStatus::Error {
            return false;
        }
        self.status = ViewStatus::Loading;
        self.error = None;
        true
    }

    /// Finish the current load. Ignored unless loading.
    pub fn resolve(&mut self, outcome: Result<Arc<T>, LookupError>) -> bool {
        if self.status != ViewStatus::Loading {
            return false;
        }
        match outcome {
            Ok(data) => {
                self.status = ViewStatus::Success;
                self.data = Some(data);
                self.error = None;
            }
            Err(error) => {
                self.status = ViewStatus::Error;
                self.error = Some(error);
            }
        }
        true
    }

    /// Back to `Idle`, forgetting data and error.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Mirror a cache entry's state.
    pub fn apply(&mut self, state: &QueryState<T>) {
        self.status = if state.is_fetching {
            ViewStatus::Loading
        } else {
            match state.status {
                QueryStatus::Idle => ViewStatus::Idle,
                QueryStatus::Loading => ViewStatus::Loading,
                QueryStatus::Success => ViewStatus::Success,
                QueryStatus::Error => ViewStatus::Error,
            }
        };
        if state.data.is_some() {
            self.data = state.data.clone();
        }
        self.error = state.error.clone();
    }
}

impl<T: ResultSet> ResultsView<T> {
    /// Classify the current state for rendering.
    pub fn display(&self) -> ResultsDisplay {
        match (self.status, &self.data, &self.error) {
            (ViewStatus::Idle, _, _) => ResultsDisplay::Idle,
            (ViewStatus::Loading, None, _) => ResultsDisplay::Loading,
            (ViewStatus::Loading, Some(_), _) => ResultsDisplay::Refreshing,
            (ViewStatus::Error, _, Some(error)) if error.is_not_found() => ResultsDisplay::NotFound,
            (ViewStatus::Error, _, error) => ResultsDisplay::Failed {
                message: error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "request failed".to_string()),
                retryable: error.as_ref().is_none_or(LookupError::is_retryable),
            },
            (ViewStatus::Success, Some(data), _) if !data.is_empty() => ResultsDisplay::Results {
                rows: data.row_count(),
            },
            (ViewStatus::Success, _, _) => ResultsDisplay::Empty,
        }
    }
}

/// One entry of a pagination bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Gap,
}

impl fmt::Display for PageItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(page) => write!(f, "{page}"),
            Self::Gap => f.write_str("..."),
        }
    }
}

/// Page numbers to offer for `current` of `total` pages.
///
/// Up to seven pages are listed in full. Beyond that: the first page, the
/// pages next to `current`, the last page, with a gap wherever numbers are
/// skipped. Nothing at all when there is at most one page.
pub fn page_numbers(current: u32, total: u32) -> Vec<PageItem> {
    if total <= 1 {
        return Vec::new();
    }
    if total <= FULL_WINDOW {
        return (1..=total).map(PageItem::Page).collect();
    }

    let left = current.saturating_sub(1).max(2);
    let right = current.saturating_add(1).min(total - 1);

    let mut items = vec![PageItem::Page(1)];
    if left > 2 {
        items.push(PageItem::Gap);
    }
    items.extend((left..=right).map(PageItem::Page));
    if right < total - 1 {
        items.push(PageItem::Gap);
    }
    items.push(PageItem::Page(total));
    items
}

/// `1234567` → `"1,234,567"`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
