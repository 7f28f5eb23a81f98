//! Generic view model behind the Users and Pharmacies tables.
//!
//! A `ListView` owns the rows of one collection plus the table state the
//! front end needs (sorting, pagination, selection, dismissible error).
//! Authentication failures never surface here as errors: a missing token or
//! a 401 ends the session through the `SessionController` instead.

use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::api::{ApiError, ResourceApi};
use crate::auth::{LogoutReason, SessionController};
use crate::utils::cmp_ignore_case;

/// Page sizes offered by the tables.
pub const PAGE_SIZES: [usize; 3] = [10, 25, 50];

/// A row type served by a bearer-authenticated collection endpoint.
pub trait Resource: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Path of the collection, e.g. `pharmacies`
    const COLLECTION: &'static str;
    const SINGULAR: &'static str;
    const PLURAL: &'static str;
    /// Column headers, in display order
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> &str;
    fn display_name(&self) -> String;
    /// Text of a column, also used as the sort key
    fn cell(&self, column: usize) -> String;
}

/// What a load or delete did to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    Updated,
    /// A non-auth failure; the message is in `error()`
    Failed,
    /// The session ended (missing token or 401); rows untouched
    LoggedOut,
    /// The session changed while the request was in flight; result dropped
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: usize,
    pub ascending: bool,
}

pub struct ListView<T: Resource> {
    rows: Vec<T>,
    loading: bool,
    error: Option<String>,
    sort: Option<SortSpec>,
    page: usize,
    page_size: usize,
    /// Index into the current page
    selection: usize,
}

impl<T: Resource> Default for ListView<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> ListView<T> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            loading: true,
            error: None,
            sort: None,
            page: 0,
            page_size: PAGE_SIZES[0],
            selection: 0,
        }
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Fetch the collection and replace the rows.
    pub async fn load(&mut self, session: &SessionController, api: &dyn ResourceApi) -> ViewOutcome {
        let generation = session.generation();
        let Some(token) = session.token() else {
            warn!(collection = T::COLLECTION, "No authentication token found");
            self.loading = false;
            session.logout(LogoutReason::MissingToken);
            return ViewOutcome::LoggedOut;
        };

        let result = api.get_collection(T::COLLECTION, &token).await;
        self.loading = false;

        if session.generation() != generation {
            debug!(collection = T::COLLECTION, "Session changed during fetch, dropping rows");
            return ViewOutcome::Discarded;
        }

        match result {
            Ok(values) => {
                self.rows = decode_rows(values);
                self.error = None;
                self.clamp_position();
                debug!(collection = T::COLLECTION, count = self.rows.len(), "Rows loaded");
                ViewOutcome::Updated
            }
            Err(e) => self.handle_failure(session, e, "fetch", T::PLURAL),
        }
    }

    /// Delete one row on the server, then locally. The caller is expected
    /// to have asked the user for confirmation.
    pub async fn delete(
        &mut self,
        id: &str,
        session: &SessionController,
        api: &dyn ResourceApi,
    ) -> ViewOutcome {
        let generation = session.generation();
        let Some(token) = session.token() else {
            warn!(collection = T::COLLECTION, "No authentication token found");
            session.logout(LogoutReason::MissingToken);
            return ViewOutcome::LoggedOut;
        };

        let result = api.delete_item(T::COLLECTION, id, &token).await;

        if session.generation() != generation {
            debug!(collection = T::COLLECTION, "Session changed during delete");
            return ViewOutcome::Discarded;
        }

        match result {
            Ok(()) => {
                self.rows.retain(|row| row.id() != id);
                self.clamp_position();
                debug!(collection = T::COLLECTION, id = id, "Row deleted");
                ViewOutcome::Updated
            }
            Err(e) => self.handle_failure(session, e, "delete", T::SINGULAR),
        }
    }

    fn handle_failure(
        &mut self,
        session: &SessionController,
        err: ApiError,
        action: &str,
        noun: &str,
    ) -> ViewOutcome {
        if err.is_unauthorized() {
            warn!(collection = T::COLLECTION, action = action, "Session expired");
            session.logout(LogoutReason::Unauthorized);
            return ViewOutcome::LoggedOut;
        }

        error!(collection = T::COLLECTION, action = action, error = %err, "Request failed");
        self.error = Some(format!("Failed to {} {}: {}", action, noun, err.status_text()));
        ViewOutcome::Failed
    }

    /// Drop all rows and table state, e.g. after logout.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    // =========================================================================
    // Sorting
    // =========================================================================

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    /// Sort by `column`; selecting the current column flips the direction.
    pub fn toggle_sort(&mut self, column: usize) {
        if column >= T::COLUMNS.len() {
            return;
        }
        self.sort = match self.sort {
            Some(spec) if spec.column == column => Some(SortSpec {
                column,
                ascending: !spec.ascending,
            }),
            _ => Some(SortSpec {
                column,
                ascending: true,
            }),
        };
        self.page = 0;
        self.selection = 0;
    }

    /// Move the sort to the next column (ascending), wrapping to unsorted.
    pub fn cycle_sort_column(&mut self) {
        self.sort = match self.sort {
            None => Some(SortSpec {
                column: 0,
                ascending: true,
            }),
            Some(spec) if spec.column + 1 < T::COLUMNS.len() => Some(SortSpec {
                column: spec.column + 1,
                ascending: true,
            }),
            Some(_) => None,
        };
        self.page = 0;
        self.selection = 0;
    }

    pub fn reverse_sort(&mut self) {
        if let Some(spec) = self.sort.as_mut() {
            spec.ascending = !spec.ascending;
        }
    }

    /// Rows in display order
    pub fn sorted_rows(&self) -> Vec<&T> {
        let mut rows: Vec<&T> = self.rows.iter().collect();
        if let Some(spec) = self.sort {
            rows.sort_by(|a, b| {
                let ord = cmp_ignore_case(&a.cell(spec.column), &b.cell(spec.column));
                if spec.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        rows
    }

    // =========================================================================
    // Pagination and selection
    // =========================================================================

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages; an empty table still has one page
    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(self.page_size).max(1)
    }

    pub fn page_rows(&self) -> Vec<&T> {
        self.sorted_rows()
            .into_iter()
            .skip(self.page * self.page_size)
            .take(self.page_size)
            .collect()
    }

    pub fn can_next_page(&self) -> bool {
        self.page + 1 < self.page_count()
    }

    pub fn can_prev_page(&self) -> bool {
        self.page > 0
    }

    pub fn next_page(&mut self) {
        if self.can_next_page() {
            self.page += 1;
            self.selection = 0;
        }
    }

    pub fn prev_page(&mut self) {
        if self.can_prev_page() {
            self.page -= 1;
            self.selection = 0;
        }
    }

    pub fn set_page_size(&mut self, size: usize) {
        if PAGE_SIZES.contains(&size) {
            self.page_size = size;
            self.page = 0;
            self.selection = 0;
        }
    }

    pub fn cycle_page_size(&mut self) {
        let idx = PAGE_SIZES
            .iter()
            .position(|&s| s == self.page_size)
            .unwrap_or(0);
        self.set_page_size(PAGE_SIZES[(idx + 1) % PAGE_SIZES.len()]);
    }

    pub fn selection(&self) -> usize {
        self.selection
    }

    pub fn select_next(&mut self) {
        let len = self.page_rows().len();
        if self.selection + 1 < len {
            self.selection += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selection = self.selection.saturating_sub(1);
    }

    pub fn selected(&self) -> Option<&T> {
        self.page_rows().get(self.selection).copied()
    }

    fn clamp_position(&mut self) {
        let last_page = self.page_count() - 1;
        if self.page > last_page {
            self.page = last_page;
        }
        let len = self.page_rows().len();
        if self.selection >= len {
            self.selection = len.saturating_sub(1);
        }
    }
}

/// Parse a collection, skipping (and logging) rows that do not decode.
pub(crate) fn decode_rows<T: Resource>(values: Vec<serde_json::Value>) -> Vec<T> {
    let total = values.len();
    let rows: Vec<T> = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<T>(value) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!(collection = T::COLLECTION, error = %e, "Skipping malformed row");
                None
            }
        })
        .collect();
    if rows.len() != total {
        warn!(
            collection = T::COLLECTION,
            skipped = total - rows.len(),
            "Some rows could not be parsed"
        );
    }
    rows
}

// ============================================================================
// Tests
// ============================================================================
