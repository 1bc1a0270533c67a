//! Record queries with pagination.

use loom_types::{Record, Sequence};

/// Filter and pagination for [`Loom::query`](crate::Loom::query).
///
/// `offset`/`limit` are stable across calls only while no concurrent
/// append occurs; `reverse` returns nearest-to-`to` first for
/// efficient tailing.
#[derive(Clone, Debug)]
pub struct QueryParams {
    /// Only records of these types (None = all).
    pub types: Option<Vec<String>>,
    /// Only records with sequence strictly greater than this.
    pub from: Option<Sequence>,
    /// Upper bound (inclusive); defaults to the branch head.
    pub to: Option<Sequence>,
    /// Page size.
    pub limit: usize,
    /// Records to skip before the page.
    pub offset: usize,
    /// Nearest-to-`to` first.
    pub reverse: bool,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            types: None,
            from: None,
            to: None,
            limit: 100,
            offset: 0,
            reverse: false,
        }
    }
}

impl QueryParams {
    /// Restrict to record types.
    pub fn types(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Page size.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Skip this many matching records.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Iterate nearest-to-`to` first.
    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub(crate) fn matches(&self, record: &Record) -> bool {
        if let Some(ref types) = self.types {
            if !types.contains(&record.record_type) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.sequence <= from {
                return false;
            }
        }
        true
    }
}

/// One page of query results.
#[derive(Clone, Debug, Default)]
pub struct QueryPage {
    pub records: Vec<Record>,
    /// More matching records exist past this page.
    pub has_more: bool,
}

impl QueryPage {
    /// Paginate an already-filtered record list.
    pub(crate) fn paginate(matching: Vec<Record>, offset: usize, limit: usize) -> Self {
        let has_more = matching.len() > offset.saturating_add(limit);
        let records = matching.into_iter().skip(offset).take(limit).collect();
        Self { records, has_more }
    }
}
