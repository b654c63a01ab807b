//! Offset pagination shared by every list operation.

use serde::Deserialize;

const DEFAULT_TAKE: i64 = 50;
const MAX_TAKE: i64 = 1000;

/// A `skip`/`take` window. Out-of-range values are clamped rather than
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "PageQuery")]
pub struct Page {
    skip: i64,
    take: i64,
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    skip: Option<i64>,
    take: Option<i64>,
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        Page::new(query.skip.unwrap_or(0), query.take.unwrap_or(DEFAULT_TAKE))
    }
}

impl Page {
    pub fn new(skip: i64, take: i64) -> Self {
        Self {
            skip: skip.max(0),
            take: take.clamp(1, MAX_TAKE),
        }
    }

    pub fn skip(&self) -> i64 {
        self.skip
    }

    pub fn take(&self) -> i64 {
        self.take
    }

    /// Apply the window to an in-memory sequence.
    pub fn slice<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.skip as usize)
            .take(self.take as usize)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, DEFAULT_TAKE)
    }
}
