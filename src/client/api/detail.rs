//! Detail API trait

use async_trait::async_trait;

use crate::client::Session;
use crate::error::Result;
use crate::models::{Range, RawMessage};

/// Per-number drill-down
#[async_trait]
pub trait DetailApi: Send + Sync {
    /// Fetch the latest message received by `number` within `range`.
    ///
    /// An empty detail view yields the sentinel message rather than an error.
    async fn fetch_detail(&self, session: &Session, number: &str, range: &Range)
    -> Result<RawMessage>;
}
