//! Listing API trait

use async_trait::async_trait;

use crate::client::Session;
use crate::error::Result;
use crate::models::Range;

/// Collection listing operations for the dashboard
#[async_trait]
pub trait ListingApi: Send + Sync {
    /// List the ranges currently holding received messages
    async fn list_ranges(&self, session: &Session) -> Result<Vec<Range>>;

    /// List the phone numbers inside a range
    async fn list_numbers(&self, session: &Session, range: &Range) -> Result<Vec<String>>;
}
