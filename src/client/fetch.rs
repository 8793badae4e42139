//! Detail fetching with backoff and per-range fan-out
//!
//! Failures are returned, not swallowed: callers decide what degraded value
//! stands in for a failed fetch.

use std::sync::Arc;

use log::warn;

use super::parallel::{DETAIL_FAN_OUT, join_ordered};
use super::rate_limit::Backoff;
use super::{DetailApi, Session};
use crate::error::{ApiError, Error, Result};
use crate::models::{Range, RawMessage};

/// Fetch one number's detail, backing off while the dashboard answers 429.
///
/// Any other error ends the attempt immediately.
pub async fn detail_with_backoff<A: DetailApi + ?Sized>(
    api: &A,
    session: &Session,
    number: &str,
    range: &Range,
    backoff: Backoff,
) -> Result<RawMessage> {
    let attempts = backoff.max_attempts.max(1);
    for attempt in 0..attempts {
        match api.fetch_detail(session, number, range).await {
            Err(Error::Api(ApiError::RateLimited)) if attempt + 1 < attempts => {
                let delay = backoff.delay_for(attempt);
                warn!(
                    "429 on attempt {} for {}, retrying in {}s",
                    attempt + 1,
                    number,
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
            }
            outcome => return outcome,
        }
    }
    Err(ApiError::RateLimited.into())
}

/// Fetch every number of a range concurrently, results in listing order.
pub async fn fetch_details<A: DetailApi + ?Sized + 'static>(
    api: Arc<A>,
    session: &Session,
    range: &Range,
    numbers: Vec<String>,
) -> Vec<Result<RawMessage>> {
    join_ordered(
        numbers,
        |number| {
            let api = api.clone();
            let session = session.clone();
            let range = range.clone();
            async move {
                detail_with_backoff(api.as_ref(), &session, &number, &range, Backoff::DETAIL).await
            }
        },
        DETAIL_FAN_OUT,
    )
    .await
}
