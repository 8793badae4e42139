//! Dashboard API surface split by responsibility
//!
//! - [`AuthApi`] - Establishing a session
//! - [`ListingApi`] - Ranges and the numbers inside them
//! - [`DetailApi`] - Latest message for a number
//!
//! The [`DashboardApi`](super::DashboardApi) super-trait combines all three.

mod auth;
mod detail;
mod listing;

pub use auth::AuthApi;
pub use detail::DetailApi;
pub use listing::ListingApi;
