//! HenrikDev Valorant API client.

pub mod api;
pub mod client;
pub mod endpoints;
pub mod metrics;
pub mod region;
pub mod types;

pub use api::StatsApi;
pub use client::HenrikClient;
pub use endpoints::MatchWindow;
pub use region::Region;
pub use types::{HenrikApiError, HenrikApiResponse};
