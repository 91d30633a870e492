use serde::{Deserialize, Serialize};

use crate::models::CombinedSnapshot;

/// Persisted form of a snapshot: `{ "timestamp": <epoch ms>, "data": { .. } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: i64,
    pub data: CombinedSnapshot,
}
