//! The subscription side of the system lives outside this crate. These are
//! the capabilities the engine needs from it.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod memory;

/// `k_EResultOK`; anything else is a failure code from the store.
pub const RESULT_OK: i32 = 1;

/// Out-of-band outcome of an earlier subscribe request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeNotice {
    pub item_id: String,
    pub result: i32,
}

impl SubscribeNotice {
    pub fn is_ok(&self) -> bool {
        self.result == RESULT_OK
    }
}

#[async_trait]
pub trait SubscriptionClient: Send + Sync {
    async fn is_entitled(&self, app_id: u32) -> Result<bool>;

    /// Read-only snapshot. May lag behind accepted requests.
    async fn subscribed_ids(&self) -> Result<BTreeSet<String>>;

    /// Returns once the request is handed off; the outcome arrives later as a
    /// [`SubscribeNotice`]. Repeating a request must be harmless.
    async fn request_subscribe(&self, item_id: &str) -> Result<()>;

    /// Notices received since the previous call.
    fn drain_notices(&self) -> Vec<SubscribeNotice> {
        Vec::new()
    }
}
