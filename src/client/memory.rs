use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{SubscribeNotice, SubscriptionClient, RESULT_OK};
use crate::error::{Error, Result};

const RESULT_FAIL: i32 = 2;

#[derive(Debug, Default)]
struct State {
    entitled: bool,
    subscribed: BTreeSet<String>,
    /// id -> snapshot reads left before it shows up.
    in_flight: HashMap<String, u32>,
    rejected: HashSet<String>,
    failing_reads: u32,
    requests: Vec<String>,
    notices: Vec<SubscribeNotice>,
    snapshot_reads: usize,
}

/// Eventually-consistent stand-in for a real subscription store.
///
/// A request becomes visible on the `lag`-th snapshot read after it was
/// first made. Rejected ids never become visible.
#[derive(Debug)]
pub struct MemoryClient {
    lag: u32,
    state: Mutex<State>,
}

impl MemoryClient {
    pub fn new<I, S>(subscribed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MemoryClient {
            lag: 0,
            state: Mutex::new(State {
                entitled: true,
                subscribed: subscribed.into_iter().map(Into::into).collect(),
                ..State::default()
            }),
        }
    }

    pub fn with_lag(mut self, lag: u32) -> Self {
        self.lag = lag;
        self
    }

    pub fn rejecting<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().rejected.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn not_entitled(self) -> Self {
        self.lock().entitled = false;
        self
    }

    /// The next `n` snapshot reads fail.
    pub fn failing_reads(self, n: u32) -> Self {
        self.lock().failing_reads = n;
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    pub fn snapshot_reads(&self) -> usize {
        self.lock().snapshot_reads
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SubscriptionClient for MemoryClient {
    async fn is_entitled(&self, _app_id: u32) -> Result<bool> {
        Ok(self.lock().entitled)
    }

    async fn subscribed_ids(&self) -> Result<BTreeSet<String>> {
        let mut state = self.lock();
        state.snapshot_reads += 1;

        let mut landed = Vec::new();
        for (id, left) in state.in_flight.iter_mut() {
            *left = left.saturating_sub(1);
            if *left == 0 {
                landed.push(id.clone());
            }
        }
        for id in landed {
            state.in_flight.remove(&id);
            state.subscribed.insert(id);
        }

        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(Error::Client("snapshot unavailable".into()));
        }

        Ok(state.subscribed.clone())
    }

    async fn request_subscribe(&self, item_id: &str) -> Result<()> {
        let lag = self.lag;
        let mut state = self.lock();
        state.requests.push(item_id.to_string());

        if state.rejected.contains(item_id) {
            state.notices.push(SubscribeNotice {
                item_id: item_id.to_string(),
                result: RESULT_FAIL,
            });
            return Ok(());
        }

        let known = state.subscribed.contains(item_id) || state.in_flight.contains_key(item_id);
        if !known {
            if lag == 0 {
                state.subscribed.insert(item_id.to_string());
            } else {
                state.in_flight.insert(item_id.to_string(), lag);
            }
        }

        state.notices.push(SubscribeNotice {
            item_id: item_id.to_string(),
            result: RESULT_OK,
        });
        Ok(())
    }

    fn drain_notices(&self) -> Vec<SubscribeNotice> {
        std::mem::take(&mut self.lock().notices)
    }
}
