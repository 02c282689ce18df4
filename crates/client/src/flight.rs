//! Per-item single-flight registry.
//!
//! Each in-flight fetch owns an entry in a concurrent map holding a watch
//! receiver. The first caller for an item inserts the entry and becomes the
//! leader; everyone else clones the receiver and waits for the leader's
//! outcome. Dropping the leader's guard removes the entry, so the map only
//! ever holds items that are actually being fetched.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sgtn_core::{Error, ItemId};
use tokio::sync::watch;

type Outcome = Option<Result<(), Error>>;

#[derive(Debug, Default)]
pub struct Flights {
    inflight: DashMap<ItemId, watch::Receiver<Outcome>>,
}

/// Result of trying to join a flight.
#[derive(Debug)]
pub enum Flight {
    /// This caller must run the fetch and report back through the guard.
    Leader(FlightGuard),
    /// Another caller is already fetching.
    Follower(Waiter),
}

/// How a followed flight ended.
#[derive(Debug, Clone)]
pub enum Landing {
    /// The leader reported an outcome (or the wait timed out).
    Completed(Result<(), Error>),
    /// The leader went away without reporting, e.g. its task was cancelled.
    Abandoned,
}

impl Flights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the flight for `id`, starting one if none is running.
    pub fn acquire(self: &Arc<Self>, id: &ItemId) -> Flight {
        match self.inflight.entry(id.clone()) {
            Entry::Occupied(entry) => Flight::Follower(Waiter { rx: entry.get().clone() }),
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(None);
                entry.insert(rx);
                Flight::Leader(FlightGuard { flights: Arc::clone(self), id: id.clone(), tx })
            }
        }
    }

    /// Start a flight for `id` only if none is running.
    pub fn try_acquire(self: &Arc<Self>, id: &ItemId) -> Option<FlightGuard> {
        match self.acquire(id) {
            Flight::Leader(guard) => Some(guard),
            Flight::Follower(_) => None,
        }
    }

    pub fn is_inflight(&self, id: &ItemId) -> bool {
        self.inflight.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }
}

/// Held by the leader for the duration of a fetch.
#[derive(Debug)]
pub struct FlightGuard {
    flights: Arc<Flights>,
    id: ItemId,
    tx: watch::Sender<Outcome>,
}

impl FlightGuard {
    /// Publish the outcome to every waiter and release the flight.
    pub fn complete(self, outcome: Result<(), Error>) {
        self.tx.send_replace(Some(outcome));
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flights.inflight.remove(&self.id);
    }
}

/// Handle for a caller waiting on someone else's fetch.
#[derive(Debug)]
pub struct Waiter {
    rx: watch::Receiver<Outcome>,
}

impl Waiter {
    /// Wait for the leader, giving up after `timeout` if one is set.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Landing {
        let landed = async {
            match self.rx.wait_for(Option::is_some).await {
                Ok(outcome) => match (*outcome).clone() {
                    Some(result) => Landing::Completed(result),
                    None => Landing::Abandoned,
                },
                Err(_) => Landing::Abandoned,
            }
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, landed).await.unwrap_or_else(|_| {
                Landing::Completed(Err(Error::WaitTimeout(format!("no result after {}ms", limit.as_millis()))))
            }),
            None => landed.await,
        }
    }
}
