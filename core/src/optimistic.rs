//! Optimistic cache writes with rollback.
//!
//! The proposed value is written into the cache before the request starts,
//! so anything reading the key sees it immediately. When the request
//! succeeds the entry is replaced by the server's value; when the server's
//! value cannot be found in the response, the key is invalidated instead.
//! When the request fails the previous value is put back exactly, and an
//! entry that did not exist before is removed again.
//!
//! Only one optimistic write per key runs at a time. A second one is
//! rejected with [`ApiError::MutationPending`] before it touches the cache,
//! so its snapshot can never capture the first write's proposal.

use std::future::Future;
use std::marker::PhantomData;

use tracing::{debug, warn};

use crate::error::ApiError;
use crate::keys::QueryKey;
use crate::query::QueryClient;

pub struct Optimistic<T> {
    client: QueryClient,
    key: QueryKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Optimistic<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(client: QueryClient, key: QueryKey) -> Self {
        Self {
            client,
            key,
            _marker: PhantomData,
        }
    }

    /// Snapshot, apply `propose`, await `request`, then reconcile or roll
    /// back.
    ///
    /// `propose` receives the current cached value and returns the value to
    /// show while the request runs (`None` leaves the cache alone).
    /// `authoritative` extracts the confirmed value from the response.
    pub async fn run<O, Fut, P, A>(&self, propose: P, request: Fut, authoritative: A) -> Result<O, ApiError>
    where
        Fut: Future<Output = Result<O, ApiError>>,
        P: FnOnce(Option<T>) -> Option<T>,
        A: FnOnce(&O) -> Option<T>,
    {
        let Some(_claim) = self.client.claim_write(&self.key) else {
            debug!(key = %self.key, "optimistic write already pending");
            return Err(ApiError::MutationPending);
        };
        let snapshot = self.client.get_query_data::<T>(&self.key);
        if let Some(proposed) = propose(snapshot.clone()) {
            self.client.set_query_data(self.key.clone(), proposed);
        }

        match request.await {
            Ok(output) => {
                match authoritative(&output) {
                    Some(confirmed) => self.client.set_query_data(self.key.clone(), confirmed),
                    None => {
                        debug!(key = %self.key, "response carried no usable value, invalidating");
                        self.client.invalidate(&self.key);
                    }
                }
                Ok(output)
            }
            Err(error) => {
                warn!(key = %self.key, error = %error, "optimistic update rolled back");
                match snapshot {
                    Some(previous) => self.client.set_query_data(self.key.clone(), previous),
                    None => self.client.remove_query(&self.key),
                }
                Err(error)
            }
        }
    }
}
