//! Write hooks for POST, PUT, PATCH and DELETE.
//!
//! A [`Mutation`] wraps one write operation plus the cache reconciliation
//! that follows a success: invalidate the affected keys so subscribers
//! refetch, or write the server's representation straight into the cache.
//! Each call moves the hook through `Idle → Pending → Success | Error`;
//! while a call is pending, further calls are rejected so a form cannot be
//! submitted twice. The hook is reusable once the call settles.
//!
//! ```rust,ignore
//! let create = Mutation::new(client.clone(), |form: SliderForm| {
//!     Box::pin(async move { api.create_slider(form).await })
//! })
//! .invalidates(vec![SLIDERS.all()]);
//!
//! let slider = create.mutate(form).await?;
//! ```

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::keys::QueryKey;
use crate::query::QueryClient;

/// The state of a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationState<T> {
    /// Not started, or reset.
    Idle,
    /// A call is in progress.
    Pending,
    /// The last call succeeded with this result.
    Success(T),
    /// The last call failed.
    Error(ApiError),
}

impl<T> MutationState<T> {
    pub const fn data(&self) -> Option<&T> {
        match self {
            MutationState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub const fn error(&self) -> Option<&ApiError> {
        match self {
            MutationState::Error(error) => Some(error),
            _ => None,
        }
    }

    pub const fn is_idle(&self) -> bool {
        matches!(self, MutationState::Idle)
    }

    pub const fn is_pending(&self) -> bool {
        matches!(self, MutationState::Pending)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, MutationState::Success(_))
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, MutationState::Error(_))
    }
}

type Mutator<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O, ApiError>> + Send + Sync>;
type OnSuccess<I, O> = Arc<dyn Fn(&QueryClient, &I, &O) + Send + Sync>;

pub struct Mutation<I, O> {
    mutator: Mutator<I, O>,
    on_success: Vec<OnSuccess<I, O>>,
    client: QueryClient,
    state: Arc<Mutex<MutationState<O>>>,
}

impl<I, O> Clone for Mutation<I, O> {
    fn clone(&self) -> Self {
        Self {
            mutator: self.mutator.clone(),
            on_success: self.on_success.clone(),
            client: self.client.clone(),
            state: self.state.clone(),
        }
    }
}

impl<I, O: fmt::Debug> fmt::Debug for Mutation<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl<I, O> Mutation<I, O>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
{
    pub fn new<F>(client: QueryClient, mutator: F) -> Self
    where
        F: Fn(I) -> BoxFuture<'static, Result<O, ApiError>> + Send + Sync + 'static,
    {
        Self {
            mutator: Arc::new(mutator),
            on_success: Vec::new(),
            client,
            state: Arc::new(Mutex::new(MutationState::Idle)),
        }
    }

    /// Run `f` against the cache after every successful call.
    #[must_use]
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&QueryClient, &I, &O) + Send + Sync + 'static,
    {
        self.on_success.push(Arc::new(f));
        self
    }

    /// Invalidate each key (and its descendants) after every success.
    #[must_use]
    pub fn invalidates(self, keys: Vec<QueryKey>) -> Self {
        self.on_success(move |client, _, _| {
            for key in &keys {
                client.invalidate(key);
            }
        })
    }

    pub fn state(&self) -> MutationState<O> {
        self.state.lock().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state.lock().is_pending()
    }

    /// Back to `Idle`, unless a call is still pending.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        if !state.is_pending() {
            *state = MutationState::Idle;
        }
    }

    pub async fn mutate(&self, input: I) -> Result<O, ApiError> {
        let guard = PendingGuard::acquire(&self.state)?;
        let result = (self.mutator)(input.clone()).await;
        match &result {
            Ok(output) => {
                for reconcile in &self.on_success {
                    reconcile(&self.client, &input, output);
                }
                debug!("mutation succeeded");
                guard.settle(MutationState::Success(output.clone()));
            }
            Err(error) => {
                warn!(error = %error, "mutation failed");
                guard.settle(MutationState::Error(error.clone()));
            }
        }
        result
    }
}

/// Holds the `Pending` state for one call. If the call's future is dropped
/// before it settles, the hook goes back to `Idle`.
struct PendingGuard<'a, O> {
    state: &'a Mutex<MutationState<O>>,
    settled: bool,
}

impl<'a, O> PendingGuard<'a, O> {
    fn acquire(state: &'a Mutex<MutationState<O>>) -> Result<Self, ApiError> {
        let mut current = state.lock();
        if current.is_pending() {
            return Err(ApiError::MutationPending);
        }
        *current = MutationState::Pending;
        Ok(Self {
            state,
            settled: false,
        })
    }

    fn settle(mut self, next: MutationState<O>) {
        *self.state.lock() = next;
        self.settled = true;
    }
}

impl<O> Drop for PendingGuard<'_, O> {
    fn drop(&mut self) {
        if !self.settled {
            *self.state.lock() = MutationState::Idle;
        }
    }
}
