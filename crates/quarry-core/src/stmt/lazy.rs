use super::Value;
use crate::{schema::RelationId, Result};

use futures::future::{BoxFuture, FutureExt, Shared};
use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

type PendingLoad = Shared<BoxFuture<'static, Result<Value>>>;

/// Handle stored in place of a lazily loaded relation.
///
/// The handle does not load anything by itself. A loader context drives it
/// through [`LazyRelation::load_with`], which starts at most one load per
/// handle: concurrent readers await the same in-flight result, and once it
/// resolves the value is cached and returned synchronously by
/// [`LazyRelation::get`]. Clones share state.
#[derive(Clone)]
pub struct LazyRelation {
    relation: RelationId,
    state: Arc<Mutex<State>>,
}

enum State {
    Unloaded,
    Pending(PendingLoad),
    Loaded(Value),
}

impl LazyRelation {
    pub fn new(relation: RelationId) -> LazyRelation {
        LazyRelation {
            relation,
            state: Arc::new(Mutex::new(State::Unloaded)),
        }
    }

    pub fn relation(&self) -> RelationId {
        self.relation
    }

    /// Returns the cached value, if the relation finished loading.
    pub fn get(&self) -> Option<Value> {
        match &*self.lock() {
            State::Loaded(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(&*self.lock(), State::Loaded(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(&*self.lock(), State::Pending(_))
    }

    /// Stores an already materialized value.
    pub fn set(&self, value: Value) {
        *self.lock() = State::Loaded(value);
    }

    /// Re-arms the handle with a caller supplied pending value. Readers await
    /// it instead of starting their own load.
    pub fn set_pending<F>(&self, pending: F)
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        *self.lock() = State::Pending(pending.boxed().shared());
    }

    /// Resolves the relation, starting `load` only if nothing is cached or in
    /// flight.
    pub async fn load_with<F, Fut>(&self, load: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let pending = {
            let mut state = self.lock();

            match &*state {
                State::Loaded(value) => return Ok(value.clone()),
                State::Pending(pending) => pending.clone(),
                State::Unloaded => {
                    let pending = load().boxed().shared();
                    *state = State::Pending(pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        // Someone may have written the handle while the load was in flight;
        // only settle the state this load created.
        let mut state = self.lock();
        if let State::Pending(current) = &*state {
            if current.ptr_eq(&pending) {
                *state = match &result {
                    Ok(value) => State::Loaded(value.clone()),
                    Err(_) => State::Unloaded,
                };
            }
        }

        result
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for LazyRelation {
    fn eq(&self, other: &LazyRelation) -> bool {
        self.relation == other.relation && Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for LazyRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.lock() {
            State::Unloaded => "unloaded",
            State::Pending(_) => "pending",
            State::Loaded(_) => "loaded",
        };

        f.debug_struct("LazyRelation")
            .field("relation", &self.relation)
            .field("state", &state)
            .finish()
    }
}
