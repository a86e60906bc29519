// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A thread-safe pool of reusable resources handed out as leases.
//!
//! Resources are cached in a LIFO stack guarded by a single mutex. The lock
//! protects the stack and the disposed flag only; a leased resource belongs to
//! its holder until the [`Lease`] is released.
//!
//! Once the pool is disposed it stops caching: every resource still cached is
//! disposed on the spot, and every resource released afterwards is disposed
//! instead of being stored. Acquiring from a disposed pool still works, it
//! simply builds a fresh resource each time.

mod lease;

pub use lease::Lease;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// A resource that may need explicit teardown when a pool lets go of it.
///
/// The default does nothing beyond dropping the value.
pub trait Dispose: Sized {
    /// Tears the resource down for good.
    fn dispose(self) {}
}

/// Misuse of the pool API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// A lease was handed to a pool other than the one it was acquired from.
    /// The lease has been returned to its own pool.
    #[error("lease was released into a pool it was not acquired from")]
    ForeignLease,
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

struct PoolState<T> {
    available: Vec<T>,
    disposed: bool,
}

pub(crate) struct PoolInner<T: Dispose> {
    state: Mutex<PoolState<T>>,
    factory: Factory<T>,
    created: AtomicUsize,
}

impl<T: Dispose> PoolInner<T> {
    fn lock(&self) -> MutexGuard<'_, PoolState<T>> {
        // The state is a stack and a flag; both stay valid if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn build(&self) -> T {
        self.created.fetch_add(1, Ordering::Relaxed);
        (self.factory)()
    }

    /// Decides the fate of a released resource based on the disposed flag at this moment.
    pub(crate) fn give_back(&self, resource: T) {
        let mut state = self.lock();
        if state.disposed {
            drop(state);
            resource.dispose();
        } else {
            state.available.push(resource);
        }
    }
}

/// A thread-safe cache of reusable resources.
///
/// `Pool` is a handle: clones share the same cache.
pub struct Pool<T: Dispose> {
    inner: Arc<PoolInner<T>>,
}

impl<T: Dispose> Pool<T> {
    /// Creates a pool and eagerly builds `preallocate` resources.
    ///
    /// # Arguments
    ///
    /// * `factory`: Builds one resource. It must not touch the pool.
    /// * `preallocate`: How many resources to build up front.
    pub fn new<F>(factory: F, preallocate: usize) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new(PoolInner {
            state: Mutex::new(PoolState {
                available: Vec::with_capacity(preallocate),
                disposed: false,
            }),
            factory: Box::new(factory),
            created: AtomicUsize::new(0),
        });

        let resources: Vec<T> = (0..preallocate).map(|_| inner.build()).collect();
        inner.lock().available.extend(resources);

        Self { inner }
    }

    /// Takes a cached resource, or builds a new one if none is cached.
    ///
    /// Never blocks beyond the short cache lock and never fails, even after
    /// [`dispose`](Self::dispose).
    pub fn acquire(&self) -> Lease<T> {
        let cached = {
            let mut state = self.inner.lock();
            if state.disposed {
                None
            } else {
                state.available.pop()
            }
        };
        let resource = match cached {
            Some(resource) => resource,
            None => self.inner.build(),
        };
        Lease::new(Arc::clone(&self.inner), resource)
    }

    /// Releases a lease acquired from this pool.
    ///
    /// Equivalent to [`Lease::release`], except that a lease from another pool
    /// is reported as [`PoolError::ForeignLease`] after being sent back to the
    /// pool it came from.
    pub fn release(&self, lease: Lease<T>) -> Result<(), PoolError> {
        if !lease.belongs_to(&self.inner) {
            log::warn!("Pool: refusing a lease acquired from another pool");
            lease.release();
            return Err(PoolError::ForeignLease);
        }
        lease.release();
        Ok(())
    }

    /// Shuts the pool down and disposes every cached resource.
    ///
    /// Idempotent. Resources currently leased out are disposed when their
    /// lease is released.
    pub fn dispose(&self) {
        let drained = {
            let mut state = self.inner.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            std::mem::take(&mut state.available)
        };

        log::debug!("Pool: disposing {} cached resources", drained.len());
        for resource in drained {
            resource.dispose();
        }
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    /// The number of resources currently cached.
    pub fn available(&self) -> usize {
        self.inner.lock().available.len()
    }

    /// The total number of resources the factory has built.
    pub fn created(&self) -> usize {
        self.inner.created.load(Ordering::Relaxed)
    }
}

impl<T: Dispose> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Dispose> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Pool")
            .field("available", &state.available.len())
            .field("disposed", &state.disposed)
            .field("created", &self.created())
            .finish()
    }
}
