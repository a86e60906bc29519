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

use super::{Dispose, PoolInner};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Exclusive use of one pooled resource.
///
/// A lease is released exactly once: either explicitly through
/// [`release`](Self::release), or implicitly when it is dropped. Whether the
/// resource is cached again or disposed depends on the pool's state at that
/// moment, not at acquisition time.
pub struct Lease<T: Dispose> {
    pool: Arc<PoolInner<T>>,
    resource: Option<T>,
}

impl<T: Dispose> Lease<T> {
    pub(crate) fn new(pool: Arc<PoolInner<T>>, resource: T) -> Self {
        Self {
            pool,
            resource: Some(resource),
        }
    }

    pub(crate) fn belongs_to(&self, pool: &Arc<PoolInner<T>>) -> bool {
        Arc::ptr_eq(&self.pool, pool)
    }

    /// Hands the resource back to its pool, or disposes it if the pool is shut down.
    pub fn release(self) {
        // Drop does the work.
    }
}

impl<T: Dispose> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.resource
            .as_ref()
            .expect("lease holds its resource until dropped")
    }
}

impl<T: Dispose> DerefMut for Lease<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.resource
            .as_mut()
            .expect("lease holds its resource until dropped")
    }
}

impl<T: Dispose> Drop for Lease<T> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.pool.give_back(resource);
        }
    }
}

impl<T: Dispose + fmt::Debug> fmt::Debug for Lease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Lease").field(&self.resource).finish()
    }
}
