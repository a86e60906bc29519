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

use burnrate_data::{Dispose, Pool};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

// --- TRACKED RESOURCE FOR THESE TESTS ---
#[derive(Debug)]
struct Buffer {
    id: usize,
    disposed_ids: Arc<Mutex<Vec<usize>>>,
}

impl Dispose for Buffer {
    fn dispose(self) {
        self.disposed_ids.lock().unwrap().push(self.id);
    }
}

fn tracked_pool(preallocate: usize) -> (Pool<Buffer>, Arc<Mutex<Vec<usize>>>) {
    let next_id = Arc::new(AtomicUsize::new(0));
    let disposed_ids = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&disposed_ids);
    let pool = Pool::new(
        move || Buffer {
            id: next_id.fetch_add(1, Ordering::SeqCst),
            disposed_ids: Arc::clone(&sink),
        },
        preallocate,
    );
    (pool, disposed_ids)
}

#[test]
fn test_release_then_acquire_reuses_the_same_instance() {
    let (pool, _) = tracked_pool(2);

    let lease = pool.acquire();
    let first_id = lease.id;
    lease.release();

    let again = pool.acquire();
    assert_eq!(again.id, first_id, "LIFO reuse should hand back the same buffer");
    assert_eq!(pool.created(), 2, "No buffer should have been built on reuse");
}

#[test]
fn test_outstanding_leases_beyond_preallocation_grow_the_pool() {
    let (pool, _) = tracked_pool(2);

    let leases: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
    let ids: HashSet<usize> = leases.iter().map(|lease| lease.id).collect();

    assert_eq!(ids.len(), 5, "Every outstanding lease must hold a distinct buffer");
    assert_eq!(pool.created(), 5);
    assert_eq!(pool.available(), 0);

    drop(leases);
    assert_eq!(pool.available(), 5, "Dropping leases returns buffers to the pool");
}

#[test]
fn test_dispose_disposes_cached_but_not_leased() {
    let (pool, disposed) = tracked_pool(3);

    let held = pool.acquire();
    let held_id = held.id;
    pool.dispose();

    {
        let disposed = disposed.lock().unwrap();
        assert_eq!(disposed.len(), 2, "Only the two cached buffers are disposed");
        assert!(!disposed.contains(&held_id));
    }

    // Released after shutdown: disposed directly, never cached.
    held.release();
    assert!(disposed.lock().unwrap().contains(&held_id));
    assert_eq!(pool.available(), 0);
}

#[test]
fn test_acquire_after_dispose_builds_fresh_buffers() {
    let (pool, disposed) = tracked_pool(1);
    let old_id = pool.acquire().id; // released straight back into the cache
    pool.dispose();

    let fresh = pool.acquire();
    assert_ne!(fresh.id, old_id, "A disposed buffer must never be handed out again");
    assert_eq!(pool.created(), 2);

    let fresh_id = fresh.id;
    drop(fresh);
    assert_eq!(pool.available(), 0, "A disposed pool caches nothing");
    assert_eq!(*disposed.lock().unwrap(), vec![old_id, fresh_id]);
}

#[test]
fn test_concurrent_acquire_release_keeps_every_buffer() {
    let (pool, disposed) = tracked_pool(4);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let a = pool.acquire();
                    let b = pool.acquire();
                    assert_ne!(a.id, b.id);
                    drop(a);
                    b.release();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    // Every buffer ever built is back in the cache exactly once.
    assert_eq!(pool.available(), pool.created());
    pool.dispose();
    let disposed = disposed.lock().unwrap();
    let unique: HashSet<_> = disposed.iter().copied().collect();
    assert_eq!(unique.len(), disposed.len(), "No buffer may be disposed twice");
    assert_eq!(disposed.len(), pool.created());
}

#[test]
fn test_dispose_during_concurrent_churn_disposes_every_buffer_once() {
    const THREADS: usize = 8;
    let (pool, disposed) = tracked_pool(4);
    let halfway = Arc::new(Barrier::new(THREADS + 1));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = pool.clone();
            let halfway = Arc::clone(&halfway);
            thread::spawn(move || {
                for _ in 0..200 {
                    pool.acquire().release();
                }
                // Held across the dispose, released after it.
                let held = pool.acquire();
                halfway.wait();
                for _ in 0..200 {
                    let a = pool.acquire();
                    let b = pool.acquire();
                    assert_ne!(a.id, b.id);
                    drop(a);
                    b.release();
                }
                drop(held);
            })
        })
        .collect();

    halfway.wait();
    pool.dispose();
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    assert!(pool.is_disposed());
    assert_eq!(pool.available(), 0, "A disposed pool caches nothing");

    let disposed = disposed.lock().unwrap();
    let unique: HashSet<_> = disposed.iter().copied().collect();
    assert_eq!(unique.len(), disposed.len(), "No buffer may be disposed twice");
    assert_eq!(disposed.len(), pool.created(), "Every buffer ever built is disposed");
}
