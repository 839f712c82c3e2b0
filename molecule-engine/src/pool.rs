// Copyright 2025 John Brosnihan
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
//! Buffer pooling for per-step force passes
//!
//! Every force pass packs the atoms of all molecules into a submission
//! buffer and receives one force per atom back. The midpoint integrator runs
//! two passes per step, so both buffers are recycled through a [`VecPool`]
//! instead of being reallocated each time.

use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Configuration for buffer pool behavior
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Initial capacity for each buffer in the pool
    pub initial_capacity: usize,
    /// Maximum number of buffers to keep in the pool
    pub max_pool_size: usize,
    /// Growth factor when a buffer must be enlarged (e.g., 2.0 for doubling)
    pub growth_factor: f64,
    /// Whether to log when the pool allocates or grows a buffer
    pub log_resize_events: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            initial_capacity: 256,
            max_pool_size: 4,
            growth_factor: 2.0,
            log_resize_events: false,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with custom settings
    pub fn new(initial_capacity: usize, max_pool_size: usize) -> Self {
        PoolConfig {
            initial_capacity,
            max_pool_size,
            ..Self::default()
        }
    }

    /// Enable logging for resize events
    pub fn with_logging(mut self) -> Self {
        self.log_resize_events = true;
        self
    }

    /// Set the growth factor for buffer capacity expansion
    ///
    /// # Panics
    ///
    /// Panics if `factor` is below 1.0.
    pub fn with_growth_factor(mut self, factor: f64) -> Self {
        assert!(factor >= 1.0, "Growth factor must be >= 1.0");
        self.growth_factor = factor;
        self
    }
}

/// Statistics for monitoring pool performance
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of times a buffer was reused from the pool
    pub hits: usize,
    /// Number of times a new buffer had to be allocated
    pub misses: usize,
    /// Number of times a pooled buffer had to grow
    pub resize_count: usize,
    /// Current number of idle buffers in the pool
    pub pool_size: usize,
    /// Peak number of idle buffers
    pub peak_size: usize,
}

impl PoolStats {
    /// Calculate the hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

// A poisoned lock only means another thread panicked while holding a plain
// Vec; the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A thread-safe pool of `Vec<T>` buffers
pub struct VecPool<T> {
    pool: Arc<Mutex<Vec<Vec<T>>>>,
    config: PoolConfig,
    stats: Arc<Mutex<PoolStats>>,
}

impl<T> VecPool<T> {
    /// Create a new pool with default configuration
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create a new pool with custom configuration
    pub fn with_config(config: PoolConfig) -> Self {
        VecPool {
            pool: Arc::new(Mutex::new(Vec::new())),
            config,
            stats: Arc::new(Mutex::new(PoolStats::default())),
        }
    }

    /// Acquire an empty buffer with room for at least `len` elements
    ///
    /// The buffer returns to the pool when the guard is dropped.
    pub fn acquire(&self, len: usize) -> VecGuard<T> {
        // Pool lock is released before the stats lock is taken
        let (mut buffer, was_hit, pool_len) = {
            let mut pool = lock(&self.pool);
            let was_hit = !pool.is_empty();
            let buffer = match pool.pop() {
                Some(mut b) => {
                    b.clear();
                    b
                }
                None => Vec::with_capacity(self.config.initial_capacity.max(len)),
            };
            (buffer, was_hit, pool.len())
        };

        let grew = buffer.capacity() < len;
        if grew {
            let target = ((buffer.capacity() as f64) * self.config.growth_factor).ceil() as usize;
            buffer.reserve_exact(target.max(len));
        }

        {
            let mut stats = lock(&self.stats);
            if was_hit {
                stats.hits += 1;
            } else {
                stats.misses += 1;
                if self.config.log_resize_events {
                    debug!("VecPool: allocating new buffer (hit rate: {:.1}%)", stats.hit_rate());
                }
            }
            if grew && was_hit {
                stats.resize_count += 1;
                if self.config.log_resize_events {
                    debug!("VecPool: grew pooled buffer to {} elements", buffer.capacity());
                }
            }
            stats.pool_size = pool_len;
        }

        VecGuard {
            buffer,
            pool: Arc::clone(&self.pool),
            stats: Arc::clone(&self.stats),
            max_pool_size: self.config.max_pool_size,
        }
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        lock(&self.stats).clone()
    }

    /// Drop all idle buffers
    pub fn clear(&self) {
        lock(&self.pool).clear();
        lock(&self.stats).pool_size = 0;
    }

    /// Number of idle buffers
    pub fn len(&self) -> usize {
        lock(&self.pool).len()
    }

    /// Check if no idle buffer is available
    pub fn is_empty(&self) -> bool {
        lock(&self.pool).is_empty()
    }
}

impl<T: Clone> VecPool<T> {
    /// Acquire a buffer holding `len` copies of `value`
    pub fn acquire_filled(&self, len: usize, value: T) -> VecGuard<T> {
        let mut guard = self.acquire(len);
        guard.resize(len, value);
        guard
    }
}

impl<T> Default for VecPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for VecPool<T> {
    fn clone(&self) -> Self {
        VecPool {
            pool: Arc::clone(&self.pool),
            config: self.config.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<T> std::fmt::Debug for VecPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VecPool")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// RAII guard for a pooled buffer
pub struct VecGuard<T> {
    buffer: Vec<T>,
    pool: Arc<Mutex<Vec<Vec<T>>>>,
    stats: Arc<Mutex<PoolStats>>,
    max_pool_size: usize,
}

impl<T> std::ops::Deref for VecGuard<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl<T> std::ops::DerefMut for VecGuard<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl<T> Drop for VecGuard<T> {
    fn drop(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        let mut pool = lock(&self.pool);
        if pool.len() < self.max_pool_size {
            pool.push(buffer);

            let mut stats = lock(&self.stats);
            stats.pool_size = pool.len();
            if stats.pool_size > stats.peak_size {
                stats.peak_size = stats.pool_size;
            }
        }
        // A full pool simply frees the buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.initial_capacity, 256);
        assert_eq!(config.max_pool_size, 4);
        assert_eq!(config.growth_factor, 2.0);
        assert!(!config.log_resize_events);
    }

    #[test]
    #[should_panic(expected = "Growth factor must be >= 1.0")]
    fn test_invalid_growth_factor() {
        PoolConfig::default().with_growth_factor(0.5);
    }

    #[test]
    fn test_acquire_and_return() {
        let pool: VecPool<f64> = VecPool::new();
        {
            let mut guard = pool.acquire(8);
            guard.push(1.0);
            assert_eq!(guard.len(), 1);
        }
        assert_eq!(pool.len(), 1);

        let stats = pool.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_reused_buffer_is_cleared() {
        let pool: VecPool<u32> = VecPool::new();
        {
            let mut guard = pool.acquire(4);
            guard.extend([1, 2, 3]);
        }
        {
            let guard = pool.acquire(4);
            assert!(guard.is_empty());
        }
        let stats = pool.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[test]
    fn test_acquire_filled() {
        let pool: VecPool<i32> = VecPool::new();
        let guard = pool.acquire_filled(3, 7);
        assert_eq!(&guard[..], &[7, 7, 7]);
    }

    #[test]
    fn test_pooled_buffer_grows() {
        let pool: VecPool<u8> = VecPool::with_config(PoolConfig::new(4, 2));
        drop(pool.acquire(4));
        let guard = pool.acquire(100);
        assert!(guard.capacity() >= 100);
        assert_eq!(pool.stats().resize_count, 1);
    }

    #[test]
    fn test_max_pool_size() {
        let pool: VecPool<u8> = VecPool::with_config(PoolConfig::new(4, 2));
        {
            let _g1 = pool.acquire(1);
            let _g2 = pool.acquire(1);
            let _g3 = pool.acquire(1);
        }
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.stats().peak_size, 2);
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let pool: VecPool<usize> = VecPool::new();
        let pool_clone = pool.clone();

        let handle = thread::spawn(move || {
            let mut guard = pool_clone.acquire(1);
            guard.push(1);
        });

        let mut guard = pool.acquire(1);
        guard.push(2);
        handle.join().unwrap();
        drop(guard);

        assert_eq!(pool.stats().hits + pool.stats().misses, 2);
    }

    #[test]
    fn test_clear() {
        let pool: VecPool<u8> = VecPool::new();
        {
            let _g1 = pool.acquire(1);
            let _g2 = pool.acquire(1);
        }
        assert_eq!(pool.len(), 2);
        pool.clear();
        assert!(pool.is_empty());
    }
}
