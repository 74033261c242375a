//! GC heap: collection policy over a [`GraphPool`].
//!
//! The heap counts allocations and runs a collection once the count passes
//! the configured cadence. Collection only ever happens at an allocation
//! entry point (or an explicit [`GcHeap::collect`]), so callers know exactly
//! where an unrooted address may be invalidated: anything they need to keep
//! across an allocation must be held as a [`Root`] or [`Gc`].

use std::ops::{Deref, DerefMut};

use crate::handle::{Gc, Root};
use crate::pool::{CollectStats, GraphPool};
use crate::{GraphError, Node};

/// Collection cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GcConfig {
    /// Collect once more than this many allocations happened since the last
    /// collection.
    pub collect_every: usize,
}

impl GcConfig {
    /// Default cadence.
    pub const DEFAULT_COLLECT_EVERY: usize = 10_000;

    /// Set the cadence.
    #[must_use]
    pub fn with_collect_every(mut self, collect_every: usize) -> Self {
        self.collect_every = collect_every;
        self
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            collect_every: Self::DEFAULT_COLLECT_EVERY,
        }
    }
}

/// Running totals for one heap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcStats {
    pub allocations: u64,
    pub collections: u64,
    pub swept: u64,
    /// Survivors of the most recent collection.
    pub last_retained: usize,
}

/// Graph pool plus allocation-triggered collection.
///
/// Derefs to [`GraphPool`] for reads, updates, links and roots.
#[derive(Debug)]
pub struct GcHeap {
    pool: GraphPool,
    since_collect: usize,
    config: GcConfig,
    stats: GcStats,
}

impl GcHeap {
    /// Create a heap with the default cadence.
    pub fn new() -> Self {
        Self::with_config(GcConfig::default())
    }

    /// Create a heap with an explicit cadence.
    pub fn with_config(config: GcConfig) -> Self {
        GcHeap {
            pool: GraphPool::new(),
            since_collect: 0,
            config,
            stats: GcStats::default(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> GcConfig {
        self.config
    }

    /// Running totals.
    pub fn stats(&self) -> GcStats {
        self.stats
    }

    fn before_allocation(&mut self) -> Result<(), GraphError> {
        if self.since_collect > self.config.collect_every {
            self.collect()?;
        }
        self.since_collect += 1;
        self.stats.allocations += 1;
        Ok(())
    }

    /// Allocate a node for incremental construction.
    ///
    /// May collect first. The returned handle roots the node until it is
    /// frozen or dropped.
    pub fn allocate_mutable<T: Node>(&mut self, node: T) -> Result<Gc<T>, GraphError> {
        self.before_allocation()?;
        Ok(self.pool.allocate(node))
    }

    /// Allocate a finished node and publish it read-only.
    ///
    /// Same address as the mutable allocation; freezing does not copy.
    pub fn allocate_and_freeze<T: Node>(&mut self, node: T) -> Result<Root<T>, GraphError> {
        Ok(self.allocate_mutable(node)?.freeze())
    }

    /// Allocate an empty node to be filled in through `update`.
    pub fn allocate_blank<T: Node + Default>(&mut self) -> Result<Gc<T>, GraphError> {
        self.allocate_mutable(T::default())
    }

    /// Collect now and reset the cadence counter.
    pub fn collect(&mut self) -> Result<CollectStats, GraphError> {
        let stats = self.pool.collect()?;
        self.since_collect = 0;
        self.stats.collections += 1;
        self.stats.swept += stats.swept as u64;
        self.stats.last_retained = stats.retained;
        Ok(stats)
    }
}

impl Default for GcHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for GcHeap {
    type Target = GraphPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

impl DerefMut for GcHeap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.pool
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
