//! Advisory memory backpressure
//!
//! The governor samples process memory when the host can report it and emits a
//! warning plus a reclaim hint above 80% of the configured watermark. It never
//! fails a job: hard limits are enforced by the validator and the ingester.

use std::sync::Arc;

/// Source of process memory usage, in bytes.
pub trait HeapSampler: Send + Sync {
    /// Current usage, or `None` when the host does not expose it.
    fn sample(&self) -> Option<u64>;
}

/// Host hook asking the allocator or runtime to give memory back.
pub trait ReclaimHint: Send + Sync {
    /// Returns `true` if the hint was delivered. Delivery is not a guarantee
    /// that anything was reclaimed.
    fn request_reclaim(&self) -> bool;
}

/// Result of one governor check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPressure {
    /// No sampler, or the sampler could not read usage.
    Unavailable,
    Normal { usage_bytes: u64 },
    High { usage_bytes: u64, hinted: bool },
}

#[derive(Clone)]
pub struct MemoryGovernor {
    watermark_bytes: u64,
    sampler: Option<Arc<dyn HeapSampler>>,
    reclaim: Option<Arc<dyn ReclaimHint>>,
}

impl MemoryGovernor {
    pub fn new(watermark_bytes: u64) -> Self {
        Self {
            watermark_bytes,
            sampler: None,
            reclaim: None,
        }
    }

    /// Governor that never samples.
    pub fn inert() -> Self {
        Self::new(u64::MAX)
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn HeapSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn with_reclaim_hint(mut self, reclaim: Arc<dyn ReclaimHint>) -> Self {
        self.reclaim = Some(reclaim);
        self
    }

    /// Usage above this many bytes counts as high pressure.
    pub fn threshold_bytes(&self) -> u64 {
        self.watermark_bytes / 5 * 4 + self.watermark_bytes % 5 * 4 / 5
    }

    /// Resample usage and react to it.
    pub fn check(&self) -> MemoryPressure {
        let Some(usage_bytes) = self.sampler.as_ref().and_then(|s| s.sample()) else {
            return MemoryPressure::Unavailable;
        };

        if usage_bytes <= self.threshold_bytes() {
            tracing::trace!(usage_bytes, "Memory usage sampled");
            return MemoryPressure::Normal { usage_bytes };
        }

        tracing::warn!(
            usage_bytes,
            watermark_bytes = self.watermark_bytes,
            "Memory usage above 80% of watermark"
        );
        let hinted = self
            .reclaim
            .as_ref()
            .map(|r| r.request_reclaim())
            .unwrap_or(false);
        MemoryPressure::High {
            usage_bytes,
            hinted,
        }
    }
}

impl std::fmt::Debug for MemoryGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGovernor")
            .field("watermark_bytes", &self.watermark_bytes)
            .field("sampler", &self.sampler.is_some())
            .field("reclaim", &self.reclaim.is_some())
            .finish()
    }
}
