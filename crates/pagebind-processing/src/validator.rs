//! Batch-level request validation
//!
//! Batch limits are fail-fast: a breach rejects the whole job before any item
//! is ingested. The per-item size ceiling is deliberately not checked here; the
//! ingester re-checks it and skips the offending item instead.

use pagebind_core::{AppError, BatchSummary, ResourceLimits};

/// Validator for the declared shape of a conversion batch.
#[derive(Debug, Clone, Copy)]
pub struct RequestValidator {
    limits: ResourceLimits,
}

impl RequestValidator {
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Validate item count upper bound.
    ///
    /// Usable while the batch is still being received, so the reader can stop
    /// as soon as one part too many arrives.
    pub fn check_item_count(&self, count: usize) -> Result<(), AppError> {
        if count > self.limits.max_item_count {
            return Err(AppError::TooManyImages {
                count,
                max: self.limits.max_item_count,
            });
        }
        Ok(())
    }

    /// Validate the running sum of declared sizes.
    pub fn check_total_size(&self, total: u64) -> Result<(), AppError> {
        if total > self.limits.max_total_size_bytes {
            return Err(AppError::TotalSizeExceeded {
                total,
                max: self.limits.max_total_size_bytes,
            });
        }
        Ok(())
    }

    /// Validate a complete batch. Order of checks: empty, count, total size.
    pub fn validate(&self, batch: &BatchSummary) -> Result<(), AppError> {
        if batch.item_count == 0 {
            return Err(AppError::NoImages);
        }
        self.check_item_count(batch.item_count)?;
        self.check_total_size(batch.declared_total)?;

        tracing::debug!(
            item_count = batch.item_count,
            declared_total = batch.declared_total,
            "Batch passed validation"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> RequestValidator {
        RequestValidator::new(ResourceLimits {
            max_item_count: 3,
            max_item_size_bytes: 1024,
            max_total_size_bytes: 2048,
            memory_watermark_bytes: 1024 * 1024,
        })
    }

    fn batch(item_count: usize, declared_total: u64) -> BatchSummary {
        BatchSummary {
            item_count,
            declared_total,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(test_validator().validate(&batch(3, 2048)).is_ok());
    }

    #[test]
    fn test_validate_empty_batch() {
        assert!(matches!(
            test_validator().validate(&batch(0, 0)),
            Err(AppError::NoImages)
        ));
    }

    #[test]
    fn test_validate_too_many_images() {
        assert!(matches!(
            test_validator().validate(&batch(4, 10)),
            Err(AppError::TooManyImages { count: 4, max: 3 })
        ));
    }

    #[test]
    fn test_validate_total_size_exceeded() {
        assert!(matches!(
            test_validator().validate(&batch(2, 2049)),
            Err(AppError::TotalSizeExceeded {
                total: 2049,
                max: 2048
            })
        ));
    }

    #[test]
    fn test_count_checked_before_size() {
        assert!(matches!(
            test_validator().validate(&batch(10, 1 << 30)),
            Err(AppError::TooManyImages { .. })
        ));
    }

    #[test]
    fn test_oversized_single_item_is_not_a_batch_error() {
        // 1500 > max_item_size_bytes but within the total; the ingester skips it later.
        assert!(test_validator().validate(&batch(1, 1500)).is_ok());
    }

    #[test]
    fn test_incremental_checks() {
        let validator = test_validator();
        assert!(validator.check_item_count(3).is_ok());
        assert!(validator.check_item_count(4).is_err());
        assert!(validator.check_total_size(2048).is_ok());
        assert!(validator.check_total_size(2049).is_err());
    }
}
