use crate::decoder::DecodeError;
use crate::encoder::EncodeError;

/// Failure confined to one item of a batch.
///
/// These never reach the client: the pipeline logs them, records the item as
/// skipped and moves on to the next one.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("Item too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Item exceeded its declared size of {declared} bytes")]
    Overrun { declared: u64 },

    #[error("Failed to read item payload: {0}")]
    Stream(#[from] std::io::Error),

    #[error("Unsupported content type: {0}")]
    Unsupported(String),

    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Embedding failed: {0}")]
    Encode(#[from] EncodeError),
}

impl ItemError {
    /// Short machine-readable reason, used in job reports and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            ItemError::TooLarge { .. } => "too_large",
            ItemError::Overrun { .. } => "overrun",
            ItemError::Stream(_) => "stream",
            ItemError::Unsupported(_) => "unsupported",
            ItemError::Decode(_) => "decode",
            ItemError::Encode(_) => "encode",
        }
    }

    /// Whether the failure is an expected rejection rather than a fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ItemError::TooLarge { .. } | ItemError::Overrun { .. } | ItemError::Unsupported(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes() {
        assert_eq!(ItemError::TooLarge { size: 2, max: 1 }.reason(), "too_large");
        assert_eq!(ItemError::Overrun { declared: 1 }.reason(), "overrun");
        assert_eq!(ItemError::Unsupported("text/plain".into()).reason(), "unsupported");
    }

    #[test]
    fn test_rejections_vs_faults() {
        assert!(ItemError::Unsupported("image/gif".into()).is_rejection());
        assert!(!ItemError::Decode(DecodeError::Malformed("truncated".into())).is_rejection());
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert!(!ItemError::from(io).is_rejection());
    }

    #[test]
    fn test_display_messages() {
        let err = ItemError::TooLarge { size: 20, max: 10 };
        assert_eq!(err.to_string(), "Item too large: 20 bytes (max: 10 bytes)");
    }
}
