use thiserror::Error;

/// Synthetic code reported as `TransferError::Platform` when a handle is
/// closed a second time. Real native codes are nonnegative on every
/// supported platform.
pub const ALREADY_CLOSED: i32 = -1;

/// Cross-platform completion status of a control transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferStatus {
    Success,
    Stall,
    Timeout,
    NoDevice,
    AccessDenied,
    InvalidParameter,
    Platform(i32),
}

/// Outcome of a completed control transfer.
///
/// `data` holds the bytes read by a device-to-host transfer and is empty
/// for host-to-device transfers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferResult {
    pub bytes_transferred: usize,
    pub status: TransferStatus,
    pub data: Vec<u8>,
}

impl TransferResult {
    pub(crate) fn success(bytes_transferred: usize, data: Vec<u8>) -> Self {
        TransferResult {
            bytes_transferred,
            status: TransferStatus::Success,
            data,
        }
    }
}

/// Everything that can go wrong with a transfer, one variant per taxonomy
/// entry. Adapters map every native failure to exactly one of these and
/// never log in the mapping path; interpreting `Platform` codes is left to
/// the caller.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("endpoint stalled")]
    Stall,
    #[error("transfer timed out")]
    Timeout,
    #[error("device gone or handle stale")]
    NoDevice,
    #[error("access denied")]
    AccessDenied,
    #[error("platform error (code {0})")]
    Platform(i32),
}

impl TransferError {
    /// The status this error maps onto.
    pub fn status(&self) -> TransferStatus {
        match self {
            TransferError::InvalidParameter(_) => TransferStatus::InvalidParameter,
            TransferError::Stall => TransferStatus::Stall,
            TransferError::Timeout => TransferStatus::Timeout,
            TransferError::NoDevice => TransferStatus::NoDevice,
            TransferError::AccessDenied => TransferStatus::AccessDenied,
            TransferError::Platform(code) => TransferStatus::Platform(*code),
        }
    }

    /// Whether a retry can reasonably succeed without external remediation.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransferError::Stall | TransferError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(TransferError::Timeout.is_transient());
        assert!(TransferError::Stall.is_transient());
        assert!(!TransferError::NoDevice.is_transient());
        assert!(!TransferError::AccessDenied.is_transient());
        assert!(!TransferError::InvalidParameter("x".into()).is_transient());
        assert!(!TransferError::Platform(5).is_transient());
    }

    #[test]
    fn error_to_status() {
        assert_eq!(TransferError::Timeout.status(), TransferStatus::Timeout);
        assert_eq!(
            TransferError::Platform(42).status(),
            TransferStatus::Platform(42)
        );
        assert_eq!(
            TransferError::InvalidParameter("bad".into()).status(),
            TransferStatus::InvalidParameter
        );
    }

    #[test]
    fn display_carries_detail() {
        let e = TransferError::InvalidParameter("payload too long".into());
        assert!(e.to_string().contains("payload too long"));
        assert!(TransferError::Platform(-1).to_string().contains("-1"));
    }
}
