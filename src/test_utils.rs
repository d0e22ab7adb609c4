//! Scripted fake backend.
//!
//! Lets callers (and this crate's own tests) exercise transfer handling,
//! retry policies and close semantics without hardware. A [`FakeDevice`]
//! echoes by default; queue outcomes with [`FakeDevice::push_outcome`] to
//! script failures.

use crate::control_transfer::{ControlTransfer, Direction};
use crate::error::{TransferError, TransferResult};
use crate::handle::PlatformTag;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What the fake should do with the next transfer.
#[derive(Debug)]
pub enum FakeOutcome {
    /// Report success with `bytes_transferred` equal to the descriptor's
    /// wire length (zero-filled data for reads).
    Echo,
    /// Fail with the given error.
    Fail(TransferError),
}

/// Shared fake state. Handles hold it behind an `Arc`, so tests keep a
/// second reference for observing counters after handing it off.
pub struct FakeDevice {
    tag: PlatformTag,
    calls: AtomicUsize,
    releases: AtomicUsize,
    script: Mutex<VecDeque<FakeOutcome>>,
    last: Mutex<Option<ControlTransfer>>,
}

impl FakeDevice {
    pub fn new(tag: PlatformTag) -> Arc<Self> {
        Arc::new(FakeDevice {
            tag,
            calls: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
        })
    }

    pub fn tag(&self) -> PlatformTag {
        self.tag
    }

    /// Queue the outcome for the next transfer. Unqueued transfers echo.
    pub fn push_outcome(&self, outcome: FakeOutcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// How many transfers reached this fake.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// How many times the native release ran.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// The descriptor of the most recent transfer, if any.
    pub fn last_transfer(&self) -> Option<ControlTransfer> {
        self.last.lock().unwrap().clone()
    }

    pub(crate) fn send_control(
        &self,
        xfer: &ControlTransfer,
    ) -> Result<TransferResult, TransferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(xfer.clone());
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FakeOutcome::Echo);
        match outcome {
            FakeOutcome::Echo => {
                let n = xfer.wire_length() as usize;
                let data = match xfer.direction {
                    Direction::DeviceToHost => vec![0u8; n],
                    Direction::HostToDevice => Vec::new(),
                };
                Ok(TransferResult::success(n, data))
            }
            FakeOutcome::Fail(e) => Err(e),
        }
    }

    pub(crate) fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_transfer::{Recipient, RequestType};
    use std::time::Duration;

    #[test]
    fn echo_reports_wire_length() {
        let fake = FakeDevice::new(PlatformTag::Linux);
        let xfer = ControlTransfer::new_write(
            RequestType::Vendor,
            Recipient::Device,
            0x01,
            0,
            0,
            vec![1, 2, 3],
            Duration::from_millis(10),
        );
        let res = fake.send_control(&xfer).unwrap();
        assert_eq!(res.bytes_transferred, 3);
        assert!(res.data.is_empty());
        assert_eq!(fake.calls(), 1);
        assert_eq!(fake.last_transfer().unwrap().request, 0x01);
    }

    #[test]
    fn scripted_failure_is_returned_once() {
        let fake = FakeDevice::new(PlatformTag::Linux);
        fake.push_outcome(FakeOutcome::Fail(TransferError::Stall));
        let xfer = ControlTransfer::new_read(
            RequestType::Class,
            Recipient::Interface,
            0x01,
            0,
            0,
            8,
            Duration::from_millis(10),
        );
        assert_eq!(fake.send_control(&xfer), Err(TransferError::Stall));
        // queue drained, back to echoing
        assert!(fake.send_control(&xfer).is_ok());
    }
}
