use crate::control_transfer::ControlTransfer;
use crate::error::{TransferError, TransferResult};
use crate::handle::DeviceHandle;

/// Route one control transfer to the backend the handle belongs to.
///
/// The descriptor is validated first; an invalid one is rejected without
/// touching the native layer. A closed handle is reported as `NoDevice`,
/// a handle whose tag disagrees with its payload as `InvalidParameter`
/// (programmer error, unreachable with handles this crate constructed).
///
/// Blocking, up to the descriptor's timeout. No retries happen here;
/// retry and backoff policy belongs to the caller, which knows the device
/// class. Concurrent calls on distinct handles are fine; a single handle
/// must not carry two in-flight transfers.
pub fn send_control(
    handle: &DeviceHandle,
    xfer: &ControlTransfer,
) -> Result<TransferResult, TransferError> {
    xfer.validate()?;
    if handle.is_closed() {
        return Err(TransferError::NoDevice);
    }
    handle.dispatch(xfer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_transfer::{Direction, Recipient, RequestType};
    use crate::error::TransferStatus;
    use crate::handle::PlatformTag;
    use crate::test_utils::{FakeDevice, FakeOutcome};
    use std::thread;
    use std::time::Duration;

    fn vendor_write(data: Vec<u8>) -> ControlTransfer {
        ControlTransfer::new_write(
            RequestType::Vendor,
            Recipient::Device,
            0x01,
            0x0000,
            0x0000,
            data,
            Duration::from_millis(1000),
        )
    }

    #[test]
    fn invalid_descriptor_never_reaches_the_backend() {
        let fake = FakeDevice::new(PlatformTag::Linux);
        let handle = DeviceHandle::fake(fake.clone());
        let xfer = vendor_write(vec![0u8; 65536]);

        match send_control(&handle, &xfer) {
            Err(TransferError::InvalidParameter(_)) => {}
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
        assert_eq!(fake.calls(), 0);
    }

    #[test]
    fn routes_only_to_the_matching_backend() {
        let linux = FakeDevice::new(PlatformTag::Linux);
        let macos = FakeDevice::new(PlatformTag::MacOs);
        let linux_handle = DeviceHandle::fake(linux.clone());
        let _macos_handle = DeviceHandle::fake(macos.clone());

        send_control(&linux_handle, &vendor_write(vec![0xAA])).unwrap();

        assert_eq!(linux.calls(), 1);
        assert_eq!(macos.calls(), 0);
    }

    #[test]
    fn tag_mismatch_is_a_programmer_error() {
        let fake = FakeDevice::new(PlatformTag::Windows);
        let handle = DeviceHandle::fake_mismatched(PlatformTag::Linux, fake.clone());

        match send_control(&handle, &vendor_write(vec![0xAA])) {
            Err(TransferError::InvalidParameter(_)) => {}
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
        assert_eq!(fake.calls(), 0);
    }

    #[test]
    fn closed_handle_is_stale() {
        let fake = FakeDevice::new(PlatformTag::Linux);
        let mut handle = DeviceHandle::fake(fake.clone());
        handle.close().unwrap();

        assert_eq!(
            send_control(&handle, &vendor_write(vec![0xAA])),
            Err(TransferError::NoDevice)
        );
        assert_eq!(fake.calls(), 0);
    }

    #[test]
    fn read_round_trip_reports_expected_length() {
        let fake = FakeDevice::new(PlatformTag::MacOs);
        let handle = DeviceHandle::fake(fake);
        let xfer = ControlTransfer::new_read(
            RequestType::Vendor,
            Recipient::Device,
            0x10,
            0,
            0,
            24,
            Duration::from_millis(500),
        );

        let res = send_control(&handle, &xfer).unwrap();
        assert_eq!(res.bytes_transferred, 24);
        assert_eq!(res.status, TransferStatus::Success);
        assert_eq!(res.data.len(), 24);
    }

    #[test]
    fn timeout_is_a_normal_result_value() {
        let fake = FakeDevice::new(PlatformTag::Linux);
        fake.push_outcome(FakeOutcome::Fail(TransferError::Timeout));
        let handle = DeviceHandle::fake(fake);

        let err = send_control(&handle, &vendor_write(vec![0xAA])).unwrap_err();
        assert_eq!(err, TransferError::Timeout);
        assert!(err.is_transient());
    }

    #[test]
    fn distinct_handles_do_not_cross_contaminate() {
        let fake_a = FakeDevice::new(PlatformTag::Linux);
        let fake_b = FakeDevice::new(PlatformTag::Linux);
        fake_b.push_outcome(FakeOutcome::Fail(TransferError::Stall));
        let handle_a = DeviceHandle::fake(fake_a.clone());
        let handle_b = DeviceHandle::fake(fake_b.clone());

        let t_a = thread::spawn(move || send_control(&handle_a, &vendor_write(vec![0u8; 4])));
        let t_b = thread::spawn(move || send_control(&handle_b, &vendor_write(vec![0u8; 9])));

        let res_a = t_a.join().unwrap().unwrap();
        let res_b = t_b.join().unwrap();

        assert_eq!(res_a.bytes_transferred, 4);
        assert_eq!(res_b, Err(TransferError::Stall));
        assert_eq!(fake_a.calls(), 1);
        assert_eq!(fake_b.calls(), 1);
    }

    #[test]
    fn vendor_write_scenario() {
        let fake = FakeDevice::new(PlatformTag::Linux);
        let handle = DeviceHandle::fake(fake.clone());
        let xfer = vendor_write(vec![0xAA, 0xBB]);

        let res = send_control(&handle, &xfer).unwrap();
        assert_eq!(res.status, TransferStatus::Success);
        assert_eq!(res.bytes_transferred, 2);
        assert_eq!(fake.calls(), 1);

        let seen = fake.last_transfer().unwrap();
        assert_eq!(seen.direction, Direction::HostToDevice);
        assert_eq!(seen.request_type, RequestType::Vendor);
        assert_eq!(seen.recipient, Recipient::Device);
        assert_eq!(seen.request, 0x01);
        assert_eq!(seen.value, 0x0000);
        assert_eq!(seen.index, 0x0000);
        assert_eq!(seen.data, vec![0xAA, 0xBB]);
        assert_eq!(seen.timeout, Duration::from_millis(1000));
    }
}
