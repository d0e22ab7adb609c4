use crate::control_transfer::ControlTransfer;
use crate::error::{TransferError, TransferResult, ALREADY_CLOSED};
use crate::test_utils::FakeDevice;
use std::sync::Arc;

#[cfg(target_os = "linux")]
use crate::os::linux::enumerate::UsbDevice;
#[cfg(target_os = "linux")]
use crate::os::linux::usbfs::UsbFs;
#[cfg(target_os = "macos")]
use crate::os::macos::device::IoKitDevice;
#[cfg(target_os = "windows")]
use crate::os::windows::winusb::WinUsbDevice;

/// Which native backend a handle belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformTag {
    Linux,
    MacOs,
    Windows,
}

/// Backend-specific payload. Each variant carries a resource with its own
/// lifetime and threading rules, so this stays a tagged union rather than
/// a trait object.
enum Backend {
    #[cfg(target_os = "linux")]
    Linux(UsbFs),
    #[cfg(target_os = "macos")]
    MacOs(IoKitDevice),
    #[cfg(target_os = "windows")]
    Windows(WinUsbDevice),
    Fake(Arc<FakeDevice>),
}

/// An open, claimed USB interface.
///
/// Exclusively owned by whoever opened it; [`crate::send_control`] only
/// borrows it for the duration of one call. One handle must not carry two
/// in-flight transfers at a time; callers running transfers on the same
/// handle from several threads must serialize them.
pub struct DeviceHandle {
    tag: PlatformTag,
    backend: Backend,
    closed: bool,
}

impl DeviceHandle {
    pub fn platform_tag(&self) -> PlatformTag {
        self.tag
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the native resource. Must be called exactly once; a second
    /// call fails with `Platform(ALREADY_CLOSED)` without touching the
    /// native layer again. A handle dropped without `close()` releases
    /// its resource in `Drop` instead.
    pub fn close(&mut self) -> Result<(), TransferError> {
        if self.closed {
            return Err(TransferError::Platform(ALREADY_CLOSED));
        }
        self.closed = true;
        match &mut self.backend {
            #[cfg(target_os = "linux")]
            Backend::Linux(usb) => usb.release_interfaces(),
            #[cfg(target_os = "macos")]
            Backend::MacOs(dev) => dev.close(),
            #[cfg(target_os = "windows")]
            Backend::Windows(dev) => dev.close(),
            Backend::Fake(fake) => {
                fake.release();
                Ok(())
            }
        }
    }

    pub(crate) fn dispatch(&self, xfer: &ControlTransfer) -> Result<TransferResult, TransferError> {
        match &self.backend {
            #[cfg(target_os = "linux")]
            Backend::Linux(usb) if self.tag == PlatformTag::Linux => usb.send_control(xfer),
            #[cfg(target_os = "macos")]
            Backend::MacOs(dev) if self.tag == PlatformTag::MacOs => dev.send_control(xfer),
            #[cfg(target_os = "windows")]
            Backend::Windows(dev) if self.tag == PlatformTag::Windows => dev.send_control(xfer),
            Backend::Fake(fake) if self.tag == fake.tag() => fake.send_control(xfer),
            _ => Err(TransferError::InvalidParameter(
                "handle platform tag does not match its backend".into(),
            )),
        }
    }

    /// Open `/dev/bus/usb/BBB/DDD` for an enumerated device and claim the
    /// given interface, detaching a bound kernel driver first.
    #[cfg(target_os = "linux")]
    pub fn open_linux(device: &UsbDevice, interface: u32) -> Result<Self, TransferError> {
        let mut usb = UsbFs::open(device.bus_num, device.dev_num)?;
        usb.claim_interface(interface)?;
        Ok(DeviceHandle {
            tag: PlatformTag::Linux,
            backend: Backend::Linux(usb),
            closed: false,
        })
    }

    /// Find the first device matching vendor/product id, resolve its
    /// device-interface table through the plugin lookup and open it.
    #[cfg(target_os = "macos")]
    pub fn open_macos(vendor_id: u16, product_id: u16) -> Result<Self, TransferError> {
        let dev = IoKitDevice::open(vendor_id, product_id)?;
        Ok(DeviceHandle {
            tag: PlatformTag::MacOs,
            backend: Backend::MacOs(dev),
            closed: false,
        })
    }

    /// Adopt a device-interface table resolved elsewhere.
    ///
    /// # Safety
    /// `interface` must be a live IOUSBDeviceInterface table pointer whose
    /// device is open, and ownership transfers to the handle.
    #[cfg(target_os = "macos")]
    pub unsafe fn from_device_interface(
        interface: *mut *mut crate::os::macos::iokit::IOUSBDeviceInterface,
    ) -> Self {
        DeviceHandle {
            tag: PlatformTag::MacOs,
            backend: Backend::MacOs(IoKitDevice::from_raw(interface)),
            closed: false,
        }
    }

    /// Adopt an externally initialized WinUSB interface handle. Opening
    /// and claiming the interface (SetupDi + CreateFile +
    /// WinUsb_Initialize) stays with the caller.
    ///
    /// # Safety
    /// `raw` must be a valid WINUSB_INTERFACE_HANDLE. When `owned` is
    /// true the handle is freed on close/drop.
    #[cfg(target_os = "windows")]
    pub unsafe fn from_winusb_handle(
        raw: windows_sys::Win32::Devices::Usb::WINUSB_INTERFACE_HANDLE,
        owned: bool,
    ) -> Self {
        DeviceHandle {
            tag: PlatformTag::Windows,
            backend: Backend::Windows(WinUsbDevice::from_raw(raw, owned)),
            closed: false,
        }
    }

    /// A handle backed by a scripted fake, tagged with the fake's own
    /// platform tag. See [`crate::test_utils`].
    pub fn fake(fake: Arc<FakeDevice>) -> Self {
        DeviceHandle {
            tag: fake.tag(),
            backend: Backend::Fake(fake),
            closed: false,
        }
    }

    /// A fake-backed handle whose tag disagrees with its payload, for
    /// exercising the dispatcher's provenance check.
    pub fn fake_mismatched(tag: PlatformTag, fake: Arc<FakeDevice>) -> Self {
        DeviceHandle {
            tag,
            backend: Backend::Fake(fake),
            closed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_guarded_against_double_release() {
        let fake = FakeDevice::new(PlatformTag::Linux);
        let mut handle = DeviceHandle::fake(fake.clone());

        assert!(handle.close().is_ok());
        assert_eq!(fake.releases(), 1);

        match handle.close() {
            Err(TransferError::Platform(code)) => assert_eq!(code, ALREADY_CLOSED),
            other => panic!("expected Platform(ALREADY_CLOSED), got {:?}", other),
        }
        // the native release ran at most once
        assert_eq!(fake.releases(), 1);
    }

    #[test]
    fn platform_tag_reflects_backend() {
        let handle = DeviceHandle::fake(FakeDevice::new(PlatformTag::Windows));
        assert_eq!(handle.platform_tag(), PlatformTag::Windows);
        assert!(!handle.is_closed());
    }
}
