use crate::control_transfer::{ControlTransfer, Direction};
use crate::error::{TransferError, TransferResult};
use log::debug;
use nix::errno::Errno;
use nix::{ioctl_read, ioctl_readwrite, ioctl_write_ptr, request_code_none};
use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::io;
use std::mem;
use std::os::unix::io::AsRawFd;
use std::ptr;

#[repr(C)]
pub(crate) struct UsbFsCtrlTransfer {
    request_type: u8,
    request: u8,
    value: u16,
    index: u16,
    length: u16,
    timeout: u32,
    data: *mut libc::c_void,
}

#[repr(C)]
pub(crate) struct UsbFsGetDriver {
    interface: i32,
    driver: [libc::c_char; 256],
}

#[repr(C)]
pub(crate) struct UsbFsIoctl {
    interface: i32,
    code: i32,
    data: *mut libc::c_void,
}

ioctl_readwrite!(usb_control_transfer, b'U', 0, UsbFsCtrlTransfer);
ioctl_write_ptr!(usb_get_driver, b'U', 8, UsbFsGetDriver);
ioctl_read!(usb_claim_interface, b'U', 15, libc::c_uint);
ioctl_read!(usb_release_interface, b'U', 16, libc::c_uint);
ioctl_readwrite!(usb_ioctl, b'U', 18, UsbFsIoctl);

/// An open usbfs device node with its claimed interfaces.
pub struct UsbFs {
    handle: File,
    bus_dev: (u8, u8),
    claims: Vec<u32>,
}

impl UsbFs {
    pub fn open(bus: u8, dev: u8) -> Result<UsbFs, TransferError> {
        let path = format!("/dev/bus/usb/{:03}/{:03}", bus, dev);
        let handle = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(map_io)?;
        debug!("opened {}", path);
        Ok(UsbFs {
            handle,
            bus_dev: (bus, dev),
            claims: vec![],
        })
    }

    /// Claim an interface, detaching a bound kernel driver first the way
    /// usbfs expects (disconnect ioctl routed through USBDEVFS_IOCTL).
    pub fn claim_interface(&mut self, interface: u32) -> Result<(), TransferError> {
        self.detach_kernel_driver(interface)?;
        let mut iface = interface as libc::c_uint;
        unsafe { usb_claim_interface(self.handle.as_raw_fd(), &mut iface) }.map_err(map_errno)?;
        self.claims.push(interface);
        debug!(
            "claimed interface {} on {}-{}",
            interface, self.bus_dev.0, self.bus_dev.1
        );
        Ok(())
    }

    fn detach_kernel_driver(&mut self, interface: u32) -> Result<(), TransferError> {
        let mut driver: UsbFsGetDriver = unsafe { mem::zeroed() };
        driver.interface = interface as i32;
        if unsafe { usb_get_driver(self.handle.as_raw_fd(), &driver) }.is_err() {
            // nothing bound
            return Ok(());
        }
        let name = unsafe { CStr::from_ptr(driver.driver.as_ptr()) }.to_string_lossy();
        if name == "usbfs" {
            return Ok(());
        }
        debug!("detaching kernel driver {:?} from interface {}", name, interface);
        let mut disconnect = UsbFsIoctl {
            interface: interface as i32,
            code: request_code_none!(b'U', 22) as i32,
            data: ptr::null_mut(),
        };
        unsafe { usb_ioctl(self.handle.as_raw_fd(), &mut disconnect) }.map_err(map_errno)?;
        Ok(())
    }

    /// Release every claimed interface. Draining the claim list here keeps
    /// `Drop` from releasing an interface twice.
    pub fn release_interfaces(&mut self) -> Result<(), TransferError> {
        while let Some(interface) = self.claims.pop() {
            let mut iface = interface as libc::c_uint;
            unsafe { usb_release_interface(self.handle.as_raw_fd(), &mut iface) }
                .map_err(map_errno)?;
        }
        Ok(())
    }

    /// Synchronous control transfer through USBDEVFS_CONTROL. The ioctl
    /// blocks for up to the descriptor timeout (0 = no timeout) and
    /// returns the transferred byte count.
    pub fn send_control(&self, xfer: &ControlTransfer) -> Result<TransferResult, TransferError> {
        let mut buf = match xfer.direction {
            Direction::HostToDevice => xfer.data.clone(),
            Direction::DeviceToHost => vec![0u8; xfer.read_length as usize],
        };
        let mut ctrl = UsbFsCtrlTransfer {
            request_type: xfer.bm_request_type(),
            request: xfer.request,
            value: xfer.value,
            index: xfer.index,
            length: buf.len() as u16,
            timeout: xfer.timeout.as_millis() as u32,
            data: buf.as_mut_ptr() as *mut libc::c_void,
        };
        let len = unsafe { usb_control_transfer(self.handle.as_raw_fd(), &mut ctrl) }
            .map_err(map_errno)?;
        let n = len as usize;
        let data = match xfer.direction {
            Direction::DeviceToHost => {
                buf.truncate(n);
                buf
            }
            Direction::HostToDevice => Vec::new(),
        };
        Ok(TransferResult::success(n, data))
    }
}

impl Drop for UsbFs {
    fn drop(&mut self) {
        if self.release_interfaces().is_err() {
            debug!(
                "failed to release interfaces on {}-{}",
                self.bus_dev.0, self.bus_dev.1
            );
        }
    }
}

fn map_io(e: io::Error) -> TransferError {
    match e.kind() {
        io::ErrorKind::NotFound => TransferError::NoDevice,
        io::ErrorKind::PermissionDenied => TransferError::AccessDenied,
        _ => TransferError::Platform(e.raw_os_error().unwrap_or(0)),
    }
}

pub(crate) fn map_errno(e: Errno) -> TransferError {
    match e {
        Errno::ETIMEDOUT => TransferError::Timeout,
        Errno::EPIPE => TransferError::Stall,
        Errno::ENODEV | Errno::ESHUTDOWN => TransferError::NoDevice,
        Errno::EACCES | Errno::EPERM => TransferError::AccessDenied,
        Errno::EINVAL => TransferError::InvalidParameter("rejected by usbfs".into()),
        other => TransferError::Platform(other as i32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping_covers_the_taxonomy() {
        assert_eq!(map_errno(Errno::ETIMEDOUT), TransferError::Timeout);
        assert_eq!(map_errno(Errno::EPIPE), TransferError::Stall);
        assert_eq!(map_errno(Errno::ENODEV), TransferError::NoDevice);
        assert_eq!(map_errno(Errno::ESHUTDOWN), TransferError::NoDevice);
        assert_eq!(map_errno(Errno::EACCES), TransferError::AccessDenied);
        assert_eq!(map_errno(Errno::EPERM), TransferError::AccessDenied);
        assert_eq!(
            map_errno(Errno::EOVERFLOW),
            TransferError::Platform(Errno::EOVERFLOW as i32)
        );
        match map_errno(Errno::EINVAL) {
            TransferError::InvalidParameter(_) => {}
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn io_mapping_distinguishes_missing_from_forbidden() {
        let gone = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(map_io(gone), TransferError::NoDevice);
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(map_io(denied), TransferError::AccessDenied);
    }
}
