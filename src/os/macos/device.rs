use super::iokit::*;
use crate::control_transfer::{ControlTransfer, Direction};
use crate::error::{TransferError, TransferResult};
use core_foundation::base::TCFType;
use core_foundation::string::CFString;
use core_foundation_sys::base::CFRelease;
use core_foundation_sys::number::{kCFNumberSInt32Type, CFNumberGetValue, CFNumberRef};
use core_foundation_sys::uuid::CFUUIDGetUUIDBytes;
use log::debug;
use std::os::raw::{c_char, c_void};
use std::ptr;

/// A device whose IOUSBDeviceInterface table was resolved and opened. The
/// table pointer is cached here at open time and never re-resolved.
pub struct IoKitDevice {
    interface: *mut *mut IOUSBDeviceInterface,
}

impl IoKitDevice {
    /// Find the first IOUSBDevice service matching vendor/product id,
    /// resolve its plug-in and device-interface table and open it.
    pub fn open(vendor_id: u16, product_id: u16) -> Result<IoKitDevice, TransferError> {
        unsafe {
            let matching = IOServiceMatching(b"IOUSBDevice\0".as_ptr() as *const c_char);
            if matching.is_null() {
                return Err(TransferError::Platform(kIOReturnError));
            }
            // consumed by IOServiceGetMatchingServices
            let mut iter: io_iterator_t = 0;
            let kr = IOServiceGetMatchingServices(kIOMasterPortDefault, matching, &mut iter);
            if kr != kIOReturnSuccess {
                return Err(TransferError::Platform(kr));
            }

            let mut found = Err(TransferError::NoDevice);
            loop {
                let service = IOIteratorNext(iter);
                if service == 0 {
                    break;
                }
                let vid = read_int_property(service, "idVendor");
                let pid = read_int_property(service, "idProduct");
                if vid != Some(vendor_id as i32) || pid != Some(product_id as i32) {
                    IOObjectRelease(service);
                    continue;
                }
                found = Self::open_service(service);
                IOObjectRelease(service);
                break;
            }
            IOObjectRelease(iter);
            found
        }
    }

    unsafe fn open_service(service: io_service_t) -> Result<IoKitDevice, TransferError> {
        let mut plugin: *mut *mut IOCFPlugInInterface = ptr::null_mut();
        let mut score: i32 = 0;
        let kr = IOCreatePlugInInterfaceForService(
            service,
            device_user_client_type_uuid(),
            plugin_interface_uuid(),
            &mut plugin,
            &mut score,
        );
        if kr != kIOReturnSuccess || plugin.is_null() {
            return Err(map_ioreturn(if kr != kIOReturnSuccess {
                kr
            } else {
                kIOReturnError
            }));
        }

        let query = (**plugin)
            .QueryInterface
            .ok_or(TransferError::Platform(kIOReturnUnsupported))?;
        let mut interface: *mut *mut IOUSBDeviceInterface = ptr::null_mut();
        let hresult = query(
            plugin as *mut c_void,
            CFUUIDGetUUIDBytes(device_interface_uuid()),
            &mut interface as *mut *mut *mut IOUSBDeviceInterface as *mut *mut c_void,
        );
        if let Some(release) = (**plugin).Release {
            release(plugin as *mut c_void);
        }
        if hresult != 0 || interface.is_null() {
            return Err(TransferError::Platform(hresult));
        }

        let open_fn = (**interface)
            .USBDeviceOpen
            .ok_or(TransferError::Platform(kIOReturnUnsupported))?;
        let kr = open_fn(interface as *mut c_void);
        if kr != kIOReturnSuccess {
            if let Some(release) = (**interface).Release {
                release(interface as *mut c_void);
            }
            return Err(map_ioreturn(kr));
        }
        debug!("resolved device interface table at {:p}", interface);
        Ok(IoKitDevice { interface })
    }

    /// Adopt an already-resolved, already-open table.
    pub(crate) unsafe fn from_raw(interface: *mut *mut IOUSBDeviceInterface) -> IoKitDevice {
        IoKitDevice { interface }
    }

    /// Issue the request through the cached function table. DeviceRequest
    /// carries no per-call deadline; a stack-level timeout still surfaces
    /// as kIOUSBTransactionTimeout.
    pub fn send_control(&self, xfer: &ControlTransfer) -> Result<TransferResult, TransferError> {
        if self.interface.is_null() {
            return Err(TransferError::NoDevice);
        }
        let mut buf = match xfer.direction {
            Direction::HostToDevice => xfer.data.clone(),
            Direction::DeviceToHost => vec![0u8; xfer.read_length as usize],
        };
        let mut req = IOUSBDevRequest {
            bmRequestType: xfer.bm_request_type(),
            bRequest: xfer.request,
            wValue: xfer.value,
            wIndex: xfer.index,
            wLength: buf.len() as u16,
            pData: if buf.is_empty() {
                ptr::null_mut()
            } else {
                buf.as_mut_ptr() as *mut c_void
            },
            wLenDone: 0,
        };
        let request_fn = unsafe { (**self.interface).DeviceRequest }
            .ok_or(TransferError::Platform(kIOReturnUnsupported))?;
        let kr = unsafe { request_fn(self.interface as *mut c_void, &mut req) };
        if kr != kIOReturnSuccess {
            return Err(map_ioreturn(kr));
        }
        let n = req.wLenDone as usize;
        let data = match xfer.direction {
            Direction::DeviceToHost => {
                buf.truncate(n);
                buf
            }
            Direction::HostToDevice => Vec::new(),
        };
        Ok(TransferResult::success(n, data))
    }

    /// Close the device and drop the table reference, exactly once.
    pub fn close(&mut self) -> Result<(), TransferError> {
        if self.interface.is_null() {
            return Ok(());
        }
        unsafe {
            if let Some(close_fn) = (**self.interface).USBDeviceClose {
                let kr = close_fn(self.interface as *mut c_void);
                if kr != kIOReturnSuccess && kr != kIOReturnNotOpen {
                    return Err(map_ioreturn(kr));
                }
            }
            if let Some(release) = (**self.interface).Release {
                release(self.interface as *mut c_void);
            }
        }
        self.interface = ptr::null_mut();
        Ok(())
    }
}

impl Drop for IoKitDevice {
    fn drop(&mut self) {
        if self.close().is_err() {
            debug!("failed to close device interface");
        }
    }
}

unsafe fn read_int_property(entry: io_registry_entry_t, key: &str) -> Option<i32> {
    let cf_key = CFString::new(key);
    let raw = IORegistryEntryCreateCFProperty(entry, cf_key.as_concrete_TypeRef(), ptr::null(), 0);
    if raw.is_null() {
        return None;
    }
    let mut val: i32 = 0;
    let ok = CFNumberGetValue(
        raw as CFNumberRef,
        kCFNumberSInt32Type,
        &mut val as *mut i32 as *mut c_void,
    );
    CFRelease(raw);
    if ok != 0 {
        Some(val)
    } else {
        None
    }
}

pub(crate) fn map_ioreturn(code: IOReturn) -> TransferError {
    match code {
        kIOReturnTimeout | kIOUSBTransactionTimeout => TransferError::Timeout,
        kIOUSBPipeStalled => TransferError::Stall,
        kIOReturnNoDevice | kIOReturnNotAttached | kIOReturnOffline | kIOReturnNotResponding => {
            TransferError::NoDevice
        }
        kIOReturnNotPrivileged | kIOReturnExclusiveAccess | kIOReturnNotPermitted => {
            TransferError::AccessDenied
        }
        kIOReturnBadArgument => TransferError::InvalidParameter("rejected by IOKit".into()),
        other => TransferError::Platform(other),
    }
}
