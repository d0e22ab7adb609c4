use crate::control_transfer::{ControlTransfer, Direction};
use crate::error::{TransferError, TransferResult};
use log::debug;
use std::ptr;
use windows_sys::Win32::Devices::Usb::{
    WinUsb_ControlTransfer, WinUsb_Free, WinUsb_SetPipePolicy, PIPE_TRANSFER_TIMEOUT,
    WINUSB_INTERFACE_HANDLE, WINUSB_SETUP_PACKET,
};
use windows_sys::Win32::Foundation::{
    GetLastError, ERROR_ACCESS_DENIED, ERROR_DEVICE_NOT_CONNECTED, ERROR_FILE_NOT_FOUND,
    ERROR_GEN_FAILURE, ERROR_INVALID_PARAMETER, ERROR_NO_SUCH_DEVICE, ERROR_SEM_TIMEOUT, FALSE,
};

/// A WinUSB interface handle initialized by the caller (SetupDi +
/// CreateFile + WinUsb_Initialize stay outside this crate). When `owned`,
/// the handle is freed on close/drop.
pub struct WinUsbDevice {
    handle: WINUSB_INTERFACE_HANDLE,
    owned: bool,
    freed: bool,
}

impl WinUsbDevice {
    pub(crate) unsafe fn from_raw(handle: WINUSB_INTERFACE_HANDLE, owned: bool) -> WinUsbDevice {
        WinUsbDevice {
            handle,
            owned,
            freed: false,
        }
    }

    /// Control transfer through the function driver. The descriptor
    /// timeout is applied to the default control pipe first; zero keeps
    /// WinUSB's no-timeout default.
    pub fn send_control(&self, xfer: &ControlTransfer) -> Result<TransferResult, TransferError> {
        if self.freed {
            return Err(TransferError::NoDevice);
        }
        let timeout_ms = xfer.timeout.as_millis() as u32;
        let ok = unsafe {
            WinUsb_SetPipePolicy(
                self.handle,
                0,
                PIPE_TRANSFER_TIMEOUT,
                std::mem::size_of::<u32>() as u32,
                &timeout_ms as *const u32 as *const _,
            )
        };
        if ok == FALSE {
            return Err(map_last_error(unsafe { GetLastError() }));
        }

        let mut buf = match xfer.direction {
            Direction::HostToDevice => xfer.data.clone(),
            Direction::DeviceToHost => vec![0u8; xfer.read_length as usize],
        };
        let setup = WINUSB_SETUP_PACKET {
            RequestType: xfer.bm_request_type(),
            Request: xfer.request,
            Value: xfer.value,
            Index: xfer.index,
            Length: buf.len() as u16,
        };
        let mut transferred: u32 = 0;
        let ok = unsafe {
            WinUsb_ControlTransfer(
                self.handle,
                setup,
                buf.as_mut_ptr(),
                buf.len() as u32,
                &mut transferred,
                ptr::null_mut(),
            )
        };
        if ok == FALSE {
            return Err(map_last_error(unsafe { GetLastError() }));
        }
        let n = transferred as usize;
        let data = match xfer.direction {
            Direction::DeviceToHost => {
                buf.truncate(n);
                buf
            }
            Direction::HostToDevice => Vec::new(),
        };
        Ok(TransferResult::success(n, data))
    }

    /// Free the interface handle, exactly once, if we own it.
    pub fn close(&mut self) -> Result<(), TransferError> {
        if self.freed {
            return Ok(());
        }
        self.freed = true;
        if self.owned {
            let ok = unsafe { WinUsb_Free(self.handle) };
            if ok == FALSE {
                return Err(map_last_error(unsafe { GetLastError() }));
            }
        }
        Ok(())
    }
}

impl Drop for WinUsbDevice {
    fn drop(&mut self) {
        if self.close().is_err() {
            debug!("WinUsb_Free failed");
        }
    }
}

pub(crate) fn map_last_error(code: u32) -> TransferError {
    match code {
        ERROR_SEM_TIMEOUT => TransferError::Timeout,
        // the function driver reports a stalled control pipe as a
        // general device failure
        ERROR_GEN_FAILURE => TransferError::Stall,
        ERROR_DEVICE_NOT_CONNECTED | ERROR_NO_SUCH_DEVICE | ERROR_FILE_NOT_FOUND => {
            TransferError::NoDevice
        }
        ERROR_ACCESS_DENIED => TransferError::AccessDenied,
        ERROR_INVALID_PARAMETER => TransferError::InvalidParameter("rejected by WinUSB".into()),
        other => TransferError::Platform(other as i32),
    }
}
