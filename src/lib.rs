pub mod control_transfer;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod os;
pub mod test_utils;

pub use control_transfer::{ControlTransfer, Direction, Recipient, RequestType};
pub use dispatcher::send_control;
pub use error::{TransferError, TransferResult, TransferStatus, ALREADY_CLOSED};
pub use handle::{DeviceHandle, PlatformTag};
#[cfg(target_os = "linux")]
pub use os::linux::enumerate::{UsbDevice, UsbEnumerate};
