//! Claim the first device matching VID:PID and read its status through a
//! standard GET_STATUS control transfer:
//!
//!   cargo run --example send_control 1532 00ab

use std::time::Duration;
use usbctl::{
    send_control, ControlTransfer, DeviceHandle, Recipient, RequestType, UsbEnumerate,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    simple_logger::init()?;

    let mut args = std::env::args().skip(1);
    let vid = u16::from_str_radix(&args.next().unwrap_or_default(), 16)?;
    let pid = u16::from_str_radix(&args.next().unwrap_or_default(), 16)?;

    let usb = UsbEnumerate::from_sysfs()?;
    let device = usb
        .find_by_ids(vid, pid)
        .ok_or(format!("no device {:04x}:{:04x}", vid, pid))?;
    println!("found {}", device);

    let mut handle = DeviceHandle::open_linux(device, 0)?;
    let xfer = ControlTransfer::new_read(
        RequestType::Standard,
        Recipient::Device,
        0x00, // GET_STATUS
        0,
        0,
        2,
        Duration::from_millis(1000),
    );
    match send_control(&handle, &xfer) {
        Ok(res) => println!("status: {:02x?}", res.data),
        Err(e) if e.is_transient() => println!("transfer failed (retryable): {}", e),
        Err(e) => println!("transfer failed: {}", e),
    }
    handle.close()?;
    Ok(())
}
