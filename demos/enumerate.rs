use serde_json::json;
use usbctl::UsbEnumerate;

fn main() -> Result<(), std::io::Error> {
    let usb = UsbEnumerate::from_sysfs()?;
    println!("{}", json!(usb.devices()));
    Ok(())
}
