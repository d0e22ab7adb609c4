use log::debug;
#[cfg(feature = "serde")]
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

const SYSFS_USB_DEVICES: &str = "/sys/bus/usb/devices";

/// One enumerated device, read from its sysfs attribute files.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Clone, Debug)]
pub struct UsbDevice {
    pub bus_num: u8,
    pub dev_num: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: String,
    pub product: String,
    pub serial: String,
}

impl fmt::Display for UsbDevice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}-{} {:04x}:{:04x} {}",
            self.bus_num, self.dev_num, self.vendor_id, self.product_id, self.product
        )
    }
}

/// Devices keyed `"bus-dev"`, as listed under /sys/bus/usb/devices.
pub struct UsbEnumerate {
    devices: HashMap<String, UsbDevice>,
}

impl Default for UsbEnumerate {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbEnumerate {
    pub fn new() -> Self {
        UsbEnumerate {
            devices: HashMap::new(),
        }
    }

    pub fn from_sysfs() -> io::Result<Self> {
        let mut res = Self::new();
        res.read_dir(Path::new(SYSFS_USB_DEVICES))?;
        Ok(res)
    }

    fn read_dir(&mut self, dir: &Path) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // interface nodes look like "1-1.4:1.0"; devices have no colon
            if name.contains(':') {
                continue;
            }
            match Self::read_device(&entry.path()) {
                Some(device) => {
                    let key = format!("{}-{}", device.bus_num, device.dev_num);
                    self.devices.insert(key, device);
                }
                None => debug!("skipping {} (incomplete attributes)", name),
            }
        }
        Ok(())
    }

    fn read_device(path: &Path) -> Option<UsbDevice> {
        let bus_num = read_attr(path, "busnum")?.parse().ok()?;
        let dev_num = read_attr(path, "devnum")?.parse().ok()?;
        let vendor_id = parse_hex16(&read_attr(path, "idVendor")?)?;
        let product_id = parse_hex16(&read_attr(path, "idProduct")?)?;
        Some(UsbDevice {
            bus_num,
            dev_num,
            vendor_id,
            product_id,
            manufacturer: read_attr(path, "manufacturer").unwrap_or_default(),
            product: read_attr(path, "product").unwrap_or_default(),
            serial: read_attr(path, "serial").unwrap_or_default(),
        })
    }

    pub fn devices(&self) -> &HashMap<String, UsbDevice> {
        &self.devices
    }

    pub fn get_device_from_bus(&self, bus: u8, address: u8) -> Option<&UsbDevice> {
        self.devices.get(&format!("{}-{}", bus, address))
    }

    /// First device matching vendor/product id, in no particular order.
    pub fn find_by_ids(&self, vendor_id: u16, product_id: u16) -> Option<&UsbDevice> {
        self.devices
            .values()
            .find(|d| d.vendor_id == vendor_id && d.product_id == product_id)
    }
}

fn read_attr(dir: &Path, name: &str) -> Option<String> {
    fs::read_to_string(dir.join(name))
        .ok()
        .map(|s| s.trim().to_string())
}

fn parse_hex16(s: &str) -> Option<u16> {
    u16::from_str_radix(s, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_attributes_parse() {
        assert_eq!(parse_hex16("1d6b"), Some(0x1d6b));
        assert_eq!(parse_hex16("0000"), Some(0));
        assert_eq!(parse_hex16("ffff"), Some(0xffff));
        assert_eq!(parse_hex16("not-hex"), None);
    }

    #[test]
    fn read_device_from_attribute_dir() {
        let dir = std::env::temp_dir().join(format!("usbctl-enum-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("busnum"), "3\n").unwrap();
        fs::write(dir.join("devnum"), "7\n").unwrap();
        fs::write(dir.join("idVendor"), "1532\n").unwrap();
        fs::write(dir.join("idProduct"), "00ab\n").unwrap();
        fs::write(dir.join("product"), "Gaming Mouse\n").unwrap();

        let dev = UsbEnumerate::read_device(&dir).unwrap();
        assert_eq!(dev.bus_num, 3);
        assert_eq!(dev.dev_num, 7);
        assert_eq!(dev.vendor_id, 0x1532);
        assert_eq!(dev.product_id, 0x00ab);
        assert_eq!(dev.product, "Gaming Mouse");
        assert_eq!(dev.serial, "");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn incomplete_attribute_dir_is_skipped() {
        let dir = std::env::temp_dir().join(format!("usbctl-enum-partial-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("busnum"), "1\n").unwrap();

        assert!(UsbEnumerate::read_device(&dir).is_none());

        fs::remove_dir_all(&dir).unwrap();
    }
}
