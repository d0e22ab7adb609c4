pub mod winusb;
