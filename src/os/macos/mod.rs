pub mod device;
pub mod iokit;
