//! Hand-maintained slice of the IOKit USB plug-in surface: the IOReturn
//! codes we map, the COM-style function tables resolved at open time and
//! the UUID accessors keying that resolution.
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]

use core_foundation_sys::base::{CFAllocatorRef, CFTypeRef};
use core_foundation_sys::dictionary::{CFDictionaryRef, CFMutableDictionaryRef};
use core_foundation_sys::runloop::CFRunLoopSourceRef;
use core_foundation_sys::string::CFStringRef;
use core_foundation_sys::uuid::{CFUUIDBytes, CFUUIDGetConstantUUIDWithBytes, CFUUIDRef};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

pub type IOReturn = c_int;
pub type kern_return_t = c_int;
pub type mach_port_t = u32;
pub type io_object_t = mach_port_t;
pub type io_service_t = io_object_t;
pub type io_iterator_t = io_object_t;
pub type io_registry_entry_t = io_object_t;
pub type HRESULT = i32;
pub type ULONG = u32;
pub type REFIID = CFUUIDBytes;
pub type USBDeviceAddress = u16;
pub type AbsoluteTime = u64;

const SYS_IOKIT: u32 = (0x38 & 0x3f) << 26;
const SUB_IOKIT_COMMON: u32 = 0;
const SUB_IOKIT_USB: u32 = 1 << 14;

macro_rules! iokit_err {
    ($id:ident, $sub:expr, $offset:expr) => {
        pub const $id: IOReturn = (SYS_IOKIT | $sub | $offset) as IOReturn;
    };
}

pub const kIOReturnSuccess: IOReturn = 0;

iokit_err!(kIOReturnError, SUB_IOKIT_COMMON, 0x2bc);
iokit_err!(kIOReturnNoDevice, SUB_IOKIT_COMMON, 0x2c0);
iokit_err!(kIOReturnNotPrivileged, SUB_IOKIT_COMMON, 0x2c1);
iokit_err!(kIOReturnBadArgument, SUB_IOKIT_COMMON, 0x2c2);
iokit_err!(kIOReturnExclusiveAccess, SUB_IOKIT_COMMON, 0x2c5);
iokit_err!(kIOReturnUnsupported, SUB_IOKIT_COMMON, 0x2c7);
iokit_err!(kIOReturnNotOpen, SUB_IOKIT_COMMON, 0x2cd);
iokit_err!(kIOReturnBusy, SUB_IOKIT_COMMON, 0x2d5);
iokit_err!(kIOReturnTimeout, SUB_IOKIT_COMMON, 0x2d6);
iokit_err!(kIOReturnOffline, SUB_IOKIT_COMMON, 0x2d7);
iokit_err!(kIOReturnNotAttached, SUB_IOKIT_COMMON, 0x2d9);
iokit_err!(kIOReturnNotPermitted, SUB_IOKIT_COMMON, 0x2e2);
iokit_err!(kIOReturnAborted, SUB_IOKIT_COMMON, 0x2eb);
iokit_err!(kIOReturnNotResponding, SUB_IOKIT_COMMON, 0x2ed);
iokit_err!(kIOUSBPipeStalled, SUB_IOKIT_USB, 0x4f);
iokit_err!(kIOUSBTransactionTimeout, SUB_IOKIT_USB, 0x51);

/// kIOUSBDeviceUserClientTypeID, selects the user-client plug-in.
pub fn device_user_client_type_uuid() -> CFUUIDRef {
    unsafe {
        CFUUIDGetConstantUUIDWithBytes(
            ptr::null(),
            0x9d, 0xc7, 0xb7, 0x80, 0x9e, 0xc0, 0x11, 0xd4, 0xa5, 0x4f, 0x00, 0x0a, 0x27, 0x05,
            0x28, 0x61,
        )
    }
}

/// kIOCFPlugInInterfaceID, the CFPlugIn bootstrap interface.
pub fn plugin_interface_uuid() -> CFUUIDRef {
    unsafe {
        CFUUIDGetConstantUUIDWithBytes(
            ptr::null(),
            0xc2, 0x44, 0xe8, 0x58, 0x10, 0x9c, 0x11, 0xd4, 0x91, 0xd4, 0x00, 0x50, 0xe4, 0xc6,
            0x42, 0x6f,
        )
    }
}

/// kIOUSBDeviceInterfaceID, the device function table queried off the
/// plug-in.
pub fn device_interface_uuid() -> CFUUIDRef {
    unsafe {
        CFUUIDGetConstantUUIDWithBytes(
            ptr::null(),
            0x5c, 0x81, 0x87, 0xd0, 0x9e, 0xf3, 0x11, 0xd4, 0x8b, 0x45, 0x00, 0x0a, 0x27, 0x05,
            0x28, 0x61,
        )
    }
}

#[repr(C)]
pub struct IOUSBDevRequest {
    pub bmRequestType: u8,
    pub bRequest: u8,
    pub wValue: u16,
    pub wIndex: u16,
    pub wLength: u16,
    pub pData: *mut c_void,
    pub wLenDone: u32,
}

#[repr(C)]
pub struct IOUSBFindInterfaceRequest {
    pub bInterfaceClass: u16,
    pub bInterfaceSubClass: u16,
    pub bInterfaceProtocol: u16,
    pub bAlternateSetting: u16,
}

pub type IOAsyncCallback1 =
    Option<unsafe extern "C" fn(refcon: *mut c_void, result: IOReturn, arg0: *mut c_void)>;

#[repr(C)]
pub struct IOCFPlugInInterface {
    pub _reserved: *mut c_void,
    pub QueryInterface: Option<
        unsafe extern "C" fn(this: *mut c_void, iid: REFIID, ppv: *mut *mut c_void) -> HRESULT,
    >,
    pub AddRef: Option<unsafe extern "C" fn(this: *mut c_void) -> ULONG>,
    pub Release: Option<unsafe extern "C" fn(this: *mut c_void) -> ULONG>,
    pub version: u16,
    pub revision: u16,
    pub Probe: Option<
        unsafe extern "C" fn(
            this: *mut c_void,
            property_table: CFDictionaryRef,
            service: io_service_t,
            order: *mut i32,
        ) -> IOReturn,
    >,
    pub Start: Option<
        unsafe extern "C" fn(
            this: *mut c_void,
            property_table: CFDictionaryRef,
            service: io_service_t,
        ) -> IOReturn,
    >,
    pub Stop: Option<unsafe extern "C" fn(this: *mut c_void) -> IOReturn>,
}

/// The v1 device function table behind kIOUSBDeviceInterfaceID. Field
/// order is ABI: it must match IOUSBLib.h exactly.
#[repr(C)]
pub struct IOUSBDeviceInterface {
    pub _reserved: *mut c_void,
    pub QueryInterface: Option<
        unsafe extern "C" fn(this: *mut c_void, iid: REFIID, ppv: *mut *mut c_void) -> HRESULT,
    >,
    pub AddRef: Option<unsafe extern "C" fn(this: *mut c_void) -> ULONG>,
    pub Release: Option<unsafe extern "C" fn(this: *mut c_void) -> ULONG>,
    pub CreateDeviceAsyncEventSource:
        Option<unsafe extern "C" fn(this: *mut c_void, source: *mut CFRunLoopSourceRef) -> IOReturn>,
    pub GetDeviceAsyncEventSource:
        Option<unsafe extern "C" fn(this: *mut c_void) -> CFRunLoopSourceRef>,
    pub CreateDeviceAsyncPort:
        Option<unsafe extern "C" fn(this: *mut c_void, port: *mut mach_port_t) -> IOReturn>,
    pub GetDeviceAsyncPort: Option<unsafe extern "C" fn(this: *mut c_void) -> mach_port_t>,
    pub USBDeviceOpen: Option<unsafe extern "C" fn(this: *mut c_void) -> IOReturn>,
    pub USBDeviceClose: Option<unsafe extern "C" fn(this: *mut c_void) -> IOReturn>,
    pub GetDeviceClass:
        Option<unsafe extern "C" fn(this: *mut c_void, class: *mut u8) -> IOReturn>,
    pub GetDeviceSubClass:
        Option<unsafe extern "C" fn(this: *mut c_void, subclass: *mut u8) -> IOReturn>,
    pub GetDeviceProtocol:
        Option<unsafe extern "C" fn(this: *mut c_void, protocol: *mut u8) -> IOReturn>,
    pub GetDeviceVendor:
        Option<unsafe extern "C" fn(this: *mut c_void, vendor: *mut u16) -> IOReturn>,
    pub GetDeviceProduct:
        Option<unsafe extern "C" fn(this: *mut c_void, product: *mut u16) -> IOReturn>,
    pub GetDeviceReleaseNumber:
        Option<unsafe extern "C" fn(this: *mut c_void, release: *mut u16) -> IOReturn>,
    pub GetDeviceAddress:
        Option<unsafe extern "C" fn(this: *mut c_void, address: *mut USBDeviceAddress) -> IOReturn>,
    pub GetDeviceBusPowerAvailable:
        Option<unsafe extern "C" fn(this: *mut c_void, power: *mut u32) -> IOReturn>,
    pub GetDeviceSpeed:
        Option<unsafe extern "C" fn(this: *mut c_void, speed: *mut u8) -> IOReturn>,
    pub GetNumberOfConfigurations:
        Option<unsafe extern "C" fn(this: *mut c_void, count: *mut u8) -> IOReturn>,
    pub GetLocationID:
        Option<unsafe extern "C" fn(this: *mut c_void, location: *mut u32) -> IOReturn>,
    pub GetConfigurationDescriptorPtr: Option<
        unsafe extern "C" fn(
            this: *mut c_void,
            config_index: u8,
            descriptor: *mut *mut c_void,
        ) -> IOReturn,
    >,
    pub GetConfiguration:
        Option<unsafe extern "C" fn(this: *mut c_void, config: *mut u8) -> IOReturn>,
    pub SetConfiguration: Option<unsafe extern "C" fn(this: *mut c_void, config: u8) -> IOReturn>,
    pub GetBusFrameNumber: Option<
        unsafe extern "C" fn(
            this: *mut c_void,
            frame: *mut u64,
            at_time: *mut AbsoluteTime,
        ) -> IOReturn,
    >,
    pub ResetDevice: Option<unsafe extern "C" fn(this: *mut c_void) -> IOReturn>,
    pub DeviceRequest:
        Option<unsafe extern "C" fn(this: *mut c_void, request: *mut IOUSBDevRequest) -> IOReturn>,
    pub DeviceRequestAsync: Option<
        unsafe extern "C" fn(
            this: *mut c_void,
            request: *mut IOUSBDevRequest,
            callback: IOAsyncCallback1,
            refcon: *mut c_void,
        ) -> IOReturn,
    >,
    pub CreateInterfaceIterator: Option<
        unsafe extern "C" fn(
            this: *mut c_void,
            request: *mut IOUSBFindInterfaceRequest,
            iterator: *mut io_iterator_t,
        ) -> IOReturn,
    >,
}

#[link(name = "IOKit", kind = "framework")]
extern "C" {
    pub static kIOMasterPortDefault: mach_port_t;
    pub fn IOServiceMatching(name: *const c_char) -> CFMutableDictionaryRef;
    pub fn IOServiceGetMatchingServices(
        master_port: mach_port_t,
        matching: CFMutableDictionaryRef,
        existing: *mut io_iterator_t,
    ) -> kern_return_t;
    pub fn IOIteratorNext(iterator: io_iterator_t) -> io_object_t;
    pub fn IOObjectRelease(object: io_object_t) -> kern_return_t;
    pub fn IORegistryEntryCreateCFProperty(
        entry: io_registry_entry_t,
        key: CFStringRef,
        allocator: CFAllocatorRef,
        options: u32,
    ) -> CFTypeRef;
    pub fn IOCreatePlugInInterfaceForService(
        service: io_service_t,
        plugin_type: CFUUIDRef,
        interface_type: CFUUIDRef,
        the_interface: *mut *mut *mut IOCFPlugInInterface,
        the_score: *mut i32,
    ) -> kern_return_t;
}
