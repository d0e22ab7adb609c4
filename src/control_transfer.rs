use crate::error::TransferError;
use std::time::Duration;

/// Direction of the data stage, bit 7 of bmRequestType.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

impl Direction {
    pub(crate) fn bits(self) -> u8 {
        match self {
            Direction::HostToDevice => 0x00,
            Direction::DeviceToHost => 0x80,
        }
    }
}

/// Request class, bits 5..6 of bmRequestType.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestType {
    Standard,
    Class,
    Vendor,
}

impl RequestType {
    pub(crate) fn bits(self) -> u8 {
        match self {
            RequestType::Standard => 0x00 << 5,
            RequestType::Class => 0x01 << 5,
            RequestType::Vendor => 0x02 << 5,
        }
    }
}

/// Request recipient, bits 0..4 of bmRequestType.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
}

impl Recipient {
    pub(crate) fn bits(self) -> u8 {
        match self {
            Recipient::Device => 0x00,
            Recipient::Interface => 0x01,
            Recipient::Endpoint => 0x02,
            Recipient::Other => 0x03,
        }
    }
}

/// One control transfer request on the default control endpoint.
///
/// `data` is the outbound payload for [`Direction::HostToDevice`];
/// `read_length` is the number of bytes expected back for
/// [`Direction::DeviceToHost`]. A timeout of zero means no timeout
/// (backend-defined behavior).
#[derive(Clone, Debug)]
pub struct ControlTransfer {
    pub direction: Direction,
    pub request_type: RequestType,
    pub recipient: Recipient,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub read_length: u16,
    pub data: Vec<u8>,
    pub timeout: Duration,
}

impl ControlTransfer {
    pub fn new_nodata(
        direction: Direction,
        request_type: RequestType,
        recipient: Recipient,
        request: u8,
        value: u16,
        index: u16,
        timeout: Duration,
    ) -> Self {
        ControlTransfer {
            direction,
            request_type,
            recipient,
            request,
            value,
            index,
            read_length: 0,
            data: Vec::new(),
            timeout,
        }
    }

    pub fn new_read(
        request_type: RequestType,
        recipient: Recipient,
        request: u8,
        value: u16,
        index: u16,
        read_length: u16,
        timeout: Duration,
    ) -> Self {
        ControlTransfer {
            direction: Direction::DeviceToHost,
            request_type,
            recipient,
            request,
            value,
            index,
            read_length,
            data: Vec::new(),
            timeout,
        }
    }

    pub fn new_write(
        request_type: RequestType,
        recipient: Recipient,
        request: u8,
        value: u16,
        index: u16,
        data: Vec<u8>,
        timeout: Duration,
    ) -> Self {
        ControlTransfer {
            direction: Direction::HostToDevice,
            request_type,
            recipient,
            request,
            value,
            index,
            read_length: 0,
            data,
            timeout,
        }
    }

    /// The wire bmRequestType byte.
    pub fn bm_request_type(&self) -> u8 {
        self.direction.bits() | self.request_type.bits() | self.recipient.bits()
    }

    /// Length of the data stage in bytes.
    pub fn wire_length(&self) -> u16 {
        match self.direction {
            Direction::HostToDevice => self.data.len() as u16,
            Direction::DeviceToHost => self.read_length,
        }
    }

    /// Check the descriptor before it touches any native layer.
    ///
    /// `request`/`value`/`index` widths are enforced by the field types,
    /// so the remaining checks are the payload length limit and the
    /// direction/payload agreement.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.data.len() > u16::MAX as usize {
            return Err(TransferError::InvalidParameter(format!(
                "payload length {} exceeds 65535",
                self.data.len()
            )));
        }
        match self.direction {
            Direction::DeviceToHost if !self.data.is_empty() => Err(
                TransferError::InvalidParameter("read transfer carries an outbound payload".into()),
            ),
            Direction::HostToDevice if self.read_length != 0 => Err(
                TransferError::InvalidParameter("write transfer requests inbound data".into()),
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor_write(data: Vec<u8>) -> ControlTransfer {
        ControlTransfer::new_write(
            RequestType::Vendor,
            Recipient::Device,
            0x01,
            0,
            0,
            data,
            Duration::from_millis(100),
        )
    }

    #[test]
    fn bm_request_type_packing() {
        let out = vendor_write(vec![]);
        assert_eq!(out.bm_request_type(), 0x40);

        let class_in = ControlTransfer::new_read(
            RequestType::Class,
            Recipient::Interface,
            0x01,
            0x0300,
            0,
            64,
            Duration::from_millis(100),
        );
        assert_eq!(class_in.bm_request_type(), 0xA1);

        let std_ep = ControlTransfer::new_nodata(
            Direction::HostToDevice,
            RequestType::Standard,
            Recipient::Endpoint,
            0x01,
            0,
            0x81,
            Duration::from_millis(100),
        );
        assert_eq!(std_ep.bm_request_type(), 0x02);
    }

    #[test]
    fn validate_rejects_oversize_payload() {
        let xfer = vendor_write(vec![0u8; 65536]);
        match xfer.validate() {
            Err(TransferError::InvalidParameter(_)) => {}
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
        // 65535 is the largest wLength and still fine
        assert!(vendor_write(vec![0u8; 65535]).validate().is_ok());
    }

    #[test]
    fn validate_rejects_direction_mismatch() {
        let mut read = ControlTransfer::new_read(
            RequestType::Vendor,
            Recipient::Device,
            0x02,
            0,
            0,
            8,
            Duration::from_millis(100),
        );
        read.data = vec![0xFF];
        assert!(read.validate().is_err());

        let mut write = vendor_write(vec![0xAA]);
        write.read_length = 8;
        assert!(write.validate().is_err());
    }

    #[test]
    fn wire_length_follows_direction() {
        assert_eq!(vendor_write(vec![1, 2, 3]).wire_length(), 3);
        let read = ControlTransfer::new_read(
            RequestType::Vendor,
            Recipient::Device,
            0x02,
            0,
            0,
            16,
            Duration::from_millis(100),
        );
        assert_eq!(read.wire_length(), 16);
    }
}
