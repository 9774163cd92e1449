//! Record header and record types

use bytes::{Buf, BufMut, Bytes};

use crate::container::{HEADER_LEN, MAX_PAYLOAD_LEN, RECORD_TYPE_FRAME};
use crate::error::ContainerError;

/// Parsed 4-byte record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub record_type: u8,
    pub reserved: u8,
    pub length: u16,
}

impl RecordHeader {
    /// Header for a plain encoded frame of `length` bytes
    pub fn frame(length: u16) -> Self {
        Self {
            record_type: RECORD_TYPE_FRAME,
            reserved: 0,
            length,
        }
    }

    /// Parse a header from the front of `buf`, advancing it.
    ///
    /// `offset` is only used for error reporting.
    pub fn parse(buf: &mut &[u8], offset: usize) -> Result<Self, ContainerError> {
        if buf.len() < HEADER_LEN {
            return Err(ContainerError::Malformed {
                offset,
                reason: format!("truncated header: {} of {} bytes", buf.len(), HEADER_LEN),
            });
        }

        Ok(Self {
            record_type: buf.get_u8(),
            reserved: buf.get_u8(),
            length: buf.get_u16(),
        })
    }

    /// Append the header to `out`
    pub fn write<B: BufMut>(&self, out: &mut B) {
        out.put_u8(self.record_type);
        out.put_u8(self.reserved);
        out.put_u16(self.length);
    }
}

/// One persisted record: header fields plus its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    pub record_type: u8,
    pub reserved: u8,
    pub payload: Bytes,
}

impl ContainerRecord {
    /// Record carrying an encoded frame with zeroed type/reserved bytes
    pub fn frame(payload: Bytes) -> Self {
        Self {
            record_type: RECORD_TYPE_FRAME,
            reserved: 0,
            payload,
        }
    }

    /// Header describing this record.
    ///
    /// `index` is the record's position, reported if the payload does not fit.
    pub fn header(&self, index: usize) -> Result<RecordHeader, ContainerError> {
        if self.payload.len() > MAX_PAYLOAD_LEN {
            return Err(ContainerError::FrameTooLarge {
                index,
                len: self.payload.len(),
            });
        }

        Ok(RecordHeader {
            record_type: self.record_type,
            reserved: self.reserved,
            length: self.payload.len() as u16,
        })
    }

    /// Total encoded size including the header
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }
}
