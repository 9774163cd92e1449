//! Container read path

use std::path::Path;

use bytes::{Buf, Bytes};

use crate::constants::DEFAULT_FRAME_DURATION_MS;
use crate::container::record::{ContainerRecord, RecordHeader};
use crate::container::HEADER_LEN;
use crate::error::{ContainerError, Error};

/// Frames recovered from a container, with their nominal total duration
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedContainer {
    pub frames: Vec<Bytes>,
    pub total_duration_seconds: f64,
}

/// Iterator over the records of a container.
///
/// Payloads are zero-copy slices of the input. The first error ends the
/// iteration.
pub struct RecordReader {
    data: Bytes,
    offset: usize,
    failed: bool,
}

impl RecordReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            offset: 0,
            failed: false,
        }
    }

    /// Byte offset of the next record
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn read_record(&mut self) -> Result<ContainerRecord, ContainerError> {
        let mut view: &[u8] = &self.data;
        let header = RecordHeader::parse(&mut view, self.offset)?;
        let available = view.len();
        let length = header.length as usize;

        if length > available {
            return Err(ContainerError::Malformed {
                offset: self.offset,
                reason: format!("payload declares {} bytes but only {} remain", length, available),
            });
        }

        self.data.advance(HEADER_LEN);
        let payload = self.data.split_to(length);
        self.offset += HEADER_LEN + length;

        Ok(ContainerRecord {
            record_type: header.record_type,
            reserved: header.reserved,
            payload,
        })
    }
}

impl Iterator for RecordReader {
    type Item = Result<ContainerRecord, ContainerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.data.is_empty() {
            return None;
        }

        let result = self.read_record();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Decode every record, keeping type and reserved bytes
pub fn decode_records(data: &[u8]) -> Result<Vec<ContainerRecord>, ContainerError> {
    RecordReader::new(Bytes::copy_from_slice(data)).collect()
}

/// Decode a container of 60 ms frames
pub fn decode(data: &[u8]) -> Result<DecodedContainer, ContainerError> {
    decode_with_duration(data, DEFAULT_FRAME_DURATION_MS)
}

/// Decode a container whose frames last `frame_duration_ms` each
pub fn decode_with_duration(
    data: &[u8],
    frame_duration_ms: u32,
) -> Result<DecodedContainer, ContainerError> {
    let frames = RecordReader::new(Bytes::copy_from_slice(data))
        .map(|record| record.map(|r| r.payload))
        .collect::<Result<Vec<_>, _>>()?;

    let total_duration_seconds = frames.len() as f64 * frame_duration_ms as f64 / 1000.0;

    Ok(DecodedContainer {
        frames,
        total_duration_seconds,
    })
}

/// Load and decode a container file of 60 ms frames
pub fn read_file(path: impl AsRef<Path>) -> Result<DecodedContainer, Error> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let decoded = decode(&data)?;

    tracing::debug!(
        "Loaded {} frames ({:.2}s) from {}",
        decoded.frames.len(),
        decoded.total_duration_seconds,
        path.display()
    );

    Ok(decoded)
}
