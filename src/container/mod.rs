//! `.p3` frame container
//!
//! A container is a back-to-back sequence of records with no file header
//! and no trailer:
//!
//! ```text
//! ┌────────┬──────────┬──────────────┬─────────────────────┐
//! │ type   │ reserved │ length (BE)  │ payload             │
//! │ 1 byte │ 1 byte   │ 2 bytes      │ `length` bytes      │
//! └────────┴──────────┴──────────────┴─────────────────────┘
//! ```
//!
//! `type` and `reserved` are written as zero and carried through
//! untouched when records are re-encoded.

pub mod decode;
pub mod encode;
pub mod record;

pub use decode::{
    decode, decode_records, decode_with_duration, read_file, DecodedContainer, RecordReader,
};
pub use encode::{encode, encode_records, write_file};
pub use record::{ContainerRecord, RecordHeader};

/// Size of a record header in bytes
pub const HEADER_LEN: usize = 4;

/// Largest payload a record can describe
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Record type written for encoded frames
pub const RECORD_TYPE_FRAME: u8 = 0;
