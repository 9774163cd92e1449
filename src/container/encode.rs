//! Container write path

use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};

use crate::container::record::{ContainerRecord, RecordHeader};
use crate::container::{HEADER_LEN, MAX_PAYLOAD_LEN};
use crate::error::{ContainerError, Error};

/// Encode frames as type-0 records
pub fn encode<F: AsRef<[u8]>>(frames: &[F]) -> Result<Bytes, ContainerError> {
    let capacity = frames.iter().map(|f| HEADER_LEN + f.as_ref().len()).sum();
    let mut out = BytesMut::with_capacity(capacity);

    for (index, frame) in frames.iter().enumerate() {
        let payload = frame.as_ref();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ContainerError::FrameTooLarge {
                index,
                len: payload.len(),
            });
        }

        RecordHeader::frame(payload.len() as u16).write(&mut out);
        out.put_slice(payload);
    }

    Ok(out.freeze())
}

/// Encode full records, writing their type and reserved bytes as given
pub fn encode_records(records: &[ContainerRecord]) -> Result<Bytes, ContainerError> {
    let capacity = records.iter().map(ContainerRecord::encoded_len).sum();
    let mut out = BytesMut::with_capacity(capacity);

    for (index, record) in records.iter().enumerate() {
        record.header(index)?.write(&mut out);
        out.put_slice(&record.payload);
    }

    Ok(out.freeze())
}

/// Encode frames and write them to `path`
pub fn write_file<F: AsRef<[u8]>>(path: impl AsRef<Path>, frames: &[F]) -> Result<(), Error> {
    let path = path.as_ref();
    let data = encode(frames)?;
    std::fs::write(path, &data)?;

    tracing::debug!("Wrote {} frames ({} bytes) to {}", frames.len(), data.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::decode::{decode, decode_records};
    use proptest::prelude::*;

    #[test]
    fn test_encode_layout() {
        let frames = vec![vec![0xAAu8, 0xBB, 0xCC]];

        let data = encode(&frames).unwrap();
        assert_eq!(&data[..], &[0x00, 0x00, 0x00, 0x03, 0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_frame_too_large() {
        let frames = vec![vec![0u8; 10], vec![0u8; MAX_PAYLOAD_LEN + 1]];

        let err = encode(&frames).unwrap_err();
        assert_eq!(err, ContainerError::FrameTooLarge { index: 1, len: MAX_PAYLOAD_LEN + 1 });
    }

    #[test]
    fn test_max_frame_fits() {
        let frames = vec![vec![0x5Au8; MAX_PAYLOAD_LEN]];

        let data = encode(&frames).unwrap();
        assert_eq!(&data[..HEADER_LEN], &[0x00, 0x00, 0xFF, 0xFF]);
        assert_eq!(decode(&data).unwrap().frames[0].len(), MAX_PAYLOAD_LEN);
    }

    #[test]
    fn test_records_round_trip_header_bytes() {
        let records = vec![
            ContainerRecord {
                record_type: 3,
                reserved: 0x80,
                payload: Bytes::from_static(b"abc"),
            },
            ContainerRecord::frame(Bytes::from_static(b"de")),
        ];

        let data = encode_records(&records).unwrap();
        assert_eq!(decode_records(&data).unwrap(), records);
    }

    #[test]
    fn test_write_file() {
        let path = std::env::temp_dir().join(format!("p3-write-{}.p3", std::process::id()));
        write_file(&path, &[b"hello".to_vec()]).unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(&data[..4], &[0x00, 0x00, 0x00, 0x05]);

        std::fs::remove_file(&path).unwrap();
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            frames in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..2048), 0..32)
        ) {
            let data = encode(&frames).unwrap();
            let decoded = decode(&data).unwrap();

            prop_assert_eq!(decoded.frames.len(), frames.len());
            for (got, want) in decoded.frames.iter().zip(&frames) {
                prop_assert_eq!(&got[..], &want[..]);
            }
        }

        #[test]
        fn prop_truncation_detected(
            frames in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..256), 1..8),
            cut in 1usize..256,
        ) {
            let data = encode(&frames).unwrap();
            let cut = cut.min(data.len() - 1).max(1);
            let truncated = &data[..data.len() - cut];

            // Cutting inside the final record can never look like a clean end
            let last_record_len = HEADER_LEN + frames[frames.len() - 1].len();
            if cut < last_record_len {
                prop_assert!(decode(truncated).is_err());
            }
        }
    }
}
