//! Binary structure of the LIF container.
//!
//! Container layout:
//! ```text
//! +--------------------+
//! | Header block       |
//! +--------------------+
//! | Memory block 1     |
//! +--------------------+
//! | Memory block 2     |
//! +--------------------+
//! | ...                |
//! +--------------------+
//! ```
//!
//! Header block:
//! - magic: u32 = 0x70 (little-endian)
//! - block_len: u32 (little-endian)
//! - test: u8 = 0x2A
//! - char_count: u32 (little-endian) - length of the XML document in UTF-16
//!   code units
//! - xml: [u8; char_count * 2] (UTF-16LE)
//!
//! Memory block (version 1):
//! - magic: u32, block_len: u32, test: u8
//! - data_size: u32 (little-endian)
//! - test: u8
//! - id_chars: u32 (little-endian)
//! - id: [u8; id_chars * 2] (UTF-16LE), e.g. "MemBlock_233"
//! - data: [u8; data_size]
//!
//! Memory block (version 2):
//! - magic: u32, block_len: u32, test: u8
//! - test: u8
//! - data_size: u64 (little-endian)
//! - test: u8
//! - id_chars: u32, id, data as in version 1
//!
//! The XML document describes every image series and names the memory block
//! holding its pixel data.

use serde::Serialize;

use crate::{Error, Result};

/// Marker opening every block
pub const MAGIC: u32 = 0x70;

/// Sanity byte following each block length
pub const TEST_BYTE: u8 = 0x2A;

/// Byte offset of the XML character count within the file
pub const METADATA_CHARS_OFFSET: usize = 9;

/// Container version, declared by the XML root element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifVersion {
    V1,
    V2,
}

/// Location of one series' pixel data within the file
#[derive(Debug, Clone)]
pub struct MemoryBlock {
    /// Block id referenced by the series metadata
    pub id: String,

    /// Absolute byte offset of the pixel data
    pub offset: u64,

    /// Pixel data size in bytes
    pub size: u64,
}

/// Read the XML character count from the header without decoding the
/// document itself.
pub fn metadata_string_chars(data: &[u8]) -> Result<u32> {
    if data.len() < METADATA_CHARS_OFFSET + 4 {
        return Err(Error::Format("header truncated".to_string()));
    }
    if u32::from_le_bytes(data[0..4].try_into().unwrap()) != MAGIC {
        return Err(Error::Format("invalid header magic".to_string()));
    }
    if data[8] != TEST_BYTE {
        return Err(Error::Format("invalid header test byte".to_string()));
    }
    Ok(u32::from_le_bytes(
        data[METADATA_CHARS_OFFSET..METADATA_CHARS_OFFSET + 4]
            .try_into()
            .unwrap(),
    ))
}

/// Decode the header block. Returns the XML document and the number of
/// bytes the header occupies.
pub fn read_header(data: &[u8]) -> Result<(String, usize)> {
    let char_count = metadata_string_chars(data)? as usize;
    let xml_start = METADATA_CHARS_OFFSET + 4;
    let xml_end = xml_start + char_count * 2;
    if data.len() < xml_end {
        return Err(Error::Format(format!(
            "metadata document truncated: need {} bytes, have {}",
            xml_end,
            data.len()
        )));
    }
    let xml = decode_utf16le(&data[xml_start..xml_end])?;
    Ok((xml, xml_end))
}

/// Walk the memory blocks following the header.
pub fn scan_memory_blocks(
    data: &[u8],
    header_len: usize,
    version: LifVersion,
) -> Result<Vec<MemoryBlock>> {
    let mut blocks = Vec::new();
    let mut pos = header_len;

    while pos < data.len() {
        if data.len() < pos + 9 {
            return Err(Error::Format(format!(
                "memory block header truncated at offset {}",
                pos
            )));
        }
        if u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap()) != MAGIC {
            return Err(Error::Format(format!(
                "invalid block magic at offset {}",
                pos
            )));
        }
        // block_len at pos + 4 is not needed for the walk
        if data[pos + 8] != TEST_BYTE {
            return Err(Error::Format(format!(
                "invalid block test byte at offset {}",
                pos + 8
            )));
        }
        pos += 9;

        let size = match version {
            LifVersion::V1 => {
                if data.len() < pos + 4 {
                    return Err(Error::Format("block size truncated".to_string()));
                }
                let size = u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap()) as u64;
                pos += 4;
                size
            }
            LifVersion::V2 => {
                if data.len() < pos + 9 {
                    return Err(Error::Format("block size truncated".to_string()));
                }
                if data[pos] != TEST_BYTE {
                    return Err(Error::Format(format!(
                        "invalid size test byte at offset {}",
                        pos
                    )));
                }
                let size = u64::from_le_bytes(data[pos + 1..pos + 9].try_into().unwrap());
                pos += 9;
                size
            }
        };

        if data.len() < pos + 5 {
            return Err(Error::Format("block id truncated".to_string()));
        }
        if data[pos] != TEST_BYTE {
            return Err(Error::Format(format!(
                "invalid id test byte at offset {}",
                pos
            )));
        }
        let id_chars = u32::from_le_bytes(data[pos + 1..pos + 5].try_into().unwrap()) as usize;
        pos += 5;

        let id_end = pos + id_chars * 2;
        if data.len() < id_end {
            return Err(Error::Format("block id truncated".to_string()));
        }
        let id = decode_utf16le(&data[pos..id_end])?;
        pos = id_end;

        let data_end = pos
            .checked_add(size as usize)
            .ok_or_else(|| Error::Format("block size overflow".to_string()))?;
        if data.len() < data_end {
            return Err(Error::Format(format!(
                "memory block {} overruns file: need {} bytes, have {}",
                id,
                data_end,
                data.len()
            )));
        }

        blocks.push(MemoryBlock {
            id,
            offset: pos as u64,
            size,
        });
        pos = data_end;
    }

    Ok(blocks)
}

fn decode_utf16le(raw: &[u8]) -> Result<String> {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| Error::Format(format!("invalid UTF-16 string: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    fn header_bytes(xml: &str) -> Vec<u8> {
        let encoded = encode_utf16le(xml);
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.extend_from_slice(&((encoded.len() + 5) as u32).to_le_bytes());
        buf.push(TEST_BYTE);
        buf.extend_from_slice(&((xml.encode_utf16().count()) as u32).to_le_bytes());
        buf.extend_from_slice(&encoded);
        buf
    }

    fn v2_block_bytes(id: &str, payload: &[u8]) -> Vec<u8> {
        let id_encoded = encode_utf16le(id);
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.push(TEST_BYTE);
        buf.push(TEST_BYTE);
        buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        buf.push(TEST_BYTE);
        buf.extend_from_slice(&(id.encode_utf16().count() as u32).to_le_bytes());
        buf.extend_from_slice(&id_encoded);
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn test_header_roundtrip() {
        let xml = "<LMSDataContainerHeader Version=\"2\"/>";
        let data = header_bytes(xml);

        assert_eq!(
            metadata_string_chars(&data).unwrap(),
            xml.encode_utf16().count() as u32
        );

        let (decoded, consumed) = read_header(&data).unwrap();
        assert_eq!(decoded, xml);
        assert_eq!(consumed, data.len());
    }

    #[test]
    fn test_bad_magic() {
        let mut data = header_bytes("<x/>");
        data[0] = 0x71;
        assert!(matches!(
            metadata_string_chars(&data),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_bad_test_byte() {
        let mut data = header_bytes("<x/>");
        data[8] = 0;
        assert!(matches!(read_header(&data), Err(Error::Format(_))));
    }

    #[test]
    fn test_truncated_header() {
        let data = header_bytes("<x/>");
        assert!(matches!(
            read_header(&data[..data.len() - 2]),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_scan_v2_blocks() {
        let mut data = header_bytes("<x/>");
        let header_len = data.len();
        data.extend_from_slice(&v2_block_bytes("MemBlock_1", &[1, 2, 3, 4]));
        data.extend_from_slice(&v2_block_bytes("MemBlock_2", &[5, 6]));

        let blocks = scan_memory_blocks(&data, header_len, LifVersion::V2).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].id, "MemBlock_1");
        assert_eq!(blocks[0].size, 4);
        assert_eq!(blocks[1].id, "MemBlock_2");
        assert_eq!(blocks[1].size, 2);

        let start = blocks[0].offset as usize;
        assert_eq!(&data[start..start + 4], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_block_overrun() {
        let mut data = header_bytes("<x/>");
        let header_len = data.len();
        let mut block = v2_block_bytes("MemBlock_1", &[1, 2, 3, 4]);
        block.truncate(block.len() - 2);
        data.extend_from_slice(&block);

        assert!(matches!(
            scan_memory_blocks(&data, header_len, LifVersion::V2),
            Err(Error::Format(_))
        ));
    }
}
