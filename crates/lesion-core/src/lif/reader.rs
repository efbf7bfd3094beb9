//! Reader tying container structure, metadata and pixel data together.

use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use super::format::{read_header, scan_memory_blocks, MemoryBlock};
use super::metadata::{LifMetadata, SeriesMetadata};
use crate::image::{ImageStack, Plane};
use crate::{Error, Result};

/// Restriction of which planes to decode from a series.
///
/// The default selection decodes every channel and z-slice.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selection {
    /// Decode only this channel
    pub channel: Option<usize>,

    /// Decode only this z-slice
    pub z: Option<usize>,
}

impl Selection {
    /// Select a single channel, all z-slices.
    pub fn channel(channel: usize) -> Self {
        Self {
            channel: Some(channel),
            z: None,
        }
    }

    /// Select a single z-slice, all channels.
    pub fn z(z: usize) -> Self {
        Self {
            channel: None,
            z: Some(z),
        }
    }
}

/// Reader over one LIF container.
///
/// Holds the whole file in memory; plane decoding is deferred until a series
/// is requested.
pub struct LifReader {
    data: Bytes,
    metadata: LifMetadata,
    blocks: HashMap<String, MemoryBlock>,
}

impl LifReader {
    /// Open a container from a file on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Open a container from raw bytes.
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();

        let (xml, header_len) = read_header(&data)?;
        let metadata = LifMetadata::parse(&xml)?;
        let blocks = scan_memory_blocks(&data, header_len, metadata.version)?;
        let blocks: HashMap<String, MemoryBlock> =
            blocks.into_iter().map(|b| (b.id.clone(), b)).collect();

        // Every series must resolve to a block that can hold its planes.
        for series in &metadata.series {
            let block = blocks.get(&series.memory_block_id).ok_or_else(|| {
                Error::Metadata(format!(
                    "series {} references unknown memory block {}",
                    series.name, series.memory_block_id
                ))
            })?;
            if block.size < series.expected_bytes() {
                return Err(Error::Format(format!(
                    "memory block {} holds {} bytes, series {} needs {}",
                    block.id,
                    block.size,
                    series.name,
                    series.expected_bytes()
                )));
            }
        }

        debug!(
            series = metadata.len(),
            blocks = blocks.len(),
            bytes = data.len(),
            "opened LIF container"
        );

        Ok(Self {
            data,
            metadata,
            blocks,
        })
    }

    /// Container metadata.
    pub fn metadata(&self) -> &LifMetadata {
        &self.metadata
    }

    /// Decode the pixel data of one series into a stack.
    ///
    /// Planes inside a memory block are stored channel-fastest: plane index
    /// `(t * z_count + z) * channel_count + c`. 8-bit samples are widened to
    /// `u16` unscaled.
    pub fn series_stack(&self, series_idx: usize, selection: Selection) -> Result<ImageStack> {
        let series = self.series_metadata(series_idx)?;

        let channels: Vec<usize> = match selection.channel {
            Some(c) if c >= series.channels => {
                return Err(Error::ChannelOutOfRange {
                    requested: c,
                    available: series.channels,
                });
            }
            Some(c) => vec![c],
            None => (0..series.channels).collect(),
        };
        let z_slices: Vec<usize> = match selection.z {
            Some(z) if z >= series.dims.z => {
                return Err(Error::Selection(format!(
                    "z-slice {} out of range ({} slices in series {})",
                    z, series.dims.z, series.name
                )));
            }
            Some(z) => vec![z],
            None => (0..series.dims.z).collect(),
        };

        let block = &self.blocks[&series.memory_block_id];
        let plane_len = series.plane_len();
        let plane_bytes = plane_len * series.bytes_per_pixel();

        let mut planes = Vec::with_capacity(series.dims.t * z_slices.len() * channels.len());
        for t in 0..series.dims.t {
            for &z in &z_slices {
                for &c in &channels {
                    let plane_idx = (t * series.dims.z + z) * series.channels + c;
                    let start = block.offset as usize + plane_idx * plane_bytes;
                    let raw = &self.data[start..start + plane_bytes];

                    let pixels: Vec<u16> = match series.bytes_per_pixel() {
                        1 => raw.iter().map(|&b| b as u16).collect(),
                        _ => raw
                            .chunks_exact(2)
                            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                            .collect(),
                    };
                    planes.push(Plane::new(series.dims.x, series.dims.y, pixels)?);
                }
            }
        }

        debug!(
            series = series.name.as_str(),
            planes = planes.len(),
            "decoded series"
        );

        ImageStack::new(
            series.dims.t,
            z_slices.len(),
            channels.len(),
            series.dims.x,
            series.dims.y,
            planes,
        )
    }

    /// Lazily decode the selected series in order.
    pub fn series_iter(&self, series_indices: Vec<usize>, selection: Selection) -> SeriesIter<'_> {
        SeriesIter {
            reader: self,
            indices: series_indices.into_iter(),
            selection,
        }
    }

    fn series_metadata(&self, series_idx: usize) -> Result<&SeriesMetadata> {
        self.metadata
            .series
            .get(series_idx)
            .ok_or(Error::SeriesNotFound {
                requested: series_idx,
                available: self.metadata.len(),
            })
    }
}

/// Iterator over selected series, decoding each stack on demand
pub struct SeriesIter<'a> {
    reader: &'a LifReader,
    indices: std::vec::IntoIter<usize>,
    selection: Selection,
}

impl Iterator for SeriesIter<'_> {
    type Item = Result<(SeriesMetadata, ImageStack)>;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.indices.next()?;
        let result = self.reader.series_metadata(idx).cloned().and_then(|meta| {
            let stack = self.reader.series_stack(idx, self.selection)?;
            Ok((meta, stack))
        });
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lif::format::{MAGIC, TEST_BYTE};

    fn encode_utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    /// Build a version-2 container with one two-channel series of 2x2
    /// planes: 2 timepoints, 2 z-slices.
    fn sample_container() -> Vec<u8> {
        // 8 planes of 4 u16 samples; plane i holds samples i*10 .. i*10+3
        let mut payload = Vec::new();
        for plane in 0u16..8 {
            for px in 0u16..4 {
                payload.extend_from_slice(&(plane * 10 + px).to_le_bytes());
            }
        }
        container_with_payload(&payload)
    }

    fn container_with_payload(payload: &[u8]) -> Vec<u8> {
        let xml = r#"<LMSDataContainerHeader Version="2">
          <Element Name="Pos001_4-5hpl">
            <Data><Image>
              <ChannelDescription Resolution="16"/>
              <ChannelDescription Resolution="16"/>
              <DimensionDescription DimID="1" NumberOfElements="2" Length="1e-06"/>
              <DimensionDescription DimID="2" NumberOfElements="2" Length="1e-06"/>
              <DimensionDescription DimID="3" NumberOfElements="2" Length="1e-06"/>
              <DimensionDescription DimID="4" NumberOfElements="2" Length="7200"/>
            </Image></Data>
            <Memory Size="64" MemoryBlockID="MemBlock_1"/>
          </Element>
        </LMSDataContainerHeader>"#;

        let mut buf = Vec::new();
        let encoded = encode_utf16le(xml);
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.extend_from_slice(&((encoded.len() + 5) as u32).to_le_bytes());
        buf.push(TEST_BYTE);
        buf.extend_from_slice(&(xml.encode_utf16().count() as u32).to_le_bytes());
        buf.extend_from_slice(&encoded);

        let id = encode_utf16le("MemBlock_1");
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.push(TEST_BYTE);
        buf.push(TEST_BYTE);
        buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        buf.push(TEST_BYTE);
        buf.extend_from_slice(&("MemBlock_1".encode_utf16().count() as u32).to_le_bytes());
        buf.extend_from_slice(&id);
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn test_open_and_decode() {
        let reader = LifReader::from_bytes(sample_container()).unwrap();
        assert_eq!(reader.metadata().names(), vec!["Pos001_4-5hpl"]);

        let stack = reader.series_stack(0, Selection::default()).unwrap();
        assert_eq!(stack.plane_count(), 8);

        // plane (t=1, z=0, c=1) is stored plane 5
        let plane = stack.plane(1, 0, 1).unwrap();
        assert_eq!(plane.pixels(), &[50, 51, 52, 53]);
    }

    #[test]
    fn test_channel_selection() {
        let reader = LifReader::from_bytes(sample_container()).unwrap();
        let stack = reader.series_stack(0, Selection::channel(1)).unwrap();
        assert_eq!(stack.channels(), 1);
        assert_eq!(stack.plane_count(), 4);

        // (t=0, z=1, c=1) is stored plane 3; selected stack sees it at c=0
        let plane = stack.plane(0, 1, 0).unwrap();
        assert_eq!(plane.pixels(), &[30, 31, 32, 33]);
    }

    #[test]
    fn test_z_selection() {
        let reader = LifReader::from_bytes(sample_container()).unwrap();
        let stack = reader.series_stack(0, Selection::z(1)).unwrap();
        assert_eq!(stack.z_slices(), 1);
        assert_eq!(stack.channels(), 2);
        assert_eq!(stack.plane_count(), 4);

        // (t=0, z=1, c=1) is stored plane 3; selected stack sees it at z=0
        let plane = stack.plane(0, 0, 1).unwrap();
        assert_eq!(plane.pixels(), &[30, 31, 32, 33]);
    }

    #[test]
    fn test_z_out_of_range() {
        let reader = LifReader::from_bytes(sample_container()).unwrap();
        assert!(matches!(
            reader.series_stack(0, Selection::z(2)),
            Err(Error::Selection(_))
        ));
    }

    #[test]
    fn test_series_out_of_range() {
        let reader = LifReader::from_bytes(sample_container()).unwrap();
        assert!(matches!(
            reader.series_stack(3, Selection::default()),
            Err(Error::SeriesNotFound {
                requested: 3,
                available: 1
            })
        ));
    }

    #[test]
    fn test_channel_out_of_range() {
        let reader = LifReader::from_bytes(sample_container()).unwrap();
        assert!(matches!(
            reader.series_stack(0, Selection::channel(2)),
            Err(Error::ChannelOutOfRange { .. })
        ));
    }

    #[test]
    fn test_block_too_small_for_series() {
        // the series needs 64 bytes of pixel data
        let data = container_with_payload(&[0u8; 56]);
        assert!(matches!(
            LifReader::from_bytes(data),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_series_iter() {
        let reader = LifReader::from_bytes(sample_container()).unwrap();
        let collected: Vec<_> = reader
            .series_iter(vec![0], Selection::channel(0))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].0.name, "Pos001_4-5hpl");
        assert_eq!(collected[0].1.channels(), 1);
    }
}
