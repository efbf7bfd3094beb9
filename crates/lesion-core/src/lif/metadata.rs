//! Metadata model parsed from the XML document embedded in a LIF container.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use tracing::debug;

use super::format::LifVersion;
use crate::{Error, Result};

/// Number of elements along each acquisition axis. Absent axes report 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub t: usize,
    pub z: usize,
    pub y: usize,
    pub x: usize,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            t: 1,
            z: 1,
            y: 1,
            x: 1,
        }
    }
}

/// Step size along each spatial axis, in micrometres. Axes with a single
/// element report 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resolution {
    pub z: f64,
    pub y: f64,
    pub x: f64,
}

/// Description of one image series
#[derive(Debug, Clone, Serialize)]
pub struct SeriesMetadata {
    /// Series name as recorded by the acquisition software
    pub name: String,

    /// Axis extents
    pub dims: Dimensions,

    /// Physical step sizes (z, y, x) in micrometres
    pub resolution: Resolution,

    /// Number of channels
    pub channels: usize,

    /// Sample bit depth (8 or 16)
    pub bits_per_pixel: u16,

    /// Memory block holding this series' pixel data
    pub memory_block_id: String,
}

impl SeriesMetadata {
    /// Number of pixels in one plane
    pub fn plane_len(&self) -> usize {
        self.dims.y * self.dims.x
    }

    /// Total number of planes across t, z and channels
    pub fn plane_count(&self) -> usize {
        self.dims.t * self.dims.z * self.channels
    }

    /// Bytes per pixel sample
    pub fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel / 8) as usize
    }

    /// Expected pixel data size in bytes
    pub fn expected_bytes(&self) -> u64 {
        (self.plane_count() * self.plane_len() * self.bytes_per_pixel()) as u64
    }
}

/// Parsed metadata for a whole container
#[derive(Debug, Clone, Serialize)]
pub struct LifMetadata {
    /// Container version
    pub version: LifVersion,

    /// Image series, in document order
    pub series: Vec<SeriesMetadata>,
}

impl LifMetadata {
    /// Parse the embedded XML document.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);

        let mut version = None;
        let mut element_names: Vec<String> = Vec::new();
        let mut pending: Option<SeriesBuilder> = None;
        let mut series = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Eof => break,
                Event::Start(e) => {
                    match e.name().as_ref() {
                        b"LMSDataContainerHeader" => {
                            version = Some(parse_version(&e)?);
                        }
                        b"Element" => {
                            element_names.push(attr_string(&e, b"Name")?.unwrap_or_default());
                        }
                        b"Image" => {
                            let name = element_names.last().cloned().unwrap_or_default();
                            pending = Some(SeriesBuilder::new(name));
                        }
                        _ => handle_leaf(&e, &mut pending)?,
                    };
                }
                Event::Empty(e) => handle_leaf(&e, &mut pending)?,
                Event::End(e) => {
                    if e.name().as_ref() == b"Element" {
                        element_names.pop();
                        if let Some(builder) = pending.take() {
                            series.push(builder.build()?);
                        }
                    }
                }
                _ => {}
            }
        }

        let version = version
            .ok_or_else(|| Error::Metadata("missing LMSDataContainerHeader element".to_string()))?;

        debug!(series = series.len(), ?version, "parsed container metadata");
        Ok(Self { version, series })
    }

    /// Series names, in document order.
    pub fn names(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.name.as_str()).collect()
    }

    /// Per-series axis extents as (t, z, y, x, c).
    pub fn sizes(&self) -> Vec<(usize, usize, usize, usize, usize)> {
        self.series
            .iter()
            .map(|s| (s.dims.t, s.dims.z, s.dims.y, s.dims.x, s.channels))
            .collect()
    }

    /// Per-series physical step sizes as (z, y, x) in micrometres.
    pub fn resolutions(&self) -> Vec<(f64, f64, f64)> {
        self.series
            .iter()
            .map(|s| (s.resolution.z, s.resolution.y, s.resolution.x))
            .collect()
    }

    /// Number of series in the container.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// True when the container describes no series.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

fn handle_leaf(e: &BytesStart<'_>, pending: &mut Option<SeriesBuilder>) -> Result<()> {
    let Some(builder) = pending.as_mut() else {
        return Ok(());
    };
    match e.name().as_ref() {
        b"DimensionDescription" => builder.add_dimension(e),
        b"ChannelDescription" => builder.add_channel(e),
        b"Memory" => builder.set_memory(e),
        _ => Ok(()),
    }
}

fn parse_version(e: &BytesStart<'_>) -> Result<LifVersion> {
    match attr_string(e, b"Version")?.as_deref() {
        Some("1") => Ok(LifVersion::V1),
        Some("2") => Ok(LifVersion::V2),
        Some(other) => Err(Error::Metadata(format!(
            "unsupported container version: {}",
            other
        ))),
        None => Err(Error::Metadata("missing container version".to_string())),
    }
}

fn attr_string(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Metadata(err.to_string()))?;
        if attr.key.as_ref() == key {
            return Ok(Some(String::from_utf8_lossy(&attr.value).into_owned()));
        }
    }
    Ok(None)
}

fn attr_parse<T: std::str::FromStr>(e: &BytesStart<'_>, key: &[u8], what: &str) -> Result<T> {
    let raw = attr_string(e, key)?
        .ok_or_else(|| Error::Metadata(format!("missing {} attribute", what)))?;
    raw.parse()
        .map_err(|_| Error::Metadata(format!("invalid {} attribute: {}", what, raw)))
}

struct SeriesBuilder {
    name: String,
    dims: Dimensions,
    lengths: [Option<f64>; 4],
    channels: usize,
    bits_per_pixel: Option<u16>,
    memory_block_id: Option<String>,
}

impl SeriesBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            dims: Dimensions::default(),
            lengths: [None; 4],
            channels: 0,
            bits_per_pixel: None,
            memory_block_id: None,
        }
    }

    fn add_dimension(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let dim_id: u32 = attr_parse(e, b"DimID", "DimID")?;
        let elements: usize = attr_parse(e, b"NumberOfElements", "NumberOfElements")?;
        let length: f64 = attr_parse(e, b"Length", "Length")?;
        match dim_id {
            1 => {
                self.dims.x = elements;
                self.lengths[0] = Some(length);
            }
            2 => {
                self.dims.y = elements;
                self.lengths[1] = Some(length);
            }
            3 => {
                self.dims.z = elements;
                self.lengths[2] = Some(length);
            }
            4 => {
                self.dims.t = elements;
                self.lengths[3] = Some(length);
            }
            // Other DimIDs (rotation, mosaic tile) are not modelled
            _ => {}
        }
        Ok(())
    }

    fn add_channel(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let bits: u16 = attr_parse(e, b"Resolution", "channel Resolution")?;
        if bits != 8 && bits != 16 {
            return Err(Error::Metadata(format!(
                "unsupported bit depth for series {}: {}",
                self.name, bits
            )));
        }
        match self.bits_per_pixel {
            Some(existing) if existing != bits => {
                return Err(Error::Metadata(format!(
                    "mixed channel bit depths for series {}",
                    self.name
                )));
            }
            _ => self.bits_per_pixel = Some(bits),
        }
        self.channels += 1;
        Ok(())
    }

    fn set_memory(&mut self, e: &BytesStart<'_>) -> Result<()> {
        self.memory_block_id = attr_string(e, b"MemoryBlockID")?;
        Ok(())
    }

    fn build(self) -> Result<SeriesMetadata> {
        if self.channels == 0 {
            return Err(Error::Metadata(format!(
                "series {} declares no channels",
                self.name
            )));
        }
        let memory_block_id = self.memory_block_id.ok_or_else(|| {
            Error::Metadata(format!("series {} has no memory block", self.name))
        })?;

        // Step size in um; a length attribute covers the full axis extent in
        // metres, spread over (elements - 1) steps.
        let step = |elements: usize, length: Option<f64>| -> f64 {
            match (elements, length) {
                (n, Some(len)) if n > 1 => len.abs() / (n - 1) as f64 * 1e6,
                _ => 0.0,
            }
        };

        Ok(SeriesMetadata {
            resolution: Resolution {
                z: step(self.dims.z, self.lengths[2]),
                y: step(self.dims.y, self.lengths[1]),
                x: step(self.dims.x, self.lengths[0]),
            },
            name: self.name,
            dims: self.dims,
            channels: self.channels,
            bits_per_pixel: self.bits_per_pixel.unwrap_or(16),
            memory_block_id,
        })
    }
}
