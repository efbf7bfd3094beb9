//! PNG conversion of image series.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::image::Plane;
use crate::lif::reader::{LifReader, Selection};
use crate::{Error, Result};

/// Write one plane as a 16-bit grayscale PNG.
pub fn write_png(plane: &Plane, path: &Path) -> Result<()> {
    if plane.width() == 0 || plane.height() == 0 {
        return Err(Error::Export(format!(
            "refusing to write empty image {}",
            path.display()
        )));
    }

    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(
        BufWriter::new(file),
        plane.width() as u32,
        plane.height() as u32,
    );
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::Sixteen);

    let mut writer = encoder.write_header()?;
    let mut data = Vec::with_capacity(plane.pixels().len() * 2);
    for px in plane.pixels() {
        data.extend_from_slice(&px.to_be_bytes());
    }
    writer.write_image_data(&data)?;
    Ok(())
}

/// Convert the selected series of a container to PNG files.
///
/// Each series is z-projected on `channel` and written one file per
/// timepoint, named `<stem>-<series_idx>-<name>.png` with a `-tNN` suffix
/// when the series holds more than one timepoint. With `z_slice` set, the
/// projection covers just that slice. Returns the written paths.
pub fn convert_series(
    reader: &LifReader,
    series: &[usize],
    channel: usize,
    z_slice: Option<usize>,
    out_dir: &Path,
    stem: &str,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;

    let selection = Selection {
        channel: Some(channel),
        z: z_slice,
    };
    let mut written = Vec::new();
    for &idx in series {
        let stack = reader.series_stack(idx, selection)?;
        let frames = stack.sum_project_z(0)?;
        let name = &reader.metadata().series[idx].name;

        for (t, frame) in frames.iter().enumerate() {
            let path = out_dir.join(series_file_name(stem, idx, name, t, frames.len() > 1));
            write_png(frame, &path)?;
            debug!(path = %path.display(), "wrote frame");
            written.push(path);
        }
    }

    info!(files = written.len(), out_dir = %out_dir.display(), "conversion complete");
    Ok(written)
}

fn series_file_name(stem: &str, idx: usize, name: &str, t: usize, multi_frame: bool) -> String {
    let name: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    if multi_frame {
        format!("{}-{:02}-{}-t{:02}.png", stem, idx, name, t)
    } else {
        format!("{}-{:02}-{}.png", stem, idx, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_png_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frame.png");

        let pixels: Vec<u16> = (0..12).map(|i| i * 5000).collect();
        let plane = Plane::new(4, 3, pixels.clone()).unwrap();
        write_png(&plane, &path).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();

        assert_eq!(info.width, 4);
        assert_eq!(info.height, 3);
        assert_eq!(info.bit_depth, png::BitDepth::Sixteen);
        assert_eq!(info.color_type, png::ColorType::Grayscale);

        let decoded: Vec<u16> = buf[..info.buffer_size()]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn test_rejects_empty_plane() {
        let dir = TempDir::new().unwrap();
        let plane = Plane::zeroed(0, 0);
        assert!(matches!(
            write_png(&plane, &dir.path().join("empty.png")),
            Err(Error::Export(_))
        ));
    }

    #[test]
    fn test_file_naming() {
        assert_eq!(
            series_file_name("exp", 3, "Pos001_pre", 0, false),
            "exp-03-Pos001_pre.png"
        );
        assert_eq!(
            series_file_name("exp", 3, "Pos001_4-14hpl", 2, true),
            "exp-03-Pos001_4-14hpl-t02.png"
        );
        assert_eq!(
            series_file_name("exp", 0, "a/b", 0, false),
            "exp-00-a_b.png"
        );
    }
}
