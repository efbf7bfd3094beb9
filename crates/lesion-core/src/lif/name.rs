//! Series-name grammar for mark-and-find acquisitions.
//!
//! Time-lapse series are named `Pos<N>_<start>-<end>hpl`: stage position
//! followed by the imaged interval in hours post lesion, one frame per hour
//! inclusive. The pre-lesion reference acquisition is named `Pos<N>_pre` and
//! maps to a single 0.0 h timepoint.

use crate::{Error, Result};

/// Split a series name into its stage position and the acquisition
/// timepoints in hours.
pub fn parse_series_name(name: &str) -> Result<(String, Vec<f64>)> {
    let bad = || Error::SeriesName(name.to_string());

    let (position, suffix) = name.split_once('_').ok_or_else(bad)?;
    let digits = position.strip_prefix("Pos").ok_or_else(bad)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }

    if suffix == "pre" {
        return Ok((position.to_string(), vec![0.0]));
    }

    let range = suffix.strip_suffix("hpl").ok_or_else(bad)?;
    let (start, end) = range.split_once('-').ok_or_else(bad)?;
    let start: u32 = start.parse().map_err(|_| bad())?;
    let end: u32 = end.parse().map_err(|_| bad())?;
    if start > end {
        return Err(bad());
    }

    let times = (start..=end).map(f64::from).collect();
    Ok((position.to_string(), times))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_lapse_name() {
        let (position, times) = parse_series_name("Pos007_4-14hpl").unwrap();
        assert_eq!(position, "Pos007");
        assert_eq!(times.len(), 11);
        assert_eq!(times[0], 4.0);
        assert_eq!(times[10], 14.0);
    }

    #[test]
    fn test_pre_lesion_name() {
        let (position, times) = parse_series_name("Pos007_pre").unwrap();
        assert_eq!(position, "Pos007");
        assert_eq!(times, vec![0.0]);
    }

    #[test]
    fn test_bad_names() {
        for name in [
            "Totally wrong string",
            "Series016",
            "Pos_4-14hpl",
            "PosX_4-14hpl",
            "Pos007_14-4hpl",
            "Pos007_4-14",
            "Pos007",
        ] {
            assert!(
                matches!(parse_series_name(name), Err(Error::SeriesName(_))),
                "expected rejection for {:?}",
                name
            );
        }
    }
}
