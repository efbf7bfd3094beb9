//! Dense timepoint-by-statistic table built by the processing engine.

use serde::Serialize;

use crate::{Error, Result};

/// Statistics table: one row per timepoint, one column per
/// (position, statistic) pair. Unobserved cells hold NaN.
#[derive(Debug, Clone, Serialize)]
pub struct StatsTable {
    row_times: Vec<f64>,
    columns: Vec<(String, String)>,
    values: Vec<f64>,
}

impl StatsTable {
    /// NaN-filled table over the given timepoints and columns.
    pub fn new(row_times: Vec<f64>, columns: Vec<(String, String)>) -> Self {
        let values = vec![f64::NAN; row_times.len() * columns.len()];
        Self {
            row_times,
            columns,
            values,
        }
    }

    /// Row timepoints, in order.
    pub fn times(&self) -> &[f64] {
        &self.row_times
    }

    /// Column labels as (position, statistic) pairs.
    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }

    /// Set one cell. Timepoints are matched exactly: every time in the
    /// table comes from the same name parser as the lookups, so values are
    /// bit-identical.
    pub fn set(&mut self, time: f64, position: &str, stat: &str, value: f64) -> Result<()> {
        let row = self.row_index(time).ok_or_else(|| {
            Error::Selection(format!("no table row for timepoint {}", time))
        })?;
        let col = self.column_index(position, stat).ok_or_else(|| {
            Error::Selection(format!("no table column for {}/{}", position, stat))
        })?;
        self.values[row * self.columns.len() + col] = value;
        Ok(())
    }

    /// Read one cell, if the row and column exist.
    pub fn get(&self, time: f64, position: &str, stat: &str) -> Option<f64> {
        let row = self.row_index(time)?;
        let col = self.column_index(position, stat)?;
        Some(self.values[row * self.columns.len() + col])
    }

    /// Write the table as CSV: a `time` column followed by one
    /// `position/stat` column per pair. NaN cells are left empty.
    pub fn to_csv<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        write!(writer, "time")?;
        for (position, stat) in &self.columns {
            write!(writer, ",{}/{}", position, stat)?;
        }
        writeln!(writer)?;

        for (row, time) in self.row_times.iter().enumerate() {
            write!(writer, "{}", time)?;
            for col in 0..self.columns.len() {
                let value = self.values[row * self.columns.len() + col];
                if value.is_nan() {
                    write!(writer, ",")?;
                } else {
                    write!(writer, ",{}", value)?;
                }
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    fn row_index(&self, time: f64) -> Option<usize> {
        self.row_times
            .iter()
            .position(|t| t.to_bits() == time.to_bits())
    }

    fn column_index(&self, position: &str, stat: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|(p, s)| p == position && s == stat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> StatsTable {
        StatsTable::new(
            vec![0.0, 4.0, 5.0],
            vec![
                ("Pos001".to_string(), "min_max".to_string()),
                ("Pos001".to_string(), "slope".to_string()),
            ],
        )
    }

    #[test]
    fn test_set_get() {
        let mut table = sample_table();
        table.set(4.0, "Pos001", "min_max", 0.25).unwrap();

        assert_eq!(table.get(4.0, "Pos001", "min_max"), Some(0.25));
        assert!(table.get(0.0, "Pos001", "min_max").unwrap().is_nan());
        assert_eq!(table.get(4.0, "Pos002", "min_max"), None);
    }

    #[test]
    fn test_set_unknown_row() {
        let mut table = sample_table();
        assert!(matches!(
            table.set(7.0, "Pos001", "min_max", 1.0),
            Err(Error::Selection(_))
        ));
        assert!(matches!(
            table.set(4.0, "Pos001", "missing", 1.0),
            Err(Error::Selection(_))
        ));
    }

    #[test]
    fn test_csv_output() {
        let mut table = sample_table();
        table.set(0.0, "Pos001", "min_max", 0.5).unwrap();
        table.set(4.0, "Pos001", "slope", 1.25).unwrap();

        let mut out = Vec::new();
        table.to_csv(&mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();

        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "time,Pos001/min_max,Pos001/slope");
        assert_eq!(lines[1], "0,0.5,");
        assert_eq!(lines[2], "4,,1.25");
        assert_eq!(lines[3], "5,,");
    }

    #[test]
    fn test_json_nan_becomes_null() {
        let table = sample_table();
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("null"));
    }
}
