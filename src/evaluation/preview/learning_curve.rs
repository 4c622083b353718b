use crate::error::Result;
use crate::evaluation::Snapshot;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveFormat {
    Csv,
    Tsv,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct LearningCurve {
    entries: Vec<Snapshot>,
}

impl LearningCurve {
    pub fn push(&mut self, snapshot: Snapshot) {
        self.entries.push(snapshot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.entries.last().copied()
    }

    pub fn entries(&self) -> &[Snapshot] {
        &self.entries
    }

    pub fn export<P: AsRef<Path>>(&self, path: P, fmt: CurveFormat) -> Result<()> {
        match fmt {
            CurveFormat::Csv => self.export_with_delimiter(path, ','),
            CurveFormat::Tsv => self.export_with_delimiter(path, '\t'),
            CurveFormat::Json => self.export_json(path),
        }
    }

    fn export_with_delimiter<P: AsRef<Path>>(&self, path: P, delimiter: char) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(
            w,
            "windows_seen{d}instances_seen{d}loss{d}mean_loss{d}seconds",
            d = delimiter
        )?;
        for s in &self.entries {
            writeln!(
                w,
                "{}{d}{}{d}{:.12}{d}{:.12}{d}{:.6}",
                s.windows_seen,
                s.instances_seen,
                s.loss,
                s.mean_loss,
                s.seconds,
                d = delimiter
            )?;
        }
        w.flush()?;
        Ok(())
    }

    /// `NaN` losses are written as `null`.
    fn export_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, &self.entries)?;
        writeln!(w)?;
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::fs;
    use tempfile::NamedTempFile;

    fn snap(windows: u64, seen: u64, loss: f64, mean: f64, secs: f64) -> Snapshot {
        Snapshot {
            windows_seen: windows,
            instances_seen: seen,
            loss,
            mean_loss: mean,
            seconds: secs,
        }
    }

    fn two_rows() -> LearningCurve {
        let mut lc = LearningCurve::default();
        lc.push(snap(1, 10, 0.5, 0.5, 2.5));
        lc.push(snap(2, 20, 0.25, 0.375, 3.0));
        lc
    }

    #[test]
    fn default_is_empty_and_latest_none() {
        let lc = LearningCurve::default();
        assert!(lc.is_empty());
        assert!(lc.latest().is_none());
    }

    #[test]
    fn latest_tracks_last_push() {
        let lc = two_rows();
        assert_eq!(lc.len(), 2);
        assert_eq!(lc.latest(), Some(snap(2, 20, 0.25, 0.375, 3.0)));
    }

    #[test]
    fn export_csv_with_two_rows() {
        let tf = NamedTempFile::new().unwrap();
        two_rows().export(tf.path(), CurveFormat::Csv).unwrap();

        let got = fs::read_to_string(tf.path()).unwrap();
        let exp = "\
windows_seen,instances_seen,loss,mean_loss,seconds
1,10,0.500000000000,0.500000000000,2.500000
2,20,0.250000000000,0.375000000000,3.000000
";
        assert_eq!(got, exp);
    }

    #[test]
    fn export_tsv_header() {
        let tf = NamedTempFile::new().unwrap();
        LearningCurve::default().export(tf.path(), CurveFormat::Tsv).unwrap();
        let got = fs::read_to_string(tf.path()).unwrap();
        assert_eq!(got, "windows_seen\tinstances_seen\tloss\tmean_loss\tseconds\n");
    }

    #[test]
    fn export_json_writes_nan_as_null() {
        let mut lc = two_rows();
        lc.push(snap(3, 30, f64::NAN, 0.375, 3.5));

        let tf = NamedTempFile::new().unwrap();
        lc.export(tf.path(), CurveFormat::Json).unwrap();

        let v: Value = serde_json::from_str(&fs::read_to_string(tf.path()).unwrap()).unwrap();
        let rows = v.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["instances_seen"], 10);
        assert_eq!(rows[1]["mean_loss"], 0.375);
        assert!(rows[2]["loss"].is_null());
    }
}
