//! Per-frame `frame_id,timestamp` CSV log and its post-hoc check.

use std::{fs::File, io::Write, path::Path};

use spinmouse_ci::ChunkData;

use crate::Result;

/// Writes one `frame_id,timestamp` row per saved frame. There is no header.
pub struct TimestampLog {
    wtr: csv::Writer<File>,
    n_rows: u64,
}

impl TimestampLog {
    /// Create the log file. An existing file is never overwritten.
    pub fn create(path: &Path) -> Result<Self> {
        let fd = File::options().write(true).create_new(true).open(path)?;
        let wtr = csv::WriterBuilder::new().has_headers(false).from_writer(fd);
        Ok(Self { wtr, n_rows: 0 })
    }

    /// Append a row. A frame without chunk data gives a row of empty fields.
    pub fn write(&mut self, chunk: Option<&ChunkData>) -> Result<()> {
        let row = (chunk.map(|c| c.frame_id), chunk.map(|c| c.timestamp));
        self.wtr.serialize(row)?;
        self.n_rows += 1;
        Ok(())
    }

    pub fn close(mut self) -> Result<u64> {
        self.wtr.flush()?;
        let mut fd = self.wtr.into_inner().map_err(|e| e.into_error())?;
        fd.flush()?;
        Ok(self.n_rows)
    }
}

/// A run of missing frame IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGap {
    /// Last frame ID before the gap.
    pub after_frame_id: i64,
    pub missing: u64,
    /// Timestamp difference across the gap, in camera ticks.
    pub interval: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestampReport {
    pub n_rows: u64,
    /// Rows with empty fields.
    pub n_without_chunk: u64,
    pub first_frame_id: Option<i64>,
    pub last_frame_id: Option<i64>,
    pub gaps: Vec<FrameGap>,
    /// Number of times the frame ID did not increase.
    pub resets: u64,
}

impl TimestampReport {
    pub fn total_missing(&self) -> u64 {
        self.gaps.iter().map(|g| g.missing).sum()
    }
}

impl std::fmt::Display for TimestampReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for gap in &self.gaps {
            write!(
                f,
                "gap after frame {}: {} missing",
                gap.after_frame_id, gap.missing
            )?;
            if let Some(interval) = gap.interval {
                write!(f, ", interval {interval} ticks")?;
            }
            writeln!(f)?;
        }
        let fmt_id = |id: Option<i64>| id.map_or_else(|| "-".to_string(), |id| id.to_string());
        writeln!(
            f,
            "rows: {}  |  without chunk data: {}  |  frame IDs {} to {}",
            self.n_rows,
            self.n_without_chunk,
            fmt_id(self.first_frame_id),
            fmt_id(self.last_frame_id)
        )?;
        write!(
            f,
            "gaps: {}  |  missing frames: {}  |  counter resets: {}",
            self.gaps.len(),
            self.total_missing(),
            self.resets
        )
    }
}

/// Scan a timestamp log for frame ID gaps.
pub fn analyze_timestamps(path: &Path) -> Result<TimestampReport> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    analyze_reader(rdr)
}

fn analyze_reader<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<TimestampReport> {
    let mut report = TimestampReport::default();
    let mut last: Option<(i64, Option<i64>)> = None;
    for row in rdr.deserialize() {
        let (frame_id, timestamp): (Option<i64>, Option<i64>) = row?;
        report.n_rows += 1;
        let Some(frame_id) = frame_id else {
            report.n_without_chunk += 1;
            continue;
        };
        if report.first_frame_id.is_none() {
            report.first_frame_id = Some(frame_id);
        }
        report.last_frame_id = Some(frame_id);
        if let Some((last_id, last_ts)) = last {
            if frame_id <= last_id {
                report.resets += 1;
            } else if frame_id - last_id > 1 {
                report.gaps.push(FrameGap {
                    after_frame_id: last_id,
                    missing: (frame_id - last_id - 1) as u64,
                    interval: timestamp.zip(last_ts).map(|(t, lt)| t - lt),
                });
            }
        }
        last = Some((frame_id, timestamp));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(frame_id: i64) -> ChunkData {
        ChunkData {
            frame_id,
            timestamp: frame_id * 1000,
        }
    }

    #[test]
    fn log_rows_and_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let mut log = TimestampLog::create(&path).unwrap();
        for id in [0, 1, 2, 5, 6] {
            log.write(Some(&chunk(id))).unwrap();
        }
        log.write(None).unwrap();
        log.write(Some(&chunk(8))).unwrap();
        assert_eq!(log.close().unwrap(), 7);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("0,0\n1,1000\n"), "{contents}");
        assert!(contents.contains("\n,\n"), "{contents}");

        let report = analyze_timestamps(&path).unwrap();
        assert_eq!(report.n_rows, 7);
        assert_eq!(report.n_without_chunk, 1);
        assert_eq!(report.first_frame_id, Some(0));
        assert_eq!(report.last_frame_id, Some(8));
        assert_eq!(
            report.gaps,
            vec![
                FrameGap {
                    after_frame_id: 2,
                    missing: 2,
                    interval: Some(3000),
                },
                FrameGap {
                    after_frame_id: 6,
                    missing: 1,
                    interval: Some(2000),
                },
            ]
        );
        assert_eq!(report.total_missing(), 3);
        assert!(report.to_string().contains("gap after frame 2: 2 missing"));
    }

    #[test]
    fn existing_log_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "1,2\n").unwrap();
        assert!(TimestampLog::create(&path).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1,2\n");
    }

    #[test]
    fn counter_reset_is_not_a_gap() {
        let rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader("5,50\n6,60\n0,70\n1,80\n".as_bytes());
        let report = analyze_reader(rdr).unwrap();
        assert!(report.gaps.is_empty());
        assert_eq!(report.resets, 1);
    }
}
