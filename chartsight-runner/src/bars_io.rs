//! CSV import/export of bar series.
//!
//! Columns follow `OhlcBar` field order:
//! `index,timestamp,open,high,low,close,volume_proxy,source_position`,
//! with RFC 3339 timestamps. Rows are validated on read; a bar that breaks
//! `low <= min(open, close) <= max(open, close) <= high` is an error.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chartsight_core::domain::OhlcBar;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BarFileError {
    #[error("bar file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("bar CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {reason}")]
    InvalidBar { row: usize, reason: String },
}

pub fn read_bars<R: Read>(reader: R) -> Result<Vec<OhlcBar>, BarFileError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut bars = Vec::new();
    for (i, record) in csv_reader.deserialize::<OhlcBar>().enumerate() {
        let bar = record?;
        // Row 1 is the header.
        validate(&bar).map_err(|reason| BarFileError::InvalidBar { row: i + 2, reason })?;
        bars.push(bar);
    }
    Ok(bars)
}

pub fn write_bars<W: Write>(bars: &[OhlcBar], writer: W) -> Result<(), BarFileError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for bar in bars {
        csv_writer.serialize(bar)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn load_bars(path: &Path) -> Result<Vec<OhlcBar>, BarFileError> {
    read_bars(File::open(path)?)
}

pub fn save_bars(bars: &[OhlcBar], path: &Path) -> Result<(), BarFileError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_bars(bars, File::create(path)?)
}

fn validate(bar: &OhlcBar) -> Result<(), String> {
    let prices = [bar.open, bar.high, bar.low, bar.close, bar.volume_proxy];
    if prices.iter().any(|p| !p.is_finite()) {
        return Err("non-finite value".into());
    }
    if !(bar.low <= bar.body_bottom() && bar.body_top() <= bar.high) {
        return Err(format!(
            "inconsistent OHLC (o={} h={} l={} c={})",
            bar.open, bar.high, bar.low, bar.close
        ));
    }
    Ok(())
}
