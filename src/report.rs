//! Human-readable and CSV renderings of reconciled positions.

use crate::domain::FormattedPosition;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;
use thiserror::Error;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    symbol: &'a str,
    side: &'a str,
    position_side: &'a str,
    net_pnl: &'a str,
    volume: &'a str,
    open_time: String,
    close_time: String,
    open_time_ms: i64,
    close_time_ms: i64,
}

/// Fixed-width table, newest position first. Input is expected oldest first.
pub fn render_table(positions: &[FormattedPosition]) -> String {
    let rule = "-".repeat(97);
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "{:<10} | {:<6} | {:<5} | {:<12} | {:<10} | {:<19} | {:<19}",
        "Symbol", "Side", "PSide", "Net PnL", "Vol", "Opened Time", "Closed Time"
    );
    let _ = writeln!(out, "{}", rule);
    for p in positions.iter().rev() {
        let _ = writeln!(
            out,
            "{:<10} | {:<6} | {:<5} | {:<12} | {:<10} | {:<19} | {:<19}",
            p.symbol,
            p.side,
            p.position_side,
            p.net_pnl,
            p.volume,
            p.open_time.format(TIME_FORMAT),
            p.close_time.format(TIME_FORMAT),
        );
    }
    let _ = writeln!(out, "{}", rule);
    out
}

/// Write positions as CSV with a header row, in the order given.
pub fn write_csv<W: Write>(positions: &[FormattedPosition], writer: W) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for p in positions {
        csv_writer.serialize(CsvRow {
            symbol: &p.symbol,
            side: &p.side,
            position_side: &p.position_side,
            net_pnl: &p.net_pnl,
            volume: &p.volume,
            open_time: p.open_time.to_rfc3339(),
            close_time: p.close_time.to_rfc3339(),
            open_time_ms: p.open_time_ms,
            close_time_ms: p.close_time_ms,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_bytes(positions: &[FormattedPosition]) -> Result<Vec<u8>, ReportError> {
    let mut buf = Vec::new();
    write_csv(positions, &mut buf)?;
    Ok(buf)
}
