//! Snapshot sinks
//!
//! CSV is the reference representation: one row per symbol and timestamp with
//! exactly N bid and N ask price/quantity pairs. Rows follow trigger order,
//! with symbols sorted within a trigger. This is not the ticker-then-time
//! grouping of the older Level-2 extraction script; sort by the first two
//! columns to get that layout.

use std::borrow::Cow;
use std::io::Write;

use super::SnapshotSink;
use crate::error::{DepthError, Result};
use crate::orderbook::{DepthSnapshot, PriceLevel};

/// CSV writer with a fixed number of level columns per side
pub struct CsvSink<W: Write> {
    writer: W,
    levels: usize,
}

impl<W: Write> CsvSink<W> {
    /// Create the sink and write the header row
    pub fn new(mut writer: W, levels: usize) -> Result<Self> {
        let mut header = vec!["ticker".to_string(), "timestamp".to_string()];
        for side in ["bid", "ask"] {
            for i in 1..=levels {
                header.push(format!("{}_{}_price", side, i));
                header.push(format!("{}_{}_qty", side, i));
            }
        }
        writeln!(writer, "{}", header.join(","))?;

        Ok(Self { writer, levels })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn push_levels(&self, row: &mut Vec<String>, levels: &[PriceLevel]) {
        for i in 0..self.levels {
            match levels.get(i) {
                Some(level) => {
                    row.push(format!("{:.2}", level.price));
                    row.push(level.quantity.to_string());
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }
    }
}

impl<W: Write + Send> SnapshotSink for CsvSink<W> {
    fn write(&mut self, snapshot: &DepthSnapshot) -> Result<()> {
        let mut row = vec![
            quote_field(&snapshot.symbol).into_owned(),
            snapshot.timestamp.to_string(),
        ];
        self.push_levels(&mut row, &snapshot.bids);
        self.push_levels(&mut row, &snapshot.asks);
        writeln!(self.writer, "{}", row.join(","))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Quote a CSV cell that would otherwise split the row
fn quote_field(value: &str) -> Cow<'_, str> {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// One JSON object per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> SnapshotSink for JsonLinesSink<W> {
    fn write(&mut self, snapshot: &DepthSnapshot) -> Result<()> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// MessagePack records, each preceded by a 4-byte big-endian length
pub struct MsgPackSink<W: Write> {
    writer: W,
}

impl<W: Write> MsgPackSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> SnapshotSink for MsgPackSink<W> {
    fn write(&mut self, snapshot: &DepthSnapshot) -> Result<()> {
        let data = rmp_serde::to_vec(snapshot)?;
        let len = u32::try_from(data.len()).map_err(|_| {
            DepthError::SerializationError(format!("snapshot of {} bytes too large", data.len()))
        })?;

        self.writer.write_all(&len.to_be_bytes())?;
        self.writer.write_all(&data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> DepthSnapshot {
        DepthSnapshot {
            symbol: "ABC".to_string(),
            timestamp: 34200,
            bids: vec![
                PriceLevel {
                    price: dec!(10),
                    quantity: 150,
                },
                PriceLevel {
                    price: dec!(9.5),
                    quantity: 20,
                },
            ],
            asks: vec![PriceLevel {
                price: dec!(10.25),
                quantity: 75,
            }],
        }
    }

    #[test]
    fn test_csv_header() {
        let sink = CsvSink::new(Vec::new(), 2).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            out,
            "ticker,timestamp,bid_1_price,bid_1_qty,bid_2_price,bid_2_qty,\
             ask_1_price,ask_1_qty,ask_2_price,ask_2_qty\n"
        );
    }

    #[test]
    fn test_csv_row_pads_missing_levels() {
        let mut sink = CsvSink::new(Vec::new(), 3).unwrap();
        sink.write(&snapshot()).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let row = out.lines().nth(1).unwrap();
        assert_eq!(row, "ABC,34200,10.00,150,9.50,20,,,10.25,75,,,,");
        assert_eq!(row.split(',').count(), 2 + 3 * 4);
    }

    #[test]
    fn test_csv_quotes_symbol_with_delimiters() {
        let mut sink = CsvSink::new(Vec::new(), 1).unwrap();
        let mut odd = snapshot();
        odd.symbol = "A,B\"C".to_string();
        sink.write(&odd).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let row = out.lines().nth(1).unwrap();
        assert_eq!(row, "\"A,B\"\"C\",34200,10.00,150,10.25,75");
    }

    #[test]
    fn test_json_lines() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.write(&snapshot()).unwrap();
        sink.write(&snapshot()).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: DepthSnapshot = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, snapshot());
    }

    #[test]
    fn test_msgpack_length_prefix() {
        let mut sink = MsgPackSink::new(Vec::new());
        sink.write(&snapshot()).unwrap();

        let out = sink.into_inner();
        let len = u32::from_be_bytes([out[0], out[1], out[2], out[3]]) as usize;
        assert_eq!(out.len(), 4 + len);

        let decoded: DepthSnapshot = rmp_serde::from_slice(&out[4..]).unwrap();
        assert_eq!(decoded.symbol, "ABC");
        assert_eq!(decoded.bids.len(), 2);
    }
}
