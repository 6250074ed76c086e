// records.rs
//
// Typed records handed to the engine by the ingestion side. Readers take any
// in-memory source (`&[u8]`, an opened file, stdin) and return one result per
// record, so the caller decides whether a malformed line is skipped or aborts
// the load.

use crate::error::{NetworkError, Result};
use crate::network::intersection::IntersectionId;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Field separator of a record source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// `1 2 5`
    Whitespace,
    /// `1,2,5`
    Comma,
}

impl RecordFormat {
    /// Picks the format from the first line that is neither blank nor a
    /// `#` comment. Sources with no such line read as whitespace.
    pub fn detect(text: &str) -> RecordFormat {
        let first = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'));
        match first {
            Some(line) if line.contains(',') => RecordFormat::Comma,
            _ => RecordFormat::Whitespace,
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            RecordFormat::Whitespace => b' ',
            RecordFormat::Comma => b',',
        }
    }
}

/// `from to weight`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadRecord {
    pub from: IntersectionId,
    pub to: IntersectionId,
    pub weight: u32,
}

/// `from to new_weight`, same shape as a road record.
pub type TrafficUpdateRecord = RoadRecord;

/// `from to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureRecord {
    pub from: IntersectionId,
    pub to: IntersectionId,
}

/// `id route_len node_1 ... node_n`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: u32,
    pub route: Vec<IntersectionId>,
}

/// `intersection duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTimingRecord {
    pub intersection: IntersectionId,
    pub duration: u32,
}

/// A record type that can be built from the fields of one line.
pub trait FromFields: Sized {
    fn from_fields(fields: &[&str], line: u64) -> Result<Self>;
}

impl FromFields for RoadRecord {
    fn from_fields(fields: &[&str], line: u64) -> Result<Self> {
        expect_arity(fields, 3, line)?;
        Ok(RoadRecord {
            from: parse_id(fields[0], "from", line)?,
            to: parse_id(fields[1], "to", line)?,
            weight: parse_number(fields[2], "weight", line)?,
        })
    }
}

impl FromFields for ClosureRecord {
    fn from_fields(fields: &[&str], line: u64) -> Result<Self> {
        expect_arity(fields, 2, line)?;
        Ok(ClosureRecord {
            from: parse_id(fields[0], "from", line)?,
            to: parse_id(fields[1], "to", line)?,
        })
    }
}

impl FromFields for VehicleRecord {
    fn from_fields(fields: &[&str], line: u64) -> Result<Self> {
        if fields.len() < 2 {
            return Err(malformed(
                line,
                format!("expected vehicle id and route length, got {} field(s)", fields.len()),
            ));
        }
        let id = parse_number(fields[0], "vehicle id", line)?;
        let route_len = parse_number(fields[1], "route length", line)? as usize;
        let nodes = &fields[2..];
        if nodes.len() != route_len {
            return Err(malformed(
                line,
                format!(
                    "route length is {} but {} node(s) follow",
                    route_len,
                    nodes.len()
                ),
            ));
        }
        let route = nodes
            .iter()
            .map(|field| parse_id(field, "route node", line))
            .collect::<Result<Vec<_>>>()?;
        Ok(VehicleRecord { id, route })
    }
}

impl FromFields for SignalTimingRecord {
    fn from_fields(fields: &[&str], line: u64) -> Result<Self> {
        expect_arity(fields, 2, line)?;
        Ok(SignalTimingRecord {
            intersection: parse_id(fields[0], "intersection", line)?,
            duration: parse_number(fields[1], "duration", line)?,
        })
    }
}

/// Reads every record from `source`. Blank lines and lines starting with `#`
/// are skipped. In whitespace sources tabs separate fields like spaces.
pub fn read_records<T: FromFields, R: Read>(mut source: R, format: RecordFormat) -> Vec<Result<T>> {
    let mut text = String::new();
    if let Err(err) = source.read_to_string(&mut text) {
        return vec![Err(err.into())];
    }
    if format == RecordFormat::Whitespace {
        text = text.replace('\t', " ");
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .delimiter(format.delimiter())
        .from_reader(text.as_bytes());

    reader
        .records()
        .map(|record| {
            let record = record?;
            let line = record.position().map(|pos| pos.line()).unwrap_or(0);
            // Repeated spaces show up as empty fields.
            let fields: Vec<&str> = record.iter().filter(|field| !field.is_empty()).collect();
            T::from_fields(&fields, line)
        })
        .collect()
}

pub fn read_road_records<R: Read>(source: R, format: RecordFormat) -> Vec<Result<RoadRecord>> {
    read_records(source, format)
}

fn expect_arity(fields: &[&str], expected: usize, line: u64) -> Result<()> {
    if fields.len() != expected {
        return Err(malformed(
            line,
            format!("expected {} field(s), got {}", expected, fields.len()),
        ));
    }
    Ok(())
}

fn parse_number(field: &str, what: &str, line: u64) -> Result<u32> {
    field.parse::<u32>().map_err(|_| {
        malformed(
            line,
            format!("{} must be a non-negative integer, got '{}'", what, field),
        )
    })
}

fn parse_id(field: &str, what: &str, line: u64) -> Result<IntersectionId> {
    parse_number(field, what, line).map(IntersectionId)
}

fn malformed(line: u64, reason: String) -> NetworkError {
    NetworkError::MalformedRecord { line, reason }
}
