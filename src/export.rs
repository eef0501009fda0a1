//! Text export of the record store.
//!
//! ```text
//! timestamp accx accy accz rotx roty rotz headx heady headz
//! + alt flr lat lon
//! <N> samples per second
//!
//! <timestamp> <accx> <accy> <accz> <rotx> <roty> <rotz> <compassx> <compassy> <compassz>
//! + <alt> <flr> <lat> <lon>
//! ```
//!
//! The `+` line follows a record only when that record carries a location
//! change. Numbers use `f64`'s `Display`, which is locale-independent and
//! round-trips exactly.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use crate::store::{DataPointStore, StoreError};
use crate::types::{DataPoint, Location, Vector3};

pub const HEADER_FIELDS: &str = "timestamp accx accy accz rotx roty rotz headx heady headz";
pub const HEADER_LOCATION: &str = "+ alt flr lat lon";
const RATE_SUFFIX: &str = " samples per second";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Renders the whole store on demand. Never mutates it.
pub struct Exporter {
    store: Arc<dyn DataPointStore>,
}

impl Exporter {
    pub fn new(store: Arc<dyn DataPointStore>) -> Self {
        Self { store }
    }

    pub fn export(&self, rate: u32) -> Result<String, StoreError> {
        let data_points = self.store.all()?;
        Ok(render(&data_points, rate))
    }

    pub fn export_to_file<P: AsRef<Path>>(&self, path: P, rate: u32) -> Result<PathBuf, ExportError> {
        let path = path.as_ref();
        let text = self.export(rate)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;

        info!("Exported store to {}", path.display());
        Ok(path.to_path_buf())
    }
}

pub fn render(data_points: &[DataPoint], rate: u32) -> String {
    let mut out = String::with_capacity(96 + data_points.len() * 96);
    out.push_str(HEADER_FIELDS);
    out.push('\n');
    out.push_str(HEADER_LOCATION);
    out.push('\n');
    let _ = writeln!(out, "{}{}", rate, RATE_SUFFIX);
    out.push('\n');

    for p in data_points {
        let _ = writeln!(
            out,
            "{} {} {} {} {} {} {} {} {} {}",
            p.timestamp,
            p.acceleration.x,
            p.acceleration.y,
            p.acceleration.z,
            p.rotation.x,
            p.rotation.y,
            p.rotation.z,
            p.compass.x,
            p.compass.y,
            p.compass.z,
        );
        if p.location_changed {
            let _ = writeln!(
                out,
                "+ {} {} {} {}",
                p.location.altitude, p.location.floor, p.location.latitude, p.location.longitude,
            );
        }
    }
    out
}

/// Export text read back into records.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExport {
    pub rate: u32,
    pub data_points: Vec<DataPoint>,
}

/// Parses text produced by [`render`].
///
/// Blank lines and `#` comments are ignored. A `+` line belongs to the record
/// directly above it; a `+` line with no record above it, or a second `+` line
/// for the same record, is rejected as malformed rather than skipped or
/// merged. Records without a `+` line inherit the most recent location,
/// matching what the cache held when they were taken.
pub fn parse_export(text: &str) -> Result<ParsedExport, ParseError> {
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

    expect_line(lines.next(), HEADER_FIELDS)?;
    expect_line(lines.next(), HEADER_LOCATION)?;
    let (line_no, rate_line) = lines
        .next()
        .ok_or_else(|| ParseError::new(3, "missing rate line"))?;
    let rate = rate_line
        .strip_suffix(RATE_SUFFIX)
        .and_then(|n| n.trim().parse::<u32>().ok())
        .ok_or_else(|| ParseError::new(line_no, format!("invalid rate line: {:?}", rate_line)))?;

    let mut data_points: Vec<DataPoint> = Vec::new();
    let mut location = Location::default();
    let mut location_attached = false;

    for (line_no, line) in lines {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = line.strip_prefix('+') {
            let last = data_points
                .last_mut()
                .ok_or_else(|| ParseError::new(line_no, "location line without a record"))?;
            if location_attached {
                return Err(ParseError::new(line_no, "second location line for one record"));
            }
            let fields = split_fields(rest, 4, line_no)?;
            location = Location {
                altitude: parse_f64(fields[0], line_no)?,
                floor: fields[1]
                    .parse()
                    .map_err(|_| ParseError::new(line_no, format!("invalid floor: {:?}", fields[1])))?,
                latitude: parse_f64(fields[2], line_no)?,
                longitude: parse_f64(fields[3], line_no)?,
            };
            last.location = location;
            last.location_changed = true;
            location_attached = true;
            continue;
        }

        let fields = split_fields(line, 10, line_no)?;
        let timestamp = fields[0]
            .parse::<i64>()
            .map_err(|_| ParseError::new(line_no, format!("invalid timestamp: {:?}", fields[0])))?;
        let mut values = [0.0; 9];
        for (value, field) in values.iter_mut().zip(&fields[1..]) {
            *value = parse_f64(field, line_no)?;
        }

        data_points.push(DataPoint {
            timestamp,
            acceleration: Vector3::new(values[0], values[1], values[2]),
            rotation: Vector3::new(values[3], values[4], values[5]),
            compass: Vector3::new(values[6], values[7], values[8]),
            location,
            location_changed: false,
        });
        location_attached = false;
    }

    Ok(ParsedExport { rate, data_points })
}

fn expect_line(line: Option<(usize, &str)>, expected: &str) -> Result<(), ParseError> {
    match line {
        Some((_, l)) if l == expected => Ok(()),
        Some((n, l)) => Err(ParseError::new(n, format!("expected {:?}, found {:?}", expected, l))),
        None => Err(ParseError::new(0, format!("missing header {:?}", expected))),
    }
}

fn split_fields(line: &str, expected: usize, line_no: usize) -> Result<Vec<&str>, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != expected {
        return Err(ParseError::new(
            line_no,
            format!("expected {} fields, found {}", expected, fields.len()),
        ));
    }
    Ok(fields)
}

fn parse_f64(field: &str, line_no: usize) -> Result<f64, ParseError> {
    field
        .parse()
        .map_err(|_| ParseError::new(line_no, format!("invalid number: {:?}", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::TempDir;

    fn point(timestamp: i64, location: Location, location_changed: bool) -> DataPoint {
        DataPoint {
            timestamp,
            acceleration: Vector3::new(0.1, -0.2, 9.81),
            rotation: Vector3::new(0.0, 1.5, -2.25),
            compass: Vector3::new(33.3, 0.0, -1.0),
            location,
            location_changed,
        }
    }

    #[test]
    fn test_render_empty_store() {
        assert_eq!(
            render(&[], 7),
            "timestamp accx accy accz rotx roty rotz headx heady headz\n\
             + alt flr lat lon\n\
             7 samples per second\n\
             \n"
        );
    }

    #[test]
    fn test_render_location_line_only_when_changed() {
        let loc = Location::new(1.0, 2.0, 3.0, 4);
        let text = render(
            &[
                point(100, Location::default(), false),
                point(200, loc, true),
                point(300, loc, false),
            ],
            5,
        );

        let body: Vec<&str> = text.lines().skip(4).collect();
        assert_eq!(
            body,
            vec![
                "100 0.1 -0.2 9.81 0 1.5 -2.25 33.3 0 -1",
                "200 0.1 -0.2 9.81 0 1.5 -2.25 33.3 0 -1",
                "+ 3 4 1 2",
                "300 0.1 -0.2 9.81 0 1.5 -2.25 33.3 0 -1",
            ]
        );
    }

    #[test]
    fn test_parse_reproduces_rendered_records() {
        let loc = Location::new(51.5007, -0.1246, 11.0, -1);
        let original = vec![
            point(1, Location::default(), false),
            point(2, loc, true),
            point(3, loc, false),
            point(4, Location::new(0.5, 0.25, 0.125, 0), true),
        ];

        let parsed = parse_export(&render(&original, 12)).unwrap();
        assert_eq!(parsed.rate, 12);
        assert_eq!(parsed.data_points, original);
    }

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let text = "timestamp accx accy accz rotx roty rotz headx heady headz\n\
                    + alt flr lat lon\n\
                    3 samples per second\n\
                    \n\
                    # walking\n\
                    10 1 2 3 4 5 6 7 8 9\n\
                    \n\
                    + 1 2 3 4\n";
        let parsed = parse_export(text).unwrap();
        assert_eq!(parsed.data_points.len(), 1);
        assert!(parsed.data_points[0].location_changed);
        assert_eq!(parsed.data_points[0].location, Location::new(3.0, 4.0, 1.0, 2));
    }

    #[test]
    fn test_parse_rejects_orphan_location_line() {
        let text = format!("{}\n{}\n1 samples per second\n\n+ 1 2 3 4\n", HEADER_FIELDS, HEADER_LOCATION);
        let err = parse_export(&text).unwrap_err();
        assert_eq!(err.line, 5);
    }

    #[test]
    fn test_parse_rejects_second_location_line_for_one_record() {
        let text = format!(
            "{}\n{}\n1 samples per second\n\n10 1 2 3 4 5 6 7 8 9\n+ 1 2 3 4\n+ 5 6 7 8\n",
            HEADER_FIELDS, HEADER_LOCATION
        );
        let err = parse_export(&text).unwrap_err();
        assert_eq!(err.line, 7);
    }

    #[test]
    fn test_parse_rejects_bad_header_and_short_records() {
        assert!(parse_export("time x y z\n").is_err());

        let text = format!("{}\n{}\nfast samples per second\n", HEADER_FIELDS, HEADER_LOCATION);
        assert_eq!(parse_export(&text).unwrap_err().line, 3);

        let text = format!("{}\n{}\n2 samples per second\n\n1 2 3\n", HEADER_FIELDS, HEADER_LOCATION);
        assert_eq!(parse_export(&text).unwrap_err().line, 5);
    }

    #[test]
    fn test_export_to_file_creates_directory() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.append(&point(5, Location::default(), false)).unwrap();
        let exporter = Exporter::new(store);

        let path = dir.path().join("exports/run.txt");
        exporter.export_to_file(&path, 9).unwrap();

        let parsed = parse_export(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.rate, 9);
        assert_eq!(parsed.data_points.len(), 1);
    }
}
