//! Parsing and serialization of transport listings (C1: Listing Codec).
//!
//! A "listing" is the output of the transport's `lsl`-style command: one line per file,
//! `<size> <YYYY-MM-DD> <HH:MM:SS>.<fractional> <path>`. We parse this into an
//! [`OrderedMap`](crate::ordered_map::OrderedMap)-backed [`Listing`], and use the exact same
//! grammar to persist baselines to disk, so a baseline file is indistinguishable from a
//! transport listing and can be inspected directly.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;

use log::warn;

use crate::ordered_map::OrderedMap;

/// One file entry in a [`Listing`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    /// Size in bytes, as reported by the transport. Used only for reporting and the
    /// `size_changed` delta flag - never alone for deciding whether a file needs syncing.
    pub size: i64,
    /// Seconds since the Unix epoch, including the fractional part reported by the transport.
    pub mtime: f64,
}

/// An ordered mapping from tree-relative path to [`Entry`], sorted lexicographically by path.
///
/// Paths are stored verbatim as emitted by the transport; comparisons are byte-equal, so we
/// never attempt to canonicalize case or slashes here.
#[derive(Debug, Clone)]
pub struct Listing {
    entries: OrderedMap<String, Entry>,
}

impl Default for Listing {
    fn default() -> Self {
        Listing::new()
    }
}

impl Listing {
    pub fn new() -> Listing {
        Listing { entries: OrderedMap::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.entries.lookup(&path.to_string())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Inserts or overwrites the entry for `path`. Callers are expected to insert in
    /// lexicographic path order (as produced by [`parse_listing`]); see
    /// [`Listing::sorted_paths`] for the authoritative ordering used elsewhere.
    pub fn insert(&mut self, path: String, entry: Entry) {
        self.entries.add(path, entry);
    }

    /// Iterates entries in lexicographic path order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.sorted_iter()
    }

    fn sorted_iter(&self) -> std::vec::IntoIter<(&String, &Entry)> {
        let mut v: Vec<(&String, &Entry)> = self.entries.iter().collect();
        v.sort_by(|a, b| a.0.cmp(b.0));
        v.into_iter()
    }

    pub fn paths(&self) -> Vec<&String> {
        self.sorted_iter().map(|(p, _)| p).collect()
    }
}

/// A single unparsable line encountered while decoding a listing. The codec never fails the
/// run because of these - they are logged and skipped (see [`parse_listing`]).
#[derive(Debug, Clone)]
pub struct UnparsableLine {
    pub line_number: usize,
    pub raw: String,
}
impl fmt::Display for UnparsableLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {:?}", self.line_number, self.raw)
    }
}

/// Parses a single listing line of the form `<size> <YYYY-MM-DD> <HH:MM:SS>.<fractional> <path>`.
///
/// The path is everything after the third whitespace-delimited field, taken verbatim (it may
/// itself contain spaces). Returns `None` if the line doesn't match the grammar.
pub fn parse_listing_line(line: &str) -> Option<(String, Entry)> {
    let mut parts = line.splitn(4, ' ');
    let size_str = parts.next()?;
    let date_str = parts.next()?;
    let time_str = parts.next()?;
    let path = parts.next()?;

    if path.is_empty() {
        return None;
    }

    let size: i64 = size_str.parse().ok()?;

    let mtime = parse_timestamp(date_str, time_str)?;

    Some((path.to_string(), Entry { size, mtime }))
}

/// Combines a `YYYY-MM-DD` date and a `HH:MM:SS.<fractional>` time into seconds-since-epoch.
/// The fractional part may have any number of digits.
fn parse_timestamp(date_str: &str, time_str: &str) -> Option<f64> {
    let mut date_parts = date_str.splitn(3, '-');
    let year: i64 = date_parts.next()?.parse().ok()?;
    let month: i64 = date_parts.next()?.parse().ok()?;
    let day: i64 = date_parts.next()?.parse().ok()?;
    if date_parts.next().is_some() {
        return None;
    }

    let (time_main, frac_str) = match time_str.split_once('.') {
        Some((a, b)) => (a, b),
        None => (time_str, "0"),
    };
    let mut time_parts = time_main.splitn(3, ':');
    let hour: i64 = time_parts.next()?.parse().ok()?;
    let minute: i64 = time_parts.next()?.parse().ok()?;
    let second: i64 = time_parts.next()?.parse().ok()?;
    if time_parts.next().is_some() {
        return None;
    }
    let frac: f64 = format!("0.{frac_str}").parse().ok()?;

    let days = days_since_epoch(year, month, day)?;
    let seconds = days as f64 * 86400.0 + (hour * 3600 + minute * 60 + second) as f64 + frac;
    Some(seconds)
}

/// Days since 1970-01-01 for a given (proleptic Gregorian) calendar date, using the
/// civil_from_days algorithm. Good for any date the transport is realistically going to report.
fn days_since_epoch(year: i64, month: i64, day: i64) -> Option<i64> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as i64; // [0, 399]
    let mp = (month + 9) % 12; // [0, 11], Mar=0
    let doy = (153 * mp + 2) / 5 + day - 1; // [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // [0, 146096]
    Some(era * 146097 + doe - 719468)
}

/// Parses a full listing (transport stdout, or a persisted baseline file) into a [`Listing`].
/// Lines that don't match the grammar are logged at warning level and skipped; the codec never
/// fails the run for an unparsable line.
pub fn parse_listing<R: BufRead>(reader: R) -> io::Result<Listing> {
    let mut listing = Listing::new();
    let mut pending: Vec<(String, Entry)> = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_listing_line(&line) {
            Some((path, entry)) => pending.push((path, entry)),
            None => warn!("Skipping unparsable listing line {}: {:?}", idx + 1, line),
        }
    }
    pending.sort_by(|a, b| a.0.cmp(&b.0));
    for (path, entry) in pending {
        listing.insert(path, entry);
    }
    Ok(listing)
}

/// Serializes a listing to the same line grammar used by [`parse_listing_line`], one entry per
/// line, in lexicographic path order.
pub fn write_listing<W: Write>(mut writer: W, listing: &Listing) -> io::Result<()> {
    for (path, entry) in listing.iter() {
        let (date, time) = format_timestamp(entry.mtime);
        writeln!(writer, "{} {} {} {}", entry.size, date, time, path)?;
    }
    writer.flush()
}

fn format_timestamp(mtime: f64) -> (String, String) {
    let total_secs = mtime.floor() as i64;
    let frac = mtime - mtime.floor();
    let days = total_secs.div_euclid(86400);
    let secs_of_day = total_secs.rem_euclid(86400);
    let (year, month, day) = civil_from_days(days);
    let hour = secs_of_day / 3600;
    let minute = (secs_of_day % 3600) / 60;
    let second = secs_of_day % 60;
    let date = format!("{year:04}-{month:02}-{day:02}");
    let time = format!("{hour:02}:{minute:02}:{second:02}.{:09}", (frac * 1_000_000_000.0).round() as i64);
    (date, time)
}

fn civil_from_days(z: i64) -> (i64, i64, i64) {
    let z = z + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365; // [0, 399]
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11]
    let day = doy - (153 * mp + 2) / 5 + 1; // [1, 31]
    let month = if mp < 10 { mp + 3 } else { mp - 9 }; // [1, 12]
    let year = if month <= 2 { y + 1 } else { y };
    (year, month, day)
}

/// Loads a listing from a baseline file on disk, for [`crate::baseline`].
pub fn read_listing_file(path: &Path) -> io::Result<Listing> {
    let f = std::fs::File::open(path)?;
    parse_listing(io::BufReader::new(f))
}

/// Writes a listing to a baseline file on disk, for [`crate::baseline`].
pub fn write_listing_file(path: &Path, listing: &Listing) -> io::Result<()> {
    let f = std::fs::File::create(path)?;
    write_listing(io::BufWriter::new(f), listing)
}
