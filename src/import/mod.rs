#![forbid(unsafe_code)]

//! Loading of the rating, item, and link relations from delimited text.
//!
//! Sources hold one record per line. Quoted fields may contain the delimiter
//! but not a line break.
//!
//! The first line is the header. Any later line whose raw text equals it is
//! dropped as well. A line that only parses to the same fields (different
//! quoting, spacing, or case) is kept and will usually fail coercion. Blank
//! lines are malformed records.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use csv::{ReaderBuilder, StringRecord};
use tracing::info;

use crate::types::{Item, ItemExternalRef, ItemId, Rating, ReelError, Result, UserId};

const RATING_FIELDS: usize = 3;
const ITEM_FIELDS: usize = 2;
const LINK_FIELDS: usize = 3;

/// Locations of the three input relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    /// `user_id,item_id,score[,...]` rows.
    pub ratings: PathBuf,
    /// `item_id,title[,genres]` rows.
    pub items: PathBuf,
    /// `item_id,external_id_a,external_id_b` rows.
    pub links: PathBuf,
}

impl DatasetPaths {
    /// Conventional file names inside a dataset directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            ratings: dir.join("ratings.csv"),
            items: dir.join("movies.csv"),
            links: dir.join("links.csv"),
        }
    }
}

/// Fully parsed input relations.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Rating rows in file order.
    pub ratings: Vec<Rating>,
    /// Catalog rows in file order.
    pub items: Vec<Item>,
    /// External link rows in file order.
    pub links: Vec<ItemExternalRef>,
}

/// Loads all three relations, failing on the first malformed record.
pub fn load_dataset(paths: &DatasetPaths) -> Result<Dataset> {
    let start = Instant::now();
    let ratings = read_ratings("ratings", File::open(&paths.ratings)?)?;
    let items = read_items("items", File::open(&paths.items)?)?;
    let links = read_links("links", File::open(&paths.links)?)?;
    info!(
        ratings = ratings.len(),
        items = items.len(),
        links = links.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1_000.0,
        "import.dataset.loaded"
    );
    Ok(Dataset {
        ratings,
        items,
        links,
    })
}

/// Parses a ratings source.
pub fn read_ratings<R: Read>(source_name: &str, reader: R) -> Result<Vec<Rating>> {
    read_relation(source_name, reader, RATING_FIELDS, |record, line| {
        Ok(Rating {
            user_id: UserId(parse_field(source_name, record, 0, line)?),
            item_id: ItemId(parse_field(source_name, record, 1, line)?),
            score: parse_field(source_name, record, 2, line)?,
        })
    })
}

/// Parses an items source.
pub fn read_items<R: Read>(source_name: &str, reader: R) -> Result<Vec<Item>> {
    read_relation(source_name, reader, ITEM_FIELDS, |record, line| {
        Ok(Item {
            item_id: ItemId(parse_field(source_name, record, 0, line)?),
            title: record[1].to_string(),
            genres: record.get(2).map(str::to_string),
        })
    })
}

/// Parses a links source.
pub fn read_links<R: Read>(source_name: &str, reader: R) -> Result<Vec<ItemExternalRef>> {
    read_relation(source_name, reader, LINK_FIELDS, |record, line| {
        Ok(ItemExternalRef {
            item_id: ItemId(parse_field(source_name, record, 0, line)?),
            external_id_a: record[1].to_string(),
            external_id_b: record[2].to_string(),
        })
    })
}

fn read_relation<R, T, F>(
    source_name: &str,
    reader: R,
    min_fields: usize,
    mut parse: F,
) -> Result<Vec<T>>
where
    R: Read,
    F: FnMut(&StringRecord, u64) -> Result<T>,
{
    let mut lines = BufReader::new(reader).lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Ok(Vec::new()),
    };
    let header = header.trim_end_matches('\r');
    let mut rows = Vec::new();
    let mut skipped = 0u64;
    let mut record = StringRecord::new();
    for (index, raw) in lines.enumerate() {
        let raw = raw?;
        let raw = raw.trim_end_matches('\r');
        let line = index as u64 + 2;
        if raw == header {
            skipped += 1;
            continue;
        }
        if raw.is_empty() {
            return Err(malformed(source_name, line, "empty record".to_string()));
        }
        parse_line(source_name, raw, line, &mut record)?;
        if record.len() < min_fields {
            let reason = format!(
                "expected at least {min_fields} fields, found {}",
                record.len()
            );
            return Err(malformed(source_name, line, reason));
        }
        rows.push(parse(&record, line)?);
    }
    info!(
        source = source_name,
        rows = rows.len(),
        repeated_headers = skipped,
        "import.relation.loaded"
    );
    Ok(rows)
}

fn parse_line(source_name: &str, raw: &str, line: u64, record: &mut StringRecord) -> Result<()> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw.as_bytes());
    match reader.read_record(record) {
        Ok(true) => Ok(()),
        Ok(false) => Err(malformed(source_name, line, "empty record".to_string())),
        Err(err) => Err(malformed(source_name, line, err.to_string())),
    }
}

fn malformed(source_name: &str, line: u64, reason: String) -> ReelError {
    ReelError::MalformedRecord {
        source_name: source_name.to_string(),
        line,
        reason,
    }
}

fn parse_field<T>(source_name: &str, record: &StringRecord, index: usize, line: u64) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = &record[index];
    raw.trim()
        .parse::<T>()
        .map_err(|err| malformed(source_name, line, format!("field {index} ('{raw}'): {err}")))
}
