#![allow(missing_docs)]

mod support;

use std::collections::BTreeMap;
use std::fs;

use reel::{
    import::{load_dataset, read_items, read_links, read_ratings, DatasetPaths},
    storage::Relation,
    Engine, EngineOptions, ItemId, ReelError, Result, UserId,
};
use tempfile::TempDir;

#[test]
fn loads_a_dataset_directory() -> Result<()> {
    let dir = TempDir::new()?;
    support::write_dataset(dir.path())?;
    let dataset = load_dataset(&DatasetPaths::in_dir(dir.path()))?;
    assert_eq!(dataset.ratings, support::ratings());
    assert_eq!(dataset.items.len(), support::ITEMS as usize);
    assert_eq!(dataset.links, support::links());
    assert_eq!(dataset.items[0].title, "Item 1, The");
    assert_eq!(dataset.items[0].genres.as_deref(), Some("Drama"));
    Ok(())
}

#[test]
fn opened_engine_counts_match_the_ratings_file() -> Result<()> {
    let dir = TempDir::new()?;
    support::write_dataset(dir.path())?;
    let raw = fs::read_to_string(dir.path().join("ratings.csv"))?;
    let mut expected: BTreeMap<i64, u64> = BTreeMap::new();
    for line in raw.lines().skip(1) {
        let item: i64 = line
            .split(',')
            .nth(1)
            .and_then(|field| field.parse().ok())
            .expect("item id column");
        *expected.entry(item).or_default() += 1;
    }

    let dataset = load_dataset(&DatasetPaths::in_dir(dir.path()))?;
    let engine = Engine::open(dataset, EngineOptions::default())?;
    let state = engine.snapshot();
    let aggregates = state.aggregates();
    assert_eq!(aggregates.scan().count(), expected.len());
    for (item, count) in expected {
        let row = aggregates.first(ItemId(item)).expect("aggregate row");
        assert_eq!(row.rating_count, count, "item {item}");
    }
    Ok(())
}

#[test]
fn repeated_header_lines_are_dropped() -> Result<()> {
    let csv = "userId,movieId,rating,timestamp\n\
               1,10,4.0,1\n\
               userId,movieId,rating,timestamp\n\
               2,10,3.5,2\n";
    let rows = read_ratings("ratings", csv.as_bytes())?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].user_id, UserId(2));
    assert_eq!(rows[1].score, 3.5);
    Ok(())
}

#[test]
fn header_lookalikes_fail_coercion_with_a_line_number() {
    let csv = "userId,movieId,rating\n\
               1,10,4.0\n\
               userid,movieId,rating\n";
    let err = read_ratings("ratings", csv.as_bytes()).unwrap_err();
    match err {
        ReelError::MalformedRecord {
            source_name, line, ..
        } => {
            assert_eq!(source_name, "ratings");
            assert_eq!(line, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn quoted_header_lookalike_and_blank_lines_are_rejected() {
    let csv = "userId,movieId,rating\n\
               1,10,4.0\n\
               \"userId\",movieId,rating\n";
    let err = read_ratings("ratings", csv.as_bytes()).unwrap_err();
    assert!(matches!(err, ReelError::MalformedRecord { line: 3, .. }));

    let csv = "movieId,title\n3,Heat\n\n4,Casino\n";
    let err = read_items("items", csv.as_bytes()).unwrap_err();
    assert!(matches!(err, ReelError::MalformedRecord { line: 3, .. }));
}

#[test]
fn negative_ids_load_from_a_dataset_directory() -> Result<()> {
    let dir = TempDir::new()?;
    support::write_dataset(dir.path())?;
    let mut ratings = fs::read_to_string(dir.path().join("ratings.csv"))?;
    ratings.push_str("-3,-1,4.0,964982703\n");
    fs::write(dir.path().join("ratings.csv"), ratings)?;

    let dataset = load_dataset(&DatasetPaths::in_dir(dir.path()))?;
    let last = dataset.ratings.last().expect("appended rating");
    assert_eq!(last.user_id, UserId(-3));
    assert_eq!(last.item_id, ItemId(-1));
    assert_eq!(last.score, 4.0);
    Ok(())
}

#[test]
fn short_records_are_rejected() {
    let csv = "movieId,imdbId,tmdbId\n1,0114709\n";
    let err = read_links("links", csv.as_bytes()).unwrap_err();
    assert!(matches!(err, ReelError::MalformedRecord { line: 2, .. }));
}

#[test]
fn items_without_genres_are_accepted() -> Result<()> {
    let csv = "movieId,title\n3,\"Heat, 1995\"\n";
    let items = read_items("items", csv.as_bytes())?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item_id, ItemId(3));
    assert_eq!(items[0].title, "Heat, 1995");
    assert!(items[0].genres.is_none());
    Ok(())
}

#[test]
fn header_only_and_empty_sources_are_empty() -> Result<()> {
    assert!(read_ratings("ratings", "".as_bytes())?.is_empty());
    assert!(read_ratings("ratings", "userId,movieId,rating\n".as_bytes())?.is_empty());
    Ok(())
}

#[test]
fn missing_files_surface_io_errors() -> Result<()> {
    let dir = TempDir::new()?;
    support::write_dataset(dir.path())?;
    fs::remove_file(dir.path().join("links.csv"))?;
    let err = load_dataset(&DatasetPaths::in_dir(dir.path())).unwrap_err();
    assert!(matches!(err, ReelError::Io(_)));
    Ok(())
}
