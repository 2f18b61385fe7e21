#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use reel::{import::Dataset, Item, ItemExternalRef, ItemId, Rating};

pub const USERS: i64 = 40;
pub const ITEMS: i64 = 12;

/// Items `1..=6` are liked by users `1..=20` and disliked by the rest;
/// items `7..=12` the other way round.
pub fn in_first_group(item: i64) -> bool {
    item <= ITEMS / 2
}

/// Each user skips one item from each half, so every item keeps well over
/// 25 ratings and every user has unrated candidates.
pub fn skipped(user: i64) -> [i64; 2] {
    let offset = user % (ITEMS / 2);
    [offset + 1, offset + 1 + ITEMS / 2]
}

pub fn ratings() -> Vec<Rating> {
    let mut rows = Vec::new();
    for user in 1..=USERS {
        let first_group_user = user <= USERS / 2;
        for item in 1..=ITEMS {
            if skipped(user).contains(&item) {
                continue;
            }
            let likes = in_first_group(item) == first_group_user;
            let score = if likes { 5.0 } else { 1.0 };
            rows.push(Rating::new(user, item, score));
        }
    }
    rows
}

pub fn items() -> Vec<Item> {
    (1..=ITEMS)
        .map(|id| Item {
            item_id: ItemId(id),
            title: format!("Item {id}"),
            genres: Some(if in_first_group(id) { "Drama" } else { "Comedy" }.into()),
        })
        .collect()
}

pub fn links() -> Vec<ItemExternalRef> {
    (1..=ITEMS)
        .map(|id| ItemExternalRef {
            item_id: ItemId(id),
            external_id_a: format!("{id:07}"),
            external_id_b: format!("{}", 1000 + id),
        })
        .collect()
}

pub fn dataset() -> Dataset {
    Dataset {
        ratings: ratings(),
        items: items(),
        links: links(),
    }
}

pub fn ratings_csv(rows: &[Rating]) -> String {
    let mut out = String::from("userId,movieId,rating,timestamp\n");
    for (i, row) in rows.iter().enumerate() {
        let _ = writeln!(
            out,
            "{},{},{:.1},{}",
            row.user_id,
            row.item_id,
            row.score,
            964_982_703 + i
        );
    }
    out
}

/// Writes `ratings.csv`, `movies.csv`, and `links.csv` under `dir`.
pub fn write_dataset(dir: &Path) -> std::io::Result<()> {
    fs::write(dir.join("ratings.csv"), ratings_csv(&ratings()))?;

    let mut movies = String::from("movieId,title,genres\n");
    for item in items() {
        let _ = writeln!(
            movies,
            "{},\"{}, The\",{}",
            item.item_id,
            item.title,
            item.genres.unwrap_or_default()
        );
    }
    fs::write(dir.join("movies.csv"), movies)?;

    let mut out = String::from("movieId,imdbId,tmdbId\n");
    for link in links() {
        let _ = writeln!(
            out,
            "{},{},{}",
            link.item_id, link.external_id_a, link.external_id_b
        );
    }
    fs::write(dir.join("links.csv"), out)
}
