#![allow(missing_docs)]

mod support;

use reel::{Engine, EngineOptions, ItemId, Rating, ReelError, Result, UserId};

fn open() -> Result<Engine> {
    Engine::open(support::dataset(), EngineOptions::default())
}

#[test]
fn top_recommendations_prefer_the_users_taste() -> Result<()> {
    let engine = open()?;
    let user = 1;
    let rows = engine.top_recommendations(UserId(user), 5);
    let skipped = support::skipped(user);
    assert_eq!(rows.len(), skipped.len());
    assert_eq!(rows[0].item_id, ItemId(skipped[0]));
    assert!(support::in_first_group(rows[0].item_id.0));
    assert!(rows[0].predicted_rating > rows[1].predicted_rating);
    for row in &rows {
        assert!(skipped.contains(&row.item_id.0), "rated item {} returned", row.item_id);
        assert!(row.rating_count >= 25);
        assert_eq!(row.title, format!("Item {}", row.item_id));
    }
    Ok(())
}

#[test]
fn top_recommendations_respect_count_and_unknown_users() -> Result<()> {
    let engine = open()?;
    assert_eq!(engine.top_recommendations(UserId(7), 1).len(), 1);
    assert!(engine.top_recommendations(UserId(7), 0).is_empty());
    let stranger = engine.top_recommendations(UserId(9_999), 3);
    assert!(stranger.is_empty());
    Ok(())
}

#[test]
fn top_recommendations_drop_items_under_the_count_threshold() -> Result<()> {
    let mut options = EngineOptions::default();
    options.queries.top_min_ratings = 1_000;
    let engine = Engine::open(support::dataset(), options)?;
    assert!(engine.top_recommendations(UserId(1), 10).is_empty());
    Ok(())
}

#[test]
fn similar_items_lead_with_the_item_itself() -> Result<()> {
    let engine = open()?;
    let rows = engine.similar_items(ItemId(1))?;
    assert_eq!(rows.len(), support::ITEMS as usize);
    assert_eq!(rows[0].item_id, ItemId(1));
    assert_eq!(rows[0].similarity, 1.0);
    assert!(support::in_first_group(rows[1].item_id.0));
    assert!(!support::in_first_group(rows.last().map(|r| r.item_id.0).unwrap_or(1)));
    for pair in rows.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
    for row in &rows {
        assert!((-1.0..=1.0).contains(&row.similarity));
        assert!((1.0..=5.0).contains(&row.mean_rating));
    }
    Ok(())
}

#[test]
fn similar_items_honour_the_neighbour_limit() -> Result<()> {
    let mut options = EngineOptions::default();
    options.queries.similar_limit = 3;
    let engine = Engine::open(support::dataset(), options)?;
    let rows = engine.similar_items(ItemId(8))?;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].item_id, ItemId(8));
    Ok(())
}

#[test]
fn similar_items_for_an_unknown_item_fail() -> Result<()> {
    let engine = open()?;
    let err = engine.similar_items(ItemId(404)).unwrap_err();
    assert!(matches!(err, ReelError::UnknownItem(ItemId(404))));
    Ok(())
}

#[test]
fn predictions_keep_duplicates_and_drop_unknown_items() -> Result<()> {
    let engine = open()?;
    let [liked, disliked] = support::skipped(3);
    let rows = engine.ratings_for_items(
        UserId(3),
        &[ItemId(liked), ItemId(disliked), ItemId(liked), ItemId(404)],
    );
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].item_id, ItemId(liked));
    assert_eq!(rows[2].item_id, ItemId(liked));
    assert_eq!(rows[0].predicted_rating, rows[2].predicted_rating);
    assert!(rows[0].predicted_rating > rows[1].predicted_rating);
    assert_eq!(rows[0].external_ref, format!("{liked:07}"));
    Ok(())
}

#[test]
fn history_lists_each_rating_once() -> Result<()> {
    let engine = open()?;
    let rows = engine.user_history(UserId(21));
    assert_eq!(rows.len(), support::ITEMS as usize - 2);
    for row in &rows {
        let expected = if support::in_first_group(row.item_id.0) {
            1.0
        } else {
            5.0
        };
        assert_eq!(row.rating, expected);
    }
    assert!(engine.user_history(UserId(9_999)).is_empty());
    Ok(())
}

#[test]
fn training_is_reproducible() -> Result<()> {
    let first = open()?;
    let second = open()?;
    let items: Vec<ItemId> = (1..=support::ITEMS).map(ItemId).collect();
    let a = first.ratings_for_items(UserId(5), &items);
    let b = second.ratings_for_items(UserId(5), &items);
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn zero_regularization_is_rejected_before_training() {
    let mut dataset = support::dataset();
    dataset.ratings.push(Rating::new(999, 1, 4.0));
    let mut options = EngineOptions::default();
    options.training.regularization = 0.0;
    let err = Engine::open(dataset, options).err().expect("open must fail");
    assert!(matches!(err, ReelError::Invalid(_)), "{err}");
}
