#![allow(missing_docs)]

mod support;

use reel::{
    model::FactorSnapshot, Engine, EngineOptions, ItemId, Rating, ReelError, Result, UserId,
};
use tempfile::TempDir;

#[test]
fn new_user_gets_recommendations_after_ingestion() -> Result<()> {
    let engine = Engine::open(support::dataset(), EngineOptions::default())?;
    let newcomer = UserId(500);
    assert!(engine.user_history(newcomer).is_empty());
    assert!(engine.top_recommendations(newcomer, 5).is_empty());

    let input: Vec<Rating> = (1..=4).map(|item| Rating::new(500, item, 5.0)).collect();
    let echoed = engine.add_ratings(input.clone())?;
    assert_eq!(echoed, input);
    assert_eq!(engine.generation(), 1);

    let history = engine.user_history(newcomer);
    assert_eq!(history.len(), 4);
    let top = engine.top_recommendations(newcomer, 5);
    assert_eq!(top.len(), 5);
    for row in &top {
        assert!(row.item_id.0 > 4, "already rated item {} recommended", row.item_id);
    }
    assert!(support::in_first_group(top[0].item_id.0));
    Ok(())
}

#[test]
fn ingested_rating_appears_in_history_with_catalog_details() -> Result<()> {
    let engine = Engine::open(support::dataset(), EngineOptions::default())?;
    let user = UserId(1);
    let before = engine.user_history(user);
    assert!(!before.iter().any(|row| row.item_id == ItemId(10) && row.rating == 4.5));

    engine.add_ratings(vec![Rating::new(1, 10, 4.5)])?;
    let history = engine.user_history(user);
    assert_eq!(history.len(), before.len() + 1);
    let row = history
        .iter()
        .find(|row| row.item_id == ItemId(10) && row.rating == 4.5)
        .expect("ingested rating in history");
    assert_eq!(row.title, "Item 10");
    assert_eq!(row.external_ref, "0000010");
    Ok(())
}

#[test]
fn aggregates_follow_ingested_ratings() -> Result<()> {
    let engine = Engine::open(support::dataset(), EngineOptions::default())?;
    let before = engine.ratings_for_items(UserId(1), &[ItemId(2)]);
    engine.add_ratings(vec![Rating::new(600, 2, 3.0), Rating::new(601, 2, 3.0)])?;
    let after = engine.ratings_for_items(UserId(1), &[ItemId(2)]);
    assert_eq!(after[0].rating_count, before[0].rating_count + 2);

    let stats = engine.stats();
    assert_eq!(stats.ratings, support::ratings().len() + 2);
    assert_eq!(stats.users, support::USERS as usize + 2);
    assert_eq!(stats.trained_users, support::USERS as usize + 2);
    Ok(())
}

#[test]
fn repeated_ratings_are_kept_but_history_is_distinct() -> Result<()> {
    let engine = Engine::open(support::dataset(), EngineOptions::default())?;
    let twice = vec![Rating::new(700, 3, 4.0), Rating::new(700, 3, 4.0)];
    engine.add_ratings(twice)?;
    assert_eq!(engine.stats().ratings, support::ratings().len() + 2);
    assert_eq!(engine.user_history(UserId(700)).len(), 1);
    Ok(())
}

#[test]
fn empty_ingestion_still_publishes_a_generation() -> Result<()> {
    let engine = Engine::open(support::dataset(), EngineOptions::default())?;
    let echoed = engine.add_ratings(Vec::new())?;
    assert!(echoed.is_empty());
    assert_eq!(engine.generation(), 1);
    assert_eq!(engine.stats().ratings, support::ratings().len());
    Ok(())
}

#[test]
fn saved_factors_reproduce_predictions() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("factors.json");
    let engine = Engine::open(support::dataset(), EngineOptions::default())?;
    engine.add_ratings(vec![Rating::new(800, 7, 5.0)])?;
    engine.export_snapshot().save(&path)?;

    let model = FactorSnapshot::load(&path)?.into_model()?;
    assert_eq!(model.trained_on(), support::ratings().len() + 1);
    let mut dataset = support::dataset();
    dataset.ratings.push(Rating::new(800, 7, 5.0));
    let reloaded = Engine::open_with_model(dataset, EngineOptions::default(), model);

    let items: Vec<ItemId> = (1..=support::ITEMS).map(ItemId).collect();
    let live = engine.ratings_for_items(UserId(800), &items);
    let restored = reloaded.ratings_for_items(UserId(800), &items);
    assert_eq!(live.len(), support::ITEMS as usize);
    assert_eq!(live.len(), restored.len());
    for (a, b) in live.iter().zip(&restored) {
        assert_eq!(a.item_id, b.item_id);
        assert_eq!(a.rating_count, b.rating_count);
        assert!((a.predicted_rating - b.predicted_rating).abs() < 1e-4);
    }
    Ok(())
}

#[test]
fn snapshot_with_unknown_version_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("factors.json");
    let engine = Engine::open(support::dataset(), EngineOptions::default())?;
    let mut snapshot = engine.export_snapshot();
    snapshot.version += 1;
    snapshot.save(&path)?;
    let err = FactorSnapshot::load(&path).unwrap_err();
    assert!(matches!(err, ReelError::Snapshot(_)));
    Ok(())
}
