use cardbox_core::db::open_db_in_memory;
use cardbox_core::{
    Card, CardPatch, CardRepository, CardStatus, QueryBuilder, RepoError, SqliteCardRepository,
};
use rusqlite::params;
use uuid::Uuid;

#[test]
fn insert_and_find_one_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::new(&conn);

    let card = Card::new("first", "body", vec!["a".to_string(), "a".to_string()]);
    let id = repo.insert(&card).unwrap();

    let loaded = repo.find_one(id).unwrap().unwrap();
    assert_eq!(loaded, card);
}

#[test]
fn find_one_hides_soft_deleted_cards() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::new(&conn);

    let card = Card::new("gone", "", Vec::new());
    repo.insert(&card).unwrap();
    repo.soft_delete(card.id, card.created_at + 1).unwrap();

    assert!(repo.find_one(card.id).unwrap().is_none());

    let (deleted, status): (i64, String) = conn
        .query_row(
            "SELECT deleted, status FROM cards WHERE _id = ?1;",
            [card.id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(status, CardStatus::Removed.as_str());
}

#[test]
fn soft_delete_twice_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::new(&conn);

    let card = Card::new("once", "", Vec::new());
    repo.insert(&card).unwrap();
    repo.soft_delete(card.id, card.created_at).unwrap();

    let err = repo.soft_delete(card.id, card.created_at).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == card.id));
}

#[test]
fn update_only_touches_supplied_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::new(&conn);

    let card = Card::new("title", "content", vec!["x".to_string()]);
    repo.insert(&card).unwrap();

    let patch = CardPatch {
        content: Some("new content".to_string()),
        ..CardPatch::default()
    };
    repo.update(card.id, &patch, card.created_at + 50).unwrap();

    let loaded = repo.find_one(card.id).unwrap().unwrap();
    assert_eq!(loaded.title, "title");
    assert_eq!(loaded.content, "new content");
    assert_eq!(loaded.tags, vec!["x"]);
    assert_eq!(loaded.created_at, card.created_at);
    assert_eq!(loaded.updated_at, card.created_at + 50);
}

#[test]
fn update_missing_card_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::new(&conn);

    let missing = Uuid::new_v4();
    let err = repo
        .update(missing, &CardPatch::default(), 1)
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn find_many_applies_filters_sort_and_paging() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::new(&conn);

    for (index, title) in ["c", "a", "b", "d"].iter().enumerate() {
        let card = Card::with_id(Uuid::new_v4(), *title, "", Vec::new(), 1_000 + index as i64);
        repo.insert(&card).unwrap();
    }
    let hidden = Card::with_id(Uuid::new_v4(), "a", "", Vec::new(), 5_000);
    repo.insert(&hidden).unwrap();
    repo.soft_delete(hidden.id, 5_001).unwrap();

    let query = QueryBuilder::new("test")
        .order_by(Some("title"))
        .paginate(Some(2), Some(2))
        .build();
    let batch = repo.find_many(&query).unwrap();
    let titles: Vec<_> = batch.cards.iter().map(|card| card.title.as_str()).collect();
    assert_eq!(titles, vec!["c", "d"]);
    assert_eq!(repo.count(&query).unwrap(), 4);

    let filtered = QueryBuilder::new("test").filter("title:a").build();
    assert_eq!(repo.count(&filtered).unwrap(), 1);
    assert_eq!(repo.find_many(&filtered).unwrap().cards.len(), 1);
}

#[test]
fn find_many_default_sort_is_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::new(&conn);

    let older = Card::with_id(Uuid::new_v4(), "older", "", Vec::new(), 1_000);
    let newer = Card::with_id(Uuid::new_v4(), "newer", "", Vec::new(), 2_000);
    repo.insert(&older).unwrap();
    repo.insert(&newer).unwrap();

    let query = QueryBuilder::new("test").order_by(Some("bogus")).build();
    let batch = repo.find_many(&query).unwrap();
    assert_eq!(batch.cards[0].id, newer.id);
    assert_eq!(batch.cards[1].id, older.id);
}

#[test]
fn find_many_skips_rows_that_fail_to_decode() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::new(&conn);

    let good = Card::new("good", "", Vec::new());
    repo.insert(&good).unwrap();

    let broken_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO cards (_id, title, content, tags, status, attachments, created_at, updated_at, deleted)
         VALUES (?1, 'broken', '', 'not json', 'active', '[]', 1, 1, 0);",
        params![broken_id],
    )
    .unwrap();

    let query = QueryBuilder::new("test").build();
    let batch = repo.find_many(&query).unwrap();
    assert_eq!(batch.cards.len(), 1);
    assert_eq!(batch.cards[0].id, good.id);
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].id.as_deref(), Some(broken_id.as_str()));
    assert_eq!(repo.count(&query).unwrap(), 2);
}

#[test]
fn filter_values_are_bound_not_interpolated() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::new(&conn);
    repo.insert(&Card::new("safe", "", Vec::new())).unwrap();

    let query = QueryBuilder::new("test")
        .filter("title:x' OR '1'='1")
        .build();
    assert_eq!(repo.count(&query).unwrap(), 0);
    assert!(repo.find_many(&query).unwrap().cards.is_empty());
}

#[test]
fn insert_rejects_empty_tag() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::new(&conn);

    let card = Card::new("t", "c", vec![String::new()]);
    assert!(matches!(
        repo.insert(&card).unwrap_err(),
        RepoError::Validation(_)
    ));
}

#[test]
fn mutation_timestamps_never_precede_creation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCardRepository::new(&conn);

    let edited = Card::with_id(Uuid::new_v4(), "edited", "", Vec::new(), 10_000);
    let removed = Card::with_id(Uuid::new_v4(), "removed", "", Vec::new(), 10_000);
    repo.insert(&edited).unwrap();
    repo.insert(&removed).unwrap();

    let patch = CardPatch {
        title: Some("clock went back".to_string()),
        ..CardPatch::default()
    };
    repo.update(edited.id, &patch, 9_000).unwrap();
    repo.soft_delete(removed.id, 9_000).unwrap();

    let loaded = repo.find_one(edited.id).unwrap().unwrap();
    assert_eq!(loaded.updated_at, loaded.created_at);
    assert!(loaded.validate().is_ok());

    let removed_updated_at: i64 = conn
        .query_row(
            "SELECT updated_at FROM cards WHERE _id = ?1;",
            [removed.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(removed_updated_at, 10_000);
}
