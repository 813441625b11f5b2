use cardbox_core::model::card::parse_card_id;
use cardbox_core::{split_tags, Card, CardStatus, CardValidationError};
use proptest::prelude::*;
use uuid::Uuid;

#[test]
fn card_new_sets_defaults() {
    let card = Card::new("title", "body", vec!["a".to_string()]);

    assert!(!card.id.is_nil());
    assert_eq!(card.status, CardStatus::Active);
    assert_eq!(card.created_at, card.updated_at);
    assert!(card.attachments.is_empty());
    assert!(card.is_active());
    card.validate().unwrap();
}

#[test]
fn card_serialization_uses_document_field_names() {
    let card_id = Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap();
    let card = Card::with_id(
        card_id,
        "Groceries",
        "milk",
        vec!["home".to_string()],
        1_700_000_000_000,
    );

    let json = serde_json::to_value(&card).unwrap();
    assert_eq!(json["_id"], card_id.to_string());
    assert_eq!(json["status"], "active");
    assert_eq!(json["tags"][0], "home");
    assert_eq!(json["created_at"], 1_700_000_000_000_i64);
    assert_eq!(json["updated_at"], 1_700_000_000_000_i64);
    assert_eq!(json["deleted"], false);

    let decoded: Card = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, card);
}

#[test]
fn validate_rejects_empty_tags_and_nil_id() {
    let mut card = Card::new("t", "c", vec![String::new()]);
    assert_eq!(card.validate(), Err(CardValidationError::EmptyTag));

    card.tags.clear();
    card.id = Uuid::nil();
    assert_eq!(card.validate(), Err(CardValidationError::NilId));
}

#[test]
fn validate_rejects_updated_before_created() {
    let mut card = Card::new("t", "c", Vec::new());
    card.updated_at = card.created_at - 1;
    assert!(matches!(
        card.validate(),
        Err(CardValidationError::UpdatedBeforeCreated { .. })
    ));
}

#[test]
fn parse_card_id_rejects_garbage() {
    assert!(matches!(
        parse_card_id("not-a-card"),
        Err(CardValidationError::InvalidId(raw)) if raw == "not-a-card"
    ));
    let id = Uuid::new_v4();
    assert_eq!(parse_card_id(&id.to_string()).unwrap(), id);
}

#[test]
fn split_tags_matches_documented_example() {
    assert_eq!(split_tags("a#b##c#"), vec!["a", "b", "c"]);
}

proptest! {
    #[test]
    fn split_tags_never_yields_empty_and_preserves_order(
        segments in proptest::collection::vec("[a-z]{0,4}", 0..12)
    ) {
        let raw = segments.join("#");
        let tags = split_tags(&raw);
        prop_assert!(tags.iter().all(|tag| !tag.is_empty()));
        let expected: Vec<String> = segments.into_iter().filter(|s| !s.is_empty()).collect();
        prop_assert_eq!(tags, expected);
    }
}
