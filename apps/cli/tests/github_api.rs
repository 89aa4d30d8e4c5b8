//! Deck retrieval against a local stand-in for the GitHub contents API.

mod common;

use common::FakeGitHub;
use flasher_core::{serialize_deck, Card};
use flasher_lib::github::{DeckError, DeckSource};
use flasher_lib::http::ReqwestClient;
use pretty_assertions::assert_eq;

async fn source(repo: &FakeGitHub, token: Option<&str>) -> DeckSource<ReqwestClient> {
    let base = repo.start().await;
    let client = ReqwestClient::new(token.map(str::to_string)).unwrap();
    DeckSource::with_api_url(client, base)
}

fn sample_cards() -> Vec<Card> {
    vec![
        Card::new("What is ownership?\n", "Each value has a single owner.\n"),
        Card::new(
            "What prints?\n```rust\nprintln!(\"{}\", 1 + 1);\n```\n",
            "`2`\n",
        ),
        Card::new("Euler's identity", "$$e^{i\\pi} + 1 = 0$$"),
    ]
}

#[tokio::test]
async fn deck_round_trips_through_repository() {
    let repo = FakeGitHub::new();
    let cards = sample_cards();
    repo.put("decks/rust.deck", serialize_deck(&cards).unwrap());
    let source = source(&repo, None).await;

    let deck = source.fetch_deck("o", "r", "decks/rust.deck").await.unwrap();

    assert_eq!(deck.name, "rust");
    assert_eq!(deck.cards, cards);
}

#[tokio::test]
async fn listing_keeps_only_deck_files() {
    let repo = FakeGitHub::new();
    repo.put("decks/a.deck", "");
    repo.put("decks/b.deck", "");
    repo.put("decks/notes.txt", "not a deck");
    let source = source(&repo, None).await;

    let names: Vec<String> = source
        .list_deck_files("o", "r", "decks")
        .await
        .into_iter()
        .map(|file| file.name)
        .collect();

    assert_eq!(names, vec!["a.deck", "b.deck"]);
}

#[tokio::test]
async fn search_filters_by_name() {
    let repo = FakeGitHub::new();
    repo.put("decks/algebra.deck", "");
    repo.put("decks/calculus.deck", "");
    let source = source(&repo, None).await;

    let found = source
        .search_deck_files("o", "r", "decks", Some("ALG"))
        .await;

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "algebra.deck");
    assert_eq!(found[0].path, "decks/algebra.deck");
}

#[tokio::test]
async fn missing_folder_lists_nothing() {
    let repo = FakeGitHub::new();
    let source = source(&repo, None).await;

    assert!(source.list_deck_files("o", "r", "decks").await.is_empty());
}

#[tokio::test]
async fn missing_deck_is_a_fetch_error() {
    let repo = FakeGitHub::new();
    let source = source(&repo, None).await;

    let err = source
        .fetch_deck("o", "r", "decks/missing.deck")
        .await
        .unwrap_err();
    assert!(matches!(err, DeckError::Fetch(_)));
}

#[tokio::test]
async fn malformed_deck_is_a_parse_error() {
    let repo = FakeGitHub::new();
    repo.put("decks/bad.deck", "front: only a mapping\n");
    let source = source(&repo, None).await;

    let err = source.fetch_deck("o", "r", "decks/bad.deck").await.unwrap_err();
    assert!(matches!(err, DeckError::Parse(_)));
}

#[tokio::test]
async fn token_is_sent_as_bearer() {
    let repo = FakeGitHub::new();
    repo.put("decks/a.deck", "");
    let source = source(&repo, Some("ghp_test")).await;

    source.list_deck_files("o", "r", "decks").await;

    assert_eq!(repo.auth_headers(), vec![Some("Bearer ghp_test".to_string())]);
}

#[tokio::test]
async fn unreachable_server_lists_nothing() {
    let client = ReqwestClient::new(None).unwrap();
    // Port 9 (discard) on loopback refuses connections.
    let source = DeckSource::with_api_url(client, "http://127.0.0.1:9");

    assert!(source.list_deck_files("o", "r", "decks").await.is_empty());
    assert!(matches!(
        source.fetch_deck("o", "r", "decks/a.deck").await,
        Err(DeckError::Fetch(_))
    ));
}
