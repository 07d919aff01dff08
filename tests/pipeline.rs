mod common;

use common::{HashingEmbedder, MemoryStore, ScriptedChat, SAMPLE_BOOKS};
use smart_librarian::{
    models::TitleExtraction,
    scripts::ingest_books,
    services::{
        chat_completion::Role,
        dataset::parse_book_summaries,
        recommendation::{INAPPROPRIATE_MESSAGE, NO_MATCH_MESSAGE},
        RecommendationOptions, RecommendationService, Retriever, SummaryIndex, VectorStore,
    },
};
use std::sync::{atomic::Ordering, Arc};

fn options(top_k: usize) -> RecommendationOptions {
    RecommendationOptions {
        top_k,
        model: "gpt-4o-mini".to_string(),
        temperature: 0.4,
    }
}

#[tokio::test]
async fn ingest_uses_one_batched_embedding_call() {
    let records = parse_book_summaries(SAMPLE_BOOKS).unwrap();
    let embedder = HashingEmbedder::default();
    let store = MemoryStore::default();

    let report = ingest_books(&records, &embedder, &store).await.unwrap();

    assert_eq!(report.upserted, 3);
    assert_eq!(report.total_in_collection, 3);
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reingesting_overwrites_by_id() {
    let records = parse_book_summaries(SAMPLE_BOOKS).unwrap();
    let embedder = HashingEmbedder::default();
    let store = MemoryStore::default();

    ingest_books(&records, &embedder, &store).await.unwrap();
    let report = ingest_books(&records, &embedder, &store).await.unwrap();

    assert_eq!(report.total_in_collection, 3);
}

#[tokio::test]
async fn empty_record_set_skips_embedding() {
    let embedder = HashingEmbedder::default();
    let store = MemoryStore::default();

    let report = ingest_books(&[], &embedder, &store).await.unwrap();

    assert_eq!(report.upserted, 0);
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_record_set_reports_existing_items() {
    let records = parse_book_summaries(SAMPLE_BOOKS).unwrap();
    let embedder = HashingEmbedder::default();
    let store = MemoryStore::default();
    ingest_books(&records, &embedder, &store).await.unwrap();

    let report = ingest_books(&[], &embedder, &store).await.unwrap();

    assert_eq!(report.upserted, 0);
    assert_eq!(report.total_in_collection, 3);
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn title_with_offensive_word_reaches_the_model_without_moderation() {
    let records = parse_book_summaries(SAMPLE_BOOKS).unwrap();
    let embedder = Arc::new(HashingEmbedder::default());
    let store = Arc::new(MemoryStore::default());
    ingest_books(&records, embedder.as_ref(), store.as_ref())
        .await
        .unwrap();

    let chat = Arc::new(ScriptedChat::new("RECOMMENDATION_TITLE: 1984\nO distopie clasică."));
    let service = RecommendationService::new(
        Retriever::new(embedder, store),
        chat.clone(),
        Arc::new(SummaryIndex::from_records(&records)),
    );

    let result = service
        .recommend("ceva ca The Idiot de Dostoievski", &options(2))
        .await
        .unwrap();

    assert_ne!(result.response_text, INAPPROPRIATE_MESSAGE);
    assert_eq!(result.extracted_title(), Some("1984"));
    assert_eq!(result.hits.len(), 2);
    assert_eq!(chat.calls(), 1);
}

#[tokio::test]
async fn retrieving_by_title_surfaces_that_book() {
    let records = parse_book_summaries(SAMPLE_BOOKS).unwrap();
    let embedder = Arc::new(HashingEmbedder::default());
    let store = Arc::new(MemoryStore::default());
    ingest_books(&records, embedder.as_ref(), store.as_ref())
        .await
        .unwrap();

    let retriever = Retriever::new(embedder, store);
    let hits = retriever.retrieve("The Hobbit", 2).await.unwrap();

    assert!(hits.len() <= 2);
    assert!(hits.iter().any(|h| h.title == "The Hobbit"));
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    for hit in &hits {
        assert!((hit.similarity - (1.0 - hit.distance)).abs() < f32::EPSILON);
    }
}

#[tokio::test]
async fn recommendation_round_trip_attaches_summary() {
    let records = parse_book_summaries(SAMPLE_BOOKS).unwrap();
    let embedder = Arc::new(HashingEmbedder::default());
    let store = Arc::new(MemoryStore::default());
    ingest_books(&records, embedder.as_ref(), store.as_ref())
        .await
        .unwrap();

    let chat = Arc::new(ScriptedChat::new(
        "recommendation_title: Pride and Prejudice\nO poveste despre prejudecăți și iubire.",
    ));
    let service = RecommendationService::new(
        Retriever::new(embedder, store),
        chat.clone(),
        Arc::new(SummaryIndex::from_records(&records)),
    );

    let result = service
        .recommend("o carte despre iubire și căsătorie", &options(3))
        .await
        .unwrap();

    assert_eq!(result.extracted_title(), Some("Pride and Prejudice"));
    assert_eq!(
        result.summary.as_deref(),
        Some("Elizabeth Bennet and Mr. Darcy overcome pride and prejudice in Regency England.")
    );
    assert_eq!(result.hits.len(), 3);
    assert!(result.render().contains("\n\nRezumat detaliat:\n"));

    let requests = chat.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.model, "gpt-4o-mini");
    assert_eq!(request.temperature, 0.4);
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.messages[1].role, Role::User);
    assert!(request.messages[1].content.contains("- The Hobbit\nTitle: The Hobbit\n"));
    assert!(request.messages[1]
        .content
        .contains("Întrebare: o carte despre iubire și căsătorie"));
}

#[tokio::test]
async fn unparseable_reply_keeps_raw_text() {
    let records = parse_book_summaries(SAMPLE_BOOKS).unwrap();
    let embedder = Arc::new(HashingEmbedder::default());
    let store = Arc::new(MemoryStore::default());
    ingest_books(&records, embedder.as_ref(), store.as_ref())
        .await
        .unwrap();

    let reply = "Îți recomand 1984, o carte despre supraveghere.";
    let service = RecommendationService::new(
        Retriever::new(embedder, store),
        Arc::new(ScriptedChat::new(reply)),
        Arc::new(SummaryIndex::from_records(&records)),
    );

    let result = service.recommend("supraveghere", &options(2)).await.unwrap();

    assert_eq!(result.title, TitleExtraction::Unparseable);
    assert_eq!(result.response_text, reply);
    assert_eq!(result.summary, None);
    assert_eq!(result.render(), reply);
}

#[tokio::test]
async fn empty_collection_returns_apology_without_model_call() {
    let chat = Arc::new(ScriptedChat::new("RECOMMENDATION_TITLE: 1984"));
    let store = Arc::new(MemoryStore::default());
    assert_eq!(store.count().await.unwrap(), 0);

    let service = RecommendationService::new(
        Retriever::new(Arc::new(HashingEmbedder::default()), store),
        chat.clone(),
        Arc::new(SummaryIndex::default()),
    );

    let result = service.recommend("magie", &options(4)).await.unwrap();

    assert_eq!(result.response_text, NO_MATCH_MESSAGE);
    assert_eq!(result.title, TitleExtraction::NotAttempted);
    assert_eq!(chat.calls(), 0);
}

#[tokio::test]
async fn unknown_title_from_model_gets_sentinel_summary() {
    let records = parse_book_summaries(SAMPLE_BOOKS).unwrap();
    let embedder = Arc::new(HashingEmbedder::default());
    let store = Arc::new(MemoryStore::default());
    ingest_books(&records, embedder.as_ref(), store.as_ref())
        .await
        .unwrap();

    let service = RecommendationService::new(
        Retriever::new(embedder, store),
        Arc::new(ScriptedChat::new("RECOMMENDATION_TITLE: Brave New World\nAlt text.")),
        Arc::new(SummaryIndex::from_records(&records)),
    );

    let result = service.recommend("distopie", &options(2)).await.unwrap();

    assert_eq!(result.extracted_title(), Some("Brave New World"));
    assert_eq!(
        result.summary.as_deref(),
        Some("Nu am găsit rezumatul pentru acest titlu.")
    );
}
