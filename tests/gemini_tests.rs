//! Gemini REST adapter tests against a mock HTTP server

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voice_ledger::application::ports::{LedgerStore, ModelError, SpeechSynthesizer};
use voice_ledger::application::{ChatDispatcher, ChatError, RetryPolicy, TurnInput};
use voice_ledger::domain::conversation::{RecordCard, TurnAttachment};
use voice_ledger::domain::ledger::User;
use voice_ledger::infrastructure::{GeminiChatModel, GeminiSpeechSynthesizer, InMemoryLedgerStore};

const MODEL: &str = "test-model";
const ENDPOINT: &str = "/models/test-model:generateContent";

fn reply(parts: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{ "content": { "role": "model", "parts": parts } }]
    }))
}

fn chat_model(server: &MockServer) -> GeminiChatModel {
    GeminiChatModel::with_model("test-key", MODEL).with_base_url(server.uri())
}

fn dispatcher(server: &MockServer) -> ChatDispatcher<GeminiChatModel, InMemoryLedgerStore> {
    ChatDispatcher::new(chat_model(server), InMemoryLedgerStore::new())
        .with_retry(RetryPolicy::immediate())
}

#[tokio::test]
async fn text_reply_becomes_model_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(query_param("key", "test-key"))
        .respond_with(reply(json!([{ "text": "You spent 40 this week." }])))
        .expect(1)
        .mount(&server)
        .await;

    let mut user = User::new("ana@example.com", "Ana");
    let turn = dispatcher(&server)
        .submit(&mut user, TurnInput::text("How much did I spend?"))
        .await
        .unwrap();

    assert_eq!(turn.text.as_deref(), Some("You spent 40 this week."));
    assert!(turn.attachment.is_none());
    assert!(!turn.is_error);
}

#[tokio::test]
async fn function_call_is_executed_and_answered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(reply(json!([{
            "functionCall": {
                "name": "addExpense",
                "args": { "amount": "12.50", "category": "Food", "description": "Lunch", "date": "2026-10-18" }
            }
        }])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(reply(json!([{ "text": "Saved your lunch." }])))
        .mount(&server)
        .await;

    let mut dispatcher = dispatcher(&server);
    let mut user = User::new("ana@example.com", "Ana");
    let turn = dispatcher
        .submit(&mut user, TurnInput::text("I spent 12.50 on lunch"))
        .await
        .unwrap();

    assert_eq!(turn.text.as_deref(), Some("Saved your lunch."));
    match turn.attachment {
        Some(TurnAttachment::Card(RecordCard::Expense(expense))) => {
            assert_eq!(expense.amount, 12.5);
            assert_eq!(expense.category, "Food");
        }
        other => panic!("expected expense card, got {:?}", other),
    }

    let stored = dispatcher.store().get_expenses("ana@example.com").await.unwrap();
    assert_eq!(stored.len(), 1);

    // Second request carries the tool result back to the model
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let body: Value = serde_json::from_slice(&requests[1].body).unwrap();
    let contents = body["contents"].as_array().unwrap();
    let last = &contents[contents.len() - 1];
    assert_eq!(last["parts"][0]["functionResponse"]["name"], "addExpense");
    assert_eq!(last["parts"][0]["functionResponse"]["response"]["success"], true);
}

#[tokio::test]
async fn unauthorized_maps_to_invalid_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut user = User::new("ana@example.com", "Ana");
    let mut dispatcher = dispatcher(&server);
    let err = dispatcher
        .submit(&mut user, TurnInput::text("hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Model(ModelError::InvalidApiKey)));
    let last = dispatcher.history().last().unwrap();
    assert!(last.is_error);
}

#[tokio::test]
async fn rate_limit_is_retried_then_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let mut user = User::new("ana@example.com", "Ana");
    let err = dispatcher(&server)
        .submit(&mut user, TurnInput::text("hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Model(ModelError::RateLimited)));
    assert!(server.received_requests().await.unwrap().len() > 1);
}

#[tokio::test]
async fn transient_failure_recovers_on_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(reply(json!([{ "text": "Back online." }])))
        .mount(&server)
        .await;

    let mut user = User::new("ana@example.com", "Ana");
    let turn = dispatcher(&server)
        .submit(&mut user, TurnInput::text("hi"))
        .await
        .unwrap();
    assert_eq!(turn.text.as_deref(), Some("Back online."));
}

#[tokio::test]
async fn client_error_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let mut user = User::new("ana@example.com", "Ana");
    let err = dispatcher(&server)
        .submit(&mut user, TurnInput::text("hi"))
        .await
        .unwrap_err();

    match err {
        ChatError::Model(ModelError::ApiError(message)) => assert!(message.contains("bad request")),
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn speech_decodes_inline_pcm() {
    let server = MockServer::start().await;
    let pcm = STANDARD.encode([0u8, 0, 255, 127, 0, 128]);
    Mock::given(method("POST"))
        .and(path("/models/tts-model:generateContent"))
        .respond_with(reply(json!([{
            "inlineData": { "mimeType": "audio/L16;codec=pcm;rate=24000", "data": pcm }
        }])))
        .mount(&server)
        .await;

    let tts = GeminiSpeechSynthesizer::new("test-key")
        .with_model("tts-model")
        .with_voice("Kore")
        .with_base_url(server.uri());
    let audio = tts.synthesize("Saved your lunch.").await.unwrap();

    assert_eq!(audio.sample_rate(), 24000);
    assert_eq!(audio.samples().len(), 3);
    assert!(audio.samples()[1] > 0.99);
    assert!(audio.samples()[2] <= -0.99);

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
        "Kore"
    );
}

#[tokio::test]
async fn speech_without_audio_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/tts-model:generateContent"))
        .respond_with(reply(json!([{ "text": "no audio here" }])))
        .mount(&server)
        .await;

    let tts = GeminiSpeechSynthesizer::new("test-key")
        .with_model("tts-model")
        .with_base_url(server.uri());
    assert_eq!(
        tts.synthesize("hello").await.unwrap_err(),
        ModelError::EmptyResponse
    );
}
