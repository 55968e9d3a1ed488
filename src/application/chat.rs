//! Turn-based chat use case
//!
//! One turn sends the user's text and/or voice note, resolves any function
//! calls through the tool bridge, and ends with exactly one model or error
//! turn in the history.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::audio::AudioData;
use crate::domain::conversation::{
    tool_declarations, ChatTurn, ChatTurnState, ConversationTurn, ModelMessage, ModelReply,
    RecordCard, SystemPrompt, ToolDeclaration, ToolOutput,
};
use crate::domain::error::{InvalidStateTransition, ValidationError};
use crate::domain::ledger::User;

use super::ports::{
    ChatModel, ChatRequest, LedgerStore, ModelError, SpeechPlayback, SpeechSynthesizer,
};
use super::retry::RetryPolicy;
use super::tool_bridge::ToolExecutionBridge;

/// Voice notes smaller than this are rejected before sending
pub const MIN_VOICE_NOTE_BYTES: usize = 1024;

/// Upper bound on consecutive tool round-trips within one turn
pub const MAX_TOOL_ROUNDS: usize = 5;

/// Errors from the chat use case
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Model(#[from] ModelError),

    #[error("The assistant kept calling tools without answering ({0} rounds)")]
    TooManyToolRounds(usize),

    #[error(transparent)]
    State(#[from] InvalidStateTransition),
}

/// What the user sent
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    pub text: Option<String>,
    pub audio: Option<AudioData>,
}

impl TurnInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            audio: None,
        }
    }

    pub fn voice(audio: AudioData) -> Self {
        Self {
            text: None,
            audio: Some(audio),
        }
    }

    /// Voice-originated turns get their reply spoken
    pub fn is_voice(&self) -> bool {
        self.audio.is_some()
    }

    /// Reject empty turns and clipped voice notes
    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_text = self.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        if !has_text && self.audio.is_none() {
            return Err(ValidationError::EmptyTurn);
        }
        if let Some(audio) = &self.audio {
            if audio.size_bytes() < MIN_VOICE_NOTE_BYTES {
                return Err(ValidationError::AudioTooShort {
                    size: audio.size_bytes(),
                });
            }
        }
        Ok(())
    }
}

/// Speaks replies to voice turns
pub struct SpeechOutput {
    synthesizer: Box<dyn SpeechSynthesizer>,
    playback: Box<dyn SpeechPlayback>,
}

impl SpeechOutput {
    pub fn new(synthesizer: Box<dyn SpeechSynthesizer>, playback: Box<dyn SpeechPlayback>) -> Self {
        Self {
            synthesizer,
            playback,
        }
    }

    /// Synthesize and play. Failures are logged, never surfaced.
    async fn speak(&self, text: &str) {
        let audio = match self.synthesizer.synthesize(text).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(error = %e, "speech synthesis failed");
                return;
            }
        };
        if let Err(e) = self.playback.play(&audio).await {
            warn!(error = %e, "speech playback failed");
        }
    }
}

/// Conversation context of the active user, kept for the UI session only
#[derive(Debug, Default)]
struct ChatContext {
    user_id: String,
    system_instruction: String,
    messages: Vec<ModelMessage>,
    history: Vec<ConversationTurn>,
}

struct Resolution {
    text: Option<String>,
    card: Option<RecordCard>,
}

/// Turn-based chat dispatcher
pub struct ChatDispatcher<M, S>
where
    M: ChatModel,
    S: LedgerStore,
{
    model: M,
    bridge: ToolExecutionBridge<S>,
    speech: Option<SpeechOutput>,
    retry: RetryPolicy,
    tools: Vec<ToolDeclaration>,
    context: ChatContext,
    turn: ChatTurn,
}

impl<M, S> ChatDispatcher<M, S>
where
    M: ChatModel,
    S: LedgerStore,
{
    /// Create a dispatcher with default retry and no speech output
    pub fn new(model: M, store: S) -> Self {
        Self {
            model,
            bridge: ToolExecutionBridge::new(store),
            speech: None,
            retry: RetryPolicy::default(),
            tools: tool_declarations(),
            context: ChatContext::default(),
            turn: ChatTurn::new(),
        }
    }

    /// Speak replies to voice turns
    pub fn with_speech(mut self, speech: SpeechOutput) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Visible conversation of the active user, in order
    pub fn history(&self) -> &[ConversationTurn] {
        &self.context.history
    }

    pub fn state(&self) -> ChatTurnState {
        self.turn.state()
    }

    pub fn store(&self) -> &S {
        self.bridge.store()
    }

    /// Send one turn and resolve it completely.
    ///
    /// On failure an error turn is appended, the model context is rolled
    /// back to where it was before the turn, and the error is returned.
    pub async fn submit(
        &mut self,
        user: &mut User,
        input: TurnInput,
    ) -> Result<ConversationTurn, ChatError> {
        input.validate()?;
        self.ensure_context(user);

        let text = input.text.filter(|t| !t.trim().is_empty());
        let spoken = input.audio.is_some();
        let checkpoint = self.context.messages.len();

        self.turn.begin()?;
        self.context
            .history
            .push(ConversationTurn::user(text.clone(), input.audio.clone()));
        self.context
            .messages
            .push(ModelMessage::user_turn(text.as_deref(), input.audio.as_ref()));

        let outcome = resolve_turn(
            &self.model,
            &self.bridge,
            &self.retry,
            &self.tools,
            &mut self.context,
            &mut self.turn,
            user,
        )
        .await;

        match outcome {
            Ok(resolution) => {
                self.turn.complete()?;
                let model_turn = ConversationTurn::model(resolution.text, resolution.card);
                self.context.history.push(model_turn.clone());

                if spoken {
                    if let (Some(speech), Some(reply)) = (&self.speech, &model_turn.text) {
                        speech.speak(reply).await;
                    }
                }
                Ok(model_turn)
            }
            Err(err) => {
                let _ = self.turn.fail();
                self.context.messages.truncate(checkpoint);
                self.context.history.push(ConversationTurn::error(err.to_string()));
                warn!(error = %err, "chat turn failed");
                Err(err)
            }
        }
    }

    /// Start a fresh context when the active user changes. The instruction
    /// is rebuilt every turn so the clock and budget it states stay current.
    fn ensure_context(&mut self, user: &User) {
        let instruction = SystemPrompt::chat(user, Utc::now()).into_content();
        if self.context.user_id == user.id {
            self.context.system_instruction = instruction;
            return;
        }
        info!(user = %user.id, "starting new conversation");
        self.context = ChatContext {
            user_id: user.id.clone(),
            system_instruction: instruction,
            messages: Vec::new(),
            history: Vec::new(),
        };
    }
}

async fn resolve_turn<M: ChatModel, S: LedgerStore>(
    model: &M,
    bridge: &ToolExecutionBridge<S>,
    retry: &RetryPolicy,
    tools: &[ToolDeclaration],
    context: &mut ChatContext,
    turn: &mut ChatTurn,
    user: &mut User,
) -> Result<Resolution, ChatError> {
    let mut reply = send(model, retry, tools, context).await?;
    let mut card = None;
    let mut confirmation = None;

    while reply.has_function_calls() {
        if turn.tool_rounds() >= MAX_TOOL_ROUNDS {
            return Err(ChatError::TooManyToolRounds(MAX_TOOL_ROUNDS));
        }
        turn.tools_requested()?;
        debug!(
            round = turn.tool_rounds(),
            calls = reply.function_calls.len(),
            "resolving function calls"
        );

        context.messages.push(reply.to_message());
        let mut results = Vec::with_capacity(reply.function_calls.len());
        for call in &reply.function_calls {
            let (outcome, result) = bridge.resolve(call, user).await;
            if let Ok(output) = &outcome {
                match output {
                    ToolOutput::ManualEntryRequested { hint } => context
                        .history
                        .push(ConversationTurn::form_request(hint.clone())),
                    ToolOutput::BudgetSet(updated) => *user = updated.clone(),
                    _ => {}
                }
                if let Some(c) = output.card() {
                    card = Some(c);
                }
                if let Some(c) = output.confirmation() {
                    confirmation = Some(c);
                }
            }
            results.push(result);
        }
        context.messages.push(ModelMessage::tool_results(results));
        turn.tools_resolved()?;

        reply = send(model, retry, tools, context).await?;
    }

    context.messages.push(reply.to_message());
    let text = reply
        .text
        .filter(|t| !t.trim().is_empty())
        .or(confirmation);
    Ok(Resolution { text, card })
}

async fn send<M: ChatModel>(
    model: &M,
    retry: &RetryPolicy,
    tools: &[ToolDeclaration],
    context: &ChatContext,
) -> Result<ModelReply, ModelError> {
    let request = ChatRequest {
        system_instruction: &context.system_instruction,
        tools,
        messages: &context.messages,
    };
    retry.run(|| model.generate(&request)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::DeviceError;
    use crate::domain::audio::{AudioMimeType, PcmAudio};
    use crate::domain::conversation::{MessagePart, Role, ToolCall, TurnAttachment};
    use crate::infrastructure::storage::{InMemoryLedgerStore, LedgerSnapshot};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays scripted replies and records every request context
    #[derive(Clone, Default)]
    struct ScriptedModel {
        replies: Arc<Mutex<VecDeque<Result<ModelReply, ModelError>>>>,
        requests: Arc<Mutex<Vec<Vec<ModelMessage>>>>,
        instructions: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<ModelReply, ModelError>>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                ..Self::default()
            }
        }

        fn requests(&self) -> Vec<Vec<ModelMessage>> {
            self.requests.lock().unwrap().clone()
        }

        fn instructions(&self) -> Vec<String> {
            self.instructions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn generate(&self, request: &ChatRequest<'_>) -> Result<ModelReply, ModelError> {
            self.requests.lock().unwrap().push(request.messages.to_vec());
            self.instructions
                .lock()
                .unwrap()
                .push(request.system_instruction.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ModelError::EmptyResponse))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSpeech {
        spoken: Arc<Mutex<Vec<String>>>,
        fail_playback: bool,
    }

    #[async_trait]
    impl SpeechSynthesizer for RecordingSpeech {
        async fn synthesize(&self, text: &str) -> Result<PcmAudio, ModelError> {
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(PcmAudio::new(vec![0.0; 240], 24_000))
        }
    }

    #[async_trait]
    impl SpeechPlayback for RecordingSpeech {
        async fn play(&self, _audio: &PcmAudio) -> Result<(), DeviceError> {
            if self.fail_playback {
                return Err(DeviceError::OutputUnavailable("no speakers".into()));
            }
            Ok(())
        }
    }

    fn user() -> User {
        User::new("ana@example.com", "Ana")
    }

    fn dispatcher(model: ScriptedModel) -> ChatDispatcher<ScriptedModel, InMemoryLedgerStore> {
        ChatDispatcher::new(model, InMemoryLedgerStore::new()).with_retry(RetryPolicy::immediate())
    }

    fn voice_note(bytes: usize) -> AudioData {
        AudioData::new(vec![1u8; bytes], AudioMimeType::Flac).with_duration_ms(2000)
    }

    fn add_expense_call(id: &str) -> ToolCall {
        ToolCall::new(
            id,
            "addExpense",
            json!({ "amount": 4.5, "category": "Food", "description": "Coffee", "date": "2026-10-18" }),
        )
    }

    #[tokio::test]
    async fn text_turn_appends_user_then_model() {
        let model = ScriptedModel::new(vec![Ok(ModelReply::text("Hello Ana"))]);
        let mut chat = dispatcher(model);
        let mut user = user();

        let turn = chat.submit(&mut user, TurnInput::text("hi")).await.unwrap();

        assert_eq!(turn.text.as_deref(), Some("Hello Ana"));
        assert_eq!(chat.history().len(), 2);
        assert_eq!(chat.history()[0].role, Role::User);
        assert_eq!(chat.history()[1].role, Role::Model);
        assert_eq!(chat.state(), ChatTurnState::Complete);
    }

    #[tokio::test]
    async fn instruction_is_rebuilt_each_turn() {
        let model = ScriptedModel::new(vec![
            Ok(ModelReply::text("Hello Ana")),
            Ok(ModelReply::text("Noted")),
        ]);
        let mut chat = dispatcher(model.clone());
        let mut user = user();

        chat.submit(&mut user, TurnInput::text("hi")).await.unwrap();
        user = user.with_budget(900.0);
        chat.submit(&mut user, TurnInput::text("how am I doing?")).await.unwrap();

        let instructions = model.instructions();
        assert_eq!(instructions.len(), 2);
        assert!(!instructions[0].contains("Monthly budget: 900.00"));
        assert!(instructions[1].contains("Monthly budget: 900.00"));
        assert!(instructions[1].contains("Current time:"));
        assert_eq!(chat.history().len(), 4);
    }

    #[tokio::test]
    async fn two_calls_answered_in_one_follow_up() {
        let model = ScriptedModel::new(vec![
            Ok(ModelReply::calls(vec![
                add_expense_call("c1"),
                ToolCall::new("c2", "getExpenses", json!({})),
            ])),
            Ok(ModelReply::text("Saved your coffee.")),
        ]);
        let mut chat = dispatcher(model.clone());
        let mut user = user();

        let turn = chat.submit(&mut user, TurnInput::text("coffee 4.50")).await.unwrap();

        assert_eq!(turn.text.as_deref(), Some("Saved your coffee."));
        assert!(matches!(turn.card(), Some(RecordCard::Expense(e)) if e.amount == 4.5));

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        let follow_up = requests[1].last().unwrap();
        assert_eq!(follow_up.role, Role::User);
        let ids: Vec<&str> = follow_up
            .parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::FunctionResponse(r) => Some(r.call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn transient_failures_then_success_complete_normally() {
        let model = ScriptedModel::new(vec![
            Err(ModelError::RequestFailed("reset".into())),
            Err(ModelError::ServiceUnavailable("503".into())),
            Ok(ModelReply::text("Done")),
        ]);
        let mut chat = dispatcher(model.clone());

        let turn = chat.submit(&mut user(), TurnInput::text("hi")).await.unwrap();

        assert_eq!(turn.text.as_deref(), Some("Done"));
        assert!(!turn.is_error);
        assert_eq!(model.requests().len(), 3);
    }

    #[tokio::test]
    async fn failed_turn_appends_error_and_rolls_back_context() {
        let model = ScriptedModel::new(vec![
            Ok(ModelReply::calls(vec![add_expense_call("c1")])),
            Err(ModelError::InvalidApiKey),
            Ok(ModelReply::text("Second answer")),
        ]);
        let mut chat = dispatcher(model.clone());
        let mut user = user();

        let err = chat.submit(&mut user, TurnInput::text("first")).await.unwrap_err();
        assert!(matches!(err, ChatError::Model(ModelError::InvalidApiKey)));
        assert!(chat.history().last().unwrap().is_error);
        assert_eq!(chat.state(), ChatTurnState::Failed);

        chat.submit(&mut user, TurnInput::text("second")).await.unwrap();
        let last_request = model.requests().pop().unwrap();
        assert_eq!(last_request.len(), 1, "no dangling function calls");
    }

    #[tokio::test]
    async fn short_voice_note_rejected_before_network() {
        let model = ScriptedModel::new(vec![]);
        let mut chat = dispatcher(model.clone());

        let err = chat
            .submit(&mut user(), TurnInput::voice(voice_note(200)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ChatError::Validation(ValidationError::AudioTooShort { size: 200 })
        ));
        assert!(model.requests().is_empty());
        assert!(chat.history().is_empty());
    }

    #[tokio::test]
    async fn empty_turn_rejected() {
        let mut chat = dispatcher(ScriptedModel::default());
        let err = chat.submit(&mut user(), TurnInput::text("   ")).await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(ValidationError::EmptyTurn)));
    }

    #[tokio::test]
    async fn manual_entry_adds_form_turn_without_persisting() {
        let model = ScriptedModel::new(vec![
            Ok(ModelReply::calls(vec![ToolCall::new(
                "c1",
                "requestManualEntry",
                json!({ "description": "groceries" }),
            )])),
            Ok(ModelReply::text("Please fill in the form.")),
        ]);
        let mut chat = dispatcher(model);

        chat.submit(&mut user(), TurnInput::text("add something")).await.unwrap();

        let history = chat.history();
        assert_eq!(history.len(), 3);
        assert_eq!(
            history[1].attachment,
            Some(TurnAttachment::ManualEntryForm {
                hint: Some("groceries".into())
            })
        );
        assert_eq!(history[2].text.as_deref(), Some("Please fill in the form."));
        assert_eq!(chat.store().snapshot().await, LedgerSnapshot::default());
    }

    #[tokio::test]
    async fn set_budget_updates_caller_user() {
        let model = ScriptedModel::new(vec![
            Ok(ModelReply::calls(vec![ToolCall::new("c1", "setBudget", json!({ "amount": 750 }))])),
            Ok(ModelReply::text("Budget updated.")),
        ]);
        let mut chat = dispatcher(model);
        let mut user = user();

        chat.submit(&mut user, TurnInput::text("budget 750")).await.unwrap();

        assert_eq!(user.budget(), 750.0);
    }

    #[tokio::test]
    async fn confirmation_synthesized_when_reply_has_no_text() {
        let model = ScriptedModel::new(vec![
            Ok(ModelReply::calls(vec![add_expense_call("c1")])),
            Ok(ModelReply::default()),
        ]);
        let mut chat = dispatcher(model);

        let turn = chat.submit(&mut user(), TurnInput::text("coffee")).await.unwrap();

        assert_eq!(turn.text.as_deref(), Some("Saved 4.50 for Coffee."));
    }

    #[tokio::test]
    async fn tool_rounds_are_bounded() {
        let replies = (0..=MAX_TOOL_ROUNDS)
            .map(|i| {
                Ok(ModelReply::calls(vec![ToolCall::new(
                    format!("c{}", i),
                    "getExpenses",
                    json!({}),
                )]))
            })
            .collect();
        let mut chat = dispatcher(ScriptedModel::new(replies));

        let err = chat.submit(&mut user(), TurnInput::text("loop")).await.unwrap_err();

        assert!(matches!(err, ChatError::TooManyToolRounds(MAX_TOOL_ROUNDS)));
    }

    #[tokio::test]
    async fn changing_user_starts_fresh_context() {
        let model = ScriptedModel::new(vec![
            Ok(ModelReply::text("Hi Ana")),
            Ok(ModelReply::text("Hi Bob")),
        ]);
        let mut chat = dispatcher(model.clone());

        chat.submit(&mut user(), TurnInput::text("hi")).await.unwrap();
        let mut bob = User::new("bob@example.com", "Bob");
        chat.submit(&mut bob, TurnInput::text("hi")).await.unwrap();

        assert_eq!(chat.history().len(), 2);
        assert_eq!(model.requests()[1].len(), 1);
    }

    #[tokio::test]
    async fn voice_turns_are_spoken_text_turns_are_not() {
        let speech = RecordingSpeech::default();
        let model = ScriptedModel::new(vec![
            Ok(ModelReply::text("typed reply")),
            Ok(ModelReply::text("spoken reply")),
        ]);
        let mut chat = dispatcher(model).with_speech(SpeechOutput::new(
            Box::new(speech.clone()),
            Box::new(speech.clone()),
        ));
        let mut user = user();

        chat.submit(&mut user, TurnInput::text("hi")).await.unwrap();
        chat.submit(&mut user, TurnInput::voice(voice_note(4096))).await.unwrap();

        assert_eq!(*speech.spoken.lock().unwrap(), vec!["spoken reply".to_string()]);
    }

    #[tokio::test]
    async fn playback_failure_does_not_fail_turn() {
        let speech = RecordingSpeech {
            fail_playback: true,
            ..Default::default()
        };
        let model = ScriptedModel::new(vec![Ok(ModelReply::text("spoken reply"))]);
        let mut chat = dispatcher(model).with_speech(SpeechOutput::new(
            Box::new(speech.clone()),
            Box::new(speech),
        ));

        let turn = chat
            .submit(&mut user(), TurnInput::voice(voice_note(4096)))
            .await
            .unwrap();

        assert!(!turn.is_error);
    }
}
