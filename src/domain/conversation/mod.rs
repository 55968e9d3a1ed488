//! Conversation model: turns, messages, tool calls and prompts

mod chat_state;
mod invocation;
mod message;
mod system_prompt;
mod tool_call;
mod tools;
mod turn;

pub use chat_state::{ChatTurn, ChatTurnState};
pub use invocation::{ExpensePatch, NewAppointment, NewExpense, ToolInvocation};
pub use message::{MessagePart, ModelMessage, ModelReply};
pub use system_prompt::SystemPrompt;
pub use tool_call::{ToolCall, ToolError, ToolErrorKind, ToolOutput, ToolResult};
pub use tools::{tool_declarations, ToolDeclaration, ToolName, ALL_TOOLS};
pub use turn::{ConversationTurn, RecordCard, Role, TurnAttachment};
