//! Voice Ledger - voice-first expense and appointment assistant
//!
//! Users talk (typed text, recorded voice notes, or a realtime audio
//! session) to a Gemini model that records expenses, manages
//! appointments and adjusts a monthly budget through tool calls.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Ledger records, conversation values, durations and errors
//! - **Application**: Chat dispatcher, live session manager, reminder scheduler and port traits
//! - **Infrastructure**: Adapters for Gemini, JSON storage, cpal/rodio audio and notifications
//! - **CLI**: Command-line interface, argument parsing, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
