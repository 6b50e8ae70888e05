//! Wake Assistant - a wake-word driven voice command loop
//!
//! Each cycle listens for one utterance, keeps it only if it contains the
//! wake word, matches the remaining command against an ordered intent
//! table and speaks the handler's reply.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ TranscriptSource │──▶│ WakeWordGate  │──▶│ IntentMatcher │
//! │  mic + STT/stdin │   └───────────────┘   └───────┬───────┘
//! └──────────────────┘                               │
//!          ▲                                 ┌───────▼────────┐
//!          │                                 │ IntentHandlers │──▶ Services
//!     SessionLoop ◀── Narrator (TTS) ◀───────┴────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod intent;
pub mod narrator;
pub mod services;
pub mod session;
pub mod shutdown;
pub mod transcript;
pub mod voice;
pub mod wake_word;

pub use config::Config;
pub use error::{Error, Result};
pub use intent::{Control, FollowUp, IntentHandlers, IntentKind, IntentMatcher, Response};
pub use narrator::{ConsoleNarrator, Narrator, VoiceNarrator};
pub use services::{LookupError, Services};
pub use session::{SessionEnd, SessionLoop, SessionState};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use transcript::{CaptureFailure, TranscriptSource, Utterance};
pub use wake_word::{Command, GateResult, WakeWordGate};
