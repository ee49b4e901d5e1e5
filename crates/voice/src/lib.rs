//! Voice boundary - session plumbing between the speech engine and the agent
//!
//! Models the engine's wire events, builds the once-per-session engine
//! configuration, and runs the conversation loop: tool calls in, responses
//! and session variables out, with bounded reconnects and a hard stop when
//! a human takes over.

pub mod config;
pub mod events;
pub mod metrics;
pub mod runner;
pub mod session;

pub use config::SessionConfigBuilder;
pub use events::{VoiceEvent, VoiceResponse};
pub use metrics::SessionMetrics;
pub use runner::{NoopVoiceTransport, RetryPolicy, SessionRunner, TransportError, VoiceTransport};
pub use session::SessionAdapter;
