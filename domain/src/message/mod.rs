//! Inter-agent messages
//!
//! Every interaction between the supervisor and agents is an [`AgentMessage`]
//! travelling over the message bus. Replies reuse the correlation id of the
//! message they answer.

pub mod entities;

pub use entities::{AgentMessage, MessageType};
