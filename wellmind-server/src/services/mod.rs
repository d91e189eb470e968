//! Chat services. [`ConversationPipeline`] ties the provider client and the
//! local fallback responder to the message store.

pub mod fallback;
pub mod pipeline;
pub mod provider;

pub use fallback::FallbackResponder;
pub use pipeline::{ConversationPipeline, PipelineError, ReplySource, TurnOutcome};
pub use provider::{CohereClient, CompletionProvider, ContextTurn};
