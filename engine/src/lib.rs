//! Reverie Engine
//!
//! Conversation orchestration over the Reverie memory core. Accepts
//! normalized messages, scores and integrates them into per-conversation
//! memory graphs, tracks a probabilistic intent distribution, and exposes
//! retrieval, intent, and snapshot operations behind one facade.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use reverie_engine::{ConversationEngine, EngineConfig, Message, ProcessOptions};
//!
//! let engine = ConversationEngine::new(EngineConfig::default(), Arc::new(embedder));
//!
//! let message = Message::user("conv-42", "Could you check flights to Tokyo?");
//! let result = engine.process_message(&message, &ProcessOptions::default()).await?;
//!
//! println!("intent: {:?}", result.intent.label);
//! ```

pub mod config;
pub mod error;
pub mod intent;
pub mod message;
pub mod orchestrator;

// Re-exports for convenience
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use intent::{
    ConfidenceCalibrator, EvidenceSignal, IntentConfig, IntentEstimate, IntentOutcome,
    IntentState, IntentUpdate, VolatilityCalibrator,
};
pub use message::{Message, Sender};
pub use orchestrator::{ConversationEngine, ProcessOptions, ProcessingResult, Responder};
