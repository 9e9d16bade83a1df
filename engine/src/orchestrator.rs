//! Conversation orchestration
//!
//! Owns the per-conversation state registry and drives the processing
//! pipeline: embed, score salience, integrate into the memory graph, run
//! opportunistic maintenance, update intent, optionally generate a response.
//! Conversations are isolated behind their own async mutex; processing one
//! never blocks another.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use reverie_memory::{
    ConsolidationEngine, DecayEngine, EmbeddingProvider, GraphSnapshot, JoinSummarizer,
    MemoryError, MemoryGraph, MemoryNode, MemoryUpdate, SalienceScorer, Summarizer, SweepReport,
    SweepTrigger,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::intent::{
    ConfidenceCalibrator, IntentEstimate, IntentState, VolatilityCalibrator,
};
use crate::message::Message;

/// Injected response generation. The engine itself never produces text.
pub trait Responder: Send + Sync {
    fn respond(
        &self,
        message: &Message,
        relevant: &[MemoryNode],
        intent: &IntentEstimate,
    ) -> EngineResult<String>;
}

/// Per-message processing knobs
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Additive salience adjustment, result clamped to [0,1]
    pub memory_importance_bias: f32,
    /// Shifts the evidence admission threshold; positive admits weaker signals
    pub intent_sensitivity: f32,
    /// Invoke the response hook, when one is installed
    pub response_generation: bool,
}

/// Everything a caller learns from one processed message
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub intent: IntentEstimate,
    pub memory_updates: Vec<MemoryUpdate>,
    /// Present when this message triggered a maintenance sweep
    pub sweep: Option<SweepReport>,
    pub response: Option<String>,
}

/// State owned by exactly one conversation
struct ConversationContext {
    graph: MemoryGraph,
    intent: IntentState,
    trigger: SweepTrigger,
}

/// Serialized form of one conversation's durable state
#[derive(Serialize, Deserialize)]
struct ConversationSnapshot {
    graph: GraphSnapshot,
    intent: IntentState,
}

/// The processing facade. One instance serves many conversations.
pub struct ConversationEngine<E: EmbeddingProvider> {
    config: EngineConfig,
    embedder: Arc<E>,
    scorer: SalienceScorer,
    decay: DecayEngine,
    consolidation: ConsolidationEngine,
    summarizer: Box<dyn Summarizer>,
    calibrator: Box<dyn ConfidenceCalibrator>,
    responder: Option<Box<dyn Responder>>,
    conversations: DashMap<String, Arc<Mutex<ConversationContext>>>,
}

impl<E: EmbeddingProvider> ConversationEngine<E> {
    pub fn new(config: EngineConfig, embedder: Arc<E>) -> Self {
        let calibrator = VolatilityCalibrator::new(config.intent.volatility_penalty);
        Self {
            scorer: SalienceScorer::new(config.salience.clone()),
            decay: DecayEngine::new(config.decay.clone()),
            consolidation: ConsolidationEngine::new(config.consolidation.clone()),
            summarizer: Box::new(JoinSummarizer),
            calibrator: Box::new(calibrator),
            responder: None,
            conversations: DashMap::new(),
            config,
            embedder,
        }
    }

    /// Install a response hook
    pub fn with_responder(mut self, responder: Box<dyn Responder>) -> Self {
        self.responder = Some(responder);
        self
    }

    /// Replace the default confidence calibrator
    pub fn with_calibrator(mut self, calibrator: Box<dyn ConfidenceCalibrator>) -> Self {
        self.calibrator = calibrator;
        self
    }

    /// Replace the placeholder summarizer used during consolidation
    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Process one message end to end.
    ///
    /// Creates the conversation on first sight. Maintenance (decay sweep,
    /// consolidation) runs opportunistically when the sweep trigger fires,
    /// bounded so no single message pays an unbounded cost.
    pub async fn process_message(
        &self,
        message: &Message,
        options: &ProcessOptions,
    ) -> EngineResult<ProcessingResult> {
        if message.content.trim().is_empty() {
            return Err(EngineError::invalid_message("empty content"));
        }

        let handle = self
            .conversations
            .entry(message.conversation_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(self.new_context())))
            .clone();
        let mut ctx = handle.lock().await;

        let embedding = self.embedder.embed(&message.content)?;
        let recent = ctx.graph.recent_exchanges(self.config.context_window);

        let salience = self.scorer.score(&message.content, &embedding, &recent)?;
        let salience = (salience + options.memory_importance_bias).clamp(0.0, 1.0);

        let update = ctx
            .graph
            .integrate(&message.content, embedding.clone(), salience, &message.id)?;
        tracing::debug!(
            conversation = %message.conversation_id,
            node = %update.node_id,
            created = update.created,
            salience,
            "message integrated"
        );

        ctx.trigger.record_integration();
        let sweep = if ctx.trigger.is_due(self.decay.config(), message.timestamp) {
            let report = self.decay.sweep(&mut ctx.graph, message.timestamp);
            let merged = self
                .consolidation
                .consolidate(&mut ctx.graph, self.summarizer.as_ref());
            ctx.trigger.reset(message.timestamp);
            tracing::debug!(
                conversation = %message.conversation_id,
                pruned = report.pruned,
                clusters = merged.clusters_merged,
                "maintenance pass"
            );
            Some(report)
        } else {
            None
        };

        let intent_update = ctx.intent.update(
            &message.content,
            &recent,
            options.intent_sensitivity,
            &self.config.intent,
            self.calibrator.as_ref(),
            message.timestamp,
        );

        let response = match (&self.responder, options.response_generation) {
            (Some(responder), true) => {
                let relevant = ctx
                    .graph
                    .find_relevant(&embedding, self.config.response_memory_limit);
                Some(responder.respond(message, &relevant, &intent_update.estimate)?)
            }
            _ => None,
        };

        Ok(ProcessingResult {
            intent: intent_update.estimate,
            memory_updates: vec![update],
            sweep,
            response,
        })
    }

    /// Query a conversation's memory by text. Returned memories count as
    /// accessed, which slows their decay.
    pub async fn find_relevant(
        &self,
        conversation_id: &str,
        query: &str,
        limit: usize,
    ) -> EngineResult<Vec<MemoryNode>> {
        let handle = self.existing(conversation_id)?;
        let embedding = self.embedder.embed(query)?;
        let mut ctx = handle.lock().await;
        Ok(ctx.graph.find_relevant(&embedding, limit))
    }

    /// Most recent memories, newest first. Does not touch access stats.
    pub async fn recent(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> EngineResult<Vec<MemoryNode>> {
        let handle = self.existing(conversation_id)?;
        let ctx = handle.lock().await;
        Ok(ctx.graph.recent_exchanges(limit))
    }

    /// Current intent view without processing a message
    pub async fn intent_estimate(&self, conversation_id: &str) -> EngineResult<IntentEstimate> {
        let handle = self.existing(conversation_id)?;
        let ctx = handle.lock().await;
        Ok(ctx.intent.estimate())
    }

    /// Forget the learned intent distribution for one conversation
    pub async fn reset_intent(&self, conversation_id: &str) -> EngineResult<()> {
        let handle = self.existing(conversation_id)?;
        let mut ctx = handle.lock().await;
        ctx.intent.reset();
        Ok(())
    }

    /// Serialize a conversation's durable state to an opaque blob
    pub async fn snapshot(&self, conversation_id: &str) -> EngineResult<Vec<u8>> {
        let handle = self.existing(conversation_id)?;
        let ctx = handle.lock().await;
        let snapshot = ConversationSnapshot {
            graph: GraphSnapshot::from_graph(&ctx.graph),
            intent: ctx.intent.clone(),
        };
        Ok(bincode::serialize(&snapshot).map_err(MemoryError::from)?)
    }

    /// Load a conversation from a snapshot blob, replacing any existing
    /// state under that id
    pub fn restore(&self, conversation_id: &str, bytes: &[u8]) -> EngineResult<()> {
        let snapshot: ConversationSnapshot =
            bincode::deserialize(bytes).map_err(MemoryError::from)?;
        let graph = snapshot.graph.into_graph(self.config.graph.clone())?;
        let context = ConversationContext {
            graph,
            intent: snapshot.intent,
            trigger: SweepTrigger::new(Utc::now()),
        };
        self.conversations.insert(
            conversation_id.to_string(),
            Arc::new(Mutex::new(context)),
        );
        Ok(())
    }

    fn new_context(&self) -> ConversationContext {
        ConversationContext {
            graph: MemoryGraph::new(self.config.graph.clone()),
            intent: IntentState::new(),
            trigger: SweepTrigger::new(Utc::now()),
        }
    }

    /// Reads never create conversations
    fn existing(&self, conversation_id: &str) -> EngineResult<Arc<Mutex<ConversationContext>>> {
        self.conversations
            .get(conversation_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| EngineError::conversation_not_found(conversation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverie_memory::embedding::testing::HashEmbedder;

    fn engine() -> ConversationEngine<HashEmbedder> {
        ConversationEngine::new(EngineConfig::default(), Arc::new(HashEmbedder::default()))
    }

    struct EchoResponder;

    impl Responder for EchoResponder {
        fn respond(
            &self,
            message: &Message,
            relevant: &[MemoryNode],
            _intent: &IntentEstimate,
        ) -> EngineResult<String> {
            Ok(format!("ack {} ({} memories)", message.content, relevant.len()))
        }
    }

    #[tokio::test]
    async fn test_process_creates_memory_and_intent() {
        let engine = engine();
        let msg = Message::user("conv-1", "Could you check flights to Tokyo next week?");
        let result = engine
            .process_message(&msg, &ProcessOptions::default())
            .await
            .unwrap();

        assert_eq!(result.memory_updates.len(), 1);
        assert!(result.memory_updates[0].created);
        assert!(result.memory_updates[0].salience >= 0.5);
        assert_eq!(result.intent.label.as_deref(), Some("travel-inquiry"));
        assert!(result.response.is_none());
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let engine = engine();
        let msg = Message::user("conv-1", "   ");
        let result = engine.process_message(&msg, &ProcessOptions::default()).await;
        assert!(matches!(result, Err(EngineError::InvalidMessage(_))));
        assert_eq!(engine.conversation_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_message_reinforces() {
        let engine = engine();
        let options = ProcessOptions::default();
        let first = Message::user("conv-1", "remember the wifi password is hunter2");
        let second = Message::user("conv-1", "remember the wifi password is hunter2");

        let a = engine.process_message(&first, &options).await.unwrap();
        let b = engine.process_message(&second, &options).await.unwrap();

        assert!(a.memory_updates[0].created);
        assert!(!b.memory_updates[0].created);
        assert_eq!(a.memory_updates[0].node_id, b.memory_updates[0].node_id);
    }

    #[tokio::test]
    async fn test_find_relevant_surfaces_matching_memory() {
        let engine = engine();
        let options = ProcessOptions::default();
        engine
            .process_message(
                &Message::user("conv-1", "check flights to Tokyo next week"),
                &options,
            )
            .await
            .unwrap();
        engine
            .process_message(
                &Message::user("conv-1", "the garden needs watering on sunday"),
                &options,
            )
            .await
            .unwrap();

        let results = engine
            .find_relevant("conv-1", "tokyo flights", 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("flights"));
    }

    #[tokio::test]
    async fn test_reads_never_create_conversations() {
        let engine = engine();
        assert!(matches!(
            engine.find_relevant("ghost", "anything", 3).await,
            Err(EngineError::ConversationNotFound(_))
        ));
        assert!(matches!(
            engine.recent("ghost", 3).await,
            Err(EngineError::ConversationNotFound(_))
        ));
        assert!(matches!(
            engine.intent_estimate("ghost").await,
            Err(EngineError::ConversationNotFound(_))
        ));
        assert!(matches!(
            engine.reset_intent("ghost").await,
            Err(EngineError::ConversationNotFound(_))
        ));
        assert_eq!(engine.conversation_count(), 0);
    }

    #[tokio::test]
    async fn test_conversations_isolated() {
        let engine = engine();
        let options = ProcessOptions::default();
        engine
            .process_message(&Message::user("conv-a", "book flights to Rome"), &options)
            .await
            .unwrap();
        engine
            .process_message(&Message::user("conv-b", "hello, how are you"), &options)
            .await
            .unwrap();

        let a = engine.intent_estimate("conv-a").await.unwrap();
        let b = engine.intent_estimate("conv-b").await.unwrap();
        assert_eq!(a.label.as_deref(), Some("travel-inquiry"));
        assert_eq!(b.label.as_deref(), Some("smalltalk"));

        assert_eq!(engine.recent("conv-a", 10).await.unwrap().len(), 1);
        assert_eq!(engine.recent("conv-b", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_response_hook_invoked_on_request() {
        let engine = engine().with_responder(Box::new(EchoResponder));

        let silent = engine
            .process_message(
                &Message::user("conv-1", "check flights to Oslo"),
                &ProcessOptions::default(),
            )
            .await
            .unwrap();
        assert!(silent.response.is_none());

        let options = ProcessOptions {
            response_generation: true,
            ..Default::default()
        };
        let spoken = engine
            .process_message(&Message::user("conv-1", "and a hotel there"), &options)
            .await
            .unwrap();
        let response = spoken.response.unwrap();
        assert!(response.starts_with("ack and a hotel there"));
    }

    #[tokio::test]
    async fn test_importance_bias_applied() {
        let engine = engine();
        let boosted = ProcessOptions {
            memory_importance_bias: 1.0,
            ..Default::default()
        };
        let result = engine
            .process_message(&Message::user("conv-1", "a minor aside"), &boosted)
            .await
            .unwrap();
        assert_eq!(result.memory_updates[0].salience, 1.0);
    }

    #[tokio::test]
    async fn test_snapshot_restore_roundtrip() {
        let engine = engine();
        let options = ProcessOptions::default();
        engine
            .process_message(
                &Message::user("conv-1", "check flights to Tokyo next week"),
                &options,
            )
            .await
            .unwrap();
        engine
            .process_message(
                &Message::user("conv-1", "a hotel near Shinjuku would be good"),
                &options,
            )
            .await
            .unwrap();

        let bytes = engine.snapshot("conv-1").await.unwrap();
        engine.restore("conv-restored", &bytes).unwrap();

        let restored = engine
            .find_relevant("conv-restored", "tokyo flights", 2)
            .await
            .unwrap();
        assert_eq!(restored.len(), 2);

        let intent = engine.intent_estimate("conv-restored").await.unwrap();
        assert_eq!(intent.label.as_deref(), Some("travel-inquiry"));
    }
}
