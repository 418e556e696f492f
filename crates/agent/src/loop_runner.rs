//! The turn loop implementation.

use std::path::Path;
use std::sync::Arc;
use chrono::Utc;
use ragsmith_config::AppConfig;
use ragsmith_core::error::ProviderError;
use ragsmith_core::event::{DomainEvent, EventBus};
use ragsmith_core::provider::{Provider, ProviderRequest};
use ragsmith_core::{
    Chunk, ConversationLog, ConversationTurn, EditDirective, Embedder, Error, SessionStats,
    TurnState,
};
use ragsmith_index::{Chunker, IndexBuilder, IndexStats, VectorIndex};
use ragsmith_memory::BoundedConversationLog;
use ragsmith_security::{FileGuard, GuardError, WriteOutcome};
use tracing::{debug, info, warn};
use crate::parser::extract_directives;
use crate::prompt::{render_context, PromptBuilder};

/// Heading of the section appended to replies that carried directives.
pub const SUMMARY_HEADING: &str = "## File Updates Summary";

/// What happened to one directive.
#[derive(Debug)]
pub struct DirectiveResult {
    pub directive: EditDirective,
    pub outcome: Result<WriteOutcome, GuardError>,
}

impl DirectiveResult {
    /// The summary line for this directive.
    pub fn summary_line(&self) -> String {
        let path = &self.directive.target_path;
        match &self.outcome {
            Ok(outcome) if !outcome.changed => format!("Unchanged: {path}"),
            Ok(outcome) => match &outcome.diff {
                Some(diff) => format!("Updated: {path}\n```diff\n{}\n```", diff.trim_end()),
                None => format!("Updated: {path}"),
            },
            Err(e) => format!("Error updating {path}: {e}"),
        }
    }
}

/// Everything a turn produced.
#[derive(Debug)]
pub struct TurnOutcome {
    /// The model reply, with the update summary appended when there were directives
    pub reply: String,

    /// Chunks sent as context
    pub retrieved: Vec<Chunk>,

    /// One entry per parsed directive, in application order
    pub directives: Vec<DirectiveResult>,

    /// Stats of the rebuild, `None` if it failed and the old index stayed live
    pub reindex: Option<IndexStats>,
}

/// Runs turns against one repository: retrieve, compose, complete, apply,
/// reindex.
///
/// Turns are sequential; `process_turn` takes `&mut self`.
pub struct AgentLoop {
    /// The completion provider
    provider: Arc<dyn Provider>,

    model: String,

    temperature: f32,

    max_tokens: Option<u32>,

    /// Rebuilds the index over the repository after every turn
    builder: IndexBuilder,

    /// The live index; replaced wholesale after each rebuild
    index: Arc<VectorIndex>,

    guard: FileGuard,

    prompt: PromptBuilder,

    history: Box<dyn ConversationLog>,

    /// Past turns included in each prompt
    history_turns: usize,

    /// Chunks retrieved per turn
    top_k: usize,

    event_bus: Arc<EventBus>,

    stats: SessionStats,

    turn: u64,

    state: TurnState,
}

impl AgentLoop {
    /// Create a loop with an empty index. Call [`build_index`](Self::build_index)
    /// before the first turn.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        builder: IndexBuilder,
        guard: FileGuard,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let index = Arc::new(VectorIndex::new(builder.dimension()));
        let prompt = PromptBuilder::new(guard.root().display().to_string());
        Self {
            provider,
            model: model.into(),
            temperature: 0.5,
            max_tokens: None,
            builder,
            index,
            guard,
            prompt,
            history: Box::new(BoundedConversationLog::default()),
            history_turns: 5,
            top_k: 20,
            event_bus,
            stats: SessionStats::default(),
            turn: 0,
            state: TurnState::Done,
        }
    }

    /// Wire a loop from config: guard and chunker over `repo_root`, the given
    /// embedder, history sized from `[agent]`.
    pub fn from_config(
        config: &AppConfig,
        repo_root: impl AsRef<Path>,
        provider: Arc<dyn Provider>,
        embedder: Arc<dyn Embedder>,
        event_bus: Arc<EventBus>,
    ) -> Result<Self, Error> {
        let guard = FileGuard::from_config(repo_root, &config.guard)?;
        let chunker = Chunker::from_config(guard.root(), &config.indexing);
        let builder = IndexBuilder::new(chunker, embedder, config.indexing.dimension);

        Ok(Self::new(provider, &config.default_model, builder, guard, event_bus)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_top_k(config.indexing.top_k)
            .with_history(
                Box::new(BoundedConversationLog::new(config.agent.history_capacity)),
                config.agent.history_turns,
            ))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Use `log` for history and include the last `turns` turns in prompts.
    pub fn with_history(mut self, log: Box<dyn ConversationLog>, turns: usize) -> Self {
        self.history = log;
        self.history_turns = turns;
        self
    }

    /// Start from an already built index.
    pub fn with_index(mut self, index: VectorIndex) -> Self {
        self.index = Arc::new(index);
        self
    }

    /// The live index. Holders of a previous `Arc` keep their snapshot.
    pub fn index(&self) -> Arc<VectorIndex> {
        Arc::clone(&self.index)
    }

    pub fn guard(&self) -> &FileGuard {
        &self.guard
    }

    pub fn history(&self) -> &dyn ConversationLog {
        self.history.as_ref()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// State of the current (or last) turn.
    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Build the index from scratch and swap it in. Errors leave the current
    /// index in place.
    pub async fn build_index(&mut self) -> Result<IndexStats, Error> {
        let built = self.builder.rebuild().await?;
        self.install(built.index, &built.stats);
        Ok(built.stats)
    }

    /// Process one user request and return the (possibly annotated) reply.
    pub async fn process_turn(&mut self, input: &str) -> Result<String, Error> {
        self.run_turn(input).await.map(|outcome| outcome.reply)
    }

    /// Like [`process_turn`](Self::process_turn) but returns the full outcome.
    pub async fn run_turn(&mut self, input: &str) -> Result<TurnOutcome, Error> {
        self.turn += 1;
        info!(turn = self.turn, model = %self.model, "Processing turn");

        // ── Retrieving ──
        self.begin_turn();
        let retrieved = self.retrieve(input).await;

        // ── Composing ──
        self.advance();
        let history = self.history.recent(self.history_turns);
        let messages = self.prompt.build(&history, &retrieved, input);

        // ── Completing ──
        self.advance();
        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stop: vec![],
        };
        let response = match self.provider.complete(request).await {
            Ok(r) => r,
            Err(e) => return Err(self.fail_completion(e)),
        };

        if let Some(usage) = &response.usage {
            self.event_bus.publish(DomainEvent::ResponseGenerated {
                model: response.model.clone(),
                tokens_used: usage.total_tokens,
                timestamp: Utc::now(),
            });
        }
        let mut reply = response.message.content;

        // ── Applying ──
        self.advance();
        let directives = self.apply(extract_directives(&reply));
        if !directives.is_empty() {
            reply.push_str("\n\n");
            reply.push_str(SUMMARY_HEADING);
            for result in &directives {
                reply.push('\n');
                reply.push_str(&result.summary_line());
            }
        }

        // ── Reindexing ──
        self.advance();
        let reindex = self.reindex().await;

        self.history.append(ConversationTurn::new(
            input,
            render_context(&retrieved),
            &reply,
        ));
        self.advance();
        self.stats.turns_completed += 1;

        info!(
            turn = self.turn,
            retrieved = retrieved.len(),
            directives = directives.len(),
            "Turn complete"
        );

        Ok(TurnOutcome {
            reply,
            retrieved,
            directives,
            reindex,
        })
    }

    /// Clear the conversation log and the guard's audit entries. The index
    /// and guard stay usable.
    pub fn end_session(&mut self) {
        info!(
            turns_completed = self.stats.turns_completed,
            turns_failed = self.stats.turns_failed,
            directives_applied = self.stats.directives_applied,
            directives_failed = self.stats.directives_failed,
            "Session ended"
        );
        self.history.clear();
        if let Some(audit) = self.guard.audit() {
            audit.clear();
        }
    }

    /// Embed the input and query the live index. Embedding failures yield no
    /// context rather than aborting the turn.
    async fn retrieve(&self, input: &str) -> Vec<Chunk> {
        match self.builder.embedder().embed(input).await {
            Ok(query) => {
                let chunks = self.index.search(&query, self.top_k);
                debug!(count = chunks.len(), "Retrieved context chunks");
                chunks
            }
            Err(e) => {
                warn!(error = %e, "Query embedding failed, continuing without context");
                self.publish_error("retrieval", &e.to_string());
                Vec::new()
            }
        }
    }

    /// Write each directive in order. A failure is recorded and the next
    /// directive still runs.
    fn apply(&mut self, directives: Vec<EditDirective>) -> Vec<DirectiveResult> {
        let mut results = Vec::with_capacity(directives.len());

        for directive in directives {
            let outcome = self.guard.write(&directive.target_path, &directive.content);

            match &outcome {
                Ok(written) => {
                    self.stats.directives_applied += 1;
                    debug!(
                        path = %directive.target_path,
                        changed = written.changed,
                        "Directive applied"
                    );
                }
                Err(e) => {
                    self.stats.directives_failed += 1;
                    warn!(path = %directive.target_path, error = %e, "Directive failed");
                }
            }

            self.event_bus.publish(DomainEvent::DirectiveApplied {
                path: directive.target_path.clone(),
                success: outcome.is_ok(),
                changed: outcome.as_ref().is_ok_and(|o| o.changed),
                timestamp: Utc::now(),
            });

            results.push(DirectiveResult { directive, outcome });
        }

        results
    }

    async fn reindex(&mut self) -> Option<IndexStats> {
        match self.builder.rebuild().await {
            Ok(built) => {
                self.install(built.index, &built.stats);
                Some(built.stats)
            }
            Err(e) => {
                warn!(error = %e, "Reindex failed, keeping previous index");
                self.publish_error("reindex", &e.to_string());
                None
            }
        }
    }

    fn install(&mut self, index: VectorIndex, stats: &IndexStats) {
        self.index = Arc::new(index);
        self.event_bus.publish(DomainEvent::IndexRebuilt {
            files: stats.files,
            chunks: stats.chunks,
            rejected: stats.rejected,
            duration_ms: stats.duration_ms,
            timestamp: Utc::now(),
        });
    }

    fn fail_completion(&mut self, err: ProviderError) -> Error {
        warn!(turn = self.turn, error = %err, "Completion failed, turn aborted");
        self.transition(TurnState::Failed);
        self.stats.turns_failed += 1;
        self.publish_error("completion", &err.to_string());
        Error::Completion(err)
    }

    /// Enter `Retrieving` for a new turn.
    fn begin_turn(&mut self) {
        if !self.state.is_terminal() {
            warn!(turn = self.turn, state = %self.state, "Previous turn was interrupted");
        }
        self.transition(TurnState::Retrieving);
    }

    /// Step to the next state on the success path.
    fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            self.transition(next);
        }
    }

    fn transition(&mut self, state: TurnState) {
        debug!(turn = self.turn, from = %self.state, to = %state, "Turn state");
        self.state = state;
        self.event_bus.publish(DomainEvent::TurnStateChanged {
            turn: self.turn,
            state,
            timestamp: Utc::now(),
        });
    }

    fn publish_error(&self, context: &str, message: &str) {
        self.event_bus.publish(DomainEvent::ErrorOccurred {
            context: context.into(),
            error_message: message.into(),
            timestamp: Utc::now(),
        });
    }
}
