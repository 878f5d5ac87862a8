//! The daemon's single shared-mutable-state object. Every handler and
//! background loop is handed an `Arc<DaemonState>`; nothing lives in a
//! process-wide global.

use std::sync::Arc;

use actl_breaker::CircuitBreaker;
use actl_council::LlmCaller;
use actl_events::EventBus;
use actl_sla::AdaptiveSlaEngine;
use actl_store::{AppendLogStore, CapabilityStore, KnowledgeStore, MessageStore, SessionStore, StoreError, TrustStore, WorkspaceStore};
use actl_workspace::{SystemGitExecutor, WorkspaceManager};
use parking_lot::Mutex;

use crate::auth::ConnectedAccounts;
use crate::board::BoardStore;
use crate::config::{HubPaths, Intervals};

/// Council member/chair accounts used for synthesized review decisions.
#[derive(Debug, Clone, Default)]
pub struct CouncilConfig {
    /// Accounts whose opinions are collected and peer-ranked.
    pub members: Vec<String>,
    /// Account whose synthesis is authoritative.
    pub chair: Option<String>,
}

/// Everything a connection handler or background loop needs, constructed
/// once at startup and shared behind an `Arc`.
pub struct DaemonState {
    /// Hub directory layout.
    pub paths: HubPaths,
    /// Background-loop cadences.
    pub intervals: Intervals,
    /// JSON task board.
    pub board: BoardStore,
    /// Inbox/outbox and handoff messages.
    pub messages: Mutex<MessageStore>,
    /// Git-worktree-backed workspace lifecycle.
    pub workspaces: Mutex<WorkspaceManager>,
    /// Per-account skills and throughput history.
    pub capabilities: Mutex<CapabilityStore>,
    /// Per-account outcome trust scores.
    pub trust: Mutex<TrustStore>,
    /// Indexed knowledge notes and task links.
    pub knowledge: Mutex<KnowledgeStore>,
    /// Session↔task correlation durability.
    pub sessions: Mutex<SessionStore>,
    /// Workflow engine event trail.
    pub workflow_log: Mutex<AppendLogStore>,
    /// Retro engine event trail.
    pub retro_log: Mutex<AppendLogStore>,
    /// Circuit breaker activity trail.
    pub activity_log: Mutex<AppendLogStore>,
    /// Council analysis results trail.
    pub council_analyses_log: Mutex<AppendLogStore>,
    /// Council verification results trail.
    pub council_verifications_log: Mutex<AppendLogStore>,
    /// Acceptance-runner verification results trail.
    pub verification_results_log: Mutex<AppendLogStore>,
    /// In-process event bus.
    pub bus: Arc<EventBus>,
    /// Repeated-failure agent quarantine.
    pub breaker: Mutex<CircuitBreaker>,
    /// Escalation-aware SLA engine with per-task cooldowns.
    pub adaptive_sla: Mutex<AdaptiveSlaEngine>,
    /// Connections currently authenticated, by account.
    pub connected: Mutex<ConnectedAccounts>,
    /// Council member/chair configuration.
    pub council: CouncilConfig,
    /// Injected model-calling seam used by the council handlers.
    pub council_caller: Box<dyn LlmCaller>,
}

impl DaemonState {
    /// Opens every store rooted at `paths` and wires them into a single
    /// state object. Callers typically wrap the result in an `Arc`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if any database fails to open.
    pub fn open(
        paths: HubPaths,
        intervals: Intervals,
        council: CouncilConfig,
        council_caller: Box<dyn LlmCaller>,
    ) -> Result<Self, StoreError> {
        std::fs::create_dir_all(paths.root()).map_err(StoreError::Io)?;
        std::fs::create_dir_all(paths.tokens_dir()).map_err(StoreError::Io)?;

        let bus = Arc::new(EventBus::new());
        let board = BoardStore::new(paths.tasks_file());
        let messages = MessageStore::open(&paths.db_str("messages"))?;
        let workspace_store = WorkspaceStore::open(&paths.db_str("workspaces"))?;
        let capabilities = CapabilityStore::open(&paths.db_str("capabilities"))?;
        let trust = TrustStore::open(&paths.db_str("trust"))?;
        let knowledge = KnowledgeStore::open(&paths.db_str("knowledge"))?;
        let sessions = SessionStore::open(&paths.db_str("sessions"))?;
        let workflow_log = AppendLogStore::open(&paths.db_str("workflows"), "workflow_events")?;
        let retro_log = AppendLogStore::open(&paths.db_str("retro"), "retro_events")?;
        let activity_log = AppendLogStore::open(&paths.db_str("activity"), "activity_events")?;
        let council_analyses_log = AppendLogStore::open(&paths.db_str("council-analyses"), "analysis_events")?;
        let council_verifications_log =
            AppendLogStore::open(&paths.db_str("council-verifications"), "verification_events")?;
        let verification_results_log =
            AppendLogStore::open(&paths.db_str("verification-results"), "result_events")?;

        let workspaces = WorkspaceManager::new(workspace_store, Arc::clone(&bus), Box::new(SystemGitExecutor));

        Ok(Self {
            paths,
            intervals,
            board,
            messages: Mutex::new(messages),
            workspaces: Mutex::new(workspaces),
            capabilities: Mutex::new(capabilities),
            trust: Mutex::new(trust),
            knowledge: Mutex::new(knowledge),
            sessions: Mutex::new(sessions),
            workflow_log: Mutex::new(workflow_log),
            retro_log: Mutex::new(retro_log),
            activity_log: Mutex::new(activity_log),
            council_analyses_log: Mutex::new(council_analyses_log),
            council_verifications_log: Mutex::new(council_verifications_log),
            verification_results_log: Mutex::new(verification_results_log),
            breaker: Mutex::new(CircuitBreaker::new(Arc::clone(&bus))),
            adaptive_sla: Mutex::new(AdaptiveSlaEngine::new()),
            connected: Mutex::new(ConnectedAccounts::default()),
            bus,
            council,
            council_caller,
        })
    }
}
