//! Request dispatch: a `type string -> handler` map, per the design note
//! that each handler owns extracting its own fields from the raw request
//! rather than the dispatcher pattern-matching an exhaustive enum.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::handlers;
use crate::state::DaemonState;

/// A handler's return value is always a complete reply object (a `result`
/// or `error` envelope); handlers never propagate errors past themselves,
/// matching the connection-stays-open error contract.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Value> + Send>>;

/// One entry in the dispatch table: takes shared state, the already
/// authenticated account, the client's `requestId`, and the raw request.
pub type HandlerFn = fn(Arc<DaemonState>, String, Option<String>, Value) -> HandlerFuture;

/// Builds the `type -> handler` table. `ping` and `auth` are handled
/// directly by the listener before a connection is authenticated, so they
/// don't appear here.
#[must_use]
pub fn build_table() -> HashMap<&'static str, HandlerFn> {
    let mut table: HashMap<&'static str, HandlerFn> = HashMap::new();
    table.insert("send_message", handlers::messaging::handle_send_message);
    table.insert("count_unread", handlers::messaging::handle_count_unread);
    table.insert("read_messages", handlers::messaging::handle_read_messages);
    table.insert("archive_messages", handlers::messaging::handle_archive_messages);
    table.insert("handoff_task", handlers::handoff::handle_handoff_task);
    table.insert("handoff_accept", handlers::handoff::handle_handoff_accept);
    table.insert("update_task_status", handlers::tasks::handle_update_task_status);
    table.insert(
        "prepare_worktree_for_handoff",
        handlers::workspace::handle_prepare_worktree,
    );
    table.insert("get_workspace_status", handlers::workspace::handle_get_workspace_status);
    table.insert("cleanup_workspace", handlers::workspace::handle_cleanup_workspace);
    table.insert("suggest_assignee", handlers::routing::handle_suggest_assignee);
    table.insert("health_check", handlers::health::handle_health_check);
    table.insert("search_knowledge", handlers::knowledge::handle_search_knowledge);
    table.insert("index_note", handlers::knowledge::handle_index_note);
    table.insert("link_task", handlers::knowledge::handle_link_task);
    table.insert("get_task_links", handlers::knowledge::handle_get_task_links);
    table.insert("get_analytics", handlers::analytics::handle_get_analytics);
    table.insert("get_review_bundle", handlers::analytics::handle_get_review_bundle);
    table.insert(
        "generate_review_bundle",
        handlers::analytics::handle_generate_review_bundle,
    );
    table.insert(
        "request_council_analysis",
        handlers::council::handle_request_council_analysis,
    );
    table.insert(
        "request_council_verification",
        handlers::council::handle_request_council_verification,
    );
    table
}
