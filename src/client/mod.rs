//! The directory connection: batching writes, issuing reads.
//!
//! [`Connection`] owns a [`Transport`] plus the client-side throttling
//! state. Write traffic goes through [`Connection::execute_multiple`],
//! which splits oversized actions, packs them into batches, posts each
//! batch, and reconciles per-command errors back onto the actions the
//! caller holds. Read traffic goes through [`Connection::query_single`]
//! and [`Connection::query_multiple`]; the lazy cursors in [`crate::query`]
//! are the usual way to consume the latter.

use crate::action::{Action, CommandErrorRecord, GroupSplittable};
use crate::auth::CredentialProvider;
use crate::config::{ConnectionConfig, ThrottleConfig};
use crate::errors::{DirectoryError, DirectoryResult, ExecutionStatus};
use crate::transport::Transport;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A connection to one organization's directory.
pub struct Connection {
    transport: Transport,
    org_id: String,
    test_mode: bool,
    throttle: ThrottleConfig,
    pending: Vec<Action>,
}

impl Connection {
    /// Creates a connection from a validated configuration and a
    /// credential source.
    pub fn new(
        config: ConnectionConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> DirectoryResult<Self> {
        config.validate()?;
        let transport = Transport::new(&config, credentials)?;
        Ok(Self {
            transport,
            org_id: config.org_id,
            test_mode: config.test_mode,
            throttle: config.throttle,
            pending: Vec::new(),
        })
    }

    /// The organization ID this connection is scoped to.
    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    /// Number of actions queued but not yet sent.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Submits actions for execution.
    ///
    /// Oversized group lists are sliced first, then actions with too many
    /// commands are split into chunks. The resulting list joins any
    /// actions left queued by an earlier non-immediate call. With
    /// `immediate` set, everything is flushed now; otherwise batches are
    /// sent only while at least `max_actions_per_call` actions are
    /// waiting, and the remainder stays queued for a later call.
    ///
    /// Per-command failures are annotated onto the submitted actions (see
    /// [`Action::execution_errors`]); batch-level failures are collected
    /// and returned as [`DirectoryError::Batch`] along with the final
    /// accounting. Later batches are still attempted after an earlier one
    /// fails.
    pub async fn execute_multiple(
        &mut self,
        actions: &[Action],
        immediate: bool,
    ) -> DirectoryResult<ExecutionStatus> {
        let mut expanded = Vec::new();
        for action in actions {
            if action.command_count() == 0 {
                tracing::warn!(frame = ?action.frame(), "queueing action with no commands");
            }
            let mut working = action.share();
            if working.maybe_split_groups(self.throttle.max_group_members) {
                tracing::debug!(
                    commands = working.command_count(),
                    "sliced oversized group lists"
                );
            }
            expanded.extend(working.split(self.throttle.max_commands_per_action));
        }

        let mut queue = std::mem::take(&mut self.pending);
        queue.extend(expanded);

        let threshold = if immediate {
            1
        } else {
            self.throttle.max_actions_per_call
        };
        let mut sent = 0;
        let mut completed = 0;
        let mut causes = Vec::new();
        while queue.len() >= threshold && !queue.is_empty() {
            let take = queue.len().min(self.throttle.max_actions_per_call);
            let batch: Vec<Action> = queue.drain(..take).collect();
            sent += batch.len();
            match self.execute_batch(&batch).await {
                Ok(n) => completed += n,
                Err(e) => {
                    tracing::error!(error = %e, batch_size = batch.len(), "batch failed");
                    causes.push(e);
                }
            }
        }
        let queued = queue.len();
        self.pending = queue;

        let status = ExecutionStatus {
            queued,
            sent,
            completed,
        };
        tracing::debug!(%status, "execute_multiple finished");
        if causes.is_empty() {
            Ok(status)
        } else {
            Err(DirectoryError::Batch { causes, status })
        }
    }

    /// Submits one action. Equivalent to [`Connection::execute_multiple`]
    /// with a single-element list.
    pub async fn execute_single(
        &mut self,
        action: &Action,
        immediate: bool,
    ) -> DirectoryResult<ExecutionStatus> {
        self.execute_multiple(std::slice::from_ref(action), immediate)
            .await
    }

    /// Flushes every queued action now.
    pub async fn flush(&mut self) -> DirectoryResult<ExecutionStatus> {
        self.execute_multiple(&[], true).await
    }

    async fn execute_batch(&self, batch: &[Action]) -> DirectoryResult<usize> {
        let body = Value::Array(batch.iter().map(Action::wire_dict).collect());
        let path = self.action_path();
        tracing::debug!(actions = batch.len(), "posting action batch");
        let response = self.transport.call(&path, Some(&body)).await?;
        reconcile_batch(batch, response)
    }

    fn action_path(&self) -> String {
        let mut path = format!("/action/{}", urlencoding::encode(&self.org_id));
        if self.test_mode {
            path.push_str("?testOnly=true");
        }
        path
    }

    fn query_path(
        &self,
        object_type: &str,
        page: Option<usize>,
        url_params: &[&str],
        query_params: &[(&str, &str)],
    ) -> DirectoryResult<String> {
        let mut path = format!("/{}s/{}", object_type, urlencoding::encode(&self.org_id));
        if let Some(page) = page {
            path.push('/');
            path.push_str(&page.to_string());
        }
        for component in url_params {
            path.push('/');
            path.push_str(&urlencoding::encode(component));
        }
        if !query_params.is_empty() {
            let query = serde_urlencoded::to_string(query_params)
                .map_err(|e| DirectoryError::argument(format!("bad query parameters: {}", e)))?;
            path.push('?');
            path.push_str(&query);
        }
        Ok(path)
    }

    /// Fetches one page of objects of the named type.
    ///
    /// Returns the page's objects and the server's last-page flag. A 404
    /// reads as an empty final page.
    pub async fn query_multiple(
        &self,
        object_type: &str,
        page: usize,
        url_params: &[&str],
        query_params: &[(&str, &str)],
    ) -> DirectoryResult<(Vec<Value>, bool)> {
        let path = self.query_path(object_type, Some(page), url_params, query_params)?;
        let body = match self.transport.call(&path, None).await {
            Ok(body) => body,
            Err(DirectoryError::Request { status: 404, .. }) => return Ok((Vec::new(), true)),
            Err(e) => return Err(e),
        };
        if body.get("result").and_then(Value::as_str) != Some("success") {
            return Err(DirectoryError::client_with_body(
                format!("{} query result was not \"success\"", object_type),
                body,
            ));
        }
        let values = body
            .get(format!("{}s", object_type))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let last_page = body
            .get("lastPage")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok((values, last_page))
    }

    /// Fetches one object of the named type, or `None` when the server
    /// reports 404.
    pub async fn query_single(
        &self,
        object_type: &str,
        url_params: &[&str],
        query_params: &[(&str, &str)],
    ) -> DirectoryResult<Option<Value>> {
        let path = self.query_path(object_type, None, url_params, query_params)?;
        let body = match self.transport.call(&path, None).await {
            Ok(body) => body,
            Err(DirectoryError::Request { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        if body.get("result").and_then(Value::as_str) != Some("success") {
            return Err(DirectoryError::client_with_body(
                format!("{} query result was not \"success\"", object_type),
                body,
            ));
        }
        let value = body
            .get(object_type)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        Ok(Some(value))
    }

    /// Probes the service status endpoint. Never fails: an error is
    /// folded into the returned document.
    pub async fn status(&self) -> Value {
        match self.transport.call("/status", None).await {
            Ok(body) => body,
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        }
    }
}

/// Maps a batch response back onto the actions that were sent and returns
/// the completed count.
///
/// A response without an `errors` array counts the whole batch as
/// completed. With errors present, each record is annotated onto the
/// action at its reported index and the server's `completed` figure is
/// trusted.
fn reconcile_batch(batch: &[Action], body: Value) -> DirectoryResult<usize> {
    let result = body.get("result").and_then(Value::as_str);
    let errors = match body.get("errors").and_then(Value::as_array) {
        None => {
            if result != Some("success") {
                tracing::warn!(result = ?result, "batch result was not \"success\"");
            }
            return Ok(batch.len());
        }
        Some(errors) => errors,
    };
    let completed = body
        .get("completed")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;
    if result != Some("partial") && completed != 0 {
        tracing::warn!(result = ?result, completed, "batch with errors was not \"partial\"");
    }
    for raw in errors {
        let record: CommandErrorRecord = serde_json::from_value(raw.clone()).map_err(|e| {
            DirectoryError::client_with_body(format!("malformed error record: {}", e), raw.clone())
        })?;
        let action = batch.get(record.index).ok_or_else(|| {
            DirectoryError::client_with_body(
                format!(
                    "error index {} out of range for batch of {}",
                    record.index,
                    batch.len()
                ),
                raw.clone(),
            )
        })?;
        action.report_command_error(&record)?;
    }
    Ok(completed)
}
