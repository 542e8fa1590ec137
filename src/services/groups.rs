//! Group-targeted actions and canned group queries.

use super::{validate_email, OnConflict};
use crate::action::{Action, ExecutionError};
use crate::client::Connection;
use crate::errors::{DirectoryError, DirectoryResult};
use crate::query::{QueryMultiple, QuerySingle};
use serde_json::{json, Map, Value};

/// Builder for an [`Action`] targeting one user group.
#[derive(Debug)]
pub struct GroupAction {
    action: Action,
}

impl GroupAction {
    /// Targets the named group.
    pub fn new(group_name: &str) -> DirectoryResult<Self> {
        if group_name.trim().is_empty() {
            return Err(DirectoryError::argument("group name cannot be empty"));
        }
        Ok(Self {
            action: Action::new().frame_field("usergroup", group_name),
        })
    }

    /// Creates the group. Runs first regardless of call order.
    pub fn create(mut self, description: Option<&str>, on_conflict: OnConflict) -> Self {
        let mut params = Map::new();
        if let Some(description) = description {
            params.insert("description".into(), Value::String(description.into()));
        }
        if let Some(option) = on_conflict.option_value() {
            params.insert("option".into(), Value::String(option.into()));
        }
        self.action = self.action.insert("createGroup", Value::Object(params));
        self
    }

    /// Renames the group and/or replaces its description.
    pub fn update(mut self, name: Option<&str>, description: Option<&str>) -> Self {
        let mut params = Map::new();
        if let Some(name) = name {
            params.insert("name".into(), Value::String(name.into()));
        }
        if let Some(description) = description {
            params.insert("description".into(), Value::String(description.into()));
        }
        self.action = self.action.append("updateGroup", Value::Object(params));
        self
    }

    /// Deletes the group. Membership is released, member accounts are
    /// untouched.
    pub fn delete(mut self) -> Self {
        self.action = self.action.append("deleteGroup", json!({}));
        self
    }

    /// Adds the named users to the group.
    pub fn add_users(mut self, users: &[&str]) -> DirectoryResult<Self> {
        for user in users {
            validate_email(user)?;
        }
        self.action = self.action.append("add", json!({ "user": users }));
        Ok(self)
    }

    /// Removes the named users from the group.
    pub fn remove_users(mut self, users: &[&str]) -> DirectoryResult<Self> {
        for user in users {
            validate_email(user)?;
        }
        self.action = self.action.append("remove", json!({ "user": users }));
        Ok(self)
    }

    /// The underlying action, for submission via
    /// [`Connection::execute_multiple`].
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Consumes the builder, yielding the underlying action.
    pub fn into_action(self) -> Action {
        self.action
    }

    /// Per-command errors reported against this action after submission.
    pub fn execution_errors(&self) -> Vec<ExecutionError> {
        self.action.execution_errors()
    }
}

/// A cursor over the organization's groups.
pub fn groups_query(connection: &Connection) -> QueryMultiple<'_> {
    QueryMultiple::new(connection, "group")
}

/// A single-group lookup by name.
pub fn group_query<'a>(
    connection: &'a Connection,
    group_name: &str,
) -> DirectoryResult<QuerySingle<'a>> {
    if group_name.trim().is_empty() {
        return Err(DirectoryError::argument("group name cannot be empty"));
    }
    Ok(QuerySingle::new(connection, "group").url_param(group_name))
}
