//! User-targeted actions and canned user queries.

use super::{validate_domain, validate_email, OnConflict};
use crate::action::{Action, ExecutionError};
use crate::client::Connection;
use crate::errors::{DirectoryError, DirectoryResult};
use crate::query::{QueryMultiple, QuerySingle};
use serde_json::{json, Map, Value};

/// Profile fields for create and update commands. Unset fields are left
/// out of the wire payload entirely.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    /// Contact email, when it differs from the identifying address.
    pub email: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// ISO 3166 country code.
    pub country: Option<String>,
}

impl UserProfile {
    fn into_params(self) -> Map<String, Value> {
        let mut params = Map::new();
        if let Some(email) = self.email {
            params.insert("email".into(), Value::String(email));
        }
        if let Some(first_name) = self.first_name {
            params.insert("firstName".into(), Value::String(first_name));
        }
        if let Some(last_name) = self.last_name {
            params.insert("lastName".into(), Value::String(last_name));
        }
        if let Some(country) = self.country {
            params.insert("country".into(), Value::String(country));
        }
        params
    }
}

/// Builder for an [`Action`] targeting one directory user.
///
/// Commands are appended in call order; a create always moves to the head
/// so the user exists before anything else runs against them.
#[derive(Debug)]
pub struct UserAction {
    action: Action,
    identity: String,
}

impl UserAction {
    /// Targets a user identified by email address.
    pub fn new(email: &str) -> DirectoryResult<Self> {
        validate_email(email)?;
        Ok(Self {
            action: Action::new().frame_field("user", email),
            identity: email.to_string(),
        })
    }

    /// Targets a federated user identified by username within a claimed
    /// domain. Email-style usernames are allowed.
    pub fn federated(username: &str, domain: &str) -> DirectoryResult<Self> {
        if username.contains('@') {
            validate_email(username)?;
        } else if username.is_empty() || username.contains(char::is_whitespace) {
            return Err(DirectoryError::argument(format!(
                "'{}' is not a valid username",
                username
            )));
        }
        validate_domain(domain)?;
        Ok(Self {
            action: Action::new()
                .frame_field("user", username)
                .frame_field("domain", domain),
            identity: username.to_string(),
        })
    }

    /// Creates the user. When the profile carries no email and the target
    /// identity is an email address, that address is used.
    pub fn create(mut self, profile: UserProfile, on_conflict: OnConflict) -> Self {
        let mut params = profile.into_params();
        if !params.contains_key("email") && self.identity.contains('@') {
            params.insert("email".into(), Value::String(self.identity.clone()));
        }
        if let Some(option) = on_conflict.option_value() {
            params.insert("option".into(), Value::String(option.into()));
        }
        self.action = self.action.insert("createUser", Value::Object(params));
        self
    }

    /// Updates profile fields on an existing user.
    pub fn update(mut self, profile: UserProfile) -> Self {
        self.action = self
            .action
            .append("update", Value::Object(profile.into_params()));
        self
    }

    /// Adds the user to the named groups of one group type.
    pub fn add_to_groups(mut self, group_type: &str, groups: &[&str]) -> Self {
        self.action = self.action.append("add", json!({ group_type: groups }));
        self
    }

    /// Removes the user from the named groups of one group type.
    pub fn remove_from_groups(mut self, group_type: &str, groups: &[&str]) -> Self {
        self.action = self.action.append("remove", json!({ group_type: groups }));
        self
    }

    /// Removes the user from every group of every type.
    pub fn remove_from_all_groups(mut self) -> Self {
        self.action = self.action.append("remove", "all");
        self
    }

    /// Grants the named administrative roles.
    pub fn add_roles(mut self, role_type: &str, groups: &[&str]) -> Self {
        self.action = self.action.append("addRoles", json!({ role_type: groups }));
        self
    }

    /// Revokes the named administrative roles.
    pub fn remove_roles(mut self, role_type: &str, groups: &[&str]) -> Self {
        self.action = self
            .action
            .append("removeRoles", json!({ role_type: groups }));
        self
    }

    /// Removes the user from the organization, optionally deleting the
    /// underlying account where the organization owns it.
    pub fn remove_from_organization(mut self, delete_account: bool) -> Self {
        self.action = self
            .action
            .append("removeFromOrg", json!({ "deleteAccount": delete_account }));
        self
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

/// A cursor over the organization's users, optionally narrowed to one
/// group and/or one domain.
pub fn users_query<'a>(
    connection: &'a Connection,
    in_group: Option<&str>,
    in_domain: Option<&str>,
) -> QueryMultiple<'a> {
    let mut query = QueryMultiple::new(connection, "user").query_param("directOnly", "true");
    if let Some(group) = in_group {
        query = query.url_param(group);
    }
    if let Some(domain) = in_domain {
        query = query.query_param("domain", domain);
    }
    query
}

/// A single-user lookup by email address.
pub fn user_query<'a>(connection: &'a Connection, email: &str) -> DirectoryResult<QuerySingle<'a>> {
    validate_email(email)?;
    Ok(QuerySingle::new(connection, "user").url_param(email))
}
