//! # Directory Client Library
//!
//! A client for a remote user-directory management service with:
//! - Ordered, batched write actions with per-command error reporting
//! - Client-side throttling (group-list slicing, command and action packing)
//! - Bounded retry with `Retry-After` support and exponential backoff
//! - Lazy paged queries over users and groups
//! - Typed builders for the user and group command vocabulary
//! - Pluggable credential sources
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use directory_client::{
//!     Connection, ConnectionConfig, OnConflict, StaticCredentialProvider, UserAction,
//!     UserProfile,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::builder()
//!         .endpoint("https://directory.example.com/v2/usermanagement")
//!         .org_id("org-123")
//!         .build()?;
//!     let credentials = Arc::new(StaticCredentialProvider::new("bearer-token"));
//!     let mut connection = Connection::new(config, credentials)?;
//!
//!     // Create a user and put them in a group, in one action.
//!     let user = UserAction::new("jdoe@example.com")?
//!         .create(
//!             UserProfile {
//!                 first_name: Some("Jane".into()),
//!                 last_name: Some("Doe".into()),
//!                 country: Some("US".into()),
//!                 ..Default::default()
//!             },
//!             OnConflict::Ignore,
//!         )
//!         .add_to_groups("usergroup", &["Engineering"]);
//!     let status = connection.execute_single(user.action(), true).await?;
//!     println!("{}", status);
//!
//!     for error in user.execution_errors() {
//!         eprintln!("{}: {:?}", error.error_code, error.command);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod action;
pub mod config;
pub mod errors;

// Authentication
pub mod auth;

// HTTP transport with retry
pub mod transport;

// The connection: batching, throttling, reads
pub mod client;

// Lazy query cursors
pub mod query;

// Typed command builders and canned queries
pub mod services;

// Re-exports for convenience
pub use action::{Action, Command, CommandErrorRecord, ExecutionError, GroupSplittable};
pub use auth::{CredentialProvider, EnvCredentialProvider, StaticCredentialProvider};
pub use client::Connection;
pub use config::{ConnectionConfig, ConnectionConfigBuilder, RetryConfig, ThrottleConfig};
pub use errors::{DirectoryError, DirectoryResult, ExecutionStatus};
pub use query::{QueryMultiple, QuerySingle};
pub use services::groups::{group_query, groups_query, GroupAction};
pub use services::users::{user_query, users_query, UserAction, UserProfile};
pub use services::OnConflict;
