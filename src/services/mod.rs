//! Typed builders over the raw Action/command machinery.
//!
//! These wrap [`crate::action::Action`] with the command vocabulary for
//! the two target-object types, doing light argument validation up front
//! so malformed values fail before any network traffic.

pub mod groups;
pub mod users;

use crate::errors::{DirectoryError, DirectoryResult};

/// Policy for a create command when the object already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    /// Let the server report an error.
    Error,
    /// Leave the existing object untouched.
    Ignore,
    /// Apply the supplied fields to the existing object.
    Update,
}

impl OnConflict {
    /// The wire value for the create command's `option` field. `Error`
    /// sends no option, which is the server default.
    pub(crate) fn option_value(self) -> Option<&'static str> {
        match self {
            OnConflict::Error => None,
            OnConflict::Ignore => Some("ignoreIfAlreadyExists"),
            OnConflict::Update => Some("updateIfAlreadyExists"),
        }
    }
}

pub(crate) fn validate_email(email: &str) -> DirectoryResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DirectoryError::argument(format!(
            "'{}' is not a valid email address",
            email
        )))
    }
}

pub(crate) fn validate_domain(domain: &str) -> DirectoryResult<()> {
    if !domain.is_empty() && !domain.contains('@') && !domain.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(DirectoryError::argument(format!(
            "'{}' is not a valid domain",
            domain
        )))
    }
}
