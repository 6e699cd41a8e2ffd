use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

const MAX_EMAIL_LEN: usize = 254;
const MAX_NAME_CHARS: usize = 100;
const MAX_AGE: i32 = 150;

/// A user record. `email` is the identity key; no other field is indexed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub name: String,
    pub age: i32,
}

/// Body of a full replacement request. The email is taken from the route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub name: String,
    pub age: i32,
}

impl UserPayload {
    pub fn into_user(self, email: impl Into<String>) -> User {
        User { email: email.into(), name: self.name, age: self.age }
    }
}

impl User {
    pub fn new(email: impl Into<String>, name: impl Into<String>, age: i32) -> Self {
        Self { email: email.into(), name: name.into(), age }
    }

    /// Check every field; the first failing rule wins.
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_email(&self.email)?;
        validate_name(&self.name)?;
        validate_age(self.age)?;
        Ok(())
    }
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    if email.trim().is_empty() {
        return Err(ModelError::Validation("email required".into()));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(ModelError::Validation("email too long".into()));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ModelError::Validation("email must not contain whitespace".into()));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(()),
        _ => Err(ModelError::Validation("invalid email".into())),
    }
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::Validation("name required".into()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ModelError::Validation("name too long".into()));
    }
    Ok(())
}

pub fn validate_age(age: i32) -> Result<(), ModelError> {
    if !(0..=MAX_AGE).contains(&age) {
        return Err(ModelError::Validation(format!("age must be between 0 and {MAX_AGE}")));
    }
    Ok(())
}
