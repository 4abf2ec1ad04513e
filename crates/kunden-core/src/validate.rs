//! Validation rules applied before anything is persisted.
//!
//! Each function returns every violation it finds, keyed by the wire name of
//! the offending field, so a rejected write can report all problems at once.

use std::fmt;

use serde::Serialize;

use crate::{
  Error, Result,
  agent::{MAX_REFERENCE_NUMBER_LEN, NewAgent},
  customer::NewCustomer,
  user::NewUser,
};

pub const BLANK: &str = "This value should not be blank.";
pub const NULL: &str = "This value should not be null.";
pub const EMAIL: &str = "This value is not a valid email address.";
pub const CHOICE: &str = "The value you selected is not a valid choice.";

// ─── Violations ──────────────────────────────────────────────────────────────

/// A single failed constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
  #[serde(rename = "propertyPath")]
  pub field:   &'static str,
  pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations(Vec<Violation>);

impl Violations {
  pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
    self.0.push(Violation { field, message: message.into() });
  }

  /// Append the violations of `other` whose field has not been reported yet.
  pub fn merge(&mut self, other: Self) {
    for v in other.0 {
      if !self.contains(v.field) {
        self.0.push(v);
      }
    }
  }

  pub fn contains(&self, field: &str) -> bool {
    self.0.iter().any(|v| v.field == field)
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn iter(&self) -> impl Iterator<Item = &Violation> { self.0.iter() }

  /// `Ok(())` when empty, otherwise [`Error::Invalid`].
  pub fn into_result(self) -> Result<()> {
    if self.is_empty() { Ok(()) } else { Err(Error::Invalid(self)) }
  }
}

impl fmt::Display for Violations {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, v) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("; ")?;
      }
      write!(f, "{}: {}", v.field, v.message)?;
    }
    Ok(())
  }
}

// ─── Rules ───────────────────────────────────────────────────────────────────

fn is_blank(s: &str) -> bool { s.trim().is_empty() }

pub fn new_customer(input: &NewCustomer) -> Violations {
  let mut v = Violations::default();

  if is_blank(&input.name) {
    v.push("name", BLANK);
  }
  if is_blank(&input.given_name) {
    v.push("vorname", BLANK);
  }
  if input.birth_date.is_none() {
    v.push("geburtsdatum", BLANK);
  }
  // A blank address is treated like an absent one.
  if let Some(email) = input.email.as_deref()
    && !is_blank(email)
    && !validator::validate_email(email)
  {
    v.push("email", EMAIL);
  }
  if input.agent.is_none() {
    v.push("vermittler", NULL);
  }

  v
}

pub fn new_agent(input: &NewAgent) -> Violations {
  let mut v = Violations::default();

  if is_blank(&input.given_name) {
    v.push("vorname", BLANK);
  }
  if is_blank(&input.reference_number) {
    v.push("nummer", BLANK);
  } else if input.reference_number.chars().count() > MAX_REFERENCE_NUMBER_LEN {
    v.push(
      "nummer",
      format!(
        "This value is too long. It should have {MAX_REFERENCE_NUMBER_LEN} \
         characters or less."
      ),
    );
  }

  v
}

pub fn new_user(input: &NewUser) -> Violations {
  let mut v = Violations::default();
  if is_blank(&input.username) {
    v.push("username", BLANK);
  }
  v
}
