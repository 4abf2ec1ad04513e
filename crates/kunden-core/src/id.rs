//! Identifier newtypes.
//!
//! Customers and users are keyed by store-assigned UUIDs; agents and addresses
//! by store-assigned integers. Keeping them as distinct types means an agent
//! id can never be compared against a customer or an agent record by mistake.

use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── UUID keyed ──────────────────────────────────────────────────────────────

/// Identifier of a [`Customer`](crate::customer::Customer).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CustomerId(pub Uuid);

impl CustomerId {
  pub fn new_v4() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for CustomerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.hyphenated())
  }
}

impl FromStr for CustomerId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Uuid::parse_str(s).map(Self) }
}

/// Identifier of a [`User`](crate::user::User) account.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
  pub fn new_v4() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.hyphenated())
  }
}

impl FromStr for UserId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Uuid::parse_str(s).map(Self) }
}

// ─── Integer keyed ───────────────────────────────────────────────────────────

/// Identifier of an [`Agent`](crate::agent::Agent).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AgentId(pub i64);

impl fmt::Display for AgentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl FromStr for AgentId {
  type Err = ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> { s.parse().map(Self) }
}

/// Identifier of an [`Address`](crate::address::Address).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AddressId(pub i64);

impl fmt::Display for AddressId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl FromStr for AddressId {
  type Err = ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> { s.parse().map(Self) }
}
