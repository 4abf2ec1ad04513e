//! User accounts: the owning side of the one-to-one customer link.

use serde::{Deserialize, Serialize};

use crate::id::{CustomerId, UserId};

/// Input to [`crate::store::CustomerStore::add_user`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
  pub username: String,
  /// Customer to link on creation.
  #[serde(default, rename = "kunde")]
  pub customer: Option<CustomerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
  id:                  UserId,
  pub username:        String,
  #[serde(rename = "kunde")]
  pub(crate) customer: Option<CustomerId>,
}

impl User {
  pub fn new(id: UserId, username: impl Into<String>) -> Self {
    Self::restore(id, username, None)
  }

  pub fn restore(
    id: UserId,
    username: impl Into<String>,
    customer: Option<CustomerId>,
  ) -> Self {
    Self { id, username: username.into(), customer }
  }

  pub fn id(&self) -> UserId { self.id }

  /// The customer this account belongs to, if linked.
  pub fn customer(&self) -> Option<CustomerId> { self.customer }
}
