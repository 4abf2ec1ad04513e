//! Soft-delete lifecycle shared by customers and agents.
//!
//! Records are never physically removed by an update or a delete request;
//! they move from [`Lifecycle::Active`] to [`Lifecycle::Deleted`] exactly once.

use serde::{Deserialize, Serialize};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
  #[default]
  Active,
  Deleted,
}

impl Lifecycle {
  pub fn is_active(self) -> bool { matches!(self, Self::Active) }

  pub fn is_deleted(self) -> bool { matches!(self, Self::Deleted) }

  /// Move to [`Lifecycle::Deleted`]. Returns `false` if already deleted.
  pub fn delete(&mut self) -> bool {
    if self.is_deleted() {
      return false;
    }
    *self = Self::Deleted;
    true
  }
}
