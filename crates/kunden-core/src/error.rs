//! Error types for `kunden-core`.

use thiserror::Error;

use crate::{
  id::{AddressId, AgentId, CustomerId, UserId},
  validate::Violations,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("customer not found: {0}")]
  CustomerNotFound(CustomerId),

  #[error("agent not found: {0}")]
  AgentNotFound(AgentId),

  #[error("user not found: {0}")]
  UserNotFound(UserId),

  #[error("address not found: {0}")]
  AddressNotFound(AddressId),

  /// The customer's agent reference was dereferenced while unset.
  #[error("customer {0} has no agent assigned")]
  AgentUnassigned(CustomerId),

  /// A written customer referenced an agent that does not exist.
  #[error("agent {0} does not exist")]
  UnknownAgent(AgentId),

  #[error("agent {0} is deleted and cannot take customers")]
  AgentDeleted(AgentId),

  #[error("agent reference number {0:?} is already taken")]
  DuplicateReferenceNumber(String),

  #[error("username {0:?} is already taken")]
  DuplicateUsername(String),

  #[error("validation failed: {0}")]
  Invalid(Violations),
}

/// Coarse classification used by outer layers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  Conflict,
  Invalid,
  /// A caller broke a precondition; not the client's fault.
  Internal,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::CustomerNotFound(_)
      | Self::AgentNotFound(_)
      | Self::UserNotFound(_)
      | Self::AddressNotFound(_) => ErrorKind::NotFound,
      Self::DuplicateReferenceNumber(_) | Self::DuplicateUsername(_) => {
        ErrorKind::Conflict
      }
      Self::UnknownAgent(_) | Self::AgentDeleted(_) | Self::Invalid(_) => {
        ErrorKind::Invalid
      }
      Self::AgentUnassigned(_) => ErrorKind::Internal,
    }
  }
}

/// Implemented by store backend errors so callers can recover the domain
/// error (if any) from a backend-specific error type.
pub trait DomainError: Sized {
  /// `Ok` with the domain error, or `Err(self)` for backend failures.
  fn into_domain(self) -> std::result::Result<Error, Self>;
}

impl DomainError for Error {
  fn into_domain(self) -> std::result::Result<Error, Self> { Ok(self) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
