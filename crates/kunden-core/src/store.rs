//! The `CustomerStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (`kunden-store-sqlite`, and
//! [`crate::memory::MemoryStore`]). The HTTP layer depends on this
//! abstraction, not on any concrete backend.
//!
//! Every backend must serialise writes so that no reader ever observes one
//! side of a relationship updated without the other.

use std::future::Future;

use crate::{
  DomainError,
  address::{Address, NewAddress},
  agent::{Agent, NewAgent},
  customer::{Customer, NewCustomer},
  id::{AddressId, AgentId, CustomerId, UserId},
  user::{NewUser, User},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// One page of a collection listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  /// 1-based page number.
  pub number: usize,
  pub size:   usize,
}

impl Page {
  pub const DEFAULT_SIZE: usize = 30;

  /// Clamps both values to at least 1.
  pub fn new(number: usize, size: usize) -> Self {
    Self { number: number.max(1), size: size.max(1) }
  }

  /// Number of records skipped before this page. Page 0 reads as page 1.
  pub fn offset(&self) -> usize {
    self.number.saturating_sub(1).saturating_mul(self.size)
  }
}

impl Default for Page {
  fn default() -> Self { Self::new(1, Self::DEFAULT_SIZE) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a customer registry backend.
///
/// Identifiers are always assigned by the store. Inputs are validated with
/// [`crate::validate`] before anything is written. Soft-deleted customers
/// are still returned by [`CustomerStore::get_customer`] (check
/// [`Customer::is_deleted`]) but are excluded from listings and cannot be
/// updated.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CustomerStore: Send + Sync {
  type Error: std::error::Error + DomainError + Send + Sync + 'static;

  // ── Agents ────────────────────────────────────────────────────────────

  /// Create an agent. Fails if the reference number is already taken.
  fn add_agent(
    &self,
    input: NewAgent,
  ) -> impl Future<Output = Result<Agent, Self::Error>> + Send + '_;

  /// Retrieve an agent (deleted or not) with its active customers.
  fn get_agent(
    &self,
    id: AgentId,
  ) -> impl Future<Output = Result<Option<Agent>, Self::Error>> + Send + '_;

  /// List active agents, ordered by id.
  fn list_agents(
    &self,
    page: Page,
  ) -> impl Future<Output = Result<Vec<Agent>, Self::Error>> + Send + '_;

  /// Replace an active agent's attributes.
  fn update_agent(
    &self,
    id: AgentId,
    input: NewAgent,
  ) -> impl Future<Output = Result<Agent, Self::Error>> + Send + '_;

  /// Soft-delete an agent. Its customers keep their reference.
  fn delete_agent(
    &self,
    id: AgentId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Customers ─────────────────────────────────────────────────────────

  /// Create a customer and assign it to `input.agent`.
  fn add_customer(
    &self,
    input: NewCustomer,
  ) -> impl Future<Output = Result<Customer, Self::Error>> + Send + '_;

  fn get_customer(
    &self,
    id: CustomerId,
  ) -> impl Future<Output = Result<Option<Customer>, Self::Error>> + Send + '_;

  /// List active customers, ordered by id.
  fn list_customers(
    &self,
    page: Page,
  ) -> impl Future<Output = Result<Vec<Customer>, Self::Error>> + Send + '_;

  /// Replace an active customer's attributes and agent. Addresses and the
  /// user link are left alone.
  fn update_customer(
    &self,
    id: CustomerId,
    input: NewCustomer,
  ) -> impl Future<Output = Result<Customer, Self::Error>> + Send + '_;

  /// Soft-delete a customer. Deleting twice reports the customer as missing.
  fn delete_customer(
    &self,
    id: CustomerId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Physically remove a customer, its address links and its linked user.
  fn purge_customer(
    &self,
    id: CustomerId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user account, linking it to `input.customer` if given.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Link `user` to an active customer, or unlink with `None`. See
  /// [`Roster::set_user`](crate::roster::Roster::set_user) for the rules.
  fn link_user(
    &self,
    customer: CustomerId,
    user: Option<UserId>,
  ) -> impl Future<Output = Result<Customer, Self::Error>> + Send + '_;

  // ── Addresses ─────────────────────────────────────────────────────────

  fn add_address(
    &self,
    input: NewAddress,
  ) -> impl Future<Output = Result<Address, Self::Error>> + Send + '_;

  fn get_address(
    &self,
    id: AddressId,
  ) -> impl Future<Output = Result<Option<Address>, Self::Error>> + Send + '_;

  /// Attach an address to an active customer; attaching twice is a no-op.
  fn attach_address(
    &self,
    customer: CustomerId,
    address: AddressId,
  ) -> impl Future<Output = Result<Customer, Self::Error>> + Send + '_;

  /// Detach an address from an active customer; detaching twice is a no-op.
  fn detach_address(
    &self,
    customer: CustomerId,
    address: AddressId,
  ) -> impl Future<Output = Result<Customer, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn offset_counts_whole_pages() {
    assert_eq!(Page::new(1, 30).offset(), 0);
    assert_eq!(Page::new(3, 10).offset(), 20);
  }

  #[test]
  fn page_zero_starts_at_the_beginning() {
    let page = Page { number: 0, size: 10 };
    assert_eq!(page.offset(), 0);
    assert_eq!(Page::new(0, 0), Page { number: 1, size: 1 });
  }
}
