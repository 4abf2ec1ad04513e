//! The agent (broker) record: the inverse side of the customer → agent
//! relation.

use std::collections::BTreeSet;

use crate::{
  id::{AgentId, CustomerId},
  lifecycle::Lifecycle,
};

/// Longest accepted external reference number.
pub const MAX_REFERENCE_NUMBER_LEN: usize = 36;

/// Input to [`crate::store::CustomerStore::add_agent`] and
/// [`crate::store::CustomerStore::update_agent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAgent {
  pub given_name:       String,
  pub family_name:      Option<String>,
  pub company:          Option<String>,
  /// External reference number; unique across agents.
  pub reference_number: String,
}

impl NewAgent {
  pub fn new(
    given_name: impl Into<String>,
    reference_number: impl Into<String>,
  ) -> Self {
    Self {
      given_name:       given_name.into(),
      family_name:      None,
      company:          None,
      reference_number: reference_number.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
  id:                   AgentId,
  pub given_name:       String,
  pub family_name:      Option<String>,
  pub company:          Option<String>,
  pub reference_number: String,
  pub(crate) lifecycle: Lifecycle,
  /// Mirrors the agent reference held by each customer.
  pub(crate) customers: BTreeSet<CustomerId>,
}

impl Agent {
  /// A fresh, active agent with no customers.
  pub fn new(id: AgentId, input: NewAgent) -> Self {
    Self::restore(id, input, Lifecycle::Active, BTreeSet::new())
  }

  /// Rebuild an agent exactly as a store backend loaded it. `customers` must
  /// be the set of active customers whose agent reference is `id`.
  pub fn restore(
    id: AgentId,
    input: NewAgent,
    lifecycle: Lifecycle,
    customers: BTreeSet<CustomerId>,
  ) -> Self {
    Self {
      id,
      given_name: input.given_name,
      family_name: input.family_name,
      company: input.company,
      reference_number: input.reference_number,
      lifecycle,
      customers,
    }
  }

  pub fn id(&self) -> AgentId { self.id }

  pub fn customers(&self) -> &BTreeSet<CustomerId> { &self.customers }

  pub fn lifecycle(&self) -> Lifecycle { self.lifecycle }

  pub fn is_deleted(&self) -> bool { self.lifecycle.is_deleted() }

  /// Soft-delete. Assigned customers keep their reference.
  pub fn delete(&mut self) -> bool { self.lifecycle.delete() }

  pub fn apply(&mut self, input: NewAgent) {
    self.given_name = input.given_name;
    self.family_name = input.family_name;
    self.company = input.company;
    self.reference_number = input.reference_number;
  }
}
