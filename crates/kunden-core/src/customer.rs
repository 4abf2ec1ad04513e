//! The customer record: the owning side of the customer → agent relation.
//!
//! Plain attributes are public fields. The identifier, the agent and user
//! references, the address set and the lifecycle are private: references only
//! change through a [`Roster`](crate::roster::Roster) (or a store backend),
//! which keeps the inverse side in step.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  id::{AddressId, AgentId, CustomerId, UserId},
  lifecycle::Lifecycle,
};

// ─── Gender ──────────────────────────────────────────────────────────────────

/// The fixed set of accepted gender values. The wire form is German; the
/// English names are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
  #[serde(rename = "männlich", alias = "male")]
  Male,
  #[serde(rename = "weiblich", alias = "female")]
  Female,
  #[serde(rename = "divers", alias = "other")]
  Other,
}

impl Gender {
  pub const ALL: [Self; 3] = [Self::Male, Self::Female, Self::Other];

  /// The canonical wire and storage value.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Male => "männlich",
      Self::Female => "weiblich",
      Self::Other => "divers",
    }
  }

  /// Parse a wire value or one of its English aliases.
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "männlich" | "male" => Some(Self::Male),
      "weiblich" | "female" => Some(Self::Female),
      "divers" | "other" => Some(Self::Other),
      _ => None,
    }
  }
}

// ─── NewCustomer ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::CustomerStore::add_customer`] and
/// [`crate::store::CustomerStore::update_customer`].
///
/// The identifier is never accepted from callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
  pub name:       String,
  pub given_name: String,
  pub company:    Option<String>,
  pub birth_date: Option<NaiveDate>,
  pub gender:     Option<Gender>,
  pub email:      Option<String>,
  /// Required by the store; `None` only survives until validation.
  pub agent:      Option<AgentId>,
}

impl NewCustomer {
  /// Convenience constructor with all optional fields left empty.
  pub fn new(
    name: impl Into<String>,
    given_name: impl Into<String>,
    birth_date: NaiveDate,
    agent: AgentId,
  ) -> Self {
    Self {
      name:       name.into(),
      given_name: given_name.into(),
      company:    None,
      birth_date: Some(birth_date),
      gender:     None,
      email:      None,
      agent:      Some(agent),
    }
  }
}

// ─── Customer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
  id:                    CustomerId,
  pub name:              String,
  pub given_name:        String,
  pub company:           Option<String>,
  pub birth_date:        Option<NaiveDate>,
  pub gender:            Option<Gender>,
  pub email:             Option<String>,
  pub(crate) agent:      Option<AgentId>,
  pub(crate) addresses:  BTreeSet<AddressId>,
  pub(crate) user:       Option<UserId>,
  pub(crate) lifecycle:  Lifecycle,
}

impl Customer {
  /// A fresh, active customer with no addresses and no linked user.
  ///
  /// The agent reference from `input` is carried as-is; inserting the record
  /// into a [`Roster`](crate::roster::Roster) registers it on the agent side.
  pub fn new(id: CustomerId, input: NewCustomer) -> Self {
    Self::restore(id, input, BTreeSet::new(), None, Lifecycle::Active)
  }

  /// Rebuild a customer exactly as a store backend loaded it.
  pub fn restore(
    id: CustomerId,
    input: NewCustomer,
    addresses: BTreeSet<AddressId>,
    user: Option<UserId>,
    lifecycle: Lifecycle,
  ) -> Self {
    Self {
      id,
      name: input.name,
      given_name: input.given_name,
      company: input.company,
      birth_date: input.birth_date,
      gender: input.gender,
      email: input.email,
      agent: input.agent,
      addresses,
      user,
      lifecycle,
    }
  }

  pub fn id(&self) -> CustomerId { self.id }

  pub fn agent(&self) -> Option<AgentId> { self.agent }

  /// The assigned agent's id.
  ///
  /// An unassigned agent is a broken precondition, reported as
  /// [`Error::AgentUnassigned`] rather than defaulted.
  pub fn agent_id(&self) -> Result<AgentId> {
    self.agent.ok_or(Error::AgentUnassigned(self.id))
  }

  pub fn addresses(&self) -> &BTreeSet<AddressId> { &self.addresses }

  pub fn user(&self) -> Option<UserId> { self.user }

  pub fn lifecycle(&self) -> Lifecycle { self.lifecycle }

  pub fn is_deleted(&self) -> bool { self.lifecycle.is_deleted() }

  /// Soft-delete. Returns `false` if the customer was already deleted.
  pub fn delete(&mut self) -> bool { self.lifecycle.delete() }

  /// Overwrite the plain attributes from `input`.
  ///
  /// `input.agent` is ignored here: the agent reference only changes through
  /// [`Roster::set_agent`](crate::roster::Roster::set_agent).
  pub fn apply(&mut self, input: NewCustomer) {
    self.name = input.name;
    self.given_name = input.given_name;
    self.company = input.company;
    self.birth_date = input.birth_date;
    self.gender = input.gender;
    self.email = input.email;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Customer {
    Customer::new(
      CustomerId::new_v4(),
      NewCustomer::new(
        "Mustermann",
        "Max",
        NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
        AgentId(7),
      ),
    )
  }

  #[test]
  fn agent_id_of_assigned_customer() {
    assert_eq!(sample().agent_id().unwrap(), AgentId(7));
  }

  #[test]
  fn agent_id_of_unassigned_customer_is_an_error() {
    let mut input = NewCustomer::new(
      "Mustermann",
      "Max",
      NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
      AgentId(7),
    );
    input.agent = None;
    let customer = Customer::new(CustomerId::new_v4(), input);

    let err = customer.agent_id().unwrap_err();
    assert!(matches!(err, Error::AgentUnassigned(id) if id == customer.id()));
  }

  #[test]
  fn apply_leaves_references_alone() {
    let mut customer = sample();
    let mut input = NewCustomer::new(
      "Musterfrau",
      "Erika",
      NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
      AgentId(99),
    );
    input.gender = Some(Gender::Female);
    customer.apply(input);

    assert_eq!(customer.name, "Musterfrau");
    assert_eq!(customer.gender, Some(Gender::Female));
    assert_eq!(customer.agent(), Some(AgentId(7)));
  }

  #[test]
  fn delete_is_one_way() {
    let mut customer = sample();
    assert!(customer.delete());
    assert!(customer.is_deleted());
    assert!(!customer.delete());
  }

  #[test]
  fn gender_accepts_wire_values_and_aliases() {
    for g in Gender::ALL {
      assert_eq!(Gender::parse(g.as_str()), Some(g));
    }
    assert_eq!(Gender::parse("other"), Some(Gender::Other));
    assert_eq!(Gender::parse("unbekannt"), None);
  }
}
