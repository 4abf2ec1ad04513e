//! The in-memory entity graph.
//!
//! A [`Roster`] owns every agent, customer, user and address it knows about
//! and is the only place where relationship fields change. Both sides of the
//! customer → agent relation go through [`Roster::relink`]; both sides of the
//! customer ↔ user relation go through [`Roster::set_user`]. Records refer to
//! each other by id, so "is this the same agent" is always an id comparison.

use std::collections::BTreeMap;

use crate::{
  Error, Result,
  address::Address,
  agent::Agent,
  customer::Customer,
  id::{AddressId, AgentId, CustomerId, UserId},
  user::User,
};

#[derive(Debug, Clone, Default)]
pub struct Roster {
  agents:    BTreeMap<AgentId, Agent>,
  customers: BTreeMap<CustomerId, Customer>,
  users:     BTreeMap<UserId, User>,
  addresses: BTreeMap<AddressId, Address>,
}

impl Roster {
  pub fn new() -> Self { Self::default() }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub fn agent(&self, id: AgentId) -> Option<&Agent> { self.agents.get(&id) }

  pub fn customer(&self, id: CustomerId) -> Option<&Customer> {
    self.customers.get(&id)
  }

  pub fn user(&self, id: UserId) -> Option<&User> { self.users.get(&id) }

  pub fn address(&self, id: AddressId) -> Option<&Address> {
    self.addresses.get(&id)
  }

  pub fn agents(&self) -> impl Iterator<Item = &Agent> { self.agents.values() }

  pub fn customers(&self) -> impl Iterator<Item = &Customer> {
    self.customers.values()
  }

  pub fn users(&self) -> impl Iterator<Item = &User> { self.users.values() }

  /// Mutable access to an agent's plain attributes and lifecycle.
  pub fn agent_mut(&mut self, id: AgentId) -> Result<&mut Agent> {
    self.agents.get_mut(&id).ok_or(Error::AgentNotFound(id))
  }

  /// Mutable access to a customer's plain attributes and lifecycle.
  pub fn customer_mut(&mut self, id: CustomerId) -> Result<&mut Customer> {
    self.customers.get_mut(&id).ok_or(Error::CustomerNotFound(id))
  }

  // ── Inserts ───────────────────────────────────────────────────────────────

  /// Add an agent. Its customer set is rebuilt from the customers already in
  /// the roster rather than trusted.
  pub fn insert_agent(&mut self, mut agent: Agent) {
    let id = agent.id();
    agent.customers = self
      .customers
      .values()
      .filter(|c| c.agent == Some(id))
      .map(Customer::id)
      .collect();
    self.agents.insert(id, agent);
  }

  /// Add a customer, registering it with its agent.
  ///
  /// Any user back-reference on the record is dropped; links are made from
  /// the user side with [`Roster::set_user`].
  pub fn insert_customer(&mut self, mut customer: Customer) -> Result<()> {
    let agent = customer.agent.take();
    if let Some(a) = agent {
      self.assignable(a)?;
    }
    if let Some(missing) =
      customer.addresses.iter().find(|a| !self.addresses.contains_key(*a))
    {
      return Err(Error::AddressNotFound(*missing));
    }
    customer.user = None;

    let id = customer.id();
    self.customers.insert(id, customer);
    self.relink(id, agent)
  }

  /// Add a user, linking it to its customer if it names one.
  pub fn insert_user(&mut self, mut user: User) -> Result<()> {
    let customer = user.customer.take();
    if let Some(c) = customer
      && !self.customers.contains_key(&c)
    {
      return Err(Error::CustomerNotFound(c));
    }

    let id = user.id();
    self.users.insert(id, user);
    match customer {
      Some(c) => self.set_user(c, Some(id)),
      None => Ok(()),
    }
  }

  pub fn insert_address(&mut self, address: Address) {
    self.addresses.insert(address.id, address);
  }

  // ── Customer → agent ──────────────────────────────────────────────────────

  /// Assign `customer` to `agent`. Idempotent: returns `false` if the agent
  /// already holds the customer. A customer held by another agent moves.
  pub fn add_customer(
    &mut self,
    agent: AgentId,
    customer: CustomerId,
  ) -> Result<bool> {
    let held = self
      .agents
      .get(&agent)
      .ok_or(Error::AgentNotFound(agent))?
      .customers
      .contains(&customer);
    if held {
      return Ok(false);
    }
    self.relink(customer, Some(agent))?;
    Ok(true)
  }

  /// Take `customer` away from `agent`, leaving it unassigned. Returns
  /// `false` if the agent did not hold the customer.
  pub fn remove_customer(
    &mut self,
    agent: AgentId,
    customer: CustomerId,
  ) -> Result<bool> {
    let held = self
      .agents
      .get(&agent)
      .ok_or(Error::AgentNotFound(agent))?
      .customers
      .contains(&customer);
    if !held {
      return Ok(false);
    }
    self.relink(customer, None)?;
    Ok(true)
  }

  /// Replace the customer's agent, updating the previous and the new agent's
  /// customer sets.
  pub fn set_agent(
    &mut self,
    customer: CustomerId,
    agent: Option<AgentId>,
  ) -> Result<()> {
    self.relink(customer, agent)
  }

  fn assignable(&self, agent: AgentId) -> Result<()> {
    let target = self.agents.get(&agent).ok_or(Error::UnknownAgent(agent))?;
    if target.is_deleted() {
      return Err(Error::AgentDeleted(agent));
    }
    Ok(())
  }

  /// The single place where a customer's agent reference changes.
  ///
  /// A customer may stay with a deleted agent but never move to one.
  fn relink(&mut self, customer: CustomerId, agent: Option<AgentId>) -> Result<()> {
    let current = self
      .customers
      .get(&customer)
      .ok_or(Error::CustomerNotFound(customer))?
      .agent;
    if let Some(a) = agent
      && current != agent
    {
      self.assignable(a)?;
    }
    let record = self
      .customers
      .get_mut(&customer)
      .ok_or(Error::CustomerNotFound(customer))?;

    let previous = std::mem::replace(&mut record.agent, agent);
    if let Some(p) = previous
      && let Some(old) = self.agents.get_mut(&p)
    {
      old.customers.remove(&customer);
    }
    if let Some(a) = agent
      && let Some(new) = self.agents.get_mut(&a)
    {
      new.customers.insert(customer);
    }

    if previous != agent {
      tracing::debug!(%customer, ?previous, ?agent, "customer reassigned");
    }
    Ok(())
  }

  // ── Customer ↔ user ───────────────────────────────────────────────────────

  /// Link `user` to `customer` (or unlink with `None`), keeping the user's
  /// owning reference and the customer's back-reference in agreement.
  ///
  /// A user linked elsewhere is moved; the customer it leaves loses its link.
  pub fn set_user(
    &mut self,
    customer: CustomerId,
    user: Option<UserId>,
  ) -> Result<()> {
    if let Some(u) = user
      && !self.users.contains_key(&u)
    {
      return Err(Error::UserNotFound(u));
    }
    let record = self
      .customers
      .get_mut(&customer)
      .ok_or(Error::CustomerNotFound(customer))?;

    let previous = std::mem::replace(&mut record.user, user);

    // unset the owning side of the old link
    if let Some(p) = previous
      && Some(p) != user
      && let Some(old) = self.users.get_mut(&p)
    {
      old.customer = None;
    }

    // set the owning side of the new link
    if let Some(u) = user
      && let Some(linked) = self.users.get_mut(&u)
      && linked.customer != Some(customer)
    {
      let other = linked.customer.replace(customer);
      if let Some(o) = other
        && let Some(left) = self.customers.get_mut(&o)
      {
        left.user = None;
      }
    }

    Ok(())
  }

  // ── Customer → addresses ──────────────────────────────────────────────────

  /// Returns `false` if the address was already attached.
  pub fn attach_address(
    &mut self,
    customer: CustomerId,
    address: AddressId,
  ) -> Result<bool> {
    if !self.addresses.contains_key(&address) {
      return Err(Error::AddressNotFound(address));
    }
    Ok(self.customer_mut(customer)?.addresses.insert(address))
  }

  /// Returns `false` if the address was not attached.
  pub fn detach_address(
    &mut self,
    customer: CustomerId,
    address: AddressId,
  ) -> Result<bool> {
    Ok(self.customer_mut(customer)?.addresses.remove(&address))
  }

  // ── Removal ───────────────────────────────────────────────────────────────

  /// Physically remove a customer: it leaves its agent's set and its linked
  /// user is removed with it.
  pub fn purge_customer(&mut self, id: CustomerId) -> Result<Customer> {
    self.relink(id, None)?;
    let customer =
      self.customers.remove(&id).ok_or(Error::CustomerNotFound(id))?;
    if let Some(u) = customer.user {
      self.users.remove(&u);
    }
    Ok(customer)
  }

  /// Whether every relationship is mirrored on both sides.
  pub fn is_consistent(&self) -> bool {
    let agents_agree = self.agents.values().all(|a| {
      a.customers
        .iter()
        .all(|c| self.customers.get(c).is_some_and(|c| c.agent == Some(a.id())))
    });
    let customers_agree = self.customers.values().all(|c| match c.agent {
      Some(a) => self.agents.get(&a).is_some_and(|a| a.customers.contains(&c.id())),
      None => true,
    });
    let users_agree = self.users.values().all(|u| match u.customer {
      Some(c) => self.customers.get(&c).is_some_and(|c| c.user == Some(u.id())),
      None => true,
    });
    let back_refs_agree = self.customers.values().all(|c| match c.user {
      Some(u) => self.users.get(&u).is_some_and(|u| u.customer == Some(c.id())),
      None => true,
    });

    agents_agree && customers_agree && users_agree && back_refs_agree
  }
}
