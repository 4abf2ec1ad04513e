//! [`MemoryStore`]: a [`CustomerStore`] over a locked [`Roster`].
//!
//! Every write holds the write lock for the whole operation, so readers only
//! ever see a roster whose relationships agree on both sides. Nothing
//! survives a restart.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
  Error, Result,
  address::{Address, NewAddress},
  agent::{Agent, NewAgent},
  customer::{Customer, NewCustomer},
  id::{AddressId, AgentId, CustomerId, UserId},
  roster::Roster,
  store::{CustomerStore, Page},
  user::{NewUser, User},
  validate,
};

#[derive(Debug, Default)]
struct State {
  roster:       Roster,
  next_agent:   i64,
  next_address: i64,
}

impl State {
  fn active_customer(&mut self, id: CustomerId) -> Result<&mut Customer> {
    let customer = self.roster.customer_mut(id)?;
    if customer.is_deleted() {
      return Err(Error::CustomerNotFound(id));
    }
    Ok(customer)
  }

  fn active_agent(&mut self, id: AgentId) -> Result<&mut Agent> {
    let agent = self.roster.agent_mut(id)?;
    if agent.is_deleted() {
      return Err(Error::AgentNotFound(id));
    }
    Ok(agent)
  }

  fn reference_number_taken(&self, number: &str, except: Option<AgentId>) -> bool {
    self
      .roster
      .agents()
      .any(|a| a.reference_number == number && Some(a.id()) != except)
  }

  /// A copy of `agent` listing only its active customers.
  fn agent_snapshot(&self, agent: &Agent) -> Agent {
    let mut agent = agent.clone();
    agent
      .customers
      .retain(|c| self.roster.customer(*c).is_some_and(|c| !c.is_deleted()));
    agent
  }

  fn customer_snapshot(&self, id: CustomerId) -> Result<Customer> {
    debug_assert!(self.roster.is_consistent());
    self.roster.customer(id).cloned().ok_or(Error::CustomerNotFound(id))
  }
}

/// A registry held entirely in memory.
///
/// Cloning is cheap; clones share the same roster.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  state: Arc<RwLock<State>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }
}

impl CustomerStore for MemoryStore {
  type Error = Error;

  // ── Agents ────────────────────────────────────────────────────────────────

  async fn add_agent(&self, input: NewAgent) -> Result<Agent> {
    validate::new_agent(&input).into_result()?;
    let mut state = self.state.write().await;
    if state.reference_number_taken(&input.reference_number, None) {
      return Err(Error::DuplicateReferenceNumber(input.reference_number));
    }

    state.next_agent += 1;
    let agent = Agent::new(AgentId(state.next_agent), input);
    state.roster.insert_agent(agent.clone());
    Ok(agent)
  }

  async fn get_agent(&self, id: AgentId) -> Result<Option<Agent>> {
    let state = self.state.read().await;
    Ok(state.roster.agent(id).map(|a| state.agent_snapshot(a)))
  }

  async fn list_agents(&self, page: Page) -> Result<Vec<Agent>> {
    let state = self.state.read().await;
    Ok(
      state
        .roster
        .agents()
        .filter(|a| !a.is_deleted())
        .skip(page.offset())
        .take(page.size)
        .map(|a| state.agent_snapshot(a))
        .collect(),
    )
  }

  async fn update_agent(&self, id: AgentId, input: NewAgent) -> Result<Agent> {
    validate::new_agent(&input).into_result()?;
    let mut state = self.state.write().await;
    state.active_agent(id)?;
    if state.reference_number_taken(&input.reference_number, Some(id)) {
      return Err(Error::DuplicateReferenceNumber(input.reference_number));
    }

    state.active_agent(id)?.apply(input);
    let agent = state.roster.agent(id).ok_or(Error::AgentNotFound(id))?;
    Ok(state.agent_snapshot(agent))
  }

  async fn delete_agent(&self, id: AgentId) -> Result<()> {
    let mut state = self.state.write().await;
    state.active_agent(id)?.delete();
    Ok(())
  }

  // ── Customers ─────────────────────────────────────────────────────────────

  async fn add_customer(&self, input: NewCustomer) -> Result<Customer> {
    validate::new_customer(&input).into_result()?;
    let mut state = self.state.write().await;

    let id = CustomerId::new_v4();
    state.roster.insert_customer(Customer::new(id, input))?;
    state.customer_snapshot(id)
  }

  async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
    Ok(self.state.read().await.roster.customer(id).cloned())
  }

  async fn list_customers(&self, page: Page) -> Result<Vec<Customer>> {
    let state = self.state.read().await;
    Ok(
      state
        .roster
        .customers()
        .filter(|c| !c.is_deleted())
        .skip(page.offset())
        .take(page.size)
        .cloned()
        .collect(),
    )
  }

  async fn update_customer(
    &self,
    id: CustomerId,
    input: NewCustomer,
  ) -> Result<Customer> {
    validate::new_customer(&input).into_result()?;
    let mut state = self.state.write().await;
    state.active_customer(id)?;

    // Relinking is the only step that can fail, so it goes first.
    state.roster.set_agent(id, input.agent)?;
    state.active_customer(id)?.apply(input);
    state.customer_snapshot(id)
  }

  async fn delete_customer(&self, id: CustomerId) -> Result<()> {
    let mut state = self.state.write().await;
    state.active_customer(id)?.delete();
    Ok(())
  }

  async fn purge_customer(&self, id: CustomerId) -> Result<()> {
    let mut state = self.state.write().await;
    state.roster.purge_customer(id)?;
    Ok(())
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    validate::new_user(&input).into_result()?;
    let mut state = self.state.write().await;
    if state.roster.users().any(|u| u.username == input.username) {
      return Err(Error::DuplicateUsername(input.username));
    }
    if let Some(c) = input.customer {
      state.active_customer(c)?;
    }

    let id = UserId::new_v4();
    state
      .roster
      .insert_user(User::restore(id, input.username, input.customer))?;
    state.roster.user(id).cloned().ok_or(Error::UserNotFound(id))
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    Ok(self.state.read().await.roster.user(id).cloned())
  }

  async fn link_user(
    &self,
    customer: CustomerId,
    user: Option<UserId>,
  ) -> Result<Customer> {
    let mut state = self.state.write().await;
    state.active_customer(customer)?;
    state.roster.set_user(customer, user)?;
    state.customer_snapshot(customer)
  }

  // ── Addresses ─────────────────────────────────────────────────────────────

  async fn add_address(&self, input: NewAddress) -> Result<Address> {
    let mut state = self.state.write().await;
    state.next_address += 1;
    let address = Address { id: AddressId(state.next_address), fields: input };
    state.roster.insert_address(address.clone());
    Ok(address)
  }

  async fn get_address(&self, id: AddressId) -> Result<Option<Address>> {
    Ok(self.state.read().await.roster.address(id).cloned())
  }

  async fn attach_address(
    &self,
    customer: CustomerId,
    address: AddressId,
  ) -> Result<Customer> {
    let mut state = self.state.write().await;
    state.active_customer(customer)?;
    state.roster.attach_address(customer, address)?;
    state.customer_snapshot(customer)
  }

  async fn detach_address(
    &self,
    customer: CustomerId,
    address: AddressId,
  ) -> Result<Customer> {
    let mut state = self.state.write().await;
    state.active_customer(customer)?;
    state.roster.detach_address(customer, address)?;
    state.customer_snapshot(customer)
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn new_customer(agent: AgentId) -> NewCustomer {
    NewCustomer::new(
      "Mustermann",
      "Max",
      NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
      agent,
    )
  }

  #[tokio::test]
  async fn customers_get_distinct_ids_and_join_their_agent() {
    let store = MemoryStore::new();
    let agent = store.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();

    let a = store.add_customer(new_customer(agent.id())).await.unwrap();
    let b = store.add_customer(new_customer(agent.id())).await.unwrap();
    assert_ne!(a.id(), b.id());

    let agent = store.get_agent(agent.id()).await.unwrap().unwrap();
    assert!(agent.customers().contains(&a.id()));
    assert!(agent.customers().contains(&b.id()));
  }

  #[tokio::test]
  async fn invalid_customer_is_not_written() {
    let store = MemoryStore::new();
    let agent = store.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
    let mut input = new_customer(agent.id());
    input.name = String::new();

    let err = store.add_customer(input).await.unwrap_err();
    assert!(matches!(err, Error::Invalid(_)));
    assert!(store.list_customers(Page::default()).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn update_moves_customer_between_agents() {
    let store = MemoryStore::new();
    let first = store.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
    let second = store.add_agent(NewAgent::new("Otto", "V-2")).await.unwrap();
    let customer = store.add_customer(new_customer(first.id())).await.unwrap();

    let updated = store
      .update_customer(customer.id(), new_customer(second.id()))
      .await
      .unwrap();
    assert_eq!(updated.agent(), Some(second.id()));

    let first = store.get_agent(first.id()).await.unwrap().unwrap();
    assert!(first.customers().is_empty());
  }

  #[tokio::test]
  async fn failed_update_changes_nothing() {
    let store = MemoryStore::new();
    let agent = store.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
    let customer = store.add_customer(new_customer(agent.id())).await.unwrap();

    let mut input = new_customer(AgentId(999));
    input.name = "Anders".into();
    let err = store.update_customer(customer.id(), input).await.unwrap_err();
    assert!(matches!(err, Error::UnknownAgent(AgentId(999))));

    let stored = store.get_customer(customer.id()).await.unwrap().unwrap();
    assert_eq!(stored.name, "Mustermann");
    assert_eq!(stored.agent(), Some(agent.id()));
  }

  #[tokio::test]
  async fn soft_deleted_customer_leaves_listing() {
    let store = MemoryStore::new();
    let agent = store.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
    let customer = store.add_customer(new_customer(agent.id())).await.unwrap();

    store.delete_customer(customer.id()).await.unwrap();

    assert!(store.list_customers(Page::default()).await.unwrap().is_empty());
    let stored = store.get_customer(customer.id()).await.unwrap().unwrap();
    assert!(stored.is_deleted());

    let err = store.delete_customer(customer.id()).await.unwrap_err();
    assert!(matches!(err, Error::CustomerNotFound(_)));

    let agent = store.get_agent(agent.id()).await.unwrap().unwrap();
    assert!(agent.customers().is_empty());
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_moves_keep_both_sides_in_step() {
    let store = MemoryStore::new();
    let a = store.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap().id();
    let b = store.add_agent(NewAgent::new("Otto", "V-2")).await.unwrap().id();
    let mut customers = Vec::new();
    for _ in 0..8 {
      customers.push(store.add_customer(new_customer(a)).await.unwrap().id());
    }

    let mut tasks = Vec::new();
    for round in 0..64 {
      let store = store.clone();
      let id = customers[round % customers.len()];
      let target = if round % 2 == 0 { b } else { a };
      tasks.push(tokio::spawn(async move {
        let moved = store.update_customer(id, new_customer(target)).await.unwrap();
        assert_eq!(moved.agent(), Some(target));

        for agent in [a, b] {
          let agent = store.get_agent(agent).await.unwrap().unwrap();
          for c in agent.customers() {
            assert!(store.get_customer(*c).await.unwrap().is_some());
          }
        }
      }));
    }
    for task in tasks {
      task.await.unwrap();
    }

    let state = store.state.read().await;
    assert!(state.roster.is_consistent());
    let first = state.roster.agent(a).unwrap().customers();
    let second = state.roster.agent(b).unwrap().customers();
    assert_eq!(first.len() + second.len(), customers.len());
    for id in &customers {
      let agent = state.roster.customer(*id).unwrap().agent();
      assert_eq!(first.contains(id), agent == Some(a));
      assert_eq!(second.contains(id), agent == Some(b));
    }
  }

  #[tokio::test]
  async fn duplicate_reference_number_conflicts() {
    let store = MemoryStore::new();
    store.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();

    let err = store.add_agent(NewAgent::new("Otto", "V-1")).await.unwrap_err();
    assert!(matches!(err, Error::DuplicateReferenceNumber(_)));
  }

  #[tokio::test]
  async fn paging_splits_listing() {
    let store = MemoryStore::new();
    for i in 0..5 {
      store
        .add_agent(NewAgent::new("Vera", format!("V-{i}")))
        .await
        .unwrap();
    }

    let first = store.list_agents(Page::new(1, 2)).await.unwrap();
    let last = store.list_agents(Page::new(3, 2)).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(last.len(), 1);
    assert_eq!(first[0].id(), AgentId(1));
    assert_eq!(last[0].id(), AgentId(5));
  }

  #[tokio::test]
  async fn user_link_round_trip() {
    let store = MemoryStore::new();
    let agent = store.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
    let customer = store.add_customer(new_customer(agent.id())).await.unwrap();

    let user = store
      .add_user(NewUser { username: "max".into(), customer: Some(customer.id()) })
      .await
      .unwrap();
    assert_eq!(user.customer(), Some(customer.id()));

    let unlinked = store.link_user(customer.id(), None).await.unwrap();
    assert_eq!(unlinked.user(), None);
    let user = store.get_user(user.id()).await.unwrap().unwrap();
    assert_eq!(user.customer(), None);
  }

  #[tokio::test]
  async fn purge_removes_linked_user() {
    let store = MemoryStore::new();
    let agent = store.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
    let customer = store.add_customer(new_customer(agent.id())).await.unwrap();
    let user = store
      .add_user(NewUser { username: "max".into(), customer: Some(customer.id()) })
      .await
      .unwrap();

    store.purge_customer(customer.id()).await.unwrap();

    assert!(store.get_customer(customer.id()).await.unwrap().is_none());
    assert!(store.get_user(user.id()).await.unwrap().is_none());
  }
}
