//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use kunden_core::{
  ErrorKind,
  address::NewAddress,
  agent::NewAgent,
  customer::{Gender, NewCustomer},
  id::{AddressId, AgentId, CustomerId, UserId},
  store::{CustomerStore, Page},
  user::NewUser,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_customer(agent: AgentId) -> NewCustomer {
  NewCustomer::new(
    "Mustermann",
    "Max",
    NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
    agent,
  )
}

fn core_kind(err: Error) -> ErrorKind {
  match err {
    Error::Core(e) => e.kind(),
    other => panic!("expected a domain error, got {other}"),
  }
}

// ─── Agents ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_agent() {
  let s = store().await;

  let mut input = NewAgent::new("Vera", "V-1");
  input.company = Some("Vermittlung GmbH".into());
  let agent = s.add_agent(input).await.unwrap();
  assert_eq!(agent.id(), AgentId(1));

  let fetched = s.get_agent(agent.id()).await.unwrap().unwrap();
  assert_eq!(fetched.given_name, "Vera");
  assert_eq!(fetched.company.as_deref(), Some("Vermittlung GmbH"));
  assert!(fetched.customers().is_empty());
  assert!(!fetched.is_deleted());
}

#[tokio::test]
async fn get_agent_missing_returns_none() {
  let s = store().await;
  assert!(s.get_agent(AgentId(7)).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_reference_number_conflicts() {
  let s = store().await;
  s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();

  let err = s.add_agent(NewAgent::new("Otto", "V-1")).await.unwrap_err();
  assert_eq!(core_kind(err), ErrorKind::Conflict);
}

#[tokio::test]
async fn update_agent_may_keep_its_own_reference_number() {
  let s = store().await;
  let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();

  let mut input = NewAgent::new("Veronika", "V-1");
  input.family_name = Some("Vogel".into());
  let updated = s.update_agent(agent.id(), input).await.unwrap();
  assert_eq!(updated.given_name, "Veronika");
  assert_eq!(updated.family_name.as_deref(), Some("Vogel"));
}

#[tokio::test]
async fn deleted_agent_leaves_listing_and_takes_no_customers() {
  let s = store().await;
  let a = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
  let b = s.add_agent(NewAgent::new("Otto", "V-2")).await.unwrap();

  s.delete_agent(a.id()).await.unwrap();

  let listed = s.list_agents(Page::default()).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].id(), b.id());
  assert!(s.get_agent(a.id()).await.unwrap().unwrap().is_deleted());

  let err = s.add_customer(new_customer(a.id())).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(kunden_core::Error::AgentDeleted(id)) if id == a.id()
  ));

  let err = s.delete_agent(a.id()).await.unwrap_err();
  assert_eq!(core_kind(err), ErrorKind::NotFound);
}

#[tokio::test]
async fn customer_may_stay_with_deleted_agent() {
  let s = store().await;
  let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
  let customer = s.add_customer(new_customer(agent.id())).await.unwrap();
  s.delete_agent(agent.id()).await.unwrap();

  let mut input = new_customer(agent.id());
  input.name = "Musterfrau".into();
  let updated = s.update_customer(customer.id(), input).await.unwrap();
  assert_eq!(updated.name, "Musterfrau");
  assert_eq!(updated.agent(), Some(agent.id()));
}

#[tokio::test]
async fn agents_are_paged_by_id() {
  let s = store().await;
  for i in 0..5 {
    s.add_agent(NewAgent::new("Vera", format!("V-{i}"))).await.unwrap();
  }

  let second = s.list_agents(Page::new(2, 2)).await.unwrap();
  let ids: Vec<_> = second.iter().map(|a| a.id()).collect();
  assert_eq!(ids, vec![AgentId(3), AgentId(4)]);
  assert!(s.list_agents(Page::new(4, 2)).await.unwrap().is_empty());
}

// ─── Customers ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_customer_registers_with_agent() {
  let s = store().await;
  let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();

  let mut input = new_customer(agent.id());
  input.gender = Some(Gender::Female);
  input.email = Some("max.mustermann@foo.de".into());
  let a = s.add_customer(input).await.unwrap();
  let b = s.add_customer(new_customer(agent.id())).await.unwrap();
  assert_ne!(a.id(), b.id());
  assert_eq!(a.agent(), Some(agent.id()));
  assert_eq!(a.gender, Some(Gender::Female));
  assert_eq!(a.birth_date, NaiveDate::from_ymd_opt(2001, 1, 1));

  let agent = s.get_agent(agent.id()).await.unwrap().unwrap();
  assert_eq!(agent.customers().len(), 2);
  assert!(agent.customers().contains(&a.id()));
  assert!(agent.customers().contains(&b.id()));
}

#[tokio::test]
async fn add_customer_with_unknown_agent_fails() {
  let s = store().await;

  let err = s.add_customer(new_customer(AgentId(42))).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(kunden_core::Error::UnknownAgent(AgentId(42)))
  ));
  assert!(s.list_customers(Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_customer_is_not_written() {
  let s = store().await;
  let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
  let mut input = new_customer(agent.id());
  input.given_name = "  ".into();
  input.email = Some("not-an-email".into());

  let err = s.add_customer(input).await.unwrap_err();
  let Error::Core(kunden_core::Error::Invalid(v)) = err else {
    panic!("expected a validation failure");
  };
  assert!(v.contains("vorname"));
  assert!(v.contains("email"));
  assert!(s.list_customers(Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_customer_moves_between_agents() {
  let s = store().await;
  let first = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
  let second = s.add_agent(NewAgent::new("Otto", "V-2")).await.unwrap();
  let customer = s.add_customer(new_customer(first.id())).await.unwrap();

  let mut input = new_customer(second.id());
  input.name = "Musterfrau".into();
  let updated = s.update_customer(customer.id(), input).await.unwrap();
  assert_eq!(updated.name, "Musterfrau");
  assert_eq!(updated.agent(), Some(second.id()));

  let first = s.get_agent(first.id()).await.unwrap().unwrap();
  let second = s.get_agent(second.id()).await.unwrap().unwrap();
  assert!(first.customers().is_empty());
  assert!(second.customers().contains(&customer.id()));
}

#[tokio::test]
async fn failed_update_changes_nothing() {
  let s = store().await;
  let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
  let customer = s.add_customer(new_customer(agent.id())).await.unwrap();

  let mut input = new_customer(AgentId(999));
  input.name = "Anders".into();
  let err = s.update_customer(customer.id(), input).await.unwrap_err();
  assert_eq!(core_kind(err), ErrorKind::Invalid);

  let stored = s.get_customer(customer.id()).await.unwrap().unwrap();
  assert_eq!(stored.name, "Mustermann");
  assert_eq!(stored.agent(), Some(agent.id()));
}

#[tokio::test]
async fn soft_delete_hides_customer_from_listing() {
  let s = store().await;
  let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
  let kept = s.add_customer(new_customer(agent.id())).await.unwrap();
  let gone = s.add_customer(new_customer(agent.id())).await.unwrap();

  s.delete_customer(gone.id()).await.unwrap();

  let listed = s.list_customers(Page::default()).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].id(), kept.id());
  assert!(s.get_customer(gone.id()).await.unwrap().unwrap().is_deleted());

  let err = s.delete_customer(gone.id()).await.unwrap_err();
  assert_eq!(core_kind(err), ErrorKind::NotFound);
  let err = s
    .update_customer(gone.id(), new_customer(agent.id()))
    .await
    .unwrap_err();
  assert_eq!(core_kind(err), ErrorKind::NotFound);

  let agent = s.get_agent(agent.id()).await.unwrap().unwrap();
  assert_eq!(agent.customers().len(), 1);
  assert!(agent.customers().contains(&kept.id()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_moves_keep_both_sides_in_step() {
  let s = store().await;
  let a = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap().id();
  let b = s.add_agent(NewAgent::new("Otto", "V-2")).await.unwrap().id();
  let mut customers = Vec::new();
  for _ in 0..8 {
    customers.push(s.add_customer(new_customer(a)).await.unwrap().id());
  }

  let mut tasks = Vec::new();
  for round in 0..64 {
    let s = s.clone();
    let id = customers[round % customers.len()];
    let target = if round % 2 == 0 { b } else { a };
    tasks.push(tokio::spawn(async move {
      let moved = s.update_customer(id, new_customer(target)).await.unwrap();
      assert_eq!(moved.agent(), Some(target));

      for agent in [a, b] {
        let agent = s.get_agent(agent).await.unwrap().unwrap();
        for c in agent.customers() {
          assert!(s.get_customer(*c).await.unwrap().is_some());
        }
      }
    }));
  }
  for task in tasks {
    task.await.unwrap();
  }

  let first = s.get_agent(a).await.unwrap().unwrap();
  let second = s.get_agent(b).await.unwrap().unwrap();
  assert_eq!(first.customers().len() + second.customers().len(), customers.len());
  for id in &customers {
    let agent = s.get_customer(*id).await.unwrap().unwrap().agent();
    assert_eq!(first.customers().contains(id), agent == Some(a));
    assert_eq!(second.customers().contains(id), agent == Some(b));
  }
}

#[tokio::test]
async fn get_customer_missing_returns_none() {
  let s = store().await;
  assert!(s.get_customer(CustomerId::new_v4()).await.unwrap().is_none());
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_created_for_customer_is_linked_both_ways() {
  let s = store().await;
  let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
  let customer = s.add_customer(new_customer(agent.id())).await.unwrap();

  let user = s
    .add_user(NewUser { username: "max".into(), customer: Some(customer.id()) })
    .await
    .unwrap();
  assert_eq!(user.customer(), Some(customer.id()));

  let customer = s.get_customer(customer.id()).await.unwrap().unwrap();
  assert_eq!(customer.user(), Some(user.id()));
}

#[tokio::test]
async fn duplicate_username_conflicts() {
  let s = store().await;
  s.add_user(NewUser { username: "max".into(), customer: None }).await.unwrap();

  let err = s
    .add_user(NewUser { username: "max".into(), customer: None })
    .await
    .unwrap_err();
  assert_eq!(core_kind(err), ErrorKind::Conflict);
}

#[tokio::test]
async fn relinking_replaces_previous_user() {
  let s = store().await;
  let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
  let customer = s.add_customer(new_customer(agent.id())).await.unwrap();
  let first = s
    .add_user(NewUser { username: "max".into(), customer: Some(customer.id()) })
    .await
    .unwrap();
  let second = s
    .add_user(NewUser { username: "moritz".into(), customer: None })
    .await
    .unwrap();

  let linked = s.link_user(customer.id(), Some(second.id())).await.unwrap();
  assert_eq!(linked.user(), Some(second.id()));
  let first = s.get_user(first.id()).await.unwrap().unwrap();
  assert_eq!(first.customer(), None);

  let unlinked = s.link_user(customer.id(), None).await.unwrap();
  assert_eq!(unlinked.user(), None);
  let second = s.get_user(second.id()).await.unwrap().unwrap();
  assert_eq!(second.customer(), None);
}

#[tokio::test]
async fn user_moving_between_customers_stays_one_to_one() {
  let s = store().await;
  let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
  let a = s.add_customer(new_customer(agent.id())).await.unwrap();
  let b = s.add_customer(new_customer(agent.id())).await.unwrap();
  let user = s
    .add_user(NewUser { username: "max".into(), customer: Some(a.id()) })
    .await
    .unwrap();

  s.link_user(b.id(), Some(user.id())).await.unwrap();

  assert_eq!(s.get_customer(a.id()).await.unwrap().unwrap().user(), None);
  assert_eq!(
    s.get_customer(b.id()).await.unwrap().unwrap().user(),
    Some(user.id())
  );
}

#[tokio::test]
async fn linking_unknown_user_fails() {
  let s = store().await;
  let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
  let customer = s.add_customer(new_customer(agent.id())).await.unwrap();

  let err = s
    .link_user(customer.id(), Some(UserId::new_v4()))
    .await
    .unwrap_err();
  assert_eq!(core_kind(err), ErrorKind::NotFound);
}

// ─── Addresses ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn attach_and_detach_address() {
  let s = store().await;
  let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
  let customer = s.add_customer(new_customer(agent.id())).await.unwrap();
  let address = s
    .add_address(NewAddress {
      street: Some("Hauptstraße 1".into()),
      city: Some("Berlin".into()),
      ..Default::default()
    })
    .await
    .unwrap();

  let fetched = s.get_address(address.id).await.unwrap().unwrap();
  assert_eq!(fetched, address);

  s.attach_address(customer.id(), address.id).await.unwrap();
  let attached = s.attach_address(customer.id(), address.id).await.unwrap();
  assert_eq!(attached.addresses().len(), 1);

  let detached = s.detach_address(customer.id(), address.id).await.unwrap();
  assert!(detached.addresses().is_empty());
  // the address itself survives
  assert!(s.get_address(address.id).await.unwrap().is_some());
}

#[tokio::test]
async fn attaching_unknown_address_fails() {
  let s = store().await;
  let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
  let customer = s.add_customer(new_customer(agent.id())).await.unwrap();

  let err = s
    .attach_address(customer.id(), AddressId(9))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(kunden_core::Error::AddressNotFound(AddressId(9)))
  ));
}

// ─── Purge ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn purge_cascades_to_user_and_address_links() {
  let s = store().await;
  let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
  let customer = s.add_customer(new_customer(agent.id())).await.unwrap();
  let user = s
    .add_user(NewUser { username: "max".into(), customer: Some(customer.id()) })
    .await
    .unwrap();
  let address = s.add_address(NewAddress::default()).await.unwrap();
  s.attach_address(customer.id(), address.id).await.unwrap();

  s.purge_customer(customer.id()).await.unwrap();

  assert!(s.get_customer(customer.id()).await.unwrap().is_none());
  assert!(s.get_user(user.id()).await.unwrap().is_none());
  assert!(s.get_address(address.id).await.unwrap().is_some());
  let agent = s.get_agent(agent.id()).await.unwrap().unwrap();
  assert!(agent.customers().is_empty());

  let err = s.purge_customer(customer.id()).await.unwrap_err();
  assert_eq!(core_kind(err), ErrorKind::NotFound);
}

#[tokio::test]
async fn file_store_survives_reopen() {
  let dir = std::env::temp_dir().join(format!("kunden-{}", uuid::Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("kunden.db");

  let customer = {
    let s = SqliteStore::open(&path).await.unwrap();
    let agent = s.add_agent(NewAgent::new("Vera", "V-1")).await.unwrap();
    s.add_customer(new_customer(agent.id())).await.unwrap()
  };

  let s = SqliteStore::open(&path).await.unwrap();
  let reloaded = s.get_customer(customer.id()).await.unwrap().unwrap();
  assert_eq!(reloaded, customer);

  drop(s);
  let _ = std::fs::remove_dir_all(&dir);
}
