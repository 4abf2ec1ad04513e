//! [`SqliteStore`]: the SQLite implementation of [`CustomerStore`].
//!
//! Relationships are stored once, on their owning side: `customers.agent_id`,
//! `users.customer_id` and `customer_addresses`. The inverse collections are
//! derived on every read, so both sides always agree.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension as _, params};
use tracing::debug;

use kunden_core::{
  address::{Address, NewAddress},
  agent::{Agent, NewAgent},
  customer::{Customer, NewCustomer},
  id::{AddressId, AgentId, CustomerId, UserId},
  lifecycle::Lifecycle,
  store::{CustomerStore, Page},
  user::{NewUser, User},
  validate,
};

use crate::{
  Error, Result,
  encode::{
    RawAddress, RawAgent, RawCustomer, RawUser, encode_customer_id, encode_date,
    encode_deletion_marker, encode_gender, encode_user_id,
  },
  schema::SCHEMA,
};

// ─── Connection closures ─────────────────────────────────────────────────────

/// Why a closure running on the connection thread gave up.
enum Failure {
  Db(rusqlite::Error),
  Domain(kunden_core::Error),
}

impl From<rusqlite::Error> for Failure {
  fn from(e: rusqlite::Error) -> Self { Self::Db(e) }
}

impl From<kunden_core::Error> for Failure {
  fn from(e: kunden_core::Error) -> Self { Self::Domain(e) }
}

type Step<T> = std::result::Result<T, Failure>;

const AGENT_COLUMNS: &str =
  "agent_id, given_name, family_name, company, deleted, reference_number";

const CUSTOMER_COLUMNS: &str = "customer_id, name, given_name, company, birth_date, \
                                deleted, gender, email, agent_id";

const ACTIVE_CUSTOMER: &str = "(deleted IS NULL OR deleted = 0)";

fn agent_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAgent> {
  Ok(RawAgent {
    agent_id:         row.get(0)?,
    given_name:       row.get(1)?,
    family_name:      row.get(2)?,
    company:          row.get(3)?,
    deleted:          row.get(4)?,
    reference_number: row.get(5)?,
    customers:        Vec::new(),
  })
}

fn customer_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCustomer> {
  Ok(RawCustomer {
    customer_id: row.get(0)?,
    name:        row.get(1)?,
    given_name:  row.get(2)?,
    company:     row.get(3)?,
    birth_date:  row.get(4)?,
    deleted:     row.get(5)?,
    gender:      row.get(6)?,
    email:       row.get(7)?,
    agent_id:    row.get(8)?,
    addresses:   Vec::new(),
    user_id:     None,
  })
}

/// Fill in the active customer ids held by an agent.
fn fill_agent(conn: &Connection, raw: &mut RawAgent) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare_cached(&format!(
    "SELECT customer_id FROM customers WHERE agent_id = ?1 AND {ACTIVE_CUSTOMER} \
     ORDER BY customer_id"
  ))?;
  raw.customers = stmt
    .query_map(params![raw.agent_id], |r| r.get(0))?
    .collect::<rusqlite::Result<_>>()?;
  Ok(())
}

/// Fill in a customer's address links and the user pointing at it.
fn fill_customer(conn: &Connection, raw: &mut RawCustomer) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare_cached(
    "SELECT address_id FROM customer_addresses WHERE customer_id = ?1 ORDER BY address_id",
  )?;
  raw.addresses = stmt
    .query_map(params![raw.customer_id], |r| r.get(0))?
    .collect::<rusqlite::Result<_>>()?;

  raw.user_id = conn
    .query_row(
      "SELECT user_id FROM users WHERE customer_id = ?1",
      params![raw.customer_id],
      |r| r.get(0),
    )
    .optional()?;
  Ok(())
}

fn load_agent(conn: &Connection, id: AgentId) -> rusqlite::Result<Option<RawAgent>> {
  let raw = conn
    .query_row(
      &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE agent_id = ?1"),
      params![id.0],
      agent_row,
    )
    .optional()?;
  let Some(mut raw) = raw else { return Ok(None) };
  fill_agent(conn, &mut raw)?;
  Ok(Some(raw))
}

fn load_customer(
  conn: &Connection,
  id: CustomerId,
) -> rusqlite::Result<Option<RawCustomer>> {
  let raw = conn
    .query_row(
      &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE customer_id = ?1"),
      params![encode_customer_id(id)],
      customer_row,
    )
    .optional()?;
  let Some(mut raw) = raw else { return Ok(None) };
  fill_customer(conn, &mut raw)?;
  Ok(Some(raw))
}

fn load_user(conn: &Connection, id: UserId) -> rusqlite::Result<Option<RawUser>> {
  conn
    .query_row(
      "SELECT user_id, username, customer_id FROM users WHERE user_id = ?1",
      params![encode_user_id(id)],
      |row| {
        Ok(RawUser {
          user_id:     row.get(0)?,
          username:    row.get(1)?,
          customer_id: row.get(2)?,
        })
      },
    )
    .optional()
}

fn require_agent(conn: &Connection, id: AgentId) -> Step<RawAgent> {
  Ok(load_agent(conn, id)?.ok_or(kunden_core::Error::AgentNotFound(id))?)
}

fn require_customer(conn: &Connection, id: CustomerId) -> Step<RawCustomer> {
  Ok(load_customer(conn, id)?.ok_or(kunden_core::Error::CustomerNotFound(id))?)
}

/// `None` if the agent does not exist, otherwise its deleted flag.
fn agent_deleted(conn: &Connection, id: AgentId) -> rusqlite::Result<Option<bool>> {
  conn
    .query_row(
      "SELECT deleted FROM agents WHERE agent_id = ?1",
      params![id.0],
      |r| r.get(0),
    )
    .optional()
}

fn active_agent(conn: &Connection, id: AgentId) -> Step<()> {
  match agent_deleted(conn, id)? {
    Some(false) => Ok(()),
    _ => Err(kunden_core::Error::AgentNotFound(id).into()),
  }
}

/// Whether `agent` may take a customer.
fn assignable(conn: &Connection, agent: AgentId) -> Step<()> {
  match agent_deleted(conn, agent)? {
    None => Err(kunden_core::Error::UnknownAgent(agent).into()),
    Some(true) => Err(kunden_core::Error::AgentDeleted(agent).into()),
    Some(false) => Ok(()),
  }
}

fn active_customer(conn: &Connection, id: CustomerId) -> Step<()> {
  let active: Option<bool> = conn
    .query_row(
      &format!(
        "SELECT {ACTIVE_CUSTOMER} FROM customers WHERE customer_id = ?1"
      ),
      params![encode_customer_id(id)],
      |r| r.get(0),
    )
    .optional()?;
  match active {
    Some(true) => Ok(()),
    _ => Err(kunden_core::Error::CustomerNotFound(id).into()),
  }
}

fn reference_taken(
  conn: &Connection,
  number: &str,
  except: Option<AgentId>,
) -> rusqlite::Result<bool> {
  conn.query_row(
    "SELECT EXISTS(SELECT 1 FROM agents WHERE reference_number = ?1 AND agent_id IS NOT ?2)",
    params![number, except.map(|a| a.0)],
    |r| r.get(0),
  )
}

fn limit_offset(page: Page) -> (i64, i64) {
  (
    i64::try_from(page.size).unwrap_or(i64::MAX),
    i64::try_from(page.offset()).unwrap_or(i64::MAX),
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A customer registry backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    debug!("sqlite schema initialised");
    Ok(())
  }

  /// Run `f` on the connection thread. Everything `f` does is serialised
  /// against every other call, which is what keeps check-then-write
  /// sequences atomic.
  async fn run<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection) -> Step<T> + Send + 'static,
    T: Send + 'static,
  {
    match self.conn.call(move |conn| Ok(f(conn))).await? {
      Ok(value) => Ok(value),
      Err(Failure::Db(e)) => Err(Error::Database(e.into())),
      Err(Failure::Domain(e)) => Err(Error::Core(e)),
    }
  }
}

// ─── CustomerStore impl ──────────────────────────────────────────────────────

impl CustomerStore for SqliteStore {
  type Error = Error;

  // ── Agents ────────────────────────────────────────────────────────────────

  async fn add_agent(&self, input: NewAgent) -> Result<Agent> {
    validate::new_agent(&input).into_result()?;

    let raw = self
      .run(move |conn| {
        if reference_taken(conn, &input.reference_number, None)? {
          return Err(
            kunden_core::Error::DuplicateReferenceNumber(input.reference_number).into(),
          );
        }
        conn.execute(
          "INSERT INTO agents (given_name, family_name, company, reference_number)
           VALUES (?1, ?2, ?3, ?4)",
          params![
            input.given_name,
            input.family_name,
            input.company,
            input.reference_number,
          ],
        )?;
        require_agent(conn, AgentId(conn.last_insert_rowid()))
      })
      .await?;

    debug!(agent_id = raw.agent_id, "agent inserted");
    raw.into_agent()
  }

  async fn get_agent(&self, id: AgentId) -> Result<Option<Agent>> {
    self
      .run(move |conn| Ok(load_agent(conn, id)?))
      .await?
      .map(RawAgent::into_agent)
      .transpose()
  }

  async fn list_agents(&self, page: Page) -> Result<Vec<Agent>> {
    let (limit, offset) = limit_offset(page);

    let raws: Vec<RawAgent> = self
      .run(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {AGENT_COLUMNS} FROM agents
           WHERE deleted = 0
           ORDER BY agent_id
           LIMIT ?1 OFFSET ?2"
        ))?;
        let mut raws = stmt
          .query_map(params![limit, offset], agent_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for raw in &mut raws {
          fill_agent(conn, raw)?;
        }
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawAgent::into_agent).collect()
  }

  async fn update_agent(&self, id: AgentId, input: NewAgent) -> Result<Agent> {
    validate::new_agent(&input).into_result()?;

    self
      .run(move |conn| {
        active_agent(conn, id)?;
        if reference_taken(conn, &input.reference_number, Some(id))? {
          return Err(
            kunden_core::Error::DuplicateReferenceNumber(input.reference_number).into(),
          );
        }
        conn.execute(
          "UPDATE agents
           SET given_name = ?2, family_name = ?3, company = ?4, reference_number = ?5
           WHERE agent_id = ?1",
          params![
            id.0,
            input.given_name,
            input.family_name,
            input.company,
            input.reference_number,
          ],
        )?;
        require_agent(conn, id)
      })
      .await?
      .into_agent()
  }

  async fn delete_agent(&self, id: AgentId) -> Result<()> {
    self
      .run(move |conn| {
        let changed = conn.execute(
          "UPDATE agents SET deleted = 1 WHERE agent_id = ?1 AND deleted = 0",
          params![id.0],
        )?;
        if changed == 0 {
          return Err(kunden_core::Error::AgentNotFound(id).into());
        }
        Ok(())
      })
      .await?;

    debug!(agent_id = id.0, "agent soft-deleted");
    Ok(())
  }

  // ── Customers ─────────────────────────────────────────────────────────────

  async fn add_customer(&self, input: NewCustomer) -> Result<Customer> {
    validate::new_customer(&input).into_result()?;
    let id = CustomerId::new_v4();

    let raw = self
      .run(move |conn| {
        let agent = input.agent.ok_or(kunden_core::Error::AgentUnassigned(id))?;
        assignable(conn, agent)?;
        conn.execute(
          "INSERT INTO customers (
             customer_id, name, given_name, company, birth_date,
             deleted, gender, email, agent_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?8)",
          params![
            encode_customer_id(id),
            input.name,
            input.given_name,
            input.company,
            input.birth_date.map(encode_date),
            input.gender.map(encode_gender),
            input.email,
            agent.0,
          ],
        )?;
        require_customer(conn, id)
      })
      .await?;

    debug!(customer_id = %id, agent_id = raw.agent_id, "customer inserted");
    raw.into_customer()
  }

  async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
    self
      .run(move |conn| Ok(load_customer(conn, id)?))
      .await?
      .map(RawCustomer::into_customer)
      .transpose()
  }

  async fn list_customers(&self, page: Page) -> Result<Vec<Customer>> {
    let (limit, offset) = limit_offset(page);

    let raws: Vec<RawCustomer> = self
      .run(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CUSTOMER_COLUMNS} FROM customers
           WHERE {ACTIVE_CUSTOMER}
           ORDER BY customer_id
           LIMIT ?1 OFFSET ?2"
        ))?;
        let mut raws = stmt
          .query_map(params![limit, offset], customer_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for raw in &mut raws {
          fill_customer(conn, raw)?;
        }
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawCustomer::into_customer).collect()
  }

  async fn update_customer(
    &self,
    id: CustomerId,
    input: NewCustomer,
  ) -> Result<Customer> {
    validate::new_customer(&input).into_result()?;

    self
      .run(move |conn| {
        active_customer(conn, id)?;
        let agent = input.agent.ok_or(kunden_core::Error::AgentUnassigned(id))?;
        let current: i64 = conn.query_row(
          "SELECT agent_id FROM customers WHERE customer_id = ?1",
          params![encode_customer_id(id)],
          |r| r.get(0),
        )?;
        // staying with a deleted agent is allowed, moving to one is not
        if current != agent.0 {
          assignable(conn, agent)?;
        }
        conn.execute(
          "UPDATE customers
           SET name = ?2, given_name = ?3, company = ?4, birth_date = ?5,
               gender = ?6, email = ?7, agent_id = ?8
           WHERE customer_id = ?1",
          params![
            encode_customer_id(id),
            input.name,
            input.given_name,
            input.company,
            input.birth_date.map(encode_date),
            input.gender.map(encode_gender),
            input.email,
            agent.0,
          ],
        )?;
        require_customer(conn, id)
      })
      .await?
      .into_customer()
  }

  async fn delete_customer(&self, id: CustomerId) -> Result<()> {
    self
      .run(move |conn| {
        let changed = conn.execute(
          &format!(
            "UPDATE customers SET deleted = ?2 WHERE customer_id = ?1 AND {ACTIVE_CUSTOMER}"
          ),
          params![
            encode_customer_id(id),
            encode_deletion_marker(Lifecycle::Deleted),
          ],
        )?;
        if changed == 0 {
          return Err(kunden_core::Error::CustomerNotFound(id).into());
        }
        Ok(())
      })
      .await?;

    debug!(customer_id = %id, "customer soft-deleted");
    Ok(())
  }

  async fn purge_customer(&self, id: CustomerId) -> Result<()> {
    // address links and the linked user go with it via ON DELETE CASCADE
    self
      .run(move |conn| {
        let changed = conn.execute(
          "DELETE FROM customers WHERE customer_id = ?1",
          params![encode_customer_id(id)],
        )?;
        if changed == 0 {
          return Err(kunden_core::Error::CustomerNotFound(id).into());
        }
        Ok(())
      })
      .await?;

    debug!(customer_id = %id, "customer purged");
    Ok(())
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    validate::new_user(&input).into_result()?;
    let id = UserId::new_v4();

    let raw = self
      .run(move |conn| {
        let taken: bool = conn.query_row(
          "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
          params![input.username],
          |r| r.get(0),
        )?;
        if taken {
          return Err(kunden_core::Error::DuplicateUsername(input.username).into());
        }
        if let Some(c) = input.customer {
          active_customer(conn, c)?;
        }

        let customer = input.customer.map(encode_customer_id);
        let tx = conn.transaction()?;
        // the customer's previous user, if any, loses its link
        tx.execute(
          "UPDATE users SET customer_id = NULL WHERE customer_id = ?1",
          params![customer],
        )?;
        tx.execute(
          "INSERT INTO users (user_id, username, customer_id) VALUES (?1, ?2, ?3)",
          params![encode_user_id(id), input.username, customer],
        )?;
        tx.commit()?;

        Ok(load_user(conn, id)?.ok_or(kunden_core::Error::UserNotFound(id))?)
      })
      .await?;

    debug!(user_id = %id, "user inserted");
    raw.into_user()
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    self
      .run(move |conn| Ok(load_user(conn, id)?))
      .await?
      .map(RawUser::into_user)
      .transpose()
  }

  async fn link_user(
    &self,
    customer: CustomerId,
    user: Option<UserId>,
  ) -> Result<Customer> {
    self
      .run(move |conn| {
        active_customer(conn, customer)?;
        if let Some(u) = user
          && load_user(conn, u)?.is_none()
        {
          return Err(kunden_core::Error::UserNotFound(u).into());
        }

        let customer_id = encode_customer_id(customer);
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE users SET customer_id = NULL WHERE customer_id = ?1",
          params![customer_id],
        )?;
        // a user linked elsewhere moves; the customer it leaves loses its link
        if let Some(u) = user {
          tx.execute(
            "UPDATE users SET customer_id = ?1 WHERE user_id = ?2",
            params![customer_id, encode_user_id(u)],
          )?;
        }
        tx.commit()?;

        require_customer(conn, customer)
      })
      .await?
      .into_customer()
  }

  // ── Addresses ─────────────────────────────────────────────────────────────

  async fn add_address(&self, input: NewAddress) -> Result<Address> {
    let fields = input.clone();
    let id = self
      .run(move |conn| {
        conn.execute(
          "INSERT INTO addresses (street, postal_code, city, country)
           VALUES (?1, ?2, ?3, ?4)",
          params![input.street, input.postal_code, input.city, input.country],
        )?;
        Ok(AddressId(conn.last_insert_rowid()))
      })
      .await?;

    Ok(Address { id, fields })
  }

  async fn get_address(&self, id: AddressId) -> Result<Option<Address>> {
    let raw = self
      .run(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT address_id, street, postal_code, city, country
               FROM addresses WHERE address_id = ?1",
              params![id.0],
              |row| {
                Ok(RawAddress {
                  address_id:  row.get(0)?,
                  street:      row.get(1)?,
                  postal_code: row.get(2)?,
                  city:        row.get(3)?,
                  country:     row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw.map(RawAddress::into_address))
  }

  async fn attach_address(
    &self,
    customer: CustomerId,
    address: AddressId,
  ) -> Result<Customer> {
    self
      .run(move |conn| {
        active_customer(conn, customer)?;
        let known: bool = conn.query_row(
          "SELECT EXISTS(SELECT 1 FROM addresses WHERE address_id = ?1)",
          params![address.0],
          |r| r.get(0),
        )?;
        if !known {
          return Err(kunden_core::Error::AddressNotFound(address).into());
        }
        conn.execute(
          "INSERT OR IGNORE INTO customer_addresses (customer_id, address_id)
           VALUES (?1, ?2)",
          params![encode_customer_id(customer), address.0],
        )?;
        require_customer(conn, customer)
      })
      .await?
      .into_customer()
  }

  async fn detach_address(
    &self,
    customer: CustomerId,
    address: AddressId,
  ) -> Result<Customer> {
    self
      .run(move |conn| {
        active_customer(conn, customer)?;
        conn.execute(
          "DELETE FROM customer_addresses WHERE customer_id = ?1 AND address_id = ?2",
          params![encode_customer_id(customer), address.0],
        )?;
        require_customer(conn, customer)
      })
      .await?
      .into_customer()
  }
}
