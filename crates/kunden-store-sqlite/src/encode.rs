//! Encoding and decoding helpers between domain records and the plain
//! representations stored in SQLite columns.
//!
//! UUIDs are stored as hyphenated lowercase strings, dates as `YYYY-MM-DD`.
//! The customer deletion marker is a nullable integer, the agent one a
//! boolean; both decode to [`Lifecycle`].

use std::collections::BTreeSet;

use chrono::NaiveDate;
use kunden_core::{
  address::{Address, NewAddress},
  agent::{Agent, NewAgent},
  customer::{Customer, Gender, NewCustomer},
  id::{AddressId, AgentId, CustomerId, UserId},
  lifecycle::Lifecycle,
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Ids ─────────────────────────────────────────────────────────────────────

pub fn encode_customer_id(id: CustomerId) -> String { id.0.hyphenated().to_string() }

pub fn decode_customer_id(s: &str) -> Result<CustomerId> {
  Ok(CustomerId(Uuid::parse_str(s)?))
}

pub fn encode_user_id(id: UserId) -> String { id.0.hyphenated().to_string() }

pub fn decode_user_id(s: &str) -> Result<UserId> { Ok(UserId(Uuid::parse_str(s)?)) }

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(date: NaiveDate) -> String { date.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Gender ──────────────────────────────────────────────────────────────────

pub fn encode_gender(g: Gender) -> &'static str { g.as_str() }

pub fn decode_gender(s: &str) -> Result<Gender> {
  Gender::parse(s).ok_or_else(|| Error::Decode(format!("unknown gender: {s:?}")))
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

/// Customer marker: `NULL` while active.
pub fn encode_deletion_marker(l: Lifecycle) -> Option<i64> {
  match l {
    Lifecycle::Active => None,
    Lifecycle::Deleted => Some(1),
  }
}

/// Any non-null, non-zero marker means deleted.
pub fn decode_deletion_marker(marker: Option<i64>) -> Lifecycle {
  match marker {
    None | Some(0) => Lifecycle::Active,
    Some(_) => Lifecycle::Deleted,
  }
}

pub fn decode_deleted_flag(deleted: bool) -> Lifecycle {
  if deleted { Lifecycle::Deleted } else { Lifecycle::Active }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from an `agents` row plus its derived customer ids.
pub struct RawAgent {
  pub agent_id:         i64,
  pub given_name:       String,
  pub family_name:      Option<String>,
  pub company:          Option<String>,
  pub deleted:          bool,
  pub reference_number: String,
  pub customers:        Vec<String>,
}

impl RawAgent {
  pub fn into_agent(self) -> Result<Agent> {
    let customers = self
      .customers
      .iter()
      .map(|s| decode_customer_id(s))
      .collect::<Result<BTreeSet<_>>>()?;

    Ok(Agent::restore(
      AgentId(self.agent_id),
      NewAgent {
        given_name:       self.given_name,
        family_name:      self.family_name,
        company:          self.company,
        reference_number: self.reference_number,
      },
      decode_deleted_flag(self.deleted),
      customers,
    ))
  }
}

/// Raw values read from a `customers` row plus its address links and the
/// id of the user pointing at it.
pub struct RawCustomer {
  pub customer_id: String,
  pub name:        String,
  pub given_name:  String,
  pub company:     Option<String>,
  pub birth_date:  Option<String>,
  pub deleted:     Option<i64>,
  pub gender:      Option<String>,
  pub email:       Option<String>,
  pub agent_id:    i64,
  pub addresses:   Vec<i64>,
  pub user_id:     Option<String>,
}

impl RawCustomer {
  pub fn into_customer(self) -> Result<Customer> {
    let id = decode_customer_id(&self.customer_id)?;
    let birth_date = self.birth_date.as_deref().map(decode_date).transpose()?;
    let gender = self.gender.as_deref().map(decode_gender).transpose()?;
    let user = self.user_id.as_deref().map(decode_user_id).transpose()?;

    Ok(Customer::restore(
      id,
      NewCustomer {
        name: self.name,
        given_name: self.given_name,
        company: self.company,
        birth_date,
        gender,
        email: self.email,
        agent: Some(AgentId(self.agent_id)),
      },
      self.addresses.into_iter().map(AddressId).collect(),
      user,
      decode_deletion_marker(self.deleted),
    ))
  }
}

/// Raw values read from a `users` row.
pub struct RawUser {
  pub user_id:     String,
  pub username:    String,
  pub customer_id: Option<String>,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User::restore(
      decode_user_id(&self.user_id)?,
      self.username,
      self.customer_id.as_deref().map(decode_customer_id).transpose()?,
    ))
  }
}

/// Raw values read from an `addresses` row.
pub struct RawAddress {
  pub address_id:  i64,
  pub street:      Option<String>,
  pub postal_code: Option<String>,
  pub city:        Option<String>,
  pub country:     Option<String>,
}

impl RawAddress {
  pub fn into_address(self) -> Address {
    Address {
      id:     AddressId(self.address_id),
      fields: NewAddress {
        street:      self.street,
        postal_code: self.postal_code,
        city:        self.city,
        country:     self.country,
      },
    }
  }
}
