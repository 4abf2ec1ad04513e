//! Read and write views: the field subsets exposed over the wire.
//!
//! | View | Fields |
//! |------|--------|
//! | [`CustomerRead`] | `id`, `name`, `vorname`, `geburtsdatum`, `email`, `vermittlerId`, `adressen`, `user` |
//! | [`CustomerWrite`] | `name`, `vorname`, `firma`, `geburtsdatum`, `geschlecht`, `email`, `vermittler` |
//! | [`AgentRead`] | `id`, `vorname`, `nachname`, `firma`, `geloescht`, `nummer`, `kunden` |
//! | [`AgentWrite`] | `vorname`, `nachname`, `firma`, `nummer` |
//!
//! Write views never carry an identifier; an `id` in a request body is
//! ignored.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  agent::{Agent, NewAgent},
  customer::{Customer, Gender, NewCustomer},
  id::{AddressId, AgentId, CustomerId, UserId},
  validate::{self, CHOICE, Violations},
};

// ─── Customer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerRead {
  pub id:         CustomerId,
  pub name:       String,
  #[serde(rename = "vorname")]
  pub given_name: String,
  #[serde(rename = "geburtsdatum")]
  pub birth_date: Option<NaiveDate>,
  pub email:      Option<String>,
  #[serde(rename = "vermittlerId")]
  pub agent_id:   AgentId,
  #[serde(rename = "adressen")]
  pub addresses:  Vec<AddressId>,
  pub user:       Option<UserId>,
}

impl CustomerRead {
  /// Fails with [`crate::Error::AgentUnassigned`] for a customer that has
  /// not been given an agent.
  pub fn from_customer(customer: &Customer) -> Result<Self> {
    Ok(Self {
      id:         customer.id(),
      name:       customer.name.clone(),
      given_name: customer.given_name.clone(),
      birth_date: customer.birth_date,
      email:      customer.email.clone(),
      agent_id:   customer.agent_id()?,
      addresses:  customer.addresses().iter().copied().collect(),
      user:       customer.user(),
    })
  }
}

/// An agent given either by id or by IRI (`/api/vermittlers/3`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AgentRef {
  Id(AgentId),
  Iri(String),
}

impl AgentRef {
  pub fn resolve(&self) -> Option<AgentId> {
    match self {
      Self::Id(id) => Some(*id),
      Self::Iri(iri) => {
        let mut segments = iri.trim_end_matches('/').rsplit('/');
        let id: AgentId = segments.next()?.parse().ok()?;
        (segments.next() == Some("vermittlers")).then_some(id)
      }
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomerWrite {
  pub name:       Option<String>,
  #[serde(rename = "vorname")]
  pub given_name: Option<String>,
  #[serde(rename = "firma")]
  pub company:    Option<String>,
  #[serde(rename = "geburtsdatum")]
  pub birth_date: Option<NaiveDate>,
  /// Kept as text so an unknown value is a field violation, not a decode
  /// error.
  #[serde(rename = "geschlecht")]
  pub gender:     Option<String>,
  pub email:      Option<String>,
  #[serde(rename = "vermittler")]
  pub agent:      Option<AgentRef>,
}

impl CustomerWrite {
  /// Decode and validate, reporting every violation at once as
  /// [`crate::Error::Invalid`].
  pub fn into_new_customer(self) -> Result<NewCustomer> {
    let mut violations = Violations::default();

    let gender = match non_empty(self.gender) {
      None => None,
      Some(raw) => {
        let parsed = Gender::parse(raw.trim());
        if parsed.is_none() {
          violations.push("geschlecht", CHOICE);
        }
        parsed
      }
    };

    let agent = match &self.agent {
      None => None,
      Some(r) => {
        let resolved = r.resolve();
        if resolved.is_none() {
          violations.push("vermittler", "This value is not a valid agent reference.");
        }
        resolved
      }
    };

    let input = NewCustomer {
      name: self.name.unwrap_or_default(),
      given_name: self.given_name.unwrap_or_default(),
      company: non_empty(self.company),
      birth_date: self.birth_date,
      gender,
      email: non_empty(self.email),
      agent,
    };

    violations.merge(validate::new_customer(&input));
    violations.into_result()?;
    Ok(input)
  }
}

// ─── Agent ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentRead {
  pub id:               AgentId,
  #[serde(rename = "vorname")]
  pub given_name:       String,
  #[serde(rename = "nachname")]
  pub family_name:      Option<String>,
  #[serde(rename = "firma")]
  pub company:          Option<String>,
  #[serde(rename = "geloescht")]
  pub deleted:          bool,
  #[serde(rename = "nummer")]
  pub reference_number: String,
  #[serde(rename = "kunden")]
  pub customers:        Vec<CustomerId>,
}

impl From<&Agent> for AgentRead {
  fn from(agent: &Agent) -> Self {
    Self {
      id:               agent.id(),
      given_name:       agent.given_name.clone(),
      family_name:      agent.family_name.clone(),
      company:          agent.company.clone(),
      deleted:          agent.is_deleted(),
      reference_number: agent.reference_number.clone(),
      customers:        agent.customers().iter().copied().collect(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AgentWrite {
  #[serde(rename = "vorname")]
  pub given_name:       Option<String>,
  #[serde(rename = "nachname")]
  pub family_name:      Option<String>,
  #[serde(rename = "firma")]
  pub company:          Option<String>,
  #[serde(rename = "nummer")]
  pub reference_number: Option<String>,
}

impl AgentWrite {
  pub fn into_new_agent(self) -> Result<NewAgent> {
    let input = NewAgent {
      given_name:       self.given_name.unwrap_or_default(),
      family_name:      non_empty(self.family_name),
      company:          non_empty(self.company),
      reference_number: self.reference_number.unwrap_or_default(),
    };
    validate::new_agent(&input).into_result()?;
    Ok(input)
  }
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::Error;

  fn write_body() -> serde_json::Value {
    json!({
      "id": "ignored",
      "name": "Mustermann",
      "vorname": "Max",
      "firma": "Max Mustermann GmbH",
      "geburtsdatum": "2001-01-01",
      "geschlecht": "männlich",
      "email": "max.mustermann@foo.de",
      "vermittler": 3
    })
  }

  #[test]
  fn write_view_decodes_into_new_customer() {
    let write: CustomerWrite = serde_json::from_value(write_body()).unwrap();
    let input = write.into_new_customer().unwrap();

    assert_eq!(input.given_name, "Max");
    assert_eq!(input.company.as_deref(), Some("Max Mustermann GmbH"));
    assert_eq!(input.birth_date, NaiveDate::from_ymd_opt(2001, 1, 1));
    assert_eq!(input.gender, Some(Gender::Male));
    assert_eq!(input.agent, Some(AgentId(3)));
  }

  #[test]
  fn agent_may_be_given_as_iri() {
    let mut body = write_body();
    body["vermittler"] = json!("/api/vermittlers/12");
    let write: CustomerWrite = serde_json::from_value(body).unwrap();

    assert_eq!(write.into_new_customer().unwrap().agent, Some(AgentId(12)));
  }

  #[test]
  fn iri_must_name_the_agent_collection() {
    let iri = |s: &str| AgentRef::Iri(s.into()).resolve();

    assert_eq!(iri("/api/vermittlers/3"), Some(AgentId(3)));
    assert_eq!(iri("vermittlers/3/"), Some(AgentId(3)));
    assert_eq!(iri("/api/kunden/3"), None);
    assert_eq!(iri("3"), None);
  }

  #[test]
  fn bad_gender_and_bad_agent_are_field_violations() {
    let mut body = write_body();
    body["geschlecht"] = json!("unbekannt");
    body["vermittler"] = json!("/api/vermittlers/abc");
    let write: CustomerWrite = serde_json::from_value(body).unwrap();

    let Err(Error::Invalid(v)) = write.into_new_customer() else {
      panic!("expected a validation failure");
    };
    assert_eq!(v.len(), 2);
    assert!(v.contains("geschlecht"));
    assert!(v.contains("vermittler"));
  }

  #[test]
  fn read_view_uses_wire_names() {
    let write: CustomerWrite = serde_json::from_value(write_body()).unwrap();
    let customer = Customer::new(CustomerId::new_v4(), write.into_new_customer().unwrap());

    let read = CustomerRead::from_customer(&customer).unwrap();
    let value = serde_json::to_value(&read).unwrap();

    assert_eq!(value["id"], json!(customer.id().to_string()));
    assert_eq!(value["vorname"], json!("Max"));
    assert_eq!(value["geburtsdatum"], json!("2001-01-01"));
    assert_eq!(value["vermittlerId"], json!(3));
    assert_eq!(value["adressen"], json!([]));
    assert_eq!(value["user"], json!(null));
    // write-only fields stay out of the read view
    assert!(value.get("firma").is_none());
    assert!(value.get("geschlecht").is_none());
  }

  #[test]
  fn read_view_requires_an_agent() {
    let mut write: CustomerWrite = serde_json::from_value(write_body()).unwrap();
    write.agent = None;
    let mut input = NewCustomer::new(
      "Mustermann",
      "Max",
      NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
      AgentId(1),
    );
    input.agent = None;
    let customer = Customer::new(CustomerId::new_v4(), input);

    assert!(matches!(
      CustomerRead::from_customer(&customer),
      Err(Error::AgentUnassigned(_))
    ));
    assert!(matches!(write.into_new_customer(), Err(Error::Invalid(v)) if v.contains("vermittler")));
  }

  #[test]
  fn agent_write_validates() {
    let write: AgentWrite =
      serde_json::from_value(json!({ "vorname": "Vera", "nummer": "" })).unwrap();
    assert!(matches!(write.into_new_agent(), Err(Error::Invalid(v)) if v.contains("nummer")));
  }
}
