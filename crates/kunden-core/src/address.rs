//! Postal addresses referenced by customers (many-to-many).

use serde::{Deserialize, Serialize};

use crate::id::AddressId;

/// Input to [`crate::store::CustomerStore::add_address`]; also the JSON body
/// of `POST /adressen`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
  #[serde(default, rename = "strasse")]
  pub street:      Option<String>,
  #[serde(default, rename = "plz")]
  pub postal_code: Option<String>,
  #[serde(default, rename = "ort")]
  pub city:        Option<String>,
  #[serde(default, rename = "land")]
  pub country:     Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
  pub id:     AddressId,
  #[serde(flatten)]
  pub fields: NewAddress,
}
