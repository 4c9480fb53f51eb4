//! Validated SQL table identifiers.
//!
//! Table names end up interpolated into SQL text (placeholders cannot bind
//! identifiers), so they are checked once here and carried as [`TableName`]
//! from then on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const MAX_LEN: usize = 63;

/// A table name made of ASCII letters, digits and `_`, not starting with a
/// digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
  pub fn new(name: impl Into<String>) -> Result<Self> {
    let name = name.into();
    let mut chars = name.chars();
    let head_ok = chars
      .next()
      .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !head_ok || !tail_ok || name.len() > MAX_LEN {
      return Err(Error::Config(format!("invalid table name: {name:?}")));
    }
    Ok(Self(name))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for TableName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for TableName {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<TableName> for String {
  fn from(value: TableName) -> Self { value.0 }
}
