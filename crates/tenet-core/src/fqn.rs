//! Fully-qualified names and the name rules they are built from.
//!
//! Three shapes exist, matched case-sensitively:
//!
//! ```text
//! https://<ns>
//! https://<ns>/attr/<attr>
//! https://<ns>/attr/<attr>/value/<val>
//! ```
//!
//! Resource mapping groups have their own `https://<ns>/resm/<name>` form,
//! parsed by [`GroupFqn`]. It is never written to the FQN index.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

const SCHEME: &str = "https://";
const ATTR_SEGMENT: &str = "/attr/";
const VALUE_SEGMENT: &str = "/value/";
const GROUP_SEGMENT: &str = "/resm/";

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

pub fn namespace_fqn(namespace: &str) -> String { format!("{SCHEME}{namespace}") }

pub fn attribute_fqn(namespace: &str, attribute: &str) -> String {
  format!("{SCHEME}{namespace}{ATTR_SEGMENT}{attribute}")
}

pub fn value_fqn(namespace: &str, attribute: &str, value: &str) -> String {
  format!("{SCHEME}{namespace}{ATTR_SEGMENT}{attribute}{VALUE_SEGMENT}{value}")
}

/// A parsed FQN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fqn {
  Namespace { namespace: String },
  Attribute { namespace: String, attribute: String },
  Value { namespace: String, attribute: String, value: String },
}

impl Fqn {
  pub fn namespace(&self) -> &str {
    match self {
      Self::Namespace { namespace }
      | Self::Attribute { namespace, .. }
      | Self::Value { namespace, .. } => namespace,
    }
  }

  pub fn attribute(&self) -> Option<&str> {
    match self {
      Self::Namespace { .. } => None,
      Self::Attribute { attribute, .. } | Self::Value { attribute, .. } => {
        Some(attribute)
      }
    }
  }

  pub fn value(&self) -> Option<&str> {
    match self {
      Self::Value { value, .. } => Some(value),
      _ => None,
    }
  }

  /// The FQN of the attribute this name belongs to, if any.
  pub fn attribute_fqn(&self) -> Option<String> {
    self.attribute().map(|a| attribute_fqn(self.namespace(), a))
  }
}

impl fmt::Display for Fqn {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Namespace { namespace } => f.write_str(&namespace_fqn(namespace)),
      Self::Attribute { namespace, attribute } => {
        f.write_str(&attribute_fqn(namespace, attribute))
      }
      Self::Value { namespace, attribute, value } => {
        f.write_str(&value_fqn(namespace, attribute, value))
      }
    }
  }
}

impl FromStr for Fqn {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::Validation(format!("malformed FQN {s:?}"));

    let rest = s.strip_prefix(SCHEME).ok_or_else(invalid)?;
    let (namespace, rest) = match rest.find('/') {
      Some(i) => (&rest[..i], Some(&rest[i..])),
      None => (rest, None),
    };
    if namespace.is_empty() {
      return Err(invalid());
    }
    let Some(rest) = rest else {
      return Ok(Self::Namespace { namespace: namespace.to_owned() });
    };

    let rest = rest.strip_prefix(ATTR_SEGMENT).ok_or_else(invalid)?;
    let (attribute, rest) = match rest.find('/') {
      Some(i) => (&rest[..i], Some(&rest[i..])),
      None => (rest, None),
    };
    if attribute.is_empty() {
      return Err(invalid());
    }
    let Some(rest) = rest else {
      return Ok(Self::Attribute {
        namespace: namespace.to_owned(),
        attribute: attribute.to_owned(),
      });
    };

    let value = rest.strip_prefix(VALUE_SEGMENT).ok_or_else(invalid)?;
    if value.is_empty() || value.contains('/') {
      return Err(invalid());
    }
    Ok(Self::Value {
      namespace: namespace.to_owned(),
      attribute: attribute.to_owned(),
      value:     value.to_owned(),
    })
  }
}

/// A parsed resource mapping group FQN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupFqn {
  pub namespace: String,
  pub name:      String,
}

impl fmt::Display for GroupFqn {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{SCHEME}{}{GROUP_SEGMENT}{}", self.namespace, self.name)
  }
}

impl FromStr for GroupFqn {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || {
      Error::Validation(format!(
        "{s:?} is not of the form https://<namespace>/resm/<name>"
      ))
    };
    let (namespace, name) = s
      .strip_prefix(SCHEME)
      .and_then(|rest| rest.split_once(GROUP_SEGMENT))
      .ok_or_else(invalid)?;
    if namespace.is_empty()
      || namespace.contains('/')
      || name.is_empty()
      || name.contains('/')
    {
      return Err(invalid());
    }
    Ok(Self { namespace: namespace.to_owned(), name: name.to_owned() })
  }
}

/// Identifies the entity an FQN row belongs to.
///
/// The most specific id present decides the shape of the row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FqnTarget {
  pub namespace_id: Option<Uuid>,
  pub attribute_id: Option<Uuid>,
  pub value_id:     Option<Uuid>,
}

impl FqnTarget {
  pub fn namespace(id: Uuid) -> Self {
    Self { namespace_id: Some(id), ..Self::default() }
  }

  pub fn attribute(id: Uuid) -> Self {
    Self { attribute_id: Some(id), ..Self::default() }
  }

  pub fn value(id: Uuid) -> Self {
    Self { value_id: Some(id), ..Self::default() }
  }
}

/// One `(id, fqn)` pair written by a reindex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedFqn {
  pub id:  Uuid,
  pub fqn: String,
}

/// The result of rebuilding the FQN index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexReport {
  pub namespaces: Vec<IndexedFqn>,
  pub attributes: Vec<IndexedFqn>,
  pub values:     Vec<IndexedFqn>,
}

// ─── Name rules ──────────────────────────────────────────────────────────────

/// Validate a namespace name as a DNS-style hostname and return its
/// lowercased form.
pub fn normalize_namespace_name(raw: &str) -> Result<String> {
  let name = raw.trim().to_ascii_lowercase();
  let reject =
    |why: &str| Err(Error::Validation(format!("namespace {raw:?}: {why}")));

  if name.is_empty() {
    return reject("name is required");
  }
  if name.len() > MAX_NAME_LEN {
    return reject("name is too long");
  }
  let labels: Vec<&str> = name.split('.').collect();
  if labels.len() < 2 {
    return reject("name must contain at least two labels");
  }
  for label in labels {
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
      return reject("label length must be between 1 and 63");
    }
    if label.starts_with('-') || label.ends_with('-') {
      return reject("label may not start or end with '-'");
    }
    if !label
      .bytes()
      .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
      return reject("label may only contain letters, digits and '-'");
    }
  }
  Ok(name)
}

/// Validate an attribute name or a value string.
pub fn validate_segment(kind: &str, raw: &str) -> Result<()> {
  if raw.is_empty() {
    return Err(Error::Validation(format!("{kind} is required")));
  }
  if raw.len() > MAX_NAME_LEN {
    return Err(Error::Validation(format!("{kind} {raw:?} is too long")));
  }
  if raw.contains('/') {
    return Err(Error::Validation(format!("{kind} {raw:?} may not contain '/'")));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn formats_all_three_shapes() {
    assert_eq!(namespace_fqn("example.com"), "https://example.com");
    assert_eq!(
      attribute_fqn("example.com", "clearance"),
      "https://example.com/attr/clearance"
    );
    assert_eq!(
      value_fqn("example.com", "clearance", "secret"),
      "https://example.com/attr/clearance/value/secret"
    );
  }

  #[test]
  fn parses_value_shape() {
    let fqn: Fqn = "https://example.com/attr/clearance/value/secret"
      .parse()
      .unwrap();
    assert_eq!(fqn.namespace(), "example.com");
    assert_eq!(fqn.attribute(), Some("clearance"));
    assert_eq!(fqn.value(), Some("secret"));
    assert_eq!(
      fqn.attribute_fqn().as_deref(),
      Some("https://example.com/attr/clearance")
    );
  }

  #[test]
  fn parse_then_display_is_identity() {
    for raw in [
      "https://a.io",
      "https://a.io/attr/level",
      "https://a.io/attr/level/value/High",
    ] {
      assert_eq!(raw.parse::<Fqn>().unwrap().to_string(), raw);
    }
  }

  #[test]
  fn rejects_malformed_names() {
    for raw in [
      "",
      "http://a.io",
      "https://",
      "https:///attr/x",
      "https://a.io/",
      "https://a.io/attr/",
      "https://a.io/attrs/x",
      "https://a.io/attr/x/",
      "https://a.io/attr/x/value/",
      "https://a.io/attr/x/val/y",
      "https://a.io/attr/x/value/y/z",
    ] {
      assert!(raw.parse::<Fqn>().is_err(), "{raw:?} should not parse");
    }
  }

  #[test]
  fn group_fqns_parse() {
    let fqn: GroupFqn = "https://example.com/resm/NATO".parse().unwrap();
    assert_eq!(fqn.namespace, "example.com");
    assert_eq!(fqn.name, "NATO");
    assert_eq!(fqn.to_string(), "https://example.com/resm/NATO");

    for bad in [
      "https://example.com",
      "https://example.com/resm/",
      "https:///resm/x",
      "https://example.com/attr/x",
      "http://example.com/resm/x",
      "https://example.com/resm/x/y",
    ] {
      assert!(bad.parse::<GroupFqn>().is_err(), "{bad:?} should not parse");
    }
  }

  #[test]
  fn namespace_names_are_lowercased() {
    assert_eq!(normalize_namespace_name("Example.COM").unwrap(), "example.com");
  }

  #[test]
  fn namespace_names_must_be_hostnames() {
    for bad in ["", "localhost", "-a.io", "a-.io", "a..io", "a_b.io", "a b.io"] {
      assert!(normalize_namespace_name(bad).is_err(), "{bad:?} accepted");
    }
    let long_label = format!("{}.io", "a".repeat(64));
    assert!(normalize_namespace_name(&long_label).is_err());
    assert!(normalize_namespace_name("x-1.example.io").is_ok());
  }

  #[test]
  fn segments_may_not_contain_slashes() {
    assert!(validate_segment("attribute name", "a/b").is_err());
    assert!(validate_segment("attribute name", "").is_err());
    assert!(validate_segment("value", "Top Secret").is_ok());
  }
}
