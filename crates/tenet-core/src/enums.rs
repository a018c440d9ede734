//! Wire enumerations and the shared prefix-stripping convention.
//!
//! Every enum crossing the API has a wire name of the form
//! `<PREFIX><NAME>` (e.g. `ATTRIBUTE_RULE_TYPE_ENUM_ANY_OF`). Columns in the
//! store hold only `<NAME>`. Callers may also address a variant by its
//! numeric tag. Anything outside the known set is rejected with
//! [`Error::EnumInvalid`]; nothing falls through to a default.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString, FromRepr, IntoStaticStr};

use crate::{Error, Result};

/// Behaviour shared by every prefixed wire enum.
pub trait WireEnum:
  Sized + Copy + AsRef<str> + Into<&'static str> + std::str::FromStr
{
  /// Fixed prefix stripped on write and re-added on read.
  const PREFIX: &'static str;
  /// Human-readable name used in error messages.
  const KIND: &'static str;

  fn from_number(n: i32) -> Option<Self>;

  /// The unprefixed name stored in the database.
  fn stored_name(self) -> &'static str { self.into() }

  fn wire_name(self) -> String { format!("{}{}", Self::PREFIX, self.as_ref()) }

  /// Decode a stored (unprefixed) name.
  fn from_stored(s: &str) -> Result<Self> {
    s.parse()
      .map_err(|_| Error::EnumInvalid(format!("{} {s:?}", Self::KIND)))
  }

  /// Decode a wire name; the prefix is optional.
  fn from_wire(s: &str) -> Result<Self> {
    Self::from_stored(s.strip_prefix(Self::PREFIX).unwrap_or(s))
  }
}

/// An enum value as a caller may supply it: numeric tag or name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumInput {
  Number(i32),
  Name(String),
}

impl EnumInput {
  /// Interpret an untyped string such as a query parameter: an integer is a
  /// numeric tag, anything else a name.
  pub fn parse(raw: &str) -> Self {
    raw
      .parse()
      .map_or_else(|_| Self::Name(raw.to_owned()), Self::Number)
  }

  pub fn resolve<E: WireEnum>(&self) -> Result<E> {
    match self {
      Self::Number(n) => E::from_number(*n)
        .ok_or_else(|| Error::EnumInvalid(format!("{} {n}", E::KIND))),
      Self::Name(s) => E::from_wire(s),
    }
  }
}

impl fmt::Display for EnumInput {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Number(n) => write!(f, "{n}"),
      Self::Name(s) => f.write_str(s),
    }
  }
}

impl From<i32> for EnumInput {
  fn from(n: i32) -> Self { Self::Number(n) }
}

impl From<&str> for EnumInput {
  fn from(s: &str) -> Self { Self::Name(s.to_owned()) }
}

/// Resolve an optional enum input, treating absence as the enum default.
pub fn resolve_or_default<E: WireEnum + Default>(
  input: Option<&EnumInput>,
) -> Result<E> {
  input.map_or_else(|| Ok(E::default()), EnumInput::resolve)
}

// ─── Active state filter ─────────────────────────────────────────────────────

/// List filter over the `active` flag.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  IntoStaticStr,
  EnumString,
  FromRepr,
)]
#[repr(i32)]
pub enum ActiveState {
  #[default]
  #[serde(rename = "ACTIVE_STATE_ENUM_UNSPECIFIED")]
  #[strum(serialize = "UNSPECIFIED")]
  Unspecified = 0,
  #[serde(rename = "ACTIVE_STATE_ENUM_ACTIVE")]
  #[strum(serialize = "ACTIVE")]
  Active = 1,
  #[serde(rename = "ACTIVE_STATE_ENUM_INACTIVE")]
  #[strum(serialize = "INACTIVE")]
  Inactive = 2,
  #[serde(rename = "ACTIVE_STATE_ENUM_ANY")]
  #[strum(serialize = "ANY")]
  Any = 3,
}

impl ActiveState {
  /// `Unspecified` is treated as `Active`.
  pub fn effective(self) -> Self {
    match self {
      Self::Unspecified => Self::Active,
      other => other,
    }
  }

  /// Whether a row with the given `active` flag passes this filter.
  pub fn admits(self, active: bool) -> bool {
    match self.effective() {
      Self::Active | Self::Unspecified => active,
      Self::Inactive => !active,
      Self::Any => true,
    }
  }
}

impl WireEnum for ActiveState {
  const KIND: &'static str = "active state";
  const PREFIX: &'static str = "ACTIVE_STATE_ENUM_";

  fn from_number(n: i32) -> Option<Self> { Self::from_repr(n) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ErrorKind;
  use crate::Classify as _;

  #[test]
  fn unspecified_state_means_active() {
    assert_eq!(ActiveState::Unspecified.effective(), ActiveState::Active);
    assert!(ActiveState::Unspecified.admits(true));
    assert!(!ActiveState::Unspecified.admits(false));
  }

  #[test]
  fn any_state_admits_both() {
    assert!(ActiveState::Any.admits(true));
    assert!(ActiveState::Any.admits(false));
  }

  #[test]
  fn stored_and_wire_names_agree() {
    for state in [
      ActiveState::Unspecified,
      ActiveState::Active,
      ActiveState::Inactive,
      ActiveState::Any,
    ] {
      assert_eq!(state.stored_name(), state.as_ref());
      assert_eq!(ActiveState::from_stored(state.stored_name()).unwrap(), state);
      assert_eq!(
        state.wire_name(),
        format!("ACTIVE_STATE_ENUM_{}", state.stored_name())
      );
    }
  }

  #[test]
  fn state_resolves_from_number_and_names() {
    let by_number: ActiveState = EnumInput::from(2).resolve().unwrap();
    assert_eq!(by_number, ActiveState::Inactive);

    let prefixed: ActiveState =
      EnumInput::from("ACTIVE_STATE_ENUM_ANY").resolve().unwrap();
    assert_eq!(prefixed, ActiveState::Any);

    let bare: ActiveState = EnumInput::from("ACTIVE").resolve().unwrap();
    assert_eq!(bare, ActiveState::Active);
  }

  #[test]
  fn parse_splits_numbers_from_names() {
    assert_eq!(EnumInput::parse("3"), EnumInput::Number(3));
    assert_eq!(EnumInput::parse("ANY"), EnumInput::Name("ANY".into()));
  }

  #[test]
  fn unknown_state_is_rejected() {
    let err = EnumInput::from(100).resolve::<ActiveState>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EnumInvalid);

    let err = EnumInput::from("SOMETIMES")
      .resolve::<ActiveState>()
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EnumInvalid);
  }

  #[test]
  fn enum_input_deserializes_number_or_string() {
    let n: EnumInput = serde_json::from_str("3").unwrap();
    assert_eq!(n, EnumInput::Number(3));
    let s: EnumInput = serde_json::from_str("\"ANY\"").unwrap();
    assert_eq!(s, EnumInput::Name("ANY".into()));
  }
}
