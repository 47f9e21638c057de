//! Vehicles and the selectors that identify them.
//!
//! A [`Selector`] is what a caller types in: either a VIN or a
//! make/model/year triple. Ingestion resolves it to a [`VehicleIdentity`]
//! (decoding the VIN if necessary) and the store turns that into a persisted
//! [`Vehicle`] row.

use std::{fmt, ops::RangeInclusive};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Primary key of a persisted vehicle.
pub type VehicleId = Uuid;

/// Model years accepted by [`ModelYear::new`].
pub const MODEL_YEARS: RangeInclusive<i32> = 1900..=2100;

/// Length of a modern (post-1981) VIN.
pub const VIN_LENGTH: usize = 17;

// ─── Make / model / year ─────────────────────────────────────────────────────

/// A canonical make/model/year triple.
///
/// Make and model are trimmed, whitespace-collapsed and upper-cased, so
/// `" honda "` and `"HONDA"` name the same vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelYear {
  pub make:  String,
  pub model: String,
  pub year:  i32,
}

impl ModelYear {
  /// Normalise and validate a triple.
  pub fn new(make: &str, model: &str, year: i32) -> Result<Self> {
    let make = canonical_name(make);
    let model = canonical_name(model);

    if make.is_empty() {
      return Err(Error::InvalidSelector("make is blank".into()));
    }
    if model.is_empty() {
      return Err(Error::InvalidSelector("model is blank".into()));
    }
    if !MODEL_YEARS.contains(&year) {
      return Err(Error::InvalidSelector(format!(
        "model year {year} outside {}..={}",
        MODEL_YEARS.start(),
        MODEL_YEARS.end()
      )));
    }

    Ok(Self { make, model, year })
  }
}

impl fmt::Display for ModelYear {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {} {}", self.year, self.make, self.model)
  }
}

fn canonical_name(s: &str) -> String {
  s.split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_uppercase()
}

// ─── Selector ────────────────────────────────────────────────────────────────

/// The caller-supplied vehicle identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
  Vin(String),
  ModelYear(ModelYear),
}

impl Selector {
  /// Build a selector from loosely-typed form/flag input.
  ///
  /// A non-blank VIN wins; otherwise all of make, model and year must be
  /// present. The result still needs [`Selector::normalize`].
  pub fn from_parts(
    vin:   Option<&str>,
    make:  Option<&str>,
    model: Option<&str>,
    year:  Option<i32>,
  ) -> Result<Self> {
    if let Some(vin) = vin.filter(|v| !v.trim().is_empty()) {
      return Ok(Self::Vin(vin.to_owned()));
    }

    match (make, model, year) {
      (Some(make), Some(model), Some(year)) => Ok(Self::ModelYear(ModelYear {
        make: make.to_owned(),
        model: model.to_owned(),
        year,
      })),
      (None, None, None) => Err(Error::InvalidSelector(
        "empty VIN and no make/model/year".into(),
      )),
      _ => Err(Error::InvalidSelector(
        "make, model and year must all be given".into(),
      )),
    }
  }

  /// Canonicalise and validate. No network access happens before this
  /// succeeds.
  pub fn normalize(&self) -> Result<Self> {
    match self {
      Self::Vin(vin) => normalize_vin(vin).map(Self::Vin),
      Self::ModelYear(my) => {
        ModelYear::new(&my.make, &my.model, my.year).map(Self::ModelYear)
      }
    }
  }
}

impl fmt::Display for Selector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Vin(vin) => write!(f, "VIN {vin}"),
      Self::ModelYear(my) => my.fmt(f),
    }
  }
}

/// Trim and upper-case a VIN, rejecting anything that cannot be one.
///
/// VINs are 17 characters from `[A-Z0-9]` excluding `I`, `O` and `Q`.
pub fn normalize_vin(vin: &str) -> Result<String> {
  let vin = vin.trim().to_uppercase();
  if vin.is_empty() {
    return Err(Error::InvalidSelector(
      "empty VIN and no make/model/year".into(),
    ));
  }
  if vin.chars().count() != VIN_LENGTH {
    return Err(Error::InvalidSelector(format!(
      "VIN must be {VIN_LENGTH} characters, got {}",
      vin.chars().count()
    )));
  }
  if let Some(bad) = vin
    .chars()
    .find(|c| !c.is_ascii_alphanumeric() || matches!(c, 'I' | 'O' | 'Q'))
  {
    return Err(Error::InvalidSelector(format!(
      "VIN contains invalid character {bad:?}"
    )));
  }
  Ok(vin)
}

// ─── Identity and persisted row ──────────────────────────────────────────────

/// A resolved selector: the make/model/year the data sources are queried
/// with, plus the VIN it was decoded from (if any).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleIdentity {
  pub model_year: ModelYear,
  pub vin:        Option<String>,
}

/// A persisted vehicle. Never deleted; re-ingestion reuses the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
  pub vehicle_id: VehicleId,
  pub make:       String,
  pub model:      String,
  pub year:       i32,
  pub created_at: DateTime<Utc>,
}

impl Vehicle {
  pub fn model_year(&self) -> ModelYear {
    ModelYear {
      make:  self.make.clone(),
      model: self.model.clone(),
      year:  self.year,
    }
  }
}
