//! Mapping provider JSON onto [`NewComplaint`] and [`NewRecall`].
//!
//! Each record is deserialised into a typed raw shape first. The provider is
//! inconsistent about field types (numbers vs strings, `"Y"`/`"N"` vs
//! booleans, one component vs a list), so those fields go through small
//! untagged enums. A record that fails any step is reported as a
//! [`NormalizeError`] and skipped by the caller; the rest of the batch
//! carries on.
//!
//! Dates in formats we don't recognise, or outside 1900 to a year from
//! now, become `None` rather than failing the record.

use chrono::{DateTime, Datelike as _, NaiveDate, NaiveDateTime, Utc};
use defect_core::record::{NewComplaint, NewRecall};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
  #[error("unexpected record shape: {0}")]
  Shape(#[from] serde_json::Error),

  #[error("record has no {0}")]
  MissingId(&'static str),

  #[error("invalid {field}: {value}")]
  InvalidValue { field: &'static str, value: String },
}

type Result<T, E = NormalizeError> = std::result::Result<T, E>;

// ─── Loosely-typed fields ────────────────────────────────────────────────────

/// A record identifier sent as either a number or a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Identifier {
  Number(serde_json::Number),
  Text(String),
}

impl Identifier {
  fn into_text(self) -> Option<String> {
    let text = match self {
      Self::Number(n) => n.to_string(),
      Self::Text(s) => s.trim().to_owned(),
    };
    (!text.is_empty()).then_some(text)
  }
}

/// A yes/no indicator.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
  Bool(bool),
  Number(i64),
  Text(String),
}

impl Flag {
  fn into_bool(self, field: &'static str) -> Result<bool> {
    match self {
      Self::Bool(b) => Ok(b),
      Self::Number(n) => Ok(n != 0),
      Self::Text(s) => match s.trim().to_ascii_uppercase().as_str() {
        "Y" | "YES" | "TRUE" | "1" => Ok(true),
        "" | "N" | "NO" | "FALSE" | "0" => Ok(false),
        _ => Err(NormalizeError::InvalidValue { field, value: s }),
      },
    }
  }
}

/// A non-negative count.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
  Number(i64),
  Text(String),
}

impl Count {
  fn into_u32(self, field: &'static str) -> Result<u32> {
    let invalid = |value: String| NormalizeError::InvalidValue { field, value };
    match self {
      Self::Number(n) => u32::try_from(n).map_err(|_| invalid(n.to_string())),
      Self::Text(s) if s.trim().is_empty() => Ok(0),
      Self::Text(s) => s.trim().parse().map_err(|_| invalid(s)),
    }
  }
}

/// `components` arrives as a comma-joined string or as a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Components {
  One(String),
  Many(Vec<Option<String>>),
}

impl Components {
  fn into_label(self) -> Option<String> {
    match self {
      Self::One(s) => component_label([s.as_str()]),
      Self::Many(list) => component_label(list.iter().flatten().map(String::as_str)),
    }
  }
}

/// Canonical grouping label: split on commas, trim, collapse whitespace,
/// upper-case, sort, de-duplicate, re-join with `", "`.
pub fn component_label<'a>(parts: impl IntoIterator<Item = &'a str>) -> Option<String> {
  let mut names: Vec<String> = parts
    .into_iter()
    .flat_map(|p| p.split(','))
    .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase())
    .filter(|p| !p.is_empty())
    .collect();
  names.sort();
  names.dedup();

  (!names.is_empty()).then(|| names.join(", "))
}

fn text(s: Option<String>) -> Option<String> {
  s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

// ─── Dates ───────────────────────────────────────────────────────────────────

const COMPLAINT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// The recall feed writes `ReportReceivedDate` day-first.
const RECALL_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

const EARLIEST_YEAR: i32 = 1900;

/// Provider dates must fall between 1900 and the end of next year.
fn plausible(date: NaiveDate, today: NaiveDate) -> bool {
  date.year() >= EARLIEST_YEAR && date.year() <= today.year() + 1
}

fn parse_date(raw: Option<&str>, formats: &[&str]) -> Option<NaiveDate> {
  parse_date_as_of(raw, formats, Utc::now().date_naive())
}

fn parse_date_as_of(raw: Option<&str>, formats: &[&str], today: NaiveDate) -> Option<NaiveDate> {
  let s = raw?.trim();
  if s.is_empty() {
    return None;
  }

  formats
    .iter()
    .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    .or_else(|| {
      DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(|dt| dt.date())
    })
    .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
    .filter(|d| plausible(*d, today))
}

// ─── Complaints ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComplaint {
  odi_number:            Option<Identifier>,
  manufacturer:          Option<String>,
  crash:                 Option<Flag>,
  fire:                  Option<Flag>,
  number_of_injuries:    Option<Count>,
  number_of_deaths:      Option<Count>,
  date_of_incident:      Option<String>,
  date_complaint_filed:  Option<String>,
  vin:                   Option<String>,
  components:            Option<Components>,
  summary:               Option<String>,
  products:              Option<Value>,
}

/// Normalise one element of the complaints feed's `results` array.
pub fn normalize_complaint(raw: Value) -> Result<NewComplaint> {
  let raw: RawComplaint = serde_json::from_value(raw)?;

  let odi_number = raw
    .odi_number
    .and_then(Identifier::into_text)
    .ok_or(NormalizeError::MissingId("odiNumber"))?;

  let flag = |f: Option<Flag>, name| f.map_or(Ok(false), |f| f.into_bool(name));
  let number = |c: Option<Count>, name| c.map_or(Ok(0), |c| c.into_u32(name));

  Ok(NewComplaint {
    odi_number,
    manufacturer: text(raw.manufacturer),
    component: raw.components.and_then(Components::into_label),
    summary: text(raw.summary),
    incident_date: parse_date(raw.date_of_incident.as_deref(), COMPLAINT_DATE_FORMATS),
    filed_date: parse_date(raw.date_complaint_filed.as_deref(), COMPLAINT_DATE_FORMATS),
    crash: flag(raw.crash, "crash")?,
    fire: flag(raw.fire, "fire")?,
    injuries: number(raw.number_of_injuries, "numberOfInjuries")?,
    deaths: number(raw.number_of_deaths, "numberOfDeaths")?,
    vin: text(raw.vin),
    products_json: raw.products.and_then(|p| match p {
      Value::Null => None,
      Value::String(s) => text(Some(s)),
      other => Some(other.to_string()),
    }),
  })
}

// ─── Recalls ─────────────────────────────────────────────────────────────────

/// The recall feed mixes PascalCase and camelCase keys, and spells
/// "consequence" two ways.
#[derive(Debug, Deserialize)]
struct RawRecall {
  #[serde(rename = "NHTSACampaignNumber", alias = "nhtsaCampaignNumber")]
  nhtsa_campaign_number: Option<Identifier>,
  #[serde(rename = "campaignNumber")]
  campaign_number:       Option<Identifier>,

  #[serde(rename = "RecallNumber", alias = "recallNumber")]
  recall_number:              Option<String>,
  #[serde(rename = "ManufacturerRecallNumber", alias = "manufacturerRecallNumber")]
  manufacturer_recall_number: Option<String>,

  #[serde(rename = "ReportReceivedDate", alias = "reportReceivedDate")]
  report_received_date: Option<String>,
  #[serde(rename = "Component", alias = "component")]
  component:            Option<String>,
  #[serde(rename = "Summary", alias = "summary")]
  summary:              Option<String>,
  #[serde(rename = "Conequence")]
  conequence:           Option<String>,
  #[serde(rename = "Consequence", alias = "consequence")]
  consequence:          Option<String>,
  #[serde(rename = "Remedy", alias = "remedy")]
  remedy:               Option<String>,
  #[serde(rename = "Notes", alias = "notes")]
  notes:                Option<String>,
}

/// Normalise one element of the recalls feed's `results` array.
pub fn normalize_recall(raw: Value) -> Result<NewRecall> {
  let raw: RawRecall = serde_json::from_value(raw)?;

  let campaign_number = raw
    .nhtsa_campaign_number
    .and_then(Identifier::into_text)
    .or_else(|| raw.campaign_number.and_then(Identifier::into_text))
    .ok_or(NormalizeError::MissingId("NHTSACampaignNumber"))?;

  Ok(NewRecall {
    campaign_number,
    recall_number: text(raw.recall_number).or_else(|| text(raw.manufacturer_recall_number)),
    component: raw.component.as_deref().and_then(|c| component_label([c])),
    summary: text(raw.summary),
    consequence: text(raw.conequence).or_else(|| text(raw.consequence)),
    remedy: text(raw.remedy),
    notes: text(raw.notes),
    report_date: parse_date(raw.report_received_date.as_deref(), RECALL_DATE_FORMATS),
  })
}
