//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`
//! (so they sort lexically), UUIDs as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use defect_core::{
  record::{Complaint, Recall},
  vehicle::Vehicle,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

// ─── Counts ──────────────────────────────────────────────────────────────────

/// SQLite aggregates come back as `i64`; clamp negatives (never expected) to 0.
pub fn count(n: i64) -> u64 { u64::try_from(n).unwrap_or(0) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawVehicle::from_row`]; table alias `v`.
pub const VEHICLE_COLUMNS: &str =
  "v.vehicle_id, v.make, v.model, v.year, v.created_at";

/// Raw values read directly from a `vehicles` row.
pub struct RawVehicle {
  pub vehicle_id: String,
  pub make:       String,
  pub model:      String,
  pub year:       i32,
  pub created_at: String,
}

impl RawVehicle {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      vehicle_id: row.get(0)?,
      make:       row.get(1)?,
      model:      row.get(2)?,
      year:       row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_vehicle(self) -> Result<Vehicle> {
    Ok(Vehicle {
      vehicle_id: decode_uuid(&self.vehicle_id)?,
      make:       self.make,
      model:      self.model,
      year:       self.year,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`RawComplaint::from_row`]; table alias `c`.
pub const COMPLAINT_COLUMNS: &str = "c.odi_number, c.vehicle_id, c.manufacturer,
  c.component, c.summary, c.incident_date, c.filed_date, c.crash, c.fire,
  c.injuries, c.deaths, c.vin, c.products_json, c.ingested_at";

/// Raw values read directly from a `complaints` row.
pub struct RawComplaint {
  pub odi_number:    String,
  pub vehicle_id:    String,
  pub manufacturer:  Option<String>,
  pub component:     Option<String>,
  pub summary:       Option<String>,
  pub incident_date: Option<String>,
  pub filed_date:    Option<String>,
  pub crash:         bool,
  pub fire:          bool,
  pub injuries:      u32,
  pub deaths:        u32,
  pub vin:           Option<String>,
  pub products_json: Option<String>,
  pub ingested_at:   String,
}

impl RawComplaint {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      odi_number:    row.get(0)?,
      vehicle_id:    row.get(1)?,
      manufacturer:  row.get(2)?,
      component:     row.get(3)?,
      summary:       row.get(4)?,
      incident_date: row.get(5)?,
      filed_date:    row.get(6)?,
      crash:         row.get(7)?,
      fire:          row.get(8)?,
      injuries:      row.get(9)?,
      deaths:        row.get(10)?,
      vin:           row.get(11)?,
      products_json: row.get(12)?,
      ingested_at:   row.get(13)?,
    })
  }

  pub fn into_complaint(self) -> Result<Complaint> {
    Ok(Complaint {
      odi_number:    self.odi_number,
      vehicle_id:    decode_uuid(&self.vehicle_id)?,
      manufacturer:  self.manufacturer,
      component:     self.component,
      summary:       self.summary,
      incident_date: decode_opt_date(self.incident_date)?,
      filed_date:    decode_opt_date(self.filed_date)?,
      crash:         self.crash,
      fire:          self.fire,
      injuries:      self.injuries,
      deaths:        self.deaths,
      vin:           self.vin,
      products_json: self.products_json,
      ingested_at:   decode_dt(&self.ingested_at)?,
    })
  }
}

/// Column list matching [`RawRecall::from_row`]; table alias `r`.
pub const RECALL_COLUMNS: &str = "r.campaign_number, r.vehicle_id,
  r.recall_number, r.component, r.summary, r.consequence, r.remedy, r.notes,
  r.report_date, r.ingested_at";

/// Raw values read directly from a `recalls` row.
pub struct RawRecall {
  pub campaign_number: String,
  pub vehicle_id:      String,
  pub recall_number:   Option<String>,
  pub component:       Option<String>,
  pub summary:         Option<String>,
  pub consequence:     Option<String>,
  pub remedy:          Option<String>,
  pub notes:           Option<String>,
  pub report_date:     Option<String>,
  pub ingested_at:     String,
}

impl RawRecall {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      campaign_number: row.get(0)?,
      vehicle_id:      row.get(1)?,
      recall_number:   row.get(2)?,
      component:       row.get(3)?,
      summary:         row.get(4)?,
      consequence:     row.get(5)?,
      remedy:          row.get(6)?,
      notes:           row.get(7)?,
      report_date:     row.get(8)?,
      ingested_at:     row.get(9)?,
    })
  }

  pub fn into_recall(self) -> Result<Recall> {
    Ok(Recall {
      campaign_number: self.campaign_number,
      vehicle_id:      decode_uuid(&self.vehicle_id)?,
      recall_number:   self.recall_number,
      component:       self.component,
      summary:         self.summary,
      consequence:     self.consequence,
      remedy:          self.remedy,
      notes:           self.notes,
      report_date:     decode_opt_date(self.report_date)?,
      ingested_at:     decode_dt(&self.ingested_at)?,
    })
  }
}
