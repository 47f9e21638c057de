//! Complaint and recall records.
//!
//! Records are immutable once stored. The `New*` types are what the
//! normalisation step produces; the plain types are what the store hands
//! back, carrying the vehicle that first ingested them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::vehicle::VehicleId;

/// Label used for complaints and recalls that name no component.
pub const UNKNOWN_COMPONENT: &str = "(unknown)";

// ─── Complaints ──────────────────────────────────────────────────────────────

/// A normalised consumer complaint, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComplaint {
  /// NHTSA ODI number; unique across the store.
  pub odi_number:    String,
  pub manufacturer:  Option<String>,
  /// Canonical component label, e.g. `"ELECTRICAL SYSTEM, ENGINE"`.
  pub component:     Option<String>,
  pub summary:       Option<String>,
  pub incident_date: Option<NaiveDate>,
  pub filed_date:    Option<NaiveDate>,
  pub crash:         bool,
  pub fire:          bool,
  pub injuries:      u32,
  pub deaths:        u32,
  /// Partial VIN as reported with the complaint.
  pub vin:           Option<String>,
  /// Provider `products` payload, kept verbatim as JSON text.
  pub products_json: Option<String>,
}

impl NewComplaint {
  /// A complaint with only its identifier set; everything else empty.
  pub fn bare(odi_number: impl Into<String>) -> Self {
    Self {
      odi_number:    odi_number.into(),
      manufacturer:  None,
      component:     None,
      summary:       None,
      incident_date: None,
      filed_date:    None,
      crash:         false,
      fire:          false,
      injuries:      0,
      deaths:        0,
      vin:           None,
      products_json: None,
    }
  }
}

/// A stored complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
  pub odi_number:    String,
  /// The vehicle whose ingestion first stored this complaint.
  pub vehicle_id:    VehicleId,
  pub manufacturer:  Option<String>,
  pub component:     Option<String>,
  pub summary:       Option<String>,
  pub incident_date: Option<NaiveDate>,
  pub filed_date:    Option<NaiveDate>,
  pub crash:         bool,
  pub fire:          bool,
  pub injuries:      u32,
  pub deaths:        u32,
  pub vin:           Option<String>,
  pub products_json: Option<String>,
  pub ingested_at:   DateTime<Utc>,
}

// ─── Recalls ─────────────────────────────────────────────────────────────────

/// A normalised recall campaign, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecall {
  /// NHTSA campaign number; unique across the store.
  pub campaign_number: String,
  /// Manufacturer's own recall number, when reported.
  pub recall_number:   Option<String>,
  pub component:       Option<String>,
  pub summary:         Option<String>,
  pub consequence:     Option<String>,
  pub remedy:          Option<String>,
  pub notes:           Option<String>,
  pub report_date:     Option<NaiveDate>,
}

impl NewRecall {
  pub fn bare(campaign_number: impl Into<String>) -> Self {
    Self {
      campaign_number: campaign_number.into(),
      recall_number:   None,
      component:       None,
      summary:         None,
      consequence:     None,
      remedy:          None,
      notes:           None,
      report_date:     None,
    }
  }
}

/// A stored recall campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recall {
  pub campaign_number: String,
  pub vehicle_id:      VehicleId,
  pub recall_number:   Option<String>,
  pub component:       Option<String>,
  pub summary:         Option<String>,
  pub consequence:     Option<String>,
  pub remedy:          Option<String>,
  pub notes:           Option<String>,
  pub report_date:     Option<NaiveDate>,
  pub ingested_at:     DateTime<Utc>,
}
