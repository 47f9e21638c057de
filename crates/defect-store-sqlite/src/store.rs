//! [`SqliteStore`], the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::Utc;
use defect_core::{
  record::{Complaint, NewComplaint, NewRecall, Recall},
  store::{InsertOutcome, RecordStore},
  vehicle::{ModelYear, Vehicle, VehicleId, VehicleIdentity},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    COMPLAINT_COLUMNS, RECALL_COLUMNS, RawComplaint, RawRecall, RawVehicle,
    VEHICLE_COLUMNS, count, encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A defect record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Count a vehicle's linked rows in one of the link tables.
  async fn linked_count(&self, table: &'static str, vehicle_id: VehicleId) -> Result<u64> {
    let id_str = encode_uuid(vehicle_id);
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT COUNT(*) FROM {table} WHERE vehicle_id = ?1"),
          rusqlite::params![id_str],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count(n))
  }
}

/// Classify one record's pair of insert results.
fn tally(outcome: &mut InsertOutcome, inserted: usize, linked: usize) {
  match (inserted, linked) {
    (0, 0) => outcome.duplicates += 1,
    (0, _) => outcome.linked += 1,
    _ => outcome.inserted += 1,
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = crate::Error;

  // ── Vehicles ──────────────────────────────────────────────────────────────

  async fn upsert_vehicle(&self, identity: VehicleIdentity) -> Result<Vehicle> {
    let VehicleIdentity { model_year, vin } = identity;
    let ModelYear { make, model, year } = model_year;
    let new_id = encode_uuid(Uuid::new_v4());
    let now = encode_dt(Utc::now());

    let raw: RawVehicle = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Some(vin) = &vin {
          let known = tx
            .query_row(
              &format!(
                "SELECT {VEHICLE_COLUMNS} FROM vehicles v
                 JOIN vehicle_vins vv ON vv.vehicle_id = v.vehicle_id
                 WHERE vv.vin = ?1"
              ),
              rusqlite::params![vin],
              RawVehicle::from_row,
            )
            .optional()?;
          if let Some(raw) = known {
            return Ok(raw);
          }
        }

        tx.execute(
          "INSERT INTO vehicles (vehicle_id, make, model, year, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (make, model, year) DO NOTHING",
          rusqlite::params![new_id, make, model, year, now],
        )?;

        let raw = tx.query_row(
          &format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles v
             WHERE v.make = ?1 AND v.model = ?2 AND v.year = ?3"
          ),
          rusqlite::params![make, model, year],
          RawVehicle::from_row,
        )?;

        if let Some(vin) = &vin {
          tx.execute(
            "INSERT INTO vehicle_vins (vin, vehicle_id, recorded_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (vin) DO NOTHING",
            rusqlite::params![vin, raw.vehicle_id, now],
          )?;
        }

        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_vehicle()
  }

  async fn get_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawVehicle> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {VEHICLE_COLUMNS} FROM vehicles v WHERE v.vehicle_id = ?1"),
              rusqlite::params![id_str],
              RawVehicle::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVehicle::into_vehicle).transpose()
  }

  async fn find_vehicle(&self, make: &str, model: &str, year: i32) -> Result<Option<Vehicle>> {
    // Input that could never have been stored matches nothing.
    let Ok(ModelYear { make, model, year }) = ModelYear::new(make, model, year) else {
      return Ok(None);
    };

    let raw: Option<RawVehicle> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {VEHICLE_COLUMNS} FROM vehicles v
                 WHERE v.make = ?1 AND v.model = ?2 AND v.year = ?3"
              ),
              rusqlite::params![make, model, year],
              RawVehicle::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVehicle::into_vehicle).transpose()
  }

  async fn find_vehicle_by_vin(&self, vin: &str) -> Result<Option<Vehicle>> {
    let vin = vin.trim().to_uppercase();

    let raw: Option<RawVehicle> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {VEHICLE_COLUMNS} FROM vehicles v
                 JOIN vehicle_vins vv ON vv.vehicle_id = v.vehicle_id
                 WHERE vv.vin = ?1"
              ),
              rusqlite::params![vin],
              RawVehicle::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVehicle::into_vehicle).transpose()
  }

  async fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
    let raws: Vec<RawVehicle> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {VEHICLE_COLUMNS} FROM vehicles v
           ORDER BY v.make, v.model, v.year"
        ))?;
        let rows = stmt
          .query_map([], RawVehicle::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVehicle::into_vehicle).collect()
  }

  // ── Records: insert-if-absent ────────────────────────────────────────────

  async fn insert_complaints_if_absent(
    &self,
    vehicle_id: VehicleId,
    records:    Vec<NewComplaint>,
  ) -> Result<InsertOutcome> {
    let owner = encode_uuid(vehicle_id);
    let now = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let mut outcome = InsertOutcome::default();

        // One transaction per record: an abandoned batch leaves every
        // committed record complete.
        for c in records {
          let summary_folded = c.summary.as_deref().map(str::to_lowercase);
          let incident_date = c.incident_date.map(encode_date);
          let filed_date = c.filed_date.map(encode_date);

          let tx = conn.transaction()?;
          let inserted = tx.execute(
            "INSERT INTO complaints (
               odi_number, vehicle_id, manufacturer, component, summary,
               summary_folded, incident_date, filed_date, crash, fire,
               injuries, deaths, vin, products_json, ingested_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT (odi_number) DO NOTHING",
            rusqlite::params![
              c.odi_number,
              owner,
              c.manufacturer,
              c.component,
              c.summary,
              summary_folded,
              incident_date,
              filed_date,
              c.crash,
              c.fire,
              c.injuries,
              c.deaths,
              c.vin,
              c.products_json,
              now,
            ],
          )?;
          let linked = tx.execute(
            "INSERT INTO vehicle_complaints (vehicle_id, odi_number)
             VALUES (?1, ?2)
             ON CONFLICT DO NOTHING",
            rusqlite::params![owner, c.odi_number],
          )?;
          tx.commit()?;

          tally(&mut outcome, inserted, linked);
        }

        Ok(outcome)
      })
      .await?;

    tracing::debug!(
      %vehicle_id,
      inserted = outcome.inserted,
      linked = outcome.linked,
      duplicates = outcome.duplicates,
      "stored complaints"
    );
    Ok(outcome)
  }

  async fn insert_recalls_if_absent(
    &self,
    vehicle_id: VehicleId,
    records:    Vec<NewRecall>,
  ) -> Result<InsertOutcome> {
    let owner = encode_uuid(vehicle_id);
    let now = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let mut outcome = InsertOutcome::default();

        for r in records {
          let report_date = r.report_date.map(encode_date);

          let tx = conn.transaction()?;
          let inserted = tx.execute(
            "INSERT INTO recalls (
               campaign_number, vehicle_id, recall_number, component, summary,
               consequence, remedy, notes, report_date, ingested_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (campaign_number) DO NOTHING",
            rusqlite::params![
              r.campaign_number,
              owner,
              r.recall_number,
              r.component,
              r.summary,
              r.consequence,
              r.remedy,
              r.notes,
              report_date,
              now,
            ],
          )?;
          let linked = tx.execute(
            "INSERT INTO vehicle_recalls (vehicle_id, campaign_number)
             VALUES (?1, ?2)
             ON CONFLICT DO NOTHING",
            rusqlite::params![owner, r.campaign_number],
          )?;
          tx.commit()?;

          tally(&mut outcome, inserted, linked);
        }

        Ok(outcome)
      })
      .await?;

    tracing::debug!(
      %vehicle_id,
      inserted = outcome.inserted,
      linked = outcome.linked,
      duplicates = outcome.duplicates,
      "stored recalls"
    );
    Ok(outcome)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn complaints_for(&self, vehicle_id: VehicleId) -> Result<Vec<Complaint>> {
    let id_str = encode_uuid(vehicle_id);

    let raws: Vec<RawComplaint> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COMPLAINT_COLUMNS} FROM complaints c
           JOIN vehicle_complaints vc ON vc.odi_number = c.odi_number
           WHERE vc.vehicle_id = ?1
           ORDER BY c.filed_date DESC NULLS LAST, c.odi_number ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawComplaint::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComplaint::into_complaint).collect()
  }

  async fn recalls_for(&self, vehicle_id: VehicleId) -> Result<Vec<Recall>> {
    let id_str = encode_uuid(vehicle_id);

    let raws: Vec<RawRecall> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECALL_COLUMNS} FROM recalls r
           JOIN vehicle_recalls vr ON vr.campaign_number = r.campaign_number
           WHERE vr.vehicle_id = ?1
           ORDER BY r.report_date DESC NULLS LAST, r.campaign_number ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawRecall::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecall::into_recall).collect()
  }

  async fn complaint_count(&self, vehicle_id: VehicleId) -> Result<u64> {
    self.linked_count("vehicle_complaints", vehicle_id).await
  }

  async fn recall_count(&self, vehicle_id: VehicleId) -> Result<u64> {
    self.linked_count("vehicle_recalls", vehicle_id).await
  }
}
