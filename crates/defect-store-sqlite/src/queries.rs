//! [`DefectQueries`] for [`SqliteStore`]: read-only aggregation in SQL.
//!
//! Every query scopes through the `vehicle_complaints` / `vehicle_recalls`
//! link tables, so a record shared by several vehicles counts for each.

use defect_core::{
  query::{ComponentCount, DefectQueries, SeveritySummary},
  record::{Complaint, Recall, UNKNOWN_COMPONENT},
  store::RecordStore as _,
  trend::{Bucket, TrendPoint, bucket_counts},
  vehicle::VehicleId,
};

use crate::{
  Result,
  encode::{COMPLAINT_COLUMNS, RawComplaint, count, decode_date, encode_uuid},
  store::SqliteStore,
};

impl DefectQueries for SqliteStore {
  async fn severity_summary(&self, vehicle_id: VehicleId) -> Result<SeveritySummary> {
    let id_str = encode_uuid(vehicle_id);

    let (total, crash, fire, injuries, deaths): (i64, i64, i64, i64, i64) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*),
                  COALESCE(SUM(c.crash), 0),
                  COALESCE(SUM(c.fire), 0),
                  COALESCE(SUM(c.injuries), 0),
                  COALESCE(SUM(c.deaths), 0)
           FROM complaints c
           JOIN vehicle_complaints vc ON vc.odi_number = c.odi_number
           WHERE vc.vehicle_id = ?1",
          rusqlite::params![id_str],
          |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )?)
      })
      .await?;

    Ok(SeveritySummary {
      crash_count:      count(crash),
      fire_count:       count(fire),
      injury_count:     count(injuries),
      death_count:      count(deaths),
      total_complaints: count(total),
    })
  }

  async fn top_components(
    &self,
    vehicle_id: VehicleId,
    limit:      usize,
  ) -> Result<Vec<ComponentCount>> {
    let id_str = encode_uuid(vehicle_id);
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT COALESCE(c.component, ?2) AS label, COUNT(*) AS n
           FROM complaints c
           JOIN vehicle_complaints vc ON vc.odi_number = c.odi_number
           WHERE vc.vehicle_id = ?1
           GROUP BY label
           ORDER BY n DESC, label ASC
           LIMIT ?3",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![id_str, UNKNOWN_COMPONENT, limit_val],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(component_label, n)| ComponentCount {
          component_label,
          complaint_count: count(n),
        })
        .collect(),
    )
  }

  async fn trend_over_time(
    &self,
    vehicle_id: VehicleId,
    bucket:     Bucket,
  ) -> Result<Vec<TrendPoint>> {
    let id_str = encode_uuid(vehicle_id);

    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT COALESCE(c.filed_date, c.incident_date) AS d, COUNT(*)
           FROM complaints c
           JOIN vehicle_complaints vc ON vc.odi_number = c.odi_number
           WHERE vc.vehicle_id = ?1
             AND COALESCE(c.filed_date, c.incident_date) IS NOT NULL
           GROUP BY d",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let dated = rows
      .into_iter()
      .map(|(d, n)| Ok((decode_date(&d)?, count(n))))
      .collect::<Result<Vec<_>>>()?;

    Ok(bucket_counts(bucket, dated))
  }

  async fn search_symptoms(
    &self,
    vehicle_id: VehicleId,
    query:      &str,
    limit:      Option<usize>,
  ) -> Result<Vec<Complaint>> {
    if query.trim().is_empty() {
      return Ok(Vec::new());
    }
    let needle = query.to_lowercase();

    let id_str = encode_uuid(vehicle_id);
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

    let raws: Vec<RawComplaint> = self
      .conn
      .call(move |conn| {
        // instr() rather than LIKE: `%` and `_` in the query stay literal.
        let mut stmt = conn.prepare(&format!(
          "SELECT {COMPLAINT_COLUMNS} FROM complaints c
           JOIN vehicle_complaints vc ON vc.odi_number = c.odi_number
           WHERE vc.vehicle_id = ?1
             AND instr(c.summary_folded, ?2) > 0
           ORDER BY c.filed_date DESC NULLS LAST, c.odi_number ASC
           LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![id_str, needle, limit_val],
            RawComplaint::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComplaint::into_complaint).collect()
  }

  async fn recall_list(&self, vehicle_id: VehicleId) -> Result<Vec<Recall>> {
    self.recalls_for(vehicle_id).await
  }
}
