//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use defect_core::{
  query::DefectQueries,
  record::{NewComplaint, NewRecall, UNKNOWN_COMPONENT},
  store::{InsertOutcome, RecordStore},
  trend::{Bucket, Period},
  vehicle::{ModelYear, Vehicle, VehicleIdentity},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn identity(make: &str, model: &str, year: i32, vin: Option<&str>) -> VehicleIdentity {
  VehicleIdentity {
    model_year: ModelYear::new(make, model, year).unwrap(),
    vin:        vin.map(str::to_owned),
  }
}

async fn accord(s: &SqliteStore) -> Vehicle {
  s.upsert_vehicle(identity("HONDA", "ACCORD", 2021, None))
    .await
    .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn complaint(odi: &str, component: Option<&str>, summary: &str) -> NewComplaint {
  NewComplaint {
    component: component.map(str::to_owned),
    summary: Some(summary.to_owned()),
    ..NewComplaint::bare(odi)
  }
}

fn filed(odi: &str, filed_date: NaiveDate) -> NewComplaint {
  NewComplaint {
    filed_date: Some(filed_date),
    ..NewComplaint::bare(odi)
  }
}

// ─── Vehicles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_vehicle_reuses_existing_row() {
  let s = store().await;

  let first = accord(&s).await;
  let second = s
    .upsert_vehicle(identity("honda", " accord ", 2021, None))
    .await
    .unwrap();

  assert_eq!(first.vehicle_id, second.vehicle_id);
  assert_eq!(s.list_vehicles().await.unwrap().len(), 1);
}

#[tokio::test]
async fn get_vehicle_missing_returns_none() {
  let s = store().await;
  assert!(s.get_vehicle(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn find_vehicle_is_case_insensitive() {
  let s = store().await;
  let v = accord(&s).await;

  let found = s.find_vehicle("Honda", "Accord", 2021).await.unwrap();
  assert_eq!(found.map(|f| f.vehicle_id), Some(v.vehicle_id));

  assert!(s.find_vehicle("HONDA", "CIVIC", 2021).await.unwrap().is_none());
  assert!(s.find_vehicle("", "ACCORD", 2021).await.unwrap().is_none());
}

#[tokio::test]
async fn vins_resolve_to_their_model_year_row() {
  let s = store().await;
  let by_model = accord(&s).await;

  let by_vin = s
    .upsert_vehicle(identity("HONDA", "ACCORD", 2021, Some("1HGCV1F34MA012345")))
    .await
    .unwrap();
  let other_vin = s
    .upsert_vehicle(identity("HONDA", "ACCORD", 2021, Some("1HGCV1F30MA099999")))
    .await
    .unwrap();

  assert_eq!(by_vin.vehicle_id, by_model.vehicle_id);
  assert_eq!(other_vin.vehicle_id, by_model.vehicle_id);

  let found = s.find_vehicle_by_vin("1hgcv1f34ma012345").await.unwrap();
  assert_eq!(found.map(|f| f.vehicle_id), Some(by_model.vehicle_id));
  assert_eq!(s.list_vehicles().await.unwrap().len(), 1);
}

#[tokio::test]
async fn known_vin_wins_over_model_year() {
  let s = store().await;
  let first = s
    .upsert_vehicle(identity("HONDA", "ACCORD", 2021, Some("1HGCV1F34MA012345")))
    .await
    .unwrap();

  // Same VIN presented with a different decode: the recorded mapping holds.
  let again = s
    .upsert_vehicle(identity("HONDA", "ACCORD HYBRID", 2021, Some("1HGCV1F34MA012345")))
    .await
    .unwrap();

  assert_eq!(again.vehicle_id, first.vehicle_id);
  assert_eq!(s.list_vehicles().await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_vehicles_is_ordered() {
  let s = store().await;
  s.upsert_vehicle(identity("TOYOTA", "CAMRY", 2020, None)).await.unwrap();
  s.upsert_vehicle(identity("HONDA", "CIVIC", 2019, None)).await.unwrap();
  s.upsert_vehicle(identity("HONDA", "ACCORD", 2021, None)).await.unwrap();

  let names: Vec<_> = s
    .list_vehicles()
    .await
    .unwrap()
    .into_iter()
    .map(|v| v.model)
    .collect();
  assert_eq!(names, vec!["ACCORD", "CIVIC", "CAMRY"]);
}

// ─── Insert-if-absent ────────────────────────────────────────────────────────

#[tokio::test]
async fn complaint_insert_skips_existing_odi_numbers() {
  let s = store().await;
  let v = accord(&s).await;

  let batch = vec![
    complaint("1001", Some("ENGINE"), "stalls"),
    complaint("1002", Some("ENGINE"), "stalls again"),
    complaint("1003", None, "noise"),
  ];

  let first = s
    .insert_complaints_if_absent(v.vehicle_id, batch.clone())
    .await
    .unwrap();
  assert_eq!(first, InsertOutcome { inserted: 3, linked: 0, duplicates: 0 });

  let second = s
    .insert_complaints_if_absent(v.vehicle_id, batch)
    .await
    .unwrap();
  assert_eq!(second, InsertOutcome { inserted: 0, linked: 0, duplicates: 3 });

  assert_eq!(s.complaint_count(v.vehicle_id).await.unwrap(), 3);
}

#[tokio::test]
async fn duplicate_within_one_batch_is_stored_once() {
  let s = store().await;
  let v = accord(&s).await;

  let outcome = s
    .insert_complaints_if_absent(
      v.vehicle_id,
      vec![complaint("1001", None, "a"), complaint("1001", None, "b")],
    )
    .await
    .unwrap();

  assert_eq!(outcome.inserted, 1);
  assert_eq!(outcome.duplicates, 1);

  // First write wins; records are never updated in place.
  let stored = s.complaints_for(v.vehicle_id).await.unwrap();
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].summary.as_deref(), Some("a"));
}

#[tokio::test]
async fn shared_complaint_is_linked_not_duplicated() {
  let s = store().await;
  let accord = accord(&s).await;
  let civic = s
    .upsert_vehicle(identity("HONDA", "CIVIC", 2021, None))
    .await
    .unwrap();

  s.insert_complaints_if_absent(accord.vehicle_id, vec![complaint("1001", None, "x")])
    .await
    .unwrap();
  let outcome = s
    .insert_complaints_if_absent(civic.vehicle_id, vec![complaint("1001", None, "x")])
    .await
    .unwrap();
  assert_eq!(outcome, InsertOutcome { inserted: 0, linked: 1, duplicates: 0 });

  let for_civic = s.complaints_for(civic.vehicle_id).await.unwrap();
  assert_eq!(for_civic.len(), 1);
  // Ownership stays with the first vehicle.
  assert_eq!(for_civic[0].vehicle_id, accord.vehicle_id);
  assert_eq!(s.complaint_count(accord.vehicle_id).await.unwrap(), 1);
}

#[tokio::test]
async fn complaint_fields_roundtrip() {
  let s = store().await;
  let v = accord(&s).await;

  let input = NewComplaint {
    odi_number:    "11400001".into(),
    manufacturer:  Some("Honda (American Honda Motor Co.)".into()),
    component:     Some("ELECTRICAL SYSTEM, ENGINE".into()),
    summary:       Some("Vehicle STALLED on highway".into()),
    incident_date: Some(date(2021, 3, 1)),
    filed_date:    Some(date(2021, 3, 9)),
    crash:         true,
    fire:          false,
    injuries:      2,
    deaths:        0,
    vin:           Some("1HGCV1F3XMA".into()),
    products_json: Some("[{\"type\":\"Vehicle\"}]".into()),
  };
  s.insert_complaints_if_absent(v.vehicle_id, vec![input.clone()])
    .await
    .unwrap();

  let stored = s.complaints_for(v.vehicle_id).await.unwrap();
  assert_eq!(stored.len(), 1);
  let c = &stored[0];
  assert_eq!(c.odi_number, input.odi_number);
  assert_eq!(c.vehicle_id, v.vehicle_id);
  assert_eq!(c.component, input.component);
  assert_eq!(c.summary, input.summary);
  assert_eq!(c.incident_date, input.incident_date);
  assert_eq!(c.filed_date, input.filed_date);
  assert!(c.crash);
  assert_eq!(c.injuries, 2);
  assert_eq!(c.products_json, input.products_json);
}

#[tokio::test]
async fn recall_insert_skips_existing_campaigns() {
  let s = store().await;
  let v = accord(&s).await;

  let batch = vec![NewRecall::bare("21V123000"), NewRecall::bare("22V456000")];
  s.insert_recalls_if_absent(v.vehicle_id, batch.clone())
    .await
    .unwrap();
  let second = s.insert_recalls_if_absent(v.vehicle_id, batch).await.unwrap();

  assert_eq!(second.duplicates, 2);
  assert_eq!(s.recall_count(v.vehicle_id).await.unwrap(), 2);
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn severity_summary_counts_flags_and_sums_counts() {
  let s = store().await;
  let v = accord(&s).await;

  s.insert_complaints_if_absent(
    v.vehicle_id,
    vec![
      NewComplaint { crash: true, injuries: 3, ..NewComplaint::bare("1") },
      NewComplaint { crash: true, fire: true, deaths: 1, ..NewComplaint::bare("2") },
      NewComplaint { injuries: 1, ..NewComplaint::bare("3") },
      NewComplaint::bare("4"),
    ],
  )
  .await
  .unwrap();

  let summary = s.severity_summary(v.vehicle_id).await.unwrap();
  assert_eq!(summary.total_complaints, 4);
  assert_eq!(summary.crash_count, 2);
  assert_eq!(summary.fire_count, 1);
  assert_eq!(summary.injury_count, 4);
  assert_eq!(summary.death_count, 1);
}

#[tokio::test]
async fn severity_summary_of_empty_vehicle_is_zero() {
  let s = store().await;
  let v = accord(&s).await;
  let summary = s.severity_summary(v.vehicle_id).await.unwrap();
  assert_eq!(summary, Default::default());
}

#[tokio::test]
async fn top_components_orders_by_count_then_label() {
  let s = store().await;
  let v = accord(&s).await;

  s.insert_complaints_if_absent(
    v.vehicle_id,
    vec![
      complaint("1", Some("STEERING"), ""),
      complaint("2", Some("ENGINE"), ""),
      complaint("3", Some("BRAKES"), ""),
      complaint("4", Some("ENGINE"), ""),
      complaint("5", Some("STEERING"), ""),
      complaint("6", None, ""),
    ],
  )
  .await
  .unwrap();

  let ranked = s.top_components(v.vehicle_id, 10).await.unwrap();
  let labels: Vec<_> = ranked
    .iter()
    .map(|c| (c.component_label.as_str(), c.complaint_count))
    .collect();
  assert_eq!(
    labels,
    vec![
      ("ENGINE", 2),
      ("STEERING", 2),
      (UNKNOWN_COMPONENT, 1),
      ("BRAKES", 1),
    ]
  );

  // Repeated calls give the same order.
  assert_eq!(s.top_components(v.vehicle_id, 10).await.unwrap(), ranked);

  let limited = s.top_components(v.vehicle_id, 1).await.unwrap();
  assert_eq!(limited.len(), 1);
  assert_eq!(limited[0].component_label, "ENGINE");
}

#[tokio::test]
async fn trend_fills_internal_months_with_zero() {
  let s = store().await;
  let v = accord(&s).await;

  s.insert_complaints_if_absent(
    v.vehicle_id,
    vec![
      filed("1", date(2021, 1, 5)),
      filed("2", date(2021, 1, 20)),
      filed("3", date(2021, 4, 2)),
      NewComplaint {
        incident_date: Some(date(2021, 2, 14)),
        ..NewComplaint::bare("4")
      },
      NewComplaint::bare("5"),
    ],
  )
  .await
  .unwrap();

  let trend = s.trend_over_time(v.vehicle_id, Bucket::Month).await.unwrap();
  let points: Vec<_> = trend.iter().map(|p| (p.period, p.count)).collect();
  assert_eq!(
    points,
    vec![
      (Period::month(2021, 1), 2),
      (Period::month(2021, 2), 1),
      (Period::month(2021, 3), 0),
      (Period::month(2021, 4), 1),
    ]
  );

  let yearly = s.trend_over_time(v.vehicle_id, Bucket::Year).await.unwrap();
  assert_eq!(yearly.len(), 1);
  assert_eq!(yearly[0].count, 4);
}

#[tokio::test]
async fn search_is_case_insensitive_substring() {
  let s = store().await;
  let v = accord(&s).await;

  s.insert_complaints_if_absent(
    v.vehicle_id,
    vec![
      complaint("1", None, "Transmission SLIPPING at 40 mph"),
      complaint("2", None, "engine stalled"),
      complaint("3", None, "transmission whine"),
    ],
  )
  .await
  .unwrap();

  let hits = s
    .search_symptoms(v.vehicle_id, "TRANSMISSION", None)
    .await
    .unwrap();
  let mut ids: Vec<_> = hits.iter().map(|c| c.odi_number.as_str()).collect();
  ids.sort();
  assert_eq!(ids, vec!["1", "3"]);

  let limited = s
    .search_symptoms(v.vehicle_id, "transmission", Some(1))
    .await
    .unwrap();
  assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn empty_search_returns_nothing() {
  let s = store().await;
  let v = accord(&s).await;
  s.insert_complaints_if_absent(v.vehicle_id, vec![complaint("1", None, "anything")])
    .await
    .unwrap();

  assert!(s.search_symptoms(v.vehicle_id, "", None).await.unwrap().is_empty());
  assert!(s.search_symptoms(v.vehicle_id, "   ", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
  let s = store().await;
  let v = accord(&s).await;
  s.insert_complaints_if_absent(
    v.vehicle_id,
    vec![
      complaint("1", None, "battery at 100% then dead"),
      complaint("2", None, "battery at 100 then dead"),
    ],
  )
  .await
  .unwrap();

  let hits = s.search_symptoms(v.vehicle_id, "100%", None).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].odi_number, "1");

  let none = s.search_symptoms(v.vehicle_id, "b_ttery", None).await.unwrap();
  assert!(none.is_empty());
}

#[tokio::test]
async fn search_keeps_surrounding_whitespace() {
  let s = store().await;
  let v = accord(&s).await;
  s.insert_complaints_if_absent(
    v.vehicle_id,
    vec![
      complaint("1", None, "engine stalled"),
      complaint("2", None, "the stall light"),
    ],
  )
  .await
  .unwrap();

  let hits = s.search_symptoms(v.vehicle_id, "stall ", None).await.unwrap();
  let ids: Vec<_> = hits.iter().map(|c| c.odi_number.as_str()).collect();
  assert_eq!(ids, vec!["2"]);
}

#[tokio::test]
async fn recall_list_is_newest_first_with_undated_last() {
  let s = store().await;
  let v = accord(&s).await;

  s.insert_recalls_if_absent(
    v.vehicle_id,
    vec![
      NewRecall { report_date: Some(date(2020, 6, 1)), ..NewRecall::bare("20V001000") },
      NewRecall::bare("19V999000"),
      NewRecall { report_date: Some(date(2022, 1, 15)), ..NewRecall::bare("22V002000") },
    ],
  )
  .await
  .unwrap();

  let recalls = s.recall_list(v.vehicle_id).await.unwrap();
  let order: Vec<_> = recalls.iter().map(|r| r.campaign_number.as_str()).collect();
  assert_eq!(order, vec!["22V002000", "20V001000", "19V999000"]);
}

#[tokio::test]
async fn queries_do_not_mutate_the_store() {
  let s = store().await;
  let v = accord(&s).await;
  s.insert_complaints_if_absent(
    v.vehicle_id,
    vec![filed("1", date(2021, 5, 1)), complaint("2", Some("ENGINE"), "stall")],
  )
  .await
  .unwrap();

  let before = (
    s.severity_summary(v.vehicle_id).await.unwrap(),
    s.top_components(v.vehicle_id, 10).await.unwrap(),
    s.trend_over_time(v.vehicle_id, Bucket::Month).await.unwrap(),
    s.search_symptoms(v.vehicle_id, "stall", None).await.unwrap(),
  );
  let after = (
    s.severity_summary(v.vehicle_id).await.unwrap(),
    s.top_components(v.vehicle_id, 10).await.unwrap(),
    s.trend_over_time(v.vehicle_id, Bucket::Month).await.unwrap(),
    s.search_symptoms(v.vehicle_id, "stall", None).await.unwrap(),
  );
  assert_eq!(before, after);
  assert_eq!(s.complaint_count(v.vehicle_id).await.unwrap(), 2);
}
