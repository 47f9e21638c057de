//! Pipeline tests against an in-memory store and a scripted fake source.

use std::{
  collections::{HashMap, VecDeque},
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use defect_core::{
  query::DefectQueries,
  report::FetchStatus,
  store::RecordStore,
  vehicle::{ModelYear, Selector},
};
use defect_store_sqlite::SqliteStore;
use serde_json::{Value, json};

use crate::{
  DataSource, Endpoint, FetchError, IngestError, Pipeline, RetryPolicy, VinDecoder,
};

// ─── Fake source ─────────────────────────────────────────────────────────────

/// Scripted responses for one endpoint: queued failures are returned first,
/// then `records` on every call.
#[derive(Default)]
struct Script {
  failures: VecDeque<FetchError>,
  records:  Vec<Value>,
}

#[derive(Default)]
struct FakeSource {
  complaints:   Mutex<Script>,
  recalls:      Mutex<Script>,
  vins:         Mutex<HashMap<String, ModelYear>>,
  fetch_calls:  AtomicUsize,
  decode_calls: AtomicUsize,
}

impl FakeSource {
  fn script(&self, endpoint: Endpoint) -> &Mutex<Script> {
    match endpoint {
      Endpoint::Complaints => &self.complaints,
      Endpoint::Recalls => &self.recalls,
    }
  }

  fn set_records(&self, endpoint: Endpoint, records: Vec<Value>) {
    self.script(endpoint).lock().unwrap().records = records;
  }

  fn push_record(&self, endpoint: Endpoint, record: Value) {
    self.script(endpoint).lock().unwrap().records.push(record);
  }

  fn fail_next(&self, endpoint: Endpoint, times: usize, error: FetchError) {
    let mut script = self.script(endpoint).lock().unwrap();
    script.failures.extend(std::iter::repeat_n(error, times));
  }

  fn add_vin(&self, vin: &str, make: &str, model: &str, year: i32) {
    self
      .vins
      .lock()
      .unwrap()
      .insert(vin.to_owned(), ModelYear::new(make, model, year).unwrap());
  }

  fn fetches(&self) -> usize { self.fetch_calls.load(Ordering::SeqCst) }

  fn decodes(&self) -> usize { self.decode_calls.load(Ordering::SeqCst) }
}

impl DataSource for FakeSource {
  async fn fetch(
    &self,
    endpoint: Endpoint,
    _vehicle: &ModelYear,
  ) -> Result<Vec<Value>, FetchError> {
    self.fetch_calls.fetch_add(1, Ordering::SeqCst);
    let mut script = self.script(endpoint).lock().unwrap();
    match script.failures.pop_front() {
      Some(error) => Err(error),
      None => Ok(script.records.clone()),
    }
  }
}

impl VinDecoder for FakeSource {
  async fn decode_vin(&self, vin: &str) -> Result<Option<ModelYear>, FetchError> {
    self.decode_calls.fetch_add(1, Ordering::SeqCst);
    Ok(self.vins.lock().unwrap().get(vin).cloned())
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

const VIN: &str = "1HGCV1F34MA012345";

async fn setup() -> (Arc<SqliteStore>, Arc<FakeSource>, Pipeline<SqliteStore, FakeSource>) {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let source = Arc::new(FakeSource::default());
  let pipeline = Pipeline::new(store.clone(), source.clone(), RetryPolicy::immediate(3));
  (store, source, pipeline)
}

fn accord() -> Selector {
  Selector::ModelYear(ModelYear {
    make:  "honda".into(),
    model: "accord".into(),
    year:  2021,
  })
}

fn complaint(odi: u64, crash: bool) -> Value {
  json!({
    "odiNumber": odi,
    "manufacturer": "Honda (American Honda Motor Co.)",
    "crash": crash,
    "fire": false,
    "numberOfInjuries": 0,
    "numberOfDeaths": 0,
    "dateOfIncident": "02/27/2021",
    "dateComplaintFiled": "03/09/2021",
    "vin": "1HGCV1F3XMA",
    "components": "ENGINE",
    "summary": format!("Complaint {odi}: engine stalled"),
    "products": [],
  })
}

fn recall(campaign: &str) -> Value {
  json!({
    "NHTSACampaignNumber": campaign,
    "ReportReceivedDate": "26/03/2021",
    "Component": "FUEL SYSTEM, GASOLINE",
    "Summary": "Fuel pump may fail.",
  })
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn reingest_adds_only_new_records() {
  let (store, source, pipeline) = setup().await;
  source.set_records(
    Endpoint::Complaints,
    vec![
      complaint(1, true),
      complaint(2, true),
      complaint(3, false),
      complaint(4, false),
      complaint(5, false),
    ],
  );
  source.set_records(Endpoint::Recalls, vec![recall("21V215000")]);

  let first = pipeline.ingest(&accord()).await.unwrap();
  assert_eq!(first.complaints.inserted, 5);
  assert_eq!(first.recalls.inserted, 1);
  assert_eq!(first.vehicle.make, "HONDA");
  assert!(!first.is_partial());

  source.push_record(Endpoint::Complaints, complaint(6, false));
  let second = pipeline.ingest(&accord()).await.unwrap();
  assert_eq!(second.vehicle.vehicle_id, first.vehicle.vehicle_id);
  assert_eq!(second.complaints.fetched, 6);
  assert_eq!(second.complaints.inserted, 1);
  assert_eq!(second.complaints.duplicates, 5);
  assert_eq!(second.recalls.inserted, 0);
  assert_eq!(second.recalls.duplicates, 1);

  let id = first.vehicle.vehicle_id;
  assert_eq!(store.complaint_count(id).await.unwrap(), 6);
  assert_eq!(store.recall_count(id).await.unwrap(), 1);
  assert_eq!(store.severity_summary(id).await.unwrap().crash_count, 2);
}

#[tokio::test]
async fn unchanged_source_is_idempotent() {
  let (store, source, pipeline) = setup().await;
  source.set_records(Endpoint::Complaints, vec![complaint(1, true), complaint(2, false)]);
  source.set_records(Endpoint::Recalls, vec![recall("21V215000")]);

  let first = pipeline.ingest(&accord()).await.unwrap();
  let id = first.vehicle.vehicle_id;
  let summary = store.severity_summary(id).await.unwrap();
  let components = store.top_components(id, 10).await.unwrap();

  let second = pipeline.ingest(&accord()).await.unwrap();
  assert_eq!(second.new_count(), 0);
  assert_eq!(second.complaints.duplicates, 2);
  assert_eq!(second.recalls.duplicates, 1);
  assert_eq!(store.severity_summary(id).await.unwrap(), summary);
  assert_eq!(store.top_components(id, 10).await.unwrap(), components);
  assert_eq!(store.list_vehicles().await.unwrap().len(), 1);
}

#[tokio::test]
async fn recall_failure_keeps_complaints() {
  let (store, source, pipeline) = setup().await;
  source.set_records(Endpoint::Complaints, vec![complaint(1, false), complaint(2, false)]);
  source.fail_next(Endpoint::Recalls, 3, FetchError::Status(503));

  let report = pipeline.ingest(&accord()).await.unwrap();

  assert!(report.is_partial());
  assert!(!report.complaints.is_failed());
  assert_eq!(report.complaints.inserted, 2);
  assert_eq!(
    report.recalls.status,
    FetchStatus::Failed { attempts: 3, error: "HTTP status 503".into() }
  );
  assert_eq!(store.complaint_count(report.vehicle.vehicle_id).await.unwrap(), 2);
}

#[tokio::test]
async fn complaint_failure_does_not_block_recalls() {
  let (store, source, pipeline) = setup().await;
  source.fail_next(Endpoint::Complaints, 3, FetchError::Timeout);
  source.set_records(Endpoint::Recalls, vec![recall("21V215000")]);

  let report = pipeline.ingest(&accord()).await.unwrap();

  assert!(report.complaints.is_failed());
  assert_eq!(report.recalls.inserted, 1);
  assert_eq!(store.recall_count(report.vehicle.vehicle_id).await.unwrap(), 1);
}

#[tokio::test]
async fn transient_failures_are_retried() {
  let (_store, source, pipeline) = setup().await;
  source.set_records(Endpoint::Complaints, vec![complaint(1, false)]);
  source.fail_next(Endpoint::Complaints, 2, FetchError::Transport("connection reset".into()));

  let report = pipeline.ingest(&accord()).await.unwrap();

  assert_eq!(report.complaints.status, FetchStatus::Fetched);
  assert_eq!(report.complaints.inserted, 1);
  // Three complaint attempts, one recall attempt.
  assert_eq!(source.fetches(), 4);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
  let (_store, source, pipeline) = setup().await;
  source.fail_next(Endpoint::Complaints, 3, FetchError::Status(400));

  let report = pipeline.ingest(&accord()).await.unwrap();

  assert_eq!(
    report.complaints.status,
    FetchStatus::Failed { attempts: 1, error: "HTTP status 400".into() }
  );
  assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn empty_feed_is_fetched_not_failed() {
  let (_store, _source, pipeline) = setup().await;

  let report = pipeline.ingest(&accord()).await.unwrap();

  assert_eq!(report.complaints.status, FetchStatus::Fetched);
  assert_eq!(report.complaints.fetched, 0);
  assert_eq!(report.recalls.status, FetchStatus::Fetched);
  assert!(!report.is_partial());
}

#[tokio::test]
async fn malformed_records_are_counted_and_skipped() {
  let (store, source, pipeline) = setup().await;
  source.set_records(
    Endpoint::Complaints,
    vec![
      complaint(1, false),
      json!({ "summary": "no odi number" }),
      json!({ "odiNumber": 3, "crash": "maybe" }),
      complaint(4, true),
    ],
  );
  source.set_records(Endpoint::Recalls, vec![json!({ "Summary": "no campaign" })]);

  let report = pipeline.ingest(&accord()).await.unwrap();

  assert_eq!(report.complaints.fetched, 4);
  assert_eq!(report.complaints.malformed, 2);
  assert_eq!(report.complaints.inserted, 2);
  assert_eq!(report.complaints.duplicates, 0);
  assert_eq!(report.recalls.malformed, 1);
  assert_eq!(store.complaint_count(report.vehicle.vehicle_id).await.unwrap(), 2);
}

// ─── Selectors ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_selectors_fail_before_any_fetch() {
  let (store, source, pipeline) = setup().await;

  for selector in [
    Selector::Vin("   ".into()),
    Selector::Vin("1HGCV1F34".into()),
    Selector::ModelYear(ModelYear { make: "".into(), model: "ACCORD".into(), year: 2021 }),
    Selector::ModelYear(ModelYear { make: "HONDA".into(), model: "ACCORD".into(), year: 12 }),
  ] {
    let err = pipeline.ingest(&selector).await.unwrap_err();
    assert!(matches!(err, IngestError::InvalidSelector(_)), "{selector:?}: {err}");
  }

  assert_eq!(source.fetches(), 0);
  assert_eq!(source.decodes(), 0);
  assert!(store.list_vehicles().await.unwrap().is_empty());
}

#[tokio::test]
async fn vin_is_decoded_once_then_remembered() {
  let (store, source, pipeline) = setup().await;
  source.add_vin(VIN, "HONDA", "ACCORD", 2021);
  source.set_records(Endpoint::Complaints, vec![complaint(1, false)]);

  let by_vin = pipeline
    .ingest(&Selector::Vin(VIN.to_lowercase()))
    .await
    .unwrap();
  assert_eq!(by_vin.vehicle.model, "ACCORD");
  assert_eq!(by_vin.complaints.inserted, 1);

  let again = pipeline.ingest(&Selector::Vin(VIN.into())).await.unwrap();
  assert_eq!(again.vehicle.vehicle_id, by_vin.vehicle.vehicle_id);
  assert_eq!(source.decodes(), 1);

  // The make/model/year selector lands on the same vehicle.
  let by_model = pipeline.ingest(&accord()).await.unwrap();
  assert_eq!(by_model.vehicle.vehicle_id, by_vin.vehicle.vehicle_id);
  assert_eq!(store.list_vehicles().await.unwrap().len(), 1);
}

#[tokio::test]
async fn undecodable_vin_is_an_error() {
  let (store, source, pipeline) = setup().await;

  let err = pipeline.ingest(&Selector::Vin(VIN.into())).await.unwrap_err();

  assert!(matches!(err, IngestError::VinDecode { .. }));
  assert_eq!(source.fetches(), 0);
  assert!(store.list_vehicles().await.unwrap().is_empty());
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_ingests_of_one_vehicle_store_each_record_once() {
  let (store, source, pipeline) = setup().await;
  source.set_records(
    Endpoint::Complaints,
    (1..=20).map(|n| complaint(n, n % 2 == 0)).collect(),
  );
  let pipeline = Arc::new(pipeline);

  let a = tokio::spawn({
    let pipeline = pipeline.clone();
    async move { pipeline.ingest(&accord()).await }
  });
  let b = tokio::spawn({
    let pipeline = pipeline.clone();
    async move { pipeline.ingest(&accord()).await }
  });
  let a = a.await.unwrap().unwrap();
  let b = b.await.unwrap().unwrap();

  assert_eq!(a.complaints.inserted + b.complaints.inserted, 20);
  assert_eq!(a.complaints.duplicates + b.complaints.duplicates, 20);
  let summary = store.severity_summary(a.vehicle.vehicle_id).await.unwrap();
  assert_eq!(summary.total_complaints, 20);
  assert_eq!(summary.crash_count, 10);
  assert_eq!(pipeline.held_locks(), 0);
}

#[tokio::test]
async fn vehicle_locks_are_released_after_ingest() {
  let (_store, source, pipeline) = setup().await;
  source.set_records(Endpoint::Complaints, vec![complaint(1, false)]);

  pipeline.ingest(&accord()).await.unwrap();
  assert_eq!(pipeline.held_locks(), 0);

  source.fail_next(Endpoint::Recalls, 1, FetchError::Status(404));
  let report = pipeline.ingest(&accord()).await.unwrap();
  assert!(report.is_partial());
  assert_eq!(pipeline.held_locks(), 0);
}
