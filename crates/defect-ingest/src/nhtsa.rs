//! HTTP client for the public NHTSA APIs.
//!
//! - complaints: `GET {api_base_url}/complaints/complaintsByVehicle`
//! - recalls:    `GET {api_base_url}/recalls/recallsByVehicle`
//! - VIN decode: `GET {vpic_base_url}/DecodeVinValues/{vin}?format=json`
//!
//! The record feeds answer `{count, message, results: [...]}`; vPIC answers
//! `{Count, Message, Results: [...]}` with one flat attribute map.

use std::time::Duration;

use defect_core::vehicle::ModelYear;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::source::{DataSource, Endpoint, FetchError, VinDecoder};

// ─── Config ──────────────────────────────────────────────────────────────────

/// Where to find the NHTSA APIs and how long to wait for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NhtsaConfig {
  pub api_base_url:  String,
  pub vpic_base_url: String,
  pub timeout_secs:  u64,
}

impl Default for NhtsaConfig {
  fn default() -> Self {
    Self {
      api_base_url:  "https://api.nhtsa.gov".into(),
      vpic_base_url: "https://vpic.nhtsa.dot.gov/api/vehicles".into(),
      timeout_secs:  30,
    }
  }
}

// ─── Wire shapes ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Envelope {
  #[serde(default)]
  results: Vec<Value>,
}

#[derive(Deserialize)]
struct VpicEnvelope {
  #[serde(rename = "Results", default)]
  results: Vec<VpicResult>,
}

#[derive(Deserialize)]
struct VpicResult {
  #[serde(rename = "Make")]
  make:       Option<String>,
  #[serde(rename = "Model")]
  model:      Option<String>,
  #[serde(rename = "ModelYear")]
  model_year: Option<String>,
}

impl VpicResult {
  /// vPIC reports unknown attributes as empty strings.
  fn into_model_year(self) -> Option<ModelYear> {
    let year = self.model_year?.trim().parse().ok()?;
    ModelYear::new(self.make.as_deref()?, self.model.as_deref()?, year).ok()
  }
}

impl From<reqwest::Error> for FetchError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      Self::Timeout
    } else if err.is_decode() {
      Self::Decode(err.to_string())
    } else if let Some(status) = err.status() {
      Self::Status(status.as_u16())
    } else {
      Self::Transport(err.to_string())
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async client for the NHTSA complaint, recall and vPIC APIs.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct NhtsaClient {
  client: Client,
  config: NhtsaConfig,
}

impl NhtsaClient {
  pub fn new(config: NhtsaConfig) -> reqwest::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn feed_url(&self, endpoint: Endpoint) -> String {
    let path = match endpoint {
      Endpoint::Complaints => "complaints/complaintsByVehicle",
      Endpoint::Recalls => "recalls/recallsByVehicle",
    };
    format!("{}/{path}", self.config.api_base_url.trim_end_matches('/'))
  }

  fn vpic_url(&self, vin: &str) -> String {
    format!(
      "{}/DecodeVinValues/{vin}",
      self.config.vpic_base_url.trim_end_matches('/')
    )
  }

  async fn get_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, FetchError> {
    let resp = req.send().await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(FetchError::Status(status.as_u16()));
    }

    // A body that isn't the expected JSON surfaces as `is_decode()`.
    Ok(resp.json().await?)
  }
}

impl DataSource for NhtsaClient {
  async fn fetch(
    &self,
    endpoint: Endpoint,
    vehicle:  &ModelYear,
  ) -> Result<Vec<Value>, FetchError> {
    let year = vehicle.year.to_string();
    let req = self.client.get(self.feed_url(endpoint)).query(&[
      ("make", vehicle.make.as_str()),
      ("model", vehicle.model.as_str()),
      ("modelYear", year.as_str()),
    ]);

    let envelope: Envelope = self.get_json(req).await?;
    tracing::debug!(
      %endpoint,
      %vehicle,
      results = envelope.results.len(),
      "fetched"
    );
    Ok(envelope.results)
  }
}

impl VinDecoder for NhtsaClient {
  async fn decode_vin(&self, vin: &str) -> Result<Option<ModelYear>, FetchError> {
    let req = self
      .client
      .get(self.vpic_url(vin))
      .query(&[("format", "json")]);

    let envelope: VpicEnvelope = self.get_json(req).await?;
    let decoded = envelope
      .results
      .into_iter()
      .next()
      .and_then(VpicResult::into_model_year);

    tracing::debug!(vin, decoded = ?decoded, "decoded VIN");
    Ok(decoded)
  }
}
