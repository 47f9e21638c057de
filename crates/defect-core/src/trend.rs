//! Calendar bucketing for complaint trends.
//!
//! Trend series are continuous: every period between the first and last
//! observed one is present, with a zero count where nothing was filed.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Trend granularity.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
  #[default]
  Month,
  Year,
}

impl FromStr for Bucket {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "month" => Ok(Self::Month),
      "year" => Ok(Self::Year),
      other => Err(Error::UnknownBucket(other.to_owned())),
    }
  }
}

// ─── Period ──────────────────────────────────────────────────────────────────

/// A calendar month or year. Renders as `YYYY-MM` or `YYYY`.
///
/// Ordering is chronological within one bucket kind; periods of different
/// kinds are never mixed in one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
  year:  i32,
  month: Option<u32>,
}

impl Period {
  /// `month` is clamped into `1..=12`.
  pub fn month(year: i32, month: u32) -> Self {
    Self { year, month: Some(month.clamp(1, 12)) }
  }

  pub fn year(year: i32) -> Self { Self { year, month: None } }

  /// The period of `bucket` granularity that contains `date`.
  pub fn containing(date: NaiveDate, bucket: Bucket) -> Self {
    match bucket {
      Bucket::Month => Self::month(date.year(), date.month()),
      Bucket::Year => Self::year(date.year()),
    }
  }

  /// The immediately following period of the same granularity.
  pub fn next(self) -> Self {
    match self.month {
      Some(12) => Self::month(self.year + 1, 1),
      Some(m) => Self::month(self.year, m + 1),
      None => Self::year(self.year + 1),
    }
  }

  pub fn year_number(&self) -> i32 { self.year }

  pub fn month_number(&self) -> Option<u32> { self.month }
}

impl fmt::Display for Period {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.month {
      Some(m) => write!(f, "{:04}-{:02}", self.year, m),
      None => write!(f, "{:04}", self.year),
    }
  }
}

impl FromStr for Period {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidPeriod(s.to_owned());
    match s.split_once('-') {
      Some((y, m)) => {
        let year = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
          return Err(invalid());
        }
        Ok(Self::month(year, month))
      }
      None => Ok(Self::year(s.parse().map_err(|_| invalid())?)),
    }
  }
}

impl Serialize for Period {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Period {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

// ─── Series ──────────────────────────────────────────────────────────────────

/// One point of a trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
  pub period: Period,
  pub count:  u64,
}

/// Group dated counts into `bucket` periods, filling internal gaps with zero.
///
/// Input order does not matter and dates may repeat. The result is
/// chronological and empty only when the input is.
pub fn bucket_counts<I>(bucket: Bucket, dated: I) -> Vec<TrendPoint>
where
  I: IntoIterator<Item = (NaiveDate, u64)>,
{
  let mut counts: BTreeMap<Period, u64> = BTreeMap::new();
  for (date, n) in dated {
    *counts.entry(Period::containing(date, bucket)).or_default() += n;
  }

  let (Some(&first), Some(&last)) = (counts.keys().next(), counts.keys().next_back())
  else {
    return Vec::new();
  };

  let mut series = Vec::new();
  let mut period = first;
  loop {
    series.push(TrendPoint {
      period,
      count: counts.get(&period).copied().unwrap_or(0),
    });
    if period == last {
      break;
    }
    period = period.next();
  }
  series
}
