//! Launch records: the raw API payload and the canonical fact row derived
//! from it.
//!
//! [`normalize`] is the only way a [`LaunchFact`] is built from external data.
//! It is a pure function; derived columns (`payload_mass`,
//! `launch_delay_hours`) are computed here once and persisted, never
//! recomputed downstream.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Prefix that introduces the payload mass inside free-text `details`.
pub const PAYLOAD_MASS_MARKER: &str = "Total payload mass was ";
const PAYLOAD_MASS_UNIT: &str = " kg";

const SECONDS_PER_HOUR: u64 = 3600;

/// Launch dates every backend can bucket into a four-digit UTC year:
/// 0001-01-01T00:00:00Z through 9999-12-31T23:59:59Z.
pub const LAUNCH_DATE_RANGE: RangeInclusive<i64> = -62_135_596_800..=253_402_300_799;

/// Fact table columns, in insertion order.
pub const FACT_COLUMNS: [&str; 8] = [
  "id",
  "name",
  "launch_date_unix",
  "success",
  "payload_mass",
  "details",
  "engine_start_time_unix",
  "launch_delay_hours",
];

// ─── Raw payload ─────────────────────────────────────────────────────────────

/// The fields of interest from the "latest launch" API object. Every field
/// may be absent or null on the wire; everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLaunch {
  pub id:                    Option<String>,
  pub name:                  Option<String>,
  pub date_unix:             Option<i64>,
  pub static_fire_date_unix: Option<i64>,
  pub success:               Option<bool>,
  pub details:               Option<String>,
}

impl RawLaunch {
  /// Pick the fields of interest out of an arbitrary JSON object.
  ///
  /// Fails only when a field of interest has the wrong JSON type; absence
  /// and `null` are left for [`normalize`] to judge.
  pub fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
    Ok(serde_json::from_value(value)?)
  }
}

// ─── Canonical fact row ──────────────────────────────────────────────────────

/// One row of the append-only fact table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchFact {
  pub id:                     String,
  pub name:                   Option<String>,
  pub launch_date_unix:       Option<i64>,
  pub success:                bool,
  /// Kilograms; `0` when the details carry no mass.
  pub payload_mass:           i64,
  pub details:                Option<String>,
  /// Static-fire time, when one was reported.
  pub engine_start_time_unix: Option<i64>,
  pub launch_delay_hours:     i64,
}

impl LaunchFact {
  /// The first fact table constraint this row breaks, if any.
  ///
  /// Mirrors the CHECK constraints of the relational fact tables.
  pub fn violation(&self) -> Option<&'static str> {
    if self
      .launch_date_unix
      .is_some_and(|date| !LAUNCH_DATE_RANGE.contains(&date))
    {
      Some("launch_date_unix must fall within years 1..=9999")
    } else if self.payload_mass < 0 {
      Some("payload_mass must not be negative")
    } else if self.launch_delay_hours < 0 {
      Some("launch_delay_hours must not be negative")
    } else {
      None
    }
  }
}

// ─── Normalizer ──────────────────────────────────────────────────────────────

/// Validate `raw` and derive the canonical fact row.
///
/// `id` and `success` are mandatory; nothing else is looked at until both are
/// known to be present.
pub fn normalize(raw: RawLaunch) -> Result<LaunchFact, ValidationError> {
  let id = raw.id.ok_or(ValidationError::MissingField("id"))?;
  let success = raw.success.ok_or(ValidationError::MissingField("success"))?;
  if let Some(date) = raw.date_unix.filter(|d| !LAUNCH_DATE_RANGE.contains(d)) {
    return Err(ValidationError::LaunchDateOutOfRange(date));
  }

  let payload_mass = match raw.details.as_deref() {
    Some(details) => payload_mass(details)?,
    None => 0,
  };

  let launch_delay_hours = match (raw.date_unix, raw.static_fire_date_unix) {
    (Some(launch), Some(engine_start)) => delay_hours(launch, engine_start),
    _ => 0,
  };

  Ok(LaunchFact {
    id,
    name: raw.name,
    launch_date_unix: raw.date_unix,
    success,
    payload_mass,
    details: raw.details,
    engine_start_time_unix: raw.static_fire_date_unix,
    launch_delay_hours,
  })
}

/// Extract the mass from `"… Total payload mass was <n> kg …"`.
///
/// The last occurrence of the marker wins. Text without the marker yields
/// `0`; a marker followed by anything but a non-negative integer is an error.
pub fn payload_mass(details: &str) -> Result<i64, ValidationError> {
  let Some((_, rest)) = details.rsplit_once(PAYLOAD_MASS_MARKER) else {
    return Ok(0);
  };

  let amount = rest
    .split_once(PAYLOAD_MASS_UNIT)
    .map_or(rest, |(amount, _)| amount)
    .trim();

  match amount.parse::<i64>() {
    Ok(mass) if mass >= 0 => Ok(mass),
    _ => Err(ValidationError::MalformedPayloadMass(details.to_owned())),
  }
}

/// Whole hours between launch and engine start, rounding half up
/// (1800 s → 1 h, 9000 s → 3 h).
pub fn delay_hours(launch_unix: i64, engine_start_unix: i64) -> i64 {
  let seconds = launch_unix.abs_diff(engine_start_unix);
  let hours = seconds / SECONDS_PER_HOUR
    + u64::from(seconds % SECONDS_PER_HOUR >= SECONDS_PER_HOUR / 2);
  // u64::MAX / 3600 is well inside i64.
  hours as i64
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn crew_5(static_fire: serde_json::Value, details: serde_json::Value) -> RawLaunch {
    RawLaunch::from_json(json!({
      "static_fire_date_utc":  null,
      "static_fire_date_unix": static_fire,
      "rocket":                "5e9d0d95eda69973a809d1ec",
      "success":               true,
      "failures":              [],
      "details":               details,
      "flight_number":         187,
      "name":                  "Crew-5",
      "date_utc":              "2022-10-05T16:00:00.000Z",
      "date_unix":             1664985600,
      "id":                    "62dd70d5202306255024d139",
      "date_precision":        "hour",
    }))
    .unwrap()
  }

  #[test]
  fn no_details_and_no_static_fire() {
    let fact = normalize(crew_5(json!(null), json!(null))).unwrap();
    assert_eq!(fact, LaunchFact {
      id:                     "62dd70d5202306255024d139".into(),
      name:                   Some("Crew-5".into()),
      launch_date_unix:       Some(1664985600),
      success:                true,
      payload_mass:           0,
      details:                None,
      engine_start_time_unix: None,
      launch_delay_hours:     0,
    });
  }

  #[test]
  fn payload_mass_and_delay_are_derived() {
    let details = "Total payload mass was 130 kg blabla";
    let fact = normalize(crew_5(json!(1664989200), json!(details))).unwrap();

    assert_eq!(fact.payload_mass, 130);
    assert_eq!(fact.details.as_deref(), Some(details));
    assert_eq!(fact.engine_start_time_unix, Some(1664989200));
    assert_eq!(fact.launch_delay_hours, 1);
  }

  #[test]
  fn missing_or_null_mandatory_fields_are_rejected() {
    for field in ["id", "success"] {
      let mut absent = crew_5(json!(null), json!(null));
      let mut nulled = serde_json::to_value(&absent).unwrap();
      nulled[field] = json!(null);
      match field {
        "id" => absent.id = None,
        _ => absent.success = None,
      }

      for raw in [absent, RawLaunch::from_json(nulled).unwrap()] {
        match normalize(raw) {
          Err(ValidationError::MissingField(name)) => assert_eq!(name, field),
          other => panic!("expected MissingField({field}), got {other:?}"),
        }
      }
    }
  }

  #[test]
  fn failed_launch_is_still_valid() {
    let mut raw = crew_5(json!(null), json!(null));
    raw.success = Some(false);
    assert!(!normalize(raw).unwrap().success);
  }

  #[test]
  fn wrong_json_type_is_a_validation_error() {
    let err = RawLaunch::from_json(json!({ "id": "x", "success": "yes" })).unwrap_err();
    assert!(matches!(err, ValidationError::WrongType(_)));
  }

  #[test]
  fn details_without_marker_default_to_zero() {
    assert_eq!(payload_mass("Routine Starlink deployment.").unwrap(), 0);
    assert_eq!(payload_mass("").unwrap(), 0);
  }

  #[test]
  fn payload_mass_variants() {
    assert_eq!(payload_mass("Total payload mass was 15600 kg").unwrap(), 15600);
    assert_eq!(payload_mass("Total payload mass was 42").unwrap(), 42);
    assert_eq!(
      payload_mass("Total payload mass was 1 kg. Total payload mass was 7 kg.").unwrap(),
      7
    );
  }

  #[test]
  fn unparseable_payload_mass_is_an_error() {
    for details in [
      "Total payload mass was unknown kg",
      "Total payload mass was  kg",
      "Total payload mass was -5 kg",
      "Total payload mass was 12.5 kg",
    ] {
      assert!(
        matches!(payload_mass(details), Err(ValidationError::MalformedPayloadMass(_))),
        "{details:?}"
      );
    }
  }

  #[test]
  fn malformed_mass_fails_the_whole_normalization() {
    let raw = crew_5(json!(null), json!("Total payload mass was lots kg"));
    assert!(matches!(normalize(raw), Err(ValidationError::MalformedPayloadMass(_))));
  }

  #[test]
  fn delay_rounds_half_up() {
    assert_eq!(delay_hours(0, 1799), 0);
    assert_eq!(delay_hours(0, 1800), 1);
    assert_eq!(delay_hours(0, 5400), 2);
    assert_eq!(delay_hours(0, 9000), 3);
    assert_eq!(delay_hours(9000, 0), 3);
    assert_eq!(delay_hours(1664985600, 1664989200), 1);
  }

  #[test]
  fn missing_launch_date_means_no_delay() {
    let mut raw = crew_5(json!(1664989200), json!(null));
    raw.date_unix = None;
    let fact = normalize(raw).unwrap();
    assert_eq!(fact.launch_date_unix, None);
    assert_eq!(fact.engine_start_time_unix, Some(1664989200));
    assert_eq!(fact.launch_delay_hours, 0);
  }

  #[test]
  fn launch_date_beyond_year_9999_is_rejected() {
    let mut raw = crew_5(json!(null), json!(null));
    raw.date_unix = Some(253_402_300_800);
    assert!(matches!(
      normalize(raw),
      Err(ValidationError::LaunchDateOutOfRange(253_402_300_800))
    ));

    let mut raw = crew_5(json!(null), json!(null));
    raw.date_unix = Some(-62_135_596_801);
    assert!(matches!(normalize(raw), Err(ValidationError::LaunchDateOutOfRange(_))));
  }

  #[test]
  fn launch_date_range_bounds_are_accepted() {
    for date in [*LAUNCH_DATE_RANGE.start(), *LAUNCH_DATE_RANGE.end()] {
      let mut raw = crew_5(json!(null), json!(null));
      raw.date_unix = Some(date);
      let fact = normalize(raw).unwrap();
      assert_eq!(fact.launch_date_unix, Some(date));
      assert_eq!(fact.violation(), None);
    }
  }

  #[test]
  fn hand_built_facts_are_checked_like_the_tables() {
    let fact = normalize(crew_5(json!(null), json!(null))).unwrap();
    assert_eq!(fact.violation(), None);

    let far_future = LaunchFact { launch_date_unix: Some(253_402_300_800), ..fact.clone() };
    assert!(far_future.violation().is_some());
    let negative_mass = LaunchFact { payload_mass: -1, ..fact.clone() };
    assert!(negative_mass.violation().is_some());
    let negative_delay = LaunchFact { launch_delay_hours: -1, ..fact };
    assert!(negative_delay.violation().is_some());
  }
}
