//! Sunrise and sunset times for a place on Earth.
//!
//! Uses the sunrise equation with the usual -0.833° solar altitude
//! (refraction plus the solar disc radius). Results are within a couple of
//! minutes of published almanac values, which is enough for minute ticks.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const J2000: f64 = 2_451_545.0;
const UNIX_EPOCH_JULIAN: f64 = 2_440_587.5;
/// Days between 0001-01-01 (day 1 of the common era) and J2000.
const CE_TO_J2000_DAYS: i32 = 730_120;
const OBLIQUITY_DEG: f64 = 23.4397;
const HORIZON_DEG: f64 = -0.833;

/// A geographic position in decimal degrees, east and north positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCoordinates`] when latitude is
    /// outside ±90° or longitude outside ±180°.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::InvalidCoordinates);
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Local sunrise and sunset of one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: NaiveTime,
    pub sunset: NaiveTime,
}

impl SunTimes {
    /// Sunrise and sunset on `date` at `coordinates`, expressed in the time
    /// zone `offset`.
    ///
    /// Returns `None` during polar day or polar night.
    #[must_use]
    pub fn on(date: NaiveDate, coordinates: Coordinates, offset: FixedOffset) -> Option<Self> {
        let days = f64::from(date.num_days_from_ce() - CE_TO_J2000_DAYS);
        let mean_noon = days - coordinates.longitude / 360.0;

        let anomaly = (357.5291 + 0.985_600_28 * mean_noon).rem_euclid(360.0);
        let m = anomaly.to_radians();
        let center = 1.9148 * m.sin() + 0.0200 * (2.0 * m).sin() + 0.0003 * (3.0 * m).sin();
        let ecliptic = (anomaly + center + 180.0 + 102.9372).rem_euclid(360.0).to_radians();
        let transit = J2000 + mean_noon + 0.0053 * m.sin() - 0.0069 * (2.0 * ecliptic).sin();

        let declination = (ecliptic.sin() * OBLIQUITY_DEG.to_radians().sin()).asin();
        let latitude = coordinates.latitude.to_radians();
        let cos_hour_angle = (HORIZON_DEG.to_radians().sin() - latitude.sin() * declination.sin())
            / (latitude.cos() * declination.cos());
        if !(-1.0..=1.0).contains(&cos_hour_angle) {
            return None;
        }
        let half_day = cos_hour_angle.acos().to_degrees() / 360.0;

        Some(Self {
            sunrise: local_time(transit - half_day, offset)?,
            sunset: local_time(transit + half_day, offset)?,
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn local_time(julian: f64, offset: FixedOffset) -> Option<NaiveTime> {
    let seconds = ((julian - UNIX_EPOCH_JULIAN) * 86_400.0).round() as i64;
    DateTime::from_timestamp(seconds, 0).map(|utc| utc.with_timezone(&offset).time())
}
