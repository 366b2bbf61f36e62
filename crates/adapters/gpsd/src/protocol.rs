//! The subset of the gpsd JSON protocol needed for position fixes.
//!
//! After `?WATCH` the daemon streams one JSON object per line, tagged by
//! `class`. Only `TPV` (time-position-velocity) reports carry a fix; every
//! other class is ignored.

use serde::Deserialize;

use uhilog_domain::position::Position;

/// Enables JSON watch mode on the connection.
pub const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";

/// `mode` value of a 2D fix. Lower values carry no usable coordinate.
const MODE_2D: u8 = 2;

#[derive(Debug, Deserialize)]
#[serde(tag = "class")]
enum Report {
    #[serde(rename = "TPV")]
    Tpv(Tpv),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Tpv {
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(rename = "altMSL")]
    alt_msl: Option<f64>,
    alt: Option<f64>,
    eph: Option<f64>,
    epx: Option<f64>,
    epy: Option<f64>,
    speed: Option<f64>,
}

impl Tpv {
    fn into_position(self) -> Option<Position> {
        if self.mode < MODE_2D {
            return None;
        }
        let mut position = Position::new(self.lat?, self.lon?);
        position.altitude = self.alt_msl.or(self.alt);
        position.accuracy = self.eph.or_else(|| match (self.epx, self.epy) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (x, y) => x.or(y),
        });
        position.speed = self.speed;
        Some(position)
    }
}

/// Extract a position from one report line.
///
/// Returns `Ok(None)` for other report classes and for TPV reports without a
/// fix.
///
/// # Errors
///
/// Returns the JSON error when the line is not a gpsd report.
pub fn parse_fix(line: &str) -> Result<Option<Position>, serde_json::Error> {
    match serde_json::from_str::<Report>(line)? {
        Report::Tpv(tpv) => Ok(tpv.into_position()),
        Report::Other => Ok(None),
    }
}
