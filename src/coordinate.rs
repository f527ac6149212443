use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rational::{CENTI_DENOM, Rational};

const CENTISECONDS_PER_DEGREE: f64 = 360_000.0;
const CENTISECONDS_PER_MINUTE: u64 = 6_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    /// Hemisphere letter for a value of the given sign. Zero (and -0.0)
    /// belongs to the positive hemisphere.
    pub fn reference_for(self, decimal: f64) -> char {
        let positive = decimal >= 0.0;
        match (self, positive) {
            (Axis::Latitude, true) => 'N',
            (Axis::Latitude, false) => 'S',
            (Axis::Longitude, true) => 'E',
            (Axis::Longitude, false) => 'W',
        }
    }

    pub fn limit(self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExifCoordinate {
    pub dms: [Rational; 3],
    pub reference: char,
}

impl ExifCoordinate {
    pub fn to_decimal(&self) -> Result<f64> {
        from_exif_coordinate(&self.dms, self.reference)
    }
}

/// Splits `decimal` into whole degrees, whole minutes and seconds at 1/100",
/// plus the hemisphere letter for its sign.
///
/// Away from minute boundaries this matches the direct split:
/// `int(|d|)`, `int(|d|*60 mod 60)`, `round((|d|*3600 mod 60) * 100) / 100`.
/// It differs where seconds would round up to 60.00": here degrees, minutes
/// and centiseconds all come from one rounded count of centiseconds, so
/// 10.9999999 becomes 11° 0' 0.00" rather than 10° 59' 60.00". Either way a
/// round trip stays within 0.005" (1/720000 degree).
pub fn to_exif_coordinate(decimal: f64, axis: Axis) -> Result<ExifCoordinate> {
    let field = match axis {
        Axis::Latitude => "GPSLatitude",
        Axis::Longitude => "GPSLongitude",
    };
    if !decimal.is_finite() {
        return Err(Error::encode(field, format!("{decimal} is not a finite number")));
    }
    let total = (decimal.abs() * CENTISECONDS_PER_DEGREE).round();
    if total > (u32::MAX as f64) * CENTISECONDS_PER_DEGREE {
        return Err(Error::encode(field, format!("{decimal} is out of range")));
    }
    let total = total as u64;
    let per_degree = CENTISECONDS_PER_DEGREE as u64;
    let degrees = (total / per_degree) as u32;
    let minutes = ((total % per_degree) / CENTISECONDS_PER_MINUTE) as u32;
    let centiseconds = (total % CENTISECONDS_PER_MINUTE) as u32;

    let seconds = Rational::new(centiseconds, CENTI_DENOM)
        .ok_or_else(|| Error::encode(field, "zero denominator"))?;
    Ok(ExifCoordinate {
        dms: [Rational::whole(degrees), Rational::whole(minutes), seconds],
        reference: axis.reference_for(decimal),
    })
}

/// Sums degrees + minutes/60 + seconds/3600 and applies the hemisphere sign.
pub fn from_exif_coordinate(dms: &[Rational; 3], reference: char) -> Result<f64> {
    let [deg, min, sec] = dms;
    let value = deg.to_f64() + min.to_f64() / 60.0 + sec.to_f64() / 3600.0;
    match reference {
        'N' | 'E' => Ok(value),
        'S' | 'W' => Ok(-value),
        other => Err(Error::InvalidReference(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUND: f64 = 1.0 / 360_000.0;

    fn round_trip(decimal: f64, axis: Axis) -> f64 {
        to_exif_coordinate(decimal, axis)
            .unwrap()
            .to_decimal()
            .unwrap()
    }

    #[test]
    fn southern_latitude_gets_s() {
        let c = to_exif_coordinate(-33.8688, Axis::Latitude).unwrap();
        assert_eq!(c.reference, 'S');
        assert_eq!(c.dms[0], Rational::whole(33));
    }

    #[test]
    fn eastern_longitude_gets_e() {
        let c = to_exif_coordinate(45.0, Axis::Longitude).unwrap();
        assert_eq!(c.reference, 'E');
        assert_eq!(c.dms[0], Rational::whole(45));
        assert_eq!(c.dms[1], Rational::whole(0));
        assert_eq!(c.dms[2].num(), 0);
    }

    #[test]
    fn zero_is_north_and_east() {
        assert_eq!(to_exif_coordinate(0.0, Axis::Latitude).unwrap().reference, 'N');
        assert_eq!(to_exif_coordinate(0.0, Axis::Longitude).unwrap().reference, 'E');
        assert_eq!(to_exif_coordinate(-0.0, Axis::Latitude).unwrap().reference, 'N');
    }

    #[test]
    fn western_longitude_gets_w() {
        let c = to_exif_coordinate(-122.4194, Axis::Longitude).unwrap();
        assert_eq!(c.reference, 'W');
        assert!(c.to_decimal().unwrap() < 0.0);
    }

    #[test]
    fn eiffel_tower_round_trip() {
        let lat = to_exif_coordinate(48.8584, Axis::Latitude).unwrap();
        let lon = to_exif_coordinate(2.2945, Axis::Longitude).unwrap();
        assert_eq!(lat.reference, 'N');
        assert_eq!(lon.reference, 'E');
        assert_eq!(lat.dms[1], Rational::whole(51));
        assert_eq!((lat.dms[2].num(), lat.dms[2].denom()), (3024, 100));
        assert!((lat.to_decimal().unwrap() - 48.8584).abs() <= 0.0000028);
        assert!((lon.to_decimal().unwrap() - 2.2945).abs() <= 0.0000028);
    }

    #[test]
    fn round_trip_stays_within_centisecond_bound() {
        for axis in [Axis::Latitude, Axis::Longitude] {
            let limit = axis.limit();
            let steps = 20_000;
            for i in 0..=steps {
                let d = -limit + 2.0 * limit * (i as f64) / (steps as f64) + 0.000_123_4;
                let d = d.clamp(-limit, limit);
                let err = (round_trip(d, axis) - d).abs();
                assert!(err <= BOUND, "{d} drifted by {err}");
            }
        }
    }

    fn direct_split(decimal: f64) -> (u32, u32, u32) {
        let d = decimal.abs();
        let degrees = d.trunc() as u32;
        let minutes = ((d * 60.0) % 60.0).trunc() as u32;
        let centiseconds = (((d * 3600.0) % 60.0) * 100.0).round() as u32;
        (degrees, minutes, centiseconds)
    }

    #[test]
    fn matches_the_direct_split_away_from_minute_boundaries() {
        for d in [48.8584, 2.2945, -33.8688, 151.2093, -122.4194, 0.5, 89.123_456, -179.25] {
            let c = to_exif_coordinate(d, Axis::Longitude).unwrap();
            let (degrees, minutes, centiseconds) = direct_split(d);
            assert_eq!(c.dms[0], Rational::whole(degrees), "{d}");
            assert_eq!(c.dms[1], Rational::whole(minutes), "{d}");
            assert_eq!((c.dms[2].num(), c.dms[2].denom()), (centiseconds, 100), "{d}");
        }
    }

    #[test]
    fn seconds_near_a_full_minute_carry_over() {
        assert_eq!(direct_split(10.999_999_9), (10, 59, 6000));
        let c = to_exif_coordinate(10.999_999_9, Axis::Latitude).unwrap();
        assert_eq!(c.dms[0], Rational::whole(11));
        assert_eq!(c.dms[1], Rational::whole(0));
        assert_eq!(c.dms[2].num(), 0);
    }

    #[test]
    fn decode_honours_rational_denominators() {
        let dms = [
            Rational::new(96, 2).unwrap(),
            Rational::new(510, 10).unwrap(),
            Rational::new(3024, 100).unwrap(),
        ];
        let d = from_exif_coordinate(&dms, 'N').unwrap();
        assert!((d - 48.8584).abs() < 1e-9);
    }

    #[test]
    fn unknown_reference_is_rejected() {
        let dms = [Rational::whole(1), Rational::whole(0), Rational::whole(0)];
        assert_eq!(
            from_exif_coordinate(&dms, 'X'),
            Err(Error::InvalidReference('X'))
        );
        assert_eq!(
            from_exif_coordinate(&dms, 'n'),
            Err(Error::InvalidReference('n'))
        );
    }

    #[test]
    fn non_finite_input_is_an_encode_error() {
        assert!(matches!(
            to_exif_coordinate(f64::NAN, Axis::Latitude),
            Err(Error::Encode { .. })
        ));
    }
}
