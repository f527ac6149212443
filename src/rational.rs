use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Denominator used for exposure times (microsecond precision).
pub const EXPOSURE_DENOM: u32 = 1_000_000;
/// Denominator used for f-number, focal length, GPS altitude/speed/direction
/// and coordinate seconds.
pub const CENTI_DENOM: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRational")]
/// Unsigned rational as stored in EXIF RATIONAL fields. The denominator is
/// never zero.
pub struct Rational {
    num: u32,
    denom: u32,
}

#[derive(Deserialize)]
struct RawRational {
    num: u32,
    denom: u32,
}

impl TryFrom<RawRational> for Rational {
    type Error = String;

    fn try_from(raw: RawRational) -> std::result::Result<Self, Self::Error> {
        Rational::new(raw.num, raw.denom)
            .ok_or_else(|| format!("{}/0 has a zero denominator", raw.num))
    }
}

impl Rational {
    pub fn new(num: u32, denom: u32) -> Option<Self> {
        (denom != 0).then_some(Self { num, denom })
    }

    /// Whole number with denominator 1.
    pub const fn whole(num: u32) -> Self {
        Self { num, denom: 1 }
    }

    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn denom(&self) -> u32 {
        self.denom
    }

    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    /// Encodes a non-negative decimal at a fixed denominator, rounding the
    /// numerator to the nearest integer. `field` names the value in errors.
    pub fn from_decimal(value: f64, denom: u32, field: &'static str) -> Result<Self> {
        if denom == 0 {
            return Err(Error::encode(field, "zero denominator"));
        }
        if !value.is_finite() {
            return Err(Error::encode(field, format!("{value} is not a finite number")));
        }
        if value < 0.0 {
            return Err(Error::encode(field, format!("{value} is negative")));
        }
        let num = (value * denom as f64).round();
        if num > u32::MAX as f64 {
            return Err(Error::encode(
                field,
                format!("{value} does not fit a 32-bit numerator at 1/{denom}"),
            ));
        }
        Ok(Self {
            num: num as u32,
            denom,
        })
    }

    /// Like [`Rational::from_decimal`], but returns `prior` untouched when
    /// `value` is exactly what `prior` already represents.
    pub fn reencode(
        value: f64,
        denom: u32,
        prior: Option<Rational>,
        field: &'static str,
    ) -> Result<Self> {
        match prior {
            Some(p) if p.to_f64() == value => Ok(p),
            _ => Self::from_decimal(value, denom, field),
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.denom)
    }
}

impl From<Rational> for exif::Rational {
    fn from(r: Rational) -> Self {
        exif::Rational {
            num: r.num,
            denom: r.denom,
        }
    }
}

impl TryFrom<&exif::Rational> for Rational {
    type Error = String;

    fn try_from(r: &exif::Rational) -> std::result::Result<Self, Self::Error> {
        Rational::try_from(RawRational {
            num: r.num,
            denom: r.denom,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_denominator_is_rejected() {
        assert_eq!(Rational::new(1, 0), None);
        assert!(Rational::from_decimal(1.0, 0, "FNumber").is_err());
    }

    #[test]
    fn exposure_uses_microsecond_precision() {
        let r = Rational::from_decimal(1.0 / 250.0, EXPOSURE_DENOM, "ExposureTime").unwrap();
        assert_eq!((r.num(), r.denom()), (4000, 1_000_000));
    }

    #[test]
    fn decimal_is_rounded_not_truncated() {
        // 0.29 * 100 is 28.999999999999996 in binary floating point.
        let r = Rational::from_decimal(0.29, CENTI_DENOM, "FocalLength").unwrap();
        assert_eq!(r.num(), 29);
    }

    #[test]
    fn out_of_range_decimals_are_encode_errors() {
        assert!(Rational::from_decimal(-1.0, CENTI_DENOM, "GPSAltitude").is_err());
        assert!(Rational::from_decimal(f64::NAN, CENTI_DENOM, "GPSAltitude").is_err());
        assert!(Rational::from_decimal(5_000.0, EXPOSURE_DENOM, "ExposureTime").is_err());
    }

    #[test]
    fn reencode_keeps_unchanged_prior() {
        let prior = Rational::new(1, 250).unwrap();
        let kept = Rational::reencode(0.004, EXPOSURE_DENOM, Some(prior), "ExposureTime").unwrap();
        assert_eq!(kept, prior);
        let changed = Rational::reencode(0.5, EXPOSURE_DENOM, Some(prior), "ExposureTime").unwrap();
        assert_eq!((changed.num(), changed.denom()), (500_000, 1_000_000));
    }

    #[test]
    fn converts_from_exif_rational() {
        let ok = Rational::try_from(&exif::Rational { num: 28, denom: 10 }).unwrap();
        assert_eq!(ok.to_f64(), 2.8);
        assert!(Rational::try_from(&exif::Rational { num: 28, denom: 0 }).is_err());
    }
}
