use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coordinate::{Axis, ExifCoordinate, to_exif_coordinate};
use crate::error::{Error, Result};
use crate::options::{
    ExposureMode, Flash, LightSource, MeteringMode, Orientation, SensingMethod, WhiteBalance,
};
use crate::rational::{CENTI_DENOM, EXPOSURE_DENOM, Rational};
use crate::record::{GpsTags, ImageTags, PhotoTags, TagId, TagRecord};

const DEFAULT_GPS_VERSION: &str = "2,2,0,0";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Values as an editing form holds them: free text, raw enum codes and
/// decimals. Nothing here is validated until [`FormValues::apply`].
///
/// Blank text and `None` numbers mean "leave this tag out".
pub struct FormValues {
    pub make: String,
    pub model: String,
    pub orientation: Option<u16>,
    pub datetime: String,
    pub software: String,
    pub artist: String,
    pub copyright: String,

    /// Seconds.
    pub exposure_time: Option<f64>,
    pub f_number: Option<f64>,
    pub iso: Option<f64>,
    pub white_balance: Option<u16>,
    /// Millimetres.
    pub focal_length: Option<f64>,
    pub flash: Option<u16>,
    pub metering_mode: Option<u16>,
    pub exposure_mode: Option<u16>,
    pub light_source: Option<u16>,
    pub sensing_method: Option<u16>,
    pub lens_model: String,

    /// Comma separated, e.g. "2,2,0,0".
    pub gps_version: String,
    /// Metres.
    pub gps_altitude: Option<f64>,
    pub gps_speed: Option<f64>,
    pub gps_img_direction: Option<f64>,
    pub gps_date_stamp: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl FormValues {
    /// Pre-fills a form from a decoded record. Returns the form and the
    /// coordinate errors found on the way; a coordinate that cannot be read
    /// is left blank.
    pub fn from_record(record: &TagRecord) -> (Self, Vec<Error>) {
        let TagRecord { image, photo, gps } = record;
        let mut errors = Vec::new();
        let mut read_coordinate = |axis| match gps.decimal(axis) {
            Some(Ok(v)) => Some(v),
            Some(Err(e)) => {
                warn!(?axis, %e, "coordinate left blank");
                errors.push(e);
                None
            }
            None => None,
        };
        let latitude = read_coordinate(Axis::Latitude);
        let longitude = read_coordinate(Axis::Longitude);

        let text = |s: &Option<String>| s.clone().unwrap_or_default();
        let form = Self {
            make: text(&image.make),
            model: text(&image.model),
            orientation: image.orientation.map(Orientation::code),
            datetime: text(&image.datetime),
            software: text(&image.software),
            artist: text(&image.artist),
            copyright: text(&image.copyright),
            exposure_time: photo.exposure_time.map(|r| r.to_f64()),
            f_number: photo.f_number.map(|r| r.to_f64()),
            iso: photo.iso.map(f64::from),
            white_balance: photo.white_balance.map(WhiteBalance::code),
            focal_length: photo.focal_length.map(|r| r.to_f64()),
            flash: photo.flash.map(Flash::code),
            metering_mode: photo.metering_mode.map(MeteringMode::code),
            exposure_mode: photo.exposure_mode.map(ExposureMode::code),
            light_source: photo.light_source.map(LightSource::code),
            sensing_method: photo.sensing_method.map(SensingMethod::code),
            lens_model: text(&photo.lens_model),
            gps_version: gps
                .version
                .map(|v| v.map(|b| b.to_string()).join(","))
                .unwrap_or_default(),
            gps_altitude: gps.altitude.map(|r| r.to_f64()),
            gps_speed: gps.speed.map(|r| r.to_f64()),
            gps_img_direction: gps.img_direction.map(|r| r.to_f64()),
            gps_date_stamp: text(&gps.date_stamp),
            latitude,
            longitude,
        };
        (form, errors)
    }

    /// Fills every blank field with the value an editing form shows for a
    /// missing tag.
    pub fn with_defaults(mut self) -> Self {
        self.orientation.get_or_insert(Orientation::default().code());
        self.exposure_time.get_or_insert(1.0);
        self.f_number.get_or_insert(1.0);
        self.iso.get_or_insert(100.0);
        self.white_balance.get_or_insert(WhiteBalance::default().code());
        self.focal_length.get_or_insert(1.0);
        self.flash.get_or_insert(Flash::default().code());
        self.metering_mode.get_or_insert(MeteringMode::default().code());
        self.exposure_mode.get_or_insert(ExposureMode::default().code());
        self.light_source.get_or_insert(LightSource::default().code());
        self.sensing_method.get_or_insert(SensingMethod::default().code());
        if self.gps_version.trim().is_empty() {
            self.gps_version = DEFAULT_GPS_VERSION.to_string();
        }
        self.gps_altitude.get_or_insert(0.0);
        self.gps_speed.get_or_insert(0.0);
        self.gps_img_direction.get_or_insert(0.0);
        self
    }

    /// Replaces the fields named in `patch`, keeping the rest. Keys that are
    /// not form fields are rejected.
    pub fn overlay(self, patch: toml::Table) -> Result<Self> {
        let invalid = |reason: String| Error::encode("form", reason);
        let toml::Value::Table(mut base) =
            toml::Value::try_from(&self).map_err(|e| invalid(e.to_string()))?
        else {
            return Err(invalid("form did not serialize to a table".into()));
        };
        for (key, value) in patch {
            if !Self::FIELDS.contains(&key.as_str()) {
                return Err(invalid(format!("unknown field `{key}`")));
            }
            base.insert(key, value);
        }
        toml::Value::Table(base)
            .try_into()
            .map_err(|e: toml::de::Error| invalid(e.to_string()))
    }

    const FIELDS: &'static [&'static str] = &[
        "make",
        "model",
        "orientation",
        "datetime",
        "software",
        "artist",
        "copyright",
        "exposure_time",
        "f_number",
        "iso",
        "white_balance",
        "focal_length",
        "flash",
        "metering_mode",
        "exposure_mode",
        "light_source",
        "sensing_method",
        "lens_model",
        "gps_version",
        "gps_altitude",
        "gps_speed",
        "gps_img_direction",
        "gps_date_stamp",
        "latitude",
        "longitude",
    ];

    /// Validates every field and builds the record to save. `prior` is the
    /// record the form was filled from: decimals that still equal a prior
    /// rational keep that rational as is. On error nothing is built and
    /// `prior` is untouched.
    pub fn apply(&self, prior: &TagRecord) -> Result<TagRecord> {
        let image = ImageTags {
            orientation: enum_code(TagId::Orientation, self.orientation, Orientation::from_code)?,
            make: text(TagId::Make, &self.make)?,
            model: text(TagId::Model, &self.model)?,
            datetime: text(TagId::DateTime, &self.datetime)?,
            software: text(TagId::Software, &self.software)?,
            artist: text(TagId::Artist, &self.artist)?,
            copyright: text(TagId::Copyright, &self.copyright)?,
        };

        let p = &prior.photo;
        let photo = PhotoTags {
            exposure_time: decimal(
                TagId::ExposureTime,
                self.exposure_time,
                EXPOSURE_DENOM,
                p.exposure_time,
            )?,
            f_number: decimal(TagId::FNumber, self.f_number, CENTI_DENOM, p.f_number)?,
            iso: iso(self.iso)?,
            white_balance: enum_code(
                TagId::WhiteBalance,
                self.white_balance,
                WhiteBalance::from_code,
            )?,
            focal_length: decimal(
                TagId::FocalLength,
                self.focal_length,
                CENTI_DENOM,
                p.focal_length,
            )?,
            flash: enum_code(TagId::Flash, self.flash, Flash::from_code)?,
            metering_mode: enum_code(
                TagId::MeteringMode,
                self.metering_mode,
                MeteringMode::from_code,
            )?,
            exposure_mode: enum_code(
                TagId::ExposureMode,
                self.exposure_mode,
                ExposureMode::from_code,
            )?,
            light_source: enum_code(
                TagId::LightSource,
                self.light_source,
                LightSource::from_code,
            )?,
            sensing_method: enum_code(
                TagId::SensingMethod,
                self.sensing_method,
                SensingMethod::from_code,
            )?,
            lens_model: text(TagId::LensModel, &self.lens_model)?,
        };

        let g = &prior.gps;
        let mut gps = GpsTags {
            version: gps_version(&self.gps_version)?,
            altitude: decimal(TagId::GpsAltitude, self.gps_altitude, CENTI_DENOM, g.altitude)?,
            speed: decimal(TagId::GpsSpeed, self.gps_speed, CENTI_DENOM, g.speed)?,
            img_direction: decimal(
                TagId::GpsImgDirection,
                self.gps_img_direction,
                CENTI_DENOM,
                g.img_direction,
            )?,
            date_stamp: text(TagId::GpsDateStamp, &self.gps_date_stamp)?,
            ..GpsTags::default()
        };
        gps.set_coordinate(Axis::Latitude, coordinate(Axis::Latitude, self.latitude, g)?);
        gps.set_coordinate(Axis::Longitude, coordinate(Axis::Longitude, self.longitude, g)?);

        Ok(TagRecord { image, photo, gps })
    }
}

fn text(id: TagId, value: &str) -> Result<Option<String>> {
    if value.contains('\0') {
        return Err(Error::encode(id.name(), "text contains a NUL byte"));
    }
    Ok((!value.is_empty()).then(|| value.to_string()))
}

fn enum_code<T>(id: TagId, code: Option<u16>, from_code: fn(u16) -> Option<T>) -> Result<Option<T>> {
    code.map(|c| {
        from_code(c).ok_or_else(|| Error::encode(id.name(), format!("{c} is not a valid option")))
    })
    .transpose()
}

fn decimal(
    id: TagId,
    value: Option<f64>,
    denom: u32,
    prior: Option<Rational>,
) -> Result<Option<Rational>> {
    value
        .map(|v| Rational::reencode(v, denom, prior, id.name()))
        .transpose()
}

fn iso(value: Option<f64>) -> Result<Option<u16>> {
    let Some(v) = value else {
        return Ok(None);
    };
    let name = TagId::IsoSpeed.name();
    if !v.is_finite() || v.fract() != 0.0 {
        return Err(Error::encode(name, format!("{v} is not an integer")));
    }
    if !(0.0..=u16::MAX as f64).contains(&v) {
        return Err(Error::encode(name, format!("{v} is outside 0..=65535")));
    }
    Ok(Some(v as u16))
}

fn gps_version(value: &str) -> Result<Option<[u8; 4]>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let name = TagId::GpsVersion.name();
    let parts = value
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<u8>()
                .map_err(|_| Error::encode(name, format!("`{}` is not a number 0-255", p.trim())))
        })
        .collect::<Result<Vec<u8>>>()?;
    <[u8; 4]>::try_from(parts.as_slice())
        .map(Some)
        .map_err(|_| Error::encode(name, format!("expected 4 numbers, found {}", parts.len())))
}

fn coordinate(axis: Axis, value: Option<f64>, prior: &GpsTags) -> Result<Option<ExifCoordinate>> {
    let Some(v) = value else {
        return Ok(None);
    };
    let limit = axis.limit();
    if !(-limit..=limit).contains(&v) {
        let name = match axis {
            Axis::Latitude => TagId::GpsLatitude.name(),
            Axis::Longitude => TagId::GpsLongitude.name(),
        };
        return Err(Error::encode(name, format!("{v} is outside ±{limit}")));
    }
    if let Some(c) = prior.coordinate(axis) {
        if c.to_decimal().ok() == Some(v) && c.reference == axis.reference_for(v) {
            return Ok(Some(c));
        }
    }
    to_exif_coordinate(v, axis).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{decode, encode};

    fn sample_record() -> TagRecord {
        let mut record = TagRecord::default();
        record.image.make = Some("Canon".into());
        record.image.orientation = Some(Orientation::Rotate180);
        record.photo.exposure_time = Rational::new(1, 250);
        record.photo.iso = Some(800);
        record.photo.flash = Some(Flash::Fired);
        record
            .gps
            .set_coordinate(Axis::Latitude, to_exif_coordinate(-33.8688, Axis::Latitude).ok());
        record
            .gps
            .set_coordinate(Axis::Longitude, to_exif_coordinate(151.2093, Axis::Longitude).ok());
        record
    }

    #[test]
    fn unchanged_form_reproduces_the_record() {
        let record = sample_record();
        let (form, errors) = FormValues::from_record(&record);
        assert!(errors.is_empty());
        assert_eq!(form.apply(&record).unwrap(), record);
    }

    #[test]
    fn edited_values_use_fixed_denominators() {
        let record = sample_record();
        let (mut form, _) = FormValues::from_record(&record);
        form.exposure_time = Some(0.5);
        form.f_number = Some(2.8);
        form.focal_length = Some(23.0);
        form.gps_altitude = Some(35.5);
        let edited = form.apply(&record).unwrap();
        let et = edited.photo.exposure_time.unwrap();
        assert_eq!((et.num(), et.denom()), (500_000, 1_000_000));
        let f = edited.photo.f_number.unwrap();
        assert_eq!((f.num(), f.denom()), (280, 100));
        assert_eq!(edited.photo.focal_length, Rational::new(2300, 100));
        assert_eq!(edited.gps.altitude, Rational::new(3550, 100));
    }

    #[test]
    fn non_integer_iso_is_rejected() {
        let record = sample_record();
        let (mut form, _) = FormValues::from_record(&record);
        form.iso = Some(100.5);
        let err = form.apply(&record).unwrap_err();
        assert_eq!(
            err,
            Error::Encode {
                field: "ISOSpeedRatings",
                reason: "100.5 is not an integer".into()
            }
        );
        form.iso = Some(70_000.0);
        assert!(form.apply(&record).is_err());
    }

    #[test]
    fn invalid_enum_code_is_not_corrected() {
        let record = sample_record();
        let (mut form, _) = FormValues::from_record(&record);
        form.orientation = Some(2);
        assert!(matches!(
            form.apply(&record),
            Err(Error::Encode { field: "Orientation", .. })
        ));
    }

    #[test]
    fn gps_version_needs_four_bytes() {
        assert_eq!(gps_version("2,2,0,0").unwrap(), Some([2, 2, 0, 0]));
        assert_eq!(gps_version(" 2, 3 ,0,0 ").unwrap(), Some([2, 3, 0, 0]));
        assert_eq!(gps_version("").unwrap(), None);
        assert!(gps_version("2,2,0").is_err());
        assert!(gps_version("2,2,0,x").is_err());
        assert!(gps_version("2,2,0,256").is_err());
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let record = sample_record();
        let (mut form, _) = FormValues::from_record(&record);
        form.latitude = Some(91.0);
        assert!(matches!(
            form.apply(&record),
            Err(Error::Encode { field: "GPSLatitude", .. })
        ));
    }

    #[test]
    fn moved_coordinate_gets_reference_from_sign() {
        let record = sample_record();
        let (mut form, _) = FormValues::from_record(&record);
        form.latitude = Some(48.8584);
        form.longitude = Some(-2.2945);
        let edited = form.apply(&record).unwrap();
        assert_eq!(edited.gps.latitude_ref, Some('N'));
        assert_eq!(edited.gps.longitude_ref, Some('W'));
    }

    #[test]
    fn invalid_reference_leaves_coordinate_blank() {
        let mut record = sample_record();
        record.gps.latitude_ref = Some('Q');
        let (form, errors) = FormValues::from_record(&record);
        assert_eq!(errors, vec![Error::InvalidReference('Q')]);
        assert_eq!(form.latitude, None);
        assert!(form.longitude.is_some());
    }

    #[test]
    fn defaults_match_the_form_placeholders() {
        let form = FormValues::default().with_defaults();
        assert_eq!(form.orientation, Some(1));
        assert_eq!(form.exposure_time, Some(1.0));
        assert_eq!(form.iso, Some(100.0));
        assert_eq!(form.sensing_method, Some(1));
        assert_eq!(form.gps_version, "2,2,0,0");
        assert_eq!(form.latitude, None);
    }

    #[test]
    fn overlay_replaces_only_named_fields() {
        let record = sample_record();
        let (form, _) = FormValues::from_record(&record);
        let patch: toml::Table = toml::from_str("artist = \"Jo Bloggs\"\niso = 1600").unwrap();
        let form = form.overlay(patch).unwrap();
        assert_eq!(form.artist, "Jo Bloggs");
        assert_eq!(form.iso, Some(1600.0));
        assert_eq!(form.make, "Canon");

        let bad: toml::Table = toml::from_str("shutter = 3").unwrap();
        assert!(FormValues::default().overlay(bad).is_err());
    }

    #[test]
    fn eiffel_tower_scenario() {
        let prior = TagRecord::default();
        let form = FormValues {
            latitude: Some(48.8584),
            longitude: Some(2.2945),
            ..FormValues::default()
        };
        let blob = encode(&form.apply(&prior).unwrap()).unwrap();
        let decoded = decode(&blob).unwrap();
        let gps = &decoded.record.gps;
        assert_eq!(gps.latitude_ref, Some('N'));
        assert_eq!(gps.longitude_ref, Some('E'));
        let lat = gps.decimal(Axis::Latitude).unwrap().unwrap();
        let lon = gps.decimal(Axis::Longitude).unwrap().unwrap();
        assert!((lat - 48.8584).abs() <= 0.0000028);
        assert!((lon - 2.2945).abs() <= 0.0000028);
    }
}
