use serde::{Deserialize, Serialize};

use crate::coordinate::{Axis, ExifCoordinate};
use crate::error::Result;
use crate::options::{
    ExposureMode, Flash, LightSource, MeteringMode, Orientation, SensingMethod, WhiteBalance,
};
use crate::rational::Rational;

/// The three IFDs an edit session works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "0th")]
    Image,
    #[serde(rename = "Exif")]
    Photo,
    #[serde(rename = "GPS")]
    Gps,
}

macro_rules! tag_ids {
    ($($variant:ident = ($section:ident, $number:literal, $name:literal),)+) => {
        /// Every tag the editor understands, with its IFD, numeric identifier
        /// and standard EXIF name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum TagId {
            $($variant,)+
        }

        impl TagId {
            pub const ALL: &'static [TagId] = &[$(TagId::$variant,)+];

            pub fn section(self) -> Section {
                match self {
                    $(TagId::$variant => Section::$section,)+
                }
            }

            pub fn number(self) -> u16 {
                match self {
                    $(TagId::$variant => $number,)+
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(TagId::$variant => $name,)+
                }
            }

            pub fn lookup(section: Section, number: u16) -> Option<TagId> {
                match (section, number) {
                    $((Section::$section, $number) => Some(TagId::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

tag_ids! {
    Make = (Image, 0x010f, "Make"),
    Model = (Image, 0x0110, "Model"),
    Orientation = (Image, 0x0112, "Orientation"),
    Software = (Image, 0x0131, "Software"),
    DateTime = (Image, 0x0132, "DateTime"),
    Artist = (Image, 0x013b, "Artist"),
    Copyright = (Image, 0x8298, "Copyright"),
    ExposureTime = (Photo, 0x829a, "ExposureTime"),
    FNumber = (Photo, 0x829d, "FNumber"),
    IsoSpeed = (Photo, 0x8827, "ISOSpeedRatings"),
    LightSource = (Photo, 0x9208, "LightSource"),
    MeteringMode = (Photo, 0x9207, "MeteringMode"),
    Flash = (Photo, 0x9209, "Flash"),
    FocalLength = (Photo, 0x920a, "FocalLength"),
    SensingMethod = (Photo, 0xa217, "SensingMethod"),
    ExposureMode = (Photo, 0xa402, "ExposureMode"),
    WhiteBalance = (Photo, 0xa403, "WhiteBalance"),
    LensModel = (Photo, 0xa434, "LensModel"),
    GpsVersion = (Gps, 0x0000, "GPSVersionID"),
    GpsLatitudeRef = (Gps, 0x0001, "GPSLatitudeRef"),
    GpsLatitude = (Gps, 0x0002, "GPSLatitude"),
    GpsLongitudeRef = (Gps, 0x0003, "GPSLongitudeRef"),
    GpsLongitude = (Gps, 0x0004, "GPSLongitude"),
    GpsAltitude = (Gps, 0x0006, "GPSAltitude"),
    GpsSpeed = (Gps, 0x000d, "GPSSpeed"),
    GpsImgDirection = (Gps, 0x0011, "GPSImgDirection"),
    GpsDateStamp = (Gps, 0x001d, "GPSDateStamp"),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// 0th IFD fields.
pub struct ImageTags {
    pub orientation: Option<Orientation>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub datetime: Option<String>,
    pub software: Option<String>,
    pub artist: Option<String>,
    pub copyright: Option<String>,
}

impl ImageTags {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Exif IFD fields.
pub struct PhotoTags {
    pub exposure_time: Option<Rational>,
    pub f_number: Option<Rational>,
    pub iso: Option<u16>,
    pub white_balance: Option<WhiteBalance>,
    pub focal_length: Option<Rational>,
    pub flash: Option<Flash>,
    pub metering_mode: Option<MeteringMode>,
    pub exposure_mode: Option<ExposureMode>,
    pub light_source: Option<LightSource>,
    pub sensing_method: Option<SensingMethod>,
    pub lens_model: Option<String>,
}

impl PhotoTags {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// GPS IFD fields. Reference letters are kept exactly as read; they are
/// checked when a coordinate is converted to decimal degrees.
pub struct GpsTags {
    pub version: Option<[u8; 4]>,
    pub latitude: Option<[Rational; 3]>,
    pub latitude_ref: Option<char>,
    pub longitude: Option<[Rational; 3]>,
    pub longitude_ref: Option<char>,
    pub altitude: Option<Rational>,
    pub speed: Option<Rational>,
    pub img_direction: Option<Rational>,
    pub date_stamp: Option<String>,
}

impl GpsTags {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The stored coordinate on `axis`, if its triplet is present. A missing
    /// reference letter is read as the positive hemisphere.
    pub fn coordinate(&self, axis: Axis) -> Option<ExifCoordinate> {
        let (dms, reference) = match axis {
            Axis::Latitude => (self.latitude?, self.latitude_ref.unwrap_or('N')),
            Axis::Longitude => (self.longitude?, self.longitude_ref.unwrap_or('E')),
        };
        Some(ExifCoordinate { dms, reference })
    }

    /// Decimal degrees on `axis`; `None` when no coordinate is stored.
    pub fn decimal(&self, axis: Axis) -> Option<Result<f64>> {
        self.coordinate(axis).map(|c| c.to_decimal())
    }

    pub fn set_coordinate(&mut self, axis: Axis, coordinate: Option<ExifCoordinate>) {
        let (dms, reference) = match coordinate {
            Some(c) => (Some(c.dms), Some(c.reference)),
            None => (None, None),
        };
        match axis {
            Axis::Latitude => {
                self.latitude = dms;
                self.latitude_ref = reference;
            }
            Axis::Longitude => {
                self.longitude = dms;
                self.longitude_ref = reference;
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// In-memory EXIF metadata of one image. All three sections are always
/// present; a section without fields is empty rather than missing.
pub struct TagRecord {
    #[serde(rename = "0th", default)]
    pub image: ImageTags,
    #[serde(rename = "Exif", default)]
    pub photo: PhotoTags,
    #[serde(rename = "GPS", default)]
    pub gps: GpsTags,
}

impl TagRecord {
    pub fn is_empty(&self) -> bool {
        self.image.is_empty() && self.photo.is_empty() && self.gps.is_empty()
    }
}
