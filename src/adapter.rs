use std::io::Cursor;

use exif::{Context, Field, In, Tag, Value};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::options::{
    ExposureMode, Flash, LightSource, MeteringMode, Orientation, SensingMethod, WhiteBalance,
};
use crate::rational::Rational;
use crate::record::{GpsTags, ImageTags, PhotoTags, Section, TagId, TagRecord};

/// Identifier that prefixes the TIFF data inside a JPEG APP1 segment.
pub const EXIF_HEADER: &[u8] = b"Exif\0\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecodeStatus {
    /// The image carries no EXIF fields; there is nothing to edit yet.
    NoMetadataPresent,
    Loaded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One line of the human-readable dump: standard tag name and its value.
pub struct FlatEntry {
    pub tag: String,
    pub value: String,
}

/// Result of [`decode`]: the editable record plus everything needed to write
/// the image's metadata back without losing fields outside the schema.
#[derive(Debug)]
pub struct Decoded {
    pub record: TagRecord,
    pub status: DecodeStatus,
    /// Fields that could not be decoded. Each one is left absent in `record`.
    pub field_errors: Vec<Error>,
    pub flat: Vec<FlatEntry>,
    retained: Vec<Field>,
    thumbnail: Option<Vec<u8>>,
    little_endian: bool,
}

impl Decoded {
    fn empty() -> Self {
        Self {
            record: TagRecord::default(),
            status: DecodeStatus::NoMetadataPresent,
            field_errors: Vec::new(),
            flat: Vec::new(),
            retained: Vec::new(),
            thumbnail: None,
            little_endian: false,
        }
    }

    pub fn little_endian(&self) -> bool {
        self.little_endian
    }

    /// Number of fields outside the schema (primary image and thumbnail IFD)
    /// that are carried over on encode.
    pub fn retained_len(&self) -> usize {
        self.retained.len()
    }

    /// The embedded JPEG thumbnail, written back as the 1st IFD.
    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.thumbnail.as_deref()
    }

    /// Encodes `record` together with the retained fields, in the byte order
    /// of the original blob.
    pub fn encode(&self, record: &TagRecord) -> Result<Vec<u8>> {
        self.encode_as(record, self.little_endian)
    }

    pub fn encode_as(&self, record: &TagRecord, little_endian: bool) -> Result<Vec<u8>> {
        write_blob(record, &self.retained, self.thumbnail(), little_endian)
    }
}

/// Parses an EXIF blob (with or without the `Exif\0\0` prefix).
///
/// An empty blob is not an error: it yields an empty record with
/// [`DecodeStatus::NoMetadataPresent`]. A blob whose TIFF structure cannot be
/// parsed, or whose primary IFD yields no entry at all because it is
/// truncated or corrupt, fails with [`Error::Decode`]. Problems confined to a
/// single field are collected in [`Decoded::field_errors`].
pub fn decode(blob: &[u8]) -> Result<Decoded> {
    let tiff = blob.strip_prefix(EXIF_HEADER).unwrap_or(blob);
    if tiff.is_empty() {
        debug!("empty exif blob");
        return Ok(Decoded::empty());
    }

    let mut reader = exif::Reader::new();
    reader.continue_on_error(true);
    let mut field_errors = Vec::new();
    let exif = reader.read_raw(tiff.to_vec()).or_else(|e| {
        e.distill_partial_result(|errors| {
            for err in errors {
                warn!(%err, "skipping unreadable exif entry");
                field_errors.push(Error::decode(err.to_string()));
            }
        })
    })?;

    let mut decoded = Decoded::empty();
    decoded.little_endian = exif.little_endian();
    decoded.field_errors = field_errors;

    let mut thumbnail_fields = Vec::new();
    let mut broken_reference = [false; 2];
    for field in exif.fields() {
        if is_structural(field.tag) {
            continue;
        }
        if field.ifd_num == In::THUMBNAIL {
            thumbnail_fields.push(field);
            continue;
        }
        if field.ifd_num != In::PRIMARY {
            continue;
        }
        let id = section_of(field.tag.context()).and_then(|s| TagId::lookup(s, field.tag.number()));
        decoded.flat.push(FlatEntry {
            tag: id.map_or_else(|| field.tag.to_string(), |id| id.name().to_string()),
            value: field.display_value().to_string(),
        });
        match id {
            Some(id) => {
                if let Err(reason) = apply_field(&mut decoded.record, id, &field.value) {
                    warn!(tag = id.name(), %reason, "dropping undecodable field");
                    decoded.field_errors.push(Error::field_decode(id.name(), reason));
                    match id {
                        TagId::GpsLatitudeRef => broken_reference[0] = true,
                        TagId::GpsLongitudeRef => broken_reference[1] = true,
                        _ => {}
                    }
                }
            }
            None if matches!(field.value, Value::Unknown(..)) => {
                debug!(tag = %field.tag, "dropping field of unknown type");
            }
            None => decoded.retained.push(carry(field)),
        }
    }

    // A coordinate whose hemisphere is unreadable has no usable sign.
    let gps = &mut decoded.record.gps;
    if broken_reference[0] && gps.latitude.take().is_some() {
        decoded.field_errors.push(Error::field_decode(
            TagId::GpsLatitude.name(),
            "dropped with its unreadable reference letter",
        ));
    }
    if broken_reference[1] && gps.longitude.take().is_some() {
        decoded.field_errors.push(Error::field_decode(
            TagId::GpsLongitude.name(),
            "dropped with its unreadable reference letter",
        ));
    }

    if !thumbnail_fields.is_empty() {
        match thumbnail_jpeg(&exif) {
            Some(jpeg) => {
                decoded.retained.extend(
                    thumbnail_fields
                        .into_iter()
                        .filter(|f| !is_thumbnail_locator(f.tag))
                        .filter(|f| !matches!(f.value, Value::Unknown(..)))
                        .map(carry),
                );
                decoded.thumbnail = Some(jpeg);
            }
            None => debug!(
                fields = thumbnail_fields.len(),
                "dropping thumbnail IFD without JPEG data"
            ),
        }
    }

    if decoded.flat.is_empty() {
        if let Some(first) = decoded.field_errors.first() {
            return Err(Error::decode(format!(
                "primary IFD is unreadable ({} errors, first: {first})",
                decoded.field_errors.len()
            )));
        }
    } else {
        decoded.status = DecodeStatus::Loaded;
    }
    debug!(
        fields = decoded.flat.len(),
        retained = decoded.retained.len(),
        thumbnail = decoded.thumbnail.is_some(),
        errors = decoded.field_errors.len(),
        "decoded exif blob"
    );
    Ok(decoded)
}

/// Encodes `record` on its own, big-endian, as TIFF data without the
/// `Exif\0\0` prefix. An empty record encodes to an empty blob.
pub fn encode(record: &TagRecord) -> Result<Vec<u8>> {
    write_blob(record, &[], None, false)
}

fn write_blob(
    record: &TagRecord,
    retained: &[Field],
    thumbnail: Option<&[u8]>,
    little_endian: bool,
) -> Result<Vec<u8>> {
    let fields = record_fields(record)?;
    // The 1st IFD cannot be written without a 0th IFD in front of it.
    if fields.is_empty() && !retained.iter().any(|f| f.ifd_num == In::PRIMARY) {
        if thumbnail.is_some() {
            debug!("dropping thumbnail of an otherwise empty record");
        }
        return Ok(Vec::new());
    }

    let mut writer = exif::experimental::Writer::new();
    for field in fields.iter().chain(retained) {
        writer.push_field(field);
    }
    if let Some(jpeg) = thumbnail {
        writer.set_jpeg(jpeg, In::THUMBNAIL);
    }
    let mut buf = Cursor::new(Vec::new());
    writer
        .write(&mut buf, little_endian)
        .map_err(|e| Error::encode("record", e.to_string()))?;
    debug!(
        fields = fields.len(),
        retained = retained.len(),
        little_endian,
        "encoded exif blob"
    );
    Ok(buf.into_inner())
}

fn is_structural(tag: Tag) -> bool {
    tag == Tag::ExifIFDPointer || tag == Tag::GPSInfoIFDPointer || tag == Tag::InteropIFDPointer
}

// Rewritten by the writer from the thumbnail bytes.
fn is_thumbnail_locator(tag: Tag) -> bool {
    tag == Tag::JPEGInterchangeFormat || tag == Tag::JPEGInterchangeFormatLength
}

fn carry(field: &Field) -> Field {
    Field {
        tag: field.tag,
        ifd_num: field.ifd_num,
        value: field.value.clone(),
    }
}

/// JPEG thumbnail bytes referenced by the 1st IFD, if they lie inside the blob.
fn thumbnail_jpeg(exif: &exif::Exif) -> Option<Vec<u8>> {
    let locate = |tag| {
        exif.get_field(tag, In::THUMBNAIL)
            .and_then(|f| f.value.get_uint(0))
            .map(|v| v as usize)
    };
    let offset = locate(Tag::JPEGInterchangeFormat)?;
    let len = locate(Tag::JPEGInterchangeFormatLength)?;
    let data = offset
        .checked_add(len)
        .and_then(|end| exif.buf().get(offset..end));
    if data.is_none() {
        warn!(offset, len, "thumbnail data lies outside the exif blob");
    }
    data.map(<[u8]>::to_vec)
}

fn section_of(context: Context) -> Option<Section> {
    match context {
        Context::Tiff => Some(Section::Image),
        Context::Exif => Some(Section::Photo),
        Context::Gps => Some(Section::Gps),
        _ => None,
    }
}

fn context_of(section: Section) -> Context {
    match section {
        Section::Image => Context::Tiff,
        Section::Photo => Context::Exif,
        Section::Gps => Context::Gps,
    }
}

fn exif_tag(id: TagId) -> Tag {
    Tag(context_of(id.section()), id.number())
}

// Decoding helpers. Each returns the reason a field is unusable.

type FieldResult<T> = std::result::Result<T, String>;

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Byte(_) => "BYTE",
        Value::Ascii(_) => "ASCII",
        Value::Short(_) => "SHORT",
        Value::Long(_) => "LONG",
        Value::Rational(_) => "RATIONAL",
        Value::SByte(_) => "SBYTE",
        Value::Undefined(..) => "UNDEFINED",
        Value::SShort(_) => "SSHORT",
        Value::SLong(_) => "SLONG",
        Value::SRational(_) => "SRATIONAL",
        Value::Float(_) => "FLOAT",
        Value::Double(_) => "DOUBLE",
        _ => "unknown type",
    }
}

fn text(value: &Value) -> FieldResult<String> {
    match value {
        Value::Ascii(strings) => {
            let bytes = strings.first().map(Vec::as_slice).unwrap_or_default();
            String::from_utf8(bytes.to_vec()).map_err(|e| format!("invalid UTF-8 text: {e}"))
        }
        other => Err(format!("expected ASCII, found {}", value_kind(other))),
    }
}

fn short(value: &Value) -> FieldResult<u16> {
    let v = value
        .get_uint(0)
        .ok_or_else(|| format!("expected an integer, found {}", value_kind(value)))?;
    u16::try_from(v).map_err(|_| format!("{v} does not fit a SHORT"))
}

fn code<T>(value: &Value, coerce: fn(u16) -> T) -> FieldResult<T> {
    // Codes too large for a SHORT are as unknown as any other.
    let v = value
        .get_uint(0)
        .ok_or_else(|| format!("expected an integer, found {}", value_kind(value)))?;
    Ok(coerce(u16::try_from(v).unwrap_or(u16::MAX)))
}

fn rationals(value: &Value) -> FieldResult<Vec<Rational>> {
    match value {
        Value::Rational(v) => v.iter().map(Rational::try_from).collect(),
        other => Err(format!("expected RATIONAL, found {}", value_kind(other))),
    }
}

fn rational(value: &Value) -> FieldResult<Rational> {
    rationals(value)?
        .first()
        .copied()
        .ok_or_else(|| "empty RATIONAL".to_string())
}

fn triplet(value: &Value) -> FieldResult<[Rational; 3]> {
    let v = rationals(value)?;
    <[Rational; 3]>::try_from(v.as_slice())
        .map_err(|_| format!("expected 3 rationals, found {}", v.len()))
}

fn reference(value: &Value) -> FieldResult<Option<char>> {
    let text = text(value)?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(None),
        (Some(c), None) => Ok(Some(c)),
        _ => Err(format!("expected a single reference letter, found {text:?}")),
    }
}

fn version(value: &Value) -> FieldResult<[u8; 4]> {
    match value {
        Value::Byte(v) => <[u8; 4]>::try_from(v.as_slice())
            .map_err(|_| format!("expected 4 bytes, found {}", v.len())),
        other => Err(format!("expected BYTE, found {}", value_kind(other))),
    }
}

fn apply_field(record: &mut TagRecord, id: TagId, value: &Value) -> FieldResult<()> {
    let TagRecord { image, photo, gps } = record;
    match id {
        TagId::Make => image.make = Some(text(value)?),
        TagId::Model => image.model = Some(text(value)?),
        TagId::Orientation => image.orientation = Some(code(value, Orientation::coerce)?),
        TagId::Software => image.software = Some(text(value)?),
        TagId::DateTime => image.datetime = Some(text(value)?),
        TagId::Artist => image.artist = Some(text(value)?),
        TagId::Copyright => image.copyright = Some(text(value)?),
        TagId::ExposureTime => photo.exposure_time = Some(rational(value)?),
        TagId::FNumber => photo.f_number = Some(rational(value)?),
        TagId::IsoSpeed => photo.iso = Some(short(value)?),
        TagId::LightSource => photo.light_source = Some(code(value, LightSource::coerce)?),
        TagId::MeteringMode => photo.metering_mode = Some(code(value, MeteringMode::coerce)?),
        TagId::Flash => photo.flash = Some(code(value, Flash::coerce)?),
        TagId::FocalLength => photo.focal_length = Some(rational(value)?),
        TagId::SensingMethod => photo.sensing_method = Some(code(value, SensingMethod::coerce)?),
        TagId::ExposureMode => photo.exposure_mode = Some(code(value, ExposureMode::coerce)?),
        TagId::WhiteBalance => photo.white_balance = Some(code(value, WhiteBalance::coerce)?),
        TagId::LensModel => photo.lens_model = Some(text(value)?),
        TagId::GpsVersion => gps.version = Some(version(value)?),
        TagId::GpsLatitudeRef => gps.latitude_ref = reference(value)?,
        TagId::GpsLatitude => gps.latitude = Some(triplet(value)?),
        TagId::GpsLongitudeRef => gps.longitude_ref = reference(value)?,
        TagId::GpsLongitude => gps.longitude = Some(triplet(value)?),
        TagId::GpsAltitude => gps.altitude = Some(rational(value)?),
        TagId::GpsSpeed => gps.speed = Some(rational(value)?),
        TagId::GpsImgDirection => gps.img_direction = Some(rational(value)?),
        TagId::GpsDateStamp => gps.date_stamp = Some(text(value)?),
    }
    Ok(())
}

// Encoding helpers.

struct FieldSink(Vec<Field>);

impl FieldSink {
    fn push(&mut self, id: TagId, value: Value) {
        self.0.push(Field {
            tag: exif_tag(id),
            ifd_num: In::PRIMARY,
            value,
        });
    }

    fn text(&mut self, id: TagId, s: &Option<String>) -> Result<()> {
        if let Some(s) = s {
            if s.contains('\0') {
                return Err(Error::encode(id.name(), "text contains a NUL byte"));
            }
            self.push(id, Value::Ascii(vec![s.as_bytes().to_vec()]));
        }
        Ok(())
    }

    fn short(&mut self, id: TagId, v: Option<u16>) {
        if let Some(v) = v {
            self.push(id, Value::Short(vec![v]));
        }
    }

    fn rationals(&mut self, id: TagId, v: Option<&[Rational]>) {
        if let Some(v) = v {
            self.push(id, Value::Rational(v.iter().map(|&r| r.into()).collect()));
        }
    }

    fn reference(&mut self, id: TagId, c: Option<char>, allowed: [char; 2]) -> Result<()> {
        if let Some(c) = c {
            if !allowed.contains(&c) {
                return Err(Error::encode(
                    id.name(),
                    format!("`{c}` is not one of {}/{}", allowed[0], allowed[1]),
                ));
            }
            self.push(id, Value::Ascii(vec![vec![c as u8]]));
        }
        Ok(())
    }
}

fn record_fields(record: &TagRecord) -> Result<Vec<Field>> {
    let ImageTags {
        orientation,
        make,
        model,
        datetime,
        software,
        artist,
        copyright,
    } = &record.image;
    let PhotoTags {
        exposure_time,
        f_number,
        iso,
        white_balance,
        focal_length,
        flash,
        metering_mode,
        exposure_mode,
        light_source,
        sensing_method,
        lens_model,
    } = &record.photo;
    let GpsTags {
        version,
        latitude,
        latitude_ref,
        longitude,
        longitude_ref,
        altitude,
        speed,
        img_direction,
        date_stamp,
    } = &record.gps;

    let mut sink = FieldSink(Vec::new());

    sink.text(TagId::Make, make)?;
    sink.text(TagId::Model, model)?;
    sink.short(TagId::Orientation, orientation.map(Orientation::code));
    sink.text(TagId::Software, software)?;
    sink.text(TagId::DateTime, datetime)?;
    sink.text(TagId::Artist, artist)?;
    sink.text(TagId::Copyright, copyright)?;

    sink.rationals(TagId::ExposureTime, exposure_time.as_ref().map(std::slice::from_ref));
    sink.rationals(TagId::FNumber, f_number.as_ref().map(std::slice::from_ref));
    sink.short(TagId::IsoSpeed, *iso);
    sink.short(TagId::LightSource, light_source.map(LightSource::code));
    sink.short(TagId::MeteringMode, metering_mode.map(MeteringMode::code));
    sink.short(TagId::Flash, flash.map(Flash::code));
    sink.rationals(TagId::FocalLength, focal_length.as_ref().map(std::slice::from_ref));
    sink.short(TagId::SensingMethod, sensing_method.map(SensingMethod::code));
    sink.short(TagId::ExposureMode, exposure_mode.map(ExposureMode::code));
    sink.short(TagId::WhiteBalance, white_balance.map(WhiteBalance::code));
    sink.text(TagId::LensModel, lens_model)?;

    if let Some(v) = version {
        sink.push(TagId::GpsVersion, Value::Byte(v.to_vec()));
    }
    sink.reference(TagId::GpsLatitudeRef, *latitude_ref, ['N', 'S'])?;
    sink.rationals(TagId::GpsLatitude, latitude.as_ref().map(|t| t.as_slice()));
    sink.reference(TagId::GpsLongitudeRef, *longitude_ref, ['E', 'W'])?;
    sink.rationals(TagId::GpsLongitude, longitude.as_ref().map(|t| t.as_slice()));
    sink.rationals(TagId::GpsAltitude, altitude.as_ref().map(std::slice::from_ref));
    sink.rationals(TagId::GpsSpeed, speed.as_ref().map(std::slice::from_ref));
    sink.rationals(TagId::GpsImgDirection, img_direction.as_ref().map(std::slice::from_ref));
    sink.text(TagId::GpsDateStamp, date_stamp)?;

    Ok(sink.0)
}
