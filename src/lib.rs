pub mod adapter;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod form;
pub mod jpeg;
pub mod options;
pub mod rational;
pub mod record;

pub use adapter::{DecodeStatus, Decoded, FlatEntry, decode, encode};
pub use coordinate::{Axis, ExifCoordinate, from_exif_coordinate, to_exif_coordinate};
pub use error::{Error, Result};
pub use form::FormValues;
pub use rational::Rational;
pub use record::{GpsTags, ImageTags, PhotoTags, Section, TagId, TagRecord};
