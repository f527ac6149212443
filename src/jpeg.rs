use img_parts::jpeg::{Jpeg, JpegSegment, markers};
use img_parts::{Bytes, ImageEXIF};
use tracing::debug;

use crate::adapter::EXIF_HEADER;
use crate::error::{Error, Result};

fn parse(image: &[u8]) -> Result<Jpeg> {
    Jpeg::from_bytes(Bytes::copy_from_slice(image)).map_err(|e| Error::Container(e.to_string()))
}

/// Returns the TIFF data of the image's EXIF APP1 segment, without the
/// `Exif\0\0` identifier. An image without one yields an empty blob.
pub fn extract_exif(image: &[u8]) -> Result<Vec<u8>> {
    let jpeg = parse(image)?;
    Ok(jpeg.exif().map(|b| b.to_vec()).unwrap_or_default())
}

/// Swaps the image's EXIF segment for `blob`, or drops it when `blob` is
/// empty. The compressed image data is copied through untouched.
///
/// The new APP1 segment goes right after any leading JFIF APP0 segments,
/// which also works for images with only a couple of segments.
pub fn embed_exif(image: &[u8], blob: &[u8]) -> Result<Vec<u8>> {
    let mut jpeg = parse(image)?;
    jpeg.set_exif(None);
    if !blob.is_empty() {
        let mut contents = Vec::with_capacity(EXIF_HEADER.len() + blob.len());
        contents.extend_from_slice(EXIF_HEADER);
        contents.extend_from_slice(blob);
        let segments = jpeg.segments_mut();
        let at = segments
            .iter()
            .take_while(|s| s.marker() == markers::APP0)
            .count();
        segments.insert(
            at,
            JpegSegment::new_with_contents(markers::APP1, Bytes::from(contents)),
        );
        debug!(bytes = blob.len(), position = at, "embedding exif segment");
    }
    Ok(jpeg.encoder().bytes().to_vec())
}
