//! Default JPEG encoder with XMP metadata.
//!
//! Frames are encoded with the `image` crate. Creation date and location are
//! written as an XMP packet in an APP1 segment placed after the JFIF header,
//! which is where photo libraries look for them.

use crate::error::{FrameError, Result};
use bridge_traits::error::BridgeError;
use bridge_traits::{FrameImage, GeoLocation, ImageEncoder, ImageMetadata};
use bytes::Bytes;
use chrono::SecondsFormat;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use tracing::debug;

const SOI: [u8; 2] = [0xFF, 0xD8];
const APP0: [u8; 2] = [0xFF, 0xE0];
const APP1: [u8; 2] = [0xFF, 0xE1];

/// Namespace header that marks an APP1 segment as XMP.
pub const XMP_NAMESPACE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// Largest payload a JPEG segment can carry (the length field counts itself).
const MAX_SEGMENT_PAYLOAD: usize = u16::MAX as usize - 2;

/// [`ImageEncoder`] used when the host does not provide one.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegXmpEncoder;

impl JpegXmpEncoder {
    pub fn new() -> Self {
        Self
    }

    fn encode(
        &self,
        image: &FrameImage,
        metadata: Option<&ImageMetadata>,
        quality: f32,
    ) -> Result<Bytes> {
        let rgba = RgbaImage::from_raw(image.width, image.height, image.rgba.to_vec())
            .ok_or_else(|| {
                FrameError::Encoding(format!(
                    "pixel buffer of {} bytes does not match {}x{}",
                    image.rgba.len(),
                    image.width,
                    image.height
                ))
            })?;
        let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, jpeg_quality(quality))
            .encode_image(&rgb)
            .map_err(|e| FrameError::Encoding(e.to_string()))?;

        match metadata.filter(|metadata| !metadata.is_empty()) {
            Some(metadata) => {
                let packet = xmp_packet(metadata);
                debug!(bytes = packet.len(), "Embedding XMP packet");
                insert_xmp(&jpeg, packet.as_bytes()).map(Bytes::from)
            }
            None => Ok(Bytes::from(jpeg)),
        }
    }
}

impl ImageEncoder for JpegXmpEncoder {
    fn encode_jpeg(
        &self,
        image: &FrameImage,
        metadata: Option<&ImageMetadata>,
        quality: f32,
    ) -> bridge_traits::error::Result<Bytes> {
        self.encode(image, metadata, quality)
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))
    }
}

/// Map `0.0..=1.0` onto the encoder's `1..=100` scale.
fn jpeg_quality(quality: f32) -> u8 {
    let quality = if quality.is_nan() { 1.0 } else { quality };
    ((quality.clamp(0.0, 1.0) * 100.0).round() as u8).max(1)
}

/// Serialize `metadata` as an XMP packet.
pub fn xmp_packet(metadata: &ImageMetadata) -> String {
    let mut properties = Vec::new();

    if let Some(date) = metadata.creation_date {
        let date = date.to_rfc3339_opts(SecondsFormat::Secs, true);
        properties.push(format!("xmp:CreateDate=\"{}\"", date));
        properties.push(format!("photoshop:DateCreated=\"{}\"", date));
    }

    if let Some(location) = metadata.location {
        properties.extend(gps_properties(&location));
    }

    format!(
        concat!(
            "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n",
            "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n",
            " <rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n",
            "  <rdf:Description rdf:about=\"\"\n",
            "    xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\"\n",
            "    xmlns:photoshop=\"http://ns.adobe.com/photoshop/1.0/\"\n",
            "    xmlns:exif=\"http://ns.adobe.com/exif/1.0/\"\n",
            "    {}/>\n",
            " </rdf:RDF>\n",
            "</x:xmpmeta>\n",
            "<?xpacket end=\"w\"?>"
        ),
        properties.join("\n    ")
    )
}

fn gps_properties(location: &GeoLocation) -> Vec<String> {
    let mut properties = vec![
        format!(
            "exif:GPSLatitude=\"{}\"",
            gps_coordinate(location.latitude, 'N', 'S')
        ),
        format!(
            "exif:GPSLongitude=\"{}\"",
            gps_coordinate(location.longitude, 'E', 'W')
        ),
    ];

    if let Some(altitude) = location.altitude {
        let reference = if altitude < 0.0 { 1 } else { 0 };
        let tenths = (altitude.abs() * 10.0).round() as u64;
        properties.push(format!("exif:GPSAltitudeRef=\"{}\"", reference));
        properties.push(format!("exif:GPSAltitude=\"{}/10\"", tenths));
    }

    properties
}

/// XMP GPS coordinate, `DDD,MM.mmmmmmR`.
fn gps_coordinate(value: f64, positive: char, negative: char) -> String {
    let reference = if value < 0.0 { negative } else { positive };
    let value = value.abs();
    let degrees = value.trunc();
    let minutes = (value - degrees) * 60.0;
    format!("{},{:.6}{}", degrees as u32, minutes, reference)
}

/// Insert an XMP APP1 segment into `jpeg`, after SOI and any JFIF APP0.
pub fn insert_xmp(jpeg: &[u8], packet: &[u8]) -> Result<Vec<u8>> {
    if jpeg.len() < 4 || jpeg[..2] != SOI {
        return Err(FrameError::Encoding("not a JPEG stream".to_string()));
    }

    let payload_len = XMP_NAMESPACE.len() + packet.len();
    if payload_len > MAX_SEGMENT_PAYLOAD {
        return Err(FrameError::Encoding(format!(
            "XMP packet of {} bytes does not fit in one segment",
            packet.len()
        )));
    }

    let mut offset = SOI.len();
    if jpeg[2..4] == APP0 {
        let length = jpeg
            .get(4..6)
            .map(|len| u16::from_be_bytes([len[0], len[1]]) as usize)
            .ok_or_else(|| FrameError::Encoding("truncated APP0 segment".to_string()))?;
        offset += 2 + length;
        if offset > jpeg.len() {
            return Err(FrameError::Encoding("truncated APP0 segment".to_string()));
        }
    }

    let segment_len = (payload_len + 2) as u16;
    let mut out = Vec::with_capacity(jpeg.len() + payload_len + 4);
    out.extend_from_slice(&jpeg[..offset]);
    out.extend_from_slice(&APP1);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(XMP_NAMESPACE);
    out.extend_from_slice(packet);
    out.extend_from_slice(&jpeg[offset..]);
    Ok(out)
}

/// Extract the XMP packet from an encoded JPEG, if it has one.
pub fn read_xmp(jpeg: &[u8]) -> Option<String> {
    if jpeg.len() < 2 || jpeg[..2] != SOI {
        return None;
    }

    let mut offset = 2;
    while offset + 4 <= jpeg.len() {
        if jpeg[offset] != 0xFF {
            return None;
        }
        let marker = jpeg[offset + 1];
        // Start of scan: no more metadata segments
        if marker == 0xDA {
            return None;
        }
        let length = u16::from_be_bytes([jpeg[offset + 2], jpeg[offset + 3]]) as usize;
        let start = offset + 4;
        let end = (offset + 2 + length).min(jpeg.len());
        if marker == APP1[1] && start <= end && jpeg[start..end].starts_with(XMP_NAMESPACE) {
            let packet = &jpeg[start + XMP_NAMESPACE.len()..end];
            return String::from_utf8(packet.to_vec()).ok();
        }
        offset += 2 + length;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_gps_coordinate_format() {
        assert_eq!(gps_coordinate(47.37, 'N', 'S'), "47,22.200000N");
        assert_eq!(gps_coordinate(-122.5, 'E', 'W'), "122,30.000000W");
    }

    #[test]
    fn test_packet_contains_date_and_location() {
        let metadata = ImageMetadata::new(
            Some(Utc.with_ymd_and_hms(2019, 5, 1, 12, 0, 0).unwrap()),
            Some(GeoLocation::new(47.37, 8.54).with_altitude(408.25)),
        );
        let packet = xmp_packet(&metadata);

        assert!(packet.contains("photoshop:DateCreated=\"2019-05-01T12:00:00Z\""));
        assert!(packet.contains("exif:GPSLatitude=\"47,22.200000N\""));
        assert!(packet.contains("exif:GPSAltitude=\"4083/10\""));
        assert!(packet.contains("exif:GPSAltitudeRef=\"0\""));
    }

    #[test]
    fn test_insert_after_app0() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0xAA, 0xBB, 0xFF, 0xD9];
        let out = insert_xmp(&jpeg, b"<x/>").unwrap();

        assert_eq!(&out[..8], &jpeg[..8]);
        assert_eq!(&out[8..10], &APP1);
        assert_eq!(read_xmp(&out).as_deref(), Some("<x/>"));
        assert_eq!(&out[out.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_insert_rejects_non_jpeg() {
        assert!(insert_xmp(b"PNG....", b"<x/>").is_err());
    }

    #[test]
    fn test_insert_rejects_oversized_packet() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xD9];
        let packet = vec![b'x'; MAX_SEGMENT_PAYLOAD];
        assert!(insert_xmp(&jpeg, &packet).is_err());
    }

    #[test]
    fn test_quality_mapping() {
        assert_eq!(jpeg_quality(1.0), 100);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(0.85), 85);
        assert_eq!(jpeg_quality(7.0), 100);
    }

    #[test]
    fn test_mismatched_buffer_is_an_error() {
        let image = FrameImage::new(2, 2, vec![0u8; 3]);
        assert!(JpegXmpEncoder.encode_jpeg(&image, None, 1.0).is_err());
    }
}
