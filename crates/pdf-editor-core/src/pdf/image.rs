//! Image overlay operator.
//!
//! PNG images are decoded and re-embedded as raw samples (alpha becomes an
//! `SMask`); JPEG images are embedded as-is behind a `DCTDecode` filter.
//! Placement uses PDF page space: origin at the bottom-left corner, Y up.

use std::fmt;
use std::str::FromStr;

use image::GenericImageView;
use lopdf::{Dictionary, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use super::content::{append_content, register_resource};
use super::document::PdfDocument;

/// Image formats the overlay operator can embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Interpret a declared kind: a bare format name (`png`, `jpg`, `jpeg`) or
    /// a MIME type (`image/png`, `image/jpeg`). Case-insensitive.
    pub fn from_declared(kind: &str) -> Result<Self> {
        let normalized = kind.trim().to_ascii_lowercase();
        let format = normalized.strip_prefix("image/").unwrap_or(&normalized);

        match format {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" | "pjpeg" => Ok(Self::Jpeg),
            _ => Err(Error::UnsupportedImageKind(kind.to_string())),
        }
    }

    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

impl FromStr for ImageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_declared(s)
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// Target rectangle in PDF page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle of the given width whose height keeps the aspect ratio of a
    /// `(width, height)` pixel size.
    #[allow(clippy::cast_precision_loss)]
    pub fn scale_to_width(x: f32, y: f32, width: f32, (px_width, px_height): (u32, u32)) -> Self {
        let height = if px_width == 0 {
            0.0
        } else {
            width * px_height as f32 / px_width as f32
        };
        Self::new(x, y, width, height)
    }

    /// Reject non-finite coordinates and non-positive sizes.
    pub fn validate(&self) -> Result<()> {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(Error::InvalidOverlayGeometry(format!(
                "coordinates must be finite, got {self:?}"
            )));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(Error::InvalidOverlayGeometry(format!(
                "width and height must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Pixel dimensions of an encoded image, read without embedding it.
pub fn image_dimensions(bytes: &[u8], kind: ImageKind) -> Result<(u32, u32)> {
    match kind {
        ImageKind::Png => image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .map(|img| img.dimensions())
            .map_err(Error::image_parse),
        ImageKind::Jpeg => parse_jpeg_header(bytes).map(|h| (h.width, h.height)),
    }
}

/// Draw an image onto one page of a PDF and return the new PDF bytes.
pub fn overlay_image(
    pdf_bytes: &[u8],
    image_bytes: &[u8],
    kind: ImageKind,
    page_num: usize,
    rect: Rect,
) -> Result<Vec<u8>> {
    rect.validate()?;

    let mut pdf = PdfDocument::load(pdf_bytes)?;
    let page_id = pdf.page(page_num)?;

    let xobject = match kind {
        ImageKind::Png => png_xobject(image_bytes)?,
        ImageKind::Jpeg => jpeg_xobject(image_bytes)?,
    };

    let doc = pdf.inner_mut();
    let image_id = embed_xobject(doc, xobject);
    let name = register_resource(doc, page_id, "XObject", "Im", image_id)?;

    let content = format!(
        "q\n{} 0 0 {} {} {} cm\n/{name} Do\nQ\n",
        rect.width, rect.height, rect.x, rect.y
    );
    append_content(doc, page_id, content.into_bytes())?;

    debug!(
        "Placed {kind} image as /{name} on page {page_num} at ({}, {}) {}x{}",
        rect.x, rect.y, rect.width, rect.height
    );

    pdf.save()
}

/// Image XObject ready to be added to a document, with its optional soft mask.
struct ImageXObject {
    image: Stream,
    soft_mask: Option<Stream>,
}

fn embed_xobject(doc: &mut lopdf::Document, xobject: ImageXObject) -> ObjectId {
    let ImageXObject { mut image, soft_mask } = xobject;

    if let Some(mask) = soft_mask {
        let mask_id = doc.add_object(Object::Stream(mask));
        image.dict.set("SMask", Object::Reference(mask_id));
    }

    doc.add_object(Object::Stream(image))
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(i64::from(width))),
        ("Height", Object::Integer(i64::from(height))),
        ("ColorSpace", Object::Name(color_space.as_bytes().to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
    ])
}

fn png_xobject(bytes: &[u8]) -> Result<ImageXObject> {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(Error::image_parse)?;
    let (width, height) = img.dimensions();

    let (color_space, samples, alpha) = match img.color() {
        image::ColorType::L8 | image::ColorType::L16 => {
            ("DeviceGray", img.to_luma8().into_raw(), None)
        }
        image::ColorType::La8 | image::ColorType::La16 => {
            let luma_alpha = img.to_luma_alpha8();
            let (gray, alpha): (Vec<u8>, Vec<u8>) =
                luma_alpha.pixels().map(|p| (p.0[0], p.0[1])).unzip();
            ("DeviceGray", gray, Some(alpha))
        }
        image::ColorType::Rgba8 | image::ColorType::Rgba16 | image::ColorType::Rgba32F => {
            let rgba = img.to_rgba8();
            let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
            let mut alpha = Vec::with_capacity(rgba.len() / 4);
            for pixel in rgba.pixels() {
                rgb.extend_from_slice(&pixel.0[..3]);
                alpha.push(pixel.0[3]);
            }
            ("DeviceRGB", rgb, Some(alpha))
        }
        _ => ("DeviceRGB", img.to_rgb8().into_raw(), None),
    };

    // Fully opaque alpha channels are dropped rather than embedded.
    let alpha = alpha.filter(|a| a.iter().any(|&v| v != u8::MAX));

    let image = Stream::new(image_dict(width, height, color_space), samples).with_compression(true);
    let soft_mask = alpha.map(|mask| {
        Stream::new(image_dict(width, height, "DeviceGray"), mask).with_compression(true)
    });

    Ok(ImageXObject { image, soft_mask })
}

fn jpeg_xobject(bytes: &[u8]) -> Result<ImageXObject> {
    let header = parse_jpeg_header(bytes)?;

    let color_space = match header.components {
        1 => "DeviceGray",
        4 => "DeviceCMYK",
        _ => "DeviceRGB",
    };

    let mut dict = image_dict(header.width, header.height, color_space);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    if header.components == 4 {
        // Adobe CMYK JPEGs store inverted samples.
        dict.set(
            "Decode",
            Object::Array([1, 0, 1, 0, 1, 0, 1, 0].into_iter().map(Object::Integer).collect()),
        );
    }

    let image = Stream::new(dict, bytes.to_vec()).with_compression(false);
    Ok(ImageXObject {
        image,
        soft_mask: None,
    })
}

/// Frame header fields needed to describe a JPEG to a PDF reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    width: u32,
    height: u32,
    components: u8,
}

/// Scan JPEG markers up to the first start-of-frame segment.
fn parse_jpeg_header(data: &[u8]) -> Result<JpegHeader> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(Error::image_parse("not a JPEG (missing SOI marker)"));
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = data[pos + 1];
        pos += 2;

        match marker {
            // Fill bytes and stuffed zeros.
            0xFF | 0x00 => {
                pos -= 1;
                continue;
            }
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => break,
            // Every SOFn except DHT, JPG and DAC.
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let Some(frame) = data.get(pos..pos + 8) else {
                    break;
                };
                let height = u32::from(u16::from_be_bytes([frame[3], frame[4]]));
                let width = u32::from(u16::from_be_bytes([frame[5], frame[6]]));
                let components = frame[7];

                if width == 0 || height == 0 {
                    return Err(Error::image_parse("JPEG frame has zero size"));
                }
                return Ok(JpegHeader {
                    width,
                    height,
                    components,
                });
            }
            _ => {
                let Some(len) = data.get(pos..pos + 2) else {
                    break;
                };
                pos += usize::from(u16::from_be_bytes([len[0], len[1]]));
            }
        }
    }

    Err(Error::image_parse("JPEG has no frame header"))
}
