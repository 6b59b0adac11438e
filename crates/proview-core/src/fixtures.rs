//! Byte-level builders for test inputs.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::new_rgb8(width, height), ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([90, 140, 200]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

// ---------------------------------------------------------------------------
// Layered documents
// ---------------------------------------------------------------------------

/// A solid-color layer: `(top, left, bottom, right)` bounds and an RGBA fill.
#[derive(Debug, Clone)]
pub struct TestLayer {
    name: String,
    unicode_name: Option<String>,
    bounds: (i32, i32, i32, i32),
    rgba: [u8; 4],
    opacity: u8,
    hidden: bool,
}

impl TestLayer {
    pub fn new(name: &str, bounds: (i32, i32, i32, i32), rgba: [u8; 4]) -> Self {
        Self {
            name: name.to_string(),
            unicode_name: None,
            bounds,
            rgba,
            opacity: 255,
            hidden: false,
        }
    }

    pub fn opacity(mut self, opacity: u8) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn unicode_name(mut self, name: &str) -> Self {
        self.unicode_name = Some(name.to_string());
        self
    }

    fn size(&self) -> (usize, usize) {
        let (top, left, bottom, right) = self.bounds;
        ((right - left) as usize, (bottom - top) as usize)
    }
}

/// RGB document builder.
#[derive(Debug, Clone)]
pub struct PsdBuilder {
    width: u32,
    height: u32,
    depth: u16,
    layers: Vec<TestLayer>,
    composite: Option<[u8; 3]>,
    rle: bool,
}

impl PsdBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 8,
            layers: Vec::new(),
            composite: Some([128, 128, 128]),
            rle: false,
        }
    }

    pub fn layer(mut self, layer: TestLayer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn composite(mut self, rgb: [u8; 3]) -> Self {
        self.composite = Some(rgb);
        self
    }

    pub fn no_composite(mut self) -> Self {
        self.composite = None;
        self
    }

    pub fn rle(mut self) -> Self {
        self.rle = true;
        self
    }

    pub fn depth(mut self, depth: u16) -> Self {
        self.depth = depth;
        self
    }

    fn bytes_per_sample(&self) -> usize {
        if self.depth == 16 {
            2
        } else {
            1
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"8BPS");
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&[0; 6]);
        out.extend_from_slice(&3u16.to_be_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.width.to_be_bytes());
        out.extend_from_slice(&self.depth.to_be_bytes());
        out.extend_from_slice(&3u16.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes()); // color mode data
        out.extend_from_slice(&0u32.to_be_bytes()); // image resources

        let section = self.layer_section();
        out.extend_from_slice(&(section.len() as u32).to_be_bytes());
        out.extend_from_slice(&section);

        if let Some(rgb) = self.composite {
            out.extend_from_slice(&self.merged_data(rgb));
        }
        out
    }

    fn layer_section(&self) -> Vec<u8> {
        if self.layers.is_empty() {
            return Vec::new();
        }
        let bps = self.bytes_per_sample();
        let mut info = Vec::new();
        info.extend_from_slice(&(self.layers.len() as i16).to_be_bytes());

        for layer in &self.layers {
            let (top, left, bottom, right) = layer.bounds;
            for v in [top, left, bottom, right] {
                info.extend_from_slice(&v.to_be_bytes());
            }
            let (w, h) = layer.size();
            info.extend_from_slice(&4u16.to_be_bytes());
            for id in [-1i16, 0, 1, 2] {
                info.extend_from_slice(&id.to_be_bytes());
                info.extend_from_slice(&((2 + w * h * bps) as u32).to_be_bytes());
            }
            info.extend_from_slice(b"8BIMnorm");
            info.push(layer.opacity);
            info.push(0);
            info.push(if layer.hidden { 0x02 } else { 0 });
            info.push(0);

            let extra = layer_extra(layer);
            info.extend_from_slice(&(extra.len() as u32).to_be_bytes());
            info.extend_from_slice(&extra);
        }

        for layer in &self.layers {
            let (w, h) = layer.size();
            for value in [layer.rgba[3], layer.rgba[0], layer.rgba[1], layer.rgba[2]] {
                info.extend_from_slice(&0u16.to_be_bytes());
                info.extend(std::iter::repeat(value).take(w * h * bps));
            }
        }
        if info.len() % 2 == 1 {
            info.push(0);
        }

        let mut section = Vec::new();
        section.extend_from_slice(&(info.len() as u32).to_be_bytes());
        section.extend_from_slice(&info);
        section.extend_from_slice(&0u32.to_be_bytes()); // global mask
        section
    }

    fn merged_data(&self, rgb: [u8; 3]) -> Vec<u8> {
        let row_len = self.width as usize * self.bytes_per_sample();
        let rows = self.height as usize;
        let mut out = Vec::new();

        if !self.rle {
            out.extend_from_slice(&0u16.to_be_bytes());
            for value in rgb {
                out.extend(std::iter::repeat(value).take(row_len * rows));
            }
            return out;
        }

        out.extend_from_slice(&1u16.to_be_bytes());
        let encoded: Vec<Vec<u8>> = rgb
            .iter()
            .flat_map(|&value| std::iter::repeat(pack_run(value, row_len)).take(rows))
            .collect();
        for row in &encoded {
            out.extend_from_slice(&(row.len() as u16).to_be_bytes());
        }
        for row in &encoded {
            out.extend_from_slice(row);
        }
        out
    }
}

fn layer_extra(layer: &TestLayer) -> Vec<u8> {
    let mut extra = Vec::new();
    extra.extend_from_slice(&0u32.to_be_bytes()); // mask
    extra.extend_from_slice(&0u32.to_be_bytes()); // blending ranges

    let name = layer.name.as_bytes();
    extra.push(name.len() as u8);
    extra.extend_from_slice(name);
    while (extra.len() - 8) % 4 != 0 {
        extra.push(0);
    }

    if let Some(unicode) = &layer.unicode_name {
        let units: Vec<u16> = unicode.encode_utf16().collect();
        let mut data = Vec::new();
        data.extend_from_slice(&(units.len() as u32).to_be_bytes());
        for unit in &units {
            data.extend_from_slice(&unit.to_be_bytes());
        }
        extra.extend_from_slice(b"8BIMluni");
        extra.extend_from_slice(&(data.len() as u32).to_be_bytes());
        extra.extend_from_slice(&data);
    }
    extra
}

/// PackBits encoding of `len` copies of `value`.
fn pack_run(value: u8, len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(128);
        out.push((1 - n as i16) as i8 as u8);
        out.push(value);
        remaining -= n;
    }
    out
}

// ---------------------------------------------------------------------------
// Tag-table layouts (TIFF files and EXIF blocks)
// ---------------------------------------------------------------------------

/// A directory entry value.
#[derive(Debug, Clone)]
pub enum TagValue {
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    /// Offset of the sub-directory at this index
    SubIfd(usize),
    /// Offset of the trailing data block
    TrailerOffset,
}

/// Little-endian tag-table file: IFD0, optional sub-directories, trailing data.
#[derive(Debug, Clone, Default)]
pub struct TiffLayout {
    pub ifd0: Vec<(u16, TagValue)>,
    pub sub_ifds: Vec<Vec<(u16, TagValue)>>,
    pub trailer: Vec<u8>,
}

impl TiffLayout {
    pub fn build(&self) -> Vec<u8> {
        let mut ifds: Vec<Vec<(u16, TagValue)>> = vec![self.ifd0.clone()];
        ifds.extend(self.sub_ifds.iter().cloned());
        for ifd in &mut ifds {
            ifd.sort_by_key(|(tag, _)| *tag);
        }

        // Directory offsets: each IFD is followed by its out-of-line values.
        let mut offsets = Vec::with_capacity(ifds.len());
        let mut cursor = 8usize;
        for ifd in &ifds {
            offsets.push(cursor);
            cursor += 2 + 12 * ifd.len() + 4;
            cursor += ifd.iter().map(|(_, v)| padded(out_of_line_len(v))).sum::<usize>();
        }
        let trailer_offset = cursor;

        let mut out = Vec::with_capacity(cursor + self.trailer.len());
        out.extend_from_slice(b"II");
        out.extend_from_slice(&42u16.to_le_bytes());
        out.extend_from_slice(&8u32.to_le_bytes());

        for (ifd, &start) in ifds.iter().zip(&offsets) {
            let mut extra_at = start + 2 + 12 * ifd.len() + 4;
            let mut extra = Vec::new();
            out.extend_from_slice(&(ifd.len() as u16).to_le_bytes());
            for (tag, value) in ifd {
                let (kind, count, payload) = encode_value(value, &offsets, trailer_offset);
                out.extend_from_slice(&tag.to_le_bytes());
                out.extend_from_slice(&kind.to_le_bytes());
                out.extend_from_slice(&count.to_le_bytes());
                if payload.len() <= 4 {
                    let mut inline = payload.clone();
                    inline.resize(4, 0);
                    out.extend_from_slice(&inline);
                } else {
                    out.extend_from_slice(&(extra_at as u32).to_le_bytes());
                    extra.extend_from_slice(&payload);
                    if payload.len() % 2 == 1 {
                        extra.push(0);
                    }
                    extra_at += padded(payload.len());
                }
            }
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&extra);
        }
        out.extend_from_slice(&self.trailer);
        out
    }
}

fn padded(len: usize) -> usize {
    len + len % 2
}

fn out_of_line_len(value: &TagValue) -> usize {
    let len = encode_value(value, &[], 0).2.len();
    if len > 4 {
        len
    } else {
        0
    }
}

fn encode_value(value: &TagValue, offsets: &[usize], trailer: usize) -> (u16, u32, Vec<u8>) {
    match value {
        TagValue::Ascii(s) => {
            let mut bytes = s.as_bytes().to_vec();
            bytes.push(0);
            (2, bytes.len() as u32, bytes)
        }
        TagValue::Short(values) => (
            3,
            values.len() as u32,
            values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        ),
        TagValue::Long(values) => (
            4,
            values.len() as u32,
            values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        ),
        TagValue::Rational(values) => (
            5,
            values.len() as u32,
            values
                .iter()
                .flat_map(|(n, d)| n.to_le_bytes().into_iter().chain(d.to_le_bytes()))
                .collect(),
        ),
        TagValue::SubIfd(index) => {
            // Offsets are unknown while measuring; the length is what matters then.
            let offset = offsets.get(index + 1).copied().unwrap_or(0) as u32;
            (4, 1, offset.to_le_bytes().to_vec())
        }
        TagValue::TrailerOffset => (4, 1, (trailer as u32).to_le_bytes().to_vec()),
    }
}

/// Uncompressed strip-based TIFF with a solid fill.
#[derive(Debug, Clone)]
pub struct TiffBuilder {
    width: u32,
    height: u32,
    samples_per_pixel: u16,
    compression: u16,
    resolution: Option<(u32, u32)>,
    orientation: Option<u16>,
    signed: bool,
    fill: u8,
}

impl TiffBuilder {
    pub fn rgb(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            samples_per_pixel: 3,
            compression: 1,
            resolution: None,
            orientation: None,
            signed: false,
            fill: 180,
        }
    }

    pub fn gray(width: u32, height: u32) -> Self {
        Self {
            samples_per_pixel: 1,
            ..Self::rgb(width, height)
        }
    }

    /// Declare a compression scheme without changing the stored bytes.
    pub fn compression(mut self, compression: u16) -> Self {
        self.compression = compression;
        self
    }

    pub fn resolution(mut self, dpi: u32) -> Self {
        self.resolution = Some((dpi, 1));
        self
    }

    pub fn orientation(mut self, orientation: u16) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }

    /// Mark samples as two's-complement integers (SampleFormat 2).
    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let spp = self.samples_per_pixel;
        let strip_len = (self.width * self.height) as usize * spp as usize;
        let photometric = if spp == 1 { 1 } else { 2 };

        let mut ifd0 = vec![
            (256, TagValue::Long(vec![self.width])),
            (257, TagValue::Long(vec![self.height])),
            (258, TagValue::Short(vec![8; spp as usize])),
            (259, TagValue::Short(vec![self.compression])),
            (262, TagValue::Short(vec![photometric])),
            (273, TagValue::TrailerOffset),
            (277, TagValue::Short(vec![spp])),
            (278, TagValue::Long(vec![self.height])),
            (279, TagValue::Long(vec![strip_len as u32])),
        ];
        if let Some(orientation) = self.orientation {
            ifd0.push((274, TagValue::Short(vec![orientation])));
        }
        if self.signed {
            ifd0.push((339, TagValue::Short(vec![2; spp as usize])));
        }
        if let Some(res) = self.resolution {
            ifd0.push((282, TagValue::Rational(vec![res])));
            ifd0.push((283, TagValue::Rational(vec![res])));
            ifd0.push((296, TagValue::Short(vec![2])));
        }

        TiffLayout {
            ifd0,
            sub_ifds: Vec::new(),
            trailer: vec![self.fill; strip_len],
        }
        .build()
    }
}

/// JPEG carrying an APP1 EXIF block.
#[derive(Debug, Clone, Default)]
pub struct ExifJpegBuilder {
    make: Option<String>,
    model: Option<String>,
    orientation: Option<u16>,
    f_number: Option<(u32, u32)>,
    exposure: Option<(u32, u32)>,
    iso: Option<u16>,
    focal_length: Option<(u32, u32)>,
    date_time_original: Option<String>,
    gps: Option<((u32, u32, u32), char, (u32, u32, u32), char)>,
}

impl ExifJpegBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera(mut self, make: &str, model: &str) -> Self {
        self.make = Some(make.to_string());
        self.model = Some(model.to_string());
        self
    }

    pub fn orientation(mut self, orientation: u16) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn f_number(mut self, num: u32, den: u32) -> Self {
        self.f_number = Some((num, den));
        self
    }

    pub fn exposure(mut self, num: u32, den: u32) -> Self {
        self.exposure = Some((num, den));
        self
    }

    pub fn iso(mut self, iso: u16) -> Self {
        self.iso = Some(iso);
        self
    }

    pub fn focal_length(mut self, num: u32, den: u32) -> Self {
        self.focal_length = Some((num, den));
        self
    }

    pub fn date_time_original(mut self, value: &str) -> Self {
        self.date_time_original = Some(value.to_string());
        self
    }

    /// Whole-degree/minute/second coordinates with hemisphere references.
    pub fn gps(mut self, lat: (u32, u32, u32), lat_ref: char, lon: (u32, u32, u32), lon_ref: char) -> Self {
        self.gps = Some((lat, lat_ref, lon, lon_ref));
        self
    }

    pub fn tiff_block(&self) -> Vec<u8> {
        let mut ifd0 = Vec::new();
        if let Some(make) = &self.make {
            ifd0.push((0x010F, TagValue::Ascii(make.clone())));
        }
        if let Some(model) = &self.model {
            ifd0.push((0x0110, TagValue::Ascii(model.clone())));
        }
        if let Some(orientation) = self.orientation {
            ifd0.push((0x0112, TagValue::Short(vec![orientation])));
        }

        let mut exif = Vec::new();
        if let Some(exposure) = self.exposure {
            exif.push((0x829A, TagValue::Rational(vec![exposure])));
        }
        if let Some(f) = self.f_number {
            exif.push((0x829D, TagValue::Rational(vec![f])));
        }
        if let Some(iso) = self.iso {
            exif.push((0x8827, TagValue::Short(vec![iso])));
        }
        if let Some(dt) = &self.date_time_original {
            exif.push((0x9003, TagValue::Ascii(dt.clone())));
        }
        if let Some(focal) = self.focal_length {
            exif.push((0x920A, TagValue::Rational(vec![focal])));
        }

        let mut sub_ifds = Vec::new();
        if !exif.is_empty() {
            ifd0.push((0x8769, TagValue::SubIfd(sub_ifds.len())));
            sub_ifds.push(exif);
        }
        if let Some((lat, lat_ref, lon, lon_ref)) = self.gps {
            let dms = |(d, m, s): (u32, u32, u32)| TagValue::Rational(vec![(d, 1), (m, 1), (s, 1)]);
            ifd0.push((0x8825, TagValue::SubIfd(sub_ifds.len())));
            sub_ifds.push(vec![
                (1, TagValue::Ascii(lat_ref.to_string())),
                (2, dms(lat)),
                (3, TagValue::Ascii(lon_ref.to_string())),
                (4, dms(lon)),
            ]);
        }

        TiffLayout {
            ifd0,
            sub_ifds,
            trailer: Vec::new(),
        }
        .build()
    }

    pub fn build(&self, width: u32, height: u32) -> Vec<u8> {
        let jpeg = jpeg_bytes(width, height);
        let tiff = self.tiff_block();

        let mut out = Vec::with_capacity(jpeg.len() + tiff.len() + 10);
        out.extend_from_slice(&jpeg[..2]); // SOI
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(&tiff);
        out.extend_from_slice(&jpeg[2..]);
        out
    }
}
