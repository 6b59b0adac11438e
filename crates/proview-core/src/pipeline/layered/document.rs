//! Structural parser for layered (PSD) documents.
//!
//! Parsing is cheap: it walks the section lengths, reads the layer records
//! and keeps borrowed slices of each channel's pixel data. Pixel decoding
//! happens later in [`super::composite`], so the metadata path never pays
//! for it.

use crate::error::{DecodeError, DecodeResult};

const SIGNATURE: &[u8; 4] = b"8BPS";
const BLEND_SIGNATURE: &[u8; 4] = b"8BIM";
const BLEND_SIGNATURE_64: &[u8; 4] = b"8B64";
const MAX_CHANNELS: u16 = 56;

/// Document color mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Bitmap,
    Grayscale,
    Indexed,
    Rgb,
    Cmyk,
    Multichannel,
    Duotone,
    Lab,
    Other(u16),
}

impl ColorMode {
    fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::Bitmap,
            1 => Self::Grayscale,
            2 => Self::Indexed,
            3 => Self::Rgb,
            4 => Self::Cmyk,
            7 => Self::Multichannel,
            8 => Self::Duotone,
            9 => Self::Lab,
            other => Self::Other(other),
        }
    }

    pub fn name(self) -> String {
        match self {
            Self::Bitmap => "Bitmap".to_string(),
            Self::Grayscale => "Grayscale".to_string(),
            Self::Indexed => "Indexed".to_string(),
            Self::Rgb => "RGB".to_string(),
            Self::Cmyk => "CMYK".to_string(),
            Self::Multichannel => "Multichannel".to_string(),
            Self::Duotone => "Duotone".to_string(),
            Self::Lab => "Lab".to_string(),
            Self::Other(n) => format!("Unknown({n})"),
        }
    }

    /// Number of color (non-alpha) channels, for the modes that can be rendered.
    pub fn color_channels(self) -> Option<usize> {
        match self {
            Self::Grayscale | Self::Duotone => Some(1),
            Self::Rgb => Some(3),
            Self::Cmyk => Some(4),
            _ => None,
        }
    }
}

/// Fixed-size file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsdHeader {
    pub channels: u16,
    pub height: u32,
    pub width: u32,
    pub depth: u16,
    pub color_mode: ColorMode,
}

/// One channel of a layer: id (0.. color, -1 transparency, -2/-3 masks) and
/// its raw data including the 2-byte compression prefix.
#[derive(Debug, Clone, Copy)]
pub struct LayerChannel<'a> {
    pub id: i16,
    pub data: &'a [u8],
}

/// One layer record with its channel data.
#[derive(Debug, Clone)]
pub struct LayerRecord<'a> {
    pub name: String,
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub opacity: u8,
    pub hidden: bool,
    pub channels: Vec<LayerChannel<'a>>,
}

impl LayerRecord<'_> {
    pub fn width(&self) -> u32 {
        (self.right as i64 - self.left as i64).clamp(0, u32::MAX as i64) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom as i64 - self.top as i64).clamp(0, u32::MAX as i64) as u32
    }

    /// Whether the layer covers any pixels (group dividers do not).
    pub fn has_area(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    pub fn channel(&self, id: i16) -> Option<&LayerChannel<'_>> {
        self.channels.iter().find(|c| c.id == id)
    }
}

/// A parsed document, borrowing from the input bytes.
#[derive(Debug, Clone)]
pub struct PsdDocument<'a> {
    pub header: PsdHeader,
    /// Layer records, bottom-most first
    pub layers: Vec<LayerRecord<'a>>,
    /// The first extra channel of the merged image is transparency
    pub merged_alpha: bool,
    /// Merged image data section (compression prefix included), if present
    pub composite: Option<&'a [u8]>,
}

impl<'a> PsdDocument<'a> {
    /// Parse the document structure.
    pub fn parse(bytes: &'a [u8]) -> DecodeResult<Self> {
        let mut r = ByteReader::new(bytes);
        let header = parse_header(&mut r)?;

        let color_data_len = r.u32()? as usize;
        r.skip(color_data_len, "color mode data")?;
        let resources_len = r.u32()? as usize;
        r.skip(resources_len, "image resources")?;

        let layer_section_len = r.u32()? as usize;
        let layer_section = r.take(layer_section_len, "layer and mask info")?;
        let (layers, merged_alpha) = parse_layer_section(layer_section)?;

        let rest = r.rest();
        let composite = if rest.len() > 2 { Some(rest) } else { None };

        Ok(Self {
            header,
            layers,
            merged_alpha,
            composite,
        })
    }

    /// Layers that cover pixels.
    pub fn drawable_layers(&self) -> impl Iterator<Item = &LayerRecord<'a>> {
        self.layers.iter().filter(|l| l.has_area())
    }
}

/// Parse only the fixed header.
pub fn parse_header_only(bytes: &[u8]) -> DecodeResult<PsdHeader> {
    parse_header(&mut ByteReader::new(bytes))
}

fn parse_header(r: &mut ByteReader<'_>) -> DecodeResult<PsdHeader> {
    if r.take(4, "signature")? != SIGNATURE {
        return Err(DecodeError::Malformed("missing 8BPS signature".into()));
    }
    match r.u16()? {
        1 => {}
        2 => return Err(DecodeError::Unsupported("large document (PSB) format".into())),
        v => return Err(DecodeError::Malformed(format!("unknown version {v}"))),
    }
    r.skip(6, "reserved")?;

    let channels = r.u16()?;
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(DecodeError::Malformed(format!("invalid channel count {channels}")));
    }
    let height = r.u32()?;
    let width = r.u32()?;
    if width == 0 || height == 0 {
        return Err(DecodeError::Malformed("zero document dimensions".into()));
    }
    let depth = r.u16()?;
    let color_mode = ColorMode::from_u16(r.u16()?);

    Ok(PsdHeader {
        channels,
        height,
        width,
        depth,
        color_mode,
    })
}

fn parse_layer_section(section: &[u8]) -> DecodeResult<(Vec<LayerRecord<'_>>, bool)> {
    if section.is_empty() {
        return Ok((Vec::new(), false));
    }
    let mut r = ByteReader::new(section);
    let info_len = r.u32()? as usize;
    if info_len == 0 {
        return Ok((Vec::new(), false));
    }
    let info = r.take(info_len, "layer info")?;
    let mut r = ByteReader::new(info);

    let raw_count = r.i16()?;
    let merged_alpha = raw_count < 0;
    let count = raw_count.unsigned_abs() as usize;

    let mut records = Vec::with_capacity(count);
    let mut channel_lengths = Vec::with_capacity(count);
    for _ in 0..count {
        let (record, lengths) = parse_layer_record(&mut r)?;
        records.push(record);
        channel_lengths.push(lengths);
    }

    // Channel image data follows all records, in the same order.
    for (record, lengths) in records.iter_mut().zip(channel_lengths) {
        for (id, len) in lengths {
            let data = r.take(len, "layer channel data")?;
            record.channels.push(LayerChannel { id, data });
        }
    }

    Ok((records, merged_alpha))
}

fn parse_layer_record<'a>(r: &mut ByteReader<'a>) -> DecodeResult<(LayerRecord<'a>, Vec<(i16, usize)>)> {
    let top = r.i32()?;
    let left = r.i32()?;
    let bottom = r.i32()?;
    let right = r.i32()?;

    let channel_count = r.u16()?;
    if channel_count > MAX_CHANNELS {
        return Err(DecodeError::Malformed(format!(
            "layer has {channel_count} channels"
        )));
    }
    let mut lengths = Vec::with_capacity(channel_count as usize);
    for _ in 0..channel_count {
        let id = r.i16()?;
        let len = r.u32()? as usize;
        lengths.push((id, len));
    }

    if r.take(4, "blend signature")? != BLEND_SIGNATURE {
        return Err(DecodeError::Malformed("bad blend mode signature".into()));
    }
    r.skip(4, "blend mode key")?;
    let opacity = r.u8()?;
    r.skip(1, "clipping")?;
    let flags = r.u8()?;
    r.skip(1, "filler")?;

    let extra_len = r.u32()? as usize;
    let extra = r.take(extra_len, "layer extra data")?;
    let name = parse_layer_name(extra)?;

    let record = LayerRecord {
        name,
        top,
        left,
        bottom,
        right,
        opacity,
        hidden: flags & 0x02 != 0,
        channels: Vec::with_capacity(lengths.len()),
    };
    Ok((record, lengths))
}

/// Read the layer name, preferring the Unicode name block when present.
fn parse_layer_name(extra: &[u8]) -> DecodeResult<String> {
    let mut r = ByteReader::new(extra);
    let mask_len = r.u32()? as usize;
    r.skip(mask_len, "layer mask data")?;
    let ranges_len = r.u32()? as usize;
    r.skip(ranges_len, "blending ranges")?;

    let name_len = r.u8()? as usize;
    let pascal = r.take(name_len, "layer name")?;
    let padded = (1 + name_len).div_ceil(4) * 4;
    r.skip(padded - 1 - name_len, "layer name padding")?;

    let name = String::from_utf8_lossy(pascal).into_owned();
    Ok(unicode_name(r.rest()).unwrap_or(name))
}

/// Scan additional layer information blocks for `luni`.
fn unicode_name(mut blocks: &[u8]) -> Option<String> {
    while blocks.len() >= 12 {
        let mut r = ByteReader::new(blocks);
        let sig = r.take(4, "block signature").ok()?;
        if sig != BLEND_SIGNATURE && sig != BLEND_SIGNATURE_64 {
            return None;
        }
        let key = r.take(4, "block key").ok()?;
        let len = r.u32().ok()? as usize;
        let data = r.take(len, "block data").ok()?;
        if key == b"luni" {
            let mut d = ByteReader::new(data);
            let chars = d.u32().ok()? as usize;
            let units = (0..chars)
                .map(|_| d.u16())
                .collect::<DecodeResult<Vec<u16>>>()
                .ok()?;
            let name = String::from_utf16_lossy(&units);
            return Some(name.trim_end_matches('\0').to_string());
        }
        let consumed = 12 + len + (len % 2);
        blocks = blocks.get(consumed..)?;
    }
    None
}

/// Big-endian cursor over a byte slice.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn take(&mut self, len: usize, what: &'static str) -> DecodeResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(DecodeError::Truncated(what))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, len: usize, what: &'static str) -> DecodeResult<()> {
        self.take(len, what).map(|_| ())
    }

    pub(crate) fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let slice = self.take(N, "integer field")?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> DecodeResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn u16(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub(crate) fn i16(&mut self) -> DecodeResult<i16> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub(crate) fn i32(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }
}
