//! Pixel decoding and flattening for layered documents.

use image::{Rgba, RgbaImage};

use super::document::{ColorMode, LayerRecord, PsdDocument, PsdHeader};
use crate::error::{DecodeError, DecodeResult};

const COMPRESSION_RAW: u16 = 0;
const COMPRESSION_RLE: u16 = 1;

/// Flatten visible layers bottom to top over a transparent canvas.
///
/// Blend modes are ignored: every layer is composited source-over with its
/// own transparency channel scaled by its opacity.
pub fn flatten_layers(doc: &PsdDocument<'_>) -> DecodeResult<RgbaImage> {
    let header = &doc.header;
    let mut canvas = RgbaImage::new(header.width, header.height);

    for layer in doc.drawable_layers() {
        if layer.hidden || layer.opacity == 0 {
            continue;
        }
        let pixels = decode_layer(header, layer)?;
        blend_layer(&mut canvas, layer, &pixels);
    }

    Ok(canvas)
}

/// Decode the document's merged image.
pub fn merged_image(doc: &PsdDocument<'_>) -> DecodeResult<RgbaImage> {
    let header = &doc.header;
    let data = doc.composite.ok_or(DecodeError::Truncated("merged image data"))?;
    let color_channels = color_channels(header.color_mode)?;

    let (compression, payload) = split_compression(data)?;
    let planes = header.channels as usize;
    let decoded = decode_planes(
        compression,
        payload,
        header.width as usize,
        header.height as usize,
        header.depth,
        planes,
    )?;

    let color: Vec<&[u8]> = decoded[..color_channels.min(planes)]
        .iter()
        .map(Vec::as_slice)
        .collect();
    if color.len() < color_channels {
        return Err(DecodeError::Malformed(format!(
            "merged image has {planes} channels, {} needs {color_channels}",
            header.color_mode.name()
        )));
    }
    let alpha = if doc.merged_alpha {
        decoded.get(color_channels).map(Vec::as_slice)
    } else {
        None
    };

    assemble_rgba(header.color_mode, header.width, header.height, &color, alpha)
}

fn color_channels(mode: ColorMode) -> DecodeResult<usize> {
    mode.color_channels()
        .ok_or_else(|| DecodeError::Unsupported(format!("{} color mode", mode.name())))
}

/// Decode one layer's channels into an RGBA buffer of the layer's own size.
fn decode_layer(header: &PsdHeader, layer: &LayerRecord<'_>) -> DecodeResult<RgbaImage> {
    let color_channels = color_channels(header.color_mode)?;
    let (width, height) = (layer.width(), layer.height());

    let mut color = Vec::with_capacity(color_channels);
    for id in 0..color_channels as i16 {
        let channel = layer.channel(id).ok_or_else(|| {
            DecodeError::Malformed(format!("layer '{}' is missing channel {id}", layer.name))
        })?;
        color.push(decode_channel(channel.data, width, height, header.depth)?);
    }
    let alpha = match layer.channel(-1) {
        Some(channel) => Some(decode_channel(channel.data, width, height, header.depth)?),
        None => None,
    };

    let color_refs: Vec<&[u8]> = color.iter().map(Vec::as_slice).collect();
    assemble_rgba(header.color_mode, width, height, &color_refs, alpha.as_deref())
}

fn decode_channel(data: &[u8], width: u32, height: u32, depth: u16) -> DecodeResult<Vec<u8>> {
    let (compression, payload) = split_compression(data)?;
    let mut planes = decode_planes(
        compression,
        payload,
        width as usize,
        height as usize,
        depth,
        1,
    )?;
    Ok(planes.remove(0))
}

fn split_compression(data: &[u8]) -> DecodeResult<(u16, &[u8])> {
    if data.len() < 2 {
        return Err(DecodeError::Truncated("channel compression"));
    }
    Ok((u16::from_be_bytes([data[0], data[1]]), &data[2..]))
}

/// Decode `planes` consecutive planar channels to 8 bits per sample.
fn decode_planes(
    compression: u16,
    payload: &[u8],
    width: usize,
    height: usize,
    depth: u16,
    planes: usize,
) -> DecodeResult<Vec<Vec<u8>>> {
    let bytes_per_sample = match depth {
        8 => 1,
        16 => 2,
        other => return Err(DecodeError::Unsupported(format!("{other}-bit channels"))),
    };
    let row_len = width * bytes_per_sample;
    let plane_len = row_len * height;

    let raw = match compression {
        COMPRESSION_RAW => {
            let total = plane_len * planes;
            payload
                .get(..total)
                .ok_or(DecodeError::Truncated("raw channel data"))?
                .to_vec()
        }
        COMPRESSION_RLE => unpack_rle_rows(payload, row_len, height * planes)?,
        2 | 3 => return Err(DecodeError::Unsupported("zip-compressed channels".into())),
        other => return Err(DecodeError::Malformed(format!("unknown compression {other}"))),
    };

    Ok(raw
        .chunks_exact(plane_len.max(1))
        .take(planes)
        .map(|plane| {
            if bytes_per_sample == 2 {
                // keep the high byte of each big-endian sample
                plane.iter().step_by(2).copied().collect()
            } else {
                plane.to_vec()
            }
        })
        .collect())
}

/// PackBits rows preceded by a table of per-row byte counts.
fn unpack_rle_rows(payload: &[u8], row_len: usize, rows: usize) -> DecodeResult<Vec<u8>> {
    let table_len = rows * 2;
    let table = payload
        .get(..table_len)
        .ok_or(DecodeError::Truncated("RLE row table"))?;
    let mut offset = table_len;
    let mut out = Vec::with_capacity(row_len * rows);

    for count in table.chunks_exact(2) {
        let count = u16::from_be_bytes([count[0], count[1]]) as usize;
        let src = payload
            .get(offset..offset + count)
            .ok_or(DecodeError::Truncated("RLE row data"))?;
        unpack_bits(src, row_len, &mut out)?;
        offset += count;
    }
    Ok(out)
}

/// Append exactly `expected` bytes of PackBits-decoded `src` to `out`.
pub(crate) fn unpack_bits(src: &[u8], expected: usize, out: &mut Vec<u8>) -> DecodeResult<()> {
    let start = out.len();
    let mut i = 0;
    while out.len() - start < expected {
        let header = *src.get(i).ok_or(DecodeError::Truncated("PackBits run"))? as i8;
        i += 1;
        match header {
            -128 => {}
            n if n >= 0 => {
                let count = n as usize + 1;
                let literal = src
                    .get(i..i + count)
                    .ok_or(DecodeError::Truncated("PackBits literal"))?;
                out.extend_from_slice(literal);
                i += count;
            }
            n => {
                let count = (1 - n as isize) as usize;
                let byte = *src.get(i).ok_or(DecodeError::Truncated("PackBits repeat"))?;
                out.extend(std::iter::repeat(byte).take(count));
                i += 1;
            }
        }
    }
    out.truncate(start + expected);
    Ok(())
}

/// Combine 8-bit color planes (and optional transparency) into RGBA.
fn assemble_rgba(
    mode: ColorMode,
    width: u32,
    height: u32,
    color: &[&[u8]],
    alpha: Option<&[u8]>,
) -> DecodeResult<RgbaImage> {
    let pixels = width as usize * height as usize;
    if color.iter().any(|plane| plane.len() < pixels) || alpha.is_some_and(|a| a.len() < pixels) {
        return Err(DecodeError::Truncated("channel plane"));
    }

    let mut out = RgbaImage::new(width, height);
    for (i, px) in out.pixels_mut().enumerate() {
        let a = alpha.map_or(255, |a| a[i]);
        *px = match mode {
            ColorMode::Rgb => Rgba([color[0][i], color[1][i], color[2][i], a]),
            ColorMode::Cmyk => {
                // stored inverted: 255 means no ink
                let k = color[3][i] as u16;
                let ink = |c: u8| (c as u16 * k / 255) as u8;
                Rgba([ink(color[0][i]), ink(color[1][i]), ink(color[2][i]), a])
            }
            _ => {
                let g = color[0][i];
                Rgba([g, g, g, a])
            }
        };
    }
    Ok(out)
}

/// Composite `pixels` (the layer's own raster) onto `canvas` at the layer's offset.
fn blend_layer(canvas: &mut RgbaImage, layer: &LayerRecord<'_>, pixels: &RgbaImage) {
    let opacity = layer.opacity as f32 / 255.0;
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);

    for (x, y, src) in pixels.enumerate_pixels() {
        let cx = layer.left as i64 + x as i64;
        let cy = layer.top as i64 + y as i64;
        if cx < 0 || cy < 0 || cx >= cw || cy >= ch {
            continue;
        }
        let dst = canvas.get_pixel_mut(cx as u32, cy as u32);
        *dst = source_over(*src, *dst, opacity);
    }
}

fn source_over(src: Rgba<u8>, dst: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0 * opacity;
    if sa <= 0.0 {
        return dst;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    let mut out = [0u8; 4];
    for c in 0..3 {
        let value = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}
