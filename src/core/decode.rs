//! Stream decoding.
//!
//! Object streams and cross-reference streams are nearly always
//! FlateDecode-compressed, usually with a PNG predictor. The ASCII filters
//! are kept because some writers wrap those payloads in them as well.

use super::error::{PDFError, PDFResult};
use super::object::{Dictionary, PDFObject};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::io::Read;
use tracing::warn;

/// Widest predictor row accepted, in bits.
const MAX_PREDICTOR_ROW_BITS: usize = i32::MAX as usize - 7;

/// Decodes a FlateDecode (zlib/deflate) compressed stream.
///
/// Zlib framing is tried first; raw deflate is the fallback for writers
/// that omit the zlib header. A truncated stream keeps whatever was
/// inflated before the damage. Output larger than `max_output` bytes is
/// an error.
pub fn decode_flate(compressed_data: &[u8], max_output: usize) -> PDFResult<Vec<u8>> {
    let limit = (max_output as u64).saturating_add(1);
    let mut decompressed = Vec::new();
    let zlib_err = match ZlibDecoder::new(compressed_data)
        .take(limit)
        .read_to_end(&mut decompressed)
    {
        Ok(_) => return within_limit(decompressed, max_output),
        Err(e) => e,
    };
    let partial = std::mem::take(&mut decompressed);

    match DeflateDecoder::new(compressed_data)
        .take(limit)
        .read_to_end(&mut decompressed)
    {
        Ok(_) => within_limit(decompressed, max_output),
        Err(deflate_err) if partial.is_empty() => Err(PDFError::StreamError(format!(
            "FlateDecode error: zlib failed ({}), raw deflate failed ({}), {} input bytes",
            zlib_err,
            deflate_err,
            compressed_data.len()
        ))),
        Err(_) => {
            warn!(
                recovered = partial.len(),
                "FlateDecode stream is damaged ({}), keeping partial output", zlib_err
            );
            within_limit(partial, max_output)
        }
    }
}

fn within_limit(data: Vec<u8>, max_output: usize) -> PDFResult<Vec<u8>> {
    if data.len() > max_output {
        return Err(PDFError::StreamError(format!(
            "FlateDecode output exceeds {} bytes",
            max_output
        )));
    }
    Ok(data)
}

/// Reverses PNG prediction (`/Predictor` 10..15).
///
/// Every row starts with its own predictor tag byte. A short final row is
/// dropped. A row wider than the data itself is rejected before anything
/// is allocated for it.
pub fn decode_png_predictor(
    data: &[u8],
    colors: usize,
    bits_per_component: usize,
    columns: usize,
) -> PDFResult<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let row_bits = columns
        .checked_mul(colors)
        .and_then(|bits| bits.checked_mul(bits_per_component))
        .filter(|bits| *bits <= MAX_PREDICTOR_ROW_BITS)
        .ok_or_else(|| {
            PDFError::StreamError(format!(
                "PNG predictor parameters overflow: {} columns x {} colors x {} bits",
                columns, colors, bits_per_component
            ))
        })?;
    let row_bytes = row_bits.div_ceil(8);
    if row_bytes == 0 {
        return Err(PDFError::StreamError("PNG predictor with empty rows".to_string()));
    }
    if row_bytes > data.len() {
        return Err(PDFError::StreamError(format!(
            "PNG predictor row of {} bytes exceeds {} bytes of data",
            row_bytes,
            data.len()
        )));
    }
    let pix_bytes = (colors * bits_per_component).div_ceil(8).max(1);
    let stride = 1 + row_bytes;

    let num_rows = data.len() / stride;
    let mut output = Vec::with_capacity(num_rows * row_bytes);
    let mut prev_row = vec![0u8; row_bytes];
    let mut row = vec![0u8; row_bytes];

    for raw in data.chunks_exact(stride) {
        let predictor_byte = raw[0];
        let raw_bytes = &raw[1..];

        for i in 0..row_bytes {
            let left = if i >= pix_bytes { row[i - pix_bytes] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= pix_bytes { prev_row[i - pix_bytes] } else { 0 };

            let predicted = match predictor_byte {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => {
                    return Err(PDFError::StreamError(format!(
                        "Unsupported PNG predictor: {}",
                        other
                    )));
                }
            };
            row[i] = raw_bytes[i].wrapping_add(predicted);
        }

        output.extend_from_slice(&row);
        std::mem::swap(&mut prev_row, &mut row);
    }

    Ok(output)
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let p = left as i32 + up as i32 - up_left as i32;
    let pa = (p - left as i32).abs();
    let pb = (p - up as i32).abs();
    let pc = (p - up_left as i32).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        up_left
    }
}

/// Decodes ASCIIHex-encoded data.
///
/// Whitespace is ignored, `>` ends the data, an odd digit count gets an
/// implicit trailing 0.
pub fn decode_ascii_hex(data: &[u8]) -> PDFResult<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;

    for &byte in data {
        if byte == b'>' {
            break;
        }
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            _ => continue,
        };
        match high.take() {
            Some(h) => result.push((h << 4) | digit),
            None => high = Some(digit),
        }
    }

    if let Some(h) = high {
        result.push(h << 4);
    }

    Ok(result)
}

/// Decodes ASCII85 (Base85) encoded data.
pub fn decode_ascii85(data: &[u8]) -> PDFResult<Vec<u8>> {
    let mut result = Vec::new();
    let mut tuple = 0u32;
    let mut count = 0usize;

    for &byte in data {
        match byte {
            b'~' => break,
            b'z' if count == 0 => result.extend_from_slice(&[0u8; 4]),
            b'!'..=b'u' => {
                tuple = tuple.wrapping_mul(85).wrapping_add((byte - b'!') as u32);
                count += 1;

                if count == 5 {
                    result.extend_from_slice(&tuple.to_be_bytes());
                    tuple = 0;
                    count = 0;
                }
            }
            b if b.is_ascii_whitespace() || b == 0 => {}
            other => {
                return Err(PDFError::StreamError(format!(
                    "Invalid ASCII85 character: 0x{:02x}",
                    other
                )));
            }
        }
    }

    // Partial group: pad with 'u' and keep count - 1 bytes
    if count > 1 {
        for _ in count..5 {
            tuple = tuple.wrapping_mul(85).wrapping_add(84);
        }
        result.extend_from_slice(&tuple.to_be_bytes()[..count - 1]);
    }

    Ok(result)
}

/// Applies a single filter with its decode parameters.
fn apply_filter(
    data: &[u8],
    filter_name: &[u8],
    params: Option<&Dictionary>,
    max_output: usize,
) -> PDFResult<Vec<u8>> {
    match filter_name {
        b"FlateDecode" | b"Fl" => {
            let inflated = decode_flate(data, max_output)?;
            apply_predictor(inflated, params)
        }
        b"ASCIIHexDecode" | b"AHx" => decode_ascii_hex(data),
        b"ASCII85Decode" | b"A85" => decode_ascii85(data),
        other => Err(PDFError::StreamError(format!(
            "Unsupported filter: {}",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// Undoes the `/Predictor` named in `/DecodeParms`, if any.
fn apply_predictor(data: Vec<u8>, params: Option<&Dictionary>) -> PDFResult<Vec<u8>> {
    let Some(params) = params else {
        return Ok(data);
    };
    let predictor = params.get_integer("Predictor").unwrap_or(1);
    if predictor < 10 {
        if predictor != 1 {
            warn!(predictor, "unsupported predictor, returning raw data");
        }
        return Ok(data);
    }

    let colors = params.get_integer("Colors").unwrap_or(1).clamp(1, 32) as usize;
    let bits = params.get_integer("BitsPerComponent").unwrap_or(8).clamp(1, 16) as usize;
    let columns = usize::try_from(params.get_integer("Columns").unwrap_or(1).max(1)).unwrap_or(usize::MAX);
    decode_png_predictor(&data, colors, bits, columns)
}

/// Decodes a stream payload according to its dictionary's `/Filter` and
/// `/DecodeParms`.
///
/// Filters in an array are applied in array order; `/DecodeParms` may be a
/// single dictionary or an array parallel to the filters. `max_output`
/// caps what any inflate step may produce.
pub fn decode_stream(dict: &Dictionary, data: &[u8], max_output: usize) -> PDFResult<Vec<u8>> {
    let filters: Vec<&[u8]> = match dict.get("Filter") {
        Some(PDFObject::Name(name)) => vec![name.as_slice()],
        Some(PDFObject::Array(items)) => items.iter().filter_map(PDFObject::as_name).collect(),
        _ => return Ok(data.to_vec()),
    };

    let params: Vec<Option<&Dictionary>> = match dict.get("DecodeParms") {
        Some(PDFObject::Dictionary(d)) => vec![Some(d)],
        Some(PDFObject::Array(items)) => items
            .iter()
            .map(|item| match item {
                PDFObject::Dictionary(d) => Some(d),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut current_data = data.to_vec();
    for (i, filter_name) in filters.iter().enumerate() {
        let filter_params = params.get(i).copied().flatten();
        current_data = apply_filter(&current_data, filter_name, filter_params, max_output).map_err(|e| {
            PDFError::StreamError(format!(
                "Filter {} failed: {}",
                String::from_utf8_lossy(filter_name),
                e
            ))
        })?;
    }

    Ok(current_data)
}
