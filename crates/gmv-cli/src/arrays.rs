// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! One-dimensional array I/O for `.npy`, `.npz` and `.csv` files.

use crate::error::CliError;
use gmv_core::{Operand, SignalView};
use serde::Serialize;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";
const NPY_HEADER_ALIGN: usize = 64;
/// Entry used when a `.npz` source carries no `#key` suffix.
pub const DEFAULT_NPZ_ENTRY: &str = "arr_0";
/// Entry holding the reference trace in a pair archive.
pub const PAIR_REFERENCE_ENTRY: &str = "arr_1";

/// A sequence loaded from disk.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedArray {
    pub path: PathBuf,
    pub entry: Option<String>,
    pub format: &'static str,
    pub values: Vec<f64>,
}

impl LoadedArray {
    pub fn as_view(&self, operand: Operand) -> Result<SignalView<'_>, CliError> {
        SignalView::from_f64(self.values.as_slice(), operand).map_err(CliError::from)
    }

    pub fn summary(&self) -> InputSummary {
        InputSummary {
            path: self.path.display().to_string(),
            entry: self.entry.clone(),
            format: self.format.to_string(),
            len: self.values.len(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InputSummary {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    pub format: String,
    pub len: usize,
}

/// Splits `pair.npz#arr_1` into its path and entry key.
pub fn split_source(source: &str) -> (PathBuf, Option<String>) {
    if let Some((path, key)) = source.rsplit_once('#') {
        if path.to_ascii_lowercase().ends_with(".npz") && !key.is_empty() {
            return (PathBuf::from(path), Some(key.to_string()));
        }
    }
    (PathBuf::from(source), None)
}

/// Loads a sequence from `source`, a path optionally suffixed with `#key` for `.npz`.
pub fn load_array(source: &str) -> Result<LoadedArray, CliError> {
    let (path, key) = split_source(source);
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .ok_or_else(|| {
            CliError::not_supported(format!(
                "unable to infer input format for '{}'; expected .npy, .npz or .csv",
                path.display()
            ))
        })?;

    match extension.as_str() {
        "csv" => {
            let raw = fs::read_to_string(&path).map_err(|source| {
                CliError::io(format!("failed to read '{}'", path.display()), source)
            })?;
            let values = parse_csv_values(raw.as_str())?;
            Ok(LoadedArray {
                path,
                entry: None,
                format: "csv",
                values,
            })
        }
        "npy" => {
            let bytes = read_bytes(&path)?;
            let values = parse_npy_bytes(bytes.as_slice())?;
            Ok(LoadedArray {
                path,
                entry: None,
                format: "npy",
                values,
            })
        }
        "npz" => {
            let bytes = read_bytes(&path)?;
            let entry = key.unwrap_or_else(|| DEFAULT_NPZ_ENTRY.to_string());
            let values = read_npz_entry(bytes.as_slice(), entry.as_str())?;
            Ok(LoadedArray {
                path,
                entry: Some(entry),
                format: "npz",
                values,
            })
        }
        _ => Err(CliError::not_supported(format!(
            "unsupported input format '{extension}'; expected .npy, .npz or .csv"
        ))),
    }
}

/// Loads the `arr_0` (candidate) and `arr_1` (reference) entries of a pair archive.
pub fn load_pair(path: &Path) -> Result<(LoadedArray, LoadedArray), CliError> {
    let bytes = read_bytes(path)?;
    let load = |entry: &str| -> Result<LoadedArray, CliError> {
        Ok(LoadedArray {
            path: path.to_path_buf(),
            entry: Some(entry.to_string()),
            format: "npz",
            values: read_npz_entry(bytes.as_slice(), entry)?,
        })
    };
    let candidate = load(DEFAULT_NPZ_ENTRY)?;
    let reference = load(PAIR_REFERENCE_ENTRY)?;
    Ok((candidate, reference))
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))
}

/// Parses a single-column CSV, skipping one non-numeric header row.
pub fn parse_csv_values(raw: &str) -> Result<Vec<f64>, CliError> {
    let rows = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();

    if rows.is_empty() {
        return Err(CliError::invalid_input("CSV input is empty"));
    }

    match parse_csv_rows(rows.as_slice(), 1) {
        Ok(values) => Ok(values),
        Err(err) => {
            if rows.len() > 1 && rows[0].parse::<f64>().is_err() && rows[1].parse::<f64>().is_ok()
            {
                if let Ok(without_header) = parse_csv_rows(&rows[1..], 2) {
                    return Ok(without_header);
                }
            }
            Err(err)
        }
    }
}

fn parse_csv_rows(rows: &[&str], first_row_number: usize) -> Result<Vec<f64>, CliError> {
    let mut values = Vec::<f64>::with_capacity(rows.len());
    for (offset, row) in rows.iter().enumerate() {
        let row_number = first_row_number + offset;
        if row.contains(',') {
            return Err(CliError::invalid_input(format!(
                "CSV row {row_number} has more than one column; expected a single column"
            )));
        }
        let value = row.parse::<f64>().map_err(|_| {
            CliError::invalid_input(format!(
                "CSV row {row_number} is not a valid float: '{row}'"
            ))
        })?;
        values.push(value);
    }
    Ok(values)
}

struct ParsedNpyHeader {
    descr: String,
    shape: Vec<usize>,
}

#[derive(Clone, Copy, Debug)]
enum ByteOrder {
    Little,
    Big,
}

/// Decodes a 1-D or `(n, 1)` float32/float64 `.npy` payload.
pub fn parse_npy_bytes(bytes: &[u8]) -> Result<Vec<f64>, CliError> {
    if bytes.len() < 10 {
        return Err(CliError::invalid_input(
            "NPY input is too short to contain a valid header",
        ));
    }
    if &bytes[..6] != NPY_MAGIC {
        return Err(CliError::invalid_input(
            "invalid NPY magic; expected '\\x93NUMPY'",
        ));
    }

    let major = bytes[6];
    let (header_offset, header_len) = match major {
        1 => {
            let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
            (10usize, header_len)
        }
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(CliError::invalid_input(
                    "NPY header is truncated for version >= 2",
                ));
            }
            let header_len =
                u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
            (12usize, header_len)
        }
        other => {
            return Err(CliError::not_supported(format!(
                "unsupported NPY version {other}; expected major version 1, 2, or 3"
            )));
        }
    };

    let header_end = header_offset
        .checked_add(header_len)
        .ok_or_else(|| CliError::invalid_input("NPY header length overflow"))?;
    if header_end > bytes.len() {
        return Err(CliError::invalid_input(
            "NPY header exceeds file length; file is truncated",
        ));
    }

    let header_text = std::str::from_utf8(&bytes[header_offset..header_end])
        .map_err(|_| CliError::invalid_input("NPY header is not valid UTF-8"))?;
    let header = parse_npy_header_text(header_text)?;

    let n = match header.shape.as_slice() {
        [n] | [n, 1] => *n,
        _ => {
            return Err(CliError::not_supported(format!(
                "NPY shape {:?} is unsupported; expected (n,) or (n, 1)",
                header.shape
            )));
        }
    };
    if n == 0 {
        return Err(CliError::invalid_input(format!(
            "NPY shape {:?} is empty; expected at least one sample",
            header.shape
        )));
    }

    let (byte_order, element_width) = parse_npy_descr(header.descr.as_str())?;
    let payload = &bytes[header_end..];
    let expected_payload_len = n
        .checked_mul(element_width)
        .ok_or_else(|| CliError::invalid_input("NPY payload length overflow"))?;
    if payload.len() != expected_payload_len {
        return Err(CliError::invalid_input(format!(
            "NPY payload length mismatch: got {}, expected {} for shape {:?} and descr '{}'",
            payload.len(),
            expected_payload_len,
            header.shape,
            header.descr
        )));
    }

    let mut values = Vec::<f64>::with_capacity(n);
    match element_width {
        4 => {
            for chunk in payload.chunks_exact(4) {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(chunk);
                let value = match byte_order {
                    ByteOrder::Little => f32::from_le_bytes(raw),
                    ByteOrder::Big => f32::from_be_bytes(raw),
                };
                values.push(f64::from(value));
            }
        }
        8 => {
            for chunk in payload.chunks_exact(8) {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                let value = match byte_order {
                    ByteOrder::Little => f64::from_le_bytes(raw),
                    ByteOrder::Big => f64::from_be_bytes(raw),
                };
                values.push(value);
            }
        }
        _ => {
            return Err(CliError::not_supported(format!(
                "unsupported NPY element width {element_width}; expected 4 or 8 bytes"
            )));
        }
    }

    Ok(values)
}

fn parse_npy_header_text(header: &str) -> Result<ParsedNpyHeader, CliError> {
    let descr = extract_header_string(header, "descr")?;
    let shape = extract_header_shape(header, "shape")?;
    Ok(ParsedNpyHeader { descr, shape })
}

fn extract_header_field<'a>(header: &'a str, key: &str) -> Result<&'a str, CliError> {
    let marker = format!("'{key}':");
    let start = header.find(marker.as_str()).ok_or_else(|| {
        CliError::invalid_input(format!("NPY header missing required key '{key}'"))
    })?;
    Ok(header[start + marker.len()..].trim_start())
}

fn extract_header_string(header: &str, key: &str) -> Result<String, CliError> {
    let rest = extract_header_field(header, key)?;
    let Some(after_quote) = rest.strip_prefix('\'') else {
        return Err(CliError::invalid_input(format!(
            "NPY header field '{key}' must be a quoted string"
        )));
    };
    let end = after_quote.find('\'').ok_or_else(|| {
        CliError::invalid_input(format!("NPY header field '{key}' has unterminated string"))
    })?;
    Ok(after_quote[..end].to_string())
}

fn extract_header_shape(header: &str, key: &str) -> Result<Vec<usize>, CliError> {
    let rest = extract_header_field(header, key)?;
    let Some(after_paren) = rest.strip_prefix('(') else {
        return Err(CliError::invalid_input(format!(
            "NPY header field '{key}' must start with '('"
        )));
    };
    let end = after_paren.find(')').ok_or_else(|| {
        CliError::invalid_input(format!("NPY header field '{key}' has unterminated tuple"))
    })?;
    let dims = after_paren[..end]
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>().map_err(|_| {
                CliError::invalid_input(format!(
                    "NPY shape entry '{part}' is not a valid non-negative integer"
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if dims.is_empty() {
        return Err(CliError::not_supported(
            "NPY scalar arrays are unsupported; expected shape (n,) or (n, 1)",
        ));
    }
    Ok(dims)
}

fn parse_npy_descr(descr: &str) -> Result<(ByteOrder, usize), CliError> {
    let native = if cfg!(target_endian = "little") {
        ByteOrder::Little
    } else {
        ByteOrder::Big
    };
    let trimmed = descr.trim();
    let (byte_order, dtype) = match trimmed.as_bytes().first() {
        Some(b'<') => (ByteOrder::Little, &trimmed[1..]),
        Some(b'>') => (ByteOrder::Big, &trimmed[1..]),
        Some(b'|') | Some(b'=') => (native, &trimmed[1..]),
        Some(b'f') => (native, trimmed),
        Some(_) => {
            return Err(CliError::not_supported(format!(
                "unsupported NPY descr '{trimmed}'; expected floating-point dtype f4 or f8"
            )));
        }
        None => return Err(CliError::invalid_input("NPY descr is empty")),
    };

    let width = match dtype {
        "f4" => 4,
        "f8" => 8,
        _ => {
            return Err(CliError::not_supported(format!(
                "unsupported NPY dtype '{dtype}'; expected f4 or f8"
            )));
        }
    };
    Ok((byte_order, width))
}

/// Reads entry `key` (or `key.npy`) from an `.npz` archive.
pub fn read_npz_entry(bytes: &[u8], key: &str) -> Result<Vec<f64>, CliError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|source| CliError::zip("failed to open NPZ archive", source))?;

    let entry_name = if key.ends_with(".npy") {
        key.to_string()
    } else {
        format!("{key}.npy")
    };
    let mut available = archive
        .file_names()
        .map(|name| name.trim_end_matches(".npy").to_string())
        .collect::<Vec<_>>();
    if !available.iter().any(|name| format!("{name}.npy") == entry_name) {
        available.sort();
        return Err(CliError::invalid_input(format!(
            "NPZ archive has no entry '{key}'; available: {}",
            available.join(", ")
        )));
    }

    let mut file = archive
        .by_name(entry_name.as_str())
        .map_err(|source| CliError::zip(format!("failed to open NPZ entry '{key}'"), source))?;
    let mut payload = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
    file.read_to_end(&mut payload)
        .map_err(|source| CliError::io(format!("failed to read NPZ entry '{key}'"), source))?;
    parse_npy_bytes(payload.as_slice())
}

/// Encodes `values` as a version 1.0 little-endian float64 `.npy` payload.
pub fn encode_npy(values: &[f64]) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({},), }}",
        values.len()
    );
    let unpadded = NPY_MAGIC.len() + 4 + header.len() + 1;
    let padding = (NPY_HEADER_ALIGN - unpadded % NPY_HEADER_ALIGN) % NPY_HEADER_ALIGN;
    header.push_str(" ".repeat(padding).as_str());
    header.push('\n');

    let mut bytes = Vec::with_capacity(NPY_MAGIC.len() + 4 + header.len() + values.len() * 8);
    bytes.extend_from_slice(NPY_MAGIC);
    bytes.push(1u8);
    bytes.push(0u8);
    // The header is at most a few hundred bytes, well inside u16.
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for value in values {
        bytes.extend_from_slice(value.to_le_bytes().as_slice());
    }
    bytes
}

pub fn write_npy(path: &Path, values: &[f64]) -> Result<(), CliError> {
    fs::write(path, encode_npy(values))
        .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
}

/// Writes `entries` as an uncompressed `.npz` archive, one `<name>.npy` per entry.
pub fn write_npz(path: &Path, entries: &[(&str, &[f64])]) -> Result<(), CliError> {
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, values) in entries {
            writer
                .start_file(format!("{name}.npy"), options)
                .map_err(|source| CliError::zip(format!("failed to add '{name}' to NPZ"), source))?;
            writer.write_all(encode_npy(values).as_slice()).map_err(|source| {
                CliError::io(format!("failed to write NPZ entry '{name}'"), source)
            })?;
        }
        writer
            .finish()
            .map_err(|source| CliError::zip("failed to finalize NPZ archive", source))?;
    }

    fs::write(path, buf)
        .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
}
