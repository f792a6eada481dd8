//! GIFTI surface reading and writing.
//!
//! A `.surf.gii` file is XML holding one `DataArray` of vertex coordinates
//! (`NIFTI_INTENT_POINTSET`, N×3 floats) and one of triangles
//! (`NIFTI_INTENT_TRIANGLE`, M×3 integers). Payloads are either whitespace
//! separated ASCII or base64 of raw little/big-endian values, optionally
//! zlib-compressed first (`GZipBase64Binary`, despite the name).
//!
//! Arrays are matched by intent. When an intent is missing the reader falls
//! back to position: coordinates are the first array not marked as
//! triangles, triangles the first other array not marked as coordinates.

use std::fmt::{self, Write as _};
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use glam::DVec3;
use tracing::debug;

use crate::error::{MeshLoadError, Result};
use crate::surface::{Face, Surface};

const INTENT_POINTSET: &str = "NIFTI_INTENT_POINTSET";
const INTENT_TRIANGLE: &str = "NIFTI_INTENT_TRIANGLE";

/// Payload encoding of a data array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Ascii,
    Base64Binary,
    GZipBase64Binary,
}

impl Encoding {
    pub const fn as_str(self) -> &'static str {
        match self {
            Encoding::Ascii => "ASCII",
            Encoding::Base64Binary => "Base64Binary",
            Encoding::GZipBase64Binary => "GZipBase64Binary",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = MeshLoadError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ASCII" => Ok(Encoding::Ascii),
            "Base64Binary" => Ok(Encoding::Base64Binary),
            "GZipBase64Binary" => Ok(Encoding::GZipBase64Binary),
            other => Err(MeshLoadError::Unsupported {
                kind: "encoding",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataType {
    UInt8,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "NIFTI_TYPE_UINT8" => Ok(DataType::UInt8),
            "NIFTI_TYPE_INT32" => Ok(DataType::Int32),
            "NIFTI_TYPE_FLOAT32" => Ok(DataType::Float32),
            "NIFTI_TYPE_FLOAT64" => Ok(DataType::Float64),
            other => Err(MeshLoadError::Unsupported {
                kind: "data type",
                value: other.to_string(),
            }),
        }
    }

    const fn width(self) -> usize {
        match self {
            DataType::UInt8 => 1,
            DataType::Int32 | DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }
}

/// One decoded `DataArray`, values widened to f64 in row-major order.
#[derive(Debug)]
struct DataArray {
    intent: Option<String>,
    dims: Vec<usize>,
    values: Vec<f64>,
}

/// Read a GIFTI surface from disk.
pub fn read_surface(path: impl AsRef<Path>) -> Result<Surface> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| MeshLoadError::io(path, e))?;
    let surface = parse_surface_bytes(&bytes)?;
    debug!(
        path = %path.display(),
        vertices = surface.vertex_count(),
        faces = surface.face_count(),
        "Loaded GIFTI surface"
    );
    Ok(surface)
}

/// Parse raw file contents. Bytes that are not UTF-8 (Latin-1 metadata, say)
/// are replaced rather than rejected; numeric payloads are always ASCII.
pub fn parse_surface_bytes(bytes: &[u8]) -> Result<Surface> {
    parse_surface(&String::from_utf8_lossy(bytes))
}

/// Parse GIFTI XML into a surface.
pub fn parse_surface(xml: &str) -> Result<Surface> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = roxmltree::Document::parse_with_options(xml, options)?;

    let mut arrays = doc
        .descendants()
        .filter(|n| n.has_tag_name("DataArray"))
        .map(decode_array)
        .collect::<Result<Vec<_>>>()?;

    let coords_idx =
        pick_array(&arrays, INTENT_POINTSET, INTENT_TRIANGLE, None).ok_or(MeshLoadError::MissingArray("coordinate"))?;
    let faces_idx = pick_array(&arrays, INTENT_TRIANGLE, INTENT_POINTSET, Some(coords_idx))
        .ok_or(MeshLoadError::MissingArray("triangle"))?;

    let faces_array = std::mem::replace(&mut arrays[faces_idx], empty_array());
    let coords_array = std::mem::replace(&mut arrays[coords_idx], empty_array());

    let coords = to_coords(coords_array)?;
    let faces = to_faces(faces_array)?;
    Surface::new(coords, faces)
}

fn empty_array() -> DataArray {
    DataArray {
        intent: None,
        dims: Vec::new(),
        values: Vec::new(),
    }
}

/// Index of the array declaring `intent`, else the first array other than
/// `skip` that does not declare `other`.
fn pick_array(arrays: &[DataArray], intent: &str, other: &str, skip: Option<usize>) -> Option<usize> {
    arrays
        .iter()
        .position(|a| a.intent.as_deref() == Some(intent))
        .or_else(|| {
            arrays
                .iter()
                .enumerate()
                .position(|(i, a)| Some(i) != skip && a.intent.as_deref() != Some(other))
        })
}

fn attr<'a>(node: &roxmltree::Node<'a, '_>, name: &'static str) -> Option<&'a str> {
    node.attribute(name).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_attr<T: FromStr>(value: &str, name: &'static str) -> Result<T> {
    value.parse().map_err(|_| MeshLoadError::InvalidAttribute {
        name,
        value: value.to_string(),
    })
}

fn decode_array(node: roxmltree::Node<'_, '_>) -> Result<DataArray> {
    let data_type = DataType::parse(attr(&node, "DataType").unwrap_or_default())?;
    let encoding: Encoding = attr(&node, "Encoding").unwrap_or("ASCII").parse()?;
    let big_endian = match attr(&node, "Endian").unwrap_or("LittleEndian") {
        "LittleEndian" => false,
        "BigEndian" => true,
        other => {
            return Err(MeshLoadError::InvalidAttribute {
                name: "Endian",
                value: other.to_string(),
            })
        }
    };
    let column_major = match attr(&node, "ArrayIndexingOrder").unwrap_or("RowMajorOrder") {
        "RowMajorOrder" => false,
        "ColumnMajorOrder" => true,
        other => {
            return Err(MeshLoadError::InvalidAttribute {
                name: "ArrayIndexingOrder",
                value: other.to_string(),
            })
        }
    };

    let dimensionality: usize = parse_attr(attr(&node, "Dimensionality").unwrap_or("1"), "Dimensionality")?;
    const DIM_NAMES: [&str; 6] = ["Dim0", "Dim1", "Dim2", "Dim3", "Dim4", "Dim5"];
    if dimensionality == 0 || dimensionality > DIM_NAMES.len() {
        return Err(MeshLoadError::InvalidAttribute {
            name: "Dimensionality",
            value: dimensionality.to_string(),
        });
    }
    let dims = DIM_NAMES[..dimensionality]
        .iter()
        .map(|&name| {
            let value = attr(&node, name).ok_or(MeshLoadError::InvalidAttribute {
                name,
                value: String::new(),
            })?;
            parse_attr::<usize>(value, name)
        })
        .collect::<Result<Vec<_>>>()?;
    let expected = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| MeshLoadError::InvalidAttribute {
            name: "Dim0",
            value: dims.iter().map(usize::to_string).collect::<Vec<_>>().join("x"),
        })?;

    let payload = node
        .children()
        .find(|c| c.has_tag_name("Data"))
        .and_then(|d| d.text())
        .unwrap_or("");

    let values = match encoding {
        Encoding::Ascii => decode_ascii(payload, data_type)?,
        Encoding::Base64Binary | Encoding::GZipBase64Binary => {
            let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            let mut bytes = STANDARD.decode(compact.as_bytes())?;
            if encoding == Encoding::GZipBase64Binary {
                let mut inflated = Vec::new();
                ZlibDecoder::new(&bytes[..])
                    .read_to_end(&mut inflated)
                    .map_err(|e| MeshLoadError::io("<zlib payload>", e))?;
                bytes = inflated;
            }
            decode_binary(&bytes, data_type, big_endian)?
        }
    };

    let intent = node.attribute("Intent").map(str::to_string);
    let label = if intent.as_deref() == Some(INTENT_TRIANGLE) { "triangle" } else { "data" };
    if values.len() != expected {
        return Err(MeshLoadError::SizeMismatch {
            array: label,
            expected,
            actual: values.len(),
        });
    }

    let values = if column_major && dims.len() == 2 {
        transpose(&values, dims[0], dims[1])
    } else {
        values
    };

    Ok(DataArray { intent, dims, values })
}

fn decode_ascii(payload: &str, data_type: DataType) -> Result<Vec<f64>> {
    payload
        .split_whitespace()
        .map(|tok| {
            let parsed = match data_type {
                // Widen from f32 so ASCII and binary payloads agree bit-for-bit.
                DataType::Float32 => tok.parse::<f32>().map(f64::from).ok(),
                DataType::Float64 => tok.parse::<f64>().ok(),
                DataType::Int32 => tok.parse::<i32>().map(f64::from).ok(),
                DataType::UInt8 => tok.parse::<u8>().map(f64::from).ok(),
            };
            parsed.ok_or_else(|| MeshLoadError::InvalidNumber(tok.to_string()))
        })
        .collect()
}

fn decode_binary(bytes: &[u8], data_type: DataType, big_endian: bool) -> Result<Vec<f64>> {
    let width = data_type.width();
    if bytes.len() % width != 0 {
        return Err(MeshLoadError::SizeMismatch {
            array: "binary",
            expected: bytes.len() - bytes.len() % width,
            actual: bytes.len(),
        });
    }

    let values = bytes
        .chunks_exact(width)
        .map(|chunk| match data_type {
            DataType::UInt8 => f64::from(chunk[0]),
            DataType::Int32 => {
                let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
                f64::from(if big_endian { i32::from_be_bytes(raw) } else { i32::from_le_bytes(raw) })
            }
            DataType::Float32 => {
                let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
                f64::from(if big_endian { f32::from_be_bytes(raw) } else { f32::from_le_bytes(raw) })
            }
            DataType::Float64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                if big_endian { f64::from_be_bytes(raw) } else { f64::from_le_bytes(raw) }
            }
        })
        .collect();
    Ok(values)
}

fn transpose(values: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    for r in 0..rows {
        for c in 0..cols {
            out.push(values[c * rows + r]);
        }
    }
    out
}

fn check_triples(array: &DataArray, name: &'static str) -> Result<()> {
    if array.dims.len() != 2 || array.dims[1] != 3 {
        return Err(MeshLoadError::BadShape {
            array: name,
            dims: array.dims.clone(),
        });
    }
    Ok(())
}

fn to_coords(array: DataArray) -> Result<Vec<DVec3>> {
    check_triples(&array, "coordinate")?;
    Ok(array
        .values
        .chunks_exact(3)
        .map(|c| DVec3::new(c[0], c[1], c[2]))
        .collect())
}

fn to_faces(array: DataArray) -> Result<Vec<Face>> {
    check_triples(&array, "triangle")?;
    array
        .values
        .chunks_exact(3)
        .enumerate()
        .map(|(face, tri)| {
            let mut out = [0u32; 3];
            for (slot, &v) in out.iter_mut().zip(tri) {
                if v.fract() != 0.0 || v < 0.0 || v > f64::from(u32::MAX) {
                    return Err(MeshLoadError::InvalidNumber(format!("{v} (face {face})")));
                }
                *slot = v as u32;
            }
            Ok(out)
        })
        .collect()
}

/// Serialize a surface as GIFTI XML.
///
/// Coordinates are written as `NIFTI_TYPE_FLOAT32` and triangles as
/// `NIFTI_TYPE_INT32`, little-endian, row-major.
pub fn to_xml(surface: &Surface, encoding: Encoding) -> Result<String> {
    let coords: Vec<f32> = surface
        .coords
        .iter()
        .flat_map(|c| [c.x as f32, c.y as f32, c.z as f32])
        .collect();
    let faces: Vec<i32> = surface
        .faces
        .iter()
        .flatten()
        .map(|&v| v as i32)
        .collect();

    let coord_payload = match encoding {
        Encoding::Ascii => ascii_rows(&coords),
        _ => binary_payload(coords.iter().flat_map(|v| v.to_le_bytes()).collect(), encoding)?,
    };
    let face_payload = match encoding {
        Encoding::Ascii => ascii_rows(&faces),
        _ => binary_payload(faces.iter().flat_map(|v| v.to_le_bytes()).collect(), encoding)?,
    };

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<!DOCTYPE GIFTI SYSTEM \"http://www.nitrc.org/frs/download.php/115/gifti.dtd\">\n");
    xml.push_str("<GIFTI Version=\"1.0\" NumberOfDataArrays=\"2\">\n<MetaData/>\n<LabelTable/>\n");
    push_array(&mut xml, INTENT_POINTSET, "NIFTI_TYPE_FLOAT32", surface.coords.len(), encoding, &coord_payload);
    push_array(&mut xml, INTENT_TRIANGLE, "NIFTI_TYPE_INT32", surface.faces.len(), encoding, &face_payload);
    xml.push_str("</GIFTI>\n");
    Ok(xml)
}

/// Write a surface to `path` as GIFTI.
pub fn write_surface(path: impl AsRef<Path>, surface: &Surface, encoding: Encoding) -> Result<()> {
    let path = path.as_ref();
    let xml = to_xml(surface, encoding)?;
    std::fs::write(path, xml).map_err(|e| MeshLoadError::io(path, e))?;
    debug!(path = %path.display(), %encoding, "Wrote GIFTI surface");
    Ok(())
}

fn ascii_rows<T: fmt::Display>(values: &[T]) -> String {
    let mut out = String::with_capacity(values.len() * 12);
    for row in values.chunks(3) {
        for (i, v) in row.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{}", v);
        }
        out.push('\n');
    }
    out
}

fn binary_payload(bytes: Vec<u8>, encoding: Encoding) -> Result<String> {
    let bytes = if encoding == Encoding::GZipBase64Binary {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&bytes)
            .and_then(|_| encoder.finish())
            .map_err(|e| MeshLoadError::io("<zlib payload>", e))?
    } else {
        bytes
    };
    Ok(STANDARD.encode(bytes))
}

fn push_array(xml: &mut String, intent: &str, data_type: &str, rows: usize, encoding: Encoding, payload: &str) {
    let _ = write!(
        xml,
        "<DataArray Intent=\"{intent}\" DataType=\"{data_type}\" ArrayIndexingOrder=\"RowMajorOrder\" \
         Dimensionality=\"2\" Dim0=\"{rows}\" Dim1=\"3\" Encoding=\"{encoding}\" Endian=\"LittleEndian\" \
         ExternalFileName=\"\" ExternalFileOffset=\"\">\n<MetaData/>\n<Data>{payload}</Data>\n</DataArray>\n"
    );
}
