//! Access to files on disk
//!
//! Every blocking read the pipeline performs goes through [`DataSource`]:
//! sidecar JSON, NIfTI headers and b-value files. [`FsDataSource`] reads
//! relative paths under a data root; [`InMemorySource`] serves fixtures.

use crate::error::{BidsortError, Result};
use flate2::read::GzDecoder;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// NIfTI-1 header size in bytes
const NIFTI1_HEADER_SIZE: usize = 348;

/// Reads the files referenced by an acquisition listing
pub trait DataSource {
    /// Parses a JSON sidecar into a key-value map
    fn read_sidecar(&self, path: &str) -> Result<Map<String, Value>>;

    /// Reads shape and pixel datatype from an image header
    fn inspect_volume(&self, path: &str) -> Result<VolumeInfo>;

    /// Reads the b-values of a diffusion acquisition
    fn read_bvals(&self, path: &str) -> Result<Vec<f64>>;

    /// Checks whether a file exists
    fn exists(&self, path: &str) -> bool;
}

/// NIfTI pixel datatype code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NiftiDatatype {
    Uint8,
    Int16,
    Int32,
    Float32,
    Complex64,
    Float64,
    Rgb24,
    Int8,
    Uint16,
    Uint32,
    Int64,
    Uint64,
    Rgba32,
    Other(i16),
}

impl NiftiDatatype {
    /// Maps a header `datatype` code
    pub fn from_code(code: i16) -> Self {
        match code {
            2 => NiftiDatatype::Uint8,
            4 => NiftiDatatype::Int16,
            8 => NiftiDatatype::Int32,
            16 => NiftiDatatype::Float32,
            32 => NiftiDatatype::Complex64,
            64 => NiftiDatatype::Float64,
            128 => NiftiDatatype::Rgb24,
            256 => NiftiDatatype::Int8,
            512 => NiftiDatatype::Uint16,
            768 => NiftiDatatype::Uint32,
            1024 => NiftiDatatype::Int64,
            1280 => NiftiDatatype::Uint64,
            2304 => NiftiDatatype::Rgba32,
            other => NiftiDatatype::Other(other),
        }
    }

    /// Returns true for integer pixel formats
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            NiftiDatatype::Uint8
                | NiftiDatatype::Int8
                | NiftiDatatype::Int16
                | NiftiDatatype::Uint16
                | NiftiDatatype::Int32
                | NiftiDatatype::Uint32
                | NiftiDatatype::Int64
                | NiftiDatatype::Uint64
        )
    }
}

impl fmt::Display for NiftiDatatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NiftiDatatype::Uint8 => write!(f, "uint8"),
            NiftiDatatype::Int16 => write!(f, "int16"),
            NiftiDatatype::Int32 => write!(f, "int32"),
            NiftiDatatype::Float32 => write!(f, "float32"),
            NiftiDatatype::Complex64 => write!(f, "complex64"),
            NiftiDatatype::Float64 => write!(f, "float64"),
            NiftiDatatype::Rgb24 => write!(f, "RGB"),
            NiftiDatatype::Int8 => write!(f, "int8"),
            NiftiDatatype::Uint16 => write!(f, "uint16"),
            NiftiDatatype::Uint32 => write!(f, "uint32"),
            NiftiDatatype::Int64 => write!(f, "int64"),
            NiftiDatatype::Uint64 => write!(f, "uint64"),
            NiftiDatatype::Rgba32 => write!(f, "RGBA"),
            NiftiDatatype::Other(code) => write!(f, "code {}", code),
        }
    }
}

/// Image header facts used by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeInfo {
    /// Dimension sizes, `dim[1..=dim[0]]`
    pub dims: Vec<usize>,
    pub datatype: NiftiDatatype,
    /// Voxel sizes matching `dims`
    pub pixdim: Vec<f32>,
    /// Size of the image file in bytes
    pub file_size: u64,
}

impl VolumeInfo {
    /// Creates a VolumeInfo with unit voxel sizes
    pub fn new(dims: Vec<usize>, datatype: NiftiDatatype, file_size: u64) -> Self {
        let pixdim = vec![1.0; dims.len()];
        Self {
            dims,
            datatype,
            pixdim,
            file_size,
        }
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Length of the 4th dimension, 1 for 3-D images
    pub fn volume_count(&self) -> usize {
        self.dims.get(3).copied().unwrap_or(1)
    }

    /// Header summary shown alongside the image item
    pub fn header_lines(&self) -> Vec<String> {
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        let pixdim: Vec<String> = self.pixdim.iter().map(|p| format!("{:.4}", p)).collect();
        vec![
            format!("dim: [{}]", dims.join(", ")),
            format!("datatype: {}", self.datatype),
            format!("pixdim: [{}]", pixdim.join(", ")),
        ]
    }
}

/// Parses a NIfTI-1 header, in either byte order
pub fn parse_nifti_header(bytes: &[u8], path: &str, file_size: u64) -> Result<VolumeInfo> {
    let invalid = |reason: &str| BidsortError::InvalidVolume {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if bytes.len() < NIFTI1_HEADER_SIZE {
        return Err(invalid("header shorter than 348 bytes"));
    }

    let size_le = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let size_be = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let little_endian = if size_le == NIFTI1_HEADER_SIZE as i32 {
        true
    } else if size_be == NIFTI1_HEADER_SIZE as i32 {
        false
    } else {
        return Err(invalid("sizeof_hdr is not 348"));
    };

    let read_i16 = |offset: usize| {
        let raw = [bytes[offset], bytes[offset + 1]];
        if little_endian {
            i16::from_le_bytes(raw)
        } else {
            i16::from_be_bytes(raw)
        }
    };
    let read_f32 = |offset: usize| {
        let raw = [
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ];
        if little_endian {
            f32::from_le_bytes(raw)
        } else {
            f32::from_be_bytes(raw)
        }
    };

    // dim[8] at 40, datatype at 70, pixdim[8] at 76
    let ndim = read_i16(40);
    if !(1..=7).contains(&ndim) {
        return Err(invalid("dim[0] outside 1..=7"));
    }
    let ndim = ndim as usize;

    let mut dims = Vec::with_capacity(ndim);
    for i in 1..=ndim {
        let d = read_i16(40 + 2 * i);
        if d < 0 {
            return Err(invalid("negative dimension"));
        }
        dims.push(d as usize);
    }
    let pixdim = (1..=ndim).map(|i| read_f32(76 + 4 * i)).collect();

    Ok(VolumeInfo {
        dims,
        datatype: NiftiDatatype::from_code(read_i16(70)),
        pixdim,
        file_size,
    })
}

/// Parses whitespace-separated b-values
pub fn parse_bvals(text: &str, path: &str) -> Result<Vec<f64>> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|e| BidsortError::InvalidGradients {
                    path: path.to_string(),
                    reason: format!("'{}': {}", token, e),
                })
        })
        .collect()
}

/// Reads files relative to a data root directory
#[derive(Debug, Clone)]
pub struct FsDataSource {
    root: PathBuf,
}

impl FsDataSource {
    /// Creates a source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl DataSource for FsDataSource {
    fn read_sidecar(&self, path: &str) -> Result<Map<String, Value>> {
        let file = File::open(self.resolve(path))?;
        let value: Value = serde_json::from_reader(BufReader::new(file))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(format!("Sidecar {} is not a JSON object", path).into()),
        }
    }

    fn inspect_volume(&self, path: &str) -> Result<VolumeInfo> {
        let full_path = self.resolve(path);
        let file_size = std::fs::metadata(&full_path)?.len();
        let file = File::open(&full_path)?;

        let mut reader: Box<dyn Read> = if path.ends_with(".gz") {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        let mut header = [0u8; NIFTI1_HEADER_SIZE];
        reader.read_exact(&mut header).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                BidsortError::InvalidVolume {
                    path: path.to_string(),
                    reason: "truncated header".to_string(),
                }
            } else {
                BidsortError::Io(e)
            }
        })?;

        parse_nifti_header(&header, path, file_size)
    }

    fn read_bvals(&self, path: &str) -> Result<Vec<f64>> {
        let text = std::fs::read_to_string(self.resolve(path))?;
        parse_bvals(&text, path)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }
}

/// Serves sidecars, headers and b-values from memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    sidecars: HashMap<String, Map<String, Value>>,
    volumes: HashMap<String, VolumeInfo>,
    bvals: HashMap<String, Vec<f64>>,
    files: HashSet<String>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Add a sidecar; non-object JSON is stored as an empty map
    pub fn with_sidecar(mut self, path: &str, sidecar: Value) -> Self {
        let map = match sidecar {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.files.insert(path.to_string());
        self.sidecars.insert(path.to_string(), map);
        self
    }

    /// Builder: Add an image header
    pub fn with_volume(mut self, path: &str, volume: VolumeInfo) -> Self {
        self.files.insert(path.to_string());
        self.volumes.insert(path.to_string(), volume);
        self
    }

    /// Builder: Add a b-value file
    pub fn with_bvals(mut self, path: &str, bvals: Vec<f64>) -> Self {
        self.files.insert(path.to_string());
        self.bvals.insert(path.to_string(), bvals);
        self
    }

    /// Builder: Mark a file as present
    pub fn with_file(mut self, path: &str) -> Self {
        self.files.insert(path.to_string());
        self
    }

    fn not_found(path: &str) -> BidsortError {
        BidsortError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found", path),
        ))
    }
}

impl DataSource for InMemorySource {
    fn read_sidecar(&self, path: &str) -> Result<Map<String, Value>> {
        self.sidecars
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn inspect_volume(&self, path: &str) -> Result<VolumeInfo> {
        self.volumes
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn read_bvals(&self, path: &str) -> Result<Vec<f64>> {
        self.bvals
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains(path)
    }
}
