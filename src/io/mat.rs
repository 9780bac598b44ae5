//! Reader for MATLAB Level 5 `.mat` files.
//!
//! Only numeric matrices are decoded, which is what the ModelNet volumetric
//! data ships with. Cells, structs, chars and sparse matrices are skipped.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;
use ndarray::{ArrayD, IxDyn, ShapeBuilder};

use super::LoadError;

const HEADER_SIZE: usize = 128;

const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_UINT64: u32 = 13;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;

const FLAG_COMPLEX: u32 = 0x0800;
const FLAG_LOGICAL: u32 = 0x0200;

/// MATLAB array classes, as stored in the array flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatClass {
    Cell,
    Struct,
    Object,
    Char,
    Sparse,
    Double,
    Single,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl MatClass {
    fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => MatClass::Cell,
            2 => MatClass::Struct,
            3 => MatClass::Object,
            4 => MatClass::Char,
            5 => MatClass::Sparse,
            6 => MatClass::Double,
            7 => MatClass::Single,
            8 => MatClass::Int8,
            9 => MatClass::UInt8,
            10 => MatClass::Int16,
            11 => MatClass::UInt16,
            12 => MatClass::Int32,
            13 => MatClass::UInt32,
            14 => MatClass::Int64,
            15 => MatClass::UInt64,
            _ => return None,
        })
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(
            self,
            MatClass::Cell | MatClass::Struct | MatClass::Object | MatClass::Char | MatClass::Sparse
        )
    }
}

/// A numeric variable stored in a `.mat` file.
#[derive(Debug, Clone)]
pub struct MatVariable {
    pub name: String,
    pub class: MatClass,
    /// Set when MATLAB flagged the array as `logical`.
    pub logical: bool,
    /// Values in row-major order with the MATLAB dimensions.
    pub data: ArrayD<f64>,
}

/// The numeric variables of a `.mat` file.
#[derive(Debug, Clone)]
pub struct MatFile {
    /// The descriptive text of the header, e.g. `MATLAB 5.0 MAT-file, ...`.
    pub description: String,
    pub variables: Vec<MatVariable>,
}

impl MatFile {
    pub fn get(&self, name: &str) -> Option<&MatVariable> {
        self.variables.iter().find(|var| var.name == name)
    }

    /// Moves the variable `name` out of the file.
    pub fn take(&mut self, name: &str) -> Option<MatVariable> {
        let position = self.variables.iter().position(|var| var.name == name)?;
        Some(self.variables.swap_remove(position))
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, LoadError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        if bytes.len() < HEADER_SIZE {
            return Err(LoadError::ParseError(format!(
                "MAT header needs {HEADER_SIZE} bytes, file has {}",
                bytes.len()
            )));
        }

        let endian = match &bytes[126..128] {
            b"IM" => Endian::Little,
            b"MI" => Endian::Big,
            other => {
                return Err(LoadError::ParseError(format!(
                    "invalid MAT endian indicator {other:?}"
                )))
            }
        };
        let version = endian.u16(&bytes[124..126]);
        if version != 0x0100 {
            return Err(LoadError::Unsupported(format!(
                "MAT version {version:#06x}, only Level 5 (0x0100) is supported"
            )));
        }

        let description = String::from_utf8_lossy(&bytes[..116])
            .trim_end_matches(['\0', ' '])
            .to_string();

        let mut variables = Vec::new();
        let mut cursor = Cursor::new(&bytes[HEADER_SIZE..], endian);
        while !cursor.is_at_end() {
            if let Some(var) = read_top_element(&mut cursor)? {
                variables.push(var);
            }
        }

        Ok(Self {
            description,
            variables,
        })
    }
}

pub fn read_mat<P: AsRef<Path>>(filepath: P) -> Result<MatFile, LoadError> {
    let file = File::open(filepath)?;
    MatFile::from_reader(std::io::BufReader::new(file))
}

#[derive(Debug, Clone, Copy)]
enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u16(self, buf: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(buf),
            Endian::Big => BigEndian::read_u16(buf),
        }
    }

    fn u32(self, buf: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(buf),
            Endian::Big => BigEndian::read_u32(buf),
        }
    }

    fn i16(self, buf: &[u8]) -> i16 {
        match self {
            Endian::Little => LittleEndian::read_i16(buf),
            Endian::Big => BigEndian::read_i16(buf),
        }
    }

    fn i32(self, buf: &[u8]) -> i32 {
        match self {
            Endian::Little => LittleEndian::read_i32(buf),
            Endian::Big => BigEndian::read_i32(buf),
        }
    }

    fn i64(self, buf: &[u8]) -> i64 {
        match self {
            Endian::Little => LittleEndian::read_i64(buf),
            Endian::Big => BigEndian::read_i64(buf),
        }
    }

    fn u64(self, buf: &[u8]) -> u64 {
        match self {
            Endian::Little => LittleEndian::read_u64(buf),
            Endian::Big => BigEndian::read_u64(buf),
        }
    }

    fn f32(self, buf: &[u8]) -> f32 {
        match self {
            Endian::Little => LittleEndian::read_f32(buf),
            Endian::Big => BigEndian::read_f32(buf),
        }
    }

    fn f64(self, buf: &[u8]) -> f64 {
        match self {
            Endian::Little => LittleEndian::read_f64(buf),
            Endian::Big => BigEndian::read_f64(buf),
        }
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

/// A data element: its type and payload.
struct Element<'a> {
    data_type: u32,
    payload: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            pos: 0,
            endian,
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], LoadError> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let slice = &self.data[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(LoadError::ParseError(format!(
                "MAT element of {len} bytes overruns its container at offset {}",
                self.pos
            ))),
        }
    }

    /// Reads one data element, handling the small data element format and
    /// the 8-byte alignment of regular elements.
    fn element(&mut self) -> Result<Element<'a>, LoadError> {
        let tag = self.take(4)?;
        let first = self.endian.u32(tag);
        if first >> 16 != 0 {
            let payload = self.take(4)?;
            let size = (first >> 16) as usize;
            if size > 4 {
                return Err(LoadError::ParseError(format!(
                    "small MAT element declares {size} bytes"
                )));
            }
            return Ok(Element {
                data_type: first & 0xffff,
                payload: &payload[..size],
            });
        }

        let size = self.endian.u32(self.take(4)?) as usize;
        let payload = self.take(size)?;
        if first != MI_COMPRESSED {
            let padding = (8 - size % 8) % 8;
            // The last element of a file is sometimes left unpadded.
            self.pos = (self.pos + padding).min(self.data.len());
        }
        Ok(Element {
            data_type: first,
            payload,
        })
    }
}

fn read_top_element(cursor: &mut Cursor) -> Result<Option<MatVariable>, LoadError> {
    let element = cursor.element()?;
    match element.data_type {
        MI_MATRIX => read_matrix(element.payload, cursor.endian),
        MI_COMPRESSED => {
            let mut inflated = Vec::new();
            ZlibDecoder::new(element.payload)
                .read_to_end(&mut inflated)
                .map_err(|err| LoadError::ParseError(format!("corrupt miCOMPRESSED: {err}")))?;
            let mut inner = Cursor::new(&inflated, cursor.endian);
            read_top_element(&mut inner)
        }
        other => {
            log::debug!("Skipping top level MAT element of type {other}");
            Ok(None)
        }
    }
}

fn read_matrix(payload: &[u8], endian: Endian) -> Result<Option<MatVariable>, LoadError> {
    if payload.is_empty() {
        return Ok(None);
    }
    let mut cursor = Cursor::new(payload, endian);

    let flags = cursor.element()?;
    if flags.data_type != MI_UINT32 || flags.payload.len() < 8 {
        return Err(LoadError::ParseError(
            "miMATRIX does not start with array flags".to_string(),
        ));
    }
    let flag_word = endian.u32(&flags.payload[..4]);
    let class_code = flag_word & 0xff;
    let class = MatClass::from_code(class_code)
        .ok_or_else(|| LoadError::ParseError(format!("unknown MAT array class {class_code}")))?;

    let dims_element = cursor.element()?;
    if dims_element.data_type != MI_INT32 {
        return Err(LoadError::ParseError(
            "miMATRIX dimensions must be miINT32".to_string(),
        ));
    }
    let dims = dims_element
        .payload
        .chunks_exact(4)
        .map(|chunk| {
            usize::try_from(endian.i32(chunk))
                .map_err(|_| LoadError::ParseError("negative MAT dimension".to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let name_element = cursor.element()?;
    let name = String::from_utf8_lossy(name_element.payload).to_string();

    if !class.is_numeric() {
        log::debug!("Skipping MAT variable `{name}` of class {class:?}");
        return Ok(None);
    }
    if flag_word & FLAG_COMPLEX != 0 {
        log::debug!("MAT variable `{name}` is complex, keeping its real part only");
    }

    let expected = dims
        .iter()
        .try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
        .ok_or_else(|| {
            LoadError::ParseError(format!(
                "MAT variable `{name}` has too many elements for dimensions {dims:?}"
            ))
        })?;

    let real = cursor.element()?;
    let values = decode_numeric(real.data_type, real.payload, endian)?;
    if values.len() != expected {
        return Err(LoadError::ParseError(format!(
            "MAT variable `{name}` has {} values for dimensions {dims:?}",
            values.len()
        )));
    }

    // MATLAB stores arrays column-major.
    let data = ArrayD::from_shape_vec(IxDyn(&dims).f(), values)
        .map_err(|err| LoadError::ParseError(err.to_string()))?
        .as_standard_layout()
        .into_owned();

    Ok(Some(MatVariable {
        name,
        class,
        logical: flag_word & FLAG_LOGICAL != 0,
        data,
    }))
}

fn decode_numeric(data_type: u32, payload: &[u8], endian: Endian) -> Result<Vec<f64>, LoadError> {
    let values = match data_type {
        MI_INT8 => payload.iter().map(|v| *v as i8 as f64).collect(),
        MI_UINT8 => payload.iter().map(|v| *v as f64).collect(),
        MI_INT16 => payload
            .chunks_exact(2)
            .map(|c| endian.i16(c) as f64)
            .collect(),
        MI_UINT16 => payload
            .chunks_exact(2)
            .map(|c| endian.u16(c) as f64)
            .collect(),
        MI_INT32 => payload
            .chunks_exact(4)
            .map(|c| endian.i32(c) as f64)
            .collect(),
        MI_UINT32 => payload
            .chunks_exact(4)
            .map(|c| endian.u32(c) as f64)
            .collect(),
        MI_INT64 => payload
            .chunks_exact(8)
            .map(|c| endian.i64(c) as f64)
            .collect(),
        MI_UINT64 => payload
            .chunks_exact(8)
            .map(|c| endian.u64(c) as f64)
            .collect(),
        MI_SINGLE => payload
            .chunks_exact(4)
            .map(|c| endian.f32(c) as f64)
            .collect(),
        MI_DOUBLE => payload.chunks_exact(8).map(|c| endian.f64(c)).collect(),
        other => {
            return Err(LoadError::Unsupported(format!(
                "MAT numeric storage type {other}"
            )))
        }
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Ix3};

    use super::{read_mat, MatClass, MatFile};
    use crate::io::LoadError;
    use crate::unit_test::{mat_bytes, mat_bytes_with, MatOptions, MatStorage};

    #[test]
    fn should_restore_column_major_order() {
        // MATLAB [1 2 3; 4 5 6] is stored as 1 4 2 5 3 6.
        let bytes = mat_bytes(
            "m",
            &[2, 3],
            &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0],
            MatStorage::Plain,
        );
        let mat = MatFile::from_bytes(&bytes).unwrap();
        let var = mat.get("m").unwrap();
        assert_eq!(var.class, MatClass::UInt8);
        assert_eq!(
            var.data.clone().into_dimensionality::<ndarray::Ix2>().unwrap(),
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]
        );
    }

    #[test]
    fn should_read_compressed_elements() {
        let values = (0..24).map(|v| (v % 2) as f64).collect::<Vec<_>>();
        let bytes = mat_bytes("instance", &[2, 3, 4], &values, MatStorage::Compressed);
        let mut mat = MatFile::from_bytes(&bytes).unwrap();
        assert!(mat.description.starts_with("MATLAB 5.0 MAT-file"));

        let var = mat.take("instance").unwrap();
        let grid = var.data.into_dimensionality::<Ix3>().unwrap();
        assert_eq!(grid.dim(), (2, 3, 4));
        // Linear MATLAB index of (i, j, k) is i + 2j + 6k.
        assert_eq!(grid[[1, 0, 0]], 1.0);
        assert_eq!(grid[[0, 1, 0]], 0.0);
        assert_eq!(grid[[1, 2, 3]], ((1 + 4 + 18) % 2) as f64);
        assert!(mat.get("instance").is_none());
    }

    #[test]
    fn should_read_big_endian_files() {
        let options = MatOptions {
            big_endian: true,
            double: true,
        };
        let bytes = mat_bytes_with(
            "m",
            &[2, 2],
            &[0.5, -1.0, 2.0, 1e6],
            MatStorage::Plain,
            options,
        );
        assert_eq!(&bytes[126..128], b"MI");

        let mat = MatFile::from_bytes(&bytes).unwrap();
        let var = mat.get("m").unwrap();
        assert_eq!(var.class, MatClass::Double);
        assert_eq!(
            var.data.clone().into_dimensionality::<ndarray::Ix2>().unwrap(),
            array![[0.5, 2.0], [-1.0, 1e6]]
        );
    }

    #[test]
    fn should_read_small_data_elements() {
        // Names and data of up to 4 bytes are packed in their tags.
        for options in [
            MatOptions::default(),
            MatOptions {
                big_endian: true,
                double: false,
            },
        ] {
            let bytes = mat_bytes_with("vox", &[1, 3], &[7.0, 0.0, 1.0], MatStorage::Plain, options);
            let mat = MatFile::from_bytes(&bytes).unwrap();
            let var = mat.get("vox").unwrap();
            assert_eq!(var.data.shape(), &[1, 3]);
            assert_eq!(var.data.iter().copied().collect::<Vec<_>>(), vec![7.0, 0.0, 1.0]);
        }

        let bytes = mat_bytes_with(
            "vox",
            &[1, 1],
            &[3.0],
            MatStorage::Compressed,
            MatOptions {
                big_endian: true,
                double: false,
            },
        );
        let mat = MatFile::from_bytes(&bytes).unwrap();
        assert_eq!(mat.get("vox").unwrap().data.iter().next(), Some(&3.0));
    }

    #[test]
    fn should_reject_overflowing_dimensions() {
        let max = i32::MAX as usize;
        let bytes = mat_bytes("m", &[max; 4], &[], MatStorage::Plain);
        let err = MatFile::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, LoadError::ParseError(msg) if msg.contains("too many elements")));
    }

    #[test]
    fn should_reject_short_files() {
        let err = MatFile::from_bytes(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, LoadError::ParseError(_)));
    }

    #[test]
    fn should_reject_bad_endian_indicator() {
        let mut bytes = mat_bytes("m", &[1, 1], &[1.0], MatStorage::Plain);
        bytes[126] = b'X';
        assert!(MatFile::from_bytes(&bytes).is_err());
    }

    #[test]
    fn should_fail_on_missing_file() {
        assert!(matches!(
            read_mat("tests/data/does-not-exist.mat"),
            Err(LoadError::Io(_))
        ));
    }
}
