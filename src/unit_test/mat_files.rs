use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

pub enum MatStorage {
    Plain,
    Compressed,
}

/// Encoding knobs of [`mat_bytes_with`].
#[derive(Clone, Copy, Default)]
pub struct MatOptions {
    /// Writes a `MI` (big endian) file instead of `IM`.
    pub big_endian: bool,
    /// Stores a double matrix instead of uint8.
    pub double: bool,
}

struct MatEncoder {
    big_endian: bool,
}

impl MatEncoder {
    fn u32(&self, value: u32) -> [u8; 4] {
        if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        }
    }

    fn i32(&self, value: i32) -> [u8; 4] {
        self.u32(value as u32)
    }

    fn f64(&self, value: f64) -> [u8; 8] {
        if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        }
    }

    /// Payloads of 1 to 4 bytes are packed in the tag, as MATLAB does.
    fn push_element(&self, buf: &mut Vec<u8>, data_type: u32, payload: &[u8]) {
        if (1..=4).contains(&payload.len()) {
            buf.extend_from_slice(&self.u32(((payload.len() as u32) << 16) | data_type));
            buf.extend_from_slice(payload);
            buf.resize(buf.len() + 4 - payload.len(), 0);
            return;
        }
        buf.extend_from_slice(&self.u32(data_type));
        buf.extend_from_slice(&self.u32(payload.len() as u32));
        buf.extend_from_slice(payload);
        buf.resize(buf.len() + (8 - payload.len() % 8) % 8, 0);
    }
}

/// Little endian Level 5 MAT file with one uint8 matrix. `values` are in
/// MATLAB (column-major) order.
pub fn mat_bytes(name: &str, dims: &[usize], values: &[f64], storage: MatStorage) -> Vec<u8> {
    mat_bytes_with(name, dims, values, storage, MatOptions::default())
}

pub fn mat_bytes_with(
    name: &str,
    dims: &[usize],
    values: &[f64],
    storage: MatStorage,
    options: MatOptions,
) -> Vec<u8> {
    let encoder = MatEncoder {
        big_endian: options.big_endian,
    };
    let mut bytes = format!("{:<116}", "MATLAB 5.0 MAT-file, Platform: GLNXA64, Created on: test")
        .into_bytes();
    bytes.extend_from_slice(&[0u8; 8]);
    if options.big_endian {
        bytes.extend_from_slice(&0x0100u16.to_be_bytes());
        bytes.extend_from_slice(b"MI");
    } else {
        bytes.extend_from_slice(&0x0100u16.to_le_bytes());
        bytes.extend_from_slice(b"IM");
    }

    let class = if options.double { 6 } else { 9 };
    let mut matrix = Vec::new();
    let flags = [encoder.u32(class), encoder.u32(0)].concat();
    encoder.push_element(&mut matrix, 6, &flags);
    let dims = dims
        .iter()
        .flat_map(|d| encoder.i32(*d as i32))
        .collect::<Vec<_>>();
    encoder.push_element(&mut matrix, 5, &dims);
    encoder.push_element(&mut matrix, 1, name.as_bytes());
    if options.double {
        let data = values
            .iter()
            .flat_map(|v| encoder.f64(*v))
            .collect::<Vec<_>>();
        encoder.push_element(&mut matrix, 9, &data);
    } else {
        let data = values.iter().map(|v| *v as u8).collect::<Vec<_>>();
        encoder.push_element(&mut matrix, 2, &data);
    }

    let mut element = Vec::new();
    encoder.push_element(&mut element, 14, &matrix);

    match storage {
        MatStorage::Plain => bytes.extend(element),
        MatStorage::Compressed => {
            let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
            zlib.write_all(&element).unwrap();
            let compressed = zlib.finish().unwrap();
            bytes.extend_from_slice(&encoder.u32(15));
            bytes.extend_from_slice(&encoder.u32(compressed.len() as u32));
            bytes.extend(compressed);
        }
    }
    bytes
}
