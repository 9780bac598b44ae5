use ndarray::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use super::{Geometry, LoadError};

struct TextParserContext<R: BufRead> {
    buf_reader: R,
    filepath: String,
    line_count: usize,
}

impl<R: BufRead> TextParserContext<R> {
    /// Reads a line and increase the line counter. It already trim the string.
    /// Returns `None` at the end of the stream.
    fn read_line(&mut self) -> Result<Option<String>, LoadError> {
        let mut line = String::new();
        if self.buf_reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        self.line_count += 1;
        Ok(Some(line.trim().to_string()))
    }

    /// Reads the next line that is neither empty nor a `#` comment.
    fn read_content_line(&mut self) -> Result<String, LoadError> {
        loop {
            match self.read_line()? {
                Some(line) if line.is_empty() || line.starts_with('#') => continue,
                Some(line) => return Ok(line),
                None => return Err(self.gen_error("unexpected end of file".to_string())),
            }
        }
    }

    /// Formats an error message by putting the file name, the current line and the supplied message.
    ///
    /// # Arguments
    ///
    /// * `message` - An error message.
    fn gen_error(&self, message: String) -> LoadError {
        LoadError::ParseError(format!(
            "{}:{}: {}",
            self.filepath, self.line_count, message
        ))
    }
}

fn parse_tokens<T: FromStr>(line: &str) -> Option<Vec<T>> {
    line.split_whitespace()
        .map(|token| token.parse::<T>().ok())
        .collect()
}

/// Upper bound of the elements reserved from the header counts, which are not
/// trusted until the elements are actually read.
const MAX_RESERVED_ELEMENTS: usize = 1 << 20;

fn read_off_vertices<R: BufRead>(
    num_vertices: usize,
    parser_context: &mut TextParserContext<R>,
) -> Result<Array2<f32>, LoadError> {
    let mut vertices = Vec::<f32>::with_capacity(num_vertices.min(MAX_RESERVED_ELEMENTS) * 3);
    for _ in 0..num_vertices {
        let line = parser_context.read_content_line()?;
        // Trailing columns (colors, texture coordinates) are ignored.
        let coords = line
            .split_whitespace()
            .take(3)
            .map(|x| x.parse::<f32>())
            .collect::<Vec<_>>();
        if let [Ok(x), Ok(y), Ok(z)] = coords[..] {
            vertices.extend_from_slice(&[x, y, z]);
        } else {
            return Err(parser_context.gen_error(format!("Invalid vertex. Got `{line}`")));
        }
    }

    Array2::from_shape_vec((vertices.len() / 3, 3), vertices)
        .map_err(|err| parser_context.gen_error(err.to_string()))
}

fn read_off_faces<R: BufRead>(
    num_faces: usize,
    num_vertices: usize,
    parser_context: &mut TextParserContext<R>,
) -> Result<Array2<usize>, LoadError> {
    let mut faces = Vec::<usize>::with_capacity(num_faces.min(MAX_RESERVED_ELEMENTS) * 6);

    for _ in 0..num_faces {
        let line = parser_context.read_content_line()?;
        let invalid_face = || parser_context.gen_error(format!("Invalid face. Got `{line}`"));

        let mut tokens = line.split_whitespace();
        let arity = tokens
            .next()
            .and_then(|token| token.parse::<usize>().ok())
            .ok_or_else(invalid_face)?;
        let indices = tokens
            .take(arity)
            .map(|token| token.parse::<usize>().ok())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid_face)?;

        if arity < 3 || indices.len() != arity {
            return Err(invalid_face());
        }
        if let Some(bad) = indices.iter().find(|index| **index >= num_vertices) {
            return Err(parser_context.gen_error(format!(
                "Face index {bad} out of range for {num_vertices} vertices"
            )));
        }

        // Polygons are fan triangulated around their first vertex.
        for j in 1..arity - 1 {
            faces.push(indices[0]);
            faces.push(indices[j]);
            faces.push(indices[j + 1]);
        }
    }

    Array2::from_shape_vec((faces.len() / 3, 3), faces)
        .map_err(|err| parser_context.gen_error(err.to_string()))
}

/// Reads an Object File Format mesh from any buffered reader.
/// `source_name` is only used to format error messages.
pub fn read_off_from<R: BufRead>(reader: R, source_name: &str) -> Result<Geometry, LoadError> {
    let mut parser_context = TextParserContext {
        buf_reader: reader,
        filepath: source_name.to_string(),
        line_count: 0,
    };

    let header = parser_context.read_content_line()?;
    let counts = match header.strip_prefix("OFF") {
        Some(rest) if rest.trim().is_empty() => parser_context.read_content_line()?,
        // Several ModelNet files glue the counts to the keyword: `OFF490 518 0`.
        Some(rest) => rest.trim().to_string(),
        None => {
            return Err(parser_context.gen_error(format!(
                "file header does not start with 'OFF', got '{header}' instead"
            )))
        }
    };

    let (num_vertices, num_faces) = match parse_tokens::<usize>(&counts).as_deref() {
        Some([v, f, _]) | Some([v, f]) => (*v, *f),
        _ => {
            return Err(parser_context.gen_error(format!("Invalid size formats. Got `{counts}`")))
        }
    };

    let vertices = read_off_vertices(num_vertices, &mut parser_context)?;
    let faces = read_off_faces(num_faces, num_vertices, &mut parser_context)?;

    Ok(Geometry {
        points: vertices,
        normals: None,
        faces: Some(faces),
    })
}

pub fn read_off<P: AsRef<Path>>(filepath: P) -> Result<Geometry, LoadError> {
    let filepath = filepath.as_ref();
    let file = File::open(filepath)?;
    read_off_from(BufReader::new(file), &filepath.display().to_string())
}
