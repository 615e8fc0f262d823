//! Versioned plain-text weight format.
//!
//! ```text
//! ferrite-ffnn 1
//! layers 2
//! layer 1 3 linear
//! layer 3 2 softmax
//! weights 0.52,0.11,0.97
//! bias 0.1,0.1,0.1
//! weights 0.3,0.8,0.25,0.6,0.05,0.44
//! bias 0.1,0.1
//! ```
//!
//! The header fixes every layer's shape and activation, so `load` can check
//! the file against the receiving network before any value is written.
//! Values are row-major and printed with the shortest representation that
//! parses back to the same `f64`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::network::network::Network;

pub const FORMAT_MAGIC: &str = "ferrite-ffnn";
pub const FORMAT_VERSION: u32 = 1;

const DELIMITER: &str = ",";

impl Network {
    /// Writes every layer's weights and biases in the versioned text format.
    pub fn save<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{FORMAT_MAGIC} {FORMAT_VERSION}")?;
        writeln!(writer, "layers {}", self.layers().len())?;
        for layer in self.layers() {
            let size = layer.size();
            writeln!(
                writer,
                "layer {} {} {}",
                size.input_size(),
                size.output_size(),
                layer.activation().name()
            )?;
        }
        for layer in self.layers() {
            writeln!(writer, "weights {}", join(layer.weights()))?;
            writeln!(writer, "bias {}", join(layer.biases()))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads weights written by `save` into this network.
    ///
    /// The file must describe exactly this topology. Everything is parsed
    /// and checked first; on any error the network is left unchanged.
    pub fn load<R: BufRead>(&mut self, reader: R) -> Result<()> {
        let mut lines = Lines::new(reader);

        let (line, header) = lines.expect_next()?;
        let mut parts = header.split_whitespace();
        if parts.next() != Some(FORMAT_MAGIC) {
            return Err(Error::format(line, format!("expected '{FORMAT_MAGIC}' header")));
        }
        let version: u32 = parse_field(parts.next(), line, "version")?;
        if version != FORMAT_VERSION {
            return Err(Error::format(line, format!("unsupported version {version}")));
        }

        let (line, count_line) = lines.expect_next()?;
        let count: usize = parse_keyed(&count_line, "layers", line)?;
        if count != self.layers().len() {
            return Err(Error::format(
                line,
                format!("file has {count} layers, network has {}", self.layers().len()),
            ));
        }

        for (index, layer) in self.layers().iter().enumerate() {
            let (line, text) = lines.expect_next()?;
            let mut parts = text.split_whitespace();
            if parts.next() != Some("layer") {
                return Err(Error::format(line, "expected 'layer'"));
            }
            let input: usize = parse_field(parts.next(), line, "input size")?;
            let output: usize = parse_field(parts.next(), line, "output size")?;
            let activation = parts.next()
                .and_then(ActivationFunction::from_name)
                .ok_or_else(|| Error::format(line, "unknown activation"))?;
            let size = layer.size();
            if input != size.input_size() || output != size.output_size() || activation != layer.activation() {
                return Err(Error::format(
                    line,
                    format!(
                        "layer {index} is {input}x{output} {} in file but {}x{} {} in network",
                        activation.name(),
                        size.input_size(),
                        size.output_size(),
                        layer.activation().name()
                    ),
                ));
            }
        }

        let mut parsed = Vec::with_capacity(count);
        for layer in self.layers() {
            let size = layer.size();
            let (line, text) = lines.expect_next()?;
            let weights = parse_values(&text, "weights", line, size.output_size() * size.input_size())?;
            let (line, text) = lines.expect_next()?;
            let biases = parse_values(&text, "bias", line, size.output_size())?;
            parsed.push((
                Matrix::from_vec(size.output_size(), size.input_size(), weights)?,
                Matrix::column(biases),
            ));
        }
        lines.expect_end()?;

        for (layer, (weights, biases)) in self.layers_mut().iter_mut().zip(parsed) {
            layer.set_weights(weights)?;
            layer.set_biases(biases)?;
        }
        Ok(())
    }

    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.save(BufWriter::new(File::create(path)?))?;
        info!(path = %path.display(), "saved weights");
        Ok(())
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.load(BufReader::new(File::open(path)?))?;
        info!(path = %path.display(), "loaded weights");
        Ok(())
    }
}

fn join(m: &Matrix) -> String {
    m.as_slice().iter().map(|v| v.to_string()).collect::<Vec<_>>().join(DELIMITER)
}

/// Line reader that skips blank lines and tracks 1-based line numbers.
struct Lines<R> {
    inner: std::io::Lines<R>,
    line: usize,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Lines { inner: reader.lines(), line: 0 }
    }

    fn next_content(&mut self) -> Result<Option<(usize, String)>> {
        for text in self.inner.by_ref() {
            self.line += 1;
            let text = text?;
            if !text.trim().is_empty() {
                return Ok(Some((self.line, text.trim().to_string())));
            }
        }
        Ok(None)
    }

    fn expect_next(&mut self) -> Result<(usize, String)> {
        self.next_content()?
            .ok_or_else(|| Error::format(self.line + 1, "unexpected end of file"))
    }

    fn expect_end(&mut self) -> Result<()> {
        match self.next_content()? {
            Some((line, _)) => Err(Error::format(line, "trailing content")),
            None => Ok(()),
        }
    }
}

fn parse_field<T: std::str::FromStr>(field: Option<&str>, line: usize, what: &str) -> Result<T> {
    field
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| Error::format(line, format!("missing or invalid {what}")))
}

fn parse_keyed<T: std::str::FromStr>(text: &str, key: &str, line: usize) -> Result<T> {
    let mut parts = text.split_whitespace();
    if parts.next() != Some(key) {
        return Err(Error::format(line, format!("expected '{key}'")));
    }
    let value = parse_field(parts.next(), line, key)?;
    if parts.next().is_some() {
        return Err(Error::format(line, "trailing content"));
    }
    Ok(value)
}

fn parse_values(text: &str, key: &str, line: usize, expected: usize) -> Result<Vec<f64>> {
    let rest = text
        .strip_prefix(key)
        .filter(|r| r.starts_with(char::is_whitespace))
        .ok_or_else(|| Error::format(line, format!("expected '{key}'")))?;
    let values = rest
        .trim()
        .split(DELIMITER)
        .map(|v| v.trim().parse::<f64>().map_err(|e| Error::format(line, format!("bad value '{v}': {e}"))))
        .collect::<Result<Vec<f64>>>()?;
    if values.len() != expected {
        return Err(Error::format(
            line,
            format!("expected {expected} {key} values, found {}", values.len()),
        ));
    }
    Ok(values)
}
