//! Streaming writer for the DeepMimic animation document.

use crate::error::Result;
use std::io::Write;

/// Writes `{"Loop": "wrap", "Frames": [...]}` one key-frame line at a time.
///
/// Frame lines end with a comma except the last one, so each line is held
/// back until the writer knows whether another frame follows. Memory use is
/// bounded by a single key frame regardless of animation length.
pub struct DocumentWriter<W: Write> {
    out: W,
    pending: Option<String>,
}

impl<W: Write> DocumentWriter<W> {
    pub fn new(out: W) -> DocumentWriter<W> {
        DocumentWriter { out, pending: None }
    }

    /// Emit the document header.
    pub fn begin(&mut self) -> Result<()> {
        writeln!(self.out, "{{")?;
        writeln!(self.out, "\"Loop\": \"wrap\",")?;
        writeln!(self.out, "\"Frames\":")?;
        writeln!(self.out, "[")?;
        Ok(())
    }

    /// Emit one key frame.
    pub fn frame(&mut self, scalars: &[f64]) -> Result<()> {
        if let Some(previous) = self.pending.take() {
            writeln!(self.out, "{previous},")?;
        }
        let mut line = String::with_capacity(scalars.len() * 8);
        line.push('[');
        for (i, value) in scalars.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.push_str(&value.to_string());
        }
        line.push(']');
        self.pending = Some(line);
        Ok(())
    }

    /// Close the frame list and the document, returning the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        if let Some(last) = self.pending.take() {
            writeln!(self.out, "{last}")?;
        }
        writeln!(self.out, "]")?;
        writeln!(self.out, "}}")?;
        Ok(self.out)
    }
}
