//! Low-level PDF object serialization.

use crate::error::Result;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::Write;

/// Object table of a PDF file under construction. Object ids start at 1.
#[derive(Debug, Default)]
pub struct PdfWriter {
    objects: Vec<Option<Vec<u8>>>,
}

impl PdfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an object id to be filled later.
    pub fn reserve(&mut self) -> usize {
        self.objects.push(None);
        self.objects.len()
    }

    /// Set the body of a reserved object.
    pub fn set(&mut self, id: usize, body: Vec<u8>) {
        if let Some(slot) = self.objects.get_mut(id - 1) {
            *slot = Some(body);
        }
    }

    pub fn add(&mut self, body: Vec<u8>) -> usize {
        let id = self.reserve();
        self.set(id, body);
        id
    }

    /// Add a stream object with the given extra dictionary entries.
    pub fn add_stream(&mut self, dict_entries: &str, data: &[u8]) -> usize {
        let mut body = format!("<< {} /Length {} >>\nstream\n", dict_entries, data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.add(body)
    }

    /// Serialize header, objects, cross-reference table and trailer.
    pub fn finish(self, root: usize, info: Option<usize>) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        let mut offsets = Vec::with_capacity(self.objects.len());
        for (i, body) in self.objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            match body {
                Some(bytes) => out.extend_from_slice(bytes),
                None => out.extend_from_slice(b"null"),
            }
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", self.objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }

        let info_entry = info.map(|id| format!(" /Info {} 0 R", id)).unwrap_or_default();
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root {} 0 R{} >>\nstartxref\n{}\n%%EOF\n",
                self.objects.len() + 1,
                root,
                info_entry,
                xref_offset
            )
            .as_bytes(),
        );
        out
    }
}

/// Zlib-compress data for a `FlateDecode` stream.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
