//! Plaintext bundle container: deterministic tar.gz.
//!
//! The container holds `snapshot.json` plus each resolved document under its
//! base filename. Headers are normalized (mtime 0, fixed mode/owner) so the
//! same inputs produce the same bytes.

use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use std::io::{Read, Write};
use tar::{Archive, Builder, Header};

/// Entry name for the serialized candidate snapshot.
pub const SNAPSHOT_ENTRY: &str = "snapshot.json";

/// Streaming writer for the plaintext container.
pub struct ContainerWriter<W: Write> {
    tar: Builder<flate2::write::GzEncoder<W>>,
}

impl<W: Write> ContainerWriter<W> {
    pub fn new(writer: W) -> Self {
        let encoder = GzBuilder::new()
            .mtime(0)
            .operating_system(255)
            .write(writer, Compression::default());
        let mut tar = Builder::new(encoder);
        tar.mode(tar::HeaderMode::Deterministic);
        Self { tar }
    }

    /// Append one entry under its base filename. Collisions are not
    /// special-cased: archiving tools read the last entry for a repeated name.
    pub fn append(&mut self, name: &str, data: &[u8]) -> std::io::Result<()> {
        let mut header = Header::new_gnu();
        header.set_path(name)?;
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_uid(0);
        header.set_gid(0);
        header.set_mtime(0);
        header.set_username("dossier")?;
        header.set_groupname("dossier")?;
        header.set_cksum();
        self.tar.append(&header, data)
    }

    pub fn finish(self) -> std::io::Result<()> {
        let encoder = self.tar.into_inner()?;
        encoder.finish()?;
        Ok(())
    }
}

/// Read every entry of a plaintext container as `(name, bytes)` pairs, in
/// archive order. For repeated names the later entry wins.
pub fn read_container(bytes: &[u8]) -> std::io::Result<Vec<(String, Vec<u8>)>> {
    let mut archive = Archive::new(GzDecoder::new(bytes));
    let mut out = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().into_owned();
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        if let Some(existing) = out.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = data;
        } else {
            out.push((name, data));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_roundtrip() {
        let mut raw = Vec::new();
        let mut writer = ContainerWriter::new(&mut raw);
        writer.append(SNAPSHOT_ENTRY, br#"{"id":1}"#).unwrap();
        writer.append("report.pdf", b"report bytes").unwrap();
        writer.append("slides.pdf", b"slides bytes").unwrap();
        writer.finish().unwrap();

        let entries = read_container(&raw).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0, SNAPSHOT_ENTRY);
        assert_eq!(entries[1], ("report.pdf".to_string(), b"report bytes".to_vec()));
        assert_eq!(entries[2], ("slides.pdf".to_string(), b"slides bytes".to_vec()));
    }

    #[test]
    fn test_same_inputs_same_bytes() {
        let build = || {
            let mut raw = Vec::new();
            let mut writer = ContainerWriter::new(&mut raw);
            writer.append("a.txt", b"alpha").unwrap();
            writer.append("b.txt", b"beta").unwrap();
            writer.finish().unwrap();
            raw
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_name_collision_last_write_wins() {
        let mut raw = Vec::new();
        let mut writer = ContainerWriter::new(&mut raw);
        writer.append("report.pdf", b"first").unwrap();
        writer.append("report.pdf", b"second").unwrap();
        writer.finish().unwrap();

        let entries = read_container(&raw).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1, b"second".to_vec());
    }
}
