use std::fs::{self, File};
use std::path::{Path, PathBuf};

use ::tar::{Builder, Header};
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::error::{ArchiveError, Result};
use crate::packaging::state::Lifecycle;
use crate::packaging::{ArchiveFormat, Archiver, OwnOutput, SourceReader, WriterState};
use crate::walk::{entry_name_of, walk_dir};

type TarGzBuilder = Builder<GzEncoder<File>>;

/// Writes a gzip compressed tarball (`.tar.gz`).
#[derive(Default)]
pub struct TarGzArchiver {
    path: Option<PathBuf>,
    builder: Lifecycle<TarGzBuilder>,
}

impl TarGzArchiver {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Header for an in-memory entry: a plain file readable by everyone,
/// stamped with the current time.
fn bytes_header(len: usize) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(::tar::EntryType::Regular);
    header.set_size(len as u64);
    header.set_mode(0o644);
    header.set_mtime(chrono::Utc::now().timestamp().max(0) as u64);
    header
}

impl Archiver for TarGzArchiver {
    fn create(&mut self, name: &str) -> Result<()> {
        self.builder.ensure_uninitialized("create")?;

        let path = PathBuf::from(ArchiveFormat::TarGz.normalize_name(name));
        let file = File::create(&path).map_err(|e| ArchiveError::filesystem(&path, e))?;
        log::info!("creating tar.gz archive {}", path.display());

        let encoder = GzEncoder::new(file, Compression::default());
        self.builder.open(Builder::new(encoder));
        self.path = Some(path);
        Ok(())
    }

    fn add(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let builder = self.builder.encoder_mut("add to")?;
        let mut header = bytes_header(bytes.len());
        builder
            .append_data(&mut header, name, bytes)
            .map_err(|e| ArchiveError::encoding(name, e))?;
        log::debug!("added {name} ({} bytes)", bytes.len());
        Ok(())
    }

    fn add_file(&mut self, path: &Path) -> Result<()> {
        self.builder.encoder_mut("add a file to")?;
        let bytes = fs::read(path).map_err(|e| ArchiveError::filesystem(path, e))?;
        let name = entry_name_of(path)?;
        self.add(&name, &bytes)
    }

    fn add_all(&mut self, dir: &Path, include_root: bool) -> Result<()> {
        let own_output = OwnOutput::new(self.path.as_deref());
        let builder = self.builder.encoder_mut("add a directory to")?;

        walk_dir(dir, dir, include_root, &mut |visit, file| {
            if own_output.matches(visit.path) {
                log::debug!("skipping {}: archive output", visit.entry_name);
                return Ok(());
            }

            let mut header = Header::new_gnu();
            header.set_metadata(visit.metadata);
            // The header size is fixed now; a file growing meanwhile must
            // not spill past it.
            let mut source = SourceReader::new(file, visit.metadata.len());
            builder
                .append_data(&mut header, visit.entry_name, &mut source)
                .map_err(|e| source.classify(visit.path, visit.entry_name, e))?;
            log::debug!("added {} ({} bytes)", visit.entry_name, visit.metadata.len());
            Ok(())
        })
    }

    fn close(&mut self) -> Result<()> {
        let builder = self.builder.take_for_close()?;
        let path = self.path.clone().unwrap_or_default();
        let archive = path.display().to_string();

        // Both the tar trailer and the gzip footer have to be written.
        let encoder = builder
            .into_inner()
            .map_err(|e| ArchiveError::encoding(archive.as_str(), e))?;
        let file = encoder
            .finish()
            .map_err(|e| ArchiveError::encoding(archive.as_str(), e))?;
        file.sync_all()
            .map_err(|e| ArchiveError::filesystem(&path, e))?;

        log::info!("closed tar.gz archive {archive}");
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn state(&self) -> WriterState {
        self.builder.state()
    }

    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::TarGz
    }
}
