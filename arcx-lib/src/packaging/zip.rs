use std::fs::{self, File, Metadata};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, DateTime, ZipWriter};
use chrono::{Datelike, Local, Timelike};

use crate::error::{ArchiveError, Result};
use crate::packaging::state::Lifecycle;
use crate::packaging::{ArchiveFormat, Archiver, OwnOutput, SourceReader, WriterState};
use crate::walk::{entry_name_of, walk_dir};

/// Writes a `.zip` archive. Entries are deflated.
#[derive(Default)]
pub struct ZipArchiver {
    path: Option<PathBuf>,
    writer: Lifecycle<ZipWriter<File>>,
}

impl ZipArchiver {
    pub fn new() -> Self {
        Self::default()
    }
}

fn base_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Options derived from file metadata, like a header built from a stat call.
fn options_from_metadata(metadata: &Metadata) -> SimpleFileOptions {
    let mut options = base_options().large_file(metadata.len() >= u32::MAX as u64);

    if let Some(modified) = metadata.modified().ok().and_then(zip_datetime) {
        options = options.last_modified_time(modified);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        options = options.unix_permissions(metadata.permissions().mode());
    }

    options
}

/// Zip timestamps cover 1980..=2107 in local time; anything else keeps the
/// encoder default.
fn zip_datetime(time: std::time::SystemTime) -> Option<DateTime> {
    let local: chrono::DateTime<Local> = time.into();
    let year = u16::try_from(local.year()).ok()?;
    DateTime::from_date_and_time(
        year,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}

impl Archiver for ZipArchiver {
    fn create(&mut self, name: &str) -> Result<()> {
        self.writer.ensure_uninitialized("create")?;

        let path = PathBuf::from(ArchiveFormat::Zip.normalize_name(name));
        let file = File::create(&path).map_err(|e| ArchiveError::filesystem(&path, e))?;
        log::info!("creating zip archive {}", path.display());

        self.writer.open(ZipWriter::new(file));
        self.path = Some(path);
        Ok(())
    }

    fn add(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let zip = self.writer.encoder_mut("add to")?;
        zip.start_file(name, base_options())
            .map_err(|e| ArchiveError::encoding(name, e))?;
        zip.write_all(bytes)
            .map_err(|e| ArchiveError::encoding(name, e))?;
        log::debug!("added {name} ({} bytes)", bytes.len());
        Ok(())
    }

    fn add_file(&mut self, path: &Path) -> Result<()> {
        self.writer.encoder_mut("add a file to")?;
        let bytes = fs::read(path).map_err(|e| ArchiveError::filesystem(path, e))?;
        let name = entry_name_of(path)?;
        self.add(&name, &bytes)
    }

    fn add_all(&mut self, dir: &Path, include_root: bool) -> Result<()> {
        let own_output = OwnOutput::new(self.path.as_deref());
        let zip = self.writer.encoder_mut("add a directory to")?;

        walk_dir(dir, dir, include_root, &mut |visit, file| {
            if own_output.matches(visit.path) {
                log::debug!("skipping {}: archive output", visit.entry_name);
                return Ok(());
            }

            zip.start_file(visit.entry_name, options_from_metadata(visit.metadata))
                .map_err(|e| ArchiveError::encoding(visit.entry_name, e))?;
            let mut source = SourceReader::new(file, visit.metadata.len());
            let copied = io::copy(&mut source, &mut *zip)
                .map_err(|e| source.classify(visit.path, visit.entry_name, e))?;
            log::debug!("added {} ({copied} bytes)", visit.entry_name);
            Ok(())
        })
    }

    fn close(&mut self) -> Result<()> {
        let zip = self.writer.take_for_close()?;
        let path = self.path.clone().unwrap_or_default();

        let file = zip
            .finish()
            .map_err(|e| ArchiveError::encoding(path.display().to_string(), e))?;
        file.sync_all()
            .map_err(|e| ArchiveError::filesystem(&path, e))?;

        log::info!("closed zip archive {}", path.display());
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn state(&self) -> WriterState {
        self.writer.state()
    }

    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }
}
