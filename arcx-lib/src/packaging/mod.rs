use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ArchiveError, Result};

pub mod state;
pub mod tar;
pub mod zip;

pub use state::WriterState;

/// Uniform interface over the supported archive formats.
///
/// A writer starts uninitialized, becomes open with [`Archiver::create`] and
/// is finalized by [`Archiver::close`]. Adding entries is only allowed while
/// open; anything else returns [`crate::ArchiveError::InvalidState`].
pub trait Archiver {
    /// Creates the output file, fixing its extension for the format.
    fn create(&mut self, name: &str) -> Result<()>;

    /// Writes `bytes` as a new entry called `name`.
    fn add(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Reads the file at `path` into memory and stores it under its own path.
    fn add_file(&mut self, path: &Path) -> Result<()>;

    /// Stores every regular file below `dir`, streaming each one.
    ///
    /// Entry names are relative to `dir`; with `include_root` they are nested
    /// under a folder named after `dir`.
    fn add_all(&mut self, dir: &Path, include_root: bool) -> Result<()>;

    /// Finalizes the archive and flushes it to disk.
    fn close(&mut self) -> Result<()>;

    /// Output path, known once the archive was created.
    fn path(&self) -> Option<&Path>;

    fn state(&self) -> WriterState;

    fn format(&self) -> ArchiveFormat;
}

/// Archive format to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    #[default]
    Zip,
    /// Tar stream wrapped in gzip.
    TarGz,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => ".zip",
            ArchiveFormat::TarGz => ".tar.gz",
        }
    }

    /// Makes `name` end with this format's extension.
    ///
    /// The other format's extension is replaced, anything else gets the
    /// extension appended.
    pub fn normalize_name(&self, name: &str) -> String {
        let wanted = self.extension();
        if name.ends_with(wanted) {
            return name.to_string();
        }

        let other = match self {
            ArchiveFormat::Zip => ArchiveFormat::TarGz,
            ArchiveFormat::TarGz => ArchiveFormat::Zip,
        };
        match name.strip_suffix(other.extension()) {
            Some(stem) => format!("{stem}{wanted}"),
            None => format!("{name}{wanted}"),
        }
    }

    /// Builds a fresh, uninitialized writer for this format.
    pub fn archiver(&self) -> Box<dyn Archiver> {
        match self {
            ArchiveFormat::Zip => Box::new(zip::ZipArchiver::new()),
            ArchiveFormat::TarGz => Box::new(tar::TarGzArchiver::new()),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::Zip => write!(f, "zip"),
            ArchiveFormat::TarGz => write!(f, "tar.gz"),
        }
    }
}

/// Error for format names that are not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown archive format '{0}', expected zip or tar")]
pub struct UnknownFormat(pub String);

impl FromStr for ArchiveFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar" | "tar.gz" | "tgz" | "targz" => Ok(ArchiveFormat::TarGz),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Packs `paths` into a single archive named after `output`.
///
/// Directories are added with [`Archiver::add_all`], plain files with
/// [`Archiver::add_file`]. Returns the path of the written archive. On error
/// the partially written archive is left behind.
pub fn archive_paths<P: AsRef<Path>>(
    format: ArchiveFormat,
    output: &str,
    paths: &[P],
    include_root: bool,
) -> Result<PathBuf> {
    let mut archiver = format.archiver();
    archiver.create(output)?;

    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            archiver.add_all(path, include_root)?;
        } else {
            archiver.add_file(path)?;
        }
    }

    archiver.close()?;
    Ok(archiver
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format.normalize_name(output))))
}

/// Recognizes the archive's own output file while walking a tree that may
/// contain it. Streaming the output into itself would never reach its end.
pub(crate) struct OwnOutput {
    canonical: Option<PathBuf>,
}

impl OwnOutput {
    pub(crate) fn new(output: Option<&Path>) -> Self {
        Self {
            canonical: output.and_then(|p| fs::canonicalize(p).ok()),
        }
    }

    pub(crate) fn matches(&self, candidate: &Path) -> bool {
        let Some(canonical) = &self.canonical else {
            return false;
        };
        // Cheap name check first; only same-named files get resolved.
        candidate.file_name() == canonical.file_name()
            && fs::canonicalize(candidate).is_ok_and(|p| &p == canonical)
    }
}

/// Reader over a walked file, capped at the size it had when it was opened.
///
/// Remembers whether reading failed, so a failed copy can be reported as a
/// filesystem error rather than blamed on the encoder.
pub(crate) struct SourceReader<R> {
    inner: io::Take<R>,
    read_failed: bool,
}

impl<R: Read> SourceReader<R> {
    pub(crate) fn new(inner: R, len: u64) -> Self {
        Self {
            inner: inner.take(len),
            read_failed: false,
        }
    }

    /// Turns an error from copying this reader into the encoder into the
    /// matching [`ArchiveError`].
    pub(crate) fn classify(&self, path: &Path, entry: &str, err: io::Error) -> ArchiveError {
        if self.read_failed {
            ArchiveError::filesystem(path, err)
        } else {
            ArchiveError::encoding(entry, err)
        }
    }
}

impl<R: Read> Read for SourceReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).inspect_err(|e| {
            if e.kind() != io::ErrorKind::Interrupted {
                self.read_failed = true;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    struct FailingDisk;

    impl Read for FailingDisk {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device went away"))
        }
    }

    struct FailingSink;

    impl io::Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("encoder rejected data"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn source_is_capped_at_opened_size() {
        let mut source = SourceReader::new(&b"0123456789"[..], 4);
        let mut out = Vec::new();
        io::copy(&mut source, &mut out).unwrap();
        assert_eq!(out, b"0123");
    }

    #[test]
    fn read_failures_are_filesystem_errors() {
        let mut source = SourceReader::new(FailingDisk, 10);
        let err = io::copy(&mut source, &mut io::sink()).unwrap_err();
        let err = source.classify(Path::new("data/a.bin"), "a.bin", err);
        assert_eq!(err.kind(), ErrorKind::Filesystem);
    }

    #[test]
    fn write_failures_are_encoding_errors() {
        let mut source = SourceReader::new(&b"payload"[..], 7);
        let err = io::copy(&mut source, &mut FailingSink).unwrap_err();
        let err = source.classify(Path::new("data/a.bin"), "a.bin", err);
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }

    #[test]
    fn own_output_matches_only_itself() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("out.zip");
        fs::write(&output, b"").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/out.zip"), b"").unwrap();

        let own = OwnOutput::new(Some(&output));
        assert!(own.matches(&tmp.path().join("sub/../out.zip")));
        assert!(!own.matches(&tmp.path().join("sub/out.zip")));
        assert!(!OwnOutput::new(None).matches(&output));
    }

    #[test]
    fn zip_names() {
        let f = ArchiveFormat::Zip;
        assert_eq!(f.normalize_name("out"), "out.zip");
        assert_eq!(f.normalize_name("out.zip"), "out.zip");
        assert_eq!(f.normalize_name("out.tar.gz"), "out.zip");
        assert_eq!(f.normalize_name("out.txt"), "out.txt.zip");
    }

    #[test]
    fn tar_names() {
        let f = ArchiveFormat::TarGz;
        assert_eq!(f.normalize_name("out"), "out.tar.gz");
        assert_eq!(f.normalize_name("out.tar.gz"), "out.tar.gz");
        assert_eq!(f.normalize_name("out.zip"), "out.tar.gz");
        assert_eq!(f.normalize_name("backups/site.zip"), "backups/site.tar.gz");
    }

    #[test]
    fn parse_format() {
        assert_eq!("zip".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Zip);
        assert_eq!("TAR".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::TarGz);
        assert_eq!("tgz".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::TarGz);
        assert!("7z".parse::<ArchiveFormat>().is_err());
    }

    #[test]
    fn fresh_archivers_are_uninitialized() {
        for format in [ArchiveFormat::Zip, ArchiveFormat::TarGz] {
            let archiver = format.archiver();
            assert_eq!(archiver.state(), WriterState::Uninitialized);
            assert_eq!(archiver.format(), format);
            assert!(archiver.path().is_none());
        }
    }
}
