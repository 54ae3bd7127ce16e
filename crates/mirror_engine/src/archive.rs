use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const DOCUMENT_ENTRY: &str = "index.html";
pub const STYLES_ENTRY: &str = "styles.css";
pub const SCRIPTS_ENTRY: &str = "script.js";

/// Entry names in the order they are written.
pub const ARCHIVE_ENTRIES: [&str; 3] = [DOCUMENT_ENTRY, STYLES_ENTRY, SCRIPTS_ENTRY];

#[derive(Debug, thiserror::Error)]
pub enum ArchiveBuildError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Packs the page and its aggregated resources into an in-memory zip.
///
/// All three entries are always written, empty or not, so every archive has
/// the same shape. The document goes in byte for byte.
pub fn build_archive(
    document: &[u8],
    styles: &str,
    scripts: &str,
) -> Result<Vec<u8>, ArchiveBuildError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, content) in ARCHIVE_ENTRIES
        .iter()
        .zip([document, styles.as_bytes(), scripts.as_bytes()])
    {
        writer.start_file(*name, options)?;
        writer.write_all(content)?;
    }

    Ok(writer.finish()?.into_inner())
}
