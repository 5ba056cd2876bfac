//! Source-file metadata access.
//!
//! The pipeline only ever asks for named tags; a missing tag maps to `None`
//! rather than an error. Only an unreadable or corrupt source is an `Err`.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

pub trait MetadataReader: Send + Sync {
    /// Read the requested tags from `source`. Every requested tag is present
    /// in the result; tags absent from the source map to `None`.
    fn read_tags(&self, source: &Path, tags: &[&str]) -> Result<HashMap<String, Option<String>>>;
}

const FITS_BLOCK_SIZE: usize = 2880;
const FITS_CARD_SIZE: usize = 80;
// A quicklook header is a handful of blocks; anything larger is corrupt.
const MAX_HEADER_BLOCKS: usize = 64;

/// Reads keyword cards from the primary header of a FITS file.
#[derive(Debug, Default, Clone, Copy)]
pub struct FitsHeaderReader;

impl MetadataReader for FitsHeaderReader {
    fn read_tags(&self, source: &Path, tags: &[&str]) -> Result<HashMap<String, Option<String>>> {
        let mut result: HashMap<String, Option<String>> =
            tags.iter().map(|tag| (tag.to_string(), None)).collect();

        let mut file =
            File::open(source).with_context(|| format!("failed to open {:?}", source))?;
        let mut block = [0u8; FITS_BLOCK_SIZE];

        for _ in 0..MAX_HEADER_BLOCKS {
            file.read_exact(&mut block)
                .with_context(|| format!("truncated FITS header in {:?}", source))?;

            for card in block.chunks_exact(FITS_CARD_SIZE) {
                let keyword = std::str::from_utf8(&card[..8]).unwrap_or("").trim_end();
                if keyword == "END" {
                    return Ok(result);
                }
                if &card[8..10] != b"= " {
                    continue;
                }
                if let Some(value) = result.get_mut(keyword) {
                    *value = Some(parse_card_value(&card[10..]));
                }
            }
        }

        Err(anyhow!(
            "no END card within the first {} header blocks of {:?}",
            MAX_HEADER_BLOCKS,
            source
        ))
    }
}

fn parse_card_value(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_start();
    if let Some(rest) = text.strip_prefix('\'') {
        // Quoted string: everything up to the closing quote, trailing blanks
        // inside the quotes are not significant.
        match rest.find('\'') {
            Some(end) => rest[..end].trim_end().to_string(),
            None => rest.trim_end().to_string(),
        }
    } else {
        // Numeric or logical value, an optional comment follows '/'.
        text.split('/').next().unwrap_or("").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn card(keyword: &str, value: &str) -> Vec<u8> {
        let mut card = format!("{:<8}= {}", keyword, value).into_bytes();
        card.resize(FITS_CARD_SIZE, b' ');
        card
    }

    fn write_fits(cards: &[Vec<u8>]) -> tempfile::NamedTempFile {
        let mut block = Vec::new();
        for c in cards {
            block.extend_from_slice(c);
        }
        let mut end = b"END".to_vec();
        end.resize(FITS_CARD_SIZE, b' ');
        block.extend_from_slice(&end);
        block.resize(FITS_BLOCK_SIZE, b' ');

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&block).unwrap();
        file
    }

    #[test]
    fn reads_requested_tags_and_marks_missing_ones_absent() {
        let file = write_fits(&[
            card("SIMPLE", "T"),
            card("DATE-OBS", "'2024-01-01T05:37:00.000'"),
            card("WAVELNTH", "171 / [angstrom]"),
            card("QUALITY", "0"),
        ]);

        let tags = FitsHeaderReader
            .read_tags(file.path(), &["DATE-OBS", "WAVELNTH", "QUALITY", "EXPTIME"])
            .unwrap();

        assert_eq!(
            tags["DATE-OBS"].as_deref(),
            Some("2024-01-01T05:37:00.000")
        );
        assert_eq!(tags["WAVELNTH"].as_deref(), Some("171"));
        assert_eq!(tags["QUALITY"].as_deref(), Some("0"));
        assert_eq!(tags["EXPTIME"], None);
    }

    #[test]
    fn unreadable_source_is_an_error() {
        let result = FitsHeaderReader.read_tags(Path::new("/nonexistent.fits"), &["DATE-OBS"]);
        assert!(result.is_err());
    }

    #[test]
    fn truncated_header_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"SIMPLE  = T").unwrap();
        let result = FitsHeaderReader.read_tags(file.path(), &["DATE-OBS"]);
        assert!(result.is_err());
    }
}
