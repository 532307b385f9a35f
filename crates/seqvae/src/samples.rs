//! CSV sample files
//!
//! Every record's last field is the sample body; the other fields are carried
//! along untouched. Fields are raw bytes, no encoding is assumed.

use anyhow::{bail, Context, Result};
use csv::{ByteRecord, ReaderBuilder};
use std::path::Path;
use tracing::{info, warn};

/// Read every record of `path`. Records may have different widths.
pub fn read_records(path: &Path) -> Result<Vec<ByteRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("read samples: failed to open {:?}", path))?;

    let mut records = Vec::new();
    for (index, record) in reader.byte_records().enumerate() {
        let record =
            record.with_context(|| format!("read samples: bad record {} in {:?}", index, path))?;
        if record.is_empty() {
            bail!("read samples: empty row (record {})", index);
        }
        records.push(record);
    }
    Ok(records)
}

/// The body of a record.
pub fn body(record: &ByteRecord) -> &[u8] {
    record.iter().last().unwrap_or_default()
}

/// Load the non-empty bodies of `path`. Empty bodies are skipped.
pub fn read_samples(path: &Path) -> Result<Vec<Vec<u8>>> {
    let records = read_records(path)?;
    let total = records.len();
    let samples: Vec<Vec<u8>> = records
        .iter()
        .map(body)
        .filter(|b| !b.is_empty())
        .map(<[u8]>::to_vec)
        .collect();

    let skipped = total - samples.len();
    if skipped > 0 {
        warn!("Skipped {} records with an empty body", skipped);
    }
    info!("Read {} samples from {:?}", samples.len(), path);
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_file(contents: &[u8]) -> Result<tempfile::NamedTempFile> {
        let mut f = tempfile::NamedTempFile::new()?;
        f.write_all(contents)?;
        Ok(f)
    }

    #[test]
    fn test_last_field_is_body() -> Result<()> {
        let f = csv_file(b"1,alice,hello there\n2,bob,\"quoted, with comma\"\nsolo\n")?;
        let samples = read_samples(f.path())?;
        assert_eq!(
            samples,
            vec![
                b"hello there".to_vec(),
                b"quoted, with comma".to_vec(),
                b"solo".to_vec()
            ]
        );
        Ok(())
    }

    #[test]
    fn test_empty_bodies_skipped() -> Result<()> {
        let f = csv_file(b"1,first\n2,\n3,third\n")?;
        let samples = read_samples(f.path())?;
        assert_eq!(samples, vec![b"first".to_vec(), b"third".to_vec()]);

        let records = read_records(f.path())?;
        assert_eq!(records.len(), 3);
        assert_eq!(body(&records[1]), b"");
        Ok(())
    }

    #[test]
    fn test_non_utf8_body_is_kept_as_bytes() -> Result<()> {
        let f = csv_file(b"1,hello\n2,caf\xe9 latin1\n")?;
        let samples = read_samples(f.path())?;
        assert_eq!(samples, vec![b"hello".to_vec(), b"caf\xe9 latin1".to_vec()]);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(read_samples(Path::new("/definitely/not/here.csv")).is_err());
    }
}
