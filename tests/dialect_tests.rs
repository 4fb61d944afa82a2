//! Dialect detection tests against on-disk fixtures

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use star_archive::error::ArchiveError;
use star_archive::{Archive, TermRegistry, dialect};

fn write_fixture(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod detection_tests {
    use super::*;

    #[test]
    fn test_detect_quoted_csv() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut content = String::new();
        for i in 0..10 {
            // only some rows carry an embedded comma, so a misquoted reading
            // produces inconsistent column counts
            let note = if i % 2 == 0 {
                format!("note, row {i}")
            } else {
                format!("note {i}")
            };
            content.push_str(&format!("\"{i}\",\"name {i}\",\"{note}\"\n"));
        }
        let path = write_fixture(&dir, "data.csv", content.as_bytes());

        let dialect = dialect::detect(&path)?;
        assert_eq!(dialect.delimiter, ",");
        assert_eq!(dialect.quote, Some('"'));
        assert_eq!(dialect.encoding, "utf8");
        Ok(())
    }

    #[test]
    fn test_detect_unquoted_tsv() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut content = String::new();
        for i in 0..10 {
            content.push_str(&format!("{i}\tname {i}\tsome note\n"));
        }
        let path = write_fixture(&dir, "data.txt", content.as_bytes());

        let dialect = dialect::detect(&path)?;
        assert_eq!(dialect.delimiter, "\t");
        assert_eq!(dialect.quote, None);
        Ok(())
    }

    #[test]
    fn test_detect_semicolon_latin1() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut content: Vec<u8> = Vec::new();
        for i in 0..10 {
            content.extend_from_slice(format!("{i};caf").as_bytes());
            // 0xE9 is e-acute in latin1 and an invalid byte in utf8
            content.push(0xE9);
            content.extend_from_slice(format!(" {i};x\n").as_bytes());
        }
        let path = write_fixture(&dir, "data.txt", &content);

        let dialect = dialect::detect(&path)?;
        assert_eq!(dialect.encoding, "latin1");
        assert_eq!(dialect.delimiter, ";");
        Ok(())
    }

    #[test]
    fn test_single_column_file_takes_first_candidate() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_fixture(&dir, "plain.txt", b"alpha\nbeta\ngamma\n");
        // one consistent column scores 1 for every candidate, so the first
        // candidate pair wins
        let dialect = dialect::detect(&path)?;
        assert_eq!(dialect.delimiter, ",");
        assert_eq!(dialect.quote, Some('"'));
        Ok(())
    }

    #[test]
    fn test_blank_file_has_no_sampleable_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "blank.txt", b"\n\n\n");
        assert!(matches!(
            dialect::detect(&path),
            Err(ArchiveError::UnknownDelimiters(_))
        ));
    }

    #[test]
    fn test_binary_file_has_unknown_charset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "blob.bin", &[b'a', 0, 1, 2, b'b', 0, 3]);
        assert!(matches!(
            dialect::detect(&path),
            Err(ArchiveError::UnknownCharset(_))
        ));
    }
}

mod schemaless_open_tests {
    use super::*;

    #[test]
    fn test_open_bare_data_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let content = "\
occurrenceID,scientificName,country
1,Abies alba,AT
2,Picea abies,CH
3,Larix decidua,IT
";
        let path = write_fixture(&dir, "occurrence.csv", content.as_bytes());

        let registry = TermRegistry::new();
        let archive = Archive::from_data_file(&path, &registry)?;
        assert_eq!(archive.core().header_line_count, 1);
        assert_eq!(archive.core().first_location(), Some("occurrence.csv"));
        assert!(archive.core().has_indexed_id());

        let name = registry.resolve("scientificName")?;
        let records: Vec<_> = archive.iter()?.collect::<Result<Vec<_>, _>>()?;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].core_id(), Some("1"));
        assert_eq!(records[1].core().value(&name), Some("Picea abies"));
        Ok(())
    }
}
