//! Archive writer tests: incremental build, header lock, round trips

use anyhow::Result;
use std::fs;

use star_archive::error::ArchiveError;
use star_archive::{Archive, ArchiveWriter, TermRegistry};

mod writing_tests {
    use super::*;

    #[test]
    fn test_round_trip_single_record() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let registry = TermRegistry::new();
        let occurrence = registry.resolve("Occurrence")?;
        let name = registry.resolve("scientificName")?;

        let mut writer = ArchiveWriter::new(dir.path(), occurrence)?;
        writer.start_core_record("1")?;
        writer.set_core_value(&name, "Abies alba")?;
        writer.close()?;

        let archive = Archive::open(dir.path(), &registry)?;
        let records: Vec<_> = archive.iter()?.collect::<Result<Vec<_>, _>>()?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].core_id(), Some("1"));
        assert_eq!(records[0].core().value(&name), Some("Abies alba"));
        Ok(())
    }

    #[test]
    fn test_round_trip_with_extensions_and_headers() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let registry = TermRegistry::new();
        let occurrence = registry.resolve("Occurrence")?;
        let measurement = registry.resolve("MeasurementOrFact")?;
        let name = registry.resolve("scientificName")?;
        let mtype = registry.resolve("measurementType")?;
        let mvalue = registry.resolve("measurementValue")?;

        let mut writer = ArchiveWriter::new(dir.path(), occurrence)?.with_headers();
        writer.start_core_record("1")?;
        writer.set_core_value(&name, "Abies alba")?;
        writer.add_extension_record(
            &measurement,
            &[
                (mtype.clone(), "height".to_string()),
                (mvalue.clone(), "12.5".to_string()),
            ],
        )?;
        writer.add_extension_record(&measurement, &[(mtype.clone(), "age".to_string())])?;
        writer.start_core_record("2")?;
        writer.set_core_value(&name, "Picea abies")?;
        writer.close()?;

        // generated package layout
        let occurrence_file = fs::read_to_string(dir.path().join("occurrence.txt"))?;
        assert!(occurrence_file.starts_with("occurrenceID\tscientificName\n"));
        let measurement_file = fs::read_to_string(dir.path().join("measurementorfact.txt"))?;
        assert!(measurement_file.starts_with("measurementID\tmeasurementType\tmeasurementValue\n"));

        let archive = Archive::open(dir.path(), &registry)?;
        let records: Vec<_> = archive.iter()?.collect::<Result<Vec<_>, _>>()?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].extensions(&measurement)?.len(), 2);
        assert_eq!(
            records[0].extensions(&measurement)?[0].value(&mvalue),
            Some("12.5")
        );
        assert_eq!(records[1].extensions(&measurement)?.len(), 0);
        Ok(())
    }

    #[test]
    fn test_header_lock_after_first_flush() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let registry = TermRegistry::new();
        let occurrence = registry.resolve("Occurrence")?;
        let name = registry.resolve("scientificName")?;
        let country = registry.resolve("country")?;

        let mut writer = ArchiveWriter::new(dir.path(), occurrence)?.with_headers();
        writer.start_core_record("1")?;
        writer.set_core_value(&name, "Abies alba")?;
        // flushes row 1 and with it the header
        writer.start_core_record("2")?;
        let result = writer.set_core_value(&country, "AT");
        assert!(matches!(result, Err(ArchiveError::IllegalState(_))));
        Ok(())
    }

    #[test]
    fn test_set_core_value_requires_open_record() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let registry = TermRegistry::new();
        let occurrence = registry.resolve("Occurrence")?;
        let name = registry.resolve("scientificName")?;

        let mut writer = ArchiveWriter::new(dir.path(), occurrence)?;
        assert!(matches!(
            writer.set_core_value(&name, "x"),
            Err(ArchiveError::IllegalState(_))
        ));
        Ok(())
    }

    #[test]
    fn test_extension_record_without_core_is_dropped() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let registry = TermRegistry::new();
        let occurrence = registry.resolve("Occurrence")?;
        let measurement = registry.resolve("MeasurementOrFact")?;
        let mtype = registry.resolve("measurementType")?;

        let mut writer = ArchiveWriter::new(dir.path(), occurrence)?;
        writer.add_extension_record(&measurement, &[(mtype, "height".to_string())])?;
        let archive = writer.close()?;
        assert!(archive.extensions().is_empty());
        assert!(!dir.path().join("measurementorfact.txt").exists());
        Ok(())
    }

    #[test]
    fn test_control_characters_scrubbed_and_empty_rows_suppressed() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let registry = TermRegistry::new();
        let occurrence = registry.resolve("Occurrence")?;
        let name = registry.resolve("scientificName")?;

        let mut writer = ArchiveWriter::new(dir.path(), occurrence)?;
        writer.start_core_record("1")?;
        writer.set_core_value(&name, "Abies\talba\nvar.")?;
        // entirely empty record, suppressed on flush
        writer.start_core_record("")?;
        writer.close()?;

        let content = fs::read_to_string(dir.path().join("occurrence.txt"))?;
        assert_eq!(content, "1\tAbies alba var.\n");
        Ok(())
    }

    #[test]
    fn test_metadata_document_written_and_referenced() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let registry = TermRegistry::new();
        let occurrence = registry.resolve("Occurrence")?;

        let mut writer = ArchiveWriter::new(dir.path(), occurrence)?;
        writer.set_metadata_document("<metadata><title>Test</title></metadata>");
        writer.start_core_record("1")?;
        let archive = writer.close()?;

        assert_eq!(archive.metadata_location(), Some("metadata.xml"));
        let metadata = fs::read_to_string(dir.path().join("metadata.xml"))?;
        assert!(metadata.contains("Test"));

        let reopened = Archive::open(dir.path(), &registry)?;
        assert_eq!(reopened.metadata_location(), Some("metadata.xml"));
        Ok(())
    }
}
