//! Descriptor generation, the parser's dual
//!
//! Serializes an archive's schema model back into a descriptor document.
//! Control characters in delimiter attributes are re-escaped to their
//! two-character forms, and a disabled quote is written as an explicitly
//! empty `fieldsEnclosedBy`.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs;

use crate::error::ArchiveError;
use crate::model::{Archive, DataType, Field, FileSchema};

use super::{ARCHIVE_NAMESPACE, DESCRIPTOR_FILENAME, escape_delimiter};

/// Generate the descriptor document for an archive as an XML string.
pub fn descriptor_xml(archive: &Archive) -> Result<String, ArchiveError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| ArchiveError::Descriptor(e.to_string()))?;

    let mut root = BytesStart::new("archive");
    root.push_attribute(("xmlns", ARCHIVE_NAMESPACE));
    if let Some(metadata) = archive.metadata_location() {
        root.push_attribute(("metadata", metadata));
    }
    writer
        .write_event(Event::Start(root))
        .map_err(|e| ArchiveError::Descriptor(e.to_string()))?;

    write_schema(&mut writer, archive.core(), true)?;
    for extension in archive.extensions() {
        write_schema(&mut writer, extension, false)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("archive")))
        .map_err(|e| ArchiveError::Descriptor(e.to_string()))?;

    let bytes = writer.into_inner();
    String::from_utf8(bytes).map_err(|e| ArchiveError::Descriptor(e.to_string()))
}

/// Generate and write `meta.xml` into the archive's base directory.
pub fn write_descriptor(archive: &Archive) -> Result<(), ArchiveError> {
    let xml = descriptor_xml(archive)?;
    fs::write(archive.base_dir().join(DESCRIPTOR_FILENAME), xml)?;
    Ok(())
}

fn write_schema(
    writer: &mut Writer<Vec<u8>>,
    schema: &FileSchema,
    is_core: bool,
) -> Result<(), ArchiveError> {
    let element = if is_core { "core" } else { "extension" };
    let mut start = BytesStart::new(element);
    start.push_attribute(("encoding", schema.encoding.as_str()));
    start.push_attribute((
        "fieldsTerminatedBy",
        escape_delimiter(&schema.field_delimiter).as_str(),
    ));
    let quote = schema
        .quote_char
        .map(|q| escape_delimiter(&q.to_string()))
        .unwrap_or_default();
    start.push_attribute(("fieldsEnclosedBy", quote.as_str()));
    start.push_attribute((
        "linesTerminatedBy",
        escape_delimiter(&schema.line_terminator).as_str(),
    ));
    start.push_attribute((
        "ignoreHeaderLines",
        schema.header_line_count.to_string().as_str(),
    ));
    start.push_attribute(("rowType", schema.row_type.qualified_name()));
    writer
        .write_event(Event::Start(start))
        .map_err(|e| ArchiveError::Descriptor(e.to_string()))?;

    writer
        .write_event(Event::Start(BytesStart::new("files")))
        .map_err(|e| ArchiveError::Descriptor(e.to_string()))?;
    for location in &schema.locations {
        write_text_element(writer, "location", location)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("files")))
        .map_err(|e| ArchiveError::Descriptor(e.to_string()))?;

    if let Some(id_field) = &schema.id_field {
        let element = if is_core { "id" } else { "coreid" };
        let mut id = BytesStart::new(element);
        if let Some(index) = id_field.index {
            id.push_attribute(("index", index.to_string().as_str()));
        }
        writer
            .write_event(Event::Empty(id))
            .map_err(|e| ArchiveError::Descriptor(e.to_string()))?;
    }

    for field in schema.fields_sorted() {
        write_field(writer, field)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(element)))
        .map_err(|e| ArchiveError::Descriptor(e.to_string()))?;
    Ok(())
}

fn write_field(writer: &mut Writer<Vec<u8>>, field: &Field) -> Result<(), ArchiveError> {
    let mut start = BytesStart::new("field");
    if let Some(index) = field.index {
        start.push_attribute(("index", index.to_string().as_str()));
    }
    start.push_attribute(("term", field.term.qualified_name()));
    if field.data_type != DataType::String {
        start.push_attribute(("type", field.data_type.declared_name()));
    }
    if let Some(default) = &field.default_value {
        start.push_attribute(("default", default.as_str()));
    }
    if let Some(vocabulary) = &field.vocabulary_ref {
        start.push_attribute(("vocabulary", vocabulary.as_str()));
    }
    if let Some(delimiter) = &field.multi_value_delimiter {
        start.push_attribute(("delimitedBy", delimiter.as_str()));
    }
    writer
        .write_event(Event::Empty(start))
        .map_err(|e| ArchiveError::Descriptor(e.to_string()))?;
    Ok(())
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> Result<(), ArchiveError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|e| ArchiveError::Descriptor(e.to_string()))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(|e| ArchiveError::Descriptor(e.to_string()))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| ArchiveError::Descriptor(e.to_string()))?;
    Ok(())
}
