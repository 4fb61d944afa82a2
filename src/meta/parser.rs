//! Event-driven, namespace-tolerant descriptor parser
//!
//! Element and attribute names are matched case-insensitively on their local
//! name, so documents written with or without namespace prefixes parse the
//! same way. Schema construction runs as an explicit state machine rather
//! than shared mutable parser fields, which keeps it testable from plain
//! strings.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::Path;
use tracing::warn;

use crate::error::ArchiveError;
use crate::model::{Archive, DataType, Field, FileSchema, TermRegistry, term::ID_TERM};

use super::{parse_quote_attr, unescape_delimiter};

/// One-level build state: which file schema, if any, is under construction
enum BuildState {
    Idle,
    BuildingCore(FileSchema),
    BuildingExtension(FileSchema),
}

impl BuildState {
    fn current(&mut self) -> Option<&mut FileSchema> {
        match self {
            BuildState::Idle => None,
            BuildState::BuildingCore(s) | BuildState::BuildingExtension(s) => Some(s),
        }
    }
}

/// Parse a descriptor document into an archive rooted at `base_dir`.
///
/// All schema problems are fatal here except an extension whose id field
/// has no column index, which is dropped with a warning.
pub fn parse_descriptor(
    xml: &str,
    base_dir: &Path,
    registry: &TermRegistry,
) -> Result<Archive, ArchiveError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut state = BuildState::Idle;
    let mut metadata_location: Option<String> = None;
    let mut core: Option<FileSchema> = None;
    let mut extensions: Vec<FileSchema> = Vec::new();
    let mut in_location = false;
    let mut location_buf = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e.name().as_ref());
                open_element(
                    &name,
                    e,
                    registry,
                    &mut state,
                    &mut metadata_location,
                    &mut in_location,
                    &mut location_buf,
                )?;
            }
            // a self-closing element opens and closes in one event
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e.name().as_ref());
                open_element(
                    &name,
                    e,
                    registry,
                    &mut state,
                    &mut metadata_location,
                    &mut in_location,
                    &mut location_buf,
                )?;
                close_element(
                    &name,
                    &mut state,
                    &mut core,
                    &mut extensions,
                    &mut in_location,
                    &mut location_buf,
                );
            }
            Ok(Event::Text(ref t)) if in_location => {
                let text = t
                    .unescape()
                    .map_err(|e| ArchiveError::Descriptor(e.to_string()))?;
                location_buf.push_str(&text);
            }
            Ok(Event::End(ref e)) => {
                let name = local_name(e.name().as_ref());
                close_element(
                    &name,
                    &mut state,
                    &mut core,
                    &mut extensions,
                    &mut in_location,
                    &mut location_buf,
                );
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ArchiveError::Descriptor(format!(
                    "descriptor parse error at position {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }

    let core = core.ok_or_else(|| {
        ArchiveError::UnsupportedArchive("descriptor defines no core file".to_string())
    })?;
    let mut archive = Archive::new(base_dir, core);
    if let Some(location) = metadata_location {
        archive.set_metadata_location(location);
    }
    for extension in extensions {
        archive.add_extension(extension);
    }
    Ok(archive)
}

fn open_element(
    name: &str,
    e: &BytesStart,
    registry: &TermRegistry,
    state: &mut BuildState,
    metadata_location: &mut Option<String>,
    in_location: &mut bool,
    location_buf: &mut String,
) -> Result<(), ArchiveError> {
    match name {
        "archive" | "stararchive" => {
            if let Some(metadata) = attr(e, "metadata") {
                *metadata_location = Some(metadata);
            }
        }
        "core" => {
            *state = BuildState::BuildingCore(schema_from_attrs(e, registry)?);
        }
        "extension" => {
            *state = BuildState::BuildingExtension(schema_from_attrs(e, registry)?);
        }
        "id" | "coreid" => {
            let field = field_from_attrs(e, registry, true)?;
            if let Some(schema) = state.current() {
                schema.id_field = Some(field);
            }
        }
        "field" => {
            let field = field_from_attrs(e, registry, false)?;
            if let Some(schema) = state.current() {
                schema.add_field(field);
            }
        }
        "location" => {
            *in_location = true;
            location_buf.clear();
        }
        _ => {}
    }
    Ok(())
}

fn close_element(
    name: &str,
    state: &mut BuildState,
    core: &mut Option<FileSchema>,
    extensions: &mut Vec<FileSchema>,
    in_location: &mut bool,
    location_buf: &mut String,
) {
    match name {
        "location" => {
            *in_location = false;
            let path = location_buf.trim().to_string();
            if !path.is_empty() {
                if let Some(schema) = state.current() {
                    schema.add_location(path);
                }
            }
        }
        "core" => {
            if let BuildState::BuildingCore(schema) = std::mem::replace(state, BuildState::Idle) {
                *core = Some(schema);
            }
        }
        "extension" => {
            if let BuildState::BuildingExtension(schema) =
                std::mem::replace(state, BuildState::Idle)
            {
                if schema.has_indexed_id() {
                    extensions.push(schema);
                } else {
                    warn!(
                        "dropping extension {}: its id field has no column index",
                        schema.row_type
                    );
                }
            }
        }
        _ => {}
    }
}

/// Build a file schema from `core`/`extension` attributes.
fn schema_from_attrs(e: &BytesStart, registry: &TermRegistry) -> Result<FileSchema, ArchiveError> {
    let row_type = attr(e, "rowType").ok_or_else(|| {
        ArchiveError::UnsupportedArchive("core/extension element without a rowType".to_string())
    })?;
    let mut schema = FileSchema::new(registry.resolve(&row_type)?);

    if let Some(encoding) = attr(e, "encoding") {
        schema.encoding = crate::dialect::normalize_encoding(&encoding);
    }
    if let Some(delimiter) = attr(e, "fieldsTerminatedBy") {
        schema.field_delimiter = unescape_delimiter(&delimiter);
    }
    // absent keeps the default quote; present-but-empty disables quoting
    if let Some(quote) = attr(e, "fieldsEnclosedBy") {
        schema.quote_char = parse_quote_attr(&quote)?;
    }
    if let Some(terminator) = attr(e, "linesTerminatedBy") {
        schema.line_terminator = unescape_delimiter(&terminator);
    }
    if let Some(header_lines) = attr(e, "ignoreHeaderLines") {
        // unparsable values silently keep the previous count
        schema.header_line_count = header_lines
            .trim()
            .parse()
            .unwrap_or(schema.header_line_count);
    }
    Ok(schema)
}

/// Build a field from `id`/`coreid`/`field` attributes. The id elements get
/// the implicit id term when none is declared; a plain field must name one.
fn field_from_attrs(
    e: &BytesStart,
    registry: &TermRegistry,
    implicit_id: bool,
) -> Result<Field, ArchiveError> {
    let term = match attr(e, "term") {
        Some(term) => registry.resolve(&term)?,
        None if implicit_id => ID_TERM.clone(),
        None => {
            return Err(ArchiveError::UnsupportedArchive(
                "field element without a term".to_string(),
            ));
        }
    };
    let mut field = Field::new(term);

    if let Some(index) = attr(e, "index") {
        field.index = Some(index.trim().parse().map_err(|_| {
            ArchiveError::UnsupportedArchive(format!("non-numeric column index {index:?}"))
        })?);
    }
    field.default_value = attr(e, "default");
    field.vocabulary_ref = attr(e, "vocabulary");
    field.multi_value_delimiter = attr(e, "delimitedBy");
    if let Some(declared) = attr(e, "type") {
        field.data_type = DataType::from_declared(&declared);
    }
    Ok(field)
}

/// Case-folded local name, with any namespace prefix stripped.
fn local_name(name: &[u8]) -> String {
    let name = String::from_utf8_lossy(name);
    name.rsplit(':').next().unwrap_or(&name).to_lowercase()
}

/// Attribute lookup tolerant of namespace prefixes: the unprefixed form is
/// tried first, then any prefixed attribute with a matching local name.
fn attr(e: &BytesStart, name: &str) -> Option<String> {
    let mut prefixed: Option<String> = None;
    for a in e.attributes().flatten() {
        let key = String::from_utf8_lossy(a.key.as_ref()).to_string();
        let value = a
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned());
        if key.eq_ignore_ascii_case(name) {
            return Some(value);
        }
        if prefixed.is_none() {
            if let Some((_, local)) = key.split_once(':') {
                if local.eq_ignore_ascii_case(name) {
                    prefixed = Some(value);
                }
            }
        }
    }
    prefixed
}
