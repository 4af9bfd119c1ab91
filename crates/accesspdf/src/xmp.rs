//! XMP metadata title handling.
//!
//! Only `dc:title` is touched. The packet is streamed through a quick-xml
//! reader and writer so every other event is copied back unchanged; a
//! packet without an `rdf:Description` is rejected rather than rebuilt.

use std::fmt;
use std::io::Cursor;

use accesspdf_core::PdfError;
use accesspdf_parse::PdfDocument;
use lopdf::{Object, ObjectId, Stream, dictionary};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const TITLE: &[u8] = b"dc:title";
const DESCRIPTION: &[u8] = b"rdf:Description";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmpError {
    /// The packet has no `rdf:Description` to hold a title.
    NoDescription,
    /// The packet bytes are not UTF-8.
    Encoding,
    /// The packet is not well-formed XML.
    Malformed(String),
}

impl fmt::Display for XmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmpError::NoDescription => write!(f, "XMP packet has no rdf:Description"),
            XmpError::Encoding => write!(f, "XMP packet is not valid UTF-8"),
            XmpError::Malformed(msg) => write!(f, "XMP packet is malformed: {msg}"),
        }
    }
}

impl std::error::Error for XmpError {}

impl From<quick_xml::Error> for XmpError {
    fn from(err: quick_xml::Error) -> Self {
        XmpError::Malformed(err.to_string())
    }
}

fn write_title<W: std::io::Write>(writer: &mut Writer<W>, title: &str) -> Result<(), XmpError> {
    let mut li = BytesStart::new("rdf:li");
    li.push_attribute(("xml:lang", "x-default"));
    writer.write_event(Event::Start(BytesStart::new("dc:title")))?;
    writer.write_event(Event::Start(BytesStart::new("rdf:Alt")))?;
    writer.write_event(Event::Start(li))?;
    writer.write_event(Event::Text(BytesText::new(title)))?;
    writer.write_event(Event::End(BytesEnd::new("rdf:li")))?;
    writer.write_event(Event::End(BytesEnd::new("rdf:Alt")))?;
    writer.write_event(Event::End(BytesEnd::new("dc:title")))?;
    Ok(())
}

fn title_element(title: &str) -> String {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    // Writing into a Vec cannot fail.
    let _ = write_title(&mut writer, title);
    String::from_utf8_lossy(&writer.into_inner().into_inner()).into_owned()
}

/// The first non-empty `dc:title` alternative in a packet, with entity
/// and character references resolved.
pub fn read_title(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if depth > 0 || e.name().as_ref() == TITLE => depth += 1,
            Ok(Event::End(_)) if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return None;
                }
            }
            Ok(Event::Text(e)) if depth > 0 => {
                let text = e.unescape().ok()?;
                let text = text.trim();
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
            Ok(Event::CData(e)) if depth > 0 => {
                let text = String::from_utf8_lossy(&e).trim().to_string();
                if !text.is_empty() {
                    return Some(text);
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn has_title(xml: &str) -> Result<bool, XmpError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == TITLE => return Ok(true),
            Event::Eof => return Ok(false),
            _ => {}
        }
    }
}

fn with_dc_namespace(start: BytesStart<'_>) -> BytesStart<'static> {
    let mut start = start.into_owned();
    let declared = start
        .attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == b"xmlns:dc");
    if !declared {
        start.push_attribute(("xmlns:dc", DC_NS));
    }
    start
}

/// Set `dc:title` in a packet, replacing an existing one or adding one to
/// the first `rdf:Description`.
pub fn set_title(xml: &str, title: &str) -> Result<String, XmpError> {
    let replace = has_title(xml)?;
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::with_capacity(xml.len() + 128)));
    let mut written = false;
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event()?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }
        match event {
            Event::Start(e) if replace && e.name().as_ref() == TITLE => {
                if !written {
                    write_title(&mut writer, title)?;
                    written = true;
                }
                skip_depth = 1;
            }
            Event::Empty(e) if replace && e.name().as_ref() == TITLE => {
                if !written {
                    write_title(&mut writer, title)?;
                    written = true;
                }
            }
            Event::Start(e) if !replace && !written && e.name().as_ref() == DESCRIPTION => {
                writer.write_event(Event::Start(with_dc_namespace(e)))?;
                write_title(&mut writer, title)?;
                written = true;
            }
            Event::Empty(e) if !replace && !written && e.name().as_ref() == DESCRIPTION => {
                writer.write_event(Event::Start(with_dc_namespace(e)))?;
                write_title(&mut writer, title)?;
                writer.write_event(Event::End(BytesEnd::new("rdf:Description")))?;
                written = true;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    if !written {
        return Err(XmpError::NoDescription);
    }
    String::from_utf8(writer.into_inner().into_inner()).map_err(|_| XmpError::Encoding)
}

/// A minimal packet carrying only a title.
pub fn new_packet(title: &str) -> String {
    format!(
        "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n\
         <x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n\
         <rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n\
         <rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
         {}</rdf:Description>\n\
         </rdf:RDF>\n\
         </x:xmpmeta>\n\
         <?xpacket end=\"w\"?>",
        title_element(title)
    )
}

/// Apply [`set_title`] to raw packet bytes, or build a fresh packet when
/// there are none.
pub fn retitle_packet(existing: Option<Vec<u8>>, title: &str) -> Result<String, XmpError> {
    match existing {
        None => Ok(new_packet(title)),
        Some(bytes) => {
            let xml = String::from_utf8(bytes).map_err(|_| XmpError::Encoding)?;
            set_title(&xml, title)
        }
    }
}

/// The catalog's `/Metadata` stream id and its decoded bytes.
pub fn read_packet(doc: &PdfDocument) -> Option<(ObjectId, Vec<u8>)> {
    let id = doc
        .catalog()
        .ok()?
        .get(b"Metadata")
        .and_then(Object::as_reference)
        .ok()?;
    let stream = doc.inner().get_object(id).ok()?.as_stream().ok()?;
    let bytes = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    Some((id, bytes))
}

/// Replace (or add) the catalog's `/Metadata` stream with `xml`.
pub fn write_packet(doc: &mut PdfDocument, existing: Option<ObjectId>, xml: String) -> Result<(), PdfError> {
    let stream = Stream::new(
        dictionary! {
            "Type" => "Metadata",
            "Subtype" => "XML",
        },
        xml.into_bytes(),
    );
    match existing {
        Some(id) => {
            doc.inner_mut().objects.insert(id, Object::Stream(stream));
        }
        None => {
            let id = doc.add_object(stream);
            doc.catalog_mut()?.set("Metadata", id);
        }
    }
    Ok(())
}
