// Word documents (.docx): one question per non-blank paragraph.
//
// Only word/document.xml is read. Runs within a paragraph are joined, and
// tabs and line breaks inside a paragraph become spaces.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::UnsupportedFormatError;

const BODY_PART: &str = "word/document.xml";

pub fn questions_from_docx(bytes: &[u8]) -> Result<Vec<String>, UnsupportedFormatError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive
        .by_name(BODY_PART)?
        .read_to_string(&mut xml)
        .map_err(zip::result::ZipError::from)?;

    paragraphs(&xml)
}

fn paragraphs(xml: &str) -> Result<Vec<String>, UnsupportedFormatError> {
    let mut reader = Reader::from_str(xml);
    let mut questions = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(parse_error)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let paragraph = current.trim();
                    if !paragraph.is_empty() {
                        questions.push(paragraph.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Event::Empty(e) if matches!(e.local_name().as_ref(), b"tab" | b"br") => {
                current.push(' ');
            }
            Event::Text(text) if in_text => {
                current.push_str(&text.unescape().map_err(parse_error)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(questions)
}

fn parse_error(e: impl std::fmt::Display) -> UnsupportedFormatError {
    UnsupportedFormatError::Document(e.to_string())
}
