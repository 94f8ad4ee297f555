//! The untyped wire layer: one root element holding flat text fields.
//!
//! Uses `quick-xml`'s writer API for generation and a hand-written event loop
//! for reading.

use std::io::Cursor;

use quick_xml::{
  Reader, Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::error::{Error, Result};

/// A decoded envelope: the root tag plus its child fields in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
  pub tag:    String,
  pub fields: Vec<(String, String)>,
}

impl Envelope {
  pub fn new(tag: impl Into<String>) -> Self {
    Self {
      tag:    tag.into(),
      fields: Vec::new(),
    }
  }

  pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
    self.fields.push((name.into(), value.into()));
  }

  /// First value of the named field. Later duplicates are ignored.
  pub fn get(&self, name: &str) -> Option<&str> {
    self
      .fields
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, v)| v.as_str())
  }
}

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Older nodes wrap every payload in `<XML><post>…</post></XML>`.
fn is_legacy_wrapper(depth: usize, name: &str) -> bool {
  matches!((depth, name), (0, "XML") | (1, "post"))
}

fn local_name(name: &[u8]) -> &[u8] {
  // strip "prefix:" if present
  if let Some(pos) = name.iter().rposition(|&b| b == b':') {
    &name[pos + 1..]
  } else {
    name
  }
}

fn element_name(e: &BytesStart<'_>) -> Result<String> {
  let qname = e.name();
  String::from_utf8(local_name(qname.as_ref()).to_vec())
    .map_err(|_| Error::Malformed("element name is not valid UTF-8".into()))
}

/// Parse `xml` into an [`Envelope`] without interpreting any field.
pub fn decode_envelope(xml: &[u8]) -> Result<Envelope> {
  if xml.iter().all(u8::is_ascii_whitespace) {
    return Err(Error::Empty);
  }

  let mut reader = Reader::from_reader(xml);

  let mut envelope: Option<Envelope> = None;
  let mut wrappers = 0usize;
  let mut root_open = false;
  let mut field: Option<(String, String)> = None;
  let mut buf = Vec::new();

  loop {
    let event = reader
      .read_event_into(&mut buf)
      .map_err(|e| Error::Malformed(e.to_string()))?;

    match event {
      Event::Start(ref e) => {
        let name = element_name(e)?;
        if envelope.is_some() && !root_open {
          return Err(Error::Malformed("multiple root elements".into()));
        }
        if !root_open {
          if is_legacy_wrapper(wrappers, &name) {
            wrappers += 1;
          } else {
            envelope = Some(Envelope::new(name));
            root_open = true;
          }
        } else if field.is_none() {
          field = Some((name, String::new()));
        } else {
          return Err(Error::Malformed(format!(
            "nested element <{name}> inside a field"
          )));
        }
      }
      Event::Empty(ref e) => {
        let name = element_name(e)?;
        if envelope.is_some() && !root_open {
          return Err(Error::Malformed("multiple root elements".into()));
        }
        match (root_open, field.is_some()) {
          (false, _) => envelope = Some(Envelope::new(name)),
          (true, false) => {
            if let Some(env) = envelope.as_mut() {
              env.push(name, "");
            }
          }
          (true, true) => {
            return Err(Error::Malformed(format!(
              "nested element <{name}> inside a field"
            )));
          }
        }
      }
      Event::Text(ref t) => {
        let text = t.unescape().map_err(|e| Error::Malformed(e.to_string()))?;
        push_text(&mut field, &text)?;
      }
      Event::CData(ref c) => {
        let text = std::str::from_utf8(c)
          .map_err(|_| Error::Malformed("CDATA is not valid UTF-8".into()))?;
        push_text(&mut field, text)?;
      }
      Event::End(_) => {
        if let Some((name, value)) = field.take() {
          if let Some(env) = envelope.as_mut() {
            env.push(name, value);
          }
        } else if root_open {
          root_open = false;
        } else {
          wrappers = wrappers.saturating_sub(1);
        }
      }
      Event::DocType(_) => {
        return Err(Error::Malformed(
          "document type declarations are not accepted".into(),
        ));
      }
      Event::Eof => break,
      _ => {}
    }
    buf.clear();
  }

  if root_open || field.is_some() {
    return Err(Error::Malformed("unexpected end of document".into()));
  }

  envelope.ok_or(Error::Empty)
}

fn push_text(field: &mut Option<(String, String)>, text: &str) -> Result<()> {
  match field {
    Some((_, value)) => {
      value.push_str(text);
      Ok(())
    }
    None if text.trim().is_empty() => Ok(()),
    None => Err(Error::Malformed("text outside of a field".into())),
  }
}

// ─── Encoding ────────────────────────────────────────────────────────────────

/// Serialise an [`Envelope`] as a standalone XML document.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>> {
  let mut w = Writer::new(Cursor::new(Vec::new()));

  w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
  w.write_event(Event::Start(BytesStart::new(envelope.tag.as_str())))?;
  for (name, value) in &envelope.fields {
    w.write_event(Event::Start(BytesStart::new(name.as_str())))?;
    w.write_event(Event::Text(BytesText::new(value)))?;
    w.write_event(Event::End(BytesEnd::new(name.as_str())))?;
  }
  w.write_event(Event::End(BytesEnd::new(envelope.tag.as_str())))?;

  Ok(w.into_inner().into_inner())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fields_keep_document_order() {
    let xml = br#"<?xml version="1.0"?>
    <comment>
      <guid>c1</guid>
      <text>  Freedom!  </text>
      <post_guid/>
    </comment>"#;
    let env = decode_envelope(xml).unwrap();
    assert_eq!(env.tag, "comment");
    assert_eq!(env.fields, vec![
      ("guid".to_string(), "c1".to_string()),
      ("text".to_string(), "  Freedom!  ".to_string()),
      ("post_guid".to_string(), String::new()),
    ]);
  }

  #[test]
  fn field_text_is_kept_verbatim() {
    let xml = b"<status_message>\n  <message>\n    indented code\n</message>\n</status_message>\n";
    let env = decode_envelope(xml).unwrap();
    assert_eq!(env.fields, vec![(
      "message".to_string(),
      "\n    indented code\n".to_string()
    )]);
  }

  #[test]
  fn legacy_wrapper_is_unwrapped() {
    let xml = b"<XML><post><comment><guid>c1</guid></comment></post></XML>";
    let env = decode_envelope(xml).unwrap();
    assert_eq!(env.tag, "comment");
    assert_eq!(env.get("guid"), Some("c1"));
  }

  #[test]
  fn entities_and_cdata_are_decoded() {
    let xml = b"<comment><text>a &amp; b</text><bio><![CDATA[<b>hi</b>]]></bio></comment>";
    let env = decode_envelope(xml).unwrap();
    assert_eq!(env.get("text"), Some("a & b"));
    assert_eq!(env.get("bio"), Some("<b>hi</b>"));
  }

  #[test]
  fn structural_violations_are_rejected() {
    let cases: [&[u8]; 6] = [
      b"",
      b"   ",
      b"<comment><guid>c1</guid></comment><comment/>",
      b"<comment><guid><b>c1</b></guid></comment>",
      b"<comment>loose text<guid>c1</guid></comment>",
      b"<comment><guid>c1</guid>",
    ];
    for xml in cases {
      assert!(
        decode_envelope(xml).is_err(),
        "accepted {:?}",
        String::from_utf8_lossy(xml)
      );
    }
  }

  #[test]
  fn mismatched_end_tag_is_rejected() {
    assert!(decode_envelope(b"<comment><guid>c1</text></comment>").is_err());
  }

  #[test]
  fn doctype_is_rejected() {
    let xml = b"<!DOCTYPE comment [<!ENTITY x \"y\">]><comment><guid>&x;</guid></comment>";
    assert!(matches!(decode_envelope(xml), Err(Error::Malformed(_))));
  }

  #[test]
  fn encoded_text_is_escaped() {
    let mut env = Envelope::new("comment");
    env.push("text", "<script> & \"quotes\"");
    let bytes = encode_envelope(&env).unwrap();
    let xml = std::str::from_utf8(&bytes).unwrap();
    assert!(xml.starts_with("<?xml"), "{xml}");
    assert!(!xml.contains("<script>"), "{xml}");
    assert_eq!(decode_envelope(&bytes).unwrap(), env);
  }
}
