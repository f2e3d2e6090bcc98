//! Targeted edits of `config.xml` and `index.html`.
//!
//! Documents are streamed through `quick-xml` and written back event by
//! event, so everything a patch does not touch keeps its original bytes
//! (quoting, entities, comments, whitespace). End tags are not required to
//! match, which lets HTML void elements like `<meta>` pass through.

use quick_xml::escape::{partial_escape, unescape};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("{0}")]
    Parse(#[from] quick_xml::Error),

    #[error("{0}")]
    Write(#[from] std::io::Error),
}

type MarkupResult<T> = std::result::Result<T, MarkupError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Tag(String),
    Id(String),
    Attr {
        tag: Option<String>,
        name: String,
        value: String,
    },
}

impl Selector {
    pub fn tag(tag: &str) -> Self {
        Selector::Tag(tag.to_string())
    }

    pub fn id(id: &str) -> Self {
        Selector::Id(id.to_string())
    }

    pub fn attr(tag: &str, name: &str, value: &str) -> Self {
        Selector::Attr {
            tag: Some(tag.to_string()),
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn matches(&self, element: &BytesStart<'_>) -> bool {
        match self {
            Selector::Tag(tag) => tag_is(element, tag),
            Selector::Id(id) => attribute(element, "id").as_deref() == Some(id.as_str()),
            Selector::Attr { tag, name, value } => {
                tag.as_deref().map_or(true, |tag| tag_is(element, tag))
                    && attribute(element, name).as_deref() == Some(value.as_str())
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Edit {
    SetAttr { name: String, value: String },
    SetText(String),
}

#[derive(Debug, Clone)]
struct Rule {
    selector: Selector,
    edit: Edit,
    first_only: bool,
}

/// A set of edits applied in one pass over a document.
#[derive(Debug, Clone, Default)]
pub struct MarkupPatch {
    rules: Vec<Rule>,
    appends: Vec<(String, String)>,
    inserts_after: Vec<(Selector, String)>,
}

impl MarkupPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` on every element matching `selector`.
    pub fn set_attr(mut self, selector: Selector, name: &str, value: &str) -> Self {
        self.push_attr(selector, name, value, false);
        self
    }

    /// Sets `name` on the first element matching `selector` only.
    pub fn set_first_attr(mut self, selector: Selector, name: &str, value: &str) -> Self {
        self.push_attr(selector, name, value, true);
        self
    }

    /// Replaces the content of every element matching `selector` with `text`.
    pub fn set_text(mut self, selector: Selector, text: &str) -> Self {
        self.rules.push(Rule {
            selector,
            edit: Edit::SetText(text.to_string()),
            first_only: false,
        });
        self
    }

    /// Writes raw `markup` just before the first closing tag of `parent`.
    pub fn append_child(mut self, parent: &str, markup: &str) -> Self {
        self.appends.push((parent.to_ascii_lowercase(), markup.to_string()));
        self
    }

    /// Writes raw `markup` right after the first element matching `selector`.
    pub fn insert_after(mut self, selector: Selector, markup: &str) -> Self {
        self.inserts_after.push((selector, markup.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.appends.is_empty() && self.inserts_after.is_empty()
    }

    fn push_attr(&mut self, selector: Selector, name: &str, value: &str, first_only: bool) {
        self.rules.push(Rule {
            selector,
            edit: Edit::SetAttr {
                name: name.to_string(),
                value: value.to_string(),
            },
            first_only,
        });
    }

    pub fn apply(&self, source: &str) -> MarkupResult<String> {
        let mut reader = Reader::from_str(source);
        reader.config_mut().check_end_names = false;
        let mut writer = Writer::new(Vec::with_capacity(source.len()));

        let mut hits = vec![0usize; self.rules.len()];
        let mut appended = vec![false; self.appends.len()];
        let mut inserted = vec![false; self.inserts_after.len()];
        // (lowercase tag, insert index) waiting for their closing tag
        let mut pending: Vec<(String, usize)> = Vec::new();
        // nesting depth inside an element whose content is being replaced
        let mut skipping: Option<usize> = None;

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader.read_event()?;

            if let Some(depth) = skipping {
                match event {
                    Event::Start(_) => skipping = Some(depth + 1),
                    Event::End(end) if depth == 0 => {
                        skipping = None;
                        self.close(&mut writer, end, &mut appended, &mut pending)?;
                    }
                    Event::End(_) => skipping = Some(depth - 1),
                    Event::Eof => break,
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(element) => {
                    let (rewritten, text) = self.edit(&element, &mut hits);
                    let tag = lowercase_name(&element);
                    for (index, (selector, _)) in self.inserts_after.iter().enumerate() {
                        if !inserted[index] && selector.matches(&element) {
                            inserted[index] = true;
                            pending.push((tag.clone(), index));
                        }
                    }
                    writer.write_event(Event::Start(rewritten.unwrap_or(element)))?;
                    if let Some(text) = text {
                        writer.write_event(Event::Text(text_event(text)))?;
                        skipping = Some(0);
                    }
                }
                Event::Empty(element) => {
                    let (rewritten, text) = self.edit(&element, &mut hits);
                    let element_name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                    let matched: Vec<usize> = self
                        .inserts_after
                        .iter()
                        .enumerate()
                        .filter(|(index, (selector, _))| {
                            !inserted[*index] && selector.matches(&element)
                        })
                        .map(|(index, _)| index)
                        .collect();
                    let element = rewritten.unwrap_or(element);
                    match text {
                        Some(text) => {
                            writer.write_event(Event::Start(element))?;
                            writer.write_event(Event::Text(text_event(text)))?;
                            writer.write_event(Event::End(BytesEnd::new(element_name)))?;
                        }
                        None => writer.write_event(Event::Empty(element))?,
                    }
                    for index in matched {
                        inserted[index] = true;
                        writer.get_mut().write_all(self.inserts_after[index].1.as_bytes())?;
                    }
                }
                Event::End(end) => self.close(&mut writer, end, &mut appended, &mut pending)?,
                Event::DocType(doctype) => {
                    let end = reader.buffer_position() as usize;
                    match raw_doctype(source, start, end) {
                        Some(raw) => writer.get_mut().write_all(raw.as_bytes())?,
                        None => writer.write_event(Event::DocType(doctype))?,
                    }
                }
                Event::Eof => break,
                other => writer.write_event(other)?,
            }
        }

        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    fn close(
        &self,
        writer: &mut Writer<Vec<u8>>,
        end: BytesEnd<'_>,
        appended: &mut [bool],
        pending: &mut Vec<(String, usize)>,
    ) -> MarkupResult<()> {
        let tag = String::from_utf8_lossy(end.local_name().as_ref()).to_ascii_lowercase();

        for (index, (parent, markup)) in self.appends.iter().enumerate() {
            if !appended[index] && *parent == tag {
                appended[index] = true;
                writer.get_mut().write_all(markup.as_bytes())?;
            }
        }

        writer.write_event(Event::End(end))?;

        if let Some(position) = pending.iter().rposition(|(open, _)| *open == tag) {
            let (_, index) = pending.remove(position);
            writer.get_mut().write_all(self.inserts_after[index].1.as_bytes())?;
        }
        Ok(())
    }

    fn edit<'r>(
        &'r self,
        element: &BytesStart<'_>,
        hits: &mut [usize],
    ) -> (Option<BytesStart<'static>>, Option<&'r str>) {
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        let mut text = None;

        for (index, rule) in self.rules.iter().enumerate() {
            if !rule.selector.matches(element) || (rule.first_only && hits[index] > 0) {
                continue;
            }
            hits[index] += 1;
            match &rule.edit {
                Edit::SetAttr { name, value } => attrs.push((name.as_str(), value.as_str())),
                Edit::SetText(content) => text = Some(content.as_str()),
            }
        }

        let rewritten = (!attrs.is_empty()).then(|| with_attributes(element, &attrs));
        (rewritten, text)
    }
}

/// The doctype exactly as written; the writer would normalize its keyword.
fn raw_doctype(source: &str, start: usize, end: usize) -> Option<String> {
    let span = source.get(start..end)?;
    let bang = span.find('!')?;
    Some(format!("<{}", &span[bang..]))
}

/// Rebuilds `element` with `updates` applied. Untouched attributes keep
/// their raw (still escaped) values and their order; new ones go last.
fn with_attributes(element: &BytesStart<'_>, updates: &[(&str, &str)]) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut content = name.clone();

    // later edits of the same attribute win
    let mut values: Vec<(&str, &str, bool)> = Vec::new();
    for &(key, value) in updates {
        match values.iter_mut().find(|(k, _, _)| k.eq_ignore_ascii_case(key)) {
            Some(entry) => entry.1 = value,
            None => values.push((key, value, false)),
        }
    }

    for attr in element.html_attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        match values.iter_mut().find(|(k, _, _)| k.eq_ignore_ascii_case(&key)) {
            Some(entry) => {
                entry.2 = true;
                push_attribute(&mut content, &key, &escape_attribute(entry.1));
            }
            None => push_attribute(&mut content, &key, &String::from_utf8_lossy(&attr.value)),
        }
    }

    for (key, value, _) in values.iter().filter(|(_, _, written)| !written) {
        push_attribute(&mut content, key, &escape_attribute(value));
    }

    let name_len = name.len();
    BytesStart::from_content(content, name_len)
}

fn push_attribute(content: &mut String, key: &str, raw_value: &str) {
    let quote = if raw_value.contains('"') { '\'' } else { '"' };
    content.push(' ');
    content.push_str(key);
    content.push('=');
    content.push(quote);
    content.push_str(raw_value);
    content.push(quote);
}

/// Escapes what would break a double-quoted attribute; single quotes stay
/// literal so CSP keywords like `'self'` read naturally.
fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

fn text_event(text: &str) -> BytesText<'_> {
    BytesText::from_escaped(partial_escape(text))
}

fn tag_is(element: &BytesStart<'_>, tag: &str) -> bool {
    element.local_name().as_ref().eq_ignore_ascii_case(tag.as_bytes())
}

fn lowercase_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).to_ascii_lowercase()
}

fn decode(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    match unescape(&raw) {
        Ok(value) => value.into_owned(),
        Err(_) => raw.into_owned(),
    }
}

/// Unescaped value of attribute `name`, if present.
pub fn attribute(element: &BytesStart<'_>, name: &str) -> Option<String> {
    element
        .html_attributes()
        .flatten()
        .find(|attr| attr.key.as_ref().eq_ignore_ascii_case(name.as_bytes()))
        .map(|attr| decode(&attr.value))
}

fn reader(source: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().check_end_names = false;
    reader
}

/// Whether any element matches `selector`.
pub fn contains(source: &str, selector: &Selector) -> MarkupResult<bool> {
    let mut reader = reader(source);
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element) if selector.matches(&element) => {
                return Ok(true)
            }
            Event::Eof => return Ok(false),
            _ => {}
        }
    }
}

/// Attribute `name` of the first element matching `selector`.
pub fn first_attribute(
    source: &str,
    selector: &Selector,
    name: &str,
) -> MarkupResult<Option<String>> {
    let mut reader = reader(source);
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element) if selector.matches(&element) => {
                return Ok(attribute(&element, name))
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Text content of the first element matching `selector`, trimmed.
pub fn first_text(source: &str, selector: &Selector) -> MarkupResult<Option<String>> {
    let mut reader = reader(source);
    loop {
        match reader.read_event()? {
            Event::Start(element) if selector.matches(&element) => {
                let mut text = String::new();
                let mut depth = 0usize;
                loop {
                    match reader.read_event()? {
                        Event::Text(content) => text.push_str(&decode(&content)),
                        Event::CData(content) => {
                            text.push_str(&String::from_utf8_lossy(&content))
                        }
                        Event::Start(_) => depth += 1,
                        Event::End(_) if depth == 0 => break,
                        Event::End(_) => depth -= 1,
                        Event::Eof => break,
                        _ => {}
                    }
                }
                return Ok(Some(text.trim().to_string()));
            }
            Event::Empty(element) if selector.matches(&element) => return Ok(Some(String::new())),
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Drops a leading UTF-8 byte order mark.
pub fn strip_bom(source: &str) -> &str {
    source.strip_prefix('\u{feff}').unwrap_or(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG_XML: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<widget id="com.example.app" version="0.0.1" xmlns="http://www.w3.org/ns/widgets" xmlns:cdv="http://cordova.apache.org/ns/1.0">
    <name>Example</name>
    <description>An example &amp; demo</description>
    <access origin="*" />
    <access origin="https://maps.example.com" />
    <allow-navigation href="*" />
    <platform name="android">
        <allow-intent href="market:*" />
    </platform>
</widget>
"#;

    const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta id="csp" http-equiv="Content-Security-Policy" content="default-src *">
  <title>Old</title>
  <script src="cordova.js" id="cordova-script"></script>
  <script src="" id="service-worker"></script>
</head>
<body>
  <app-root></app-root>
  <script async src="build/main.js"></script>
</body>
</html>
"#;

    #[test]
    fn test_untouched_document_round_trips() {
        let output = MarkupPatch::new().apply(CONFIG_XML).unwrap();
        assert_eq!(output, CONFIG_XML);
    }

    #[test]
    fn test_doctype_keeps_its_case() {
        let html = "<!doctype html>\n<html><head><title>Old</title></head></html>";

        let output = MarkupPatch::new()
            .set_text(Selector::tag("title"), "New")
            .apply(html)
            .unwrap();

        assert_eq!(
            output,
            "<!doctype html>\n<html><head><title>New</title></head></html>"
        );
        assert_eq!(
            MarkupPatch::new().apply("<!DocType html><p/>").unwrap(),
            "<!DocType html><p/>"
        );
    }

    #[test]
    fn test_config_xml_attributes_and_text() {
        let output = MarkupPatch::new()
            .set_attr(Selector::tag("widget"), "id", "com.example.app.staging")
            .set_attr(Selector::tag("widget"), "android-versionCode", "102003")
            .set_text(Selector::tag("name"), "Example - staging")
            .set_first_attr(Selector::tag("access"), "origin", "https://api.example.com")
            .set_attr(Selector::tag("allow-navigation"), "href", "https://api.example.com")
            .apply(CONFIG_XML)
            .unwrap();

        assert!(output.contains(
            r#"<widget id="com.example.app.staging" version="0.0.1" xmlns="http://www.w3.org/ns/widgets" xmlns:cdv="http://cordova.apache.org/ns/1.0" android-versionCode="102003">"#
        ));
        assert!(output.contains("<name>Example - staging</name>"));
        assert!(output.contains(r#"<access origin="https://api.example.com" />"#)
            || output.contains(r#"<access origin="https://api.example.com"/>"#));
        assert!(output.contains(r#"origin="https://maps.example.com""#));
        assert!(output.contains(r#"href="https://api.example.com""#));
        assert!(output.contains("An example &amp; demo"));
        assert!(output.contains(r#"<allow-intent href="market:*" />"#));
    }

    #[test]
    fn test_html_ids_and_csp_quotes() {
        let output = MarkupPatch::new()
            .set_attr(Selector::id("csp"), "content", "default-src 'self'; img-src data:")
            .set_attr(Selector::id("cordova-script"), "src", "")
            .set_attr(Selector::id("service-worker"), "src", "pwa.js")
            .set_text(Selector::tag("title"), "My <App>")
            .apply(INDEX_HTML)
            .unwrap();

        assert!(output.contains(r#"content="default-src 'self'; img-src data:""#));
        assert!(output.contains(r#"<script src="" id="cordova-script"></script>"#));
        assert!(output.contains(r#"<script src="pwa.js" id="service-worker"></script>"#));
        assert!(output.contains("<title>My &lt;App&gt;</title>"));
        assert!(output.contains(r#"<meta charset="UTF-8">"#));
        assert!(output.contains("<app-root></app-root>"));
    }

    #[test]
    fn test_append_child_and_insert_after() {
        let html = "<html><head><title>t</title></head><body></body></html>";
        let output = MarkupPatch::new()
            .append_child("head", r#"<script src="cordova.js" id="cordova-script"></script>"#)
            .insert_after(Selector::tag("title"), "<!-- after title -->")
            .apply(html)
            .unwrap();

        assert_eq!(
            output,
            r#"<html><head><title>t</title><!-- after title --><script src="cordova.js" id="cordova-script"></script></head><body></body></html>"#
        );
    }

    #[test]
    fn test_queries() {
        assert_eq!(
            first_text(CONFIG_XML, &Selector::tag("name")).unwrap().as_deref(),
            Some("Example")
        );
        assert_eq!(
            first_text(CONFIG_XML, &Selector::tag("description")).unwrap().as_deref(),
            Some("An example & demo")
        );
        assert_eq!(
            first_attribute(CONFIG_XML, &Selector::tag("widget"), "id")
                .unwrap()
                .as_deref(),
            Some("com.example.app")
        );
        assert!(contains(
            INDEX_HTML,
            &Selector::attr("meta", "http-equiv", "Content-Security-Policy")
        )
        .unwrap());
        assert!(!contains(INDEX_HTML, &Selector::id("missing")).unwrap());
    }

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom("\u{feff}<html>"), "<html>");
        assert_eq!(strip_bom("<html>"), "<html>");
    }
}
