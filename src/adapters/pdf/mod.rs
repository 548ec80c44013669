//! PDF adapter: paginated A4 reports via `printpdf`.
//!
//! A document is a bold title followed by `label: value` lines, one block per
//! record. Text is drawn with an external TrueType face when one could be
//! provisioned, otherwise with the builtin Helvetica, whose character set is
//! Latin-1. An external face draws only what its `cmap` maps. Values are
//! filtered to the active face's character set before truncation, so what is
//! drawn is always representable.

use std::collections::BTreeSet;
use std::io::{BufWriter, Cursor};
use std::path::Path;
use std::time::Duration;

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::domain::ReportFields;

/// Values longer than this many characters are cut and suffixed with `...`.
pub const MAX_VALUE_CHARS: usize = 100;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN_LEFT: Mm = Mm(20.0);
const TOP_Y: f32 = 280.0;
const BOTTOM_Y: f32 = 20.0;
const LINE_HEIGHT: f32 = 5.5;
const BODY_SIZE: f32 = 10.0;
const TITLE_SIZE: f32 = 14.0;
const WRAP_CHARS: usize = 90;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_FONT_BYTES: usize = 16 * 1024 * 1024;

/// Errors raised while producing a PDF.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("PDF font error: {0}")]
    Font(String),

    #[error("PDF save error: {0}")]
    Save(String),
}

/// Face used for document text.
#[derive(Clone)]
pub enum Typeface {
    /// TrueType bytes loaded from disk or fetched once
    External { name: String, bytes: Vec<u8> },
    /// printpdf builtin Helvetica (Latin-1)
    Builtin,
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::External { name, bytes } => f
                .debug_struct("External")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
            Self::Builtin => f.write_str("Builtin"),
        }
    }
}

impl Typeface {
    /// Short description for status displays.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::External { name, .. } => format!("{name} (embedded)"),
            Self::Builtin => "Helvetica (Latin-1)".to_string(),
        }
    }

    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }
}

/// Character set a face can draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Charset {
    Latin1,
    /// Code points the embedded face's `cmap` maps to a glyph
    Mapped(BTreeSet<char>),
}

impl Charset {
    /// Read the Unicode subtables of a face's `cmap`.
    ///
    /// Returns `None` when the bytes are not a parseable face or map nothing.
    #[must_use]
    pub fn from_face(bytes: &[u8]) -> Option<Self> {
        let face = ttf_parser::Face::parse(bytes, 0).ok()?;
        let cmap = face.tables().cmap?;

        let mut mapped = BTreeSet::new();
        for subtable in cmap.subtables {
            if !subtable.is_unicode() {
                continue;
            }
            subtable.codepoints(|cp| {
                if let Some(c) = char::from_u32(cp) {
                    if subtable.glyph_index(cp).is_some_and(|g| g.0 != 0) {
                        mapped.insert(c);
                    }
                }
            });
        }

        (!mapped.is_empty()).then_some(Self::Mapped(mapped))
    }

    fn accepts(&self, c: char) -> bool {
        match self {
            Self::Latin1 => matches!(u32::from(c), 0x20..=0x7E | 0xA0..=0xFF),
            Self::Mapped(set) => !c.is_control() && set.contains(&c),
        }
    }
}

/// Re-encode a value for the given character set and cap its length.
///
/// Characters outside the set are dropped, then anything over
/// [`MAX_VALUE_CHARS`] is cut and suffixed with `...`.
#[must_use]
pub fn prepare_value(value: &str, charset: &Charset) -> String {
    let filtered: Vec<char> = value.chars().filter(|c| charset.accepts(*c)).collect();
    if filtered.len() > MAX_VALUE_CHARS {
        let mut out: String = filtered[..MAX_VALUE_CHARS].iter().collect();
        out.push_str("...");
        out
    } else {
        filtered.into_iter().collect()
    }
}

/// Find a typeface: local file first, then one best-effort download.
///
/// Never fails; any problem degrades to [`Typeface::Builtin`]. A successful
/// download is cached at `path` for the next start.
#[must_use]
pub fn provision_typeface(path: &Path, url: Option<&str>) -> Typeface {
    let name = path
        .file_stem()
        .map_or_else(|| "external".to_string(), |s| s.to_string_lossy().into_owned());

    match std::fs::read(path) {
        Ok(bytes) if is_font_data(&bytes) => {
            tracing::info!("Using typeface {:?}", path);
            return Typeface::External { name, bytes };
        }
        Ok(_) => tracing::warn!("{:?} is not a TrueType/OpenType font; ignoring", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Cannot read typeface {:?}: {e}", path),
    }

    let Some(url) = url else {
        tracing::info!("No external typeface; using builtin Helvetica");
        return Typeface::Builtin;
    };

    match fetch_font(url) {
        Ok(bytes) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(e) = std::fs::write(path, &bytes) {
                tracing::warn!("Fetched typeface could not be cached at {:?}: {e}", path);
            }
            tracing::info!("Fetched typeface ({} bytes)", bytes.len());
            Typeface::External { name, bytes }
        }
        Err(e) => {
            tracing::warn!("Typeface fetch failed, using builtin Helvetica: {e}");
            Typeface::Builtin
        }
    }
}

fn fetch_font(url: &str) -> Result<Vec<u8>, String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| format!("HTTP client: {e}"))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| format!("request: {e}"))?
        .error_for_status()
        .map_err(|e| format!("status: {e}"))?;

    let bytes = response.bytes().map_err(|e| format!("body: {e}"))?;
    if bytes.len() > MAX_FONT_BYTES {
        return Err(format!("body is {} bytes, max {MAX_FONT_BYTES}", bytes.len()));
    }
    if !is_font_data(&bytes) {
        return Err("body is not a TrueType/OpenType font".into());
    }
    Ok(bytes.to_vec())
}

/// sfnt version tags for TrueType, OpenType/CFF and collections.
const SFNT_TAGS: [&[u8]; 4] = [&[0x00, 0x01, 0x00, 0x00], b"true", b"OTTO", b"ttcf"];

fn is_font_data(bytes: &[u8]) -> bool {
    bytes.get(..4).is_some_and(|tag| SFNT_TAGS.contains(&tag))
}

/// Render a titled document with one block of `label: value` lines per entry.
///
/// If the external face cannot be embedded, the builtin face is used and
/// values are filtered to Latin-1 accordingly.
///
/// # Errors
/// Returns `RenderError` if no font can be added or the document cannot be saved.
pub fn write_document(
    title: &str,
    blocks: &[ReportFields],
    typeface: &Typeface,
) -> Result<Vec<u8>, RenderError> {
    let (doc, page, layer) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");

    let (font, bold, charset) = load_fonts(&doc, typeface)?;

    let mut writer = PageWriter {
        doc: &doc,
        layer: doc.get_page(page).get_layer(layer),
        y: TOP_Y,
    };

    writer.line(&prepare_value(title, &charset), TITLE_SIZE, &bold);
    writer.gap(LINE_HEIGHT);

    for (i, fields) in blocks.iter().enumerate() {
        if i > 0 {
            writer.gap(LINE_HEIGHT);
        }
        for (label, value) in fields.iter() {
            let text = format!(
                "{}: {}",
                prepare_value(label, &charset),
                prepare_value(value, &charset)
            );
            for line in wrap_text(&text, WRAP_CHARS) {
                writer.line(&line, BODY_SIZE, &font);
            }
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| RenderError::Save(e.to_string()))?;
    buf.into_inner()
        .map_err(|e| RenderError::Save(e.to_string()))
}

fn load_fonts(
    doc: &PdfDocumentReference,
    typeface: &Typeface,
) -> Result<(IndirectFontRef, IndirectFontRef, Charset), RenderError> {
    if let Typeface::External { name, bytes } = typeface {
        match Charset::from_face(bytes) {
            Some(charset) => match doc.add_external_font(Cursor::new(bytes.clone())) {
                // One face for both weights; the title is set larger instead.
                Ok(font) => return Ok((font.clone(), font, charset)),
                Err(e) => {
                    tracing::warn!("Typeface {name} could not be embedded, using Helvetica: {e}");
                }
            },
            None => tracing::warn!("Typeface {name} has no usable cmap, using Helvetica"),
        }
    }

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Font(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Font(e.to_string()))?;
    Ok((font, bold, Charset::Latin1))
}

/// Cursor over the current page that starts a new page at the bottom margin.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl PageWriter<'_> {
    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        if self.y < BOTTOM_Y {
            let (page, layer) = self.doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP_Y;
        }
        self.layer.use_text(text, size, MARGIN_LEFT, Mm(self.y), font);
        self.y -= LINE_HEIGHT;
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }
}

/// Word-wrap to `max_chars`, hard-breaking words that are longer than a line.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            lines.push(word.drain(..max_chars).collect());
        }
        if current_len + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_overlong_value_truncated() {
        let value = "x".repeat(150);
        let prepared = prepare_value(&value, &Charset::Latin1);
        assert_eq!(prepared.chars().count(), MAX_VALUE_CHARS + 3);
        assert!(prepared.ends_with("..."));
        assert!(prepared.starts_with(&"x".repeat(MAX_VALUE_CHARS)));

        let exact = "y".repeat(MAX_VALUE_CHARS);
        assert_eq!(prepare_value(&exact, &Charset::Latin1), exact);
    }

    /// A TrueType face installed on the host, if any.
    fn system_face() -> Option<Vec<u8>> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/Library/Fonts/Arial Unicode.ttf",
        ]
        .iter()
        .find_map(|path| std::fs::read(path).ok())
    }

    #[test]
    fn test_unrepresentable_characters_dropped() {
        assert_eq!(prepare_value("José → 心臓", &Charset::Latin1), "José  ");

        let mapped = Charset::Mapped("José →abc".chars().collect());
        assert_eq!(prepare_value("José → 心臓", &mapped), "José → ");
        assert_eq!(prepare_value("a\tb\nc", &mapped), "abc");
    }

    #[test]
    fn test_charset_rejects_non_font_bytes() {
        assert_eq!(Charset::from_face(b"<html>not found</html>"), None);
        assert_eq!(Charset::from_face(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x10]), None);
    }

    #[test]
    fn test_embedded_face_drops_unmapped_glyphs() {
        let Some(bytes) = system_face() else {
            eprintln!("no system TrueType face found; skipping");
            return;
        };

        let charset = Charset::from_face(&bytes).expect("face has a Unicode cmap");
        assert_eq!(prepare_value("Patient 心臓", &charset), "Patient ");
        assert_eq!(prepare_value("Ünal, José", &charset), "Ünal, José");

        let mut fields = ReportFields::new();
        fields.push("Name", "Patient 心臓");
        let typeface = Typeface::External {
            name: "DejaVuSans".into(),
            bytes,
        };
        let pdf = write_document("Heart Disease Risk Report", &[fields], &typeface)
            .expect("Should render");
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_wrap_text_breaks_long_words() {
        let lines = wrap_text(&format!("Label: {}", "z".repeat(25)), 10);
        assert_eq!(lines[0], "Label:");
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.concat().matches('z').count(), 25);
    }

    #[test]
    fn test_builtin_document_paginates() {
        let mut fields = ReportFields::new();
        for i in 0..120 {
            fields.push(format!("Field {i}"), "ü".repeat(120));
        }
        let bytes = write_document("Heart Disease Risk Report", &[fields], &Typeface::Builtin)
            .expect("Should render");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_provision_without_font_or_url_is_builtin() {
        let temp = tempdir().expect("tempdir");
        let typeface = provision_typeface(&temp.path().join("missing.ttf"), None);
        assert!(!typeface.is_external());
    }

    #[test]
    fn test_provision_ignores_non_font_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("font.ttf");
        std::fs::write(&path, b"<html>not found</html>").expect("write");

        assert!(!provision_typeface(&path, None).is_external());
    }

    #[test]
    fn test_provision_uses_local_font() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("Face.ttf");
        std::fs::write(&path, [0x00, 0x01, 0x00, 0x00, 0x00, 0x10]).expect("write");

        match provision_typeface(&path, Some("http://127.0.0.1:9/never")) {
            Typeface::External { name, bytes } => {
                assert_eq!(name, "Face");
                assert_eq!(bytes.len(), 6);
            }
            Typeface::Builtin => panic!("expected external face"),
        }
    }
}
