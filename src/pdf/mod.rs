//! # Print Adapter — PDF Serializer
//!
//! Interprets computed layout instructions into a printable PDF where each
//! data row becomes one physical page sized exactly to the label stock.
//!
//! This is a from-scratch PDF 1.7 writer. We write the raw bytes ourselves
//! because the subset a label printer needs — standard fonts, lines, filled
//! rectangles — is small, and owning the output keeps the engine
//! self-contained.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (catalog, fonts, pages, content streams)
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! The adapter never recomputes a position: every coordinate comes off the
//! instruction list in millimetres and is converted to points here. Per-row
//! failures (a QR payload too long to encode, say) produce a visible
//! fallback page and the batch continues — a thousand-label job never
//! aborts for one bad row.

pub mod metrics;

use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite;

use miniz_oxide::deflate::compress_to_vec_zlib;
use qrcode::{EcLevel, QrCode};
use serde::Serialize;

use crate::error::LabelError;
use crate::layout::{compute_layout, ComputedLayout, DataRow, Instruction};
use crate::schema::registry::SchemaRegistry;
use crate::schema::{Align, Decorator, DividerStyle, FontWeight, PageMm};
use metrics::LockedFont;

/// Points per millimetre.
pub const MM_TO_PT: f64 = 2.83465;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * MM_TO_PT
}

/// Outcome of one print batch: page count plus any rows that fell back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub pages: usize,
    pub failures: Vec<RowFailure>,
}

/// One row that could not be rendered and was substituted with a fallback
/// page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    pub row_index: usize,
    pub message: String,
}

/// Render a batch of data rows through the named layout into PDF bytes.
///
/// Each row becomes one page. Rows that fail to draw are substituted with a
/// visible fallback page and recorded in the summary; only an unknown
/// layout key fails the whole batch.
pub fn render_batch(
    registry: &SchemaRegistry,
    slug: &str,
    rows: &[DataRow],
    page_override: Option<PageMm>,
) -> Result<(Vec<u8>, BatchSummary), LabelError> {
    let schema = registry
        .get(slug)
        .ok_or_else(|| LabelError::UnknownLayout(slug.to_string()))?;

    let mut builder = PdfBuilder::new();
    let mut page_obj_ids = Vec::new();
    let mut failures = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        let computed = compute_layout(schema, row, page_override);

        let content = match page_content(&computed) {
            Ok(stream) => stream,
            Err(err) => {
                log::warn!("row {} failed to render: {}", idx, err);
                failures.push(RowFailure {
                    row_index: idx,
                    message: err.to_string(),
                });
                fallback_content(&computed.page, idx, &err.to_string())
            }
        };

        page_obj_ids.push(builder.add_page(computed.page, &content));
    }

    builder.finish(&page_obj_ids);

    let summary = BatchSummary {
        pages: page_obj_ids.len(),
        failures,
    };
    Ok((builder.serialize(), summary))
}

/// Streaming variant of [`render_batch`]: writes the bytes into `writer`.
pub fn render_batch_to<W: IoWrite>(
    writer: &mut W,
    registry: &SchemaRegistry,
    slug: &str,
    rows: &[DataRow],
    page_override: Option<PageMm>,
) -> Result<BatchSummary, LabelError> {
    let (bytes, summary) = render_batch(registry, slug, rows, page_override)?;
    writer.write_all(&bytes)?;
    Ok(summary)
}

/// Like [`render_batch_to`], firing `on_complete` once the bytes are fully
/// written. The hook only runs on success; callers use it to record print
/// history after the artifact is known-good.
pub fn render_batch_with<W, F>(
    writer: &mut W,
    registry: &SchemaRegistry,
    slug: &str,
    rows: &[DataRow],
    page_override: Option<PageMm>,
    on_complete: F,
) -> Result<BatchSummary, LabelError>
where
    W: IoWrite,
    F: FnOnce(&BatchSummary),
{
    let summary = render_batch_to(writer, registry, slug, rows, page_override)?;
    on_complete(&summary);
    Ok(summary)
}

// ── PDF object assembly ─────────────────────────────────────────────

/// Tracks allocated PDF objects during writing.
///
/// Object layout: 0 is the free-list placeholder, 1 the Catalog, 2 the page
/// tree root, 3 and 4 the two standard font dictionaries; content streams
/// and page objects follow per label.
struct PdfBuilder {
    objects: Vec<Vec<u8>>,
}

const CATALOG_OBJ: usize = 1;
const PAGES_OBJ: usize = 2;
const FONT_REGULAR_OBJ: usize = 3;
const FONT_BOLD_OBJ: usize = 4;

impl PdfBuilder {
    fn new() -> Self {
        Self {
            objects: vec![Vec::new(); 5],
        }
    }

    /// Add a compressed content stream and its page object; returns the
    /// page object id.
    fn add_page(&mut self, page: PageMm, content: &str) -> usize {
        let compressed = compress_to_vec_zlib(content.as_bytes(), 6);

        let content_obj_id = self.objects.len();
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< /Length {} /Filter /FlateDecode >>\nstream\n",
            compressed.len()
        );
        data.extend_from_slice(&compressed);
        data.extend_from_slice(b"\nendstream");
        self.objects.push(data);

        let page_obj_id = self.objects.len();
        let page_dict = format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Contents {} 0 R /Resources << /Font << /F0 {} 0 R /F1 {} 0 R >> >> >>",
            PAGES_OBJ,
            mm_to_pt(page.width_mm),
            mm_to_pt(page.height_mm),
            content_obj_id,
            FONT_REGULAR_OBJ,
            FONT_BOLD_OBJ,
        );
        self.objects.push(page_dict.into_bytes());
        page_obj_id
    }

    /// Fill in the catalog, page tree, and font objects.
    fn finish(&mut self, page_obj_ids: &[usize]) {
        self.objects[CATALOG_OBJ] = format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES_OBJ).into_bytes();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        self.objects[PAGES_OBJ] = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let font_dict = |font: metrics::StdFont| {
            format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.postscript_name()
            )
            .into_bytes()
        };
        self.objects[FONT_REGULAR_OBJ] = font_dict(metrics::StdFont::Helvetica);
        self.objects[FONT_BOLD_OBJ] = font_dict(metrics::StdFont::HelveticaBold);
    }

    fn serialize(&self) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; self.objects.len()];

        // Header
        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in self.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let header = format!("{} 0 obj\n", i);
            output.extend_from_slice(header.as_bytes());
            output.extend_from_slice(obj);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", self.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for i in 1..self.objects.len() {
            let _ = write!(output, "{:010} 00000 n \n", offsets[i]);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            self.objects.len(),
            CATALOG_OBJ,
            xref_offset
        );

        output
    }
}

// ── Content stream generation ───────────────────────────────────────

/// Build the content stream for one computed label.
///
/// Background regions are a screen-only aid (the preview tints the laminate
/// zone); the printer draws instructions only.
fn page_content(computed: &ComputedLayout) -> Result<String, LabelError> {
    let mut stream = String::new();
    let page_h_pt = mm_to_pt(computed.page.height_mm);

    for instr in &computed.instructions {
        match instr {
            Instruction::Text {
                text,
                x_mm,
                y_mm,
                width_mm,
                font_size_pt,
                font_weight,
                align,
                decorator,
                decorator_color,
                decorator_thickness_mm,
                decorator_gap_mm,
                ..
            } => {
                // Lock font/size once — shared by measurement AND the draw.
                let locked = LockedFont::lock(*font_weight, *font_size_pt);

                if *decorator == Some(Decorator::DividerLine) {
                    write_divider_line_decorator(
                        &mut stream,
                        text,
                        *x_mm,
                        *y_mm,
                        *width_mm,
                        locked,
                        decorator_color.as_deref(),
                        *decorator_thickness_mm,
                        *decorator_gap_mm,
                        page_h_pt,
                    );
                } else {
                    write_text(
                        &mut stream,
                        text,
                        *x_mm,
                        *y_mm,
                        *width_mm,
                        *align,
                        locked,
                        page_h_pt,
                    );
                }
            }

            Instruction::Divider {
                y_mm,
                width_mm,
                style,
                color,
            } => {
                let (r, g, b) = hex_rgb(color);
                let y = page_h_pt - mm_to_pt(*y_mm);
                let _ = write!(stream, "q\n");
                if *style == DividerStyle::Dashed {
                    let dash = mm_to_pt(1.0);
                    let _ = write!(stream, "[{:.2} {:.2}] 0 d\n", dash, dash);
                }
                let _ = write!(
                    stream,
                    "{:.3} {:.3} {:.3} RG\n0.5 w\n0 {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
                    r,
                    g,
                    b,
                    y,
                    mm_to_pt(*width_mm),
                    y
                );
            }

            Instruction::Qr {
                payload,
                x_mm,
                y_mm,
                size_mm,
            } => {
                write_qr_matrix(&mut stream, payload, *x_mm, *y_mm, *size_mm, page_h_pt)?;
            }
        }
    }

    Ok(stream)
}

/// Draw a single-line text instruction. Alignment resolves against the
/// measured width; the measurement uses the same locked font the `Tf`
/// operator names.
#[allow(clippy::too_many_arguments)]
fn write_text(
    stream: &mut String,
    text: &str,
    x_mm: f64,
    y_mm: f64,
    width_mm: f64,
    align: Align,
    locked: LockedFont,
    page_h_pt: f64,
) {
    if text.is_empty() {
        return;
    }

    let region_x = mm_to_pt(x_mm);
    let region_w = mm_to_pt(width_mm);
    let text_w = locked.width_of(text);

    let x = match align {
        Align::Left => region_x,
        Align::Center => region_x + (region_w - text_w) / 2.0,
        Align::Right => region_x + region_w - text_w,
    };
    let baseline = page_h_pt - mm_to_pt(y_mm) - locked.ascent();

    let _ = write!(
        stream,
        "BT\n/{} {:.1} Tf\n0 0 0 rg\n{:.2} {:.2} Td\n({}) Tj\nET\n",
        locked.font.resource_name(),
        locked.size_pt,
        x,
        baseline,
        escape_pdf_text(text)
    );
}

/// Draw text with flanking horizontal rules (`── LINE-001 ──`).
///
/// The rule endpoints derive from the measured text width, so this uses the
/// locked font passed in by the caller for both the measurement and the
/// text draw. Rules are clamped to the content region when the text runs
/// wide; empty text degrades to a single full-width rule.
#[allow(clippy::too_many_arguments)]
fn write_divider_line_decorator(
    stream: &mut String,
    text: &str,
    x_mm: f64,
    y_mm: f64,
    width_mm: f64,
    locked: LockedFont,
    color: Option<&str>,
    thickness_mm: Option<f64>,
    gap_mm: Option<f64>,
    page_h_pt: f64,
) {
    let region_x = mm_to_pt(x_mm);
    let region_w = mm_to_pt(width_mm);
    let gap = mm_to_pt(gap_mm.unwrap_or(1.0));
    let rgb = hex_rgb(color.unwrap_or("#000000"));
    let line_w = mm_to_pt(thickness_mm.unwrap_or(0.3)).max(0.5); // min 0.5 pt
    let mid_y = page_h_pt - (mm_to_pt(y_mm) + locked.size_pt * 0.45);

    if text.is_empty() {
        stroke_line(stream, region_x, region_x + region_w, mid_y, line_w, rgb);
        return;
    }

    // Measure with the already-locked font state.
    let text_w = locked.width_of(text);
    let center_x = region_x + region_w / 2.0;
    let text_left = center_x - text_w / 2.0;
    let text_right = center_x + text_w / 2.0;

    let left_line_end = text_left - gap;
    if left_line_end > region_x {
        stroke_line(stream, region_x, left_line_end, mid_y, line_w, rgb);
    }

    let right_line_start = text_right + gap;
    let region_end = region_x + region_w;
    if right_line_start < region_end {
        stroke_line(stream, right_line_start, region_end, mid_y, line_w, rgb);
    }

    write_text(
        stream,
        text,
        x_mm,
        y_mm,
        width_mm,
        Align::Center,
        locked,
        page_h_pt,
    );
}

fn stroke_line(stream: &mut String, x0: f64, x1: f64, y: f64, width: f64, rgb: (f64, f64, f64)) {
    let _ = write!(
        stream,
        "q\n{:.3} {:.3} {:.3} RG\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
        rgb.0, rgb.1, rgb.2, width, x0, y, x1, y
    );
}

/// Fill the QR matrix as per-module rectangles over a white backing square.
/// An empty payload draws nothing; an unencodable payload is a row-level
/// error handled by the batch loop.
fn write_qr_matrix(
    stream: &mut String,
    payload: &str,
    x_mm: f64,
    y_mm: f64,
    size_mm: f64,
    page_h_pt: f64,
) -> Result<(), LabelError> {
    if payload.is_empty() {
        return Ok(());
    }

    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|e| LabelError::Qr(e.to_string()))?;
    let module_count = code.width();
    let colors = code.to_colors();

    let x0 = mm_to_pt(x_mm);
    let size_pt = mm_to_pt(size_mm);
    let module_pt = size_pt / module_count as f64;
    let top = page_h_pt - mm_to_pt(y_mm);

    let _ = write!(
        stream,
        "q\n1 1 1 rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
        x0,
        top - size_pt,
        size_pt,
        size_pt
    );

    let _ = write!(stream, "q\n0 0 0 rg\n");
    for row in 0..module_count {
        for col in 0..module_count {
            if colors[row * module_count + col] == qrcode::Color::Dark {
                let _ = write!(
                    stream,
                    "{:.2} {:.2} {:.2} {:.2} re\n",
                    x0 + col as f64 * module_pt,
                    top - (row + 1) as f64 * module_pt,
                    module_pt,
                    module_pt
                );
            }
        }
    }
    let _ = write!(stream, "f\nQ\n");

    Ok(())
}

/// Content for the visible fallback page substituted for a failed row.
fn fallback_content(page: &PageMm, row_index: usize, message: &str) -> String {
    let mut stream = String::new();
    let page_h_pt = mm_to_pt(page.height_mm);
    let locked = LockedFont::lock(FontWeight::Normal, 5.0);
    let width_mm = page.width_mm - 4.0;

    write_text(
        &mut stream,
        &format!("Label {} failed to render", row_index + 1),
        2.0,
        4.0,
        width_mm,
        Align::Left,
        LockedFont::lock(FontWeight::Bold, 6.0),
        page_h_pt,
    );

    // Break the message into short lines so it stays on the narrow page.
    let mut y = 8.0;
    let chars: Vec<char> = message.chars().collect();
    for chunk in chars.chunks(36).take(6) {
        let line: String = chunk.iter().collect();
        write_text(&mut stream, &line, 2.0, y, width_mm, Align::Left, locked, page_h_pt);
        y += 2.4;
    }

    stream
}

/// Parse a `#rrggbb` hex color into unit-range RGB. Malformed input falls
/// back to black.
fn hex_rgb(color: &str) -> (f64, f64, f64) {
    let hex = color.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return (0.0, 0.0, 0.0);
    }
    let channel = |i: usize| -> f64 {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map(|v| v as f64 / 255.0)
            .unwrap_or(0.0)
    };
    (channel(0), channel(2), channel(4))
}

/// Escape text for a PDF literal string. WinAnsi covers Latin-1 directly;
/// anything else degrades to `?`.
fn escape_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        let cp = ch as u32;
        let byte = if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            cp as u8
        } else {
            b'?'
        };
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            0x20..=0x7E => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\{:03o}", byte);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_layout;
    use crate::schema::registry::SchemaRegistry;
    use crate::schema::{Schema, Segment};
    use serde_json::json;

    fn full_row() -> DataRow {
        let mut row = DataRow::new();
        row.insert("aSide".to_string(), json!("Switch-A"));
        row.insert("portA".to_string(), json!("1/0/1"));
        row.insert("zSide".to_string(), json!("Switch-B"));
        row.insert("portB".to_string(), json!("1/0/2"));
        row
    }

    #[test]
    fn test_hex_rgb_parses_channels() {
        let (r, g, b) = hex_rgb("#ff0080");
        assert!((r - 1.0).abs() < 1e-9);
        assert_eq!(g, 0.0);
        assert!((b - 128.0 / 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_hex_rgb_malformed_is_black() {
        assert_eq!(hex_rgb("red"), (0.0, 0.0, 0.0));
        assert_eq!(hex_rgb("#fff"), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_escape_pdf_text() {
        assert_eq!(escape_pdf_text("a(b)c"), "a\\(b\\)c");
        assert_eq!(escape_pdf_text("back\\slash"), "back\\\\slash");
        assert_eq!(escape_pdf_text("smile \u{1F600}"), "smile ?");
    }

    #[test]
    fn test_page_content_emits_text_operators() {
        let reg = SchemaRegistry::builtin();
        let computed = compute_layout(reg.get("layout-a").unwrap(), &full_row(), None);
        let stream = page_content(&computed).unwrap();
        assert!(stream.contains("(Switch-A) Tj"));
        assert!(stream.contains("(Port 1/0/1) Tj"));
        assert!(stream.contains("/F1")); // bold endpoints
        assert!(stream.contains("[2.83 2.83] 0 d")); // dashed divider
    }

    #[test]
    fn test_empty_qr_payload_draws_nothing() {
        let mut stream = String::new();
        write_qr_matrix(&mut stream, "", 8.55, 27.6, 21.0, 288.0).unwrap();
        assert!(stream.is_empty());
    }

    #[test]
    fn test_decorator_flanks_text_with_two_rules() {
        let mut stream = String::new();
        let locked = LockedFont::lock(FontWeight::Bold, 6.2);
        write_divider_line_decorator(
            &mut stream,
            "DC-01",
            1.52,
            2.0,
            35.05,
            locked,
            Some("#000000"),
            Some(0.3),
            Some(1.0),
            288.0,
        );
        // Two stroked rules plus the centered text.
        assert_eq!(stream.matches(" l\nS\nQ\n").count(), 2);
        assert!(stream.contains("(DC-01) Tj"));
    }

    #[test]
    fn test_decorator_empty_text_is_single_rule() {
        let mut stream = String::new();
        let locked = LockedFont::lock(FontWeight::Bold, 6.2);
        write_divider_line_decorator(
            &mut stream, "", 1.52, 2.0, 35.05, locked, None, None, None, 288.0,
        );
        assert_eq!(stream.matches(" l\nS\nQ\n").count(), 1);
        assert!(!stream.contains("Tj"));
    }

    #[test]
    fn test_wide_text_clamps_rules_away() {
        let mut stream = String::new();
        let locked = LockedFont::lock(FontWeight::Bold, 6.2);
        write_divider_line_decorator(
            &mut stream,
            "AN-EXTREMELY-LONG-LINE-IDENTIFIER-THAT-OVERFLOWS",
            1.52,
            2.0,
            35.05,
            locked,
            None,
            None,
            None,
            288.0,
        );
        // No room for flanking rules, text still drawn.
        assert_eq!(stream.matches(" l\nS\nQ\n").count(), 0);
        assert!(stream.contains("Tj"));
    }

    #[test]
    fn test_render_batch_unknown_layout() {
        let reg = SchemaRegistry::builtin();
        let err = render_batch(&reg, "layout-z", &[full_row()], None).unwrap_err();
        assert!(matches!(err, LabelError::UnknownLayout(_)));
    }

    #[test]
    fn test_hex_rgb_multibyte_is_black() {
        // 6 bytes but not 6 ASCII chars; must not slice mid-char.
        assert_eq!(hex_rgb("héllo"), (0.0, 0.0, 0.0));
        assert_eq!(hex_rgb("#hℓлло"), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_batch_survives_multibyte_divider_color() {
        let mut reg = SchemaRegistry::new();
        reg.register(Schema {
            id: "custom".to_string(),
            name: "Custom".to_string(),
            description: String::new(),
            page: PageMm {
                width_mm: 38.1,
                height_mm: 101.6,
            },
            background: vec![],
            segments: vec![Segment::Divider {
                y_mm: 25.4,
                style: DividerStyle::Dashed,
                color: "héllo".to_string(),
            }],
            preview_columns: vec![],
        });
        let (bytes, summary) = render_batch(&reg, "custom", &[full_row()], None).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn test_page_content_skips_background_regions() {
        let reg = SchemaRegistry::builtin();
        // layout-a declares a laminate background but has no QR segment, so
        // the stream must contain no fill rectangles at all.
        let computed = compute_layout(reg.get("layout-a").unwrap(), &full_row(), None);
        assert!(!computed.background.is_empty());
        let stream = page_content(&computed).unwrap();
        assert!(!stream.contains(" re\n"));
    }

    #[test]
    fn test_render_batch_one_page_per_row() {
        let reg = SchemaRegistry::builtin();
        let rows = vec![full_row(), full_row(), full_row()];
        let (bytes, summary) = render_batch(&reg, "layout-a", &rows, None).unwrap();
        assert_eq!(summary.pages, 3);
        assert!(summary.failures.is_empty());
        assert!(bytes.starts_with(b"%PDF-1.7"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Count 3"));
    }
}
