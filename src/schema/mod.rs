//! # Layout Schemas
//!
//! The declarative input model for the label engine. A schema describes one
//! printable label variant: its physical page size, optional background fill
//! regions, and an ordered list of segments occupying vertical bands of the
//! page. Schemas carry *no* rendering logic — they are data, consumed by the
//! layout engine in [`crate::layout`].
//!
//! All dimensions are in millimetres (mm). Font sizes are in typographic
//! points (pt). The serde wire names (`widthMm`, `fontSizePt`, ...) are part
//! of the contract shared with preview clients and must not change.

pub mod registry;

use serde::{Deserialize, Serialize};

/// Physical page size of one label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMm {
    pub width_mm: f64,
    pub height_mm: f64,
}

/// A full-width background fill band (e.g. the laminate zone on wrap labels).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundRegion {
    pub y_mm: f64,
    pub height_mm: f64,
    /// Fill color as a `#rrggbb` hex string.
    pub color: String,
}

/// An immutable, named layout definition for one label variant.
///
/// Loaded once at startup (see [`registry::SchemaRegistry`]) and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub page: PageMm,
    #[serde(default)]
    pub background: Vec<BackgroundRegion>,
    pub segments: Vec<Segment>,
    /// Column headings shown by batch editors for this layout.
    #[serde(default)]
    pub preview_columns: Vec<String>,
}

/// A schema sub-unit occupying a vertical band of the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    /// A set of text elements laid out by a [`Block`].
    #[serde(rename_all = "camelCase")]
    Block {
        y_mm: f64,
        height_mm: f64,
        block: Block,
    },

    /// A horizontal rule spanning the full page width.
    #[serde(rename_all = "camelCase")]
    Divider {
        y_mm: f64,
        #[serde(default)]
        style: DividerStyle,
        #[serde(default = "default_divider_color")]
        color: String,
    },

    /// A scannable QR region centered within the segment band.
    #[serde(rename_all = "camelCase")]
    Qr {
        y_mm: f64,
        height_mm: f64,
        qr: QrDef,
    },

    /// A rows × cols grid of identical cards.
    #[serde(rename_all = "camelCase")]
    Grid {
        y_mm: f64,
        height_mm: f64,
        rows: u32,
        cols: u32,
        card: Card,
    },

    /// Segment kinds this engine version does not know about. Skipped during
    /// layout so newer schemas remain loadable by older engines.
    #[serde(other)]
    Unknown,
}

fn default_divider_color() -> String {
    "#94a3b8".to_string()
}

/// Rule style for divider segments and instructions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DividerStyle {
    #[default]
    Dashed,
    Solid,
}

/// A block of text elements, laid out sequentially ("flow") or at fixed
/// offsets within a vertically-centered band ("centered").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Content width as a fraction of the page width; the content region is
    /// horizontally centered.
    pub content_width_ratio: f64,
    #[serde(default)]
    pub positioning: Positioning,
    /// Flow positioning: distance from the segment top to the first element.
    #[serde(default)]
    pub padding_top_mm: f64,
    /// Centered positioning: fixed height of the content region.
    #[serde(default)]
    pub content_height_mm: f64,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Positioning {
    #[default]
    Flow,
    Centered,
}

/// Where an element's display text comes from. Exactly one source per
/// element; on the wire the variant key sits directly on the element
/// object (`staticText`, `resolveKeys`, or `key`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextSource {
    /// A literal, row-independent value (stringified when not a string).
    StaticText(serde_json::Value),
    /// Ordered fallback chain: the first key with a non-empty value wins.
    ResolveKeys(Vec<String>),
    /// A single row key.
    Key(String),
}

/// The smallest unit of text content within a block or grid card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,
    #[serde(flatten)]
    pub source: TextSource,
    /// Prepended to the resolved value (e.g. `"Port "`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub font_size_pt: f64,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub align: Align,
    /// A conditional element whose resolved text is empty is elided
    /// entirely, including the vertical space it would occupy in flow
    /// positioning.
    #[serde(default)]
    pub conditional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorator: Option<Decorator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorator_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorator_thickness_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorator_gap_mm: Option<f64>,
    /// Flow positioning: nominal line height.
    #[serde(default)]
    pub height_mm: f64,
    /// Flow positioning: gap before the next element.
    #[serde(default)]
    pub spacing_after_mm: f64,
    /// Centered/grid positioning: offset from the content-region top.
    #[serde(default)]
    pub offset_mm: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

/// Visual treatment interpreted by the render adapters; the layout engine
/// attaches it to the instruction verbatim and never draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Decorator {
    /// Text flanked by horizontal rule lines (`── LINE-001 ──`).
    DividerLine,
}

/// Scannable QR region definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrDef {
    pub size_mm: f64,
    /// Ordered fields composed into the multi-line payload; empty results
    /// are omitted.
    pub payload_fields: Vec<PayloadField>,
}

/// One line of a QR payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadField {
    #[serde(flatten)]
    pub source: FieldSource,
    /// Applied to single-key fields only; fallback chains contribute the
    /// bare value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldSource {
    ResolveKeys(Vec<String>),
    Key(String),
}

/// The repeated card template inside a grid segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub width_mm: f64,
    pub height_mm: f64,
    pub elements: Vec<Element>,
}
