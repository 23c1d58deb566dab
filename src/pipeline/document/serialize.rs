//! Canonical rendering of pipeline documents.
//!
//! Two-space indentation, options before inputs, one element per line and a
//! trailing newline. Parsing this output yields the same descriptors, and
//! rendering those again yields the same bytes.

use super::{PipelineDocument, StageDescriptor};
use crate::pipeline::options::OptionEntry;
use std::fmt::Write;

const INDENT: &str = "  ";

pub(super) fn write_document(doc: &PipelineDocument) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    let _ = writeln!(out, "<Pipeline version=\"{}\">", escape_attr(&doc.version));
    write_stage(&mut out, &doc.root, 1);
    out.push_str("</Pipeline>\n");
    out
}

fn write_stage(out: &mut String, stage: &StageDescriptor, depth: usize) {
    let indent = INDENT.repeat(depth);
    let element = stage.kind.element_name();
    let _ = write!(
        out,
        "{}<{} type=\"{}\"",
        indent,
        element,
        escape_attr(&stage.type_name)
    );

    if stage.options.is_empty() && stage.inputs.is_empty() {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">\n");

    for option in &stage.options {
        write_option(out, option, depth + 1);
    }
    for input in &stage.inputs {
        write_stage(out, input, depth + 1);
    }

    let _ = writeln!(out, "{}</{}>", indent, element);
}

fn write_option(out: &mut String, option: &OptionEntry, depth: usize) {
    let _ = write!(
        out,
        "{}<Option name=\"{}\"",
        INDENT.repeat(depth),
        escape_attr(&option.name)
    );
    if let Some(description) = &option.description {
        let _ = write!(out, " description=\"{}\"", escape_attr(description));
    }

    let value = option.value.to_string();
    if value.is_empty() {
        out.push_str("/>\n");
    } else {
        let _ = writeln!(out, ">{}</Option>", escape_text(&value));
    }
}

/// Attribute values: whitespace other than a plain space is written as a
/// character reference, since parsers normalize raw tabs and newlines in
/// attributes to spaces.
fn escape_attr(s: &str) -> String {
    escape(s, true)
}

/// Element text: a raw `\r` would be folded into a line ending on read.
fn escape_text(s: &str) -> String {
    escape(s, false)
}

fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\r' => out.push_str("&#13;"),
            '\n' if attribute => out.push_str("&#10;"),
            '\t' if attribute => out.push_str("&#9;"),
            _ => out.push(ch),
        }
    }
    out
}
