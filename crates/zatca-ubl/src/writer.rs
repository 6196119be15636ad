//! # Deterministic XML Writer
//!
//! A minimal append-only writer that emits one element per line with
//! four-space indentation. There is no configuration: identical call
//! sequences always produce identical bytes.

/// XML declaration emitted at the top of every document.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

const INDENT: &str = "    ";

/// Escape a string for safe inclusion in XML text or attribute content.
///
/// Replaces the five XML special characters with their entity references,
/// so party names and descriptions cannot inject markup.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Line-oriented XML writer.
#[derive(Debug)]
pub struct XmlWriter {
    buf: String,
    depth: usize,
}

impl XmlWriter {
    /// Start a document with the XML declaration.
    pub fn new() -> Self {
        let mut buf = String::with_capacity(16 * 1024);
        buf.push_str(XML_DECLARATION);
        buf.push('\n');
        Self { buf, depth: 0 }
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.buf.push_str(INDENT);
        }
    }

    fn start_tag(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.indent();
        self.buf.push('<');
        self.buf.push_str(name);
        for (key, value) in attrs {
            self.buf.push(' ');
            self.buf.push_str(key);
            self.buf.push_str("=\"");
            self.buf.push_str(&xml_escape(value));
            self.buf.push('"');
        }
        self.buf.push('>');
    }

    /// Open an element and indent its children.
    pub fn open(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.start_tag(name, attrs);
        self.buf.push('\n');
        self.depth += 1;
    }

    /// Close the innermost open element.
    pub fn close(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push_str(">\n");
    }

    /// Emit an element with escaped text content on a single line.
    pub fn leaf(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) {
        self.start_tag(name, attrs);
        self.buf.push_str(&xml_escape(text));
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push_str(">\n");
    }

    /// Emit a pre-formatted block, re-indented to the current depth.
    ///
    /// The block is trusted markup and is not escaped.
    pub fn raw_block(&mut self, block: &str) {
        for line in block.lines().filter(|l| !l.trim().is_empty()) {
            self.indent();
            self.buf.push_str(line);
            self.buf.push('\n');
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Finish the document.
    pub fn finish(self) -> String {
        self.buf
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_all_special_characters() {
        assert_eq!(
            xml_escape(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&apos;s&lt;/a&gt;"
        );
    }

    #[test]
    fn escape_passes_arabic_through() {
        assert_eq!(xml_escape("شركة الاختبار"), "شركة الاختبار");
    }

    #[test]
    fn nested_output_is_indented() {
        let mut w = XmlWriter::new();
        w.open("a", &[("x", "1")]);
        w.leaf("b", &[], "t&u");
        w.close("a");
        assert_eq!(
            w.finish(),
            format!("{XML_DECLARATION}\n<a x=\"1\">\n    <b>t&amp;u</b>\n</a>\n")
        );
    }

    #[test]
    fn attributes_are_escaped() {
        let mut w = XmlWriter::new();
        w.leaf("c", &[("name", "\"quoted\"")], "");
        assert!(w.finish().contains("<c name=\"&quot;quoted&quot;\"></c>"));
    }

    #[test]
    fn raw_block_is_reindented() {
        let mut w = XmlWriter::new();
        w.open("root", &[]);
        w.raw_block("<x>\n    <y/>\n</x>\n");
        assert_eq!(w.depth(), 1);
        w.close("root");
        assert!(w.finish().contains("\n    <x>\n        <y/>\n    </x>\n"));
    }
}
