use std::fmt;

/// `SourceLoc` position of a token in the translation unit
/// `file` source string index (0 for single file compiles)
/// `line` 1 based line number
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct SourceLoc {
    pub file: u32,
    pub line: u32,
}

impl SourceLoc {
    #[inline]
    pub const fn new(file: u32, line: u32) -> SourceLoc {
        SourceLoc { file, line }
    }
    #[inline]
    pub const fn line_index(&self) -> usize {
        self.line.saturating_sub(1) as usize
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.file, self.line)
    }
}

/// byte ranges of every line in `text`, excluding line terminators
pub fn find_line_ranges(text: &str) -> Vec<std::ops::Range<usize>> {
    let mut ranges = Vec::with_capacity(text.len() / 32);
    let mut start = 0;

    for (idx, c) in text.char_indices() {
        if c == '\n' {
            let end = if idx > start && text.as_bytes()[idx - 1] == b'\r' { idx - 1 } else { idx };
            ranges.push(start..end);
            start = idx + 1;
        }
    }
    ranges.push(start..text.len());
    ranges
}

/// text of the line pointed to by `loc`, if it exists
pub fn line_text(text: &str, loc: SourceLoc) -> Option<&str> {
    let ranges = find_line_ranges(text);
    ranges.get(loc.line_index()).map(|range| &text[range.clone()])
}

#[test]
fn test_line_ranges() {
    let text = "void main() {\r\n  gl_FragColor = vec4(1.0);\n}";
    let ranges = find_line_ranges(text);
    assert_eq!(ranges.len(), 3);
    assert_eq!(&text[ranges[0].clone()], "void main() {");
    assert_eq!(&text[ranges[1].clone()], "  gl_FragColor = vec4(1.0);");
    assert_eq!(line_text(text, SourceLoc::new(0, 3)), Some("}"));
    assert_eq!(line_text(text, SourceLoc::new(0, 4)), None);
    assert_eq!(SourceLoc::new(0, 12).to_string(), "0(12)");
}
