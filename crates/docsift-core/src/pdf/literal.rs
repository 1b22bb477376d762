//! Parenthesised literal-string scanner.
//!
//! A two-state machine over raw bytes. `(` enters a string (restarting it if
//! already inside), `)` closes it and yields the bytes collected in between.
//! Escapes and nesting are not interpreted; the scan is a heuristic over
//! content that may be partly compressed or malformed.

/// Scanner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Outside,
    InsideString,
}

/// Iterator over the raw contents of `( ... )` spans in a byte slice.
pub struct LiteralStrings<'a> {
    bytes: std::slice::Iter<'a, u8>,
    state: ScanState,
    current: Vec<u8>,
}

impl<'a> LiteralStrings<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes: bytes.iter(),
            state: ScanState::Outside,
            current: Vec::new(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }
}

impl Iterator for LiteralStrings<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        for &byte in self.bytes.by_ref() {
            match (self.state, byte) {
                (_, b'(') => {
                    self.state = ScanState::InsideString;
                    self.current.clear();
                }
                (ScanState::InsideString, b')') => {
                    self.state = ScanState::Outside;
                    return Some(std::mem::take(&mut self.current));
                }
                (ScanState::InsideString, other) => self.current.push(other),
                (ScanState::Outside, _) => {}
            }
        }
        None
    }
}

/// Keep printable ASCII (0x20..=0x7E) from a raw fragment.
pub fn printable_ascii(raw: &[u8]) -> String {
    raw.iter()
        .filter(|b| (0x20..=0x7E).contains(*b))
        .map(|&b| b as char)
        .collect()
}
