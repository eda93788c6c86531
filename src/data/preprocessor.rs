// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Normalises one field of a data line before tokenisation.
//
// A field is a single whitespace-tokenised sentence, so unlike
// free text there are no paragraph breaks worth keeping:
//   1. Map tabs, NBSP, zero-width spaces, BOM and any other
//      control character to a plain space
//   2. Collapse runs of whitespace into one space
//   3. Trim both ends
//
// Case is left alone here; the tokenizer's normalizer lowercases.

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean one field, returning an owned single-line string.
    pub fn clean(&self, text: &str) -> String {
        let spaced = text.chars().map(|c| match c {
            '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
            c if c.is_control() => ' ',
            c => c,
        });

        let mut out        = String::with_capacity(text.len());
        let mut last_space = true; // swallows leading spaces
        for c in spaced {
            if c.is_whitespace() {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        // At most one trailing space can survive the loop
        if out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
