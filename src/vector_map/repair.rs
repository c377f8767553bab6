//! Lossless repair of unpaired UTF-16 surrogate escapes.
//!
//! Map exports sometimes contain `\uD8xx` escapes without their low half
//! (names truncated mid-emoji). Strict JSON parsers reject those. Instead of
//! dropping them, the escape is turned into literal text by doubling its
//! backslash, so `"\uD83D"` parses as the six visible characters `\uD83D`.
//! Valid pairs and all other escapes pass through untouched.

/// Counts from one repair pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurrogateStats {
    pub isolated_high: usize,
    pub isolated_low: usize,
    pub preserved_pairs: usize,
}

impl SurrogateStats {
    pub fn repaired(&self) -> usize {
        self.isolated_high + self.isolated_low
    }
}

fn is_high(v: u16) -> bool {
    (0xD800..=0xDBFF).contains(&v)
}

fn is_low(v: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&v)
}

/// Value of the `\uXXXX` escape starting at `at`, if there is one.
fn unicode_escape(input: &[u8], at: usize) -> Option<u16> {
    let esc = input.get(at..at + 6)?;
    if esc[0] != b'\\' || esc[1] != b'u' {
        return None;
    }
    let hex = std::str::from_utf8(&esc[2..]).ok()?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(hex, 16).ok()
}

/// Single pass over the raw document. Only string contents are touched.
pub fn repair_surrogates(input: &[u8]) -> (Vec<u8>, SurrogateStats) {
    let mut out = Vec::with_capacity(input.len() + 64);
    let mut stats = SurrogateStats::default();
    let mut in_string = false;
    let mut i = 0;

    while i < input.len() {
        let c = input[i];

        if !in_string {
            if c == b'"' {
                in_string = true;
            }
            out.push(c);
            i += 1;
            continue;
        }

        match c {
            b'"' => {
                in_string = false;
                out.push(c);
                i += 1;
            }
            b'\\' => match unicode_escape(input, i) {
                Some(v) if is_high(v) => {
                    if unicode_escape(input, i + 6).is_some_and(is_low) {
                        out.extend_from_slice(&input[i..i + 12]);
                        stats.preserved_pairs += 1;
                        i += 12;
                    } else {
                        out.push(b'\\');
                        out.extend_from_slice(&input[i..i + 6]);
                        stats.isolated_high += 1;
                        i += 6;
                    }
                }
                Some(v) if is_low(v) => {
                    out.push(b'\\');
                    out.extend_from_slice(&input[i..i + 6]);
                    stats.isolated_low += 1;
                    i += 6;
                }
                Some(_) => {
                    out.extend_from_slice(&input[i..i + 6]);
                    i += 6;
                }
                None => {
                    // Any other escape: copy it with the escaped byte so an
                    // escaped quote never ends the string.
                    out.push(c);
                    if let Some(&next) = input.get(i + 1) {
                        out.push(next);
                    }
                    i += 2;
                }
            },
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    (out, stats)
}
