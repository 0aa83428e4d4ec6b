//! Template rendering
//!
//! Firmware templates are C `printf` format strings whose arguments are the
//! record's 32-bit payload words, one word per placeholder. Rendering here is
//! bounds-checked: a placeholder that runs past the available payload renders
//! as `0` and is counted in [`Rendered::missing_args`] instead of reading
//! beyond the record.
//!
//! Supported: `%d %i %u %x %X %o %c %p %s %%`, flags `- 0 + space #`, width and
//! precision (literal or `*`), and the length modifiers `hh h l ll j z t L q`,
//! which are accepted and ignored. `%s` cannot dereference firmware memory, so
//! it prints the word as `0x%08x`. Anything else is copied verbatim.
//!
//! Widths and precisions, literal or taken from the payload, are clamped to
//! [`MAX_FIELD_WIDTH`], the length of one firmware log line.

/// Widest field a single placeholder may produce
pub const MAX_FIELD_WIDTH: usize = 512;

/// Result of rendering one template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Rendered text
    pub text: String,
    /// Payload words consumed by placeholders
    pub consumed_args: usize,
    /// Placeholders that found no payload word left
    pub missing_args: usize,
}

impl Rendered {
    /// True if the template asked for more words than the payload carried
    pub fn overflowed(&self) -> bool {
        self.missing_args > 0
    }
}

/// Render `template` against `words`
pub fn format_words(template: &str, words: &[u32]) -> Rendered {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len() + 16);
    let mut args = Args::new(words);
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }

        out.push_str(&template[literal_start..i]);
        match parse_spec(bytes, i + 1) {
            Parsed::Spec(spec, end) => {
                if !spec.write(&mut out, &mut args) {
                    out.push_str(&template[i..end]);
                }
                i = end;
            }
            Parsed::Percent(end) => {
                out.push('%');
                i = end;
            }
            Parsed::Incomplete => {
                // dangling or non-ASCII conversion, keep the '%' as text
                out.push('%');
                i += 1;
            }
        }
        literal_start = i;
    }
    out.push_str(&template[literal_start..]);

    Rendered {
        text: out,
        consumed_args: args.next,
        missing_args: args.missing,
    }
}

/// Bounds-checked argument source
struct Args<'a> {
    words: &'a [u32],
    next: usize,
    missing: usize,
}

impl<'a> Args<'a> {
    fn new(words: &'a [u32]) -> Self {
        Self {
            words,
            next: 0,
            missing: 0,
        }
    }

    fn take(&mut self) -> u32 {
        match self.words.get(self.next) {
            Some(word) => {
                self.next += 1;
                *word
            }
            None => {
                self.missing += 1;
                0
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Count {
    Fixed(usize),
    Star,
}

#[derive(Debug, Clone, Copy, Default)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    alt: bool,
    width: Option<Count>,
    precision: Option<Count>,
    conversion: u8,
}

enum Parsed {
    /// Conversion spec ending before the given index
    Spec(Spec, usize),
    /// `%%`
    Percent(usize),
    Incomplete,
}

fn parse_spec(bytes: &[u8], mut i: usize) -> Parsed {
    let mut spec = Spec::default();

    if bytes.get(i) == Some(&b'%') {
        return Parsed::Percent(i + 1);
    }

    while let Some(&b) = bytes.get(i) {
        match b {
            b'-' => spec.left = true,
            b'0' => spec.zero = true,
            b'+' => spec.plus = true,
            b' ' => spec.space = true,
            b'#' => spec.alt = true,
            _ => break,
        }
        i += 1;
    }

    spec.width = parse_count(bytes, &mut i);
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        spec.precision = Some(parse_count(bytes, &mut i).unwrap_or(Count::Fixed(0)));
    }

    while let Some(b'h' | b'l' | b'j' | b'z' | b't' | b'L' | b'q') = bytes.get(i) {
        i += 1;
    }

    match bytes.get(i) {
        Some(&b) if b.is_ascii() => {
            spec.conversion = b;
            Parsed::Spec(spec, i + 1)
        }
        _ => Parsed::Incomplete,
    }
}

fn parse_count(bytes: &[u8], i: &mut usize) -> Option<Count> {
    if bytes.get(*i) == Some(&b'*') {
        *i += 1;
        return Some(Count::Star);
    }

    let start = *i;
    let mut value = 0usize;
    while let Some(&b) = bytes.get(*i) {
        if !b.is_ascii_digit() {
            break;
        }
        value = value.saturating_mul(10).saturating_add(usize::from(b - b'0'));
        *i += 1;
    }
    (*i > start).then_some(Count::Fixed(value))
}

impl Spec {
    /// Write the converted argument; returns false for unknown conversions,
    /// which consume nothing.
    fn write(mut self, out: &mut String, args: &mut Args<'_>) -> bool {
        if !matches!(
            self.conversion,
            b'd' | b'i' | b'u' | b'x' | b'X' | b'o' | b'c' | b'p' | b's'
        ) {
            return false;
        }

        let width = match self.width {
            Some(Count::Star) => {
                let w = args.take() as i32;
                if w < 0 {
                    self.left = true;
                }
                Some(clamp_field(w.unsigned_abs() as usize))
            }
            Some(Count::Fixed(w)) => Some(clamp_field(w)),
            None => None,
        };
        let precision = match self.precision {
            Some(Count::Star) => {
                let p = args.take() as i32;
                (p >= 0).then(|| clamp_field(p as usize))
            }
            Some(Count::Fixed(p)) => Some(clamp_field(p)),
            None => None,
        };

        let word = args.take();
        let (sign, prefix, body) = match self.conversion {
            b'd' | b'i' => {
                let value = word as i32;
                let sign = if value < 0 {
                    "-"
                } else if self.plus {
                    "+"
                } else if self.space {
                    " "
                } else {
                    ""
                };
                (sign, "", digits(value.unsigned_abs().to_string(), word, precision))
            }
            b'u' => ("", "", digits(word.to_string(), word, precision)),
            b'x' => {
                let prefix = if self.alt && word != 0 { "0x" } else { "" };
                ("", prefix, digits(format!("{:x}", word), word, precision))
            }
            b'X' => {
                let prefix = if self.alt && word != 0 { "0X" } else { "" };
                ("", prefix, digits(format!("{:X}", word), word, precision))
            }
            b'o' => {
                let mut body = digits(format!("{:o}", word), word, precision);
                if self.alt && !body.starts_with('0') {
                    body.insert(0, '0');
                }
                ("", "", body)
            }
            b'p' => ("", "0x", format!("{:x}", word)),
            b's' => ("", "", format!("0x{:08x}", word)),
            _ => ("", "", char::from(word as u8).to_string()),
        };

        let len = sign.len() + prefix.len() + body.chars().count();
        let pad = width.map_or(0, |w| w.saturating_sub(len));
        let numeric = !matches!(self.conversion, b'c' | b's');

        if self.left {
            out.push_str(sign);
            out.push_str(prefix);
            out.push_str(&body);
            out.extend(std::iter::repeat(' ').take(pad));
        } else if self.zero && numeric && precision.is_none() {
            out.push_str(sign);
            out.push_str(prefix);
            out.extend(std::iter::repeat('0').take(pad));
            out.push_str(&body);
        } else {
            out.extend(std::iter::repeat(' ').take(pad));
            out.push_str(sign);
            out.push_str(prefix);
            out.push_str(&body);
        }
        true
    }
}

fn clamp_field(count: usize) -> usize {
    count.min(MAX_FIELD_WIDTH)
}

/// Apply integer precision: minimum digit count, and an empty body for a
/// zero value with precision 0.
fn digits(mut body: String, word: u32, precision: Option<usize>) -> String {
    match precision {
        Some(0) if word == 0 => String::new(),
        Some(p) if p > body.len() => {
            body.insert_str(0, &"0".repeat(p - body.len()));
            body
        }
        _ => body,
    }
}
