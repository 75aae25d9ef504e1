//! Integer format specs: `[[fill]align][sign][#][0][width][grouping][.precision][type]`.
//!
//! Parsing happens once per template; [`FormatSpec::format_int`] never fails.

use super::TemplateError;

/// Upper bound for width and precision. Keeps a single field from producing megabytes.
pub const MAX_SPEC_WIDTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
    /// Padding goes between sign/prefix and digits (`=`).
    AfterSign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sign {
    Minus,
    Plus,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presentation {
    Decimal,
    Binary,
    Octal,
    LowerHex,
    UpperHex,
    Char,
    Fixed,
    Percent,
}

/// A compiled format spec for the `n` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    fill: char,
    align: Align,
    sign: Sign,
    alternate: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    presentation: Presentation,
}

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        '=' => Some(Align::AfterSign),
        _ => None,
    }
}

fn read_number(chars: &[char], i: &mut usize) -> Option<usize> {
    let start = *i;
    while chars.get(*i).is_some_and(|c| c.is_ascii_digit()) {
        *i += 1;
    }
    if *i == start {
        return None;
    }
    // Saturate; anything past the cap is rejected by the caller anyway.
    let digits: String = chars[start..*i].iter().collect();
    Some(digits.parse().unwrap_or(usize::MAX))
}

impl FormatSpec {
    pub fn parse(spec: &str) -> Result<Self, TemplateError> {
        let invalid = |reason: String| TemplateError::InvalidSpec {
            spec: spec.to_string(),
            reason,
        };
        let chars: Vec<char> = spec.chars().collect();
        let mut i = 0;

        let mut fill = ' ';
        let mut fill_given = false;
        let mut align = None;
        if let Some(a) = chars.get(1).and_then(|&c| align_of(c)) {
            fill = chars[0];
            fill_given = true;
            align = Some(a);
            i = 2;
        } else if let Some(a) = chars.first().and_then(|&c| align_of(c)) {
            align = Some(a);
            i = 1;
        }

        let mut sign = Sign::Minus;
        let mut sign_given = true;
        match chars.get(i) {
            Some('+') => sign = Sign::Plus,
            Some('-') => {}
            Some(' ') => sign = Sign::Space,
            _ => sign_given = false,
        }
        if sign_given {
            i += 1;
        }

        if chars.get(i) == Some(&'z') {
            return Err(invalid(
                "negative zero coercion (z) is not allowed for integers".to_string(),
            ));
        }

        let alternate = chars.get(i) == Some(&'#');
        if alternate {
            i += 1;
        }

        if chars.get(i) == Some(&'0') {
            if !fill_given {
                fill = '0';
                if align.is_none() {
                    align = Some(Align::AfterSign);
                }
            }
            i += 1;
        }

        let width = read_number(&chars, &mut i).unwrap_or(0);
        if width > MAX_SPEC_WIDTH {
            return Err(invalid(format!("width exceeds {}", MAX_SPEC_WIDTH)));
        }

        let grouping = match chars.get(i) {
            Some(&c @ (',' | '_')) => {
                i += 1;
                Some(c)
            }
            _ => None,
        };

        let mut precision = None;
        if chars.get(i) == Some(&'.') {
            i += 1;
            let p = read_number(&chars, &mut i)
                .ok_or_else(|| invalid("format specifier missing precision".to_string()))?;
            if p > MAX_SPEC_WIDTH {
                return Err(invalid(format!("precision exceeds {}", MAX_SPEC_WIDTH)));
            }
            precision = Some(p);
        }

        let type_char = match &chars[i..] {
            [] => None,
            [c] => Some(*c),
            _ => return Err(invalid("invalid format specifier".to_string())),
        };

        let presentation = match type_char {
            None | Some('d') | Some('n') => Presentation::Decimal,
            Some('b') => Presentation::Binary,
            Some('o') => Presentation::Octal,
            Some('x') => Presentation::LowerHex,
            Some('X') => Presentation::UpperHex,
            Some('c') => Presentation::Char,
            Some('f') | Some('F') => Presentation::Fixed,
            Some('%') => Presentation::Percent,
            Some(c @ ('e' | 'E' | 'g' | 'G')) => {
                return Err(invalid(format!("presentation type '{}' is not supported", c)))
            }
            Some(c) => {
                return Err(invalid(format!(
                    "unknown format code '{}' for integer",
                    c
                )))
            }
        };

        let float_like = matches!(presentation, Presentation::Fixed | Presentation::Percent);
        if precision.is_some() && !float_like {
            return Err(invalid(
                "precision not allowed in integer format specifier".to_string(),
            ));
        }
        if let Some(sep) = grouping {
            let ty = type_char.unwrap_or('d');
            let rejected = match sep {
                ',' => matches!(ty, 'b' | 'o' | 'x' | 'X' | 'n' | 'c'),
                _ => matches!(ty, 'n' | 'c'),
            };
            if rejected {
                return Err(invalid(format!("cannot specify '{}' with '{}'", sep, ty)));
            }
        }
        if presentation == Presentation::Char {
            if sign_given {
                return Err(invalid(
                    "sign not allowed with integer format specifier 'c'".to_string(),
                ));
            }
            if alternate {
                return Err(invalid(
                    "alternate form (#) not allowed with integer format specifier 'c'".to_string(),
                ));
            }
        }

        Ok(FormatSpec {
            fill,
            align: align.unwrap_or(Align::Right),
            sign,
            alternate,
            width,
            grouping,
            precision,
            presentation,
        })
    }

    /// Render `n` according to this spec.
    pub fn format_int(&self, n: i64) -> String {
        let magnitude = n.unsigned_abs();
        if self.presentation == Presentation::Char {
            // Out-of-range code points render as U+FFFD instead of failing mid-stream.
            let c = u32::try_from(n)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            return self.pad(String::new(), c.to_string());
        }

        let mut prefix = String::new();
        if n < 0 {
            prefix.push('-');
        } else {
            match self.sign {
                Sign::Plus => prefix.push('+'),
                Sign::Space => prefix.push(' '),
                Sign::Minus => {}
            }
        }
        if self.alternate {
            prefix.push_str(match self.presentation {
                Presentation::Binary => "0b",
                Presentation::Octal => "0o",
                Presentation::LowerHex => "0x",
                Presentation::UpperHex => "0X",
                _ => "",
            });
        }
        let reserved = prefix.chars().count();

        let body = match self.presentation {
            Presentation::Binary => self.group(&format!("{:b}", magnitude), 4, reserved),
            Presentation::Octal => self.group(&format!("{:o}", magnitude), 4, reserved),
            Presentation::LowerHex => self.group(&format!("{:x}", magnitude), 4, reserved),
            Presentation::UpperHex => self.group(&format!("{:X}", magnitude), 4, reserved),
            Presentation::Fixed => self.fixed(magnitude as f64, reserved, ""),
            Presentation::Percent => self.fixed(magnitude as f64 * 100.0, reserved, "%"),
            Presentation::Decimal | Presentation::Char => {
                self.group(&magnitude.to_string(), 3, reserved)
            }
        };
        self.pad(prefix, body)
    }

    /// Fixed-point digits plus `suffix`. `#` keeps the point even at precision 0.
    fn fixed(&self, value: f64, reserved: usize, suffix: &str) -> String {
        let s = format!("{:.*}", self.precision.unwrap_or(6), value);
        let (int_part, frac) = match s.split_once('.') {
            Some((int_part, frac)) => (int_part, Some(frac)),
            None => (s.as_str(), None),
        };
        let tail = match frac {
            Some(frac) => format!(".{}{}", frac, suffix),
            None if self.alternate => format!(".{}", suffix),
            None => suffix.to_string(),
        };
        let int_part = self.group(int_part, 3, reserved + tail.chars().count());
        int_part + &tail
    }

    /// Insert the grouping separator every `every` digits. With zero fill and `=` alignment
    /// the leading zeros are grouped too, filling the width left after `reserved` chars.
    fn group(&self, digits: &str, every: usize, reserved: usize) -> String {
        let Some(sep) = self.grouping else {
            return digits.to_string();
        };
        let target = if self.fill == '0' && self.align == Align::AfterSign {
            self.width.saturating_sub(reserved)
        } else {
            0
        };
        let mut len = digits.len();
        while len + (len - 1) / every < target {
            len += 1;
        }
        let mut out = String::with_capacity(len + len / every);
        let padded = std::iter::repeat('0').take(len - digits.len()).chain(digits.chars());
        for (idx, c) in padded.enumerate() {
            if idx > 0 && (len - idx) % every == 0 {
                out.push(sep);
            }
            out.push(c);
        }
        out
    }

    fn pad(&self, prefix: String, body: String) -> String {
        let used = prefix.chars().count() + body.chars().count();
        if self.width <= used {
            return prefix + &body;
        }
        let missing = self.width - used;
        let fill = |count: usize| std::iter::repeat(self.fill).take(count).collect::<String>();
        match self.align {
            Align::Left => prefix + &body + &fill(missing),
            Align::Right => fill(missing) + &prefix + &body,
            Align::Center => {
                let left = missing / 2;
                fill(left) + &prefix + &body + &fill(missing - left)
            }
            Align::AfterSign => prefix + &fill(missing) + &body,
        }
    }
}
