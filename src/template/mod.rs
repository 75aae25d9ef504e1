//! Template safety validation and formatting for URL and label templates.
//!
//! Templates use brace syntax: `{n}`, `{}` (same as `{n}`), `{n:03d}`, with `{{`/`}}` as
//! literal braces. Only the `n` field is ever substituted. Attribute access, indexing,
//! other names, and nested fields are refused when the template is parsed.

mod error;
mod spec;

pub use error::TemplateError;
pub use spec::{FormatSpec, MAX_SPEC_WIDTH};

/// Field names a template may reference. The empty name is the `{}` shorthand.
pub const ALLOWED_FIELDS: &[&str] = &["n", ""];

#[derive(Debug, Clone, PartialEq, Eq)]
struct RawField<'a> {
    name: &'a str,
    conversion: Option<char>,
    spec: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece<'a> {
    Literal(String),
    Field(RawField<'a>),
}

fn syntax(reason: &str) -> TemplateError {
    TemplateError::Syntax {
        reason: reason.to_string(),
    }
}

/// Split a template into literal text and replacement fields.
fn parse_pieces(template: &str) -> Result<Vec<Piece<'_>>, TemplateError> {
    let bytes = template.as_bytes();
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut lit_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                // Doubled brace: keep one.
                literal.push_str(&template[lit_start..=i]);
                i += 2;
                lit_start = i;
            }
            b'}' => return Err(syntax("single '}' encountered in template")),
            b'{' => {
                literal.push_str(&template[lit_start..i]);
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                let (field, next) = parse_field(template, i + 1)?;
                pieces.push(Piece::Field(field));
                i = next;
                lit_start = i;
            }
            _ => i += 1,
        }
    }
    literal.push_str(&template[lit_start..]);
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

/// Parse one field starting right after its `{`. Returns the field and the index after its `}`.
fn parse_field(template: &str, start: usize) -> Result<(RawField<'_>, usize), TemplateError> {
    let bytes = template.as_bytes();
    let mut depth = 1usize;
    let mut end = None;
    for (j, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(j);
                    break;
                }
            }
            _ => {}
        }
    }
    let end = end.ok_or_else(|| syntax("expected '}' before end of string"))?;
    let body = &template[start..end];

    let name_end = body.find([':', '!']).unwrap_or(body.len());
    let name = &body[..name_end];
    let rest = &body[name_end..];

    let (conversion, spec) = match rest.strip_prefix('!') {
        Some(after) => {
            let mut chars = after.chars();
            let c = chars
                .next()
                .ok_or_else(|| syntax("end of string while looking for conversion specifier"))?;
            let tail = chars.as_str();
            let spec = if tail.is_empty() {
                ""
            } else {
                tail.strip_prefix(':')
                    .ok_or_else(|| syntax("expected ':' after conversion specifier"))?
            };
            (Some(c), spec)
        }
        None => (None, rest.strip_prefix(':').unwrap_or(rest)),
    };

    Ok((
        RawField {
            name,
            conversion,
            spec,
        },
        end + 1,
    ))
}

fn check_field(field: &RawField<'_>, allowed: &[&str]) -> Result<(), TemplateError> {
    if !allowed.contains(&field.name) || field.name.contains(['.', '[', ']']) {
        return Err(TemplateError::ForbiddenField {
            field: field.name.to_string(),
        });
    }
    if field.spec.contains(['{', '}']) {
        return Err(TemplateError::NestedField {
            spec: field.spec.to_string(),
        });
    }
    Ok(())
}

/// Check every replacement field against an allow-list of field names.
pub fn validate_template_fields(template: &str, allowed: &[&str]) -> Result<(), TemplateError> {
    for piece in parse_pieces(template)? {
        if let Piece::Field(field) = piece {
            check_field(&field, allowed)?;
        }
    }
    Ok(())
}

/// Succeeds iff the template only references `n` or the empty field.
pub fn validate_template(template: &str) -> Result<(), TemplateError> {
    validate_template_fields(template, ALLOWED_FIELDS)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Value(Option<FormatSpec>),
    /// `!r`/`!a`: the plain value as a quoted string literal, e.g. `'09'`.
    Quoted,
}

/// A validated, compiled template. Rendering cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
    has_spec: bool,
}

impl Template {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut has_spec = false;
        for piece in parse_pieces(template)? {
            match piece {
                Piece::Literal(text) => segments.push(Segment::Literal(text)),
                Piece::Field(field) => {
                    check_field(&field, ALLOWED_FIELDS)?;
                    if let Some(c) = field.conversion {
                        if !matches!(c, 'r' | 's' | 'a') {
                            return Err(syntax(&format!("unknown conversion specifier '{}'", c)));
                        }
                    }
                    if field.spec.is_empty() {
                        segments.push(match field.conversion {
                            Some('r' | 'a') => Segment::Quoted,
                            _ => Segment::Value(None),
                        });
                        continue;
                    }
                    if field.conversion.is_some() {
                        return Err(TemplateError::InvalidSpec {
                            spec: field.spec.to_string(),
                            reason: "format spec after a conversion is not supported".to_string(),
                        });
                    }
                    has_spec = true;
                    segments.push(Segment::Value(Some(FormatSpec::parse(field.spec)?)));
                }
            }
        }
        Ok(Template { segments, has_spec })
    }

    /// True when at least one field carries its own format spec.
    pub fn has_spec(&self) -> bool {
        self.has_spec
    }

    /// Substitute `n`. `pad` zero-pads bare fields, and only when no field has a spec.
    pub fn render(&self, n: i64, pad: usize) -> String {
        let plain = if self.has_spec || pad == 0 {
            n.to_string()
        } else {
            format!("{:0width$}", n, width = pad)
        };
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Value(Some(spec)) => out.push_str(&spec.format_int(n)),
                Segment::Value(None) => out.push_str(&plain),
                Segment::Quoted => {
                    out.push('\'');
                    out.push_str(&plain);
                    out.push('\'');
                }
            }
        }
        out
    }
}

/// Validate and render a template in one step.
pub fn safe_format(template: &str, n: i64, pad: usize) -> Result<String, TemplateError> {
    Ok(Template::parse(template)?.render(n, pad))
}

/// RFC 3986 scheme followed by `:`. Braces count as letters; `host:8080` is not a scheme.
fn has_scheme(s: &str) -> bool {
    let Some(colon) = s.find(':') else {
        return false;
    };
    let mut chars = s[..colon]
        .chars()
        .map(|c| if c == '{' || c == '}' { 'X' } else { c });
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !s[colon + 1..].starts_with(|c: char| c.is_ascii_digit())
}

/// Prefix `http://` when the template carries no scheme.
pub fn ensure_scheme(url_template: &str) -> String {
    if has_scheme(url_template) {
        url_template.to_string()
    } else {
        format!("http://{}", url_template)
    }
}

/// A compiled URL template: scheme ensured, then validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(Template);

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        Template::parse(&ensure_scheme(template.trim())).map(UrlTemplate)
    }

    pub fn render(&self, n: i64, pad: usize) -> String {
        let rendered = self.0.render(n, pad);
        let url = rendered.trim();
        if has_scheme(url) {
            url.to_string()
        } else {
            format!("http://{}", url)
        }
    }
}

/// Build an absolute URL for sequence number `n`.
pub fn build_url(template: &str, n: i64, pad: usize) -> Result<String, TemplateError> {
    Ok(UrlTemplate::parse(template)?.render(n, pad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_format_padding_and_spec() {
        assert_eq!(safe_format("{n:03d}", 5, 0).unwrap(), "005");
        assert_eq!(safe_format("{n}", 5, 3).unwrap(), "005");
        assert_eq!(safe_format("Cap {n}", 12, 0).unwrap(), "Cap 12");
    }

    #[test]
    fn safe_format_empty_field_is_n() {
        assert_eq!(safe_format("page-{}", 4, 0).unwrap(), "page-4");
        assert_eq!(safe_format("page-{}", 4, 2).unwrap(), "page-04");
        assert_eq!(safe_format("{:02d}", 4, 0).unwrap(), "04");
    }

    #[test]
    fn spec_disables_pad_for_every_field() {
        assert_eq!(safe_format("{n:02d}/{n}", 7, 4).unwrap(), "07/7");
    }

    #[test]
    fn pad_is_sign_aware_and_never_truncates() {
        assert_eq!(safe_format("{n}", -5, 3).unwrap(), "-05");
        assert_eq!(safe_format("{n}", 12345, 3).unwrap(), "12345");
    }

    #[test]
    fn doubled_braces_are_literal() {
        assert_eq!(safe_format("{{n}} {n}", 1, 0).unwrap(), "{n} 1");
        assert_eq!(safe_format("}}{{", 1, 0).unwrap(), "}{");
    }

    #[test]
    fn str_conversion_renders_plainly() {
        assert_eq!(safe_format("{n!s}", 9, 0).unwrap(), "9");
        assert_eq!(safe_format("{n!s}", 9, 2).unwrap(), "09");
    }

    #[test]
    fn repr_and_ascii_conversions_quote_the_value() {
        assert_eq!(safe_format("{n!r}", 9, 0).unwrap(), "'9'");
        assert_eq!(safe_format("{n!r}", 9, 2).unwrap(), "'09'");
        assert_eq!(safe_format("c/{!a}", -3, 0).unwrap(), "c/'-3'");
    }

    #[test]
    fn validate_accepts_n_and_empty_fields() {
        for ok in ["{n}", "{}", "{n:03d}", "x/{n}/{}", "no fields", "{n!s}", ""] {
            assert!(validate_template(ok).is_ok(), "expected '{}' to validate", ok);
        }
    }

    #[test]
    fn validate_rejects_attribute_and_index_access() {
        for bad in ["{n.__class__}", "{n[0]}", "{n.real}", "{0}", "{x}", "{n}{name}", "{__import__}"] {
            assert!(
                matches!(
                    validate_template(bad),
                    Err(TemplateError::ForbiddenField { .. })
                ),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn validate_rejects_nested_fields() {
        assert!(matches!(
            validate_template("{n:{width}}"),
            Err(TemplateError::NestedField { .. })
        ));
    }

    #[test]
    fn validate_rejects_broken_braces() {
        assert!(matches!(
            validate_template("a}b"),
            Err(TemplateError::Syntax { .. })
        ));
        assert!(matches!(
            validate_template("a{n"),
            Err(TemplateError::Syntax { .. })
        ));
        assert!(matches!(
            validate_template("{n!}"),
            Err(TemplateError::Syntax { .. })
        ));
    }

    #[test]
    fn validate_with_custom_allow_list() {
        assert!(validate_template_fields("{n}-{page}", &["n", "page"]).is_ok());
        assert!(validate_template_fields("{n}", &["page"]).is_err());
        assert!(validate_template_fields("{page.x}", &["page.x"]).is_err());
    }

    #[test]
    fn parse_rejects_bad_conversion_and_spec() {
        assert!(Template::parse("{n!q}").is_err());
        assert!(Template::parse("{n!s:03d}").is_err());
        assert!(matches!(
            Template::parse("{n:q}"),
            Err(TemplateError::InvalidSpec { .. })
        ));
    }

    #[test]
    fn ensure_scheme_adds_http_when_missing() {
        assert_eq!(ensure_scheme("example.com/{n}"), "http://example.com/{n}");
        assert_eq!(ensure_scheme("https://example.com/{n}"), "https://example.com/{n}");
        assert_eq!(ensure_scheme("localhost:8080/{n}"), "http://localhost:8080/{n}");
        assert_eq!(ensure_scheme("{n:03d}.example.com"), "http://{n:03d}.example.com");
        assert_eq!(ensure_scheme("ftp://host/{n}"), "ftp://host/{n}");
    }

    #[test]
    fn build_url_auto_scheme() {
        let u = build_url("example.com/page/{n}", 2, 2).unwrap();
        assert!(u.starts_with("http://"));
        assert!(u.contains("02"));
        assert_eq!(u, "http://example.com/page/02");
    }

    #[test]
    fn build_url_trims_whitespace() {
        assert_eq!(
            build_url("  https://x.io/{n}  ", 1, 0).unwrap(),
            "https://x.io/1"
        );
    }

    #[test]
    fn build_url_rejects_unsafe_template() {
        assert!(matches!(
            build_url("http://x/{n.__class__}", 1, 0),
            Err(TemplateError::ForbiddenField { .. })
        ));
    }
}
