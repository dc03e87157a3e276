//! Parses a route pattern string (e.g. `/redfish/v1/Chassis/<str>/Sensors/<str>`)
//! into the literal and typed segments `Trie::add` walks.
//!
//! Grounded in `crow`'s `get_parameter_tag`/`black_magic` template tag
//! parsing in `routing.h`, re-expressed as an ordinary string parse since
//! Rust has no equivalent compile-time string-to-type pack mechanism.

use crate::error::RouterError;
use crate::param::ParamType;

/// One `/`-delimited piece of a parsed pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    Literal(String),
    Param(ParamType),
}

/// A pattern split into its segments (trailing slash stripped) plus whether
/// that trailing slash was present. `Router::add` uses the flag to register
/// the slash-stripped form as a redirect target.
#[derive(Debug)]
pub struct ParsedPattern {
    pub segments: Vec<Segment>,
    pub has_trailing_slash: bool,
}

/// Split a pattern into its segments, validating placeholder syntax and
/// that `<path>` (if present) is the final segment.
pub fn parse(pattern: &str) -> Result<ParsedPattern, RouterError> {
    if !pattern.starts_with('/') {
        return Err(RouterError::InvalidPattern(format!(
            "pattern {pattern:?} must start with '/'"
        )));
    }
    let has_trailing_slash = pattern.len() > 1 && pattern.ends_with('/');
    let trimmed = pattern.trim_end_matches('/');
    let mut segments = Vec::new();
    for piece in trimmed.split('/').filter(|p| !p.is_empty()) {
        if let Some(tag) = piece.strip_prefix('<').and_then(|p| p.strip_suffix('>')) {
            let param_type = match tag {
                "int" => ParamType::Int,
                "uint" => ParamType::Uint,
                "float" | "double" => ParamType::Double,
                "str" | "string" => ParamType::Str,
                "path" => ParamType::Path,
                other => {
                    return Err(RouterError::InvalidPattern(format!(
                        "unknown placeholder tag <{other}> in pattern {pattern:?}"
                    )))
                }
            };
            segments.push(Segment::Param(param_type));
        } else {
            segments.push(Segment::Literal(piece.to_string()));
        }
    }
    if let Some(path_pos) = segments
        .iter()
        .position(|s| matches!(s, Segment::Param(ParamType::Path)))
    {
        if path_pos != segments.len() - 1 {
            return Err(RouterError::InvalidPattern(format!(
                "<path> must be the final segment of pattern {pattern:?}"
            )));
        }
    }
    Ok(ParsedPattern {
        segments,
        has_trailing_slash,
    })
}

/// The ordered list of param types a pattern's segments declare, i.e. the
/// arity and typing a handler must accept.
pub fn param_types(segments: &[Segment]) -> Vec<ParamType> {
    segments
        .iter()
        .filter_map(|s| match s {
            Segment::Param(p) => Some(*p),
            Segment::Literal(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_and_typed_segments() {
        let parsed = parse("/redfish/v1/Chassis/<str>/Sensors/<uint>").unwrap();
        assert_eq!(
            parsed.segments,
            vec![
                Segment::Literal("redfish".into()),
                Segment::Literal("v1".into()),
                Segment::Literal("Chassis".into()),
                Segment::Param(ParamType::Str),
                Segment::Literal("Sensors".into()),
                Segment::Param(ParamType::Uint),
            ]
        );
        assert!(!parsed.has_trailing_slash);
    }

    #[test]
    fn rejects_path_placeholder_not_in_final_position() {
        let err = parse("/redfish/v1/<path>/Chassis").unwrap_err();
        assert!(matches!(err, RouterError::InvalidPattern(_)));
    }

    #[test]
    fn rejects_unknown_placeholder() {
        let err = parse("/redfish/v1/<bogus>").unwrap_err();
        assert!(matches!(err, RouterError::InvalidPattern(_)));
    }

    #[test]
    fn trailing_slash_is_reported_and_stripped_from_segments() {
        let parsed = parse("/redfish/v1/Chassis/").unwrap();
        assert_eq!(
            parsed.segments,
            vec![
                Segment::Literal("redfish".into()),
                Segment::Literal("v1".into()),
                Segment::Literal("Chassis".into()),
            ]
        );
        assert!(parsed.has_trailing_slash);
    }

    #[test]
    fn bare_root_is_not_treated_as_trailing_slash() {
        let parsed = parse("/").unwrap();
        assert!(parsed.segments.is_empty());
        assert!(!parsed.has_trailing_slash);
    }
}
