//! Parses the ordered `(key, value)` query parameters off a [`crate::request::Request`]
//! into a [`super::Query`] (C6).
//!
//! Grounded in `utils/query_param.hpp`'s `getExpandType`/`$expand` prefix
//! parsing and `query_param_test.cpp`'s expectations for malformed input;
//! `$filter`'s grammar is SPEC_FULL.md's addition, parsed by
//! [`super::filter::parse`].

use crate::error::Error;
use crate::request::QueryParam;

use super::{filter, select::SelectTrie, ExpandSpec, ExpandType, Query};

fn format_error(key: &str, value: &str) -> Error {
    Error::QueryParameterValueFormatError {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_expand(key: &str, raw: &str) -> Result<ExpandSpec, Error> {
    let mut chars = raw.chars();
    let expand_type = match chars.next() {
        Some('*') => ExpandType::Both,
        Some('.') => ExpandType::NotLinks,
        Some('~') => ExpandType::LinksOnly,
        _ => return Err(format_error(key, raw)),
    };
    let rest: String = chars.collect();
    let levels = if rest.is_empty() {
        1
    } else {
        let trimmed = rest
            .strip_prefix("($levels=")
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| format_error(key, raw))?;
        trimmed.parse::<u8>().map_err(|_| format_error(key, raw))?
    };
    if !(1..=6).contains(&levels) {
        return Err(Error::QueryParameterOutOfRange {
            key: key.to_string(),
            value: raw.to_string(),
            range: "1..6".to_string(),
        });
    }
    Ok(ExpandSpec { expand_type, levels })
}

fn parse_uint(key: &str, raw: &str, range: (u32, u32)) -> Result<u32, Error> {
    let value: u32 = raw.parse().map_err(|_| format_error(key, raw))?;
    if value < range.0 || value > range.1 {
        return Err(Error::QueryParameterOutOfRange {
            key: key.to_string(),
            value: raw.to_string(),
            range: format!("{}..{}", range.0, range.1),
        });
    }
    Ok(value)
}

/// Parse the full set of query parameters. `expand_enabled` models the
/// build-time feature flag §4.4 describes; pass `false` to have any
/// `$expand` presence produce `QueryNotSupported` regardless of value.
pub fn parse(params: &[QueryParam], expand_enabled: bool) -> Result<Query, Error> {
    let mut query = Query::default();
    let mut select = SelectTrie::new();

    for param in params {
        let key = param.key.as_str();
        match key {
            "only" => {
                if param.value.is_some() {
                    return Err(format_error(key, param.value.as_deref().unwrap_or("")));
                }
                query.is_only = true;
            }
            "$expand" => {
                if !expand_enabled {
                    return Err(Error::QueryNotSupported(key.to_string()));
                }
                let raw = param.value.as_deref().ok_or_else(|| format_error(key, ""))?;
                query.expand = Some(parse_expand(key, raw)?);
            }
            "$select" => {
                let raw = param.value.as_deref().ok_or_else(|| format_error(key, ""))?;
                for path in raw.split(',') {
                    select.insert(path);
                }
            }
            "$filter" => {
                let raw = param.value.as_deref().ok_or_else(|| format_error(key, ""))?;
                let expr = filter::parse(raw).map_err(|_| format_error(key, raw))?;
                query.filter = Some(expr);
            }
            "$top" => {
                let raw = param.value.as_deref().ok_or_else(|| format_error(key, ""))?;
                query.top = Some(parse_uint(key, raw, (1, 1000))?);
            }
            "$skip" => {
                let raw = param.value.as_deref().ok_or_else(|| format_error(key, ""))?;
                query.skip = Some(parse_uint(key, raw, (0, u32::MAX))?);
            }
            other if other.starts_with('$') => {
                return Err(Error::QueryNotSupported(other.to_string()));
            }
            _ => {
                // Vendor extension query key; Redfish permits these silently.
            }
        }
    }

    query.select = select;
    Ok(query)
}
