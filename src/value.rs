//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Leaf value checking.
//!
//! Values are stored in their canonical lexical form. Every value entering a
//! tree (parsed, created through a path or used as a schema default) is
//! validated against its leaf type and canonicalized here.

use num_traits::{Bounded, NumCast, ToPrimitive};
use regex::Regex;

use crate::compile::identity_derived_from;
use crate::context::Context;
use crate::schema::{DataValue, DataValueType, LeafType};
use crate::utils::split_prefix;

/// Leafref chains longer than this are considered circular.
const MAX_LEAFREF_CHAIN: usize = 32;

/// Resolves the prefix of an identityref or instance-identifier value to a
/// module of the context. What the prefix means depends on the encoding: an
/// XML namespace prefix, a JSON module name or a schema import prefix.
pub(crate) type PrefixResolver<'r> = &'r dyn Fn(Option<&str>) -> Option<usize>;

/// Validate a value against a leaf type, returning its canonical form.
pub(crate) fn canonicalize(
    ctx: &Context,
    ltype: &LeafType,
    raw: &str,
    resolve: PrefixResolver<'_>,
) -> Result<String, String> {
    use DataValueType as T;

    match ltype.base {
        T::Int8 | T::Int16 | T::Int32 | T::Int64 | T::Uint8 | T::Uint16
        | T::Uint32 | T::Uint64 => {
            let value = parse_number(ltype, raw).ok_or_else(|| {
                format!("Invalid {} value \"{}\"", type_name(ltype.base), raw)
            })?;
            check_range(ltype, value, raw)?;
            Ok(value.to_string())
        }
        T::Dec64 => {
            let value = parse_number(ltype, raw).ok_or_else(|| {
                format!(
                    "Invalid decimal64 value \"{}\" ({} fraction digits)",
                    raw, ltype.fraction_digits
                )
            })?;
            check_range(ltype, value, raw)?;
            Ok(format_decimal(value, ltype.fraction_digits))
        }
        T::String => {
            check_length(ltype, raw.chars().count() as u64, raw)?;
            for (regex, invert) in &ltype.patterns {
                if regex.is_match(raw) == *invert {
                    return Err(format!(
                        "Value \"{}\" does not satisfy the pattern \"{}\"",
                        raw,
                        regex.as_str()
                    ));
                }
            }
            Ok(raw.to_owned())
        }
        T::Bool => match raw.trim() {
            "true" => Ok("true".to_owned()),
            "false" => Ok("false".to_owned()),
            _ => Err(format!("Invalid boolean value \"{}\"", raw)),
        },
        T::Empty => match raw.trim() {
            "" => Ok(String::new()),
            _ => Err(format!("Invalid empty value \"{}\"", raw)),
        },
        T::Enum => {
            let raw = raw.trim();
            match ltype.enums.iter().any(|(name, _)| name == raw) {
                true => Ok(raw.to_owned()),
                false => Err(format!("Invalid enumeration value \"{}\"", raw)),
            }
        }
        T::Bits => {
            let mut positions = vec![];
            for bit in raw.split_whitespace() {
                let position = ltype
                    .bits
                    .iter()
                    .find(|(name, _)| name == bit)
                    .map(|(_, position)| *position)
                    .ok_or_else(|| format!("Invalid bit \"{}\"", bit))?;
                if positions.contains(&(position, bit)) {
                    return Err(format!("Duplicate bit \"{}\"", bit));
                }
                positions.push((position, bit));
            }
            positions.sort();
            Ok(positions
                .into_iter()
                .map(|(_, bit)| bit)
                .collect::<Vec<_>>()
                .join(" "))
        }
        T::Binary => {
            let value = raw
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>();
            let decoded = base64_len(&value)
                .ok_or_else(|| format!("Invalid base64 value \"{}\"", raw))?;
            check_length(ltype, decoded, raw)?;
            Ok(value)
        }
        T::IdentityRef => {
            let raw = raw.trim();
            let (prefix, name) = split_prefix(raw);
            let module = resolve(prefix).ok_or_else(|| {
                format!("Prefix of identityref value \"{}\" not found", raw)
            })?;
            let id = ctx
                .identities
                .iter()
                .position(|identity| {
                    identity.module == module && identity.name == name
                })
                .ok_or_else(|| format!("Identity \"{}\" not found", raw))?;
            if let Some(base) = ltype
                .bases
                .iter()
                .find(|base| !identity_derived_from(ctx, id, **base))
            {
                return Err(format!(
                    "Identity \"{}\" not derived from the base \"{}\"",
                    raw, ctx.identities[*base].name
                ));
            }
            Ok(format!("{}:{}", ctx.modules[module].name, name))
        }
        T::InstanceId => canonical_instance_id(ctx, raw.trim(), resolve),
        T::LeafRef => match leafref_target_type(ctx, ltype) {
            Some(target) => canonicalize(ctx, target, raw, resolve),
            // Unresolved target (non-implemented module): kept as is.
            None => Ok(raw.to_owned()),
        },
        T::Union => {
            for member in &ltype.union_types {
                if let Ok(value) = canonicalize(ctx, member, raw, resolve) {
                    return Ok(value);
                }
            }
            Err(format!("Invalid union value \"{}\"", raw))
        }
        T::Unknown => Ok(raw.to_owned()),
    }
}

/// Typed representation of a canonical value.
pub(crate) fn typed_value(
    ctx: &Context,
    ltype: &LeafType,
    canonical: &str,
) -> DataValue {
    use DataValueType as T;

    let int = || canonical.parse::<i128>().ok();
    let value = match ltype.base {
        T::Uint8 => int().and_then(cast).map(DataValue::Uint8),
        T::Uint16 => int().and_then(cast).map(DataValue::Uint16),
        T::Uint32 => int().and_then(cast).map(DataValue::Uint32),
        T::Uint64 => int().and_then(cast).map(DataValue::Uint64),
        T::Int8 => int().and_then(cast).map(DataValue::Int8),
        T::Int16 => int().and_then(cast).map(DataValue::Int16),
        T::Int32 => int().and_then(cast).map(DataValue::Int32),
        T::Int64 => int().and_then(cast).map(DataValue::Int64),
        T::Bool => Some(DataValue::Bool(canonical == "true")),
        T::Empty => Some(DataValue::Empty),
        T::LeafRef => leafref_target_type(ctx, ltype)
            .map(|target| typed_value(ctx, target, canonical)),
        T::Union => {
            // Canonical identityref values are qualified by module names.
            let resolve = |prefix: Option<&str>| {
                prefix.and_then(|name| ctx.module_id(name))
            };
            ltype
                .union_types
                .iter()
                .find(|member| {
                    canonicalize(ctx, member, canonical, &resolve).as_deref()
                        == Ok(canonical)
                })
                .map(|member| typed_value(ctx, member, canonical))
        }
        _ => None,
    };
    value.unwrap_or_else(|| DataValue::Other(canonical.to_owned()))
}

/// Follow a chain of leafrefs to the first non-leafref type.
pub(crate) fn leafref_real_type<'a>(
    ctx: &'a Context,
    ltype: &'a LeafType,
) -> Option<&'a LeafType> {
    let mut current = ltype;
    for _ in 0..MAX_LEAFREF_CHAIN {
        if current.base != DataValueType::LeafRef {
            return Some(current);
        }
        current = leafref_target_type(ctx, current)?;
    }
    None
}

fn leafref_target_type<'a>(
    ctx: &'a Context,
    ltype: &LeafType,
) -> Option<&'a LeafType> {
    let target = ltype.leafref_target?;
    ctx.nodes[target].leaf_type.as_ref()
}

fn cast<T: NumCast>(value: i128) -> Option<T> {
    T::from(value)
}

fn bounds<T: Bounded + ToPrimitive>() -> (i128, i128) {
    (
        T::min_value().to_i128().unwrap_or(i128::MIN),
        T::max_value().to_i128().unwrap_or(i128::MAX),
    )
}

/// Value space of a numeric type (scaled by the fraction digits for
/// decimal64).
pub(crate) fn type_bounds(ltype: &LeafType) -> Option<(i128, i128)> {
    use DataValueType as T;

    let bounds = match ltype.base {
        T::Int8 => bounds::<i8>(),
        T::Int16 => bounds::<i16>(),
        T::Int32 => bounds::<i32>(),
        T::Int64 | T::Dec64 => bounds::<i64>(),
        T::Uint8 => bounds::<u8>(),
        T::Uint16 => bounds::<u16>(),
        T::Uint32 => bounds::<u32>(),
        T::Uint64 => bounds::<u64>(),
        _ => return None,
    };
    Some(bounds)
}

/// Parse a numeric value of the given type. Decimal64 values are returned
/// scaled by the fraction digits.
pub(crate) fn parse_number(ltype: &LeafType, raw: &str) -> Option<i128> {
    let raw = raw.trim();
    let (negative, digits) = match raw.as_bytes().first()? {
        b'-' => (true, &raw[1..]),
        b'+' => (false, &raw[1..]),
        _ => (false, raw),
    };

    let (int, frac) = match ltype.base {
        DataValueType::Dec64 => digits.split_once('.').unwrap_or((digits, "")),
        _ => (digits, ""),
    };
    if int.is_empty()
        || !int.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
        || (digits.contains('.') && frac.is_empty())
    {
        return None;
    }

    let scale = match ltype.base {
        DataValueType::Dec64 => ltype.fraction_digits as usize,
        _ => 0,
    };
    if frac.len() > scale {
        return None;
    }
    let padded = format!("{}{}{}", int, frac, "0".repeat(scale - frac.len()));
    // Longer than any 64-bit value: reject before parsing.
    if padded.trim_start_matches('0').len() > 20 {
        return None;
    }
    let value = padded.parse::<i128>().ok()?;
    let value = if negative { -value } else { value };

    let (min, max) = type_bounds(ltype)?;
    (min..=max).contains(&value).then_some(value)
}

fn format_decimal(value: i128, fraction_digits: u8) -> String {
    let scale = 10i128.pow(fraction_digits as u32);
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.abs();
    let frac = format!(
        "{:0width$}",
        abs % scale,
        width = fraction_digits as usize
    );
    let frac = match frac.trim_end_matches('0') {
        "" => "0",
        frac => frac,
    };
    format!("{}{}.{}", sign, abs / scale, frac)
}

fn check_range(
    ltype: &LeafType,
    value: i128,
    raw: &str,
) -> Result<(), String> {
    match &ltype.ranges {
        Some(ranges)
            if !ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&value)) =>
        {
            Err(format!(
                "Value \"{}\" does not satisfy the range constraint",
                raw.trim()
            ))
        }
        _ => Ok(()),
    }
}

fn check_length(
    ltype: &LeafType,
    length: u64,
    raw: &str,
) -> Result<(), String> {
    match &ltype.lengths {
        Some(lengths)
            if !lengths.iter().any(|(lo, hi)| (*lo..=*hi).contains(&length)) =>
        {
            Err(format!(
                "Value \"{}\" does not satisfy the length constraint",
                raw
            ))
        }
        _ => Ok(()),
    }
}

/// Decoded length of a base64 value, `None` when the value isn't valid
/// base64.
fn base64_len(value: &str) -> Option<u64> {
    if value.len() % 4 != 0 {
        return None;
    }
    let data = value.trim_end_matches('=');
    let padding = value.len() - data.len();
    if padding > 2
        || !data
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
    {
        return None;
    }
    Some((value.len() / 4 * 3 - padding) as u64)
}

/// Replace the prefixes of an instance-identifier by module names.
fn canonical_instance_id(
    ctx: &Context,
    raw: &str,
    resolve: PrefixResolver<'_>,
) -> Result<String, String> {
    if !raw.starts_with('/') {
        return Err(format!("Invalid instance-identifier \"{}\"", raw));
    }

    let mut result = String::new();
    let mut token = String::new();
    let mut quote = None;
    for c in raw.chars() {
        match quote {
            Some(q) => {
                result.push(c);
                if c == q {
                    quote = None;
                }
                continue;
            }
            None if c == '\'' || c == '"' => {
                result.push_str(&token);
                token.clear();
                result.push(c);
                quote = Some(c);
                continue;
            }
            None => {}
        }

        if c == ':' && !token.is_empty() {
            let module = resolve(Some(&token)).ok_or_else(|| {
                format!("Prefix \"{}\" of instance-identifier not found", token)
            })?;
            result.push_str(&ctx.modules[module].name);
            result.push(':');
            token.clear();
        } else if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
            token.push(c);
        } else {
            result.push_str(&token);
            token.clear();
            result.push(c);
        }
    }
    if quote.is_some() {
        return Err(format!("Unterminated literal in \"{}\"", raw));
    }
    result.push_str(&token);
    Ok(result)
}

/// Translate an XML Schema regular expression into an anchored Rust regex.
pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let mut regex = String::from("^(?:");
    let mut in_class = false;
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                // XML name characters.
                Some('i') if in_class => regex.push_str(r"\p{L}_:"),
                Some('i') => regex.push_str(r"[\p{L}_:]"),
                Some('I') => regex.push_str(r"[^\p{L}_:]"),
                Some('c') if in_class => regex.push_str(r"\p{L}\p{N}._:\-"),
                Some('c') => regex.push_str(r"[\p{L}\p{N}._:\-]"),
                Some('C') => regex.push_str(r"[^\p{L}\p{N}._:\-]"),
                Some(escaped) => {
                    regex.push('\\');
                    regex.push(escaped);
                }
                None => regex.push_str(r"\\"),
            },
            '[' if !in_class => {
                in_class = true;
                regex.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    regex.push('^');
                }
            }
            ']' if in_class => {
                in_class = false;
                regex.push(']');
            }
            '[' | '&' | '~' if in_class => {
                regex.push('\\');
                regex.push(c);
            }
            '^' | '$' if !in_class => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }
    regex.push_str(")$");
    Regex::new(&regex)
}

fn type_name(base: DataValueType) -> &'static str {
    match base {
        DataValueType::Int8 => "int8",
        DataValueType::Int16 => "int16",
        DataValueType::Int32 => "int32",
        DataValueType::Int64 => "int64",
        DataValueType::Uint8 => "uint8",
        DataValueType::Uint16 => "uint16",
        DataValueType::Uint32 => "uint32",
        DataValueType::Uint64 => "uint64",
        _ => "numeric",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, ContextFlags};

    fn ltype(base: DataValueType) -> LeafType {
        LeafType::new(base)
    }

    fn check(ltype: &LeafType, raw: &str) -> Result<String, String> {
        let ctx = Context::new(ContextFlags::empty()).unwrap();
        canonicalize(&ctx, ltype, raw, &|_| None)
    }

    #[test]
    fn integers() {
        let uint8 = ltype(DataValueType::Uint8);
        assert_eq!(check(&uint8, " +007 "), Ok("7".to_owned()));
        assert!(check(&uint8, "256").is_err());
        assert!(check(&uint8, "-1").is_err());
        assert!(check(&uint8, "0x10").is_err());

        let mut int32 = ltype(DataValueType::Int32);
        int32.ranges = Some(vec![(-10, 10), (100, 100)]);
        assert_eq!(check(&int32, "-10"), Ok("-10".to_owned()));
        assert_eq!(check(&int32, "100"), Ok("100".to_owned()));
        assert!(check(&int32, "11").is_err());
    }

    #[test]
    fn decimals() {
        let mut dec = ltype(DataValueType::Dec64);
        dec.fraction_digits = 2;
        assert_eq!(check(&dec, "1.50"), Ok("1.5".to_owned()));
        assert_eq!(check(&dec, "3"), Ok("3.0".to_owned()));
        assert_eq!(check(&dec, "-0.05"), Ok("-0.05".to_owned()));
        assert_eq!(check(&dec, "-0"), Ok("0.0".to_owned()));
        assert!(check(&dec, "1.234").is_err());
        assert!(check(&dec, "1.").is_err());
    }

    #[test]
    fn strings() {
        let mut string = ltype(DataValueType::String);
        string.lengths = Some(vec![(1, 3)]);
        string.patterns.push((compile_pattern("[a-z]+").unwrap(), false));
        assert_eq!(check(&string, "abc"), Ok("abc".to_owned()));
        assert!(check(&string, "abcd").is_err());
        assert!(check(&string, "").is_err());
        assert!(check(&string, "aB").is_err());
    }

    #[test]
    fn bits_and_enums() {
        let mut bits = ltype(DataValueType::Bits);
        bits.bits = vec![("a".to_owned(), 0), ("b".to_owned(), 1)];
        assert_eq!(check(&bits, "b  a"), Ok("a b".to_owned()));
        assert!(check(&bits, "a a").is_err());
        assert!(check(&bits, "c").is_err());

        let mut enumeration = ltype(DataValueType::Enum);
        enumeration.enums = vec![("up".to_owned(), 1)];
        assert_eq!(check(&enumeration, "up"), Ok("up".to_owned()));
        assert!(check(&enumeration, "down").is_err());
    }

    #[test]
    fn binary() {
        let mut binary = ltype(DataValueType::Binary);
        assert_eq!(check(&binary, "aGVs\nbG8="), Ok("aGVsbG8=".to_owned()));
        assert!(check(&binary, "aGVsbG8").is_err());
        binary.lengths = Some(vec![(0, 4)]);
        assert!(check(&binary, "aGVsbG8=").is_err());
    }

    #[test]
    fn patterns() {
        let regex = compile_pattern(r"\d{1,3}(\.\d{1,3}){3}").unwrap();
        assert!(regex.is_match("10.0.0.1"));
        assert!(!regex.is_match("10.0.0.1x"));

        let regex = compile_pattern(r"[^$]*\$").unwrap();
        assert!(regex.is_match("a$"));
        assert!(!regex.is_match("a"));

        let regex = compile_pattern(r"\i\c*").unwrap();
        assert!(regex.is_match("eth-0"));
        assert!(!regex.is_match("0eth"));
    }
}
