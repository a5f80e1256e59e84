// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Name canonicalization helpers.
//!
//! Pure string utilities shared by every other module:
//! - FQDN dot termination and root dot prefixing
//! - LDH label sanitization (letters, digits, hyphen)
//! - Decoding of provider-escaped `\DDD` octal sequences in record names
//! - Reduction of load balancer DNS names to their short prefix
//! - Qualification of relative names under a root domain

use crate::constants::{MAX_LABEL_LEN, SRV_PREFIX};

/// Terminate a name with a dot if it is not already.
///
/// # Examples
///
/// ```
/// use zonesync::names::dot_terminate;
///
/// assert_eq!(dot_terminate("example.com"), "example.com.");
/// assert_eq!(dot_terminate("example.com."), "example.com.");
/// ```
#[must_use]
pub fn dot_terminate(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Prefix a name with a dot if it is not already.
#[must_use]
pub fn dot_prefix(name: &str) -> String {
    if name.starts_with('.') {
        name.to_string()
    } else {
        format!(".{name}")
    }
}

/// Normalize a root domain to the `.root.` form used for suffix matching.
///
/// `zonesync.example.com` becomes `.zonesync.example.com.`, so that only
/// names strictly below the root match.
#[must_use]
pub fn root_suffix(root: &str) -> String {
    dot_prefix(&dot_terminate(root))
}

/// Place a relative, dot-terminated name under the root.
///
/// ```
/// use zonesync::names::qualify;
///
/// assert_eq!(
///     qualify("i-1.inst.", "zonesync.example.com"),
///     "i-1.inst.zonesync.example.com."
/// );
/// ```
#[must_use]
pub fn qualify(name: &str, root: &str) -> String {
    let relative = name.strip_suffix('.').unwrap_or(name);
    format!("{relative}{}", root_suffix(root))
}

/// Check whether a label is already in LDH form.
#[must_use]
pub fn is_ldh(label: &str) -> bool {
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            label.len() <= MAX_LABEL_LEN
                && *first != b'-'
                && *last != b'-'
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        }
        _ => false,
    }
}

/// Sanitize arbitrary text into a DNS label.
///
/// The result is lowercase, contains only letters, digits and hyphens, is at
/// most 63 characters, and never starts or ends with a hyphen (a boundary
/// hyphen becomes `0`). Labels already in LDH form pass through untouched.
/// Distinct inputs may collapse to the same label.
///
/// ```
/// use zonesync::names::ldh;
///
/// assert_eq!(ldh("web"), "web");
/// assert_eq!(ldh("My Group!"), "my-group0");
/// ```
#[must_use]
pub fn ldh(text: &str) -> String {
    if is_ldh(text) {
        return text.to_string();
    }

    let mut label: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .take(MAX_LABEL_LEN)
        .collect();

    if label.starts_with('-') {
        label.replace_range(0..1, "0");
    }
    if label.ends_with('-') {
        let end = label.len();
        label.replace_range(end - 1..end, "0");
    }
    label
}

/// Decode `\DDD` octal escapes the provider uses for non-printable or
/// special label characters.
///
/// ```
/// use zonesync::names::decode_octal;
///
/// assert_eq!(decode_octal("foo\\040bar"), "foo bar");
/// assert_eq!(decode_octal("\\052.example.com."), "*.example.com.");
/// ```
#[must_use]
pub fn decode_octal(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            if let Some(decoded) = octal_triplet(&bytes[i + 1..i + 4]) {
                out.push(decoded);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Escape every byte outside `[a-z0-9-_.]` as a `\DDD` octal triplet, the
/// way the provider returns record names. Inverse of [`decode_octal`].
#[must_use]
pub fn encode_octal(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        let plain = byte.is_ascii_lowercase()
            || byte.is_ascii_digit()
            || matches!(byte, b'-' | b'_' | b'.');
        if plain {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("\\{byte:03o}"));
        }
    }
    out
}

fn octal_triplet(digits: &[u8]) -> Option<u8> {
    if digits.len() != 3 || !digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
        return None;
    }
    let value = digits
        .iter()
        .fold(0u16, |acc, d| acc * 8 + u16::from(d - b'0'));
    u8::try_from(value).ok()
}

/// Reduce a load balancer DNS name to its short prefix.
///
/// Load balancer names have the shape `<prefix>-<hash>.<region>...`; the
/// prefix is everything in the first label before its last hyphen. Names of
/// any other shape yield `None`.
///
/// ```
/// use zonesync::names::elb_prefix;
///
/// assert_eq!(
///     elb_prefix("web-front-1234567890.us-east-1.elb.amazonaws.com"),
///     Some("web-front".to_string())
/// );
/// assert_eq!(elb_prefix("nohash.example.com"), None);
/// ```
#[must_use]
pub fn elb_prefix(dns_name: &str) -> Option<String> {
    let (first, rest) = dns_name.split_once('.')?;
    if rest.is_empty() {
        return None;
    }
    let (prefix, hash) = first.rsplit_once('-')?;
    let prefix_ok = !prefix.is_empty()
        && prefix
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if prefix_ok && !hash.is_empty() {
        Some(prefix.to_string())
    } else {
        None
    }
}

/// First label of a dot-separated name.
#[must_use]
pub fn first_label(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// Strip the SRV indirection prefix from a name, if present.
#[must_use]
pub fn strip_srv_prefix(name: &str) -> Option<&str> {
    name.strip_prefix(SRV_PREFIX)
}

/// Add the SRV indirection prefix to a name.
#[must_use]
pub fn srv_name(name: &str) -> String {
    format!("{SRV_PREFIX}{name}")
}

#[cfg(test)]
#[path = "names_tests.rs"]
mod names_tests;
