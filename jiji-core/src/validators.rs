//! Pure, total predicates over strings sourced from the replicated store.
//!
//! Every value that originates in the store and will be embedded in a
//! literal SQL statement must pass the matching validator here first.
//! [`quote_sql_literal`] is the only sanctioned way to embed a string once
//! it has been validated -- the store accepts free-form SQL text and has
//! no bound-parameter API, so these two primitives are the entire security
//! boundary (see `spec.md` §4.A, §7, §9).

/// Returns `true` if `s` is a valid container ID: hex, length 12 or 64,
/// case-insensitive.
#[must_use]
pub fn is_valid_container_id(s: &str) -> bool {
    matches!(s.len(), 12 | 64) && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Returns `true` if `s` is a valid server ID: 1-63 characters of
/// `[A-Za-z0-9._-]`.
#[must_use]
pub fn is_valid_server_id(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 63
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

/// Returns `true` if `s` looks like a base64-encoded public key: exactly
/// 44 characters, standard base64 alphabet, with `=` padding at the end.
#[must_use]
pub fn is_valid_public_key(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 44 {
        return false;
    }

    // Padding ('=') may only appear as the last 1-2 characters.
    let padding_start = bytes.iter().position(|&b| b == b'=');
    let data_len = padding_start.unwrap_or(bytes.len());
    if let Some(start) = padding_start {
        if bytes[start..].iter().any(|&b| b != b'=') || bytes.len() - start > 2 {
            return false;
        }
    }

    bytes[..data_len]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/'))
}

/// Returns `true` if `s` is a valid dotted-decimal IPv4 address: four
/// octets 0-255, no leading zeros on multi-digit octets.
#[must_use]
pub fn is_valid_ipv4(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    parts.len() == 4 && parts.iter().all(|part| is_valid_ipv4_octet(part))
}

fn is_valid_ipv4_octet(part: &str) -> bool {
    if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if part.len() > 1 && part.starts_with('0') {
        return false;
    }
    part.parse::<u16>().is_ok_and(|v| v <= 255)
}

/// Returns `true` if `s` is a valid IPv6 address in any standard form
/// (full, `::`-compressed, or IPv4-mapped).
#[must_use]
pub fn is_valid_ipv6(s: &str) -> bool {
    // std's parser implements RFC 4291 textual representation including
    // "::" compression and IPv4-mapped tails, which is exactly the set of
    // forms spec.md §4.A asks for.
    s.parse::<std::net::Ipv6Addr>().is_ok()
}

/// Returns `true` if `s` is `<ipv4-or-ipv6>/<prefix>` with the prefix
/// within the valid range for the address family (0-32 for IPv4, 0-128
/// for IPv6).
#[must_use]
pub fn is_valid_cidr(s: &str) -> bool {
    let Some((addr, prefix)) = s.split_once('/') else {
        return false;
    };
    let Ok(prefix_len) = prefix.parse::<u32>() else {
        return false;
    };

    if is_valid_ipv4(addr) {
        prefix_len <= 32
    } else if is_valid_ipv6(addr) {
        prefix_len <= 128
    } else {
        false
    }
}

/// Returns `true` if `s` is `IPv4:port` or `[IPv6]:port` with a port in
/// `1..=65535`.
#[must_use]
pub fn is_valid_endpoint(s: &str) -> bool {
    let (host, port) = if let Some(rest) = s.strip_prefix('[') {
        let Some((host, port)) = rest.split_once("]:") else {
            return false;
        };
        (host, port)
    } else {
        let Some((host, port)) = s.rsplit_once(':') else {
            return false;
        };
        (host, port)
    };

    let host_ok = if s.starts_with('[') {
        is_valid_ipv6(host)
    } else {
        is_valid_ipv4(host)
    };

    host_ok && port.parse::<u32>().is_ok_and(|p| (1..=65535).contains(&p))
}

/// Doubles every single quote in `s` so it can be embedded as a SQL string
/// literal. This is the *only* sanctioned method of embedding a
/// store-sourced string into a literal SQL statement; every write-path
/// call site must route through it after the value has already passed its
/// type-specific validator.
#[must_use]
pub fn quote_sql_literal(s: &str) -> String {
    s.replace('\'', "''")
}
