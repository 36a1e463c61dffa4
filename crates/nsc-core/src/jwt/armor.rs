//! Human-facing framing of tokens and seeds.
//!
//! The exact delimiters (including the extra dash on `END` lines) are
//! parsed by other tools and must not change.

const PRODUCT: &str = "NATS";

/// Wrap a token in a `BEGIN/END <PRODUCT> <KIND> JWT` block.
pub fn format_jwt(kind: &str, token: &str) -> String {
    let kind = kind.to_uppercase();
    format!(
        "-----BEGIN {PRODUCT} {kind} JWT-----\n{token}\n------END {PRODUCT} {kind} JWT------\n\n"
    )
}

/// Wrap a token and its seed, with the secret warning between them.
pub fn format_config(kind: &str, token: &str, seed: &str) -> String {
    let upper = kind.to_uppercase();
    let mut out = format_jwt(kind, token);
    out.push_str("************************* IMPORTANT *************************\n");
    out.push_str("NKEY Seed printed below can be used to sign and prove identity.\n");
    out.push_str("NKEYs are sensitive and should be treated as secrets.\n\n");
    out.push_str(&format!(
        "-----BEGIN {upper} NKEY SEED-----\n{seed}\n------END {upper} NKEY SEED------\n\n"
    ));
    out.push_str("*************************************************************\n");
    out
}

/// Return the token inside the first JWT block of `text`, or the trimmed
/// text itself when it carries no block.
pub fn extract_token(text: &str) -> String {
    let mut lines = text.lines().map(str::trim);
    while let Some(line) = lines.next() {
        if line.starts_with("-----BEGIN") && line.ends_with("JWT-----") {
            if let Some(token) = lines.find(|l| !l.is_empty()) {
                return token.to_string();
            }
        }
    }
    text.trim().to_string()
}

/// Return the seed inside the first NKEY SEED block of `text`, if any.
pub fn extract_seed(text: &str) -> Option<String> {
    let mut lines = text.lines().map(str::trim);
    while let Some(line) = lines.next() {
        if line.starts_with("-----BEGIN") && line.ends_with("NKEY SEED-----") {
            return lines.find(|l| !l.is_empty()).map(str::to_string);
        }
    }
    None
}
