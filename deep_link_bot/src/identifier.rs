use std::fmt::Write;

use chrono::Utc;
use sha2::{Digest, Sha256};

/// Length of the generated identifier, in bytes of the digest. Rendered as twice as many hex
/// characters.
const ID_BYTES: usize = 16;

/// Generate a fresh identifier for this URL, from the URL and the current time.
#[must_use]
pub fn generate_unique_id(url: &str) -> String {
    // Good until year 2262.
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    generate_unique_id_at(url, nanos)
}

/// Generate the identifier for this URL as if it was submitted at this UNIX timestamp in
/// nanoseconds.
///
/// The result is 32 lowercase hex characters, which is fine to use as a Telegram
/// `?start=` parameter.
#[must_use]
pub fn generate_unique_id_at(url: &str, unix_nanos: i64) -> String {
    let digest = Sha256::digest(format!("{url}_{unix_nanos}").as_bytes());

    let mut out = String::with_capacity(ID_BYTES * 2);
    for byte in &digest[..ID_BYTES] {
        write!(out, "{byte:02x}").expect("Writing to a String never fails");
    }
    out
}
