use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Builds a tracking code: `<prefix>-<base36 millis>-<8 random hex>`.
///
/// The format is cosmetic; nothing parses it back.
pub fn generate_tracking_code(prefix: &str, now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        prefix,
        to_base36(millis),
        random[..8].to_ascii_uppercase()
    )
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
