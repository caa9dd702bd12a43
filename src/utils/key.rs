use uuid::Uuid;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SEGMENT_LEN: usize = 5;

fn random_segment() -> String {
    // Low bits of a v4 uuid are random, the version bits sit far above them
    let mut value = Uuid::new_v4().as_u128();
    let mut segment = String::with_capacity(SEGMENT_LEN);
    for _ in 0..SEGMENT_LEN {
        segment.push(BASE36[(value % 36) as usize] as char);
        value /= 36;
    }
    segment
}

/// Two independent base-36 segments joined by a hyphen, e.g. `k3x9a-0pz1q`.
///
/// Collisions are unlikely but possible; a collision only overwrites an object.
pub fn random_key() -> String {
    format!("{}-{}", random_segment(), random_segment())
}

/// Prepend `prefix/` to `key` when a non-empty prefix is set
pub fn prefixed_key(prefix: Option<&str>, key: &str) -> String {
    match prefix.map(|p| p.trim_end_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{}/{}", prefix, key),
        None => key.to_string(),
    }
}

/// Object key for a selected file: `<random>_<file name>`
pub fn file_key(file_name: &str) -> String {
    format!("{}_{}", random_key(), file_name)
}
