//! Lenient field deserializers for request bodies sent by older clients.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Float(f64),
}

/// Accepts an id sent either as a JSON string or number and normalizes it to
/// a string. Blank strings count as absent.
pub fn opt_id<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawId>::deserialize(de)?;
    Ok(raw.and_then(|raw| match raw {
        RawId::Text(s) => non_blank(s),
        RawId::Int(n) => Some(n.to_string()),
        RawId::Float(f) => Some(f.to_string()),
    }))
}

/// Optional string where `""` is treated the same as a missing field.
pub fn opt_nonempty<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.and_then(non_blank))
}

fn non_blank(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}
