use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Upload record as stored in the index and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: i64,
    #[serde(default)]
    pub original_name: String,
    #[serde(alias = "quax_url", alias = "download_url")]
    pub remote_url: String,
    pub short_code: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub size: u64,
}

/// Older index files stored the millisecond timestamp id as a string.
fn id_from_number_or_string<'de, D>(de: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match RawId::deserialize(de)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s.trim().parse::<i64>().map_err(de::Error::custom),
    }
}
