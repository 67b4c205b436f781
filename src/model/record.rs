use serde::{Deserialize, Deserializer};

/// One catalog item as emitted by the crawler.
///
/// Field names follow the crawler's wire format; the short names are accepted
/// as aliases so hand-written fixtures stay readable.
#[derive(Debug, Deserialize, Clone)]
pub struct RawRecord {
    #[serde(rename = "publishedfileid", alias = "id", deserialize_with = "de_id")]
    pub id: String,

    #[serde(default, deserialize_with = "null_default")]
    pub title: String,

    #[serde(default, deserialize_with = "de_tags")]
    pub tags: Vec<String>,

    #[serde(
        default,
        rename = "time_updated",
        alias = "updated",
        deserialize_with = "null_default"
    )]
    pub updated: i64,

    #[serde(
        default,
        rename = "subscriptions",
        alias = "subs",
        deserialize_with = "null_default"
    )]
    pub subscriptions: u64,

    #[serde(default)]
    pub vote_data: Option<VoteData>,

    #[serde(default, deserialize_with = "null_default")]
    pub children: Vec<ChildRef>,
}

impl RawRecord {
    pub fn vote_score(&self) -> f64 {
        self.vote_data
            .as_ref()
            .and_then(|v| v.score)
            .unwrap_or(0.0)
    }

    pub fn dependency_ids(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|c| c.id.as_str())
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct VoteData {
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChildRef {
    #[serde(rename = "publishedfileid", alias = "id", deserialize_with = "de_id")]
    pub id: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(u64),
}

fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let id = match IdRepr::deserialize(d)? {
        IdRepr::Text(s) => s.trim().to_string(),
        IdRepr::Number(n) => n.to_string(),
    };
    if id.is_empty() {
        return Err(serde::de::Error::custom("empty publishedfileid"));
    }
    Ok(id)
}

// Raw API pages carry `[{ "tag": "..", "display_name": ".." }]`, cleaned chunks
// carry plain strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum TagRepr {
    Plain(String),
    Object { tag: String },
}

fn de_tags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let tags: Option<Vec<TagRepr>> = Option::deserialize(d)?;
    Ok(tags
        .unwrap_or_default()
        .into_iter()
        .map(|t| match t {
            TagRepr::Plain(s) => s,
            TagRepr::Object { tag } => tag,
        })
        .collect())
}

fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}
