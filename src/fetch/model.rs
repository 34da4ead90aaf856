use serde::Deserialize;
use serde_json::Value;

/// Rendition preferred over the full-size original.
pub const PREFERRED_IMAGE_SIZE: &str = "1536x1536";

#[derive(Deserialize, Debug)]
pub struct WpPhoto {
    pub id: i64,
    pub slug: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_gmt: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub modified_gmt: Option<String>,
    #[serde(default)]
    pub content: Option<Rendered>,
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<WpEmbedded>,
}

#[derive(Deserialize, Debug)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

/// `_embed=1` payload. Entries stay loosely typed: the directory sometimes
/// embeds error objects instead of media.
#[derive(Deserialize, Debug, Default)]
pub struct WpEmbedded {
    #[serde(rename = "wp:featuredmedia", default)]
    pub featured_media: Vec<Value>,
    #[serde(default)]
    pub author: Vec<Value>,
}

#[derive(Deserialize, Debug)]
pub struct WpTag {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}
