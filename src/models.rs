use serde::{Deserialize, Serialize};

/// A catalogued book with its authors.
///
/// Nullable columns map to `Option` fields which are left out of the JSON
/// object entirely when absent.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(rename = "imgURL", default, skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

/// Input of the submit path.
///
/// `authors` is the raw comma separated list exactly as submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub year: Option<i64>,
    pub img_url: Option<String>,
    pub authors: String,
}
