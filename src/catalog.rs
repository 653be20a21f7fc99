//! Example catalog loading and capture-target extraction.
//!
//! The catalog is the JSON form of the gallery's example list:
//!
//! ```json
//! { "sections": [
//!     { "id": "cpp", "title": "C++ examples", "items": [
//!         { "id": "traffic", "title": "Traffic", "url": "https://flecs-hub.github.io/traffic/etc/" },
//!         { "id": "perlin_1", "title": "Perlin Noise 1", "url": "...", "captureCanvas": true }
//!     ] }
//! ] }
//! ```

use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{CaptureConfig, Error, Result};

/// Parsed example catalog
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    pub sections: Vec<Section>,
}

/// A titled group of examples
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "string_field")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_field")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "items_field")]
    pub items: Vec<Item>,
}

/// A single example page
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawItem")]
pub struct Item {
    pub id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    /// Capture the page's main canvas instead of the full page
    pub capture_canvas: bool,
}

// Every spelling of the canvas flag is its own field so that an item
// carrying more than one is read, not rejected.
#[derive(Deserialize)]
struct RawItem {
    #[serde(default, deserialize_with = "string_field")]
    id: Option<String>,
    #[serde(default, deserialize_with = "string_field")]
    title: Option<String>,
    #[serde(default, deserialize_with = "string_field")]
    url: Option<String>,
    #[serde(default, rename = "captureCanvas", deserialize_with = "exactly_true")]
    camel: bool,
    #[serde(default, rename = "capture-canvas", deserialize_with = "exactly_true")]
    kebab: bool,
    #[serde(default, rename = "capture_canvas", deserialize_with = "exactly_true")]
    snake: bool,
}

impl From<RawItem> for Item {
    fn from(raw: RawItem) -> Self {
        Item {
            id: raw.id,
            title: raw.title,
            url: raw.url,
            capture_canvas: raw.camel || raw.kebab || raw.snake,
        }
    }
}

/// One page to capture, flattened out of the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureTarget {
    pub section_id: String,
    pub section_title: String,
    pub id: String,
    pub title: String,
    pub url: String,
    pub capture_canvas: bool,
}

// Non-string values are treated as missing rather than rejecting the catalog.
fn string_field<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn exactly_true<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

// A section whose `items` is not an array contributes no items. Entries that
// are not objects still count as items, with every field missing.
fn items_field<'de, D>(deserializer: D) -> std::result::Result<Vec<Item>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(values) => values
            .into_iter()
            .enumerate()
            .map(|(index, v)| {
                if v.is_object() {
                    Item::deserialize(v).map_err(serde::de::Error::custom)
                } else {
                    warn!("items[{}] is not an object ({}); treating it as an empty item", index, v);
                    Ok(Item::default())
                }
            })
            .collect(),
        _ => Ok(Vec::new()),
    }
}

impl Catalog {
    /// Parse a catalog from JSON text.
    pub fn from_json(source: &str) -> Result<Self> {
        let doc: Value =
            serde_json::from_str(source).map_err(|e| Error::Catalog(format!("invalid JSON: {}", e)))?;

        match doc.get("sections") {
            Some(Value::Array(_)) => {}
            Some(_) => return Err(Error::Catalog("`sections` is not an array".into())),
            None => return Err(Error::Catalog("missing `sections`".into())),
        }

        Catalog::deserialize(doc).map_err(|e| Error::Catalog(e.to_string()))
    }

    /// Index items by id, mirroring the gallery's `byId` lookup.
    ///
    /// Items without an id are left out; when ids repeat, the last one wins.
    pub fn by_id(&self) -> HashMap<&str, (&Section, &Item)> {
        let mut index = HashMap::new();
        for section in &self.sections {
            for item in &section.items {
                if let Some(id) = item.id.as_deref() {
                    index.insert(id, (section, item));
                }
            }
        }
        index
    }

    /// Total number of items across all sections
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }
}

/// Read and parse the catalog at `path`.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| Error::Catalog(format!("{}: {}", path.display(), e)))?;

    let catalog = Catalog::from_json(&source).map_err(|e| match e {
        Error::Catalog(msg) => Error::Catalog(format!("{}: {}", path.display(), msg)),
        other => other,
    })?;

    let indexed = catalog.by_id().len();
    let with_id = catalog
        .sections
        .iter()
        .flat_map(|s| &s.items)
        .filter(|i| i.id.is_some())
        .count();
    if indexed < with_id {
        warn!(
            "{}: {} item id(s) are used more than once",
            path.display(),
            with_id - indexed
        );
    }

    debug!(
        "Loaded {} sections with {} items from {}",
        catalog.sections.len(),
        catalog.item_count(),
        path.display()
    );
    Ok(catalog)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Flatten the catalog into capture targets, in declaration order.
///
/// An item's own URL wins when it is non-blank; otherwise the configured
/// default URL is used unless `skip_default` is set. Items left without a URL
/// are dropped.
pub fn collect_targets(catalog: &Catalog, config: &CaptureConfig) -> Vec<CaptureTarget> {
    let mut targets = Vec::new();

    for section in &catalog.sections {
        for item in &section.items {
            let own = item.url.as_deref().map(str::trim).unwrap_or("");
            let url = if !own.is_empty() {
                own
            } else if !config.skip_default {
                config.default_url.trim()
            } else {
                ""
            };
            if url.is_empty() {
                continue;
            }

            let item_id = non_empty(item.id.as_deref());
            let item_title = non_empty(item.title.as_deref());

            targets.push(CaptureTarget {
                section_id: non_empty(section.id.as_deref()).unwrap_or("section").to_string(),
                section_title: non_empty(section.title.as_deref()).unwrap_or("Section").to_string(),
                id: item_id.or(item_title).unwrap_or("example").to_string(),
                title: item_title.or(item_id).unwrap_or("Example").to_string(),
                url: url.to_string(),
                capture_canvas: item.capture_canvas,
            });
        }
    }

    targets
}
