//! Lenient models for CKAN portal records
//!
//! Portal results are never schema-validated: every field is optional, and a
//! JSON `null` or a value of the wrong type is read as the field's default.
//! Callers read whatever is there.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Read a value of the wrong type as `None`
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Read `null` or a value of the wrong type as `T::default()`
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Read a list, skipping items that do not decode; anything else is empty
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Returns true when an optional string is present and non-empty
pub fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

/// Loose truthiness for untyped JSON values
///
/// `null`, `false`, `0`, `""`, `[]` and `{}` are all considered empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Dataset (package) as returned by `package_show` and `package_search`
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Package {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub license_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub license_title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub author_email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub maintainer: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub maintainer_email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub metadata_created: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub metadata_modified: Option<String>,
    #[serde(default)]
    pub temporal_coverage_from: Option<Value>,
    #[serde(default)]
    pub temporal_coverage_to: Option<Value>,
    #[serde(default)]
    pub spatial: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub num_resources: Option<u64>,
    #[serde(default)]
    pub organization: Option<Organization>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub tags: Vec<Tag>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub groups: Vec<Group>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub resources: Vec<Resource>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub extras: Vec<Extra>,
    #[serde(default, deserialize_with = "lenient")]
    pub tracking_summary: Option<TrackingSummary>,
}

impl Package {
    /// Read a package out of an untyped portal result
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Package::deserialize(value)
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags
            .iter()
            .filter_map(|tag| tag.name.clone())
            .collect()
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization
            .as_ref()
            .and_then(|org| org.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn organization_name(&self) -> Option<&str> {
        self.organization.as_ref().and_then(|org| org.name.as_deref())
    }

    pub fn group_ids(&self) -> Vec<String> {
        self.groups
            .iter()
            .filter_map(|group| group.id.clone())
            .filter(|id| !id.is_empty())
            .collect()
    }

    /// Title, falling back to name
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Tag {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub display_name: Option<String>,
}

/// Owning organization of a dataset
///
/// Decodes from any JSON value; the naming fields are read when it is an
/// object.
#[derive(Debug, Serialize, Clone, Default)]
pub struct Organization {
    pub id: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    #[serde(skip)]
    present: bool,
}

impl<'de> Deserialize<'de> for Organization {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let empty = Map::new();
        let fields = value.as_object().unwrap_or(&empty);
        let text = |key: &str| fields.get(key).and_then(Value::as_str).map(String::from);

        Ok(Self {
            id: text("id"),
            name: text("name"),
            title: text("title"),
            present: is_truthy(&value),
        })
    }
}

impl Organization {
    /// Present when the portal sent anything other than an empty value
    ///
    /// `{}` is absent; `{"description": "x"}` is present even without an id
    /// or a name.
    pub fn is_present(&self) -> bool {
        self.present
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Group {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// A single downloadable artifact of a dataset
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Resource {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub package_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub format: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default)]
    pub size: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub created: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_modified: Option<String>,
}

impl Resource {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Resource::deserialize(value)
    }
}

/// Custom key/value field attached to a dataset
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Extra {
    #[serde(default, deserialize_with = "lenient")]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

/// Page view counters, only populated when the portal has tracking enabled
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TrackingSummary {
    #[serde(default, deserialize_with = "lenient")]
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub recent: Option<u64>,
}

/// Result of `package_search`
///
/// Results are kept untyped so they can be handed back to callers verbatim.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PackageSearchResult {
    #[serde(default, deserialize_with = "nullable")]
    pub count: u64,
    #[serde(default, deserialize_with = "lenient_list")]
    pub results: Vec<Value>,
}

impl PackageSearchResult {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        PackageSearchResult::deserialize(value)
    }
}

/// Returns the `id` of an untyped search result, if any
pub fn result_id(result: &Value) -> Option<&str> {
    result.get("id").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_package_tolerates_nulls_and_missing_fields() {
        let package = Package::from_value(&json!({
            "id": "abc",
            "tags": null,
            "resources": null,
            "organization": null
        }))
        .unwrap();

        assert_eq!(package.id.as_deref(), Some("abc"));
        assert!(package.tags.is_empty());
        assert!(package.resources.is_empty());
        assert!(package.organization.is_none());
        assert!(package.tracking_summary.is_none());
    }

    #[test]
    fn test_package_helpers() {
        let package = Package::from_value(&json!({
            "name": "roads",
            "tags": [{"name": "transport"}, {"name": "roads"}],
            "organization": {"id": "org-1", "name": "city"},
            "groups": [{"id": "g1"}, {"id": ""}, {"name": "nameless"}]
        }))
        .unwrap();

        assert_eq!(package.tag_names(), vec!["transport", "roads"]);
        assert_eq!(package.organization_id(), Some("org-1"));
        assert_eq!(package.organization_name(), Some("city"));
        assert_eq!(package.group_ids(), vec!["g1"]);
        assert_eq!(package.display_title(), "roads");
    }

    #[test]
    fn test_off_type_fields_read_as_absent() {
        let package = Package::from_value(&json!({
            "id": "abc",
            "title": 42,
            "num_resources": "3",
            "tracking_summary": {"total": -1, "recent": 5},
            "tags": [{"name": "ok"}, "loose", {"name": 7}],
            "resources": {"not": "a list"},
            "organization": "city"
        }))
        .unwrap();

        assert!(package.title.is_none());
        assert!(package.num_resources.is_none());
        let tracking = package.tracking_summary.as_ref().unwrap();
        assert!(tracking.total.is_none());
        assert_eq!(tracking.recent, Some(5));
        assert_eq!(package.tag_names(), vec!["ok"]);
        assert!(package.resources.is_empty());
        assert!(package.organization_id().is_none());
        assert!(package.organization.as_ref().unwrap().is_present());
        assert_eq!(package.display_title(), "Unknown");
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!("2020")));
        assert!(is_truthy(&json!({"type": "Point"})));
    }

    #[test]
    fn test_search_result_defaults() {
        let result = PackageSearchResult::from_value(&json!({"count": null})).unwrap();
        assert_eq!(result.count, 0);
        assert!(result.results.is_empty());
    }
}
