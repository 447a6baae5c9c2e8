//! Query string construction for the CKAN action API
//!
//! Parameters are kept as an ordered list of `(key, value)` pairs and only
//! turned into a query string at the network boundary. Values are
//! percent-encoded the same way the portal's search endpoint expects: every
//! byte outside `A-Z a-z 0-9 - _ . ~` is escaped, except `/`.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Facets requested when the caller does not name any
pub const DEFAULT_FACET_FIELDS: [&str; 3] = ["tags", "organization", "res_format"];

/// Date field used by range filters when none is given
pub const DEFAULT_DATE_FIELD: &str = "metadata_created";

/// Match-all query
pub const MATCH_ALL: &str = "*:*";

/// Rows requested by faceted searches
pub const FACETED_SEARCH_ROWS: usize = 100;

/// Errors raised while turning structured input into query parameters
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueryError {
    #[error("invalid spatial query: {0}")]
    InvalidSpatial(String),
}

/// Percent-encode a single query value
pub fn encode_value(value: &str) -> String {
    urlencoding::encode(value).replace("%2F", "/")
}

/// Render a JSON scalar the way it should appear inside a query
///
/// Strings are used verbatim, everything else uses its JSON text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ordered query parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    /// Builder-style append that skips `None`
    pub fn with_opt<T: ToString>(mut self, key: impl Into<String>, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.pairs.push((key.into(), value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Append `clause` to an existing filter with `AND`, keeping its position,
    /// or add `key` at the end when it is not present yet
    pub fn and_extend(&mut self, key: &str, clause: &str) {
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some((_, value)) => {
                value.push_str(" AND ");
                value.push_str(clause);
            }
            None => self.push(key, clause),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize as `k1=v1&k2=v2`, values percent-encoded, keys verbatim
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", encode_value(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Build the endpoint (action name plus query string) for an action call
pub fn action_endpoint(action: &str, params: &QueryParams) -> String {
    if params.is_empty() {
        action.to_string()
    } else {
        format!("{action}?{}", params.to_query_string())
    }
}

/// Join clauses with `AND`; `None` when there is nothing to join
pub fn and_clause(parts: &[String]) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" AND "))
    }
}

/// Build `field:v1 OR field:v2 ...`; `None` when `values` is empty
pub fn or_clause(field: &str, values: &[String]) -> Option<String> {
    if values.is_empty() {
        return None;
    }

    Some(
        values
            .iter()
            .map(|v| format!("{field}:{v}"))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}

/// Turn a `{field: value}` object into `field:value` clauses, in input order
///
/// An array value matches any of its items and becomes a parenthesized OR
/// group; an empty array adds no clause.
pub fn field_filters(filters: &Map<String, Value>) -> Vec<String> {
    filters
        .iter()
        .filter_map(|(field, value)| match value {
            Value::Array(items) => {
                let values: Vec<String> = items.iter().map(value_text).collect();
                match values.len() {
                    0 => None,
                    1 => Some(format!("{field}:{}", values[0])),
                    _ => or_clause(field, &values).map(|clause| format!("({clause})")),
                }
            }
            other => Some(format!("{field}:{}", value_text(other))),
        })
        .collect()
}

/// Filter clause used by the explorer's search command
///
/// `organization:x AND tags:a AND tags:b`, tags split on commas and trimmed.
pub fn explorer_filter(organization: Option<&str>, tags: Option<&str>) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(org) = organization.filter(|o| !o.is_empty()) {
        parts.push(format!("organization:{org}"));
    }

    if let Some(tags) = tags {
        parts.extend(
            tags.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| format!("tags:{t}")),
        );
    }

    and_clause(&parts)
}

/// Geographic constraint: a bounding box or a point with a radius
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpatialQuery {
    /// `[min_lon, min_lat, max_lon, max_lat]`
    #[serde(default)]
    pub bbox: Option<Vec<Value>>,
    /// `[lat, lon]`
    #[serde(default)]
    pub point: Option<Vec<Value>>,
    #[serde(default)]
    pub radius: Option<Value>,
}

impl SpatialQuery {
    /// The single `(key, value)` parameter for this constraint
    ///
    /// When both modes are present the bounding box wins.
    pub fn to_param(&self) -> Result<Option<(&'static str, String)>, QueryError> {
        if let Some(bbox) = &self.bbox {
            if bbox.len() < 4 {
                return Err(QueryError::InvalidSpatial(format!(
                    "bbox needs 4 coordinates, got {}",
                    bbox.len()
                )));
            }
            let coords: Vec<String> = bbox[..4].iter().map(value_text).collect();
            return Ok(Some(("ext_bbox", coords.join(","))));
        }

        if let (Some(point), Some(radius)) = (&self.point, &self.radius) {
            if point.len() < 2 {
                return Err(QueryError::InvalidSpatial(format!(
                    "point needs 2 coordinates, got {}",
                    point.len()
                )));
            }
            return Ok(Some((
                "ext_spatial",
                format!(
                    "{},{},{}",
                    value_text(&point[0]),
                    value_text(&point[1]),
                    value_text(radius)
                ),
            )));
        }

        Ok(None)
    }
}

/// Temporal constraint on a date field; open ends default to `*`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

impl DateRange {
    /// `field:[start TO end]`
    pub fn to_clause(&self) -> String {
        format!(
            "{}:[{} TO {}]",
            self.field.as_deref().unwrap_or(DEFAULT_DATE_FIELD),
            self.start.as_deref().unwrap_or("*"),
            self.end.as_deref().unwrap_or("*")
        )
    }
}

fn default_query() -> String {
    MATCH_ALL.to_string()
}

/// Structured input of a faceted search
#[derive(Debug, Clone, Deserialize)]
pub struct FacetedSearch {
    #[serde(default = "default_query")]
    pub q: String,
    #[serde(default)]
    pub facet_fields: Option<Vec<String>>,
    #[serde(default)]
    pub filters: Option<Map<String, Value>>,
    #[serde(default)]
    pub spatial_query: Option<SpatialQuery>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl Default for FacetedSearch {
    fn default() -> Self {
        Self {
            q: default_query(),
            facet_fields: None,
            filters: None,
            spatial_query: None,
            date_range: None,
        }
    }
}

/// Facet field list as the JSON array text the portal expects
fn facet_field_list(fields: &[String]) -> String {
    let quoted: Vec<String> = fields
        .iter()
        .map(|f| Value::String(f.clone()).to_string())
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// Build the `package_search` parameters of a faceted search
///
/// Order: `q`, `facet`, `facet.field`, `rows`, `fq`, spatial parameter. A date
/// range is AND-ed onto an existing `fq` or appended as a new one.
pub fn build_search_query(search: &FacetedSearch) -> Result<QueryParams, QueryError> {
    let facets = match search.facet_fields.as_deref() {
        Some(fields) if !fields.is_empty() => facet_field_list(fields),
        _ => facet_field_list(&DEFAULT_FACET_FIELDS.map(String::from)),
    };

    let mut params = QueryParams::new()
        .with("q", &search.q)
        .with("facet", "true")
        .with("facet.field", facets)
        .with("rows", FACETED_SEARCH_ROWS);

    if let Some(filters) = search.filters.as_ref() {
        if let Some(fq) = and_clause(&field_filters(filters)) {
            params.push("fq", fq);
        }
    }

    if let Some(spatial) = &search.spatial_query {
        if let Some((key, value)) = spatial.to_param()? {
            params.push(key, value);
        }
    }

    if let Some(range) = &search.date_range {
        params.and_extend("fq", &range.to_clause());
    }

    Ok(params)
}

/// Arguments of a plain `package_search` passthrough
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageSearch {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub fq: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub rows: Option<u64>,
    #[serde(default)]
    pub start: Option<u64>,
}

impl PackageSearch {
    /// Only the arguments that were supplied are forwarded
    pub fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .with_opt("q", self.q.as_ref())
            .with_opt("fq", self.fq.as_ref())
            .with_opt("sort", self.sort.as_ref())
            .with_opt("rows", self.rows)
            .with_opt("start", self.start)
    }
}
