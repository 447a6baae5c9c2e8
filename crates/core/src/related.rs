//! Dataset relatedness
//!
//! A related-dataset lookup is a `package_search` whose filter is derived from
//! the source dataset: its tags, its organization or its groups ("theme").

use crate::package::{result_id, Package};
use crate::query::{or_clause, QueryParams, MATCH_ALL};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How two datasets are considered related
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    #[default]
    Tags,
    Organization,
    Theme,
}

impl FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tags" => Ok(RelationType::Tags),
            "organization" => Ok(RelationType::Organization),
            "theme" => Ok(RelationType::Theme),
            other => Err(format!(
                "Invalid relation type: {other}. Valid types: tags, organization, theme"
            )),
        }
    }
}

/// Search parameters that find datasets related to `source`
///
/// Returns `None` when the source has nothing to relate on (no tags, no
/// organization, no groups), in which case no search should be issued.
pub fn related_search_params(
    source: &Package,
    relation: RelationType,
    max_results: usize,
) -> Option<QueryParams> {
    match relation {
        RelationType::Tags => {
            let fq = or_clause("tags", &source.tag_names())?;
            Some(
                QueryParams::new()
                    .with("q", MATCH_ALL)
                    .with("fq", fq)
                    .with("rows", max_results),
            )
        }
        RelationType::Organization => {
            let org = source.organization_id()?;
            Some(
                QueryParams::new()
                    .with("q", format!("organization:{org}"))
                    .with("rows", max_results),
            )
        }
        RelationType::Theme => {
            let fq = or_clause("groups", &source.group_ids())?;
            Some(
                QueryParams::new()
                    .with("q", MATCH_ALL)
                    .with("fq", fq)
                    .with("rows", max_results),
            )
        }
    }
}

/// Drop the source dataset from search results and cap the list
///
/// `source_ids` holds every identifier the source may appear under (the id
/// the caller asked for and the id the portal reported). Portal order is kept.
pub fn exclude_source(
    results: Vec<serde_json::Value>,
    source_ids: &[&str],
    max_results: usize,
) -> Vec<serde_json::Value> {
    results
        .into_iter()
        .filter(|ds| !result_id(ds).is_some_and(|id| source_ids.contains(&id)))
        .take(max_results)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn package(value: serde_json::Value) -> Package {
        Package::from_value(&value).unwrap()
    }

    #[test]
    fn test_tags_relation() {
        let source = package(json!({"tags": [{"name": "a"}, {"name": "b"}]}));
        let params = related_search_params(&source, RelationType::Tags, 5).unwrap();

        assert_eq!(params.get("q"), Some("*:*"));
        assert_eq!(params.get("fq"), Some("tags:a OR tags:b"));
        assert_eq!(params.get("rows"), Some("5"));
    }

    #[test]
    fn test_organization_relation() {
        let source = package(json!({"organization": {"id": "org-9", "name": "nine"}}));
        let params = related_search_params(&source, RelationType::Organization, 10).unwrap();

        assert_eq!(params.get("q"), Some("organization:org-9"));
        assert_eq!(params.get("fq"), None);
    }

    #[test]
    fn test_theme_relation() {
        let source = package(json!({"groups": [{"id": "g1"}, {"id": "g2"}]}));
        let params = related_search_params(&source, RelationType::Theme, 3).unwrap();
        assert_eq!(params.get("fq"), Some("groups:g1 OR groups:g2"));
    }

    #[test]
    fn test_nothing_to_relate_on() {
        let source = package(json!({"id": "x", "organization": null}));

        assert!(related_search_params(&source, RelationType::Tags, 10).is_none());
        assert!(related_search_params(&source, RelationType::Organization, 10).is_none());
        assert!(related_search_params(&source, RelationType::Theme, 10).is_none());
    }

    #[test]
    fn test_exclude_source_and_truncate() {
        let results = vec![
            json!({"id": "1"}),
            json!({"id": "src"}),
            json!({"id": "2"}),
            json!({"id": "3"}),
        ];

        let related = exclude_source(results, &["src", "source-name"], 2);
        assert_eq!(related, vec![json!({"id": "1"}), json!({"id": "2"})]);
    }

    #[test]
    fn test_relation_type_parsing() {
        assert_eq!("theme".parse::<RelationType>(), Ok(RelationType::Theme));
        assert!("colour".parse::<RelationType>().is_err());
        assert_eq!(RelationType::default(), RelationType::Tags);
    }
}
