//! Metadata export
//!
//! Transforms portal dataset records into DCAT or Schema.org JSON-LD objects,
//! or passes them through untouched (`ckan_native`).

use crate::package::{Package, Resource};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Dcat,
    SchemaOrg,
    CkanNative,
}

impl ExportFormat {
    /// Recognised format names; anything else yields `None`
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "dcat" => Some(ExportFormat::Dcat),
            "schema_org" => Some(ExportFormat::SchemaOrg),
            "ckan_native" => Some(ExportFormat::CkanNative),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Dcat => "dcat",
            ExportFormat::SchemaOrg => "schema_org",
            ExportFormat::CkanNative => "ckan_native",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ExportBundle {
    pub export_format: String,
    pub timestamp: String,
    pub datasets: Vec<Value>,
}

impl ExportBundle {
    pub fn new(export_format: &str, timestamp: String) -> Self {
        Self {
            export_format: export_format.to_string(),
            timestamp,
            datasets: Vec::new(),
        }
    }
}

fn dcat_distribution(resource: &Resource) -> Value {
    json!({
        "@type": "dcat:Distribution",
        "dct:identifier": resource.id,
        "dct:title": resource.name,
        "dcat:accessURL": resource.url,
        "dct:format": resource.format,
        "dcat:byteSize": resource.size,
    })
}

fn schema_org_distribution(resource: &Resource) -> Value {
    json!({
        "@type": "DataDownload",
        "name": resource.name,
        "contentUrl": resource.url,
        "encodingFormat": resource.format,
        "contentSize": resource.size,
    })
}

pub fn to_dcat(package: &Package, include_resources: bool) -> Value {
    let mut dataset = json!({
        "@type": "dcat:Dataset",
        "dct:identifier": package.id,
        "dct:title": package.title,
        "dct:description": package.notes,
        "dcat:keyword": package.tag_names(),
        "dct:issued": package.metadata_created,
        "dct:modified": package.metadata_modified,
        "dct:publisher": {
            "@type": "foaf:Organization",
            "foaf:name": package.organization_name(),
        },
    });

    if include_resources {
        dataset["dcat:distribution"] =
            Value::Array(package.resources.iter().map(dcat_distribution).collect());
    }

    dataset
}

pub fn to_schema_org(package: &Package, include_resources: bool) -> Value {
    let mut dataset = json!({
        "@context": "https://schema.org/",
        "@type": "Dataset",
        "name": package.title,
        "description": package.notes,
        "identifier": package.id,
        "keywords": package.tag_names(),
        "dateCreated": package.metadata_created,
        "dateModified": package.metadata_modified,
        "publisher": {
            "@type": "Organization",
            "name": package.organization_name(),
        },
    });

    if include_resources {
        dataset["distribution"] =
            Value::Array(package.resources.iter().map(schema_org_distribution).collect());
    }

    dataset
}

/// Transform one fetched dataset
///
/// Returns `Ok(None)` for an unrecognised format name: such datasets are
/// silently left out of the bundle.
pub fn export_dataset(
    export_format: &str,
    raw: Value,
    include_resources: bool,
) -> Result<Option<Value>, serde_json::Error> {
    let Some(format) = ExportFormat::parse(export_format) else {
        return Ok(None);
    };

    let exported = match format {
        ExportFormat::CkanNative => raw,
        ExportFormat::Dcat => to_dcat(&Package::from_value(&raw)?, include_resources),
        ExportFormat::SchemaOrg => to_schema_org(&Package::from_value(&raw)?, include_resources),
    };

    Ok(Some(exported))
}
