// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::archive::{ArchiveEntry, SeedArchive};
use crate::config::{ConvertOptions, Limits};
use crate::namespace::NamespaceTable;
use crate::points::{extract_points, Point};
use crate::rewrite::{rewrite_route, Dialect};
use crate::route::{element_at_mut, locate_route, vendor_folder_without_records};
use crate::{ConvertError, Result};
use serde::Serialize;
use std::collections::HashMap;
use xmltree::{Element, EmitterConfig};

const PREVIEW_LEN: usize = 5;

pub struct ConversionOutput {
    pub archive: Vec<u8>,
    pub report: ConversionReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub points: usize,
    pub documents: Vec<DocumentReport>,
    /// First few waypoints as `lon, lat, alt m`
    pub preview: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub entry: String,
    pub dialect: Dialect,
    pub vendor_namespace: String,
    pub records_found: usize,
    pub records_written: usize,
    pub path_updated: bool,
    pub count_field_updated: bool,
}

impl DocumentReport {
    pub fn added(&self) -> usize {
        self.records_written.saturating_sub(self.records_found)
    }

    pub fn removed(&self) -> usize {
        self.records_found.saturating_sub(self.records_written)
    }
}

/// Runs one conversion: seed KMZ bytes and a GeoJSON point file in, new KMZ bytes out.
/// Nothing is produced unless every mission document in the seed is rewritten.
pub fn convert(
    seed: Vec<u8>,
    points_doc: &[u8],
    options: &ConvertOptions,
) -> Result<ConversionOutput> {
    options.validate()?;
    options.limits.check_archive_size(seed.len())?;
    options.limits.check_points_size(points_doc.len())?;

    let points = extract_points(points_doc, options)?;
    options.limits.check_point_count(points.len())?;

    let mut archive = SeedArchive::open(seed)?;
    let mut replacements = HashMap::new();
    let mut documents = Vec::new();

    for (dialect, name) in archive.members() {
        let raw = archive.read_entry(&name, &options.limits)?;
        let (bytes, report) = rewrite_document(&raw, &name, dialect, &points)?;
        replacements.insert(name, bytes);
        documents.push(report);
    }

    let output = archive.write_with_replacements(&replacements)?;
    log::info!(
        "Converted {} waypoints into {} mission document(s), {} bytes",
        points.len(),
        documents.len(),
        output.len()
    );

    Ok(ConversionOutput {
        archive: output,
        report: ConversionReport {
            points: points.len(),
            documents,
            preview: points.iter().take(PREVIEW_LEN).map(preview_line).collect(),
        },
    })
}

/// Parses one mission document, rewrites its route folder and serializes it back.
pub fn rewrite_document(
    raw: &[u8],
    document: &str,
    dialect: Dialect,
    points: &[Point],
) -> Result<(Vec<u8>, DocumentReport)> {
    let mut root = parse_document(raw, document)?;
    let ns = NamespaceTable::resolve(&root, raw, document)?;
    let (path, records_found) = match locate_route(&root, &ns, document) {
        Ok(route) => (route.path, route.records),
        // A route folder that lost all of its placemarks still exists; let the
        // rewriter report the missing template rather than a missing route.
        Err(err @ ConvertError::RouteNotFound { .. }) => {
            match vendor_folder_without_records(&root, &ns) {
                Some(path) => (path, 0),
                None => return Err(err),
            }
        }
        Err(err) => return Err(err),
    };

    let folder = element_at_mut(&mut root, &path).ok_or_else(|| ConvertError::RouteNotFound {
        document: document.to_string(),
    })?;
    let summary = rewrite_route(folder, &ns, points, dialect, document)?;

    let report = DocumentReport {
        entry: document.to_string(),
        dialect,
        vendor_namespace: ns.wpml().to_string(),
        records_found,
        records_written: summary.written,
        path_updated: summary.path_updated,
        count_field_updated: summary.count_field_updated,
    };
    Ok((serialize_document(&root, document)?, report))
}

pub fn parse_document(raw: &[u8], document: &str) -> Result<Element> {
    Element::parse(raw).map_err(|e| ConvertError::Xml {
        document: document.to_string(),
        message: e.to_string(),
    })
}

pub fn serialize_document(root: &Element, document: &str) -> Result<Vec<u8>> {
    let config = EmitterConfig::new()
        .perform_indent(true)
        .write_document_declaration(true);
    let mut buf = Vec::new();
    root.write_with_config(&mut buf, config)
        .map_err(|e| ConvertError::Serialize {
            document: document.to_string(),
            message: e.to_string(),
        })?;
    Ok(buf)
}

fn preview_line(p: &Point) -> String {
    format!("{:.7}, {:.7}, {:.2}m", p.lon, p.lat, p.alt)
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub entries: Vec<ArchiveEntry>,
    pub routes: Vec<RouteInspection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteInspection {
    pub entry: String,
    pub dialect: Dialect,
    pub vendor_namespace: Option<String>,
    pub records: Option<usize>,
    pub score: Option<u32>,
    /// Why the document could not be converted, if it could not
    pub problem: Option<String>,
}

/// Lists the seed archive and reports what a conversion would find in each
/// mission document, without modifying anything.
pub fn inspect(seed: Vec<u8>) -> Result<InspectReport> {
    let limits = Limits::default();
    limits.check_archive_size(seed.len())?;
    let mut archive = SeedArchive::open(seed)?;
    let entries = archive.list_contents()?;
    let mut routes = Vec::new();

    for (dialect, name) in archive.members() {
        let raw = archive.read_entry(&name, &limits)?;
        let mut inspection = RouteInspection {
            entry: name.clone(),
            dialect,
            vendor_namespace: None,
            records: None,
            score: None,
            problem: None,
        };

        let found = parse_document(&raw, &name).and_then(|root| {
            let ns = NamespaceTable::resolve(&root, &raw, &name)?;
            inspection.vendor_namespace = Some(ns.wpml().to_string());
            locate_route(&root, &ns, &name)
        });
        match found {
            Ok(route) => {
                inspection.records = Some(route.records);
                inspection.score = Some(route.score);
            }
            Err(e) => inspection.problem = Some(e.to_string()),
        }
        routes.push(inspection);
    }

    Ok(InspectReport { entries, routes })
}
