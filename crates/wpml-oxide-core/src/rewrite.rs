// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::namespace::NamespaceTable;
use crate::points::Point;
use crate::route::{child_elements, is_waypoint_record};
use crate::{ConvertError, Result};
use serde::Serialize;
use xmltree::{Element, XMLNode};

/// Which of the two mission documents a route folder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dialect {
    /// `template.kml`: 3D coordinates, 1-based indices.
    Template,
    /// `waylines.wpml`: 2D coordinates plus `executeHeight`, 0-based indices.
    Waylines,
}

impl Dialect {
    pub fn member_suffix(self) -> &'static str {
        match self {
            Dialect::Template => "template.kml",
            Dialect::Waylines => "waylines.wpml",
        }
    }

    pub fn index_offset(self) -> usize {
        match self {
            Dialect::Template => 1,
            Dialect::Waylines => 0,
        }
    }

    pub fn record_coordinates(self, p: &Point) -> String {
        match self {
            Dialect::Template => format!("{},{:.2}", format_lon_lat(p), p.alt),
            Dialect::Waylines => format_lon_lat(p),
        }
    }

    /// The waylines path is drawn ground-projected.
    pub fn path_coordinates(self, p: &Point) -> String {
        match self {
            Dialect::Template => format!("{},{:.2}", format_lon_lat(p), p.alt),
            Dialect::Waylines => format!("{},0", format_lon_lat(p)),
        }
    }
}

pub fn format_lon_lat(p: &Point) -> String {
    format!("{:.7},{:.7}", p.lon, p.lat)
}

pub fn format_height(alt: f64) -> String {
    format!("{:.2}", alt)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteSummary {
    pub removed: usize,
    pub written: usize,
    pub path_updated: bool,
    pub count_field_updated: bool,
}

/// Replaces the waypoint placemarks of `folder` with one clone of its last
/// placemark per point. `points` must already be validated (at least two).
pub fn rewrite_route(
    folder: &mut Element,
    ns: &NamespaceTable,
    points: &[Point],
    dialect: Dialect,
    document: &str,
) -> Result<RewriteSummary> {
    let template = child_elements(folder)
        .filter(|c| is_waypoint_record(c, ns))
        .last()
        .cloned()
        .ok_or_else(|| ConvertError::NoTemplateRecord {
            document: document.to_string(),
        })?;

    if !child_elements(&template).any(|c| ns.is_wpml_named(c, "index")) {
        log::warn!("{}: template placemark has no wpml:index, indices not written", document);
    }
    if dialect == Dialect::Waylines
        && !child_elements(&template).any(|c| ns.is_wpml_named(c, "executeHeight"))
    {
        log::warn!("{}: template placemark has no wpml:executeHeight, altitudes dropped", document);
    }

    let records: Vec<Element> = points
        .iter()
        .enumerate()
        .map(|(i, p)| build_record(&template, ns, p, i + dialect.index_offset(), dialect))
        .collect();

    let before = folder.children.len();
    folder
        .children
        .retain(|c| !matches!(c, XMLNode::Element(e) if is_waypoint_record(e, ns)));
    let removed = before - folder.children.len();

    let mut summary = RewriteSummary {
        removed,
        written: records.len(),
        ..Default::default()
    };

    if let Some(coords) = find_path_coordinates(folder, ns) {
        let line = points
            .iter()
            .map(|p| dialect.path_coordinates(p))
            .collect::<Vec<_>>()
            .join(" ");
        set_text(coords, line);
        summary.path_updated = true;
    }

    if dialect == Dialect::Waylines {
        match find_mut(folder, &|e: &Element| ns.is_wpml(e) && is_count_field(&e.name)) {
            Some(field) => {
                set_text(field, points.len().to_string());
                summary.count_field_updated = true;
            }
            None => log::debug!("{}: no waypoint count field to update", document),
        }
    }

    folder
        .children
        .extend(records.into_iter().map(XMLNode::Element));

    log::info!(
        "{}: replaced {} placemarks with {} ({:?})",
        document,
        summary.removed,
        summary.written,
        dialect
    );
    Ok(summary)
}

fn build_record(
    template: &Element,
    ns: &NamespaceTable,
    point: &Point,
    index: usize,
    dialect: Dialect,
) -> Element {
    let mut record = template.clone();

    if let Some(geometry) = find_child_mut(&mut record, &|e: &Element| ns.is_kml(e, "Point")) {
        let coords = match geometry
            .children
            .iter()
            .position(|c| matches!(c, XMLNode::Element(e) if ns.is_kml(e, "coordinates")))
        {
            Some(pos) => pos,
            None => {
                let el = new_child_like(geometry, "coordinates", ns.kml());
                geometry.children.push(XMLNode::Element(el));
                geometry.children.len() - 1
            }
        };
        if let XMLNode::Element(el) = &mut geometry.children[coords] {
            set_text(el, dialect.record_coordinates(point));
        }
    }

    if dialect == Dialect::Waylines {
        if let Some(height) =
            find_child_mut(&mut record, &|e: &Element| ns.is_wpml_named(e, "executeHeight"))
        {
            set_text(height, format_height(point.alt));
        }
    }

    if let Some(idx) = find_child_mut(&mut record, &|e: &Element| ns.is_wpml_named(e, "index")) {
        set_text(idx, index.to_string());
    }

    record
}

fn is_count_field(local: &str) -> bool {
    let lower = local.to_lowercase();
    lower.contains("waypoint") && (lower.contains("num") || lower.contains("count"))
}

fn find_path_coordinates<'a>(folder: &'a mut Element, ns: &NamespaceTable) -> Option<&'a mut Element> {
    let line = find_mut(folder, &|e: &Element| ns.is_kml(e, "LineString"))?;
    find_child_mut(line, &|e: &Element| ns.is_kml(e, "coordinates"))
}

fn new_child_like(parent: &Element, name: &str, namespace: &str) -> Element {
    let mut el = Element::new(name);
    el.namespace = Some(namespace.to_string());
    el.prefix = parent.prefix.clone();
    el.namespaces = parent.namespaces.clone();
    el
}

pub fn set_text(el: &mut Element, text: String) {
    el.children
        .retain(|c| !matches!(c, XMLNode::Text(_) | XMLNode::CData(_)));
    el.children.push(XMLNode::Text(text));
}

fn find_child_mut<'a>(
    el: &'a mut Element,
    pred: &dyn Fn(&Element) -> bool,
) -> Option<&'a mut Element> {
    el.children.iter_mut().find_map(|c| match c {
        XMLNode::Element(e) if pred(&*e) => Some(e),
        _ => None,
    })
}

/// Depth-first search below `el`, not including `el` itself.
fn find_mut<'a>(el: &'a mut Element, pred: &dyn Fn(&Element) -> bool) -> Option<&'a mut Element> {
    for child in el.children.iter_mut() {
        if let XMLNode::Element(c) = child {
            if pred(c) {
                return Some(c);
            }
            if let Some(found) = find_mut(c, pred) {
                return Some(found);
            }
        }
    }
    None
}
