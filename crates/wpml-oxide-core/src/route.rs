// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::namespace::NamespaceTable;
use crate::{ConvertError, Result};
use xmltree::{Element, XMLNode};

/// Bonus for a container whose subtree carries vendor flight metadata.
pub const VENDOR_BONUS: u32 = 100;

/// Child indices leading from the document root to an element.
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub path: NodePath,
    pub score: u32,
    pub records: usize,
}

/// A `Placemark` with a direct `Point` child.
pub fn is_waypoint_record(el: &Element, ns: &NamespaceTable) -> bool {
    ns.is_kml(el, "Placemark") && child_elements(el).any(|c| ns.is_kml(c, "Point"))
}

pub fn count_waypoint_records(container: &Element, ns: &NamespaceTable) -> usize {
    child_elements(container)
        .filter(|c| is_waypoint_record(c, ns))
        .count()
}

pub fn child_elements(el: &Element) -> impl Iterator<Item = &Element> {
    el.children.iter().filter_map(|c| match c {
        XMLNode::Element(e) => Some(e),
        _ => None,
    })
}

fn has_vendor_descendant(el: &Element, ns: &NamespaceTable) -> bool {
    child_elements(el).any(|c| ns.is_wpml(c) || has_vendor_descendant(c, ns))
}

/// `None` when the container holds no waypoint records and cannot be the route.
pub fn score_candidate(container: &Element, ns: &NamespaceTable) -> Option<u32> {
    let records = count_waypoint_records(container, ns);
    if records == 0 {
        return None;
    }
    let bonus = if has_vendor_descendant(container, ns) {
        VENDOR_BONUS
    } else {
        0
    };
    Some(records as u32 + bonus)
}

/// Highest score wins; on a tie the earliest candidate is kept.
pub fn select_best<T>(scored: impl IntoIterator<Item = (u32, T)>) -> Option<(u32, T)> {
    let mut best: Option<(u32, T)> = None;
    for (score, item) in scored {
        if best.as_ref().map_or(true, |(top, _)| score > *top) {
            best = Some((score, item));
        }
    }
    best
}

/// Every `Document` and every `Folder` nested in one, in document order.
pub fn collect_candidates<'a>(
    root: &'a Element,
    ns: &NamespaceTable,
) -> Vec<(NodePath, &'a Element)> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk(root, ns, false, &mut path, &mut out);
    out
}

fn walk<'a>(
    el: &'a Element,
    ns: &NamespaceTable,
    in_document: bool,
    path: &mut NodePath,
    out: &mut Vec<(NodePath, &'a Element)>,
) {
    let is_document = ns.is_kml(el, "Document");
    if is_document || (in_document && ns.is_kml(el, "Folder")) {
        out.push((path.clone(), el));
    }
    for (i, child) in el.children.iter().enumerate() {
        if let XMLNode::Element(c) = child {
            path.push(i);
            walk(c, ns, in_document || is_document, path, out);
            path.pop();
        }
    }
}

pub fn locate_route(root: &Element, ns: &NamespaceTable, document: &str) -> Result<RouteMatch> {
    let scored = collect_candidates(root, ns)
        .into_iter()
        .filter_map(|(path, el)| {
            let score = score_candidate(el, ns)?;
            log::debug!("{}: candidate {:?} <{}> score {}", document, path, el.name, score);
            Some((score, (path, el)))
        });

    let (score, (path, el)) = select_best(scored).ok_or_else(|| ConvertError::RouteNotFound {
        document: document.to_string(),
    })?;

    Ok(RouteMatch {
        records: count_waypoint_records(el, ns),
        path,
        score,
    })
}

/// First `Folder` carrying vendor metadata but no waypoint records. Used to tell
/// an emptied route apart from a document that has no route at all.
pub fn vendor_folder_without_records(root: &Element, ns: &NamespaceTable) -> Option<NodePath> {
    collect_candidates(root, ns)
        .into_iter()
        .find(|(_, el)| {
            ns.is_kml(el, "Folder")
                && count_waypoint_records(el, ns) == 0
                && has_vendor_descendant(el, ns)
        })
        .map(|(path, _)| path)
}

pub fn element_at_mut<'a>(root: &'a mut Element, path: &[usize]) -> Option<&'a mut Element> {
    let mut current = root;
    for &i in path {
        current = match current.children.get_mut(i)? {
            XMLNode::Element(el) => el,
            _ => return None,
        };
    }
    Some(current)
}
