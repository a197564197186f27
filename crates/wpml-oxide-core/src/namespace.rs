// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::{ConvertError, Result};
use xml::reader::{EventReader, XmlEvent};
use xmltree::{Element, XMLNode};

pub const KML_PREFIX: &str = "kml";
pub const WPML_PREFIX: &str = "wpml";
pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Substrings identifying the DJI flight markup namespace. The version suffix
/// (`/1.0.2`, `/1.0.6`, ...) changes between Pilot 2 releases.
const VENDOR_MARKERS: &[&str] = &["dji.com/wpmz", "wpmz"];
const KML_MARKER: &str = "opengis.net/kml";

/// Resolved URIs for the generic map markup and the vendor flight markup of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceTable {
    kml: String,
    wpml: String,
}

impl NamespaceTable {
    pub fn new(kml: impl Into<String>, wpml: impl Into<String>) -> Self {
        Self {
            kml: kml.into(),
            wpml: wpml.into(),
        }
    }

    /// Builds the table for a parsed document. `raw` is the source the tree was
    /// parsed from; it is only re-read when no element carries the vendor namespace.
    pub fn resolve(root: &Element, raw: &[u8], document: &str) -> Result<Self> {
        let wpml = match find_vendor_in_tree(root) {
            Some(uri) => uri,
            None => {
                log::debug!("{}: no vendor-qualified element, scanning declarations", document);
                find_vendor_in_declarations(raw).ok_or_else(|| {
                    ConvertError::NamespaceNotFound {
                        document: document.to_string(),
                    }
                })?
            }
        };
        let kml = find_kml(root).unwrap_or_else(|| KML_NAMESPACE.to_string());
        log::debug!("{}: kml={} wpml={}", document, kml, wpml);
        Ok(Self { kml, wpml })
    }

    pub fn kml(&self) -> &str {
        &self.kml
    }

    pub fn wpml(&self) -> &str {
        &self.wpml
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        match prefix {
            KML_PREFIX => Some(&self.kml),
            WPML_PREFIX => Some(&self.wpml),
            _ => None,
        }
    }

    pub fn is_kml(&self, el: &Element, local: &str) -> bool {
        el.name == local && el.namespace.as_deref() == Some(self.kml.as_str())
    }

    pub fn is_wpml(&self, el: &Element) -> bool {
        el.namespace.as_deref() == Some(self.wpml.as_str())
    }

    pub fn is_wpml_named(&self, el: &Element, local: &str) -> bool {
        el.name == local && self.is_wpml(el)
    }
}

fn is_vendor_uri(uri: &str) -> bool {
    VENDOR_MARKERS.iter().any(|m| uri.contains(m))
}

/// Pre-order search for the first element whose namespace looks like the vendor's.
pub fn find_vendor_in_tree(root: &Element) -> Option<String> {
    if let Some(ns) = root.namespace.as_deref() {
        if is_vendor_uri(ns) {
            return Some(ns.to_string());
        }
    }
    root.children.iter().find_map(|child| match child {
        XMLNode::Element(el) => find_vendor_in_tree(el),
        _ => None,
    })
}

/// Re-reads the document looking at namespace bindings rather than element names.
pub fn find_vendor_in_declarations(raw: &[u8]) -> Option<String> {
    for event in EventReader::new(raw) {
        match event {
            Ok(XmlEvent::StartElement { namespace, .. }) => {
                if let Some(uri) = namespace.0.values().find(|uri| is_vendor_uri(uri)) {
                    return Some(uri.clone());
                }
            }
            Ok(XmlEvent::EndDocument) | Err(_) => break,
            Ok(_) => {}
        }
    }
    None
}

fn find_kml(root: &Element) -> Option<String> {
    if let Some(ns) = root.namespace.as_deref() {
        if ns.contains(KML_MARKER) {
            return Some(ns.to_string());
        }
    }
    root.children.iter().find_map(|child| match child {
        XMLNode::Element(el) => find_kml(el),
        _ => None,
    })
}
