// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

pub mod archive;
pub mod config;
pub mod convert;
pub mod namespace;
pub mod points;
pub mod rewrite;
pub mod route;

pub use config::{ConvertOptions, Limits};
pub use convert::{convert, ConversionOutput, ConversionReport, DocumentReport};
pub use points::{extract_points, Point};
pub use rewrite::Dialect;

use thiserror::Error;

/// Suggested file name for the archive handed back to the user.
pub const DEFAULT_OUTPUT_NAME: &str = "mission_from_qgis.kmz";

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Malformed point file: {0}")]
    MalformedInput(String),
    #[error("No vendor (wpml) namespace found in {document}")]
    NamespaceNotFound { document: String },
    #[error("No route folder with waypoint placemarks found in {document}")]
    RouteNotFound { document: String },
    #[error("Route folder in {document} has no waypoint placemark to use as a template")]
    NoTemplateRecord { document: String },
    #[error("Seed archive has no entry ending with '{suffix}'")]
    MissingMember { suffix: String },
    #[error("Seed archive has {count} entries ending with '{suffix}', expected exactly one")]
    AmbiguousMember { suffix: String, count: usize },
    #[error("Need at least 2 waypoints, found {found}")]
    InvalidGeometry { found: usize },
    #[error("{what} exceeds the supported maximum ({actual} > {limit})")]
    CapacityExceeded {
        what: &'static str,
        actual: usize,
        limit: usize,
    },
    #[error("Altitude override {0} m is outside the accepted range [0, 1200]")]
    InvalidAltitude(f64),
    #[error("Invalid XML in {document}: {message}")]
    Xml { document: String, message: String },
    #[error("Failed to serialize {document}: {message}")]
    Serialize { document: String, message: String },
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
