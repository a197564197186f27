// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::config::Limits;
use crate::rewrite::Dialect;
use crate::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveEntry {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    pub compressed_size: u64,
    pub compression: String,
    /// Set on the mission documents a conversion rewrites
    pub rewritten: bool,
}

/// A KMZ exported from DJI Pilot 2, held in memory.
pub struct SeedArchive {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    names: Vec<String>,
    waylines: String,
    template: Option<String>,
}

impl SeedArchive {
    /// Opens the archive and locates its mission documents. `waylines.wpml` is
    /// required, `template.kml` is optional.
    pub fn open(bytes: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            names.push(archive.by_index(i)?.name().to_string());
        }

        let waylines = find_member(&names, Dialect::Waylines.member_suffix())?.ok_or_else(|| {
            ConvertError::MissingMember {
                suffix: Dialect::Waylines.member_suffix().to_string(),
            }
        })?;
        let template = find_member(&names, Dialect::Template.member_suffix())?;

        log::info!(
            "Seed archive: {} entries, waylines={} template={}",
            names.len(),
            waylines,
            template.as_deref().unwrap_or("-")
        );

        Ok(Self {
            archive,
            names,
            waylines,
            template,
        })
    }

    pub fn entry_names(&self) -> &[String] {
        &self.names
    }

    pub fn member(&self, dialect: Dialect) -> Option<&str> {
        match dialect {
            Dialect::Waylines => Some(&self.waylines),
            Dialect::Template => self.template.as_deref(),
        }
    }

    /// Mission documents present in the archive, template first.
    pub fn members(&self) -> Vec<(Dialect, String)> {
        [Dialect::Template, Dialect::Waylines]
            .into_iter()
            .filter_map(|d| self.member(d).map(|name| (d, name.to_string())))
            .collect()
    }

    pub fn list_contents(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let file = self.archive.by_index(i)?;
            let name = file.name().to_string();
            entries.push(ArchiveEntry {
                rewritten: name == self.waylines || Some(&name) == self.template.as_ref(),
                path: name,
                is_dir: file.is_dir(),
                size: file.size(),
                compressed_size: file.compressed_size(),
                compression: format!("{:?}", file.compression()),
            });
        }
        Ok(entries)
    }

    /// Decompresses one entry. The declared size is checked up front and the
    /// decompressed output is capped at `limits.max_entry_bytes`.
    pub fn read_entry(&mut self, name: &str, limits: &Limits) -> Result<Vec<u8>> {
        let file = self.archive.by_name(name)?;
        let declared = usize::try_from(file.size()).unwrap_or(usize::MAX);
        limits.check_entry_size(declared)?;

        let cap = limits.max_entry_bytes as u64 + 1;
        let mut buf = Vec::with_capacity(declared);
        file.take(cap).read_to_end(&mut buf)?;
        limits.check_entry_size(buf.len())?;
        Ok(buf)
    }

    /// Writes a new archive with every entry of the seed in its original order.
    /// Entries named in `replacements` get the new content under their original
    /// compression, timestamp and permissions; the rest are raw-copied.
    pub fn write_with_replacements(
        &mut self,
        replacements: &HashMap<String, Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for i in 0..self.archive.len() {
            let file = self.archive.by_index(i)?;
            match replacements.get(file.name()) {
                Some(content) => {
                    let mut options =
                        SimpleFileOptions::default().compression_method(file.compression());
                    if let Some(modified) = file.last_modified() {
                        options = options.last_modified_time(modified);
                    }
                    if let Some(mode) = file.unix_mode() {
                        options = options.unix_permissions(mode);
                    }
                    let name = file.name().to_string();
                    drop(file);

                    log::debug!("Writing rewritten entry {} ({} bytes)", name, content.len());
                    writer.start_file(name, options)?;
                    writer.write_all(content)?;
                }
                None => writer.raw_copy_file(file)?,
            }
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// Case-insensitive suffix match. More than one hit is an error.
pub fn find_member(names: &[String], suffix: &str) -> Result<Option<String>> {
    let suffix = suffix.to_lowercase();
    let hits: Vec<&String> = names
        .iter()
        .filter(|n| n.to_lowercase().ends_with(&suffix))
        .collect();

    match hits.as_slice() {
        [] => Ok(None),
        [one] => Ok(Some((*one).clone())),
        many => Err(ConvertError::AmbiguousMember {
            suffix,
            count: many.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::{CompressionMethod, DateTime};

    fn build(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_find_member_case_insensitive() {
        let names = vec!["wpmz/res/".to_string(), "wpmz/WAYLINES.WPML".to_string()];
        assert_eq!(
            find_member(&names, "waylines.wpml").unwrap(),
            Some("wpmz/WAYLINES.WPML".to_string())
        );
        assert_eq!(find_member(&names, "template.kml").unwrap(), None);
    }

    #[test]
    fn test_find_member_rejects_duplicates() {
        let names = vec!["a/waylines.wpml".to_string(), "b/waylines.wpml".to_string()];
        assert!(matches!(
            find_member(&names, "waylines.wpml"),
            Err(ConvertError::AmbiguousMember { count: 2, .. })
        ));
    }

    #[test]
    fn test_open_requires_waylines() {
        let bytes = build(&[("wpmz/template.kml", "<kml/>")]);
        match SeedArchive::open(bytes) {
            Err(ConvertError::MissingMember { suffix }) => assert_eq!(suffix, "waylines.wpml"),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("archive without waylines accepted"),
        }
    }

    #[test]
    fn test_replacement_keeps_order_and_other_entries() {
        let bytes = build(&[
            ("wpmz/template.kml", "<old-template/>"),
            ("wpmz/res/readme.txt", "keep me"),
            ("wpmz/waylines.wpml", "<old-waylines/>"),
        ]);
        let mut seed = SeedArchive::open(bytes).unwrap();
        assert_eq!(seed.member(Dialect::Template), Some("wpmz/template.kml"));
        assert_eq!(seed.members().len(), 2);

        let listing = seed.list_contents().unwrap();
        assert_eq!(listing.iter().filter(|e| e.rewritten).count(), 2);

        let mut replacements = HashMap::new();
        replacements.insert("wpmz/waylines.wpml".to_string(), b"<new/>".to_vec());
        let out = seed.write_with_replacements(&replacements).unwrap();

        let limits = Limits::default();
        let mut rewritten = SeedArchive::open(out).unwrap();
        assert_eq!(rewritten.entry_names(), seed.entry_names());
        assert_eq!(rewritten.read_entry("wpmz/waylines.wpml", &limits).unwrap(), b"<new/>");
        assert_eq!(rewritten.read_entry("wpmz/res/readme.txt", &limits).unwrap(), b"keep me");
        assert_eq!(
            rewritten.read_entry("wpmz/template.kml", &limits).unwrap(),
            b"<old-template/>"
        );
    }

    #[test]
    fn test_replacement_keeps_compression_and_timestamp() {
        let stamp = DateTime::from_date_and_time(2024, 5, 6, 7, 8, 10).unwrap();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(stamp);
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(stamp);
        writer.start_file("wpmz/template.kml", deflated).unwrap();
        writer.write_all(b"<old-template/>").unwrap();
        writer.start_file("wpmz/waylines.wpml", stored).unwrap();
        writer.write_all(b"<old-waylines/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let mut seed = SeedArchive::open(bytes).unwrap();
        let mut replacements = HashMap::new();
        replacements.insert("wpmz/template.kml".to_string(), b"<new-template/>".to_vec());
        replacements.insert("wpmz/waylines.wpml".to_string(), b"<new-waylines/>".to_vec());
        let out = seed.write_with_replacements(&replacements).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(out)).unwrap();
        let waylines = archive.by_name("wpmz/waylines.wpml").unwrap();
        assert_eq!(waylines.compression(), CompressionMethod::Stored);
        assert_eq!(waylines.last_modified(), Some(stamp));
        drop(waylines);
        let template = archive.by_name("wpmz/template.kml").unwrap();
        assert_eq!(template.compression(), CompressionMethod::Deflated);
        assert_eq!(template.last_modified(), Some(stamp));
    }

    #[test]
    fn test_read_entry_caps_decompressed_size() {
        // 4 MiB of zeros deflates to a few KiB
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file("wpmz/waylines.wpml", deflated).unwrap();
        writer.write_all(&vec![0u8; 4 * 1024 * 1024]).unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert!(bytes.len() < 64 * 1024);

        let limits = Limits {
            max_entry_bytes: 1024 * 1024,
            ..Limits::default()
        };
        let mut seed = SeedArchive::open(bytes).unwrap();
        match seed.read_entry("wpmz/waylines.wpml", &limits) {
            Err(ConvertError::CapacityExceeded { limit, .. }) => assert_eq!(limit, 1024 * 1024),
            Err(e) => panic!("unexpected error {}", e),
            Ok(data) => panic!("read {} bytes past the limit", data.len()),
        }
        assert_eq!(
            seed.read_entry("wpmz/waylines.wpml", &Limits::default())
                .unwrap()
                .len(),
            4 * 1024 * 1024
        );
    }
}
