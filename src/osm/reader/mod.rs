// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use graph_builder::GraphBuilder;

use crate::Graph;

mod graph_builder;
mod model;
mod xml;

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum FileFormat {
    /// Unknown format - guess the format based on the content
    #[default]
    Unknown,

    /// Force uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,
}

impl FileFormat {
    /// Guesses the format from the first bytes of the data.
    /// Anything which is not gzip or bzip2 is assumed to be plain XML.
    pub fn detect(prefix: &[u8]) -> Self {
        if prefix.starts_with(&[0x1f, 0x8b]) {
            Self::XmlGz
        } else if prefix.starts_with(b"BZh") {
            Self::XmlBz2
        } else {
            Self::Xml
        }
    }
}

/// Error which can occur when loading OSM data with [parse_io], [parse_file] or [parse_buffer].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Parses an OSM XML document into a [Graph].
///
/// This function never fails: malformed nodes, ways without a `highway` tag,
/// way segments referencing unknown nodes and incomplete turn restrictions
/// are skipped. If the document itself is not well-formed, every feature read
/// before the syntax error is kept.
pub fn parse(text: &str) -> Graph {
    let mut b = GraphBuilder::default();
    if let Err(e) = b.add_features(xml::Reader::from_buffer(text.as_bytes())) {
        log::warn!("malformed OSM XML, keeping features read so far: {}", e);
    }
    b.finish()
}

/// Parse OSM features from a reader into a [Graph].
///
/// The provided stream will be automatically wrapped in a buffered reader and
/// decompressed as per `format`.
pub fn parse_io<R: io::Read>(reader: R, format: FileFormat) -> Result<Graph, Error> {
    let mut b = io::BufReader::new(reader);

    let format = match format {
        FileFormat::Unknown => FileFormat::detect(b.fill_buf()?),
        known => known,
    };

    match format {
        FileFormat::Unknown | FileFormat::Xml => build(xml::Reader::from_io(b)),

        FileFormat::XmlGz => {
            let d = flate2::read::MultiGzDecoder::new(b);
            build(xml::Reader::from_io(io::BufReader::new(d)))
        }

        FileFormat::XmlBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(b);
            build(xml::Reader::from_io(io::BufReader::new(d)))
        }
    }
}

/// Parse OSM features from a file at the provided path into a [Graph].
pub fn parse_file<P: AsRef<Path>>(path: P, format: FileFormat) -> Result<Graph, Error> {
    let f = File::open(path)?;
    parse_io(f, format)
}

/// Parse OSM features from an in-memory buffer into a [Graph].
pub fn parse_buffer(data: &[u8], format: FileFormat) -> Result<Graph, Error> {
    let format = match format {
        FileFormat::Unknown => FileFormat::detect(data),
        known => known,
    };

    if format == FileFormat::Xml {
        // Fast path is available for in-memory XML data
        build(xml::Reader::from_buffer(data))
    } else {
        parse_io(io::Cursor::new(data), format)
    }
}

fn build<I, E>(features: I) -> Result<Graph, Error>
where
    I: IntoIterator<Item = Result<model::Feature, E>>,
    Error: From<E>,
{
    let mut b = GraphBuilder::default();
    b.add_features(features)?;
    Ok(b.finish())
}
