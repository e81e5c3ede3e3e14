//! Streaming reader for OGC GetCapabilities documents.
//!
//! Works on local element names, so WMS 1.1/1.3, WFS 1.0-2.0, WCS 1.0-2.0 and
//! WMTS 1.0 documents share one code path.

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

use super::MetadataError;
use crate::domain::time::parse_iso8601;
use crate::domain::{Envelope, TimeRange};

const LAYER_ELEMENTS: &[&str] = &[
    "Layer",
    "FeatureType",
    "CoverageSummary",
    "CoverageOfferingBrief",
];

const SERVICE_ELEMENTS: &[&str] = &["Service", "ServiceIdentification"];

const BBOX_ELEMENTS: &[&str] = &[
    "EX_GeographicBoundingBox",
    "LatLonBoundingBox",
    "WGS84BoundingBox",
    "lonLatEnvelope",
];

#[derive(Debug, Clone, PartialEq)]
pub struct CapabilitiesLayer {
    pub name: String,
    pub title: Option<String>,
    pub bbox: Option<Envelope>,
}

/// Everything read from one capabilities document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    pub author: Option<String>,
    pub copyright: Option<String>,
    pub license: Option<String>,
    pub language: Option<String>,
    pub layers: Vec<CapabilitiesLayer>,
    /// Union of all layer boxes, including unnamed group layers.
    pub bbox: Option<Envelope>,
    pub time: TimeRange,
}

struct Frame {
    name: String,
    attributes: HashMap<String, String>,
    text: String,
    has_children: bool,
}

#[derive(Default)]
struct PendingBox {
    west: Option<f64>,
    south: Option<f64>,
    east: Option<f64>,
    north: Option<f64>,
}

impl PendingBox {
    fn finish(&mut self) -> Option<Envelope> {
        let pending = std::mem::take(self);
        let (west, south, east, north) = (
            pending.west?,
            pending.south?,
            pending.east?,
            pending.north?,
        );
        Some(Envelope::new(
            west.min(east),
            south.min(north),
            west.max(east),
            south.max(north),
        ))
    }

    fn set_corner(&mut self, lower: bool, text: &str) {
        let mut coords = text.split_whitespace().filter_map(|v| v.parse::<f64>().ok());
        let (Some(x), Some(y)) = (coords.next(), coords.next()) else {
            return;
        };
        if lower {
            self.west = Some(x);
            self.south = Some(y);
        } else {
            self.east = Some(x);
            self.north = Some(y);
        }
    }
}

#[derive(Default)]
struct LayerBuilder {
    name: Option<String>,
    title: Option<String>,
    bbox: Option<Envelope>,
    pending: PendingBox,
}

#[derive(Default)]
struct Collector {
    caps: Capabilities,
    frames: Vec<Frame>,
    layers: Vec<LayerBuilder>,
    contact_person: Option<String>,
    time_start: Option<DateTime<Utc>>,
    time_end: Option<DateTime<Utc>>,
    saw_root: bool,
}

fn xml_err(err: impl std::fmt::Display) -> MetadataError {
    MetadataError::Xml(err.to_string())
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn read_attributes(start: &BytesStart<'_>) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    for attr in start.attributes().flatten() {
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = unescape(&raw).map_or_else(|_| raw.clone(), |v| v.into_owned());
        let key = if attr.key.as_ref() == b"xml:lang" {
            "xml:lang".to_string()
        } else {
            String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned()
        };
        attributes.insert(key, value);
    }
    attributes
}

/// Collapses runs of whitespace and returns `None` for blank values.
fn clean(text: &str) -> Option<String> {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// Servers fill unused constraint fields with "none".
fn meaningful(text: &str) -> Option<String> {
    clean(text).filter(|v| !v.eq_ignore_ascii_case("none"))
}

impl Collector {
    fn in_service(&self) -> bool {
        self.frames
            .iter()
            .any(|f| SERVICE_ELEMENTS.contains(&f.name.as_str()))
    }

    fn parent_name(&self) -> Option<&str> {
        self.frames.last().map(|f| f.name.as_str())
    }

    fn open(&mut self, start: &BytesStart<'_>) -> Result<(), MetadataError> {
        let name = local_name(start);
        if !self.saw_root {
            if !name.contains("Capabilities") {
                return Err(MetadataError::NotCapabilities(name));
            }
            self.saw_root = true;
        }

        let attributes = read_attributes(start);
        if self.caps.language.is_none()
            && let Some(lang) = attributes.get("xml:lang")
        {
            self.caps.language = clean(lang);
        }

        if LAYER_ELEMENTS.contains(&name.as_str()) {
            self.layers.push(LayerBuilder::default());
        }

        if let Some(parent) = self.frames.last_mut() {
            parent.has_children = true;
        }
        self.frames.push(Frame {
            name,
            attributes,
            text: String::new(),
            has_children: false,
        });
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.text.push_str(text);
        }
    }

    fn close(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let parent = self.parent_name().unwrap_or_default().to_string();
        let direct_layer_child = LAYER_ELEMENTS.contains(&parent.as_str());

        match frame.name.as_str() {
            "Title" | "label" if direct_layer_child => {
                if let Some(layer) = self.layers.last_mut() {
                    layer.title = layer.title.take().or_else(|| clean(&frame.text));
                }
            }
            "Name" | "Identifier" | "CoverageId" | "name" if direct_layer_child => {
                if let Some(layer) = self.layers.last_mut() {
                    layer.name = layer.name.take().or_else(|| clean(&frame.text));
                }
            }
            "Title" if SERVICE_ELEMENTS.contains(&parent.as_str()) => {
                self.caps.title = self.caps.title.take().or_else(|| clean(&frame.text));
            }
            "Abstract" if SERVICE_ELEMENTS.contains(&parent.as_str()) => {
                self.caps.abstract_text =
                    self.caps.abstract_text.take().or_else(|| clean(&frame.text));
            }
            "Keyword" if self.in_service() && self.layers.is_empty() => {
                if let Some(keyword) = clean(&frame.text) {
                    self.caps.keywords.push(keyword);
                }
            }
            "Keywords" if !frame.has_children && self.in_service() && self.layers.is_empty() => {
                self.caps
                    .keywords
                    .extend(frame.text.split(',').filter_map(clean));
            }
            "Fees" if self.in_service() => {
                self.caps.license = self.caps.license.take().or_else(|| meaningful(&frame.text));
            }
            "AccessConstraints" if self.in_service() => {
                self.caps.copyright = self
                    .caps
                    .copyright
                    .take()
                    .or_else(|| meaningful(&frame.text));
            }
            "ContactOrganization" | "ProviderName" => {
                self.caps.author = self.caps.author.take().or_else(|| clean(&frame.text));
            }
            "ContactPerson" | "IndividualName" => {
                self.contact_person = self.contact_person.take().or_else(|| clean(&frame.text));
            }
            "westBoundLongitude" | "eastBoundLongitude" | "southBoundLatitude"
            | "northBoundLatitude" => self.bound(&frame),
            "LowerCorner" | "UpperCorner" => {
                if let Some(layer) = self.layers.last_mut() {
                    layer
                        .pending
                        .set_corner(frame.name == "LowerCorner", &frame.text);
                }
            }
            "pos" if parent == "lonLatEnvelope" => {
                if let Some(layer) = self.layers.last_mut() {
                    let lower = layer.pending.west.is_none();
                    layer.pending.set_corner(lower, &frame.text);
                }
            }
            "Dimension" | "Extent" => self.time_extent(&frame),
            name if BBOX_ELEMENTS.contains(&name) => self.finish_bbox(&frame),
            name if LAYER_ELEMENTS.contains(&name) => self.finish_layer(),
            _ => {}
        }
    }

    fn bound(&mut self, frame: &Frame) {
        let Some(layer) = self.layers.last_mut() else {
            return;
        };
        let value = frame.text.trim().parse::<f64>().ok();
        let pending = &mut layer.pending;
        match frame.name.as_str() {
            "westBoundLongitude" => pending.west = value,
            "eastBoundLongitude" => pending.east = value,
            "southBoundLatitude" => pending.south = value,
            _ => pending.north = value,
        }
    }

    fn finish_bbox(&mut self, frame: &Frame) {
        let Some(layer) = self.layers.last_mut() else {
            return;
        };
        if frame.name == "LatLonBoundingBox" {
            let attr = |key: &str| {
                frame
                    .attributes
                    .get(key)
                    .and_then(|v| v.trim().parse::<f64>().ok())
            };
            layer.pending = PendingBox {
                west: attr("minx"),
                south: attr("miny"),
                east: attr("maxx"),
                north: attr("maxy"),
            };
        }
        let envelope = layer.pending.finish();
        if layer.bbox.is_none() {
            layer.bbox = envelope;
        }
    }

    fn finish_layer(&mut self) {
        let Some(layer) = self.layers.pop() else {
            return;
        };
        // Group layers pass their extent on to children that declare none.
        let bbox = layer
            .bbox
            .or_else(|| self.layers.iter().rev().find_map(|l| l.bbox));

        if let Some(envelope) = layer.bbox {
            self.caps.bbox = Some(match self.caps.bbox {
                Some(total) => total.union(envelope),
                None => envelope,
            });
        }

        if let Some(name) = layer.name {
            self.caps.layers.push(CapabilitiesLayer {
                name,
                title: layer.title,
                bbox,
            });
        }
    }

    fn time_extent(&mut self, frame: &Frame) {
        let is_time = frame
            .attributes
            .get("name")
            .is_some_and(|n| n.eq_ignore_ascii_case("time"));
        if !is_time {
            return;
        }

        let values: Vec<&str> = frame
            .text
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        let (Some(first), Some(last)) = (values.first(), values.last()) else {
            return;
        };

        let start = first.split('/').next().and_then(parse_iso8601);
        let end = if last.contains('/') {
            last.split('/').nth(1).and_then(parse_iso8601)
        } else {
            parse_iso8601(last)
        };

        if let Some(start) = start {
            self.time_start = Some(self.time_start.map_or(start, |s| s.min(start)));
        }
        if let Some(end) = end {
            self.time_end = Some(self.time_end.map_or(end, |e| e.max(end)));
        }
    }

    fn finish(mut self) -> Result<Capabilities, MetadataError> {
        if !self.saw_root {
            return Err(MetadataError::Xml("empty document".to_string()));
        }
        if self.caps.author.is_none() {
            self.caps.author = self.contact_person;
        }
        if self.caps.title.is_none() {
            self.caps.title = self.caps.layers.iter().find_map(|l| l.title.clone());
        }
        self.caps.time = TimeRange::new(self.time_start, self.time_end);
        Ok(self.caps)
    }
}

/// Parses a capabilities document of any supported OGC service.
pub fn parse_capabilities(xml: &str) -> Result<Capabilities, MetadataError> {
    let mut reader = Reader::from_str(xml);
    let mut collector = Collector::default();

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(start) => collector.open(&start)?,
            Event::Empty(start) => {
                collector.open(&start)?;
                collector.close();
            }
            Event::End(_) => collector.close(),
            Event::Text(text) => collector.push_text(&text.decode().map_err(xml_err)?),
            Event::CData(data) => {
                collector.push_text(&String::from_utf8_lossy(&data.into_inner()));
            }
            Event::GeneralRef(reference) => {
                let entity = reference.decode().map_err(xml_err)?;
                if let Some(resolved) = resolve_predefined_entity(&entity) {
                    collector.push_text(resolved);
                } else if let Some(ch) = reference.resolve_char_ref().map_err(xml_err)? {
                    collector.push_text(ch.encode_utf8(&mut [0; 4]));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    collector.finish()
}
