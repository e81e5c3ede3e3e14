//! OGC web services (WMS, WFS, WCS, WMTS).

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;
use url::Url;

use super::capabilities::{Capabilities, parse_capabilities};
use super::{MetadataError, MetadataParser};
use crate::models::{Geodata, Layer, ParsedMetadata};

/// Query keys that select an OGC operation rather than the service itself.
const REQUEST_KEYS: &[&str] = &["service", "request", "version", "acceptversions"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OgcService {
    Wms,
    Wfs,
    Wcs,
    Wmts,
}

impl OgcService {
    pub const ALL: [Self; 4] = [Self::Wms, Self::Wfs, Self::Wcs, Self::Wmts];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Wms => "wms",
            Self::Wfs => "wfs",
            Self::Wcs => "wcs",
            Self::Wmts => "wmts",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wms => "OGC Web Map Service",
            Self::Wfs => "OGC Web Feature Service",
            Self::Wcs => "OGC Web Coverage Service",
            Self::Wmts => "OGC Web Map Tile Service",
        }
    }

    /// Value of the `service` request parameter.
    #[must_use]
    pub const fn parameter(self) -> &'static str {
        match self {
            Self::Wms => "WMS",
            Self::Wfs => "WFS",
            Self::Wcs => "WCS",
            Self::Wmts => "WMTS",
        }
    }
}

/// Normalises a service URL so that different GetCapabilities or GetMap
/// links to the same service compare equal.
///
/// Unparsable input is returned trimmed but otherwise untouched.
#[must_use]
pub fn canonical_url(raw: &str) -> String {
    let raw = raw.trim();
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| {
            !REQUEST_KEYS
                .iter()
                .any(|k| key.eq_ignore_ascii_case(k))
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    url.to_string()
}

/// GetCapabilities request for the service behind `url`.
pub fn capabilities_url(url: &str, service: OgcService) -> Result<Url, MetadataError> {
    let mut url =
        Url::parse(&canonical_url(url)).map_err(|_| MetadataError::InvalidUrl(url.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(MetadataError::InvalidUrl(url.to_string()));
    }

    url.query_pairs_mut()
        .append_pair("service", service.parameter())
        .append_pair("request", "GetCapabilities");
    Ok(url)
}

pub struct OgcParser {
    service: OgcService,
    client: Client,
    max_bytes: usize,
}

impl OgcParser {
    #[must_use]
    pub const fn new(service: OgcService, client: Client, max_bytes: usize) -> Self {
        Self {
            service,
            client,
            max_bytes,
        }
    }

    async fn fetch(&self, url: Url) -> Result<String, MetadataError> {
        let mut response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(MetadataError::Status(response.status().as_u16()));
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(MetadataError::TooLarge(self.max_bytes));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            append_limited(&mut body, &chunk, self.max_bytes)?;
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Appends a body chunk, failing as soon as the total passes `max` bytes.
fn append_limited(body: &mut Vec<u8>, chunk: &[u8], max: usize) -> Result<(), MetadataError> {
    if body.len() + chunk.len() > max {
        return Err(MetadataError::TooLarge(max));
    }
    body.extend_from_slice(chunk);
    Ok(())
}

/// Builds the unsaved geodata model for a parsed document.
#[must_use]
pub fn into_metadata(caps: Capabilities, url: String, code: &str) -> ParsedMetadata {
    let title = caps.title.unwrap_or_else(|| {
        Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(ToString::to_string))
            .unwrap_or_else(|| url.clone())
    });

    let mut geodata = Geodata::new(url, code);
    geodata.title = title;
    geodata.bbox = caps.bbox.map(|b| b.to_wkt());
    geodata.keywords = caps.keywords;
    geodata.language = caps.language;
    geodata.copyright = caps.copyright;
    geodata.author = caps.author;
    geodata.abstract_text = caps.abstract_text;
    geodata.license = caps.license;
    geodata.time = caps.time;

    let layers = caps
        .layers
        .into_iter()
        .map(|l| Layer {
            id: Default::default(),
            name: l.name,
            title: l.title,
            bbox: l.bbox.map(|b| b.to_wkt()),
        })
        .collect();

    ParsedMetadata { geodata, layers }
}

#[async_trait]
impl MetadataParser for OgcParser {
    fn code(&self) -> &str {
        self.service.code()
    }

    fn name(&self) -> &str {
        self.service.name()
    }

    async fn parse(&self, url: &str) -> Result<ParsedMetadata, MetadataError> {
        let request = capabilities_url(url, self.service)?;
        info!(url = %request, "Requesting capabilities");

        let xml = self.fetch(request).await?;
        let caps = parse_capabilities(&xml)?;

        Ok(into_metadata(caps, self.service_url(url), self.code()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Envelope;
    use crate::metadata::capabilities::CapabilitiesLayer;

    #[test]
    fn canonical_url_drops_request_keys_and_fragment() {
        assert_eq!(
            canonical_url(
                "HTTP://Maps.Example.org/wms?SERVICE=WMS&Request=GetCapabilities&map=rivers#top"
            ),
            "http://maps.example.org/wms?map=rivers"
        );
        assert_eq!(
            canonical_url(" http://example.org/ows?version=1.3.0&AcceptVersions=2.0.0 "),
            "http://example.org/ows"
        );
        assert_eq!(canonical_url("not a url"), "not a url");
    }

    #[test]
    fn canonical_url_is_idempotent() {
        let once = canonical_url("https://example.org/wfs?typename=a&service=WFS");
        assert_eq!(canonical_url(&once), once);
    }

    #[test]
    fn capabilities_request_appends_operation() {
        let url =
            capabilities_url("http://example.org/wcs?request=GetCoverage&x=1", OgcService::Wcs)
                .unwrap();
        assert_eq!(
            url.as_str(),
            "http://example.org/wcs?x=1&service=WCS&request=GetCapabilities"
        );
        assert!(capabilities_url("ftp://example.org/wms", OgcService::Wms).is_err());
        assert!(capabilities_url("example.org/wms", OgcService::Wms).is_err());
    }

    #[test]
    fn body_limit_stops_at_first_oversized_chunk() {
        let mut body = Vec::new();
        append_limited(&mut body, b"<WMS_", 8).unwrap();
        append_limited(&mut body, b"Cap", 8).unwrap();
        assert_eq!(body, b"<WMS_Cap");

        let err = append_limited(&mut body, b"a", 8).unwrap_err();
        assert!(matches!(err, MetadataError::TooLarge(8)));
        assert_eq!(body.len(), 8);
    }

    #[test]
    fn metadata_falls_back_to_host_as_title() {
        let caps = Capabilities {
            layers: vec![CapabilitiesLayer {
                name: "roads".to_string(),
                title: None,
                bbox: Some(Envelope::new(0.0, 0.0, 1.0, 1.0)),
            }],
            bbox: Some(Envelope::new(0.0, 0.0, 1.0, 1.0)),
            ..Capabilities::default()
        };

        let parsed = into_metadata(caps, "http://gis.example.org/wfs".to_string(), "wfs");
        assert_eq!(parsed.geodata.title, "gis.example.org");
        assert_eq!(parsed.geodata.datatype, "wfs");
        assert_eq!(
            parsed.geodata.bbox.as_deref(),
            Some("POLYGON((0 0,1 0,1 1,0 1,0 0))")
        );
        assert_eq!(parsed.layers[0].name, "roads");
    }
}
