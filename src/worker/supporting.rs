//! Supporting-object collection for html works
//!
//! Embedded resources are fetched in document order with conditional
//! requests. The output is an ordered list of [`SupportingObject`]s; a
//! result's position in that list is its submission index, so resources
//! that fail to fetch never consume an index.

use bytes::Bytes;
use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

use super::http::HttpClient;
use crate::dispatcher::{CacheInfo, OpaqueToken};

/// Metadata form fields each emitted object adds to a submission
pub const FIELDS_PER_OBJECT: usize = 2;

static IMG_SRC: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("static selector is valid"));

/// Extracts embedded resource URLs from a markup document
pub trait MarkupExtractor: Send + Sync {
    /// URLs in document order, duplicates included
    fn resource_urls(&self, markup: &[u8]) -> Vec<String>;
}

/// Collects `src` of every `<img>` element
#[derive(Debug, Clone, Copy, Default)]
pub struct ImgSrcExtractor;

impl MarkupExtractor for ImgSrcExtractor {
    fn resource_urls(&self, markup: &[u8]) -> Vec<String> {
        let document = Html::parse_document(&String::from_utf8_lossy(markup));
        document
            .select(&IMG_SRC)
            .filter_map(|element| element.value().attr("src"))
            .map(str::to_string)
            .collect()
    }
}

/// One emitted supporting-object result
#[derive(Debug, Clone, PartialEq)]
pub enum SupportingObject {
    /// Origin confirmed the stored copy is current; no bytes transferred
    CacheHit { object_id: OpaqueToken, url: String },
    /// New bytes from the origin
    Fetched {
        url: String,
        file_name: String,
        bytes: Bytes,
        content_type: String,
        etag: String,
    },
}

/// Fetches the resources embedded in an html work
#[derive(Clone)]
pub struct SupportingObjectFetcher {
    client: HttpClient,
    extractor: Arc<dyn MarkupExtractor>,
    max_metadata_fields: usize,
}

impl SupportingObjectFetcher {
    pub fn new(client: HttpClient, max_metadata_fields: usize) -> Self {
        Self::with_extractor(client, Arc::new(ImgSrcExtractor), max_metadata_fields)
    }

    pub fn with_extractor(
        client: HttpClient,
        extractor: Arc<dyn MarkupExtractor>,
        max_metadata_fields: usize,
    ) -> Self {
        Self {
            client,
            extractor,
            max_metadata_fields,
        }
    }

    /// Most results that fit under the metadata field ceiling
    pub fn max_objects(&self) -> usize {
        max_objects_for(self.max_metadata_fields)
    }

    /// Fetch every embedded resource until the cap is reached.
    ///
    /// `page_url` resolves relative references; the raw reference stays the
    /// cache key and the reported url.
    pub async fn fetch_all(
        &self,
        markup: &[u8],
        page_url: &str,
        cache_infos: &HashMap<String, CacheInfo>,
    ) -> Vec<SupportingObject> {
        let references = self.extractor.resource_urls(markup);
        let max_objects = self.max_objects();
        let base = Url::parse(page_url).ok();

        info!(found = references.len(), max_objects, "Collecting supporting objects");

        let mut objects = Vec::new();
        for reference in references {
            if objects.len() >= max_objects {
                info!(emitted = objects.len(), "Capping supporting objects");
                break;
            }

            if let Some(object) = self
                .fetch_one(&reference, base.as_ref(), cache_infos.get(&reference))
                .await
            {
                objects.push(object);
            }
        }

        objects
    }

    async fn fetch_one(
        &self,
        reference: &str,
        base: Option<&Url>,
        cache: Option<&CacheInfo>,
    ) -> Option<SupportingObject> {
        let Some(target) = resolve(base, reference) else {
            warn!(url = reference, "Skipping unfetchable supporting object reference");
            return None;
        };

        if cache.is_some() {
            debug!(url = reference, "Found cache info");
        }

        let response = match self
            .client
            .get(target.as_str(), cache.map(|info| info.etag.as_str()))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url = reference, error = %e, "Couldn't fetch supporting object");
                return None;
            }
        };

        // 304 is checked before the generic success test
        if response.is_not_modified() {
            return match cache {
                Some(info) => {
                    debug!(url = reference, "Supporting object hit cache");
                    Some(SupportingObject::CacheHit {
                        object_id: info.object_id.clone(),
                        url: info.url.clone(),
                    })
                }
                None => {
                    warn!(url = reference, "Not modified without a validator, skipping");
                    None
                }
            };
        }

        if !response.is_success() {
            warn!(url = reference, status = %response.status, "Couldn't fetch supporting object");
            return None;
        }

        let content_type = response.content_type.clone().unwrap_or_default();
        let etag = response.etag.clone().unwrap_or_default();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = reference, error = %e, "Couldn't read supporting object");
                return None;
            }
        };

        debug!(url = reference, size = bytes.len(), "Fetched supporting object");

        Some(SupportingObject::Fetched {
            url: reference.to_string(),
            file_name: file_name_of(reference),
            bytes,
            content_type,
            etag,
        })
    }
}

pub fn max_objects_for(max_metadata_fields: usize) -> usize {
    max_metadata_fields / FIELDS_PER_OBJECT
}

/// Fetchable target for a reference; the page itself never is one
fn resolve(base: Option<&Url>, reference: &str) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let mut url = match base {
        Some(base) => base.join(trimmed).ok()?,
        None => Url::parse(trimmed).ok()?,
    };
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    url.set_fragment(None);
    if let Some(base) = base {
        let mut page = base.clone();
        page.set_fragment(None);
        if url == page {
            return None;
        }
    }
    Some(url)
}

fn file_name_of(reference: &str) -> String {
    reference.rsplit('/').next().unwrap_or(reference).to_string()
}
