//! Play queue browsing via the speaker's ContentDirectory service.
//!
//! Queue pages come back as an entity-encoded DIDL-Lite document inside the
//! Browse response. Radio-style entries often carry their real metadata in
//! `r:streamContent` or the nested `resMD` document instead of the plain
//! title fields, so parsing layers those sources on top of each other.

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;

use super::services::SonosService;
use super::soap::SoapRequestBuilder;
use super::transport::{ensure_address, ClientResult};
use super::types::{QueueItem, QueuePage};

/// Fetches one page of the speaker's play queue.
///
/// An unreachable speaker yields an empty page anchored at `start_index`.
pub async fn get_queue(
    client: &Client,
    ip: &str,
    start_index: usize,
    count: usize,
) -> ClientResult<QueuePage> {
    ensure_address(ip)?;
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::ContentDirectory)
        .action("Browse")
        .arg("ObjectID", "Q:0")
        .arg("BrowseFlag", "BrowseDirectChildren")
        .arg("Filter", "*")
        .arg("StartingIndex", start_index.to_string())
        .arg("RequestedCount", count.to_string())
        .arg("SortCriteria", "")
        .send()
        .await;

    match result {
        Ok(response) => Ok(parse_queue_response(&response, start_index, count)),
        Err(e) => {
            log::warn!("[Sonos] Queue browse failed for {}: {}", ip, e);
            Ok(QueuePage::empty(start_index))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemField {
    Title,
    Creator,
    Artist,
    Album,
    Resource,
    StreamContent,
    ResourceMetadata,
}

#[derive(Debug, Default)]
struct RawQueueItem {
    title: String,
    creator: String,
    artist: String,
    album: String,
    resource: String,
    stream_content: String,
    resource_metadata: String,
}

impl RawQueueItem {
    fn push(&mut self, field: ItemField, text: &str) {
        let target = match field {
            ItemField::Title => &mut self.title,
            ItemField::Creator => &mut self.creator,
            ItemField::Artist => &mut self.artist,
            ItemField::Album => &mut self.album,
            ItemField::Resource => &mut self.resource,
            ItemField::StreamContent => &mut self.stream_content,
            ItemField::ResourceMetadata => &mut self.resource_metadata,
        };
        target.push_str(text);
    }

    fn finalize(self, index: usize) -> QueueItem {
        let mut title = self.title.trim().to_string();
        let mut artist = first_non_blank(&self.artist, &self.creator);
        let mut album = non_blank(&self.album);

        // resMD carries the original service metadata for queue entries
        // that were enqueued from a music service; prefer it when present.
        if !self.resource_metadata.trim().is_empty() {
            let nested = decode_nested_metadata(&self.resource_metadata);
            if let Some(t) = extract_field(&nested, "title") {
                title = t;
            }
            if let Some(a) = extract_field(&nested, "creator") {
                artist = Some(a);
            }
            if let Some(a) = extract_field(&nested, "album") {
                album = Some(a);
            }
        }

        // Radio streams publish "Artist - Title" through streamContent.
        let stream = self.stream_content.trim();
        if !stream.is_empty() {
            match stream.split_once(" - ") {
                Some((left, right)) => {
                    if artist.is_none() {
                        artist = non_blank(left);
                    }
                    if title.is_empty() {
                        title = right.trim().to_string();
                    }
                }
                None => {
                    if title.is_empty() {
                        title = stream.to_string();
                    }
                }
            }
        }

        let resource_uri = non_blank(&self.resource);
        if title.is_empty() {
            title = resource_uri
                .clone()
                .unwrap_or_else(|| "Unknown title".to_string());
        }

        QueueItem {
            index,
            title,
            artist,
            album,
            resource_uri,
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn first_non_blank(primary: &str, fallback: &str) -> Option<String> {
    non_blank(primary).or_else(|| non_blank(fallback))
}

fn decode_nested_metadata(metadata: &str) -> String {
    // Depending on how the entry was enqueued the nested document may still
    // carry one extra level of entity encoding.
    if metadata.contains("&lt;") {
        html_escape::decode_html_entities(metadata).into_owned()
    } else {
        metadata.to_string()
    }
}

fn extract_field(xml: &str, tag: &str) -> Option<String> {
    super::utils::extract_xml_text(xml, tag).and_then(|v| non_blank(&v))
}

fn item_field(local_name: &[u8]) -> Option<ItemField> {
    match local_name {
        b"title" => Some(ItemField::Title),
        b"creator" => Some(ItemField::Creator),
        b"artist" => Some(ItemField::Artist),
        b"album" => Some(ItemField::Album),
        b"res" => Some(ItemField::Resource),
        b"streamContent" => Some(ItemField::StreamContent),
        b"resMD" => Some(ItemField::ResourceMetadata),
        _ => None,
    }
}

fn parse_didl_items(didl: &str, start_index: usize) -> Vec<QueueItem> {
    let mut reader = Reader::from_str(didl);
    let mut items = Vec::new();
    let mut current: Option<RawQueueItem> = None;
    let mut field: Option<ItemField> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"item" {
                    current = Some(RawQueueItem::default());
                    field = None;
                } else {
                    field = item_field(e.local_name().as_ref());
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(item), Some(field)) = (current.as_mut(), field) {
                    if let Ok(text) = t.unescape() {
                        item.push(field, &text);
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"item" {
                    if let Some(raw) = current.take() {
                        let index = start_index + items.len();
                        items.push(raw.finalize(index));
                    }
                }
                field = None;
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }

    items
}

/// Parses a Browse response body into a queue page.
///
/// Counter fields are patched up defensively: speakers occasionally report
/// zero counters alongside a non-empty result document.
#[must_use]
pub fn parse_queue_response(body: &str, start_index: usize, requested_count: usize) -> QueuePage {
    let didl = super::utils::extract_xml_text(body, "Result").unwrap_or_default();
    let items = parse_didl_items(&didl, start_index);

    let mut number_returned: usize = super::utils::extract_xml_text(body, "NumberReturned")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);
    let mut total_matches: usize = super::utils::extract_xml_text(body, "TotalMatches")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    if number_returned == 0 {
        number_returned = items.len();
    }
    if total_matches == 0 {
        total_matches = start_index + items.len();
        // A full page means the queue probably continues past it.
        if items.len() == requested_count && requested_count > 0 {
            total_matches += 1;
        }
    }

    QueuePage {
        items,
        start_index,
        number_returned,
        total_matches,
    }
}
