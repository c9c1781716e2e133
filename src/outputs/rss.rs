//! RSS 2.0 rendering and reading.
//!
//! The feed file is both the published artifact and the only state carried
//! between runs, so this module owns both directions: [`serialize`] renders a
//! [`FeedDocument`], and [`parse_items`] reads the items of a previously
//! written feed back into [`ArticleRecord`]s.
//!
//! # Output Shape
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
//!   <channel>
//!     <title>…</title>
//!     <link>…</link>
//!     <description>…</description>
//!     <language>en-us</language>
//!     <lastBuildDate>Sat, 18 Oct 2026 09:00:00 +0000</lastBuildDate>
//!     <generator>blog_feed 0.1.0</generator>
//!     <atom:link href="…" rel="self" type="application/rss+xml"/>
//!     <item>
//!       <title>…</title>
//!       <link>…</link>
//!       <description>…</description>
//!       <pubDate>…</pubDate>
//!       <guid isPermaLink="true">…</guid>
//!     </item>
//!   </channel>
//! </rss>
//! ```

use crate::models::{ArticleRecord, FeedDocument};
use crate::utils::strip_xml_invalid;
use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Deserialize;
use std::io::{self, Cursor};
use thiserror::Error;
use tracing::warn;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const GENERATOR: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// Errors raised while reading a previously written feed.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("malformed feed XML: {0}")]
    Xml(#[from] quick_xml::DeError),
}

/// Render a feed document as RSS 2.0.
///
/// All text is escaped by the writer and characters XML cannot represent are
/// dropped, so scraped titles and summaries may contain any character.
pub fn serialize(doc: &FeedDocument) -> io::Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:atom", ATOM_NS));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    let meta = &doc.meta;
    write_text_element(&mut writer, "title", &meta.title)?;
    write_text_element(&mut writer, "link", &meta.link)?;
    write_text_element(&mut writer, "description", &meta.description)?;
    write_text_element(&mut writer, "language", &meta.language)?;
    write_text_element(&mut writer, "lastBuildDate", &doc.last_build.to_rfc2822())?;
    write_text_element(&mut writer, "generator", GENERATOR)?;
    if let Some(self_url) = &meta.self_url {
        let mut atom_link = BytesStart::new("atom:link");
        atom_link.push_attribute(("href", &*strip_xml_invalid(self_url)));
        atom_link.push_attribute(("rel", "self"));
        atom_link.push_attribute(("type", "application/rss+xml"));
        writer.write_event(Event::Empty(atom_link))?;
    }

    for item in &doc.items {
        write_item(&mut writer, item)?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let bytes = writer.into_inner().into_inner();
    let mut xml = String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    xml.push('\n');
    Ok(xml)
}

fn write_item(writer: &mut Writer<Cursor<Vec<u8>>>, item: &ArticleRecord) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;
    write_text_element(writer, "title", &item.title)?;
    write_text_element(writer, "link", &item.link)?;
    write_text_element(writer, "description", &item.summary)?;
    write_text_element(writer, "pubDate", &item.published.to_rfc2822())?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "true"));
    writer.write_event(Event::Start(guid))?;
    writer.write_event(Event::Text(BytesText::new(&strip_xml_invalid(&item.link))))?;
    writer.write_event(Event::End(BytesEnd::new("guid")))?;

    writer.write_event(Event::End(BytesEnd::new("item")))
}

fn write_text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    text: &str,
) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(&strip_xml_invalid(text))))?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Default, Deserialize)]
struct RssChannel {
    #[serde(default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// Parse the items of an RSS 2.0 document.
///
/// Items missing a title, link or parseable `pubDate` are skipped with a
/// warning; they cannot be merged without an identity and a time.
pub fn parse_items(xml: &str) -> Result<Vec<ArticleRecord>, ReadError> {
    let doc: RssDocument = quick_xml::de::from_str(xml)?;

    let records = doc
        .channel
        .item
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let record = into_record(item);
            if record.is_none() {
                warn!(index, "Skipping stored feed item without title, link or pubDate");
            }
            record
        })
        .collect();
    Ok(records)
}

fn into_record(item: RssItem) -> Option<ArticleRecord> {
    let title = item.title.filter(|t| !t.trim().is_empty())?;
    let link = item.link.filter(|l| !l.trim().is_empty())?;
    let published = DateTime::parse_from_rfc2822(item.pub_date?.trim())
        .ok()?
        .with_timezone(&Utc);

    Some(ArticleRecord {
        title,
        link: link.trim().to_string(),
        summary: item.description.unwrap_or_default(),
        published,
    })
}
