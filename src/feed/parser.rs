use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// `pubDate` layout after the weekday: RFC 1123 with a numeric zone, e.g.
/// `Mon, 02 Jan 2006 15:04:05 -0700`.
const PUB_DATE_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("document has no <channel> element")]
    MissingChannel,
}

/// An RSS 2.0 document (`<rss><channel>...</channel></rss>`).
#[derive(Debug, Clone, Default)]
pub struct RssFeed {
    pub channel: RssChannel,
}

#[derive(Debug, Clone, Default)]
pub struct RssChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Items in document order
    pub items: Vec<RssItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

impl RssItem {
    /// Publish time, or `None` when `pubDate` is missing or not in the
    /// expected layout.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        parse_pub_date(&self.pub_date)
    }
}

/// Parse an RSS channel document.
///
/// Only unprefixed `title`, `link`, `description` and `pubDate` children of
/// `<channel>` and `<item>` are read; namespaced look-alikes such as
/// `<atom:link>` or `<itunes:title>` are ignored. Text and CDATA sections are
/// concatenated and XML-unescaped. Whitespace is kept as-is; callers trim
/// whole fields.
///
/// XXE: quick-xml never expands `<!ENTITY>` declarations, so only the five
/// predefined entities are resolved. Text with an unknown entity is kept
/// verbatim instead of failing the whole document.
pub fn parse_feed(bytes: &[u8]) -> Result<RssFeed, ParseError> {
    let mut reader = Reader::from_reader(bytes);

    let mut feed = RssFeed::default();
    let mut saw_channel = false;
    let mut item: Option<RssItem> = None;
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"channel" => saw_channel = true,
                    b"item" if parent_is(&path, b"channel") => item = Some(RssItem::default()),
                    _ => {}
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"channel" => saw_channel = true,
                b"item" if parent_is(&path, b"channel") => {
                    feed.channel.items.push(RssItem::default())
                }
                _ => {}
            },
            Ok(Event::End(_)) => {
                if let Some(name) = path.pop() {
                    if name == b"item" {
                        if let Some(done) = item.take() {
                            feed.channel.items.push(done);
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                append_text(&path, &mut feed.channel, item.as_mut(), &text);
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c).into_owned();
                append_text(&path, &mut feed.channel, item.as_mut(), &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ParseError::Xml(format!(
                    "at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_channel {
        return Err(ParseError::MissingChannel);
    }
    Ok(feed)
}

/// Parse an RFC 1123 `pubDate` with a numeric zone.
///
/// The weekday must be a valid abbreviation but is not checked against the
/// date; feeds get it wrong often enough. The day of month must have two
/// digits.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let (weekday, rest) = raw.trim().split_once(", ")?;
    if !WEEKDAYS.contains(&weekday) {
        return None;
    }
    if !rest.as_bytes().get(..2)?.iter().all(u8::is_ascii_digit) {
        return None;
    }
    DateTime::parse_from_str(rest, PUB_DATE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parent_is(path: &[Vec<u8>], name: &[u8]) -> bool {
    path.last().is_some_and(|p| p == name)
}

/// Route a text node to the field named by the innermost open element.
fn append_text(path: &[Vec<u8>], channel: &mut RssChannel, item: Option<&mut RssItem>, text: &str) {
    let [.., parent, field] = path else {
        return;
    };

    match (parent.as_slice(), item) {
        (b"item", Some(item)) => {
            let target = match field.as_slice() {
                b"title" => &mut item.title,
                b"link" => &mut item.link,
                b"description" => &mut item.description,
                b"pubDate" => &mut item.pub_date,
                _ => return,
            };
            target.push_str(text);
        }
        (b"channel", _) => {
            let target = match field.as_slice() {
                b"title" => &mut channel.title,
                b"link" => &mut channel.link,
                b"description" => &mut channel.description,
                _ => return,
            };
            target.push_str(text);
        }
        _ => {}
    }
}
