// SPDX-License-Identifier: GPL-3.0-or-later

//! Decoding of Echo Nest response bodies.
//!
//! Both wire formats the service has used reduce to the same [`Envelope`]:
//! a status (code and message) plus the remaining payload as a JSON object.
//! A JSON body looks like `{"response": {"status": {"code": 0, "message": ""}, ...}}`;
//! an XML body keeps its status as the first child element of the root.
//!
//! XML payloads are reshaped to match the JSON ones: list containers such as
//! `<images><image/>...</images>` become arrays (also with zero or one item),
//! known numeric fields become numbers, and the text of an attributed list
//! item (`<term weight="1.0">indie</term>`) becomes its `name`.

use crate::error::{EchoNestError, Result};
use crate::transport::RawResponse;
use echonest_config::ResponseFormat;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

const TEXT_KEY: &str = "#text";

/// XML elements whose children always form a list, with the item element
/// they wrap. Older responses wrap every item in `<doc>`.
const LIST_ELEMENTS: &[(&str, &str)] = &[
    ("artists", "artist"),
    ("assets", "asset"),
    ("audio", "audio"),
    ("biographies", "biography"),
    ("blogs", "blog"),
    ("catalogs", "catalog"),
    ("foreign_ids", "foreign_id"),
    ("images", "image"),
    ("items", "item"),
    ("lookahead", "song"),
    ("news", "news"),
    ("reviews", "review"),
    ("songs", "song"),
    ("terms", "term"),
    ("tracks", "track"),
    ("video", "video"),
];
const LEGACY_ITEM: &str = "doc";

/// Fields the JSON format carries as numbers.
const NUMERIC_FIELDS: &[&str] = &[
    "artist_familiarity",
    "artist_hotttnesss",
    "bitrate",
    "danceability",
    "duration",
    "energy",
    "familiarity",
    "frequency",
    "hotttnesss",
    "items_updated",
    "key",
    "latitude",
    "longitude",
    "loudness",
    "mode",
    "percent_complete",
    "resolved",
    "samplerate",
    "score",
    "song_hotttnesss",
    "start",
    "tempo",
    "time_signature",
    "total",
    "total_items",
    "weight",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub status: Status,
    /// Everything next to the status, with the status itself removed.
    pub payload: Map<String, Value>,
    pub http_status: Option<u16>,
}

impl Envelope {
    /// A successful envelope around `payload`.
    pub fn success(payload: Map<String, Value>) -> Self {
        Self {
            status: Status {
                code: 0,
                message: "Success".to_string(),
            },
            payload,
            http_status: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.code == 0
    }

    /// Return the payload on success, or the typed error for a nonzero code.
    pub fn decode(self) -> Result<Value> {
        if self.is_success() {
            Ok(Value::Object(self.payload))
        } else {
            Err(EchoNestError::from_status(
                self.status.code,
                self.status.message,
                self.http_status,
            ))
        }
    }

    /// Render in the JSON wire shape.
    pub fn to_json(&self) -> Value {
        let mut response = self.payload.clone();
        response.insert(
            "status".to_string(),
            serde_json::json!({ "code": self.status.code, "message": self.status.message }),
        );
        serde_json::json!({ "response": response })
    }
}

/// Guess the wire format from the first non-whitespace byte.
pub fn detect_format(body: &[u8]) -> ResponseFormat {
    match body.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'<') => ResponseFormat::Xml,
        _ => ResponseFormat::Json,
    }
}

/// Parse a body of either format into an [`Envelope`].
pub fn parse(body: &[u8]) -> Result<Envelope> {
    parse_as(detect_format(body), body)
}

pub fn parse_as(format: ResponseFormat, body: &[u8]) -> Result<Envelope> {
    let parsed = match format {
        ResponseFormat::Json => parse_json(body),
        ResponseFormat::Xml => parse_xml(body),
    };

    parsed.map_err(|reason| {
        trace!(target: "echonest", "undecodable response: {}", reason);
        EchoNestError::unknown(format!("Unknown error. ({})", reason), None)
    })
}

/// Parse a transport response, keeping its HTTP status on the envelope and on
/// any decode error.
pub fn from_raw(raw: &RawResponse) -> Result<Envelope> {
    match parse(&raw.body) {
        Ok(mut envelope) => {
            envelope.http_status = Some(raw.status);
            Ok(envelope)
        }
        Err(EchoNestError::Unknown { message, .. }) => Err(EchoNestError::Unknown {
            message,
            http_status: Some(raw.status),
        }),
        Err(other) => Err(other),
    }
}

fn parse_json(body: &[u8]) -> std::result::Result<Envelope, String> {
    let value: Value = serde_json::from_slice(body).map_err(|e| e.to_string())?;

    let Value::Object(mut root) = value else {
        return Err("top level is not an object".to_string());
    };
    let Some(Value::Object(mut response)) = root.remove("response") else {
        return Err("missing response object".to_string());
    };
    let Some(Value::Object(status)) = response.remove("status") else {
        return Err("missing status object".to_string());
    };

    Ok(Envelope {
        status: read_status(&status)?,
        payload: response,
        http_status: None,
    })
}

fn read_status(status: &Map<String, Value>) -> std::result::Result<Status, String> {
    let code = match status.get("code") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| "missing or non-integer status code".to_string())?;

    let message = match status.get("message") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    Ok(Status { code, message })
}

fn parse_xml(body: &[u8]) -> std::result::Result<Envelope, String> {
    let root = read_xml_tree(body)?;

    let Value::Object(mut payload) = root.value else {
        return Err(format!("<{}> has no child elements", root.name));
    };
    let status_name = root
        .first_child
        .ok_or_else(|| "missing status element".to_string())?;
    let Some(Value::Object(status)) = payload.remove(&status_name) else {
        return Err(format!("<{}> is not a status element", status_name));
    };

    Ok(Envelope {
        status: read_status(&status)?,
        payload: normalize_fields(payload),
        http_status: None,
    })
}

fn list_item(container: &str) -> Option<&'static str> {
    LIST_ELEMENTS
        .iter()
        .find(|(name, _)| *name == container)
        .map(|(_, item)| *item)
}

/// Reshape the fields of one XML element into the JSON layout. Attributes
/// of a list container (`start`, `total`) move up next to the list, as in
/// the JSON format.
fn normalize_fields(fields: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    let mut hoisted = Map::new();

    for (key, value) in fields {
        let value = match list_item(&key) {
            Some(item) => {
                let (items, extras) = into_list(value, item);
                hoisted.extend(extras);
                Value::Array(items.into_iter().map(normalize_item).collect())
            }
            None => normalize_value(&key, value),
        };
        out.insert(key, value);
    }

    for (key, value) in hoisted {
        if !out.contains_key(&key) {
            let value = normalize_value(&key, value);
            out.insert(key, value);
        }
    }
    out
}

fn normalize_value(key: &str, value: Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(normalize_fields(fields)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| normalize_value(key, item))
                .collect(),
        ),
        Value::String(text) if NUMERIC_FIELDS.contains(&key) => {
            number(&text).unwrap_or(Value::String(text))
        }
        other => other,
    }
}

fn normalize_item(item: Value) -> Value {
    match item {
        Value::Object(mut fields) => {
            if let Some(text) = fields.remove(TEXT_KEY) {
                fields.entry("name").or_insert(text);
            }
            Value::Object(normalize_fields(fields))
        }
        Value::String(text) => {
            let mut fields = Map::new();
            fields.insert("name".to_string(), Value::String(text));
            Value::Object(fields)
        }
        other => other,
    }
}

/// Split a list container into its items and its remaining fields. An empty
/// element reads as an empty string and yields no items.
fn into_list(container: Value, item: &str) -> (Vec<Value>, Map<String, Value>) {
    match container {
        Value::Object(mut fields) => {
            let items = match fields.remove(item).or_else(|| fields.remove(LEGACY_ITEM)) {
                Some(Value::Array(items)) => items,
                Some(single) => vec![single],
                None => Vec::new(),
            };
            (items, fields)
        }
        Value::Array(items) => (items, Map::new()),
        _ => (Vec::new(), Map::new()),
    }
}

fn number(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::from(n));
    }
    text.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

struct XmlRoot {
    name: String,
    value: Value,
    first_child: Option<String>,
}

/// An element still being read.
struct XmlNode {
    name: String,
    fields: Map<String, Value>,
    text: String,
    first_child: Option<String>,
}

impl XmlNode {
    fn open(start: &BytesStart<'_>) -> std::result::Result<Self, String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            fields.insert(key, Value::String(value.into_owned()));
        }

        Ok(Self {
            name,
            fields,
            text: String::new(),
            first_child: None,
        })
    }

    /// Repeated child names collapse into an array.
    fn add_child(&mut self, name: String, value: Value) {
        if self.first_child.is_none() {
            self.first_child = Some(name.clone());
        }
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }

    fn finish(self) -> (String, Value, Option<String>) {
        let XmlNode {
            name,
            mut fields,
            text,
            first_child,
        } = self;
        let value = if fields.is_empty() {
            Value::String(text)
        } else {
            if !text.is_empty() {
                fields.insert(TEXT_KEY.to_string(), Value::String(text));
            }
            Value::Object(fields)
        };
        (name, value, first_child)
    }
}

fn close_node(stack: &mut Vec<XmlNode>, node: XmlNode) -> Option<XmlRoot> {
    let (name, value, first_child) = node.finish();
    match stack.last_mut() {
        Some(parent) => {
            parent.add_child(name, value);
            None
        }
        None => Some(XmlRoot {
            name,
            value,
            first_child,
        }),
    }
}

fn read_xml_tree(body: &[u8]) -> std::result::Result<XmlRoot, String> {
    let text = std::str::from_utf8(body).map_err(|e| e.to_string())?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => stack.push(XmlNode::open(&start)?),
            Event::Empty(start) => {
                let node = XmlNode::open(&start)?;
                if let Some(root) = close_node(&mut stack, node) {
                    return Ok(root);
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| "unbalanced closing tag".to_string())?;
                if let Some(root) = close_node(&mut stack, node) {
                    return Ok(root);
                }
            }
            Event::Text(text) => {
                if let Some(node) = stack.last_mut() {
                    node.text
                        .push_str(&text.unescape().map_err(|e| e.to_string())?);
                }
            }
            Event::CData(data) => {
                if let Some(node) = stack.last_mut() {
                    node.text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => return Err("unexpected end of document".to_string()),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn json_success_strips_status() {
        let body = br#"{"response":{"status":{"code":0,"message":""},"artist":{"name":"The National"}}}"#;
        let envelope = parse(body).unwrap();
        assert!(envelope.is_success());
        assert_eq!(
            envelope.decode().unwrap(),
            json!({"artist": {"name": "The National"}})
        );
    }

    #[test]
    fn json_error_raises_generic_api_error() {
        let body = br#"{"response":{"status":{"code":5,"message":"Invalid parameter"}}}"#;
        let err = parse(body).unwrap().decode().unwrap_err();
        match err {
            EchoNestError::Api { code, message, .. } => {
                assert_eq!(code, 5);
                assert_eq!(message, "Invalid parameter");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn json_error_codes_select_subtypes() {
        let key = br#"{"response":{"status":{"code":"1","message":"Invalid key"}}}"#;
        assert!(matches!(
            parse(key).unwrap().decode(),
            Err(EchoNestError::ApiKey { code: 1, .. })
        ));

        let id = br#"{"response":{"status":{"code":6,"message":"Unknown id"}}}"#;
        assert!(matches!(
            parse(id).unwrap().decode(),
            Err(EchoNestError::InvalidId { code: 6, .. })
        ));
    }

    #[test]
    fn malformed_bodies_become_unknown_errors() {
        for body in [
            &b"not json"[..],
            b"",
            br#"{"status":{"code":0}}"#,
            br#"{"response":{"artist":{}}}"#,
            br#"{"response":{"status":{"message":"no code"}}}"#,
            b"<response><status><code>0</code>",
            b"<response/>",
        ] {
            let err = parse(body).unwrap_err();
            assert_eq!(err.code(), Some(-1), "{:?}", String::from_utf8_lossy(body));
        }
    }

    #[test]
    fn envelope_round_trips_through_json() {
        for payload in [
            json!({}),
            json!({"artist": {"name": "The National", "id": "ARH6W4X1187B99274F"}}),
            json!({"songs": [{"title": "Fake Empire", "audio_summary": {"tempo": 121.9}}], "total": 1}),
            json!({"terms": [], "nested": {"list": [1, 2, {"deep": null}]}}),
        ] {
            let envelope = Envelope::success(object(payload.clone()));
            let wire = serde_json::to_vec(&envelope.to_json()).unwrap();
            let decoded = parse(&wire).unwrap().decode().unwrap();
            assert_eq!(decoded, payload);
        }
    }

    #[test]
    fn xml_status_is_first_child() {
        let body = br#"<?xml version="1.0" encoding="UTF-8"?>
            <response version="3">
              <status><code>0</code><message>Success</message></status>
              <artist>
                <name>The National</name>
                <id>music://id.echonest.com/~/AR/ARH6W4X1187B99274F</id>
              </artist>
            </response>"#;
        let envelope = parse(body).unwrap();
        assert_eq!(envelope.status.code, 0);
        assert_eq!(envelope.status.message, "Success");

        let payload = envelope.decode().unwrap();
        assert_eq!(payload["artist"]["name"], "The National");
        assert_eq!(payload["version"], "3");
        assert!(payload.get("status").is_none());
    }

    #[test]
    fn xml_errors_map_like_json() {
        let body = b"<response><status><code>12</code><message>Invalid API key</message></status></response>";
        let err = parse(body).unwrap().decode().unwrap_err();
        assert!(matches!(err, EchoNestError::ApiKey { code: 12, .. }));
        assert_eq!(err.message(), Some("Invalid API key"));
    }

    #[test]
    fn xml_repeated_elements_become_arrays() {
        let body = br#"<response>
              <status><code>0</code><message/></status>
              <images>
                <image><url>http://a/1.jpg</url></image>
                <image><url>http://a/2.jpg</url></image>
                <image><url>http://a/3.jpg</url></image>
              </images>
              <terms><term weight="1.0">indie</term></terms>
            </response>"#;
        let payload = parse(body).unwrap().decode().unwrap();

        let images = payload["images"].as_array().unwrap();
        assert_eq!(images.len(), 3);
        assert_eq!(images[2]["url"], "http://a/3.jpg");
        assert_eq!(payload["terms"], json!([{"name": "indie", "weight": 1.0}]));
    }

    #[test]
    fn xml_payload_takes_json_shape() {
        let body = br#"<response>
              <status><code>0</code><message>Success</message></status>
              <artist>
                <name>311</name>
                <hotttnesss>0.8</hotttnesss>
                <familiarity>1</familiarity>
              </artist>
              <songs>
                <song>
                  <id>SOCZMFK12AC468668F</id>
                  <title>1999</title>
                  <audio_summary><tempo>118.2</tempo><key>7</key></audio_summary>
                </song>
              </songs>
              <blogs start="15" total="340"><doc><name>post</name></doc></blogs>
              <news/>
            </response>"#;
        let payload = parse(body).unwrap().decode().unwrap();

        assert_eq!(payload["artist"]["name"], "311");
        assert_eq!(payload["artist"]["hotttnesss"], json!(0.8));
        assert_eq!(payload["artist"]["familiarity"], json!(1));
        assert_eq!(payload["songs"][0]["title"], "1999");
        assert_eq!(payload["songs"][0]["audio_summary"], json!({"tempo": 118.2, "key": 7}));
        assert_eq!(payload["blogs"], json!([{"name": "post"}]));
        assert_eq!(payload["start"], json!(15));
        assert_eq!(payload["total"], json!(340));
        assert_eq!(payload["news"], json!([]));
    }

    #[test]
    fn from_raw_keeps_http_status() {
        let raw = RawResponse::new(
            403,
            r#"{"response":{"status":{"code":1,"message":"Invalid key"}}}"#,
        );
        let err = from_raw(&raw).unwrap().decode().unwrap_err();
        assert_eq!(err.http_status(), Some(403));

        let garbage = RawResponse::new(502, "<html>Bad Gateway");
        let err = from_raw(&garbage).unwrap_err();
        assert_eq!(err.code(), Some(-1));
        assert_eq!(err.http_status(), Some(502));
    }

    #[test]
    fn format_detection() {
        assert_eq!(detect_format(b"  \n<response/>"), ResponseFormat::Xml);
        assert_eq!(detect_format(b"{\"response\":{}}"), ResponseFormat::Json);
        assert_eq!(detect_format(b""), ResponseFormat::Json);
    }
}
