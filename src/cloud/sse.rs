use serde_json::Value;

/// One server-sent event frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` parser. Network chunks land on arbitrary
/// byte boundaries; frames are complete once a blank line arrives.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        while let Some(end) = self.buf.find("\n\n") {
            let frame: String = self.buf.drain(..end + 2).collect();
            if let Some(event) = parse_frame(&frame) {
                events.push(event);
            }
        }
        events
    }
}

fn parse_frame(frame: &str) -> Option<SseEvent> {
    let mut event = String::new();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in frame.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = value.to_string(),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if event.is_empty() && data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        event,
        data: data_lines.join("\n"),
    })
}

/// Payload of a realtime-database `put`/`patch` event.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ChangeEvent {
    pub path: String,
    pub data: Value,
}

/// Apply a `put` (replace) or `patch` (merge) at `path` onto the mirrored
/// JSON tree. A null `put` removes the node.
pub fn apply_change(root: &mut Value, path: &str, data: Value, merge: bool) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    // A null put deletes the node at `path` from its parent.
    if data.is_null() && !merge {
        match segments.split_last() {
            None => *root = Value::Object(Default::default()),
            Some((last, parents)) => {
                if let Some(parent) = descend(root, parents).as_object_mut() {
                    parent.remove(*last);
                }
            }
        }
        return;
    }

    let target = descend(root, &segments);

    if merge {
        let patch = match data {
            Value::Object(map) => map,
            _ => return,
        };
        if !target.is_object() {
            *target = Value::Object(Default::default());
        }
        let obj = target.as_object_mut().unwrap();
        for (key, value) in patch {
            if value.is_null() {
                obj.remove(&key);
            } else {
                obj.insert(key, value);
            }
        }
    } else {
        *target = data;
    }
}

fn descend<'a>(root: &'a mut Value, segments: &[&str]) -> &'a mut Value {
    let mut current = root;
    for segment in segments {
        if !current.is_object() {
            *current = Value::Object(Default::default());
        }
        current = current
            .as_object_mut()
            .unwrap()
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    current
}
