//! Render `tracing` events into concise logfmt strings.
//!
//! The `message` field leads; every other field follows as `key=value`, so
//! structured context such as `item="combo"` survives rendering.

use std::fmt::{Debug, Write};

use tracing::{
    Event,
    field::{Field, Visit},
};

/// Rendered fields extracted from a tracing Event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLog {
    /// Severity level (e.g., INFO, WARN) for the event.
    pub level: String,
    /// Event target (typically the module path).
    pub target: String,
    /// Message followed by rendered `key=value` pairs.
    pub message: String,
}

/// Collects the message and remaining fields of one event.
#[derive(Default)]
struct FieldVisitor {
    /// Captured `message` field, if present.
    msg: Option<String>,
    /// Non-message fields rendered as `key=value`, space separated.
    fields: Vec<String>,
}

impl FieldVisitor {
    /// Join the message and fields into one line.
    fn finish(self) -> String {
        let mut out = self.msg.unwrap_or_default();
        for field in self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&field);
        }
        out
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.msg = Some(value.to_string());
        } else {
            self.fields.push(format!("{}=\"{}\"", field.name(), value));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.push(format!("{}={}", field.name(), value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            let mut msg = String::new();
            let _ignored = write!(msg, "{:?}", value);
            self.msg = Some(msg);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

/// Extract level, target, and rendered message from a tracing Event.
pub fn render_event(event: &Event<'_>) -> RenderedLog {
    let meta = event.metadata();
    let mut visitor = FieldVisitor::default();
    event.record(&mut visitor);
    RenderedLog {
        level: meta.level().to_string(),
        target: meta.target().to_string(),
        message: visitor.finish(),
    }
}
