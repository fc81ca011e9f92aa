//! Collect tracing events in memory.
//!
//! [`CaptureLayer`] renders each event with [`fmt::render_event`] and appends
//! it to a shared [`LogBuffer`]. Hosts use it to show script output in a
//! console; tests use it to assert on emitted events:
//!
//! ```
//! use tracing_subscriber::prelude::*;
//!
//! let buffer = logging::capture::LogBuffer::new();
//! let subscriber = tracing_subscriber::registry().with(buffer.layer());
//! tracing::subscriber::with_default(subscriber, || tracing::info!("hello"));
//! assert_eq!(buffer.messages(), ["hello"]);
//! ```

use std::{collections::VecDeque, mem, sync::Arc};

use parking_lot::Mutex;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::fmt::{self, RenderedLog};

/// Upper bound on retained events; the oldest are discarded first.
const MAX_EVENTS: usize = 10_000;

/// Shared, bounded buffer of rendered events.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    /// Events in arrival order.
    events: Arc<Mutex<VecDeque<RenderedLog>>>,
}

impl LogBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A layer that appends to this buffer.
    pub fn layer(&self) -> CaptureLayer {
        CaptureLayer {
            buffer: self.clone(),
        }
    }

    /// Copy of every retained event.
    pub fn events(&self) -> Vec<RenderedLog> {
        self.events.lock().iter().cloned().collect()
    }

    /// Rendered messages of every retained event.
    pub fn messages(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.message.clone()).collect()
    }

    /// Remove and return every retained event.
    pub fn take(&self) -> Vec<RenderedLog> {
        mem::take(&mut *self.events.lock()).into()
    }

    /// Append one event, evicting the oldest past the cap.
    fn push(&self, event: RenderedLog) {
        let mut events = self.events.lock();
        if events.len() >= MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Tracing layer that records events into a [`LogBuffer`].
#[derive(Debug, Clone)]
pub struct CaptureLayer {
    /// Destination buffer.
    buffer: LogBuffer,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.buffer.push(fmt::render_event(event));
    }
}
