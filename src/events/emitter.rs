use std::sync::Arc;

use super::{Bus, Event, EventKind};

/// Named, optional publisher used by controllers and the runner.
///
/// Without a bus every call is a no-op, so emitting costs nothing when nobody listens.
#[derive(Clone, Debug)]
pub(crate) struct Emitter {
    source: Arc<str>,
    bus: Option<Bus>,
}

impl Emitter {
    pub fn new(source: impl Into<Arc<str>>, bus: Option<Bus>) -> Self {
        Self {
            source: source.into(),
            bus,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn emit(&self, kind: EventKind) {
        self.emit_with(kind, |ev| ev);
    }

    pub fn emit_with(&self, kind: EventKind, decorate: impl FnOnce(Event) -> Event) {
        if let Some(bus) = &self.bus {
            bus.publish(decorate(Event::new(kind).with_source(Arc::clone(&self.source))));
        }
    }
}
