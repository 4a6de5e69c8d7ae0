use crate::kv::{Event, EventType};
use crate::watch::{
    watch_request::Union, WatchCancelRequest, WatchCreateRequest, WatchProgressRequest,
    WatchRequest, WatchResponse,
};

impl WatchRequest {
    pub fn create(req: WatchCreateRequest) -> Self {
        Self {
            union: Some(Union::CreateRequest(req)),
        }
    }

    pub fn cancel(watch_id: i64) -> Self {
        Self {
            union: Some(Union::CancelRequest(WatchCancelRequest { watch_id })),
        }
    }

    pub fn progress() -> Self {
        Self {
            union: Some(Union::ProgressRequest(WatchProgressRequest {})),
        }
    }
}

impl WatchResponse {
    /// True for a heartbeat-like response that only conveys the current
    /// store revision.
    pub fn is_progress_notify(&self) -> bool {
        self.events.is_empty()
            && !self.canceled
            && !self.created
            && self.compact_revision == 0
            && self.revision() != 0
    }

    /// Revision from the header, 0 when the header is absent.
    pub fn revision(&self) -> i64 {
        self.header.as_ref().map_or(0, |h| h.revision)
    }
}

impl Event {
    /// The event introduces a key that did not exist before.
    pub fn is_create(&self) -> bool {
        self.event_type == EventType::Put as i32
            && self
                .kv
                .as_ref()
                .is_some_and(|kv| kv.create_revision == kv.mod_revision)
    }

    /// The event overwrites an existing key.
    pub fn is_modify(&self) -> bool {
        self.event_type == EventType::Put as i32
            && self
                .kv
                .as_ref()
                .is_some_and(|kv| kv.create_revision != kv.mod_revision)
    }

    pub fn mod_revision(&self) -> i64 {
        self.kv.as_ref().map_or(0, |kv| kv.mod_revision)
    }
}
