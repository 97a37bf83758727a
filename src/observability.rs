use biometrics::{Collector, Counter};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("routerchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("routerchat.client.request_errors");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("routerchat.stream.chunks");
pub(crate) static STREAM_EVENTS: Counter = Counter::new("routerchat.stream.events");
pub(crate) static STREAM_DROPPED_FRAMES: Counter = Counter::new("routerchat.stream.dropped_frames");

pub(crate) static SESSION_SENDS: Counter = Counter::new("routerchat.session.sends");
pub(crate) static SESSION_COMPLETED: Counter = Counter::new("routerchat.session.completed");
pub(crate) static SESSION_CANCELLED: Counter = Counter::new("routerchat.session.cancelled");
pub(crate) static SESSION_FAILED: Counter = Counter::new("routerchat.session.failed");

pub(crate) static ESTIMATE_REQUESTS: Counter = Counter::new("routerchat.estimate.requests");
pub(crate) static ESTIMATE_ERRORS: Counter = Counter::new("routerchat.estimate.errors");
pub(crate) static ESTIMATE_STALE_DROPPED: Counter =
    Counter::new("routerchat.estimate.stale_dropped");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_DROPPED_FRAMES);

    collector.register_counter(&SESSION_SENDS);
    collector.register_counter(&SESSION_COMPLETED);
    collector.register_counter(&SESSION_CANCELLED);
    collector.register_counter(&SESSION_FAILED);

    collector.register_counter(&ESTIMATE_REQUESTS);
    collector.register_counter(&ESTIMATE_ERRORS);
    collector.register_counter(&ESTIMATE_STALE_DROPPED);
}
