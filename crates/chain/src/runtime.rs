//! The pinned runtime's event model. Each deployment supplies the complete
//! event enum its runtime emits (regenerated on runtime upgrades); the
//! submitter only needs to recognize the two dispatch-outcome markers.

use parity_scale_codec::Decode;

/// Classification of a single decoded block event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventClass {
    /// The extrinsic at this event's phase dispatched successfully.
    ExtrinsicSuccess,
    /// The extrinsic was included but its dispatch was rejected.
    ExtrinsicFailed(String),
    /// Any other event; irrelevant to outcome classification.
    Other,
}

/// A deployment's runtime event model.
pub trait RuntimeTarget: Send + Sync + 'static {
    type Event: Decode + Send;

    fn classify(event: &Self::Event) -> EventClass;
}
