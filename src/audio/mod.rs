//! Soundtrack assembly: scene speech placed on one stereo bus.

pub(crate) mod mix;
