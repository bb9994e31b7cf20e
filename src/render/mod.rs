//! Frame evaluation and the encode loop.

pub(crate) mod pipeline;
