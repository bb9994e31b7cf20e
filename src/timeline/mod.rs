//! Scene clips, their placement, and the caption overlay.

pub(crate) mod assembler;
pub(crate) mod avatar;
pub(crate) mod captions;
pub(crate) mod duration;
pub(crate) mod model;
pub(crate) mod scene_track;
pub(crate) mod stitch;
pub(crate) mod visual;
