pub(crate) mod media;
pub(crate) mod raster;
pub(crate) mod text;
