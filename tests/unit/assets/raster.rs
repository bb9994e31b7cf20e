use super::*;

#[test]
fn blit_is_clipped_to_destination() {
    let mut dst = Raster::solid(4, 4, [0, 0, 0, 255]);
    let src = Raster::solid(3, 3, [255, 0, 0, 255]);
    dst.blit_over(&src, 2, -1, 1.0);

    assert_eq!(dst.pixel(2, 0), [255, 0, 0, 255]);
    assert_eq!(dst.pixel(3, 1), [255, 0, 0, 255]);
    assert_eq!(dst.pixel(1, 0), [0, 0, 0, 255]);
    assert_eq!(dst.pixel(3, 2), [0, 0, 0, 255]);
}

#[test]
fn transparent_source_leaves_destination() {
    let mut dst = Raster::solid(2, 2, [10, 20, 30, 255]);
    let src = Raster::transparent(2, 2);
    dst.blit_over(&src, 0, 0, 1.0);
    assert_eq!(dst, Raster::solid(2, 2, [10, 20, 30, 255]));
}

#[test]
fn half_alpha_over_black() {
    let mut dst = Raster::solid(1, 1, [0, 0, 0, 255]);
    let src = Raster::solid(1, 1, [255, 255, 255, 128]);
    dst.blit_over(&src, 0, 0, 1.0);
    assert_eq!(dst.pixel(0, 0), [128, 128, 128, 255]);
}

#[test]
fn crossfade_endpoints_match_inputs() {
    let a = Raster::solid(2, 1, [200, 0, 0, 255]);
    let b = Raster::solid(2, 1, [0, 0, 200, 255]);
    assert_eq!(Raster::crossfade(&a, &b, 0.0).unwrap(), a);
    assert_eq!(Raster::crossfade(&a, &b, 1.0).unwrap(), b);

    let mid = Raster::crossfade(&a, &b, 0.5).unwrap();
    assert_eq!(mid.pixel(0, 0), [100, 0, 100, 255]);
}

#[test]
fn crossfade_rejects_mismatched_sizes() {
    let a = Raster::solid(2, 2, [0, 0, 0, 255]);
    let b = Raster::solid(3, 2, [0, 0, 0, 255]);
    assert!(Raster::crossfade(&a, &b, 0.5).is_err());
}

#[test]
fn fit_height_keeps_aspect_and_caps_height() {
    assert_eq!(fit_height(200, 100, 100, 1000), 50);
    assert_eq!(fit_height(100, 400, 100, 120), 120);
}

#[test]
fn from_premul_checks_length() {
    assert!(Raster::from_premul(2, 2, vec![0; 15]).is_err());
    assert!(Raster::from_premul(2, 2, vec![0; 16]).is_ok());
}
