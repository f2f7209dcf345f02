//! Tests for the band label heuristic.

use band_common::band_label;

// ============================================================================
// Sentinel-2 B8/B4/B3 exports
// ============================================================================

#[test]
fn test_sentinel2_b843_first_band_is_nir() {
    assert_eq!(
        band_label("", 1, "Sentinel2_B843_2024-05-01.tif"),
        "Infrarrojo Cercano (B8)"
    );
}

#[test]
fn test_sentinel2_b843_order() {
    let fname = "sentinel2_b843.tif";
    assert_eq!(band_label("Band 2", 2, fname), "Roja (B4)");
    assert_eq!(band_label("Band 3", 3, fname), "Verde (B3)");
}

#[test]
fn test_sentinel2_b843_overrides_description() {
    assert_eq!(
        band_label("blue", 1, "SENTINEL2-b843.tiff"),
        "Infrarrojo Cercano (B8)"
    );
}

#[test]
fn test_sentinel2_b843_extra_band_falls_through() {
    assert_eq!(band_label("", 4, "sentinel2_b843.tif"), "Banda 4");
    assert_eq!(band_label("blue", 4, "sentinel2_b843.tif"), "Azul");
}

#[test]
fn test_sentinel2_without_combination_marker() {
    assert_eq!(band_label("", 1, "sentinel2_rgb.tif"), "Banda 1");
}

// ============================================================================
// Description matches
// ============================================================================

#[test]
fn test_red_any_index() {
    for index in [1, 2, 7, 12] {
        assert_eq!(band_label("red", index, "scene.tif"), "Roja");
    }
}

#[test]
fn test_case_insensitive_colors() {
    assert_eq!(band_label("GREEN", 2, "scene.tif"), "Verde");
    assert_eq!(band_label("Blue band", 3, "scene.tif"), "Azul");
    assert_eq!(band_label("NIR", 4, "scene.tif"), "Infrarrojo Cercano (NIR)");
}

#[test]
fn test_near_infrared_is_not_red() {
    assert_eq!(
        band_label("Near Infrared", 4, "scene.tif"),
        "Infrarrojo Cercano (NIR)"
    );
}

// ============================================================================
// Fallbacks
// ============================================================================

#[test]
fn test_unrecognized_description_kept() {
    assert_eq!(band_label("xyz", 5, "scene.tif"), "xyz");
}

#[test]
fn test_empty_description_generic_label() {
    assert_eq!(band_label("", 5, "scene.tif"), "Banda 5");
}

#[test]
fn test_whitespace_description_generic_label() {
    assert_eq!(band_label("   ", 2, ""), "Banda 2");
}
