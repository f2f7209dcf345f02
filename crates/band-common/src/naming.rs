//! Human-readable band labels.
//!
//! Labels are derived from the band description reported by the raster, its
//! 1-based index and the uploaded file name. The function is total: every
//! input produces a label.

/// Sentinel-2 exports whose name carries the band order `B8, B4, B3`.
const SENTINEL2_MARKER: &str = "sentinel2";
const B843_MARKER: &str = "b843";

/// Produce a display label for a band.
pub fn band_label(description: &str, index: u32, filename: &str) -> String {
    let desc = description.to_lowercase();
    let fname = filename.to_lowercase();

    if fname.contains(SENTINEL2_MARKER) && fname.contains(B843_MARKER) {
        match index {
            1 => return "Infrarrojo Cercano (B8)".to_string(),
            2 => return "Roja (B4)".to_string(),
            3 => return "Verde (B3)".to_string(),
            _ => {}
        }
    }

    // "infrared" contains "red", so near-infrared is matched first.
    if desc.contains("nir") || desc.contains("infrared") {
        return "Infrarrojo Cercano (NIR)".to_string();
    }
    if desc.contains("red") {
        return "Roja".to_string();
    }
    if desc.contains("green") {
        return "Verde".to_string();
    }
    if desc.contains("blue") {
        return "Azul".to_string();
    }

    if description.trim().is_empty() {
        format!("Banda {}", index)
    } else {
        description.to_string()
    }
}
