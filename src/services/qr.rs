use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use std::io::Cursor;

use crate::error::{AppError, AppResult};

/// Pixel size of a single QR module
const MODULE_PIXELS: u32 = 10;

/// Encodes `data` as a black-on-white QR code PNG
///
/// Uses the lowest error correction level and keeps the standard quiet zone.
pub fn qr_png(data: &str) -> AppResult<Vec<u8>> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)
        .map_err(|e| AppError::Internal(format!("QR encoding failed: {}", e)))?;

    let rendered = code
        .render::<Luma<u8>>()
        .module_dimensions(MODULE_PIXELS, MODULE_PIXELS)
        .quiet_zone(true)
        .dark_color(Luma([0u8]))
        .light_color(Luma([255u8]))
        .build();

    let mut png = Vec::new();
    rendered
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| AppError::Internal(format!("QR rendering failed: {}", e)))?;

    tracing::debug!(
        width = rendered.width(),
        bytes = png.len(),
        "Rendered QR code"
    );

    Ok(png)
}
