use anyhow::{Result, anyhow};
use image::{GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};
use tracing::debug;

use crate::profile::{ErrorCorrection, QrSettings};

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

#[derive(Debug, Clone)]
pub struct QrRaster {
    pub image: GrayImage,
    pub modules: usize,
    pub version: String,
}

impl QrRaster {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

pub fn render_qr(payload: &str, settings: &QrSettings) -> Result<QrRaster> {
    let code = QrCode::with_error_correction_level(
        payload.as_bytes(),
        ec_level(settings.error_correction),
    )
    .map_err(|err| {
        anyhow!(
            "failed to encode QR payload ({} bytes): {err:?}",
            payload.len()
        )
    })?;

    let modules = code.width();
    let colors = code.to_colors();
    let border = settings.quiet_zone_modules as usize;
    let scale = settings.module_pixels.max(1);
    let side_modules = modules + 2 * border;
    let side_pixels = u32::try_from(side_modules)
        .ok()
        .and_then(|side| side.checked_mul(scale))
        .ok_or_else(|| anyhow!("QR raster of {side_modules} modules is too large"))?;

    let image = GrayImage::from_fn(side_pixels, side_pixels, |x, y| {
        let column = (x / scale) as usize;
        let row = (y / scale) as usize;
        if column < border || row < border || column >= modules + border || row >= modules + border
        {
            return LIGHT;
        }
        match colors[(row - border) * modules + (column - border)] {
            Color::Dark => DARK,
            Color::Light => LIGHT,
        }
    });

    let version = format!("{:?}", code.version());
    debug!(
        modules,
        version = %version,
        pixels = side_pixels,
        "rendered QR code"
    );

    Ok(QrRaster {
        image,
        modules,
        version,
    })
}

fn ec_level(level: ErrorCorrection) -> EcLevel {
    match level {
        ErrorCorrection::L => EcLevel::L,
        ErrorCorrection::M => EcLevel::M,
        ErrorCorrection::Q => EcLevel::Q,
        ErrorCorrection::H => EcLevel::H,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_qr_applies_quiet_zone_and_module_scale() {
        let settings = QrSettings {
            module_pixels: 3,
            quiet_zone_modules: 4,
            ..QrSettings::default()
        };
        let raster = render_qr("3201 004B", &settings).unwrap();

        let expected_side = ((raster.modules + 8) * 3) as u32;
        assert_eq!(raster.width(), expected_side);
        assert_eq!(raster.height(), expected_side);
        assert_eq!(raster.image.get_pixel(0, 0), &LIGHT);
        assert_eq!(raster.image.get_pixel(11, 11), &LIGHT);
        // Finder pattern corner module is always dark.
        assert_eq!(raster.image.get_pixel(12, 12), &DARK);
    }

    #[test]
    fn render_qr_grows_version_with_payload() {
        let settings = QrSettings::default();
        let short = render_qr("a", &settings).unwrap();
        let long = render_qr(&"3201 Kota Bandung ".repeat(8), &settings).unwrap();
        assert!(long.modules > short.modules);
    }

    #[test]
    fn render_qr_rejects_payload_beyond_capacity() {
        let settings = QrSettings::default();
        assert!(render_qr(&"x".repeat(4000), &settings).is_err());
    }
}
