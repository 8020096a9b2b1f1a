//! QR encoder that renders SVG and wraps it in a base64 `data:` URL.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use qrcode::render::svg;
use qrcode::QrCode;

use crate::errors::AdapterError;
use crate::models::QrImage;
use crate::QrEncoder;

#[derive(Debug, Clone, Copy)]
pub struct SvgQrEncoder {
    min_dimension: u32,
}

impl SvgQrEncoder {
    pub fn new(min_dimension: u32) -> Self {
        Self { min_dimension }
    }
}

impl Default for SvgQrEncoder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl QrEncoder for SvgQrEncoder {
    fn encode(&self, payload: &str) -> Result<QrImage, AdapterError> {
        let code = QrCode::new(payload.as_bytes())
            .map_err(|err| AdapterError::QrEncoding(err.to_string()))?;

        let image = code
            .render::<svg::Color>()
            .min_dimensions(self.min_dimension, self.min_dimension)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();

        Ok(QrImage {
            data_url: format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)),
        })
    }
}
