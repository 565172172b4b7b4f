use qrcode_generator::QrCodeEcc;

use crate::error::ComputeError;

/// Side length of rendered QR codes in pixels
pub const DEFAULT_QR_SIZE: usize = 1024;

/// Render `text` as a QR code PNG
pub fn render_qr(text: &str, size: usize) -> Result<Vec<u8>, ComputeError> {
    qrcode_generator::to_png_to_vec(text, QrCodeEcc::Low, size)
        .map_err(|err| ComputeError::Qr(format!("{err:?}")))
}
