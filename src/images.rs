//! Screenshot validation.
//!
//! A submitted screenshot must look like a real image before it is stored
//! and handed to the OCR engine:
//! - Magic bytes match a known format (PNG, JPEG, GIF, WebP)
//! - Not HTML content
//! - Successfully decodes

/// Returns true if the bytes represent a usable screenshot.
pub fn validate_screenshot(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }

    if !has_valid_magic_bytes(bytes) {
        return false;
    }

    if is_html_content(bytes) {
        return false;
    }

    image::load_from_memory(bytes).is_ok()
}

/// File extension to store a screenshot under, by magic bytes.
pub fn screenshot_extension(bytes: &[u8]) -> &'static str {
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        "jpg"
    } else if bytes.len() >= 4 && bytes[0..4] == *b"GIF8" {
        "gif"
    } else if bytes.len() >= 12 && bytes[0..4] == *b"RIFF" && bytes[8..12] == *b"WEBP" {
        "webp"
    } else {
        "png"
    }
}

fn has_valid_magic_bytes(bytes: &[u8]) -> bool {
    if bytes.len() < 4 {
        return false;
    }

    // PNG: \x89PNG
    if bytes[0..4] == [0x89, 0x50, 0x4E, 0x47] {
        return true;
    }

    // JPEG: \xFF\xD8\xFF
    if bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        return true;
    }

    // GIF: GIF8
    if bytes[0..4] == *b"GIF8" {
        return true;
    }

    // WebP: RIFF at start and WEBP at bytes 8..12
    if bytes.len() >= 12 && bytes[0..4] == *b"RIFF" && bytes[8..12] == *b"WEBP" {
        return true;
    }

    false
}

fn is_html_content(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head).to_lowercase();
    head.trim_start().starts_with("<!doctype html") || head.trim_start().starts_with("<html")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        // 1x1 white pixel, encoded on the fly so the fixture can't rot
        let img = image::RgbImage::from_pixel(1, 1, image::Rgb([255, 255, 255]));
        let mut out = std::io::Cursor::new(vec![]);
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_accepts_png() {
        assert!(validate_screenshot(&tiny_png()));
    }

    #[test]
    fn test_rejects_empty_and_garbage() {
        assert!(!validate_screenshot(&[]));
        assert!(!validate_screenshot(b"not an image at all"));
    }

    #[test]
    fn test_rejects_html_pretending_to_be_image() {
        assert!(!validate_screenshot(b"<!DOCTYPE html><html></html>"));
    }

    #[test]
    fn test_rejects_truncated_png() {
        let mut bytes = tiny_png();
        bytes.truncate(12);
        assert!(!validate_screenshot(&bytes));
    }

    #[test]
    fn test_extension_detection() {
        assert_eq!(screenshot_extension(&tiny_png()), "png");
        assert_eq!(screenshot_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), "jpg");
        assert_eq!(screenshot_extension(b"GIF89a..."), "gif");
    }
}
