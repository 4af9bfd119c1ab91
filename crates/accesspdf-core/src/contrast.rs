//! WCAG 2.1 contrast ratio math (Success Criterion 1.4.3).

/// An sRGB color with 0-255 channels.
pub type Rgb = (u8, u8, u8);

/// Color space of PDF color operands (`g`/`rg`/`k` and their stroking forms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfColorSpace {
    Gray,
    Rgb,
    Cmyk,
}

fn srgb_to_linear(v: f64) -> f64 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Relative luminance of an sRGB color.
pub fn relative_luminance((r, g, b): Rgb) -> f64 {
    let r = srgb_to_linear(f64::from(r) / 255.0);
    let g = srgb_to_linear(f64::from(g) / 255.0);
    let b = srgb_to_linear(f64::from(b) / 255.0);
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

/// Contrast ratio between two colors, from 1.0 (identical) to 21.0.
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let la = relative_luminance(a);
    let lb = relative_luminance(b);
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

/// Whether a ratio meets WCAG AA: 4.5:1 for normal text, 3:1 for large text.
pub fn passes_aa(ratio: f64, large_text: bool) -> bool {
    let threshold = if large_text { 3.0 } else { 4.5 };
    ratio >= threshold
}

fn clamp_channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Convert PDF color operands (components in 0..=1) to sRGB.
/// Too few operands yields black.
pub fn parse_pdf_color(operands: &[f64], space: PdfColorSpace) -> Rgb {
    match (space, operands) {
        (PdfColorSpace::Rgb, [r, g, b, ..]) => (
            clamp_channel(r * 255.0),
            clamp_channel(g * 255.0),
            clamp_channel(b * 255.0),
        ),
        (PdfColorSpace::Gray, [v, ..]) => {
            let v = clamp_channel(v * 255.0);
            (v, v, v)
        }
        (PdfColorSpace::Cmyk, [c, m, y, k, ..]) => (
            clamp_channel(255.0 * (1.0 - c) * (1.0 - k)),
            clamp_channel(255.0 * (1.0 - m) * (1.0 - k)),
            clamp_channel(255.0 * (1.0 - y) * (1.0 - k)),
        ),
        _ => (0, 0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_on_white_is_21() {
        let ratio = contrast_ratio((0, 0, 0), (255, 255, 255));
        assert!((ratio - 21.0).abs() < 0.01, "got {ratio}");
    }

    #[test]
    fn ratio_is_symmetric() {
        let a = contrast_ratio((10, 20, 30), (200, 210, 220));
        let b = contrast_ratio((200, 210, 220), (10, 20, 30));
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn light_gray_on_white_fails_aa() {
        let ratio = contrast_ratio((217, 217, 217), (255, 255, 255));
        assert!(ratio < 4.5);
        assert!(!passes_aa(ratio, false));
    }

    #[test]
    fn large_text_threshold() {
        assert!(passes_aa(3.2, true));
        assert!(!passes_aa(3.2, false));
        assert!(passes_aa(4.5, false));
    }

    #[test]
    fn identical_colors_have_ratio_one() {
        assert!((contrast_ratio((120, 120, 120), (120, 120, 120)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn parses_pdf_operands() {
        assert_eq!(parse_pdf_color(&[1.0, 0.0, 0.0], PdfColorSpace::Rgb), (255, 0, 0));
        assert_eq!(parse_pdf_color(&[0.5], PdfColorSpace::Gray), (128, 128, 128));
        assert_eq!(
            parse_pdf_color(&[0.0, 0.0, 0.0, 1.0], PdfColorSpace::Cmyk),
            (0, 0, 0)
        );
        assert_eq!(
            parse_pdf_color(&[0.0, 0.0, 0.0, 0.0], PdfColorSpace::Cmyk),
            (255, 255, 255)
        );
        assert_eq!(parse_pdf_color(&[], PdfColorSpace::Rgb), (0, 0, 0));
    }
}
