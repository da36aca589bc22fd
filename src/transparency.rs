//! transparency.rs
//!
//! Soft-mask coverage derivation and the pixel math behind transparency
//! layers. The interpreter renders the mask's form into a scratch layer;
//! this module turns the snapshot into a destination-in coverage image.

use crate::canvas::RasterImage;
use crate::graphics::SoftMaskSubtype;

/// Converts a rendered mask-form snapshot into a single-channel coverage
/// image stored in the alpha channel (RGB preserved):
///
/// - alpha masks take the alpha channel as-is
/// - luminosity masks compute `0.299 R + 0.587 G + 0.114 B`
///
/// The optional 256-entry transfer table then remaps the coverage.
pub fn derive_coverage(
    snapshot: &RasterImage,
    subtype: SoftMaskSubtype,
    transfer: Option<&[u8; 256]>,
) -> RasterImage {
    let mut out = snapshot.clone();
    for px in out.data.chunks_exact_mut(4) {
        let coverage = match subtype {
            SoftMaskSubtype::Alpha => px[3],
            SoftMaskSubtype::Luminosity => {
                let r = f32::from(px[0]);
                let g = f32::from(px[1]);
                let b = f32::from(px[2]);
                (0.299 * r + 0.587 * g + 0.114 * b + 0.5) as u8
            }
        };
        px[3] = match transfer {
            Some(table) => table[usize::from(coverage)],
            None => coverage,
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn image_of(pixels: &[[u8; 4]]) -> RasterImage {
        RasterImage::from_rgba(
            pixels.len() as u32,
            1,
            pixels.iter().flatten().copied().collect(),
        )
    }

    #[test]
    fn alpha_mask_white_full_alpha_gives_full_coverage() {
        // white-painted content with full alpha: coverage is complete
        // inside the painted area, zero outside
        let snapshot = image_of(&[[255, 255, 255, 255], [0, 0, 0, 0]]);
        let coverage = derive_coverage(&snapshot, SoftMaskSubtype::Alpha, None);
        assert_eq!(coverage.data[3], 255);
        assert_eq!(coverage.data[7], 0);
    }

    #[test]
    fn luminosity_mask_equals_painted_luminance() {
        let snapshot = image_of(&[
            [255, 255, 255, 255], // white -> 255
            [0, 0, 0, 255],       // black -> 0
            [255, 0, 0, 255],     // red -> 0.299
            [0, 255, 0, 255],     // green -> 0.587
        ]);
        let coverage = derive_coverage(&snapshot, SoftMaskSubtype::Luminosity, None);
        assert_eq!(coverage.data[3], 255);
        assert_eq!(coverage.data[7], 0);
        assert_eq!(coverage.data[11], (0.299f32 * 255.0 + 0.5) as u8);
        assert_eq!(coverage.data[15], (0.587f32 * 255.0 + 0.5) as u8);
        // RGB survives for backends that need it
        assert_eq!(&coverage.data[8..11], &[255, 0, 0]);
    }

    #[test]
    fn transfer_table_remaps_coverage() {
        let mut invert = [0u8; 256];
        for (i, v) in invert.iter_mut().enumerate() {
            *v = 255 - i as u8;
        }
        let snapshot = image_of(&[[255, 255, 255, 255], [0, 0, 0, 255]]);
        let coverage = derive_coverage(&snapshot, SoftMaskSubtype::Luminosity, Some(&invert));
        assert_eq!(coverage.data[3], 0);
        assert_eq!(coverage.data[7], 255);
    }
}
