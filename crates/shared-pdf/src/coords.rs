//! Coordinate transformation from normalized page fractions to PDF space

use serde::{Deserialize, Serialize};

/// A rectangle in PDF user space: lower-left corner plus size, in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PdfRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// `[x1 y1 x2 y2]` as written in a /Rect entry
    pub fn corners(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// `[x, y, width, height]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

/// Convert a normalized placement to PDF coordinates.
///
/// `x`, `y`, `width` and `height` are fractions of the page (top-left origin
/// for `y`); `media_box` is `[x, y, width, height]` of the page. The result is
/// anchored at the lower-left corner `(x*W, H - y*H)`, both shifted by the
/// MediaBox origin.
pub fn normalized_to_pdf(x: f64, y: f64, width: f64, height: f64, media_box: [f64; 4]) -> PdfRect {
    let [mb_x, mb_y, mb_width, mb_height] = media_box;

    let pdf_x = mb_x + x * mb_width;
    // Flip Y axis
    let pdf_y = mb_y + (mb_height - y * mb_height);

    PdfRect::new(pdf_x, pdf_y, width * mb_width, height * mb_height)
}

/// Inverse of [`normalized_to_pdf`] for the anchor point
pub fn pdf_to_normalized(pdf_x: f64, pdf_y: f64, media_box: [f64; 4]) -> (f64, f64) {
    let [mb_x, mb_y, mb_width, mb_height] = media_box;

    let x = (pdf_x - mb_x) / mb_width;
    let y = 1.0 - (pdf_y - mb_y) / mb_height;

    (x, y)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: the anchor point round-trips through normalized space
        #[test]
        fn anchor_roundtrip(
            x in 0.0f64..=1.0,
            y in 0.0f64..=1.0,
            mb_x in -500.0f64..500.0,
            mb_y in -500.0f64..500.0,
            w in 1.0f64..5000.0,
            h in 1.0f64..5000.0,
        ) {
            let media_box = [mb_x, mb_y, w, h];
            let rect = normalized_to_pdf(x, y, 0.1, 0.1, media_box);
            let (back_x, back_y) = pdf_to_normalized(rect.x, rect.y, media_box);
            prop_assert!((back_x - x).abs() < 1e-9);
            prop_assert!((back_y - y).abs() < 1e-9);
        }

        /// Property: placements inside the page stay inside the MediaBox
        #[test]
        fn stays_on_page(x in 0.0f64..=1.0, y in 0.0f64..=1.0) {
            let rect = normalized_to_pdf(x, y, 0.0, 0.0, [0.0, 0.0, 612.0, 792.0]);
            prop_assert!(rect.x >= 0.0 && rect.x <= 612.0);
            prop_assert!(rect.y >= 0.0 && rect.y <= 792.0);
        }
    }
}
