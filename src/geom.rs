//! Page geometry: boundary rectangles and fractional crop margins
//!
//! PDF user space puts the origin at the lower-left corner with Y increasing
//! upward. Crop margins arrive in the screen convention used by selection
//! UIs (top-left origin, Y increasing downward); [`CropMargins::apply_to`]
//! performs the axis flip.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in PDF user-space units.
///
/// Stored as lower-left and upper-right corners, matching the on-disk
/// `[llx lly urx ury]` array form of the PDF boundary boxes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Lower-left X
    pub llx: f64,
    /// Lower-left Y
    pub lly: f64,
    /// Upper-right X
    pub urx: f64,
    /// Upper-right Y
    pub ury: f64,
}

impl Rect {
    /// Create a rectangle from its corner coordinates.
    pub fn new(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self { llx, lly, urx, ury }
    }

    /// Width of the rectangle (negative if inverted).
    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    /// Height of the rectangle (negative if inverted).
    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }

    /// True when the rectangle has no positive area (inverted or collapsed).
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

/// Fraction of a page to remove from each edge.
///
/// Values are fractions of the page width (left/right) or height
/// (top/bottom), in the screen convention: `top` trims the visually-top
/// edge, which is the *upper* Y bound in PDF user space. Values are not
/// validated; margins summing past 1.0 on an axis yield an inverted
/// rectangle (see [`CropWriter::set_strict`](crate::CropWriter::set_strict)
/// for the opt-in check).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropMargins {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl CropMargins {
    /// Margins from the (left, top, right, bottom) fractions.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The same fraction on all four edges.
    pub fn uniform(fraction: f64) -> Self {
        Self::new(fraction, fraction, fraction, fraction)
    }

    /// Compute the cropped rectangle.
    ///
    /// `top` subtracts from the upper Y bound and `bottom` adds to the lower
    /// Y bound - the screen-to-PDF axis flip. No clamping is performed.
    pub fn apply_to(&self, rect: Rect) -> Rect {
        let w = rect.width();
        let h = rect.height();
        Rect {
            llx: rect.llx + self.left * w,
            lly: rect.lly + self.bottom * h,
            urx: rect.urx - self.right * w,
            ury: rect.ury - self.top * h,
        }
    }
}

/// Clockwise page rotation, composed into the page's `/Rotate` entry.
///
/// Rotation is display metadata for the renderer; it never changes the
/// numeric box coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl Rotation {
    /// Parse a degree value; returns `None` unless it normalizes to one of
    /// 0/90/180/270.
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Clockwise90),
            180 => Some(Rotation::Clockwise180),
            270 => Some(Rotation::Clockwise270),
            _ => None,
        }
    }

    /// Clockwise degrees represented by this rotation.
    pub fn degrees(self) -> i64 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Clockwise180 => 180,
            Rotation::Clockwise270 => 270,
        }
    }

    /// Compose this rotation onto an existing `/Rotate` value (degrees),
    /// yielding the new normalized `/Rotate` value.
    pub fn compose(self, existing_degrees: i64) -> i64 {
        (existing_degrees + self.degrees()).rem_euclid(360)
    }
}

/// The five boundary boxes of a page, as stored.
///
/// `media` is required by the PDF specification; the others are optional
/// and default to MediaBox when absent. Cropping writes all five boxes
/// explicitly with the same rectangle, so pages emitted by this crate
/// always carry the full set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBoxes {
    pub media: Rect,
    pub crop: Option<Rect>,
    pub bleed: Option<Rect>,
    pub trim: Option<Rect>,
    pub art: Option<Rect>,
}
