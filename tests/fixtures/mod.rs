//! Test fixtures: small generated images and canned vision model replies

#![allow(dead_code)]

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

/// A tiny solid-color PNG. Different colors give different bytes, which is
/// how the stub analyzer tells uploads apart.
pub fn solid_png(r: u8, g: u8, b: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(4, 4, Rgb([r, g, b]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .expect("encode PNG fixture");
    buf.into_inner()
}

pub const CAT_REPLY: &str =
    "DESCRIPTION: A black cat on a white sofa\nTAGS: cat, animal, sofa, indoor\nCOLORS: #000000, #FFFFFF";

/// Shares two tags and one color with [`CAT_REPLY`]: score 5.
pub const KITTEN_REPLY: &str =
    "DESCRIPTION: A kitten playing\nTAGS: cat, animal, toy\nCOLORS: #000000, #FF8800";

/// Shares one tag and one color with [`CAT_REPLY`]: score 3.
pub const DOG_REPLY: &str =
    "DESCRIPTION: A dog on a sofa\nTAGS: dog, sofa\nCOLORS: #FFFFFF";

/// Nothing in common with [`CAT_REPLY`].
pub const BEACH_REPLY: &str =
    "DESCRIPTION: A sunny beach\nTAGS: beach, sea, sand\nCOLORS: #00AAFF, #FFEE99";

pub const GARBLED_REPLY: &str = "Sorry, I could not make sense of this picture.";
