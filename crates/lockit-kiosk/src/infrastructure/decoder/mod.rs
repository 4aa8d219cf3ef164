//! QR decoding with `rqrr`.
//!
//! `rqrr` works on greyscale images, so each RGBA [`Frame`] is converted to
//! luma on the fly while the prepared image is built.  Only the first grid
//! that decodes cleanly is returned; a frame showing two codes yields one.

pub mod mock;

use lockit_core::{Frame, ScanResult};
use rqrr::PreparedImage;
use tracing::debug;

use crate::application::scan_frames::QrDecoder;

/// [`QrDecoder`] backed by the pure-Rust `rqrr` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl QrDecoder for RqrrDecoder {
    fn decode(&self, frame: &Frame) -> Option<ScanResult> {
        if frame.is_empty() {
            return None;
        }

        let mut prepared = PreparedImage::prepare_from_greyscale(
            frame.width() as usize,
            frame.height() as usize,
            |x, y| frame.luma_at(x as u32, y as u32),
        );

        prepared.detect_grids().into_iter().find_map(|grid| match grid.decode() {
            Ok((meta, text)) => {
                debug!(version = meta.version.0, "QR grid decoded");
                Some(ScanResult::new(text))
            }
            Err(e) => {
                debug!("QR grid found but not decodable: {e:?}");
                None
            }
        })
    }
}
