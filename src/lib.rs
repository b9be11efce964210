//! A Paint Shop Pro image decoder
//!
//! This crate features a decoder for the Jasc/Corel Paint Shop Pro
//! native container (`.psp`, `.pspimage`), major versions 3 through 13.
//!
//! ## What it decodes
//! The container stores layered documents; this library extracts the
//! first raster layer without flattening, together with the color
//! palette, resolution and creator metadata. Vector layers, adjustment
//! layers, thumbnails, picture tubes and the other exotic block
//! families are recognized and skipped, not interpreted.
//!
//! All three pixel compression schemes used by raster layers are
//! handled: uncompressed, byte RLE and LZ77 (zlib).
//!
//! # Example
//! - Reading a psp file
//! ```no_run
//! use zune_psp::{PixelData, PspDecoder};
//! use zune_psp::errors::PspDecodeErrors;
//!
//! fn main() -> Result<(), PspDecodeErrors> {
//!     let file_contents = std::fs::read("image.pspimage").unwrap();
//!     let mut decoder = PspDecoder::new(&file_contents);
//!     let image = decoder.decode()?;
//!
//!     match &image.data {
//!         PixelData::Rgba8(pixels) => println!("rgba, {} bytes", pixels.len()),
//!         PixelData::Paletted { indices, palette } => {
//!             println!("{} indices into {} colors", indices.len(), palette.len());
//!         }
//!         _ => {}
//!     }
//!     Ok(())
//! }
//! ```
#![no_std]
#![forbid(unsafe_code)]
extern crate alloc;

pub use decoder::{probe_psp, CreatorInfo, PaletteEntry, PixelData, PspDecoder, PspImage};
pub use errors::PspDecodeErrors;

mod bytestream;
pub mod constants;
pub mod decoder;
pub mod errors;
pub mod options;
