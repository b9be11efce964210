/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use core::fmt::{Debug, Formatter};

use zune_inflate::errors::InflateDecodeErrors;

/// Errors from the forward-only byte reader.
pub enum ByteIoError {
    /// Not enough bytes to satisfy a read
    // requested, available
    NotEnoughBytes(usize, usize),
    /// An error that may occur randomly
    Generic(&'static str)
}

impl Debug for ByteIoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            ByteIoError::NotEnoughBytes(requested, available) => {
                writeln!(
                    f,
                    "Not enough bytes, requested {requested} but only {available} remain"
                )
            }
            ByteIoError::Generic(err) => {
                writeln!(f, "Generic I/O error: {err}")
            }
        }
    }
}

/// Errors that can occur during PSP decoding
///
/// The variants fall in two families: structural violations of the
/// container ([`Format`](Self::Format), [`IoErrors`](Self::IoErrors),
/// [`ZlibDecodeErrors`](Self::ZlibDecodeErrors), ...) and streams that are
/// well formed but use a combination this decoder does not handle, for
/// which [`is_unsupported`](Self::is_unsupported) returns true.
#[non_exhaustive]
pub enum PspDecodeErrors {
    /// The stream violates a structural invariant of the container
    Format(&'static str),
    /// Major versions below 3 use a different container layout
    UnsupportedVersion(u16),
    /// Compression code outside none/RLE/LZ77
    UnsupportedCompression(u16),
    /// Bit depth outside the supported set.
    // depth, grayscale flag
    UnsupportedBitDepth(u16, bool),
    /// Too large dimensions for a given width or height
    TooLargeDimensions(&'static str, usize, usize),
    /// A calculation overflowed
    OverflowOccurred,
    /// Truncation of the underlying stream
    IoErrors(ByteIoError),
    /// The zlib stream inside a channel block is corrupt
    ZlibDecodeErrors(InflateDecodeErrors)
}

impl Debug for PspDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Format(reason) => {
                writeln!(f, "Invalid format: {reason}")
            }
            Self::UnsupportedVersion(version) => {
                writeln!(
                    f,
                    "Unsupported file version {version}, only major versions >= 3 are supported"
                )
            }
            Self::UnsupportedCompression(comp) => {
                writeln!(f, "Unsupported compression ({comp:#06x})")
            }
            Self::UnsupportedBitDepth(depth, grayscale) => {
                if *grayscale {
                    writeln!(f, "Unsupported bit depth {depth} for grayscale image")
                } else {
                    writeln!(f, "Unsupported bit depth {depth}")
                }
            }
            Self::TooLargeDimensions(dimension, expected, found) => {
                writeln!(
                    f,
                    "Too large dimensions for {dimension}, {found} exceeds {expected}"
                )
            }
            Self::OverflowOccurred => {
                writeln!(f, "Overflow occurred")
            }
            Self::IoErrors(err) => {
                writeln!(f, "I/O error: {err:?}")
            }
            Self::ZlibDecodeErrors(err) => {
                writeln!(f, "Zlib error: {err:?}")
            }
        }
    }
}

impl PspDecodeErrors {
    /// Return true if the stream was structurally valid but used a
    /// feature combination the decoder does not handle.
    pub const fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedVersion(_)
                | Self::UnsupportedCompression(_)
                | Self::UnsupportedBitDepth(..)
        )
    }
}

impl From<&'static str> for PspDecodeErrors {
    fn from(r: &'static str) -> Self {
        Self::Format(r)
    }
}

impl From<ByteIoError> for PspDecodeErrors {
    fn from(r: ByteIoError) -> Self {
        match r {
            // reader-level invariant violations are format errors,
            // only genuine truncation is surfaced as I/O
            ByteIoError::Generic(reason) => Self::Format(reason),
            err => Self::IoErrors(err)
        }
    }
}

impl From<InflateDecodeErrors> for PspDecodeErrors {
    fn from(r: InflateDecodeErrors) -> Self {
        Self::ZlibDecodeErrors(r)
    }
}
