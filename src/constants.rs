/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! On-disk vocabulary of the PSP container.

#![allow(clippy::upper_case_acronyms)]

/// The 32-byte file signature: the ASCII banner, a SUB byte and five
/// NUL bytes of padding.
pub const PSP_FILE_SIGNATURE: [u8; 32] = *b"Paint Shop Pro Image File\n\x1a\x00\x00\x00\x00\x00";

/// Magic prefix of every block header.
pub const BLOCK_MAGIC: [u8; 4] = *b"~BK\x00";

/// Magic prefix of every chunk header.
pub const CHUNK_MAGIC: [u8; 4] = *b"~FL\x00";

/// Sub-block id of unknown purpose seen in major version 13 files.
///
/// Observed to be all zeros; the skip heuristic for it lives in the
/// decoder.
pub(crate) const V13_UNKNOWN_SUB_BLOCK: u16 = 33;

/// Block identifiers (PSPBlockID)
///
/// Only a handful of these drive decoding; the rest are recognized so
/// they can be skipped by their declared length.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlockId {
    /// General Image Attributes Block (main)
    ImageAttributes,
    /// Creator Data Block (main)
    Creator,
    /// Color Palette Block (main and sub)
    ColorPalette,
    /// Layer Bank Block (main)
    LayerBank,
    /// Layer Block (sub)
    Layer,
    /// Channel Block (sub)
    Channel,
    /// Selection Block (main)
    Selection,
    /// Alpha Bank Block (main)
    AlphaBank,
    /// Alpha Channel Block (sub)
    AlphaChannel,
    /// Thumbnail Block (main)
    Thumbnail,
    /// Extended Data Block (main)
    ExtendedData,
    /// Picture Tube Data Block (main)
    Tube,
    /// Adjustment Layer Extension Block (sub) (since PSP6)
    AdjustmentExtension,
    /// Vector Layer Extension Block (sub) (since PSP6)
    VectorExtension,
    /// Vector Shape Block (sub) (since PSP6)
    Shape,
    /// Paint Style Block (sub) (since PSP6)
    PaintStyle,
    /// Composite Image Bank (main) (since PSP6)
    CompositeImageBank,
    /// Composite Image Attributes (sub) (since PSP6)
    CompositeAttributes,
    /// JPEG Image Block (sub) (since PSP6)
    Jpeg,
    /// Line Style Block (sub) (since PSP7)
    LineStyle,
    /// Table Bank Block (main) (since PSP7)
    TableBank,
    /// Table Block (sub) (since PSP7)
    Table,
    /// Vector Table Paper Block (sub) (since PSP7)
    Paper,
    /// Vector Table Pattern Block (sub) (since PSP7)
    Pattern,
    /// Vector Table Gradient Block (not used) (since PSP8)
    Gradient,
    /// Group Layer Block (sub) (since PSP8)
    GroupExtension,
    /// Mask Layer Block (sub) (since PSP8)
    MaskExtension,
    /// Brush Data Block (main) (since PSP8)
    Brush
}

impl BlockId {
    pub fn from_int(int: u16) -> Option<BlockId> {
        match int {
            0 => Some(Self::ImageAttributes),
            1 => Some(Self::Creator),
            2 => Some(Self::ColorPalette),
            3 => Some(Self::LayerBank),
            4 => Some(Self::Layer),
            5 => Some(Self::Channel),
            6 => Some(Self::Selection),
            7 => Some(Self::AlphaBank),
            8 => Some(Self::AlphaChannel),
            9 => Some(Self::Thumbnail),
            10 => Some(Self::ExtendedData),
            11 => Some(Self::Tube),
            12 => Some(Self::AdjustmentExtension),
            13 => Some(Self::VectorExtension),
            14 => Some(Self::Shape),
            15 => Some(Self::PaintStyle),
            16 => Some(Self::CompositeImageBank),
            17 => Some(Self::CompositeAttributes),
            18 => Some(Self::Jpeg),
            19 => Some(Self::LineStyle),
            20 => Some(Self::TableBank),
            21 => Some(Self::Table),
            22 => Some(Self::Paper),
            23 => Some(Self::Pattern),
            24 => Some(Self::Gradient),
            25 => Some(Self::GroupExtension),
            26 => Some(Self::MaskExtension),
            27 => Some(Self::Brush),
            _ => None
        }
    }
}

/// Possible types of compression (PSPCompression)
///
/// JPEG compression also exists in the wild but is only used by
/// thumbnail and composite blocks, which are skipped.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CompressionMethod {
    NoCompression = 0,
    RLE = 1,
    LZ77 = 2
}

impl CompressionMethod {
    pub fn from_int(int: u16) -> Option<CompressionMethod> {
        match int {
            0 => Some(Self::NoCompression),
            1 => Some(Self::RLE),
            2 => Some(Self::LZ77),
            _ => None
        }
    }
}

/// Bitmap type carried by a channel block (PSPDIBType)
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BitmapKind {
    /// Layer color bitmap
    Image,
    /// Layer transparency mask bitmap
    TransparencyMask,
    /// Layer user mask bitmap
    UserMask,
    /// Selection mask bitmap
    Selection,
    /// Alpha channel mask bitmap
    AlphaMask,
    /// Thumbnail bitmap
    Thumbnail,
    /// Thumbnail transparency mask (since PSP6)
    ThumbnailTransparencyMask,
    /// Adjustment layer bitmap (since PSP6)
    AdjustmentLayer,
    /// Composite image bitmap (since PSP6)
    Composite,
    /// Composite image transparency (since PSP6)
    CompositeTransparencyMask,
    /// Paper bitmap (since PSP7)
    Paper,
    /// Pattern bitmap (since PSP7)
    Pattern,
    /// Pattern transparency mask (since PSP7)
    PatternTransparencyMask
}

impl BitmapKind {
    pub fn from_int(int: u16) -> Option<BitmapKind> {
        match int {
            0 => Some(Self::Image),
            1 => Some(Self::TransparencyMask),
            2 => Some(Self::UserMask),
            3 => Some(Self::Selection),
            4 => Some(Self::AlphaMask),
            5 => Some(Self::Thumbnail),
            6 => Some(Self::ThumbnailTransparencyMask),
            7 => Some(Self::AdjustmentLayer),
            8 => Some(Self::Composite),
            9 => Some(Self::CompositeTransparencyMask),
            10 => Some(Self::Paper),
            11 => Some(Self::Pattern),
            12 => Some(Self::PatternTransparencyMask),
            _ => None
        }
    }
}

/// Channel types (PSPChannelType)
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ChannelKind {
    /// Channel of a single channel bitmap
    Composite,
    /// Red channel of a 24 bit bitmap
    Red,
    /// Green channel of a 24 bit bitmap
    Green,
    /// Blue channel of a 24 bit bitmap
    Blue
}

impl ChannelKind {
    pub fn from_int(int: u16) -> Option<ChannelKind> {
        match int {
            0 => Some(Self::Composite),
            1 => Some(Self::Red),
            2 => Some(Self::Green),
            3 => Some(Self::Blue),
            _ => None
        }
    }
}

/// Layer types (PSPLayerType)
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LayerKind {
    /// Normal layer
    Normal,
    /// Floating selection layer
    FloatingSelection
}

impl LayerKind {
    pub fn from_int(int: u8) -> Option<LayerKind> {
        match int {
            0 => Some(Self::Normal),
            1 => Some(Self::FloatingSelection),
            _ => None
        }
    }
}

/// Possible metrics used to measure resolution (PSP_METRIC)
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResolutionMetric {
    Undefined,
    Inch,
    Centimeter
}

impl ResolutionMetric {
    pub fn from_int(int: u8) -> Option<ResolutionMetric> {
        match int {
            0 => Some(Self::Undefined),
            1 => Some(Self::Inch),
            2 => Some(Self::Centimeter),
            _ => None
        }
    }
}

/// The pixel model of the decoded output.
///
/// Derived from the image attributes block; `Paletted` is reported once
/// a color palette block has been decoded.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ColorModel {
    /// 8-bit grayscale, one byte per pixel
    Gray8,
    /// 16-bit grayscale, two big-endian bytes per pixel
    Gray16,
    /// 8-bit RGBA, four bytes per pixel
    Rgba8,
    /// 16-bit RGBA, eight bytes per pixel, big-endian samples
    Rgba16,
    /// Palette indices, one byte per pixel
    Paletted
}

// Creator field types (PSPCreatorFieldID)
pub(crate) const CREATOR_FIELD_TITLE: u16 = 0;
pub(crate) const CREATOR_FIELD_CREATION_DATE: u16 = 1;
pub(crate) const CREATOR_FIELD_MODIFICATION_DATE: u16 = 2;
pub(crate) const CREATOR_FIELD_ARTIST: u16 = 3;
pub(crate) const CREATOR_FIELD_COPYRIGHT: u16 = 4;
pub(crate) const CREATOR_FIELD_DESCRIPTION: u16 = 5;
pub(crate) const CREATOR_FIELD_APP_ID: u16 = 6;
pub(crate) const CREATOR_FIELD_APP_VERSION: u16 = 7;

// Extended data field types (PSPExtendedDataID)
pub(crate) const XDATA_TRANSPARENCY_INDEX: u16 = 0;
