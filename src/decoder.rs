/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A Paint Shop Pro image reader.
//!
//! The container is a sequence of length-prefixed blocks; creator and
//! extended-data blocks are tiled by smaller length-prefixed chunks.
//! Decoding walks the top level once, descends into the layer bank and
//! returns the first layer that carries pixel data, reassembled from
//! its per-channel compressed streams.

use alloc::vec;
use alloc::vec::Vec;

use log::{trace, warn};
use zune_inflate::{DeflateDecoder, DeflateOptions};

use crate::bytestream::ByteReader;
use crate::constants::{
    BitmapKind, BlockId, ChannelKind, ColorModel, CompressionMethod, LayerKind, ResolutionMetric,
    BLOCK_MAGIC, CHUNK_MAGIC, CREATOR_FIELD_APP_ID, CREATOR_FIELD_APP_VERSION,
    CREATOR_FIELD_ARTIST, CREATOR_FIELD_COPYRIGHT, CREATOR_FIELD_CREATION_DATE,
    CREATOR_FIELD_DESCRIPTION, CREATOR_FIELD_MODIFICATION_DATE, CREATOR_FIELD_TITLE,
    PSP_FILE_SIGNATURE, V13_UNKNOWN_SUB_BLOCK, XDATA_TRANSPARENCY_INDEX
};
use crate::errors::PspDecodeErrors;
use crate::options::DecoderOptions;

/// Bytes taken by the blend range list of a layer block.
// 5 source/destination range pairs, 4 bytes each
const BLEND_RANGE_BYTES: usize = 4 * 2 * 5;

/// Probe some bytes to see
/// if they consist of a PSP image
pub fn probe_psp(bytes: &[u8]) -> bool {
    match bytes.get(0..PSP_FILE_SIGNATURE.len()) {
        Some(signature) => signature == &PSP_FILE_SIGNATURE,
        None => false
    }
}

/// A single RGBA palette entry.
///
/// The fourth byte on disk is padding, not alpha; decoded entries are
/// always fully opaque.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct PaletteEntry {
    pub red:   u8,
    pub green: u8,
    pub blue:  u8,
    pub alpha: u8
}

/// Document metadata from the creator block.
///
/// The format does not specify a text encoding, so string fields are
/// exposed as raw bytes. Dates are seconds since the Unix epoch.
#[derive(Clone, Default, Debug)]
pub struct CreatorInfo {
    pub title:             Option<Vec<u8>>,
    pub creation_date:     Option<u32>,
    pub modification_date: Option<u32>,
    pub artist:            Option<Vec<u8>>,
    pub copyright:         Option<Vec<u8>>,
    pub description:       Option<Vec<u8>>,
    pub app_id:            Option<u32>,
    pub app_version:       Option<u32>
}

/// A decoded raster image.
#[derive(Debug)]
pub struct PspImage {
    /// Width in pixels of the decoded layer region
    pub width:  usize,
    /// Height in pixels of the decoded layer region
    pub height: usize,
    /// The pixels, tagged by their layout
    pub data:   PixelData
}

/// Pixel storage for each supported output model.
///
/// 16-bit samples are stored as big-endian byte pairs.
#[derive(Debug)]
pub enum PixelData {
    /// 8-bit grayscale, one byte per pixel
    Gray8(Vec<u8>),
    /// 16-bit grayscale, two bytes per pixel
    Gray16(Vec<u8>),
    /// Four bytes per pixel, `R G B A` order
    Rgba8(Vec<u8>),
    /// Eight bytes per pixel, `R G B A` order
    Rgba16(Vec<u8>),
    /// Palette indices, one byte per pixel, plus the palette they
    /// index into
    Paletted {
        indices: Vec<u8>,
        palette: Vec<PaletteEntry>
    }
}

impl PixelData {
    /// Borrow the raw bytes regardless of layout.
    pub fn bytes(&self) -> &[u8] {
        match self {
            PixelData::Gray8(b)
            | PixelData::Gray16(b)
            | PixelData::Rgba8(b)
            | PixelData::Rgba16(b) => b,
            PixelData::Paletted { indices, .. } => indices
        }
    }

    /// Consume the image returning the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            PixelData::Gray8(b)
            | PixelData::Gray16(b)
            | PixelData::Rgba8(b)
            | PixelData::Rgba16(b) => b,
            PixelData::Paletted { indices, .. } => indices
        }
    }
}

/// A rectangle stored on disk as `left, top, right, bottom`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
struct Rect {
    left:   i32,
    top:    i32,
    right:  i32,
    bottom: i32
}

impl Rect {
    fn width(&self) -> Option<usize> {
        let span = i64::from(self.right) - i64::from(self.left);
        usize::try_from(span).ok()
    }

    fn height(&self) -> Option<usize> {
        let span = i64::from(self.bottom) - i64::from(self.top);
        usize::try_from(span).ok()
    }
}

/// Layer metadata, alive only while its channels are drained.
#[derive(Clone, Debug, Default)]
struct Layer {
    name:                   Vec<u8>,
    kind:                   u8,
    rect:                   Rect,
    saved_rect:             Rect,
    opacity:                u8,
    blend_mode:             u8,
    visible:                bool,
    transparency_protected: bool,
    link_group_id:          u8,
    mask_rect:              Rect,
    saved_mask_rect:        Rect,
    mask_linked:            bool,
    mask_disabled:          bool,
    invert_mask_on_blend:   bool,
    blend_range_count:      u16,
    bitmap_count:           u16,
    channel_count:          u16
}

struct BlockHeader {
    id:       u16,
    data_len: usize
}

impl BlockHeader {
    fn kind(&self) -> Option<BlockId> {
        BlockId::from_int(self.id)
    }
}

struct ChunkHeader {
    keyword:  u16,
    data_len: usize
}

/// In-flight pixel buffer for the layer being reassembled.
struct LayerImage {
    width:  usize,
    height: usize,
    format: LayerFormat,
    pixels: Vec<u8>,
    /// Expected decompressed byte count of one channel payload
    payload: usize
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum LayerFormat {
    Gray8,
    Gray16,
    Rgba8,
    Rgba16,
    Paletted,
    /// Packed 1-bit indices, eight pixels per payload byte, MSB first
    Paletted1
}

/// A Paint Shop Pro (`.pspimage`) decoder.
///
/// Handles container major versions 3 through 13, reassembling the
/// first raster layer from its per-channel streams. Vector layers,
/// thumbnails, composite images and the other auxiliary block families
/// are recognized and skipped.
///
/// # Usage
/// ```no_run
/// use zune_psp::PspDecoder;
///
/// fn main() -> Result<(), zune_psp::PspDecodeErrors> {
///     let data = [0_u8; 100];
///     let mut decoder = PspDecoder::new(&data[..]);
///     let image = decoder.decode()?;
///     println!("{}x{}", image.width, image.height);
///     Ok(())
/// }
/// ```
pub struct PspDecoder<T: AsRef<[u8]>> {
    stream:             ByteReader<T>,
    options:            DecoderOptions,
    decoded_headers:    bool,
    version_major:      u16,
    version_minor:      u16,
    width:              usize,
    height:             usize,
    resolution:         f64,
    res_metric:         ResolutionMetric,
    compression:        CompressionMethod,
    bit_depth:          u16,
    plane_count:        u16,
    color_count:        u32,
    grayscale:          bool,
    total_image_size:   u32,
    active_layer:       i32,
    layer_count:        u16,
    color_model:        ColorModel,
    transparency_index: Option<u16>,
    creator:            CreatorInfo,
    palette:            Option<Vec<PaletteEntry>>,
    scratch:            Vec<u8>
}

impl<T: AsRef<[u8]>> PspDecoder<T> {
    /// Create a new decoder that reads a PSP encoded file
    /// from `data` and returns pixels
    pub fn new(data: T) -> PspDecoder<T> {
        Self::new_with_options(data, DecoderOptions::default())
    }

    /// Creates a new decoder with options that influence decoding routines
    ///
    /// # Arguments
    /// - data: Data source
    /// - options: Custom options for the decoder
    pub fn new_with_options(data: T, options: DecoderOptions) -> PspDecoder<T> {
        PspDecoder {
            stream: ByteReader::new(data),
            options,
            decoded_headers: false,
            version_major: 0,
            version_minor: 0,
            width: 0,
            height: 0,
            resolution: 0.0,
            res_metric: ResolutionMetric::Undefined,
            compression: CompressionMethod::NoCompression,
            bit_depth: 0,
            plane_count: 0,
            color_count: 0,
            grayscale: false,
            total_image_size: 0,
            active_layer: 0,
            layer_count: 0,
            color_model: ColorModel::Rgba8,
            transparency_index: None,
            creator: CreatorInfo::default(),
            palette: None,
            scratch: Vec::new()
        }
    }

    /// Decode the file signature, version and the general image
    /// attributes block.
    ///
    /// This is enough to answer configuration queries, the stream is
    /// advanced only up to the end of the attributes block. Subsequent
    /// calls are no-ops.
    pub fn decode_headers(&mut self) -> Result<(), PspDecodeErrors> {
        if self.decoded_headers {
            return Ok(());
        }
        let signature = self.stream.read_fixed::<32>()?;

        if signature != PSP_FILE_SIGNATURE {
            return Err(PspDecodeErrors::Format("not a PSP file"));
        }
        self.version_major = self.stream.get_u16_le()?;
        self.version_minor = self.stream.get_u16_le()?;

        if self.version_major < 3 {
            return Err(PspDecodeErrors::UnsupportedVersion(self.version_major));
        }

        let header = self.read_block_header()?;

        if header.kind() != Some(BlockId::ImageAttributes) {
            return Err(PspDecodeErrors::Format(
                "missing general image attributes block"
            ));
        }
        if !(38..=64).contains(&header.data_len) {
            return Err(PspDecodeErrors::Format(
                "invalid length for general image attributes block"
            ));
        }
        // newer versions repeat the block length as the first field
        let leading = usize::from(self.version_major >= 4) * 4;
        let body_len = leading + 38;

        if header.data_len < body_len {
            return Err(PspDecodeErrors::Format(
                "invalid length for general image attributes block"
            ));
        }
        self.stream.skip(leading)?;

        let width = self.stream.get_i32_le()?;
        let height = self.stream.get_i32_le()?;

        self.resolution = self.stream.get_f64_le()?;

        let metric = self.stream.get_u8()?;
        self.res_metric = ResolutionMetric::from_int(metric).unwrap_or_else(|| {
            warn!("unknown resolution metric {metric}");
            ResolutionMetric::Undefined
        });

        let compression = self.stream.get_u16_le()?;

        self.bit_depth = self.stream.get_u16_le()?;
        self.plane_count = self.stream.get_u16_le()?;
        self.color_count = self.stream.get_u32_le()?;
        self.grayscale = self.stream.get_u8()? == 1;
        self.total_image_size = self.stream.get_u32_le()?;
        self.active_layer = self.stream.get_i32_le()?;
        self.layer_count = self.stream.get_u16_le()?;
        // stay length-accurate, later revisions append fields here
        self.stream.skip(header.data_len - body_len)?;

        if width <= 0 || height <= 0 {
            return Err(PspDecodeErrors::Format("zero or negative image dimensions"));
        }
        self.width = width as usize;
        self.height = height as usize;

        if self.width > self.options.get_max_width() {
            return Err(PspDecodeErrors::TooLargeDimensions(
                "width",
                self.options.get_max_width(),
                self.width
            ));
        }
        if self.height > self.options.get_max_height() {
            return Err(PspDecodeErrors::TooLargeDimensions(
                "height",
                self.options.get_max_height(),
                self.height
            ));
        }

        self.compression = CompressionMethod::from_int(compression)
            .ok_or(PspDecodeErrors::UnsupportedCompression(compression))?;

        self.color_model = if self.grayscale {
            match self.bit_depth {
                8 => ColorModel::Gray8,
                16 => ColorModel::Gray16,
                _ => return Err(PspDecodeErrors::UnsupportedBitDepth(self.bit_depth, true))
            }
        } else {
            match self.bit_depth {
                // 1-bit images always carry a palette
                1 => ColorModel::Paletted,
                16 => ColorModel::Gray16,
                8 | 24 => ColorModel::Rgba8,
                48 | 64 => ColorModel::Rgba16,
                _ => return Err(PspDecodeErrors::UnsupportedBitDepth(self.bit_depth, false))
            }
        };

        self.decoded_headers = true;

        trace!("Version: {}.{}", self.version_major, self.version_minor);
        trace!("Image width: {}", self.width);
        trace!("Image height: {}", self.height);
        trace!("Resolution: {} ({:?})", self.resolution, self.res_metric);
        trace!("Compression: {:?}", self.compression);
        trace!("Bit depth: {}", self.bit_depth);
        trace!("Planes: {}, colors: {}", self.plane_count, self.color_count);
        trace!("Layers: {}, active: {}", self.layer_count, self.active_layer);
        trace!("Total image size: {}", self.total_image_size);

        Ok(())
    }

    /// Decode a PSP file extracting the first raster layer.
    ///
    /// Layers are not flattened; the returned image covers the saved
    /// rectangle of the first layer with a non-zero channel count,
    /// which for flattened files is the whole canvas.
    pub fn decode(&mut self) -> Result<PspImage, PspDecodeErrors> {
        self.decode_headers()?;

        loop {
            let header = self.read_block_header()?;

            match header.kind() {
                Some(BlockId::ExtendedData) => self.decode_extended_data_block(header.data_len)?,
                Some(BlockId::Creator) => self.decode_creator_block(header.data_len)?,
                Some(BlockId::ColorPalette) => self.decode_color_block(header.data_len)?,
                Some(BlockId::LayerBank) => {
                    trace!("layer bank found at byte {}", self.stream.position());
                    return self.decode_layers();
                }
                _ => {
                    trace!(
                        "skipping block id {} ({:?}), {} bytes",
                        header.id,
                        header.kind(),
                        header.data_len
                    );
                    self.stream.skip(header.data_len)?;
                }
            }
        }
    }

    /// Decode an image to bytes without regard to layout.
    ///
    /// For paletted output the bytes are palette indices; 16-bit
    /// samples are big-endian pairs.
    pub fn decode_raw(&mut self) -> Result<Vec<u8>, PspDecodeErrors> {
        self.decode().map(|img| img.data.into_bytes())
    }

    fn read_block_header(&mut self) -> Result<BlockHeader, PspDecodeErrors> {
        let magic = self.stream.read_fixed::<4>()?;

        if magic != BLOCK_MAGIC {
            return Err(PspDecodeErrors::Format("bad block magic"));
        }
        let id = self.stream.get_u16_le()?;

        let data_len = if self.version_major > 3 {
            self.stream.get_u32_le()?
        } else {
            // old headers carry the initial-data length first; the
            // second field is the authoritative body length
            let initial_len = self.stream.get_u32_le()?;
            trace!("block initial data length: {initial_len}");
            self.stream.get_u32_le()?
        };

        trace!("block id {id}, {data_len} bytes");

        Ok(BlockHeader {
            id,
            data_len: data_len as usize
        })
    }

    fn read_chunk_header(&mut self) -> Result<ChunkHeader, PspDecodeErrors> {
        let magic = self.stream.read_fixed::<4>()?;

        if magic != CHUNK_MAGIC {
            return Err(PspDecodeErrors::Format("bad chunk magic"));
        }
        let keyword = self.stream.get_u16_le()?;
        let data_len = self.stream.get_u32_le()? as usize;

        trace!("chunk keyword {keyword}, {data_len} bytes");

        Ok(ChunkHeader { keyword, data_len })
    }

    fn decode_creator_block(&mut self, total_len: usize) -> Result<(), PspDecodeErrors> {
        let mut remaining = total_len as i64;

        while remaining > 0 {
            let chunk = self.read_chunk_header()?;
            remaining -= 10 + chunk.data_len as i64;

            if remaining < 0 {
                return Err(PspDecodeErrors::Format(
                    "chunk length exceeds enclosing block"
                ));
            }
            match chunk.keyword {
                CREATOR_FIELD_TITLE => {
                    self.creator.title = Some(self.stream.read_string(chunk.data_len)?);
                }
                CREATOR_FIELD_CREATION_DATE => {
                    self.creator.creation_date = Some(self.read_u32_chunk(chunk.data_len)?);
                }
                CREATOR_FIELD_MODIFICATION_DATE => {
                    self.creator.modification_date = Some(self.read_u32_chunk(chunk.data_len)?);
                }
                CREATOR_FIELD_ARTIST => {
                    self.creator.artist = Some(self.stream.read_string(chunk.data_len)?);
                }
                CREATOR_FIELD_COPYRIGHT => {
                    self.creator.copyright = Some(self.stream.read_string(chunk.data_len)?);
                }
                CREATOR_FIELD_DESCRIPTION => {
                    self.creator.description = Some(self.stream.read_string(chunk.data_len)?);
                }
                CREATOR_FIELD_APP_ID => {
                    self.creator.app_id = Some(self.read_u32_chunk(chunk.data_len)?);
                }
                CREATOR_FIELD_APP_VERSION => {
                    self.creator.app_version = Some(self.read_u32_chunk(chunk.data_len)?);
                }
                _ => {
                    trace!("skipping unknown creator field {}", chunk.keyword);
                    self.stream.skip(chunk.data_len)?;
                }
            }
        }
        Ok(())
    }

    fn decode_extended_data_block(&mut self, total_len: usize) -> Result<(), PspDecodeErrors> {
        let mut remaining = total_len as i64;

        while remaining > 0 {
            let chunk = self.read_chunk_header()?;
            remaining -= 10 + chunk.data_len as i64;

            if remaining < 0 {
                return Err(PspDecodeErrors::Format(
                    "chunk length exceeds enclosing block"
                ));
            }
            match chunk.keyword {
                XDATA_TRANSPARENCY_INDEX => {
                    self.transparency_index = Some(self.read_u16_chunk(chunk.data_len)?);
                }
                _ => {
                    trace!("skipping unknown extended data field {}", chunk.keyword);
                    self.stream.skip(chunk.data_len)?;
                }
            }
        }
        Ok(())
    }

    /// Read a `u32` chunk payload, discarding any declared trailing bytes.
    fn read_u32_chunk(&mut self, data_len: usize) -> Result<u32, PspDecodeErrors> {
        let trailing = data_len
            .checked_sub(4)
            .ok_or(PspDecodeErrors::Format("metadata field too short"))?;
        let value = self.stream.get_u32_le()?;
        self.stream.skip(trailing)?;
        Ok(value)
    }

    fn read_u16_chunk(&mut self, data_len: usize) -> Result<u16, PspDecodeErrors> {
        let trailing = data_len
            .checked_sub(2)
            .ok_or(PspDecodeErrors::Format("metadata field too short"))?;
        let value = self.stream.get_u16_le()?;
        self.stream.skip(trailing)?;
        Ok(value)
    }

    fn decode_color_block(&mut self, block_len: usize) -> Result<(), PspDecodeErrors> {
        let mut consumed = 0_usize;

        if self.version_major >= 4 {
            // format tag of unclear meaning, 0x08 in observed files
            let tag = self.stream.get_u32_le()?;
            trace!("palette format tag: {tag}");
            consumed += 4;
        }
        let n_colors = self.stream.get_u32_le()? as usize;
        consumed += 4;

        if consumed > block_len {
            return Err(PspDecodeErrors::Format("palette larger than its block"));
        }
        let byte_len = n_colors
            .checked_mul(4)
            .ok_or(PspDecodeErrors::OverflowOccurred)?;

        if byte_len > block_len.saturating_sub(consumed) {
            return Err(PspDecodeErrors::Format("palette larger than its block"));
        }
        let raw = self.stream.read_slice(byte_len)?;

        // entries are stored B, G, R followed by a padding byte that is
        // not alpha; output entries are always opaque
        let palette: Vec<PaletteEntry> = raw
            .chunks_exact(4)
            .map(|entry| PaletteEntry {
                red:   entry[2],
                green: entry[1],
                blue:  entry[0],
                alpha: 255
            })
            .collect();

        consumed += byte_len;

        trace!("palette with {n_colors} colors");

        self.palette = Some(palette);
        // stay length-accurate even if the block carries extra bytes
        self.stream.skip(block_len - consumed)?;

        Ok(())
    }

    fn decode_layers(&mut self) -> Result<PspImage, PspDecodeErrors> {
        let mut layer = Layer::default();
        let mut output: Option<LayerImage> = None;
        let mut channel = 0_usize;

        loop {
            let header = self.read_block_header()?;

            match header.kind() {
                Some(BlockId::Layer) => {
                    layer = self.decode_layer_header()?;

                    trace!("layer {:?}", layer);
                    trace!("layer kind {:?}", LayerKind::from_int(layer.kind));

                    if layer.channel_count == 0 {
                        trace!("layer without channels, looking further");
                        output = None;
                        continue;
                    }
                    channel = 0;
                    output = Some(self.allocate_layer_image(&layer)?);
                }
                Some(BlockId::Channel) => match output.as_mut() {
                    Some(image) => {
                        let done =
                            self.decode_channel_block(&header, &layer, image, &mut channel)?;

                        if done {
                            break;
                        }
                    }
                    None => {
                        return Err(PspDecodeErrors::Format("channel block outside a layer"));
                    }
                },
                None if header.id == V13_UNKNOWN_SUB_BLOCK => {
                    self.skip_v13_sub_block(header.data_len)?;
                }
                _ => {
                    trace!(
                        "skipping sub-block id {} ({:?}), {} bytes",
                        header.id,
                        header.kind(),
                        header.data_len
                    );
                    self.stream.skip(header.data_len)?;
                }
            }
        }

        match output {
            Some(image) => Ok(self.finish_layer(image)),
            None => Err(PspDecodeErrors::Format("layer bank ended without pixels"))
        }
    }

    /// Skip the sub-block of unknown purpose found in version 13 files.
    ///
    /// Its declared length does not cover its whole payload; a trailing
    /// length-prefixed tail follows the body. Reverse engineered from
    /// observed files and possibly wrong for some of them.
    fn skip_v13_sub_block(&mut self, data_len: usize) -> Result<(), PspDecodeErrors> {
        warn!("skipping sub-block 33 by heuristic, {data_len} + trailer bytes");

        self.stream.skip(data_len)?;
        let trailer = self.stream.get_u32_le()? as usize;
        let trailer = trailer
            .checked_sub(4)
            .ok_or(PspDecodeErrors::Format("invalid trailer length"))?;
        self.stream.skip(trailer)?;

        Ok(())
    }

    fn read_rect(&mut self) -> Result<Rect, PspDecodeErrors> {
        Ok(Rect {
            left:   self.stream.get_i32_le()?,
            top:    self.stream.get_i32_le()?,
            right:  self.stream.get_i32_le()?,
            bottom: self.stream.get_i32_le()?
        })
    }

    fn decode_layer_header(&mut self) -> Result<Layer, PspDecodeErrors> {
        let mut layer = Layer::default();

        if self.version_major >= 4 {
            // nominal block length, does not match observed files
            self.stream.skip(4)?;
            let name_len = usize::from(self.stream.get_u16_le()?);
            layer.name = self.stream.read_string(name_len)?;
        } else {
            let raw = self.stream.read_string(256)?;
            let end = raw
                .iter()
                .rposition(|b| !b.is_ascii_whitespace() && *b != 0)
                .map_or(0, |pos| pos + 1);
            layer.name = raw[..end].to_vec();
        }
        layer.kind = self.stream.get_u8()?;
        layer.rect = self.read_rect()?;
        layer.saved_rect = self.read_rect()?;
        layer.opacity = self.stream.get_u8()?;
        layer.blend_mode = self.stream.get_u8()?;
        layer.visible = self.stream.get_u8()? != 0;
        layer.transparency_protected = self.stream.get_u8()? != 0;
        layer.link_group_id = self.stream.get_u8()?;
        layer.mask_rect = self.read_rect()?;
        layer.saved_mask_rect = self.read_rect()?;
        layer.mask_linked = self.stream.get_u8()? != 0;
        layer.mask_disabled = self.stream.get_u8()? != 0;
        layer.invert_mask_on_blend = self.stream.get_u8()? != 0;
        layer.blend_range_count = self.stream.get_u16_le()?;
        self.stream.skip(BLEND_RANGE_BYTES)?;

        let (bitmap_count, channel_count) = self.read_layer_tail()?;
        layer.bitmap_count = bitmap_count;
        layer.channel_count = channel_count;

        Ok(layer)
    }

    /// Version-dependent tail of the layer block, producing the bitmap
    /// and channel counts.
    fn read_layer_tail(&mut self) -> Result<(u16, u16), PspDecodeErrors> {
        match self.version_major {
            10.. => {
                self.stream.skip(5)?;
                // the counts are no longer stored; derive the channel
                // count from the color layout instead
                Ok((0, self.channels_for_layout()?))
            }
            6..=9 => {
                self.stream.skip(9)?;
                let bitmap_count = self.stream.get_u16_le()?;
                let channel_count = self.stream.get_u16_le()?;
                Ok((bitmap_count, channel_count))
            }
            4..=5 => {
                self.stream.skip(4)?;
                let bitmap_count = self.stream.get_u16_le()?;
                let channel_count = self.stream.get_u16_le()?;
                Ok((bitmap_count, channel_count))
            }
            _ => {
                let bitmap_count = self.stream.get_u16_le()?;
                let channel_count = self.stream.get_u16_le()?;
                Ok((bitmap_count, channel_count))
            }
        }
    }

    fn channels_for_layout(&self) -> Result<u16, PspDecodeErrors> {
        if self.palette.is_some() {
            return Ok(1);
        }
        match self.bit_depth {
            1 | 8 | 16 => Ok(1),
            24 | 48 => Ok(3),
            32 | 64 => Ok(4),
            _ => Err(PspDecodeErrors::Format("unknown channel count"))
        }
    }

    fn allocate_layer_image(&self, layer: &Layer) -> Result<LayerImage, PspDecodeErrors> {
        let width = layer
            .saved_rect
            .width()
            .ok_or(PspDecodeErrors::Format("negative layer rectangle"))?;
        let height = layer
            .saved_rect
            .height()
            .ok_or(PspDecodeErrors::Format("negative layer rectangle"))?;

        if width > self.options.get_max_width() {
            return Err(PspDecodeErrors::TooLargeDimensions(
                "width",
                self.options.get_max_width(),
                width
            ));
        }
        if height > self.options.get_max_height() {
            return Err(PspDecodeErrors::TooLargeDimensions(
                "height",
                self.options.get_max_height(),
                height
            ));
        }
        let pixel_count = width
            .checked_mul(height)
            .ok_or(PspDecodeErrors::OverflowOccurred)?;

        let (format, bytes_per_pixel, payload) = if self.palette.is_some() {
            if self.bit_depth == 1 {
                (LayerFormat::Paletted1, 1, pixel_count / 8)
            } else {
                (LayerFormat::Paletted, 1, pixel_count)
            }
        } else {
            match self.bit_depth {
                16 => (LayerFormat::Gray16, 2, pixel_count * 2),
                24 | 32 => (LayerFormat::Rgba8, 4, pixel_count),
                48 | 64 => (LayerFormat::Rgba16, 8, pixel_count * 2),
                8 if self.grayscale => (LayerFormat::Gray8, 1, pixel_count),
                1 | 8 => {
                    return Err(PspDecodeErrors::Format("missing color palette block"));
                }
                _ => {
                    return Err(PspDecodeErrors::UnsupportedBitDepth(
                        self.bit_depth,
                        self.grayscale
                    ));
                }
            }
        };

        let total = pixel_count
            .checked_mul(bytes_per_pixel)
            .ok_or(PspDecodeErrors::OverflowOccurred)?;
        let mut pixels = vec![0; total];

        // alpha planes default to opaque; a transparency channel, when
        // present, overwrites them
        match format {
            LayerFormat::Rgba8 => {
                for px in pixels.chunks_exact_mut(4) {
                    px[3] = 255;
                }
            }
            LayerFormat::Rgba16 => {
                for px in pixels.chunks_exact_mut(8) {
                    px[6] = 255;
                    px[7] = 255;
                }
            }
            _ => {}
        }

        Ok(LayerImage {
            width,
            height,
            format,
            pixels,
            payload
        })
    }

    /// Decode one channel block into `image`.
    ///
    /// Returns true once the layer's channels are exhausted.
    fn decode_channel_block(
        &mut self, header: &BlockHeader, layer: &Layer, image: &mut LayerImage,
        channel: &mut usize
    ) -> Result<bool, PspDecodeErrors> {
        let mut consumed = 12_usize;

        if self.version_major >= 4 {
            let header_len = self.stream.get_u32_le()?;

            if header_len != 16 {
                return Err(PspDecodeErrors::Format("invalid channel block info len"));
            }
            consumed += 4;
        }
        let compressed_len = self.stream.get_u32_le()? as usize;
        let uncompressed_len = self.stream.get_u32_le()? as usize;
        let bitmap_kind = self.stream.get_u16_le()?;
        let channel_kind = self.stream.get_u16_le()?;

        trace!("channel block");
        trace!("\tcompressed len = {compressed_len}");
        trace!("\tuncompressed len = {uncompressed_len}");
        trace!("\tbitmap kind = {:?}", BitmapKind::from_int(bitmap_kind));
        trace!("\tchannel kind = {:?}", ChannelKind::from_int(channel_kind));

        if BitmapKind::from_int(bitmap_kind) != Some(BitmapKind::Image) {
            // masks and other auxiliary bitmaps do not contribute pixels
            let rest = header
                .data_len
                .checked_sub(consumed)
                .ok_or(PspDecodeErrors::Format("channel block shorter than header"))?;
            self.stream.skip(rest)?;

            *channel += 1;
            return Ok(*channel == usize::from(layer.channel_count));
        }

        let role = match image.format {
            LayerFormat::Rgba8 | LayerFormat::Rgba16 => ChannelKind::from_int(channel_kind)
                .ok_or(PspDecodeErrors::Format("unknown channel type"))?,
            _ => ChannelKind::Composite
        };

        if uncompressed_len != image.payload {
            warn!(
                "channel declares {} uncompressed bytes, layer geometry needs {}",
                uncompressed_len, image.payload
            );
        }

        let mut scratch = core::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.resize(image.payload, 0);

        match self.compression {
            CompressionMethod::NoCompression => {
                self.stream.read_exact(&mut scratch)?;
            }
            CompressionMethod::RLE => {
                Self::decode_rle(&mut self.stream, compressed_len, &mut scratch)?;
            }
            CompressionMethod::LZ77 => {
                let inflate_options = DeflateOptions::default()
                    .set_size_hint(image.payload)
                    .set_confirm_checksum(self.options.inflate_get_confirm_adler());
                let compressed = self.stream.read_slice(compressed_len)?;
                let mut inflate = DeflateDecoder::new_with_options(compressed, inflate_options);
                let decoded = inflate.decode_zlib()?;

                if decoded.len() < image.payload {
                    return Err(PspDecodeErrors::Format(
                        "zlib stream shorter than the channel payload"
                    ));
                }
                scratch.copy_from_slice(&decoded[..image.payload]);
            }
        }

        image.scatter(&scratch, role);
        self.scratch = scratch;

        *channel += 1;
        Ok(*channel == usize::from(layer.channel_count))
    }

    /// Byte-level run length decoding with threshold 128.
    ///
    /// Consumes exactly `compressed_len` input bytes; output writes are
    /// bounded by `out`.
    fn decode_rle(
        stream: &mut ByteReader<T>, compressed_len: usize, out: &mut [u8]
    ) -> Result<(), PspDecodeErrors> {
        let mut remaining = compressed_len;
        let mut position = 0_usize;

        while remaining > 0 {
            let control = stream.get_u8()?;
            remaining -= 1;

            if control > 128 {
                // a run: one data byte repeated control - 128 times
                let run = usize::from(control - 128);

                if remaining == 0 {
                    return Err(PspDecodeErrors::Format("RLE run truncated"));
                }
                let value = stream.get_u8()?;
                remaining -= 1;

                if position + run > out.len() {
                    return Err(PspDecodeErrors::Format("RLE output overrun"));
                }
                out[position..position + run].fill(value);
                position += run;
            } else {
                // control literal bytes follow
                let run = usize::from(control);

                if run > remaining {
                    return Err(PspDecodeErrors::Format(
                        "RLE literal exceeds compressed length"
                    ));
                }
                if position + run > out.len() {
                    return Err(PspDecodeErrors::Format("RLE output overrun"));
                }
                stream.read_exact(&mut out[position..position + run])?;
                position += run;
                remaining -= run;
            }
        }

        if position < out.len() {
            warn!(
                "RLE stream under-filled channel, {} of {} bytes",
                position,
                out.len()
            );
        }
        Ok(())
    }

    fn finish_layer(&self, image: LayerImage) -> PspImage {
        let data = match image.format {
            LayerFormat::Gray8 => PixelData::Gray8(image.pixels),
            LayerFormat::Gray16 => PixelData::Gray16(image.pixels),
            LayerFormat::Rgba8 => PixelData::Rgba8(image.pixels),
            LayerFormat::Rgba16 => PixelData::Rgba16(image.pixels),
            LayerFormat::Paletted | LayerFormat::Paletted1 => PixelData::Paletted {
                indices: image.pixels,
                palette: self.palette.clone().unwrap_or_default()
            }
        };

        PspImage {
            width: image.width,
            height: image.height,
            data
        }
    }

    /// Get image width and height respectively or None if the
    /// headers haven't been decoded
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        if self.decoded_headers {
            return Some((self.width, self.height));
        }
        None
    }

    /// Get the container version as `(major, minor)` or None if the
    /// headers haven't been decoded
    pub fn version(&self) -> Option<(u16, u16)> {
        if self.decoded_headers {
            return Some((self.version_major, self.version_minor));
        }
        None
    }

    /// Get the output pixel model or None if the headers haven't been
    /// decoded.
    ///
    /// Before the color palette block has been seen, paletted files
    /// report the model derived from the image attributes alone.
    pub fn color_model(&self) -> Option<ColorModel> {
        if !self.decoded_headers {
            return None;
        }
        if self.palette.is_some() {
            return Some(ColorModel::Paletted);
        }
        Some(self.color_model)
    }

    /// Get the stored bits per pixel across all planes, or None if the
    /// headers haven't been decoded
    pub const fn bit_depth(&self) -> Option<u16> {
        if self.decoded_headers {
            return Some(self.bit_depth);
        }
        None
    }

    /// Get the image resolution and its measuring metric, or None if
    /// the headers haven't been decoded
    pub fn resolution(&self) -> Option<(f64, ResolutionMetric)> {
        if self.decoded_headers {
            return Some((self.resolution, self.res_metric));
        }
        None
    }

    /// Number of layers declared by the image attributes block
    pub const fn layer_count(&self) -> Option<u16> {
        if self.decoded_headers {
            return Some(self.layer_count);
        }
        None
    }

    /// The decoded color palette, if a palette block has been seen
    pub fn palette(&self) -> Option<&[PaletteEntry]> {
        self.palette.as_deref()
    }

    /// Document metadata collected from the creator block
    pub const fn creator(&self) -> &CreatorInfo {
        &self.creator
    }

    /// Palette transparency index from the extended data block, if any
    pub const fn transparency_index(&self) -> Option<u16> {
        self.transparency_index
    }
}

impl LayerImage {
    /// Place one decompressed channel payload into the pixel buffer.
    fn scatter(&mut self, source: &[u8], role: ChannelKind) {
        match self.format {
            LayerFormat::Rgba8 => {
                let offset = match role {
                    ChannelKind::Red => 0,
                    ChannelKind::Green => 1,
                    ChannelKind::Blue => 2,
                    // a lone image channel on an RGBA layer holds the
                    // transparency plane
                    ChannelKind::Composite => 3
                };
                for (px, value) in self.pixels.chunks_exact_mut(4).zip(source) {
                    px[offset] = *value;
                }
            }
            LayerFormat::Rgba16 => {
                let offset = match role {
                    ChannelKind::Red => 0,
                    ChannelKind::Green => 2,
                    ChannelKind::Blue => 4,
                    ChannelKind::Composite => 6
                };
                // samples arrive little-endian, the output is big-endian
                for (px, pair) in self
                    .pixels
                    .chunks_exact_mut(8)
                    .zip(source.chunks_exact(2))
                {
                    px[offset] = pair[1];
                    px[offset + 1] = pair[0];
                }
            }
            LayerFormat::Gray16 => {
                for (px, pair) in self
                    .pixels
                    .chunks_exact_mut(2)
                    .zip(source.chunks_exact(2))
                {
                    px[0] = pair[1];
                    px[1] = pair[0];
                }
            }
            LayerFormat::Gray8 | LayerFormat::Paletted => {
                let len = source.len().min(self.pixels.len());
                self.pixels[..len].copy_from_slice(&source[..len]);
            }
            LayerFormat::Paletted1 => {
                for (dst, byte) in self.pixels.chunks_mut(8).zip(source) {
                    let mut bits = *byte;

                    for px in dst {
                        *px = bits >> 7;
                        bits <<= 1;
                    }
                }
            }
        }
    }
}
