//! Helpers for building synthetic Paint Shop Pro streams.
//!
//! No real corpus ships with the crate, so the tests assemble files
//! byte by byte: signature, version, blocks, chunks and channel
//! payloads under all three compression schemes. Deflate vectors use
//! stored-mode zlib blocks so no encoder is needed.
#![allow(dead_code)]

pub const SIGNATURE: [u8; 32] = *b"Paint Shop Pro Image File\n\x1a\x00\x00\x00\x00\x00";

pub const BLOCK_IMAGE_ATTRIBUTES: u16 = 0;
pub const BLOCK_CREATOR: u16 = 1;
pub const BLOCK_COLOR_PALETTE: u16 = 2;
pub const BLOCK_LAYER_BANK: u16 = 3;
pub const BLOCK_LAYER: u16 = 4;
pub const BLOCK_CHANNEL: u16 = 5;
pub const BLOCK_THUMBNAIL: u16 = 9;
pub const BLOCK_EXTENDED_DATA: u16 = 10;

pub const COMPRESSION_NONE: u16 = 0;
pub const COMPRESSION_RLE: u16 = 1;
pub const COMPRESSION_LZ77: u16 = 2;

pub const DIB_IMAGE: u16 = 0;
pub const DIB_TRANS_MASK: u16 = 1;

pub const CHANNEL_COMPOSITE: u16 = 0;
pub const CHANNEL_RED: u16 = 1;
pub const CHANNEL_GREEN: u16 = 2;
pub const CHANNEL_BLUE: u16 = 3;

pub const CREATOR_TITLE: u16 = 0;
pub const CREATOR_CREATION_DATE: u16 = 1;
pub const CREATOR_MODIFICATION_DATE: u16 = 2;
pub const CREATOR_ARTIST: u16 = 3;
pub const CREATOR_COPYRIGHT: u16 = 4;
pub const CREATOR_DESCRIPTION: u16 = 5;
pub const CREATOR_APP_ID: u16 = 6;
pub const CREATOR_APP_VERSION: u16 = 7;

/// Append one block (magic, id, lengths, body) to `out`.
///
/// Major versions up to 3 use the long header carrying the initial
/// data length before the body length.
pub fn append_block(out: &mut Vec<u8>, version_major: u16, id: u16, body: &[u8]) {
    out.extend(*b"~BK\x00");
    out.extend(id.to_le_bytes());
    if version_major <= 3 {
        out.extend((body.len() as u32).to_le_bytes());
    }
    out.extend((body.len() as u32).to_le_bytes());
    out.extend(body);
}

/// One chunk: magic, keyword, length, payload.
pub fn chunk(keyword: u16, data: &[u8]) -> Vec<u8> {
    let mut out = b"~FL\x00".to_vec();
    out.extend(keyword.to_le_bytes());
    out.extend((data.len() as u32).to_le_bytes());
    out.extend(data);
    out
}

pub struct StreamBuilder {
    version_major: u16,
    bytes:         Vec<u8>
}

impl StreamBuilder {
    pub fn new(version_major: u16, version_minor: u16) -> StreamBuilder {
        let mut bytes = SIGNATURE.to_vec();
        bytes.extend(version_major.to_le_bytes());
        bytes.extend(version_minor.to_le_bytes());
        StreamBuilder { version_major, bytes }
    }

    pub fn block(&mut self, id: u16, body: &[u8]) -> &mut Self {
        append_block(&mut self.bytes, self.version_major, id, body);
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend(bytes);
        self
    }

    pub fn finish(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

pub struct Attributes {
    pub version_major: u16,
    pub width:         i32,
    pub height:        i32,
    pub compression:   u16,
    pub bit_depth:     u16,
    pub grayscale:     bool,
    pub color_count:   u32
}

/// Body of the general image attributes block, 38 bytes plus the
/// repeated length field for newer versions.
pub fn image_attributes(attr: &Attributes) -> Vec<u8> {
    let mut body = Vec::new();
    if attr.version_major >= 4 {
        body.extend(42_u32.to_le_bytes());
    }
    body.extend(attr.width.to_le_bytes());
    body.extend(attr.height.to_le_bytes());
    body.extend(72.0_f64.to_le_bytes());
    body.push(1); // resolution in inches
    body.extend(attr.compression.to_le_bytes());
    body.extend(attr.bit_depth.to_le_bytes());
    body.extend(1_u16.to_le_bytes()); // plane count
    body.extend(attr.color_count.to_le_bytes());
    body.push(u8::from(attr.grayscale));
    body.extend(0_u32.to_le_bytes()); // total image size
    body.extend(0_i32.to_le_bytes()); // active layer
    body.extend(1_u16.to_le_bytes()); // layer count
    body
}

pub fn rect(left: i32, top: i32, right: i32, bottom: i32) -> Vec<u8> {
    let mut out = Vec::new();
    for value in [left, top, right, bottom] {
        out.extend(value.to_le_bytes());
    }
    out
}

/// Body of a color palette block with a configurable padding byte,
/// which decoders must ignore.
pub fn palette_body(version_major: u16, colors: &[[u8; 3]], pad: u8) -> Vec<u8> {
    let mut body = Vec::new();
    if version_major >= 4 {
        body.extend(8_u32.to_le_bytes()); // format tag
    }
    body.extend((colors.len() as u32).to_le_bytes());
    for color in colors {
        // stored B, G, R, pad
        body.extend([color[2], color[1], color[0], pad]);
    }
    body
}

/// Body of a layer block covering `width` x `height` at the origin.
pub fn layer_body(version_major: u16, width: i32, height: i32, channel_count: u16) -> Vec<u8> {
    let mut body = Vec::new();
    if version_major >= 4 {
        body.extend(0_u32.to_le_bytes()); // nominal length, unread
        let name = b"Background";
        body.extend((name.len() as u16).to_le_bytes());
        body.extend(name);
    } else {
        let mut name = [0x20_u8; 256];
        name[..10].copy_from_slice(b"Background");
        body.extend(name);
    }
    body.push(0); // normal layer
    body.extend(rect(0, 0, width, height));
    body.extend(rect(0, 0, width, height)); // saved rectangle
    body.push(255); // opacity
    body.push(0); // blend mode
    body.push(1); // visible
    body.push(0); // transparency protected
    body.push(0); // link group id
    body.extend(rect(0, 0, 0, 0)); // mask rectangle
    body.extend(rect(0, 0, 0, 0)); // saved mask rectangle
    body.extend([0, 0, 0]); // mask flags
    body.extend(0_u16.to_le_bytes()); // blend range count
    body.extend([0_u8; 40]); // blend ranges

    match version_major {
        10.. => body.extend([0_u8; 5]), // counts derived from layout
        6..=9 => {
            body.extend([0_u8; 9]);
            body.extend(1_u16.to_le_bytes());
            body.extend(channel_count.to_le_bytes());
        }
        4..=5 => {
            body.extend([0_u8; 4]);
            body.extend(1_u16.to_le_bytes());
            body.extend(channel_count.to_le_bytes());
        }
        _ => {
            body.extend(1_u16.to_le_bytes());
            body.extend(channel_count.to_le_bytes());
        }
    }
    body
}

/// Body of a channel block wrapping an already-compressed payload.
pub fn channel_body(
    version_major: u16, payload: &[u8], uncompressed_len: u32, bitmap_kind: u16, channel_kind: u16
) -> Vec<u8> {
    let mut body = Vec::new();
    if version_major >= 4 {
        body.extend(16_u32.to_le_bytes());
    }
    body.extend((payload.len() as u32).to_le_bytes());
    body.extend(uncompressed_len.to_le_bytes());
    body.extend(bitmap_kind.to_le_bytes());
    body.extend(channel_kind.to_le_bytes());
    body.extend(payload);
    body
}

pub fn adler32(data: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;
    for &byte in data {
        a = (a + u32::from(byte)) % 65521;
        b = (b + a) % 65521;
    }
    (b << 16) | a
}

/// A zlib stream made of stored deflate blocks.
pub fn zlib_stored(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0x78, 0x01];

    if data.is_empty() {
        out.extend([0x01, 0x00, 0x00, 0xFF, 0xFF]);
    }
    let mut chunks = data.chunks(0xFFFF).peekable();
    while let Some(chunk) = chunks.next() {
        let len = chunk.len() as u16;
        out.push(u8::from(chunks.peek().is_none())); // BFINAL, stored
        out.extend(len.to_le_bytes());
        out.extend((!len).to_le_bytes());
        out.extend(chunk);
    }
    out.extend(adler32(data).to_be_bytes());
    out
}

/// RLE-compress `data` as plain literal runs.
pub fn rle_literals(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(128) {
        out.push(chunk.len() as u8);
        out.extend(chunk);
    }
    out
}
