//! Cartridge image header/banner decoding.
//!
//! Layout of the parts we care about:
//! header:  title[12] @0x00, code[4] @0x0C, banner offset (u32 LE) @0x68
//! banner:  version[2], crc[8], reserved[22], icon[512], palette[32], titles[8][128] (u16 LE)
use std::{
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use log::debug;

pub const ICON_SIZE: usize = 32;
pub const ICON_BYTES: usize = 512;
pub const PALETTE_ENTRIES: usize = 16;
pub const TITLE_SLOTS: usize = 8;
pub const TITLE_UNITS: usize = 128;

const BANNER_OFFSET_POS: u64 = 0x68;
/// version + crc + reserved
const ICON_POS: u64 = 0x20;
const TITLES_POS: u64 = ICON_POS + ICON_BYTES as u64 + (PALETTE_ENTRIES * 2) as u64;
/// 32 px / 2 px per byte
const ROW_STRIDE: usize = ICON_SIZE / 2;
const TILE_WIDTH_BYTES: usize = 4;
const TILE_HEIGHT: usize = 8;

pub type Rgba = [u8; 4];

#[derive(Debug, thiserror::Error)]
pub enum BannerError {
    #[error("cannot open cartridge image: {0}")]
    NotFound(#[source] io::Error),
    #[error("cartridge image is truncated: {0}")]
    Truncated(#[from] io::Error),
    #[error("cartridge image has no banner")]
    Absent,
}

/// Title slots in the order the banner stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Japanese,
    English,
    French,
    German,
    Italian,
    Spanish,
    Chinese,
    Korean,
}

impl Language {
    pub const ALL: [Language; TITLE_SLOTS] = [
        Language::Japanese,
        Language::English,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Spanish,
        Language::Chinese,
        Language::Korean,
    ];

    /// Clamps out of range indices to the nearest slot.
    pub fn from_index(index: i32) -> Language {
        Self::ALL[index.clamp(0, TITLE_SLOTS as i32 - 1) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Japanese => "Japanese",
            Language::English => "English",
            Language::French => "French",
            Language::German => "German",
            Language::Italian => "Italian",
            Language::Spanish => "Spanish",
            Language::Chinese => "Chinese",
            Language::Korean => "Korean",
        }
    }

    pub fn next(self) -> Language {
        Self::ALL[(usize::from(self) + 1) % TITLE_SLOTS]
    }
}

impl From<Language> for usize {
    fn from(value: Language) -> Self {
        match value {
            Language::Japanese => 0,
            Language::English => 1,
            Language::French => 2,
            Language::German => 3,
            Language::Italian => 4,
            Language::Spanish => 5,
            Language::Chinese => 6,
            Language::Korean => 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    pub title: [u8; 12],
    pub code: [u8; 4],
    /// 0 means the image carries no banner
    pub banner_offset: u32,
}

impl CartridgeHeader {
    /// Internal title with trailing NUL padding removed
    pub fn title_text(&self) -> String {
        let end = self
            .title
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.title.len());
        String::from_utf8_lossy(&self.title[..end]).into_owned()
    }
}

#[derive(Clone)]
pub struct CartridgeBanner {
    pub version: u16,
    pub crc: [u16; 4],
    pub reserved: [u8; 22],
    /// 4bpp, stored as 4x8 pixel tiles
    pub icon: [u8; ICON_BYTES],
    /// RGB555, bit 15 unused
    pub palette: [u16; PALETTE_ENTRIES],
    pub titles: [[u16; TITLE_UNITS]; TITLE_SLOTS],
}

impl CartridgeBanner {
    /// Walks from `preferred` back toward slot 0 and decodes the first
    /// non-empty title. Slots above `preferred` are never consulted.
    pub fn title(&self, preferred: Language) -> String {
        let start = usize::from(preferred);
        match (0..=start).rev().find(|&slot| !slot_is_empty(&self.titles[slot])) {
            Some(slot) => utf16_to_utf8(&self.titles[slot]),
            None => String::new(),
        }
    }

    pub fn decode_icon(&self) -> DecodedIcon {
        decode_icon_bitmap(&self.icon, &self.palette)
    }
}

/// 32x32 RGBA image, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedIcon {
    pixels: [Rgba; ICON_SIZE * ICON_SIZE],
}

impl DecodedIcon {
    pub fn pixel(&self, x: usize, y: usize) -> Rgba {
        self.pixels[y * ICON_SIZE + x]
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }
}

impl std::fmt::Debug for DecodedIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let opaque = self.pixels.iter().filter(|p| p[3] != 0).count();
        write!(f, "DecodedIcon {{ {ICON_SIZE}x{ICON_SIZE}, {opaque} opaque }}")
    }
}

fn read_u16_le<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf = [0; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32_le<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn units_from_le_bytes<const N: usize>(bytes: &[u8]) -> [u16; N] {
    let mut units = [0; N];
    for (unit, pair) in units.iter_mut().zip(bytes.chunks_exact(2)) {
        *unit = u16::from_le_bytes([pair[0], pair[1]]);
    }
    units
}

pub fn read_header<R: Read + Seek>(reader: &mut R) -> Result<CartridgeHeader, BannerError> {
    reader.seek(SeekFrom::Start(0))?;
    let mut title = [0; 12];
    reader.read_exact(&mut title)?;
    let mut code = [0; 4];
    reader.read_exact(&mut code)?;

    reader.seek(SeekFrom::Start(BANNER_OFFSET_POS))?;
    let banner_offset = read_u32_le(reader)?;

    Ok(CartridgeHeader {
        title,
        code,
        banner_offset,
    })
}

/// Reads the banner at `banner_offset`. Images whose banner stops short of
/// all eight title slots still decode: the 256 bytes right after the palette
/// land in the English slot and every other slot stays zeroed.
pub fn read_banner<R: Read + Seek>(
    reader: &mut R,
    banner_offset: u32,
) -> Result<CartridgeBanner, BannerError> {
    if banner_offset == 0 {
        return Err(BannerError::Absent);
    }
    reader.seek(SeekFrom::Start(banner_offset as u64))?;

    let version = read_u16_le(reader)?;
    let mut crc_bytes = [0; 8];
    reader.read_exact(&mut crc_bytes)?;
    let mut reserved = [0; 22];
    reader.read_exact(&mut reserved)?;
    let mut icon = [0; ICON_BYTES];
    reader.read_exact(&mut icon)?;
    let mut palette_bytes = [0; PALETTE_ENTRIES * 2];
    reader.read_exact(&mut palette_bytes)?;

    let mut titles = [[0; TITLE_UNITS]; TITLE_SLOTS];
    let mut title_bytes = [0; TITLE_SLOTS * TITLE_UNITS * 2];
    if reader.read_exact(&mut title_bytes).is_ok() {
        for (slot, chunk) in titles
            .iter_mut()
            .zip(title_bytes.chunks_exact(TITLE_UNITS * 2))
        {
            *slot = units_from_le_bytes(chunk);
        }
    } else {
        debug!("banner at {banner_offset:#x} has short title table, reading English slot only");
        reader.seek(SeekFrom::Start(banner_offset as u64 + TITLES_POS))?;
        let mut english = [0; TITLE_UNITS * 2];
        reader.read_exact(&mut english)?;
        titles[usize::from(Language::English)] = units_from_le_bytes(&english);
    }

    Ok(CartridgeBanner {
        version,
        crc: units_from_le_bytes(&crc_bytes),
        reserved,
        icon,
        palette: units_from_le_bytes(&palette_bytes),
        titles,
    })
}

/// Opens `path` and reads its header and banner.
pub fn read_cartridge(path: &Path) -> Result<(CartridgeHeader, CartridgeBanner), BannerError> {
    let file = File::open(path).map_err(BannerError::NotFound)?;
    let mut reader = BufReader::new(file);
    let header = read_header(&mut reader)?;
    let banner = read_banner(&mut reader, header.banner_offset)?;
    Ok((header, banner))
}

/// Rearranges tile-ordered icon bytes into row-major bytes (16 bytes per row).
///
/// Source bytes are consumed strictly in order; a destination outside the
/// buffer still advances the source cursor.
pub fn detile(src: &[u8; ICON_BYTES]) -> [u8; ICON_BYTES] {
    let mut linear = [0; ICON_BYTES];
    let tiles_y = ICON_SIZE / TILE_HEIGHT;
    let tiles_x = ROW_STRIDE / TILE_WIDTH_BYTES;
    let mut cursor = 0;

    for tile_y in 0..tiles_y {
        for tile_x in 0..tiles_x {
            for p_y in 0..TILE_HEIGHT {
                for p_x in 0..TILE_WIDTH_BYTES {
                    let dest = p_x + tile_x * TILE_WIDTH_BYTES + ROW_STRIDE * (p_y + tile_y * TILE_HEIGHT);
                    if let (Some(slot), Some(&byte)) = (linear.get_mut(dest), src.get(cursor)) {
                        *slot = byte;
                    }
                    cursor += 1;
                }
            }
        }
    }
    linear
}

/// Expands an RGB555 colour to 8-bit channels by shifting each 5-bit
/// component left by 3 (0, 8, .., 248).
pub fn rgb555_to_rgb(color: u16) -> [u8; 3] {
    let r = (color & 0x1F) << 3;
    let g = ((color >> 5) & 0x1F) << 3;
    let b = ((color >> 10) & 0x1F) << 3;
    [r as u8, g as u8, b as u8]
}

pub fn decode_icon_bitmap(
    raw: &[u8; ICON_BYTES],
    palette: &[u16; PALETTE_ENTRIES],
) -> DecodedIcon {
    let linear = detile(raw);
    let mut pixels = [[0; 4]; ICON_SIZE * ICON_SIZE];

    for (i, pixel) in pixels.iter_mut().enumerate() {
        let byte = linear[i / 2];
        // low nibble is the even pixel
        let index = if i % 2 == 0 { byte & 0x0F } else { byte >> 4 };
        let color = palette[index as usize];
        let [r, g, b] = rgb555_to_rgb(color);
        let alpha = if index == 0 && color == 0 { 0 } else { 255 };
        *pixel = [r, g, b, alpha];
    }

    DecodedIcon { pixels }
}

/// A slot is empty when it starts with NUL, or holds a lone space.
pub fn slot_is_empty(units: &[u16; TITLE_UNITS]) -> bool {
    units[0] == 0 || (units[0] == 0x20 && units[1] == 0)
}

/// Decodes up to the first NUL. Titles are BMP-only; stray surrogate
/// halves come out as U+FFFD.
pub fn utf16_to_utf8(units: &[u16]) -> String {
    units
        .iter()
        .take(TITLE_UNITS)
        .take_while(|&&unit| unit != 0)
        .map(|&unit| char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Title for the cartridge at `path`, or an empty string when the file
/// cannot be read, has no banner, or has no title at or below `preferred`.
pub fn load_title(path: &Path, preferred: Language) -> String {
    match read_cartridge(path) {
        Ok((_, banner)) => banner.title(preferred),
        Err(err) => {
            debug!("no title for {}: {err}", path.display());
            String::new()
        }
    }
}
