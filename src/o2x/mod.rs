//! The o2x container format.
//!
//! An o2x file is what the GP2X launcher loads: a fixed-size [`Header`]
//! followed by `Header::sections` section records. Each record is a
//! [`SectionHeader`], giving a payload length and a load address, followed by
//! exactly that many bytes of payload.
//!
//! The on-disk layout is as follows; all integers are little-endian, matching
//! the GP2X's ARM cores:
//! ```text
//! offset  size  field
//! 0x000      4  magic, `o2x1`
//! 0x004     32  name, zero-padded
//! 0x024    512  icon, 16x16 RGB565 pixels
//! 0x224      8  reserved, zero
//! 0x22c      4  parameter region length
//! 0x230      4  parameter region address
//! 0x234      1  number of sections
//! 0x235    ...  section records
//! ```
//!
//! Headers are encoded field-by-field at fixed offsets, so nothing here depends
//! on how Rust lays out these structs in memory.
//!
//! [`Header`]: struct.Header.html
//! [`SectionHeader`]: struct.SectionHeader.html

use std::fmt;
use std::io;

pub mod icon;

mod dump;

pub use icon::Icon;

/// The magic number at the start of every o2x file.
pub const MAGIC: u32 = 0x3178_326f;

/// The maximum length of an executable name, in bytes.
pub const NAME_LEN: usize = 32;

/// The maximum number of sections a single container can describe.
pub const MAX_SECTIONS: usize = u8::MAX as usize;

/// The parameter region of a container: somewhere in memory the launcher
/// reserves for runtime parameters.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Params {
  /// The address of the region.
  pub addr: u32,
  /// The length of the region, in bytes.
  pub len: u32,
}

/// An o2x file header.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Header {
  /// The executable's name, zero-padded. A name of exactly `NAME_LEN` bytes
  /// has no terminator.
  pub name: [u8; NAME_LEN],
  /// The executable's icon.
  pub icon: Icon,
  /// The parameter region.
  pub params: Params,
  /// The number of section records following this header.
  pub sections: u8,
}

/// Where each field of a `Header` lives.
mod offset {
  pub const MAGIC: usize = 0;
  pub const NAME: usize = 4;
  pub const ICON: usize = 36;
  pub const RESERVED: usize = 548;
  pub const PARAMS_LEN: usize = 556;
  pub const PARAMS_ADDR: usize = 560;
  pub const SECTIONS: usize = 564;
}

/// An error produced while decoding a `Header`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DecodeError {
  /// Indicates that the magic number was wrong.
  BadMagic(u32),
  /// Indicates that the reserved bytes were not all zero.
  NonZeroReserved,
}

impl fmt::Display for DecodeError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::BadMagic(magic) => write!(f, "bad o2x magic: 0x{:08x}", magic),
      Self::NonZeroReserved => write!(f, "reserved header bytes are not zero"),
    }
  }
}

impl Header {
  /// The encoded length of a `Header`.
  pub const LEN: usize = 565;

  /// Creates a new `Header` with the given name, a blank icon, no parameter
  /// region and no sections.
  ///
  /// Returns `None` if `name` is longer than `NAME_LEN` bytes.
  pub fn new(name: &str) -> Option<Self> {
    let bytes = name.as_bytes();
    if bytes.len() > NAME_LEN {
      return None;
    }

    let mut padded = [0; NAME_LEN];
    padded[..bytes.len()].copy_from_slice(bytes);
    Some(Self {
      name: padded,
      icon: Icon::blank(),
      params: Params::default(),
      sections: 0,
    })
  }

  /// Returns the name, without padding.
  pub fn name_bytes(&self) -> &[u8] {
    let end = self
      .name
      .iter()
      .position(|&b| b == 0)
      .unwrap_or(NAME_LEN);
    &self.name[..end]
  }

  /// Encodes this header into its on-disk representation.
  pub fn to_bytes(&self) -> [u8; Self::LEN] {
    let mut bytes = [0; Self::LEN];
    put_u32(&mut bytes, offset::MAGIC, MAGIC);
    bytes[offset::NAME..offset::NAME + NAME_LEN].copy_from_slice(&self.name);
    bytes[offset::ICON..offset::ICON + Icon::LEN]
      .copy_from_slice(&self.icon.to_bytes());
    // The reserved bytes are already zero.
    put_u32(&mut bytes, offset::PARAMS_LEN, self.params.len);
    put_u32(&mut bytes, offset::PARAMS_ADDR, self.params.addr);
    bytes[offset::SECTIONS] = self.sections;
    bytes
  }

  /// Decodes a header from its on-disk representation.
  pub fn from_bytes(bytes: &[u8; Self::LEN]) -> Result<Self, DecodeError> {
    let magic = get_u32(bytes, offset::MAGIC);
    if magic != MAGIC {
      return Err(DecodeError::BadMagic(magic));
    }
    if bytes[offset::RESERVED..offset::PARAMS_LEN]
      .iter()
      .any(|&b| b != 0)
    {
      return Err(DecodeError::NonZeroReserved);
    }

    let mut name = [0; NAME_LEN];
    name.copy_from_slice(&bytes[offset::NAME..offset::NAME + NAME_LEN]);
    let mut icon = [0; Icon::LEN];
    icon.copy_from_slice(&bytes[offset::ICON..offset::ICON + Icon::LEN]);

    Ok(Self {
      name,
      icon: Icon::from_bytes(&icon),
      params: Params {
        len: get_u32(bytes, offset::PARAMS_LEN),
        addr: get_u32(bytes, offset::PARAMS_ADDR),
      },
      sections: bytes[offset::SECTIONS],
    })
  }

  /// Writes this header to `w` as a single write.
  pub fn write_to(&self, mut w: impl io::Write) -> io::Result<()> {
    w.write_all(&self.to_bytes())
  }
}

/// The header of a single section record.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct SectionHeader {
  /// The length of the payload that follows, in bytes.
  pub len: u32,
  /// The address the payload is loaded at.
  pub load_addr: u32,
}

impl SectionHeader {
  /// The encoded length of a `SectionHeader`.
  pub const LEN: usize = 8;

  /// Encodes this section header into its on-disk representation.
  pub fn to_bytes(self) -> [u8; Self::LEN] {
    let mut bytes = [0; Self::LEN];
    put_u32(&mut bytes, 0, self.len);
    put_u32(&mut bytes, 4, self.load_addr);
    bytes
  }

  /// Decodes a section header from its on-disk representation.
  pub fn from_bytes(bytes: &[u8; Self::LEN]) -> Self {
    Self {
      len: get_u32(bytes, 0),
      load_addr: get_u32(bytes, 4),
    }
  }

  /// Returns the range of memory this section is loaded into, as a half-open
  /// `(start, end)` pair.
  ///
  /// `end` is computed in 64 bits, since a section may end past the top of the
  /// 32-bit address space.
  pub fn memory_range(self) -> (u64, u64) {
    let start = self.load_addr as u64;
    (start, start + self.len as u64)
  }

  /// Checks whether this section and `other` are loaded into overlapping
  /// memory.
  pub fn overlaps(self, other: SectionHeader) -> bool {
    let (a_start, a_end) = self.memory_range();
    let (b_start, b_end) = other.memory_range();
    a_start < b_end && b_start < a_end
  }
}

/// The shape of a built container: its header and each of its section
/// headers, in file order.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Layout {
  /// The container's header.
  pub header: Header,
  /// The section headers, in the order they appear in the file.
  pub sections: Vec<SectionHeader>,
}

impl Layout {
  /// Returns the total length of the container this layout describes.
  pub fn file_len(&self) -> u64 {
    self.sections.iter().fold(Header::LEN as u64, |acc, s| {
      acc + SectionHeader::LEN as u64 + s.len as u64
    })
  }

  /// Dumps this layout in the style of `objdump -h` to `w`.
  #[inline]
  pub fn dump(&self, w: impl io::Write) -> io::Result<()> {
    dump::dump(self, w)
  }
}

fn put_u32(bytes: &mut [u8], at: usize, value: u32) {
  bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn get_u32(bytes: &[u8], at: usize) -> u32 {
  let mut le = [0; 4];
  le.copy_from_slice(&bytes[at..at + 4]);
  u32::from_le_bytes(le)
}
