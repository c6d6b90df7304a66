//! The o2x icon: a 16x16 image shown by the GP2X launcher.
//!
//! Icons are stored as raw RGB565 pixels in row-major order, two bytes each,
//! little-endian. An icon file on disk is the same 512 bytes with nothing
//! around them; anything else is rejected.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;

/// A 16x16 RGB565 icon.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Icon {
  pixels: [u16; Icon::PIXELS],
}

/// The reason an icon failed to load.
#[derive(Debug)]
pub enum ErrorType {
  /// Indicates that the icon file could not be opened.
  Open(io::Error),
  /// Indicates that the icon file was not exactly `Icon::LEN` bytes long.
  Size(u64),
  /// Indicates that reading the icon's pixels failed.
  Read(io::Error),
}

/// An error produced while loading an icon.
#[derive(Debug)]
pub struct Error {
  /// The type of error.
  pub inner: ErrorType,
  /// The icon file involved.
  pub path: PathBuf,
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match &self.inner {
      ErrorType::Open(e) => write!(f, "could not open icon file: {}", e),
      ErrorType::Size(len) => write!(
        f,
        "icon file should be {} bytes, was {}",
        Icon::LEN,
        len
      ),
      ErrorType::Read(e) => write!(f, "could not read icon file: {}", e),
    }
  }
}

impl Icon {
  /// The width and height of an icon, in pixels.
  pub const SIDE: usize = 16;
  /// The number of pixels in an icon.
  pub const PIXELS: usize = Self::SIDE * Self::SIDE;
  /// The encoded length of an icon, in bytes.
  pub const LEN: usize = Self::PIXELS * 2;

  /// Creates an all-black icon; this is what a container without an icon
  /// carries.
  pub const fn blank() -> Self {
    Self {
      pixels: [0; Self::PIXELS],
    }
  }

  /// Creates an icon from row-major RGB565 pixels.
  pub const fn from_pixels(pixels: [u16; Self::PIXELS]) -> Self {
    Self { pixels }
  }

  /// Decodes an icon from its on-disk representation.
  pub fn from_bytes(bytes: &[u8; Self::LEN]) -> Self {
    let mut pixels = [0; Self::PIXELS];
    for (pixel, le) in pixels.iter_mut().zip(bytes.chunks_exact(2)) {
      *pixel = u16::from_le_bytes([le[0], le[1]]);
    }
    Self { pixels }
  }

  /// Encodes this icon into its on-disk representation.
  pub fn to_bytes(&self) -> [u8; Self::LEN] {
    let mut bytes = [0; Self::LEN];
    for (le, pixel) in bytes.chunks_exact_mut(2).zip(self.pixels.iter()) {
      le.copy_from_slice(&pixel.to_le_bytes());
    }
    bytes
  }

  /// Returns whether every pixel in this icon is zero.
  pub fn is_blank(&self) -> bool {
    self.pixels.iter().all(|&p| p == 0)
  }

  /// Reads an icon out of `r`, which is expected to contain `len` bytes.
  ///
  /// `len` must be exactly `Icon::LEN`; if it isn't, nothing is read.
  pub fn read_from(mut r: impl io::Read, len: u64) -> Result<Self, ErrorType> {
    if len != Self::LEN as u64 {
      return Err(ErrorType::Size(len));
    }

    let mut bytes = [0; Self::LEN];
    r.read_exact(&mut bytes).map_err(ErrorType::Read)?;
    Ok(Self::from_bytes(&bytes))
  }

  /// Loads an icon from the raw pixel file at `path`.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
    let path = path.as_ref();
    let with_path = |inner| Error {
      inner,
      path: path.to_path_buf(),
    };

    let file = File::open(path).map_err(|e| with_path(ErrorType::Open(e)))?;
    let len = file
      .metadata()
      .map_err(|e| with_path(ErrorType::Read(e)))?
      .len();
    Self::read_from(file, len).map_err(with_path)
  }
}

impl Default for Icon {
  fn default() -> Self {
    Self::blank()
  }
}
