//! The packer, which turns a set of section payloads into an o2x container.
//!
//! Packing is a single sequential pass: the header is encoded and written,
//! then each section is read into memory and written after its
//! [`SectionHeader`], in the order the sections were declared. The first
//! failure aborts the whole pass; whatever was already written to the sink is
//! left there.
//!
//! [`SectionHeader`]: ../o2x/struct.SectionHeader.html

use std::fmt;
use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::error;
use crate::o2x;
use crate::o2x::Header;
use crate::o2x::Icon;
use crate::o2x::Layout;
use crate::o2x::Params;
use crate::o2x::SectionHeader;

mod config;

pub use config::ConfigError;

/// The longest payload a section header can describe.
const MAX_SECTION_LEN: u64 = u32::MAX as u64;

/// A section declaration: a file to embed, and where it gets loaded.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Section {
  /// The file containing the section's payload.
  pub file: PathBuf,
  /// The address the payload is loaded at on the device.
  pub load_addr: u32,
}

impl Section {
  /// Creates a new `Section`.
  pub fn new(file: impl Into<PathBuf>, load_addr: u32) -> Self {
    Self {
      file: file.into(),
      load_addr,
    }
  }
}

/// Everything needed to build a container, except the place to put it.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Container {
  /// The executable name. Required; at most `o2x::NAME_LEN` bytes.
  pub name: Option<String>,
  /// The sections to embed, in file order. At least one is required.
  pub sections: Vec<Section>,
  /// A raw RGB565 icon file, if any.
  pub icon: Option<PathBuf>,
  /// The parameter region, if any.
  pub params: Option<Params>,
}

/// An error produced while packing.
#[derive(Debug)]
pub enum Error {
  /// Indicates that the `Container` itself was invalid.
  Config(ConfigError),
  /// Indicates that the icon could not be loaded.
  Icon(o2x::icon::Error),
  /// Indicates that a section file could not be opened.
  OpenSection {
    /// The section file.
    path: PathBuf,
    /// The underlying error.
    error: io::Error,
  },
  /// Indicates that reading a section file failed outright.
  ReadSection {
    /// The section file.
    path: PathBuf,
    /// The underlying error.
    error: io::Error,
  },
  /// Indicates that a section file ran out before the length it reported when
  /// it was opened.
  ShortRead {
    /// The section file.
    path: PathBuf,
    /// The length the file reported.
    expected: u64,
    /// The number of bytes that were actually read.
    actual: u64,
  },
  /// Indicates that a section file is too big to describe in a section header.
  TooLarge {
    /// The section file.
    path: PathBuf,
    /// The length of the file, or how much of it was read before it went past
    /// the limit.
    len: u64,
  },
  /// Indicates that there wasn't enough memory to hold a section.
  Alloc {
    /// The section file.
    path: PathBuf,
    /// The number of bytes that couldn't be allocated.
    len: u64,
  },
  /// Indicates that the output file could not be created.
  Create {
    /// The output file.
    path: PathBuf,
    /// The underlying error.
    error: io::Error,
  },
  /// Indicates that writing to the sink failed.
  Write(io::Error),
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Config(e) => write!(f, "{}", e),
      Self::Icon(e) => write!(f, "{}", e),
      Self::OpenSection { error, .. } => write!(f, "could not open: {}", error),
      Self::ReadSection { error, .. } => {
        write!(f, "could not read contents into memory: {}", error)
      }
      Self::ShortRead {
        expected, actual, ..
      } => write!(f, "expected {} bytes, but only read {}", expected, actual),
      Self::TooLarge { len, .. } => write!(
        f,
        "section is {} bytes, but sections may be at most {} bytes",
        len,
        u32::MAX
      ),
      Self::Alloc { len, .. } => write!(
        f,
        "could not allocate {} bytes to read section into memory",
        len
      ),
      Self::Create { error, .. } => {
        write!(f, "could not open file for writing: {}", error)
      }
      Self::Write(e) => write!(f, "could not write container: {}", e),
    }
  }
}

impl error::Error for Error {
  fn cause(&self) -> Option<error::Cause<'_>> {
    match self {
      Self::Config(e) => error::Error::cause(e),
      Self::Icon(e) => Some(error::Cause::File(&e.path)),
      Self::OpenSection { path, .. }
      | Self::ReadSection { path, .. }
      | Self::ShortRead { path, .. }
      | Self::TooLarge { path, .. }
      | Self::Alloc { path, .. }
      | Self::Create { path, .. } => Some(error::Cause::File(path)),
      Self::Write(_) => None,
    }
  }

  fn action(&self) -> Option<error::Action> {
    match self {
      Self::Config(e) => error::Error::action(e),
      Self::Icon(_) => Some(error::Action::LoadingIcon),
      Self::Create { .. } | Self::Write(_) => Some(error::Action::Writing),
      _ => Some(error::Action::ReadingSection),
    }
  }
}

impl From<ConfigError> for Error {
  fn from(e: ConfigError) -> Self {
    Error::Config(e)
  }
}

/// Packs `container` into `sink`.
///
/// `container` is validated first; on failure, only the first problem found is
/// returned and nothing is written. Use [`Container::validate()`] to see all of
/// them.
///
/// Returns the `Layout` of what was written. `sink` is neither flushed nor
/// closed.
///
/// [`Container::validate()`]: struct.Container.html#method.validate
pub fn pack(container: &Container, sink: impl io::Write) -> Result<Layout, Error> {
  let header = build_header(container)?;
  Packer::new(container, sink).run(header)
}

/// Packs `container` into a new file at `out`, replacing anything already
/// there.
///
/// The file is only created once `container` is known to be valid and its icon
/// has been loaded. If packing fails after that, the partial file is left
/// behind.
pub fn pack_to_file(
  container: &Container,
  out: impl AsRef<Path>,
) -> Result<Layout, Error> {
  let out = out.as_ref();
  let header = build_header(container)?;

  let file = File::create(out).map_err(|error| Error::Create {
    path: out.to_path_buf(),
    error,
  })?;
  let mut sink = io::BufWriter::new(file);
  let layout = Packer::new(container, &mut sink).run(header)?;
  sink.flush().map_err(Error::Write)?;

  tracing::info!(
    out = %out.display(),
    len = layout.file_len(),
    "wrote o2x container"
  );
  Ok(layout)
}

/// Builds the complete header for `container`, icon included.
fn build_header(container: &Container) -> Result<Header, Error> {
  let mut header = container.header()?;
  if let Some(path) = &container.icon {
    header.icon = Icon::load(path).map_err(Error::Icon)?;
  }
  Ok(header)
}

/// The main state struct for the packer.
struct Packer<'c, W> {
  /// The container being packed.
  container: &'c Container,
  /// Where the container's bytes go.
  sink: W,
  /// Headers for the sections written so far.
  written: Vec<SectionHeader>,
}

impl<'c, W: io::Write> Packer<'c, W> {
  fn new(container: &'c Container, sink: W) -> Self {
    Self {
      container,
      sink,
      written: Vec::with_capacity(container.sections.len()),
    }
  }

  fn run(mut self, header: Header) -> Result<Layout, Error> {
    let container = self.container;
    tracing::info!(
      name = %String::from_utf8_lossy(header.name_bytes()),
      sections = header.sections,
      params_addr = header.params.addr,
      params_len = header.params.len,
      icon = !header.icon.is_blank(),
      "writing o2x header"
    );
    header.write_to(&mut self.sink).map_err(Error::Write)?;

    for section in &container.sections {
      self.write_section(section)?;
    }

    Ok(Layout {
      header,
      sections: self.written,
    })
  }

  fn write_section(&mut self, section: &Section) -> Result<(), Error> {
    let payload = read_payload(&section.file)?;
    let header = SectionHeader {
      // `read_payload()` refuses anything longer than `MAX_SECTION_LEN`.
      len: payload.len() as u32,
      load_addr: section.load_addr,
    };

    for (i, other) in self.written.iter().enumerate() {
      if header.overlaps(*other) {
        tracing::warn!(
          section = self.written.len(),
          other = i,
          "{} overlaps section {} in memory",
          section.file.display(),
          i,
        );
      }
    }

    self
      .sink
      .write_all(&header.to_bytes())
      .map_err(Error::Write)?;
    self.sink.write_all(&payload).map_err(Error::Write)?;
    tracing::debug!(
      file = %section.file.display(),
      len = header.len,
      load_addr = header.load_addr,
      "wrote section {}",
      self.written.len(),
    );

    self.written.push(header);
    Ok(())
  }
}

/// Reads all of `path` into memory, so that its length is known before any of
/// it is written.
fn read_payload(path: &Path) -> Result<Vec<u8>, Error> {
  let file = File::open(path).map_err(|error| Error::OpenSection {
    path: path.to_path_buf(),
    error,
  })?;
  let reported = file
    .metadata()
    .map_err(|error| Error::ReadSection {
      path: path.to_path_buf(),
      error,
    })?
    .len();
  read_payload_from(path, file, reported)
}

/// Reads everything `r` has into memory.
///
/// `reported` is the length `path` claimed to have when it was opened. It only
/// sizes the buffer: pipes and files under `/proc` claim to be empty, so the
/// payload is whatever `r` actually yields. Yielding less than `reported` is
/// an error.
fn read_payload_from(
  path: &Path,
  r: impl Read,
  reported: u64,
) -> Result<Vec<u8>, Error> {
  let too_large = |len| Error::TooLarge {
    path: path.to_path_buf(),
    len,
  };
  if reported > MAX_SECTION_LEN {
    return Err(too_large(reported));
  }

  let mut payload = Vec::new();
  payload
    .try_reserve_exact(reported as usize)
    .map_err(|_| Error::Alloc {
      path: path.to_path_buf(),
      len: reported,
    })?;

  // One byte past the limit is enough to know the payload doesn't fit.
  r.take(MAX_SECTION_LEN + 1)
    .read_to_end(&mut payload)
    .map_err(|error| Error::ReadSection {
      path: path.to_path_buf(),
      error,
    })?;

  let actual = payload.len() as u64;
  if actual > MAX_SECTION_LEN {
    return Err(too_large(actual));
  }
  if actual < reported {
    return Err(Error::ShortRead {
      path: path.to_path_buf(),
      expected: reported,
      actual,
    });
  }

  Ok(payload)
}
