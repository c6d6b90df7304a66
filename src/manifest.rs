//! Container manifests, which describe a container in a JSON5 file instead of
//! on the command line.
//!
//! ```json5
//! {
//!   name: "Test game",
//!   icon: "icon.raw",
//!   params: { addr: "0x100", len: 64 },
//!   sections: [
//!     { file: "arm920.bin", addr: "0x0" },
//!     { file: "arm940.bin", addr: "0x2000000" },
//!   ],
//!   out: "testgame.o2x",
//! }
//! ```
//!
//! Addresses and lengths may be JSON numbers, or strings in any of the
//! [`int`] syntaxes. Relative paths are relative to the manifest itself.
//!
//! [`int`]: ../int/index.html

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Errors;
use crate::int;
use crate::o2x::Params;
use crate::pack::ConfigError;
use crate::pack::Container;
use crate::pack::Section;

/// A container manifest, as it appears on disk.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
  /// The executable name.
  #[serde(default)]
  pub name: Option<String>,
  /// The icon file.
  #[serde(default)]
  pub icon: Option<PathBuf>,
  /// The parameter region.
  #[serde(default)]
  pub params: Option<ParamsEntry>,
  /// Sections, in file order.
  #[serde(default)]
  pub sections: Vec<SectionEntry>,
  /// Where to write the container.
  #[serde(default)]
  pub out: Option<PathBuf>,
}

/// A section within a [`Manifest`].
///
/// [`Manifest`]: struct.Manifest.html
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionEntry {
  /// The payload file.
  pub file: PathBuf,
  /// The load address.
  pub addr: Number,
}

/// A parameter region within a [`Manifest`].
///
/// [`Manifest`]: struct.Manifest.html
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamsEntry {
  /// The address of the region.
  pub addr: Number,
  /// The length of the region.
  pub len: Number,
}

/// A number that may be written either as a number or as a string.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(untagged)]
pub enum Number {
  /// A plain JSON number.
  Int(u32),
  /// An integer literal in a string, like `"0x100"`.
  Str(String),
}

impl Number {
  /// Resolves this `Number` into a value, blaming `option` on failure.
  pub fn value(&self, option: &'static str) -> Result<u32, ConfigError> {
    match self {
      Self::Int(n) => Ok(*n),
      Self::Str(s) => {
        int::parse_u32(s).map_err(|error| ConfigError::BadInt { option, error })
      }
    }
  }
}

/// A [`Container`] described by a manifest, along with the manifest's output
/// file.
///
/// [`Container`]: ../pack/struct.Container.html
#[derive(Clone, Debug, Default)]
pub struct Loaded {
  /// The described container.
  pub container: Container,
  /// The output file, if the manifest gives one.
  pub out: Option<PathBuf>,
}

impl Manifest {
  /// Parses a manifest out of JSON5 text.
  ///
  /// `path` is only used for error reporting.
  pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
    json5::from_str(text).map_err(|e| ConfigError::ManifestSyntax {
      path: path.to_path_buf(),
      message: e.to_string(),
    })
  }

  /// Reads and parses the manifest at `path`.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text =
      fs::read_to_string(path).map_err(|error| ConfigError::ManifestRead {
        path: path.to_path_buf(),
        error,
      })?;
    Self::parse(path, &text)
  }

  /// Converts this manifest into a container, resolving relative paths against
  /// `base`.
  ///
  /// Every bad number is reported, not just the first.
  pub fn resolve(self, base: &Path) -> Result<Loaded, Errors<ConfigError>> {
    let mut errors = Errors::new();
    let rebase = |p: PathBuf| {
      if p.is_relative() {
        base.join(p)
      } else {
        p
      }
    };

    let params = self.params.and_then(|params| {
      let addr = params.addr.value("params");
      let len = params.len.value("params");
      match (addr, len) {
        (Ok(addr), Ok(len)) => Some(Params { addr, len }),
        (addr, len) => {
          for e in addr.err().into_iter().chain(len.err()) {
            errors.push(e);
          }
          None
        }
      }
    });

    let mut sections = Vec::with_capacity(self.sections.len());
    for entry in self.sections {
      match entry.addr.value("sections") {
        Ok(load_addr) => {
          sections.push(Section::new(rebase(entry.file), load_addr))
        }
        Err(e) => errors.push(e),
      }
    }

    if !errors.is_ok() {
      return Err(errors);
    }

    Ok(Loaded {
      container: Container {
        name: self.name,
        sections,
        icon: self.icon.map(rebase),
        params,
      },
      out: self.out.map(rebase),
    })
  }
}
