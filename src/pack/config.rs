//! Validation of a `Container` before anything gets written.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::error;
use crate::int::BadInt;
use crate::o2x;
use crate::o2x::Header;
use crate::pack::Container;

/// A problem with the description of a container, caught before packing
/// starts.
#[derive(Debug)]
pub enum ConfigError {
  /// Indicates that no name was given.
  MissingName,
  /// Indicates that the name does not fit in the header.
  NameTooLong(String),
  /// Indicates that no sections were given.
  NoSections,
  /// Indicates that there are more sections than the header can count.
  TooManySections(usize),
  /// Indicates that no output file was given.
  MissingOutput,
  /// Indicates that an address or length was not a valid integer.
  BadInt {
    /// The option the integer was given to.
    option: &'static str,
    /// The parse failure.
    error: BadInt,
  },
  /// Indicates that a manifest could not be read.
  ManifestRead {
    /// The manifest file.
    path: PathBuf,
    /// The underlying error.
    error: io::Error,
  },
  /// Indicates that a manifest was not valid.
  ManifestSyntax {
    /// The manifest file.
    path: PathBuf,
    /// A description of the problem.
    message: String,
  },
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::MissingName => write!(f, "name must be specified"),
      Self::NameTooLong(name) => write!(
        f,
        "name must be {} bytes or less, but `{}` is {}",
        o2x::NAME_LEN,
        name,
        name.len()
      ),
      Self::NoSections => write!(f, "at least one section must be specified"),
      Self::TooManySections(n) => write!(
        f,
        "at most {} sections may be specified, but there were {}",
        o2x::MAX_SECTIONS,
        n
      ),
      Self::MissingOutput => write!(f, "output file must be specified"),
      Self::BadInt { error, .. } => write!(f, "{}", error),
      Self::ManifestRead { error, .. } => {
        write!(f, "could not read manifest: {}", error)
      }
      Self::ManifestSyntax { message, .. } => {
        write!(f, "bad manifest: {}", message)
      }
    }
  }
}

impl error::Error for ConfigError {
  fn cause(&self) -> Option<error::Cause<'_>> {
    let cause = match self {
      Self::MissingName | Self::NameTooLong(_) => {
        error::Cause::Option("--name")
      }
      Self::NoSections | Self::TooManySections(_) => {
        error::Cause::Option("--section")
      }
      Self::MissingOutput => error::Cause::Option("--out"),
      Self::BadInt { option, .. } => error::Cause::Option(*option),
      Self::ManifestRead { path, .. } | Self::ManifestSyntax { path, .. } => {
        error::Cause::File(path)
      }
    };
    Some(cause)
  }

  fn action(&self) -> Option<error::Action> {
    Some(error::Action::Parsing)
  }
}

impl Container {
  /// Checks this container for every problem that would stop it from being
  /// packed.
  pub fn validate(&self) -> error::Errors<ConfigError> {
    let mut errors = error::Errors::new();
    if let Err(e) = self.checked_name() {
      errors.push(e);
    }
    if let Err(e) = self.checked_section_count() {
      errors.push(e);
    }
    errors
  }

  /// Builds this container's header, minus the icon.
  ///
  /// Returns the first problem `validate()` would have found, if any.
  pub fn header(&self) -> Result<Header, ConfigError> {
    let name = self.checked_name()?;
    let sections = self.checked_section_count()?;

    let mut header =
      Header::new(name).ok_or_else(|| ConfigError::NameTooLong(name.into()))?;
    header.params = self.params.unwrap_or_default();
    header.sections = sections;
    Ok(header)
  }

  fn checked_name(&self) -> Result<&str, ConfigError> {
    match &self.name {
      None => Err(ConfigError::MissingName),
      Some(name) if name.len() > o2x::NAME_LEN => {
        Err(ConfigError::NameTooLong(name.clone()))
      }
      Some(name) => Ok(name.as_str()),
    }
  }

  fn checked_section_count(&self) -> Result<u8, ConfigError> {
    match self.sections.len() {
      0 => Err(ConfigError::NoSections),
      n if n > o2x::MAX_SECTIONS => Err(ConfigError::TooManySections(n)),
      n => Ok(n as u8),
    }
  }
}
