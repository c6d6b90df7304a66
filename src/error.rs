//! Error printing facilities.
//!
//! These functions are used to simplify the display of various packing errors
//! to the user. The [`Error`] trait describes how a Rust error type can be
//! converted into a simple diagonstic.
//!
//! [`Error`]: trait.Error.html

use std::fmt;
use std::io;
use std::path::Path;

/// An error which can be described as a diagnostic.
///
/// Types that implement `Error` must also implement [`std::fmt::Display`]. For
/// the user-displayed error to look right, this implementation should only be
/// one line long.
///
/// [`std::fmt::Display`]: https://doc.rust-lang.org/std/fmt/trait.Display.html
pub trait Error: fmt::Debug + fmt::Display {
  /// Returns a `Cause` describing the input that resulted in the error, if
  /// there is one worth pointing at.
  fn cause(&self) -> Option<Cause<'_>>;
  /// Returns an action this error is associated with, if any at all.
  fn action(&self) -> Option<Action>;
}

/// A collection of errors that may built up over the course of an action.
///
/// The type parameter `E` should be a type implementing [`Error`].
///
/// [`Error`]: trait.Error.html
#[derive(Debug)]
pub struct Errors<E>(Vec<E>);

impl<E> Errors<E> {
  /// Creates an empty `Errors`.
  pub fn new() -> Self {
    Errors(Vec::new())
  }

  /// Returns true if this `Errors` hasn't had any errors added yet.
  pub fn is_ok(&self) -> bool {
    self.0.is_empty()
  }

  /// Returns the number of errors collected so far.
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Adds a new error to this `Errors`.
  pub fn push(&mut self, error: E) {
    self.0.push(error);
  }

  /// Extends this `Errors` by consuming another `Errors`.
  pub fn extend(&mut self, mut errors: Errors<E>) {
    self.0.reserve(errors.0.len());
    for e in errors.0.drain(..) {
      self.push(e);
    }
  }

  /// Returns an iterator over the collected errors, in the order they were
  /// added.
  pub fn iter(&self) -> impl Iterator<Item = &E> {
    self.0.iter()
  }
}

impl<E> Default for Errors<E> {
  fn default() -> Self {
    Self::new()
  }
}

impl<E> From<E> for Errors<E> {
  fn from(error: E) -> Self {
    Errors(vec![error])
  }
}

impl<E: Error> Errors<E> {
  /// Dumps this collection of errors as user-displayable text into `sink`.
  ///
  /// Returns `Ok(true)` if anything was written.
  pub fn dump_to(&self, mut sink: impl io::Write) -> io::Result<bool> {
    if self.0.is_empty() {
      return Ok(false);
    }

    for error in &self.0 {
      writeln!(sink, "error: {}", error)?;
      match (error.cause(), error.action()) {
        (Some(Cause::File(path)), Some(action)) => {
          writeln!(sink, "  while {} {}", action.describe(), path.display())?
        }
        (Some(Cause::File(path)), None) => {
          writeln!(sink, "  at {}", path.display())?
        }
        (Some(Cause::Option(name)), _) => {
          writeln!(sink, "  in option {}", name)?
        }
        (None, Some(action)) => writeln!(sink, "  while {}", action.describe())?,
        (None, None) => {}
      }
    }

    Ok(true)
  }

  /// Calls `dump_to()` on `stderr`, exiting the process with the given
  /// `exit_code` if any errors are present.
  pub fn dump_and_die(self, code: i32) {
    // Writing to stderr is fairly unlikely to fail, so panicking is a fine
    // response here.
    if self.dump_to(io::stderr()).unwrap() {
      if self.0.len() > 1 {
        eprintln!("");
        eprintln!("error: there were {} errors", self.0.len());
      }
      std::process::exit(code)
    }
  }
}

/// The place where an error occured.
pub enum Cause<'a> {
  /// A file that was being read or written.
  File(&'a Path),
  /// A command-line option (or the manifest key standing in for it).
  Option(&'static str),
}

/// An action that packing performs, which an error may be associated with.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Action {
  /// Reading a manifest or the command line.
  Parsing,
  /// Loading the icon.
  LoadingIcon,
  /// Reading a section's payload.
  ReadingSection,
  /// Writing the container.
  Writing,
}

impl Action {
  fn describe(self) -> &'static str {
    match self {
      Self::Parsing => "parsing",
      Self::LoadingIcon => "loading icon",
      Self::ReadingSection => "reading section",
      Self::Writing => "writing",
    }
  }
}
