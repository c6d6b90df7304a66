//! Integer-literal parsing for addresses and lengths.
//!
//! Addresses and lengths given on the command line or in a manifest can be
//! formatted as decimal, binary, or hexadecimal, with the following syntaxes:
//! - Decimal: `0`, `123`, etc.
//! - Binary: `%10` (classic), `0b1111` (C-style).
//! - Hexadecimal: `$dead` (classic), `0x1ee7` (C-style); case-insensitive.
//!
//! Additionally, underscores may be interespersed throughout a literal, except
//! as the first digit, to separate groups of digits: `1_000`, `$ff_ff`,
//! `0x0200_0000`.
//!
//! There is no octal syntax; `010` is ten.

use std::fmt;

/// A digit style: decimal, hex, or binary.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum DigitStyle {
  Dec,
  Hex,
  Bin,
}

impl DigitStyle {
  fn radix(self) -> u32 {
    match self {
      Self::Dec => 10,
      Self::Hex => 16,
      Self::Bin => 2,
    }
  }

  /// Splits `s` into the style its prefix implies and the remaining digits.
  fn split(s: &str) -> (Self, &str) {
    let prefixes = [
      ("0x", DigitStyle::Hex),
      ("0X", DigitStyle::Hex),
      ("$", DigitStyle::Hex),
      ("0b", DigitStyle::Bin),
      ("0B", DigitStyle::Bin),
      ("%", DigitStyle::Bin),
    ];
    for &(prefix, style) in &prefixes {
      if let Some(digits) = s.strip_prefix(prefix) {
        return (style, digits);
      }
    }
    (DigitStyle::Dec, s)
  }
}

/// An integer literal that failed to parse.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BadInt {
  /// The offending text.
  pub text: String,
}

impl fmt::Display for BadInt {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "bad integer: `{}`", self.text)
  }
}

/// Parses `s` as an unsigned 32-bit integer in any supported style.
///
/// ```
/// # use o2x::int::parse_u32;
/// assert_eq!(parse_u32("0x2000000"), Ok(0x200_0000));
/// assert_eq!(parse_u32("$ff"), Ok(255));
/// assert!(parse_u32("0x").is_err());
/// ```
pub fn parse_u32(s: &str) -> Result<u32, BadInt> {
  let bad = || BadInt {
    text: s.to_string(),
  };

  let (style, digits) = DigitStyle::split(s.trim());
  if digits.starts_with('_') {
    return Err(bad());
  }

  let digits = digits.chars().filter(|&c| c != '_').collect::<String>();
  // `from_str_radix` accepts a leading `+`, which is not valid here.
  if digits.is_empty() || !digits.chars().all(|c| c.is_digit(style.radix())) {
    return Err(bad());
  }

  u32::from_str_radix(&digits, style.radix()).map_err(|_| bad())
}

#[cfg(test)]
mod test {
  use super::*;

  macro_rules! assert_parse {
    ($text:literal => Err) => {
      assert!(parse_u32($text).is_err(), "{:?} should not parse", $text);
    };
    ($text:literal => $expected:expr) => {
      assert_eq!(parse_u32($text), Ok($expected), "parsing {:?}", $text);
    };
  }

  #[test]
  fn decimal() {
    assert_parse!("0" => 0);
    assert_parse!("123" => 123);
    assert_parse!("010" => 10);
    assert_parse!("1_000" => 1000);
    assert_parse!("4294967295" => u32::MAX);
    assert_parse!("4294967296" => Err);
    assert_parse!("-1" => Err);
    assert_parse!("+1" => Err);
  }

  #[test]
  fn hex() {
    assert_parse!("0x0" => 0);
    assert_parse!("0x2000000" => 0x200_0000);
    assert_parse!("0XdEaD" => 0xdead);
    assert_parse!("$ff_ff" => 0xffff);
    assert_parse!("0xffffffff" => u32::MAX);
    assert_parse!("0x1_0000_0000" => Err);
    assert_parse!("0x" => Err);
    assert_parse!("0x_1" => Err);
    assert_parse!("zz" => Err);
  }

  #[test]
  fn binary() {
    assert_parse!("0b1_0000" => 16);
    assert_parse!("%101" => 5);
    assert_parse!("0b2" => Err);
  }
}
