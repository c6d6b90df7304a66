//! o2x, a packer for GP2X o2x executables.
//!
//! An o2x file bundles one or more raw binary sections, each with the address
//! it gets loaded at, behind a fixed header carrying the executable's name,
//! icon, and parameter region. See [`o2x`] for the format and [`pack`] for
//! building one.
//!
//! [`o2x`]: o2x/index.html
//! [`pack`]: pack/index.html

#![deny(missing_docs)]
#![deny(unused)]
#![deny(warnings)]
#![deny(unsafe_code)]

pub mod error;
pub mod int;
pub mod manifest;
pub mod o2x;
pub mod pack;
