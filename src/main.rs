//! mko2x, which produces o2x executables for the GP2X.

#![deny(missing_docs)]
#![deny(unused)]
#![deny(warnings)]
#![deny(unsafe_code)]

use std::ffi::OsStr;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use o2x::error::Errors;
use o2x::int;
use o2x::manifest::Manifest;
use o2x::o2x::Params;
use o2x::pack;
use o2x::pack::ConfigError;
use o2x::pack::Container;
use o2x::pack::Section;

/// Produces an o2x executable for the GP2X.
#[derive(StructOpt, Debug)]
#[structopt(
  name = "mko2x",
  after_help = "EXAMPLE:\n    mko2x --name \"Test game\" --section arm920.bin 0x0 \
                --section arm940.bin 0x2000000 --out testgame.o2x"
)]
struct Options {
  /// Set the executable name (max 32 bytes, required)
  #[structopt(short, long)]
  name: Option<String>,

  /// Path to a 16x16 icon in raw RGB565 format
  #[structopt(short, long, parse(from_os_str))]
  icon: Option<PathBuf>,

  /// Binary data file followed by its load address in GP2X memory (at least
  /// one required)
  #[structopt(
    short,
    long,
    number_of_values = 2,
    value_names = &["FILE", "ADDR"],
    parse(from_os_str)
  )]
  section: Vec<OsString>,

  /// Where to store the produced file (required)
  #[structopt(short, long, parse(from_os_str))]
  out: Option<PathBuf>,

  /// Address in memory params are stored, and maximum length of the region
  #[structopt(
    short,
    long,
    number_of_values = 2,
    value_names = &["ADDR", "LEN"]
  )]
  params: Vec<String>,

  /// JSON5 manifest describing the container; other options override it
  #[structopt(short, long, parse(from_os_str))]
  manifest: Option<PathBuf>,

  /// Print the layout of the produced file
  #[structopt(long)]
  dump: bool,

  /// Log more; may be repeated
  #[structopt(short, long, parse(from_occurrences))]
  verbose: u8,
}

impl Options {
  /// Merges the manifest (if any) and the command line into a container and
  /// an output path, collecting every configuration problem along the way.
  fn into_container(
    self,
  ) -> Result<(Container, PathBuf), Errors<ConfigError>> {
    let mut errors = Errors::new();
    let mut container = Container::default();
    let mut out = None;
    let mut manifest_ok = true;

    if let Some(path) = &self.manifest {
      let base = path.parent().unwrap_or_else(|| Path::new(""));
      match Manifest::load(path).map_err(Errors::from) {
        Ok(manifest) => match manifest.resolve(base) {
          Ok(loaded) => {
            container = loaded.container;
            out = loaded.out;
          }
          Err(e) => {
            manifest_ok = false;
            errors.extend(e)
          }
        },
        Err(e) => {
          manifest_ok = false;
          errors.extend(e)
        }
      }
    }

    if self.name.is_some() {
      container.name = self.name;
    }
    if self.icon.is_some() {
      container.icon = self.icon;
    }
    if self.out.is_some() {
      out = self.out;
    }

    for pair in self.section.chunks(2) {
      match parse_os_int("--section", &pair[1]) {
        Ok(load_addr) => {
          container.sections.push(Section::new(&pair[0], load_addr))
        }
        Err(e) => errors.push(e),
      }
    }

    // Only the last `--params` counts.
    if let [.., addr, len] = self.params.as_slice() {
      match (parse_int("--params", addr), parse_int("--params", len)) {
        (Ok(addr), Ok(len)) => container.params = Some(Params { addr, len }),
        (addr, len) => {
          for e in addr.err().into_iter().chain(len.err()) {
            errors.push(e);
          }
        }
      }
    }

    if manifest_ok {
      errors.extend(container.validate());
      if out.is_none() {
        errors.push(ConfigError::MissingOutput);
      }
    }

    match out {
      Some(out) if errors.is_ok() => Ok((container, out)),
      _ => Err(errors),
    }
  }
}

fn parse_int(option: &'static str, text: &str) -> Result<u32, ConfigError> {
  int::parse_u32(text).map_err(|error| ConfigError::BadInt { option, error })
}

/// Like `parse_int()`, but for values that share an option with a path, and so
/// may not be UTF-8.
fn parse_os_int(
  option: &'static str,
  text: &OsStr,
) -> Result<u32, ConfigError> {
  match text.to_str() {
    Some(text) => parse_int(option, text),
    None => Err(ConfigError::BadInt {
      option,
      error: int::BadInt {
        text: text.to_string_lossy().into_owned(),
      },
    }),
  }
}

fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(format!("o2x={}", level)));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .with_target(false)
    .without_time()
    .init();
}

fn main() {
  let options = Options::from_args();
  init_logging(options.verbose);
  let dump = options.dump;

  let (container, out) = match options.into_container() {
    Ok(config) => config,
    Err(errors) => {
      errors.dump_and_die(1);
      return;
    }
  };

  match pack::pack_to_file(&container, &out) {
    Ok(layout) => {
      if dump {
        let _ = layout.dump(io::stdout());
      }
    }
    Err(e) => Errors::from(e).dump_and_die(1),
  }
}
