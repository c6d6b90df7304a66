//! End-to-end tests for packing real files into o2x containers.

use std::convert::TryInto;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use o2x::manifest::Manifest;
use o2x::o2x::Header;
use o2x::o2x::Icon;
use o2x::o2x::Params;
use o2x::o2x::SectionHeader;
use o2x::o2x::MAGIC;
use o2x::pack;
use o2x::pack::ConfigError;
use o2x::pack::Container;
use o2x::pack::Section;

/// Returns a fresh, empty scratch directory for the test called `name`.
fn scratch(name: &str) -> PathBuf {
  let dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("pack").join(name);
  let _ = fs::remove_dir_all(&dir);
  fs::create_dir_all(&dir).unwrap();
  dir
}

fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
  let path = dir.join(name);
  fs::write(&path, bytes).unwrap();
  path
}

/// A log sink that keeps everything written to it.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
  fn text(&self) -> String {
    String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
  }
}

impl io::Write for Captured {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.0.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }
  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

/// Runs `f`, returning its result and whatever it logged at `warn` or above.
fn with_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
  let logs = Captured::default();
  let writer = logs.clone();
  let subscriber = tracing_subscriber::fmt()
    .with_writer(move || writer.clone())
    .with_ansi(false)
    .with_max_level(tracing::Level::WARN)
    .finish();
  let result = tracing::subscriber::with_default(subscriber, f);
  (result, logs.text())
}

/// Splits a container back into its header and `(header, payload)` records.
fn split(bytes: &[u8]) -> (Header, Vec<(SectionHeader, Vec<u8>)>) {
  let header = Header::from_bytes(bytes[..Header::LEN].try_into().unwrap())
    .unwrap();

  let mut rest = &bytes[Header::LEN..];
  let mut sections = Vec::new();
  while !rest.is_empty() {
    let section =
      SectionHeader::from_bytes(rest[..SectionHeader::LEN].try_into().unwrap());
    rest = &rest[SectionHeader::LEN..];
    let (payload, tail) = rest.split_at(section.len as usize);
    sections.push((section, payload.to_vec()));
    rest = tail;
  }
  (header, sections)
}

#[test]
fn single_section_exact_bytes() {
  let dir = scratch("single_section_exact_bytes");
  let a = write(&dir, "a.bin", &[1, 2, 3, 4]);
  let out = dir.join("test.o2x");

  let container = Container {
    name: Some("Test".into()),
    sections: vec![Section::new(a, 0x0)],
    ..Container::default()
  };
  let layout = pack::pack_to_file(&container, &out).unwrap();

  let mut expected = Vec::new();
  expected.extend_from_slice(b"o2x1");
  expected.extend_from_slice(b"Test");
  expected.extend_from_slice(&[0; 28]);
  expected.extend_from_slice(&[0; 512]);
  expected.extend_from_slice(&[0; 8]);
  expected.extend_from_slice(&[0; 4]);
  expected.extend_from_slice(&[0; 4]);
  expected.push(1);
  expected.extend_from_slice(&[4, 0, 0, 0, 0, 0, 0, 0]);
  expected.extend_from_slice(&[1, 2, 3, 4]);

  let bytes = fs::read(&out).unwrap();
  assert_eq!(bytes, expected);
  assert_eq!(layout.file_len(), expected.len() as u64);
  assert_eq!(u32::from_le_bytes(bytes[..4].try_into().unwrap()), MAGIC);
}

#[test]
fn sections_round_trip_in_declared_order() {
  let dir = scratch("sections_round_trip_in_declared_order");
  let big = (0..10_000u32).map(|i| (i * 7) as u8).collect::<Vec<_>>();
  let payloads: Vec<(&str, Vec<u8>, u32)> = vec![
    ("arm940.bin", big, 0x0200_0000),
    ("arm920.bin", b"boot".to_vec(), 0x0),
    ("empty.bin", Vec::new(), 0x100),
    // Overlaps the first section; that's allowed.
    ("data.bin", vec![0xaa; 33], 0x0200_0010),
  ];

  let sections = payloads
    .iter()
    .map(|(name, bytes, addr)| Section::new(write(&dir, name, bytes), *addr))
    .collect();
  let container = Container {
    name: Some("Ordering".into()),
    sections,
    ..Container::default()
  };

  let out = dir.join("order.o2x");
  let layout = pack::pack_to_file(&container, &out).unwrap();

  let bytes = fs::read(&out).unwrap();
  assert_eq!(bytes[564], payloads.len() as u8);

  let (header, records) = split(&bytes);
  assert_eq!(header, layout.header);
  assert_eq!(header.sections as usize, records.len());
  assert_eq!(records.len(), payloads.len());
  for ((section, payload), (_, expected, addr)) in records.iter().zip(&payloads)
  {
    assert_eq!(section.len as usize, expected.len());
    assert_eq!(section.load_addr, *addr);
    assert_eq!(payload, expected);
  }
  assert_eq!(
    layout.sections,
    records.iter().map(|(s, _)| *s).collect::<Vec<_>>()
  );
}

#[test]
fn icon_and_params() {
  let dir = scratch("icon_and_params");
  let pixels = (0..Icon::LEN).map(|i| i as u8).collect::<Vec<_>>();
  let icon = write(&dir, "icon.raw", &pixels);
  let a = write(&dir, "a.bin", b"payload");

  let container = Container {
    name: Some("0123456789abcdef0123456789abcdef".into()),
    sections: vec![Section::new(a, 0x1000)],
    icon: Some(icon),
    params: Some(Params {
      addr: 0x0300_0000,
      len: 0x200,
    }),
  };
  let out = dir.join("icon.o2x");
  pack::pack_to_file(&container, &out).unwrap();

  let bytes = fs::read(&out).unwrap();
  assert_eq!(&bytes[4..36], b"0123456789abcdef0123456789abcdef");
  assert_eq!(&bytes[36..548], &pixels[..]);
  assert_eq!(&bytes[556..560], &[0x00, 0x02, 0x00, 0x00]);
  assert_eq!(&bytes[560..564], &[0x00, 0x00, 0x00, 0x03]);
}

#[test]
fn wrong_sized_icon_is_rejected() {
  let dir = scratch("wrong_sized_icon_is_rejected");
  let a = write(&dir, "a.bin", b"payload");

  for &len in &[0usize, 511, 513, 1024] {
    let icon = write(&dir, "icon.raw", &vec![0x55; len]);
    let container = Container {
      name: Some("Icon".into()),
      sections: vec![Section::new(&a, 0)],
      icon: Some(icon),
      ..Container::default()
    };

    let err = pack::pack(&container, Vec::new()).unwrap_err();
    assert_eq!(
      err.to_string(),
      format!("icon file should be 512 bytes, was {}", len)
    );
  }
}

#[test]
fn overlapping_sections_are_warned_about() {
  let dir = scratch("overlapping_sections_are_warned_about");
  let a = write(&dir, "a.bin", &[0; 0x100]);
  let b = write(&dir, "b.bin", &[1; 0x10]);
  let c = write(&dir, "c.bin", &[2; 0x10]);

  let container = Container {
    name: Some("Overlap".into()),
    sections: vec![
      Section::new(&a, 0x1000),
      Section::new(&b, 0x2000),
      Section::new(&c, 0x10f8),
    ],
    ..Container::default()
  };
  let (layout, logs) = with_warnings(|| pack::pack(&container, Vec::new()));
  assert_eq!(layout.unwrap().sections.len(), 3);

  assert!(logs.contains("WARN"), "logs: {}", logs);
  assert!(
    logs.contains(&format!("{} overlaps section 0 in memory", c.display())),
    "logs: {}",
    logs
  );
  assert!(!logs.contains(&b.display().to_string()), "logs: {}", logs);

  // Back to back is not an overlap.
  let container = Container {
    name: Some("Adjacent".into()),
    sections: vec![Section::new(&a, 0x1000), Section::new(&b, 0x1100)],
    ..Container::default()
  };
  let (layout, logs) = with_warnings(|| pack::pack(&container, Vec::new()));
  assert!(layout.is_ok());
  assert_eq!(logs, "");
}

#[cfg(target_os = "linux")]
#[test]
fn sources_that_report_no_size_are_read_fully() {
  // Files under `/proc` claim to be empty, just like pipes.
  let source = Path::new("/proc/self/cmdline");
  assert_eq!(fs::metadata(source).unwrap().len(), 0);
  let expected = fs::read(source).unwrap();
  assert!(!expected.is_empty());

  let dir = scratch("sources_that_report_no_size_are_read_fully");
  let out = dir.join("proc.o2x");
  let container = Container {
    name: Some("Proc".into()),
    sections: vec![Section::new(source, 0)],
    ..Container::default()
  };
  let layout = pack::pack_to_file(&container, &out).unwrap();

  let (_, records) = split(&fs::read(&out).unwrap());
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].0.len as usize, expected.len());
  assert_eq!(records[0].1, expected);
  assert_eq!(layout.sections[0].len as usize, expected.len());
}

#[test]
fn bad_icon_creates_no_file() {
  let dir = scratch("bad_icon_creates_no_file");
  let a = write(&dir, "a.bin", b"payload");
  let short = write(&dir, "short.raw", &[0; 100]);

  for icon in vec![dir.join("missing.raw"), short] {
    let out = dir.join("icon.o2x");
    let container = Container {
      name: Some("Icon".into()),
      sections: vec![Section::new(&a, 0)],
      icon: Some(icon),
      ..Container::default()
    };
    match pack::pack_to_file(&container, &out) {
      Err(pack::Error::Icon(_)) => {}
      other => panic!("expected an icon error, got {:?}", other),
    }
    assert!(!out.exists());
  }
}

#[test]
fn no_sections_creates_no_file() {
  let dir = scratch("no_sections_creates_no_file");
  let out = dir.join("empty.o2x");

  let container = Container {
    name: Some("Empty".into()),
    ..Container::default()
  };
  match pack::pack_to_file(&container, &out) {
    Err(pack::Error::Config(ConfigError::NoSections)) => {}
    other => panic!("expected NoSections, got {:?}", other),
  }
  assert!(!out.exists());
}

#[test]
fn long_name_creates_no_file() {
  let dir = scratch("long_name_creates_no_file");
  let a = write(&dir, "a.bin", b"payload");
  let out = dir.join("long.o2x");

  let container = Container {
    name: Some("x".repeat(33)),
    sections: vec![Section::new(a, 0)],
    ..Container::default()
  };
  match pack::pack_to_file(&container, &out) {
    Err(pack::Error::Config(ConfigError::NameTooLong(_))) => {}
    other => panic!("expected NameTooLong, got {:?}", other),
  }
  assert!(!out.exists());
}

#[test]
fn missing_section_aborts() {
  let dir = scratch("missing_section_aborts");
  let a = write(&dir, "a.bin", b"first");
  let missing = dir.join("missing.bin");
  let out = dir.join("partial.o2x");

  let container = Container {
    name: Some("Partial".into()),
    sections: vec![Section::new(a, 0), Section::new(&missing, 0x100)],
    ..Container::default()
  };
  match pack::pack_to_file(&container, &out) {
    Err(pack::Error::OpenSection { path, .. }) => assert_eq!(path, missing),
    other => panic!("expected OpenSection, got {:?}", other),
  }
}

#[test]
fn manifest_end_to_end() {
  let dir = scratch("manifest_end_to_end");
  write(&dir, "arm920.bin", &[0x11; 16]);
  write(&dir, "arm940.bin", &[0x22; 8]);
  let manifest = write(
    &dir,
    "game.json5",
    br#"{
      name: "Manifest game",
      params: { addr: "$100", len: "0b1000000" },
      sections: [
        { file: "arm920.bin", addr: "0x0" },
        { file: "arm940.bin", addr: "0x2000000" },
      ],
      out: "game.o2x",
    }"#,
  );

  let loaded = Manifest::load(&manifest).unwrap().resolve(&dir).unwrap();
  let out = loaded.out.unwrap();
  assert_eq!(out, dir.join("game.o2x"));

  let layout = pack::pack_to_file(&loaded.container, &out).unwrap();
  assert_eq!(
    layout.header.params,
    Params {
      addr: 0x100,
      len: 64
    }
  );

  let (header, records) = split(&fs::read(&out).unwrap());
  assert_eq!(header.name_bytes(), b"Manifest game");
  assert_eq!(records.len(), 2);
  assert_eq!(records[0].0.load_addr, 0);
  assert_eq!(records[0].1, vec![0x11; 16]);
  assert_eq!(records[1].0.load_addr, 0x0200_0000);
  assert_eq!(records[1].1, vec![0x22; 8]);
}
