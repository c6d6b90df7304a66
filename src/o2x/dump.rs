//! Objdump-style listing for o2x containers.

use std::io;

use crate::o2x::Header;
use crate::o2x::Icon;
use crate::o2x::Layout;
use crate::o2x::SectionHeader;

/// Dumps `layout` in the style of `objdump -h` to `w`.
pub fn dump(layout: &Layout, mut w: impl io::Write) -> io::Result<()> {
  let header = &layout.header;

  write!(w, "name:     \"")?;
  for &byte in header.name_bytes() {
    if 0x20 <= byte && byte <= 0x7e && byte != b'"' {
      write!(w, "{}", byte as char)?;
    } else {
      write!(w, "\\x{:02x}", byte)?;
    }
  }
  writeln!(w, "\"")?;

  if header.icon.is_blank() {
    writeln!(w, "icon:     none")?;
  } else {
    writeln!(w, "icon:     {}x{} rgb565", Icon::SIDE, Icon::SIDE)?;
  }

  if header.params.len == 0 && header.params.addr == 0 {
    writeln!(w, "params:   none")?;
  } else {
    writeln!(
      w,
      "params:   0x{:08x}, 0x{:x} bytes",
      header.params.addr, header.params.len
    )?;
  }
  writeln!(w, "sections: {}", header.sections)?;
  writeln!(w, "size:     0x{:x} bytes", layout.file_len())?;
  writeln!(w, "")?;

  writeln!(w, "Idx  Size      LMA       End       File off")?;
  let mut file_offset = Header::LEN as u64;
  for (i, section) in layout.sections.iter().enumerate() {
    file_offset += SectionHeader::LEN as u64;
    let (start, end) = section.memory_range();
    writeln!(
      w,
      "{:3}  {:08x}  {:08x}  {:08x}  {:08x}",
      i, section.len, start, end, file_offset
    )?;
    file_offset += section.len as u64;
  }

  Ok(())
}
