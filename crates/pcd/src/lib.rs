//! PCD: dependency-light reader/writer for Point Cloud Data files (v0.7).
//!
//! - Reads `DATA ascii` and `DATA binary` bodies.
//! - Requires `x y z` fields; any scalar type/size is widened to f32.
//! - Optional color, either one packed field (`rgb` / `rgba`) or three
//!   separate fields (`r g b`).
//! - Points with a non-finite coordinate (organized clouds pad with NaN) are
//!   dropped together with their color.
//! - Writes ASCII PCD with `x y z` or `x y z rgb`.
//!
//! Header layout (one keyword per line, `#` starts a comment):
//!   VERSION .7
//!   FIELDS x y z rgb
//!   SIZE 4 4 4 4
//!   TYPE F F F U
//!   COUNT 1 1 1 1        (optional, defaults to 1 per field)
//!   WIDTH n
//!   HEIGHT 1
//!   VIEWPOINT 0 0 0 1 0 0 0
//!   POINTS n             (optional, defaults to WIDTH * HEIGHT)
//!   DATA ascii | binary | binary_compressed
//!
//! Packed color follows the PCL convention: a `TYPE F` rgb field holds the
//! packed `0x00RRGGBB` integer in the float's bit pattern, a `TYPE U` field
//! holds it as a plain integer.

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::Path;

pub const PCD_VERSION: &str = "0.7";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataEncoding {
    Ascii,
    Binary,
    /// LZF-compressed column layout; recognised but not decoded.
    BinaryCompressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Signed integer.
    I,
    /// Unsigned integer.
    U,
    /// IEEE float.
    F,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub size: usize,
    pub ty: FieldType,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcdHeader {
    pub version: String,
    pub fields: Vec<Field>,
    pub width: usize,
    pub height: usize,
    pub points: usize,
    pub data: DataEncoding,
}

impl PcdHeader {
    /// Bytes per point record in a binary body.
    pub fn record_size(&self) -> usize {
        self.fields.iter().map(|f| f.size * f.count).sum()
    }

    /// Byte offset of every field inside one binary record.
    fn byte_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.fields.len());
        let mut at = 0usize;
        for f in &self.fields {
            offsets.push(at);
            at += f.size * f.count;
        }
        offsets
    }

    /// Token index of every field inside one ASCII line.
    fn token_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.fields.len());
        let mut at = 0usize;
        for f in &self.fields {
            offsets.push(at);
            at += f.count;
        }
        offsets
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Raw per-point color exactly as stored in the file.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorAttribute {
    /// Item width 1: `0x00RRGGBB` per point.
    Packed(Vec<u32>),
    /// Item width 3: either [0,1] or [0,255] scale, not yet normalized.
    Rgb(Vec<[f32; 3]>),
}

impl ColorAttribute {
    pub fn item_width(&self) -> usize {
        match self {
            ColorAttribute::Packed(_) => 1,
            ColorAttribute::Rgb(_) => 3,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColorAttribute::Packed(v) => v.len(),
            ColorAttribute::Rgb(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded point records.
#[derive(Debug, Clone, PartialEq)]
pub struct PcdCloud {
    pub header: PcdHeader,
    pub positions: Vec<[f32; 3]>,
    pub colors: Option<ColorAttribute>,
}

#[cold]
fn bad(msg: &str) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, msg)
}

#[inline(always)]
fn need(buf: &[u8], want: usize) -> io::Result<()> {
    if buf.len() < want {
        Err(io::Error::new(ErrorKind::UnexpectedEof, "truncated PCD body"))
    } else {
        Ok(())
    }
}

/// Splits the next `\n`-terminated line off the front of `buf`.
fn next_line<'a>(buf: &mut &'a [u8]) -> Option<&'a [u8]> {
    if buf.is_empty() {
        return None;
    }
    let end = buf.iter().position(|&b| b == b'\n').unwrap_or(buf.len());
    let line = &buf[..end];
    *buf = if end < buf.len() { &buf[end + 1..] } else { &[] };
    Some(line)
}

fn parse_usize(tok: &str, what: &str) -> io::Result<usize> {
    tok.parse::<usize>()
        .map_err(|_| bad(&format!("invalid {} value '{}'", what, tok)))
}

/// Parse the header and return it with the remaining body bytes.
pub fn parse_header(mut p: &[u8]) -> io::Result<(PcdHeader, &[u8])> {
    let mut version = None;
    let mut names: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut types: Vec<FieldType> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut width = None;
    let mut height = None;
    let mut points = None;

    loop {
        let raw = next_line(&mut p).ok_or_else(|| bad("PCD header ended before DATA"))?;
        let line = std::str::from_utf8(raw).map_err(|_| bad("PCD header is not UTF-8"))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut toks = line.split_whitespace();
        let key = toks.next().unwrap_or_default().to_ascii_uppercase();
        let rest: Vec<&str> = toks.collect();

        match key.as_str() {
            "VERSION" => version = rest.first().map(|v| v.trim_start_matches('.').to_string()),
            "FIELDS" | "COLUMNS" => names = rest.iter().map(|s| s.to_string()).collect(),
            "SIZE" => {
                sizes = rest
                    .iter()
                    .map(|t| parse_usize(t, "SIZE"))
                    .collect::<io::Result<_>>()?
            }
            "TYPE" => {
                types = rest
                    .iter()
                    .map(|t| match *t {
                        "F" | "f" => Ok(FieldType::F),
                        "U" | "u" => Ok(FieldType::U),
                        "I" | "i" => Ok(FieldType::I),
                        other => Err(bad(&format!("unknown PCD field type '{}'", other))),
                    })
                    .collect::<io::Result<_>>()?
            }
            "COUNT" => {
                counts = rest
                    .iter()
                    .map(|t| parse_usize(t, "COUNT"))
                    .collect::<io::Result<_>>()?
            }
            "WIDTH" => width = Some(parse_usize(rest.first().copied().unwrap_or(""), "WIDTH")?),
            "HEIGHT" => height = Some(parse_usize(rest.first().copied().unwrap_or(""), "HEIGHT")?),
            "POINTS" => points = Some(parse_usize(rest.first().copied().unwrap_or(""), "POINTS")?),
            "VIEWPOINT" => {}
            "DATA" => {
                let data = match rest.first().map(|s| s.to_ascii_lowercase()).as_deref() {
                    Some("ascii") => DataEncoding::Ascii,
                    Some("binary") => DataEncoding::Binary,
                    Some("binary_compressed") => DataEncoding::BinaryCompressed,
                    _ => return Err(bad("unknown PCD DATA encoding")),
                };

                if names.is_empty() {
                    return Err(bad("PCD header has no FIELDS"));
                }
                if counts.is_empty() {
                    counts = vec![1; names.len()];
                }
                if sizes.len() != names.len()
                    || types.len() != names.len()
                    || counts.len() != names.len()
                {
                    return Err(bad("PCD FIELDS/SIZE/TYPE/COUNT lengths differ"));
                }

                let mut fields = Vec::with_capacity(names.len());
                for (((name, size), ty), count) in names
                    .into_iter()
                    .zip(sizes)
                    .zip(types)
                    .zip(counts)
                {
                    let valid = match ty {
                        FieldType::F => size == 4 || size == 8,
                        FieldType::U | FieldType::I => matches!(size, 1 | 2 | 4 | 8),
                    };
                    if !valid {
                        return Err(bad(&format!("unsupported size {} for field '{}'", size, name)));
                    }
                    if count == 0 {
                        return Err(bad(&format!("field '{}' has COUNT 0", name)));
                    }
                    fields.push(Field { name, size, ty, count });
                }

                let width = width.ok_or_else(|| bad("PCD header missing WIDTH"))?;
                let height = height.unwrap_or(1);
                let points = points.unwrap_or(width * height);

                let header = PcdHeader {
                    version: version.unwrap_or_else(|| PCD_VERSION.to_string()),
                    fields,
                    width,
                    height,
                    points,
                    data,
                };
                return Ok((header, p));
            }
            other => return Err(bad(&format!("unknown PCD header key '{}'", other))),
        }
    }
}

/// Reads one scalar of a binary field as f64.
#[inline]
fn scalar_le(bytes: &[u8], field: &Field) -> f64 {
    match (field.ty, field.size) {
        (FieldType::F, 4) => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        (FieldType::F, _) => f64::from_le_bytes(bytes[..8].try_into().unwrap_or([0; 8])),
        (FieldType::U, 1) => bytes[0] as f64,
        (FieldType::U, 2) => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
        (FieldType::U, 4) => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        (FieldType::U, _) => u64::from_le_bytes(bytes[..8].try_into().unwrap_or([0; 8])) as f64,
        (FieldType::I, 1) => bytes[0] as i8 as f64,
        (FieldType::I, 2) => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
        (FieldType::I, 4) => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        (FieldType::I, _) => i64::from_le_bytes(bytes[..8].try_into().unwrap_or([0; 8])) as f64,
    }
}

/// Reads a packed-color field as its raw 32-bit pattern.
#[inline]
fn packed_le(bytes: &[u8], field: &Field) -> u32 {
    match field.size {
        4 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        _ => scalar_le(bytes, field) as u32,
    }
}

fn packed_ascii(tok: &str, field: &Field) -> io::Result<u32> {
    let value = match field.ty {
        FieldType::F => tok
            .parse::<f32>()
            .map(f32::to_bits)
            .map_err(|_| bad(&format!("invalid rgb value '{}'", tok)))?,
        FieldType::U | FieldType::I => tok
            .parse::<f64>()
            .map(|v| v as u32)
            .map_err(|_| bad(&format!("invalid rgb value '{}'", tok)))?,
    };
    Ok(value & 0x00FF_FFFF)
}

enum ColorLayout {
    None,
    Packed(usize),
    Split([usize; 3]),
}

fn color_layout(header: &PcdHeader) -> ColorLayout {
    if let Some(i) = header.find("rgb").or_else(|| header.find("rgba")) {
        return ColorLayout::Packed(i);
    }
    match (header.find("r"), header.find("g"), header.find("b")) {
        (Some(r), Some(g), Some(b)) => ColorLayout::Split([r, g, b]),
        _ => ColorLayout::None,
    }
}

/// Parse PCD from a contiguous byte slice. This is the single source of truth for parsing.
pub fn parse_pcd_bytes(bytes: &[u8]) -> io::Result<PcdCloud> {
    let (header, body) = parse_header(bytes)?;

    let xyz = [
        header.find("x").ok_or_else(|| bad("PCD missing 'x' field"))?,
        header.find("y").ok_or_else(|| bad("PCD missing 'y' field"))?,
        header.find("z").ok_or_else(|| bad("PCD missing 'z' field"))?,
    ];
    let layout = color_layout(&header);

    // POINTS is untrusted until the body is measured; reserve per branch.
    let mut positions = Vec::<[f32; 3]>::new();
    let mut packed = Vec::<u32>::new();
    let mut split = Vec::<[f32; 3]>::new();

    match header.data {
        DataEncoding::BinaryCompressed => {
            return Err(io::Error::new(
                ErrorKind::Unsupported,
                "PCD binary_compressed bodies are not supported",
            ));
        }
        DataEncoding::Binary => {
            let rec = header.record_size();
            let total = header
                .points
                .checked_mul(rec)
                .ok_or_else(|| bad("points size overflow"))?;
            need(body, total)?;
            let raw = &body[..total];
            positions.reserve(header.points.min(raw.len() / rec.max(1)));

            // Fast path: tightly packed f32 x y z records reinterpret directly.
            let xyz_only = header.fields.len() == 3
                && xyz == [0, 1, 2]
                && header
                    .fields
                    .iter()
                    .all(|f| f.ty == FieldType::F && f.size == 4 && f.count == 1);

            #[cfg(target_endian = "little")]
            {
                if xyz_only {
                    if let Ok(pts) = bytemuck::try_cast_slice::<u8, [f32; 3]>(raw) {
                        positions.extend(pts.iter().filter(|p| p.iter().all(|c| c.is_finite())));
                        return Ok(PcdCloud {
                            header,
                            positions,
                            colors: None,
                        });
                    }
                }
            }

            let offsets = header.byte_offsets();
            for record in raw.chunks_exact(rec.max(1)).take(header.points) {
                let read = |i: usize| scalar_le(&record[offsets[i]..], &header.fields[i]) as f32;
                let p = [read(xyz[0]), read(xyz[1]), read(xyz[2])];
                if !p.iter().all(|c| c.is_finite()) {
                    continue;
                }
                positions.push(p);
                match layout {
                    ColorLayout::None => {}
                    ColorLayout::Packed(i) => {
                        packed.push(packed_le(&record[offsets[i]..], &header.fields[i]) & 0x00FF_FFFF)
                    }
                    ColorLayout::Split([r, g, b]) => split.push([read(r), read(g), read(b)]),
                }
            }
        }
        DataEncoding::Ascii => {
            let text = std::str::from_utf8(body).map_err(|_| bad("PCD ASCII body is not UTF-8"))?;
            let offsets = header.token_offsets();
            let per_line: usize = header.fields.iter().map(|f| f.count).sum();
            let mut seen = 0usize;
            // Every value takes at least one digit and one separator.
            positions.reserve(header.points.min(text.len() / (2 * per_line.max(1))));

            for line in text.lines() {
                if seen == header.points {
                    break;
                }
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let toks: Vec<&str> = line.split_whitespace().collect();
                if toks.len() < per_line {
                    return Err(bad(&format!("PCD line {} has too few values", seen + 1)));
                }
                seen += 1;

                let token = |i: usize| {
                    toks.get(offsets[i])
                        .copied()
                        .ok_or_else(|| bad(&format!("PCD line {} is missing '{}'", seen, header.fields[i].name)))
                };
                let read = |i: usize| -> io::Result<f32> {
                    let tok = token(i)?;
                    tok.parse::<f32>()
                        .map_err(|_| bad(&format!("invalid number '{}'", tok)))
                };

                let p = [read(xyz[0])?, read(xyz[1])?, read(xyz[2])?];
                if !p.iter().all(|c| c.is_finite()) {
                    continue;
                }
                positions.push(p);
                match layout {
                    ColorLayout::None => {}
                    ColorLayout::Packed(i) => {
                        packed.push(packed_ascii(token(i)?, &header.fields[i])?)
                    }
                    ColorLayout::Split([r, g, b]) => split.push([read(r)?, read(g)?, read(b)?]),
                }
            }

            if seen < header.points {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "PCD ASCII body has fewer points than advertised",
                ));
            }
        }
    }

    let colors = match layout {
        ColorLayout::None => None,
        ColorLayout::Packed(_) => Some(ColorAttribute::Packed(packed)),
        ColorLayout::Split(_) => Some(ColorAttribute::Rgb(split)),
    };

    Ok(PcdCloud {
        header,
        positions,
        colors,
    })
}

/// Fast path: prefer mmap; fall back to a single read.
#[cfg(feature = "mmap")]
pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<PcdCloud> {
    let file = File::open(path)?;
    let map = unsafe { memmap2::MmapOptions::new().map(&file)? };
    parse_pcd_bytes(&map)
}

#[cfg(not(feature = "mmap"))]
pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<PcdCloud> {
    let bytes = std::fs::read(path)?;
    parse_pcd_bytes(&bytes)
}

/// Writes an ASCII PCD with `x y z` and, when `rgb` is given, a packed `rgb` column.
pub fn write_ascii<W: Write>(w: &mut W, positions: &[[f32; 3]], rgb: Option<&[u32]>) -> io::Result<()> {
    if let Some(rgb) = rgb {
        if rgb.len() != positions.len() {
            return Err(bad("rgb length != points length"));
        }
    }

    let n = positions.len();

    writeln!(w, "# .PCD v{} - Point Cloud Data file format", PCD_VERSION)?;
    writeln!(w, "VERSION {}", PCD_VERSION)?;
    if rgb.is_some() {
        writeln!(w, "FIELDS x y z rgb")?;
        writeln!(w, "SIZE 4 4 4 4")?;
        writeln!(w, "TYPE F F F U")?;
        writeln!(w, "COUNT 1 1 1 1")?;
    } else {
        writeln!(w, "FIELDS x y z")?;
        writeln!(w, "SIZE 4 4 4")?;
        writeln!(w, "TYPE F F F")?;
        writeln!(w, "COUNT 1 1 1")?;
    }
    writeln!(w, "WIDTH {}", n)?;
    writeln!(w, "HEIGHT 1")?;
    writeln!(w, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(w, "POINTS {}", n)?;
    writeln!(w, "DATA ascii")?;

    match rgb {
        Some(rgb) => {
            for (p, c) in positions.iter().zip(rgb) {
                writeln!(w, "{} {} {} {}", p[0], p[1], p[2], c)?;
            }
        }
        None => {
            for p in positions {
                writeln!(w, "{} {} {}", p[0], p[1], p[2])?;
            }
        }
    }

    w.flush()
}

pub fn write_file<P: AsRef<Path>>(path: P, positions: &[[f32; 3]], rgb: Option<&[u32]>) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write_ascii(&mut file, positions, rgb)
}

/// Packs 8-bit channels into `0x00RRGGBB`.
#[inline]
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Inverse of [`pack_rgb`]; the top byte is ignored.
#[inline]
pub fn unpack_rgb(v: u32) -> [u8; 3] {
    [((v >> 16) & 0xFF) as u8, ((v >> 8) & 0xFF) as u8, (v & 0xFF) as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASCII_RGB: &str = "\
# .PCD v0.7 - Point Cloud Data file format
VERSION .7
FIELDS x y z rgb
SIZE 4 4 4 4
TYPE F F F U
COUNT 1 1 1 1
WIDTH 3
HEIGHT 1
VIEWPOINT 0 0 0 1 0 0 0
POINTS 3
DATA ascii
1 2 3 16711808
-1.5 0.25 4 255
0 0 0 0
";

    #[test]
    fn parses_ascii_with_packed_rgb() {
        let cloud = parse_pcd_bytes(ASCII_RGB.as_bytes()).unwrap();
        assert_eq!(cloud.header.points, 3);
        assert_eq!(cloud.header.data, DataEncoding::Ascii);
        assert_eq!(cloud.positions, vec![[1.0, 2.0, 3.0], [-1.5, 0.25, 4.0], [0.0, 0.0, 0.0]]);
        assert_eq!(
            cloud.colors,
            Some(ColorAttribute::Packed(vec![0xFF0080, 0x0000FF, 0]))
        );
    }

    #[test]
    fn float_rgb_field_is_read_bitwise() {
        let bits = pack_rgb(10, 20, 30);
        let text = format!(
            "VERSION .7\nFIELDS x y z rgb\nSIZE 4 4 4 4\nTYPE F F F F\nWIDTH 1\nHEIGHT 1\nPOINTS 1\nDATA ascii\n0 0 0 {:e}\n",
            f32::from_bits(bits)
        );
        let cloud = parse_pcd_bytes(text.as_bytes()).unwrap();
        assert_eq!(cloud.colors, Some(ColorAttribute::Packed(vec![bits])));
    }

    #[test]
    fn parses_split_channels_as_width_three() {
        let text = "VERSION .7\nFIELDS x y z r g b\nSIZE 4 4 4 1 1 1\nTYPE F F F U U U\nWIDTH 1\nPOINTS 1\nDATA ascii\n1 1 1 255 128 0\n";
        let cloud = parse_pcd_bytes(text.as_bytes()).unwrap();
        let colors = cloud.colors.unwrap();
        assert_eq!(colors.item_width(), 3);
        assert_eq!(colors, ColorAttribute::Rgb(vec![[255.0, 128.0, 0.0]]));
    }

    #[test]
    fn parses_binary_records() {
        let mut bytes = b"VERSION .7\nFIELDS x y z rgb\nSIZE 4 4 4 4\nTYPE F F F U\nCOUNT 1 1 1 1\nWIDTH 2\nHEIGHT 1\nPOINTS 2\nDATA binary\n".to_vec();
        for (p, c) in [([1.0f32, 2.0, 3.0], 0x112233u32), ([4.0, 5.0, 6.0], 0xABCDEF)] {
            for v in p {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            bytes.extend_from_slice(&c.to_le_bytes());
        }

        let cloud = parse_pcd_bytes(&bytes).unwrap();
        assert_eq!(cloud.positions, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(cloud.colors, Some(ColorAttribute::Packed(vec![0x112233, 0xABCDEF])));
    }

    #[test]
    fn binary_xyz_only_matches_slow_path() {
        let mut bytes = b"VERSION .7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 3\nDATA binary\n".to_vec();
        let pts = [[0.5f32, -0.5, 1.0], [f32::NAN, 0.0, 0.0], [7.0, 8.0, 9.0]];
        for p in pts {
            for v in p {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }
        let cloud = parse_pcd_bytes(&bytes).unwrap();
        assert_eq!(cloud.positions, vec![[0.5, -0.5, 1.0], [7.0, 8.0, 9.0]]);
        assert!(cloud.colors.is_none());
    }

    #[test]
    fn rejects_truncated_and_unsupported_bodies() {
        let truncated = b"VERSION .7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 2\nDATA binary\n\0\0\0\0";
        assert_eq!(
            parse_pcd_bytes(truncated).unwrap_err().kind(),
            ErrorKind::UnexpectedEof
        );

        let compressed = b"VERSION .7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 2\nDATA binary_compressed\n";
        assert_eq!(
            parse_pcd_bytes(compressed).unwrap_err().kind(),
            ErrorKind::Unsupported
        );

        let no_z = b"VERSION .7\nFIELDS x y\nSIZE 4 4\nTYPE F F\nWIDTH 1\nDATA ascii\n1 2\n";
        assert_eq!(parse_pcd_bytes(no_z).unwrap_err().kind(), ErrorKind::InvalidData);

        let short = b"VERSION .7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 2\nDATA ascii\n1 2 3\n";
        assert!(parse_pcd_bytes(short).is_err());
    }

    #[test]
    fn oversized_point_count_fails_without_reserving_it() {
        let ascii = b"VERSION .7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 1\nPOINTS 100000000000000\nDATA ascii\n1 2 3\n";
        assert_eq!(parse_pcd_bytes(ascii).unwrap_err().kind(), ErrorKind::UnexpectedEof);

        let binary = b"VERSION .7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 1\nPOINTS 100000000000000\nDATA binary\n\0\0\0\0\0\0\0\0\0\0\0\0";
        assert_eq!(parse_pcd_bytes(binary).unwrap_err().kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn zero_count_fields_are_rejected() {
        let ascii = b"VERSION .7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 0\nWIDTH 1\nDATA ascii\n1 2\n";
        assert_eq!(parse_pcd_bytes(ascii).unwrap_err().kind(), ErrorKind::InvalidData);

        let mut binary = b"VERSION .7\nFIELDS x y z rgb\nSIZE 4 4 4 4\nTYPE F F F U\nCOUNT 1 1 1 0\nWIDTH 1\nDATA binary\n".to_vec();
        binary.extend_from_slice(&[0u8; 12]);
        assert_eq!(parse_pcd_bytes(&binary).unwrap_err().kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn writer_output_reads_back() {
        let positions = vec![[1.25f32, -2.5, 3.0], [0.1, 0.2, 0.3]];
        let rgb = vec![pack_rgb(255, 0, 128), pack_rgb(1, 2, 3)];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pcd");
        write_file(&path, &positions, Some(&rgb)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("FIELDS x y z rgb"));
        assert!(text.contains("POINTS 2"));

        let cloud = read_file(&path).unwrap();
        assert_eq!(cloud.positions, positions);
        assert_eq!(cloud.colors, Some(ColorAttribute::Packed(rgb)));
    }

    #[test]
    fn writer_rejects_mismatched_rgb() {
        let mut out = Vec::new();
        let err = write_ascii(&mut out, &[[0.0; 3]], Some(&[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn pack_and_unpack_agree() {
        assert_eq!(pack_rgb(255, 0, 128), 0xFF0080);
        assert_eq!(unpack_rgb(0xAAFF0080), [255, 0, 128]);
    }
}
