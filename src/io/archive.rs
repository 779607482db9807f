//! Binary histogram archive (`.hpk`).
//!
//! A small container for named 1D/2D histograms. Layout (little-endian):
//!
//! ```text
//! magic   b"HPK1"
//! version u16            (currently 1)
//! count   u16
//! record*:
//!   kind      u8         (1 = 1D, 2 = 2D)
//!   name      u16 len + utf-8 bytes
//!   title     u16 len + utf-8 bytes
//!   1D: n_bins u32, x_min f64, x_max f64, entries f64,
//!       contents n_bins × f64, has_sumw2 u8, [sumw2 n_bins × f64]
//!   2D: nx u32, ny u32, x_min/x_max/y_min/y_max f64, entries f64,
//!       contents (nx·ny) × f64, has_sumw2 u8, [sumw2 (nx·ny) × f64]
//! ```
//!
//! The whole file is read up front; lookups are by name. A missing name or
//! a dimensionality mismatch maps to exit code 1, matching the behavior the
//! fit programs promise for absent histograms.

use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::hist::{Hist1D, Hist2D};

const MAGIC: &[u8; 4] = b"HPK1";
const VERSION: u16 = 1;

/// Dimensionality tag of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistKind {
    H1,
    H2,
}

impl HistKind {
    fn tag(self) -> u8 {
        match self {
            HistKind::H1 => 1,
            HistKind::H2 => 2,
        }
    }

    /// Short label for the key listing.
    pub fn label(self) -> &'static str {
        match self {
            HistKind::H1 => "H1",
            HistKind::H2 => "H2",
        }
    }
}

/// One stored histogram.
#[derive(Debug, Clone)]
pub enum HistRecord {
    H1(Hist1D),
    H2(Hist2D),
}

impl HistRecord {
    fn name(&self) -> &str {
        match self {
            HistRecord::H1(h) => &h.name,
            HistRecord::H2(h) => &h.name,
        }
    }

    fn kind(&self) -> HistKind {
        match self {
            HistRecord::H1(_) => HistKind::H1,
            HistRecord::H2(_) => HistKind::H2,
        }
    }
}

/// An in-memory histogram archive.
#[derive(Debug)]
pub struct HistArchive {
    records: Vec<HistRecord>,
}

/// Bounds-checked little-endian cursor over the raw file bytes.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], AppError> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.buf.len());
        let Some(end) = end else {
            return Err(AppError::new(2, "Truncated histogram archive."));
        };
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, AppError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, AppError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, AppError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f64(&mut self) -> Result<f64, AppError> {
        let b = self.take(8)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(b);
        Ok(f64::from_le_bytes(a))
    }

    fn f64_vec(&mut self, n: usize) -> Result<Vec<f64>, AppError> {
        // Sanity bound before allocating: every f64 needs 8 bytes.
        if n > (self.buf.len() - self.pos) / 8 {
            return Err(AppError::new(2, "Truncated histogram archive."));
        }
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.f64()?);
        }
        Ok(out)
    }

    fn string(&mut self) -> Result<String, AppError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| AppError::new(2, "Invalid UTF-8 in archive string."))
    }
}

impl HistArchive {
    /// Open and fully parse an archive file.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let buf = fs::read(path).map_err(|e| {
            AppError::new(1, format!("Error opening histogram file '{}': {e}", path.display()))
        })?;
        Self::parse(&buf).map_err(|e| {
            AppError::new(e.exit_code(), format!("{}: {e}", path.display()))
        })
    }

    fn parse(buf: &[u8]) -> Result<Self, AppError> {
        let mut c = Cursor::new(buf);

        if c.take(4)? != MAGIC {
            return Err(AppError::new(2, "Not a histogram archive (bad magic)."));
        }
        let version = c.u16()?;
        if version != VERSION {
            return Err(AppError::new(2, format!("Unsupported archive version {version}.")));
        }

        let count = c.u16()? as usize;
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push(Self::parse_record(&mut c)?);
        }

        Ok(Self { records })
    }

    fn parse_record(c: &mut Cursor<'_>) -> Result<HistRecord, AppError> {
        let kind = c.u8()?;
        let name = c.string()?;
        let title = c.string()?;

        match kind {
            1 => {
                let n_bins = c.u32()? as usize;
                let x_min = c.f64()?;
                let x_max = c.f64()?;
                let entries = c.f64()?;
                if n_bins == 0 || !(x_max > x_min) {
                    return Err(AppError::new(2, format!("Histogram '{name}' has invalid axis.")));
                }
                let contents = c.f64_vec(n_bins)?;
                let sumw2 = if c.u8()? != 0 {
                    Some(c.f64_vec(n_bins)?)
                } else {
                    None
                };
                Ok(HistRecord::H1(Hist1D {
                    name,
                    title,
                    n_bins,
                    x_min,
                    x_max,
                    contents,
                    sumw2,
                    entries,
                }))
            }
            2 => {
                let nx = c.u32()? as usize;
                let ny = c.u32()? as usize;
                let x_min = c.f64()?;
                let x_max = c.f64()?;
                let y_min = c.f64()?;
                let y_max = c.f64()?;
                let entries = c.f64()?;
                if nx == 0 || ny == 0 || !(x_max > x_min) || !(y_max > y_min) {
                    return Err(AppError::new(2, format!("Histogram '{name}' has invalid axes.")));
                }
                let n = nx
                    .checked_mul(ny)
                    .ok_or_else(|| AppError::new(2, format!("Histogram '{name}' is too large.")))?;
                let contents = c.f64_vec(n)?;
                let sumw2 = if c.u8()? != 0 { Some(c.f64_vec(n)?) } else { None };
                Ok(HistRecord::H2(Hist2D {
                    name,
                    title,
                    nx,
                    ny,
                    x_min,
                    x_max,
                    y_min,
                    y_max,
                    contents,
                    sumw2,
                    entries,
                }))
            }
            other => Err(AppError::new(2, format!("Unknown record kind {other} in archive."))),
        }
    }

    /// `(name, kind)` of every stored object, in file order.
    pub fn keys(&self) -> Vec<(&str, HistKind)> {
        self.records.iter().map(|r| (r.name(), r.kind())).collect()
    }

    fn find(&self, name: &str) -> Option<&HistRecord> {
        self.records.iter().find(|r| r.name() == name)
    }

    /// Fetch a 1D histogram by name.
    pub fn get1d(&self, name: &str) -> Result<&Hist1D, AppError> {
        match self.find(name) {
            Some(HistRecord::H1(h)) => Ok(h),
            Some(HistRecord::H2(_)) => Err(AppError::new(
                1,
                format!("Histogram '{name}' is 2D, expected 1D."),
            )),
            None => Err(AppError::new(1, format!("Histogram '{name}' not found!"))),
        }
    }

    /// Fetch a 2D histogram by name.
    pub fn get2d(&self, name: &str) -> Result<&Hist2D, AppError> {
        match self.find(name) {
            Some(HistRecord::H2(h)) => Ok(h),
            Some(HistRecord::H1(_)) => Err(AppError::new(
                1,
                format!("Histogram '{name}' is 1D, expected 2D."),
            )),
            None => Err(AppError::new(1, format!("Histogram '{name}' not found!"))),
        }
    }

    /// Serialize records to an archive file.
    pub fn write(path: &Path, records: &[HistRecord]) -> Result<(), AppError> {
        let count = u16::try_from(records.len())
            .map_err(|_| AppError::new(2, "Too many records for one archive."))?;

        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&VERSION.to_le_bytes());
        buf.extend_from_slice(&count.to_le_bytes());

        for r in records {
            buf.push(r.kind().tag());
            write_string(&mut buf, r.name())?;
            match r {
                HistRecord::H1(h) => {
                    write_string(&mut buf, &h.title)?;
                    buf.extend_from_slice(&(h.n_bins as u32).to_le_bytes());
                    for v in [h.x_min, h.x_max, h.entries] {
                        buf.extend_from_slice(&v.to_le_bytes());
                    }
                    write_f64s(&mut buf, &h.contents);
                    write_sumw2(&mut buf, h.sumw2.as_deref());
                }
                HistRecord::H2(h) => {
                    write_string(&mut buf, &h.title)?;
                    buf.extend_from_slice(&(h.nx as u32).to_le_bytes());
                    buf.extend_from_slice(&(h.ny as u32).to_le_bytes());
                    for v in [h.x_min, h.x_max, h.y_min, h.y_max, h.entries] {
                        buf.extend_from_slice(&v.to_le_bytes());
                    }
                    write_f64s(&mut buf, &h.contents);
                    write_sumw2(&mut buf, h.sumw2.as_deref());
                }
            }
        }

        fs::write(path, &buf).map_err(|e| {
            AppError::new(2, format!("Failed to write archive '{}': {e}", path.display()))
        })
    }
}

fn write_string(buf: &mut Vec<u8>, s: &str) -> Result<(), AppError> {
    let len = u16::try_from(s.len())
        .map_err(|_| AppError::new(2, format!("Archive string too long: '{s}'.")))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

fn write_f64s(buf: &mut Vec<u8>, vals: &[f64]) {
    for v in vals {
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

fn write_sumw2(buf: &mut Vec<u8>, sumw2: Option<&[f64]>) {
    match sumw2 {
        Some(w2) => {
            buf.push(1);
            write_f64s(buf, w2);
        }
        None => buf.push(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<HistRecord> {
        vec![
            HistRecord::H1(Hist1D {
                name: "a".to_string(),
                title: "first".to_string(),
                n_bins: 3,
                x_min: 0.0,
                x_max: 3.0,
                contents: vec![1.0, 2.0, 3.0],
                sumw2: Some(vec![1.0, 2.0, 3.0]),
                entries: 6.0,
            }),
            HistRecord::H2(Hist2D {
                name: "b".to_string(),
                title: "second".to_string(),
                nx: 2,
                ny: 2,
                x_min: -1.0,
                x_max: 1.0,
                y_min: 0.0,
                y_max: 4.0,
                contents: vec![1.0, 0.0, 0.0, 5.0],
                sumw2: None,
                entries: 6.0,
            }),
        ]
    }

    #[test]
    fn write_then_open_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.hpk");
        HistArchive::write(&path, &sample_records()).unwrap();

        let arc = HistArchive::open(&path).unwrap();
        let keys = arc.keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], ("a", HistKind::H1));
        assert_eq!(keys[1], ("b", HistKind::H2));

        let a = arc.get1d("a").unwrap();
        assert_eq!(a.contents, vec![1.0, 2.0, 3.0]);
        assert_eq!(a.sumw2.as_deref(), Some(&[1.0, 2.0, 3.0][..]));
        assert!((a.entries - 6.0).abs() < 1e-15);

        let b = arc.get2d("b").unwrap();
        assert_eq!(b.nx, 2);
        assert!((b.value(1, 1) - 5.0).abs() < 1e-15);
        assert!(b.sumw2.is_none());
    }

    #[test]
    fn missing_name_is_exit_code_1() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.hpk");
        HistArchive::write(&path, &sample_records()).unwrap();
        let arc = HistArchive::open(&path).unwrap();

        let err = arc.get1d("nope").unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn kind_mismatch_is_exit_code_1() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.hpk");
        HistArchive::write(&path, &sample_records()).unwrap();
        let arc = HistArchive::open(&path).unwrap();

        assert_eq!(arc.get2d("a").unwrap_err().exit_code(), 1);
        assert_eq!(arc.get1d("b").unwrap_err().exit_code(), 1);
    }

    #[test]
    fn missing_file_is_exit_code_1() {
        let err = HistArchive::open(Path::new("/no/such/file.hpk")).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn truncated_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.hpk");
        HistArchive::write(&path, &sample_records()).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() / 2);
        std::fs::write(&path, &bytes).unwrap();

        let err = HistArchive::open(&path).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn bad_magic_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.hpk");
        std::fs::write(&path, b"not an archive at all").unwrap();
        let err = HistArchive::open(&path).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
