//! Low-level primitives for the `.ofsproject` binary container: a
//! length-prefixed, little-endian format with no generic binary-serde
//! dependency, because the wire layout's exact field order is part of
//! the contract (see `original_source/src/OFS_Project.h`).

use crate::error::ProjectError;
use ofs_action::{Action, ActionSet};
use std::path::Path;

pub const VERSION: u32 = 1;

pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn string(&mut self, s: &str) -> &mut Self {
        self.u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    pub fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.u32(b.len() as u32);
        self.buf.extend_from_slice(b);
        self
    }

    pub fn actions(&mut self, actions: &ActionSet) -> &mut Self {
        self.u32(actions.len() as u32);
        for a in actions.iter() {
            self.f32(a.at);
            self.buf.extend_from_slice(&a.pos.to_le_bytes());
            self.u8(a.flags);
            self.u8(a.tag);
        }
        self
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    path: &'a Path,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8], path: &'a Path) -> Self {
        Self { buf, pos: 0, path }
    }

    fn corrupt(&self, reason: impl Into<String>) -> ProjectError {
        ProjectError::Corrupt {
            path: self.path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProjectError> {
        if self.pos + n > self.buf.len() {
            return Err(self.corrupt(format!("expected {n} more bytes at offset {}", self.pos)));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u32(&mut self) -> Result<u32, ProjectError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes(b.try_into().unwrap()))
    }

    pub fn f32(&mut self) -> Result<f32, ProjectError> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes(b.try_into().unwrap()))
    }

    pub fn u8(&mut self) -> Result<u8, ProjectError> {
        Ok(self.take(1)?[0])
    }

    pub fn string(&mut self) -> Result<String, ProjectError> {
        let len = self.u32()? as usize;
        let b = self.take(len)?;
        String::from_utf8(b.to_vec()).map_err(|_| self.corrupt("invalid utf-8 in string field"))
    }

    pub fn bytes(&mut self) -> Result<Vec<u8>, ProjectError> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn actions(&mut self) -> Result<ActionSet, ProjectError> {
        let count = self.u32()? as usize;
        let mut set = ActionSet::new();
        let mut raw = Vec::with_capacity(count);
        for _ in 0..count {
            let at = self.f32()?;
            let pos_bytes = self.take(2)?;
            let pos = i16::from_le_bytes(pos_bytes.try_into().unwrap());
            let flags = self.u8()?;
            let tag = self.u8()?;
            raw.push(Action { at, pos, flags, tag });
        }
        set.insert_unchecked_bulk(raw);
        set.sort();
        Ok(set)
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_primitives() {
        let mut w = Writer::new();
        w.u32(7).string("hello").f32(1.5);
        let bytes = w.into_bytes();
        let path = Path::new("x");
        let mut r = Reader::new(&bytes, path);
        assert_eq!(r.u32().unwrap(), 7);
        assert_eq!(r.string().unwrap(), "hello");
        assert_eq!(r.f32().unwrap(), 1.5);
    }

    #[test]
    fn round_trips_actions() {
        let mut set = ActionSet::new();
        set.insert(Action::new(1.0, 50));
        set.insert(Action::new(2.0, 80));
        let mut w = Writer::new();
        w.actions(&set);
        let bytes = w.into_bytes();
        let path = Path::new("x");
        let mut r = Reader::new(&bytes, path);
        let restored = r.actions().unwrap();
        assert_eq!(set.as_slice(), restored.as_slice());
    }

    #[test]
    fn truncated_buffer_is_corrupt_not_panic() {
        let bytes = vec![1, 2, 3];
        let path = Path::new("x");
        let mut r = Reader::new(&bytes, path);
        assert!(r.u32().is_err());
    }
}
