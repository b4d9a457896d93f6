// Licensed under the Apache-2.0 license

//! Physical register windows.
//!
//! A window is a bounded, word-addressed view onto one peripheral block.
//! Production code maps the block out of `/dev/mem`; tests and consumers
//! that want to exercise controller logic without hardware back a window
//! with plain memory instead.

use std::ptr;
use std::sync::{Mutex, PoisonError};

use log::debug;

use crate::error::{Error, Result};

const WORD_SIZE: usize = core::mem::size_of::<u32>();

/// Word-addressed access to one peripheral register block.
///
/// Offsets are byte offsets from the window base and must be word-aligned
/// and inside `[0, len)`. Out-of-range access is a caller bug, not a
/// runtime-reported error; implementations assert rather than return.
pub trait RegisterWindow {
    /// Reads the word at `offset`.
    fn read_word(&self, offset: usize) -> u32;

    /// Writes `value` to the word at `offset`.
    fn write_word(&mut self, offset: usize, value: u32);

    /// Window extent in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tears the window down, reporting failures the implicit drop path
    /// would swallow.
    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

// One window per peripheral block per process. A second map of a claimed
// base is refused rather than silently aliased.
static CLAIMS: Mutex<Vec<usize>> = Mutex::new(Vec::new());

fn claim(base: usize) -> Result<()> {
    let mut claims = CLAIMS.lock().unwrap_or_else(PoisonError::into_inner);
    if claims.contains(&base) {
        return Err(Error::AlreadyInitialised);
    }
    claims.push(base);
    Ok(())
}

fn release(base: usize) {
    let mut claims = CLAIMS.lock().unwrap_or_else(PoisonError::into_inner);
    claims.retain(|&claimed| claimed != base);
}

/// A peripheral block mapped out of `/dev/mem`.
///
/// Requires the privilege to open the physical memory device. The mapping
/// is released on [`close`](RegisterWindow::close) or drop, whichever comes
/// first; the drop path cannot report unmap failures.
#[derive(Debug)]
pub struct DevMem {
    base: *mut u32,
    phys: usize,
    len: usize,
}

impl DevMem {
    /// Maps `len` bytes of physical memory starting at `phys`.
    pub fn map(phys: usize, len: usize) -> Result<Self> {
        claim(phys)?;
        match Self::map_claimed(phys, len) {
            Ok(window) => Ok(window),
            Err(error) => {
                release(phys);
                Err(error)
            }
        }
    }

    fn map_claimed(phys: usize, len: usize) -> Result<Self> {
        let fd = unsafe { libc::open(c"/dev/mem".as_ptr(), libc::O_RDWR) };
        if fd < 0 {
            return Err(Error::last_os("open /dev/mem"));
        }

        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                phys as libc::off_t,
            )
        };

        // The mapping holds its own reference; the descriptor is done either way.
        let closed = unsafe { libc::close(fd) };

        if base == libc::MAP_FAILED {
            return Err(Error::last_os("mmap /dev/mem"));
        }
        if closed != 0 {
            unsafe { libc::munmap(base, len) };
            return Err(Error::last_os("close /dev/mem"));
        }

        debug!("mapped {len:#x} bytes at physical {phys:#x}");
        Ok(DevMem {
            base: base.cast(),
            phys,
            len,
        })
    }

    fn unmap(&mut self) -> Result<()> {
        let base = self.base;
        self.base = ptr::null_mut();
        release(self.phys);
        if unsafe { libc::munmap(base.cast(), self.len) } != 0 {
            return Err(Error::last_os("munmap"));
        }
        Ok(())
    }
}

impl RegisterWindow for DevMem {
    fn read_word(&self, offset: usize) -> u32 {
        debug_assert!(offset % WORD_SIZE == 0 && offset < self.len);
        unsafe { ptr::read_volatile(self.base.add(offset / WORD_SIZE)) }
    }

    fn write_word(&mut self, offset: usize, value: u32) {
        debug_assert!(offset % WORD_SIZE == 0 && offset < self.len);
        unsafe { ptr::write_volatile(self.base.add(offset / WORD_SIZE), value) }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn close(mut self) -> Result<()> {
        self.unmap()
    }
}

impl Drop for DevMem {
    fn drop(&mut self) {
        if !self.base.is_null() {
            let _ = self.unmap();
        }
    }
}

/// A register window backed by plain memory.
///
/// Stands in for [`DevMem`] when exercising bit-packing and transaction
/// logic off the hardware. Reads and writes land in an ordinary word
/// array with no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayWindow {
    words: Vec<u32>,
}

impl ArrayWindow {
    /// A zeroed window of `len` bytes.
    pub fn new(len: usize) -> Self {
        ArrayWindow {
            words: vec![0; len / WORD_SIZE],
        }
    }

    /// The backing words, for test inspection.
    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

impl RegisterWindow for ArrayWindow {
    fn read_word(&self, offset: usize) -> u32 {
        debug_assert!(offset % WORD_SIZE == 0);
        match self.words.get(offset / WORD_SIZE) {
            Some(word) => *word,
            None => panic!("read outside window: {offset:#x}"),
        }
    }

    fn write_word(&mut self, offset: usize, value: u32) {
        debug_assert!(offset % WORD_SIZE == 0);
        match self.words.get_mut(offset / WORD_SIZE) {
            Some(word) => *word = value,
            None => panic!("write outside window: {offset:#x}"),
        }
    }

    fn len(&self) -> usize {
        self.words.len() * WORD_SIZE
    }
}
