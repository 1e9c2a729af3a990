//! Growable memory-mapped array of plain-old-data elements.

use std::fs::{File, OpenOptions};
use std::io;
use std::marker::PhantomData;
use std::mem;
use std::path::Path;

use bytemuck::Pod;
use memmap2::{Mmap, MmapMut};

/// Smallest capacity allocated on first push, in elements.
const MIN_CAP: usize = 1024;

enum Backing {
    /// Zero-length file, nothing mapped yet.
    Empty,
    Ro(Mmap),
    Rw(MmapMut),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Empty => &[],
            Backing::Ro(m) => &m[..],
            Backing::Rw(m) => &m[..],
        }
    }
}

/// A file-backed vector of `T`. While writable, the file length is the
/// mapped capacity; [`MmapVec::sync`] truncates it to the live element count
/// and flushes, which is what a read-only open later picks up.
pub struct MmapVec<T: Pod> {
    file: File,
    backing: Backing,
    len: usize,
    cap: usize,
    writable: bool,
    _elem: PhantomData<T>,
}

impl<T: Pod> MmapVec<T> {
    /// Create a fresh, empty, writable column, truncating any previous file.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file,
            backing: Backing::Empty,
            len: 0,
            cap: 0,
            writable: true,
            _elem: PhantomData,
        })
    }

    /// Map an existing column read-only. The file length must be a whole
    /// number of elements.
    pub fn open_ro(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        let byte_len = file.metadata()?.len() as usize;
        let size = mem::size_of::<T>();
        if byte_len % size != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("column length {byte_len} is not a multiple of element size {size}"),
            ));
        }
        let backing = if byte_len == 0 {
            Backing::Empty
        } else {
            Backing::Ro(unsafe { Mmap::map(&file)? })
        };
        Ok(Self {
            file,
            backing,
            len: byte_len / size,
            cap: byte_len / size,
            writable: false,
            _elem: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        if self.len == 0 {
            return &[];
        }
        let bytes = self.backing.bytes();
        bytemuck::cast_slice(&bytes[..self.len * mem::size_of::<T>()])
    }

    pub fn get(&self, i: usize) -> T {
        self.as_slice()[i]
    }

    pub fn push(&mut self, value: T) -> io::Result<()> {
        self.reserve(1)?;
        self.write_at(self.len, value);
        self.len += 1;
        Ok(())
    }

    pub fn extend_from_slice(&mut self, values: &[T]) -> io::Result<()> {
        self.reserve(values.len())?;
        let size = mem::size_of::<T>();
        let start = self.len * size;
        let dst = match &mut self.backing {
            Backing::Rw(m) => &mut m[start..start + values.len() * size],
            _ => unreachable!("reserve leaves a writable mapping"),
        };
        dst.copy_from_slice(bytemuck::cast_slice(values));
        self.len += values.len();
        Ok(())
    }

    /// Overwrite element `i`, which must already be live.
    pub fn set(&mut self, i: usize, value: T) -> io::Result<()> {
        if !self.writable {
            return Err(read_only());
        }
        assert!(i < self.len, "index {i} out of bounds (len {})", self.len);
        self.write_at(i, value);
        Ok(())
    }

    /// Grow to `new_len` elements, filling new slots with `value`.
    /// Never shrinks.
    pub fn resize(&mut self, new_len: usize, value: T) -> io::Result<()> {
        if new_len <= self.len {
            return Ok(());
        }
        self.reserve(new_len - self.len)?;
        for i in self.len..new_len {
            self.write_at(i, value);
        }
        self.len = new_len;
        Ok(())
    }

    /// Flush to durable storage and truncate the file to the live length.
    pub fn sync(&mut self) -> io::Result<()> {
        if !self.writable {
            return Ok(());
        }
        if let Backing::Rw(m) = &self.backing {
            m.flush()?;
        }
        // Unmap before truncating so no mapping outlives the file tail.
        self.backing = Backing::Empty;
        let byte_len = (self.len * mem::size_of::<T>()) as u64;
        self.file.set_len(byte_len)?;
        self.cap = self.len;
        if self.len > 0 {
            self.backing = Backing::Rw(unsafe { MmapMut::map_mut(&self.file)? });
        }
        Ok(())
    }

    fn write_at(&mut self, i: usize, value: T) {
        let size = mem::size_of::<T>();
        let start = i * size;
        match &mut self.backing {
            Backing::Rw(m) => m[start..start + size].copy_from_slice(bytemuck::bytes_of(&value)),
            _ => unreachable!("write_at requires a writable mapping"),
        }
    }

    fn reserve(&mut self, additional: usize) -> io::Result<()> {
        if !self.writable {
            return Err(read_only());
        }
        let needed = self.len + additional;
        if needed <= self.cap && matches!(self.backing, Backing::Rw(_)) {
            return Ok(());
        }
        let new_cap = needed.next_power_of_two().max(MIN_CAP);
        self.backing = Backing::Empty;
        self.file
            .set_len((new_cap * mem::size_of::<T>()) as u64)?;
        self.backing = Backing::Rw(unsafe { MmapMut::map_mut(&self.file)? });
        self.cap = new_cap;
        Ok(())
    }
}

fn read_only() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "column is read-only")
}
