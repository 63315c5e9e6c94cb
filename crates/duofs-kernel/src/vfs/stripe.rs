//! Striping I/O engine.
//!
//! A logical byte range is moved in rounds. Each round transfers up to one
//! stripe unit to backend A, then up to one stripe unit to backend B, both at
//! the same physical offset; the offset then advances by one unit. Chunk `k`
//! of a call lives at position `k * unit` of the caller's buffer, so with a
//! unit of 5 the bytes `helloworld!!` written at offset 0 land as `hello!!`
//! in A's file and `world` in B's file.
//!
//! The logical size of a file is the sum of both halves. Only calls that
//! start at offset 0 see the logical byte order; other offsets address each
//! half's physical offset directly.
//!
//! A failing chunk aborts the call with that backend's error. Chunks already
//! transferred stay where they are.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use rustix::fs::{Mode, OFlags};
use tracing::{debug, trace};

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::resolve::{Backend, ResolvedPair};
use crate::vfs::types::{StripedRead, StripedWrite};

/// Per-chunk access to one backend file.
///
/// Every call opens and closes its own descriptor; no handle outlives a chunk.
pub trait ChunkIo: Send + Sync {
    /// Open with `flags` and close again, to check existence and permissions.
    fn open_check(&self, backend: Backend, path: &Path, flags: i32) -> io::Result<()>;

    /// Current on-disk size.
    fn size(&self, backend: Backend, path: &Path) -> io::Result<u64>;

    /// Read into `buf` at `offset`, returning the byte count.
    fn read_chunk(&self, backend: Backend, path: &Path, offset: u64, buf: &mut [u8])
    -> io::Result<usize>;

    /// Write `data` at `offset`, returning the byte count.
    fn write_chunk(&self, backend: Backend, path: &Path, offset: u64, data: &[u8])
    -> io::Result<usize>;
}

/// [`ChunkIo`] over the local filesystem with positional reads and writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalChunkIo;

impl ChunkIo for LocalChunkIo {
    fn open_check(&self, _backend: Backend, path: &Path, flags: i32) -> io::Result<()> {
        let fd = rustix::fs::open(path, OFlags::from_bits_retain(flags as u32), Mode::empty())?;
        drop(fd);
        Ok(())
    }

    fn size(&self, _backend: Backend, path: &Path) -> io::Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }

    fn read_chunk(
        &self,
        _backend: Backend,
        path: &Path,
        offset: u64,
        buf: &mut [u8],
    ) -> io::Result<usize> {
        File::open(path)?.read_at(buf, offset)
    }

    fn write_chunk(
        &self,
        _backend: Backend,
        path: &Path,
        offset: u64,
        data: &[u8],
    ) -> io::Result<usize> {
        OpenOptions::new().write(true).open(path)?.write_at(data, offset)
    }
}

/// Splits reads and writes into stripe-unit chunks alternating A and B.
#[derive(Debug, Clone)]
pub struct StripingEngine<C = LocalChunkIo> {
    unit: usize,
    io: C,
}

impl StripingEngine<LocalChunkIo> {
    /// Engine over local files. `unit` must be non-zero.
    pub fn new(unit: usize) -> Self {
        Self::with_io(unit, LocalChunkIo)
    }
}

impl<C: ChunkIo> StripingEngine<C> {
    pub fn with_io(unit: usize, io: C) -> Self {
        Self { unit, io }
    }

    pub fn io(&self) -> &C {
        &self.io
    }

    /// Open the object on both backends with `flags`, closing right away.
    pub fn open(&self, pair: &ResolvedPair, flags: i32) -> VfsResult<()> {
        for (backend, path) in pair.iter() {
            self.io
                .open_check(backend, path, flags)
                .map_err(|e| VfsError::backend(backend, e))?;
        }
        Ok(())
    }

    /// Read up to `size` bytes of the logical file starting at physical
    /// offset `offset`.
    ///
    /// `logical_size` is always the sum of both halves. Rounds stop once the
    /// chunk positions pass `size`, so a short read of a large file only
    /// touches the chunks it returns.
    pub fn read(&self, pair: &ResolvedPair, offset: u64, size: usize) -> VfsResult<StripedRead> {
        self.open(pair, read_only_flags())?;

        let mut logical_size = 0u64;
        for (backend, path) in pair.iter() {
            logical_size += self
                .io
                .size(backend, path)
                .map_err(|e| VfsError::backend(backend, e))?;
        }
        debug!(
            path = %pair.a.display(),
            offset,
            size,
            logical_size,
            unit = self.unit,
            "striped read"
        );

        let mut data = Vec::new();
        let mut scratch = vec![0u8; self.unit];
        let mut transferred = 0u64;
        let mut round_offset = offset;
        let mut chunk = 0usize;

        'rounds: while transferred < logical_size {
            let mut round_bytes = 0u64;
            for (backend, path) in pair.iter() {
                let pos = chunk * self.unit;
                if transferred >= logical_size || pos >= size {
                    break 'rounds;
                }
                let want = (self.unit as u64)
                    .min(logical_size - transferred)
                    .min((size - pos) as u64) as usize;
                let n = self
                    .io
                    .read_chunk(backend, path, round_offset, &mut scratch[..want])
                    .map_err(|e| VfsError::backend(backend, e))?;
                trace!(%backend, chunk, offset = round_offset, n, "read chunk");

                if n > 0 {
                    if data.len() < pos + n {
                        data.resize(pos + n, 0);
                    }
                    data[pos..pos + n].copy_from_slice(&scratch[..n]);
                }
                chunk += 1;
                transferred += n as u64;
                round_bytes += n as u64;
            }
            if round_bytes == 0 {
                break;
            }
            round_offset += self.unit as u64;
        }

        Ok(StripedRead { data, logical_size })
    }

    /// Write `data` starting at physical offset `offset`.
    ///
    /// The reported count is always `data.len()`; `transferred` carries what
    /// the chunk loop actually moved.
    pub fn write(&self, pair: &ResolvedPair, offset: u64, data: &[u8]) -> VfsResult<StripedWrite> {
        self.open(pair, write_only_flags())?;
        debug!(
            path = %pair.a.display(),
            offset,
            len = data.len(),
            unit = self.unit,
            "striped write"
        );

        let target = data.len() as u64;
        let mut transferred = 0u64;
        let mut round_offset = offset;
        let mut cursor = 0usize;

        'rounds: while transferred < target {
            let mut round_bytes = 0u64;
            for (backend, path) in pair.iter() {
                if transferred >= target {
                    break 'rounds;
                }
                let end = (cursor + self.unit).min(data.len());
                let slice = data.get(cursor..end).unwrap_or_default();
                let n = self
                    .io
                    .write_chunk(backend, path, round_offset, slice)
                    .map_err(|e| VfsError::backend(backend, e))?;
                trace!(%backend, offset = round_offset, n, "write chunk");

                cursor += self.unit;
                transferred += n as u64;
                round_bytes += n as u64;
            }
            if round_bytes == 0 {
                break;
            }
            round_offset += self.unit as u64;
        }

        Ok(StripedWrite {
            requested: data.len() as u32,
            transferred,
        })
    }
}

fn read_only_flags() -> i32 {
    OFlags::RDONLY.bits() as i32
}

fn write_only_flags() -> i32 {
    OFlags::WRONLY.bits() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::resolve::PathResolver;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// In-memory halves, optionally failing the n-th write on one backend.
    #[derive(Default)]
    struct MemIo {
        files: Mutex<HashMap<PathBuf, Vec<u8>>>,
        fail_write: Option<(Backend, usize)>,
        fail_read: Option<Backend>,
        writes: Mutex<HashMap<Backend, usize>>,
        reads: Mutex<usize>,
    }

    impl MemIo {
        fn contents(&self, path: &Path) -> Vec<u8> {
            self.files.lock().get(path).cloned().unwrap_or_default()
        }

        fn put(&self, path: &Path, bytes: &[u8]) {
            self.files.lock().insert(path.to_path_buf(), bytes.to_vec());
        }
    }

    impl ChunkIo for MemIo {
        fn open_check(&self, _: Backend, path: &Path, _: i32) -> io::Result<()> {
            if self.files.lock().contains_key(path) {
                Ok(())
            } else {
                Err(io::Error::from_raw_os_error(2))
            }
        }

        fn size(&self, _: Backend, path: &Path) -> io::Result<u64> {
            Ok(self.contents(path).len() as u64)
        }

        fn read_chunk(
            &self,
            backend: Backend,
            path: &Path,
            offset: u64,
            buf: &mut [u8],
        ) -> io::Result<usize> {
            *self.reads.lock() += 1;
            if self.fail_read == Some(backend) {
                return Err(io::Error::from_raw_os_error(5));
            }
            let file = self.contents(path);
            let start = (offset as usize).min(file.len());
            let n = buf.len().min(file.len() - start);
            buf[..n].copy_from_slice(&file[start..start + n]);
            Ok(n)
        }

        fn write_chunk(
            &self,
            backend: Backend,
            path: &Path,
            offset: u64,
            data: &[u8],
        ) -> io::Result<usize> {
            let count = {
                let mut writes = self.writes.lock();
                let count = writes.entry(backend).or_insert(0);
                *count += 1;
                *count
            };
            if self.fail_write == Some((backend, count)) {
                return Err(io::Error::from_raw_os_error(28));
            }
            let mut files = self.files.lock();
            let file = files.entry(path.to_path_buf()).or_default();
            let end = offset as usize + data.len();
            if file.len() < end {
                file.resize(end, 0);
            }
            file[offset as usize..end].copy_from_slice(data);
            Ok(data.len())
        }
    }

    fn pair() -> ResolvedPair {
        PathResolver::new("/a", "/b", 4096)
            .resolve(Path::new("/f"))
            .unwrap()
    }

    fn engine(io: MemIo) -> StripingEngine<MemIo> {
        let pair = pair();
        io.put(&pair.a, b"");
        io.put(&pair.b, b"");
        StripingEngine::with_io(5, io)
    }

    #[test]
    fn test_write_interleaves_by_round() {
        let engine = engine(MemIo::default());
        let pair = pair();

        let res = engine.write(&pair, 0, b"helloworld!!").unwrap();
        assert_eq!(res.requested, 12);
        assert_eq!(res.transferred, 12);
        assert_eq!(engine.io().contents(&pair.a), b"hello!!");
        assert_eq!(engine.io().contents(&pair.b), b"world");
    }

    #[test]
    fn test_read_reassembles_from_offset_zero() {
        let engine = engine(MemIo::default());
        let pair = pair();
        engine.write(&pair, 0, b"helloworld!!").unwrap();

        let read = engine.read(&pair, 0, usize::MAX).unwrap();
        assert_eq!(read.logical_size, 12);
        assert_eq!(read.data, b"helloworld!!");
    }

    #[test]
    fn test_long_write_spans_several_rounds() {
        let engine = engine(MemIo::default());
        let pair = pair();
        engine.write(&pair, 0, b"0123456789abcdefghijklmn").unwrap();

        assert_eq!(engine.io().contents(&pair.a), b"01234abcdeklmn");
        assert_eq!(engine.io().contents(&pair.b), b"56789fghij");
        let read = engine.read(&pair, 0, usize::MAX).unwrap();
        assert_eq!(read.data, b"0123456789abcdefghijklmn");
    }

    #[test]
    fn test_logical_size_is_sum_of_halves() {
        let engine = engine(MemIo::default());
        let pair = pair();
        engine.io().put(&pair.a, b"aaaaaaa");
        engine.io().put(&pair.b, b"bbb");

        let read = engine.read(&pair, 0, usize::MAX).unwrap();
        assert_eq!(read.logical_size, 10);
        // B's short chunk leaves a hole before A's next chunk.
        assert_eq!(read.data, b"aaaaabbb\0\0aa");
    }

    #[test]
    fn test_read_past_end_terminates() {
        let engine = engine(MemIo::default());
        let pair = pair();
        engine.io().put(&pair.a, b"abc");
        engine.io().put(&pair.b, b"def");

        let read = engine.read(&pair, 100, usize::MAX).unwrap();
        assert_eq!(read.logical_size, 6);
        assert!(read.data.is_empty());
    }

    #[test]
    fn test_chunk_error_aborts_without_rollback() {
        let io = MemIo {
            fail_write: Some((Backend::B, 2)),
            ..Default::default()
        };
        let engine = engine(io);
        let pair = pair();

        let err = engine.write(&pair, 0, b"0123456789abcdefghij").unwrap_err();
        assert_eq!(err.failed_backend(), Some(Backend::B));
        assert_eq!(err.errno(), 28);
        // Round 0 on both backends and round 1 on A already landed.
        assert_eq!(engine.io().contents(&pair.a), b"01234abcde");
        assert_eq!(engine.io().contents(&pair.b), b"56789");
    }

    #[test]
    fn test_short_read_of_large_file() {
        let engine = engine(MemIo::default());
        let pair = pair();
        engine.io().put(&pair.a, &[b'a'; 5000]);
        engine.io().put(&pair.b, &[b'b'; 5000]);

        let read = engine.read(&pair, 0, 12).unwrap();
        assert_eq!(read.logical_size, 10000);
        assert_eq!(read.data, b"aaaaabbbbbaa");
        // Three chunks cover twelve bytes; nothing past them is read.
        assert_eq!(*engine.io().reads.lock(), 3);
    }

    #[test]
    fn test_read_chunk_error_aborts() {
        let io = MemIo {
            fail_read: Some(Backend::B),
            ..Default::default()
        };
        let engine = engine(io);
        let pair = pair();
        engine.io().put(&pair.a, b"0123456789");
        engine.io().put(&pair.b, b"abcde");

        let err = engine.read(&pair, 0, usize::MAX).unwrap_err();
        assert_eq!(err.failed_backend(), Some(Backend::B));
        assert_eq!(err.errno(), 5);
        // A's first chunk was read, B's failed, nothing after it was tried.
        assert_eq!(*engine.io().reads.lock(), 2);
    }

    #[test]
    fn test_open_requires_both_backends() {
        let io = MemIo::default();
        let pair = pair();
        io.put(&pair.a, b"x");
        let engine = StripingEngine::with_io(5, io);

        let err = engine.write(&pair, 0, b"data").unwrap_err();
        assert_eq!(err.failed_backend(), Some(Backend::B));
        assert_eq!(engine.io().contents(&pair.a), b"x");
    }

    #[test]
    fn test_empty_write_touches_nothing() {
        let engine = engine(MemIo::default());
        let pair = pair();
        let res = engine.write(&pair, 0, b"").unwrap();
        assert_eq!(res, StripedWrite { requested: 0, transferred: 0 });
        assert!(engine.io().writes.lock().is_empty());
    }
}
