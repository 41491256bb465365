use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Reads the last lines of a file by scanning backward from the end in
/// fixed-size blocks, so the cost depends on the bytes needed rather than on
/// the file size.
#[derive(Debug, Clone, Copy)]
pub struct TailReader {
    block_size: usize,
}

impl TailReader {
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
        }
    }

    /// Return the last `n` lines of the file at `path`.
    ///
    /// Invalid UTF-8 is replaced rather than rejected. Returns fewer than `n`
    /// lines when the file is shorter.
    pub fn tail(&self, path: &Path, n: usize) -> std::io::Result<Vec<String>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let file = File::open(path)?;
        self.tail_from(file, n)
    }

    /// Same as [`TailReader::tail`] over any seekable source.
    pub fn tail_from<R: Read + Seek>(&self, mut file: R, n: usize) -> std::io::Result<Vec<String>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut pos = file.seek(SeekFrom::End(0))?;

        // Blocks are collected newest-first and stitched together once.
        let mut blocks: Vec<Vec<u8>> = Vec::new();
        let mut newlines = 0usize;

        while pos > 0 && newlines <= n {
            let read_size = (self.block_size as u64).min(pos);
            pos -= read_size;
            file.seek(SeekFrom::Start(pos))?;

            let mut block = vec![0u8; read_size as usize];
            file.read_exact(&mut block)?;
            newlines += block.iter().filter(|&&b| b == b'\n').count();
            blocks.push(block);
        }

        let data: Vec<u8> = blocks.into_iter().rev().flatten().collect();
        let text = String::from_utf8_lossy(&data);

        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].iter().map(|line| line.to_string()).collect())
    }
}

impl Default for TailReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Last `n` lines of `path` using the default block size.
pub fn tail_lines(path: &Path, n: usize) -> std::io::Result<Vec<String>> {
    TailReader::new().tail(path, n)
}
