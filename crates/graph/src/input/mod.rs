//! Readers and writers for graph, partition and layout files.
//!
//! The primary on-disk representation is the adjacency text format used by
//! common graph partitioners ([`metis`]); [`rmf`] and [`colonsep`] are
//! conversion-only loaders for two edge-list formats.

pub mod colonsep;
pub mod metis;
pub mod rmf;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::{CsrGraph, Error, NodeId, PartitionId};

/// Iterates the lines of a memory-mapped text file, tracking line numbers
/// for error reporting.
pub(crate) struct LineScanner<'a> {
    rest: &'a [u8],
    line: usize,
}

impl<'a> LineScanner<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes, line: 0 }
    }

    /// The 1-based number of the most recently returned line.
    pub(crate) fn line(&self) -> usize {
        self.line
    }

    pub(crate) fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.rest.is_empty() {
            return None;
        }
        let (mut line, rest) = match self.rest.iter().position(|&b| b == b'\n') {
            Some(end) => (&self.rest[..end], &self.rest[end + 1..]),
            None => (self.rest, &self.rest[self.rest.len()..]),
        };
        if let [init @ .., b'\r'] = line {
            line = init;
        }
        self.rest = rest;
        self.line += 1;
        Some(line)
    }

    /// Returns the next line that is neither empty nor a `%` comment.
    pub(crate) fn next_content_line(&mut self) -> Option<&'a [u8]> {
        loop {
            let line = self.next_line()?;
            if !line.is_empty() && line[0] != b'%' {
                return Some(line);
            }
        }
    }

    /// Returns the next line that is not a `%` comment. Empty lines are
    /// returned; in adjacency files they denote nodes without neighbors.
    pub(crate) fn next_data_line(&mut self) -> Option<&'a [u8]> {
        loop {
            let line = self.next_line()?;
            if line.first() != Some(&b'%') {
                return Some(line);
            }
        }
    }
}

pub(crate) fn tokens(line: &[u8]) -> impl Iterator<Item = &[u8]> + '_ {
    line.split(|&b| b == b' ' || b == b'\t')
        .filter(|token| !token.is_empty())
}

pub(crate) fn parse_number(token: &[u8], line: usize) -> Result<usize, Error> {
    atoi::atoi(token).ok_or_else(|| Error::MalformedGraph {
        line,
        message: format!("invalid number '{}'", String::from_utf8_lossy(token)),
    })
}

pub(crate) fn map_file(path: &Path) -> Result<memmap2::Mmap, Error> {
    let file = File::open(path)?;
    let mmap = unsafe { memmap2::MmapOptions::new().populate().map(&file)? };
    Ok(mmap)
}

/// Reads a partition file: the `i`-th line holds the block of node `i`.
pub fn read_partition<P: AsRef<Path>>(
    path: P,
    node_count: usize,
) -> Result<Vec<PartitionId>, Error> {
    let mmap = map_file(path.as_ref())?;
    let mut scanner = LineScanner::new(&mmap);

    let mut partition = Vec::with_capacity(node_count);
    while let Some(line) = scanner.next_content_line() {
        let block = atoi::atoi::<usize>(line).ok_or_else(|| Error::MalformedPartition {
            line: scanner.line(),
            message: format!("invalid block '{}'", String::from_utf8_lossy(line)),
        })?;
        if block >= 2 {
            return Err(Error::MalformedPartition {
                line: scanner.line(),
                message: format!("block {block} is out of range for a bisection"),
            });
        }
        partition.push(block);
    }

    if partition.len() != node_count {
        return Err(Error::MalformedPartition {
            line: scanner.line(),
            message: format!(
                "expected {} entries, found {}",
                node_count,
                partition.len()
            ),
        });
    }

    Ok(partition)
}

/// Writes the current partition of `graph`, one block index per line.
pub fn write_partition<P: AsRef<Path>>(graph: &CsrGraph, path: P) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    for node in 0..graph.node_count() {
        writeln!(writer, "{}", graph.partition_index(node))?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a linear layout file: the `i`-th line holds the position of node
/// `i`. The layout must be a permutation of `0..node_count`.
pub fn read_layout<P: AsRef<Path>>(path: P, node_count: usize) -> Result<Vec<NodeId>, Error> {
    let mmap = map_file(path.as_ref())?;
    let mut scanner = LineScanner::new(&mmap);

    let mut layout = Vec::with_capacity(node_count);
    let mut seen = vec![false; node_count];
    while let Some(line) = scanner.next_content_line() {
        let position = atoi::atoi::<usize>(line).ok_or_else(|| Error::MalformedLayout {
            line: scanner.line(),
            message: format!("invalid position '{}'", String::from_utf8_lossy(line)),
        })?;
        if position >= node_count || seen[position] {
            return Err(Error::MalformedLayout {
                line: scanner.line(),
                message: format!("position {position} is out of range or repeated"),
            });
        }
        seen[position] = true;
        layout.push(position);
    }

    if layout.len() != node_count {
        return Err(Error::MalformedLayout {
            line: scanner.line(),
            message: format!("expected {} entries, found {}", node_count, layout.len()),
        });
    }

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn line_scanner_strips_carriage_returns_and_counts_lines() {
        let mut scanner = LineScanner::new(b"a\r\n%skip\n\nb");
        assert_eq!(scanner.next_content_line(), Some(&b"a"[..]));
        assert_eq!(scanner.line(), 1);
        assert_eq!(scanner.next_content_line(), Some(&b"b"[..]));
        assert_eq!(scanner.line(), 4);
        assert_eq!(scanner.next_content_line(), None);
    }

    #[test]
    fn partition_roundtrip() {
        let mut graph = crate::gen::cycle(4);
        graph.set_partition_index(1, 1);
        graph.set_partition_index(2, 1);

        let file = tempfile::NamedTempFile::new().unwrap();
        write_partition(&graph, file.path()).unwrap();
        let partition = read_partition(file.path(), 4).unwrap();

        assert_eq!(partition, vec![0, 1, 1, 0]);
    }

    #[test]
    fn partition_entry_count_must_match() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0\n1\n0").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            read_partition(file.path(), 4),
            Err(Error::MalformedPartition { .. })
        ));
    }

    #[test]
    fn layout_must_be_a_permutation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0\n2\n2").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            read_layout(file.path(), 3),
            Err(Error::MalformedLayout { .. })
        ));
    }

    #[test]
    fn layout_reads_back_in_node_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "2\n0\n1").unwrap();
        file.flush().unwrap();

        assert_eq!(read_layout(file.path(), 3).unwrap(), vec![2, 0, 1]);
    }
}
