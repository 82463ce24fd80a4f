//! Binary persistence of a built tree.
//!
//! The layout is a header (magic, version, item count, branching factor)
//! followed by a flat array of node records in children-before-parents
//! order with integer child indices, which is exactly the arena order the
//! builder produces. Decoding therefore rebuilds the tree in a single
//! forward pass with no pointer fix-up: every child index a record names
//! must already have been read.
//!
//! The file is written once and then trusted by every query, so anything
//! structurally off (wrong magic, an unsupported version, a dangling or
//! duplicated child index, a count mismatch, a loose envelope) fails with
//! [`SpatialError::IndexCorrupt`] instead of producing a quietly wrong
//! tree. A missing or unreadable file calls for a different remediation
//! and fails with [`SpatialError::IndexNotFound`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::{SpatialError, SpatialResult};

use super::types::{IndexEntry, NodeId, StrTree, TreeNode};

/// Magic number identifying an index file ("GMLX").
pub const MAGIC: u32 = 0x474D_4C58;

/// Current file format version.
pub const VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct IndexHeader {
    magic: u32,
    version: u32,
    item_count: u64,
    branching_factor: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    is_leaf: bool,
    envelope: Envelope,
    children: Vec<u32>,
    entries: Vec<IndexEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    header: IndexHeader,
    records: Vec<NodeRecord>,
}

/// Serializes a tree into its persisted byte layout.
pub fn encode(tree: &StrTree) -> SpatialResult<Vec<u8>> {
    let records = tree
        .nodes()
        .iter()
        .map(|node| match node {
            TreeNode::Leaf { envelope, entries } => NodeRecord {
                is_leaf: true,
                envelope: *envelope,
                children: Vec::new(),
                entries: entries.clone(),
            },
            TreeNode::Internal { envelope, children } => NodeRecord {
                is_leaf: false,
                envelope: *envelope,
                children: children.clone(),
                entries: Vec::new(),
            },
        })
        .collect();

    let file = IndexFile {
        header: IndexHeader {
            magic: MAGIC,
            version: VERSION,
            item_count: tree.item_count() as u64,
            branching_factor: tree.branching_factor() as u32,
        },
        records,
    };

    bincode::serde::encode_to_vec(&file, bincode::config::legacy())
        .map_err(|e| SpatialError::Serialization(e.to_string()))
}

/// Deserializes and structurally validates a persisted tree.
pub fn decode(bytes: &[u8]) -> SpatialResult<StrTree> {
    let (file, _): (IndexFile, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::legacy())
            .map_err(|e| SpatialError::IndexCorrupt(format!("undecodable index bytes: {}", e)))?;

    let header = &file.header;
    if header.magic != MAGIC {
        return Err(SpatialError::IndexCorrupt(format!(
            "bad magic {:#010x}",
            header.magic
        )));
    }
    if header.version != VERSION {
        return Err(SpatialError::IndexCorrupt(format!(
            "unsupported format version {}",
            header.version
        )));
    }
    if header.branching_factor < 2 {
        return Err(SpatialError::IndexCorrupt(format!(
            "branching factor {} is below 2",
            header.branching_factor
        )));
    }
    if file.records.is_empty() {
        return Err(SpatialError::IndexCorrupt("no node records".to_string()));
    }

    let record_count = file.records.len();
    let branching_factor = header.branching_factor as usize;
    let mut nodes: Vec<TreeNode> = Vec::with_capacity(record_count);
    let mut referenced = vec![false; record_count];
    let mut item_count: u64 = 0;

    for (index, record) in file.records.into_iter().enumerate() {
        if !record.envelope.is_valid() {
            return Err(SpatialError::IndexCorrupt(format!(
                "record {} has an invalid envelope",
                index
            )));
        }
        if record.is_leaf {
            if !record.children.is_empty() {
                return Err(SpatialError::IndexCorrupt(format!(
                    "leaf record {} carries child indices",
                    index
                )));
            }
            if record.entries.is_empty() {
                return Err(SpatialError::IndexCorrupt(format!(
                    "leaf record {} holds no entries",
                    index
                )));
            }
            if record.entries.len() > branching_factor {
                return Err(SpatialError::IndexCorrupt(format!(
                    "leaf record {} exceeds the branching factor",
                    index
                )));
            }
            let mut union = Envelope::empty();
            for entry in &record.entries {
                if !entry.envelope.is_valid() {
                    return Err(SpatialError::IndexCorrupt(format!(
                        "record {} holds an entry with an invalid envelope",
                        index
                    )));
                }
                union.expand(&entry.envelope);
            }
            if union != record.envelope {
                return Err(SpatialError::IndexCorrupt(format!(
                    "leaf record {} envelope is not the union of its entries",
                    index
                )));
            }
            item_count += record.entries.len() as u64;
            nodes.push(TreeNode::Leaf {
                envelope: record.envelope,
                entries: record.entries,
            });
        } else {
            if !record.entries.is_empty() {
                return Err(SpatialError::IndexCorrupt(format!(
                    "internal record {} carries entries",
                    index
                )));
            }
            if record.children.is_empty() {
                return Err(SpatialError::IndexCorrupt(format!(
                    "internal record {} has no children",
                    index
                )));
            }
            if record.children.len() > branching_factor {
                return Err(SpatialError::IndexCorrupt(format!(
                    "internal record {} exceeds the branching factor",
                    index
                )));
            }
            let mut union = Envelope::empty();
            for &child in &record.children {
                let child_index = child as usize;
                // Children must precede parents in the record array.
                if child_index >= index {
                    return Err(SpatialError::IndexCorrupt(format!(
                        "record {} names child {} at or after itself",
                        index, child
                    )));
                }
                if referenced[child_index] {
                    return Err(SpatialError::IndexCorrupt(format!(
                        "record {} is referenced by more than one parent",
                        child
                    )));
                }
                referenced[child_index] = true;
                union.expand(nodes[child_index].envelope());
            }
            if union != record.envelope {
                return Err(SpatialError::IndexCorrupt(format!(
                    "internal record {} envelope is not the union of its children",
                    index
                )));
            }
            nodes.push(TreeNode::Internal {
                envelope: record.envelope,
                children: record.children,
            });
        }
    }

    // Everything except the final record (the root) must hang off a parent.
    if let Some(orphan) = referenced[..record_count - 1].iter().position(|&r| !r) {
        return Err(SpatialError::IndexCorrupt(format!(
            "record {} is unreachable from the root",
            orphan
        )));
    }
    if item_count != header.item_count {
        return Err(SpatialError::IndexCorrupt(format!(
            "header says {} items but leaves hold {}",
            header.item_count, item_count
        )));
    }

    let root = (record_count - 1) as NodeId;
    Ok(StrTree::from_parts(
        nodes,
        root,
        item_count as usize,
        branching_factor,
    ))
}

/// Writes a tree to its index file.
pub fn write_to_file(tree: &StrTree, path: &Path) -> SpatialResult<()> {
    let bytes = encode(tree)?;
    fs::write(path, &bytes)?;
    log::debug!(
        "wrote spatial index to {:?} ({} nodes, {} bytes)",
        path,
        tree.node_count(),
        bytes.len()
    );
    Ok(())
}

/// Reads and decodes the index file of a database.
///
/// A missing or unreadable file fails with [`SpatialError::IndexNotFound`];
/// readable but structurally invalid content fails with
/// [`SpatialError::IndexCorrupt`].
pub fn read_from_file(path: &Path, database: &str) -> SpatialResult<StrTree> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::debug!("cannot read spatial index {:?}: {}", path, err);
            return Err(SpatialError::IndexNotFound(database.to_string()));
        }
    };
    decode(&bytes)
}
