//! Binary search tree keyed by network prefix bits.
//!
//! Each node has a left (bit 0) and right (bit 1) slot. A slot is empty, links to another
//! node, or holds a record. Inserting a network walks its prefix bits from the most
//! significant end, creating nodes on the way, and stores the record in the slot reached by
//! the last prefix bit. Everything below that slot is replaced. Walking through a slot that
//! already holds a record splits it: a new node takes the record on both sides so addresses
//! outside the new network keep resolving to the old record.
//!
//! [`SearchTree`] is the mutable arena used while inserting. [`SearchTree::layout`] numbers the
//! reachable nodes breadth-first into a [`TreeLayout`], which is what gets serialized.
//!
//! # Examples
//!
//! ```rust,ignore
//! use mmdbforge::tree::{SearchTree, Slot};
//!
//! let mut tree = SearchTree::new(32);
//! tree.insert(0x0102_0304, 32, 0)?;
//! assert_eq!(tree.lookup(0x0102_0304), Some(0));
//! assert_eq!(tree.lookup(0x0102_0305), None);
//! # Ok::<(), mmdbforge::Error>(())
//! ```

pub mod record;

use std::collections::{HashSet, VecDeque};

use crate::{
    format::DATA_SECTION_SEPARATOR_SIZE,
    tree::record::RecordSize,
    Error, Result,
};

/// Content of one side of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// No data for this subtree
    Empty,
    /// Link to another node (arena index in [`SearchTree`], final index in [`TreeLayout`])
    Node(usize),
    /// Record id handed to [`SearchTree::insert`]
    Record(u32),
}

/// Mutable prefix tree used while inserting networks.
#[derive(Debug, Clone)]
pub struct SearchTree {
    nodes: Vec<[Slot; 2]>,
    depth: u8,
}

impl SearchTree {
    /// Create a tree over `depth`-bit keys (32 for IPv4, 128 for IPv6).
    ///
    /// The root always exists, so even an empty tree serializes to one node.
    #[must_use]
    pub fn new(depth: u8) -> Self {
        SearchTree {
            nodes: vec![[Slot::Empty, Slot::Empty]],
            depth,
        }
    }

    /// Key width in bits.
    #[must_use]
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Store `record` for every key starting with the top `prefix_len` bits of `key`.
    ///
    /// `key` is right-aligned: bit `depth - 1` is the first one walked.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNetwork`] if `prefix_len` exceeds the tree depth.
    pub fn insert(&mut self, key: u128, prefix_len: u8, record: u32) -> Result<()> {
        if prefix_len > self.depth {
            return Err(Error::InvalidNetwork(format!(
                "prefix length {prefix_len} exceeds {} bits",
                self.depth
            )));
        }

        if prefix_len == 0 {
            self.nodes[0] = [Slot::Record(record), Slot::Record(record)];
            return Ok(());
        }

        let mut node = 0_usize;
        for position in 0..prefix_len {
            let bit = self.bit(key, position);

            if position + 1 == prefix_len {
                self.nodes[node][bit] = Slot::Record(record);
                break;
            }

            node = match self.nodes[node][bit] {
                Slot::Node(next) => next,
                Slot::Empty => self.push_child(node, bit, [Slot::Empty, Slot::Empty]),
                Slot::Record(existing) => self.push_child(
                    node,
                    bit,
                    [Slot::Record(existing), Slot::Record(existing)],
                ),
            };
        }

        Ok(())
    }

    /// Find the record covering `key`.
    #[must_use]
    pub fn lookup(&self, key: u128) -> Option<u32> {
        let mut node = 0_usize;
        for position in 0..self.depth {
            match self.nodes[node][self.bit(key, position)] {
                Slot::Node(next) => node = next,
                Slot::Record(record) => return Some(record),
                Slot::Empty => return None,
            }
        }
        None
    }

    /// Number the nodes reachable from the root breadth-first.
    ///
    /// Nodes orphaned by later inserts are dropped.
    #[must_use]
    pub fn layout(&self) -> TreeLayout {
        let mut index = vec![None; self.nodes.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::from([0_usize]);
        index[0] = Some(0);

        while let Some(arena) = queue.pop_front() {
            order.push(arena);
            for slot in self.nodes[arena] {
                if let Slot::Node(child) = slot {
                    if index[child].is_none() {
                        index[child] = Some(order.len() + queue.len());
                        queue.push_back(child);
                    }
                }
            }
        }

        let nodes = order
            .iter()
            .map(|&arena| {
                self.nodes[arena].map(|slot| match slot {
                    Slot::Node(child) => Slot::Node(index[child].unwrap_or_default()),
                    other => other,
                })
            })
            .collect();

        TreeLayout { nodes }
    }

    fn bit(&self, key: u128, position: u8) -> usize {
        ((key >> (self.depth - 1 - position)) & 1) as usize
    }

    fn push_child(&mut self, parent: usize, bit: usize, slots: [Slot; 2]) -> usize {
        let child = self.nodes.len();
        self.nodes.push(slots);
        self.nodes[parent][bit] = Slot::Node(child);
        child
    }
}

/// Final node numbering of a [`SearchTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLayout {
    nodes: Vec<[Slot; 2]>,
}

impl TreeLayout {
    /// Number of nodes that will be written.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes in serialization order.
    #[must_use]
    pub fn nodes(&self) -> &[[Slot; 2]] {
        &self.nodes
    }

    /// Record ids in the order they are first referenced.
    #[must_use]
    pub fn records(&self) -> Vec<u32> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for slot in self.nodes.iter().flatten() {
            if let Slot::Record(record) = slot {
                if seen.insert(*record) {
                    records.push(*record);
                }
            }
        }
        records
    }

    /// Serialize the tree.
    ///
    /// `data_offset` maps a record id to its offset within the data section.
    ///
    /// # Errors
    /// Returns [`crate::Error::DatabaseTooLarge`] if a node index or data pointer does not fit
    /// in `record_size` bits.
    pub fn to_bytes<F>(&self, record_size: RecordSize, mut data_offset: F) -> Result<Vec<u8>>
    where
        F: FnMut(u32) -> Result<u32>,
    {
        let node_count = u32::try_from(self.nodes.len()).map_err(|_| {
            Error::DatabaseTooLarge(format!("{} nodes exceed 32-bit indices", self.nodes.len()))
        })?;

        let mut resolve = |slot: Slot| -> Result<u32> {
            match slot {
                Slot::Empty => Ok(node_count),
                Slot::Node(index) => Ok(index as u32),
                Slot::Record(record) => {
                    let offset = u64::from(data_offset(record)?);
                    let value =
                        u64::from(node_count) + DATA_SECTION_SEPARATOR_SIZE as u64 + offset;
                    u32::try_from(value).map_err(|_| {
                        Error::DatabaseTooLarge(format!(
                            "data pointer {value} exceeds 32-bit records"
                        ))
                    })
                }
            }
        };

        let mut out = vec![0_u8; self.nodes.len() * record_size.node_bytes()];
        let mut offset = 0_usize;
        for [left, right] in &self.nodes {
            let left = resolve(*left)?;
            let right = resolve(*right)?;
            record_size.write_node(&mut out, &mut offset, left, right)?;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP_1_2_3_4: u128 = 0x0102_0304;
    const IP_1_2_3_5: u128 = 0x0102_0305;

    #[test]
    fn empty_tree() {
        let tree = SearchTree::new(32);
        assert_eq!(tree.lookup(IP_1_2_3_4), None);

        let layout = tree.layout();
        assert_eq!(layout.node_count(), 1);
        assert!(layout.records().is_empty());

        let bytes = layout.to_bytes(RecordSize::Bits24, |_| Ok(0)).unwrap();
        // Both records point at node_count, i.e. "empty".
        assert_eq!(bytes, [0, 0, 1, 0, 0, 1]);
    }

    #[test]
    fn host_routes() {
        let mut tree = SearchTree::new(32);
        tree.insert(IP_1_2_3_4, 32, 0).unwrap();
        tree.insert(IP_1_2_3_5, 32, 1).unwrap();

        assert_eq!(tree.lookup(IP_1_2_3_4), Some(0));
        assert_eq!(tree.lookup(IP_1_2_3_5), Some(1));
        assert_eq!(tree.lookup(0x0102_0306), None);
        assert_eq!(tree.lookup(0x0102_0300), None);
        assert_eq!(tree.lookup(0), None);

        // One node per level; the last one holds both records.
        let layout = tree.layout();
        assert_eq!(layout.node_count(), 32);
        assert_eq!(layout.records(), vec![0, 1]);
    }

    #[test]
    fn split_keeps_outer_record() {
        let mut tree = SearchTree::new(32);
        tree.insert(0x0A00_0000, 8, 7).unwrap();
        tree.insert(0x0A01_0000, 16, 9).unwrap();

        assert_eq!(tree.lookup(0x0A01_0203), Some(9));
        assert_eq!(tree.lookup(0x0A02_0000), Some(7));
        assert_eq!(tree.lookup(0x0AFF_FFFF), Some(7));
        assert_eq!(tree.lookup(0x0B00_0000), None);
    }

    #[test]
    fn covering_insert_replaces_subtree() {
        let mut tree = SearchTree::new(32);
        tree.insert(IP_1_2_3_4, 32, 0).unwrap();
        tree.insert(0x0102_0300, 24, 5).unwrap();

        assert_eq!(tree.lookup(IP_1_2_3_4), Some(5));
        assert_eq!(tree.layout().records(), vec![5]);
        assert_eq!(tree.layout().node_count(), 24);
    }

    #[test]
    fn default_route() {
        let mut tree = SearchTree::new(32);
        tree.insert(0, 0, 3).unwrap();
        assert_eq!(tree.lookup(0xFFFF_FFFF), Some(3));
        assert_eq!(tree.layout().node_count(), 1);
    }

    #[test]
    fn rejects_long_prefix() {
        let mut tree = SearchTree::new(32);
        assert!(matches!(
            tree.insert(IP_1_2_3_4, 33, 0),
            Err(Error::InvalidNetwork(_))
        ));
    }

    #[test]
    fn ipv6_depth() {
        let mut tree = SearchTree::new(128);
        tree.insert(IP_1_2_3_4, 128, 0).unwrap();
        tree.insert(0x2001_0db8_u128 << 96, 32, 1).unwrap();

        assert_eq!(tree.lookup(IP_1_2_3_4), Some(0));
        assert_eq!(tree.lookup((0x2001_0db8_u128 << 96) | 1), Some(1));
        // The paths share the nodes at levels 0, 1 and 2.
        assert_eq!(tree.layout().node_count(), 128 + 29);
    }

    #[test]
    fn breadth_first_numbering() {
        let mut tree = SearchTree::new(2);
        tree.insert(0b10, 2, 1).unwrap();
        tree.insert(0b01, 2, 0).unwrap();

        let layout = tree.layout();
        assert_eq!(
            layout.nodes(),
            &[
                [Slot::Node(1), Slot::Node(2)],
                [Slot::Empty, Slot::Record(0)],
                [Slot::Record(1), Slot::Empty],
            ]
        );

        let bytes = layout
            .to_bytes(RecordSize::Bits24, |record| Ok(record * 10))
            .unwrap();
        assert_eq!(
            bytes,
            [
                0, 0, 1, 0, 0, 2, // root
                0, 0, 3, 0, 0, 19, // empty, 3 + 16 + 0
                0, 0, 29, 0, 0, 3, // 3 + 16 + 10, empty
            ]
        );
    }

    #[test]
    fn oversized_data_pointer() {
        let mut tree = SearchTree::new(32);
        tree.insert(IP_1_2_3_4, 32, 0).unwrap();
        let layout = tree.layout();
        assert!(matches!(
            layout.to_bytes(RecordSize::Bits24, |_| Ok(1 << 24)),
            Err(Error::DatabaseTooLarge(_))
        ));
        assert!(layout
            .to_bytes(RecordSize::Bits32, |_| Ok(1 << 24))
            .is_ok());
    }
}
