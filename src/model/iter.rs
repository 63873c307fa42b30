use std::fmt;
use std::str::FromStr;

use super::sequence::{CollectionId, SeqHandle};

/// Position of a row inside the model's collections: the collection that
/// holds it and the node within that collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Ptr {
    pub collection: CollectionId,
    pub node: SeqHandle,
}

/// Opaque cursor into the model.
///
/// Valid until the row it points at is removed or the model's stamp changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeIter {
    pub(crate) stamp: u32,
    pub(crate) ptr: Ptr,
}

impl TreeIter {
    /// Stamp of the model at the time this iterator was issued.
    pub fn stamp(&self) -> u32 {
        self.stamp
    }
}

/// Row address as a list of child indices from the top level down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TreePath {
    indices: Vec<usize>,
}

impl TreePath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn depth(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn append_index(&mut self, index: usize) {
        self.indices.push(index);
    }

    pub fn prepend_index(&mut self, index: usize) {
        self.indices.insert(0, index);
    }

    /// Drop the last index. Returns `false` if the path was already empty.
    pub fn up(&mut self) -> bool {
        self.indices.pop().is_some()
    }

    /// Path of the `index`-th child of this row.
    pub fn child(&self, index: usize) -> TreePath {
        let mut path = self.clone();
        path.append_index(index);
        path
    }
}

impl From<Vec<usize>> for TreePath {
    fn from(indices: Vec<usize>) -> Self {
        Self::from_indices(indices)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.indices.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{}", index)?;
        }
        Ok(())
    }
}

impl FromStr for TreePath {
    type Err = std::num::ParseIntError;

    /// Parse the `"2:0:1"` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::new());
        }
        let indices = s
            .split(':')
            .map(|part| part.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { indices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_with_colons() {
        assert_eq!(TreePath::from(vec![2, 0, 5]).to_string(), "2:0:5");
        assert_eq!(TreePath::new().to_string(), "");
    }

    #[test]
    fn parse_round_trips_display() {
        let path: TreePath = "3:1".parse().unwrap();
        assert_eq!(path.indices(), &[3, 1]);
        assert!("1:x".parse::<TreePath>().is_err());
        assert!("".parse::<TreePath>().unwrap().is_empty());
    }

    #[test]
    fn up_and_child() {
        let mut path = TreePath::from(vec![1]);
        let child = path.child(4);
        assert_eq!(child.indices(), &[1, 4]);
        assert!(path.up());
        assert!(!path.up());
        path.prepend_index(7);
        assert_eq!(path.depth(), 1);
    }
}
