//! Error types for hierarchy construction.

use thiserror::Error;

/// Errors reported when assembling or validating a hierarchy.
///
/// Traversal itself never fails; these are raised once, when a node and
/// primitive array are handed over by a builder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BvhError {
    /// An interior child reference points past the end of the node array.
    #[error("node {node} slot {slot} references node {index}, but only {len} nodes exist")]
    ChildOutOfRange {
        /// Parent node index.
        node: usize,
        /// Child slot within the parent.
        slot: usize,
        /// Referenced node index.
        index: usize,
        /// Length of the node array.
        len: usize,
    },

    /// A leaf reference addresses primitives past the end of the primitive array.
    #[error("node {node} slot {slot} references primitives {offset}..{end}, but only {len} exist")]
    LeafOutOfRange {
        /// Parent node index.
        node: usize,
        /// Child slot within the parent.
        slot: usize,
        /// First primitive group.
        offset: usize,
        /// One past the last primitive group.
        end: usize,
        /// Length of the primitive array.
        len: usize,
    },

    /// The tree is deeper than the depth it declared.
    #[error("hierarchy reaches depth {depth}, deeper than its declared max depth {max_depth}")]
    DepthExceeded {
        /// Depth that was reached.
        depth: usize,
        /// Declared maximum depth.
        max_depth: usize,
    },

    /// The declared depth does not fit the fixed-size traversal stack.
    #[error("declared max depth {max_depth} exceeds the traversal limit of {limit}")]
    DepthLimit {
        /// Declared maximum depth.
        max_depth: usize,
        /// Depth supported by the traversal stacks.
        limit: usize,
    },

    /// Leaf offset does not fit in the 26 offset bits of a child reference.
    #[error("leaf offset {0} does not fit in a child reference")]
    OffsetOverflow(u32),

    /// Leaf count does not fit in the 5 count bits of a child reference.
    #[error("leaf count {0} exceeds the 31 primitive groups a leaf can address")]
    CountOverflow(u32),

    /// Node index collides with the leaf flag.
    #[error("node index {0} does not fit in a child reference")]
    IndexOverflow(u32),

    /// A leaf holds triangles outside the bounds its parent stores for it.
    #[error("primitives under node {node} slot {slot} extend outside the stored child bounds")]
    PrimitiveOutsideBounds {
        /// Parent node index.
        node: usize,
        /// Child slot within the parent.
        slot: usize,
    },
}

/// Result type for hierarchy operations.
pub type Result<T> = std::result::Result<T, BvhError>;
