use std::mem::size_of;

/// Default minimum degree (T) of the tree.
/// Non-root nodes hold between T-1 and 2T-1 keys.
pub const DEFAULT_MIN_DEGREE: usize = 10;

/// Every integer in a record (ids, counts, keys) is a big-endian i32.
pub const INT_SIZE: usize = size_of::<i32>();

/// Record header layout (nine bytes in total).
pub const LEAF_FLAG_OFFSET: usize = 0;
pub const LEAF_FLAG_SIZE: usize = 1;
pub const NODE_ID_OFFSET: usize = LEAF_FLAG_OFFSET + LEAF_FLAG_SIZE;
pub const NODE_ID_SIZE: usize = INT_SIZE;
pub const KEY_COUNT_OFFSET: usize = NODE_ID_OFFSET + NODE_ID_SIZE;
pub const KEY_COUNT_SIZE: usize = INT_SIZE;
pub const RECORD_HEADER_SIZE: usize = LEAF_FLAG_SIZE + NODE_ID_SIZE + KEY_COUNT_SIZE;

/// Keys follow the header. Internal records then carry a child count and the child ids.
pub const KEYS_OFFSET: usize = RECORD_HEADER_SIZE;
pub const CHILD_COUNT_SIZE: usize = INT_SIZE;

/// Size in bytes of the record for a node with the given key and child counts.
pub fn record_size(num_keys: usize, num_children: Option<usize>) -> usize {
    let children = match num_children {
        Some(n) => CHILD_COUNT_SIZE + n * INT_SIZE,
        None => 0,
    };
    RECORD_HEADER_SIZE + num_keys * INT_SIZE + children
}
