use crate::error::{Error, Result};
use crate::node::Node;
use crate::node_type::{Key, NodeId, NodeType};
use crate::page_layout::{
    record_size, INT_SIZE, KEYS_OFFSET, KEY_COUNT_OFFSET, LEAF_FLAG_OFFSET, NODE_ID_OFFSET,
};
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::convert::TryFrom;
use std::io::Cursor;

/// Page is a wrapper for the raw record of a single node,
/// tagged with the id it is stored under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    id: NodeId,
    data: Vec<u8>,
}

impl Page {
    pub fn new(id: NodeId, data: Vec<u8>) -> Page {
        Page { id, data }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn get_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

// Serializes a node into its record: leaf flag, id, key count, keys and,
// for internal nodes only, child count and child ids.
impl From<&Node> for Page {
    fn from(node: &Node) -> Page {
        let children = node.children();
        let mut data = vec![0u8; record_size(node.keys().len(), children.map(<[_]>::len))];

        data[LEAF_FLAG_OFFSET] = node.node_type().into();
        BigEndian::write_i32(&mut data[NODE_ID_OFFSET..], node.id().0);
        BigEndian::write_i32(&mut data[KEY_COUNT_OFFSET..], node.keys().len() as i32);

        let mut offset = KEYS_OFFSET;
        for key in node.keys() {
            BigEndian::write_i32(&mut data[offset..offset + INT_SIZE], *key);
            offset += INT_SIZE;
        }

        if let Some(children) = children {
            BigEndian::write_i32(&mut data[offset..offset + INT_SIZE], children.len() as i32);
            offset += INT_SIZE;
            for child in children {
                BigEndian::write_i32(&mut data[offset..offset + INT_SIZE], child.0);
                offset += INT_SIZE;
            }
        }

        Page::new(node.id(), data)
    }
}

impl TryFrom<&Page> for Node {
    type Error = Error;

    fn try_from(page: &Page) -> Result<Node> {
        let mut reader = RecordReader {
            id: page.id,
            cursor: Cursor::new(page.get_bytes()),
        };

        let flag = reader.read_u8("leaf flag")?;
        let node_type = NodeType::try_from(flag)
            .map_err(|b| Error::corrupt(page.id, format!("unknown leaf flag {:#04x}", b)))?;

        let id = NodeId(reader.read_i32("node id")?);
        if id != page.id {
            return Err(Error::corrupt(
                page.id,
                format!("record holds node {}", id),
            ));
        }

        let num_keys = reader.read_count("key count")?;
        let mut keys: Vec<Key> = Vec::with_capacity(num_keys);
        for _ in 0..num_keys {
            keys.push(reader.read_i32("keys")?);
        }

        let children = match node_type {
            NodeType::Leaf => None,
            NodeType::Internal => {
                let num_children = reader.read_count("child count")?;
                let mut children = Vec::with_capacity(num_children);
                for _ in 0..num_children {
                    children.push(NodeId(reader.read_i32("children")?));
                }
                Some(children)
            }
        };

        if reader.remaining() != 0 {
            return Err(Error::corrupt(
                page.id,
                format!("{} trailing bytes after the record", reader.remaining()),
            ));
        }

        Ok(Node::from_parts(id, keys, children))
    }
}

struct RecordReader<'a> {
    id: NodeId,
    cursor: Cursor<&'a [u8]>,
}

impl<'a> RecordReader<'a> {
    fn remaining(&self) -> usize {
        self.cursor.get_ref().len() - self.cursor.position() as usize
    }

    fn read_u8(&mut self, field: &str) -> Result<u8> {
        let id = self.id;
        self.cursor
            .read_u8()
            .map_err(|_| Error::corrupt(id, format!("truncated {}", field)))
    }

    fn read_i32(&mut self, field: &str) -> Result<i32> {
        let id = self.id;
        self.cursor
            .read_i32::<BigEndian>()
            .map_err(|_| Error::corrupt(id, format!("truncated {}", field)))
    }

    // Reads a count and checks that the entries it announces fit in what is left.
    fn read_count(&mut self, field: &str) -> Result<usize> {
        let count = self.read_i32(field)?;
        if count < 0 {
            return Err(Error::corrupt(self.id, format!("negative {}: {}", field, count)));
        }
        let count = count as usize;
        if count * INT_SIZE > self.remaining() {
            return Err(Error::corrupt(
                self.id,
                format!("{} of {} exceeds the record length", field, count),
            ));
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::{btree_set, vec};
    use proptest::prelude::*;

    fn decode(id: i32, data: Vec<u8>) -> Result<Node> {
        Node::try_from(&Page::new(NodeId(id), data))
    }

    #[test]
    fn leaf_record_layout() {
        let node = Node::from_parts(NodeId(7), vec![-1, 300], None);
        let page = Page::from(&node);
        assert_eq!(
            page.get_bytes(),
            &[1, 0, 0, 0, 7, 0, 0, 0, 2, 0xff, 0xff, 0xff, 0xff, 0, 0, 1, 0x2c][..]
        );
    }

    #[test]
    fn internal_record_layout() {
        let node = Node::from_parts(NodeId(1), vec![5], Some(vec![NodeId(2), NodeId(3)]));
        let page = Page::from(&node);
        assert_eq!(
            page.get_bytes(),
            &[0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 5, 0, 0, 0, 2, 0, 0, 0, 2, 0, 0, 0, 3][..]
        );
    }

    #[test]
    fn decodes_what_it_encodes() {
        let leaf = Node::from_parts(NodeId(3), (0..19).collect(), None);
        assert_eq!(Node::try_from(&Page::from(&leaf)).unwrap(), leaf);

        let internal = Node::from_parts(
            NodeId(4),
            vec![10, 20],
            Some(vec![NodeId(5), NodeId(6), NodeId(7)]),
        );
        assert_eq!(Node::try_from(&Page::from(&internal)).unwrap(), internal);

        let empty_internal = Node::from_parts(NodeId(8), vec![], Some(vec![]));
        assert_eq!(
            Node::try_from(&Page::from(&empty_internal)).unwrap(),
            empty_internal
        );
    }

    fn any_node() -> impl Strategy<Value = Node> {
        (any::<i32>(), btree_set(any::<i32>(), 0..40), any::<bool>()).prop_flat_map(
            |(id, keys, leaf)| {
                let keys: Vec<Key> = keys.into_iter().collect();
                let fanout = if leaf { 0 } else { keys.len() + 1 };
                vec(any::<i32>(), fanout).prop_map(move |children| {
                    let children = if leaf {
                        None
                    } else {
                        Some(children.into_iter().map(NodeId).collect())
                    };
                    Node::from_parts(NodeId(id), keys.clone(), children)
                })
            },
        )
    }

    proptest! {
        #[test]
        fn decodes_any_encoded_node(node in any_node()) {
            let page = Page::from(&node);
            prop_assert_eq!(
                page.get_bytes().len(),
                record_size(node.keys().len(), node.children().map(|c| c.len()))
            );
            prop_assert_eq!(Node::try_from(&page).unwrap(), node);
        }
    }

    #[test]
    fn internal_record_without_child_count_is_corrupt() {
        let mut data = Page::from(&Node::from_parts(NodeId(1), vec![5], None)).into_bytes();
        data[LEAF_FLAG_OFFSET] = 0;
        assert!(matches!(decode(1, data), Err(Error::Corrupt { .. })));
    }

    #[test]
    fn mismatched_counts_are_corrupt() {
        let node = Node::from_parts(NodeId(1), vec![5], Some(vec![NodeId(2), NodeId(3)]));
        let data = Page::from(&node).into_bytes();

        let mut short = data.clone();
        short.truncate(data.len() - 2);
        assert!(matches!(decode(1, short), Err(Error::Corrupt { .. })));

        let mut long = data.clone();
        long.extend_from_slice(&[0, 0, 0, 9]);
        assert!(matches!(decode(1, long), Err(Error::Corrupt { .. })));

        let mut too_many_keys = data;
        BigEndian::write_i32(&mut too_many_keys[KEY_COUNT_OFFSET..], 1000);
        assert!(matches!(decode(1, too_many_keys), Err(Error::Corrupt { .. })));
    }

    #[test]
    fn negative_count_is_corrupt() {
        let mut data = Page::from(&Node::from_parts(NodeId(1), vec![], None)).into_bytes();
        BigEndian::write_i32(&mut data[KEY_COUNT_OFFSET..], -1);
        let err = decode(1, data).unwrap_err();
        assert!(err.to_string().contains("negative key count"));
    }

    #[test]
    fn unknown_flag_and_foreign_id_are_corrupt() {
        let mut data = Page::from(&Node::from_parts(NodeId(1), vec![], None)).into_bytes();
        assert!(matches!(decode(2, data.clone()), Err(Error::Corrupt { .. })));

        data[LEAF_FLAG_OFFSET] = 7;
        assert!(matches!(decode(1, data), Err(Error::Corrupt { .. })));

        assert!(matches!(decode(1, vec![]), Err(Error::Corrupt { .. })));
    }
}
