//! Large-block AVL tree (§3.3): free blocks larger than the small-bin
//! ceiling are tracked by size in a size-keyed AVL tree. Equal-sized
//! blocks collapse into a FIFO ring threaded through the tree node that
//! first claimed that size; later arrivals are list-only nodes
//! (`height < 0`) that never participate in rotations.

use super::block::Block;
use crate::ring::{self, Link};
use std::ptr::NonNull;

/// Node header overlaid on a free block's payload. Requires the block to
/// be larger than the small-bin ceiling, which is always true here since
/// only blocks > 2048 bytes ever enter the tree.
#[repr(C)]
struct TreeNode {
    left: Option<NonNull<TreeNode>>,
    right: Option<NonNull<TreeNode>>,
    parent: Option<NonNull<TreeNode>>,
    /// Tree height when `>= 1`; `-1` marks a list-only duplicate node
    /// that is not part of the tree shape at all.
    height: i32,
    /// For a tree node: ring of duplicate-size siblings (self-linked if
    /// none). For a list node: its link into that ring.
    ring: Link,
}

impl TreeNode {
    fn is_list_node(&self) -> bool {
        self.height < 0
    }
}

pub struct Tree {
    root: Option<NonNull<TreeNode>>,
}

impl Tree {
    pub fn new() -> Self {
        Tree { root: None }
    }

    fn node_ptr(block: &Block) -> NonNull<TreeNode> {
        unsafe { NonNull::new_unchecked(block.payload().as_ptr().cast::<TreeNode>()) }
    }

    fn block_of(node: NonNull<TreeNode>) -> Block {
        unsafe {
            Block::from_raw(NonNull::new_unchecked(
                (node.as_ptr() as *mut u8).sub(super::block::HEADER_SIZE),
            ))
        }
    }

    fn key_of(node: NonNull<TreeNode>) -> u64 {
        Self::block_of(node).size() as u64
    }

    fn height(n: Option<NonNull<TreeNode>>) -> i32 {
        n.map(|p| unsafe { p.as_ref().height.max(0) }).unwrap_or(0)
    }

    fn update(mut n: NonNull<TreeNode>) {
        unsafe {
            let l = n.as_ref().left;
            let r = n.as_ref().right;
            n.as_mut().height = 1 + Self::height(l).max(Self::height(r));
        }
    }

    fn balance_factor(n: NonNull<TreeNode>) -> i32 {
        unsafe { Self::height(n.as_ref().left) - Self::height(n.as_ref().right) }
    }

    fn set_child(&mut self, parent: Option<NonNull<TreeNode>>, old: NonNull<TreeNode>, new: Option<NonNull<TreeNode>>) {
        match parent {
            None => self.root = new,
            Some(mut p) => unsafe {
                if p.as_ref().left == Some(old) {
                    p.as_mut().left = new;
                } else {
                    debug_assert_eq!(p.as_ref().right, Some(old));
                    p.as_mut().right = new;
                }
            },
        }
        if let Some(mut new) = new {
            unsafe { new.as_mut().parent = parent };
        }
    }

    fn rotate_left(&mut self, mut x: NonNull<TreeNode>) {
        unsafe {
            let mut y = x.as_ref().right.expect("rotate_left requires a right child");
            let parent = x.as_ref().parent;
            x.as_mut().right = y.as_ref().left;
            if let Some(mut yl) = y.as_ref().left {
                yl.as_mut().parent = Some(x);
            }
            y.as_mut().left = Some(x);
            x.as_mut().parent = Some(y);
            self.set_child(parent, x, Some(y));
            Self::update(x);
            Self::update(y);
        }
    }

    fn rotate_right(&mut self, mut y: NonNull<TreeNode>) {
        unsafe {
            let mut x = y.as_ref().left.expect("rotate_right requires a left child");
            let parent = y.as_ref().parent;
            y.as_mut().left = x.as_ref().right;
            if let Some(mut xr) = x.as_ref().right {
                xr.as_mut().parent = Some(y);
            }
            x.as_mut().right = Some(y);
            y.as_mut().parent = Some(x);
            self.set_child(parent, y, Some(x));
            Self::update(y);
            Self::update(x);
        }
    }

    fn rebalance_upwards(&mut self, start: Option<NonNull<TreeNode>>) {
        let mut cur = start;
        while let Some(n) = cur {
            Self::update(n);
            let bf = Self::balance_factor(n);
            let mut node = n;
            if bf > 1 {
                unsafe {
                    let l = node.as_ref().left.unwrap();
                    if Self::balance_factor(l) < 0 {
                        self.rotate_left(l);
                    }
                }
                self.rotate_right(node);
                node = unsafe { node.as_ref().parent }.unwrap_or(node);
            } else if bf < -1 {
                unsafe {
                    let r = node.as_ref().right.unwrap();
                    if Self::balance_factor(r) > 0 {
                        self.rotate_right(r);
                    }
                }
                self.rotate_left(node);
                node = unsafe { node.as_ref().parent }.unwrap_or(node);
            }
            cur = unsafe { node.as_ref().parent };
        }
    }

    /// Inserts `block` (a free block, `size > SMALL_BIN_CEILING`).
    pub fn insert(&mut self, block: Block) {
        let mut new_node = Self::node_ptr(&block);
        unsafe {
            new_node.as_mut().left = None;
            new_node.as_mut().right = None;
            new_node.as_mut().parent = None;
        }
        new_node.init_ring();

        let Some(root) = self.root else {
            unsafe {
                new_node.as_mut().height = 1;
            }
            self.root = Some(new_node);
            return;
        };

        let key = Self::block_of(new_node).size() as u64;
        let mut cur = root;
        loop {
            let ck = Self::key_of(cur);
            if key == ck {
                // Duplicate: join cur's ring as a list-only node.
                unsafe {
                    new_node.as_mut().height = -1;
                }
                ring::enqueue(unsafe { ring_ptr(cur) }, unsafe { ring_ptr(new_node) });
                return;
            }
            let next = if key < ck {
                unsafe { cur.as_ref().left }
            } else {
                unsafe { cur.as_ref().right }
            };
            match next {
                Some(n) => cur = n,
                None => break,
            }
        }

        unsafe {
            new_node.as_mut().height = 1;
            new_node.as_mut().parent = Some(cur);
            if key < Self::key_of(cur) {
                cur.as_mut().left = Some(new_node);
            } else {
                cur.as_mut().right = Some(new_node);
            }
        }
        self.rebalance_upwards(Some(cur));
    }

    /// Finds the smallest-key free block with `size >= requested`,
    /// without removing it.
    pub fn find_gte(&self, requested: usize) -> Option<Block> {
        let mut cur = self.root;
        let mut best = None;
        while let Some(n) = cur {
            let k = Self::key_of(n);
            if k == requested as u64 {
                return Some(Self::block_of(n));
            }
            if k > requested as u64 {
                best = Some(n);
                cur = unsafe { n.as_ref().left };
            } else {
                cur = unsafe { n.as_ref().right };
            }
        }
        best.map(Self::block_of)
    }

    fn min_node(mut n: NonNull<TreeNode>) -> NonNull<TreeNode> {
        unsafe {
            while let Some(l) = n.as_ref().left {
                n = l;
            }
        }
        n
    }

    /// Detaches `block` from the tree/ring structures entirely (§3.3: the
    /// three cases — list-only node, ordinary AVL leaf/one-child/two-child
    /// remove, or tree-node-with-duplicates promotion).
    pub fn detach(&mut self, block: Block) {
        let node = Self::node_ptr(&block);
        unsafe {
            if node.as_ref().is_list_node() {
                ring_ptr(node).detach();
                return;
            }

            if ring_ptr(node).is_detached() {
                // Case 2: ordinary AVL node, no duplicate ring.
                let parent = node.as_ref().parent;
                let (left, right) = (node.as_ref().left, node.as_ref().right);
                let mut start_rebalance = parent;
                if left.is_none() {
                    self.set_child(parent, node, right);
                } else if right.is_none() {
                    self.set_child(parent, node, left);
                } else {
                    let mut s = Self::min_node(right.unwrap());
                    if s.as_ref().parent != Some(node) {
                        let sp = s.as_ref().parent;
                        let s_right = s.as_ref().right;
                        self.set_child(sp, s, s_right);
                        s.as_mut().right = right;
                        if let Some(mut r) = right {
                            r.as_mut().parent = Some(s);
                        }
                        start_rebalance = sp;
                    } else {
                        start_rebalance = Some(s);
                    }
                    self.set_child(parent, node, Some(s));
                    s.as_mut().left = left;
                    if let Some(mut l) = left {
                        l.as_mut().parent = Some(s);
                    }
                    Self::update(s);
                }
                if self.root.is_some() {
                    self.rebalance_upwards(start_rebalance);
                }
                return;
            }

            // Case 3: tree node that is also the head of a duplicate ring.
            // Promote the oldest duplicate into this node's tree slot.
            let next = ring_ptr(node).next().unwrap();
            let mut next_node = node_from_ring(next);
            ring_ptr(node).detach();

            next_node.as_mut().height = node.as_ref().height;
            next_node.as_mut().left = node.as_ref().left;
            next_node.as_mut().right = node.as_ref().right;
            next_node.as_mut().parent = node.as_ref().parent;
            if let Some(mut l) = next_node.as_ref().left {
                l.as_mut().parent = Some(next_node);
            }
            if let Some(mut r) = next_node.as_ref().right {
                r.as_mut().parent = Some(next_node);
            }
            match node.as_ref().parent {
                None => self.root = Some(next_node),
                Some(mut p) => {
                    if p.as_ref().left == Some(node) {
                        p.as_mut().left = Some(next_node);
                    } else {
                        p.as_mut().right = Some(next_node);
                    }
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Ascending in-order walk of the distinct keys in the tree (not the
    /// duplicate rings) — used by invariant checks.
    #[cfg(any(test, debug_assertions))]
    pub fn assert_valid(&self) {
        fn walk(n: Option<NonNull<TreeNode>>, min: u64, max: u64) -> (i32, u64, u64) {
            match n {
                None => (0, min, max),
                Some(node) => unsafe {
                    let k = Tree::key_of(node);
                    debug_assert!(k >= min && k <= max, "AVL key out of order");
                    let (lh, _, _) = walk(node.as_ref().left, min, k.saturating_sub(1));
                    let (rh, _, _) = walk(node.as_ref().right, k + 1, max);
                    debug_assert!((lh - rh).abs() <= 1, "AVL unbalanced at size {k}");
                    (1 + lh.max(rh), min, max)
                },
            }
        }
        walk(self.root, 0, u64::MAX);
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// # Safety: `node` must be a live tree node.
unsafe fn ring_ptr(node: NonNull<TreeNode>) -> NonNull<Link> {
    NonNull::new_unchecked(std::ptr::addr_of_mut!((*node.as_ptr()).ring))
}

/// Recovers the owning `TreeNode` from a `Link` that is its `ring` field.
unsafe fn node_from_ring(link: NonNull<Link>) -> NonNull<TreeNode> {
    let offset = std::mem::offset_of!(TreeNode, ring);
    NonNull::new_unchecked((link.as_ptr() as *mut u8).sub(offset).cast::<TreeNode>())
}

trait InitRing {
    fn init_ring(self);
}

impl InitRing for NonNull<TreeNode> {
    fn init_ring(self) {
        unsafe { ring_ptr(self).init() };
    }
}

#[cfg(test)]
mod tests {
    use super::super::block::{align_up, BlockHeader, BlockState, HEADER_SIZE};
    use super::*;

    /// A private arena just large enough to host several tree-eligible
    /// blocks, used to exercise tree shape without the full allocator.
    struct TestArena {
        _buf: Box<[u8]>,
        base: NonNull<u8>,
    }

    impl TestArena {
        fn new(n_blocks: usize, block_size: usize) -> (Self, Vec<Block>) {
            let total = align_up(block_size) * n_blocks;
            let mut buf = vec![0u8; total].into_boxed_slice();
            let base = NonNull::new(buf.as_mut_ptr()).unwrap();
            let mut blocks = Vec::new();
            for i in 0..n_blocks {
                let ptr = unsafe { NonNull::new_unchecked(base.as_ptr().add(i * align_up(block_size))) };
                let mut block = unsafe { Block::from_raw(ptr) };
                *block.header_mut() = BlockHeader::new(align_up(block_size) as u32, BlockState::Free, 0, BlockState::Invalid);
                blocks.push(block);
            }
            (TestArena { _buf: buf, base }, blocks)
        }
    }

    #[test]
    fn insert_and_find_exact() {
        let (_arena, blocks) = TestArena::new(4, 4096 + HEADER_SIZE);
        let mut tree = Tree::new();
        for b in &blocks {
            tree.insert(*b);
        }
        let found = tree.find_gte(4096 + HEADER_SIZE).unwrap();
        assert_eq!(found.size(), align_up(4096 + HEADER_SIZE));
        tree.assert_valid();
    }

    #[test]
    fn duplicate_sizes_form_fifo_ring_and_promote_on_detach() {
        let (_arena, blocks) = TestArena::new(3, 4096 + HEADER_SIZE);
        let mut tree = Tree::new();
        for b in &blocks {
            tree.insert(*b);
        }
        // All three share a size; detaching the tree-slot occupant must
        // promote the next-oldest duplicate rather than emptying the key.
        tree.detach(blocks[0]);
        assert!(tree.find_gte(4096 + HEADER_SIZE).is_some());
        tree.detach(blocks[1]);
        assert!(tree.find_gte(4096 + HEADER_SIZE).is_some());
        tree.detach(blocks[2]);
        assert!(tree.find_gte(4096 + HEADER_SIZE).is_none());
    }

    #[test]
    fn ascending_keys_after_many_inserts() {
        let (_arena, blocks) = TestArena::new(20, 4096 + HEADER_SIZE);
        let mut tree = Tree::new();
        // Vary sizes slightly so they land at distinct keys.
        for (i, mut b) in blocks.into_iter().enumerate() {
            let size = align_up(4096 + HEADER_SIZE + i * 32) as u32;
            b.header_mut().this_size = size;
            tree.insert(b);
        }
        tree.assert_valid();
    }
}
