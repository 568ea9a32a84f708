//! Walker over the scheduler's circular task lists.
//!
//! A FreeRTOS `List_t` is a circular, doubly linked list of `ListItem_t`
//! nodes embedded in the TCBs they belong to. The list carries its own
//! sentinel node (`xListEnd`), which marks the wrap-around point and owns no
//! task. `pxIndex` may point anywhere in the ring, including the sentinel.

use memory_addr::VirtAddr;

use crate::config::KernelLayout;
use crate::hal::target::{Target, offset};
use crate::{RtosError, RtosResult};

/// A scheduler list in target memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtosList {
    addr: VirtAddr,
}

impl RtosList {
    pub const fn at(addr: VirtAddr) -> Self {
        Self { addr }
    }

    pub fn addr(&self) -> VirtAddr {
        self.addr
    }

    /// Address of the embedded sentinel node.
    pub fn sentinel(&self, layout: &KernelLayout) -> VirtAddr {
        offset(self.addr, layout.list_end)
    }

    /// Number of tasks in the list.
    pub fn len(&self, target: &dyn Target, layout: &KernelLayout) -> RtosResult<u32> {
        target.read_u32(offset(self.addr, layout.list_count))
    }

    /// Starts a traversal from the list's current index.
    ///
    /// The list header is read once, here; the iterator then yields the
    /// owner (TCB) address of every member.
    pub fn iter<'a>(
        &self,
        target: &'a dyn Target,
        layout: &'a KernelLayout,
    ) -> RtosResult<ListIter<'a>> {
        let remaining = self.len(target, layout)?;
        let cursor = target.read_ptr(offset(self.addr, layout.list_index))?;
        trace!(
            "walking list {:#x}: {} items, index {:#x}",
            self.addr.as_usize(),
            remaining,
            cursor.as_usize()
        );

        Ok(ListIter {
            target,
            layout,
            list: self.addr,
            sentinel: self.sentinel(layout),
            cursor,
            remaining,
            passed_sentinel: false,
            done: false,
        })
    }
}

/// Lazy, finite traversal of one [`RtosList`].
///
/// Yields exactly as many owners as the list's item count, wherever the
/// sentinel sits in the rotation. Ends after the first error.
pub struct ListIter<'a> {
    target: &'a dyn Target,
    layout: &'a KernelLayout,
    list: VirtAddr,
    sentinel: VirtAddr,
    cursor: VirtAddr,
    remaining: u32,
    /// Sentinel seen since the last yielded item.
    passed_sentinel: bool,
    done: bool,
}

impl ListIter<'_> {
    fn next_node(&self, node: VirtAddr) -> RtosResult<VirtAddr> {
        self.target.read_ptr(offset(node, self.layout.item_next))
    }

    fn step(&mut self) -> RtosResult<VirtAddr> {
        while self.cursor == self.sentinel {
            // Two sentinel visits with nothing in between: the ring is
            // empty while the count says otherwise.
            if self.passed_sentinel {
                return Err(RtosError::CorruptList {
                    list: self.list.as_usize(),
                });
            }
            self.passed_sentinel = true;
            self.cursor = self.next_node(self.cursor)?;
        }

        let owner = self
            .target
            .read_ptr(offset(self.cursor, self.layout.item_owner))?;
        self.cursor = self.next_node(self.cursor)?;
        self.remaining -= 1;
        self.passed_sentinel = false;
        Ok(owner)
    }
}

impl Iterator for ListIter<'_> {
    type Item = RtosResult<VirtAddr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == 0 {
            return None;
        }
        let item = self.step();
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, Some(self.remaining as usize))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::MemoryTarget;
    use memory_addr::va;

    const LIST: usize = 0x2000_0000;
    const NODES: usize = 0x2000_0100;

    /// Lays out a list of `n` nodes owned by `0x1000 + i`, with `pxIndex`
    /// pointing `rotation` steps past the sentinel.
    fn build_list(n: usize, rotation: usize) -> MemoryTarget {
        let layout = KernelLayout::default();
        let mut target = MemoryTarget::new();
        let sentinel = LIST + layout.list_end;
        let node = |i: usize| NODES + i * 0x20;

        // Ring: sentinel -> node 0 -> ... -> node n-1 -> sentinel.
        let ring: Vec<usize> = std::iter::once(sentinel).chain((0..n).map(node)).collect();
        for (i, &addr) in ring.iter().enumerate() {
            let next = ring[(i + 1) % ring.len()];
            target.write_u32(addr + layout.item_next, next as u32);
        }
        for i in 0..n {
            target.write_u32(node(i) + layout.item_owner, 0x1000 + i as u32);
        }

        target.write_u32(LIST + layout.list_count, n as u32);
        target.write_u32(LIST + layout.list_index, ring[rotation % ring.len()] as u32);
        target
    }

    fn owners(target: &MemoryTarget) -> RtosResult<Vec<usize>> {
        let layout = KernelLayout::default();
        RtosList::at(va!(LIST))
            .iter(target, &layout)?
            .map(|owner| owner.map(|o| o.as_usize()))
            .collect()
    }

    #[test]
    fn test_every_rotation_yields_count_items() {
        for n in 0..6 {
            for rotation in 0..=n {
                let target = build_list(n, rotation);
                let mut found = owners(&target).unwrap();
                assert_eq!(found.len(), n, "n={n} rotation={rotation}");

                found.sort();
                let expected: Vec<usize> = (0..n).map(|i| 0x1000 + i).collect();
                assert_eq!(found, expected, "n={n} rotation={rotation}");
            }
        }
    }

    #[test]
    fn test_order_follows_the_ring() {
        // Index on node 1 of 3: 1, 2, (sentinel), 0.
        let target = build_list(3, 2);
        assert_eq!(owners(&target).unwrap(), vec![0x1001, 0x1002, 0x1000]);
    }

    #[test]
    fn test_empty_ring_with_nonzero_count_is_detected() {
        let layout = KernelLayout::default();
        let mut target = build_list(0, 0);
        target.write_u32(LIST + layout.list_count, 2);

        let items: Vec<_> = RtosList::at(va!(LIST)).iter(&target, &layout).unwrap().collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(RtosError::CorruptList { list: LIST })));
    }

    #[test]
    fn test_count_bounds_the_walk() {
        let layout = KernelLayout::default();
        let mut target = build_list(2, 0);
        target.write_u32(LIST + layout.list_count, 3);

        // The ring wraps; the count alone ends the walk.
        assert_eq!(owners(&target).unwrap(), vec![0x1000, 0x1001, 0x1000]);
    }

    #[test]
    fn test_unreadable_node_ends_the_walk() {
        let layout = KernelLayout::default();
        let mut target = build_list(3, 0);
        target.unmap(NODES + 0x20 + layout.item_owner, 4);

        let items: Vec<_> = RtosList::at(va!(LIST)).iter(&target, &layout).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(RtosError::MemoryRead { .. })));
    }
}
