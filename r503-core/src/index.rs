//! Template index table
//!
//! `ReadIndexTable` returns one 32-byte page per call. Each page covers 256
//! library slots; bit `i` of byte `n` (least significant bit first) is set
//! when slot `8n + i` holds a template.

use std::collections::BTreeSet;

use bytes::Bytes;

use crate::constants::index::{PAGE_LEN, SLOTS_PER_PAGE};

/// Slots marked as occupied in a page, relative to the page start
///
/// Bytes past the 32-byte page length are ignored.
///
/// # Examples
///
/// ```
/// use r503_core::index::decode_index_page;
///
/// let slots = decode_index_page(&[0b0000_0101, 0b1000_0000]);
/// assert_eq!(slots.into_iter().collect::<Vec<_>>(), vec![0, 2, 15]);
/// ```
pub fn decode_index_page(page: &[u8]) -> BTreeSet<u16> {
    page.iter()
        .take(PAGE_LEN)
        .zip(0u16..)
        .flat_map(|(&byte, n)| {
            (0..8u16)
                .filter(move |bit| byte & (1 << bit) != 0)
                .map(move |bit| n * 8 + bit)
        })
        .collect()
}

/// First unoccupied slot below `capacity`, if any
pub fn available_location(page: &[u8], capacity: u16) -> Option<u16> {
    let occupied = decode_index_page(page);
    (0..capacity).find(|slot| !occupied.contains(slot))
}

/// One page of the index table as read from the module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPage {
    /// Page number (0..=3)
    pub page: u8,

    /// Raw occupancy bits
    pub bits: Bytes,
}

impl IndexPage {
    pub fn new(page: u8, bits: impl Into<Bytes>) -> Self {
        Self {
            page,
            bits: bits.into(),
        }
    }

    /// Library location of the first slot on this page
    pub fn first_location(&self) -> u16 {
        u16::from(self.page) * SLOTS_PER_PAGE
    }

    /// Occupied library locations (absolute ids)
    pub fn occupied(&self) -> BTreeSet<u16> {
        let base = self.first_location();
        decode_index_page(&self.bits)
            .into_iter()
            .map(|slot| base + slot)
            .collect()
    }

    /// First free library location on this page below `capacity`
    pub fn first_free(&self, capacity: u16) -> Option<u16> {
        let base = self.first_location();
        if capacity <= base {
            return None;
        }
        let local_capacity = (capacity - base).min(SLOTS_PER_PAGE);
        available_location(&self.bits, local_capacity).map(|slot| base + slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_empty_page() {
        let page = [0u8; 32];
        assert!(decode_index_page(&page).is_empty());
        assert_eq!(available_location(&page, 200), Some(0));
    }

    #[test]
    fn test_full_page() {
        let page = [0xFFu8; 32];
        assert_eq!(decode_index_page(&page).len(), 256);
        assert_eq!(available_location(&page, 200), None);
    }

    #[test]
    fn test_lsb_first() {
        let mut page = [0u8; 32];
        page[0] = 0b0000_0111;
        page[1] = 0b0000_0001;

        let slots: Vec<_> = decode_index_page(&page).into_iter().collect();
        assert_eq!(slots, vec![0, 1, 2, 8]);
        assert_eq!(available_location(&page, 200), Some(3));
    }

    #[test]
    fn test_capacity_limits_search() {
        let mut page = [0u8; 32];
        page[0] = 0xFF;
        assert_eq!(available_location(&page, 8), None);
        assert_eq!(available_location(&page, 9), Some(8));
    }

    #[test]
    fn test_index_page_absolute_locations() {
        let mut bits = vec![0u8; 32];
        bits[0] = 0b0000_0011;
        let page = IndexPage::new(1, bits);

        assert_eq!(page.first_location(), 256);
        assert_eq!(page.occupied().into_iter().collect::<Vec<_>>(), vec![256, 257]);
        assert_eq!(page.first_free(1000), Some(258));
        assert_eq!(page.first_free(200), None);
        assert_eq!(page.first_free(258), None);
    }

    #[test]
    fn test_oversized_page_is_clamped() {
        let page = vec![0xFFu8; 9000];
        let slots = decode_index_page(&page);
        assert_eq!(slots.len(), 256);
        assert_eq!(slots.last(), Some(&255));
        assert_eq!(available_location(&page, u16::MAX), Some(256));

        let last = IndexPage::new(u8::MAX, page);
        assert_eq!(last.occupied().last(), Some(&u16::MAX));
        assert_eq!(last.first_free(u16::MAX), None);
    }

    proptest! {
        #[test]
        fn prop_occupied_and_free_partition_capacity(
            page in proptest::collection::vec(any::<u8>(), 32),
            capacity in 0u16..=256,
        ) {
            let occupied = decode_index_page(&page);
            let first_free = available_location(&page, capacity);

            match first_free {
                Some(slot) => {
                    prop_assert!(slot < capacity);
                    prop_assert!(!occupied.contains(&slot));
                    prop_assert!((0..slot).all(|s| occupied.contains(&s)));
                }
                None => prop_assert!((0..capacity).all(|s| occupied.contains(&s))),
            }
        }

        #[test]
        fn prop_decode_matches_bits(page in proptest::collection::vec(any::<u8>(), 32)) {
            let slots = decode_index_page(&page);

            for slot in 0..256u16 {
                let byte = page[usize::from(slot / 8)];
                let set = byte & (1 << (slot % 8)) != 0;
                prop_assert_eq!(slots.contains(&slot), set);
            }
        }
    }
}
