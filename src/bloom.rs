//! A compact, per-node ancestor Bloom filter.
//!
//! This mirrors the classic ancestor-filter optimization used by every major
//! style engine (see Gecko's `AncestorFilter`, Blink/WebKit's
//! `SelectorFilter`, and Servo's `StyleBloom`/`selectors::bloom`): a small
//! fixed-size probabilistic set that lets a descendant-combinator walk
//! short-circuit whole subtrees that provably can't contain a match, without
//! ever producing a false negative.
//!
//! Unlike Servo's bloom, which is a single filter pushed and popped as a
//! traversal walks the tree, this one is stored per node (see
//! [`crate::tree`]): each node's filter is computed once, at insertion time,
//! from its parent's filter plus the parent's own hashes.

/// A 64-bit probabilistic set of 32-bit hashes, three bits per insertion.
///
/// `add` never fails to record a hash it was given (no false negatives);
/// `might_contain` may return `true` for a hash that was never inserted
/// (false positives), but never `false` for one that was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct BloomFilter(u64);

#[inline]
fn bit_positions(hash: u32) -> [u32; 3] {
    [hash & 63, (hash >> 8) & 63, (hash >> 16) & 63]
}

impl BloomFilter {
    /// An empty filter.
    #[inline]
    pub const fn empty() -> Self {
        BloomFilter(0)
    }

    /// A filter containing exactly one hash.
    #[inline]
    pub fn single(hash: u32) -> Self {
        let mut f = Self::empty();
        f.add(hash);
        f
    }

    /// Sets the three bits derived from `hash`.
    #[inline]
    pub fn add(&mut self, hash: u32) {
        for pos in bit_positions(hash) {
            self.0 |= 1u64 << pos;
        }
    }

    /// Returns `true` iff all three bits derived from `hash` are set.
    ///
    /// A `false` result is a sound proof of absence. A `true` result is a
    /// "maybe" — always sound to assume `hash` might have been inserted.
    #[inline]
    pub fn might_contain(&self, hash: u32) -> bool {
        bit_positions(hash)
            .iter()
            .all(|&pos| self.0 & (1u64 << pos) != 0)
    }

    /// Bitwise union with `other`, in place.
    #[inline]
    pub fn union_with(&mut self, other: BloomFilter) {
        self.0 |= other.0;
    }

    /// Bitwise union of two filters.
    #[inline]
    pub fn union(self, other: BloomFilter) -> BloomFilter {
        BloomFilter(self.0 | other.0)
    }

    /// Whether no bits are set at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of set bits.
    #[inline]
    pub fn popcount(&self) -> u32 {
        self.0.count_ones()
    }

    /// Raw 64-bit word, for serialization or debugging.
    #[inline]
    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Estimated false-positive rate given an expected item count `n`,
    /// per the standard Bloom filter approximation for `k = 3` hash
    /// functions over `m = 64` bits: `(1 - e^(-3n/64))^3`.
    pub fn estimated_false_positive_rate(n: usize) -> f64 {
        let k = 3.0_f64;
        let m = 64.0_f64;
        let exponent = -(k * n as f64) / m;
        (1.0 - exponent.exp()).powf(k)
    }
}

/// An optional wider variant for very deep trees: four 64-bit lanes, two bit
/// positions drawn per insert from disjoint slices of the hash. Matching
/// itself only ever consumes the compact 64-bit [`BloomFilter`]; this type
/// exists so a producer that wants a lower false-positive rate on deep
/// ancestor chains can maintain one, then collapse it down with
/// [`WideBloomFilter::to_compact`] before storing it on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct WideBloomFilter([u64; 4]);

impl WideBloomFilter {
    /// An empty wide filter.
    #[inline]
    pub const fn empty() -> Self {
        WideBloomFilter([0; 4])
    }

    /// Inserts `hash`, touching two bits in each of two disjoint byte slices
    /// of the hash so that the four lanes see independent bit patterns.
    #[inline]
    pub fn add(&mut self, hash: u32) {
        let low = hash & 0xFFFF;
        let high = (hash >> 16) & 0xFFFF;
        for (lane, slice) in self.0.iter_mut().zip([low, high, low, high]) {
            let a = slice & 63;
            let b = (slice >> 6) & 63;
            *lane |= 1u64 << a;
            *lane |= 1u64 << b;
        }
    }

    /// Returns `true` iff every lane's two bits for `hash` are set.
    #[inline]
    pub fn might_contain(&self, hash: u32) -> bool {
        let low = hash & 0xFFFF;
        let high = (hash >> 16) & 0xFFFF;
        self.0
            .iter()
            .zip([low, high, low, high])
            .all(|(lane, slice)| {
                let a = slice & 63;
                let b = (slice >> 6) & 63;
                (lane & (1u64 << a)) != 0 && (lane & (1u64 << b)) != 0
            })
    }

    /// Collapses the four lanes into a single compact filter by OR-ing them
    /// together. The result's false-positive rate is higher than the wide
    /// filter's own, but it never loses a bit the wide filter had set, so it
    /// remains a sound (if coarser) over-approximation.
    #[inline]
    pub fn to_compact(&self) -> BloomFilter {
        BloomFilter(self.0[0] | self.0[1] | self.0[2] | self.0[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::fnv1a;

    #[test]
    fn no_false_negatives_under_many_insertions() {
        let mut filter = BloomFilter::empty();
        let hashes: Vec<u32> = (0..200).map(|i| fnv1a(format!("class-{i}").as_bytes())).collect();
        for &h in &hashes {
            filter.add(h);
        }
        for &h in &hashes {
            assert!(filter.might_contain(h), "false negative for hash {h}");
        }
    }

    #[test]
    fn empty_filter_rejects_everything_it_was_not_given() {
        let filter = BloomFilter::empty();
        assert!(!filter.might_contain(fnv1a(b"anything")));
        assert!(filter.is_empty());
    }

    #[test]
    fn union_combines_membership() {
        let mut a = BloomFilter::empty();
        let mut b = BloomFilter::empty();
        a.add(fnv1a(b"left"));
        b.add(fnv1a(b"right"));

        let combined = a.union(b);
        assert!(combined.might_contain(fnv1a(b"left")));
        assert!(combined.might_contain(fnv1a(b"right")));
    }

    #[test]
    fn single_constructs_a_one_item_filter() {
        let h = fnv1a(b"container");
        let filter = BloomFilter::single(h);
        assert!(filter.might_contain(h));
        assert!(!filter.is_empty());
    }

    #[test]
    fn estimated_fp_rate_is_low_for_few_items() {
        // Spec: bounded false-positive rate with ~3 items < 2%.
        let rate = BloomFilter::estimated_false_positive_rate(3);
        assert!(rate < 0.02, "rate was {rate}");
    }

    #[test]
    fn wide_filter_to_compact_preserves_membership() {
        let mut wide = WideBloomFilter::empty();
        let hashes: Vec<u32> = (0..10).map(|i| fnv1a(format!("ancestor-{i}").as_bytes())).collect();
        for &h in &hashes {
            wide.add(h);
        }
        for &h in &hashes {
            assert!(wide.might_contain(h));
        }
        let compact = wide.to_compact();
        for &h in &hashes {
            assert!(compact.might_contain(h), "compact lost membership for {h}");
        }
    }
}
