//! # Component Kinds
//!
//! Components are pure data records with no behavior. The host declares
//! them as a closed enumeration: one Rust enum whose variants carry the
//! record for each kind. Every variant is identified by a small integer
//! tag ([`ComponentKind`]), which is what the kernel indexes by.
//!
//! ## Example
//!
//! ```rust,ignore
//! #[derive(Clone, Debug, PartialEq)]
//! enum Components {
//!     Position(Position),
//!     Velocity(Velocity),
//! }
//!
//! impl ComponentSet for Components {
//!     const KINDS: &'static [KindInfo] = &[
//!         KindInfo::new(0, "Position"),
//!         KindInfo::new(1, "Velocity"),
//!     ];
//!
//!     fn kind(&self) -> ComponentKind {
//!         match self {
//!             Self::Position(_) => Position::KIND,
//!             Self::Velocity(_) => Velocity::KIND,
//!         }
//!     }
//! }
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Maximum number of component kinds in one enumeration.
///
/// Kind sets are packed into a single `u64`.
pub const MAX_KINDS: usize = 64;

/// Small integer tag identifying a component kind (0-63).
///
/// Tags are stable for the lifetime of a process; they are never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentKind(u8);

impl ComponentKind {
    /// Creates a kind from its tag.
    #[inline]
    #[must_use]
    pub const fn new(tag: u8) -> Self {
        Self(tag)
    }

    /// Returns the raw tag.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> u8 {
        self.0
    }

    /// Returns the tag as an index into per-kind arrays.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind#{}", self.0)
    }
}

/// Bit set of component kinds.
///
/// Bit `n` is set when the kind with tag `n` is present. Tags outside
/// `0..MAX_KINDS` are never representable.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct KindMask(u64);

impl KindMask {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Creates a mask from raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Creates a mask containing a single kind.
    #[inline]
    #[must_use]
    pub const fn single(kind: ComponentKind) -> Self {
        if kind.index() < MAX_KINDS {
            Self(1 << kind.0)
        } else {
            Self::EMPTY
        }
    }

    /// Creates a mask from a list of kinds.
    #[must_use]
    pub fn from_kinds(kinds: &[ComponentKind]) -> Self {
        kinds.iter().fold(Self::EMPTY, |mask, &kind| mask.with(kind))
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns this mask with `kind` added.
    #[inline]
    #[must_use]
    pub const fn with(self, kind: ComponentKind) -> Self {
        Self(self.0 | Self::single(kind).0)
    }

    /// Returns this mask with `kind` removed.
    #[inline]
    #[must_use]
    pub const fn without(self, kind: ComponentKind) -> Self {
        Self(self.0 & !Self::single(kind).0)
    }

    /// Checks whether `kind` is in the set.
    #[inline]
    #[must_use]
    pub const fn contains(self, kind: ComponentKind) -> bool {
        let bit = Self::single(kind).0;
        bit != 0 && self.0 & bit == bit
    }

    /// Checks whether every kind of `other` is in this set.
    #[inline]
    #[must_use]
    pub const fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Checks whether the two sets share at least one kind.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Kinds present in either set.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Kinds present in exactly one of the two sets.
    #[inline]
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 ^ other.0)
    }

    /// Checks if the set is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of kinds in the set.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates over the kinds in ascending tag order.
    #[inline]
    pub fn iter(self) -> KindIter {
        KindIter { bits: self.0 }
    }
}

impl fmt::Debug for KindMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(ComponentKind::tag)).finish()
    }
}

impl BitOr for KindMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitAnd for KindMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl FromIterator<ComponentKind> for KindMask {
    fn from_iter<I: IntoIterator<Item = ComponentKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl IntoIterator for KindMask {
    type Item = ComponentKind;
    type IntoIter = KindIter;

    fn into_iter(self) -> KindIter {
        self.iter()
    }
}

/// Iterator over the kinds of a [`KindMask`].
///
/// Uses `trailing_zeros` to skip absent kinds.
#[derive(Clone, Debug)]
pub struct KindIter {
    bits: u64,
}

impl Iterator for KindIter {
    type Item = ComponentKind;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.bits == 0 {
            return None;
        }
        let tag = self.bits.trailing_zeros() as u8;
        // Clear the lowest set bit
        self.bits &= self.bits - 1;
        Some(ComponentKind(tag))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.bits.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for KindIter {}

/// Static description of one kind of the enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KindInfo {
    /// The kind's tag.
    pub kind: ComponentKind,
    /// Human-readable name, used for debugging output.
    pub name: &'static str,
}

impl KindInfo {
    /// Declares a kind.
    #[must_use]
    pub const fn new(tag: u8, name: &'static str) -> Self {
        Self {
            kind: ComponentKind::new(tag),
            name,
        }
    }
}

/// The closed, host-declared enumeration of component payloads.
///
/// Payloads have value semantics at the kernel boundary: the kernel clones
/// them on the way out and never hands out mutable aliases.
pub trait ComponentSet: Clone + PartialEq + fmt::Debug + Send + 'static {
    /// Every kind of the enumeration. Tags must be unique and below
    /// [`MAX_KINDS`].
    const KINDS: &'static [KindInfo];

    /// Returns the kind of this payload.
    fn kind(&self) -> ComponentKind;
}

/// A single record shape belonging to a [`ComponentSet`].
///
/// Implemented by each record type to get typed access through the engine
/// (`insert::<Position>`, `component::<Position>`).
pub trait Component<S: ComponentSet>: Sized + Clone {
    /// The kind this record is stored under.
    const KIND: ComponentKind;

    /// Wraps the record into the enumeration.
    fn into_set(self) -> S;

    /// Borrows the record out of the enumeration, if `value` holds one.
    fn from_set(value: &S) -> Option<&Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_membership() {
        let a = ComponentKind::new(0);
        let b = ComponentKind::new(5);
        let c = ComponentKind::new(63);

        let mask = KindMask::EMPTY.with(a).with(c);
        assert!(mask.contains(a));
        assert!(!mask.contains(b));
        assert!(mask.contains(c));
        assert_eq!(mask.len(), 2);

        let mask = mask.without(a);
        assert!(!mask.contains(a));
        assert_eq!(mask.len(), 1);
    }

    #[test]
    fn test_mask_out_of_range_tag() {
        let bad = ComponentKind::new(64);
        assert_eq!(KindMask::single(bad), KindMask::EMPTY);
        assert!(!KindMask::from_bits(u64::MAX).contains(bad));
    }

    #[test]
    fn test_mask_set_algebra() {
        let pv = KindMask::from_kinds(&[ComponentKind::new(0), ComponentKind::new(1)]);
        let p = KindMask::single(ComponentKind::new(0));

        assert!(pv.contains_all(p));
        assert!(!p.contains_all(pv));
        assert!(pv.intersects(p));
        assert_eq!(pv.difference(p), KindMask::single(ComponentKind::new(1)));
        assert_eq!(p | KindMask::single(ComponentKind::new(1)), pv);
        assert_eq!(pv & p, p);
    }

    #[test]
    fn test_mask_iterates_in_tag_order() {
        let mask: KindMask = [9, 2, 40, 0]
            .into_iter()
            .map(ComponentKind::new)
            .collect();
        let tags: Vec<u8> = mask.iter().map(ComponentKind::tag).collect();
        assert_eq!(tags, vec![0, 2, 9, 40]);
        assert_eq!(mask.iter().len(), 4);
    }
}
