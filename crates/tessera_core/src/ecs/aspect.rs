//! # Aspects
//!
//! An aspect is a predicate over kind sets: "has all of `required`, none of
//! `excluded`". Aspects are plain values and compare by value, which is what
//! lets the engine hand out one collection per distinct aspect.
//!
//! Matching is two mask operations, independent of how many kinds are named.

use super::component::{Component, ComponentKind, ComponentSet, KindMask, MAX_KINDS};

/// Immutable required/excluded kind-set pair.
///
/// # Example
///
/// ```rust,ignore
/// let movable = Aspect::new().with::<Components, Position>().with::<Components, Velocity>();
/// let static_bodies = Aspect::all_of(&[Position::KIND]).none_of(&[Velocity::KIND]);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Aspect {
    required: KindMask,
    excluded: KindMask,
    /// First named kind whose tag does not fit in a mask.
    out_of_range: Option<ComponentKind>,
}

impl Aspect {
    /// The aspect every entity matches.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            required: KindMask::EMPTY,
            excluded: KindMask::EMPTY,
            out_of_range: None,
        }
    }

    /// Creates an aspect from raw masks.
    #[must_use]
    pub const fn from_masks(required: KindMask, excluded: KindMask) -> Self {
        Self {
            required,
            excluded,
            out_of_range: None,
        }
    }

    /// Aspect requiring every kind in `kinds`.
    #[must_use]
    pub fn all_of(kinds: &[ComponentKind]) -> Self {
        kinds.iter().fold(Self::new(), |aspect, &kind| aspect.require(kind))
    }

    /// Adds kinds that must be absent.
    #[must_use]
    pub fn none_of(self, kinds: &[ComponentKind]) -> Self {
        kinds.iter().fold(self, |aspect, &kind| aspect.exclude(kind))
    }

    /// Adds a required kind.
    #[must_use]
    pub const fn require(mut self, kind: ComponentKind) -> Self {
        self.required = self.required.with(kind);
        self.note_range(kind)
    }

    /// Adds a forbidden kind.
    #[must_use]
    pub const fn exclude(mut self, kind: ComponentKind) -> Self {
        self.excluded = self.excluded.with(kind);
        self.note_range(kind)
    }

    const fn note_range(mut self, kind: ComponentKind) -> Self {
        if kind.index() >= MAX_KINDS && self.out_of_range.is_none() {
            self.out_of_range = Some(kind);
        }
        self
    }

    /// Returns the first named kind that no mask can hold, if any.
    ///
    /// Such an aspect is never valid; the world rejects it with
    /// [`EcsError::UnknownKind`](crate::EcsError::UnknownKind).
    #[inline]
    #[must_use]
    pub const fn out_of_range(&self) -> Option<ComponentKind> {
        self.out_of_range
    }

    /// Adds the kind of record `C` to the required set.
    #[must_use]
    pub const fn with<S: ComponentSet, C: Component<S>>(self) -> Self {
        self.require(C::KIND)
    }

    /// Adds the kind of record `C` to the excluded set.
    #[must_use]
    pub const fn without<S: ComponentSet, C: Component<S>>(self) -> Self {
        self.exclude(C::KIND)
    }

    /// Kinds an entity must have.
    #[inline]
    #[must_use]
    pub const fn required(&self) -> KindMask {
        self.required
    }

    /// Kinds an entity must not have.
    #[inline]
    #[must_use]
    pub const fn excluded(&self) -> KindMask {
        self.excluded
    }

    /// Every kind this aspect mentions.
    #[inline]
    #[must_use]
    pub const fn kinds(&self) -> KindMask {
        self.required.union(self.excluded)
    }

    /// Checks if no entity can ever match (a kind both required and excluded).
    #[inline]
    #[must_use]
    pub const fn is_unsatisfiable(&self) -> bool {
        self.required.intersects(self.excluded)
    }

    /// Tests an entity's effective kind set against this aspect.
    #[inline]
    #[must_use]
    pub const fn matches(&self, kinds: KindMask) -> bool {
        kinds.contains_all(self.required) && !kinds.intersects(self.excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Color, Components, Position, Velocity};

    #[test]
    fn test_required_superset() {
        let aspect = Aspect::new()
            .with::<Components, Position>()
            .with::<Components, Velocity>();

        let p = KindMask::single(Position::KIND);
        let pv = p.with(Velocity::KIND);
        let pvc = pv.with(Color::KIND);

        assert!(!aspect.matches(p));
        assert!(aspect.matches(pv));
        assert!(aspect.matches(pvc));
    }

    #[test]
    fn test_excluded_kinds() {
        let aspect = Aspect::all_of(&[Position::KIND]).none_of(&[Velocity::KIND]);
        let p = KindMask::single(Position::KIND);

        assert!(aspect.matches(p));
        assert!(!aspect.matches(p.with(Velocity::KIND)));
        assert!(aspect.matches(p.with(Color::KIND)));
    }

    #[test]
    fn test_empty_aspect_matches_everything() {
        assert!(Aspect::new().matches(KindMask::EMPTY));
        assert!(Aspect::default().matches(KindMask::single(Color::KIND)));
    }

    #[test]
    fn test_aspects_compare_by_value() {
        let a = Aspect::all_of(&[Velocity::KIND, Position::KIND]);
        let b = Aspect::new()
            .with::<Components, Position>()
            .with::<Components, Velocity>();
        assert_eq!(a, b);
        assert_ne!(a, a.exclude(Color::KIND));
    }

    #[test]
    fn test_unsatisfiable() {
        let aspect = Aspect::all_of(&[Position::KIND]).exclude(Position::KIND);
        assert!(aspect.is_unsatisfiable());
        assert!(!aspect.matches(KindMask::single(Position::KIND)));
    }

    #[test]
    fn test_wide_tag_is_remembered() {
        let wide = ComponentKind::new(70);
        assert_eq!(Aspect::all_of(&[wide]).out_of_range(), Some(wide));
        assert_eq!(
            Aspect::new().with::<Components, Position>().exclude(wide).out_of_range(),
            Some(wide)
        );
        assert_eq!(Aspect::all_of(&[Position::KIND]).out_of_range(), None);
        assert_ne!(Aspect::all_of(&[wide]), Aspect::new());
    }
}
