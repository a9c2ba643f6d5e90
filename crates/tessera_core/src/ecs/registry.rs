//! # Component Registry
//!
//! Validated view of the host's kind table. Built once per engine from
//! [`ComponentSet::KINDS`]; the kernel never adds kinds at runtime.

use super::component::{ComponentKind, ComponentSet, KindMask, MAX_KINDS};
use crate::error::{EcsError, EcsResult};

/// The closed set of component kinds known to an engine.
#[derive(Clone, Debug)]
pub struct ComponentRegistry {
    /// Every registered kind.
    mask: KindMask,
    /// Names indexed by tag.
    names: [Option<&'static str>; MAX_KINDS],
    /// One past the highest registered tag. Per-entity rows use this width.
    width: usize,
}

impl ComponentRegistry {
    /// Builds the registry for a component enumeration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidRegistry`] if a tag is repeated or does not
    /// fit in a [`KindMask`].
    pub fn from_set<S: ComponentSet>() -> EcsResult<Self> {
        let mut mask = KindMask::EMPTY;
        let mut names = [None; MAX_KINDS];
        let mut width = 0;

        for info in S::KINDS {
            let index = info.kind.index();
            if index >= MAX_KINDS {
                return Err(EcsError::InvalidRegistry(format!(
                    "`{}` uses tag {index}, tags must be below {MAX_KINDS}",
                    info.name
                )));
            }
            if mask.contains(info.kind) {
                return Err(EcsError::InvalidRegistry(format!(
                    "`{}` reuses tag {index}",
                    info.name
                )));
            }
            mask = mask.with(info.kind);
            names[index] = Some(info.name);
            width = width.max(index + 1);
        }

        Ok(Self { mask, names, width })
    }

    /// Returns the small integer tag of a kind.
    #[inline]
    #[must_use]
    pub const fn tag(kind: ComponentKind) -> u8 {
        kind.tag()
    }

    /// Checks whether the kind is part of the enumeration.
    #[inline]
    #[must_use]
    pub const fn contains(&self, kind: ComponentKind) -> bool {
        self.mask.contains(kind)
    }

    /// Fails with [`EcsError::UnknownKind`] if the kind is not registered.
    ///
    /// # Errors
    ///
    /// See above.
    #[inline]
    pub fn check(&self, kind: ComponentKind) -> EcsResult<()> {
        if self.contains(kind) {
            Ok(())
        } else {
            Err(EcsError::UnknownKind(kind))
        }
    }

    /// Fails with [`EcsError::UnknownKind`] for the first unregistered kind
    /// in `mask`.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn check_mask(&self, mask: KindMask) -> EcsResult<()> {
        match mask.iter().find(|&kind| !self.contains(kind)) {
            Some(kind) => Err(EcsError::UnknownKind(kind)),
            None => Ok(()),
        }
    }

    /// Returns the declared name of a kind.
    #[must_use]
    pub fn name(&self, kind: ComponentKind) -> Option<&'static str> {
        self.names.get(kind.index()).copied().flatten()
    }

    /// Every registered kind.
    #[inline]
    #[must_use]
    pub const fn kinds(&self) -> KindMask {
        self.mask
    }

    /// Number of registered kinds.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.mask.len()
    }

    /// Checks if the enumeration is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// Width of a per-entity row (highest tag + 1).
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Iterates over `(kind, name)` pairs in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentKind, &'static str)> + '_ {
        self.mask
            .iter()
            .filter_map(|kind| self.name(kind).map(|name| (kind, name)))
    }
}
