use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use super::ComponentKind;

/// Bitset of component kinds. Bit `k` set means "has the component whose
/// kind index is `k`". Wide enough for every [`ComponentKind`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Signature(u128);

impl Signature {
    pub const EMPTY: Signature = Signature(0);

    /// Builds a signature out of the listed kinds.
    pub fn of(kinds: &[ComponentKind]) -> Self {
        let mut signature = Signature::EMPTY;
        for &kind in kinds {
            signature.insert(kind);
        }
        signature
    }

    #[inline]
    pub fn insert(&mut self, kind: ComponentKind) {
        self.0 |= 1u128 << kind.index();
    }

    #[inline]
    pub fn remove(&mut self, kind: ComponentKind) {
        self.0 &= !(1u128 << kind.index());
    }

    #[inline]
    pub fn contains_kind(&self, kind: ComponentKind) -> bool {
        self.0 & (1u128 << kind.index()) != 0
    }

    /// Whether every bit of `required` is present in `self`.
    #[inline]
    pub fn contains_all(&self, required: Signature) -> bool {
        self.0 & required.0 == required.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

impl BitOr for Signature {
    type Output = Signature;

    fn bitor(self, rhs: Signature) -> Signature {
        Signature(self.0 | rhs.0)
    }
}

impl BitOrAssign for Signature {
    fn bitor_assign(&mut self, rhs: Signature) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Signature {
    type Output = Signature;

    fn bitand(self, rhs: Signature) -> Signature {
        Signature(self.0 & rhs.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:#034x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_contains() {
        let mut sig = Signature::EMPTY;
        sig.insert(ComponentKind::Transform);
        sig.insert(ComponentKind::Velocity);
        assert!(sig.contains_kind(ComponentKind::Transform));
        assert!(!sig.contains_kind(ComponentKind::Health));
        sig.remove(ComponentKind::Transform);
        assert!(!sig.contains_kind(ComponentKind::Transform));
        assert!(sig.contains_kind(ComponentKind::Velocity));
    }

    #[test]
    fn contains_all_is_superset_test() {
        let entity = Signature::of(&[
            ComponentKind::Transform,
            ComponentKind::Velocity,
            ComponentKind::Health,
        ]);
        let required = Signature::of(&[ComponentKind::Transform, ComponentKind::Velocity]);
        assert!(entity.contains_all(required));
        assert!(!required.contains_all(entity));
        assert!(entity.contains_all(Signature::EMPTY));
    }
}
