//! Entity handles (spec §3 "Entity handle").
//!
//! A handle packs a 16-bit id (low bits) and a 16-bit generation (high bits)
//! into a single `u32`, mirroring the teacher's `Id`/`Entity` packing but at
//! half the width, per spec's default id/generation widths (spec §6).

use std::fmt;

use crate::config::ID_NONE;

/// A 32-bit entity handle: `(generation: u16, id: u16)`.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(u32);

#[cfg(feature = "serde")]
impl serde::Serialize for Entity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Entity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Entity(u32::deserialize(deserializer)?))
    }
}

impl Entity {
    /// Reserved handle meaning "invalid" / "no entity" (id and generation both all-ones).
    pub const INVALID: Entity = Entity(u32::MAX);

    /// Reserved id meaning "no entity" / terminates the allocator free-list.
    pub const ID_NONE: u16 = ID_NONE;

    #[inline]
    pub const fn from_parts(id: u16, generation: u16) -> Self {
        Entity(((generation as u32) << 16) | id as u32)
    }

    #[inline]
    pub(crate) const fn from_bits(bits: u32) -> Self {
        Entity(bits)
    }

    #[inline]
    pub(crate) const fn to_bits(self) -> u32 {
        self.0
    }

    /// The low 16 bits: the index into the entity table.
    #[inline]
    pub const fn id(self) -> u16 {
        self.0 as u16
    }

    /// The high 16 bits: the generation of the occupant currently at `id()`.
    #[inline]
    pub const fn generation(self) -> u16 {
        (self.0 >> 16) as u16
    }

    #[inline]
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID.0
    }
}

impl Default for Entity {
    fn default() -> Self {
        Entity::INVALID
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}, gen {})", self.id(), self.generation())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.id(), self.generation())
    }
}
