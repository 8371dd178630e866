use num_traits::{One, PrimInt};

/// An enum whose discriminant is its bit index inside a mask of `Storage` bits.
pub trait LayerBit: Copy {
    type Storage: PrimInt;

    fn index(self) -> u8;

    fn bit(self) -> Self::Storage {
        // `index()` must stay below the bit width of `Storage`.
        Self::Storage::one() << usize::from(self.index())
    }
}

/// Set of layers, one bit per layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Mask<T: PrimInt> {
    bits: T,
}

impl<T: PrimInt> Default for Mask<T> {
    fn default() -> Self {
        Self { bits: T::zero() }
    }
}

impl<T: PrimInt> Mask<T> {
    pub fn of<L: LayerBit<Storage = T>>(layers: &[L]) -> Self {
        layers.iter().fold(Self::default(), |mask, &layer| mask.with(layer))
    }

    #[must_use]
    pub fn with<L: LayerBit<Storage = T>>(self, layer: L) -> Self {
        Self {
            bits: self.bits | layer.bit(),
        }
    }

    /// Does this mask accept a collider living on `layer`?
    #[inline]
    pub fn accepts<L: LayerBit<Storage = T>>(&self, layer: L) -> bool {
        (self.bits & layer.bit()) != T::zero()
    }

    #[inline]
    pub fn bits(&self) -> T {
        self.bits
    }
}

/// Physics layers a collider lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CollisionLayer {
    Ground,
    Wall,
    Kart,
    Trigger,
}

impl LayerBit for CollisionLayer {
    type Storage = u32;

    fn index(self) -> u8 {
        self as u8
    }
}

pub type LayerMask = Mask<u32>;

/// Layers the kart can drive on.
pub fn ground_layers() -> LayerMask {
    LayerMask::of(&[CollisionLayer::Ground])
}

/// Layers the kart collides with. Includes the ground layers.
pub fn colliding_layers() -> LayerMask {
    ground_layers()
        .with(CollisionLayer::Wall)
        .with(CollisionLayer::Kart)
        .with(CollisionLayer::Trigger)
}

/// Layers holding trigger volumes (checkpoints, zones).
pub fn trigger_layers() -> LayerMask {
    LayerMask::of(&[CollisionLayer::Trigger])
}
