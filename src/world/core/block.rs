//! `BlockId` and `BlockState`: the 16-bit type identifier and the packed
//! 4-byte per-voxel state built from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a block type. `0` is reserved for `Air`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BlockId(pub u16);

// Safe because BlockId is just a u16.
unsafe impl bytemuck::Pod for BlockId {}
unsafe impl bytemuck::Zeroable for BlockId {}

impl BlockId {
    pub const AIR: BlockId = BlockId(0);

    pub const fn new(id: u16) -> Self {
        BlockId(id)
    }

    pub const fn is_air(self) -> bool {
        self.0 == 0
    }
}

impl Default for BlockId {
    fn default() -> Self {
        BlockId::AIR
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_air() {
            write!(f, "Air")
        } else {
            write!(f, "Block({})", self.0)
        }
    }
}

/// Render layer a block's opaque mesh data is sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderLayer {
    Opaque,
    Cutout,
    Transparent,
    Emissive,
}

/// Packed per-voxel state: type id plus metadata and light levels.
///
/// Bit layout within the 4 bytes: `id` (u16), `metadata` (u8),
/// `skyLight` in the low nibble of the light byte, `blockLight` in the high nibble.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    pub id: BlockId,
    pub metadata: u8,
    light: u8,
}

unsafe impl bytemuck::Pod for BlockState {}
unsafe impl bytemuck::Zeroable for BlockState {}

impl BlockState {
    pub const AIR: BlockState = BlockState {
        id: BlockId::AIR,
        metadata: 0,
        light: 0,
    };

    pub fn new(id: BlockId, metadata: u8, sky_light: u8, block_light: u8) -> Self {
        Self {
            id,
            metadata,
            light: (sky_light.min(15)) | (block_light.min(15) << 4),
        }
    }

    pub const fn is_air(&self) -> bool {
        self.id.0 == 0
    }

    pub fn sky_light(&self) -> u8 {
        self.light & 0x0F
    }

    pub fn block_light(&self) -> u8 {
        (self.light >> 4) & 0x0F
    }

    pub fn set_sky_light(&mut self, level: u8) {
        self.light = (self.light & 0xF0) | (level.min(15));
    }

    pub fn set_block_light(&mut self, level: u8) {
        self.light = (self.light & 0x0F) | (level.min(15) << 4);
    }
}

impl Default for BlockState {
    fn default() -> Self {
        BlockState::AIR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_air_default() {
        assert!(BlockState::default().is_air());
    }

    #[test]
    fn packs_lights_into_one_byte() {
        let mut s = BlockState::new(BlockId::new(5), 0, 3, 9);
        assert_eq!(s.sky_light(), 3);
        assert_eq!(s.block_light(), 9);
        s.set_sky_light(15);
        assert_eq!(s.sky_light(), 15);
        assert_eq!(s.block_light(), 9);
    }

    #[test]
    fn pod_size_is_four_bytes() {
        assert_eq!(std::mem::size_of::<BlockState>(), 4);
    }
}
