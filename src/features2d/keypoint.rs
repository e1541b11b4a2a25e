use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Descriptor length in bytes: 4x4 spatial cells times 8 orientation bins
pub const SIFT_DESC_DIM: usize = 128;

/// Scale-space feature point
///
/// `x`/`y` are the integer pixel location and `xs`/`ys` the sub-pixel location,
/// both in the coordinate frame of the pyramid level that produced the point.
/// `scale` is the linear factor back to input-image coordinates, `sigma` the
/// absolute amount of Gaussian blur at the detection scale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Keypoint {
    pub x: i32,
    pub y: i32,
    pub xs: f32,
    pub ys: f32,
    pub octave: i32,
    pub scale: f32,
    pub sigma: f32,
    pub response: f32,
    pub ori: f32,
    pub id: u64,
}

impl Keypoint {
    /// Sub-pixel x in input-image coordinates
    #[must_use]
    pub fn xs0(&self) -> f32 {
        self.xs * self.scale
    }

    /// Sub-pixel y in input-image coordinates
    #[must_use]
    pub fn ys0(&self) -> f32 {
        self.ys * self.scale
    }
}

/// Jointly owned keypoint and descriptor buffers
///
/// Descriptors live in a single contiguous byte buffer in keypoint order so
/// the matcher walks them linearly. Capacity grows geometrically (factor 1.6)
/// and is never given back.
#[derive(Debug, Clone, Default)]
pub struct KeypointStore {
    keys: Vec<Keypoint>,
    desc: Vec<u8>,
}

const STORE_GROWTH_FACTOR: f32 = 1.6;
const STORE_MIN_CAPACITY: usize = 16;

impl KeypointStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Drop all keypoints but keep the allocations
    pub fn clear(&mut self) {
        self.keys.clear();
        self.desc.clear();
    }

    /// Append a zeroed keypoint/descriptor slot and return its index
    pub fn append(&mut self) -> usize {
        if self.keys.len() == self.keys.capacity() {
            let new_cap = ((self.keys.capacity() as f32 * STORE_GROWTH_FACTOR) as usize)
                .max(STORE_MIN_CAPACITY);
            self.keys.reserve_exact(new_cap - self.keys.len());
            self.desc
                .reserve_exact(new_cap * SIFT_DESC_DIM - self.desc.len());
        }

        let id = self.keys.len();
        self.keys.push(Keypoint::default());
        self.desc.extend_from_slice(&[0u8; SIFT_DESC_DIM]);
        id
    }

    #[must_use]
    pub fn keypoint(&self, id: usize) -> &Keypoint {
        &self.keys[id]
    }

    pub fn keypoint_mut(&mut self, id: usize) -> &mut Keypoint {
        &mut self.keys[id]
    }

    #[must_use]
    pub fn descriptor(&self, id: usize) -> &[u8] {
        &self.desc[id * SIFT_DESC_DIM..(id + 1) * SIFT_DESC_DIM]
    }

    pub fn descriptor_mut(&mut self, id: usize) -> &mut [u8] {
        &mut self.desc[id * SIFT_DESC_DIM..(id + 1) * SIFT_DESC_DIM]
    }

    #[must_use]
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keys
    }

    #[must_use]
    pub fn descriptors(&self) -> &[u8] {
        &self.desc
    }

    /// Write count-prefixed little-endian records, descriptor bytes following
    /// each keypoint
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u32::<LittleEndian>(self.keys.len() as u32)?;
        for (i, k) in self.keys.iter().enumerate() {
            w.write_i32::<LittleEndian>(k.x)?;
            w.write_i32::<LittleEndian>(k.y)?;
            w.write_f32::<LittleEndian>(k.xs)?;
            w.write_f32::<LittleEndian>(k.ys)?;
            w.write_i32::<LittleEndian>(k.octave)?;
            w.write_f32::<LittleEndian>(k.scale)?;
            w.write_f32::<LittleEndian>(k.sigma)?;
            w.write_f32::<LittleEndian>(k.response)?;
            w.write_f32::<LittleEndian>(k.ori)?;
            w.write_u64::<LittleEndian>(k.id)?;
            w.write_all(self.descriptor(i))?;
        }
        Ok(())
    }

    /// Read records produced by `write_to`
    pub fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        let n = r.read_u32::<LittleEndian>()? as usize;
        let mut store = Self::new();
        for _ in 0..n {
            let id = store.append();
            let k = Keypoint {
                x: r.read_i32::<LittleEndian>()?,
                y: r.read_i32::<LittleEndian>()?,
                xs: r.read_f32::<LittleEndian>()?,
                ys: r.read_f32::<LittleEndian>()?,
                octave: r.read_i32::<LittleEndian>()?,
                scale: r.read_f32::<LittleEndian>()?,
                sigma: r.read_f32::<LittleEndian>()?,
                response: r.read_f32::<LittleEndian>()?,
                ori: r.read_f32::<LittleEndian>()?,
                id: r.read_u64::<LittleEndian>()?,
            };
            *store.keypoint_mut(id) = k;
            r.read_exact(store.descriptor_mut(id))?;
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_monotone_ids() {
        let mut store = KeypointStore::new();
        for expected in 0..100 {
            assert_eq!(store.append(), expected);
        }
        assert_eq!(store.len(), 100);
        assert_eq!(store.descriptors().len(), 100 * SIFT_DESC_DIM);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut store = KeypointStore::new();
        for _ in 0..50 {
            store.append();
        }
        let cap = store.keys.capacity();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.keys.capacity(), cap);
    }

    #[test]
    fn test_descriptor_slots_are_disjoint() {
        let mut store = KeypointStore::new();
        let a = store.append();
        let b = store.append();
        store.descriptor_mut(a)[0] = 11;
        store.descriptor_mut(b)[0] = 22;
        assert_eq!(store.descriptor(a)[0], 11);
        assert_eq!(store.descriptor(b)[0], 22);
    }

    #[test]
    fn test_wire_roundtrip() {
        let mut store = KeypointStore::new();
        for i in 0..5u64 {
            let id = store.append();
            *store.keypoint_mut(id) = Keypoint {
                x: i as i32,
                y: -(i as i32),
                xs: i as f32 + 0.25,
                ys: i as f32 - 0.25,
                octave: (i as i32) - 1,
                scale: 2.0f32.powi(i as i32 - 1),
                sigma: 1.6 * (i + 1) as f32,
                response: 0.01 * i as f32,
                ori: 0.1 * i as f32,
                id: i,
            };
            store.descriptor_mut(id)[i as usize] = 0xA5;
        }

        let mut buf = Vec::new();
        store.write_to(&mut buf).unwrap();
        let restored = KeypointStore::read_from(&mut buf.as_slice()).unwrap();

        assert_eq!(restored.len(), store.len());
        assert_eq!(restored.keypoints(), store.keypoints());
        assert_eq!(restored.descriptors(), store.descriptors());
    }
}
