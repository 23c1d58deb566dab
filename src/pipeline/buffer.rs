//! Fixed-capacity point buffer, the unit of data movement between stages.
//!
//! A `PointBuffer` is allocated once by the execution caller against a
//! [`SchemaLayout`] and a capacity, then refilled in place on every pull.
//! Refilling only resets the point count; the backing store is never
//! reallocated.

use crate::pipeline::schema::{Schema, SchemaLayout};

pub struct PointBuffer {
    layout: SchemaLayout,
    capacity: u32,
    len: u32,
    data: Vec<u8>,
}

impl PointBuffer {
    /// Allocate a zeroed buffer for `capacity` points.
    pub fn new(layout: SchemaLayout, capacity: u32) -> Self {
        let data = vec![0u8; layout.point_size() * capacity as usize];
        Self {
            layout,
            capacity,
            len: 0,
            data,
        }
    }

    pub fn layout(&self) -> &SchemaLayout {
        &self.layout
    }

    pub fn schema(&self) -> &Schema {
        self.layout.schema()
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of valid points.
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Reset for reuse (resets the count only, no zeroing).
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Set the number of valid points. Returns `false` if `len > capacity`.
    pub fn set_len(&mut self, len: u32) -> bool {
        if len > self.capacity {
            return false;
        }
        self.len = len;
        true
    }

    /// Raw record bytes of point `index` (valid or not, within capacity).
    pub fn point_bytes(&self, index: u32) -> Option<&[u8]> {
        if index >= self.capacity {
            return None;
        }
        let size = self.layout.point_size();
        let start = index as usize * size;
        Some(&self.data[start..start + size])
    }

    fn point_bytes_mut(&mut self, index: u32) -> Option<&mut [u8]> {
        if index >= self.capacity {
            return None;
        }
        let size = self.layout.point_size();
        let start = index as usize * size;
        Some(&mut self.data[start..start + size])
    }

    /// Value of dimension `dim` of point `index`, converted to f64.
    pub fn get_f64(&self, index: u32, dim: usize) -> Option<f64> {
        let offset = self.layout.offset(dim)?;
        let data_type = self.layout.data_type(dim)?;
        let record = self.point_bytes(index)?;
        data_type.decode_f64(&record[offset..])
    }

    /// Store `value` into dimension `dim` of point `index`.
    ///
    /// Writing beyond `len` is allowed (up to capacity); call
    /// [`PointBuffer::set_len`] afterwards to publish the points.
    pub fn set_f64(&mut self, index: u32, dim: usize, value: f64) -> bool {
        let (Some(offset), Some(data_type)) = (self.layout.offset(dim), self.layout.data_type(dim))
        else {
            return false;
        };
        match self.point_bytes_mut(index) {
            Some(record) => data_type.encode_f64(value, &mut record[offset..]),
            None => false,
        }
    }

    /// Value of the dimension called `name` of point `index`.
    pub fn get_by_name(&self, index: u32, name: &str) -> Option<f64> {
        self.get_f64(index, self.layout.index_of(name)?)
    }

    /// Copy point `src_index` of `src` into slot `dst_index` of `self`.
    ///
    /// Identical layouts copy the raw record; otherwise dimensions are
    /// matched by name and dimensions missing from `src` are zeroed.
    pub fn copy_point_from(&mut self, dst_index: u32, src: &PointBuffer, src_index: u32) -> bool {
        if dst_index >= self.capacity || src_index >= src.capacity {
            return false;
        }

        if self.layout == src.layout {
            let size = self.layout.point_size();
            let dst = dst_index as usize * size;
            let from = src_index as usize * size;
            self.data[dst..dst + size].copy_from_slice(&src.data[from..from + size]);
            return true;
        }

        for dim in 0..self.layout.schema().len() {
            let name = &self.layout.schema().dimensions()[dim].name;
            let value = src
                .layout
                .index_of(name)
                .and_then(|src_dim| src.get_f64(src_index, src_dim))
                .unwrap_or(0.0);
            self.set_f64(dst_index, dim, value);
        }
        true
    }

    /// Append point `src_index` of `src`. Returns `false` if full.
    #[inline]
    pub fn push_from(&mut self, src: &PointBuffer, src_index: u32) -> bool {
        if self.is_full() {
            return false;
        }
        if !self.copy_point_from(self.len, src, src_index) {
            return false;
        }
        self.len += 1;
        true
    }
}

impl std::fmt::Debug for PointBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointBuffer")
            .field("dimensions", &self.layout.schema().len())
            .field("capacity", &self.capacity)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::schema::Dimension;
    use crate::types::DataType;

    fn xyz_buffer(capacity: u32) -> PointBuffer {
        PointBuffer::new(SchemaLayout::new(&Schema::xyz()), capacity)
    }

    #[test]
    fn test_buffer_allocation() {
        let buf = xyz_buffer(16);
        assert_eq!(buf.capacity(), 16);
        assert!(buf.is_empty());
        assert_eq!(buf.point_bytes(15).map(|b| b.len()), Some(24));
        assert!(buf.point_bytes(16).is_none());
    }

    #[test]
    fn test_set_and_get() {
        let mut buf = xyz_buffer(4);
        assert!(buf.set_f64(2, 1, 42.5));
        assert!(buf.set_len(3));
        assert_eq!(buf.get_f64(2, 1), Some(42.5));
        assert_eq!(buf.get_by_name(2, "Y"), Some(42.5));
        assert!(!buf.set_f64(4, 0, 1.0));
        assert!(!buf.set_f64(0, 3, 1.0));
    }

    #[test]
    fn test_set_len_bounded_by_capacity() {
        let mut buf = xyz_buffer(2);
        assert!(!buf.set_len(3));
        assert!(buf.set_len(2));
        assert!(buf.is_full());
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 2);
    }

    #[test]
    fn test_push_from_same_layout() {
        let mut src = xyz_buffer(2);
        src.set_f64(0, 0, 1.0);
        src.set_f64(0, 2, 3.0);
        src.set_len(1);

        let mut dst = xyz_buffer(1);
        assert!(dst.push_from(&src, 0));
        assert!(!dst.push_from(&src, 0));
        assert_eq!(dst.get_f64(0, 0), Some(1.0));
        assert_eq!(dst.get_f64(0, 2), Some(3.0));
    }

    #[test]
    fn test_copy_point_maps_by_name() {
        let mut src = xyz_buffer(1);
        src.set_f64(0, 0, 10.0);
        src.set_f64(0, 1, 20.0);
        src.set_len(1);

        let other = Schema::with_dimensions([
            Dimension::named("Y", DataType::Int32),
            Dimension::named("Intensity", DataType::Uint16),
        ]);
        let mut dst = PointBuffer::new(SchemaLayout::new(&other), 1);
        assert!(dst.push_from(&src, 0));
        assert_eq!(dst.get_f64(0, 0), Some(20.0));
        assert_eq!(dst.get_f64(0, 1), Some(0.0));
    }
}
