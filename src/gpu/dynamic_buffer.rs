//! Growable typed GPU buffers.
//!
//! Per-frame instance data changes length with the scene (tendon beads,
//! selection), so buffers grow geometrically and never shrink.

use std::marker::PhantomData;

/// Smallest allocation in elements.
const MIN_CAPACITY: usize = 16;

/// Capacity after growing from `current` to hold `needed` elements.
#[must_use]
pub fn grown_capacity(current: usize, needed: usize) -> usize {
    if needed <= current {
        return current;
    }
    needed.max(current * 2).max(MIN_CAPACITY)
}

/// A GPU buffer of `T` that reallocates when a write exceeds its capacity.
pub struct DynamicBuffer<T> {
    buffer: wgpu::Buffer,
    capacity: usize,
    len: usize,
    usage: wgpu::BufferUsages,
    label: String,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> DynamicBuffer<T> {
    /// Empty buffer with room for `capacity` elements.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let capacity = capacity.max(MIN_CAPACITY);
        Self {
            buffer: Self::allocate(device, label, capacity, usage),
            capacity,
            len: 0,
            usage,
            label: label.to_owned(),
            _marker: PhantomData,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        label: &str,
        capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity * size_of::<T>()) as u64,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Replace the contents with `data`, growing if necessary. Returns
    /// `true` if the buffer was reallocated (bind groups need recreation).
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[T]) -> bool {
        let capacity = grown_capacity(self.capacity, data.len());
        let reallocated = capacity != self.capacity;
        if reallocated {
            log::debug!("{}: growing to {capacity} elements", self.label);
            self.buffer = Self::allocate(device, &self.label, capacity, self.usage);
            self.capacity = capacity;
        }
        if !data.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(data));
        }
        self.len = data.len();
        reallocated
    }

    /// The underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Elements written by the last [`write`](Self::write).
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the last write was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated elements.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_is_geometric_with_floor() {
        assert_eq!(grown_capacity(16, 10), 16);
        assert_eq!(grown_capacity(16, 17), 32);
        assert_eq!(grown_capacity(16, 100), 100);
        assert_eq!(grown_capacity(0, 1), MIN_CAPACITY);
    }
}
