/// A dense 2D raster grid on a flat plane (no wrapping on either axis).
///
/// Cells are stored row-major, `index = y * width + x`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Tilemap<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }
}

impl<T: Clone> Tilemap<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Wrap an existing row-major buffer. Returns `None` if the length does not
    /// match `width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self { width, height, data })
    }

    /// Row-major index of `(x, y)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    #[inline]
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.index(x, y);
        &mut self.data[idx]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Fill the entire map with a value.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// In-bounds 8-connected neighbours. Edges are clamped, never wrapped.
    pub fn neighbors_8(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let mut result = Vec::with_capacity(8);

        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if self.in_bounds(nx, ny) {
                    result.push((nx as usize, ny as usize));
                }
            }
        }

        result
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width;
        self.data.iter().enumerate().map(move |(idx, val)| {
            (idx % width, idx / width, val)
        })
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut T)> {
        let width = self.width;
        self.data.iter_mut().enumerate().map(move |(idx, val)| {
            (idx % width, idx / width, val)
        })
    }
}

impl Tilemap<f32> {
    /// Minimum and maximum value over the whole map, `None` when empty.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        let mut iter = self.data.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// One pass of a 3x3 box blur. Edge cells average only their in-bounds
    /// neighbours.
    pub fn box_blur(&self) -> Self {
        let mut result = Tilemap::new_with(self.width, self.height, 0.0f32);

        for y in 0..self.height {
            for x in 0..self.width {
                let mut sum = *self.get(x, y);
                let mut count = 1.0f32;
                for (nx, ny) in self.neighbors_8(x, y) {
                    sum += *self.get(nx, ny);
                    count += 1.0;
                }
                result.set(x, y, sum / count);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_wrapping_neighbors() {
        let map: Tilemap<u8> = Tilemap::new(4, 3);
        assert_eq!(map.neighbors_8(0, 0).len(), 3);
        assert_eq!(map.neighbors_8(3, 2).len(), 3);
        assert_eq!(map.neighbors_8(1, 1).len(), 8);
        assert!(!map.neighbors_8(0, 1).contains(&(3, 1)), "left edge must not wrap");
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        assert!(Tilemap::from_vec(2, 2, vec![0u8; 3]).is_none());
        let map = Tilemap::from_vec(2, 2, vec![1u8, 2, 3, 4]).unwrap();
        assert_eq!(*map.get(1, 1), 4);
        assert_eq!(map.index(1, 1), 3);
    }

    #[test]
    fn test_box_blur_edges_average_in_bounds_only() {
        let mut map = Tilemap::new_with(3, 3, 0.0f32);
        map.set(0, 0, 9.0);
        let blurred = map.box_blur();
        // Corner sees itself + 3 neighbours.
        assert!((blurred.get(0, 0) - 9.0 / 4.0).abs() < 1e-6);
        // Centre sees all 9 cells.
        assert!((blurred.get(1, 1) - 1.0).abs() < 1e-6);
        // Far corner does not see (0, 0).
        assert_eq!(*blurred.get(2, 2), 0.0);
    }

    #[test]
    fn test_value_range() {
        let map = Tilemap::from_vec(2, 1, vec![-1.0f32, 3.5]).unwrap();
        assert_eq!(map.value_range(), Some((-1.0, 3.5)));
        let empty: Tilemap<f32> = Tilemap::new(0, 0);
        assert_eq!(empty.value_range(), None);
    }
}
