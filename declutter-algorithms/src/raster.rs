/// A dense 2D array stored in row-major order. Every per-cell layer of the grid
/// (heights, counts, masks) uses this type so that no stage allocates per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

/// Height values per cell. `None` marks an empty cell.
pub type HeightLayer = Raster<Option<f64>>;

/// Boolean flag per cell.
pub type CellMask = Raster<bool>;

impl<T: Clone> Raster<T> {
    /// Creates a new raster of `width` columns and `height` rows with every cell set to `value`
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }
}

impl<T> Raster<T> {
    /// Creates a raster from existing row-major data
    ///
    /// # Panics
    ///
    /// If `data.len()` is not `width * height`
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "Raster data does not match its dimensions"
        );
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index of the cell at (`col`, `row`)
    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.width + col
    }

    /// Inverse of [`Raster::index`]
    pub fn col_row(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    pub fn at(&self, col: usize, row: usize) -> &T {
        &self.data[row * self.width + col]
    }

    pub fn at_mut(&mut self, col: usize, row: usize) -> &mut T {
        &mut self.data[row * self.width + col]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Returns `true` if this raster has the same dimensions as `other`
    pub fn same_shape<U>(&self, other: &Raster<U>) -> bool {
        self.width == other.width && self.height == other.height
    }
}

impl CellMask {
    /// Number of set cells
    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|flag| **flag).count()
    }

    /// Flat indices of all set cells in row-major order
    pub fn set_indices(&self) -> Vec<usize> {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(index, flag)| if *flag { Some(index) } else { None })
            .collect()
    }

    /// Logical OR with `other`, in place
    ///
    /// # Panics
    ///
    /// If both masks differ in shape
    pub fn union_with(&mut self, other: &CellMask) {
        assert!(self.same_shape(other), "Masks must have the same shape");
        for (dst, src) in self.data.iter_mut().zip(other.data.iter()) {
            *dst |= *src;
        }
    }
}
