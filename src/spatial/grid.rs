//! Dense generic grid addressed by cell coordinates

use crate::core::types::CellKey;

/// Generic 2D grid covering `(0,0)..(width,height)`
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T: Clone + Default> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }

    /// Grid with every cell set to `value`
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn contains(&self, cell: CellKey) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    #[inline]
    fn index_of(&self, cell: CellKey) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.y as usize * self.width + cell.x as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn get(&self, cell: CellKey) -> Option<&T> {
        self.index_of(cell).map(|i| &self.data[i])
    }

    #[inline]
    pub fn get_mut(&mut self, cell: CellKey) -> Option<&mut T> {
        match self.index_of(cell) {
            Some(i) => Some(&mut self.data[i]),
            None => None,
        }
    }

    /// Write a cell; out-of-bounds writes are ignored
    #[inline]
    pub fn set(&mut self, cell: CellKey, value: T) {
        if let Some(i) = self.index_of(cell) {
            self.data[i] = value;
        }
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate `(cell, value)` in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (CellKey, &T)> + '_ {
        let width = self.width;
        self.data.iter().enumerate().map(move |(i, v)| {
            (CellKey::new((i % width) as i32, (i / width) as i32), v)
        })
    }

    /// Iterate all values in row-major order
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.data.iter()
    }
}
