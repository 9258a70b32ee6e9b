//! Dense N-dimensional fields and label images.
//!
//! `FieldView` is a borrowed, row-major view of a per-position field with a
//! trailing channel axis: a probability map has one channel, a distance map has
//! `n_rays`, a class-probability map has one channel per class. The view never
//! copies; candidates index into it by flat position.

use crate::util::{StarConvexError, StarConvexResult};

/// Borrowed row-major field of `D` spatial axes plus a channel axis.
#[derive(Copy, Clone, Debug)]
pub struct FieldView<'a, T, const D: usize> {
    data: &'a [T],
    shape: [usize; D],
    channels: usize,
}

impl<'a, T, const D: usize> FieldView<'a, T, D> {
    /// Creates a single-channel view.
    pub fn scalar(data: &'a [T], shape: [usize; D]) -> StarConvexResult<Self> {
        Self::new(data, shape, 1)
    }

    /// Creates a view with `channels` values per spatial position.
    pub fn new(data: &'a [T], shape: [usize; D], channels: usize) -> StarConvexResult<Self> {
        let positions = num_positions(shape)?;
        if channels == 0 {
            return Err(StarConvexError::InvalidInput("channel count must be >= 1"));
        }
        let needed = positions
            .checked_mul(channels)
            .ok_or_else(|| StarConvexError::InvalidDimensions {
                shape: shape.to_vec(),
            })?;
        if data.len() < needed {
            return Err(StarConvexError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data: &data[..needed],
            shape,
            channels,
        })
    }

    /// Returns the spatial shape.
    pub fn shape(&self) -> [usize; D] {
        self.shape
    }

    /// Returns the number of values stored per position.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the number of spatial positions.
    pub fn len(&self) -> usize {
        self.data.len() / self.channels
    }

    /// Returns true if the view has no positions.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the backing slice.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the channel values at a flat position.
    pub fn at(&self, flat: usize) -> Option<&'a [T]> {
        let start = flat.checked_mul(self.channels)?;
        self.data.get(start..start + self.channels)
    }

    /// Returns the channel values at a spatial position.
    pub fn get(&self, pos: [usize; D]) -> Option<&'a [T]> {
        self.at(ravel(self.shape, pos)?)
    }
}

/// Owned integer label image: `0` is background, positive ids are objects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelImage<const D: usize> {
    data: Vec<i32>,
    shape: [usize; D],
}

impl<const D: usize> LabelImage<D> {
    /// Creates an all-background label image.
    pub fn zeros(shape: [usize; D]) -> StarConvexResult<Self> {
        let len = num_positions(shape)?;
        Ok(Self {
            data: vec![0; len],
            shape,
        })
    }

    /// Returns the spatial shape.
    pub fn shape(&self) -> [usize; D] {
        self.shape
    }

    /// Returns the labels in row-major order.
    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [i32] {
        &mut self.data
    }

    /// Returns the label at a spatial position.
    pub fn get(&self, pos: [usize; D]) -> Option<i32> {
        ravel(self.shape, pos).and_then(|idx| self.data.get(idx).copied())
    }

    /// Returns a borrowed single-channel view.
    pub fn view(&self) -> FieldView<'_, i32, D> {
        FieldView {
            data: &self.data,
            shape: self.shape,
            channels: 1,
        }
    }

    /// Consumes the image and returns the row-major buffer.
    pub fn into_vec(self) -> Vec<i32> {
        self.data
    }
}

/// Number of positions in `shape`, rejecting empty axes and overflow.
pub(crate) fn num_positions<const D: usize>(shape: [usize; D]) -> StarConvexResult<usize> {
    let mut count = 1usize;
    for &extent in shape.iter() {
        if extent == 0 {
            return Err(StarConvexError::InvalidDimensions {
                shape: shape.to_vec(),
            });
        }
        count = count
            .checked_mul(extent)
            .ok_or_else(|| StarConvexError::InvalidDimensions {
                shape: shape.to_vec(),
            })?;
    }
    Ok(count)
}

/// Row-major flat index of `pos`, or `None` when outside `shape`.
pub(crate) fn ravel<const D: usize>(shape: [usize; D], pos: [usize; D]) -> Option<usize> {
    let mut idx = 0usize;
    for axis in 0..D {
        if pos[axis] >= shape[axis] {
            return None;
        }
        idx = idx * shape[axis] + pos[axis];
    }
    Some(idx)
}

/// Inverse of [`ravel`] for an in-bounds flat index.
pub(crate) fn unravel<const D: usize>(shape: [usize; D], mut flat: usize) -> [usize; D] {
    let mut pos = [0usize; D];
    for axis in (0..D).rev() {
        pos[axis] = flat % shape[axis];
        flat /= shape[axis];
    }
    pos
}
