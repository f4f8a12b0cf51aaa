//! Concrete machines built on the core.

use thiserror::Error;

pub mod cpm;
pub mod invaders;

/// A program image that does not fit where a host wants to put it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("image of {size} bytes does not fit in the {capacity} bytes available at {origin:#06X}")]
pub struct LoadError {
    pub size: usize,
    pub capacity: usize,
    pub origin: u16,
}

pub(crate) fn copy_image(memory: &mut [u8], origin: u16, capacity: usize, image: &[u8]) -> Result<(), LoadError> {
    if image.len() > capacity {
        return Err(LoadError { size: image.len(), capacity, origin });
    }
    let start = origin as usize;
    memory[start..start + image.len()].copy_from_slice(image);
    Ok(())
}
