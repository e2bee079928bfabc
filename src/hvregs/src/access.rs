//! Marker types distinguishing registers that may be written from those that
//! may only be read.

mod sealed {
    pub trait Sealed {}
}

/// Implemented by [`ReadOnly`] and [`ReadWrite`].
pub trait Access: sealed::Sealed + Clone + Copy + core::fmt::Debug {}

/// The register can only be read. Write accessors are not available.
#[derive(Clone, Copy, Debug)]
pub enum ReadOnly {}

/// The register can be read and written.
#[derive(Clone, Copy, Debug)]
pub enum ReadWrite {}

impl sealed::Sealed for ReadOnly {}
impl sealed::Sealed for ReadWrite {}
impl Access for ReadOnly {}
impl Access for ReadWrite {}
