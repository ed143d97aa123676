//! The IAB element tree's concrete types (C2, §3): the bitstream entities a
//! [`frame::Frame`] is built from.

pub mod authoring;
pub mod bed;
pub mod bed_remap;
pub mod channel;
pub mod element;
pub mod essence;
pub mod frame;
pub mod gain;
pub mod object;
pub mod object_subblock;
pub mod object_zone19;
pub mod position;
