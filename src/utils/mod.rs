#![doc(hidden)]

pub(crate) mod dptree_ext;
pub(crate) mod text;

pub(crate) use text::ellipsize;
