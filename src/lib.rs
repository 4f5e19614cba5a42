#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

pub use dp_proto as proto;
pub use dp_ptr as ptr;
pub use dp_utils as utils;

pub use dp_proto::{impl_enum_shape, impl_struct_shape};

pub use dp_proto::register_mapper;
