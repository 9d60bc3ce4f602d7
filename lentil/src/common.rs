#![allow(unused_imports)]

pub use log::{debug, info, warn};
pub use matrix_util::common_io::*;

pub use candle_util::{candle_core, candle_nn};
pub use candle_core::{DType, Device, Tensor};
