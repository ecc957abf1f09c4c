pub mod grid;
pub mod obb;
pub mod pose;
