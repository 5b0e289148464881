pub mod polydata;

pub use polydata::PolyData;
