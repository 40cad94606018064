// Pipeline processing: namespacing, merging, cleaning, and resampling

pub mod namespace;
pub mod merge;
pub mod normalize;
pub mod resample;
