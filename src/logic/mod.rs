//! Logic Module - page routing, classifier capability and the train/detect pipelines

pub mod classifier;
pub mod detection;
pub mod navigation;
pub mod training;
