pub mod alert;
pub mod annotate;
pub mod background_model;
pub mod contour;
pub mod frame;
pub mod motion_detector;
pub mod naming;
pub mod preprocessor;
pub mod reaction;
pub mod recording;
pub mod snapshot;
