pub mod bbox_size;
pub mod queue;
pub mod run;
