//! Input files shared by the simulator binary and the experiment runner.

pub mod scene;
