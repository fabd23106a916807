//! Configuration module.

mod print_config;

pub use print_config::{
    default_startup, default_teardown, InfillKind, PipelineConfig, SliceConfig, WriterConfig,
};
