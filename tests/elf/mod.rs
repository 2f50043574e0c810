//! End-to-end analysis of synthesized ELF images.

mod adversarial;
mod analyze;
mod dynamic_paths;
