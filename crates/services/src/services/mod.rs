pub mod capabilities;
pub mod code_generator;
pub mod compliance;
pub mod constitution;
pub mod effect_pipeline;
pub mod effect_templates;
pub mod file_extraction;
pub mod generated_effect;
pub mod lexical_analyzer;
pub mod optimizer;
pub mod system_metrics;
