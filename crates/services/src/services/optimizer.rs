//! Regex rewrites applied to generated code before scoring.
//!
//! Every rule is a no-op on its own output, so optimizing twice gives the
//! same text as optimizing once.

use db::models::{
    effect::Platform,
    generation_session::GenerationOptions,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;
use utils::number::{format_decimal, round2};

static FIXED_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"new\s+(?:Array|Float32Array|Float64Array|Uint8Array)\(\s*\d+\s*\)")
        .expect("array pattern is valid")
});
static POLLING_TIMER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"setInterval\(\s*([^,]+?)\s*,\s*[^)]*\)").expect("timer pattern is valid")
});
static ENTITY_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(particleCount|maxParticles|entityCount)(\s*[=:]\s*)(\d+)")
        .expect("count pattern is valid")
});

pub const FRAME_TIME_PLACEHOLDER: &str = "{{FRAME_TIME}}";
/// Budgets at or below this rate keep the 30 fps frame time
pub const MIN_FRAME_RATE: u32 = 30;
pub const LOW_MEMORY_THRESHOLD_MB: u32 = 512;
pub const MOBILE_ENTITY_CEILING: u32 = 50;
pub const DESKTOP_ENTITY_COUNT: u32 = 200;

const RENDER_MS_PER_CHAR: f64 = 0.003;
const BASE_MEMORY_MB: f64 = 32.0;
const MEMORY_MB_PER_ENTITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerOptions {
    pub max_memory: u32,
    pub target_fps: u32,
    pub platform: Platform,
}

impl From<&GenerationOptions> for OptimizerOptions {
    fn from(options: &GenerationOptions) -> Self {
        Self {
            max_memory: options.max_memory,
            target_fps: options.target_fps,
            platform: options.platform,
        }
    }
}

/// Cost estimates that feed the performance article
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PerformanceEstimates {
    /// ms per frame
    pub render_time: f64,
    /// MB
    pub memory_usage: f64,
    /// declared target rate
    pub fps: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Optimizer;

impl Optimizer {
    pub fn new() -> Self {
        Self
    }

    pub fn optimize(&self, code: &str, options: &OptimizerOptions) -> String {
        let mut out = code.to_string();

        if options.max_memory < LOW_MEMORY_THRESHOLD_MB {
            out = FIXED_ARRAY.replace_all(&out, "[]").into_owned();
            out = POLLING_TIMER
                .replace_all(&out, "requestAnimationFrame($1)")
                .into_owned();
        }

        out = out.replace(
            FRAME_TIME_PLACEHOLDER,
            &format_decimal(frame_time_ms(options.target_fps)),
        );

        out = match options.platform {
            Platform::Mobile => rewrite_counts(&out, |n| n.min(MOBILE_ENTITY_CEILING)),
            Platform::Desktop => rewrite_counts(&out, |_| DESKTOP_ENTITY_COUNT),
            Platform::Web => out,
        };

        debug!(
            platform = %options.platform,
            before = code.len(),
            after = out.len(),
            "Optimized code"
        );
        out
    }

    pub fn estimate(&self, code: &str, target_fps: u32) -> PerformanceEstimates {
        let entities = extract_entity_count(code).unwrap_or(0);
        PerformanceEstimates {
            render_time: round2(code.chars().count() as f64 * RENDER_MS_PER_CHAR),
            memory_usage: round2(BASE_MEMORY_MB + entities as f64 * MEMORY_MB_PER_ENTITY),
            fps: target_fps as f64,
        }
    }
}

/// Milliseconds per frame for the target rate. Rates at or below 30 fps use
/// the 30 fps budget so no placeholder survives optimization.
pub fn frame_time_ms(target_fps: u32) -> f64 {
    1000.0 / target_fps.max(MIN_FRAME_RATE) as f64
}

/// First particle/entity count literal in `code`
pub fn extract_entity_count(code: &str) -> Option<u32> {
    ENTITY_COUNT
        .captures(code)
        .and_then(|caps| caps[3].parse().ok())
}

fn rewrite_counts(code: &str, adjust: impl Fn(u32) -> u32) -> String {
    ENTITY_COUNT
        .replace_all(code, |caps: &Captures| match caps[3].parse::<u32>() {
            Ok(n) => format!("{}{}{}", &caps[1], &caps[2], adjust(n)),
            Err(_) => caps[0].to_string(),
        })
        .into_owned()
}
