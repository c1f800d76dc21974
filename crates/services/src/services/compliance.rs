use db::models::effect::{Capability, Effect, EffectType};
use serde::Serialize;
use tracing::{debug, info};

use super::{
    capabilities,
    constitution::{
        self, Article, ComplianceReport, ComplianceSubject, ENFORCED_FPS, ENFORCED_MEMORY_MB,
        ENFORCED_RENDER_TIME_MS,
    },
    generated_effect::{ComplianceStage, GeneratedEffect},
};

/// What one enforcement pass changed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnforcementOutcome {
    pub applied: Vec<Capability>,
    pub metadata_clamped: bool,
    pub score_before: u32,
    pub score_after: u32,
}

/// Scores effects against the constitution and patches in missing blocks.
///
/// Scoring is pure. Enforcement runs at most one patch pass per call and
/// always rescores afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplianceEngine;

impl ComplianceEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, subject: &ComplianceSubject<'_>) -> ComplianceReport {
        constitution::assess(subject)
    }

    /// Report for a stored effect. Does not touch the record.
    pub fn score_effect(&self, effect: &Effect) -> ComplianceReport {
        self.score(&ComplianceSubject::from(effect))
    }

    /// Score `effect` and store the report on it
    pub fn evaluate(&self, effect: &mut GeneratedEffect) -> ComplianceReport {
        let report = self.score(&subject_of(effect));
        effect.record_report(report.clone(), ComplianceStage::Scored);
        report
    }

    /// Score once and mark final without patching anything
    pub fn finalize(&self, effect: &mut GeneratedEffect) -> ComplianceReport {
        let report = self.score(&subject_of(effect));
        effect.record_report(report.clone(), ComplianceStage::Final);
        report
    }

    /// Score, then patch and rescore once if any article is below its bar
    pub fn enforce_compliance(&self, effect: &mut GeneratedEffect) -> EnforcementOutcome {
        let existing = effect
            .report()
            .filter(|_| effect.stage() != ComplianceStage::Unscored)
            .cloned();
        let report = match existing {
            Some(report) => report,
            None => self.evaluate(effect),
        };

        if report.is_fully_compliant() {
            effect.record_report(report.clone(), ComplianceStage::Final);
            return EnforcementOutcome {
                applied: Vec::new(),
                metadata_clamped: false,
                score_before: report.total_score,
                score_after: report.total_score,
            };
        }

        self.enforce_once(effect, &report)
    }

    /// Apply remedies for every failing article in `report`, then rescore
    pub fn enforce_once(&self, effect: &mut GeneratedEffect, report: &ComplianceReport) -> EnforcementOutcome {
        let mut applied = Vec::new();
        let mut metadata_clamped = false;

        for article in report.non_compliant() {
            if article == Article::PerformanceAbsolute {
                metadata_clamped |= clamp_metadata(effect);
                continue;
            }
            for capability in article.remedies() {
                if apply_capability(effect, *capability) {
                    applied.push(*capability);
                }
            }
        }
        effect.set_stage(ComplianceStage::Enforced);

        let rescored = self.score(&subject_of(effect));
        effect.record_report(rescored.clone(), ComplianceStage::Final);

        info!(
            effect_id = %effect.id(),
            applied = applied.len(),
            metadata_clamped,
            score_before = report.total_score,
            score_after = rescored.total_score,
            "Enforced constitution"
        );

        EnforcementOutcome {
            applied,
            metadata_clamped,
            score_before: report.total_score,
            score_after: rescored.total_score,
        }
    }
}

fn subject_of(effect: &GeneratedEffect) -> ComplianceSubject<'_> {
    let estimates = effect.estimates();
    ComplianceSubject {
        code: effect.code(),
        render_time: estimates.render_time,
        memory_usage: estimates.memory_usage,
        fps: estimates.fps,
        dna: effect.dna(),
    }
}

fn clamp_metadata(effect: &mut GeneratedEffect) -> bool {
    let current = effect.estimates();
    let clamped = current.render_time > ENFORCED_RENDER_TIME_MS
        || current.fps < ENFORCED_FPS
        || current.memory_usage > ENFORCED_MEMORY_MB;
    if clamped {
        let estimates = effect.estimates_mut();
        estimates.render_time = estimates.render_time.min(ENFORCED_RENDER_TIME_MS);
        estimates.fps = estimates.fps.max(ENFORCED_FPS);
        estimates.memory_usage = estimates.memory_usage.min(ENFORCED_MEMORY_MB);
    }
    clamped
}

/// Splice one capability block into the effect unless it is already there
fn apply_capability(effect: &mut GeneratedEffect, capability: Capability) -> bool {
    if effect.capabilities().contains(&capability) || capabilities::is_present(capability, effect.code()) {
        return false;
    }

    let code = effect.code_mut();
    match capability {
        Capability::PlatformFallbacks => {
            for effect_type in [EffectType::Javascript, EffectType::Css, EffectType::AfterEffects] {
                let field = code.for_type_mut(effect_type);
                if field.trim().is_empty() {
                    *field = capabilities::platform_fallback(effect_type).to_string();
                }
            }
        }
        other => capabilities::append_block(&mut code.javascript, capabilities::block(other)),
    }
    debug!(%capability, "Applied capability block");
    effect.add_capability(capability)
}
