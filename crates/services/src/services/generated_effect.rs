use std::collections::BTreeSet;

use db::models::effect::{
    Capability, ComplianceFlags, CreateEffect, EffectCode, EffectDna, EffectMetadata, EffectType,
    Platform,
};
use serde::Serialize;
use strum_macros::Display;
use uuid::Uuid;

use super::{
    code_generator::GeneratedCode, constitution::ComplianceReport, optimizer::PerformanceEstimates,
};

const UNTITLED: &str = "Untitled Effect";

/// Where an effect sits in the scoring lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComplianceStage {
    #[default]
    Unscored,
    Scored,
    Enforced,
    Final,
}

/// The working unit carried through the pipeline.
///
/// Score and flags are only ever derived from the last compliance report.
/// Any change to code or estimates drops that report, so a mutated effect
/// has to be scored again before it can be persisted.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedEffect {
    id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub template_id: String,
    pub platform: Platform,
    effect_type: EffectType,
    code: EffectCode,
    estimates: PerformanceEstimates,
    capabilities: BTreeSet<Capability>,
    dna: EffectDna,
    report: Option<ComplianceReport>,
    stage: ComplianceStage,
}

impl GeneratedEffect {
    pub fn new(description: &str, dna: EffectDna, generated: GeneratedCode, platform: Platform) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: effect_name(&dna),
            description: description.to_string(),
            category: generated.category.to_string(),
            template_id: generated.template_id.to_string(),
            platform,
            effect_type: generated.effect_type,
            code: EffectCode::single(generated.effect_type, generated.code),
            estimates: PerformanceEstimates::default(),
            capabilities: generated.capabilities,
            dna,
            report: None,
            stage: ComplianceStage::Unscored,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn effect_type(&self) -> EffectType {
        self.effect_type
    }

    pub fn code(&self) -> &EffectCode {
        &self.code
    }

    pub fn primary_code(&self) -> &str {
        self.code.for_type(self.effect_type)
    }

    pub fn estimates(&self) -> PerformanceEstimates {
        self.estimates
    }

    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    pub fn dna(&self) -> &EffectDna {
        &self.dna
    }

    pub fn report(&self) -> Option<&ComplianceReport> {
        self.report.as_ref()
    }

    pub fn stage(&self) -> ComplianceStage {
        self.stage
    }

    pub fn code_mut(&mut self) -> &mut EffectCode {
        self.invalidate();
        &mut self.code
    }

    pub fn estimates_mut(&mut self) -> &mut PerformanceEstimates {
        self.invalidate();
        &mut self.estimates
    }

    pub fn set_estimates(&mut self, estimates: PerformanceEstimates) {
        *self.estimates_mut() = estimates;
    }

    /// Record that a capability block was spliced in. False if it already was.
    pub(crate) fn add_capability(&mut self, capability: Capability) -> bool {
        self.capabilities.insert(capability)
    }

    pub(crate) fn record_report(&mut self, report: ComplianceReport, stage: ComplianceStage) {
        self.report = Some(report);
        self.stage = stage;
    }

    pub(crate) fn set_stage(&mut self, stage: ComplianceStage) {
        self.stage = stage;
    }

    pub fn constitution_score(&self) -> u32 {
        self.report.as_ref().map_or(0, |r| r.total_score)
    }

    pub fn compliance_flags(&self) -> ComplianceFlags {
        self.report.as_ref().map(ComplianceReport::flags).unwrap_or_default()
    }

    pub fn metadata(&self) -> EffectMetadata {
        EffectMetadata {
            render_time: self.estimates.render_time,
            memory_usage: self.estimates.memory_usage,
            fps: self.estimates.fps,
            constitution_score: self.constitution_score(),
        }
    }

    pub fn to_create_effect(&self, session_id: Option<Uuid>) -> CreateEffect {
        CreateEffect {
            name: self.name.clone(),
            description: self.description.clone(),
            effect_type: self.effect_type,
            category: self.category.clone(),
            template_id: self.template_id.clone(),
            platform: self.platform,
            code: self.code.clone(),
            metadata: self.metadata(),
            compliance: self.compliance_flags(),
            capabilities: self.capabilities.clone(),
            dna: self.dna.clone(),
            session_id,
        }
    }

    fn invalidate(&mut self) {
        self.report = None;
        self.stage = ComplianceStage::Unscored;
    }
}

/// "Explosive Particle Effect" from the first two concepts
pub fn effect_name(dna: &EffectDna) -> String {
    if dna.primary_concepts.is_empty() {
        return UNTITLED.to_string();
    }
    let words: Vec<String> = dna
        .primary_concepts
        .iter()
        .take(2)
        .map(|concept| title_case(concept))
        .collect();
    format!("{} Effect", words.join(" "))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
