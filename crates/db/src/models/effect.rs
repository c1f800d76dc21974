use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use crate::{DbError, MemoryPool, store::Record};

/// Output language of a generated effect
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EffectType {
    #[default]
    Javascript,
    Css,
    AfterEffects,
}

/// Device class the optimizer tunes for
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Platform {
    #[default]
    Web,
    Mobile,
    Desktop,
}

/// Energy / complexity / elegance, each in [0, 1]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default, TS)]
pub struct EmotionalProfile {
    pub energy: f64,
    pub complexity: f64,
    pub elegance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct TechnicalRequirements {
    /// Target frames per second estimate, never below 30
    pub performance: f64,
    /// Memory estimate in MB, never below 64
    pub memory: f64,
    pub compatibility: Vec<String>,
}

/// Feature record derived from a free-text prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct EffectDna {
    pub primary_concepts: Vec<String>,
    pub emotional_profile: EmotionalProfile,
    pub technical_requirements: TechnicalRequirements,
    pub confidence_score: f64,
    pub constitution_compliance: bool,
}

/// Source text per output platform. An empty string means no code for
/// that platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, TS)]
pub struct EffectCode {
    pub javascript: String,
    pub css: String,
    pub after_effects: String,
}

impl EffectCode {
    pub fn single(effect_type: EffectType, code: String) -> Self {
        let mut out = Self::default();
        *out.for_type_mut(effect_type) = code;
        out
    }

    pub fn for_type(&self, effect_type: EffectType) -> &str {
        match effect_type {
            EffectType::Javascript => &self.javascript,
            EffectType::Css => &self.css,
            EffectType::AfterEffects => &self.after_effects,
        }
    }

    pub fn for_type_mut(&mut self, effect_type: EffectType) -> &mut String {
        match effect_type {
            EffectType::Javascript => &mut self.javascript,
            EffectType::Css => &mut self.css,
            EffectType::AfterEffects => &mut self.after_effects,
        }
    }

    /// Number of platforms (out of three) that carry non-blank code
    pub fn platforms_with_code(&self) -> usize {
        [&self.javascript, &self.css, &self.after_effects]
            .into_iter()
            .filter(|code| !code.trim().is_empty())
            .count()
    }

    /// True if any platform's code contains `marker`
    pub fn contains(&self, marker: &str) -> bool {
        self.javascript.contains(marker)
            || self.css.contains(marker)
            || self.after_effects.contains(marker)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default, TS)]
pub struct EffectMetadata {
    /// Estimated render time per frame, ms
    pub render_time: f64,
    /// Estimated memory usage, MB
    pub memory_usage: f64,
    /// Declared target frame rate
    pub fps: f64,
    /// Weighted constitution score, 0-100
    pub constitution_score: u32,
}

/// One flag per constitution article, true when the article met its pass bar
/// at the last scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
pub struct ComplianceFlags {
    pub performance_absolute: bool,
    pub adaptive_intelligence: bool,
    pub universal_versatility: bool,
    pub perfect_experience: bool,
    pub visual_impact: bool,
    pub addictive_ecosystem: bool,
    pub competitive_domination: bool,
}

impl ComplianceFlags {
    pub fn from_array(flags: [bool; 7]) -> Self {
        let [
            performance_absolute,
            adaptive_intelligence,
            universal_versatility,
            perfect_experience,
            visual_impact,
            addictive_ecosystem,
            competitive_domination,
        ] = flags;
        Self {
            performance_absolute,
            adaptive_intelligence,
            universal_versatility,
            perfect_experience,
            visual_impact,
            addictive_ecosystem,
            competitive_domination,
        }
    }

    pub fn as_array(&self) -> [bool; 7] {
        [
            self.performance_absolute,
            self.adaptive_intelligence,
            self.universal_versatility,
            self.perfect_experience,
            self.visual_impact,
            self.addictive_ecosystem,
            self.competitive_domination,
        ]
    }

    pub fn all(&self) -> bool {
        self.as_array().iter().all(|flag| *flag)
    }
}

/// Named boilerplate block that has been spliced into an effect's code.
/// Each capability is applied at most once per effect.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    TS,
    EnumString,
    EnumIter,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    ConstitutionSetup,
    AutoCalibration,
    DeviceDetection,
    PerformanceMonitor,
    PlatformFallbacks,
    CrossBrowser,
    OneClickInit,
    RenderLoop,
    EventBinding,
    WowFactor,
    Physics,
    Antialiasing,
    Immersive,
    SurpriseVariation,
    ProgressFeedback,
    Innovation,
}

/// A generated effect as persisted at the end of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Effect {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub effect_type: EffectType,
    pub category: String,
    pub template_id: String,
    pub platform: Platform,
    pub code: EffectCode,
    pub metadata: EffectMetadata,
    pub compliance: ComplianceFlags,
    pub capabilities: BTreeSet<Capability>,
    pub dna: EffectDna,
    pub session_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Effect {
    /// Code for the effect's own output type
    pub fn primary_code(&self) -> &str {
        self.code.for_type(self.effect_type)
    }
}

impl Record for Effect {
    const KIND: &'static str = "effect";

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateEffect {
    pub name: String,
    pub description: String,
    pub effect_type: EffectType,
    pub category: String,
    pub template_id: String,
    pub platform: Platform,
    pub code: EffectCode,
    pub metadata: EffectMetadata,
    pub compliance: ComplianceFlags,
    pub capabilities: BTreeSet<Capability>,
    pub dna: EffectDna,
    pub session_id: Option<Uuid>,
}

/// Editable catalogue fields. Code and scores are never edited here.
#[derive(Debug, Clone, Serialize, Deserialize, Default, TS)]
pub struct UpdateEffect {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, TS)]
pub struct EffectFilter {
    pub effect_type: Option<EffectType>,
    pub category: Option<String>,
}

impl EffectFilter {
    pub fn matches(&self, effect: &Effect) -> bool {
        self.effect_type.is_none_or(|t| t == effect.effect_type)
            && self
                .category
                .as_deref()
                .is_none_or(|c| c.eq_ignore_ascii_case(&effect.category))
    }
}

/// Dashboard summary over the effect catalogue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct EffectStats {
    pub total: usize,
    pub average_constitution_score: f64,
    pub fully_compliant: usize,
    pub javascript: usize,
    pub css: usize,
    pub after_effects: usize,
}

impl Effect {
    pub async fn create(pool: &MemoryPool, id: Uuid, data: &CreateEffect) -> Result<Self, DbError> {
        let now = Utc::now();
        pool.effects().insert(Effect {
            id,
            name: data.name.clone(),
            description: data.description.clone(),
            effect_type: data.effect_type,
            category: data.category.clone(),
            template_id: data.template_id.clone(),
            platform: data.platform,
            code: data.code.clone(),
            metadata: data.metadata,
            compliance: data.compliance,
            capabilities: data.capabilities.clone(),
            dna: data.dna.clone(),
            session_id: data.session_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(pool: &MemoryPool, id: Uuid) -> Result<Option<Self>, DbError> {
        Ok(pool.effects().get(id))
    }

    pub async fn find_all(pool: &MemoryPool, filter: &EffectFilter) -> Result<Vec<Self>, DbError> {
        Ok(pool.effects().list(|effect| filter.matches(effect)))
    }

    pub async fn update(
        pool: &MemoryPool,
        id: Uuid,
        data: &UpdateEffect,
    ) -> Result<Self, DbError> {
        pool.effects().update(id, |effect| {
            if let Some(name) = &data.name {
                effect.name = name.clone();
            }
            if let Some(description) = &data.description {
                effect.description = description.clone();
            }
            if let Some(category) = &data.category {
                effect.category = category.clone();
            }
        })
    }

    pub async fn delete(pool: &MemoryPool, id: Uuid) -> Result<u64, DbError> {
        Ok(pool.effects().remove(id))
    }

    pub async fn stats(pool: &MemoryPool) -> Result<EffectStats, DbError> {
        let effects = pool.effects().list(|_| true);
        let total = effects.len();
        let score_sum: u64 = effects
            .iter()
            .map(|e| u64::from(e.metadata.constitution_score))
            .sum();
        let average_constitution_score = if total == 0 {
            0.0
        } else {
            ((score_sum as f64 / total as f64) * 100.0).round() / 100.0
        };
        let count_type = |t: EffectType| effects.iter().filter(|e| e.effect_type == t).count();

        Ok(EffectStats {
            total,
            average_constitution_score,
            fully_compliant: effects.iter().filter(|e| e.compliance.all()).count(),
            javascript: count_type(EffectType::Javascript),
            css: count_type(EffectType::Css),
            after_effects: count_type(EffectType::AfterEffects),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dna() -> EffectDna {
        EffectDna {
            primary_concepts: vec!["glow".to_string()],
            emotional_profile: EmotionalProfile::default(),
            technical_requirements: TechnicalRequirements {
                performance: 60.0,
                memory: 256.0,
                compatibility: vec!["web".to_string()],
            },
            confidence_score: 0.5,
            constitution_compliance: false,
        }
    }

    fn sample(effect_type: EffectType, score: u32) -> CreateEffect {
        CreateEffect {
            name: "Glow".to_string(),
            description: "soft glow".to_string(),
            effect_type,
            category: "particles".to_string(),
            template_id: "particle-system".to_string(),
            platform: Platform::Web,
            code: EffectCode::single(effect_type, "const a = 1;".to_string()),
            metadata: EffectMetadata {
                render_time: 5.0,
                memory_usage: 100.0,
                fps: 60.0,
                constitution_score: score,
            },
            compliance: ComplianceFlags::default(),
            capabilities: BTreeSet::new(),
            dna: sample_dna(),
            session_id: None,
        }
    }

    #[test]
    fn effect_type_parses_wire_names() {
        assert_eq!("aftereffects".parse::<EffectType>().unwrap(), EffectType::AfterEffects);
        assert_eq!("CSS".parse::<EffectType>().unwrap(), EffectType::Css);
        assert_eq!(
            serde_json::to_string(&EffectType::AfterEffects).unwrap(),
            "\"aftereffects\""
        );
    }

    #[test]
    fn platforms_with_code_ignores_blank_fields() {
        let mut code = EffectCode::single(EffectType::Css, ".a {}".to_string());
        code.javascript = "   ".to_string();
        assert_eq!(code.platforms_with_code(), 1);
    }

    #[test]
    fn compliance_flags_round_trip_through_array() {
        let flags = [true, false, true, false, true, false, true];
        assert_eq!(ComplianceFlags::from_array(flags).as_array(), flags);
        assert!(!ComplianceFlags::from_array(flags).all());
    }

    #[tokio::test]
    async fn update_changes_only_catalogue_fields() {
        let pool = MemoryPool::new();
        let created = Effect::create(&pool, Uuid::new_v4(), &sample(EffectType::Javascript, 80))
            .await
            .unwrap();

        let updated = Effect::update(
            &pool,
            created.id,
            &UpdateEffect {
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.code, created.code);
        assert_eq!(updated.metadata, created.metadata);
    }

    #[tokio::test]
    async fn find_all_filters_by_type_and_category() {
        let pool = MemoryPool::new();
        Effect::create(&pool, Uuid::new_v4(), &sample(EffectType::Javascript, 80))
            .await
            .unwrap();
        Effect::create(&pool, Uuid::new_v4(), &sample(EffectType::Css, 60))
            .await
            .unwrap();

        let css = Effect::find_all(
            &pool,
            &EffectFilter {
                effect_type: Some(EffectType::Css),
                category: Some("PARTICLES".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(css.len(), 1);
        assert_eq!(css[0].effect_type, EffectType::Css);
    }

    #[tokio::test]
    async fn stats_average_scores() {
        let pool = MemoryPool::new();
        Effect::create(&pool, Uuid::new_v4(), &sample(EffectType::Javascript, 80))
            .await
            .unwrap();
        Effect::create(&pool, Uuid::new_v4(), &sample(EffectType::AfterEffects, 61))
            .await
            .unwrap();

        let stats = Effect::stats(&pool).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.average_constitution_score, 70.5);
        assert_eq!(stats.javascript, 1);
        assert_eq!(stats.after_effects, 1);
        assert_eq!(stats.fully_compliant, 0);
    }

    #[tokio::test]
    async fn delete_reports_missing_rows() {
        let pool = MemoryPool::new();
        assert_eq!(Effect::delete(&pool, Uuid::new_v4()).await.unwrap(), 0);
    }
}
