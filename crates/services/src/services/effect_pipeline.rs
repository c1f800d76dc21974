//! Prompt to persisted effect: analyze, generate, optimize, score.
//!
//! [`EffectPipeline`] is the synchronous core. [`EffectGenerationService`]
//! wraps it in session bookkeeping and runs it in the background.

use std::{any::Any, future::Future, time::Instant};

use db::{
    DBService, DbError,
    models::{
        effect::{Effect, EffectDna},
        file::FileRecord,
        generation_session::{
            CreateGenerationSession, GenerationOptions, GenerationSession, GenerationStatus,
            SessionSource,
        },
    },
};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{
    code_generator::{CodeGenerator, GeneratorOptions},
    compliance::{ComplianceEngine, EnforcementOutcome},
    constitution::ComplianceReport,
    generated_effect::GeneratedEffect,
    lexical_analyzer::LexicalAnalyzer,
    optimizer::{Optimizer, OptimizerOptions},
};

pub const MIN_TARGET_FPS: u32 = 30;
pub const MAX_TARGET_FPS: u32 = 120;
pub const MIN_MEMORY_MB: u32 = 64;
pub const MAX_MEMORY_MB: u32 = 1024;
/// Lines of a document kept when reducing it to a prompt
pub const FILE_PROMPT_LINES: usize = 3;
pub const FILE_PROMPT_MAX_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Database(#[from] DbError),
    #[error("file {0} not found")]
    FileNotFound(Uuid),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("generation failed: {0}")]
    StageFailed(String),
}

pub fn validate_options(options: &GenerationOptions) -> Result<(), PipelineError> {
    if !(MIN_TARGET_FPS..=MAX_TARGET_FPS).contains(&options.target_fps) {
        return Err(PipelineError::InvalidOptions(format!(
            "target_fps must be between {MIN_TARGET_FPS} and {MAX_TARGET_FPS}, got {}",
            options.target_fps
        )));
    }
    if !(MIN_MEMORY_MB..=MAX_MEMORY_MB).contains(&options.max_memory) {
        return Err(PipelineError::InvalidOptions(format!(
            "max_memory must be between {MIN_MEMORY_MB} and {MAX_MEMORY_MB} MB, got {}",
            options.max_memory
        )));
    }
    Ok(())
}

/// First few non-empty lines of a document joined into a single prompt
pub fn reduce_to_prompt(text: &str) -> String {
    let joined = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(FILE_PROMPT_LINES)
        .collect::<Vec<_>>()
        .join(" ");
    match joined.char_indices().nth(FILE_PROMPT_MAX_CHARS) {
        Some((cut, _)) => joined[..cut].trim_end().to_string(),
        None => joined,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EffectPipeline {
    analyzer: LexicalAnalyzer,
    generator: CodeGenerator,
    optimizer: Optimizer,
    compliance: ComplianceEngine,
}

impl EffectPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(&self, prompt: &str) -> EffectDna {
        self.analyzer.analyze(prompt)
    }

    pub fn generate(&self, prompt: &str, dna: EffectDna, options: &GenerationOptions) -> GeneratedEffect {
        let generator_options = GeneratorOptions {
            effect_type: options.effect_type,
            target_fps: options.target_fps,
            max_memory: options.max_memory,
            enable_constitution: options.enable_constitution,
        };
        let generated = self.generator.generate(&dna, &generator_options);
        GeneratedEffect::new(prompt, dna, generated, options.platform)
    }

    /// Rewrite the primary code and refresh the cost estimates from it
    pub fn optimize(&self, effect: &mut GeneratedEffect, options: &GenerationOptions) {
        let optimizer_options = OptimizerOptions::from(options);
        let effect_type = effect.effect_type();
        let code = self
            .optimizer
            .optimize(effect.primary_code(), &optimizer_options);
        let estimates = self.optimizer.estimate(&code, options.target_fps);
        *effect.code_mut().for_type_mut(effect_type) = code;
        effect.set_estimates(estimates);
    }

    /// Final scoring. Enforcement only runs with the constitution enabled.
    pub fn score(
        &self,
        effect: &mut GeneratedEffect,
        options: &GenerationOptions,
    ) -> Option<EnforcementOutcome> {
        if options.enable_constitution {
            Some(self.compliance.enforce_compliance(effect))
        } else {
            self.compliance.finalize(effect);
            None
        }
    }

    pub fn generate_from_prompt(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GeneratedEffect, PipelineError> {
        validate_options(options)?;
        let dna = self.analyze(prompt);
        let mut effect = self.generate(prompt, dna, options);
        self.optimize(&mut effect, options);
        self.score(&mut effect, options);
        Ok(effect)
    }

    pub fn generate_from_file(
        &self,
        parsed_text: &str,
        options: &GenerationOptions,
    ) -> Result<GeneratedEffect, PipelineError> {
        self.generate_from_prompt(&reduce_to_prompt(parsed_text), options)
    }

    /// Read-only compliance report for a stored effect
    pub fn score_compliance(&self, effect: &Effect) -> ComplianceReport {
        self.compliance.score_effect(effect)
    }
}

/// Runs generation sessions in the background and records their outcome
#[derive(Clone)]
pub struct EffectGenerationService {
    db: DBService,
    pipeline: EffectPipeline,
}

impl EffectGenerationService {
    pub fn new(db: DBService, pipeline: EffectPipeline) -> Self {
        Self { db, pipeline }
    }

    pub fn pipeline(&self) -> &EffectPipeline {
        &self.pipeline
    }

    /// Create a session for `prompt` and start generating. Returns as soon
    /// as the session exists.
    pub async fn start_from_prompt(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<GenerationSession, PipelineError> {
        validate_options(&options)?;
        let data = CreateGenerationSession {
            source: SessionSource::Prompt,
            prompt: prompt.to_string(),
            file_id: None,
            options,
        };
        self.start(data).await
    }

    /// Same as [`Self::start_from_prompt`] with the prompt taken from an
    /// uploaded file
    pub async fn start_from_file(
        &self,
        file_id: Uuid,
        options: GenerationOptions,
    ) -> Result<GenerationSession, PipelineError> {
        validate_options(&options)?;
        let file = FileRecord::find_by_id(&self.db.pool, file_id)
            .await?
            .ok_or(PipelineError::FileNotFound(file_id))?;
        let data = CreateGenerationSession {
            source: SessionSource::File,
            prompt: reduce_to_prompt(&file.extracted_text),
            file_id: Some(file_id),
            options,
        };
        self.start(data).await
    }

    async fn start(&self, data: CreateGenerationSession) -> Result<GenerationSession, PipelineError> {
        let id = Uuid::new_v4();
        let session = GenerationSession::create(&self.db.pool, id, &data).await?;

        info!(
            session_id = %id,
            source = %data.source,
            effect_type = %data.options.effect_type,
            "Created generation session, starting pipeline"
        );

        let worker = self.clone();
        let prompt = data.prompt;
        let options = data.options;
        let db = self.db.clone();
        tokio::spawn(supervise(db, id, async move {
            worker.run(id, &prompt, options).await
        }));

        Ok(session)
    }

    async fn run(
        &self,
        session_id: Uuid,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<Effect, PipelineError> {
        let pool = &self.db.pool;

        GenerationSession::update_status(pool, session_id, GenerationStatus::Analyzing).await?;
        let dna = self.pipeline.analyze(prompt);
        debug!(session_id = %session_id, concepts = ?dna.primary_concepts, "Analyzed prompt");

        GenerationSession::update_status(pool, session_id, GenerationStatus::Generating).await?;
        let mut effect = self.pipeline.generate(prompt, dna, &options);
        debug!(session_id = %session_id, template_id = %effect.template_id, "Generated code");

        GenerationSession::update_status(pool, session_id, GenerationStatus::Optimizing).await?;
        self.pipeline.optimize(&mut effect, &options);
        debug!(
            session_id = %session_id,
            render_time = effect.estimates().render_time,
            memory_usage = effect.estimates().memory_usage,
            "Optimized code"
        );

        GenerationSession::update_status(pool, session_id, GenerationStatus::Scoring).await?;
        if let Some(outcome) = self.pipeline.score(&mut effect, &options) {
            info!(
                session_id = %session_id,
                applied = outcome.applied.len(),
                score_before = outcome.score_before,
                score_after = outcome.score_after,
                "Scored with enforcement"
            );
        }

        let record = Effect::create(pool, effect.id(), &effect.to_create_effect(Some(session_id))).await?;
        Ok(record)
    }
}

/// Await `work` on its own task and write the result to the session. A
/// panic inside `work` is recorded as a failure like any other error.
pub async fn supervise<F>(db: DBService, session_id: Uuid, work: F)
where
    F: Future<Output = Result<Effect, PipelineError>> + Send + 'static,
{
    let started = Instant::now();
    let result = match tokio::spawn(work).await {
        Ok(result) => result,
        Err(join_error) => Err(PipelineError::StageFailed(join_error_message(join_error))),
    };
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let recorded = match result {
        Ok(effect) => {
            info!(
                session_id = %session_id,
                effect_id = %effect.id,
                constitution_score = effect.metadata.constitution_score,
                elapsed_ms,
                "Generation completed"
            );
            GenerationSession::mark_completed(&db.pool, session_id, effect.id, elapsed_ms).await
        }
        Err(e) => {
            error!(session_id = %session_id, error = %e, elapsed_ms, "Generation failed");
            GenerationSession::mark_failed(&db.pool, session_id, &e.to_string(), elapsed_ms).await
        }
    };

    if let Err(e) = recorded {
        error!(session_id = %session_id, error = %e, "Failed to record generation outcome");
    }
}

fn join_error_message(join_error: JoinError) -> String {
    match join_error.try_into_panic() {
        Ok(payload) => panic_message(payload.as_ref()),
        Err(_) => "generation task was cancelled".to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "generation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use db::models::{
        effect::{Capability, EffectType, Platform},
        file::CreateFileRecord,
    };

    use super::*;
    use crate::services::generated_effect::ComplianceStage;

    const REFERENCE_PROMPT: &str = "A fast explosive particle burst with smooth glowing trails";

    async fn exploding_stage() -> Result<Effect, PipelineError> {
        panic!("optimizer exploded")
    }

    async fn failing_stage() -> Result<Effect, PipelineError> {
        Err(PipelineError::StageFailed("template missing".to_string()))
    }

    async fn wait_for_terminal(db: &DBService, id: Uuid) -> GenerationSession {
        for _ in 0..200 {
            let session = GenerationSession::find_by_id(&db.pool, id).await.unwrap();
            if let Some(session) = session.filter(|s| s.status.is_terminal()) {
                return session;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session {id} never finished");
    }

    #[test]
    fn reference_prompt_end_to_end() {
        let pipeline = EffectPipeline::new();
        let options = GenerationOptions::default();

        let dna = pipeline.analyze(REFERENCE_PROMPT);
        assert!(dna.primary_concepts.contains(&"particle".to_string()));
        assert!(dna.primary_concepts.contains(&"glowing".to_string()));
        assert!(dna.emotional_profile.energy > 0.0);

        let mut effect = pipeline.generate(REFERENCE_PROMPT, dna, &options);
        pipeline.optimize(&mut effect, &options);
        assert!(!effect.primary_code().is_empty());
        assert!(!effect.primary_code().contains("{{"));

        let outcome = pipeline.score(&mut effect, &options).unwrap();
        assert!(outcome.score_after >= outcome.score_before);
        assert_eq!(effect.constitution_score(), outcome.score_after);
        assert_eq!(effect.stage(), ComplianceStage::Final);
    }

    #[test]
    fn empty_prompt_uses_the_fallback_template() {
        let effect = EffectPipeline::new()
            .generate_from_prompt("", &GenerationOptions::default())
            .unwrap();
        assert_eq!(effect.name, "Untitled Effect");
        assert_eq!(effect.dna().confidence_score, 0.0);
        assert!(effect.dna().primary_concepts.is_empty());
        assert_eq!(effect.template_id, "css-animation-wrapper");
        assert!(effect.primary_code().contains("function oneClickInit"));
    }

    #[test]
    fn disabled_constitution_scores_without_patching() {
        let options = GenerationOptions {
            enable_constitution: false,
            ..GenerationOptions::default()
        };
        let effect = EffectPipeline::new()
            .generate_from_prompt(REFERENCE_PROMPT, &options)
            .unwrap();
        assert_eq!(effect.stage(), ComplianceStage::Final);
        assert!(effect.capabilities().is_empty());
        assert!(!effect.code().javascript.contains("constitution"));
        assert!(effect.constitution_score() < 100);
    }

    #[test]
    fn mobile_run_caps_particles() {
        let options = GenerationOptions {
            platform: Platform::Mobile,
            ..GenerationOptions::default()
        };
        let effect = EffectPipeline::new()
            .generate_from_prompt("intense powerful explosive fast particles", &options)
            .unwrap();
        assert_eq!(effect.template_id, "particle-system");
        assert!(effect.primary_code().contains("this.particleCount = 50;"));
        assert!(effect.primary_code().contains("this.pool = [];"));
    }

    #[test]
    fn css_effect_keeps_code_in_css_field() {
        let options = GenerationOptions {
            effect_type: EffectType::Css,
            ..GenerationOptions::default()
        };
        let effect = EffectPipeline::new()
            .generate_from_prompt("soft neon glow", &options)
            .unwrap();
        assert!(effect.code().css.contains("@keyframes"));
        assert!(effect.capabilities().contains(&Capability::ConstitutionSetup));
    }

    #[test]
    fn out_of_range_options_are_rejected() {
        let pipeline = EffectPipeline::new();
        for options in [
            GenerationOptions { target_fps: 10, ..GenerationOptions::default() },
            GenerationOptions { target_fps: 240, ..GenerationOptions::default() },
            GenerationOptions { max_memory: 32, ..GenerationOptions::default() },
            GenerationOptions { max_memory: 4096, ..GenerationOptions::default() },
        ] {
            assert!(matches!(
                pipeline.generate_from_prompt("glow", &options),
                Err(PipelineError::InvalidOptions(_))
            ));
        }
    }

    #[test]
    fn file_text_is_reduced_to_a_short_prompt() {
        let text = "\n  Neon glow title  \n\nsecond line\nthird line\nfourth line";
        assert_eq!(reduce_to_prompt(text), "Neon glow title second line third line");

        let long = "ä".repeat(500);
        let reduced = reduce_to_prompt(&long);
        assert_eq!(reduced.chars().count(), FILE_PROMPT_MAX_CHARS);

        assert_eq!(reduce_to_prompt(""), "");
    }

    #[test]
    fn file_generation_matches_its_reduced_prompt() {
        let pipeline = EffectPipeline::new();
        let options = GenerationOptions::default();
        let text = "Cosmic galaxy swirl\n\n  dreamy floating stars \nsoft shimmer\nintense explosive fire";

        let from_file = pipeline.generate_from_file(text, &options).unwrap();
        let from_prompt = pipeline
            .generate_from_prompt(&reduce_to_prompt(text), &options)
            .unwrap();

        assert_eq!(from_file.description, "Cosmic galaxy swirl dreamy floating stars soft shimmer");
        assert_eq!(from_file.name, from_prompt.name);
        assert_eq!(from_file.dna(), from_prompt.dna());
        assert_eq!(from_file.code(), from_prompt.code());
        assert_eq!(from_file.constitution_score(), from_prompt.constitution_score());
        assert_ne!(from_file.id(), from_prompt.id());
        assert!(!from_file.dna().primary_concepts.contains(&"fire".to_string()));

        let invalid = GenerationOptions {
            max_memory: 16,
            ..options
        };
        assert!(matches!(
            pipeline.generate_from_file(text, &invalid),
            Err(PipelineError::InvalidOptions(_))
        ));
    }

    #[tokio::test]
    async fn prompt_session_completes_with_an_effect() {
        let db = DBService::new();
        let service = EffectGenerationService::new(db.clone(), EffectPipeline::new());

        let session = service
            .start_from_prompt(REFERENCE_PROMPT, GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(session.status, GenerationStatus::Pending);

        let finished = wait_for_terminal(&db, session.id).await;
        assert_eq!(finished.status, GenerationStatus::Completed);
        assert!(finished.elapsed_ms.is_some());

        let effect_id = finished.effect_id.unwrap();
        let effect = Effect::find_by_id(&db.pool, effect_id).await.unwrap().unwrap();
        assert_eq!(effect.session_id, Some(session.id));
        assert_eq!(effect.description, REFERENCE_PROMPT);
        let report = service.pipeline().score_compliance(&effect);
        assert_eq!(report.total_score, effect.metadata.constitution_score);
        assert_eq!(report.flags(), effect.compliance);
    }

    #[tokio::test]
    async fn file_session_uses_the_extracted_text() {
        let db = DBService::new();
        let service = EffectGenerationService::new(db.clone(), EffectPipeline::new());
        let file = FileRecord::create(
            &db.pool,
            Uuid::new_v4(),
            &CreateFileRecord {
                original_name: "brief.txt".to_string(),
                mime_type: "text/plain".to_string(),
                size_bytes: 42,
                extracted_text: "Swirling galaxy vortex\nwith cosmic stars".to_string(),
            },
        )
        .await
        .unwrap();

        let session = service
            .start_from_file(file.id, GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(session.source, SessionSource::File);
        assert_eq!(session.prompt, "Swirling galaxy vortex with cosmic stars");

        let finished = wait_for_terminal(&db, session.id).await;
        assert_eq!(finished.status, GenerationStatus::Completed);
    }

    #[tokio::test]
    async fn missing_file_is_rejected_up_front() {
        let db = DBService::new();
        let service = EffectGenerationService::new(db.clone(), EffectPipeline::new());
        let missing = Uuid::new_v4();
        let result = service.start_from_file(missing, GenerationOptions::default()).await;
        assert!(matches!(result, Err(PipelineError::FileNotFound(id)) if id == missing));
        assert!(GenerationSession::find_all(&db.pool, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn panicking_stage_marks_the_session_failed() {
        let db = DBService::new();
        let id = Uuid::new_v4();
        GenerationSession::create(
            &db.pool,
            id,
            &CreateGenerationSession {
                source: SessionSource::Prompt,
                prompt: "glow".to_string(),
                file_id: None,
                options: GenerationOptions::default(),
            },
        )
        .await
        .unwrap();

        supervise(db.clone(), id, exploding_stage()).await;

        let session = GenerationSession::find_by_id(&db.pool, id).await.unwrap().unwrap();
        assert_eq!(session.status, GenerationStatus::Failed);
        assert_eq!(
            session.error_message.as_deref(),
            Some("generation failed: optimizer exploded")
        );
        assert!(session.effect_id.is_none());
        assert!(Effect::find_all(&db.pool, &Default::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stage_error_is_recorded_with_its_message() {
        let db = DBService::new();
        let id = Uuid::new_v4();
        GenerationSession::create(
            &db.pool,
            id,
            &CreateGenerationSession {
                source: SessionSource::Prompt,
                prompt: "glow".to_string(),
                file_id: None,
                options: GenerationOptions::default(),
            },
        )
        .await
        .unwrap();

        supervise(db.clone(), id, failing_stage()).await;

        let session = GenerationSession::find_by_id(&db.pool, id).await.unwrap().unwrap();
        assert_eq!(session.status, GenerationStatus::Failed);
        assert_eq!(session.error_message.as_deref(), Some("generation failed: template missing"));
    }
}
