use std::collections::{BTreeSet, HashMap};

use db::models::effect::{Capability, EffectDna, EffectType};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, warn};
use utils::number::format_decimal;

use super::{
    capabilities,
    effect_templates::{EffectTemplate, templates_for},
};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Z_]+)\}\}").expect("placeholder pattern is valid"));

const DEFAULT_CONCEPT: &str = "effect";
const BASE_PARTICLE_COUNT: f64 = 50.0;

/// Knobs the generator needs from the request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorOptions {
    pub effect_type: EffectType,
    pub target_fps: u32,
    pub max_memory: u32,
    pub enable_constitution: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            effect_type: EffectType::Javascript,
            target_fps: 60,
            max_memory: 256,
            enable_constitution: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCode {
    pub template_id: &'static str,
    pub template_name: &'static str,
    pub category: &'static str,
    pub effect_type: EffectType,
    pub code: String,
    /// Capability blocks already present in `code`
    pub capabilities: BTreeSet<Capability>,
}

/// Picks a template for a DNA record and fills its placeholders
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeGenerator;

impl CodeGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Highest scoring template for `effect_type`, first one wins a tie
    pub fn select_template(&self, dna: &EffectDna, effect_type: EffectType) -> &'static EffectTemplate {
        let templates = templates_for(effect_type);
        let mut best = &templates[0];
        let mut best_score = template_score(best, dna);
        for template in &templates[1..] {
            let score = template_score(template, dna);
            if score > best_score {
                best = template;
                best_score = score;
            }
        }
        debug!(template_id = best.id, score = best_score, "Selected template");
        best
    }

    pub fn generate(&self, dna: &EffectDna, options: &GeneratorOptions) -> GeneratedCode {
        let template = self.select_template(dna, options.effect_type);
        let mut capabilities = BTreeSet::new();

        let constitution = if options.enable_constitution {
            capabilities.insert(Capability::ConstitutionSetup);
            capabilities::constitution_setup(template.effect_type)
        } else {
            ""
        };

        let values = placeholder_values(dna, options, constitution);
        let code = substitute(template.base_code, &values);

        GeneratedCode {
            template_id: template.id,
            template_name: template.name,
            category: template.category,
            effect_type: template.effect_type,
            code,
            capabilities,
        }
    }
}

/// Parse a user supplied type, falling back to JavaScript for anything
/// unrecognised
pub fn resolve_effect_type(raw: &str) -> EffectType {
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(effect_type = raw, "Unknown effect type, using javascript");
        EffectType::Javascript
    })
}

pub fn template_score(template: &EffectTemplate, dna: &EffectDna) -> f64 {
    let profile = &dna.emotional_profile;
    0.4 * template.performance
        + 0.3 * (1.0 - (template.complexity - profile.complexity).abs())
        + 0.3 * (1.0 - (template.energy - profile.energy).abs())
}

pub fn particle_count(dna: &EffectDna) -> u32 {
    let profile = &dna.emotional_profile;
    (BASE_PARTICLE_COUNT + 150.0 * profile.energy + 100.0 * profile.complexity).round() as u32
}

fn placeholder_values(
    dna: &EffectDna,
    options: &GeneratorOptions,
    constitution: &str,
) -> HashMap<&'static str, String> {
    let profile = &dna.emotional_profile;
    let concept = dna
        .primary_concepts
        .first()
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONCEPT);

    HashMap::from([
        ("ENERGY", format_decimal(profile.energy)),
        ("COMPLEXITY", format_decimal(profile.complexity)),
        ("ELEGANCE", format_decimal(profile.elegance)),
        ("TARGET_FPS", options.target_fps.to_string()),
        ("MAX_MEMORY", options.max_memory.to_string()),
        ("PARTICLE_COUNT", particle_count(dna).to_string()),
        ("PRIMARY_CONCEPT", concept.to_string()),
        ("CONSTITUTION", constitution.to_string()),
    ])
}

/// Replace every `{{NAME}}` found in `values` in a single pass. Unknown
/// placeholders are left untouched and substituted text is never rescanned.
pub fn substitute(code: &str, values: &HashMap<&'static str, String>) -> String {
    PLACEHOLDER
        .replace_all(code, |caps: &Captures| match values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use db::models::effect::{EmotionalProfile, TechnicalRequirements};

    use super::*;
    use crate::services::lexical_analyzer::LexicalAnalyzer;

    fn dna(energy: f64, complexity: f64) -> EffectDna {
        EffectDna {
            primary_concepts: vec!["spark".to_string()],
            emotional_profile: EmotionalProfile {
                energy,
                complexity,
                elegance: 0.0,
            },
            technical_requirements: TechnicalRequirements {
                performance: 60.0,
                memory: 256.0,
                compatibility: vec![],
            },
            confidence_score: 0.5,
            constitution_compliance: false,
        }
    }

    #[test]
    fn high_energy_prefers_particle_system() {
        let chosen = CodeGenerator::new().select_template(&dna(1.0, 0.6), EffectType::Javascript);
        assert_eq!(chosen.id, "particle-system");
    }

    #[test]
    fn calm_dna_prefers_cheap_wrapper() {
        let chosen = CodeGenerator::new().select_template(&dna(0.0, 0.0), EffectType::Javascript);
        assert_eq!(chosen.id, "css-animation-wrapper");
    }

    #[test]
    fn selection_is_deterministic() {
        let generator = CodeGenerator::new();
        let dna = LexicalAnalyzer::new().analyze("intense layered plasma vortex");
        for effect_type in [EffectType::Javascript, EffectType::Css, EffectType::AfterEffects] {
            let first = generator.select_template(&dna, effect_type).id;
            for _ in 0..5 {
                assert_eq!(generator.select_template(&dna, effect_type).id, first);
            }
        }
    }

    #[test]
    fn substitutes_every_known_placeholder() {
        let options = GeneratorOptions::default();
        let generated = CodeGenerator::new().generate(&dna(1.0, 0.6), &options);
        assert!(generated.code.contains("this.particleCount = 260;"));
        assert!(generated.code.contains("const TARGET_FPS = 60;"));
        assert!(generated.code.contains("this.energy = 1;"));
        assert!(generated.code.contains("this.complexity = 0.6;"));
        assert!(generated.code.contains("'spark'"));
        // frame time belongs to the optimizer
        assert!(generated.code.contains("{{FRAME_TIME}}"));
        assert!(!generated.code.contains("{{CONSTITUTION}}"));
        assert!(!generated.code.contains("{{ENERGY}}"));
    }

    #[test]
    fn constitution_block_follows_the_option() {
        let generator = CodeGenerator::new();
        let dna = dna(0.5, 0.5);

        let with = generator.generate(&dna, &GeneratorOptions::default());
        assert!(with.code.contains("const constitution = {"));
        assert!(with.capabilities.contains(&Capability::ConstitutionSetup));

        let without = generator.generate(
            &dna,
            &GeneratorOptions {
                enable_constitution: false,
                ..GeneratorOptions::default()
            },
        );
        assert!(!without.code.contains("constitution"));
        assert!(without.capabilities.is_empty());
    }

    #[test]
    fn css_and_after_effects_use_their_own_blocks() {
        let generator = CodeGenerator::new();
        let css = generator.generate(
            &dna(0.2, 0.2),
            &GeneratorOptions {
                effect_type: EffectType::Css,
                ..GeneratorOptions::default()
            },
        );
        assert_eq!(css.effect_type, EffectType::Css);
        assert!(css.code.contains(".spark-"));
        assert!(css.code.contains("/* constitution:"));

        let ae = generator.generate(
            &dna(0.2, 0.2),
            &GeneratorOptions {
                effect_type: EffectType::AfterEffects,
                ..GeneratorOptions::default()
            },
        );
        assert!(ae.code.contains("// constitution:"));
    }

    #[test]
    fn empty_prompt_still_yields_code() {
        let dna = LexicalAnalyzer::new().analyze("");
        let generated = CodeGenerator::new().generate(&dna, &GeneratorOptions::default());
        assert_eq!(generated.template_id, "css-animation-wrapper");
        assert!(generated.code.contains("function oneClickInit(selector)"));
        assert!(generated.code.contains("effect-motion"));
    }

    #[test]
    fn unknown_type_falls_back_to_javascript() {
        assert_eq!(resolve_effect_type("flash"), EffectType::Javascript);
        assert_eq!(resolve_effect_type(" CSS "), EffectType::Css);
        assert_eq!(resolve_effect_type("aftereffects"), EffectType::AfterEffects);
    }

    #[test]
    fn substitution_is_single_pass() {
        let values = HashMap::from([("A", "{{B}}".to_string()), ("B", "b".to_string())]);
        assert_eq!(substitute("{{A}} {{B}} {{C}}", &values), "{{B}} b {{C}}");
    }
}
