//! Keyword analysis of free-text prompts.
//!
//! A prompt is lowercased, stripped of punctuation and split on whitespace;
//! tokens of two characters or fewer are dropped. Everything downstream is
//! plain set membership against the fixed word lists below.

use db::models::effect::{EffectDna, EmotionalProfile, TechnicalRequirements};
use tracing::debug;
use utils::number::round2;

/// Effect concepts recognised in prompts
pub const VOCABULARY: &[&str] = &[
    "particle", "particles", "explosion", "explosive", "glow", "glowing", "blur", "plasma",
    "fire", "smoke", "spark", "sparks", "burst", "trail", "trails", "wave", "ripple", "neon",
    "light", "shadow", "gradient", "morph", "rotate", "spin", "pulse", "fade", "bounce",
    "shimmer", "liquid", "fluid", "galaxy", "star", "stars", "cosmic", "lightning", "energy",
    "matrix", "glitch", "fractal", "vortex",
];

pub const ENERGY_WORDS: &[&str] = &["fast", "explosive", "dynamic", "intense", "powerful"];
pub const COMPLEXITY_WORDS: &[&str] = &["complex", "detailed", "intricate", "layered", "advanced"];
pub const ELEGANCE_WORDS: &[&str] = &["smooth", "elegant", "subtle", "graceful", "soft"];

const HEAVY_WORDS: &[&str] = &[
    "complex", "detailed", "realistic", "massive", "thousands", "heavy", "intricate",
];
const LIGHT_WORDS: &[&str] = &["simple", "minimal", "light", "subtle", "clean", "lightweight"];

pub const CONSTITUTION_KEYWORDS: &[&str] = &[
    "performance", "fast", "smooth", "adaptive", "seamless", "stunning", "ultimate",
    "responsive", "optimized", "efficient", "fluid", "interactive", "immersive", "intelligent",
    "universal", "perfect", "powerful", "dynamic", "realtime", "beautiful",
];

pub const MAX_CONCEPTS: usize = 5;
/// Prompts must mention at least this many constitution keywords to be flagged
pub const CONSTITUTION_KEYWORD_THRESHOLD: usize = 2;

const BASE_FPS: f64 = 60.0;
const MIN_FPS: f64 = 30.0;
const BASE_MEMORY_MB: f64 = 256.0;
const MIN_MEMORY_MB: f64 = 64.0;

pub const COMPATIBILITY: &[&str] = &["web", "mobile", "desktop"];

/// Derives [`EffectDna`] from prompt text. Holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalAnalyzer;

impl LexicalAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, text: &str) -> EffectDna {
        let tokens = tokenize(text);
        let total = tokens.len();

        let primary_concepts = extract_concepts(&tokens);
        let vocabulary_hits = count_in(&tokens, VOCABULARY);

        let emotional_profile = EmotionalProfile {
            energy: ratio(count_in(&tokens, ENERGY_WORDS), total),
            complexity: ratio(count_in(&tokens, COMPLEXITY_WORDS), total),
            elegance: ratio(count_in(&tokens, ELEGANCE_WORDS), total),
        };

        let heaviness =
            ratio(count_in(&tokens, HEAVY_WORDS), total) - ratio(count_in(&tokens, LIGHT_WORDS), total);
        let technical_requirements = TechnicalRequirements {
            performance: round2((BASE_FPS - heaviness * 30.0).max(MIN_FPS)),
            memory: round2((BASE_MEMORY_MB + heaviness * 256.0).max(MIN_MEMORY_MB)),
            compatibility: COMPATIBILITY.iter().map(|p| p.to_string()).collect(),
        };

        let confidence_score = if total == 0 {
            0.0
        } else {
            let coverage = ratio(vocabulary_hits, total);
            let concept_ratio = primary_concepts.len() as f64 / MAX_CONCEPTS as f64;
            ((coverage + concept_ratio) / 2.0).clamp(0.0, 1.0)
        };

        let constitution_compliance =
            count_in(&tokens, CONSTITUTION_KEYWORDS) >= CONSTITUTION_KEYWORD_THRESHOLD;

        debug!(
            tokens = total,
            concepts = ?primary_concepts,
            confidence = confidence_score,
            "Analyzed prompt"
        );

        EffectDna {
            primary_concepts,
            emotional_profile,
            technical_requirements,
            confidence_score,
            constitution_compliance,
        }
    }
}

/// Lowercase, drop punctuation, split on whitespace, keep tokens longer
/// than two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| token.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Vocabulary tokens ordered by descending frequency. Equal frequencies keep
/// the order in which the words first appeared.
fn extract_concepts(tokens: &[String]) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for token in tokens.iter().filter(|t| VOCABULARY.contains(&t.as_str())) {
        match counts.iter_mut().find(|(word, _)| *word == token.as_str()) {
            Some((_, count)) => *count += 1,
            None => counts.push((token.as_str(), 1)),
        }
    }
    // stable sort keeps first-seen order among ties
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(MAX_CONCEPTS)
        .map(|(word, _)| word.to_string())
        .collect()
}

fn count_in(tokens: &[String], words: &[&str]) -> usize {
    tokens.iter().filter(|t| words.contains(&t.as_str())).count()
}

fn ratio(hits: usize, total: usize) -> f64 {
    (hits as f64 / total.max(1) as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(text: &str) -> EffectDna {
        LexicalAnalyzer::new().analyze(text)
    }

    #[test]
    fn tokenize_strips_punctuation_and_short_tokens() {
        assert_eq!(
            tokenize("A GLOW, on the neon-sign!"),
            vec!["glow", "the", "neonsign"]
        );
    }

    #[test]
    fn empty_input_yields_zero_dna() {
        let dna = analyze("");
        assert!(dna.primary_concepts.is_empty());
        assert_eq!(dna.emotional_profile, EmotionalProfile::default());
        assert_eq!(dna.confidence_score, 0.0);
        assert!(!dna.constitution_compliance);
        assert_eq!(dna.technical_requirements.performance, 60.0);
        assert_eq!(dna.technical_requirements.memory, 256.0);
        assert_eq!(dna.technical_requirements.compatibility, vec!["web", "mobile", "desktop"]);
    }

    #[test]
    fn only_short_tokens_behaves_like_empty() {
        let dna = analyze("a an of ?? !!");
        assert!(dna.primary_concepts.is_empty());
        assert_eq!(dna.confidence_score, 0.0);
    }

    #[test]
    fn reference_prompt_profile() {
        let dna = analyze("A fast explosive particle burst with smooth glowing trails");

        assert_eq!(
            dna.primary_concepts,
            vec!["explosive", "particle", "burst", "glowing", "trails"]
        );
        // 8 tokens: fast + explosive are energy words, smooth is elegance
        assert_eq!(dna.emotional_profile.energy, 0.25);
        assert_eq!(dna.emotional_profile.elegance, 0.125);
        assert_eq!(dna.emotional_profile.complexity, 0.0);
        assert_eq!(dna.confidence_score, (5.0 / 8.0 + 1.0) / 2.0);
        assert!(dna.constitution_compliance);
    }

    #[test]
    fn concepts_sorted_by_frequency_then_first_seen() {
        let dna = analyze("spark glow spark plasma glow spark fire smoke neon vortex");
        assert_eq!(
            dna.primary_concepts,
            vec!["spark", "glow", "plasma", "fire", "smoke"]
        );
    }

    #[test]
    fn concepts_are_capped_and_drawn_from_vocabulary() {
        let dna = analyze(
            "galaxy star cosmic lightning vortex fractal glitch matrix banana rotate spin",
        );
        assert_eq!(dna.primary_concepts.len(), MAX_CONCEPTS);
        assert!(
            dna.primary_concepts
                .iter()
                .all(|c| VOCABULARY.contains(&c.as_str()))
        );
    }

    #[test]
    fn heavy_prompts_lower_fps_and_raise_memory() {
        let dna = analyze("massive detailed realistic heavy");
        assert_eq!(dna.technical_requirements.performance, 30.0);
        assert_eq!(dna.technical_requirements.memory, 512.0);

        let light = analyze("simple minimal clean");
        assert_eq!(light.technical_requirements.performance, 90.0);
        assert_eq!(light.technical_requirements.memory, 64.0);
    }

    #[test]
    fn ratios_stay_in_unit_interval() {
        let prompts = [
            "fast fast fast fast",
            "smooth",
            "glow glow glow glow glow glow",
            "complex intricate detailed layered advanced",
            "¿¡ unicode ünïcødé 日本語 テキスト !!",
        ];
        for prompt in prompts {
            let dna = analyze(prompt);
            let profile = dna.emotional_profile;
            for value in [profile.energy, profile.complexity, profile.elegance, dna.confidence_score] {
                assert!((0.0..=1.0).contains(&value), "{prompt}: {value}");
            }
            assert!(dna.primary_concepts.len() <= MAX_CONCEPTS);
        }
    }

    #[test]
    fn one_constitution_keyword_is_not_enough() {
        assert!(!analyze("a smooth glow").constitution_compliance);
        assert!(analyze("a smooth adaptive glow").constitution_compliance);
    }
}
