//! The seven constitution articles and their scoring rules.
//!
//! Every article is scored independently from code markers and the
//! declared performance numbers, except article 7 which also looks at how
//! many of articles 1-6 passed in the same scoring run.

use db::models::effect::{Capability, ComplianceFlags, Effect, EffectCode, EffectDna};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use ts_rs::TS;
use utils::number::{format_decimal, round2};

use super::capabilities::markers;

pub const TARGET_FPS: f64 = 60.0;
pub const FRAME_BUDGET_MS: f64 = 16.67;
pub const MEMORY_BUDGET_MB: f64 = 256.0;
/// Article 1 remedy clamps
pub const ENFORCED_RENDER_TIME_MS: f64 = 15.0;
pub const ENFORCED_FPS: f64 = 60.0;
pub const ENFORCED_MEMORY_MB: f64 = 256.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Article {
    PerformanceAbsolute,
    AdaptiveIntelligence,
    UniversalVersatility,
    PerfectExperience,
    VisualImpact,
    AddictiveEcosystem,
    CompetitiveDomination,
}

impl Article {
    pub const ALL: [Article; 7] = [
        Article::PerformanceAbsolute,
        Article::AdaptiveIntelligence,
        Article::UniversalVersatility,
        Article::PerfectExperience,
        Article::VisualImpact,
        Article::AddictiveEcosystem,
        Article::CompetitiveDomination,
    ];

    pub fn number(self) -> u8 {
        match self {
            Article::PerformanceAbsolute => 1,
            Article::AdaptiveIntelligence => 2,
            Article::UniversalVersatility => 3,
            Article::PerfectExperience => 4,
            Article::VisualImpact => 5,
            Article::AddictiveEcosystem => 6,
            Article::CompetitiveDomination => 7,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Article::PerformanceAbsolute => "Performance Absolute",
            Article::AdaptiveIntelligence => "Adaptive Intelligence",
            Article::UniversalVersatility => "Universal Versatility",
            Article::PerfectExperience => "Perfect Experience",
            Article::VisualImpact => "Visual Impact",
            Article::AddictiveEcosystem => "Addictive Ecosystem",
            Article::CompetitiveDomination => "Competitive Domination",
        }
    }

    /// Weight in percent. The seven weights sum to 100.
    pub fn weight(self) -> f64 {
        match self {
            Article::CompetitiveDomination => 14.2,
            _ => 14.3,
        }
    }

    pub fn pass_bar(self) -> f64 {
        match self {
            Article::CompetitiveDomination => 95.0,
            _ => 90.0,
        }
    }

    /// Capability blocks that address this article. Article 1 is remedied
    /// by clamping metadata instead.
    pub fn remedies(self) -> &'static [Capability] {
        match self {
            Article::PerformanceAbsolute => &[],
            Article::AdaptiveIntelligence => &[
                Capability::AutoCalibration,
                Capability::DeviceDetection,
                Capability::PerformanceMonitor,
            ],
            Article::UniversalVersatility => {
                &[Capability::PlatformFallbacks, Capability::CrossBrowser]
            }
            Article::PerfectExperience => &[
                Capability::OneClickInit,
                Capability::RenderLoop,
                Capability::EventBinding,
            ],
            Article::VisualImpact => &[
                Capability::WowFactor,
                Capability::Physics,
                Capability::Antialiasing,
            ],
            Article::AddictiveEcosystem => &[
                Capability::Immersive,
                Capability::SurpriseVariation,
                Capability::ProgressFeedback,
            ],
            Article::CompetitiveDomination => &[Capability::Innovation],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ArticleReport {
    pub article: Article,
    pub number: u8,
    pub title: String,
    pub weight: f64,
    pub pass_bar: f64,
    /// 0-100, two decimals
    pub score: f64,
    pub compliant: bool,
    pub details: String,
    pub recommendations: Vec<String>,
}

impl ArticleReport {
    pub fn new(article: Article, score: f64, details: String, recommendations: Vec<String>) -> Self {
        let score = round2(score.clamp(0.0, 100.0));
        let compliant = score >= article.pass_bar();
        Self {
            article,
            number: article.number(),
            title: article.title().to_string(),
            weight: article.weight(),
            pass_bar: article.pass_bar(),
            score,
            compliant,
            details,
            recommendations: if compliant { Vec::new() } else { recommendations },
        }
    }
}

/// Per-article breakdown plus the weighted total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ComplianceReport {
    pub articles: Vec<ArticleReport>,
    pub total_score: u32,
}

impl ComplianceReport {
    pub fn from_articles(articles: Vec<ArticleReport>) -> Self {
        let total_score = articles
            .iter()
            .map(|report| report.weight * report.score)
            .sum::<f64>()
            / 100.0;
        Self {
            total_score: total_score.round().max(0.0) as u32,
            articles,
        }
    }

    pub fn article(&self, article: Article) -> Option<&ArticleReport> {
        self.articles.iter().find(|report| report.article == article)
    }

    pub fn flags(&self) -> ComplianceFlags {
        let mut flags = [false; 7];
        for report in &self.articles {
            flags[usize::from(report.number - 1)] = report.compliant;
        }
        ComplianceFlags::from_array(flags)
    }

    pub fn is_fully_compliant(&self) -> bool {
        self.articles.len() == Article::ALL.len() && self.articles.iter().all(|r| r.compliant)
    }

    pub fn non_compliant(&self) -> impl Iterator<Item = Article> + '_ {
        self.articles.iter().filter(|r| !r.compliant).map(|r| r.article)
    }
}

/// Weighted total for seven sub-scores given in article order
pub fn weighted_total(scores: &[f64; 7]) -> u32 {
    let sum: f64 = Article::ALL
        .iter()
        .zip(scores)
        .map(|(article, score)| article.weight() * score)
        .sum();
    (sum / 100.0).round().max(0.0) as u32
}

/// Everything the articles look at
#[derive(Debug, Clone, Copy)]
pub struct ComplianceSubject<'a> {
    pub code: &'a EffectCode,
    pub render_time: f64,
    pub memory_usage: f64,
    pub fps: f64,
    pub dna: &'a EffectDna,
}

impl<'a> From<&'a Effect> for ComplianceSubject<'a> {
    fn from(effect: &'a Effect) -> Self {
        Self {
            code: &effect.code,
            render_time: effect.metadata.render_time,
            memory_usage: effect.metadata.memory_usage,
            fps: effect.metadata.fps,
            dna: &effect.dna,
        }
    }
}

/// Score all seven articles
pub fn assess(subject: &ComplianceSubject<'_>) -> ComplianceReport {
    let mut articles = vec![
        performance_absolute(subject),
        marker_article(
            Article::AdaptiveIntelligence,
            subject,
            &[
                (markers::AUTO_CALIBRATION, 50.0, "Add an autoCalibrate routine"),
                (markers::DEVICE_DETECTION, 25.0, "Add detectDevice for capability probing"),
                (markers::PERFORMANCE_MONITOR, 25.0, "Track frame times with a performanceMonitor"),
            ],
        ),
        universal_versatility(subject),
        marker_article(
            Article::PerfectExperience,
            subject,
            &[
                (markers::ONE_CLICK_INIT, 50.0, "Expose a oneClickInit entry point"),
                (markers::RENDER_LOOP, 30.0, "Drive frames with requestAnimationFrame"),
                (markers::EVENT_BINDING, 20.0, "Bind pointer events with addEventListener"),
            ],
        ),
        marker_article(
            Article::VisualImpact,
            subject,
            &[
                (markers::WOW_FACTOR, 40.0, "Add a wowFactor bloom pass"),
                (markers::PHYSICS, 30.0, "Give motion weight with applyPhysics"),
                (markers::ANTIALIASING, 30.0, "Enable antialias rendering"),
            ],
        ),
        marker_article(
            Article::AddictiveEcosystem,
            subject,
            &[
                (markers::IMMERSIVE, 50.0, "Offer an immersiveMode"),
                (markers::SURPRISE, 30.0, "Vary each run with surpriseVariation"),
                (markers::PROGRESS, 20.0, "Report progressFeedback to the viewer"),
            ],
        ),
    ];

    add_profile_hints(&mut articles, subject.dna);
    let domination = competitive_domination(subject, &articles);
    articles.push(domination);
    ComplianceReport::from_articles(articles)
}

fn performance_absolute(subject: &ComplianceSubject<'_>) -> ArticleReport {
    let fps_part = (40.0 * subject.fps / TARGET_FPS).clamp(0.0, 40.0);
    let render_over = (subject.render_time - FRAME_BUDGET_MS).max(0.0);
    let render_part = (40.0 - 2.4 * render_over).clamp(0.0, 40.0);
    let memory_over = (subject.memory_usage - MEMORY_BUDGET_MB).max(0.0);
    let memory_part = (20.0 - 20.0 * memory_over / MEMORY_BUDGET_MB).clamp(0.0, 20.0);

    let mut recommendations = Vec::new();
    if subject.fps < TARGET_FPS {
        recommendations.push(format!("Raise the target frame rate to {TARGET_FPS} fps"));
    }
    if render_over > 0.0 {
        recommendations.push(format!("Keep render time under {FRAME_BUDGET_MS} ms per frame"));
    }
    if memory_over > 0.0 {
        recommendations.push(format!("Keep memory usage at or below {MEMORY_BUDGET_MB} MB"));
    }

    ArticleReport::new(
        Article::PerformanceAbsolute,
        fps_part + render_part + memory_part,
        format!(
            "{} fps, {} ms per frame, {} MB",
            format_decimal(subject.fps),
            format_decimal(subject.render_time),
            format_decimal(subject.memory_usage)
        ),
        recommendations,
    )
}

fn universal_versatility(subject: &ComplianceSubject<'_>) -> ArticleReport {
    let platforms = subject.code.platforms_with_code();
    let cross_browser = subject.code.contains(markers::CROSS_BROWSER);
    let platform_setup = subject.code.contains(markers::PLATFORM_DETECTION)
        && subject.code.contains(markers::CROSS_BROWSER_SETUP);

    let mut score = 40.0 * platforms as f64 / 3.0;
    let mut recommendations = Vec::new();
    if platforms < 3 {
        recommendations.push("Provide code for web, CSS and After Effects targets".to_string());
    }
    if cross_browser {
        score += 30.0;
    } else {
        recommendations.push("Add a crossBrowser compatibility layer".to_string());
    }
    if platform_setup {
        score += 30.0;
    } else {
        recommendations.push("Call detectPlatform from crossBrowserSetup".to_string());
    }

    ArticleReport::new(
        Article::UniversalVersatility,
        score,
        format!("{platforms}/3 platforms with code"),
        recommendations,
    )
}

fn marker_article(
    article: Article,
    subject: &ComplianceSubject<'_>,
    parts: &[(&str, f64, &str)],
) -> ArticleReport {
    let mut score = 0.0;
    let mut found = Vec::new();
    let mut recommendations = Vec::new();
    for (marker, points, advice) in parts {
        if subject.code.contains(marker) {
            score += points;
            found.push(*marker);
        } else {
            recommendations.push(advice.to_string());
        }
    }
    let details = if found.is_empty() {
        "no markers found".to_string()
    } else {
        format!("found {}", found.join(", "))
    };
    ArticleReport::new(article, score, details, recommendations)
}

fn add_profile_hints(articles: &mut [ArticleReport], dna: &EffectDna) {
    let profile = &dna.emotional_profile;
    for report in articles.iter_mut().filter(|r| !r.compliant) {
        match report.article {
            Article::VisualImpact if profile.energy < 0.3 => report.recommendations.push(format!(
                "Prompt energy is {}; more energetic wording picks livelier templates",
                format_decimal(profile.energy)
            )),
            Article::AddictiveEcosystem if profile.elegance < 0.2 => {
                report.recommendations.push(format!(
                    "Prompt elegance is {}; smoother motion keeps viewers engaged",
                    format_decimal(profile.elegance)
                ))
            }
            _ => {}
        }
    }
}

fn competitive_domination(subject: &ComplianceSubject<'_>, earlier: &[ArticleReport]) -> ArticleReport {
    let passed = earlier.iter().filter(|r| r.compliant).count();
    let innovation = subject.code.contains(markers::INNOVATION);
    let fast = subject.render_time < 10.0 && subject.fps >= TARGET_FPS && subject.memory_usage < 200.0;

    let mut score = 40.0 * passed as f64 / 6.0;
    let mut recommendations = Vec::new();
    if passed < 6 {
        recommendations.push(format!("Bring the other articles into compliance ({passed}/6 passing)"));
    }
    if innovation {
        score += 30.0;
    } else {
        recommendations.push("Add an innovationEngine".to_string());
    }
    if fast {
        score += 30.0;
    } else {
        recommendations.push("Reach under 10 ms per frame at 60 fps within 200 MB".to_string());
    }

    ArticleReport::new(
        Article::CompetitiveDomination,
        score,
        format!("{passed}/6 articles passing"),
        recommendations,
    )
}

#[cfg(test)]
mod tests {
    use db::models::effect::{EffectType, EmotionalProfile, TechnicalRequirements};

    use super::*;
    use crate::services::capabilities::{self, block};

    fn dna() -> EffectDna {
        EffectDna {
            primary_concepts: vec![],
            emotional_profile: EmotionalProfile::default(),
            technical_requirements: TechnicalRequirements {
                performance: 60.0,
                memory: 256.0,
                compatibility: vec![],
            },
            confidence_score: 0.0,
            constitution_compliance: false,
        }
    }

    fn subject<'a>(code: &'a EffectCode, dna: &'a EffectDna) -> ComplianceSubject<'a> {
        ComplianceSubject {
            code,
            render_time: 5.0,
            memory_usage: 64.0,
            fps: 60.0,
            dna,
        }
    }

    fn synthetic(scores: [f64; 7]) -> Vec<ArticleReport> {
        Article::ALL
            .iter()
            .zip(scores)
            .map(|(article, score)| ArticleReport::new(*article, score, String::new(), vec![]))
            .collect()
    }

    #[test]
    fn weights_sum_to_one_hundred() {
        let sum: f64 = Article::ALL.iter().map(|a| a.weight()).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn total_is_rounded_weighted_sum() {
        let cases = [
            [100.0; 7],
            [0.0; 7],
            [50.0; 7],
            [100.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 100.0],
            [93.5, 75.0, 13.33, 100.0, 40.0, 0.0, 66.67],
            [12.34, 56.78, 90.12, 34.56, 78.9, 1.23, 45.67],
        ];
        for scores in cases {
            let expected = Article::ALL
                .iter()
                .zip(scores)
                .map(|(a, s)| a.weight() * s)
                .sum::<f64>()
                / 100.0;
            let report = ComplianceReport::from_articles(synthetic(scores));
            assert_eq!(report.total_score, expected.round() as u32, "{scores:?}");
            assert_eq!(weighted_total(&scores), report.total_score);
        }
        assert_eq!(weighted_total(&[100.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]), 14);
        assert_eq!(weighted_total(&[100.0; 7]), 100);
    }

    #[test]
    fn flags_match_pass_bars() {
        let report = ComplianceReport::from_articles(synthetic([90.0, 89.99, 100.0, 0.0, 95.0, 90.0, 94.99]));
        for article in &report.articles {
            assert_eq!(article.compliant, article.score >= article.pass_bar);
        }
        assert_eq!(
            report.flags().as_array(),
            [true, false, true, false, true, true, false]
        );
        let article_seven = report.article(Article::CompetitiveDomination);
        assert_eq!(article_seven.map(|r| r.pass_bar), Some(95.0));
    }

    #[test]
    fn performance_article_penalises_slow_heavy_effects() {
        let code = EffectCode::default();
        let dna = dna();
        let fast = assess(&subject(&code, &dna));
        assert_eq!(fast.article(Article::PerformanceAbsolute).map(|r| r.score), Some(100.0));

        let slow = ComplianceSubject {
            render_time: 26.67,
            memory_usage: 384.0,
            fps: 30.0,
            ..subject(&code, &dna)
        };
        let report = assess(&slow);
        let article = report.article(Article::PerformanceAbsolute);
        // 20 + 16 + 10
        assert_eq!(article.map(|r| r.score), Some(46.0));
        assert_eq!(article.map(|r| r.recommendations.len()), Some(3));
    }

    #[test]
    fn empty_code_scores_zero_on_marker_articles() {
        let code = EffectCode::default();
        let dna = dna();
        let report = assess(&subject(&code, &dna));
        for article in [
            Article::AdaptiveIntelligence,
            Article::UniversalVersatility,
            Article::PerfectExperience,
            Article::VisualImpact,
            Article::AddictiveEcosystem,
        ] {
            assert_eq!(report.article(article).map(|r| r.score), Some(0.0), "{article}");
        }
        // one article passing, fast and no innovation marker
        let seven = report.article(Article::CompetitiveDomination);
        assert_eq!(seven.map(|r| r.score), Some(round2(40.0 / 6.0 + 30.0)));
    }

    #[test]
    fn markers_earn_their_points() {
        let code = EffectCode::single(
            EffectType::Javascript,
            format!(
                "{}\n{}",
                block(Capability::AutoCalibration),
                block(Capability::PerformanceMonitor)
            ),
        );
        let dna = dna();
        let report = assess(&subject(&code, &dna));
        let adaptive = report.article(Article::AdaptiveIntelligence);
        assert_eq!(adaptive.map(|r| r.score), Some(75.0));
        assert_eq!(adaptive.map(|r| r.compliant), Some(false));
    }

    #[test]
    fn full_marker_set_passes_everything() {
        let mut js = String::new();
        for capability in Article::ALL.iter().flat_map(|a| a.remedies()) {
            capabilities::append_block(&mut js, block(*capability));
        }
        let code = EffectCode {
            javascript: js,
            css: capabilities::platform_fallback(EffectType::Css).to_string(),
            after_effects: capabilities::platform_fallback(EffectType::AfterEffects).to_string(),
        };
        let dna = dna();
        let report = assess(&subject(&code, &dna));
        assert!(report.is_fully_compliant(), "{report:?}");
        assert_eq!(report.total_score, 100);
        assert!(report.articles.iter().all(|r| r.recommendations.is_empty()));
    }

    #[test]
    fn low_energy_prompt_gets_a_hint() {
        let code = EffectCode::default();
        let dna = dna();
        let report = assess(&subject(&code, &dna));
        let impact = report.article(Article::VisualImpact);
        assert!(impact.is_some_and(|r| r.recommendations.iter().any(|s| s.contains("energy is 0"))));
    }
}
