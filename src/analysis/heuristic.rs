use async_trait::async_trait;
use chrono::Utc;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::analysis::language::language_name;
use crate::analysis::text::count_words;
use crate::analysis::{AnalysisError, Analyzer};
use crate::domain::{
    AnalysisMethod, AnalysisResult, BehavioralTriggers, Counts, CulturalAdaptations,
    EmotionalAppeals, Examples, HabitFormation, MotivationFramework,
};

/// Examples kept per category
const MAX_EXAMPLES: usize = 10;

/// Characters of context kept on each side of a match
const CONTEXT_CHARS: usize = 20;

const SUPPORT: &[&str] = &[
    "support", "contribute", "fund", "enable", "help", "sustain", "back", "empower",
    "donation", "contribution", "supporting", "help us", "support us", "fund our",
];

const TRANSACTIONAL: &[&str] = &[
    "buy", "purchase", "subscribe", "order", "get", "start", "sign up", "register",
    "checkout", "cart", "payment", "pay", "subscription", "add to cart", "pay now",
];

const MISSION: &[&str] = &[
    "journalism", "democracy", "truth", "independent", "fearless", "quality",
    "investigative", "reporting", "accountability", "public interest", "free press",
    "watchdog", "unbiased", "integrity", "transparency", "fact-based", "rigorous",
    "in-depth", "credible", "trustworthy", "ethical",
];

const FEATURE: &[&str] = &[
    "access", "content", "articles", "digital", "unlimited", "exclusive", "ad-free",
    "premium", "archive", "newsletter", "benefits", "perks", "features", "included",
    "no ads", "early access", "bonus content", "subscriber-only",
];

const IDENTITY: &[&str] = &[
    "member", "supporter", "reader", "partner", "patron", "backer", "champion", "advocate",
    "membership", "insider", "subscriber", "become a member", "loyal reader",
];

const COMMUNITY: &[&str] = &[
    "our", "we", "us", "together", "join", "fellow", "collective", "shared", "common",
    "community", "family", "join us", "we believe", "our mission",
];

const SCARCITY: &[&str] = &[
    "limited time", "ends", "only", "last chance", "today only", "hurry", "final",
    "remaining", "expires", "ending soon", "don't wait", "act now", "limited offer",
    "special offer", "deadline",
];

const SOCIAL_PROOF: &[&str] = &[
    "most popular", "recommended", "bestseller", "readers choice", "trusted by",
    "joined by", "chosen by", "highly rated", "award-winning", "acclaimed", "widely read",
    "join thousands", "trusted source",
];

const SOCIAL_PROOF_PATTERNS: &[&str] = &[
    r"\d+[,\d]*\s*(k|thousand|million|m)?\s*(subscribers?|readers?|members?|supporters?|users?)",
    r"(thousands?|millions?|hundreds?)\s+of\s+(subscribers?|readers?|members?|supporters?|users?)",
];

const LOSS_AVERSION: &[&str] = &[
    "miss", "lose", "don't miss out", "never miss", "missing out", "full access",
    "everything", "without limits", "unrestricted", "lose access", "members only",
    "subscriber exclusive", "complete coverage", "full story",
];

const RECIPROCITY: &[&str] = &[
    "your contribution", "thanks to readers", "rely on", "made possible", "because of you",
    "your support", "reader-funded", "reader-supported", "funded by readers", "your help",
    "make it possible", "readers like you", "supporters like you",
];

const AUTHORITY: &[&str] = &[
    "award", "pulitzer", "experts", "expert", "trusted", "since", "founded", "leading",
    "renowned", "prize", "correspondents",
];

const TEMPORAL: &[&str] = &[
    "daily", "morning", "evening", "weekly", "everyday", "routine", "breakfast", "commute",
    "each day", "every morning", "start your day", "weekend", "morning briefing",
];

const FREQUENCY: &[&str] = &[
    "always", "whenever", "anytime", "regularly", "constantly", "24/7", "ongoing",
    "continuous", "reliable", "on demand", "always available",
];

const CONVENIENCE: &[&str] = &[
    "easy", "simple", "seamless", "convenient", "anywhere", "effortless", "instant",
    "quick", "hassle-free", "one-click", "cancel anytime", "easily", "simply",
];

const PLATFORM: &[&str] = &[
    "app", "mobile", "tablet", "desktop", "device", "devices", "platform", "ios",
    "android", "smartphone", "all your devices", "mobile app", "read on",
];

const FEAR: &[&str] = &[
    "threat", "danger", "crisis", "disinformation", "misinformation", "fake news", "risk",
    "under attack", "lose", "collapse",
];

const HOPE: &[&str] = &[
    "future", "hope", "better", "change", "together we can", "brighter", "possible",
    "progress", "build",
];

const BELONGING: &[&str] = &[
    "join", "community", "family", "belong", "together", "one of us", "fellow",
    "like-minded",
];

const STATUS: &[&str] = &[
    "exclusive", "premium", "elite", "insider", "vip", "first", "privileged", "select",
    "informed",
];

struct Tally {
    count: u32,
    examples: Vec<String>,
}

/// Collects per-category counts and examples for one result section
struct Accumulator {
    total_words: usize,
    counts: Counts,
    examples: Examples,
}

impl Accumulator {
    fn new(total_words: usize) -> Self {
        Self {
            total_words,
            counts: Counts::new(),
            examples: Examples::new(),
        }
    }

    /// Record a tally and return its density against the total word count
    fn add(&mut self, name: &str, tally: Tally) -> f64 {
        self.counts.insert(name.to_string(), tally.count);
        self.examples.insert(name.to_string(), tally.examples);
        ratio(tally.count, self.total_words)
    }

    fn take(&mut self) -> (Counts, Examples) {
        (
            std::mem::take(&mut self.counts),
            std::mem::take(&mut self.examples),
        )
    }
}

/// Word-list analyzer that needs no network access
#[derive(Debug, Clone, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn score(&self, text: &str, publisher: &str, language: &str) -> AnalysisResult {
        let total_words = count_words(text);

        let mut acc = Accumulator::new(total_words);

        let support = find_terms(text, SUPPORT);
        let transactional = find_terms(text, TRANSACTIONAL);
        let support_ratio = if support.count + transactional.count == 0 {
            0.0
        } else {
            f64::from(support.count) / f64::from(support.count + transactional.count)
        };
        acc.add("support", support);
        acc.add("transactional", transactional);

        let mission_density = acc.add("mission", find_terms(text, MISSION));
        let feature_density = acc.add("feature", find_terms(text, FEATURE));
        let identity_score = acc.add("identity", find_terms(text, IDENTITY));
        let community_score = acc.add("community", find_terms(text, COMMUNITY));
        let (counts, examples) = acc.take();
        let motivation_framework = MotivationFramework {
            support_ratio,
            mission_density,
            feature_density,
            identity_score,
            community_score,
            counts,
            examples,
        };

        let mut social_proof = find_terms(text, SOCIAL_PROOF);
        let patterned = find_patterns(text, SOCIAL_PROOF_PATTERNS);
        social_proof.count += patterned.count;
        social_proof.examples.extend(patterned.examples);
        social_proof.examples.truncate(MAX_EXAMPLES);

        let scarcity_score = acc.add("scarcity", find_terms(text, SCARCITY));
        let social_proof_score = acc.add("social_proof", social_proof);
        let loss_aversion_score = acc.add("loss_aversion", find_terms(text, LOSS_AVERSION));
        let reciprocity_score = acc.add("reciprocity", find_terms(text, RECIPROCITY));
        let authority_score = acc.add("authority", find_terms(text, AUTHORITY));
        let (counts, examples) = acc.take();
        let behavioral_triggers = BehavioralTriggers {
            scarcity_score,
            social_proof_score,
            loss_aversion_score,
            reciprocity_score,
            authority_score,
            counts,
            examples,
        };

        let temporal_score = acc.add("temporal", find_terms(text, TEMPORAL));
        let frequency_score = acc.add("frequency", find_terms(text, FREQUENCY));
        let convenience_score = acc.add("convenience", find_terms(text, CONVENIENCE));
        let platform_score = acc.add("platform", find_terms(text, PLATFORM));
        let (counts, examples) = acc.take();
        let habit_formation = HabitFormation {
            temporal_score,
            frequency_score,
            convenience_score,
            platform_score,
            counts,
            examples,
        };

        let fear_score = acc.add("fear", find_terms(text, FEAR));
        let hope_score = acc.add("hope", find_terms(text, HOPE));
        let belonging_score = acc.add("belonging", find_terms(text, BELONGING));
        let status_score = acc.add("status", find_terms(text, STATUS));
        let (_, examples) = acc.take();
        let emotional_appeals = EmotionalAppeals {
            fear_score,
            hope_score,
            belonging_score,
            status_score,
            examples,
        };

        let mut result = AnalysisResult {
            publisher_name: publisher.to_string(),
            detected_language: language.to_string(),
            language_name: language_name(language),
            total_words,
            motivation_framework,
            behavioral_triggers,
            habit_formation,
            emotional_appeals,
            cultural_adaptations: CulturalAdaptations::default(),
            sophistication_score: 0.0,
            primary_strategy: String::new(),
            key_insights: Vec::new(),
            analysis_method: AnalysisMethod::Heuristic,
            model: None,
            analysis_timestamp: Utc::now(),
        };

        result.sophistication_score = sophistication(&result);
        result.primary_strategy = classify_strategy(&result.motivation_framework).to_string();
        result.key_insights = insights(&result);
        result
    }
}

#[async_trait]
impl Analyzer for HeuristicAnalyzer {
    async fn analyze(
        &self,
        text: &str,
        publisher: &str,
        language: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyText);
        }

        let result = self.score(text, publisher, language);
        debug!(
            "Heuristic analysis for {}: sophistication {:.2}, strategy {}",
            publisher, result.sophistication_score, result.primary_strategy
        );
        Ok(result)
    }

    fn method(&self) -> AnalysisMethod {
        AnalysisMethod::Heuristic
    }
}

fn ratio(count: u32, total_words: usize) -> f64 {
    if total_words == 0 {
        return 0.0;
    }
    (f64::from(count) / total_words as f64).clamp(0.0, 1.0)
}

fn term_regex(term: &str) -> Option<Regex> {
    let escaped = regex::escape(term);
    let pattern = if term.contains(' ') {
        escaped
    } else {
        format!(r"\b{escaped}\b")
    };
    RegexBuilder::new(&pattern).case_insensitive(true).build().ok()
}

/// Matched snippet with a little surrounding context, whitespace collapsed
fn context(text: &str, start: usize, end: usize) -> String {
    let before: String = {
        let chars: Vec<char> = text[..start].chars().rev().take(CONTEXT_CHARS).collect();
        chars.into_iter().rev().collect()
    };
    let after: String = text[end..].chars().take(CONTEXT_CHARS).collect();
    format!("{}{}{}", before, &text[start..end], after)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn find_terms(text: &str, terms: &[&str]) -> Tally {
    let mut tally = Tally {
        count: 0,
        examples: Vec::new(),
    };

    for term in terms {
        let Some(re) = term_regex(term) else {
            continue;
        };
        for m in re.find_iter(text) {
            tally.count += 1;
            if tally.examples.len() < MAX_EXAMPLES {
                tally.examples.push(context(text, m.start(), m.end()));
            }
        }
    }
    tally
}

fn find_patterns(text: &str, patterns: &[&str]) -> Tally {
    let mut tally = Tally {
        count: 0,
        examples: Vec::new(),
    };

    for pattern in patterns {
        let Ok(re) = RegexBuilder::new(pattern).case_insensitive(true).build() else {
            continue;
        };
        for m in re.find_iter(text) {
            tally.count += 1;
            if tally.examples.len() < MAX_EXAMPLES {
                tally.examples.push(m.as_str().to_string());
            }
        }
    }
    tally
}

/// Weighted blend of the category scores on a 0-10 scale
fn sophistication(result: &AnalysisResult) -> f64 {
    let m = &result.motivation_framework;
    let b = &result.behavioral_triggers;
    let h = &result.habit_formation;
    let e = &result.emotional_appeals;

    let motivation = (m.support_ratio * 2.0
        + m.mission_density * 100.0
        + m.identity_score * 100.0
        + m.community_score * 100.0)
        / 4.0;
    let behavioral = (b.scarcity_score * 50.0
        + b.social_proof_score * 100.0
        + b.loss_aversion_score * 50.0
        + b.reciprocity_score * 100.0
        + b.authority_score * 75.0)
        / 5.0;
    let habit = (h.temporal_score + h.frequency_score + h.convenience_score + h.platform_score)
        * 100.0
        / 4.0;
    let emotional = (e.fear_score * 50.0
        + e.hope_score * 75.0
        + e.belonging_score * 100.0
        + e.status_score * 75.0)
        / 4.0;

    let scores = [
        b.scarcity_score,
        b.social_proof_score,
        b.loss_aversion_score,
        b.reciprocity_score,
        b.authority_score,
        h.temporal_score,
        h.frequency_score,
        h.convenience_score,
        h.platform_score,
        e.fear_score,
        e.hope_score,
        e.belonging_score,
        e.status_score,
        m.identity_score,
        m.community_score,
        m.mission_density,
    ];
    let non_zero = scores.iter().filter(|s| **s > 0.0).count() as f64;
    let balance = (non_zero / 16.0 * 10.0).min(10.0);

    let total = motivation * 0.3 + behavioral * 0.3 + habit * 0.2 + emotional * 0.1 + balance * 0.1;
    total.clamp(0.0, 10.0)
}

fn classify_strategy(m: &MotivationFramework) -> &'static str {
    let mission = m.mission_density + m.community_score + m.support_ratio;
    let feature = m.feature_density + (1.0 - m.support_ratio);

    if mission > feature * 1.5 {
        "mission-driven"
    } else if feature > mission * 1.5 {
        "feature-driven"
    } else {
        "hybrid"
    }
}

fn insights(result: &AnalysisResult) -> Vec<String> {
    let m = &result.motivation_framework;
    let b = &result.behavioral_triggers;
    let h = &result.habit_formation;
    let e = &result.emotional_appeals;

    let mut insights = Vec::new();
    if m.community_score > 0.02 {
        insights.push("Strong community emphasis".to_string());
    }
    if b.counts.get("social_proof").copied().unwrap_or(0) > 5 {
        insights.push("Extensive social proof usage".to_string());
    }
    if h.counts.values().sum::<u32>() > 10 {
        insights.push("Strong habit formation strategy".to_string());
    }
    if b.reciprocity_score > 0.01 {
        insights.push("Reciprocity-based messaging".to_string());
    }
    if h.platform_score > 0.01 {
        insights.push("Multi-platform accessibility focus".to_string());
    }
    if e.belonging_score > 0.01 {
        insights.push("Strong belonging and identity appeals".to_string());
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSION_PAGE: &str = "Independent journalism needs your support. Our investigative \
        reporting holds power to account. Help us sustain quality journalism and a free press. \
        Join our community of readers who fund fearless reporting. Your support makes it possible.";

    const FEATURE_PAGE: &str = "Get unlimited digital access to all articles. Subscribe now for \
        premium content, the full archive and an ad-free app on every device. Buy a subscription \
        and start reading exclusive newsletters today.";

    #[tokio::test]
    async fn test_mission_page_is_mission_driven() {
        let result = HeuristicAnalyzer::new()
            .analyze(MISSION_PAGE, "The Guardian", "en")
            .await
            .unwrap();

        assert_eq!(result.primary_strategy, "mission-driven");
        assert!(result.motivation_framework.support_ratio > 0.5);
        assert!(result.motivation_framework.counts["mission"] >= 5);
        assert_eq!(result.analysis_method, AnalysisMethod::Heuristic);
        assert_eq!(result.language_name, "English");
        assert!(result.validate().is_ok());
    }

    #[tokio::test]
    async fn test_feature_page_is_feature_driven() {
        let result = HeuristicAnalyzer::new()
            .analyze(FEATURE_PAGE, "The Times", "en")
            .await
            .unwrap();

        assert_eq!(result.primary_strategy, "feature-driven");
        assert!(result.motivation_framework.feature_density > 0.0);
        assert!(result.habit_formation.platform_score > 0.0);
        assert!(result.validate().is_ok());
    }

    #[tokio::test]
    async fn test_social_proof_patterns_counted() {
        let text = "Join 50,000 subscribers and thousands of readers who trust us.";
        let result = HeuristicAnalyzer::new().analyze(text, "Paper", "en").await.unwrap();
        assert!(result.behavioral_triggers.counts["social_proof"] >= 2);
        assert!(result.behavioral_triggers.examples["social_proof"]
            .iter()
            .any(|e| e.contains("50,000 subscribers")));
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let err = HeuristicAnalyzer::new().analyze("   ", "Paper", "en").await.unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyText));
    }

    #[test]
    fn test_word_boundaries_for_single_terms() {
        assert_eq!(find_terms("We support supporters", &["support"]).count, 1);
        assert_eq!(find_terms("Sign up and SIGN UP", &["sign up"]).count, 2);
    }

    #[test]
    fn test_context_is_char_safe() {
        let text = "Předplatné za 99 Kč měsíčně, podpořte nás";
        let tally = find_terms(text, &["podpořte"]);
        assert_eq!(tally.count, 1);
        assert!(tally.examples[0].contains("podpořte"));
    }

    #[test]
    fn test_sophistication_in_range() {
        let result = HeuristicAnalyzer::new().score(MISSION_PAGE, "P", "en");
        assert!((0.0..=10.0).contains(&result.sophistication_score));
        assert!(result.sophistication_score > 0.0);
    }
}
