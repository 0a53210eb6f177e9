//! Keyword-pattern task analyzer
//!
//! Classifies a free-text request into a task family by regular expression
//! and maps the family to a capability hint. Requests that look like errands
//! a person has to do themselves are marked unsuitable.

use conductor_application::{TaskAnalysis, TaskAnalyzer};
use conductor_domain::CapabilitySet;
use regex::Regex;

const BASE_CONFIDENCE: f64 = 0.7;
const SPECIFIC_PATTERN_BONUS: f64 = 0.15;
const DETAILED_TEXT_BONUS: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 0.95;
/// A family match must beat this to count as suitable.
const MATCH_THRESHOLD: f64 = 0.6;

const FAMILIES: &[(&str, &[&str])] = &[
    (
        "research",
        &[
            r"\b(research|find|look up|investigate|discover)\b",
            r"\b(what is|how to|why does|when did|where can)\b",
            r"\b(compare|analyze|evaluate|study)\b",
            r"\b(best practices|pros and cons|advantages|trends)\b",
            r"\b(latest|recent|current|new)\b.*\b(developments?|breakthroughs?|advances?)\b",
            r"\b(find|get|gather)\b.*\b(information|data|details)\b",
        ],
    ),
    (
        "information_gathering",
        &[
            r"\b(weather|temperature|forecast)\b",
            r"\b(news|latest|current events)\b",
            r"\b(stock price|market|financial)\b",
            r"\b(time|date|schedule)\b",
            r"\b(recent|latest|current)\b.*\b(updates?|news|info)\b",
        ],
    ),
    (
        "web_search",
        &[
            r"\b(search for|google|find online)\b",
            r"\b(website|url|link)\b",
            r"\b(reviews|ratings|feedback)\b",
        ],
    ),
    (
        "booking",
        &[
            r"\b(book|reserve|schedule)\b",
            r"\b(appointment|meeting|call)\b",
            r"\b(restaurant|hotel|flight)\b",
        ],
    ),
    (
        "automation",
        &[
            r"\b(send email|create document)\b",
            r"\b(fill form|submit application)\b",
            r"\b(download|upload|backup)\b",
        ],
    ),
];

const MANUAL_PATTERNS: &[&str] = &[
    r"\b(buy|purchase|pay)\b.*\b(grocery|groceries|milk|bread)\b",
    r"\b(call|text|message)\b.*\b(mom|dad|friend)\b",
    r"\b(remember|remind me)\b",
    r"\b(pick up|drop off)\b",
];

/// Capability tags requested for a task family.
pub fn capabilities_for(task_type: &str) -> CapabilitySet {
    let tags: &[&str] = match task_type {
        "research" | "information_gathering" | "web_search" => &["research", "web_search"],
        "booking" => &["booking", "web_automation"],
        "automation" => &["web_automation"],
        _ => &[],
    };
    tags.iter().copied().collect()
}

struct Pattern {
    source: &'static str,
    regex: Regex,
}

impl Pattern {
    fn compile(source: &'static str) -> Result<Self, regex::Error> {
        Ok(Self {
            source,
            regex: Regex::new(source)?,
        })
    }
}

pub struct PatternTaskAnalyzer {
    families: Vec<(&'static str, Vec<Pattern>)>,
    manual: Vec<Pattern>,
}

impl PatternTaskAnalyzer {
    pub fn new() -> Result<Self, regex::Error> {
        let families = FAMILIES
            .iter()
            .map(|(name, sources)| {
                let patterns = sources
                    .iter()
                    .map(|s| Pattern::compile(s))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((*name, patterns))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        let manual = MANUAL_PATTERNS
            .iter()
            .map(|s| Pattern::compile(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { families, manual })
    }

    fn confidence(pattern: &Pattern, text: &str) -> f64 {
        let mut confidence = BASE_CONFIDENCE;
        if pattern.source.len() > 20 {
            confidence += SPECIFIC_PATTERN_BONUS;
        }
        if text.chars().count() > 50 {
            confidence += DETAILED_TEXT_BONUS;
        }
        confidence.min(MAX_CONFIDENCE)
    }
}

impl TaskAnalyzer for PatternTaskAnalyzer {
    fn analyze(&self, request: &str) -> TaskAnalysis {
        let text = request.to_lowercase();

        if let Some(pattern) = self.manual.iter().find(|p| p.regex.is_match(&text)) {
            return TaskAnalysis {
                task_type: Some("manual".to_string()),
                ..TaskAnalysis::unsuitable(
                    0.9,
                    format!("Contains pattern indicating manual task: {}", pattern.source),
                )
            };
        }

        let mut best: Option<(&str, &Pattern, f64)> = None;
        for (family, patterns) in &self.families {
            for pattern in patterns.iter().filter(|p| p.regex.is_match(&text)) {
                let confidence = Self::confidence(pattern, &text);
                if best.is_none_or(|(_, _, c)| confidence > c) {
                    best = Some((*family, pattern, confidence));
                }
            }
        }

        match best {
            Some((family, pattern, confidence)) if confidence > MATCH_THRESHOLD => TaskAnalysis {
                suitable: true,
                confidence,
                task_type: Some(family.to_string()),
                capability_hint: capabilities_for(family),
                reasoning: format!("Matches {family} pattern: {}", pattern.source),
            },
            _ => TaskAnalysis {
                task_type: Some("unknown".to_string()),
                ..TaskAnalysis::unsuitable(0.3, "No clear agent-suitable patterns detected")
            },
        }
    }
}
