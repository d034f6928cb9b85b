//! Post Scorer: a pure 0-8 quality rubric over generated text, grounded in
//! the original implementation's `analyze/scorer.py`.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which structural band a text must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    /// A standalone post.
    Original,
    /// Commentary attached to a quoted source post.
    QuoteRt,
}

impl Default for PostType {
    fn default() -> Self {
        Self::Original
    }
}

impl PostType {
    /// `[min, max]` character count (newlines stripped) allowed for this type.
    pub fn length_band(self) -> (usize, usize) {
        match self {
            Self::Original => (40, 280),
            Self::QuoteRt => (30, 250),
        }
    }
}

/// Letter rank derived from `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rank {
    /// `total >= 8`.
    S,
    /// `total >= 6`.
    A,
    /// `total >= 4`.
    B,
    /// Otherwise.
    C,
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        };
        write!(f, "{s}")
    }
}

fn rank_for(total: i32) -> Rank {
    if total >= 8 {
        Rank::S
    } else if total >= 6 {
        Rank::A
    } else if total >= 4 {
        Rank::B
    } else {
        Rank::C
    }
}

/// The full rubric output for one piece of generated text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    /// `max(0, hook + specificity + humanity + structure + cta + penalty)`.
    pub total: i32,
    /// 0-2: strength of the opening line.
    pub hook: i32,
    /// 0-2: presence of concrete numbers/comparisons.
    pub specificity: i32,
    /// 0-2: casual-voice markers vs. AI-smell markers.
    pub humanity: i32,
    /// 0-1: length and line-count band.
    pub structure: i32,
    /// 0-1: closing call-to-action presence.
    pub cta: i32,
    /// <= 0: deductions for URL/hashtag/length violations.
    pub penalty: i32,
    /// Human-readable rationale per sub-score, for dashboard/notifier display.
    pub details: HashMap<String, String>,
    /// Letter rank derived from `total`.
    pub rank: Rank,
}

impl Default for ScoreResult {
    fn default() -> Self {
        Self {
            total: 0,
            hook: 0,
            specificity: 0,
            humanity: 0,
            structure: 0,
            cta: 0,
            penalty: 0,
            details: HashMap::new(),
            rank: Rank::C,
        }
    }
}

fn strong_hook_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(正直|実は|ここだけの話|結論から|断言|警告|ヤバい|衝撃)").unwrap()
    })
}

fn medium_hook_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(最近|今日|先日|ふと|個人的に)").unwrap())
}

fn digit_unit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d+\s*(時間|分|万円|円|%|倍|個|件|本|日|週|月|人|回)").unwrap()
    })
}

fn comparison_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(→|⇒|から.*に|が.*に)").unwrap())
}

fn tool_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(Rust|Python|Claude|GPT|Cargo|crate)").unwrap())
}

const CASUAL_MARKERS: &[&str] = &["マジで", "ぶっちゃけ", "〜だよね", "〜じゃん", "笑", "www"];
const AI_SMELL_MARKERS: &[&str] = &[
    "〜することができます",
    "重要です",
    "以下の通り",
    "まとめると",
    "いかがでしたか",
];

fn cta_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        vec![
            Regex::new(r"(?i)(試して|やってみて|フォロー|リンク|詳しくは|どう思う\?)").unwrap(),
            Regex::new(r"[。．]\s*$").unwrap(),
        ]
    })
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").unwrap())
}

fn hashtag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\S+").unwrap())
}

fn score_hook(first_line: &str) -> (i32, &'static str) {
    if strong_hook_re().is_match(first_line) {
        (2, "strong hook opener")
    } else if medium_hook_re().is_match(first_line) {
        (1, "medium hook opener")
    } else {
        (0, "no recognizable hook")
    }
}

fn score_specificity(text: &str) -> (i32, &'static str) {
    let digit_unit_hits = digit_unit_re().find_iter(text).count();
    if digit_unit_hits >= 2 || (digit_unit_hits >= 1 && comparison_re().is_match(text)) {
        (2, "concrete numbers with comparison")
    } else if digit_unit_hits >= 1
        || text.chars().any(|c| c.is_ascii_digit())
        || tool_name_re().is_match(text)
    {
        (1, "some concrete detail")
    } else {
        (0, "no concrete detail")
    }
}

fn score_humanity(text: &str) -> (i32, &'static str) {
    let casual = CASUAL_MARKERS.iter().filter(|m| text.contains(*m)).count();
    let ai_smell = AI_SMELL_MARKERS.iter().filter(|m| text.contains(*m)).count();
    if casual >= 2 && ai_smell == 0 {
        (2, "strongly casual voice")
    } else if casual >= 1 && ai_smell <= 1 {
        (1, "somewhat casual voice")
    } else {
        (0, "reads like AI-generated boilerplate")
    }
}

fn score_structure(text_no_newlines_len: usize, line_count: usize, band: (usize, usize)) -> (i32, &'static str) {
    if text_no_newlines_len >= band.0 && text_no_newlines_len <= band.1 && line_count >= 3 {
        (1, "length and line breaks in band")
    } else {
        (0, "length or line breaks out of band")
    }
}

fn score_cta(lines: &[&str]) -> (i32, &'static str) {
    let tail: String = lines.iter().rev().take(2).cloned().collect::<Vec<_>>().join("\n");
    if cta_patterns().iter().any(|re| re.is_match(&tail)) {
        (1, "closes with a call to action")
    } else {
        (0, "no closing call to action")
    }
}

/// Score `text` (as a `post_type`-typed candidate) against the 0-8 rubric.
pub fn score_post(text: &str, post_type: PostType) -> ScoreResult {
    let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
    let first_line = lines.first().copied().unwrap_or(text);
    let no_newlines: String = text.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    let char_len = no_newlines.chars().count();

    let mut details = HashMap::new();

    let (hook, hook_why) = score_hook(first_line);
    details.insert("hook".to_string(), hook_why.to_string());

    let (specificity, spec_why) = score_specificity(text);
    details.insert("specificity".to_string(), spec_why.to_string());

    let (humanity, hum_why) = score_humanity(text);
    details.insert("humanity".to_string(), hum_why.to_string());

    let (structure, struct_why) = score_structure(char_len, lines.len(), post_type.length_band());
    details.insert("structure".to_string(), struct_why.to_string());

    let (cta, cta_why) = score_cta(&lines);
    details.insert("cta".to_string(), cta_why.to_string());

    let mut penalty = 0;
    let mut penalty_reasons = Vec::new();
    if url_re().is_match(text) {
        penalty -= 1;
        penalty_reasons.push("contains a URL");
    }
    if hashtag_re().find_iter(text).count() > 3 {
        penalty -= 1;
        penalty_reasons.push("more than 3 hashtags");
    }
    if char_len > 280 {
        penalty -= 1;
        penalty_reasons.push("exceeds 280 characters");
    }
    details.insert(
        "penalty".to_string(),
        if penalty_reasons.is_empty() {
            "no penalties".to_string()
        } else {
            penalty_reasons.join(", ")
        },
    );

    let raw_total = hook + specificity + humanity + structure + cta + penalty;
    let total = raw_total.max(0);

    ScoreResult {
        total,
        hook,
        specificity,
        humanity,
        structure,
        cta,
        penalty,
        details,
        rank: rank_for(total),
    }
}
