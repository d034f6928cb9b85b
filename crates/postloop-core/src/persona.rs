//! Persona Analyzer: derives a [`PersonaProfile`] from a sample of an
//! account's past posts, grounded in the original implementation's
//! `analyze/persona_analyzer.py`.

use std::collections::HashMap;
use std::sync::OnceLock;

use rand::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::llm::{GenerationParams, LlmProvider};

const FIRST_PERSONS: &[&str] = &[
    "僕", "俺", "私", "自分", "ワイ", "わし", "うち", "あたし", "おれ", "ぼく", "わたし",
];

const EMOTION_WORDS: &[&str] = &[
    "マジで", "ガチで", "ガチ", "まじで", "えぐい", "やばい", "ヤバい", "最強", "最高", "神",
    "鬼", "半端ない", "めちゃくちゃ", "めっちゃ", "すごい", "凄い", "ありえない", "しんどい",
    "つらい", "嬉しい", "楽しい", "面白い", "おもろい", "怖い", "こわい", "ぶっちゃけ", "正直",
    "率直に", "控えめに言って", "割と", "結構", "かなり", "なかなか", "相当", "圧倒的", "激しく",
    "猛烈に", "劇的に", "爆速", "秒速",
];

/// `(regex, label)` pairs tried in order against a line's tail.
fn ending_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let raw: &[(&str, &str)] = &[
            (r"[だよ。]+$", "だよ。"),
            (r"[だな。]+$", "だな。"),
            (r"[だね。]+$", "だね。"),
            (r"[だよね。]+$", "だよね。"),
            (r"[じゃん。]+$", "じゃん。"),
            (r"[よな。]+$", "よな。"),
            (r"[よね。]+$", "よね。"),
            (r"[けど。]+$", "けど。"),
            (r"[けどね。]+$", "けどね。"),
            (r"してる。?$", "してる。"),
            (r"している。?$", "している。"),
            (r"と思う。?$", "と思う。"),
            (r"かもしれない。?$", "かもしれない。"),
            (r"一択。?$", "一択。"),
            (r"な気がする。?$", "な気がする。"),
            (r"[ですね。]+$", "ですね。"),
            (r"[ですよ。]+$", "ですよ。"),
            (r"[ますね。]+$", "ますね。"),
            (r"[ました。]+$", "ました。"),
            (r"[でした。]+$", "でした。"),
        ];
        raw.iter()
            .map(|(p, label)| (Regex::new(p).expect("ending pattern must compile"), *label))
            .collect()
    })
}

fn nominal_stop_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[一-鿿ァ-ヶー]+[。．]?$")
            .expect("nominal-stop regex must compile")
    })
}

fn emoji_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"[\u{1F300}-\u{1F64F}\u{1F680}-\u{1F6FF}\u{1F1E0}-\u{1F1FF}\u{2600}-\u{27BF}\u{1FA00}-\u{1FAFF}]",
        )
        .expect("emoji regex must compile")
    })
}

fn desu_masu_ending_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(です|ます|ました|でした|ません)[。！？!?\s]*$")
            .expect("desu/masu regex must compile")
    })
}

fn casual_ending_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(だよ|だな|じゃん|よな|してる|してた)[。！？!?\s]*$")
            .expect("casual ending regex must compile")
    })
}

fn is_kanji(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Per-account style profile, rebuilt explicitly from a supplied corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaProfile {
    /// The source account's handle, if known.
    pub username: String,
    /// Display name, if known.
    pub display_name: String,
    /// Profile bio text, if known.
    pub bio: String,
    /// How many posts went into this profile.
    pub tweet_count_analyzed: usize,
    /// Most frequent first-person pronoun.
    pub first_person: String,
    /// Fraction of samples containing `first_person`.
    pub first_person_frequency: f64,
    /// Top 10 sentence-ending patterns, most frequent first.
    pub sentence_endings: Vec<String>,
    /// 4-15 char chunks appearing at least 3 times.
    pub catchphrases: Vec<String>,
    /// Emotion/intensity words present, most frequent first.
    pub emotion_words: Vec<String>,
    /// Mean character length across samples.
    pub avg_tweet_length: f64,
    /// Mean line count across samples.
    pub avg_line_count: f64,
    /// `true` if more than 10% of samples contain an emoji.
    pub uses_emoji: bool,
    /// Fraction of samples containing at least one emoji.
    pub emoji_frequency: f64,
    /// Most frequent emoji characters.
    pub top_emojis: Vec<String>,
    /// Kanji character count over total character count.
    pub kanji_ratio: f64,
    /// Human-readable punctuation/line-break style buckets, comma-joined.
    pub punctuation_style: String,
    /// `politeベース | casualベース | mixed` formality bucket.
    pub formality_level: String,
    /// AI-derived tone description. Empty if the optional LLM step ran or failed.
    pub tone: String,
    /// AI-derived topic list.
    pub topics: Vec<String>,
    /// AI-derived content-type mix (label -> fraction).
    pub content_types: HashMap<String, f64>,
    /// AI-derived 200-char prompt-ready summary.
    pub prompt_summary: String,
    /// 5-8 exemplar posts for prompt injection.
    pub sample_tweets: Vec<String>,
}

/// Build a profile from statistical analysis alone (no LLM call).
pub fn analyze_account(
    tweets: &[String],
    username: &str,
    display_name: &str,
    bio: &str,
) -> PersonaProfile {
    analyze_account_with_rng(tweets, username, display_name, bio, &mut thread_rng())
}

/// Testable sibling of [`analyze_account`] taking an injected RNG so sample
/// selection is deterministic.
pub fn analyze_account_with_rng(
    tweets: &[String],
    username: &str,
    display_name: &str,
    bio: &str,
    rng: &mut impl Rng,
) -> PersonaProfile {
    let mut profile = PersonaProfile {
        username: username.to_string(),
        display_name: display_name.to_string(),
        bio: bio.to_string(),
        tweet_count_analyzed: tweets.len(),
        ..Default::default()
    };

    if tweets.is_empty() {
        return profile;
    }

    analyze_first_person(tweets, &mut profile);
    analyze_sentence_endings(tweets, &mut profile);
    analyze_emotion_words_and_catchphrases(tweets, &mut profile);
    analyze_emoji(tweets, &mut profile);
    analyze_structure(tweets, &mut profile);
    analyze_punctuation(tweets, &mut profile);
    select_sample_tweets(tweets, &mut profile, rng);

    profile
}

fn analyze_first_person(tweets: &[String], profile: &mut PersonaProfile) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tweet in tweets {
        for fp in FIRST_PERSONS {
            if tweet.contains(fp) {
                *counts.entry(*fp).or_insert(0) += 1;
            }
        }
    }
    if let Some((fp, count)) = counts.into_iter().max_by_key(|(_, c)| *c) {
        profile.first_person = fp.to_string();
        profile.first_person_frequency = count as f64 / tweets.len() as f64;
    }
}

fn analyze_sentence_endings(tweets: &[String], profile: &mut PersonaProfile) {
    let mut counts: HashMap<&'static str, usize> = HashMap::new();
    for tweet in tweets {
        for line in tweet.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if nominal_stop_re().is_match(line) {
                *counts.entry("体言止め").or_insert(0) += 1;
            }
            for (re, label) in ending_patterns() {
                if re.is_match(line) {
                    *counts.entry(*label).or_insert(0) += 1;
                    break;
                }
            }
        }
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    profile.sentence_endings = ranked.into_iter().take(10).map(|(l, _)| l.to_string()).collect();
}

fn catchphrase_segments(tweet: &str) -> impl Iterator<Item = &str> {
    tweet.split(['。', '\n', '、', '！', '？', '!', '?']).filter_map(|seg| {
        let seg = seg.trim();
        let len = seg.chars().count();
        if (4..=15).contains(&len) {
            Some(seg)
        } else {
            None
        }
    })
}

fn analyze_emotion_words_and_catchphrases(tweets: &[String], profile: &mut PersonaProfile) {
    let all_text = tweets.join(" ");
    let mut emotion_counts: Vec<(&str, usize)> = EMOTION_WORDS
        .iter()
        .filter_map(|word| {
            let count = all_text.matches(word).count();
            if count > 0 {
                Some((*word, count))
            } else {
                None
            }
        })
        .collect();
    emotion_counts.sort_by(|a, b| b.1.cmp(&a.1));
    profile.emotion_words = emotion_counts.into_iter().take(15).map(|(w, _)| w.to_string()).collect();

    let mut phrase_counts: HashMap<&str, usize> = HashMap::new();
    for tweet in tweets {
        for seg in catchphrase_segments(tweet) {
            *phrase_counts.entry(seg).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = phrase_counts.into_iter().filter(|(_, c)| *c >= 3).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    profile.catchphrases = ranked.into_iter().take(10).map(|(p, _)| p.to_string()).collect();
}

fn analyze_emoji(tweets: &[String], profile: &mut PersonaProfile) {
    let mut emoji_counts: HashMap<String, usize> = HashMap::new();
    let mut with_emoji = 0usize;
    for tweet in tweets {
        let mut found_any = false;
        for m in emoji_re().find_iter(tweet) {
            found_any = true;
            *emoji_counts.entry(m.as_str().to_string()).or_insert(0) += 1;
        }
        if found_any {
            with_emoji += 1;
        }
    }
    profile.emoji_frequency = with_emoji as f64 / tweets.len() as f64;
    profile.uses_emoji = profile.emoji_frequency > 0.1;
    let mut ranked: Vec<(String, usize)> = emoji_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    profile.top_emojis = ranked.into_iter().take(10).map(|(e, _)| e).collect();
}

fn analyze_structure(tweets: &[String], profile: &mut PersonaProfile) {
    let lengths: Vec<usize> = tweets.iter().map(|t| t.chars().count()).collect();
    let line_counts: Vec<usize> = tweets.iter().map(|t| t.lines().count().max(1)).collect();

    profile.avg_tweet_length = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
    profile.avg_line_count = line_counts.iter().sum::<usize>() as f64 / line_counts.len() as f64;

    let total_chars: usize = lengths.iter().sum();
    let kanji_count: usize = tweets.iter().flat_map(|t| t.chars()).filter(|c| is_kanji(*c)).count();
    profile.kanji_ratio = if total_chars == 0 {
        0.0
    } else {
        kanji_count as f64 / total_chars as f64
    };
}

fn analyze_punctuation(tweets: &[String], profile: &mut PersonaProfile) {
    let total = tweets.len() as f64;
    let period_count: usize = tweets.iter().map(|t| t.matches('。').count()).sum();
    let newline_count: usize = tweets.iter().map(|t| t.matches('\n').count()).sum();
    let nominal_stop_count: usize = tweets
        .iter()
        .flat_map(|t| t.lines())
        .filter(|line| nominal_stop_re().is_match(line.trim()))
        .count();

    let mut styles = Vec::new();
    if (period_count as f64 / total) < 1.0 {
        styles.push("句点少なめ");
    } else {
        styles.push("句点使う");
    }
    if (newline_count as f64 / total) > 2.0 {
        styles.push("改行多め");
    }
    if (nominal_stop_count as f64 / total) > 1.0 {
        styles.push("体言止め多用");
    }
    profile.punctuation_style = styles.join("、");

    let desu_masu = tweets.iter().filter(|t| desu_masu_ending_re().is_match(t)).count();
    let casual = tweets.iter().filter(|t| casual_ending_re().is_match(t)).count();

    profile.formality_level = if desu_masu > casual * 2 {
        "敬語ベース".to_string()
    } else if casual > desu_masu * 2 {
        "タメ口ベース".to_string()
    } else {
        "敬語とタメ口ミックス".to_string()
    };
}

fn select_sample_tweets(tweets: &[String], profile: &mut PersonaProfile, rng: &mut impl Rng) {
    let mut candidates: Vec<&String> = tweets
        .iter()
        .filter(|t| {
            let len = t.chars().count();
            (50..=250).contains(&len)
                && t.contains('\n')
                && !t.starts_with("RT ")
                && !t.starts_with('@')
                && !t.contains("http")
        })
        .collect();

    if candidates.is_empty() {
        candidates = tweets
            .iter()
            .filter(|t| {
                let len = t.chars().count();
                (30..=280).contains(&len) && !t.contains("http")
            })
            .collect();
    }

    candidates.shuffle(rng);
    profile.sample_tweets = candidates.into_iter().take(8).cloned().collect();
}

/// AI-assisted analysis result layered onto the statistical profile.
#[derive(Debug, Deserialize)]
struct AiAnalysis {
    #[serde(default)]
    tone: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    content_types: HashMap<String, f64>,
    #[serde(default)]
    prompt_summary: String,
}

/// Ask the LLM to derive `tone`, `topics`, `content_types`, and a prompt
/// summary from up to 30 samples, layering the result onto `profile`.
///
/// This step is optional: a caller that gets `Err` should simply skip it,
/// since the statistical profile is already complete and usable.
pub async fn enrich_with_llm(
    profile: &mut PersonaProfile,
    llm: &dyn LlmProvider,
    tweets: &[String],
) -> Result<(), LlmError> {
    enrich_with_llm_rng(profile, llm, tweets, &mut thread_rng()).await
}

async fn enrich_with_llm_rng(
    profile: &mut PersonaProfile,
    llm: &dyn LlmProvider,
    tweets: &[String],
    rng: &mut impl Rng,
) -> Result<(), LlmError> {
    if tweets.is_empty() {
        return Ok(());
    }
    let mut sample: Vec<&String> = tweets.iter().collect();
    sample.shuffle(rng);
    sample.truncate(30);
    let joined = sample
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("\n---\n");

    let prompt = format!(
        "以下は@{}のツイート{}件です。このアカウントの文体・口調・言い回しを分析し、\
         厳密なJSONのみで出力してください: \
         {{\"tone\": string, \"topics\": [string], \"content_types\": {{label: float}}, \"prompt_summary\": string (<=200字)}}\n\n{}",
        profile.username,
        sample.len(),
        joined
    );

    let response = llm
        .complete("", &prompt, &GenerationParams::default())
        .await?;

    let parsed: AiAnalysis = extract_json(&response.text)
        .and_then(|json| serde_json::from_str(&json).ok())
        .ok_or_else(|| LlmError::Parse("persona AI analysis returned no valid JSON".to_string()))?;

    profile.tone = parsed.tone;
    profile.topics = parsed.topics;
    profile.content_types = parsed.content_types;
    profile.prompt_summary = parsed.prompt_summary;
    Ok(())
}

fn extract_json(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(text[start..=end].to_string())
}

impl PersonaProfile {
    /// Render a deterministic Markdown block for injection into a generation prompt.
    pub fn to_prompt_injection(&self) -> String {
        let mut lines = Vec::new();
        lines.push("━━━━━━━━━━━━━━━━━━".to_string());
        lines.push("■ ペルソナプロファイル（自動分析）".to_string());
        lines.push("━━━━━━━━━━━━━━━━━━".to_string());
        lines.push(String::new());

        if !self.first_person.is_empty() {
            lines.push(format!("- 一人称: 「{}」", self.first_person));
        }
        if !self.sentence_endings.is_empty() {
            let endings = self
                .sentence_endings
                .iter()
                .take(7)
                .map(|e| format!("「{e}」"))
                .collect::<Vec<_>>()
                .join("、");
            lines.push(format!("- 文末パターン: {endings}"));
        }
        if !self.catchphrases.is_empty() {
            let phrases = self
                .catchphrases
                .iter()
                .take(10)
                .map(|p| format!("「{p}」"))
                .collect::<Vec<_>>()
                .join("、");
            lines.push(format!("- 口癖・頻出フレーズ: {phrases}"));
        }
        if !self.emotion_words.is_empty() {
            let emo = self
                .emotion_words
                .iter()
                .take(8)
                .map(|e| format!("「{e}」"))
                .collect::<Vec<_>>()
                .join("、");
            lines.push(format!("- 感情表現: {emo}"));
        }
        if !self.tone.is_empty() {
            lines.push(format!("- トーン: {}", self.tone));
        }
        if !self.formality_level.is_empty() {
            lines.push(format!("- 敬語レベル: {}", self.formality_level));
        }
        if !self.punctuation_style.is_empty() {
            lines.push(format!("- 句読点・改行: {}", self.punctuation_style));
        }
        if self.uses_emoji && !self.top_emojis.is_empty() {
            let emojis: String = self.top_emojis.iter().take(5).cloned().collect();
            lines.push(format!(
                "- よく使う絵文字: {emojis}（頻度: {:.0}%）",
                self.emoji_frequency * 100.0
            ));
        } else if !self.uses_emoji {
            lines.push("- 絵文字: ほぼ使わない".to_string());
        }
        lines.push(format!("- 平均ツイート長: 約{:.0}文字", self.avg_tweet_length));
        lines.push(format!("- 平均行数: 約{:.1}行", self.avg_line_count));

        if !self.prompt_summary.is_empty() {
            lines.push(String::new());
            lines.push("### AI要約".to_string());
            lines.push(self.prompt_summary.clone());
        }

        if !self.sample_tweets.is_empty() {
            lines.push(String::new());
            lines.push("### お手本ツイート（実際の投稿から抜粋）".to_string());
            for (i, tweet) in self.sample_tweets.iter().take(5).enumerate() {
                lines.push(format!("\n--- 例{} ---", i + 1));
                lines.push(tweet.clone());
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_tweets() -> Vec<String> {
        vec![
            "今日は正直めっちゃ疲れたけど、新機能のリリースが終わってよかっただよ。".to_string(),
            "僕はこの前のバグ修正でマジで3時間溶かした。\nでも直ってよかった。".to_string(),
            "俺的にはRustのエラーハンドリングが一番好きだな。\n型で守られてる安心感がある。".to_string(),
            "今日の作業ログ：\nCIが落ちてた。\n原因調査中。\n結局設定ミスだった。".to_string(),
            "ぶっちゃけこの設計は微妙だと思う。リファクタしたい。".to_string(),
        ]
    }

    #[test]
    fn empty_input_returns_default_profile() {
        let profile = analyze_account(&[], "acct", "Acct", "bio");
        assert_eq!(profile.tweet_count_analyzed, 0);
        assert!(profile.first_person.is_empty());
    }

    #[test]
    fn detects_dominant_first_person() {
        let tweets = sample_tweets();
        let mut rng = StdRng::seed_from_u64(1);
        let profile = analyze_account_with_rng(&tweets, "acct", "Acct", "bio", &mut rng);
        assert!(!profile.first_person.is_empty());
        assert_eq!(profile.tweet_count_analyzed, tweets.len());
    }

    #[test]
    fn computes_structural_averages() {
        let tweets = sample_tweets();
        let mut rng = StdRng::seed_from_u64(2);
        let profile = analyze_account_with_rng(&tweets, "acct", "Acct", "bio", &mut rng);
        assert!(profile.avg_tweet_length > 0.0);
        assert!(profile.avg_line_count >= 1.0);
        assert!(profile.kanji_ratio > 0.0 && profile.kanji_ratio < 1.0);
    }

    #[test]
    fn formality_level_is_one_of_three_buckets() {
        let tweets = sample_tweets();
        let mut rng = StdRng::seed_from_u64(3);
        let profile = analyze_account_with_rng(&tweets, "acct", "Acct", "bio", &mut rng);
        assert!(["敬語ベース", "タメ口ベース", "敬語とタメ口ミックス"]
            .contains(&profile.formality_level.as_str()));
    }

    #[test]
    fn no_emoji_in_samples_means_uses_emoji_false() {
        let tweets = sample_tweets();
        let mut rng = StdRng::seed_from_u64(4);
        let profile = analyze_account_with_rng(&tweets, "acct", "Acct", "bio", &mut rng);
        assert!(!profile.uses_emoji);
    }

    #[test]
    fn prompt_injection_includes_key_sections() {
        let tweets = sample_tweets();
        let mut rng = StdRng::seed_from_u64(5);
        let profile = analyze_account_with_rng(&tweets, "acct", "Acct", "bio", &mut rng);
        let rendered = profile.to_prompt_injection();
        assert!(rendered.contains("ペルソナプロファイル"));
        assert!(rendered.contains("平均ツイート長"));
    }

    #[test]
    fn extract_json_pulls_embedded_object() {
        let text = "ここにJSON:\n{\"tone\": \"casual\"}\nおわり";
        let json = extract_json(text).unwrap();
        assert_eq!(json, "{\"tone\": \"casual\"}");
    }

    #[test]
    fn extract_json_returns_none_without_braces() {
        assert!(extract_json("no json here").is_none());
    }
}
