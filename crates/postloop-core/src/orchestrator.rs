//! Generation Orchestrator: given an approved [`CandidateRecord`], produces
//! on-brand commentary text via templated multi-variant prompting,
//! persona/style injection, an LLM call with retry, and scoring-driven
//! regeneration.
//!
//! Bookkeeping (template use counts, recent template/opening history) is
//! scoped to one calendar day and persisted next to the day's generated
//! output, so a fresh process invoked later the same day still sees it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{SafetyConfig, TemplatesConfig};
use crate::error::GenerationError;
use crate::llm::{GenerationParams, LlmProvider};
use crate::persona::PersonaProfile;
use crate::preferences::PromptOverrides;
use crate::queue::atomic_json;
use crate::queue::CandidateRecord;
use crate::retry::{with_backoff, BackoffConfig};
use crate::safety::{self, QuoteRtContext, SafetyResult};
use crate::scoring::post_scorer::{score_post, PostType, ScoreResult};

const MAX_GENERATION_LENGTH: usize = 120;
const MIN_QUALITY_SCORE: i32 = 5;
const MAX_SCORING_RETRIES: u32 = 2;
const RECENT_TEMPLATE_WINDOW: usize = 10;
const RECENT_OPENING_WINDOW: usize = 5;
const VARIATION_EXCLUSION_COUNT: usize = 2;

const SYSTEM_PROMPT: &str = "あなたはSNS運用アシスタントです。与えられた条件に厳密に従い、投稿本文のみを出力してください。前置きや説明、引用符は不要です。";

/// Everything the orchestrator needs to generate one piece of commentary
/// for `candidate`.
pub struct GenerationContext<'a> {
    /// The approved candidate being commented on.
    pub candidate: &'a CandidateRecord,
    /// The target account's style profile, if one has been built.
    pub persona: Option<&'a PersonaProfile>,
    /// Operator overrides layered onto the template text.
    pub prompt_overrides: &'a PromptOverrides,
    /// Safety Gate configuration.
    pub safety_config: &'a SafetyConfig,
    /// Recent published post texts, for dedup/spacing checks.
    pub past_posts: &'a [String],
    /// Minutes since the last post, if there has been one.
    pub last_post_minutes_ago: Option<i64>,
    /// Whether this generation is a quote-retweet.
    pub is_quote_rt: bool,
    /// Extra context for quote-RT-specific safety rules.
    pub quote_rt_context: Option<&'a QuoteRtContext>,
    /// Today's register label for original posts (see [`day_rotation`]),
    /// appended to the prompt when present.
    pub register: Option<&'a str>,
}

impl GenerationContext<'_> {
    fn post_type(&self) -> PostType {
        if self.is_quote_rt {
            PostType::QuoteRt
        } else {
            PostType::Original
        }
    }
}

/// Successful generation output, ready for [`crate::queue::QueueStore::set_generated`].
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// The final, safety-and-score-passing text.
    pub text: String,
    /// The template id used to produce it.
    pub template_id: String,
    /// Whether `text` was generated as a quote-RT comment or a standalone
    /// original, mirroring [`GenerationContext::is_quote_rt`].
    pub post_type: PostType,
    /// The Post Scorer rubric for `text`.
    pub score: ScoreResult,
    /// The Safety Gate result for `text`.
    pub safety: SafetyResult,
    /// How many LLM attempts (including scoring retries) this took.
    pub attempts: u32,
}

/// Reads template files from a directory, one file per template, filename
/// stem as the template id.
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    /// Open a template store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// List available template ids, sorted for determinism.
    pub fn list_ids(&self) -> Result<Vec<String>, GenerationError> {
        let mut ids = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("txt") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Load the text of template `id`.
    pub fn load(&self, id: &str) -> Result<String, GenerationError> {
        let path = self.dir.join(format!("{id}.txt"));
        std::fs::read_to_string(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => GenerationError::TemplateNotFound {
                template_id: id.to_string(),
            },
            _ => GenerationError::TemplatesDirIo(err),
        })
    }
}

/// One day's generation bookkeeping: template use counts, recent template
/// history (for the last-two-templates exclusion), and recent opening
/// lines (for the variation directive).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorState {
    date: NaiveDate,
    generations: Vec<GenerationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GenerationRecord {
    tweet_id: String,
    template_id: String,
    opening_line: String,
    generated_at: DateTime<Utc>,
}

impl Default for OrchestratorState {
    fn default() -> Self {
        Self {
            date: NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid sentinel date"),
            generations: Vec::new(),
        }
    }
}

impl OrchestratorState {
    /// Load bookkeeping for `today` from `path`, discarding anything from a
    /// previous day.
    pub fn load_or_new(path: &Path, today: NaiveDate) -> Result<Self, GenerationError> {
        let state: Self = atomic_json::load_or_default(path)?;
        if state.date == today {
            Ok(state)
        } else {
            Ok(Self {
                date: today,
                generations: Vec::new(),
            })
        }
    }

    /// Persist to `path`.
    pub fn save(&self, path: &Path) -> Result<(), GenerationError> {
        atomic_json::save(path, self)?;
        Ok(())
    }

    fn template_counts(&self) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for record in &self.generations {
            *counts.entry(record.template_id.clone()).or_insert(0) += 1;
        }
        counts
    }

    fn recent_templates(&self, n: usize) -> Vec<String> {
        self.generations
            .iter()
            .rev()
            .take(RECENT_TEMPLATE_WINDOW.min(self.generations.len()))
            .take(n)
            .map(|r| r.template_id.clone())
            .collect()
    }

    fn recent_openings(&self, n: usize) -> Vec<String> {
        self.generations
            .iter()
            .rev()
            .take(n)
            .map(|r| r.opening_line.clone())
            .collect()
    }

    fn record(&mut self, tweet_id: String, template_id: String, text: &str, now: DateTime<Utc>) {
        let opening_line = text.lines().next().unwrap_or(text).to_string();
        self.generations.push(GenerationRecord {
            tweet_id,
            template_id,
            opening_line,
            generated_at: now,
        });
    }
}

/// Pick a template: enabled-only, under its daily cap, excluding the last
/// two used when that leaves anything to choose from, then a random pick
/// among what remains.
fn select_template(
    available: &[String],
    enabled: &[String],
    counts: &HashMap<String, u32>,
    max_daily_uses: u32,
    recent: &[String],
    rng: &mut impl Rng,
) -> Result<String, GenerationError> {
    let mut candidates: Vec<String> = available
        .iter()
        .filter(|id| enabled.is_empty() || enabled.iter().any(|e| e.as_str() == id.as_str()))
        .filter(|id| counts.get(id.as_str()).copied().unwrap_or(0) < max_daily_uses)
        .cloned()
        .collect();

    if candidates.is_empty() {
        return Err(GenerationError::NoTemplatesAvailable);
    }

    let excluded: Vec<String> = candidates
        .iter()
        .filter(|id| !recent.iter().any(|r| r.as_str() == id.as_str()))
        .cloned()
        .collect();
    if !excluded.is_empty() {
        candidates = excluded;
    }

    Ok(candidates
        .choose(rng)
        .expect("candidates checked non-empty above")
        .clone())
}

fn apply_overrides(template: &str, overrides: &PromptOverrides) -> String {
    let mut text = template
        .replace(
            "{{PERSONA_NAME}}",
            overrides.persona_name.as_deref().unwrap_or(""),
        )
        .replace(
            "{{FIRST_PERSON}}",
            overrides.first_person.as_deref().unwrap_or(""),
        )
        .replace("{{POSITION}}", overrides.position.as_deref().unwrap_or(""))
        .replace(
            "{{DIFFERENTIATOR}}",
            overrides.differentiator.as_deref().unwrap_or(""),
        )
        .replace("{{TONE}}", overrides.tone.as_deref().unwrap_or(""))
        .replace("{{STYLE_PATTERNS}}", &overrides.style_patterns.join("、"))
        .replace("{{NG_WORDS}}", &overrides.ng_words.join("、"));

    if let Some(directive) = &overrides.custom_directive {
        text = text.replace("{{CUSTOM_DIRECTIVE}}", directive);
    } else {
        text = text.replace("{{CUSTOM_DIRECTIVE}}", "");
    }
    text
}

fn variation_directive(recent_openings: &[String]) -> String {
    if recent_openings.is_empty() {
        return String::new();
    }
    let list = recent_openings
        .iter()
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\n--- 直近の投稿の書き出し（この冒頭は使わないこと）---\n{list}")
}

fn source_block(candidate: &CandidateRecord) -> String {
    format!(
        "\n\n--- 元投稿 ---\n投稿者: {} (@{})\nいいね: {} / RT: {} / 返信: {}\n本文:\n{}",
        candidate.author_name,
        candidate.author_username,
        candidate.likes,
        candidate.retweets,
        candidate.replies,
        candidate.text,
    )
}

fn length_cap_directive() -> String {
    format!(
        "\n\n--- 出力条件 ---\n日本語{MAX_GENERATION_LENGTH}文字以内（引用URLの分の余白を残すこと）。本文のみを出力すること。"
    )
}

fn assemble_prompt(
    template_text: &str,
    ctx: &GenerationContext<'_>,
    template_label: &str,
    recent_openings: &[String],
) -> String {
    let mut prompt = apply_overrides(template_text, ctx.prompt_overrides);

    if let Some(persona) = ctx.persona {
        prompt.push_str("\n\n");
        prompt.push_str(&persona.to_prompt_injection());
    }

    prompt.push_str(&variation_directive(recent_openings));

    if let Some(register) = ctx.register {
        prompt.push_str(&format!("\n\n今日の投稿テーマ: {register}"));
    }

    prompt.push_str(&format!("\n\n使用テンプレート: {template_label}"));
    prompt.push_str(&source_block(ctx.candidate));
    prompt.push_str(&length_cap_directive());
    prompt
}

fn strip_wrapping(text: &str) -> String {
    let mut t = text.trim();
    if let Some(rest) = t.strip_prefix("```") {
        if let Some(end) = rest.rfind("```") {
            t = rest[..end].trim();
        } else {
            t = rest.trim();
        }
    }
    t.trim_matches(|c: char| matches!(c, '"' | '\'' | '「' | '」' | '『' | '』'))
        .trim()
        .to_string()
}

fn hard_truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

fn quality_hints(text: &str, score: &ScoreResult, safety: &SafetyResult, post_type: PostType) -> Vec<String> {
    let mut hints = Vec::new();
    if score.hook < 1 {
        hints.push("strengthen hook".to_string());
    }
    if score.humanity < 1 {
        hints.push("more casual, less AI-sounding".to_string());
    }
    if !safety.violations.is_empty() {
        hints.push(format!("fix: {}", safety.violations.join("; ")));
    }
    let (min_chars, _) = post_type.length_band();
    if text.chars().count() < min_chars {
        hints.push("write ≥ min chars".to_string());
    }
    hints
}

/// Day-of-week → post-register rotation for original posts, so repeated
/// templates still vary in register across the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRotationEntry {
    /// Register used for morning slots.
    pub morning: &'static str,
    /// Register used for midday slots.
    pub midday: &'static str,
    /// Register used for evening slots.
    pub evening: &'static str,
}

const DAY_ROTATION: [DayRotationEntry; 7] = [
    DayRotationEntry {
        morning: "週はじめの決意",
        midday: "業界ニュース所感",
        evening: "今日の振り返り",
    },
    DayRotationEntry {
        morning: "学びの共有",
        midday: "小ネタ・発見",
        evening: "進捗報告",
    },
    DayRotationEntry {
        morning: "問いかけ",
        midday: "業界の考察",
        evening: "雑談",
    },
    DayRotationEntry {
        morning: "日常の気づき",
        midday: "トレンド解説",
        evening: "感謝・お礼",
    },
    DayRotationEntry {
        morning: "週末に向けて",
        midday: "おすすめ紹介",
        evening: "今週のまとめ",
    },
    DayRotationEntry {
        morning: "ゆるい雑談",
        midday: "週末の過ごし方",
        evening: "リラックス回",
    },
    DayRotationEntry {
        morning: "来週への準備",
        midday: "一週間の振り返り",
        evening: "週末の余韻",
    },
];

/// Look up the register table entry for `weekday` (Monday-first).
pub fn day_rotation(weekday: Weekday) -> DayRotationEntry {
    DAY_ROTATION[weekday.num_days_from_monday() as usize]
}

/// Pick the register label for `hour` (0-23) from `entry`.
pub fn register_for_hour(entry: DayRotationEntry, hour: u32) -> &'static str {
    match hour {
        0..=10 => entry.morning,
        11..=16 => entry.midday,
        _ => entry.evening,
    }
}

/// Composes template selection, prompt assembly, LLM calling, and
/// scoring-driven retry into one generation pipeline.
pub struct GenerationOrchestrator {
    llm: Arc<dyn LlmProvider>,
    templates: TemplateStore,
    templates_config: TemplatesConfig,
    state_dir: PathBuf,
    backoff: BackoffConfig,
}

impl GenerationOrchestrator {
    /// Build an orchestrator. `state_dir` is where per-account,
    /// per-day bookkeeping files are written (see [`OrchestratorState`]).
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        templates_config: TemplatesConfig,
        state_dir: impl Into<PathBuf>,
    ) -> Self {
        let templates = TemplateStore::new(templates_config.dir.clone());
        Self {
            llm,
            templates,
            templates_config,
            state_dir: state_dir.into(),
            backoff: BackoffConfig::default(),
        }
    }

    fn state_path(&self, account_id: u32, today: NaiveDate) -> PathBuf {
        self.state_dir
            .join(format!("orchestrator_state_{today}_{account_id}.json"))
    }

    /// Generate commentary for `ctx.candidate`, retrying on LLM transients
    /// (exponential backoff) and on quality-gate failure (up to
    /// [`MAX_SCORING_RETRIES`] re-prompts with the same template).
    pub async fn generate(
        &self,
        account_id: u32,
        ctx: &GenerationContext<'_>,
        now: DateTime<Utc>,
    ) -> Result<GenerationOutcome, GenerationError> {
        self.generate_with_rng(account_id, ctx, now, &mut thread_rng())
            .await
    }

    /// Testable sibling of [`Self::generate`] taking an injected RNG for
    /// deterministic template selection.
    pub async fn generate_with_rng(
        &self,
        account_id: u32,
        ctx: &GenerationContext<'_>,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Result<GenerationOutcome, GenerationError> {
        let today = now.date_naive();
        let path = self.state_path(account_id, today);
        let mut state = OrchestratorState::load_or_new(&path, today)?;

        let available = self.templates.list_ids()?;
        let counts = state.template_counts();
        let recent = state.recent_templates(VARIATION_EXCLUSION_COUNT);
        let template_id = select_template(
            &available,
            &ctx.prompt_overrides.enabled_templates,
            &counts,
            self.templates_config.max_daily_uses,
            &recent,
            rng,
        )?;
        let template_text = self.templates.load(&template_id)?;
        let recent_openings = state.recent_openings(RECENT_OPENING_WINDOW);
        let base_prompt = assemble_prompt(&template_text, ctx, &template_id, &recent_openings);

        let post_type = ctx.post_type();
        let mut prompt = base_prompt.clone();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let params = GenerationParams::default();
            let llm = self.llm.clone();
            let system = SYSTEM_PROMPT.to_string();
            let attempt_prompt = prompt.clone();
            let raw = with_backoff(self.backoff, "orchestrator.llm", || {
                let llm = llm.clone();
                let system = system.clone();
                let attempt_prompt = attempt_prompt.clone();
                let params = params.clone();
                async move { llm.complete(&system, &attempt_prompt, &params).await }
            })
            .await?;

            let cleaned = hard_truncate(&strip_wrapping(&raw.text), MAX_GENERATION_LENGTH);
            let score = score_post(&cleaned, post_type);
            let safety = safety::check(
                &cleaned,
                ctx.past_posts,
                ctx.last_post_minutes_ago,
                ctx.is_quote_rt,
                ctx.quote_rt_context,
                ctx.safety_config,
            );

            if score.total >= MIN_QUALITY_SCORE && safety.is_safe {
                state.record(ctx.candidate.tweet_id.clone(), template_id.clone(), &cleaned, now);
                state.save(&path)?;
                return Ok(GenerationOutcome {
                    text: cleaned,
                    template_id,
                    post_type,
                    score,
                    safety,
                    attempts,
                });
            }

            if attempts > MAX_SCORING_RETRIES {
                return Err(GenerationError::QualityGateExhausted {
                    tweet_id: ctx.candidate.tweet_id.clone(),
                    attempts,
                });
            }

            let hints = quality_hints(&cleaned, &score, &safety, post_type);
            prompt = format!(
                "{base_prompt}\n\n--- 再生成指示 ---\n{}",
                hints.join("\n")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::LlmResponse;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct ScriptedLlm {
        responses: Vec<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _system: &str,
            _user_message: &str,
            _params: &GenerationParams,
        ) -> Result<LlmResponse, LlmError> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            let text = self
                .responses
                .get(idx)
                .or_else(|| self.responses.last())
                .copied()
                .unwrap_or_default();
            Ok(LlmResponse {
                text: text.to_string(),
                usage: Default::default(),
                model: "scripted".to_string(),
            })
        }

        async fn health_check(&self) -> Result<(), LlmError> {
            Ok(())
        }
    }

    fn candidate() -> CandidateRecord {
        crate::normalize::normalize(crate::normalize::CandidateSource::Url {
            url: "https://x.com/someone/status/123456".to_string(),
            memo: None,
        })
        .expect("normalize url")
    }

    fn write_template(dir: &Path, id: &str) {
        std::fs::write(
            dir.join(format!("{id}.txt")),
            "これはテストテンプレートです。{{CUSTOM_DIRECTIVE}}",
        )
        .unwrap();
    }

    #[test]
    fn select_template_excludes_recent_two_when_possible() {
        let available = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let counts = HashMap::new();
        let recent = vec!["a".to_string(), "b".to_string()];
        let mut rng = StdRng::seed_from_u64(1);
        let picked = select_template(&available, &[], &counts, 3, &recent, &mut rng).unwrap();
        assert_eq!(picked, "c");
    }

    #[test]
    fn select_template_falls_back_to_full_set_when_exhausted() {
        let available = vec!["a".to_string(), "b".to_string()];
        let counts = HashMap::new();
        let recent = vec!["a".to_string(), "b".to_string()];
        let mut rng = StdRng::seed_from_u64(1);
        let picked = select_template(&available, &[], &counts, 3, &recent, &mut rng).unwrap();
        assert!(picked == "a" || picked == "b");
    }

    #[test]
    fn select_template_respects_daily_cap() {
        let available = vec!["a".to_string(), "b".to_string()];
        let mut counts = HashMap::new();
        counts.insert("a".to_string(), 3);
        let mut rng = StdRng::seed_from_u64(1);
        let picked = select_template(&available, &[], &counts, 3, &[], &mut rng).unwrap();
        assert_eq!(picked, "b");
    }

    #[test]
    fn select_template_errors_when_nothing_eligible() {
        let available = vec!["a".to_string()];
        let mut counts = HashMap::new();
        counts.insert("a".to_string(), 3);
        let mut rng = StdRng::seed_from_u64(1);
        let err = select_template(&available, &[], &counts, 3, &[], &mut rng).unwrap_err();
        assert!(matches!(err, GenerationError::NoTemplatesAvailable));
    }

    #[test]
    fn hard_truncate_appends_ellipsis_only_when_exceeded() {
        assert_eq!(hard_truncate("short", 10), "short");
        let long: String = "あ".repeat(20);
        let truncated = hard_truncate(&long, 5);
        assert_eq!(truncated.chars().count(), 5);
        assert!(truncated.ends_with('…'));
    }

    #[test]
    fn strip_wrapping_removes_fences_and_quotes() {
        assert_eq!(strip_wrapping("```\nhello\n```"), "hello");
        assert_eq!(strip_wrapping("\"quoted\""), "quoted");
    }

    #[tokio::test]
    async fn generate_succeeds_on_first_good_response() {
        let dir = tempdir().unwrap();
        write_template(dir.path(), "agree_and_add");
        let templates_config = TemplatesConfig {
            dir: dir.path().to_path_buf(),
            max_daily_uses: 3,
        };
        let llm = Arc::new(ScriptedLlm {
            responses: vec!["今日も一日お疲れさまでした。明日もがんばりましょう、本当にそう思います。"],
            calls: AtomicUsize::new(0),
        });
        let orchestrator = GenerationOrchestrator::new(llm, templates_config, dir.path());

        let candidate = candidate();
        let overrides = PromptOverrides::default();
        let safety_config = SafetyConfig::default();
        let ctx = GenerationContext {
            candidate: &candidate,
            persona: None,
            prompt_overrides: &overrides,
            safety_config: &safety_config,
            past_posts: &[],
            last_post_minutes_ago: None,
            is_quote_rt: false,
            quote_rt_context: None,
            register: None,
        };

        let mut rng = StdRng::seed_from_u64(7);
        let outcome = orchestrator
            .generate_with_rng(1, &ctx, Utc::now(), &mut rng)
            .await
            .expect("generation should succeed");
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.template_id, "agree_and_add");
    }

    #[tokio::test]
    async fn generate_exhausts_after_repeated_low_quality_output() {
        let dir = tempdir().unwrap();
        write_template(dir.path(), "agree_and_add");
        let templates_config = TemplatesConfig {
            dir: dir.path().to_path_buf(),
            max_daily_uses: 3,
        };
        let llm = Arc::new(ScriptedLlm {
            responses: vec!["x"],
            calls: AtomicUsize::new(0),
        });
        let orchestrator = GenerationOrchestrator::new(llm, templates_config, dir.path());

        let candidate = candidate();
        let overrides = PromptOverrides::default();
        let safety_config = SafetyConfig::default();
        let ctx = GenerationContext {
            candidate: &candidate,
            persona: None,
            prompt_overrides: &overrides,
            safety_config: &safety_config,
            past_posts: &[],
            last_post_minutes_ago: None,
            is_quote_rt: false,
            quote_rt_context: None,
            register: None,
        };

        let mut rng = StdRng::seed_from_u64(7);
        let err = orchestrator
            .generate_with_rng(1, &ctx, Utc::now(), &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::QualityGateExhausted { attempts: 3, .. }));
    }

    #[test]
    fn day_rotation_has_seven_distinct_weekday_entries() {
        let mon = day_rotation(Weekday::Mon);
        let sun = day_rotation(Weekday::Sun);
        assert_ne!(mon.morning, sun.morning);
        assert_eq!(register_for_hour(mon, 8), mon.morning);
        assert_eq!(register_for_hour(mon, 13), mon.midday);
        assert_eq!(register_for_hour(mon, 20), mon.evening);
    }
}
