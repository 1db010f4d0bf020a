//! # Lexicon
//!
//! Read-only vocabulary and organization lists shared by the relevance gate
//! and the featured selector.
//!
//! - Built once (defaults or `[lexicon]` section of the TOML config).
//! - Organization lookups are case-insensitive and whitespace-trimmed.
//! - `priority_orgs` keeps its order; the order is the grid tier.
//!
//! Passed around as `&Lexicon`; nothing in here is mutated after construction.

use serde::Deserialize;
use std::collections::HashSet;

/// Optional overrides as they appear in the config file. A present list replaces
/// the built-in one wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LexiconConfig {
    #[serde(default)]
    pub research_terms: Option<Vec<String>>,
    #[serde(default)]
    pub trusted_orgs: Option<Vec<String>>,
    #[serde(default)]
    pub top_tier_orgs: Option<Vec<String>>,
    #[serde(default)]
    pub priority_orgs: Option<Vec<String>>,
    #[serde(default)]
    pub community_orgs: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct Lexicon {
    research_terms: Vec<String>,
    trusted_orgs: HashSet<String>,
    top_tier_orgs: HashSet<String>,
    priority_orgs: Vec<String>,
    priority_keys: Vec<String>,
    community_orgs: HashSet<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl Lexicon {
    /// Built-in lists for the AI research / safety digest.
    pub fn default_seed() -> Self {
        Self::from_lists(
            to_strings(DEFAULT_RESEARCH_TERMS),
            to_strings(DEFAULT_TRUSTED_ORGS),
            to_strings(DEFAULT_TOP_TIER_ORGS),
            to_strings(DEFAULT_PRIORITY_ORGS),
            to_strings(DEFAULT_COMMUNITY_ORGS),
        )
    }

    /// Apply config overrides on top of the defaults.
    pub fn from_config(cfg: &LexiconConfig) -> Self {
        let pick = |over: &Option<Vec<String>>, dflt: &[&str]| -> Vec<String> {
            over.clone().unwrap_or_else(|| to_strings(dflt))
        };
        Self::from_lists(
            pick(&cfg.research_terms, DEFAULT_RESEARCH_TERMS),
            pick(&cfg.trusted_orgs, DEFAULT_TRUSTED_ORGS),
            pick(&cfg.top_tier_orgs, DEFAULT_TOP_TIER_ORGS),
            pick(&cfg.priority_orgs, DEFAULT_PRIORITY_ORGS),
            pick(&cfg.community_orgs, DEFAULT_COMMUNITY_ORGS),
        )
    }

    pub fn from_lists(
        research_terms: Vec<String>,
        trusted_orgs: Vec<String>,
        top_tier_orgs: Vec<String>,
        priority_orgs: Vec<String>,
        community_orgs: Vec<String>,
    ) -> Self {
        // Terms are matched as lowercase substrings; keep first occurrence order.
        let mut seen = HashSet::new();
        let research_terms = research_terms
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();

        let mut seen = HashSet::new();
        let priority_orgs: Vec<String> = priority_orgs
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty() && seen.insert(normalize_org(o)))
            .collect();
        let priority_keys = priority_orgs.iter().map(|o| normalize_org(o)).collect();

        Self {
            research_terms,
            trusted_orgs: org_set(trusted_orgs),
            top_tier_orgs: org_set(top_tier_orgs),
            priority_orgs,
            priority_keys,
            community_orgs: org_set(community_orgs),
        }
    }

    pub fn research_terms(&self) -> &[String] {
        &self.research_terms
    }

    pub fn priority_orgs(&self) -> &[String] {
        &self.priority_orgs
    }

    pub fn is_trusted(&self, org: &str) -> bool {
        self.trusted_orgs.contains(&normalize_org(org))
    }

    pub fn is_top_tier(&self, org: &str) -> bool {
        self.top_tier_orgs.contains(&normalize_org(org))
    }

    pub fn is_priority(&self, org: &str) -> bool {
        self.priority_tier(org).is_some()
    }

    pub fn is_community(&self, org: &str) -> bool {
        self.community_orgs.contains(&normalize_org(org))
    }

    /// Position of `org` in the priority list (lower is more prominent).
    pub fn priority_tier(&self, org: &str) -> Option<usize> {
        let key = normalize_org(org);
        if key.is_empty() {
            return None;
        }
        self.priority_keys.iter().position(|k| *k == key)
    }
}

fn normalize_org(s: &str) -> String {
    s.trim().to_lowercase()
}

fn org_set(items: Vec<String>) -> HashSet<String> {
    items
        .iter()
        .map(|s| normalize_org(s))
        .filter(|s| !s.is_empty())
        .collect()
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const DEFAULT_RESEARCH_TERMS: &[&str] = &[
    // core ML
    "paper", "study", "model", "training", "benchmark", "evaluation",
    "dataset", "algorithm", "framework", "architecture", "fine-tuning",
    "fine tuning", "finetuning", "rlhf", "interpretability", "mechanistic",
    "alignment", "probe", "ablation", "embedding", "transformer", "neural",
    "gradient", "loss", "optimization", "inference", "scaling law",
    "emergent", "capability", "reinforcement learning", "supervised learning",
    "pretraining", "pre-training", "backpropagation", "attention mechanism",
    "language model", "diffusion", "generative", "classification",
    "regression", "tokenizer", "tokenization", "perplexity", "accuracy",
    "precision", "recall", "f1 score", "auc", "roc", "cross-entropy",
    "softmax", "activation", "layer", "hidden state", "representation",
    "latent", "feature", "weight", "parameter", "hyperparameter",
    "convergence", "overfit", "regularization", "dropout", "batch",
    "epoch", "learning rate", "sgd", "adam", "llm", "gpt", "bert",
    // safety
    "red team", "red-team", "safety", "robustness", "adversarial",
    "reward model", "constitutional", "jailbreak", "guardrail",
    "watermark", "detection", "deception", "sycophancy", "power-seeking",
    "corrigibility", "oversight", "monitor", "audit", "specification",
    // academic
    "arxiv", "abstract", "methodology", "experiment", "result",
    "finding", "contribution", "technical report", "system card",
    "we propose", "we present", "we show", "we demonstrate",
    "we introduce", "we evaluate", "we find", "our method",
    "our approach", "our model", "state-of-the-art", "sota",
    "baseline", "comparison", "ablation study", "empirical",
    "theoretical", "formal", "proof", "theorem", "lemma",
    "proposition", "corollary", "analysis", "measurement",
    "quantitative", "qualitative", "survey", "review",
    // infrastructure
    "compute", "flops", "gpu", "tpu", "distributed training",
    "data augmentation", "curriculum learning", "knowledge distillation",
    "multi-task", "transfer learning", "zero-shot", "few-shot",
    "in-context learning", "chain of thought", "prompting",
];

const DEFAULT_TRUSTED_ORGS: &[&str] = &[
    "anthropic", "openai", "google deepmind", "microsoft research",
    "redwood research", "alignment forum", "metr", "apollo research",
    "arc", "miri", "cais", "far ai", "uk aisi", "us aisi",
    "epoch ai", "chai", "mats", "govai", "cset", "iaps", "cltr",
    "rand", "dan hendrycks", "paul christiano", "yoshua bengio",
    "lennart heim", "fli", "lesswrong",
];

const DEFAULT_TOP_TIER_ORGS: &[&str] = &[
    "Anthropic",
    "OpenAI",
    "Google DeepMind",
    "Microsoft Research",
    "Redwood Research",
    "ARC",
    "MIRI",
    "CAIS",
    "Apollo Research",
    "METR",
    "UK AISI",
    "US AISI",
];

const DEFAULT_PRIORITY_ORGS: &[&str] = &[
    "Anthropic",
    "OpenAI",
    "Google DeepMind",
    "UK AISI",
    "US AISI",
    "CAIS",
    "METR",
    "ARC",
    "Redwood Research",
    "Apollo Research",
    "MIRI",
    "Microsoft Research",
    "FAR AI",
    "Forethought",
    "MATS",
    "GovAI",
    "IAPS",
    "CSET",
    "Yoshua Bengio",
    "Lennart Heim",
    "SemiAnalysis",
    "Zvi Mowshowitz",
    "Dean Ball",
    "Seb Krier",
    "Peter Wildeford",
    "Ajeya Cotra",
    "CNAS",
];

const DEFAULT_COMMUNITY_ORGS: &[&str] = &[
    "arXiv",
    "Reddit",
    "Hacker News",
    "LessWrong",
    "Alignment Forum",
    "Astral Codex Ten",
    "Zvi Mowshowitz",
    "Import AI",
    "Vox Future Perfect",
];
