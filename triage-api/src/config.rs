use std::{str::FromStr, time::Duration};

use serde::Deserialize;
use serde_with::serde_as;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use strum::{Display, EnumString};

use crate::domain::triage::{EvidenceRuleThresholds, KnowledgeLookupConfig, TriageEngineConfig};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub triage: TriageSettings,
    pub llm: LlmSettings,
    pub knowledge: KnowledgeSettings,
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub budget: BudgetSettings,
}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    pub allowed_origin: String,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

/// Pipeline thresholds and time budgets. Similarity boundaries are inclusive.
#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct TriageSettings {
    pub duplicate_threshold: f64,
    pub pr_threshold: f64,
    pub code_threshold: f64,
    pub doc_threshold: f64,
    pub similarity_limit: usize,
    pub doc_fetch_limit: usize,
    pub doc_limit: usize,
    #[serde(default)]
    pub evidence_rules: EvidenceRuleThresholds,
    pub response_ttl_hours: i64,
    pub search_ttl_hours: i64,
    pub body_char_budget: usize,
    pub lookup_timeout_secs: u64,
    pub request_deadline_secs: u64,
    pub batch_workers: usize,
    pub sweep_interval_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub api_version: String,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
}

#[derive(Deserialize, Clone)]
pub struct KnowledgeSettings {
    pub max_results: usize,
    pub per_source_limit: usize,
    pub stackoverflow: StackOverflowSettings,
    pub github: GithubSettings,
}

#[derive(Deserialize, Clone)]
pub struct StackOverflowSettings {
    pub enabled: bool,
    pub key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Deserialize, Clone)]
pub struct GithubSettings {
    pub enabled: bool,
    pub token: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RateLimitSettings {
    pub analyze_per_minute: u32,
    pub batch_per_minute: u32,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct BudgetSettings {
    pub daily_ceiling_usd: Option<f64>,
}

impl Settings {
    pub fn engine_config(&self) -> TriageEngineConfig {
        let triage = &self.triage;
        TriageEngineConfig {
            duplicate_threshold: triage.duplicate_threshold,
            pr_threshold: triage.pr_threshold,
            code_threshold: triage.code_threshold,
            doc_threshold: triage.doc_threshold,
            similarity_limit: triage.similarity_limit,
            doc_fetch_limit: triage.doc_fetch_limit,
            doc_limit: triage.doc_limit,
            evidence_rules: triage.evidence_rules,
            response_ttl: time::Duration::hours(triage.response_ttl_hours),
            body_char_budget: triage.body_char_budget,
            max_tokens: self.llm.max_tokens,
            lookup_timeout: Duration::from_secs(triage.lookup_timeout_secs),
            request_deadline: Duration::from_secs(triage.request_deadline_secs),
            daily_ceiling_usd: self.budget.daily_ceiling_usd,
        }
    }

    pub fn knowledge_config(&self) -> KnowledgeLookupConfig {
        KnowledgeLookupConfig {
            cache_ttl: time::Duration::hours(self.triage.search_ttl_hours),
            timeout: Duration::from_secs(self.triage.lookup_timeout_secs),
            per_source_limit: self.knowledge.per_source_limit,
            max_results: self.knowledge.max_results,
        }
    }
}

pub fn read_config() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no current directory: {e}")))?;
    let config_directory = base_path.join("config");

    let environment = Environment::from_str(
        std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .as_str(),
    )
    .map_err(|e| config::ConfigError::Message(format!("invalid APP_ENVIRONMENT: {e}")))?;
    let environment_filename = format!("{}.yaml", environment);

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")))
        .add_source(config::File::from(
            config_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("TRIAGE")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[derive(Display, Debug, EnumString)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}
