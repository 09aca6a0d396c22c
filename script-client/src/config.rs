use std::time::Duration;

use shared_types::{Breadth, Depth, GenerationDefaults, Persona, DEFAULT_API_BASE};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the question service, without trailing slash
    pub api_base: String,
    /// Per-request timeout. Generation can take a while.
    pub request_timeout: Duration,
    /// Parameters sent with every fresh generation
    pub generation: GenerationDefaults,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(120),
            generation: GenerationDefaults::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = GenerationDefaults::default();

        let depth: u8 = env_parse(&lookup, "SCRIPT_DEFAULT_DEPTH", defaults.depth.value())?;
        let depth = Depth::new(depth).ok_or_else(|| {
            anyhow::anyhow!("SCRIPT_DEFAULT_DEPTH={depth} is outside 0..={}", Depth::MAX)
        })?;

        Ok(Self {
            api_base: env_str(&lookup, "SCRIPT_API_BASE", DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            request_timeout: Duration::from_secs(env_parse(
                &lookup,
                "SCRIPT_REQUEST_TIMEOUT_SECS",
                120,
            )?),
            generation: GenerationDefaults {
                num_questions: env_parse(&lookup, "SCRIPT_NUM_QUESTIONS", defaults.num_questions)?,
                depth,
                breadth: env_parse::<Breadth>(&lookup, "SCRIPT_DEFAULT_BREADTH", defaults.breadth)?,
                persona: env_parse::<Persona>(&lookup, "SCRIPT_DEFAULT_PERSONA", defaults.persona)?,
            },
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }
}

fn env_str(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        None => Ok(default),
    }
}
