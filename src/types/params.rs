//! Sampling parameters sent with every generation request
//!
//! Every member is optional. Unset members are omitted from the request
//! body so the server applies its own defaults.

use crate::errors::{ClientError, Result};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Tolerance used when comparing float parameters against fixed values
const EPS: f64 = 1e-5;

/// Stopping condition for beam search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyStopping {
    /// Stop when further candidates are unlikely to improve (`false`)
    Heuristic,

    /// Stop as soon as `best_of` complete candidates exist (`true`)
    BestOf,

    /// Canonical beam search stopping rule (`"never"`)
    Never,
}

impl From<EarlyStopping> for Value {
    fn from(value: EarlyStopping) -> Self {
        match value {
            EarlyStopping::Heuristic => Value::Bool(false),
            EarlyStopping::BestOf => Value::Bool(true),
            EarlyStopping::Never => Value::String("never".to_string()),
        }
    }
}

impl Serialize for EarlyStopping {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        Value::from(*self).serialize(serializer)
    }
}

/// Generation options for a single request
///
/// Built by chaining setters on [`SamplingParams::new`]. Options the type
/// does not model can be passed with [`SamplingParams::option`] and are
/// forwarded verbatim.
///
/// ```
/// use vllm_client::SamplingParams;
///
/// let params = SamplingParams::new().n(3).temperature(0.7).max_tokens(300);
/// let body = params.to_map();
/// assert_eq!(body["n"], 3);
/// assert!(!body.contains_key("top_p"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingParams {
    n: Option<u32>,
    best_of: Option<u32>,
    presence_penalty: Option<f64>,
    frequency_penalty: Option<f64>,
    repetition_penalty: Option<f64>,
    temperature: Option<f64>,
    top_p: Option<f64>,
    top_k: Option<i32>,
    min_p: Option<f64>,
    use_beam_search: Option<bool>,
    length_penalty: Option<f64>,
    early_stopping: Option<EarlyStopping>,
    stop: Option<Vec<String>>,
    stop_token_ids: Option<Vec<u32>>,
    include_stop_str_in_output: Option<bool>,
    ignore_eos: Option<bool>,
    max_tokens: Option<u32>,
    logprobs: Option<u32>,
    prompt_logprobs: Option<u32>,
    skip_special_tokens: Option<bool>,
    spaces_between_special_tokens: Option<bool>,
    options: Map<String, Value>,
}

impl SamplingParams {
    /// Create empty parameters (all server defaults)
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completions to return
    pub fn n(mut self, n: u32) -> Self {
        self.n = Some(n);
        self
    }

    /// Number of candidates generated server-side, of which `n` are returned
    pub fn best_of(mut self, best_of: u32) -> Self {
        self.best_of = Some(best_of);
        self
    }

    pub fn presence_penalty(mut self, value: f64) -> Self {
        self.presence_penalty = Some(value);
        self
    }

    pub fn frequency_penalty(mut self, value: f64) -> Self {
        self.frequency_penalty = Some(value);
        self
    }

    pub fn repetition_penalty(mut self, value: f64) -> Self {
        self.repetition_penalty = Some(value);
        self
    }

    /// Sampling temperature; 0 means greedy
    pub fn temperature(mut self, value: f64) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn top_p(mut self, value: f64) -> Self {
        self.top_p = Some(value);
        self
    }

    /// Top-k cutoff; -1 disables it
    pub fn top_k(mut self, value: i32) -> Self {
        self.top_k = Some(value);
        self
    }

    pub fn min_p(mut self, value: f64) -> Self {
        self.min_p = Some(value);
        self
    }

    pub fn use_beam_search(mut self, enabled: bool) -> Self {
        self.use_beam_search = Some(enabled);
        self
    }

    pub fn length_penalty(mut self, value: f64) -> Self {
        self.length_penalty = Some(value);
        self
    }

    pub fn early_stopping(mut self, value: EarlyStopping) -> Self {
        self.early_stopping = Some(value);
        self
    }

    /// Stop strings; a single entry is sent as a bare string
    pub fn stop<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop = Some(stop.into_iter().map(Into::into).collect());
        self
    }

    pub fn stop_token_ids(mut self, ids: Vec<u32>) -> Self {
        self.stop_token_ids = Some(ids);
        self
    }

    pub fn include_stop_str_in_output(mut self, enabled: bool) -> Self {
        self.include_stop_str_in_output = Some(enabled);
        self
    }

    pub fn ignore_eos(mut self, enabled: bool) -> Self {
        self.ignore_eos = Some(enabled);
        self
    }

    /// Maximum number of generated tokens per completion
    pub fn max_tokens(mut self, value: u32) -> Self {
        self.max_tokens = Some(value);
        self
    }

    pub fn logprobs(mut self, value: u32) -> Self {
        self.logprobs = Some(value);
        self
    }

    pub fn prompt_logprobs(mut self, value: u32) -> Self {
        self.prompt_logprobs = Some(value);
        self
    }

    pub fn skip_special_tokens(mut self, enabled: bool) -> Self {
        self.skip_special_tokens = Some(enabled);
        self
    }

    pub fn spaces_between_special_tokens(mut self, enabled: bool) -> Self {
        self.spaces_between_special_tokens = Some(enabled);
        self
    }

    /// Forward an option this type does not model
    ///
    /// Replaces a modeled field of the same name when serialized.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Number of completions the server will return (server default is 1)
    pub fn completion_count(&self) -> u32 {
        self.n.unwrap_or(1)
    }

    /// Look up the serialized value of a single option
    pub fn get(&self, name: &str) -> Option<Value> {
        self.to_map().remove(name)
    }

    /// Serialize every set member into a JSON object
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();

        put(&mut map, "n", self.n);
        put(&mut map, "best_of", self.best_of);
        put(&mut map, "presence_penalty", self.presence_penalty);
        put(&mut map, "frequency_penalty", self.frequency_penalty);
        put(&mut map, "repetition_penalty", self.repetition_penalty);
        put(&mut map, "temperature", self.temperature);
        put(&mut map, "top_p", self.top_p);
        put(&mut map, "top_k", self.top_k);
        put(&mut map, "min_p", self.min_p);
        put(&mut map, "use_beam_search", self.use_beam_search);
        put(&mut map, "length_penalty", self.length_penalty);
        put(&mut map, "early_stopping", self.early_stopping);
        if let Some(stop) = &self.stop {
            let value = match stop.as_slice() {
                [single] => Value::String(single.clone()),
                many => Value::from(many.to_vec()),
            };
            map.insert("stop".to_string(), value);
        }
        put(&mut map, "stop_token_ids", self.stop_token_ids.clone());
        put(&mut map, "include_stop_str_in_output", self.include_stop_str_in_output);
        put(&mut map, "ignore_eos", self.ignore_eos);
        put(&mut map, "max_tokens", self.max_tokens);
        put(&mut map, "logprobs", self.logprobs);
        put(&mut map, "prompt_logprobs", self.prompt_logprobs);
        put(&mut map, "skip_special_tokens", self.skip_special_tokens);
        put(
            &mut map,
            "spaces_between_special_tokens",
            self.spaces_between_special_tokens,
        );

        for (name, value) in &self.options {
            map.insert(name.clone(), value.clone());
        }

        map
    }

    /// Pre-flight check of the set members
    ///
    /// Never called by the client itself; the server remains the authority.
    pub fn validate(&self) -> Result<()> {
        if self.n == Some(0) {
            return invalid("n must be at least 1");
        }
        if let Some(best_of) = self.best_of {
            if best_of < self.completion_count() {
                return invalid(format!(
                    "best_of must be >= n, got best_of={} and n={}",
                    best_of,
                    self.completion_count()
                ));
            }
        }
        for (name, value) in [
            ("presence_penalty", self.presence_penalty),
            ("frequency_penalty", self.frequency_penalty),
        ] {
            if let Some(v) = value {
                if !(-2.0..=2.0).contains(&v) {
                    return invalid(format!("{} must be in [-2, 2], got {}", name, v));
                }
            }
        }
        if let Some(v) = self.repetition_penalty {
            if v <= 0.0 {
                return invalid(format!("repetition_penalty must be > 0, got {}", v));
            }
        }
        if let Some(v) = self.temperature {
            if v < 0.0 {
                return invalid(format!("temperature must be non-negative, got {}", v));
            }
        }
        if let Some(v) = self.top_p {
            if v <= 0.0 || v > 1.0 {
                return invalid(format!("top_p must be in (0, 1], got {}", v));
            }
        }
        if let Some(v) = self.top_k {
            if v == 0 || v < -1 {
                return invalid(format!("top_k must be -1 (disable) or at least 1, got {}", v));
            }
        }
        if let Some(v) = self.min_p {
            if !(0.0..=1.0).contains(&v) {
                return invalid(format!("min_p must be in [0, 1], got {}", v));
            }
        }
        if self.max_tokens == Some(0) {
            return invalid("max_tokens must be at least 1");
        }

        if self.use_beam_search == Some(true) {
            self.validate_beam_search()
        } else {
            self.validate_non_beam_search()
        }
    }

    fn validate_beam_search(&self) -> Result<()> {
        if self.best_of.unwrap_or(1) <= 1 {
            return invalid("best_of must be greater than 1 when using beam search");
        }
        if self.temperature.map_or(false, |t| t > EPS) {
            return invalid("temperature must be 0 when using beam search");
        }
        Ok(())
    }

    fn validate_non_beam_search(&self) -> Result<()> {
        if matches!(
            self.early_stopping,
            Some(EarlyStopping::BestOf) | Some(EarlyStopping::Never)
        ) {
            return invalid("early_stopping is only meaningful with beam search");
        }
        if let Some(v) = self.length_penalty {
            if (v - 1.0).abs() > EPS {
                return invalid("length_penalty must be 1 without beam search");
            }
        }
        Ok(())
    }
}

impl Serialize for SamplingParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.to_map())
    }
}

fn put<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

fn invalid<T>(message: impl Into<String>) -> Result<T> {
    Err(ClientError::InvalidParams(message.into()))
}
