//! Dependent option resolver.
//!
//! One resolver serves one mounted field instance. It tracks the parent
//! field's key, resets the child's value when the parent changes, and keeps
//! the remote option list fresh with debounced, generation-stamped searches.
//!
//! Race protection: every fetch takes the next value of the instance's
//! generation counter, and a response is applied only while its stamp is
//! still the latest. Superseded and post-teardown responses are dropped.

use std::sync::Arc;
use std::time::Duration;

use formwork_core::options::{
    option_from_record, parent_key, value_is_listed, StaticOptionIndex, DEFAULT_LABEL_KEY,
    DEFAULT_PARENT_KEY_NAME, DEFAULT_VALUE_KEY,
};
use formwork_core::{FieldConfig, FieldOption, FormController, OptionMode, SetValueOptions, Value};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::source::OptionSource;
use crate::config::RuntimeConfig;

// ---------------------------------------------------------------------------
// ResolverConfig
// ---------------------------------------------------------------------------

/// Per-field settings, derived from a [`FieldConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Name of the child field.
    pub field: String,
    pub mode: OptionMode,
    /// Name of the parent field, if any.
    pub depends_on: Option<String>,
    pub is_multi: bool,
    pub static_options: Vec<FieldOption>,
    pub label_key: String,
    pub value_key: String,
    /// Query parameter carrying the parent key.
    pub parent_key_name: String,
}

impl ResolverConfig {
    #[must_use]
    pub fn from_field(field: &FieldConfig) -> Self {
        let props = &field.props;
        Self {
            field: field.name.clone(),
            mode: OptionMode::for_field(field),
            depends_on: field.depends_on.clone(),
            is_multi: field.is_multi,
            static_options: field.option_list().to_vec(),
            label_key: props.label_key.clone().unwrap_or_else(|| DEFAULT_LABEL_KEY.to_string()),
            value_key: props.value_key.clone().unwrap_or_else(|| DEFAULT_VALUE_KEY.to_string()),
            parent_key_name: props
                .parent_key_name
                .clone()
                .unwrap_or_else(|| DEFAULT_PARENT_KEY_NAME.to_string()),
        }
    }

    fn target(&self) -> Option<&str> {
        match &self.mode {
            OptionMode::Remote { target } => Some(target),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct State {
    /// Stamp of the most recently issued request.
    generation: u64,
    mounted: bool,
    last_parent_key: Option<String>,
    remote_options: Vec<FieldOption>,
    is_fetching: bool,
    /// Options resolved by fetch-by-id for values outside the loaded list.
    hydrated: Vec<FieldOption>,
    /// Key of the value whose hydration has started.
    hydrating_for: Option<String>,
}

struct Shared {
    config: ResolverConfig,
    source: Arc<dyn OptionSource>,
    state: Mutex<State>,
}

// ---------------------------------------------------------------------------
// DependentOptionResolver
// ---------------------------------------------------------------------------

/// Resolves the option list of one field instance.
///
/// Must be used from within a Tokio runtime: searches run on spawned tasks.
pub struct DependentOptionResolver {
    shared: Arc<Shared>,
    index: StaticOptionIndex,
    debounce: Duration,
    lifetime: CancellationToken,
    pending: Mutex<Option<CancellationToken>>,
}

impl DependentOptionResolver {
    #[must_use]
    pub fn new(config: ResolverConfig, source: Arc<dyn OptionSource>, runtime: &RuntimeConfig) -> Self {
        let index = StaticOptionIndex::new(&config.static_options);
        Self {
            shared: Arc::new(Shared {
                config,
                source,
                state: Mutex::new(State::default()),
            }),
            index,
            debounce: runtime.debounce,
            lifetime: CancellationToken::new(),
            pending: Mutex::new(None),
        }
    }

    /// Builds a resolver for `field`.
    #[must_use]
    pub fn for_field(field: &FieldConfig, source: Arc<dyn OptionSource>, runtime: &RuntimeConfig) -> Self {
        Self::new(ResolverConfig::from_field(field), source, runtime)
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.shared.config
    }

    /// Records the parent's current value without resetting or fetching.
    pub fn prime(&self, parent_value: Option<&Value>) {
        let mut state = self.shared.state.lock();
        state.mounted = true;
        state.last_parent_key = parent_key(parent_value);
    }

    /// First mount. The child's value is left untouched so a pre-filled
    /// value survives; remote fields schedule their initial search.
    pub fn mount(&self, parent_value: Option<&Value>) {
        self.prime(parent_value);
        if self.shared.config.mode.is_remote() {
            self.search("");
        }
    }

    /// Reacts to a new parent value.
    ///
    /// If the parent key changed, a dependent child's value is reset (to an
    /// empty list for multi-selects, to undefined otherwise) without
    /// validation, and remote fields schedule a fresh search. Returns whether
    /// the key changed. Before [`mount`](Self::mount) this only records the
    /// key.
    pub fn on_parent_change(&self, parent_value: Option<&Value>, controller: &mut FormController) -> bool {
        let key = parent_key(parent_value);
        {
            let mut state = self.shared.state.lock();
            if !state.mounted {
                state.mounted = true;
                state.last_parent_key = key;
                return false;
            }
            if state.last_parent_key == key {
                return false;
            }
            state.last_parent_key = key;
        }

        let config = &self.shared.config;
        if config.depends_on.is_some() {
            let cleared = config.is_multi.then(|| Value::Array(Vec::new()));
            controller.set_value(
                &config.field,
                cleared,
                SetValueOptions {
                    should_validate: false,
                    should_dirty: true,
                    should_touch: false,
                },
            );
            debug!(field = %config.field, "parent changed, child value reset");
        }
        if config.mode.is_remote() {
            self.search("");
        }
        true
    }

    /// Schedules a remote search for `query` with the current parent key,
    /// replacing any search still waiting out its debounce window.
    pub fn search(&self, query: &str) {
        if !self.shared.config.mode.is_remote() || self.lifetime.is_cancelled() {
            return;
        }
        let token = self.lifetime.child_token();
        if let Some(previous) = self.pending.lock().replace(token.clone()) {
            previous.cancel();
        }

        let shared = Arc::clone(&self.shared);
        let lifetime = self.lifetime.clone();
        let debounce = self.debounce;
        let query = query.to_string();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => return,
                () = tokio::time::sleep(debounce) => {}
            }
            tokio::select! {
                () = lifetime.cancelled() => {}
                () = run_search(&shared, &query) => {}
            }
        });
    }

    /// Runs a remote search immediately, bypassing the debounce window.
    pub async fn search_now(&self, query: &str) {
        if self.shared.config.mode.is_remote() {
            run_search(&self.shared, query).await;
        }
    }

    /// Options to display.
    ///
    /// Remote fields show the last applied response, with hydrated options
    /// for pre-existing values appended. Dependent static fields show the
    /// options grouped under the current parent key.
    #[must_use]
    pub fn display_options(&self) -> Vec<FieldOption> {
        let state = self.shared.state.lock();
        match &self.shared.config.mode {
            OptionMode::Remote { .. } => {
                let mut options = state.remote_options.clone();
                for extra in &state.hydrated {
                    if !value_is_listed(&extra.value, &options) {
                        options.push(extra.clone());
                    }
                }
                options
            }
            OptionMode::DependentStatic { .. } => state
                .last_parent_key
                .as_deref()
                .map(|key| self.index.get(key).to_vec())
                .unwrap_or_default(),
            OptionMode::Standalone => self.shared.config.static_options.clone(),
        }
    }

    /// Whether the latest remote request is still in flight.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.shared.state.lock().is_fetching
    }

    /// Resolves the label of a pre-existing value that is missing from the
    /// displayed options by fetching it by id.
    ///
    /// Runs at most once per distinct value. A failed fetch clears the
    /// marker so the value can be retried. Returns whether a fetch was
    /// issued.
    pub async fn hydrate(&self, current_value: Option<&Value>) -> bool {
        let Some(target) = self.shared.config.target() else {
            return false;
        };
        let Some(value) = current_value.filter(|v| !v.is_empty_like()) else {
            return false;
        };
        if value_is_listed(value, &self.display_options()) {
            return false;
        }
        let missing: Vec<String> = match value {
            Value::Array(items) => items.iter().filter_map(Value::key_string).collect(),
            other => other.key_string().into_iter().collect(),
        };
        let marker = missing.join(",");
        {
            let mut state = self.shared.state.lock();
            if state.hydrating_for.as_deref() == Some(marker.as_str()) {
                return false;
            }
            state.hydrating_for = Some(marker.clone());
        }

        let config = &self.shared.config;
        let mut resolved = Vec::new();
        for id in &missing {
            let params = vec![(config.value_key.clone(), id.clone())];
            let fetched = tokio::select! {
                () = self.lifetime.cancelled() => return true,
                result = self.shared.source.fetch(target, &params) => result,
            };
            match fetched {
                Ok(records) => resolved.extend(
                    records
                        .iter()
                        .filter_map(|r| option_from_record(r, &config.label_key, &config.value_key))
                        .find(|o| o.value.key_string().as_deref() == Some(id.as_str())),
                ),
                Err(error) => {
                    warn!(field = %config.field, %target, %error, "failed to hydrate selected value");
                    let mut state = self.shared.state.lock();
                    if state.hydrating_for.as_deref() == Some(marker.as_str()) {
                        state.hydrating_for = None;
                    }
                    return true;
                }
            }
        }

        let mut state = self.shared.state.lock();
        for option in resolved {
            if !value_is_listed(&option.value, &state.hydrated) {
                state.hydrated.push(option);
            }
        }
        true
    }

    /// Cancels pending searches and discards any response still in flight.
    pub fn teardown(&self) {
        self.lifetime.cancel();
        if let Some(pending) = self.pending.lock().take() {
            pending.cancel();
        }
        let mut state = self.shared.state.lock();
        state.generation += 1;
        state.mounted = false;
        state.is_fetching = false;
    }
}

impl Drop for DependentOptionResolver {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

impl std::fmt::Debug for DependentOptionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependentOptionResolver")
            .field("config", &self.shared.config)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

async fn run_search(shared: &Shared, query: &str) {
    let config = &shared.config;
    let Some(target) = config.target() else {
        return;
    };

    let (stamp, parent) = {
        let mut state = shared.state.lock();
        state.generation += 1;
        let parent = state.last_parent_key.clone();
        // A dependent dropdown without a parent has nothing to show.
        if config.depends_on.is_some() && parent.is_none() && query.is_empty() {
            state.remote_options.clear();
            state.is_fetching = false;
            return;
        }
        state.is_fetching = true;
        (state.generation, parent)
    };

    let mut params = vec![("search".to_string(), query.to_string())];
    if let Some(key) = parent {
        params.push((config.parent_key_name.clone(), key));
    }
    let result = shared.source.fetch(target, &params).await;

    let mut state = shared.state.lock();
    let current = stamp == state.generation;
    match result {
        Ok(records) if current => {
            state.remote_options = records
                .iter()
                .filter_map(|r| option_from_record(r, &config.label_key, &config.value_key))
                .collect();
        }
        Ok(_) => {
            debug!(field = %config.field, stamp, latest = state.generation, "discarding stale option response");
        }
        Err(error) => {
            warn!(field = %config.field, %target, %error, "option fetch failed");
        }
    }
    if current {
        state.is_fetching = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
