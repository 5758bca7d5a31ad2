//! Task descriptors: what the work is, and what shape its result must take.
//!
//! Construction goes through [`TaskSpecBuilder`]; `build()` applies
//! [`SpecOverrides`] in declaration order, then validates:
//! 1. an id supplied by the caller is rejected (ids are engine-assigned),
//! 2. the description must be non-empty,
//! 3. at least one output format must remain selected.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::errors::ValidationError;
use super::ids::TaskId;
use super::output::TaskOutput;
use super::tool::Tool;
use crate::typed::{DynDecoder, Structured, TypedDecoder};

/// One field in the JSON shape the agent is asked to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseField {
    pub title: String,
    pub field_type: String,
    pub required: bool,
}

impl ResponseField {
    pub fn new(title: impl Into<String>, field_type: impl Into<String>, required: bool) -> Self {
        Self {
            title: title.into(),
            field_type: field_type.into(),
            required,
        }
    }
}

/// The primary output format a spec resolves to, for fingerprinting.
///
/// Resolution precedence mirrors the format flags: JSON wins over a typed
/// structured object, which wins over raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputFormat {
    Json,
    Structured,
    Raw,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "JSON",
            OutputFormat::Structured => "STRUCTURED",
            OutputFormat::Raw => "RAW",
        }
    }
}

/// Callback invoked with the completed output, exactly once per execution.
pub type TaskCallback = Arc<dyn Fn(&TaskOutput) + Send + Sync>;

/// Overrides applied onto a draft spec before validation runs.
///
/// Deliberately a narrow struct rather than a free key/value map: only the
/// fields listed here are overridable, each type-checked on its own. The `id`
/// slot exists solely to be rejected: ids are engine-assigned, and a config
/// layer that tries to inject one gets [`ValidationError::IdNotSettable`].
#[derive(Debug, Clone, Default)]
pub struct SpecOverrides {
    pub id: Option<TaskId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub expect_raw: Option<bool>,
    pub expect_json: Option<bool>,
    pub expect_structured: Option<bool>,
    pub output_fields: Option<Vec<ResponseField>>,
    pub tools: Option<Vec<Tool>>,
}

/// Descriptor of one unit of work delegated to an agent.
///
/// Identity is immutable: `id` is assigned at construction and never settable
/// by the caller. Execution-time fields (`prompt_context`, provenance,
/// `output`) are owned by the execution in progress; a spec must not be run
/// by two executions at once, which the API enforces through `&mut`/move.
#[derive(Clone, Serialize)]
pub struct TaskSpec {
    id: TaskId,
    pub name: Option<String>,
    pub description: String,

    // output-format intent
    pub expect_raw: bool,
    pub expect_json: bool,
    pub expect_structured: bool,
    pub output_fields: Vec<ResponseField>,

    // task setup
    pub tools: Vec<Tool>,
    /// Other specs whose completed outputs feed this one. Stored for the
    /// caller's prompt assembly; the engine never resolves this graph.
    pub context: Vec<TaskSpec>,
    /// Context string recorded at execution time.
    pub prompt_context: Option<String>,
    #[serde(skip)]
    callback: Option<TaskCallback>,
    #[serde(skip)]
    decoder: Option<Arc<dyn DynDecoder>>,

    // provenance
    processed_by_agents: BTreeSet<String>,
    used_tools: u32,
    tools_errors: u32,
    delegations: u32,
    created_at: DateTime<Utc>,

    output: Option<TaskOutput>,
}

impl TaskSpec {
    pub fn builder() -> TaskSpecBuilder {
        TaskSpecBuilder::default()
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The primary format this spec resolves to (JSON > structured > raw).
    pub fn resolved_format(&self) -> OutputFormat {
        if self.expect_json {
            OutputFormat::Json
        } else if self.expect_structured {
            OutputFormat::Structured
        } else {
            OutputFormat::Raw
        }
    }

    /// Deterministic content fingerprint over `(description, resolved format)`.
    ///
    /// Stable across calls for the same content; changes when either input
    /// changes. Used to recognize semantically identical tasks across runs.
    pub fn key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.description.as_bytes());
        // 0x1f never occurs in the fixed format names, so the pair hashes
        // injectively.
        hasher.update([0x1f]);
        hasher.update(self.resolved_format().as_str().as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }

    /// Render the output-format instruction block for JSON-format tasks.
    ///
    /// Purely presentational: each declared field becomes a placeholder line.
    /// Empty for specs that did not request JSON.
    pub fn output_prompt(&self) -> String {
        if !self.expect_json {
            return String::new();
        }
        let mut shape = serde_json::Map::new();
        for field in &self.output_fields {
            shape.insert(
                field.title.clone(),
                Value::String(format!("your answer in {}", field.field_type)),
            );
        }
        let rendered =
            serde_json::to_string_pretty(&Value::Object(shape)).unwrap_or_else(|_| "{}".to_string());
        format!("The output must follow this JSON format:\n{rendered}")
    }

    /// Render the full task prompt: description, optional business context,
    /// and the output-format block.
    pub fn prompt(&self, customer: Option<&str>, client_business: Option<&str>) -> String {
        let mut slices = vec![self.description.clone()];
        if let Some(customer) = customer {
            slices.push(format!("Customer overview: {customer}"));
        }
        if let Some(business) = client_business {
            slices.push(format!("Client business overview: {business}"));
        }
        let output_prompt = self.output_prompt();
        if !output_prompt.is_empty() {
            slices.push(output_prompt);
        }
        slices.join("\n")
    }

    // provenance

    /// Agent identities that have executed (or attempted) this spec.
    pub fn processed_by_agents(&self) -> &BTreeSet<String> {
        &self.processed_by_agents
    }

    pub(crate) fn note_processed_by(&mut self, role: &str) {
        self.processed_by_agents.insert(role.to_string());
    }

    pub fn used_tools(&self) -> u32 {
        self.used_tools
    }

    pub fn record_tool_use(&mut self) {
        self.used_tools += 1;
    }

    pub fn tools_errors(&self) -> u32 {
        self.tools_errors
    }

    pub fn record_tool_error(&mut self) {
        self.tools_errors += 1;
    }

    pub fn delegations(&self) -> u32 {
        self.delegations
    }

    pub fn record_delegation(&mut self) {
        self.delegations += 1;
    }

    /// The most recent completed output, if any execution has finished.
    pub fn output(&self) -> Option<&TaskOutput> {
        self.output.as_ref()
    }

    pub(crate) fn set_output(&mut self, output: TaskOutput) {
        self.output = Some(output);
    }

    pub(crate) fn callback(&self) -> Option<&TaskCallback> {
        self.callback.as_ref()
    }

    pub(crate) fn decoder(&self) -> Option<&Arc<dyn DynDecoder>> {
        self.decoder.as_ref()
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("expect_raw", &self.expect_raw)
            .field("expect_json", &self.expect_json)
            .field("expect_structured", &self.expect_structured)
            .field("output_fields", &self.output_fields)
            .field("tools", &self.tools)
            .field("context", &self.context.len())
            .field("prompt_context", &self.prompt_context)
            .field("callback", &self.callback.is_some())
            .field("decoder", &self.decoder.as_ref().map(|d| d.type_name()))
            .field("processed_by_agents", &self.processed_by_agents)
            .field("used_tools", &self.used_tools)
            .field("tools_errors", &self.tools_errors)
            .field("delegations", &self.delegations)
            .field("output", &self.output.is_some())
            .finish()
    }
}

/// Builder for [`TaskSpec`].
///
/// JSON output is expected by default; disable it explicitly if the task
/// should produce raw text or a typed object only.
pub struct TaskSpecBuilder {
    name: Option<String>,
    description: Option<String>,
    expect_raw: bool,
    expect_json: bool,
    expect_structured: bool,
    output_fields: Vec<ResponseField>,
    tools: Vec<Tool>,
    context: Vec<TaskSpec>,
    callback: Option<TaskCallback>,
    decoder: Option<Arc<dyn DynDecoder>>,
    overrides: Option<SpecOverrides>,
}

impl Default for TaskSpecBuilder {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            expect_raw: false,
            expect_json: true,
            expect_structured: false,
            output_fields: vec![ResponseField::new("output", "str", true)],
            tools: Vec::new(),
            context: Vec::new(),
            callback: None,
            decoder: None,
            overrides: None,
        }
    }
}

impl TaskSpecBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn expect_raw(mut self, on: bool) -> Self {
        self.expect_raw = on;
        self
    }

    pub fn expect_json(mut self, on: bool) -> Self {
        self.expect_json = on;
        self
    }

    pub fn expect_structured(mut self, on: bool) -> Self {
        self.expect_structured = on;
        self
    }

    /// Replace the declared JSON shape.
    pub fn output_fields(mut self, fields: Vec<ResponseField>) -> Self {
        self.output_fields = fields;
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    /// Specs whose completed outputs feed this one.
    pub fn context(mut self, context: Vec<TaskSpec>) -> Self {
        self.context = context;
        self
    }

    /// Invoked with the completed output, after it is stored on the spec and
    /// before any completion handle resolves.
    pub fn callback(mut self, callback: impl Fn(&TaskOutput) + Send + Sync + 'static) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Request the output as a typed structured object.
    ///
    /// Implies the structured format flag. If the agent's result decodes to a
    /// mapping that cannot construct `T`, the mapping is delivered in
    /// `json_dict` instead; check which field the output actually carries.
    pub fn structured<T: Structured>(mut self) -> Self {
        self.decoder = Some(Arc::new(TypedDecoder::<T>::new()));
        self.expect_structured = true;
        self
    }

    /// Overrides applied in field order before validation.
    pub fn overrides(mut self, overrides: SpecOverrides) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn build(mut self) -> Result<TaskSpec, ValidationError> {
        let mut supplied_id = None;
        if let Some(cfg) = self.overrides.take() {
            supplied_id = cfg.id;
            if let Some(name) = cfg.name {
                self.name = Some(name);
            }
            if let Some(description) = cfg.description {
                self.description = Some(description);
            }
            if let Some(raw) = cfg.expect_raw {
                self.expect_raw = raw;
            }
            if let Some(json) = cfg.expect_json {
                self.expect_json = json;
            }
            if let Some(structured) = cfg.expect_structured {
                self.expect_structured = structured;
            }
            if let Some(fields) = cfg.output_fields {
                self.output_fields = fields;
            }
            if let Some(tools) = cfg.tools {
                self.tools = tools;
            }
        }

        if supplied_id.is_some() {
            return Err(ValidationError::IdNotSettable);
        }

        let description = match self.description {
            Some(description) if !description.trim().is_empty() => description,
            _ => return Err(ValidationError::MissingRequiredField("description")),
        };

        let expect_structured = self.expect_structured || self.decoder.is_some();
        if !self.expect_raw && !self.expect_json && !expect_structured {
            return Err(ValidationError::NoOutputFormatSelected);
        }

        Ok(TaskSpec {
            id: TaskId::generate(),
            name: self.name,
            description,
            expect_raw: self.expect_raw,
            expect_json: self.expect_json,
            expect_structured,
            output_fields: self.output_fields,
            tools: self.tools,
            context: self.context,
            prompt_context: None,
            callback: self.callback,
            decoder: self.decoder,
            processed_by_agents: BTreeSet::new(),
            used_tools: 0,
            tools_errors: 0,
            delegations: 0,
            created_at: Utc::now(),
            output: None,
        })
    }
}
