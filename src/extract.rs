//! Extraction dispatcher
//!
//! Compiles the schema catalog into a static dispatch table: one name pattern
//! per event kind plus one pre-compiled extractor per declared field, drawn
//! from a fixed registry keyed by the field's type tag. Given one call/return
//! line pair, the first schema whose name matches the call line wins and its
//! extractors run independently; a field absent from the line is simply
//! omitted from the event.

use std::collections::HashMap;

use regex::Regex;
use thiserror::Error;

use crate::object::{ObjectId, ObjectStore};
use crate::schema::{EventSchema, Param, ParamType, REGISTRY};

/// Generic success token on return lines.
pub const SUCCESS: &str = "CL_SUCCESS";

/// Errors raised while reconstructing the event stream.
#[derive(Error, Debug)]
pub enum TraceError {
    /// A call line matched no registered schema. Fatal: the parse aborts and
    /// the offending line is reported verbatim.
    #[error("unrecognized OpenCL event: '{0}'")]
    MalformedTrace(String),

    #[error("failed to read trace log: {0}")]
    Io(#[from] std::io::Error),
}

/// One extracted field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Flag set, parsed from its hex representation.
    Flags(u64),
    /// Handle that resolved to a known object.
    Object(ObjectId),
    /// Handle with no creation history; the raw hex token is kept.
    Handle(String),
    /// Raw pointer address, never resolved.
    Pointer(String),
    /// `(nil)` pointer.
    Null,
    Int(u64),
    Word(String),
    /// Only ever `true`; an absent boolean field is unset, not false.
    Bool(bool),
    IntVector(Vec<u64>),
    /// Opaque bracketed text, uninterpreted, brackets included.
    NameList(String),
}

/// One reconstructed API invocation (a call line paired with its return line).
#[derive(Debug, Clone)]
pub struct Event {
    /// Schema name, e.g. `CreateContext`.
    pub kind: &'static str,
    /// Enqueue counter parsed from the call line; 0 if absent.
    pub date: u64,
    /// Completion token from the return line; empty if absent.
    pub return_code: String,
    pub call_args: HashMap<&'static str, Value>,
    pub returns: HashMap<&'static str, Value>,
    /// Object created by this event, bound by the scanner on success.
    pub returned: Option<ObjectId>,
}

impl Event {
    pub fn succeeded(&self) -> bool {
        self.return_code == SUCCESS
    }

    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.call_args.get(name)
    }

    pub fn ret(&self, name: &str) -> Option<&Value> {
        self.returns.get(name)
    }
}

/// Dispatcher output: the event plus what the scanner needs to finish it.
#[derive(Debug)]
pub struct Extraction {
    pub schema: &'static EventSchema,
    pub event: Event,
    /// `returned 0x...` token from the return line, probed only for schemas
    /// that declare a returned-object kind.
    pub returned_handle: Option<String>,
}

/// Compiled extractor for one field, keyed by its type tag.
#[derive(Debug)]
enum Extractor {
    Flags(Regex),
    Handle(Regex),
    Pointer { nil: Regex, hex: Regex },
    Int(Regex),
    Word(Regex),
    Bool(Regex),
    IntVector(Regex),
    NameList(Regex),
}

#[derive(Debug)]
struct FieldMatcher {
    name: &'static str,
    extractor: Extractor,
}

#[derive(Debug)]
struct CompiledSchema {
    schema: &'static EventSchema,
    /// Unanchored match against the `cl`-prefixed API name.
    name_pattern: Regex,
    call_fields: Vec<FieldMatcher>,
    return_fields: Vec<FieldMatcher>,
}

/// Schema-driven line-pair interpreter, compiled once at startup.
#[derive(Debug)]
pub struct Dispatcher {
    schemas: Vec<CompiledSchema>,
    date_pattern: Regex,
    code_pattern: Regex,
    returned_pattern: Regex,
}

// All patterns are assembled from literals and escaped field names, so
// compilation cannot fail at runtime.
fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern")
}

fn compile_field(param: &Param) -> FieldMatcher {
    let name = regex::escape(param.name);
    let extractor = match param.ty {
        ParamType::Flags => Extractor::Flags(re(&format!(r"{name} = \w* \(([0-9a-fA-F]+)\)"))),
        ParamType::Handle(_) => Extractor::Handle(re(&format!(r"{name} = (0x[0-9a-fA-F]+)"))),
        ParamType::Pointer => Extractor::Pointer {
            nil: re(&format!(r"{name} = \(nil\)")),
            hex: re(&format!(r"{name} = (0x[0-9a-fA-F]+)")),
        },
        ParamType::Int => Extractor::Int(re(&format!(r"{name} = (\d+)"))),
        ParamType::Word => Extractor::Word(re(&format!(r"{name} = (\w+)"))),
        ParamType::Bool => Extractor::Bool(re(&name)),
        ParamType::IntVector => Extractor::IntVector(re(&format!(r"{name} = <(.*?)>"))),
        ParamType::NameList => Extractor::NameList(re(&format!(r"{name} = (\[.*?\])"))),
    };
    FieldMatcher {
        name: param.name,
        extractor,
    }
}

impl Dispatcher {
    /// Compile the full catalog. Cheap enough to do once per parse.
    pub fn new() -> Self {
        let schemas = REGISTRY
            .iter()
            .map(|schema| CompiledSchema {
                schema,
                name_pattern: re(&format!("cl{}", schema.name)),
                call_fields: schema.call_params.iter().map(compile_field).collect(),
                return_fields: schema.returns.iter().map(compile_field).collect(),
            })
            .collect();
        Self {
            schemas,
            date_pattern: re(r"EnqueueCounter: (\d+)"),
            code_pattern: re(r"-> (\w+)"),
            returned_pattern: re(r"returned (0x[0-9a-fA-F]+)"),
        }
    }

    /// Interpret one call/return line pair. The store is consulted read-only
    /// to resolve handle-typed fields; object creation is the scanner's job.
    pub fn dispatch(
        &self,
        call_line: &str,
        return_line: &str,
        store: &ObjectStore,
    ) -> Result<Extraction, TraceError> {
        let compiled = self
            .schemas
            .iter()
            .find(|c| c.name_pattern.is_match(call_line))
            .ok_or_else(|| TraceError::MalformedTrace(call_line.trim_end().to_string()))?;

        let date = self
            .date_pattern
            .captures(call_line)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(0);
        let return_code = self
            .code_pattern
            .captures(return_line)
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        let returned_handle = if compiled.schema.returned.is_some() {
            self.returned_pattern
                .captures(return_line)
                .map(|c| c[1].to_string())
        } else {
            None
        };

        let call_args = extract_fields(&compiled.call_fields, call_line, date, store);
        let returns = extract_fields(&compiled.return_fields, return_line, date, store);

        Ok(Extraction {
            schema: compiled.schema,
            event: Event {
                kind: compiled.schema.name,
                date,
                return_code,
                call_args,
                returns,
                returned: None,
            },
            returned_handle,
        })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_fields(
    fields: &[FieldMatcher],
    line: &str,
    date: u64,
    store: &ObjectStore,
) -> HashMap<&'static str, Value> {
    let mut out = HashMap::new();
    for field in fields {
        if let Some(value) = extract_one(&field.extractor, line, date, store) {
            out.insert(field.name, value);
        }
    }
    out
}

fn extract_one(extractor: &Extractor, line: &str, date: u64, store: &ObjectStore) -> Option<Value> {
    match extractor {
        Extractor::Flags(pattern) => {
            let cap = pattern.captures(line)?;
            u64::from_str_radix(&cap[1], 16).ok().map(Value::Flags)
        }
        Extractor::Handle(pattern) => {
            let cap = pattern.captures(line)?;
            let raw = &cap[1];
            Some(match store.resolve_at(raw, date) {
                Some(id) => Value::Object(id),
                None => Value::Handle(raw.to_string()),
            })
        }
        Extractor::Pointer { nil, hex } => {
            if nil.is_match(line) {
                Some(Value::Null)
            } else {
                hex.captures(line)
                    .map(|cap| Value::Pointer(cap[1].to_string()))
            }
        }
        Extractor::Int(pattern) => {
            let cap = pattern.captures(line)?;
            cap[1].parse().ok().map(Value::Int)
        }
        Extractor::Word(pattern) => {
            let cap = pattern.captures(line)?;
            Some(Value::Word(cap[1].to_string()))
        }
        Extractor::Bool(pattern) => pattern.is_match(line).then_some(Value::Bool(true)),
        Extractor::IntVector(pattern) => {
            let cap = pattern.captures(line)?;
            let values = cap[1]
                .split(" x ")
                .map(|part| part.trim().parse().unwrap_or(0))
                .collect();
            Some(Value::IntVector(values))
        }
        Extractor::NameList(pattern) => {
            let cap = pattern.captures(line)?;
            Some(Value::NameList(cap[1].to_string()))
        }
    }
}
