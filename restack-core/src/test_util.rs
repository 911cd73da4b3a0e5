//! Test doubles for the stack client.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::{Parameter, StackClient, StackDescription};
use crate::config::TEMPLATE_SHA_KEY;
use crate::error::{Result, StackError};

/// Build a description with an optional stored fingerprint parameter.
pub fn description(name: &str, status: &str, template_sha: Option<&str>) -> StackDescription {
    let parameters = template_sha
        .map(|sha| vec![Parameter::new(TEMPLATE_SHA_KEY, sha)])
        .unwrap_or_default();
    StackDescription {
        name: name.to_string(),
        status: status.to_string(),
        parameters,
    }
}

/// Scripted result for a mutating call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockResult {
    Ok,
    Conflict,
    Failure,
}

impl MockResult {
    fn into_result(self, name: &str) -> Result<()> {
        match self {
            MockResult::Ok => Ok(()),
            MockResult::Conflict => Err(StackError::AlreadyExists(name.to_string())),
            MockResult::Failure => Err(StackError::Remote(anyhow::anyhow!("scripted failure"))),
        }
    }
}

/// A recorded client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Create {
        name: String,
        parameters: Vec<Parameter>,
        template_body: String,
    },
    Update {
        name: String,
        parameters: Vec<Parameter>,
        template_body: String,
    },
    Describe {
        name: String,
    },
}

impl RecordedCall {
    fn is_mutating(&self) -> bool {
        !matches!(self, RecordedCall::Describe { .. })
    }
}

/// Scripted stack client.
///
/// Create and update return fixed results; describe pops responses from a
/// queue and falls back to a configurable repeated response once the queue
/// drains (absent by default). Every call is recorded.
pub struct MockStackClient {
    create_result: MockResult,
    update_result: MockResult,
    describes: Mutex<VecDeque<Option<StackDescription>>>,
    repeat_describe: Mutex<Option<StackDescription>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockStackClient {
    pub fn new() -> Self {
        Self {
            create_result: MockResult::Ok,
            update_result: MockResult::Ok,
            describes: Mutex::new(VecDeque::new()),
            repeat_describe: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_create_result(mut self, result: MockResult) -> Self {
        self.create_result = result;
        self
    }

    pub fn with_update_result(mut self, result: MockResult) -> Self {
        self.update_result = result;
        self
    }

    /// Queue the next describe response.
    pub fn push_describe(&self, response: Option<StackDescription>) {
        self.describes.lock().unwrap().push_back(response);
    }

    /// Response returned once the queue is drained.
    pub fn repeat_describe(&self, response: Option<StackDescription>) {
        *self.repeat_describe.lock().unwrap() = response;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutating_calls(&self) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(RecordedCall::is_mutating).collect()
    }

    pub fn describe_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RecordedCall::Describe { .. }))
            .count()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for MockStackClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StackClient for MockStackClient {
    async fn create_stack(
        &self,
        name: &str,
        parameters: &[Parameter],
        template_body: &str,
    ) -> Result<()> {
        self.record(RecordedCall::Create {
            name: name.to_string(),
            parameters: parameters.to_vec(),
            template_body: template_body.to_string(),
        });
        self.create_result.into_result(name)
    }

    async fn update_stack(
        &self,
        name: &str,
        parameters: &[Parameter],
        template_body: &str,
    ) -> Result<()> {
        self.record(RecordedCall::Update {
            name: name.to_string(),
            parameters: parameters.to_vec(),
            template_body: template_body.to_string(),
        });
        self.update_result.into_result(name)
    }

    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>> {
        self.record(RecordedCall::Describe {
            name: name.to_string(),
        });
        if let Some(response) = self.describes.lock().unwrap().pop_front() {
            return Ok(response);
        }
        Ok(self.repeat_describe.lock().unwrap().clone())
    }
}

/// Stateful in-memory stack service.
///
/// Remote operations complete instantly: create leaves the stack in
/// `CREATE_COMPLETE`, update in `UPDATE_COMPLETE`, so polls terminate on
/// the first describe. Useful for multi-run scenarios such as idempotence.
pub struct InMemoryStackService {
    stacks: Mutex<HashMap<String, StackDescription>>,
    created: Mutex<usize>,
    updated: Mutex<usize>,
}

impl InMemoryStackService {
    pub fn new() -> Self {
        Self {
            stacks: Mutex::new(HashMap::new()),
            created: Mutex::new(0),
            updated: Mutex::new(0),
        }
    }

    /// Number of creates that actually went through (conflicts excluded).
    pub fn created(&self) -> usize {
        *self.created.lock().unwrap()
    }

    /// Number of updates that actually went through.
    pub fn updated(&self) -> usize {
        *self.updated.lock().unwrap()
    }

    pub fn get(&self, name: &str) -> Option<StackDescription> {
        self.stacks.lock().unwrap().get(name).cloned()
    }
}

impl Default for InMemoryStackService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StackClient for InMemoryStackService {
    async fn create_stack(
        &self,
        name: &str,
        parameters: &[Parameter],
        _template_body: &str,
    ) -> Result<()> {
        let mut stacks = self.stacks.lock().unwrap();
        if stacks.contains_key(name) {
            return Err(StackError::AlreadyExists(name.to_string()));
        }
        stacks.insert(
            name.to_string(),
            StackDescription {
                name: name.to_string(),
                status: "CREATE_COMPLETE".to_string(),
                parameters: parameters.to_vec(),
            },
        );
        *self.created.lock().unwrap() += 1;
        Ok(())
    }

    async fn update_stack(
        &self,
        name: &str,
        parameters: &[Parameter],
        _template_body: &str,
    ) -> Result<()> {
        let mut stacks = self.stacks.lock().unwrap();
        let stack = match stacks.get_mut(name) {
            Some(stack) => stack,
            None => return Err(StackError::UnknownStack(name.to_string())),
        };
        stack.status = "UPDATE_COMPLETE".to_string();
        stack.parameters = parameters.to_vec();
        *self.updated.lock().unwrap() += 1;
        Ok(())
    }

    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>> {
        Ok(self.stacks.lock().unwrap().get(name).cloned())
    }
}
