//! Operation routing
//!
//! Maps an invocation's function name to a handler and turns the handler's
//! result into the response the host returns to the caller.

use crate::config::KeyspaceConfig;
use crate::error::{IntegrityError, IntegrityResult};
use crate::handler::HashHandler;
use crate::host::ChaincodeHost;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error};

/// Operations exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SubmitHash,
    QueryHash,
}

impl Operation {
    /// Name used in invocations
    pub fn name(&self) -> &'static str {
        match self {
            Operation::SubmitHash => "submitHash",
            Operation::QueryHash => "queryHash",
        }
    }

    /// Required number of positional arguments
    pub fn arity(&self) -> usize {
        match self {
            Operation::SubmitHash => 3,
            Operation::QueryHash => 1,
        }
    }

    pub(crate) fn wrong_format(&self, actual: usize) -> IntegrityError {
        IntegrityError::WrongFormat {
            operation: self.name(),
            expected: self.arity(),
            actual,
        }
    }
}

impl FromStr for Operation {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitHash" => Ok(Operation::SubmitHash),
            "queryHash" => Ok(Operation::QueryHash),
            other => Err(IntegrityError::UnknownOperation(other.to_string())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coded error body reported to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: u16,
    pub reason: String,
}

impl ErrorEnvelope {
    /// JSON form: `{"code":301,"reason":"..."}`
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| format!("{{\"code\":{},\"reason\":\"\"}}", self.code))
    }
}

/// Error message the host receives for a failed call
///
/// Coded errors are sent as an `ErrorEnvelope`. Query failures without a
/// code are sent as their bare reason.
pub fn error_message(err: &IntegrityError) -> String {
    match err.code() {
        Some(code) => ErrorEnvelope {
            code,
            reason: err.reason(),
        }
        .to_json(),
        None => err.reason(),
    }
}

/// Outcome of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Operation succeeded, with an optional payload
    Success(Option<Vec<u8>>),
    /// Operation failed with the message sent to the host
    Error(String),
}

impl Response {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    /// Payload bytes of a successful response
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Response::Success(payload) => payload.as_deref(),
            Response::Error(_) => None,
        }
    }

    /// Error message of a failed response
    pub fn error(&self) -> Option<&str> {
        match self {
            Response::Success(_) => None,
            Response::Error(message) => Some(message),
        }
    }

    /// Envelope of a failed response, when the error carries a code
    pub fn envelope(&self) -> Option<ErrorEnvelope> {
        self.error()
            .and_then(|message| serde_json::from_str(message).ok())
    }
}

impl From<IntegrityResult<Option<Vec<u8>>>> for Response {
    fn from(result: IntegrityResult<Option<Vec<u8>>>) -> Self {
        match result {
            Ok(payload) => Response::Success(payload),
            Err(e) => Response::Error(error_message(&e)),
        }
    }
}

/// Routes invocations to the hash handlers
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    handler: HashHandler,
}

impl Dispatcher {
    pub fn new(keyspace: &KeyspaceConfig) -> Self {
        Self {
            handler: HashHandler::new(keyspace.namespace.clone()),
        }
    }

    pub fn handler(&self) -> &HashHandler {
        &self.handler
    }

    /// Run the host's current invocation
    pub fn invoke<H: ChaincodeHost + ?Sized>(&self, host: &H) -> Response {
        let invocation = match host.invocation() {
            Ok(invocation) => invocation,
            Err(e) => {
                error!(error = %e, "Invocation unavailable");
                let err = IntegrityError::InvocationUnavailable(e.to_string());
                return Response::Error(error_message(&err));
            }
        };
        self.dispatch(host, &invocation.function, &invocation.args)
            .into()
    }

    /// Route `function` with `args` to its handler
    ///
    /// `submitHash` succeeds with no payload; `queryHash` returns the JSON
    /// array of matching records.
    pub fn dispatch<H: ChaincodeHost + ?Sized>(
        &self,
        host: &H,
        function: &str,
        args: &[String],
    ) -> IntegrityResult<Option<Vec<u8>>> {
        let operation: Operation = function.parse()?;
        debug!(%operation, args = args.len(), "Dispatching");

        match operation {
            Operation::SubmitHash => {
                self.handler.submit(host, args)?;
                Ok(None)
            }
            Operation::QueryHash => {
                let records = self.handler.query(host, args)?;
                Ok(Some(serde_json::to_vec(&records)?))
            }
        }
    }
}
