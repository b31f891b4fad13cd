//! Normalized action outcomes and the self-healing descriptor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Imperative action the client can have in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
	Detection,
	Unlock,
}

impl fmt::Display for ActionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ActionKind::Detection => f.write_str("detection"),
			ActionKind::Unlock => f.write_str("unlock"),
		}
	}
}

/// Result of a single request/response action.
///
/// Server-reported failures and transport failures both land in
/// [`Failure`](ActionResult::Failure); they are values, never errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult<T> {
	Success(T),
	Failure(Failure),
}

impl<T> ActionResult<T> {
	pub fn is_success(&self) -> bool {
		matches!(self, ActionResult::Success(_))
	}

	pub fn failure(&self) -> Option<&Failure> {
		match self {
			ActionResult::Failure(failure) => Some(failure),
			ActionResult::Success(_) => None,
		}
	}

	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActionResult<U> {
		match self {
			ActionResult::Success(value) => ActionResult::Success(f(value)),
			ActionResult::Failure(failure) => ActionResult::Failure(failure),
		}
	}

	pub fn into_result(self) -> Result<T, Failure> {
		match self {
			ActionResult::Success(value) => Ok(value),
			ActionResult::Failure(failure) => Err(failure),
		}
	}
}

/// A failed action, with the server's recovery report when it sent one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub self_healing: Option<SelfHealing>,
}

impl Failure {
	/// Failure that never reached the server's recovery logic (I/O, HTTP
	/// status, undecodable body).
	pub fn transport(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			self_healing: None,
		}
	}

	pub fn reported(message: impl Into<String>, self_healing: Option<SelfHealing>) -> Self {
		Self {
			message: message.into(),
			self_healing,
		}
	}
}

impl fmt::Display for Failure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

/// What the server did about a failure before reporting it.
///
/// A recovered failure carries no remediation hints; the type makes the
/// combination unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SelfHealing {
	/// The server already fixed the problem; the action may simply be retried.
	Recovered {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		action: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		details: Option<String>,
	},
	/// The server could not fix it. Either list may be empty.
	Unresolved {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		reason: Option<String>,
		#[serde(default, skip_serializing_if = "Vec::is_empty")]
		suggestions: Vec<String>,
		#[serde(default, skip_serializing_if = "Vec::is_empty")]
		alternative_methods: Vec<String>,
	},
}

impl SelfHealing {
	pub fn is_recovered(&self) -> bool {
		matches!(self, SelfHealing::Recovered { .. })
	}

	pub fn suggestions(&self) -> &[String] {
		match self {
			SelfHealing::Unresolved { suggestions, .. } => suggestions,
			SelfHealing::Recovered { .. } => &[],
		}
	}

	pub fn alternative_methods(&self) -> &[String] {
		match self {
			SelfHealing::Unresolved { alternative_methods, .. } => alternative_methods,
			SelfHealing::Recovered { .. } => &[],
		}
	}

	/// True when the descriptor gives the operator nothing to act on.
	pub fn has_no_remedy(&self) -> bool {
		self.suggestions().is_empty() && self.alternative_methods().is_empty()
	}
}
