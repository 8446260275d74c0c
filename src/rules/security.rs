use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Thresholds;
use crate::error::ConfigError;
use crate::finding::{Confidence, Finding, Severity};
use crate::ir::{CallSite, Class, Instruction, InstructionKind, Method};
use crate::rules::{Check, CheckCategory, CheckMetadata, method_location};

const ID: &str = "SECURITY";
const MIN_CANDIDATE_LENGTH: usize = 8;

static SECRET_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(password|passwd|pwd|secret|api[_-]?key|apikey|token|access[_-]?token|auth|bearer|private[_-]?key)",
    )
    .expect("valid secret keyword regex")
});
static KEY_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/=_\-]+$").expect("valid key charset regex"));
static AWS_ACCESS_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^AKIA[0-9A-Z]{16}$").expect("valid access key regex"));
static JWT_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+$").expect("valid token regex")
});

/// Hardcoded secrets and injection-prone query construction.
pub struct SecurityCheck {
    secret_min_length: usize,
    extra_patterns: Vec<Regex>,
}

impl SecurityCheck {
    pub fn new(thresholds: &Thresholds) -> Result<Self, ConfigError> {
        Ok(Self {
            secret_min_length: thresholds.secret_min_length() as usize,
            extra_patterns: thresholds.secret_patterns()?,
        })
    }

    fn secret_finding(
        &self,
        class: &Class,
        method: &Method,
        instruction: &Instruction,
        value: &str,
    ) -> Option<Finding> {
        let candidate = value.trim();
        let confidence = self.classify_secret(candidate)?;
        Some(
            Finding::new(
                ID,
                Severity::Error,
                format!(
                    "Possible hardcoded secret in method '{}'; load secrets from the environment or a secret manager",
                    method.name
                ),
                method_location(class, method).at_line(instruction.line),
            )
            .with_confidence(confidence),
        )
    }

    fn classify_secret(&self, candidate: &str) -> Option<Confidence> {
        if self
            .extra_patterns
            .iter()
            .any(|pattern| pattern.is_match(candidate))
        {
            return Some(Confidence::High);
        }
        if candidate.len() < MIN_CANDIDATE_LENGTH {
            return None;
        }
        let keyword = SECRET_KEYWORDS.is_match(candidate);
        if keyword && (candidate.contains('=') || candidate.contains(':')) {
            return Some(Confidence::High);
        }
        if AWS_ACCESS_KEY.is_match(candidate) {
            return Some(Confidence::High);
        }
        if candidate.len() < self.secret_min_length {
            return None;
        }
        if JWT_LIKE.is_match(candidate) || looks_random(candidate) {
            return Some(Confidence::Medium);
        }
        None
    }
}

/// Key-shaped: only key characters, with both letters and digits.
fn looks_random(candidate: &str) -> bool {
    KEY_CHARSET.is_match(candidate)
        && candidate.chars().any(|c| c.is_ascii_digit())
        && candidate.chars().any(|c| c.is_ascii_alphabetic())
}

impl Check for SecurityCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: ID,
            name: "Security",
            description: "Hardcoded secrets, dynamic SQL execution and untrusted input in query building",
            category: CheckCategory::Principle,
        }
    }

    fn check(&self, class: &Class) -> Vec<Finding> {
        let mut findings = Vec::new();
        for method in &class.methods {
            let mut scan = QueryScan::default();
            for instruction in &method.instructions {
                if let InstructionKind::ConstString(value) = &instruction.kind {
                    findings.extend(self.secret_finding(class, method, instruction, value));
                }
                scan.observe(&instruction.kind);
            }
            findings.extend(scan.verdict(class, method));
        }
        findings
    }
}

/// Per-method scan over the instruction stream, in order.
#[derive(Debug, Default)]
struct QueryScan {
    builds_dynamic_query: bool,
    executes_raw_query: bool,
    uses_parameterized_query: bool,
    reads_untrusted_input: bool,
}

impl QueryScan {
    fn observe(&mut self, kind: &InstructionKind) {
        match kind {
            InstructionKind::ConstString(value) if looks_like_sql(value) => {
                self.builds_dynamic_query = true;
            }
            InstructionKind::InvokeDynamic(call) if call.is_string_concat() => {
                self.builds_dynamic_query = true;
            }
            InstructionKind::Invoke(call) => {
                if is_concatenation(call) {
                    self.builds_dynamic_query = true;
                }
                if is_raw_execution(call) {
                    self.executes_raw_query = true;
                }
                if is_parameterized(call) {
                    self.uses_parameterized_query = true;
                }
                if is_untrusted_source(call) {
                    self.reads_untrusted_input = true;
                }
            }
            _ => {}
        }
    }

    fn verdict(&self, class: &Class, method: &Method) -> Option<Finding> {
        if !self.builds_dynamic_query || self.uses_parameterized_query {
            return None;
        }
        if self.executes_raw_query {
            return Some(
                Finding::new(
                    ID,
                    Severity::Error,
                    format!(
                        "Potential SQL injection in method '{}': dynamically built query executed through Statement; use PreparedStatement parameters",
                        method.name
                    ),
                    method_location(class, method),
                )
                .with_confidence(Confidence::High),
            );
        }
        if self.reads_untrusted_input {
            return Some(
                Finding::new(
                    ID,
                    Severity::Warning,
                    format!(
                        "Untrusted input flows into dynamic string building in method '{}'; validate it and prefer parameterized APIs",
                        method.name
                    ),
                    method_location(class, method),
                )
                .with_confidence(Confidence::Low),
            );
        }
        None
    }
}

fn looks_like_sql(value: &str) -> bool {
    let upper = value.to_ascii_uppercase();
    ["SELECT ", "INSERT ", "UPDATE ", "DELETE ", " FROM ", " WHERE "]
        .iter()
        .any(|keyword| upper.contains(keyword))
}

fn is_concatenation(call: &CallSite) -> bool {
    match call.owner.as_str() {
        "java/lang/StringBuilder" | "java/lang/StringBuffer" => call.name == "append",
        "java/lang/String" => call.name == "concat",
        _ => false,
    }
}

fn is_raw_execution(call: &CallSite) -> bool {
    call.owner == "java/sql/Statement" && (call.name.starts_with("execute") || call.name == "addBatch")
}

fn is_parameterized(call: &CallSite) -> bool {
    match call.owner.as_str() {
        "java/sql/PreparedStatement" => call.name.starts_with("execute"),
        "java/sql/Connection" => call.name == "prepareStatement" || call.name == "prepareCall",
        _ => false,
    }
}

fn is_untrusted_source(call: &CallSite) -> bool {
    match call.owner.as_str() {
        "javax/servlet/http/HttpServletRequest" | "jakarta/servlet/http/HttpServletRequest" => {
            matches!(
                call.name.as_str(),
                "getParameter"
                    | "getParameterValues"
                    | "getHeader"
                    | "getHeaders"
                    | "getQueryString"
                    | "getRequestURI"
                    | "getRequestURL"
            )
        }
        "java/util/Scanner" => call.name.starts_with("next"),
        "java/io/BufferedReader" => call.name == "readLine",
        _ => false,
    }
}
