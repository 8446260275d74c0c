use std::io::{self, Write};

use serde_json::json;
use serde_sarif::sarif::{
    Artifact, Invocation, Location as SarifLocation, LogicalLocation, Message,
    MultiformatMessageString, ReportingDescriptor, Result as SarifResult, ResultLevel, Run, Sarif,
    Tool, ToolComponent, SCHEMA_URL,
};

use crate::finding::{Finding, Location, Severity, Summary};
use crate::rules::CheckMetadata;

const TOOL_NAME: &str = "classcheck";

/// Assemble a SARIF 2.1.0 log with one run holding every finding.
pub fn build_sarif(
    findings: &[Finding],
    rules: &[CheckMetadata],
    artifacts: Vec<Artifact>,
    invocation: Invocation,
) -> Sarif {
    let driver = ToolComponent::builder()
        .name(TOOL_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .rules(rules.iter().map(rule_descriptor).collect::<Vec<_>>())
        .build();
    let tool = Tool {
        driver,
        extensions: None,
        properties: None,
    };
    let results: Vec<SarifResult> = findings.iter().map(sarif_result).collect();
    let run = if artifacts.is_empty() {
        Run::builder()
            .tool(tool)
            .invocations(vec![invocation])
            .results(results)
            .build()
    } else {
        Run::builder()
            .tool(tool)
            .invocations(vec![invocation])
            .results(results)
            .artifacts(artifacts)
            .build()
    };

    Sarif::builder()
        .schema(SCHEMA_URL)
        .runs(vec![run])
        .version(json!("2.1.0"))
        .build()
}

fn rule_descriptor(metadata: &CheckMetadata) -> ReportingDescriptor {
    ReportingDescriptor::builder()
        .id(metadata.id)
        .name(metadata.name)
        .short_description(
            MultiformatMessageString::builder()
                .text(metadata.description)
                .build(),
        )
        .build()
}

fn sarif_result(finding: &Finding) -> SarifResult {
    SarifResult::builder()
        .rule_id(finding.check_id)
        .level(result_level(finding.severity))
        .message(result_message(finding))
        .locations(vec![sarif_location(&finding.location)])
        .build()
}

fn result_level(severity: Severity) -> ResultLevel {
    match severity {
        Severity::Error => ResultLevel::Error,
        Severity::Warning => ResultLevel::Warning,
        Severity::Info => ResultLevel::Note,
    }
}

/// Confidence has no SARIF field of its own and travels in the message text.
fn result_message(finding: &Finding) -> Message {
    let text = match finding.confidence {
        Some(confidence) => format!("{} (confidence: {confidence})", finding.message),
        None => finding.message.clone(),
    };
    Message::builder().text(text).build()
}

fn sarif_location(location: &Location) -> SarifLocation {
    let logical = match &location.member {
        Some(member) => LogicalLocation::builder()
            .name(member.as_str())
            .fully_qualified_name(location.to_string())
            .kind("member")
            .build(),
        None => LogicalLocation::builder()
            .name(location.class_name.as_str())
            .fully_qualified_name(location.to_string())
            .kind("type")
            .build(),
    };
    SarifLocation::builder()
        .logical_locations(vec![logical])
        .build()
}

/// Human-readable report: one line per finding followed by a summary.
pub fn render_text(findings: &[Finding]) -> String {
    let mut out = String::new();
    for finding in findings {
        out.push_str(&finding.to_string());
        out.push('\n');
    }
    let summary = Summary::from_findings(findings);
    if summary.total() == 0 {
        out.push_str("No findings.\n");
        return out;
    }
    out.push_str(&format!(
        "\n{} finding(s): {} error(s), {} warning(s), {} info\n",
        summary.total(),
        summary.errors,
        summary.warnings,
        summary.infos
    ));
    for (check_id, count) in &summary.by_check {
        out.push_str(&format!("  {check_id}: {count}\n"));
    }
    out
}

pub fn write_text(writer: &mut dyn Write, findings: &[Finding]) -> io::Result<()> {
    writer.write_all(render_text(findings).as_bytes())
}
