//! Prompt templates for the AI analysis pass.

/// System role used for every analysis request.
pub const SYSTEM_PROMPT: &str =
  "You are a senior QA engineer specialized in root cause analysis.";

/// Structured prompt requesting JSON-only output matching the analysis
/// result shape. Fences are explicitly forbidden; the analyzer still strips
/// any that appear before parsing.
pub fn root_cause_prompt(serialized_report: &str) -> String {
  format!(
    r#"You are an AI QA assistant. Analyze the following normalized test report and produce a JSON object with the following shape:
{{
"rootCauses": [{{"id": string, "area": string, "description": string, "evidence": string[], "likelihood": number}}],
"flakyCandidates": [{{"testId": string, "reason": string, "evidence": string[], "confidence": number}}],
"newTestIdeas": [{{"title": string, "description": string, "targetArea": string, "priority": "low"|"medium"|"high"|"critical"}}],
"actions": [{{"title": string, "description": string, "ownerHint"?: string, "priority": "low"|"medium"|"high"|"critical"}}]
}}
DO NOT include markdown fences. JSON only.

Report:
{report}
"#,
    report = serialized_report
  )
}
