//! Default prompt templates. All of them can be overridden from settings.

/// Main reply template. `{{CONTEXT}}` receives the prepared conversation
/// context and `{{QUERY}}` the normalized user query.
pub const STUDY_PLAN_PROMPT: &str = r#"You are Studly, a study planner.

{{CONTEXT}}

Query: {{QUERY}}

Output a structured plan in markdown:
# Duration: [days/weeks]
## Daily Goals: [list milestones]
## Time Estimates: [per day]
# Tips: [motivational advice]
Keep it concise (under 400 words)."#;

pub const SUMMARY_INSTRUCTION: &str = "Summarize the following conversation between a student and a study planner in 2-3 sentences. Focus on the user's study goals, deadlines and learning preferences.";

pub const AGENT_DESCRIPTION: &str = "The Study Plan Generator is an AI-driven assistant that creates personalized, adaptive study schedules based on a user's goals, available time, and preferred learning style.";

pub const CLARIFICATION_REPLY: &str =
    "I didn't catch that. Could you rephrase your study request?";

pub fn render_study_plan(template: &str, context: &str, query: &str) -> String {
    template
        .replace("{{CONTEXT}}", context)
        .replace("{{QUERY}}", query)
}
