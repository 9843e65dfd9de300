use crate::schema::AnalysisTask;

/// Build the prompt for a task. Pure: no I/O, no side effects.
pub fn build_prompt(document_text: &str, query: &str, task: AnalysisTask) -> String {
    match task {
        AnalysisTask::FactExtraction => build_fact_prompt(document_text, query),
        AnalysisTask::QueryDocument => build_query_prompt(document_text, query),
        AnalysisTask::SummarizeDocument => build_summary_prompt(document_text, query),
        AnalysisTask::WebAssistedInsight => build_web_prompt(document_text, query),
        AnalysisTask::ThematicAnalysis => build_thematic_prompt(document_text, query),
    }
}

/// Build a prompt from a task label. Unknown labels fall back to the raw query.
pub fn build_prompt_for_label(document_text: &str, query: &str, label: &str) -> String {
    match AnalysisTask::from_label(label) {
        Some(task) => build_prompt(document_text, query, task),
        None => {
            tracing::warn!(task = label, "Unknown task, sending query unmodified");
            query.to_string()
        }
    }
}

fn build_fact_prompt(document_text: &str, query: &str) -> String {
    format!(
        r#"You are an AI Insights Assistant.
Your task is to extract specific facts from the provided text based on the user's query.
The user's query specifies the facts to extract (comma-separated list). For example, if the query is "Revenue, EPS, CEO Name", extract these three items.
Respond ONLY with a valid JSON object. The keys of the JSON object should be the fact names requested in the query, and the values should be the extracted information (string, number, or boolean).
If a fact cannot be found in the text, use "N/A" or null as its value. Do not add any explanatory text, comments, or markdown formatting outside the JSON object.

User Query for facts: "{query}"

Document Text:
"""
{document_text}
"""

Valid JSON Output:"#
    )
}

fn build_query_prompt(document_text: &str, query: &str) -> String {
    format!(
        r#"You are an AI Insights Assistant.
Based on the provided document text, answer the following query comprehensively but concisely.
Focus on providing actionable insights where possible.

User Query: "{query}"

Document Text:
"""
{document_text}
"""

Analysis:"#
    )
}

fn build_summary_prompt(document_text: &str, query: &str) -> String {
    let focus = if query.is_empty() {
        "Provide a general summary.".to_string()
    } else {
        format!(
            "The user has provided a specific focus for this summary: \"{query}\". Please tailor your summary accordingly."
        )
    };

    format!(
        r#"You are an AI Insights Assistant.
Summarize the key actionable insights from the following document text.
The summary should be concise and highlight the most important information.
{focus}

Document Text:
"""
{document_text}
"""

Summary:"#
    )
}

fn build_web_prompt(document_text: &str, query: &str) -> String {
    let context = if document_text.is_empty() {
        String::new()
    } else {
        format!(
            "Additional Context Provided by User (use if relevant):\n\"\"\"\n{document_text}\n\"\"\""
        )
    };

    format!(
        r#"You are an AI Insights Assistant.
Answer the following query using your knowledge and information from Google Search.
Provide a concise and actionable insight. If available, cite your sources based on the search results.

User Query: "{query}"
{context}

Analysis (citing sources if applicable from search results):"#
    )
}

fn build_thematic_prompt(document_text: &str, query: &str) -> String {
    let guidance = if query.is_empty() {
        String::new()
    } else {
        format!(
            "User Guidance for themes (optional): \"{query}\". Consider this guidance when identifying themes and relationships."
        )
    };

    format!(
        r#"You are an AI Insights Assistant.
Your task is to perform a thematic content analysis on the provided document text.
1.  Identify the top 5-10 key themes, topics, or prominent concepts discussed.
2.  For each identified theme, estimate its prominence (e.g., a numerical score from 1-10 or frequency count).
3.  Identify significant relationships *between these identified themes* as found *within the document*.
4.  For each relationship, provide a strength score (a number between 0.0 and 1.0, where 1.0 is a very strong relationship). Only include relationships with a strength of 0.5 or higher.

Respond ONLY with a valid JSON object containing two top-level keys: "themes" and "relationships".
-   The "themes" key should have an object as its value, where each key is a theme name (string) and its value is the prominence score (number).
-   The "relationships" key should have an array as its value. Each element in the array should be an object with three keys: "source" (theme name string), "target" (theme name string), and "strength" (numerical strength score between 0.0 and 1.0).

Example JSON output structure:
{{
  "themes": {{
    "Market Volatility": 8,
    "Interest Rates": 9,
    "Tech Sector Growth": 7
  }},
  "relationships": [
    {{ "source": "Market Volatility", "target": "Interest Rates", "strength": 0.8 }},
    {{ "source": "Interest Rates", "target": "Tech Sector Growth", "strength": 0.6 }}
  ]
}}

Do not add any explanatory text, comments, or markdown formatting outside this JSON object.
{guidance}

Document Text:
"""
{document_text}
"""

Valid JSON Output:"#
    )
}
