//! Prompt templates for the matching and chat features. Placeholders are
//! `{name}` tokens filled with `str::replace`.

pub const MATCH_ANALYSIS_SYSTEM: &str = "You are an experienced technical recruiter and career \
advisor. You analyze how well a candidate matches a job and give concrete, actionable advice. \
Respond with valid JSON only — no prose outside the JSON object.";

pub const MATCH_ANALYSIS_PROMPT: &str = r#"Analyze the match between a candidate and a job.

Job description:
{job_description}

Candidate skills: {candidate_skills}
Deterministic skill match score: {score}%

Return a JSON object with exactly these fields:
{
  "summary": "two or three sentences on the overall match",
  "strengths": ["skills or angles the candidate should lead with"],
  "improvements": ["specific gaps to close, most important first"],
  "interview_tips": ["concrete preparation tips for this role"]
}"#;

pub const CAREER_CHAT_SYSTEM: &str = "You are a practical career assistant. Answer questions \
about résumés, job applications, and interview preparation. When a résumé is provided, ground \
your answer in its actual content. Be direct and specific; avoid generic advice.";

pub const SKILL_RECOMMENDATIONS_SYSTEM: &str = "You are a career development advisor. Given a \
candidate's current skills and a target role, recommend a concrete upskilling plan. Respond \
with valid JSON only — no prose outside the JSON object.";

pub const SKILL_RECOMMENDATIONS_PROMPT: &str = r#"Recommend skills for career advancement.

Current skills: {current_skills}
Target role: {target_role}

Return a JSON object with exactly these fields:
{
  "missing_skills": ["skills to acquire for the target role, most important first"],
  "priority": "High, Medium, or Low urgency of upskilling",
  "learning_path": "suggested order and approach",
  "time_to_acquire": "realistic overall estimate",
  "resources": ["specific courses, books, or platforms"],
  "market_demand": "current demand for the target role",
  "salary_impact": "expected compensation effect of closing the gaps"
}"#;

pub const MARKET_TRENDS_SYSTEM: &str = "You are a technology labor-market analyst. Assess \
current market conditions for the given skills. Respond with valid JSON only — no prose \
outside the JSON object.";

pub const MARKET_TRENDS_PROMPT: &str = r#"Analyze current market trends for these skills: {skills}

Return a JSON object with exactly these fields:
{
  "demand_trends": "how demand for these skills is moving",
  "salary_trends": "how compensation for these skills is moving",
  "opportunities": "emerging opportunities tied to these skills",
  "risks": "risk factors for these skills",
  "outlook": "overall future outlook",
  "hotspots": ["geographic or remote markets with the strongest demand"]
}"#;
