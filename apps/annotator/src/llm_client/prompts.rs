// Shared prompt fragments. Each annotation task keeps its own templates in
// annotation/prompts.rs; this file only holds cross-cutting instructions.

/// Appended to every single-score prompt.
pub const SCORE_ONLY_INSTRUCTION: &str = "\
    Provide only the score as an integer. \
    Do not include any explanations or other information. \
    Do NOT wrap the answer in ``` or add any extra characters.";

/// Appended to every tabular prompt.
pub const CSV_ONLY_INSTRUCTION: &str = "\
    Format the response as CSV. \
    Do not include any explanations or other information. \
    Each prediction must be exactly one of the options provided. \
    You MUST provide exactly one row for every name.";
