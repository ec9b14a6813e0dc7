//! Prompt rendering for generation requests.

use anyhow::Result;
use minijinja::{Environment, context};

const REFINE_TEMPLATE: &str = include_str!("prompts/refine.md");

/// Inputs for one rendered prompt.
#[derive(Debug, Clone)]
pub struct PromptInputs<'a> {
    /// Task description from the config, shared by every iteration.
    pub task: &'a str,
    /// Zero-based loop iteration.
    pub iteration: u32,
    /// Verifier feedback carried over from the previous iteration.
    pub feedback: Option<&'a str>,
}

/// Render the generation prompt for one iteration.
///
/// The feedback section is omitted entirely on the first iteration and
/// whenever the previous verdict produced nothing worth feeding back.
pub fn render_prompt(input: &PromptInputs<'_>) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("refine", REFINE_TEMPLATE)
        .expect("refine template should be valid");
    let template = env.get_template("refine")?;
    let rendered = template.render(context! {
        task => input.task.trim(),
        iteration => input.iteration,
        feedback => input.feedback.map(str::trim).filter(|s| !s.is_empty()),
    })?;
    Ok(rendered)
}
