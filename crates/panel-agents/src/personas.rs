//! System prompt constants for each expert persona on the panel.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever preamble or contract
//! text changes, so telemetry can trace which prompt produced a bundle.

use consensus::{EventContext, GenerationRequest};

/// Prompt version. Bump on any preamble or contract change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// The fixed panel of expert personas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    /// Pure numbers: pace, efficiency, rest, market-implied totals.
    Quant,
    /// Matchup and scheme reads, personnel and injury context.
    FilmAnalyst,
    /// Line movement and closing-value discipline.
    SharpBettor,
    /// Momentum, situational spots, coaching tendencies.
    Situational,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::Quant,
        Persona::FilmAnalyst,
        Persona::SharpBettor,
        Persona::Situational,
    ];

    /// Stable expert id used in bundles, weights, and telemetry.
    pub fn expert_id(self) -> &'static str {
        match self {
            Persona::Quant => "quant",
            Persona::FilmAnalyst => "film-analyst",
            Persona::SharpBettor => "sharp-bettor",
            Persona::Situational => "situational",
        }
    }

    fn preamble(self) -> &'static str {
        match self {
            Persona::Quant => {
                "You are a quantitative game forecaster. You reason strictly from \
                 pace, offensive and defensive efficiency, rest differentials, and \
                 market-implied totals. You distrust narratives and never cite \
                 momentum. When data is thin you widen your uncertainty and lower \
                 your confidences rather than guessing."
            }
            Persona::FilmAnalyst => {
                "You are a film-room analyst. You reason from matchups: scheme \
                 fits, personnel advantages, injury impact on specific units, and \
                 how each side generates its points. You state which matchup \
                 drives each number you give."
            }
            Persona::SharpBettor => {
                "You are a professional bettor. You anchor on the current market \
                 line and total, then adjust only where you have a concrete edge. \
                 Your confidences reflect how far you are willing to deviate from \
                 the closing number."
            }
            Persona::Situational => {
                "You are a situational handicapper. You weigh scheduling spots, \
                 travel, coaching tendencies in each game state, and how teams \
                 have performed in comparable circumstances this season."
            }
        }
    }
}

/// The JSON contract every persona must emit. Kept as one shared block
/// so all personas produce the identical structure.
const BUNDLE_CONTRACT: &str = r#"
Respond with ONLY a JSON object, no prose before or after, in exactly this shape:

{
  "expert_id": "<your id>",
  "event_id": "<the event id>",
  "summary": {
    "projected_winner": "home" | "away",
    "home_win_probability": <0..1>,
    "away_win_probability": <0..1>,
    "overall_confidence": <0..1>
  },
  "assertions": [
    {"category": "winner", "type": "binary", "value": <true if home wins>, "confidence": <0..1>, "stake": <number >= 0>, "evidence": ["..."]},
    {"category": "margin", "type": "numeric", "value": <home minus away>, "confidence": <0..1>, "stake": <number >= 0>, "evidence": ["..."]},
    {"category": "total_points", "type": "numeric", "value": <number>, "confidence": <0..1>, "stake": <number >= 0>, "evidence": ["..."]},
    {"category": "home_points", "type": "numeric", "value": <number>, "confidence": <0..1>, "stake": <number >= 0>, "evidence": ["..."]},
    {"category": "away_points", "type": "numeric", "value": <number>, "confidence": <0..1>, "stake": <number >= 0>, "evidence": ["..."]},
    {"category": "first_half_points", "type": "numeric", "value": <number>, "confidence": <0..1>, "stake": <number >= 0>, "evidence": ["..."]},
    {"category": "second_half_points", "type": "numeric", "value": <number>, "confidence": <0..1>, "stake": <number >= 0>, "evidence": ["..."]},
    {"category": "q1_points", "type": "numeric", "value": <number>, "confidence": <0..1>, "stake": <number >= 0>, "evidence": ["..."]},
    {"category": "q2_points", "type": "numeric", "value": <number>, "confidence": <0..1>, "stake": <number >= 0>, "evidence": ["..."]},
    {"category": "q3_points", "type": "numeric", "value": <number>, "confidence": <0..1>, "stake": <number >= 0>, "evidence": ["..."]},
    {"category": "q4_points", "type": "numeric", "value": <number>, "confidence": <0..1>, "stake": <number >= 0>, "evidence": ["..."]},
    {"category": "game_script", "type": "enumerated", "value": "wire_to_wire" | "back_and_forth" | "comeback" | "blowout", "confidence": <0..1>, "stake": <number >= 0>, "evidence": ["..."]}
  ]
}

All 12 categories are required, exactly once each, in any order. Evidence
entries should cite memory snippet ids when a snippet informed the number.
"#;

/// Full system prompt for a persona.
pub fn system_prompt(persona: Persona) -> String {
    format!(
        "{}\n\nYou forecast one game at a time as expert \"{}\".\n{}",
        persona.preamble(),
        persona.expert_id(),
        BUNDLE_CONTRACT
    )
}

/// User prompt for one generation call: event context, memory, and on
/// repair rounds the rejected draft plus its violations.
pub fn user_prompt(request: &GenerationRequest) -> String {
    let mut prompt = render_context(&request.context);

    if let Some(prior) = &request.prior {
        prompt.push_str("\n## Your previous response was rejected\n");
        if let Ok(json) = serde_json::to_string_pretty(prior) {
            prompt.push_str(&json);
            prompt.push('\n');
        }
        prompt.push_str("\n## Fix these problems and resend the full JSON object\n");
        for instruction in &request.repair_instructions {
            prompt.push_str("- ");
            prompt.push_str(instruction);
            prompt.push('\n');
        }
    }

    prompt
}

fn render_context(context: &EventContext) -> String {
    let mut out = format!(
        "## Game\nEvent id: {}\nHome: {}\nAway: {}\n",
        context.event_id, context.home_team, context.away_team
    );

    if !context.metadata.is_empty() {
        out.push_str("\n## Situation\n");
        for (key, value) in &context.metadata {
            out.push_str(&format!("- {key}: {value}\n"));
        }
    }

    if !context.memory.is_empty() {
        out.push_str("\n## Relevant history\n");
        for snippet in &context.memory {
            out.push_str(&format!("- [{}] {}\n", snippet.id, snippet.text));
        }
    }

    out
}
