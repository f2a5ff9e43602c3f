use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BreathPhase {
    Inhale,
    Hold,
    Exhale,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PhaseStep {
    pub phase: BreathPhase,
    pub seconds: u32,
    pub instruction: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BreathingPattern {
    pub name: &'static str,
    pub description: &'static str,
    pub phases: &'static [PhaseStep],
    pub cycle_seconds: u32,
}

const FOUR_SEVEN_EIGHT: &[PhaseStep] = &[
    PhaseStep { phase: BreathPhase::Inhale, seconds: 4, instruction: "Breathe in" },
    PhaseStep { phase: BreathPhase::Hold, seconds: 7, instruction: "Hold" },
    PhaseStep { phase: BreathPhase::Exhale, seconds: 8, instruction: "Breathe out" },
];

pub fn pattern() -> BreathingPattern {
    BreathingPattern {
        name: "4-7-8 Breathing",
        description: "A calming breath pattern to reduce anxiety and help you relax.",
        phases: FOUR_SEVEN_EIGHT,
        cycle_seconds: cycle_seconds(),
    }
}

fn cycle_seconds() -> u32 {
    FOUR_SEVEN_EIGHT.iter().map(|p| p.seconds).sum()
}

/// Where a timer started at zero is after `elapsed` seconds.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PhaseTick {
    pub phase: BreathPhase,
    pub remaining: u32,
    pub cycle: u64,
}

pub fn phase_at(elapsed: u64) -> PhaseTick {
    let cycle_len = cycle_seconds() as u64;
    let cycle = elapsed / cycle_len;
    let mut offset = (elapsed % cycle_len) as u32;

    for step in FOUR_SEVEN_EIGHT {
        if offset < step.seconds {
            return PhaseTick { phase: step.phase, remaining: step.seconds - offset, cycle };
        }
        offset -= step.seconds;
    }
    // offset < cycle_len, so the loop always returns
    PhaseTick { phase: BreathPhase::Inhale, remaining: FOUR_SEVEN_EIGHT[0].seconds, cycle: cycle + 1 }
}
