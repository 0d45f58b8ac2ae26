//! Conversion state machine.

use std::fmt;
use std::str::FromStr;

/// Where one constraint conversion stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConversionState {
    #[default]
    Idle,
    Converting,
    Accepted,
    Rejected,
    Failed,
}

impl ConversionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Converting => "converting",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConversionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionState {
    type Err = ConversionStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "converting" => Ok(Self::Converting),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "failed" => Ok(Self::Failed),
            other => Err(ConversionStateParseError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversionStateParseError(pub String);

impl fmt::Display for ConversionStateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid conversion state: {:?}", self.0)
    }
}

impl std::error::Error for ConversionStateParseError {}

/// The conversion state graph:
///
/// ```text
/// idle       -> converting
/// converting -> accepted
/// converting -> rejected
/// converting -> failed
/// failed     -> converting  (retry)
/// ```
pub struct ConversionStateMachine;

impl ConversionStateMachine {
    pub fn is_valid_transition(from: ConversionState, to: ConversionState) -> bool {
        use ConversionState::*;
        matches!(
            (from, to),
            (Idle, Converting)
                | (Converting, Accepted)
                | (Converting, Rejected)
                | (Converting, Failed)
                | (Failed, Converting)
        )
    }
}

/// The path one conversion took through the state graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionTrace {
    states: Vec<ConversionState>,
}

impl ConversionTrace {
    pub fn new() -> Self {
        Self {
            states: vec![ConversionState::Idle],
        }
    }

    pub fn current(&self) -> ConversionState {
        self.states
            .last()
            .copied()
            .unwrap_or(ConversionState::Idle)
    }

    pub fn states(&self) -> &[ConversionState] {
        &self.states
    }

    /// Record a move to `to`. Returns `false` and records nothing if the edge
    /// is not in the graph.
    pub(crate) fn advance(&mut self, to: ConversionState) -> bool {
        if !ConversionStateMachine::is_valid_transition(self.current(), to) {
            return false;
        }
        self.states.push(to);
        true
    }
}

impl Default for ConversionTrace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::ConversionState::*;
    use super::*;

    const ALL: [ConversionState; 5] = [Idle, Converting, Accepted, Rejected, Failed];

    #[test]
    fn valid_transitions_accepted() {
        let valid = [
            (Idle, Converting),
            (Converting, Accepted),
            (Converting, Rejected),
            (Converting, Failed),
            (Failed, Converting),
        ];
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    ConversionStateMachine::is_valid_transition(from, to),
                    valid.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for to in ALL {
            assert!(!ConversionStateMachine::is_valid_transition(Accepted, to));
            assert!(!ConversionStateMachine::is_valid_transition(Rejected, to));
        }
    }

    #[test]
    fn trace_refuses_invalid_edges() {
        let mut trace = ConversionTrace::new();
        assert!(!trace.advance(Accepted));
        assert!(trace.advance(Converting));
        assert!(trace.advance(Failed));
        assert!(trace.advance(Converting));
        assert!(trace.advance(Accepted));
        assert!(!trace.advance(Converting));
        assert_eq!(trace.states(), &[Idle, Converting, Failed, Converting, Accepted]);
    }

    #[test]
    fn display_round_trips() {
        for state in ALL {
            assert_eq!(state.to_string().parse::<ConversionState>().unwrap(), state);
        }
        assert!("done".parse::<ConversionState>().is_err());
    }
}
