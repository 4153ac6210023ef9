//! Round phase and per-channel verdict types.

/// A round's position in the layered channel pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LsccPhase {
    /// No round in flight.
    Idle,
    /// Phase A: channels are being formed.
    Forming,
    /// Phase B: channels are collecting per-member signatures over the
    /// batch's Merkle root.
    Validating,
    /// Phase C: cross-layer edges are being scored.
    Syncing,
    /// Phase D: the weighted commit score is being computed.
    Scoring,
    /// The round committed a block.
    Committed,
    /// The round aborted; its transactions return to `pending`.
    Aborted,
}

impl LsccPhase {
    /// Stable name used in `ConsensusState::phase` and error payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            LsccPhase::Idle => "idle",
            LsccPhase::Forming => "forming",
            LsccPhase::Validating => "validating",
            LsccPhase::Syncing => "syncing",
            LsccPhase::Scoring => "scoring",
            LsccPhase::Committed => "committed",
            LsccPhase::Aborted => "aborted",
        }
    }
}

/// A single channel's Phase B outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelVerdict {
    /// A strict majority of the channel's members signed the batch root.
    Approved,
    /// Quorum was not reached before the phase deadline, or a minority
    /// signed. Conservative default when a channel's deadline is missed.
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_names_are_stable() {
        assert_eq!(LsccPhase::Forming.as_str(), "forming");
        assert_eq!(LsccPhase::Aborted.as_str(), "aborted");
    }
}
