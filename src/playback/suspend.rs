//! How playback halts when the user pauses or the page loses visibility.
//!
//! Some synthesizers (notably on mobile browsers) drop a paused utterance
//! silently, so they are cancelled instead and the chunk is spoken again from
//! the recorded offset on resume.

use crate::config::SuspendStrategyKind;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

static RE_MOBILE_AGENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)android|iphone|ipad|ipod|mobile").unwrap());

/// What a suspension does to the in-flight utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspension {
    /// The synthesizer holds the utterance and continues it on resume.
    PausedInPlace,
    /// The utterance is cancelled; resume speaks the chunk again.
    Cancelled,
}

pub trait SuspendStrategy {
    fn kind(&self) -> SuspendStrategyKind;
    fn suspension(&self) -> Suspension;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TruePause;

impl SuspendStrategy for TruePause {
    fn kind(&self) -> SuspendStrategyKind {
        SuspendStrategyKind::TruePause
    }

    fn suspension(&self) -> Suspension {
        Suspension::PausedInPlace
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CancelAndRestart;

impl SuspendStrategy for CancelAndRestart {
    fn kind(&self) -> SuspendStrategyKind {
        SuspendStrategyKind::CancelAndRestart
    }

    fn suspension(&self) -> Suspension {
        Suspension::Cancelled
    }
}

/// Pick the strategy once at startup. `Auto` inspects the user agent string.
pub fn resolve(kind: SuspendStrategyKind, user_agent: &str) -> Box<dyn SuspendStrategy> {
    let strategy: Box<dyn SuspendStrategy> = match kind {
        SuspendStrategyKind::TruePause => Box::new(TruePause),
        SuspendStrategyKind::CancelAndRestart => Box::new(CancelAndRestart),
        SuspendStrategyKind::Auto if RE_MOBILE_AGENT.is_match(user_agent) => {
            Box::new(CancelAndRestart)
        }
        SuspendStrategyKind::Auto => Box::new(TruePause),
    };
    info!(requested = %kind, resolved = %strategy.kind(), "Selected suspend strategy");
    strategy
}
