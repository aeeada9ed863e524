//! Conversational turn-taking state shared by the two bridge loops.
//!
//! A call moves `Idle -> Listening` when the telephony leg starts, then
//! alternates between `Listening` and `ModelSpeaking`. The generation counter
//! is bumped on every interruption; outbound audio is tagged with the
//! generation that was current when it was produced, and the telephony writer
//! drops anything whose tag is no longer current.
//!
//! Every method takes the lock for a couple of field writes and never awaits
//! while holding it.

use std::fmt;

use parking_lot::Mutex;

/// Turn phase of a bridged call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    /// Waiting for the telephony `start` event
    #[default]
    Idle,
    /// Caller audio flows to the AI leg
    Listening,
    /// The model is producing audio for the current turn
    ModelSpeaking,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnPhase::Idle => write!(f, "idle"),
            TurnPhase::Listening => write!(f, "listening"),
            TurnPhase::ModelSpeaking => write!(f, "model_speaking"),
        }
    }
}

/// Point-in-time copy of the turn state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnSnapshot {
    pub phase: TurnPhase,
    pub generation: u64,
}

/// Outcome of [`TurnState::enter_model_turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelAudio {
    /// Generation the audio belongs to
    pub generation: u64,
    /// True when this call moved the state from `Listening` to `ModelSpeaking`
    pub turn_started: bool,
}

/// Outcome of [`TurnState::interrupt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interruption {
    /// Phase before the interruption was applied
    pub previous_phase: TurnPhase,
    /// Newly current generation
    pub generation: u64,
}

/// Mutex-guarded turn phase and generation counter.
#[derive(Debug, Default)]
pub struct TurnState {
    inner: Mutex<TurnSnapshot>,
}

impl TurnState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TurnSnapshot {
        *self.inner.lock()
    }

    pub fn phase(&self) -> TurnPhase {
        self.inner.lock().phase
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Whether audio tagged with `generation` may still be played.
    pub fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    /// `Idle -> Listening`. Returns false if the call was already started.
    pub fn start(&self) -> bool {
        let mut state = self.inner.lock();
        if state.phase == TurnPhase::Idle {
            state.phase = TurnPhase::Listening;
            true
        } else {
            false
        }
    }

    /// Record that the model produced audio.
    ///
    /// Moves `Listening -> ModelSpeaking` on the first audio of a turn and
    /// returns the generation to tag the audio with.
    pub fn enter_model_turn(&self) -> ModelAudio {
        let mut state = self.inner.lock();
        let turn_started = state.phase == TurnPhase::Listening;
        if turn_started {
            state.phase = TurnPhase::ModelSpeaking;
        }
        ModelAudio {
            generation: state.generation,
            turn_started,
        }
    }

    /// `ModelSpeaking -> Listening` on turn or generation completion.
    pub fn end_model_turn(&self) -> bool {
        let mut state = self.inner.lock();
        if state.phase == TurnPhase::ModelSpeaking {
            state.phase = TurnPhase::Listening;
            true
        } else {
            false
        }
    }

    /// Invalidate in-flight audio and return to `Listening`.
    ///
    /// The generation is bumped in every phase; audio queued after the model
    /// finished its turn is invalidated too.
    pub fn interrupt(&self) -> Interruption {
        let mut state = self.inner.lock();
        let previous_phase = state.phase;
        state.generation += 1;
        if previous_phase != TurnPhase::Idle {
            state.phase = TurnPhase::Listening;
        }
        Interruption {
            previous_phase,
            generation: state.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_initial_state() {
        let turn = TurnState::new();
        assert_eq!(
            turn.snapshot(),
            TurnSnapshot {
                phase: TurnPhase::Idle,
                generation: 0
            }
        );
    }

    #[test]
    fn test_start_only_once() {
        let turn = TurnState::new();
        assert!(turn.start());
        assert!(!turn.start());
        assert_eq!(turn.phase(), TurnPhase::Listening);
    }

    #[test]
    fn test_model_turn_cycle() {
        let turn = TurnState::new();
        turn.start();

        let first = turn.enter_model_turn();
        assert!(first.turn_started);
        assert_eq!(turn.phase(), TurnPhase::ModelSpeaking);

        let second = turn.enter_model_turn();
        assert!(!second.turn_started);
        assert_eq!(second.generation, first.generation);

        assert!(turn.end_model_turn());
        assert!(!turn.end_model_turn());
        assert_eq!(turn.phase(), TurnPhase::Listening);
    }

    #[test]
    fn test_interrupt_invalidates_generation() {
        let turn = TurnState::new();
        turn.start();
        let audio = turn.enter_model_turn();
        assert!(turn.is_current(audio.generation));

        let interruption = turn.interrupt();
        assert_eq!(interruption.previous_phase, TurnPhase::ModelSpeaking);
        assert!(interruption.generation > audio.generation);
        assert!(!turn.is_current(audio.generation));
        assert_eq!(turn.phase(), TurnPhase::Listening);
    }

    #[test]
    fn test_interrupt_while_listening_still_bumps() {
        let turn = TurnState::new();
        turn.start();
        let before = turn.generation();
        let interruption = turn.interrupt();
        assert_eq!(interruption.previous_phase, TurnPhase::Listening);
        assert_eq!(interruption.generation, before + 1);
        assert_eq!(turn.phase(), TurnPhase::Listening);
    }

    #[test]
    fn test_generation_strictly_increases_across_threads() {
        let turn = Arc::new(TurnState::new());
        turn.start();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let turn = turn.clone();
                std::thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..250 {
                        let generation = turn.interrupt().generation;
                        assert!(generation > last);
                        last = generation;
                        turn.enter_model_turn();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(turn.generation(), 1000);
    }

    #[test]
    fn test_display() {
        assert_eq!(TurnPhase::Idle.to_string(), "idle");
        assert_eq!(TurnPhase::ModelSpeaking.to_string(), "model_speaking");
    }
}
