use causex_core::{Key, Response, ResponsePair, Screen};
use tracing::trace;

#[derive(Copy, Debug, Clone, PartialEq, Eq)]
enum Stage {
    T1,
    T2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorOutcome {
    /// Key did not change anything
    Ignored,
    /// First target recorded; now asking for the second
    AwaitingT2,
    Complete(ResponsePair),
}

/// Captures the one or two keyed answers of a single trial.
///
/// Each stage takes exactly one key: a letter or the unknown key. Once the
/// pair is complete the collector stays closed until `begin` is called for
/// the next trial.
#[derive(Debug, Clone, Default)]
pub struct ResponseCollector {
    stage: Option<Stage>,
    response1: Option<Response>,
    echo: Option<char>,
    taken: bool,
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the response window and returns the screen to show.
    pub fn begin(&mut self, num_targets: u8) -> Screen {
        *self = Self::default();
        if num_targets > 1 {
            self.stage = Some(Stage::T1);
            Screen::AskingT1
        } else {
            self.stage = Some(Stage::T2);
            Screen::AskingT2
        }
    }

    pub fn accept(&mut self, key: Key) -> CollectorOutcome {
        if self.taken {
            trace!(?key, "response already taken, ignoring key");
            return CollectorOutcome::Ignored;
        }
        let Some(stage) = self.stage else {
            return CollectorOutcome::Ignored;
        };
        let Some(response) = key.as_response() else {
            trace!(?key, "not a response key");
            return CollectorOutcome::Ignored;
        };
        match stage {
            Stage::T1 => {
                // T2 starts with an empty buffer
                self.echo = None;
                self.response1 = Some(response);
                self.stage = Some(Stage::T2);
                CollectorOutcome::AwaitingT2
            }
            Stage::T2 => {
                self.echo = response.letter();
                self.taken = true;
                self.stage = None;
                CollectorOutcome::Complete(ResponsePair {
                    response1: self.response1,
                    response2: response,
                })
            }
        }
    }

    /// Letter currently shown in the input buffer
    pub fn echo(&self) -> Option<char> {
        self.echo
    }

    pub fn is_taken(&self) -> bool {
        self.taken
    }

    pub fn is_open(&self) -> bool {
        self.stage.is_some() && !self.taken
    }

    /// Drops buffered input; the taken flag survives until the next `begin`.
    pub fn clear_input(&mut self) {
        self.echo = None;
        self.response1 = None;
        self.stage = None;
    }
}
