use serde::{Deserialize, Serialize};

/// Session segment a trial belongs to
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Training,
    Main,
}

impl Phase {
    pub fn is_training(&self) -> bool {
        matches!(self, Phase::Training)
    }

    /// Screen that displays this phase's trials
    pub fn trial_screen(&self) -> Screen {
        match self {
            Phase::Training => Screen::Training,
            Phase::Main => Screen::Main,
        }
    }
}

/// Every screen the participant can be looking at
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Instructions,
    Training,
    TrainingComplete,
    Main,
    BlockComplete,
    Break,
    AskingT1,
    AskingT2,
    End,
}

impl Screen {
    /// Screens where the moving objects are driven by the tick
    pub fn is_trial_display(&self) -> bool {
        matches!(self, Screen::Training | Screen::Main)
    }

    pub fn is_asking(&self) -> bool {
        matches!(self, Screen::AskingT1 | Screen::AskingT2)
    }

    /// Static screens that wait for the advance key
    pub fn awaits_advance(&self) -> bool {
        matches!(
            self,
            Screen::Instructions | Screen::TrainingComplete | Screen::BlockComplete
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Screen::End)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Screen::Instructions => "Instructions",
            Screen::Training => "Training",
            Screen::TrainingComplete => "Training Complete",
            Screen::Main => "Main",
            Screen::BlockComplete => "Block Complete",
            Screen::Break => "Break",
            Screen::AskingT1 => "Asking T1",
            Screen::AskingT2 => "Asking T2",
            Screen::End => "Experiment Complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_screen_follows_phase() {
        assert_eq!(Phase::Training.trial_screen(), Screen::Training);
        assert_eq!(Phase::Main.trial_screen(), Screen::Main);
    }

    #[test]
    fn screen_classification() {
        assert!(Screen::Main.is_trial_display());
        assert!(!Screen::AskingT2.is_trial_display());
        assert!(Screen::AskingT1.is_asking());
        assert!(Screen::BlockComplete.awaits_advance());
        assert!(!Screen::Break.awaits_advance());
        assert!(Screen::End.is_terminal());
    }
}
