use causex_core::TextScreen;

pub const PROMPT_T1: &str = "What was the FIRST target letter? (SPACE = unknown)";
pub const PROMPT_T2: &str = "What was the SECOND target letter? (SPACE = unknown)";
pub const PROMPT_SINGLE: &str = "What was the target letter? (SPACE = unknown)";
pub const PROMPT_FOOTER: &str = "Get ready for the next trial.";

pub fn instructions(participant_name: Option<&str>, training_trials: usize) -> TextScreen {
    let welcome = match participant_name {
        Some(name) => format!("Welcome, {name}!"),
        None => "Welcome!".to_string(),
    };
    TextScreen::new([
        welcome,
        String::new(),
        "Hello! Thank you for participating.".into(),
        String::new(),
        "You will see two objects moving on a circular path.".into(),
        "Each object displays a rapidly changing digit.".into(),
        String::new(),
        "One or two times in the trial, a letter will appear briefly on one or both objects."
            .into(),
        "These are your target letters.".into(),
        String::new(),
        "Your task is to identify the letter(s) and type them in the order you saw them.".into(),
        String::new(),
        "If you are unsure, try your best. If you don't know, press SPACE.".into(),
        String::new(),
        format!("Let's start with {training_trials} practice trials. Press SPACE to begin."),
    ])
}

pub fn training_complete() -> TextScreen {
    TextScreen::new(["Great job! Now, on to the actual experiment. Press SPACE to start."])
}

pub fn block_complete(block: usize) -> TextScreen {
    TextScreen::new([format!(
        "Block {block} complete. Press SPACE to start next block."
    )])
}

pub fn take_break(break_every: usize) -> TextScreen {
    TextScreen::new([
        format!("You have completed {break_every} trials in this block."),
        "Take a short break if needed. Press any key to resume.".into(),
    ])
}

pub fn end() -> TextScreen {
    TextScreen::new([
        "The experiment is over. Thank you for participating!",
        "",
        "Your data will be anonymized and stored in compliance",
        "with the UK General Data Protection Regulation.",
        "",
        "Press ENTER to save your results, ESC to quit.",
        "",
        "Have a great day!",
    ])
}
