use causex_core::{
    BlockLabel, ConfigError, ExperimentError, Key, ObjectTrace, Phase, ResponsePair, ResultRecord,
    Scene, Screen, StimulusAdapter, StimulusFactory, StimulusSpec, StimulusState, TrialCondition,
    BLUE, GREEN,
};
use causex_timing::Timer;
use tracing::{debug, error, info, trace};

use crate::blocks::{BlockConfig, ExperimentPlan};
use crate::config::ExperimentConfig;
use crate::response::{CollectorOutcome, ResponseCollector};
use crate::results::ResultsLog;
use crate::screens;
use crate::trial::Trial;

/// Things that happened while handling a tick or a key
#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentEvent {
    ScreenChanged { from: Screen, to: Screen },
    TrialStarted { block: BlockLabel, trial: usize, total: usize },
    ResponseWindowOpened { num_targets: u8 },
    TrialRecorded { block: BlockLabel, trial: usize },
    Aborted(String),
}

/// The session: screens, trial/block bookkeeping, response capture and
/// the results log.
///
/// Two handlers drive it, `update` once per frame and `handle_key` per key
/// press. Neither blocks; waiting for a trial to finish is just repeated
/// `update` calls comparing the timer against the trial's start.
pub struct ExperimentStateMachine<F, T>
where
    F: StimulusFactory,
    T: Timer<Timestamp = u64>,
{
    pub timer: T,
    pub config: ExperimentConfig,
    screen: Screen,
    phase: Phase,
    plan: ExperimentPlan,
    factory: F,
    participant_id: String,
    participant_name: Option<String>,
    /// 1-based once the main phase starts
    block: usize,
    trial_index: usize,
    current: Option<Trial<F::Stimulus, u64>>,
    collector: ResponseCollector,
    results: ResultsLog,
    failure: Option<ExperimentError>,
}

impl<F, T> ExperimentStateMachine<F, T>
where
    F: StimulusFactory,
    T: Timer<Timestamp = u64>,
{
    /// Fails if `config` does not pass [`ExperimentConfig::validate`].
    pub fn new(
        config: ExperimentConfig,
        plan: ExperimentPlan,
        factory: F,
        timer: T,
        participant_id: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            timer,
            config,
            screen: Screen::Instructions,
            phase: Phase::Training,
            plan,
            factory,
            participant_id: participant_id.into(),
            participant_name: None,
            block: 0,
            trial_index: 0,
            current: None,
            collector: ResponseCollector::new(),
            results: ResultsLog::new(),
            failure: None,
        })
    }

    pub fn with_participant_name(mut self, name: impl Into<String>) -> Self {
        self.participant_name = Some(name.into());
        self
    }

    /// Per-frame tick
    pub fn update(&mut self) -> Vec<ExperimentEvent> {
        let mut events = Vec::new();
        if self.screen.is_trial_display() {
            self.update_trial(&mut events);
        }
        events
    }

    pub fn handle_key(&mut self, key: Key) -> Vec<ExperimentEvent> {
        let mut events = Vec::new();
        match self.screen {
            screen if screen.awaits_advance() && key.is_advance() => {
                self.advance_from(screen, &mut events)
            }
            Screen::Break => {
                debug!("resuming from break");
                self.set_screen(Screen::Main, &mut events);
            }
            Screen::AskingT1 | Screen::AskingT2 => self.handle_response(key, &mut events),
            screen => trace!(?key, ?screen, "key ignored"),
        }
        events
    }

    fn advance_from(&mut self, screen: Screen, events: &mut Vec<ExperimentEvent>) {
        match screen {
            Screen::Instructions => {
                self.phase = Phase::Training;
                self.block = 0;
                info!(trials = self.plan.training().len(), "starting training phase");
            }
            Screen::TrainingComplete => {
                self.phase = Phase::Main;
                self.block = 1;
                info!(order = ?self.plan.block_order(), "starting main phase");
            }
            Screen::BlockComplete => {
                self.block += 1;
                info!(block = self.block, "starting next block");
            }
            _ => return,
        }
        self.trial_index = 0;
        self.current = None;
        self.set_screen(self.phase.trial_screen(), events);
    }

    fn update_trial(&mut self, events: &mut Vec<ExperimentEvent>) {
        let total = self.current_trials().len();
        if self.trial_index >= total {
            self.current = None;
            let next = match self.phase {
                Phase::Training => Screen::TrainingComplete,
                Phase::Main if self.block < self.plan.blocks().len() => Screen::BlockComplete,
                Phase::Main => Screen::End,
            };
            if next == Screen::End {
                info!(records = self.results.len(), "experiment complete");
            }
            self.set_screen(next, events);
            return;
        }

        if self.current.is_none() {
            if let Err(e) = self.start_trial(events) {
                self.abort(e, events);
                return;
            }
        }

        let grace = self.config.post_display_grace_ms;
        let Some(trial) = self.current.as_mut() else {
            return;
        };
        let elapsed_ms = self.timer.elapsed(trial.start).as_millis() as u64;
        if let Err(source) = trial.stimulus.update(elapsed_ms) {
            self.abort(ExperimentError::TickUpdate { elapsed_ms, source }, events);
            return;
        }

        if elapsed_ms > trial.display_end_ms(grace)
            && trial.stimulus.state() == StimulusState::Running
        {
            trial.stimulus.begin_asking();
            let num_targets = trial.stimulus.num_targets();
            let screen = self.collector.begin(num_targets);
            debug!(elapsed_ms, num_targets, "response window opened");
            events.push(ExperimentEvent::ResponseWindowOpened { num_targets });
            self.set_screen(screen, events);
        }
    }

    fn start_trial(&mut self, events: &mut Vec<ExperimentEvent>) -> Result<(), ExperimentError> {
        let index = self.trial_index;
        let total = self.current_trials().len();
        let condition: TrialCondition = self.current_trials()[index];
        let (o1_color, o2_color, num_targets) = match self.phase {
            Phase::Training => (GREEN, BLUE, 2),
            Phase::Main => self
                .plan
                .block(self.block)
                .map(|b| (b.o1_color, b.o2_color, b.num_targets))
                .unwrap_or((GREEN, BLUE, 2)),
        };
        let spec = StimulusSpec {
            o1: ObjectTrace::new(o1_color, "X"),
            o2: ObjectTrace::new(o2_color, "Y"),
            condition,
            participant_id: self.participant_id.clone(),
            is_training: self.phase.is_training(),
            num_targets,
        };
        let stimulus = self
            .factory
            .build(&spec)
            .map_err(|source| ExperimentError::StimulusInitialization {
                trial: index + 1,
                source,
            })?;

        self.current = Some(Trial {
            index,
            condition,
            stimulus,
            start: self.timer.now(),
        });
        self.collector = ResponseCollector::new();

        let block = self.block_label();
        debug!(
            %block,
            trial = index + 1,
            total,
            collision = %condition.collision_type(),
            lag_ms = condition.lag_ms(),
            burst = condition.burst(),
            "trial started"
        );
        events.push(ExperimentEvent::TrialStarted {
            block,
            trial: index + 1,
            total,
        });
        Ok(())
    }

    fn handle_response(&mut self, key: Key, events: &mut Vec<ExperimentEvent>) {
        let asking = self
            .current
            .as_ref()
            .is_some_and(|t| t.stimulus.state() == StimulusState::Asking);
        if !asking || !self.collector.is_open() {
            trace!(?key, asking, taken = self.collector.is_taken(), "ignoring key");
            return;
        }
        match self.collector.accept(key) {
            CollectorOutcome::Ignored => {}
            CollectorOutcome::AwaitingT2 => self.set_screen(Screen::AskingT2, events),
            CollectorOutcome::Complete(pair) => self.finish_trial(pair, events),
        }
    }

    fn finish_trial(&mut self, pair: ResponsePair, events: &mut Vec<ExperimentEvent>) {
        let Some(mut trial) = self.current.take() else {
            return;
        };
        if let Err(source) = trial.stimulus.submit_response(&pair) {
            let trial = trial.index + 1;
            self.abort(ExperimentError::ResponseSubmission { trial, source }, events);
            return;
        }

        let record = self.build_record(&trial, &pair);
        debug!(
            trial = record.trial,
            block = %record.block,
            score = ?record.score,
            "trial recorded"
        );
        events.push(ExperimentEvent::TrialRecorded {
            block: record.block,
            trial: record.trial,
        });
        self.results.push(record);
        self.collector.clear_input();
        self.trial_index += 1;

        self.set_screen(self.phase.trial_screen(), events);
        if self.phase == Phase::Main
            && self.trial_index > 0
            && self.trial_index % self.config.break_every == 0
        {
            info!(trials = self.trial_index, block = self.block, "break");
            self.set_screen(Screen::Break, events);
        }
    }

    fn build_record(&self, trial: &Trial<F::Stimulus, u64>, pair: &ResponsePair) -> ResultRecord {
        let snapshot = trial.stimulus.results();
        let condition = trial.condition;
        ResultRecord {
            participant_id: self.participant_id.clone(),
            trial: trial.index + 1,
            block: self.block_label(),
            collision_type: condition.collision_type(),
            which_changes: condition.which_changes(),
            lag_ms: condition.lag_ms(),
            o1_start: snapshot.o1_start,
            o2_start: snapshot.o2_start,
            score: snapshot.score,
            t1_value: snapshot.t1_value,
            t2_value: snapshot.t2_value,
            t1_object: snapshot.t1_object,
            t2_object: snapshot.t2_object,
            t1_response: pair.response1,
            t2_response: Some(pair.response2),
            attention_prompt: snapshot.attention_prompt,
            is_training: self.phase.is_training(),
            burst: condition.burst(),
            num_targets: trial.stimulus.num_targets(),
        }
    }

    /// Fails closed: the session ends, collected results stay exportable.
    fn abort(&mut self, err: ExperimentError, events: &mut Vec<ExperimentEvent>) {
        error!(error = %err, records = self.results.len(), "aborting experiment");
        self.current = None;
        self.collector.clear_input();
        events.push(ExperimentEvent::Aborted(err.to_string()));
        self.failure = Some(err);
        self.set_screen(Screen::End, events);
    }

    fn set_screen(&mut self, to: Screen, events: &mut Vec<ExperimentEvent>) {
        let from = self.screen;
        if from == to {
            return;
        }
        self.screen = to;
        debug!(from = from.label(), to = to.label(), "screen changed");
        events.push(ExperimentEvent::ScreenChanged { from, to });
    }

    fn current_trials(&self) -> &[TrialCondition] {
        match self.phase {
            Phase::Training => self.plan.training(),
            Phase::Main => self
                .plan
                .block(self.block)
                .map(BlockConfig::trials)
                .unwrap_or_default(),
        }
    }

    fn block_label(&self) -> BlockLabel {
        match self.phase {
            Phase::Training => BlockLabel::Training,
            Phase::Main => BlockLabel::Block(self.block),
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 1-based block number, 0 before the main phase
    pub fn block(&self) -> usize {
        self.block
    }

    pub fn trial_index(&self) -> usize {
        self.trial_index
    }

    pub fn plan(&self) -> &ExperimentPlan {
        &self.plan
    }

    pub fn results(&self) -> &ResultsLog {
        &self.results
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn current_stimulus(&self) -> Option<&F::Stimulus> {
        self.current.as_ref().map(|t| &t.stimulus)
    }

    /// The error that ended the session early, if any
    pub fn failure(&self) -> Option<&ExperimentError> {
        self.failure.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.screen.is_terminal()
    }

    /// (current, total), both 1-based, while a trial is on screen
    pub fn trial_progress(&self) -> Option<(usize, usize)> {
        if !(self.screen.is_trial_display() || self.screen.is_asking()) {
            return None;
        }
        let total = self.current_trials().len();
        Some(((self.trial_index + 1).min(total), total))
    }

    pub fn status_line(&self) -> String {
        match self.trial_progress() {
            Some((current, total)) => {
                let label = match self.phase {
                    Phase::Training => "Training".to_string(),
                    Phase::Main => format!("Block {}", self.block),
                };
                format!("{label} Trial {current}/{total}")
            }
            None => self.screen.label().to_string(),
        }
    }

    pub fn scene(&self) -> Scene {
        match self.screen {
            Screen::Instructions => Scene::Text(screens::instructions(
                self.participant_name.as_deref(),
                self.plan.training().len(),
            )),
            Screen::TrainingComplete => Scene::Text(screens::training_complete()),
            Screen::BlockComplete => Scene::Text(screens::block_complete(self.block)),
            Screen::Break => Scene::Text(screens::take_break(self.config.break_every)),
            Screen::End => Scene::Text(screens::end()),
            Screen::Training | Screen::Main => match &self.current {
                Some(trial) => {
                    let elapsed_ms = self.timer.elapsed(trial.start).as_millis() as u64;
                    if elapsed_ms > trial.display_end_ms(self.config.post_display_grace_ms) {
                        return Scene::Blank;
                    }
                    let o1 = trial.stimulus.o1().clone();
                    let burst_at = trial
                        .stimulus
                        .burst()
                        .filter(|b| b.is_active(elapsed_ms))
                        .map(|_| (o1.x, o1.y));
                    Scene::Objects {
                        o1,
                        o2: trial.stimulus.o2().clone(),
                        burst_at,
                    }
                }
                None => Scene::Blank,
            },
            Screen::AskingT1 => Scene::Prompt {
                prompt: screens::PROMPT_T1,
                echo: self.collector.echo().map(String::from),
                footer: None,
            },
            Screen::AskingT2 => {
                let two = self.current.as_ref().is_some_and(|t| t.wants_two_targets());
                Scene::Prompt {
                    prompt: if two {
                        screens::PROMPT_T2
                    } else {
                        screens::PROMPT_SINGLE
                    },
                    echo: self.collector.echo().map(String::from),
                    footer: Some(screens::PROMPT_FOOTER),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit::OrbitFactory;
    use causex_core::{
        CollisionType, ObjectId, Response, StimulusError, StimulusResults, WhichChanges,
    };
    use causex_timing::ManualTimer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;
    use std::rc::Rc;

    const DISPLAY_END_MS: u64 = 1000 + 100 + 1000;

    struct Scripted {
        o1: ObjectTrace,
        o2: ObjectTrace,
        num_targets: u8,
        state: StimulusState,
        scored: bool,
        fail_update_at: Option<u64>,
        submissions: Rc<Cell<u32>>,
    }

    impl StimulusAdapter for Scripted {
        fn update(&mut self, elapsed_ms: u64) -> Result<(), StimulusError> {
            match self.fail_update_at {
                Some(at) if elapsed_ms >= at => Err(StimulusError::Corrupted("scripted".into())),
                _ => Ok(()),
            }
        }
        fn state(&self) -> StimulusState {
            self.state
        }
        fn begin_asking(&mut self) {
            self.state = StimulusState::Asking;
        }
        fn submit_response(&mut self, _: &ResponsePair) -> Result<(), StimulusError> {
            self.submissions.set(self.submissions.get() + 1);
            if self.scored {
                return Err(StimulusError::AlreadySubmitted);
            }
            self.scored = true;
            Ok(())
        }
        fn results(&self) -> StimulusResults {
            let two = self.num_targets > 1;
            StimulusResults {
                o1_start: Some(0),
                o2_start: Some(8),
                score: self.scored.then_some(0),
                t1_value: two.then_some('A'),
                t2_value: Some('B'),
                t1_object: two.then_some(ObjectId::O1),
                t2_object: Some(ObjectId::O2),
                ..Default::default()
            }
        }
        fn t2_time(&self) -> u64 {
            1000
        }
        fn change_duration(&self) -> u64 {
            100
        }
        fn burst(&self) -> Option<causex_core::BurstWindow> {
            None
        }
        fn o1(&self) -> &ObjectTrace {
            &self.o1
        }
        fn o2(&self) -> &ObjectTrace {
            &self.o2
        }
        fn num_targets(&self) -> u8 {
            self.num_targets
        }
    }

    #[derive(Default)]
    struct ScriptedFactory {
        built: usize,
        fail_build_at: Option<usize>,
        fail_update_at: Option<u64>,
        submissions: Rc<Cell<u32>>,
    }

    impl StimulusFactory for ScriptedFactory {
        type Stimulus = Scripted;

        fn build(&mut self, spec: &StimulusSpec) -> Result<Scripted, StimulusError> {
            self.built += 1;
            if self.fail_build_at == Some(self.built) {
                return Err(StimulusError::InvalidCondition("scripted".into()));
            }
            Ok(Scripted {
                o1: spec.o1.clone(),
                o2: spec.o2.clone(),
                num_targets: spec.num_targets,
                state: StimulusState::Running,
                scored: false,
                fail_update_at: self.fail_update_at,
                submissions: Rc::clone(&self.submissions),
            })
        }
    }

    type ScriptedMachine = ExperimentStateMachine<ScriptedFactory, ManualTimer>;

    fn cond() -> TrialCondition {
        TrialCondition::new(CollisionType::FakeCausal, 300, false)
    }

    fn plan(training: usize, per_block: usize) -> ExperimentPlan {
        ExperimentPlan::new(
            vec![cond(); training],
            (1..=4)
                .map(|c| BlockConfig::new(c, vec![cond(); per_block]))
                .collect(),
        )
    }

    fn scripted(plan: ExperimentPlan, factory: ScriptedFactory) -> ScriptedMachine {
        ExperimentStateMachine::new(
            ExperimentConfig::default(),
            plan,
            factory,
            ManualTimer::new(),
            "p-test",
        )
        .unwrap()
    }

    /// Ticks until the response window opens, then presses `keys`.
    fn run_trial<F: StimulusFactory>(
        sm: &mut ExperimentStateMachine<F, ManualTimer>,
        keys: &[Key],
    ) {
        for _ in 0..2000 {
            sm.update();
            if sm.screen().is_asking() {
                break;
            }
            sm.timer.advance_ms(31);
        }
        assert!(sm.screen().is_asking(), "never reached a prompt: {:?}", sm.screen());
        for key in keys {
            sm.handle_key(*key);
        }
    }

    #[test]
    fn single_forced_training_trial_with_unknown_answers() {
        let training = vec![TrialCondition::new(CollisionType::Overtaking, 300, false)];
        let plan = ExperimentPlan::new(
            training,
            (1..=4).map(|c| BlockConfig::new(c, vec![cond()])).collect(),
        );
        let factory = OrbitFactory::new(StdRng::seed_from_u64(7));
        let mut sm = ExperimentStateMachine::new(
            ExperimentConfig::default(),
            plan,
            factory,
            ManualTimer::new(),
            "p-1",
        )
        .unwrap();

        sm.handle_key(Key::Space);
        assert_eq!(sm.screen(), Screen::Training);
        run_trial(&mut sm, &[Key::Space, Key::Space]);

        let records = sm.results().records();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.t1_response.map(|x| x.as_export()), Some(String::new()));
        assert_eq!(r.t2_response.map(|x| x.as_export()), Some(String::new()));
        assert!(r.is_training);
        assert_eq!(r.lag_ms, 300);
        assert_eq!(r.which_changes, WhichChanges::O1Twice);
        assert_eq!(r.block, BlockLabel::Training);
        assert_eq!(r.trial, 1);

        sm.update();
        assert_eq!(sm.screen(), Screen::TrainingComplete);
    }

    #[test]
    fn full_training_then_main() {
        let config = ExperimentConfig::default();
        let mut rng = StdRng::seed_from_u64(99);
        let plan = ExperimentPlan::generate(&config, &mut rng);
        let mut sm = ExperimentStateMachine::new(
            config,
            plan,
            OrbitFactory::new(rng),
            ManualTimer::new(),
            "p-2",
        )
        .unwrap();

        sm.handle_key(Key::Space);
        for _ in 0..20 {
            run_trial(&mut sm, &[Key::Char('a'), Key::Space]);
        }
        assert_eq!(sm.results().len(), 20);
        sm.update();
        assert_eq!(sm.screen(), Screen::TrainingComplete);

        sm.handle_key(Key::Space);
        assert_eq!(sm.screen(), Screen::Main);
        assert_eq!(sm.block(), 1);
        assert_eq!(sm.trial_index(), 0);
        assert_eq!(sm.phase(), Phase::Main);
    }

    #[test]
    fn objects_stay_up_until_grace_period_ends() {
        let mut sm = scripted(plan(1, 1), ScriptedFactory::default());
        sm.handle_key(Key::Space);
        sm.update();
        sm.timer.advance_ms(DISPLAY_END_MS);
        sm.update();
        assert_eq!(sm.screen(), Screen::Training);
        assert!(matches!(sm.scene(), Scene::Objects { .. }));
        sm.timer.advance_ms(1);
        sm.update();
        assert_eq!(sm.screen(), Screen::AskingT1);
        assert_eq!(
            sm.current_stimulus().map(|s| s.state()),
            Some(StimulusState::Asking)
        );
    }

    #[test]
    fn one_target_blocks_skip_t1() {
        let plan = ExperimentPlan::new(
            vec![cond()],
            vec![
                BlockConfig::new(3, vec![cond()]),
                BlockConfig::new(4, vec![cond()]),
                BlockConfig::new(1, vec![cond()]),
                BlockConfig::new(2, vec![cond()]),
            ],
        );
        let mut sm = scripted(plan, ScriptedFactory::default());
        sm.handle_key(Key::Space);
        run_trial(&mut sm, &[Key::Space, Key::Space]);
        sm.update();
        sm.handle_key(Key::Space);

        let mut seen = Vec::new();
        for _ in 0..200 {
            sm.update();
            seen.push(sm.screen());
            if sm.screen().is_asking() {
                break;
            }
            sm.timer.advance_ms(31);
        }
        assert!(!seen.contains(&Screen::AskingT1));
        assert_eq!(sm.screen(), Screen::AskingT2);
        assert!(matches!(
            sm.scene(),
            Scene::Prompt { prompt: screens::PROMPT_SINGLE, .. }
        ));

        sm.handle_key(Key::Char('q'));
        let r = sm.results().records().last().unwrap();
        assert_eq!(r.num_targets, 1);
        assert_eq!(r.t1_response, None);
        assert_eq!(r.t1_value, None);
        assert_eq!(r.t1_object, None);
        assert_eq!(r.t2_response, Some(Response::Letter('Q')));
    }

    #[test]
    fn every_fiftieth_main_trial_breaks() {
        let mut sm = scripted(plan(1, 120), ScriptedFactory::default());
        sm.handle_key(Key::Space);
        run_trial(&mut sm, &[Key::Space, Key::Space]);
        sm.update();
        sm.handle_key(Key::Space);

        let mut breaks = Vec::new();
        for _ in 0..120 {
            run_trial(&mut sm, &[Key::Char('x'), Key::Char('y')]);
            if sm.screen() == Screen::Break {
                breaks.push(sm.trial_index());
                sm.handle_key(Key::Char('r'));
                assert_eq!(sm.screen(), Screen::Main);
            }
        }
        assert_eq!(breaks, vec![50, 100]);
        assert_eq!(sm.block(), 1);
        sm.update();
        assert_eq!(sm.screen(), Screen::BlockComplete);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let zero_break = ExperimentConfig {
            break_every: 0,
            ..Default::default()
        };
        let err = ExperimentStateMachine::new(
            zero_break,
            plan(1, 1),
            ScriptedFactory::default(),
            ManualTimer::new(),
            "p",
        )
        .err();
        assert!(matches!(
            err,
            Some(ConfigError::Invalid { field: "break_every", .. })
        ));

        let bad_burst = ExperimentConfig {
            burst_probability: 1.5,
            ..Default::default()
        };
        assert!(ExperimentStateMachine::new(
            bad_burst,
            plan(1, 1),
            ScriptedFactory::default(),
            ManualTimer::new(),
            "p",
        )
        .is_err());
    }

    #[test]
    fn training_never_breaks() {
        let config = ExperimentConfig {
            break_every: 2,
            ..Default::default()
        };
        let mut sm = ExperimentStateMachine::new(
            config,
            plan(6, 1),
            ScriptedFactory::default(),
            ManualTimer::new(),
            "p",
        )
        .unwrap();
        sm.handle_key(Key::Space);
        for _ in 0..6 {
            run_trial(&mut sm, &[Key::Space, Key::Space]);
            assert_ne!(sm.screen(), Screen::Break);
        }
        sm.update();
        assert_eq!(sm.screen(), Screen::TrainingComplete);
    }

    #[test]
    fn responses_are_taken_once() {
        let factory = ScriptedFactory::default();
        let submissions = Rc::clone(&factory.submissions);
        let mut sm = scripted(plan(2, 1), factory);
        sm.handle_key(Key::Space);
        run_trial(
            &mut sm,
            &[Key::Char('a'), Key::Char('b'), Key::Char('c'), Key::Space],
        );
        assert_eq!(sm.results().len(), 1);
        assert_eq!(submissions.get(), 1);
        assert_eq!(sm.screen(), Screen::Training);
        assert_eq!(sm.trial_index(), 1);

        let r = &sm.results().records()[0];
        assert_eq!(r.t1_response, Some(Response::Letter('A')));
        assert_eq!(r.t2_response, Some(Response::Letter('B')));
    }

    #[test]
    fn invalid_keys_do_not_advance_prompts() {
        let mut sm = scripted(plan(1, 1), ScriptedFactory::default());
        sm.handle_key(Key::Space);
        run_trial(&mut sm, &[Key::Char('3'), Key::Enter, Key::Other]);
        assert_eq!(sm.screen(), Screen::AskingT1);
        sm.handle_key(Key::Char('z'));
        assert_eq!(sm.screen(), Screen::AskingT2);
        assert!(matches!(
            sm.scene(),
            Scene::Prompt { prompt: screens::PROMPT_T2, echo: None, .. }
        ));
    }

    #[test]
    fn blocks_run_in_order_then_end() {
        let mut sm = scripted(plan(1, 1), ScriptedFactory::default());
        sm.handle_key(Key::Space);
        run_trial(&mut sm, &[Key::Space, Key::Space]);
        sm.update();
        sm.handle_key(Key::Space);

        for block in 1..=4 {
            assert_eq!(sm.block(), block);
            run_trial(&mut sm, &[Key::Space, Key::Space]);
            sm.update();
            if block < 4 {
                assert_eq!(sm.screen(), Screen::BlockComplete);
                assert_eq!(sm.status_line(), "Block Complete");
                sm.handle_key(Key::Space);
                assert_eq!(sm.trial_index(), 0);
            }
        }
        assert_eq!(sm.screen(), Screen::End);
        assert!(sm.is_finished());
        assert_eq!(sm.results().len(), 5);
        let labels: Vec<BlockLabel> = sm.results().records().iter().map(|r| r.block).collect();
        assert_eq!(
            labels,
            vec![
                BlockLabel::Training,
                BlockLabel::Block(1),
                BlockLabel::Block(2),
                BlockLabel::Block(3),
                BlockLabel::Block(4)
            ]
        );
    }

    #[test]
    fn end_ignores_keys() {
        let mut sm = scripted(plan(1, 1), ScriptedFactory::default());
        sm.handle_key(Key::Space);
        sm.abort(
            ExperimentError::TickUpdate {
                elapsed_ms: 0,
                source: StimulusError::Corrupted("test".into()),
            },
            &mut Vec::new(),
        );
        for key in [Key::Space, Key::Char('a'), Key::Enter] {
            assert!(sm.handle_key(key).is_empty());
        }
        assert!(sm.update().is_empty());
        assert_eq!(sm.screen(), Screen::End);
    }

    #[test]
    fn failed_stimulus_construction_ends_session() {
        let factory = ScriptedFactory {
            fail_build_at: Some(2),
            ..Default::default()
        };
        let mut sm = scripted(plan(3, 1), factory);
        sm.handle_key(Key::Space);
        run_trial(&mut sm, &[Key::Space, Key::Space]);
        let events = sm.update();
        assert_eq!(sm.screen(), Screen::End);
        assert!(events.iter().any(|e| matches!(e, ExperimentEvent::Aborted(_))));
        assert!(matches!(
            sm.failure(),
            Some(ExperimentError::StimulusInitialization { trial: 2, .. })
        ));
        assert_eq!(sm.results().len(), 1);
        assert!(sm.current_stimulus().is_none());
    }

    #[test]
    fn failed_tick_update_ends_session() {
        let factory = ScriptedFactory {
            fail_update_at: Some(500),
            ..Default::default()
        };
        let mut sm = scripted(plan(3, 1), factory);
        sm.handle_key(Key::Space);
        sm.update();
        assert_eq!(sm.screen(), Screen::Training);
        sm.timer.advance_ms(600);
        sm.update();
        assert_eq!(sm.screen(), Screen::End);
        assert!(matches!(
            sm.failure(),
            Some(ExperimentError::TickUpdate { elapsed_ms: 600, .. })
        ));
    }

    #[test]
    fn status_line_tracks_progress() {
        let mut sm = scripted(plan(3, 2), ScriptedFactory::default());
        assert_eq!(sm.status_line(), "Instructions");
        sm.handle_key(Key::Space);
        sm.update();
        assert_eq!(sm.status_line(), "Training Trial 1/3");
        run_trial(&mut sm, &[Key::Space, Key::Space]);
        assert_eq!(sm.status_line(), "Training Trial 2/3");
        run_trial(&mut sm, &[Key::Space]);
        assert_eq!(sm.status_line(), "Training Trial 2/3");
        sm.handle_key(Key::Space);
        run_trial(&mut sm, &[Key::Space, Key::Space]);
        sm.update();
        assert_eq!(sm.status_line(), "Training Complete");
        sm.handle_key(Key::Space);
        sm.update();
        assert_eq!(sm.status_line(), "Block 1 Trial 1/2");
    }

    #[test]
    fn space_during_display_is_ignored() {
        let mut sm = scripted(plan(2, 1), ScriptedFactory::default());
        sm.handle_key(Key::Space);
        sm.update();
        assert!(sm.handle_key(Key::Space).is_empty());
        assert_eq!(sm.screen(), Screen::Training);
        assert_eq!(sm.trial_index(), 0);
    }

    #[test]
    fn instructions_greet_by_name() {
        let sm = scripted(plan(1, 1), ScriptedFactory::default()).with_participant_name("Ada");
        let Scene::Text(text) = sm.scene() else {
            panic!("instructions should be text");
        };
        assert_eq!(text.lines[0], "Welcome, Ada!");
    }
}
