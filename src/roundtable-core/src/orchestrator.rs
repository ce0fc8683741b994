//! Discussion orchestration logic.
//!
//! Drives a session from topic capture through the open turn loop to the
//! lead's closing summary. Front ends either hand the orchestrator a
//! [`SpeechInput`] and call [`DiscussionOrchestrator::run`], or drive it one
//! step at a time with [`DiscussionOrchestrator::advance`].

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analyzer::{PerformanceAnalyzer, PerformanceReport};
use crate::config::{Config, DiscussionSettings};
use crate::error::DiscussionError;
use crate::persona::{Persona, PersonaRegistry};
use crate::responder::LanguageResponder;
use crate::sanitize::Sanitizer;
use crate::selector::TurnSelector;
use crate::speech::{SpeechInput, SpeechRenderer};
use crate::transcript::{Transcript, Turn};

const TOPIC_PROMPT: &str = "To begin, please state the topic for the discussion:";
const TURN_PROMPT: &str = "Your turn to speak (or say 'quit' to end):";

/// One discussion instance. Owned and mutated only by the orchestrator.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    topic: String,
    transcript: Transcript,
    last_speaker: String,
    last_persona: Option<String>,
    human_utterances: Vec<String>,
    ended: bool,
}

impl Session {
    fn new(topic: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic,
            transcript: Transcript::new(),
            last_speaker: String::new(),
            last_persona: None,
            human_utterances: Vec::new(),
            ended: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Most recent speaker, persona or human.
    pub fn last_speaker(&self) -> &str {
        &self.last_speaker
    }

    /// Most recent persona to speak; never chosen for the next turn.
    pub fn last_persona(&self) -> Option<&str> {
        self.last_persona.as_deref()
    }

    pub fn human_utterances(&self) -> &[String] {
        &self.human_utterances
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

/// A persona line as it was spoken.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub speaker: String,
    pub text: String,
    /// Rendered audio; `None` when rendering failed or produced nothing.
    pub audio: Option<Vec<u8>>,
}

/// End of a discussion: the lead's summary and, if the human spoke, the
/// performance report.
#[derive(Debug, Clone)]
pub struct Closing {
    pub summary: Utterance,
    pub report: Option<PerformanceReport>,
}

/// Result of one loop iteration.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    Continue {
        /// The human input that was recorded, if any.
        human: Option<String>,
        reply: Utterance,
    },
    Terminated(Closing),
}

/// Callback for discussion events.
pub type DiscussionCallback = Box<dyn Fn(DiscussionEvent) + Send + Sync>;

/// Events emitted during a discussion.
#[derive(Debug, Clone)]
pub enum DiscussionEvent {
    TopicSet { topic: String },
    /// A persona is about to speak.
    SpeakerStart { name: String },
    /// A persona has spoken.
    Utterance {
        name: String,
        content: String,
        audio: Option<Vec<u8>>,
        closing: bool,
    },
    HumanTurn { name: String, content: String },
    /// The input collaborator returned nothing; the team continues.
    NoInput,
    TerminationRequested { phrase: String },
    DiscussionEnd { report: Option<PerformanceReport> },
}

/// Orchestrates a group discussion between the human and the personas.
pub struct DiscussionOrchestrator {
    settings: DiscussionSettings,
    registry: PersonaRegistry,
    responder: Arc<dyn LanguageResponder>,
    renderer: Arc<dyn SpeechRenderer>,
    selector: TurnSelector,
    sanitizer: Sanitizer,
    analyzer: Option<PerformanceAnalyzer>,
    callback: Option<DiscussionCallback>,
}

impl DiscussionOrchestrator {
    /// Create a new orchestrator with the given configuration.
    pub fn new(
        config: &Config,
        responder: Arc<dyn LanguageResponder>,
        renderer: Arc<dyn SpeechRenderer>,
    ) -> Result<Self, DiscussionError> {
        let registry = PersonaRegistry::from_config(config)?;

        let mut labels: Vec<&str> = registry.roster();
        labels.push(&config.discussion.moderator_label);
        let sanitizer = Sanitizer::new(&labels)?;

        Ok(Self {
            settings: config.discussion.clone(),
            registry,
            responder,
            renderer,
            selector: TurnSelector::default(),
            sanitizer,
            analyzer: None,
            callback: None,
        })
    }

    pub fn with_selector(mut self, selector: TurnSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_analyzer(mut self, analyzer: PerformanceAnalyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Set a callback for discussion events.
    pub fn with_callback(mut self, callback: DiscussionCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn registry(&self) -> &PersonaRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &DiscussionSettings {
        &self.settings
    }

    /// Capture a topic from the input collaborator and kick off.
    pub async fn start(&self, input: &dyn SpeechInput) -> Result<(Session, Utterance), DiscussionError> {
        let topic = match input
            .capture(Some(TOPIC_PROMPT), self.settings.listen_timeout())
            .await
        {
            Ok(topic) => topic,
            Err(e) => {
                warn!("Topic capture failed: {e}");
                None
            }
        };
        self.open(topic).await
    }

    /// Init and Kickoff: announce the topic and let the lead open.
    pub async fn open(&self, topic: Option<String>) -> Result<(Session, Utterance), DiscussionError> {
        let topic = topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(DiscussionError::NoTopicProvided)?;

        let mut session = Session::new(topic.clone());
        info!(session = %session.id, topic = %topic, "Discussion started");
        self.emit_event(DiscussionEvent::TopicSet {
            topic: topic.clone(),
        });

        let moderator = &self.settings.moderator_label;
        session
            .transcript
            .append(Turn::moderator(moderator, format!("The topic is: '{}'.", topic)))?;
        session
            .transcript
            .append(Turn::moderator(moderator, self.settings.kickoff_cue(&topic)))?;

        let lead = self.registry.lead()?;
        let opening = self.speak(&mut session, lead, false).await?;
        Ok((session, opening))
    }

    /// The termination phrase contained in `text`, if any. Matching is a
    /// case-insensitive substring test.
    pub fn termination_phrase(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.settings
            .termination_phrases
            .iter()
            .find(|phrase| lowered.contains(&phrase.to_lowercase()))
            .map(String::as_str)
    }

    /// One loop iteration: record the human's input (if any), then let the
    /// next persona respond. A termination phrase concludes the session.
    pub async fn advance(
        &self,
        session: &mut Session,
        human_input: Option<String>,
    ) -> Result<TurnOutcome, DiscussionError> {
        if session.ended {
            return Err(DiscussionError::SessionEnded);
        }

        let human = human_input
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        match &human {
            Some(text) => {
                if let Some(phrase) = self.termination_phrase(text) {
                    info!(session = %session.id, phrase, "Termination phrase recognized");
                    self.emit_event(DiscussionEvent::TerminationRequested {
                        phrase: phrase.to_string(),
                    });
                    return Ok(TurnOutcome::Terminated(self.conclude(session).await?));
                }

                let label = &self.settings.human_label;
                session.transcript.append(Turn::human(label, text))?;
                session.human_utterances.push(text.clone());
                session.last_speaker = label.clone();
                self.emit_event(DiscussionEvent::HumanTurn {
                    name: label.clone(),
                    content: text.clone(),
                });
            }
            None => {
                debug!(session = %session.id, "No human input, the team continues");
                self.emit_event(DiscussionEvent::NoInput);
            }
        }

        let roster = self.registry.roster();
        let excluded = session
            .last_persona
            .as_deref()
            .unwrap_or(&self.settings.human_label);
        let next = self.selector.next(&roster, excluded)?;
        debug!(session = %session.id, next, excluded, "Selected next speaker");

        let persona = self.registry.get(next)?;
        let reply = self.speak(session, persona, false).await?;
        Ok(TurnOutcome::Continue { human, reply })
    }

    /// Terminate: the lead summarizes, then the human's turns are analyzed.
    pub async fn conclude(&self, session: &mut Session) -> Result<Closing, DiscussionError> {
        if session.ended {
            return Err(DiscussionError::SessionEnded);
        }

        session.transcript.append(Turn::moderator(
            &self.settings.moderator_label,
            &self.settings.summary_prompt,
        ))?;

        let lead = self.registry.lead()?;
        let summary = self.speak(session, lead, true).await?;
        session.ended = true;

        let report = match (&self.analyzer, session.human_utterances.is_empty()) {
            (Some(analyzer), false) => analyzer.analyze(&session.human_utterances).await,
            _ => None,
        };

        info!(
            session = %session.id,
            turns = session.transcript.len(),
            interventions = session.human_utterances.len(),
            "Discussion concluded"
        );
        self.emit_event(DiscussionEvent::DiscussionEnd {
            report: report.clone(),
        });

        Ok(Closing { summary, report })
    }

    /// Run the turn loop against an input collaborator until a termination
    /// phrase is heard. Input failures are returned with the session left
    /// intact, so calling `run` again resumes the loop.
    pub async fn run(
        &self,
        session: &mut Session,
        input: &dyn SpeechInput,
    ) -> Result<Closing, DiscussionError> {
        loop {
            let heard = input
                .capture(Some(TURN_PROMPT), self.settings.listen_timeout())
                .await?;

            if let TurnOutcome::Terminated(closing) = self.advance(session, heard).await? {
                return Ok(closing);
            }
        }
    }

    /// Ask the responder for `persona`'s line, clean it, record it, and
    /// render it. Responder and renderer failures are absorbed here.
    async fn speak(
        &self,
        session: &mut Session,
        persona: &Persona,
        closing: bool,
    ) -> Result<Utterance, DiscussionError> {
        self.emit_event(DiscussionEvent::SpeakerStart {
            name: persona.name.clone(),
        });

        let context = session.transcript.context();
        let raw = match self
            .responder
            .respond(&context, &persona.prompt_template)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(persona = %persona.name, "Responder failed, using fallback: {e}");
                self.settings.fallback_line.clone()
            }
        };

        let mut text = self.sanitizer.clean(&raw);
        if text.is_empty() {
            warn!(persona = %persona.name, "Response was empty after cleanup, using fallback");
            text = self.settings.fallback_line.clone();
        }

        session.transcript.append(Turn::persona(&persona.name, &text))?;
        session.last_speaker = persona.name.clone();
        session.last_persona = Some(persona.name.clone());

        let audio = match self.renderer.render(&text, &persona.voice_id).await {
            Ok(audio) if !audio.is_empty() => Some(audio),
            Ok(_) => None,
            Err(e) => {
                warn!(persona = %persona.name, "Speech rendering skipped: {e}");
                None
            }
        };

        self.emit_event(DiscussionEvent::Utterance {
            name: persona.name.clone(),
            content: text.clone(),
            audio: audio.clone(),
            closing,
        });

        Ok(Utterance {
            speaker: persona.name.clone(),
            text,
            audio,
        })
    }

    /// Emit an event if a callback is registered.
    fn emit_event(&self, event: DiscussionEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::selector::{RandomSource, SeededRandom};
    use crate::sentiment::LexiconSentiment;
    use crate::transcript::{ContextLine, TurnRole};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Echoes the persona name back with label noise the sanitizer must
    /// remove, and records every context it was given.
    #[derive(Default)]
    struct ScriptedResponder {
        contexts: Mutex<Vec<Vec<ContextLine>>>,
    }

    #[async_trait]
    impl LanguageResponder for ScriptedResponder {
        async fn respond(
            &self,
            context: &[ContextLine],
            persona_prompt: &str,
        ) -> Result<String, DiscussionError> {
            self.contexts.lock().unwrap().push(context.to_vec());
            let name = persona_prompt
                .trim_start_matches("You are ")
                .split(|c: char| !c.is_alphanumeric())
                .next()
                .unwrap_or("Someone");
            Ok(format!("{name}: **Point** number {}", context.len()))
        }
    }

    struct FailingResponder;

    #[async_trait]
    impl LanguageResponder for FailingResponder {
        async fn respond(&self, _: &[ContextLine], _: &str) -> Result<String, DiscussionError> {
            Err(DiscussionError::ResponderFailed("503 Service Unavailable".to_string()))
        }
    }

    struct ToneRenderer;

    #[async_trait]
    impl SpeechRenderer for ToneRenderer {
        async fn render(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, DiscussionError> {
            Ok(format!("{voice_id}:{}", text.len()).into_bytes())
        }
    }

    struct BrokenRenderer;

    #[async_trait]
    impl SpeechRenderer for BrokenRenderer {
        async fn render(&self, _: &str, _: &str) -> Result<Vec<u8>, DiscussionError> {
            Err(DiscussionError::RenderFailed("no output device".to_string()))
        }
    }

    /// Replays scripted captures; `Err` entries simulate device failures.
    struct ScriptedInput {
        lines: Mutex<VecDeque<Result<Option<String>, DiscussionError>>>,
    }

    impl ScriptedInput {
        fn new(lines: Vec<Result<Option<&str>, DiscussionError>>) -> Self {
            Self {
                lines: Mutex::new(
                    lines
                        .into_iter()
                        .map(|l| l.map(|o| o.map(str::to_string)))
                        .collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl SpeechInput for ScriptedInput {
        async fn capture(
            &self,
            _prompt: Option<&str>,
            _timeout: Duration,
        ) -> Result<Option<String>, DiscussionError> {
            self.lines.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }
    }

    struct First;

    impl RandomSource for First {
        fn index(&self, _upper: usize) -> usize {
            0
        }
    }

    fn orchestrator(responder: Arc<dyn LanguageResponder>) -> DiscussionOrchestrator {
        DiscussionOrchestrator::new(&default_config(), responder, Arc::new(ToneRenderer))
            .unwrap()
            .with_analyzer(PerformanceAnalyzer::new(Arc::new(LexiconSentiment::new())))
    }

    #[tokio::test]
    async fn test_open_requires_topic() {
        let orch = orchestrator(Arc::new(ScriptedResponder::default()));
        assert!(matches!(orch.open(None).await, Err(DiscussionError::NoTopicProvided)));
        assert!(matches!(
            orch.open(Some("   ".to_string())).await,
            Err(DiscussionError::NoTopicProvided)
        ));
    }

    #[tokio::test]
    async fn test_start_without_captured_topic_fails() {
        let orch = orchestrator(Arc::new(ScriptedResponder::default()));
        let input = ScriptedInput::new(vec![Ok(None)]);
        assert!(matches!(orch.start(&input).await, Err(DiscussionError::NoTopicProvided)));

        let input = ScriptedInput::new(vec![Err(DiscussionError::Collaborator("mic".into()))]);
        assert!(matches!(orch.start(&input).await, Err(DiscussionError::NoTopicProvided)));
    }

    #[tokio::test]
    async fn test_kickoff_lead_opens() {
        let responder = Arc::new(ScriptedResponder::default());
        let orch = orchestrator(responder.clone());
        let (session, opening) = orch.open(Some(" Remote work ".to_string())).await.unwrap();

        assert_eq!(session.topic(), "Remote work");
        assert_eq!(opening.speaker, "Ava");
        assert_eq!(opening.text, "Point number 2");
        assert_eq!(opening.audio.as_deref(), Some("af_sky:14".as_bytes()));
        assert_eq!(session.last_speaker(), "Ava");
        assert_eq!(session.last_persona(), Some("Ava"));

        let turns = session.transcript().snapshot();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].content, "The topic is: 'Remote work'.");
        assert_eq!(turns[0].role, TurnRole::Moderator);
        assert_eq!(turns[2].role, TurnRole::Persona);

        let contexts = responder.contexts.lock().unwrap();
        assert_eq!(
            contexts[0][0].rendered(),
            "[Moderator]: The topic is: 'Remote work'."
        );
    }

    #[tokio::test]
    async fn test_after_kickoff_human_turn_never_picks_lead() {
        for seed in 0..25 {
            let orch = orchestrator(Arc::new(ScriptedResponder::default()))
                .with_selector(TurnSelector::new(SeededRandom::new(seed)));
            let (mut session, _) = orch.open(Some("Remote work".to_string())).await.unwrap();

            let outcome = orch
                .advance(&mut session, Some("I enjoy working from home.".to_string()))
                .await
                .unwrap();
            let TurnOutcome::Continue { human, reply } = outcome else {
                panic!("discussion should continue");
            };
            assert_eq!(human.as_deref(), Some("I enjoy working from home."));
            assert!(["Milo", "Ray", "Nova"].contains(&reply.speaker.as_str()));
        }
    }

    #[tokio::test]
    async fn test_human_turn_is_recorded() {
        let orch = orchestrator(Arc::new(ScriptedResponder::default()))
            .with_selector(TurnSelector::new(First));
        let (mut session, _) = orch.open(Some("Remote work".to_string())).await.unwrap();
        orch.advance(&mut session, Some("Commutes waste time.".to_string()))
            .await
            .unwrap();

        let turns = session.transcript().snapshot();
        assert_eq!(turns[3], Turn::human("Participant", "Commutes waste time."));
        assert_eq!(turns[4].speaker_name, "Milo");
        assert_eq!(session.human_utterances(), ["Commutes waste time."]);
        assert_eq!(session.last_speaker(), "Milo");
    }

    #[tokio::test]
    async fn test_no_input_lets_team_continue() {
        let orch = orchestrator(Arc::new(ScriptedResponder::default()));
        let (mut session, _) = orch.open(Some("Remote work".to_string())).await.unwrap();

        let mut last = session.last_persona().map(str::to_string);
        for _ in 0..10 {
            let TurnOutcome::Continue { human, reply } =
                orch.advance(&mut session, None).await.unwrap()
            else {
                panic!("discussion should continue");
            };
            assert!(human.is_none());
            assert_ne!(Some(reply.speaker.clone()), last);
            last = Some(reply.speaker);
        }
        assert!(session.human_utterances().is_empty());
        assert_eq!(session.transcript().len(), 13);
    }

    #[tokio::test]
    async fn test_failing_responder_uses_fallback() {
        let orch = orchestrator(Arc::new(FailingResponder));
        let (mut session, opening) = orch.open(Some("Remote work".to_string())).await.unwrap();
        assert_eq!(opening.text, orch.settings().fallback_line);

        let outcome = orch
            .advance(&mut session, Some("Hello?".to_string()))
            .await
            .unwrap();
        let TurnOutcome::Continue { reply, .. } = outcome else {
            panic!("discussion should continue");
        };
        assert!(!reply.text.is_empty());
        assert_eq!(reply.text, orch.settings().fallback_line);
        assert!(!session.is_ended());
        assert_eq!(session.transcript().len(), 5);
    }

    #[test]
    fn test_blank_fallback_or_phrase_is_rejected_up_front() {
        let mut config = default_config();
        config.discussion.fallback_line = String::new();
        let built = DiscussionOrchestrator::new(
            &config,
            Arc::new(FailingResponder),
            Arc::new(ToneRenderer),
        );
        assert!(matches!(built, Err(DiscussionError::ConfigError(_))));

        let mut config = default_config();
        config.discussion.termination_phrases.push(String::new());
        let built = DiscussionOrchestrator::new(
            &config,
            Arc::new(ScriptedResponder::default()),
            Arc::new(ToneRenderer),
        );
        assert!(matches!(built, Err(DiscussionError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_render_failure_is_skipped() {
        let orch = DiscussionOrchestrator::new(
            &default_config(),
            Arc::new(ScriptedResponder::default()),
            Arc::new(BrokenRenderer),
        )
        .unwrap();
        let (mut session, opening) = orch.open(Some("Remote work".to_string())).await.unwrap();
        assert!(opening.audio.is_none());

        assert!(orch.advance(&mut session, None).await.is_ok());
        assert_eq!(session.transcript().len(), 4);
    }

    #[tokio::test]
    async fn test_termination_phrase_concludes() {
        let orch = orchestrator(Arc::new(ScriptedResponder::default()));
        let (mut session, _) = orch.open(Some("Remote work".to_string())).await.unwrap();
        orch.advance(&mut session, Some("This is good.".to_string()))
            .await
            .unwrap();

        let outcome = orch
            .advance(&mut session, Some("please stop".to_string()))
            .await
            .unwrap();
        let TurnOutcome::Terminated(closing) = outcome else {
            panic!("discussion should terminate");
        };

        assert!(session.is_ended());
        assert_eq!(closing.summary.speaker, "Ava");
        let report = closing.report.unwrap();
        assert_eq!(report.interventions, 1);
        assert_eq!(report.words, 4);

        // the termination utterance itself is not recorded
        assert!(
            !session
                .transcript()
                .turns()
                .iter()
                .any(|t| t.content.contains("please stop"))
        );

        assert!(matches!(
            orch.advance(&mut session, None).await,
            Err(DiscussionError::SessionEnded)
        ));
        assert!(matches!(
            orch.conclude(&mut session).await,
            Err(DiscussionError::SessionEnded)
        ));
    }

    #[tokio::test]
    async fn test_termination_matches_substring_case_insensitive() {
        let orch = orchestrator(Arc::new(ScriptedResponder::default()));
        assert_eq!(orch.termination_phrase("please STOP"), Some("stop"));
        assert_eq!(orch.termination_phrase("Let's End Discussion now"), Some("end discussion"));
        assert_eq!(orch.termination_phrase("Milo said the word stop"), Some("stop"));
        assert_eq!(orch.termination_phrase("I disagree with Ray"), None);
    }

    #[tokio::test]
    async fn test_conclude_without_human_has_no_report() {
        let orch = orchestrator(Arc::new(ScriptedResponder::default()));
        let (mut session, _) = orch.open(Some("Remote work".to_string())).await.unwrap();
        let closing = orch.conclude(&mut session).await.unwrap();
        assert!(closing.report.is_none());
        assert!(session.is_ended());

        let turns = session.transcript().snapshot();
        assert_eq!(turns[3].role, TurnRole::Moderator);
        assert_eq!(turns[4].speaker_name, "Ava");
    }

    #[tokio::test]
    async fn test_run_until_quit() {
        let orch = orchestrator(Arc::new(ScriptedResponder::default()));
        let (mut session, _) = orch.open(Some("Remote work".to_string())).await.unwrap();
        let input = ScriptedInput::new(vec![
            Ok(Some("This is good.")),
            Ok(None),
            Ok(Some("This is bad.")),
            Ok(Some("OK, quit.")),
        ]);

        let closing = orch.run(&mut session, &input).await.unwrap();
        let report = closing.report.unwrap();
        assert_eq!(report.interventions, 2);
        assert_eq!(report.words, 8);
        // 3 kickoff + (human, persona) + persona + (human, persona) + cue + summary
        assert_eq!(session.transcript().len(), 3 + 2 + 1 + 2 + 2);
    }

    #[tokio::test]
    async fn test_run_input_failure_is_resumable() {
        let orch = orchestrator(Arc::new(ScriptedResponder::default()));
        let (mut session, _) = orch.open(Some("Remote work".to_string())).await.unwrap();
        let input = ScriptedInput::new(vec![
            Ok(Some("Commutes are long.")),
            Err(DiscussionError::Collaborator("microphone unplugged".into())),
            Ok(Some("exit")),
        ]);

        let err = orch.run(&mut session, &input).await.unwrap_err();
        assert!(!err.is_fatal());
        assert!(!session.is_ended());
        assert_eq!(session.transcript().len(), 5);

        let closing = orch.run(&mut session, &input).await.unwrap();
        assert_eq!(closing.report.unwrap().interventions, 1);
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let orch = orchestrator(Arc::new(ScriptedResponder::default())).with_callback(Box::new(
            move |event| {
                let tag = match event {
                    DiscussionEvent::TopicSet { .. } => "topic",
                    DiscussionEvent::SpeakerStart { .. } => "start",
                    DiscussionEvent::Utterance { closing: false, .. } => "utterance",
                    DiscussionEvent::Utterance { closing: true, .. } => "summary",
                    DiscussionEvent::HumanTurn { .. } => "human",
                    DiscussionEvent::NoInput => "silence",
                    DiscussionEvent::TerminationRequested { .. } => "terminate",
                    DiscussionEvent::DiscussionEnd { .. } => "end",
                };
                sink.lock().unwrap().push(tag);
            },
        ));

        let (mut session, _) = orch.open(Some("Remote work".to_string())).await.unwrap();
        orch.advance(&mut session, None).await.unwrap();
        orch.advance(&mut session, Some("stop".to_string())).await.unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "topic", "start", "utterance", "silence", "start", "utterance", "terminate",
                "start", "summary", "end"
            ]
        );
    }
}
