use std::collections::VecDeque;
use std::time::Instant;

use log::debug;
use secrecy::{ExposeSecret, SecretString};

use telechat_codec::{LineAssembler, SpanParser, cp437, strip};

use crate::actions::ActionStep;
use crate::banner::BannerStep;
use crate::classifier;
use crate::event::{DisplayEvent, RoomSnapshot};
use crate::logon::{AutoLogon, LogonMessage, LogonStep};
use crate::options::ProcessorOptions;
use crate::state::SessionState;
use crate::trigger::{Trigger, TriggerEngine};

/// A line the processor wants written to the remote side.
#[derive(Debug)]
pub enum Outbound {
    Line(String),
    /// Never logged.
    Secret(SecretString),
}

impl Outbound {
    pub fn expose(&self) -> &str {
        match self {
            Outbound::Line(line) => line,
            Outbound::Secret(secret) => secret.expose_secret(),
        }
    }
}

/// Turns the inbound byte stream into [`DisplayEvent`]s.
///
/// Every complete line is offered to the banner machine first, then to the
/// action-list machine, and only then to the chat classifier. All lines are
/// rendered, so style state stays continuous even across claimed lines.
#[derive(Debug)]
pub struct StreamProcessor {
    state: SessionState,
    lines: LineAssembler,
    spans: SpanParser,
    triggers: TriggerEngine,
    logon: Option<AutoLogon>,
    username: String,
    bannerless: bool,
    action_list_command: Option<String>,
    outbound: VecDeque<Outbound>,
}

impl Default for StreamProcessor {
    fn default() -> Self {
        Self::new(ProcessorOptions::default())
    }
}

impl StreamProcessor {
    pub fn new(options: ProcessorOptions) -> Self {
        Self {
            state: SessionState::default(),
            lines: LineAssembler::new(),
            spans: SpanParser::new(),
            triggers: TriggerEngine::default(),
            logon: options.logon,
            username: options.username,
            bannerless: options.bannerless,
            action_list_command: options.action_list_command,
            outbound: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn set_triggers(&mut self, triggers: Vec<Trigger>) {
        self.triggers.set(triggers);
    }

    pub fn triggers(&self) -> &[Trigger] {
        self.triggers.triggers()
    }

    /// Feed one raw chunk as read from the transport.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<DisplayEvent> {
        self.feed_at(bytes, Instant::now())
    }

    pub fn feed_at(
        &mut self,
        bytes: &[u8],
        now: Instant,
    ) -> Vec<DisplayEvent> {
        let text = cp437::decode(bytes);
        self.feed_text_at(&text, now)
    }

    /// Feed already decoded text.
    pub fn feed_text(&mut self, text: &str) -> Vec<DisplayEvent> {
        self.feed_text_at(text, Instant::now())
    }

    pub fn feed_text_at(
        &mut self,
        text: &str,
        now: Instant,
    ) -> Vec<DisplayEvent> {
        let mut events = Vec::new();
        for line in self.lines.feed(text) {
            self.process_line(&line, now, &mut events);
        }

        let partial = self.lines.partial();
        if !partial.is_empty() {
            // Preview only; the real parser sees this text once it completes.
            let spans = self.spans.clone().render(partial);
            if let Some(logon) = &mut self.logon {
                logon.observe(&strip(partial), now);
            }
            events.push(DisplayEvent::PartialLine { spans });
        }

        events
    }

    /// Advance timed work such as the logon sequence.
    pub fn poll_timers(&mut self, now: Instant) {
        let Some(logon) = &mut self.logon else {
            return;
        };

        while let Some(message) = logon.poll(now) {
            let outbound = match message {
                LogonMessage::Username(name) => Outbound::Line(name),
                LogonMessage::Password(secret) => Outbound::Secret(secret),
                LogonMessage::Enter => Outbound::Line(String::new()),
            };
            self.outbound.push_back(outbound);
        }
    }

    /// Drain the lines waiting to be written, oldest first.
    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        self.outbound.drain(..).collect()
    }

    /// Ask for the action list again. Returns false when no command is
    /// configured.
    pub fn request_action_list(&mut self) -> bool {
        let Some(command) = &self.action_list_command else {
            return false;
        };

        self.outbound.push_back(Outbound::Line(command.clone()));
        self.state.action_list_requested = true;
        true
    }

    /// Return to the state of a fresh connection.
    pub fn reset(&mut self) {
        self.lines.reset();
        self.spans.reset();
        self.state.reset();
        self.outbound.clear();
        if let Some(logon) = &mut self.logon {
            logon.restart();
        }
    }

    fn process_line(
        &mut self,
        raw: &str,
        now: Instant,
        events: &mut Vec<DisplayEvent>,
    ) {
        let clean = strip(raw);

        let mut banner_line = true;
        let trailing = match self.state.banner.feed(&clean) {
            BannerStep::Ignored => {
                banner_line = false;
                self.offer_unclaimed(&clean)
            },
            BannerStep::Claimed | BannerStep::Abandoned => None,
            BannerStep::Completed(snapshot) => {
                Some(self.complete_banner(snapshot))
            },
        };

        let spans = self.spans.render(raw);
        if !(banner_line && self.bannerless) {
            events.push(DisplayEvent::RenderLine { spans });
        }
        events.extend(trailing);

        for response in self.triggers.check(&clean) {
            debug!("[trigger] responding to {clean:?}");
            self.outbound.push_back(Outbound::Line(response));
        }
        if let Some(logon) = &mut self.logon {
            logon.observe(&clean, now);
        }
    }

    /// Action listing first, then chat.
    fn offer_unclaimed(&mut self, clean: &str) -> Option<DisplayEvent> {
        match self.state.actions.feed(clean) {
            ActionStep::Ignored => {
                classifier::classify(clean).map(DisplayEvent::Chat)
            },
            ActionStep::Claimed | ActionStep::Abandoned => None,
            ActionStep::Completed(words) => {
                self.state.vocabulary = words.clone();
                Some(DisplayEvent::ActionVocabulary(words))
            },
        }
    }

    fn complete_banner(&mut self, snapshot: RoomSnapshot) -> DisplayEvent {
        debug!(
            "[banner] room {:?} with {} members",
            snapshot.room,
            snapshot.members.len()
        );
        self.state.room = Some(snapshot.clone());

        if let Some(logon) = &mut self.logon {
            // Already in a room, so no login prompt is coming.
            if logon.step() == LogonStep::AwaitingBanner {
                logon.cancel();
            }
        }

        if !self.state.action_list_requested {
            self.request_action_list();
        }

        DisplayEvent::RoomSnapshot(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use telechat_codec::{StdColor, StyleColor};

    use super::*;
    use crate::classifier::ChatKind;

    fn outbound_lines(processor: &mut StreamProcessor) -> Vec<String> {
        processor
            .take_outbound()
            .iter()
            .map(|out| out.expose().to_string())
            .collect()
    }

    fn rendered(events: &[DisplayEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                DisplayEvent::RenderLine { spans } => Some(
                    spans.iter().map(|span| span.text.as_str()).collect(),
                ),
                _ => None,
            })
            .collect()
    }

    const BANNER: &str = "You are in General Chat.\r\n\
        Topic: (Lobby) Alice, Bob and Carol are here with you.\r\n";

    #[test]
    fn banner_emits_snapshot_after_its_last_line() {
        let mut processor = StreamProcessor::default();
        let events = processor.feed_text(BANNER);

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], DisplayEvent::RenderLine { .. }));
        assert!(matches!(events[1], DisplayEvent::RenderLine { .. }));
        let DisplayEvent::RoomSnapshot(snapshot) = &events[2] else {
            panic!("expected snapshot, got {:?}", events[2]);
        };
        assert_eq!(snapshot.topic.as_deref(), Some("Lobby"));
        assert_eq!(processor.state().room(), Some(snapshot));
    }

    #[test]
    fn action_list_is_requested_once_per_connection() {
        let mut processor = StreamProcessor::default();
        processor.feed_text(BANNER);
        assert_eq!(outbound_lines(&mut processor), vec!["/action list"]);

        processor.feed_text(BANNER);
        assert!(outbound_lines(&mut processor).is_empty());

        processor.reset();
        processor.feed_text(BANNER);
        assert_eq!(outbound_lines(&mut processor), vec!["/action list"]);
    }

    #[test]
    fn action_listing_is_claimed_before_chat() {
        let mut processor = StreamProcessor::default();
        let events = processor.feed_text(
            "Action listing for: Wizard\r\n[Bob:] wave smile\r\n:\r\n",
        );

        assert!(!events.iter().any(|e| matches!(e, DisplayEvent::Chat(_))));
        assert_eq!(
            events.last(),
            Some(&DisplayEvent::ActionVocabulary(vec![
                "Bob".to_string(),
                "smile".to_string(),
                "wave".to_string()
            ]))
        );
        assert_eq!(processor.state().vocabulary().len(), 3);
    }

    #[test]
    fn chat_follows_its_render_line() {
        let mut processor = StreamProcessor::default();
        let events =
            processor.feed(b"\x1b[32m[Ann:]\x1b[0m hello\r\nplain text\r\n");

        assert_eq!(rendered(&events), vec!["[Ann:] hello", "plain text"]);
        let DisplayEvent::Chat(chat) = &events[1] else {
            panic!("expected chat, got {:?}", events[1]);
        };
        assert_eq!(chat.kind, ChatKind::Public);
        assert_eq!(chat.sender, "Ann");
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn bannerless_mode_hides_banner_lines_only() {
        let mut processor = StreamProcessor::new(ProcessorOptions {
            bannerless: true,
            ..ProcessorOptions::default()
        });
        let events = processor.feed_text(&format!("{BANNER}[Bob:] hi\r\n"));

        assert_eq!(rendered(&events), vec!["[Bob:] hi"]);
        assert!(matches!(events[0], DisplayEvent::RoomSnapshot(_)));
    }

    #[test]
    fn chat_mentioning_channel_opens_a_banner() {
        let mut processor = StreamProcessor::default();
        let events = processor
            .feed_text("[Bob:] the channel is quiet\r\n[Alice:] hi\r\n");

        assert_eq!(
            rendered(&events),
            vec!["[Bob:] the channel is quiet", "[Alice:] hi"]
        );
        assert!(!events.iter().any(|e| matches!(e, DisplayEvent::Chat(_))));
        assert!(processor.state().in_banner());

        let events = processor.feed_text("Carol is here with you.\r\n");
        let Some(DisplayEvent::RoomSnapshot(snapshot)) = events.last() else {
            panic!("expected snapshot, got {events:?}");
        };
        assert!(snapshot.members.contains("Carol"));
        assert!(!processor.state().in_banner());
    }

    #[test]
    fn style_carries_over_claimed_lines() {
        let mut processor = StreamProcessor::default();
        processor.feed_text("\x1b[31mYou are in Red Room.\r\n");
        let events = processor.feed_text("still red\r\n");

        let DisplayEvent::RenderLine { spans } = &events[0] else {
            panic!("expected render line");
        };
        assert_eq!(
            spans[0].style.color,
            Some(StyleColor::Foreground(StdColor::Red))
        );
    }

    #[test]
    fn partial_line_is_previewed_without_advancing_style() {
        let mut processor = StreamProcessor::default();
        let events = processor.feed_text("Enter your name: \x1b[33m");
        assert!(matches!(
            events.as_slice(),
            [DisplayEvent::PartialLine { spans }] if spans[0].text == "Enter your name: "
        ));

        let events = processor.feed_text("x\r\n");
        let DisplayEvent::RenderLine { spans } = &events[0] else {
            panic!("expected render line");
        };
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].style.color, None);
        assert_eq!(
            spans[1].style.color,
            Some(StyleColor::Foreground(StdColor::Yellow))
        );
    }

    #[test]
    fn triggers_queue_responses() {
        let mut processor = StreamProcessor::default();
        processor.set_triggers(vec![Trigger::new("dinner", "/say yum")]);
        processor.feed_text("[Ann:] Dinner is ready\r\n");
        assert_eq!(outbound_lines(&mut processor), vec!["/say yum"]);
    }

    #[test]
    fn logon_prompt_without_newline_drives_sequence() {
        let delay = Duration::from_millis(10);
        let logon = AutoLogon::new(
            "wanda",
            Some(SecretString::from("pw".to_string())),
        )
        .with_step_delay(delay);
        let mut processor = StreamProcessor::new(ProcessorOptions {
            logon: Some(logon),
            ..ProcessorOptions::default()
        });

        let start = Instant::now();
        processor.feed_text_at("Welcome!\r\nlogin: ", start);
        processor.poll_timers(start + delay);
        processor.poll_timers(start + delay * 2);
        processor.poll_timers(start + delay * 3);

        assert_eq!(outbound_lines(&mut processor), vec!["wanda", "pw", ""]);
    }
}
