use chrono::{DateTime, Local, Utc};

use telechat_core::codec::{StdColor, StyleColor, TextSpan};
use telechat_core::{
    ChatKind, DisplayEvent, ProcessorOptions, SYSTEM_MEMBER, StreamProcessor,
    Trigger,
};

const SESSION: &[u8] = b"\x1b[33;1mYou are in General Chat.\x1b[0m\r\n\
Topic: (Lobby) Alice, Bob and Carol are here with you.\r\n\
Action listing for: Wizard\r\n\
wave smile dance\r\n\
:\r\n\
[Alice:] hello everyone, see www.example.org\r\n\
From Bob (whispered): psst\r\n\
caf\x82 time\r\n";

fn processor() -> StreamProcessor {
    StreamProcessor::new(ProcessorOptions {
        username: "wanda".to_string(),
        ..ProcessorOptions::default()
    })
}

fn line_text(spans: &[TextSpan]) -> String {
    spans.iter().map(|span| span.text.as_str()).collect()
}

fn feed_in_chunks(chunk: usize) -> Vec<DisplayEvent> {
    let mut processor = processor();
    SESSION
        .chunks(chunk)
        .flat_map(|bytes| processor.feed(bytes))
        .filter(|event| !matches!(event, DisplayEvent::PartialLine { .. }))
        .map(|event| match event {
            DisplayEvent::Chat(mut chat) => {
                chat.timestamp = epoch();
                DisplayEvent::Chat(chat)
            },
            other => other,
        })
        .collect()
}

fn epoch() -> DateTime<Local> {
    DateTime::<Utc>::UNIX_EPOCH.with_timezone(&Local)
}

#[test]
fn session_yields_events_in_stream_order() {
    let events = feed_in_chunks(SESSION.len());

    let kinds: Vec<&str> = events
        .iter()
        .map(|event| match event {
            DisplayEvent::RenderLine { .. } => "line",
            DisplayEvent::RoomSnapshot(_) => "room",
            DisplayEvent::ActionVocabulary(_) => "actions",
            DisplayEvent::Chat(_) => "chat",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec![
        "line", "line", "room", "line", "line", "line", "actions", "line",
        "chat", "line", "chat", "line",
    ]);

    let DisplayEvent::RoomSnapshot(room) = &events[2] else {
        unreachable!();
    };
    assert_eq!(room.room.as_deref(), Some("General Chat"));
    assert_eq!(room.topic.as_deref(), Some("Lobby"));
    let members: Vec<&str> = room.members.iter().map(String::as_str).collect();
    assert_eq!(members, vec!["Alice", "Bob", "Carol", SYSTEM_MEMBER]);

    assert_eq!(
        events[6],
        DisplayEvent::ActionVocabulary(vec![
            "dance".to_string(),
            "smile".to_string(),
            "wave".to_string(),
        ])
    );

    let DisplayEvent::Chat(public) = &events[8] else {
        unreachable!();
    };
    assert_eq!(public.kind, ChatKind::Public);
    assert_eq!(public.sender, "Alice");
    assert_eq!(public.urls, vec!["http://www.example.org"]);

    let DisplayEvent::Chat(whisper) = &events[10] else {
        unreachable!();
    };
    assert_eq!(whisper.kind, ChatKind::Whisper);
    assert!(whisper.is_directed_at("wanda"));

    let DisplayEvent::RenderLine { spans } = &events[11] else {
        unreachable!();
    };
    assert_eq!(line_text(spans), "café time");
}

#[test]
fn banner_style_is_carried_on_rendered_spans() {
    let events = feed_in_chunks(SESSION.len());
    let DisplayEvent::RenderLine { spans } = &events[0] else {
        unreachable!();
    };

    assert_eq!(line_text(spans), "You are in General Chat.");
    assert_eq!(
        spans[0].style.color,
        Some(StyleColor::Foreground(StdColor::BrightYellow))
    );
}

#[test]
fn chunking_does_not_change_completed_events() {
    let whole = feed_in_chunks(SESSION.len());
    for size in [1, 2, 3, 7, 16] {
        assert_eq!(feed_in_chunks(size), whole, "chunk size {size}");
    }
}

#[test]
fn link_spans_keep_their_surrounding_text() {
    let mut processor = processor();
    let events = processor.feed_text("check http://example.com/a,b).\r\n");
    let DisplayEvent::RenderLine { spans } = &events[0] else {
        panic!("expected a rendered line, got {events:?}");
    };

    let link = spans
        .iter()
        .find(|span| span.is_hyperlink())
        .expect("a link span");
    assert_eq!(link.text, "http://example.com/a,b");
    assert_eq!(line_text(spans), "check http://example.com/a,b).");
}

#[test]
fn triggers_answer_chat_lines() {
    let mut processor = processor();
    processor.set_triggers(vec![Trigger::new("hello everyone", "hi Alice!")]);
    processor.feed(SESSION);

    let sent: Vec<String> = processor
        .take_outbound()
        .iter()
        .map(|out| out.expose().to_string())
        .collect();
    assert_eq!(sent, vec!["/action list", "hi Alice!"]);
}
