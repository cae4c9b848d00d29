use criterion::{
    BatchSize, Criterion, black_box, criterion_group, criterion_main,
};
use telechat_core::{ProcessorOptions, StreamProcessor};

const BANNER: &[u8] = b"\x1b[1;36mYou are in General Chat.\x1b[0m\r\n\
Topic: (Lobby) Alice, Bob and Carol are here with you.\r\n";

const CHAT: &[u8] = b"[Alice:] hello \x1b[31mworld\x1b[0m, see www.example.org\r\n\
From Bob (whispered): psst\r\n\
Carol says to wanda: hi there\r\n";

fn payload() -> Vec<u8> {
    let mut payload = BANNER.to_vec();
    payload.extend(CHAT.repeat(200));
    payload
}

fn processor() -> StreamProcessor {
    StreamProcessor::new(ProcessorOptions {
        username: "wanda".to_string(),
        ..ProcessorOptions::default()
    })
}

fn bench_processor_feed(c: &mut Criterion) {
    let payload = payload();

    c.bench_function("processor_feed_whole_payload", |b| {
        b.iter_batched(
            processor,
            |mut processor| black_box(processor.feed(&payload)),
            BatchSize::SmallInput,
        );
    });

    c.bench_function("processor_feed_small_chunks", |b| {
        b.iter_batched(
            processor,
            |mut processor| {
                for chunk in payload.chunks(64) {
                    black_box(processor.feed(chunk));
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_processor_feed);
criterion_main!(benches);
